//! Blade-element momentum theory (BEMT) for lift rotors and propellers.
//!
//! Each blade station balances blade-element thrust against annulus momentum thrust with a
//! scalar Brent solve for the induced velocity. Integrated loads feed the RPM and collective
//! trims used by the sizing loop.

mod bemt;
mod component;
mod geometry;
mod trim;

use evtol_core::{MissingVariable, RootError};
use thiserror::Error;

pub use bemt::{Bemt, BemtResult, FlowCondition, StationResult};
pub use component::RotorComponent;
pub use geometry::{BladeStation, LinearBlade, RotorGeometry};
pub use trim::{Trim, TrimOptions};

/// Errors raised by rotor construction, analysis and trim.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RotorError {
    #[error("domain error: {0}")]
    Domain(String),
    #[error(
        "convergence error: thrust target {target_n:.3} N is outside [{thrust_at_lower_n:.3}, {thrust_at_upper_n:.3}] N over {variable} range [{lower}, {upper}]"
    )]
    TargetOutOfRange {
        variable: &'static str,
        target_n: f64,
        lower: f64,
        upper: f64,
        thrust_at_lower_n: f64,
        thrust_at_upper_n: f64,
    },
    #[error("convergence error: {0}")]
    Convergence(#[from] RootError),
    #[error(transparent)]
    MissingInput(#[from] MissingVariable),
}

impl RotorError {
    /// True for trim and inflow failures, as opposed to invalid inputs.
    pub fn is_convergence(&self) -> bool {
        matches!(self, Self::TargetOutOfRange { .. } | Self::Convergence(_))
    }
}
