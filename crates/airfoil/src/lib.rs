//! Airfoil section aerodynamics: lift and drag coefficients versus angle of attack.
//!
//! Two model families are provided. [`LinearAirfoil`] is a closed-form lift-slope model
//! meant for the attached-flow range. [`TabulatedAirfoil`] interpolates measured polars and
//! extends them to ±180° with a Viterna–Corrigan post-stall branch that meets a flat-plate
//! asymptote. Every evaluation reports which branch produced it.

mod catalog;
mod linear;
mod table;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub use catalog::AirfoilCatalog;
pub use linear::LinearAirfoil;
pub use table::{TabulatedAirfoil, load_table_file, parse_table};

/// Branch of the model that produced a coefficient pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMethod {
    /// Closed-form lift slope inside its attached-flow range.
    Linear,
    /// Closed-form lift slope queried past its stall angle.
    LinearBeyondStall,
    /// Linear interpolation inside the measured table.
    Interpolated,
    /// Viterna–Corrigan extrapolation between the table edge and ±90°.
    Viterna,
    /// Flat-plate branch between ±90° and ±180°.
    FlatPlate,
}

/// Lift and drag coefficients at one angle of attack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirfoilSample {
    pub cl: f64,
    pub cd: f64,
    pub method: EvalMethod,
}

/// Section polar shared read-only by rotor blade stations.
pub trait Airfoil: fmt::Debug + Send + Sync {
    /// Upper-cased catalog name.
    fn name(&self) -> &str;

    /// Coefficients at `alpha_deg`.
    fn evaluate(&self, alpha_deg: f64) -> AirfoilSample;

    fn cl(&self, alpha_deg: f64) -> f64 {
        self.evaluate(alpha_deg).cl
    }

    fn cd(&self, alpha_deg: f64) -> f64 {
        self.evaluate(alpha_deg).cd
    }

    /// Lift coefficients for each angle (degrees).
    fn eval_cl(&self, alpha_deg: &[f64]) -> Vec<f64> {
        alpha_deg.iter().map(|&a| self.cl(a)).collect()
    }

    /// Drag coefficients for each angle (degrees).
    fn eval_cd(&self, alpha_deg: &[f64]) -> Vec<f64> {
        alpha_deg.iter().map(|&a| self.cd(a)).collect()
    }
}

/// Errors raised while loading or looking up airfoils.
#[derive(Debug, Error)]
pub enum AirfoilError {
    #[error("unknown airfoil `{0}`")]
    UnknownAirfoil(String),
    #[error("airfoil `{name}` line {line}: {reason}")]
    MalformedTable {
        name: String,
        line: u64,
        reason: String,
    },
    #[error(
        "airfoil `{name}` line {line}: angle of attack {alpha} deg does not increase past {previous} deg"
    )]
    OutOfOrder {
        name: String,
        line: u64,
        alpha: f64,
        previous: f64,
    },
    #[error("airfoil `{name}`: {reason}")]
    InvalidDomain { name: String, reason: String },
    #[error("failed to read airfoil table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse airfoil table: {0}")]
    Csv(#[from] csv::Error),
}

/// Normalize a user-facing airfoil identifier for catalog lookups.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

/// Wrap an angle into (−180°, 180°].
pub fn wrap_degrees(alpha_deg: f64) -> f64 {
    let mut a = alpha_deg % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a <= -180.0 {
        a += 360.0;
    }
    a
}
