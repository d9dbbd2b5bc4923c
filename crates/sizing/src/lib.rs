//! Weight/energy closure for eVTOL conceptual sizing.
//!
//! The closure couples segment performance (trimmed BEMT power at the current take-off
//! mass), mission energy, battery mass and the empirical component weights into a single
//! fixed-point problem on take-off mass. [`ClosureSolver`] converges it either by relaxed
//! substitution or by a two-variable Newton iteration, and [`evaluate_design_point`]
//! exposes the converged design to external optimizers.

mod breakdown;
mod closure;
mod design;
mod performance;
mod vehicle;

use evtol_airfoil::AirfoilError;
use evtol_core::AtmosphereError;
use evtol_mission::MissionError;
use evtol_rotor::RotorError;
use evtol_weights::WeightError;
use thiserror::Error;

pub use breakdown::WeightBreakdown;
pub use closure::{
    ClosureProblem, ClosureSolver, ClosureStep, IterationRecord, SizingResult, SolverState,
    case_catalog,
};
pub use design::{
    Bound, BoundViolation, DesignProblem, DesignSpace, DesignVariable, DesignVariables,
    Evaluation, PENALTY_OBJECTIVE, evaluate_design_point, evaluate_population,
};
pub use evtol_config::{SolverConfig, SolverMethod, ToleranceKind};
pub use performance::{GroupPerformance, SegmentPerformance, segment_performance};
pub use vehicle::{RotorGroup, RotorRole, Topology, Vehicle, Wing};

/// Classification of failures, independent of the crate that raised them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Domain,
    UnderspecifiedSegment,
    InconsistentSegment,
    UnknownAirfoil,
    Convergence,
    Diverged,
    MaxIterExceeded,
}

#[derive(Debug, Error)]
pub enum SizingError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Atmosphere(#[from] AtmosphereError),
    #[error(transparent)]
    Airfoil(#[from] AirfoilError),
    #[error("rotor error: {0}")]
    Rotor(#[from] RotorError),
    #[error("{group} in segment `{segment}`: {source}")]
    Performance {
        segment: String,
        group: RotorRole,
        #[source]
        source: RotorError,
    },
    #[error(transparent)]
    Weight(#[from] WeightError),
    #[error(transparent)]
    Mission(#[from] MissionError),
    #[error("closure diverged after {iterations} iterations at {takeoff_mass_kg:.3} kg: {reason}")]
    Diverged {
        iterations: usize,
        takeoff_mass_kg: f64,
        reason: String,
    },
    #[error(
        "closure did not converge in {iterations} iterations (take-off {takeoff_mass_kg:.3} kg, residual {residual_kg:.3e} kg)"
    )]
    MaxIterExceeded {
        iterations: usize,
        takeoff_mass_kg: f64,
        residual_kg: f64,
    },
}

impl SizingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Atmosphere(AtmosphereError::UnknownModel(_)) => ErrorKind::Configuration,
            Self::Atmosphere(AtmosphereError::AltitudeOutOfRange { .. }) => ErrorKind::Domain,
            Self::Airfoil(AirfoilError::UnknownAirfoil(_)) => ErrorKind::UnknownAirfoil,
            Self::Airfoil(_) => ErrorKind::Configuration,
            Self::Rotor(err) | Self::Performance { source: err, .. } => rotor_kind(err),
            Self::Weight(WeightError::Domain { .. }) => ErrorKind::Domain,
            Self::Weight(_) => ErrorKind::Configuration,
            Self::Mission(MissionError::Underspecified { .. }) => ErrorKind::UnderspecifiedSegment,
            Self::Mission(MissionError::Inconsistent { .. }) => ErrorKind::InconsistentSegment,
            Self::Mission(MissionError::Domain { .. }) => ErrorKind::Domain,
            Self::Mission(MissionError::Configuration(_)) => ErrorKind::Configuration,
            Self::Diverged { .. } => ErrorKind::Diverged,
            Self::MaxIterExceeded { .. } => ErrorKind::MaxIterExceeded,
        }
    }

    /// Failures of a single closure evaluation that a smaller step may avoid.
    pub(crate) fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Domain | ErrorKind::Convergence
        ) && !matches!(self, Self::Atmosphere(_))
    }
}

fn rotor_kind(err: &RotorError) -> ErrorKind {
    match err {
        RotorError::Domain(_) => ErrorKind::Domain,
        RotorError::TargetOutOfRange { .. } | RotorError::Convergence(_) => ErrorKind::Convergence,
        RotorError::MissingInput(_) => ErrorKind::Configuration,
    }
}
