use evtol_core::{BrentOptions, brent};
use log::debug;

use crate::{Bemt, BemtResult, FlowCondition, RotorError};

/// Search brackets and tolerances for rotor trim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimOptions {
    pub rpm_bounds: (f64, f64),
    pub collective_bounds_deg: (f64, f64),
    /// Thrust tolerance relative to the target.
    pub rel_tol: f64,
    pub max_iterations: usize,
}

impl Default for TrimOptions {
    fn default() -> Self {
        Self {
            rpm_bounds: (20.0, 3_000.0),
            collective_bounds_deg: (-15.0, 30.0),
            rel_tol: 1e-6,
            max_iterations: 100,
        }
    }
}

/// Trimmed operating point and the rotor state at that point.
#[derive(Debug, Clone, PartialEq)]
pub struct Trim {
    pub rpm: f64,
    pub collective_deg: f64,
    pub iterations: usize,
    pub result: BemtResult,
}

impl Bemt {
    /// RPM producing `thrust_n` at the freestream of `flow`; the RPM in `flow` is ignored.
    pub fn trim_rpm(
        &self,
        thrust_n: f64,
        flow: &FlowCondition,
        options: &TrimOptions,
    ) -> Result<Trim, RotorError> {
        let (lower, upper) = checked_bounds("rpm", options.rpm_bounds)?;
        check_target(thrust_n)?;
        let thrust_at = |rpm: f64| -> Result<f64, RotorError> {
            Ok(self.run(&flow.with_rpm(rpm))?.thrust_n)
        };

        let thrust_at_lower_n = thrust_at(lower)?;
        let thrust_at_upper_n = thrust_at(upper)?;
        if thrust_n < thrust_at_lower_n || thrust_n > thrust_at_upper_n {
            return Err(RotorError::TargetOutOfRange {
                variable: "rpm",
                target_n: thrust_n,
                lower,
                upper,
                thrust_at_lower_n,
                thrust_at_upper_n,
            });
        }

        let root = brent(
            |rpm| Ok::<f64, RotorError>(thrust_at(rpm)? - thrust_n),
            lower,
            upper,
            &search_options(thrust_n, upper, options),
        )?;
        let collective_deg = self.geometry().collective_deg();
        let result = self.run(&flow.with_rpm(root.x))?;
        debug!(
            "trimmed rpm {:.3} for thrust {:.2} N in {} iterations",
            root.x, thrust_n, root.iterations
        );
        Ok(Trim {
            rpm: root.x,
            collective_deg,
            iterations: root.iterations,
            result,
        })
    }

    /// Collective producing `thrust_n` at the fixed RPM of `flow`.
    pub fn trim_collective(
        &self,
        thrust_n: f64,
        flow: &FlowCondition,
        options: &TrimOptions,
    ) -> Result<Trim, RotorError> {
        let (lower, upper) = checked_bounds("collective", options.collective_bounds_deg)?;
        check_target(thrust_n)?;
        let thrust_at = |collective: f64| -> Result<f64, RotorError> {
            Ok(self.run_with_collective(flow, collective)?.thrust_n)
        };

        let thrust_at_lower_n = thrust_at(lower)?;
        let thrust_at_upper_n = thrust_at(upper)?;
        if thrust_n < thrust_at_lower_n || thrust_n > thrust_at_upper_n {
            return Err(RotorError::TargetOutOfRange {
                variable: "collective",
                target_n: thrust_n,
                lower,
                upper,
                thrust_at_lower_n,
                thrust_at_upper_n,
            });
        }

        let root = brent(
            |collective| Ok::<f64, RotorError>(thrust_at(collective)? - thrust_n),
            lower,
            upper,
            &search_options(thrust_n, upper - lower, options),
        )?;
        let result = self.run_with_collective(flow, root.x)?;
        debug!(
            "trimmed collective {:.4} deg at {:.1} rpm in {} iterations",
            root.x, flow.rpm, root.iterations
        );
        Ok(Trim {
            rpm: flow.rpm,
            collective_deg: root.x,
            iterations: root.iterations,
            result,
        })
    }
}

fn checked_bounds(variable: &str, (lower, upper): (f64, f64)) -> Result<(f64, f64), RotorError> {
    if lower.is_finite() && upper.is_finite() && lower < upper {
        Ok((lower, upper))
    } else {
        Err(RotorError::Domain(format!(
            "{variable} bounds [{lower}, {upper}] must be finite and increasing"
        )))
    }
}

fn check_target(thrust_n: f64) -> Result<(), RotorError> {
    if thrust_n.is_finite() {
        Ok(())
    } else {
        Err(RotorError::Domain(format!("thrust target {thrust_n} N must be finite")))
    }
}

fn search_options(thrust_n: f64, scale: f64, options: &TrimOptions) -> BrentOptions {
    BrentOptions {
        x_tolerance: 1e-12 * scale.abs(),
        f_tolerance: options.rel_tol * thrust_n.abs(),
        max_iterations: options.max_iterations,
    }
}
