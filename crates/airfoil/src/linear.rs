use crate::{Airfoil, AirfoilSample, EvalMethod, normalize_name};

/// Thin-airfoil style polar: `cl = cl0 + a·α`, `cd = cd0 + cd2·α²` with α in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearAirfoil {
    name: String,
    /// Lift-curve slope per radian.
    pub lift_slope: f64,
    /// Lift coefficient at zero angle of attack.
    pub cl0: f64,
    pub cd0: f64,
    /// Quadratic drag growth per radian².
    pub cd2: f64,
    /// Magnitude of the angle (degrees) past which the attached-flow assumption is flagged.
    pub stall_angle_deg: f64,
}

impl LinearAirfoil {
    pub fn new(name: &str, lift_slope: f64, cl0: f64, cd0: f64, cd2: f64) -> Self {
        Self {
            name: normalize_name(name),
            lift_slope,
            cl0,
            cd0,
            cd2,
            stall_angle_deg: 15.0,
        }
    }

    pub fn with_stall_angle(mut self, stall_angle_deg: f64) -> Self {
        self.stall_angle_deg = stall_angle_deg;
        self
    }

    /// Symmetric NACA 0012 section.
    pub fn naca0012() -> Self {
        Self::new("NACA0012", 5.73, 0.0, 0.008, 0.6).with_stall_angle(14.0)
    }

    /// Cambered NACA 23012 section.
    pub fn naca23012() -> Self {
        Self::new("NACA23012", 5.9, 0.12, 0.0065, 0.55).with_stall_angle(16.0)
    }
}

impl Airfoil for LinearAirfoil {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, alpha_deg: f64) -> AirfoilSample {
        let alpha = alpha_deg.to_radians();
        let method = if alpha_deg.abs() <= self.stall_angle_deg {
            EvalMethod::Linear
        } else {
            EvalMethod::LinearBeyondStall
        };
        AirfoilSample {
            cl: self.cl0 + self.lift_slope * alpha,
            cd: self.cd0 + self.cd2 * alpha * alpha,
            method,
        }
    }
}
