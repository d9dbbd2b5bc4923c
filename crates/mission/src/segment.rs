use std::fmt;

use serde::{Deserialize, Serialize};

use crate::MissionError;

/// Relative tolerance for accepting an over-specified speed/distance/duration triple.
pub const SEGMENT_CONSISTENCY_TOL: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    HoverClimb,
    HoverDescent,
    HoverStay,
    Climb,
    Cruise,
    Descent,
}

impl SegmentKind {
    /// Segments flown on the lift rotors with the disk horizontal.
    pub fn is_hover(self) -> bool {
        matches!(self, Self::HoverClimb | Self::HoverDescent | Self::HoverStay)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::HoverClimb => "hover_climb",
            Self::HoverDescent => "hover_descent",
            Self::HoverStay => "hover_stay",
            Self::Climb => "climb",
            Self::Cruise => "cruise",
            Self::Descent => "descent",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// User-supplied segment parameters; any two of speed, distance and duration suffice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentSpec {
    pub speed_m_s: Option<f64>,
    pub distance_m: Option<f64>,
    pub duration_s: Option<f64>,
    pub altitude_m: f64,
    /// Flight-path angle for climb and descent segments (degrees, positive magnitude).
    pub climb_angle_deg: Option<f64>,
    pub lift_rotor_rpm: Option<f64>,
    pub propeller_rpm: Option<f64>,
}

/// Mission segment with a resolved speed/distance/duration triple.
///
/// For hover climb and descent the speed and distance are vertical; for climb and descent
/// they are measured along the flight path.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub kind: SegmentKind,
    pub speed_m_s: f64,
    pub distance_m: f64,
    pub duration_s: f64,
    pub altitude_m: f64,
    pub climb_angle_deg: Option<f64>,
    /// Pinned lift-rotor RPM; `None` trims it.
    pub lift_rotor_rpm: Option<f64>,
    /// Pinned propeller RPM; `None` trims it.
    pub propeller_rpm: Option<f64>,
}

impl Segment {
    pub fn new(
        name: impl Into<String>,
        kind: SegmentKind,
        spec: SegmentSpec,
    ) -> Result<Self, MissionError> {
        let name = name.into();
        let domain = |reason: String| MissionError::Domain {
            segment: name.clone(),
            reason,
        };
        let underspecified = |reason: &str| MissionError::Underspecified {
            segment: name.clone(),
            reason: reason.to_string(),
        };

        for (label, value) in [
            ("speed", spec.speed_m_s),
            ("distance", spec.distance_m),
            ("duration", spec.duration_s),
        ] {
            if let Some(value) = value {
                if !(value.is_finite() && value >= 0.0) {
                    return Err(domain(format!("{label} {value} must be finite and non-negative")));
                }
            }
        }
        if !spec.altitude_m.is_finite() {
            return Err(domain(format!("altitude {} m must be finite", spec.altitude_m)));
        }
        for (label, rpm) in [
            ("lift rotor rpm", spec.lift_rotor_rpm),
            ("propeller rpm", spec.propeller_rpm),
        ] {
            if let Some(rpm) = rpm {
                if !(rpm.is_finite() && rpm > 0.0) {
                    return Err(domain(format!("{label} {rpm} must be positive")));
                }
            }
        }
        let climb_angle_deg = match (kind, spec.climb_angle_deg) {
            (SegmentKind::Climb | SegmentKind::Descent, None) => {
                return Err(underspecified("climb and descent segments need a climb angle"));
            }
            (_, Some(angle)) if !(angle.is_finite() && (0.0..90.0).contains(&angle)) => {
                return Err(domain(format!("climb angle {angle} deg must lie in [0, 90)")));
            }
            (_, angle) => angle,
        };

        let (speed_m_s, distance_m, duration_s) = if kind == SegmentKind::HoverStay {
            if spec.speed_m_s.is_some_and(|v| v != 0.0) {
                return Err(domain("hover stay implies zero speed".into()));
            }
            if spec.distance_m.is_some_and(|d| d != 0.0) {
                return Err(domain("hover stay covers no distance".into()));
            }
            let duration = spec
                .duration_s
                .ok_or_else(|| underspecified("hover stay needs a duration"))?;
            (0.0, 0.0, duration)
        } else {
            resolve_triple(&name, spec.speed_m_s, spec.distance_m, spec.duration_s)?
        };

        Ok(Self {
            name,
            kind,
            speed_m_s,
            distance_m,
            duration_s,
            altitude_m: spec.altitude_m,
            climb_angle_deg,
            lift_rotor_rpm: spec.lift_rotor_rpm,
            propeller_rpm: spec.propeller_rpm,
        })
    }

    /// Flight-path angle in radians; zero for level and hover segments.
    pub fn flight_path_angle_rad(&self) -> f64 {
        self.climb_angle_deg.unwrap_or(0.0).to_radians()
    }

    /// Ground distance covered by the segment.
    pub fn horizontal_distance_m(&self) -> f64 {
        match self.kind {
            SegmentKind::Cruise => self.distance_m,
            SegmentKind::Climb | SegmentKind::Descent => {
                self.distance_m * self.flight_path_angle_rad().cos()
            }
            SegmentKind::HoverClimb | SegmentKind::HoverDescent | SegmentKind::HoverStay => 0.0,
        }
    }
}

fn resolve_triple(
    name: &str,
    speed: Option<f64>,
    distance: Option<f64>,
    duration: Option<f64>,
) -> Result<(f64, f64, f64), MissionError> {
    let underspecified = |reason: &str| MissionError::Underspecified {
        segment: name.to_string(),
        reason: reason.to_string(),
    };
    match (speed, distance, duration) {
        (Some(v), Some(d), Some(t)) => {
            let derived = v * t;
            let scale = d.abs().max(derived.abs());
            if (derived - d).abs() > SEGMENT_CONSISTENCY_TOL * scale {
                return Err(MissionError::Inconsistent {
                    segment: name.to_string(),
                    speed_m_s: v,
                    distance_m: d,
                    duration_s: t,
                });
            }
            Ok((v, d, t))
        }
        (Some(v), None, Some(t)) => Ok((v, v * t, t)),
        (Some(v), Some(d), None) => {
            if v == 0.0 {
                Err(underspecified("zero speed leaves the duration undetermined"))
            } else {
                Ok((v, d, d / v))
            }
        }
        (None, Some(d), Some(t)) => {
            if t == 0.0 && d == 0.0 {
                Err(underspecified("zero distance over zero duration leaves the speed undetermined"))
            } else if t == 0.0 {
                Err(MissionError::Domain {
                    segment: name.to_string(),
                    reason: format!("distance {d} m in zero time"),
                })
            } else {
                Ok((d / t, d, t))
            }
        }
        _ => Err(underspecified(
            "two of speed, distance and duration are required",
        )),
    }
}
