//! Mission profile: ordered flight segments with resolved speed, distance and duration.

mod segment;

use std::collections::BTreeSet;

use thiserror::Error;

pub use segment::{SEGMENT_CONSISTENCY_TOL, Segment, SegmentKind, SegmentSpec};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MissionError {
    #[error("segment `{segment}` is underspecified: {reason}")]
    Underspecified { segment: String, reason: String },
    #[error(
        "segment `{segment}` is inconsistent: speed {speed_m_s} m/s x duration {duration_s} s != distance {distance_m} m"
    )]
    Inconsistent {
        segment: String,
        speed_m_s: f64,
        distance_m: f64,
        duration_s: f64,
    },
    #[error("domain error in segment `{segment}`: {reason}")]
    Domain { segment: String, reason: String },
    #[error("mission configuration error: {0}")]
    Configuration(String),
}

/// Energy drawn per segment and in total.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionEnergy {
    /// `(segment name, energy in J)` in mission order.
    pub segments: Vec<(String, f64)>,
    pub total_j: f64,
}

impl MissionEnergy {
    pub fn segment_j(&self, name: &str) -> Option<f64> {
        self.segments
            .iter()
            .find(|(segment, _)| segment == name)
            .map(|(_, energy)| *energy)
    }
}

/// Ordered, non-empty list of uniquely named segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Mission {
    segments: Vec<Segment>,
}

impl Mission {
    pub fn new(segments: Vec<Segment>) -> Result<Self, MissionError> {
        if segments.is_empty() {
            return Err(MissionError::Configuration(
                "a mission needs at least one segment".into(),
            ));
        }
        let mut seen = BTreeSet::new();
        for segment in &segments {
            if !seen.insert(segment.name.as_str()) {
                return Err(MissionError::Configuration(format!(
                    "duplicate segment name `{}`",
                    segment.name
                )));
            }
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_duration_s(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_s).sum()
    }

    pub fn total_horizontal_distance_m(&self) -> f64 {
        self.segments.iter().map(Segment::horizontal_distance_m).sum()
    }

    /// Integrate `power_w[i] * duration[i]` over the segments.
    pub fn required_energy(&self, power_w: &[f64]) -> Result<MissionEnergy, MissionError> {
        if power_w.len() != self.segments.len() {
            return Err(MissionError::Configuration(format!(
                "expected {} segment powers, got {}",
                self.segments.len(),
                power_w.len()
            )));
        }
        let mut segments = Vec::with_capacity(self.segments.len());
        let mut total_j = 0.0;
        for (segment, &power) in self.segments.iter().zip(power_w) {
            if !power.is_finite() {
                return Err(MissionError::Domain {
                    segment: segment.name.clone(),
                    reason: format!("power {power} W is not finite"),
                });
            }
            let energy = power * segment.duration_s;
            total_j += energy;
            segments.push((segment.name.clone(), energy));
        }
        Ok(MissionEnergy { segments, total_j })
    }
}
