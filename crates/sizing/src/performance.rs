use evtol_core::AtmosphereState;
use evtol_core::units::{rad_s_to_rpm, rpm_to_rad_s};
use evtol_mission::{MissionError, Segment, SegmentKind};
use evtol_rotor::{FlowCondition, Trim};
use evtol_weights::WeightError;
use log::warn;
use serde::Serialize;

use crate::{RotorGroup, RotorRole, SizingError, Topology, Vehicle};

/// Operating point of one rotor group during a segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupPerformance {
    pub role: RotorRole,
    pub count: usize,
    pub thrust_per_rotor_n: f64,
    pub rpm: f64,
    pub collective_deg: f64,
    pub power_per_rotor_w: f64,
    pub torque_per_rotor_nm: f64,
    pub disk_loading_n_m2: f64,
    pub tip_speed_m_s: f64,
    /// NaN outside hover or when thrust or power is not positive.
    pub figure_of_merit: f64,
    /// Disk incidence to the freestream (degrees).
    pub incidence_deg: f64,
    pub clamped_stations: usize,
}

impl GroupPerformance {
    pub fn total_power_w(&self) -> f64 {
        self.count as f64 * self.power_per_rotor_w
    }
}

/// Shaft power and rotor states required to fly one segment at a given take-off mass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentPerformance {
    pub segment: String,
    pub kind: SegmentKind,
    pub drag_n: f64,
    /// Groups that produce thrust in this segment.
    pub groups: Vec<GroupPerformance>,
    pub power_w: f64,
}

impl SegmentPerformance {
    pub fn group(&self, role: RotorRole) -> Option<&GroupPerformance> {
        self.groups.iter().find(|g| g.role == role)
    }
}

/// Trim every active rotor group for `segment` at `takeoff_mass_kg`.
///
/// Hover segments hang the full weight on the lift rotors (hover descent is flown as
/// hover). A multirotor in forward flight tilts its disks to balance weight and drag; a
/// lift-plus-cruise vehicle flies on the wing with the propellers overcoming drag.
pub fn segment_performance(
    vehicle: &Vehicle,
    segment: &Segment,
    atmosphere: &AtmosphereState,
    takeoff_mass_kg: f64,
) -> Result<SegmentPerformance, SizingError> {
    if !(takeoff_mass_kg.is_finite() && takeoff_mass_kg > 0.0) {
        return Err(SizingError::Weight(WeightError::Domain {
            model: "takeoff",
            reason: format!("take-off mass {takeoff_mass_kg} kg must be positive"),
        }));
    }
    let weight_n = takeoff_mass_kg * atmosphere.gravity_m_s2;
    let speed = segment.speed_m_s;
    let q = 0.5 * atmosphere.density_kg_m3 * speed * speed;
    let gamma = segment.flight_path_angle_rad();
    let along_path_weight = match segment.kind {
        SegmentKind::Climb => weight_n * gamma.sin(),
        SegmentKind::Descent => -weight_n * gamma.sin(),
        _ => 0.0,
    };

    let (drag_n, groups) = if segment.kind.is_hover() {
        let lift = &vehicle.lift_rotor;
        let axial = if segment.kind == SegmentKind::HoverClimb {
            speed
        } else {
            0.0
        };
        let flow = FlowCondition::axial(axial, lift.trim.rpm_bounds.1, atmosphere);
        let thrust = weight_n / lift.count as f64;
        let group = operate(lift, segment, thrust, flow, segment.lift_rotor_rpm)?;
        (0.0, vec![group])
    } else {
        match &vehicle.topology {
            Topology::Multirotor {
                flat_plate_area_m2, ..
            } => {
                let lift = &vehicle.lift_rotor;
                let drag = q * flat_plate_area_m2;
                let along = drag + along_path_weight;
                let normal = weight_n * gamma.cos();
                let incidence_deg = along.atan2(normal).to_degrees();
                let thrust = along.hypot(normal) / lift.count as f64;
                let pinned = pinned_rpm(lift, segment, segment.lift_rotor_rpm, |mu| {
                    rad_s_to_rpm(speed / (mu * lift.radius_m()))
                })?;
                let flow = FlowCondition::axial(speed, lift.trim.rpm_bounds.1, atmosphere)
                    .with_incidence(incidence_deg);
                (drag, vec![operate(lift, segment, thrust, flow, pinned)?])
            }
            Topology::LiftPlusCruise { wing, propeller } => {
                if q <= 0.0 {
                    return Err(SizingError::Mission(MissionError::Domain {
                        segment: segment.name.clone(),
                        reason: "wing-borne flight needs a positive airspeed".into(),
                    }));
                }
                let drag = wing.drag_n(q, weight_n * gamma.cos());
                let required = (drag + along_path_weight).max(0.0);
                let groups = if required > 0.0 {
                    let thrust = required / propeller.count as f64;
                    let pinned = pinned_rpm(propeller, segment, segment.propeller_rpm, |j| {
                        60.0 * speed / (j * propeller.diameter_m())
                    })?;
                    let flow = FlowCondition::axial(speed, propeller.trim.rpm_bounds.1, atmosphere);
                    vec![operate(propeller, segment, thrust, flow, pinned)?]
                } else {
                    Vec::new()
                };
                (drag, groups)
            }
        }
    };

    let power_w = groups.iter().map(GroupPerformance::total_power_w).sum();
    Ok(SegmentPerformance {
        segment: segment.name.clone(),
        kind: segment.kind,
        drag_n,
        groups,
        power_w,
    })
}

/// RPM fixed for a forward-flight segment, either by the segment or by the group's
/// advance ratio. Setting both is a configuration error.
fn pinned_rpm(
    group: &RotorGroup,
    segment: &Segment,
    segment_rpm: Option<f64>,
    from_advance_ratio: impl FnOnce(f64) -> f64,
) -> Result<Option<f64>, SizingError> {
    match (group.advance_ratio, segment_rpm) {
        (Some(ratio), Some(rpm)) => Err(SizingError::Configuration(format!(
            "segment `{}` pins the {} at {rpm} rpm but the vehicle fixes its advance ratio at {ratio}",
            segment.name, group.role
        ))),
        (Some(ratio), None) => Ok(Some(from_advance_ratio(ratio))),
        (None, rpm) => Ok(rpm),
    }
}

fn operate(
    group: &RotorGroup,
    segment: &Segment,
    thrust_n: f64,
    flow: FlowCondition,
    pinned_rpm: Option<f64>,
) -> Result<GroupPerformance, SizingError> {
    let trim: Trim = match pinned_rpm {
        Some(rpm) => group
            .bemt
            .trim_collective(thrust_n, &flow.with_rpm(rpm), &group.trim),
        None => group.bemt.trim_rpm(thrust_n, &flow, &group.trim),
    }
    .map_err(|source| SizingError::Performance {
        segment: segment.name.clone(),
        group: group.role,
        source,
    })?;

    let clamped_stations = trim.result.clamped_stations();
    if clamped_stations > 0 {
        warn!(
            "{} in segment `{}`: {clamped_stations} BEMT station(s) clamped to the inflow bracket",
            group.role, segment.name
        );
    }

    let figure_of_merit = if segment.kind.is_hover() {
        trim.result.figure_of_merit
    } else {
        f64::NAN
    };
    Ok(GroupPerformance {
        role: group.role,
        count: group.count,
        thrust_per_rotor_n: thrust_n,
        rpm: trim.rpm,
        collective_deg: trim.collective_deg,
        power_per_rotor_w: trim.result.power_w,
        torque_per_rotor_nm: trim.result.torque_nm,
        disk_loading_n_m2: thrust_n / group.disk_area_m2(),
        tip_speed_m_s: rpm_to_rad_s(trim.rpm) * group.radius_m(),
        figure_of_merit,
        incidence_deg: flow.incidence_deg,
        clamped_stations,
    })
}
