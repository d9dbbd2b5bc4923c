use std::f64::consts::PI;
use std::fmt;

use evtol_airfoil::AirfoilCatalog;
use evtol_config::{
    BatteryConfig, FuselageConfig, RotorConfig, SolverConfig, TechnologyConfig, TopologyKind,
    VehicleConfig, WingConfig,
};
use evtol_rotor::{Bemt, LinearBlade, RotorGeometry, TrimOptions};
use serde::Serialize;

use crate::SizingError;

/// Function of a rotor group in the vehicle layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RotorRole {
    LiftRotor,
    Propeller,
}

impl RotorRole {
    /// Label used in result-table keys.
    pub fn label(self) -> &'static str {
        match self {
            Self::LiftRotor => "LiftRotor",
            Self::Propeller => "Propeller",
        }
    }
}

impl fmt::Display for RotorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identical rotors sharing one geometry and trim setup.
#[derive(Debug, Clone)]
pub struct RotorGroup {
    pub role: RotorRole,
    pub count: usize,
    pub bemt: Bemt,
    pub trim: TrimOptions,
    /// Forward-flight advance ratio; pins the RPM outside hover when set.
    pub advance_ratio: Option<f64>,
}

impl RotorGroup {
    fn from_config(
        role: RotorRole,
        config: &RotorConfig,
        catalog: &AirfoilCatalog,
        solver: &SolverConfig,
    ) -> Result<Self, SizingError> {
        let invalid = |reason: String| SizingError::Configuration(format!("{role}: {reason}"));
        if config.count == 0 {
            return Err(invalid("rotor count must be positive".into()));
        }
        if !(0.0..1.0).contains(&config.hub_fraction) {
            return Err(invalid(format!(
                "hub fraction {} must lie in [0, 1)",
                config.hub_fraction
            )));
        }
        if let Some(ratio) = config.advance_ratio {
            if !(ratio.is_finite() && ratio > 0.0) {
                return Err(invalid(format!("advance ratio {ratio} must be positive")));
            }
        }
        let [rpm_low, rpm_high] = config.rpm_range;
        if !(rpm_low > 0.0 && rpm_low < rpm_high) {
            return Err(invalid(format!(
                "rpm range [{rpm_low}, {rpm_high}] must be positive and increasing"
            )));
        }

        let airfoil = catalog.load(&config.airfoil)?;
        let blade = LinearBlade {
            root_chord_m: config.root_chord_m,
            tip_chord_m: config.tip_chord_m,
            root_pitch_deg: config.root_pitch_deg,
            tip_pitch_deg: config.tip_pitch_deg,
            station_count: config.stations,
        };
        let geometry = RotorGeometry::from_linear(
            config.blades as usize,
            2.0 * config.radius_m,
            config.hub_fraction * config.radius_m,
            &blade,
            airfoil,
        )?;
        let [collective_low, collective_high] = config.collective_range_deg;
        Ok(Self {
            role,
            count: config.count as usize,
            bemt: Bemt::new(geometry),
            trim: TrimOptions {
                rpm_bounds: (rpm_low, rpm_high),
                collective_bounds_deg: (collective_low, collective_high),
                rel_tol: solver.trim_rel_tol,
                max_iterations: solver.trim_max_iterations,
            },
            advance_ratio: config.advance_ratio,
        })
    }

    pub fn radius_m(&self) -> f64 {
        self.bemt.geometry().radius_m()
    }

    pub fn diameter_m(&self) -> f64 {
        self.bemt.geometry().diameter_m()
    }

    pub fn blade_count(&self) -> usize {
        self.bemt.geometry().blade_count()
    }

    pub fn disk_area_m2(&self) -> f64 {
        self.bemt.geometry().disk_area_m2()
    }
}

/// Fixed wing with a parabolic drag polar.
#[derive(Debug, Clone, PartialEq)]
pub struct Wing {
    pub area_m2: f64,
    pub aspect_ratio: f64,
    pub cd0: f64,
    pub oswald_efficiency: f64,
}

impl Wing {
    fn from_config(config: &WingConfig) -> Result<Self, SizingError> {
        for (name, value) in [
            ("wing area", config.area_m2),
            ("wing aspect ratio", config.aspect_ratio),
            ("Oswald efficiency", config.oswald_efficiency),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SizingError::Configuration(format!(
                    "{name} {value} must be positive"
                )));
            }
        }
        if !(config.cd0.is_finite() && config.cd0 >= 0.0) {
            return Err(SizingError::Configuration(format!(
                "zero-lift drag coefficient {} must be non-negative",
                config.cd0
            )));
        }
        Ok(Self {
            area_m2: config.area_m2,
            aspect_ratio: config.aspect_ratio,
            cd0: config.cd0,
            oswald_efficiency: config.oswald_efficiency,
        })
    }

    pub fn span_m(&self) -> f64 {
        (self.area_m2 * self.aspect_ratio).sqrt()
    }

    /// Drag at dynamic pressure `q` while carrying `lift_n`.
    pub fn drag_n(&self, q: f64, lift_n: f64) -> f64 {
        let qs = q * self.area_m2;
        let cl = lift_n / qs;
        qs * (self.cd0 + cl * cl / (PI * self.oswald_efficiency * self.aspect_ratio))
    }
}

/// Topology-specific parts of the vehicle.
#[derive(Debug, Clone)]
pub enum Topology {
    Multirotor {
        flat_plate_area_m2: f64,
        span_margin_m: f64,
    },
    LiftPlusCruise {
        wing: Wing,
        propeller: RotorGroup,
    },
}

/// Assembled vehicle, immutable for the duration of a closure solve.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub passengers: u32,
    pub payload_kg: f64,
    pub fuselage: FuselageConfig,
    pub battery: BatteryConfig,
    pub ultimate_load_factor: f64,
    pub controller_specific_power_w_kg: f64,
    pub avionics_uninstalled_kg: f64,
    pub technology: TechnologyConfig,
    pub lift_rotor: RotorGroup,
    pub topology: Topology,
}

impl Vehicle {
    /// Validate a vehicle description and build its rotors from the airfoil catalog.
    pub fn from_config(
        config: &VehicleConfig,
        catalog: &AirfoilCatalog,
        solver: &SolverConfig,
    ) -> Result<Self, SizingError> {
        if config.passengers == 0 {
            return Err(SizingError::Configuration(
                "vehicle must carry at least one passenger".into(),
            ));
        }
        if !(config.payload_kg.is_finite() && config.payload_kg >= 0.0) {
            return Err(SizingError::Configuration(format!(
                "payload {} kg must be non-negative",
                config.payload_kg
            )));
        }

        let lift_rotor =
            RotorGroup::from_config(RotorRole::LiftRotor, &config.lift_rotor, catalog, solver)?;
        let topology = match config.topology {
            TopologyKind::Multirotor => {
                if config.wing.is_some() || config.propeller.is_some() {
                    return Err(SizingError::Configuration(
                        "a multirotor has no wing or propeller section".into(),
                    ));
                }
                let flat_plate_area_m2 = config.flat_plate_area_m2.ok_or_else(|| {
                    SizingError::Configuration("multirotor needs flat_plate_area_m2".into())
                })?;
                if !(flat_plate_area_m2.is_finite() && flat_plate_area_m2 >= 0.0) {
                    return Err(SizingError::Configuration(format!(
                        "flat-plate area {flat_plate_area_m2} m^2 must be non-negative"
                    )));
                }
                Topology::Multirotor {
                    flat_plate_area_m2,
                    span_margin_m: config.span_margin_m.unwrap_or(2.0),
                }
            }
            TopologyKind::LiftPlusCruise => {
                if config.flat_plate_area_m2.is_some() || config.span_margin_m.is_some() {
                    return Err(SizingError::Configuration(
                        "lift-plus-cruise drag comes from the wing polar; remove flat_plate_area_m2 and span_margin_m".into(),
                    ));
                }
                let wing = config.wing.as_ref().ok_or_else(|| {
                    SizingError::Configuration("lift-plus-cruise needs a wing section".into())
                })?;
                let propeller = config.propeller.as_ref().ok_or_else(|| {
                    SizingError::Configuration("lift-plus-cruise needs a propeller section".into())
                })?;
                Topology::LiftPlusCruise {
                    wing: Wing::from_config(wing)?,
                    propeller: RotorGroup::from_config(
                        RotorRole::Propeller,
                        propeller,
                        catalog,
                        solver,
                    )?,
                }
            }
        };

        Ok(Self {
            passengers: config.passengers,
            payload_kg: config.payload_kg,
            fuselage: config.fuselage.clone(),
            battery: config.battery.clone(),
            ultimate_load_factor: config.ultimate_load_factor,
            controller_specific_power_w_kg: config.controller_specific_power_w_kg,
            avionics_uninstalled_kg: config.avionics_uninstalled_kg,
            technology: config.technology.clone(),
            lift_rotor,
            topology,
        })
    }

    pub fn topology_kind(&self) -> TopologyKind {
        match self.topology {
            Topology::Multirotor { .. } => TopologyKind::Multirotor,
            Topology::LiftPlusCruise { .. } => TopologyKind::LiftPlusCruise,
        }
    }

    pub fn propeller(&self) -> Option<&RotorGroup> {
        match &self.topology {
            Topology::Multirotor { .. } => None,
            Topology::LiftPlusCruise { propeller, .. } => Some(propeller),
        }
    }

    pub fn wing(&self) -> Option<&Wing> {
        match &self.topology {
            Topology::Multirotor { .. } => None,
            Topology::LiftPlusCruise { wing, .. } => Some(wing),
        }
    }

    /// Every rotor group, lift rotors first.
    pub fn rotor_groups(&self) -> Vec<&RotorGroup> {
        std::iter::once(&self.lift_rotor)
            .chain(self.propeller())
            .collect()
    }

    /// Overall span used by the flight-control estimate: the wing span, or for a
    /// multirotor the side-by-side rotor footprint plus a margin.
    pub fn span_m(&self) -> f64 {
        match &self.topology {
            Topology::Multirotor { span_margin_m, .. } => {
                let abreast = self.lift_rotor.count.div_ceil(2) as f64;
                abreast * self.lift_rotor.diameter_m() + span_margin_m
            }
            Topology::LiftPlusCruise { wing, .. } => wing.span_m(),
        }
    }
}
