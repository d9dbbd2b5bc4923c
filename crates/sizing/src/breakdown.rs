use std::collections::BTreeMap;

use evtol_core::units::wh_to_j;
use evtol_weights::{
    AntiIcingWeight, AvionicsWeight, BatteryWeight, ControllerWeight, FlightControlWeight,
    FurnishingsWeight, FuselageWeight, LandingGearWeight, MotorWeight, RotorWeight, WeightError,
    WeightModel, WingWeight,
};
use serde::Serialize;

use crate::{RotorRole, Vehicle};

/// Vehicle mass split into top-level groups with named sub-items (kg).
///
/// `takeoff_kg` is the sum of the groups, accumulated in key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightBreakdown {
    pub takeoff_kg: f64,
    pub payload_kg: f64,
    pub battery_kg: f64,
    pub propulsion: BTreeMap<String, f64>,
    pub structure: BTreeMap<String, f64>,
    pub equipment: BTreeMap<String, f64>,
}

impl WeightBreakdown {
    pub fn propulsion_kg(&self) -> f64 {
        self.propulsion.values().sum()
    }

    pub fn structure_kg(&self) -> f64 {
        self.structure.values().sum()
    }

    pub fn equipment_kg(&self) -> f64 {
        self.equipment.values().sum()
    }

    /// Take-off mass less the battery.
    pub fn non_battery_kg(&self) -> f64 {
        self.payload_kg + self.propulsion_kg() + self.structure_kg() + self.equipment_kg()
    }

    /// Flattened `Weight|...` entries.
    pub fn to_table(&self) -> BTreeMap<String, f64> {
        let mut table = BTreeMap::from([
            ("Weight|takeoff".to_string(), self.takeoff_kg),
            ("Weight|payload".to_string(), self.payload_kg),
            ("Weight|battery".to_string(), self.battery_kg),
            ("Weight|propulsion".to_string(), self.propulsion_kg()),
            ("Weight|structure".to_string(), self.structure_kg()),
            ("Weight|equipment".to_string(), self.equipment_kg()),
        ]);
        for (group, items) in [
            ("propulsion", &self.propulsion),
            ("structure", &self.structure),
            ("equipment", &self.equipment),
        ] {
            for (name, value) in items {
                table.insert(format!("Weight|{group}|{name}"), *value);
            }
        }
        table
    }
}

/// Peak per-rotor shaft power of one rotor group over the mission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PeakPower {
    pub role: RotorRole,
    pub count: f64,
    pub diameter_m: f64,
    pub blades: f64,
    pub power_w: f64,
}

/// Every weight model of the vehicle, bound to one closure state.
#[derive(Debug, Clone)]
pub(crate) struct ComponentModels {
    pub battery: BatteryWeight,
    pub motors: Vec<(RotorRole, MotorWeight)>,
    pub controller: ControllerWeight,
    pub rotors: Vec<(RotorRole, RotorWeight)>,
    pub fuselage: FuselageWeight,
    pub landing_gear: LandingGearWeight,
    pub wing: Option<WingWeight>,
    pub avionics: AvionicsWeight,
    pub flight_control: FlightControlWeight,
    pub furnishings: FurnishingsWeight,
    pub anti_icing: AntiIcingWeight,
}

impl ComponentModels {
    pub fn new(vehicle: &Vehicle, takeoff_mass_kg: f64, energy_j: f64, peaks: &[PeakPower]) -> Self {
        let tech = &vehicle.technology;
        let motors = peaks
            .iter()
            .map(|peak| {
                (
                    peak.role,
                    MotorWeight {
                        max_power_w: peak.power_w,
                        count: peak.count,
                        tech_factor: tech.motor,
                    },
                )
            })
            .collect();
        let rotors = peaks
            .iter()
            .map(|peak| {
                (
                    peak.role,
                    RotorWeight {
                        power_w: peak.power_w,
                        diameter_m: peak.diameter_m,
                        blades: peak.blades,
                        count: peak.count,
                        tech_factor: tech.rotor,
                    },
                )
            })
            .collect();
        let installed_power_w = peaks.iter().map(|p| p.count * p.power_w).sum();

        Self {
            battery: BatteryWeight {
                energy_j,
                specific_energy_j_kg: wh_to_j(vehicle.battery.specific_energy_wh_kg),
                efficiency: vehicle.battery.efficiency,
                depth_of_discharge: vehicle.battery.depth_of_discharge,
                tech_factor: tech.battery,
            },
            motors,
            controller: ControllerWeight {
                total_power_w: installed_power_w,
                specific_power_w_kg: vehicle.controller_specific_power_w_kg,
                tech_factor: tech.controller,
            },
            rotors,
            fuselage: FuselageWeight {
                takeoff_mass_kg,
                length_m: vehicle.fuselage.length_m,
                perimeter_m: vehicle.fuselage.perimeter_m,
                passengers: vehicle.passengers as f64,
                tech_factor: tech.fuselage,
            },
            landing_gear: LandingGearWeight {
                takeoff_mass_kg,
                tech_factor: tech.landing_gear,
            },
            wing: vehicle.wing().map(|wing| WingWeight {
                takeoff_mass_kg,
                area_m2: wing.area_m2,
                ultimate_load_factor: vehicle.ultimate_load_factor,
                aspect_ratio: wing.aspect_ratio,
                tech_factor: tech.wing,
            }),
            avionics: AvionicsWeight {
                uninstalled_mass_kg: vehicle.avionics_uninstalled_kg,
                tech_factor: tech.avionics,
            },
            flight_control: FlightControlWeight {
                fuselage_length_m: vehicle.fuselage.length_m,
                span_m: vehicle.span_m(),
                ultimate_load_factor: vehicle.ultimate_load_factor,
                takeoff_mass_kg,
                tech_factor: tech.flight_control,
            },
            furnishings: FurnishingsWeight {
                takeoff_mass_kg,
                tech_factor: tech.furnishings,
            },
            anti_icing: AntiIcingWeight {
                takeoff_mass_kg,
                tech_factor: tech.anti_icing,
            },
        }
    }

    pub fn breakdown(&self, payload_kg: f64) -> Result<WeightBreakdown, WeightError> {
        let mut propulsion = BTreeMap::new();
        for (role, motor) in &self.motors {
            propulsion.insert(format!("motor|{role}"), motor.weight()?);
        }
        propulsion.insert("controller".to_string(), self.controller.weight()?);
        for (role, rotor) in &self.rotors {
            propulsion.insert(format!("rotor|{role}"), rotor.weight()?);
        }

        let mut structure = BTreeMap::from([
            ("fuselage".to_string(), self.fuselage.weight()?),
            ("landing_gear".to_string(), self.landing_gear.weight()?),
        ]);
        if let Some(wing) = &self.wing {
            structure.insert("wing".to_string(), wing.weight()?);
        }

        let equipment = BTreeMap::from([
            ("avionics".to_string(), self.avionics.weight()?),
            ("flight_control".to_string(), self.flight_control.weight()?),
            ("furnishings".to_string(), self.furnishings.weight()?),
            ("anti_icing".to_string(), self.anti_icing.weight()?),
        ]);

        let battery_kg = self.battery.weight()?;
        let mut breakdown = WeightBreakdown {
            takeoff_kg: 0.0,
            payload_kg,
            battery_kg,
            propulsion,
            structure,
            equipment,
        };
        breakdown.takeoff_kg = breakdown.payload_kg
            + breakdown.battery_kg
            + breakdown.propulsion_kg()
            + breakdown.structure_kg()
            + breakdown.equipment_kg();
        Ok(breakdown)
    }

    /// Derivative of the non-battery mass with respect to take-off mass, given the
    /// derivative of each group's peak power.
    pub fn non_battery_derivative(&self, peak_slopes: &[(RotorRole, f64)]) -> Result<f64, WeightError> {
        let slope = |role: RotorRole| {
            peak_slopes
                .iter()
                .find(|(r, _)| *r == role)
                .map(|(_, s)| *s)
                .unwrap_or(0.0)
        };

        let mut total = 0.0;
        for (role, motor) in &self.motors {
            total += motor.partials()?["max_power"] * slope(*role);
        }
        let installed_slope: f64 = self
            .motors
            .iter()
            .map(|(role, motor)| motor.count * slope(*role))
            .sum();
        total += self.controller.partials()?["total_power"] * installed_slope;
        for (role, rotor) in &self.rotors {
            total += rotor.partials()?["power"] * slope(*role);
        }

        total += self.fuselage.partials()?["takeoff_mass"];
        total += self.landing_gear.partials()?["takeoff_mass"];
        if let Some(wing) = &self.wing {
            total += wing.partials()?["takeoff_mass"];
        }
        total += self.flight_control.partials()?["takeoff_mass"];
        total += self.furnishings.partials()?["takeoff_mass"];
        total += self.anti_icing.partials()?["takeoff_mass"];
        Ok(total)
    }

    /// `∂battery/∂energy` (kg/J).
    pub fn battery_energy_slope(&self) -> Result<f64, WeightError> {
        Ok(self.battery.partials()?["energy"])
    }
}
