use std::collections::BTreeMap;

use evtol_core::units::{KG_PER_LB, kg_to_lb, m_to_ft, m2_to_ft2, w_to_hp};

use crate::{WeightError, WeightModel, non_negative, positive, weight_inputs};

/// Fuselage structure from take-off mass, length, perimeter and passenger count.
#[derive(Debug, Clone, PartialEq)]
pub struct FuselageWeight {
    pub takeoff_mass_kg: f64,
    pub length_m: f64,
    pub perimeter_m: f64,
    pub passengers: f64,
    pub tech_factor: f64,
}

impl WeightModel for FuselageWeight {
    fn name(&self) -> &'static str {
        "fuselage"
    }

    fn technology_factor(&self) -> f64 {
        self.tech_factor
    }

    weight_inputs! {
        "takeoff_mass" => takeoff_mass_kg,
        "length" => length_m,
        "perimeter" => perimeter_m,
        "passengers" => passengers,
        "technology_factor" => tech_factor,
    }

    fn validate(&self) -> Result<(), WeightError> {
        positive(self.name(), "takeoff_mass", self.takeoff_mass_kg)?;
        positive(self.name(), "length", self.length_m)?;
        positive(self.name(), "perimeter", self.perimeter_m)?;
        positive(self.name(), "passengers", self.passengers)
    }

    fn nominal_weight(&self) -> f64 {
        let pounds = 14.86
            * kg_to_lb(self.takeoff_mass_kg).powf(0.144)
            * (self.length_m / self.perimeter_m).powf(0.778)
            * m_to_ft(self.length_m).powf(0.383)
            * self.passengers.powf(0.455);
        pounds * KG_PER_LB
    }

    fn nominal_partials(&self) -> BTreeMap<&'static str, f64> {
        let w = self.nominal_weight();
        BTreeMap::from([
            ("takeoff_mass", 0.144 * w / self.takeoff_mass_kg),
            ("length", (0.778 + 0.383) * w / self.length_m),
            ("perimeter", -0.778 * w / self.perimeter_m),
            ("passengers", 0.455 * w / self.passengers),
        ])
    }
}

/// Wing structure from take-off mass, area, ultimate load factor and aspect ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct WingWeight {
    pub takeoff_mass_kg: f64,
    pub area_m2: f64,
    pub ultimate_load_factor: f64,
    pub aspect_ratio: f64,
    pub tech_factor: f64,
}

impl WeightModel for WingWeight {
    fn name(&self) -> &'static str {
        "wing"
    }

    fn technology_factor(&self) -> f64 {
        self.tech_factor
    }

    weight_inputs! {
        "takeoff_mass" => takeoff_mass_kg,
        "wing_area" => area_m2,
        "load_factor" => ultimate_load_factor,
        "aspect_ratio" => aspect_ratio,
        "technology_factor" => tech_factor,
    }

    fn validate(&self) -> Result<(), WeightError> {
        positive(self.name(), "takeoff_mass", self.takeoff_mass_kg)?;
        positive(self.name(), "wing_area", self.area_m2)?;
        positive(self.name(), "load_factor", self.ultimate_load_factor)?;
        positive(self.name(), "aspect_ratio", self.aspect_ratio)
    }

    fn nominal_weight(&self) -> f64 {
        let pounds = 0.04674
            * kg_to_lb(self.takeoff_mass_kg).powf(0.397)
            * m2_to_ft2(self.area_m2).powf(0.360)
            * self.ultimate_load_factor.powf(0.397)
            * self.aspect_ratio.powf(1.712);
        pounds * KG_PER_LB
    }

    fn nominal_partials(&self) -> BTreeMap<&'static str, f64> {
        let w = self.nominal_weight();
        BTreeMap::from([
            ("takeoff_mass", 0.397 * w / self.takeoff_mass_kg),
            ("wing_area", 0.360 * w / self.area_m2),
            ("load_factor", 0.397 * w / self.ultimate_load_factor),
            ("aspect_ratio", 1.712 * w / self.aspect_ratio),
        ])
    }
}

/// Landing gear as a fixed fraction of take-off mass.
#[derive(Debug, Clone, PartialEq)]
pub struct LandingGearWeight {
    pub takeoff_mass_kg: f64,
    pub tech_factor: f64,
}

impl WeightModel for LandingGearWeight {
    fn name(&self) -> &'static str {
        "landing_gear"
    }

    fn technology_factor(&self) -> f64 {
        self.tech_factor
    }

    weight_inputs! {
        "takeoff_mass" => takeoff_mass_kg,
        "technology_factor" => tech_factor,
    }

    fn validate(&self) -> Result<(), WeightError> {
        positive(self.name(), "takeoff_mass", self.takeoff_mass_kg)
    }

    fn nominal_weight(&self) -> f64 {
        0.0325 * self.takeoff_mass_kg
    }

    fn nominal_partials(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([("takeoff_mass", 0.0325)])
    }
}

/// Battery mass needed to store `energy_j` usable joules.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryWeight {
    pub energy_j: f64,
    /// Cell-level specific energy (J/kg).
    pub specific_energy_j_kg: f64,
    pub efficiency: f64,
    pub depth_of_discharge: f64,
    pub tech_factor: f64,
}

impl WeightModel for BatteryWeight {
    fn name(&self) -> &'static str {
        "battery"
    }

    fn technology_factor(&self) -> f64 {
        self.tech_factor
    }

    weight_inputs! {
        "energy" => energy_j,
        "specific_energy" => specific_energy_j_kg,
        "efficiency" => efficiency,
        "depth_of_discharge" => depth_of_discharge,
        "technology_factor" => tech_factor,
    }

    fn validate(&self) -> Result<(), WeightError> {
        non_negative(self.name(), "energy", self.energy_j)?;
        positive(self.name(), "specific_energy", self.specific_energy_j_kg)?;
        for (name, value) in [
            ("efficiency", self.efficiency),
            ("depth_of_discharge", self.depth_of_discharge),
        ] {
            positive(self.name(), name, value)?;
            if value > 1.0 {
                return Err(WeightError::Domain {
                    model: self.name(),
                    reason: format!("{name} = {value} must not exceed 1"),
                });
            }
        }
        Ok(())
    }

    fn nominal_weight(&self) -> f64 {
        self.energy_j / (self.specific_energy_j_kg * self.efficiency * self.depth_of_discharge)
    }

    fn nominal_partials(&self) -> BTreeMap<&'static str, f64> {
        let w = self.nominal_weight();
        let denominator = self.specific_energy_j_kg * self.efficiency * self.depth_of_discharge;
        BTreeMap::from([
            ("energy", 1.0 / denominator),
            ("specific_energy", -w / self.specific_energy_j_kg),
            ("efficiency", -w / self.efficiency),
            ("depth_of_discharge", -w / self.depth_of_discharge),
        ])
    }
}

/// Electric motors sized by peak shaft power per motor.
#[derive(Debug, Clone, PartialEq)]
pub struct MotorWeight {
    pub max_power_w: f64,
    pub count: f64,
    pub tech_factor: f64,
}

impl WeightModel for MotorWeight {
    fn name(&self) -> &'static str {
        "motor"
    }

    fn technology_factor(&self) -> f64 {
        self.tech_factor
    }

    weight_inputs! {
        "max_power" => max_power_w,
        "count" => count,
        "technology_factor" => tech_factor,
    }

    fn validate(&self) -> Result<(), WeightError> {
        non_negative(self.name(), "max_power", self.max_power_w)?;
        positive(self.name(), "count", self.count)
    }

    fn nominal_weight(&self) -> f64 {
        self.count * (0.188 * self.max_power_w / 1_000.0 + 5.836)
    }

    fn nominal_partials(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("max_power", self.count * 0.188 / 1_000.0),
            ("count", 0.188 * self.max_power_w / 1_000.0 + 5.836),
        ])
    }
}

/// Motor controllers sized by total installed power.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerWeight {
    pub total_power_w: f64,
    /// Controller specific power (W/kg).
    pub specific_power_w_kg: f64,
    pub tech_factor: f64,
}

impl WeightModel for ControllerWeight {
    fn name(&self) -> &'static str {
        "controller"
    }

    fn technology_factor(&self) -> f64 {
        self.tech_factor
    }

    weight_inputs! {
        "total_power" => total_power_w,
        "specific_power" => specific_power_w_kg,
        "technology_factor" => tech_factor,
    }

    fn validate(&self) -> Result<(), WeightError> {
        non_negative(self.name(), "total_power", self.total_power_w)?;
        positive(self.name(), "specific_power", self.specific_power_w_kg)
    }

    fn nominal_weight(&self) -> f64 {
        self.total_power_w / self.specific_power_w_kg
    }

    fn nominal_partials(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("total_power", 1.0 / self.specific_power_w_kg),
            ("specific_power", -self.nominal_weight() / self.specific_power_w_kg),
        ])
    }
}

/// Rotor blades and hubs from per-rotor power, diameter and blade count.
#[derive(Debug, Clone, PartialEq)]
pub struct RotorWeight {
    /// Peak shaft power per rotor (W).
    pub power_w: f64,
    pub diameter_m: f64,
    pub blades: f64,
    pub count: f64,
    pub tech_factor: f64,
}

impl WeightModel for RotorWeight {
    fn name(&self) -> &'static str {
        "rotor"
    }

    fn technology_factor(&self) -> f64 {
        self.tech_factor
    }

    weight_inputs! {
        "power" => power_w,
        "diameter" => diameter_m,
        "blades" => blades,
        "count" => count,
        "technology_factor" => tech_factor,
    }

    fn validate(&self) -> Result<(), WeightError> {
        positive(self.name(), "power", self.power_w)?;
        positive(self.name(), "diameter", self.diameter_m)?;
        positive(self.name(), "blades", self.blades)?;
        positive(self.name(), "count", self.count)
    }

    fn nominal_weight(&self) -> f64 {
        let group = w_to_hp(self.power_w) * m_to_ft(self.diameter_m) * self.blades.sqrt();
        0.108 * self.count * group.powf(0.78174) * KG_PER_LB
    }

    fn nominal_partials(&self) -> BTreeMap<&'static str, f64> {
        let w = self.nominal_weight();
        BTreeMap::from([
            ("power", 0.78174 * w / self.power_w),
            ("diameter", 0.78174 * w / self.diameter_m),
            ("blades", 0.5 * 0.78174 * w / self.blades),
            ("count", w / self.count),
        ])
    }
}

/// Installed avionics from the uninstalled equipment mass.
#[derive(Debug, Clone, PartialEq)]
pub struct AvionicsWeight {
    pub uninstalled_mass_kg: f64,
    pub tech_factor: f64,
}

impl WeightModel for AvionicsWeight {
    fn name(&self) -> &'static str {
        "avionics"
    }

    fn technology_factor(&self) -> f64 {
        self.tech_factor
    }

    weight_inputs! {
        "uninstalled_mass" => uninstalled_mass_kg,
        "technology_factor" => tech_factor,
    }

    fn validate(&self) -> Result<(), WeightError> {
        positive(self.name(), "uninstalled_mass", self.uninstalled_mass_kg)
    }

    fn nominal_weight(&self) -> f64 {
        2.117 * kg_to_lb(self.uninstalled_mass_kg).powf(0.933) * KG_PER_LB
    }

    fn nominal_partials(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([(
            "uninstalled_mass",
            0.933 * self.nominal_weight() / self.uninstalled_mass_kg,
        )])
    }
}

/// Flight control system from fuselage length, span, load factor and take-off mass.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightControlWeight {
    pub fuselage_length_m: f64,
    pub span_m: f64,
    pub ultimate_load_factor: f64,
    pub takeoff_mass_kg: f64,
    pub tech_factor: f64,
}

impl WeightModel for FlightControlWeight {
    fn name(&self) -> &'static str {
        "flight_control"
    }

    fn technology_factor(&self) -> f64 {
        self.tech_factor
    }

    weight_inputs! {
        "fuselage_length" => fuselage_length_m,
        "span" => span_m,
        "load_factor" => ultimate_load_factor,
        "takeoff_mass" => takeoff_mass_kg,
        "technology_factor" => tech_factor,
    }

    fn validate(&self) -> Result<(), WeightError> {
        positive(self.name(), "fuselage_length", self.fuselage_length_m)?;
        positive(self.name(), "span", self.span_m)?;
        positive(self.name(), "load_factor", self.ultimate_load_factor)?;
        positive(self.name(), "takeoff_mass", self.takeoff_mass_kg)
    }

    fn nominal_weight(&self) -> f64 {
        let pounds = 0.053
            * m_to_ft(self.fuselage_length_m).powf(1.536)
            * m_to_ft(self.span_m).powf(0.371)
            * (self.ultimate_load_factor * kg_to_lb(self.takeoff_mass_kg) * 1e-4).powf(0.80);
        pounds * KG_PER_LB
    }

    fn nominal_partials(&self) -> BTreeMap<&'static str, f64> {
        let w = self.nominal_weight();
        BTreeMap::from([
            ("fuselage_length", 1.536 * w / self.fuselage_length_m),
            ("span", 0.371 * w / self.span_m),
            ("load_factor", 0.80 * w / self.ultimate_load_factor),
            ("takeoff_mass", 0.80 * w / self.takeoff_mass_kg),
        ])
    }
}

/// Seats and interior; only defined above roughly 507 kg take-off mass.
#[derive(Debug, Clone, PartialEq)]
pub struct FurnishingsWeight {
    pub takeoff_mass_kg: f64,
    pub tech_factor: f64,
}

impl WeightModel for FurnishingsWeight {
    fn name(&self) -> &'static str {
        "furnishings"
    }

    fn technology_factor(&self) -> f64 {
        self.tech_factor
    }

    weight_inputs! {
        "takeoff_mass" => takeoff_mass_kg,
        "technology_factor" => tech_factor,
    }

    fn validate(&self) -> Result<(), WeightError> {
        positive(self.name(), "takeoff_mass", self.takeoff_mass_kg)?;
        let pounds = 0.0582 * kg_to_lb(self.takeoff_mass_kg) - 65.0;
        if pounds > 0.0 {
            Ok(())
        } else {
            Err(WeightError::Domain {
                model: self.name(),
                reason: format!(
                    "regression is non-positive at take-off mass {} kg",
                    self.takeoff_mass_kg
                ),
            })
        }
    }

    fn nominal_weight(&self) -> f64 {
        (0.0582 * kg_to_lb(self.takeoff_mass_kg) - 65.0) * KG_PER_LB
    }

    fn nominal_partials(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([("takeoff_mass", 0.0582)])
    }
}

/// Anti-icing provisions as a fixed fraction of take-off mass.
#[derive(Debug, Clone, PartialEq)]
pub struct AntiIcingWeight {
    pub takeoff_mass_kg: f64,
    pub tech_factor: f64,
}

impl WeightModel for AntiIcingWeight {
    fn name(&self) -> &'static str {
        "anti_icing"
    }

    fn technology_factor(&self) -> f64 {
        self.tech_factor
    }

    weight_inputs! {
        "takeoff_mass" => takeoff_mass_kg,
        "technology_factor" => tech_factor,
    }

    fn validate(&self) -> Result<(), WeightError> {
        positive(self.name(), "takeoff_mass", self.takeoff_mass_kg)
    }

    fn nominal_weight(&self) -> f64 {
        0.002 * self.takeoff_mass_kg
    }

    fn nominal_partials(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([("takeoff_mass", 0.002)])
    }
}
