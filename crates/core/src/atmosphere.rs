//! Constants provider: gravity and atmosphere properties as a function of altitude.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::constants::{
    EARTH_RADIUS_M, G0, GAMMA_AIR, P0_PA, R_AIR, SUTHERLAND_MU_REF, SUTHERLAND_S_K,
    SUTHERLAND_T_REF_K, T0_K,
};

/// Lowest altitude accepted by [`compute_constants`] (m).
pub const MIN_ALTITUDE_M: f64 = -1_000.0;
/// Geometric ceiling of the 1976 standard atmosphere tables (m).
pub const MAX_ALTITUDE_M: f64 = 86_000.0;

/// Layer of the 1976 standard atmosphere, keyed by geopotential altitude.
#[derive(Debug, Clone, Copy)]
struct Layer {
    base_geopotential_m: f64,
    base_temperature_k: f64,
    lapse_rate_k_per_m: f64,
}

const US1976_LAYERS: [Layer; 7] = [
    Layer {
        base_geopotential_m: 0.0,
        base_temperature_k: 288.15,
        lapse_rate_k_per_m: -0.0065,
    },
    Layer {
        base_geopotential_m: 11_000.0,
        base_temperature_k: 216.65,
        lapse_rate_k_per_m: 0.0,
    },
    Layer {
        base_geopotential_m: 20_000.0,
        base_temperature_k: 216.65,
        lapse_rate_k_per_m: 0.001,
    },
    Layer {
        base_geopotential_m: 32_000.0,
        base_temperature_k: 228.65,
        lapse_rate_k_per_m: 0.0028,
    },
    Layer {
        base_geopotential_m: 47_000.0,
        base_temperature_k: 270.65,
        lapse_rate_k_per_m: 0.0,
    },
    Layer {
        base_geopotential_m: 51_000.0,
        base_temperature_k: 270.65,
        lapse_rate_k_per_m: -0.0028,
    },
    Layer {
        base_geopotential_m: 71_000.0,
        base_temperature_k: 214.65,
        lapse_rate_k_per_m: -0.002,
    },
];

/// Atmosphere model selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AtmosphereModel {
    /// Seven-layer piecewise lapse-rate standard atmosphere.
    #[default]
    UsStandard1976,
    /// Isothermal atmosphere at the sea-level standard temperature.
    ConstantTemperature,
}

impl AtmosphereModel {
    /// Canonical configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UsStandard1976 => "US_Standard_1976",
            Self::ConstantTemperature => "constant_temperature",
        }
    }
}

impl fmt::Display for AtmosphereModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AtmosphereModel {
    type Err = AtmosphereError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "US_STANDARD_1976" | "USSA1976" | "STANDARD" => Ok(Self::UsStandard1976),
            "CONSTANT_TEMPERATURE" | "ISOTHERMAL" => Ok(Self::ConstantTemperature),
            _ => Err(AtmosphereError::UnknownModel(s.to_string())),
        }
    }
}

/// Gravity and air properties at a single altitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AtmosphereState {
    pub altitude_m: f64,
    pub model: AtmosphereModel,
    pub gravity_m_s2: f64,
    pub temperature_k: f64,
    pub pressure_pa: f64,
    pub density_kg_m3: f64,
    pub dynamic_viscosity_pa_s: f64,
    pub speed_of_sound_m_s: f64,
}

impl AtmosphereState {
    /// Kinematic viscosity (m²/s).
    pub fn kinematic_viscosity_m2_s(&self) -> f64 {
        self.dynamic_viscosity_pa_s / self.density_kg_m3
    }

    /// Named physical constants, as consumed by result tables.
    pub fn to_table(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("altitude", self.altitude_m),
            ("gravity", self.gravity_m_s2),
            ("temperature", self.temperature_k),
            ("pressure", self.pressure_pa),
            ("density", self.density_kg_m3),
            ("dynamic_viscosity", self.dynamic_viscosity_pa_s),
            ("speed_of_sound", self.speed_of_sound_m_s),
        ])
    }
}

/// Errors raised while resolving environmental constants.
#[derive(Debug, Error, PartialEq)]
pub enum AtmosphereError {
    #[error("configuration error: unknown atmosphere model `{0}`")]
    UnknownModel(String),
    #[error("domain error: altitude {altitude_m} m outside [{min} m, {max} m]")]
    AltitudeOutOfRange { altitude_m: f64, min: f64, max: f64 },
}

/// Gravity from the inverse-square law, `g0 (R / (R + h))²`.
pub fn gravity(altitude_m: f64) -> f64 {
    let ratio = EARTH_RADIUS_M / (EARTH_RADIUS_M + altitude_m);
    G0 * ratio * ratio
}

/// Resolve gravity, temperature, pressure, density and viscosity at `altitude_m`.
pub fn compute_constants(
    altitude_m: f64,
    model: AtmosphereModel,
) -> Result<AtmosphereState, AtmosphereError> {
    if !altitude_m.is_finite() || !(MIN_ALTITUDE_M..=MAX_ALTITUDE_M).contains(&altitude_m) {
        return Err(AtmosphereError::AltitudeOutOfRange {
            altitude_m,
            min: MIN_ALTITUDE_M,
            max: MAX_ALTITUDE_M,
        });
    }

    let (temperature_k, pressure_pa) = match model {
        AtmosphereModel::UsStandard1976 => standard_1976(altitude_m),
        AtmosphereModel::ConstantTemperature => {
            let pressure = P0_PA * (-G0 * altitude_m / (R_AIR * T0_K)).exp();
            (T0_K, pressure)
        }
    };

    let density_kg_m3 = pressure_pa / (R_AIR * temperature_k);
    Ok(AtmosphereState {
        altitude_m,
        model,
        gravity_m_s2: gravity(altitude_m),
        temperature_k,
        pressure_pa,
        density_kg_m3,
        dynamic_viscosity_pa_s: sutherland_viscosity(temperature_k),
        speed_of_sound_m_s: (GAMMA_AIR * R_AIR * temperature_k).sqrt(),
    })
}

/// Resolve constants from a model name; unknown names are configuration errors.
pub fn compute_constants_named(
    altitude_m: f64,
    model: &str,
) -> Result<AtmosphereState, AtmosphereError> {
    compute_constants(altitude_m, model.parse()?)
}

fn sutherland_viscosity(temperature_k: f64) -> f64 {
    SUTHERLAND_MU_REF
        * (temperature_k / SUTHERLAND_T_REF_K).powf(1.5)
        * (SUTHERLAND_T_REF_K + SUTHERLAND_S_K)
        / (temperature_k + SUTHERLAND_S_K)
}

fn standard_1976(altitude_m: f64) -> (f64, f64) {
    let geopotential = EARTH_RADIUS_M * altitude_m / (EARTH_RADIUS_M + altitude_m);

    let mut pressure = P0_PA;
    let mut layer = US1976_LAYERS[0];
    for next in US1976_LAYERS.iter().skip(1) {
        if geopotential < next.base_geopotential_m {
            break;
        }
        pressure = layer_pressure(&layer, pressure, next.base_geopotential_m);
        layer = *next;
    }

    let temperature =
        layer.base_temperature_k + layer.lapse_rate_k_per_m * (geopotential - layer.base_geopotential_m);
    (temperature, layer_pressure(&layer, pressure, geopotential))
}

fn layer_pressure(layer: &Layer, base_pressure: f64, geopotential: f64) -> f64 {
    let dh = geopotential - layer.base_geopotential_m;
    if layer.lapse_rate_k_per_m == 0.0 {
        base_pressure * (-G0 * dh / (R_AIR * layer.base_temperature_k)).exp()
    } else {
        let temperature = layer.base_temperature_k + layer.lapse_rate_k_per_m * dh;
        base_pressure
            * (temperature / layer.base_temperature_k).powf(-G0 / (layer.lapse_rate_k_per_m * R_AIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tropopause_pressure_matches_tables() {
        let (t, p) = standard_1976(11_019.0);
        assert!((t - 216.65).abs() < 0.1, "T = {t}");
        assert!((p - 22_632.0).abs() / 22_632.0 < 2e-3, "p = {p}");
    }

    #[test]
    fn isothermal_layer_keeps_temperature() {
        let (t1, _) = standard_1976(12_000.0);
        let (t2, _) = standard_1976(19_000.0);
        assert_eq!(t1, t2);
    }
}
