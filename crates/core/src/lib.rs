//! Core units, constants, and shared primitives for the eVTOL sizing workspace.

pub mod atmosphere;
pub mod component;
pub mod roots;

pub use atmosphere::{
    AtmosphereError, AtmosphereModel, AtmosphereState, compute_constants, compute_constants_named,
    gravity,
};
pub use component::{Component, MissingVariable, Partials, Vars, central_difference};
pub use roots::{BrentOptions, Root, RootError, brent};

/// Physical constants expressed in SI units (unless stated otherwise).
pub mod constants {
    /// Standard gravity at sea level (m/s²).
    pub const G0: f64 = 9.80665;
    /// Effective Earth radius used by the 1976 standard atmosphere (m).
    pub const EARTH_RADIUS_M: f64 = 6_356_766.0;
    /// Specific gas constant of dry air (J/(kg·K)).
    pub const R_AIR: f64 = 287.053_07;
    /// Ratio of specific heats for air.
    pub const GAMMA_AIR: f64 = 1.4;
    /// Sea-level standard temperature (K).
    pub const T0_K: f64 = 288.15;
    /// Sea-level standard pressure (Pa).
    pub const P0_PA: f64 = 101_325.0;
    /// Sutherland reference viscosity at `SUTHERLAND_T_REF_K` (Pa·s).
    pub const SUTHERLAND_MU_REF: f64 = 1.716e-5;
    /// Sutherland reference temperature (K).
    pub const SUTHERLAND_T_REF_K: f64 = 273.15;
    /// Sutherland constant for air (K).
    pub const SUTHERLAND_S_K: f64 = 110.4;
    /// Seconds per hour.
    pub const SECONDS_PER_HOUR: f64 = 3_600.0;
}

/// Unit conversion factors and helpers. The model boundary is always SI; these are used
/// internally by regressions calibrated in imperial units.
pub mod units {
    /// Kilograms per pound-mass.
    pub const KG_PER_LB: f64 = 0.453_592_37;
    /// Metres per foot.
    pub const M_PER_FT: f64 = 0.3048;
    /// Watts per mechanical horsepower.
    pub const W_PER_HP: f64 = 745.699_871_582_270_2;
    /// Joules per watt-hour.
    pub const J_PER_WH: f64 = 3_600.0;
    /// Metres per second per knot.
    pub const MS_PER_KT: f64 = 1_852.0 / 3_600.0;

    #[inline]
    pub fn kg_to_lb(v: f64) -> f64 {
        v / KG_PER_LB
    }

    #[inline]
    pub fn lb_to_kg(v: f64) -> f64 {
        v * KG_PER_LB
    }

    #[inline]
    pub fn m_to_ft(v: f64) -> f64 {
        v / M_PER_FT
    }

    #[inline]
    pub fn ft_to_m(v: f64) -> f64 {
        v * M_PER_FT
    }

    #[inline]
    pub fn m2_to_ft2(v: f64) -> f64 {
        v / (M_PER_FT * M_PER_FT)
    }

    #[inline]
    pub fn w_to_hp(v: f64) -> f64 {
        v / W_PER_HP
    }

    #[inline]
    pub fn wh_to_j(v: f64) -> f64 {
        v * J_PER_WH
    }

    #[inline]
    pub fn j_to_wh(v: f64) -> f64 {
        v / J_PER_WH
    }

    #[inline]
    pub fn kt_to_ms(v: f64) -> f64 {
        v * MS_PER_KT
    }

    #[inline]
    pub fn rpm_to_rad_s(rpm: f64) -> f64 {
        rpm * std::f64::consts::PI / 30.0
    }

    #[inline]
    pub fn rad_s_to_rpm(omega: f64) -> f64 {
        omega * 30.0 / std::f64::consts::PI
    }
}
