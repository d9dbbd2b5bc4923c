use approx::assert_relative_eq;
use evtol_mdo::common::constants::G0;
use evtol_mdo::common::units::{
    ft_to_m, j_to_wh, kg_to_lb, lb_to_kg, m_to_ft, rad_s_to_rpm, rpm_to_rad_s, wh_to_j,
};
use evtol_mdo::common::{AtmosphereError, AtmosphereModel, compute_constants, compute_constants_named};
use std::error::Error;

#[test]
fn sea_level_standard_day() -> Result<(), Box<dyn Error>> {
    let state = compute_constants(0.0, AtmosphereModel::UsStandard1976)?;
    assert_eq!(state.gravity_m_s2, G0);
    assert_relative_eq!(state.temperature_k, 288.15, epsilon = 1e-9);
    assert_relative_eq!(state.pressure_pa, 101_325.0, epsilon = 1e-6);
    assert_relative_eq!(state.density_kg_m3, 1.225, max_relative = 1e-4);
    assert_relative_eq!(state.dynamic_viscosity_pa_s, 1.789e-5, max_relative = 1e-3);
    assert_relative_eq!(state.speed_of_sound_m_s, 340.29, max_relative = 1e-4);
    Ok(())
}

#[test]
fn density_and_gravity_fall_with_altitude() -> Result<(), Box<dyn Error>> {
    let mut previous = compute_constants(0.0, AtmosphereModel::UsStandard1976)?;
    for altitude in [500.0, 1_000.0, 3_000.0, 11_000.0, 20_000.0] {
        let state = compute_constants(altitude, AtmosphereModel::UsStandard1976)?;
        assert!(state.density_kg_m3 < previous.density_kg_m3);
        assert!(state.gravity_m_s2 < previous.gravity_m_s2);
        previous = state;
    }
    Ok(())
}

#[test]
fn named_models_and_errors() -> Result<(), Box<dyn Error>> {
    let standard = compute_constants_named(1_000.0, "US_Standard_1976")?;
    let isothermal = compute_constants_named(1_000.0, "constant_temperature")?;
    assert_eq!(isothermal.temperature_k, 288.15);
    assert!(standard.temperature_k < isothermal.temperature_k);

    let unknown = compute_constants_named(0.0, "martian");
    assert!(matches!(unknown, Err(AtmosphereError::UnknownModel(_))));
    let too_high = compute_constants(120_000.0, AtmosphereModel::UsStandard1976);
    assert!(matches!(too_high, Err(AtmosphereError::AltitudeOutOfRange { .. })));
    Ok(())
}

#[test]
fn unit_conversions_round_trip() {
    for value in [0.0, 1.0, 123.456, 5_000.0] {
        assert_relative_eq!(lb_to_kg(kg_to_lb(value)), value, max_relative = 1e-12);
        assert_relative_eq!(ft_to_m(m_to_ft(value)), value, max_relative = 1e-12);
        assert_relative_eq!(j_to_wh(wh_to_j(value)), value, max_relative = 1e-12);
        assert_relative_eq!(rad_s_to_rpm(rpm_to_rad_s(value)), value, max_relative = 1e-12);
    }
    assert_relative_eq!(kg_to_lb(1.0), 2.204_622_6, max_relative = 1e-7);
    assert_relative_eq!(m_to_ft(0.3048), 1.0, max_relative = 1e-12);
}
