use approx::assert_relative_eq;
use evtol_mdo::airfoil::LinearAirfoil;
use evtol_mdo::common::{AtmosphereModel, AtmosphereState, Component, Vars, compute_constants};
use evtol_mdo::rotor::{
    Bemt, FlowCondition, LinearBlade, RotorComponent, RotorError, RotorGeometry, TrimOptions,
};
use std::error::Error;
use std::sync::Arc;

const RADIUS_M: f64 = 4.20624;

fn sea_level() -> Result<AtmosphereState, Box<dyn Error>> {
    Ok(compute_constants(0.0, AtmosphereModel::UsStandard1976)?)
}

fn lift_rotor() -> Result<Bemt, RotorError> {
    let blade = LinearBlade {
        root_chord_m: 0.35,
        tip_chord_m: 0.20,
        root_pitch_deg: 14.0,
        tip_pitch_deg: 4.0,
        station_count: 20,
    };
    let geometry = RotorGeometry::from_linear(
        3,
        2.0 * RADIUS_M,
        0.15 * RADIUS_M,
        &blade,
        Arc::new(LinearAirfoil::naca0012()),
    )?;
    Ok(Bemt::new(geometry))
}

fn trim_options() -> TrimOptions {
    TrimOptions {
        rpm_bounds: (20.0, 1_500.0),
        rel_tol: 1e-10,
        ..TrimOptions::default()
    }
}

#[test]
fn element_widths_cover_the_blade() -> Result<(), Box<dyn Error>> {
    let bemt = lift_rotor()?;
    let geometry = bemt.geometry();
    let span: f64 = geometry.element_widths_m().iter().sum();
    assert_relative_eq!(span, RADIUS_M - 0.15 * RADIUS_M, max_relative = 1e-12);
    assert_eq!(geometry.stations().len(), 20);
    assert!(geometry.solidity() > 0.0 && geometry.solidity() < 0.2);
    Ok(())
}

#[test]
fn hover_loads_are_physical() -> Result<(), Box<dyn Error>> {
    let air = sea_level()?;
    let bemt = lift_rotor()?;
    let slow = bemt.run(&FlowCondition::hover(250.0, &air))?;
    let fast = bemt.run(&FlowCondition::hover(400.0, &air))?;
    assert!(slow.thrust_n > 0.0 && slow.power_w > 0.0);
    assert!(fast.thrust_n > slow.thrust_n);
    assert!(fast.power_w > slow.power_w);
    assert!(fast.figure_of_merit > 0.3 && fast.figure_of_merit < 1.0);
    assert!(fast.propulsive_efficiency.is_nan());
    assert_eq!(fast.clamped_stations(), 0);
    Ok(())
}

#[test]
fn rpm_trim_reproduces_the_target() -> Result<(), Box<dyn Error>> {
    let air = sea_level()?;
    let bemt = lift_rotor()?;
    let flow = FlowCondition::hover(1_000.0, &air);
    let target = 3_500.0;
    let trim = bemt.trim_rpm(target, &flow, &trim_options())?;
    assert_relative_eq!(trim.result.thrust_n, target, max_relative = 1e-9);
    assert!(trim.rpm > 20.0 && trim.rpm < 1_500.0);

    // The reported state is the rotor evaluated at the trimmed RPM.
    let direct = bemt.run(&flow.with_rpm(trim.rpm))?;
    assert_eq!(direct.thrust_n, trim.result.thrust_n);
    assert_eq!(direct.power_w, trim.result.power_w);
    assert_eq!(direct.stations, trim.result.stations);
    Ok(())
}

#[test]
fn collective_trim_in_edgewise_flight() -> Result<(), Box<dyn Error>> {
    let air = sea_level()?;
    let bemt = lift_rotor()?;
    let flow = FlowCondition::axial(45.0, 450.0, &air).with_incidence(5.0);
    let target = 3_600.0;
    let trim = bemt.trim_collective(target, &flow, &trim_options())?;
    assert_eq!(trim.rpm, 450.0);
    assert_relative_eq!(trim.result.thrust_n, target, max_relative = 1e-9);
    let direct = bemt.run_with_collective(&flow, trim.collective_deg)?;
    assert_eq!(direct.thrust_n, trim.result.thrust_n);
    assert_eq!(direct.torque_nm, trim.result.torque_nm);
    Ok(())
}

#[test]
fn unreachable_thrust_is_a_convergence_error() -> Result<(), Box<dyn Error>> {
    let air = sea_level()?;
    let bemt = lift_rotor()?;
    let err = bemt
        .trim_rpm(1.0e7, &FlowCondition::hover(1_000.0, &air), &trim_options())
        .unwrap_err();
    assert!(err.is_convergence());
    assert!(matches!(
        err,
        RotorError::TargetOutOfRange { variable: "rpm", .. }
    ));
    Ok(())
}

#[test]
fn invalid_flow_is_a_domain_error() -> Result<(), Box<dyn Error>> {
    let air = sea_level()?;
    let bemt = lift_rotor()?;
    let err = bemt.run(&FlowCondition::hover(-10.0, &air)).unwrap_err();
    assert!(matches!(err, RotorError::Domain(_)));
    assert!(!err.is_convergence());
    Ok(())
}

#[test]
fn component_matches_direct_trim() -> Result<(), Box<dyn Error>> {
    let air = sea_level()?;
    let bemt = lift_rotor()?;
    let flow = FlowCondition::axial(0.0, 1_000.0, &air);
    let component = RotorComponent::new(bemt.clone(), flow, trim_options());
    assert_eq!(component.input_names(), vec!["thrust", "speed"]);

    let inputs = Vars::new().with("thrust", 3_000.0).with("speed", 2.5);
    let outputs = component.evaluate(&inputs)?;
    let direct = bemt.trim_rpm(3_000.0, &flow.with_speed(2.5), &trim_options())?;
    assert_eq!(outputs.get("rpm"), Some(direct.rpm));
    assert_eq!(outputs.get("power"), Some(direct.result.power_w));
    assert_eq!(outputs.get("torque"), Some(direct.result.torque_nm));

    let partials = component.jacobian(&inputs)?;
    let dpower_dthrust = partials.get("power", "thrust").unwrap_or(f64::NAN);
    assert!(dpower_dthrust > 0.0);

    let missing = component.evaluate(&Vars::new().with("thrust", 3_000.0));
    assert!(matches!(missing, Err(RotorError::MissingInput(_))));
    Ok(())
}
