use approx::assert_relative_eq;
use evtol_mdo::common::{Component, Vars, central_difference};
use evtol_mdo::weights::{
    AntiIcingWeight, AvionicsWeight, BatteryWeight, ControllerWeight, FlightControlWeight,
    FurnishingsWeight, FuselageWeight, LandingGearWeight, MotorWeight, RotorWeight,
    TECHNOLOGY_FACTOR, WeightComponent, WeightError, WeightModel, WingWeight,
};
use std::error::Error;

/// Representative operating points: (take-off mass kg, power scale, geometry scale, tf).
const INPUT_SETS: [(f64, f64, f64, f64); 3] = [
    (900.0, 0.6, 0.7, 0.6),
    (1_500.0, 1.0, 1.0, 0.9),
    (3_000.0, 2.2, 1.4, 0.95),
];

fn input_vars(model: &dyn WeightModel) -> Vars {
    model
        .inputs()
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

fn assert_partials_match<M: WeightModel + Clone>(model: M) -> Result<(), Box<dyn Error>> {
    let inputs = input_vars(&model);
    let component = WeightComponent::new(model.clone());
    let analytic = component.jacobian(&inputs)?;
    let numeric = central_difference(&component, &inputs, 1e-6)?;
    assert_eq!(analytic.len(), model.inputs().len(), "{}", model.name());
    for (output, input, value) in numeric.iter() {
        let exact = analytic.get(output, input).unwrap_or(f64::NAN);
        assert_relative_eq!(exact, value, max_relative = 1e-5, epsilon = 1e-9);
    }
    Ok(())
}

fn assert_technology_factor_is_linear<M: WeightModel + Clone>(
    model: M,
) -> Result<(), Box<dyn Error>> {
    let mut nominal = model.clone();
    nominal.set_input(TECHNOLOGY_FACTOR, 1.0)?;
    let nominal_kg = nominal.weight()?;
    for tf in [0.25, 0.8, 1.0] {
        let mut scaled = model.clone();
        scaled.set_input(TECHNOLOGY_FACTOR, tf)?;
        assert_relative_eq!(scaled.weight()?, tf * nominal_kg, max_relative = 1e-12);
        assert_relative_eq!(
            scaled.partials()?[TECHNOLOGY_FACTOR],
            nominal_kg,
            max_relative = 1e-12
        );
    }
    Ok(())
}

fn check<M: WeightModel + Clone>(model: M) -> Result<(), Box<dyn Error>> {
    assert_partials_match(model.clone())?;
    assert_technology_factor_is_linear(model)
}

#[test]
fn every_model_matches_finite_differences_and_scales_with_tf() -> Result<(), Box<dyn Error>> {
    for (mass, power, size, tf) in INPUT_SETS {
        check(FuselageWeight {
            takeoff_mass_kg: mass,
            length_m: 9.0 * size,
            perimeter_m: 7.0 * size,
            passengers: (6.0 * size).round(),
            tech_factor: tf,
        })?;
        check(WingWeight {
            takeoff_mass_kg: mass,
            area_m2: 14.0 * size,
            ultimate_load_factor: 5.7,
            aspect_ratio: 9.0 * size,
            tech_factor: tf,
        })?;
        check(LandingGearWeight {
            takeoff_mass_kg: mass,
            tech_factor: tf,
        })?;
        check(BatteryWeight {
            energy_j: 3.0e8 * power,
            specific_energy_j_kg: 9.0e5 * size,
            efficiency: 0.9,
            depth_of_discharge: 0.8,
            tech_factor: tf,
        })?;
        check(MotorWeight {
            max_power_w: 150_000.0 * power,
            count: 4.0,
            tech_factor: tf,
        })?;
        check(ControllerWeight {
            total_power_w: 600_000.0 * power,
            specific_power_w_kg: 20_000.0,
            tech_factor: tf,
        })?;
        check(RotorWeight {
            power_w: 150_000.0 * power,
            diameter_m: 8.4 * size,
            blades: 3.0,
            count: 4.0,
            tech_factor: tf,
        })?;
        check(AvionicsWeight {
            uninstalled_mass_kg: 30.0 * size,
            tech_factor: tf,
        })?;
        check(FlightControlWeight {
            fuselage_length_m: 9.0 * size,
            span_m: 18.8 * size,
            ultimate_load_factor: 5.7,
            takeoff_mass_kg: mass,
            tech_factor: tf,
        })?;
        check(FurnishingsWeight {
            takeoff_mass_kg: mass,
            tech_factor: tf,
        })?;
        check(AntiIcingWeight {
            takeoff_mass_kg: mass,
            tech_factor: tf,
        })?;
    }
    Ok(())
}

#[test]
fn battery_mass_follows_usable_energy() -> Result<(), Box<dyn Error>> {
    let battery = BatteryWeight {
        energy_j: 250.0 * 3_600.0 * 720.0,
        specific_energy_j_kg: 250.0 * 3_600.0,
        efficiency: 0.9,
        depth_of_discharge: 0.8,
        tech_factor: 1.0,
    };
    assert_relative_eq!(battery.weight()?, 1_000.0, max_relative = 1e-12);
    Ok(())
}

#[test]
fn regressions_reject_inputs_outside_their_domain() {
    let furnishings = FurnishingsWeight {
        takeoff_mass_kg: 300.0,
        tech_factor: 1.0,
    };
    assert!(matches!(
        furnishings.weight(),
        Err(WeightError::Domain { model: "furnishings", .. })
    ));

    let motor = MotorWeight {
        max_power_w: 1.0e5,
        count: 4.0,
        tech_factor: 1.5,
    };
    assert!(matches!(motor.weight(), Err(WeightError::Domain { .. })));

    let rotor = RotorWeight {
        power_w: 0.0,
        diameter_m: 3.0,
        blades: 2.0,
        count: 8.0,
        tech_factor: 1.0,
    };
    assert!(matches!(rotor.partials(), Err(WeightError::Domain { .. })));
}

#[test]
fn component_inputs_are_named() -> Result<(), Box<dyn Error>> {
    let mut gear = LandingGearWeight {
        takeoff_mass_kg: 2_000.0,
        tech_factor: 1.0,
    };
    gear.set_input("takeoff_mass", 1_000.0)?;
    assert_relative_eq!(gear.weight()?, 32.5, max_relative = 1e-12);
    assert!(matches!(
        gear.set_input("wingspan", 1.0),
        Err(WeightError::UnknownInput { .. })
    ));

    let component = WeightComponent::new(gear);
    assert_eq!(component.input_names(), vec!["takeoff_mass", "technology_factor"]);
    let out = component.evaluate(&Vars::new().with("takeoff_mass", 2_000.0).with("technology_factor", 0.5))?;
    assert_relative_eq!(out.get("weight").unwrap_or(f64::NAN), 32.5, max_relative = 1e-12);
    Ok(())
}
