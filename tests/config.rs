use evtol_mdo::config::{
    ConfigError, SolverMethod, ToleranceKind, TopologyKind, load_case, load_cases, parse_case_yaml,
};
use std::error::Error;
use std::fs;

#[test]
fn bundled_cases_load() -> Result<(), Box<dyn Error>> {
    let quad = load_case("configs/cases/multirotor.yaml")?;
    assert_eq!(quad.name, "quad_air_taxi");
    assert_eq!(quad.vehicle.topology, TopologyKind::Multirotor);
    assert_eq!(quad.mission.len(), 4);
    assert_eq!(quad.mission[1].lift_rotor_rpm, Some(450.0));
    assert_eq!(quad.solver.initial_takeoff_mass_kg, 2_500.0);

    let lpc = load_case("configs/cases/lift_plus_cruise.toml")?;
    assert_eq!(lpc.vehicle.topology, TopologyKind::LiftPlusCruise);
    assert_eq!(lpc.vehicle.battery.efficiency, 0.9);
    assert_eq!(lpc.vehicle.lift_rotor.airfoil, "NACA0012");
    assert!(lpc.vehicle.wing.is_some() && lpc.vehicle.propeller.is_some());
    assert_eq!(lpc.solver.method, SolverMethod::FixedPoint);
    assert_eq!(lpc.solver.tolerance_kind, ToleranceKind::Relative);

    let all = load_cases("configs/cases")?;
    assert_eq!(all.len(), 2);
    Ok(())
}

#[test]
fn misspelled_keys_are_rejected() -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string("configs/cases/multirotor.yaml")?;
    let typo = text.replace("payload_kg", "payload_mass");
    assert!(matches!(parse_case_yaml(&typo), Err(ConfigError::Parse(_))));
    Ok(())
}

#[test]
fn airfoil_dir_resolves_against_the_case_file() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let text = fs::read_to_string("configs/cases/multirotor.yaml")?;
    let path = dir.path().join("case.yaml");
    fs::write(&path, format!("{text}\nairfoil_dir: polars\n"))?;

    let case = load_case(&path)?;
    assert_eq!(case.airfoil_dir, Some(dir.path().join("polars")));
    Ok(())
}

#[test]
fn case_lists_need_load_cases() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let text = fs::read_to_string("configs/cases/multirotor.yaml")?;
    let indented: String = text
        .lines()
        .filter(|line| !line.starts_with('#'))
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("- {line}\n")
            } else {
                format!("  {line}\n")
            }
        })
        .collect();
    let path = dir.path().join("pair.yaml");
    fs::write(&path, format!("{indented}{indented}"))?;

    assert_eq!(load_cases(&path)?.len(), 2);
    assert!(matches!(
        load_case(&path),
        Err(ConfigError::NotSingle { count: 2, .. })
    ));
    Ok(())
}
