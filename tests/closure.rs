use approx::assert_relative_eq;
use evtol_mdo::config::{CaseConfig, SolverMethod, load_case};
use evtol_mdo::sizing::{
    ClosureProblem, ClosureSolver, ErrorKind, RotorRole, SizingError, SolverState, case_catalog,
};
use nalgebra::Vector2;
use std::error::Error;

fn problem_for(case: &CaseConfig) -> Result<ClosureProblem, Box<dyn Error>> {
    let catalog = case_catalog(case)?;
    Ok(ClosureProblem::from_case(case, &catalog)?)
}

#[test]
fn multirotor_closes_by_substitution() -> Result<(), Box<dyn Error>> {
    let case = load_case("configs/cases/multirotor.yaml")?;
    let problem = problem_for(&case)?;
    let mut solver = ClosureSolver::new(case.solver.clone());
    let result = solver.solve(&problem)?;

    assert_eq!(solver.state(), SolverState::Converged);
    assert_eq!(result.method, SolverMethod::FixedPoint);
    assert_relative_eq!(result.takeoff_mass_kg(), 1447.5, max_relative = 0.02);
    assert!(result.residual_kg.abs() <= 1e-6 * result.takeoff_mass_kg());
    assert_eq!(result.iterations, result.history.len());
    assert!(result.iterations > 2 && result.iterations < 30);

    let breakdown = &result.breakdown;
    let sum = breakdown.payload_kg
        + breakdown.battery_kg
        + breakdown.propulsion_kg()
        + breakdown.structure_kg()
        + breakdown.equipment_kg();
    assert_relative_eq!(sum, breakdown.takeoff_kg, max_relative = 1e-12);
    assert!(breakdown.structure.get("wing").is_none());
    for segment in &result.performance {
        for group in &segment.groups {
            assert_eq!(group.clamped_stations, 0, "{} clamped stations", segment.segment);
        }
    }

    let last = solver.history().last().ok_or("empty history")?;
    assert_eq!(last.state, SolverState::Converged);
    assert_eq!(last.relaxation, 0.0);
    Ok(())
}

#[test]
fn newton_agrees_with_substitution() -> Result<(), Box<dyn Error>> {
    let mut case = load_case("configs/cases/multirotor.yaml")?;
    let problem = problem_for(&case)?;
    let fixed = ClosureSolver::new(case.solver.clone()).solve(&problem)?;

    case.solver.method = SolverMethod::Newton;
    let mut newton = ClosureSolver::new(case.solver.clone());
    let result = newton.solve(&problem)?;
    assert_eq!(newton.state(), SolverState::Converged);
    assert_relative_eq!(
        result.takeoff_mass_kg(),
        fixed.takeoff_mass_kg(),
        max_relative = 1e-3
    );
    assert!(result.iterations <= fixed.iterations);
    Ok(())
}

#[test]
fn jacobian_matches_finite_differences() -> Result<(), Box<dyn Error>> {
    let case = load_case("configs/cases/multirotor.yaml")?;
    let problem = problem_for(&case)?;
    let w = 1500.0;
    let battery = problem.step(w)?.breakdown.battery_kg;
    let x = Vector2::new(w, battery);

    let jacobian = problem.jacobian(x)?;
    let h = 1e-3 * w;
    let column = (problem.residual(x + Vector2::new(h, 0.0))?
        - problem.residual(x - Vector2::new(h, 0.0))?)
        / (2.0 * h);
    assert_relative_eq!(jacobian[(0, 0)], column[0], epsilon = 1e-3, max_relative = 2e-2);
    assert_relative_eq!(jacobian[(1, 0)], column[1], epsilon = 1e-3, max_relative = 2e-2);
    assert_eq!(jacobian[(0, 1)], -1.0);
    assert_eq!(jacobian[(1, 1)], 1.0);
    Ok(())
}

#[test]
fn jacobian_falls_back_to_one_sided_difference_at_the_trim_limit() -> Result<(), Box<dyn Error>> {
    let mut case = load_case("configs/cases/multirotor.yaml")?;
    case.mission.retain(|segment| segment.kind.is_hover());
    case.vehicle.lift_rotor.rpm_range = [20.0, 300.0];
    let problem = problem_for(&case)?;

    // Heaviest mass the capped rotors can still trim.
    let (mut lo, mut hi) = (500.0, 5_000.0);
    assert!(problem.performance(lo).is_ok());
    assert!(problem.performance(hi).is_err());
    while hi - lo > 1e-5 * lo {
        let mid = 0.5 * (lo + hi);
        if problem.performance(mid).is_ok() {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let h = 1e-4 * lo;
    assert!(problem.performance(lo + h).is_err());
    assert!(problem.performance(lo - h).is_ok());

    let x = Vector2::new(lo, problem.step(lo)?.breakdown.battery_kg);
    let jacobian = problem.jacobian(x)?;
    assert!(jacobian.iter().all(|v| v.is_finite()));

    let back = 1e-3 * lo;
    let column = (problem.residual(x)? - problem.residual(x - Vector2::new(back, 0.0))?) / back;
    assert_relative_eq!(jacobian[(0, 0)], column[0], epsilon = 1e-3, max_relative = 5e-2);
    assert_relative_eq!(jacobian[(1, 0)], column[1], epsilon = 1e-3, max_relative = 5e-2);
    Ok(())
}

#[test]
fn advance_ratio_conflicts_with_a_segment_rpm_pin() -> Result<(), Box<dyn Error>> {
    let mut case = load_case("configs/cases/multirotor.yaml")?;
    case.vehicle.lift_rotor.advance_ratio = Some(0.3);
    let err = problem_for(&case)?
        .step(1_500.0)
        .err()
        .ok_or("conflicting rpm pin was accepted")?;
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("cruise"));

    for segment in &mut case.mission {
        segment.lift_rotor_rpm = None;
    }
    let cruise = case
        .mission
        .iter()
        .find(|segment| segment.name == "cruise")
        .ok_or("no cruise segment")?
        .to_segment()?;
    let step = problem_for(&case)?.step(1_500.0)?;
    let performance = step
        .performance
        .iter()
        .find(|p| p.segment == "cruise")
        .ok_or("no cruise performance")?;
    let radius = case.vehicle.lift_rotor.radius_m;
    let tip_speed = performance.groups[0].rpm * std::f64::consts::PI / 30.0 * radius;
    assert_relative_eq!(0.3 * tip_speed, cruise.speed_m_s, max_relative = 1e-9);
    Ok(())
}

#[test]
fn result_table_reports_every_segment() -> Result<(), Box<dyn Error>> {
    let case = load_case("configs/cases/multirotor.yaml")?;
    let problem = problem_for(&case)?;
    let result = ClosureSolver::new(case.solver.clone()).solve(&problem)?;
    let table = result.to_table();

    for key in [
        "Weight|takeoff",
        "Weight|battery",
        "Weight|payload",
        "Energy|total",
        "Solver|iterations",
        "Solver|residual",
    ] {
        assert!(table.contains_key(key), "missing {key}");
    }
    for segment in ["takeoff", "cruise", "landing", "reserve"] {
        assert!(table.contains_key(&format!("Power|LiftRotor|{segment}")));
        assert!(table.contains_key(&format!("Energy|{segment}")));
    }
    assert!(table.contains_key("FigureOfMerit|LiftRotor|reserve"));
    assert!(!table.contains_key("FigureOfMerit|LiftRotor|cruise"));
    assert_eq!(table["Weight|takeoff"], result.takeoff_mass_kg());

    let cruise = result
        .performance
        .iter()
        .find(|segment| segment.segment == "cruise")
        .ok_or("no cruise segment")?;
    let rotor = cruise.group(RotorRole::LiftRotor).ok_or("no lift rotor")?;
    assert_relative_eq!(rotor.rpm, 450.0);
    Ok(())
}

#[test]
fn long_range_multirotor_diverges() -> Result<(), Box<dyn Error>> {
    let mut case = load_case("configs/cases/multirotor.yaml")?;
    let cruise = case
        .mission
        .iter_mut()
        .find(|segment| segment.name == "cruise")
        .ok_or("no cruise segment")?;
    cruise.distance_m = Some(600_000.0);

    let problem = problem_for(&case)?;
    let mut solver = ClosureSolver::new(case.solver.clone());
    let err = solver.solve(&problem).err().ok_or("600 km should not close")?;
    assert_eq!(err.kind(), ErrorKind::Diverged);
    assert!(matches!(err, SizingError::Diverged { .. }));
    assert_eq!(solver.state(), SolverState::Diverged);
    assert!(!solver.history().is_empty());
    Ok(())
}

#[test]
fn iteration_budget_is_enforced() -> Result<(), Box<dyn Error>> {
    let mut case = load_case("configs/cases/multirotor.yaml")?;
    case.solver.max_iterations = 2;
    let problem = problem_for(&case)?;
    let mut solver = ClosureSolver::new(case.solver.clone());

    match solver.solve(&problem) {
        Err(SizingError::MaxIterExceeded { iterations, .. }) => assert_eq!(iterations, 2),
        other => return Err(format!("expected MaxIterExceeded, got {other:?}").into()),
    }
    assert_eq!(solver.state(), SolverState::MaxIterExceeded);
    assert_eq!(solver.history().len(), 2);
    Ok(())
}

#[test]
fn invalid_solver_settings_are_rejected() -> Result<(), Box<dyn Error>> {
    let mut case = load_case("configs/cases/multirotor.yaml")?;
    case.solver.relaxation = 1.5;
    let problem = problem_for(&case)?;
    let mut solver = ClosureSolver::new(case.solver.clone());
    let err = solver.solve(&problem).err().ok_or("relaxation 1.5 accepted")?;
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(solver.state(), SolverState::Initialized);
    Ok(())
}

#[test]
fn lift_plus_cruise_closes() -> Result<(), Box<dyn Error>> {
    let case = load_case("configs/cases/lift_plus_cruise.toml")?;
    let problem = problem_for(&case)?;
    let result = ClosureSolver::new(case.solver.clone()).solve(&problem)?;

    assert_relative_eq!(result.takeoff_mass_kg(), 1364.5, max_relative = 0.02);
    let breakdown = &result.breakdown;
    assert!(breakdown.structure.get("wing").is_some_and(|kg| *kg > 0.0));
    assert!(breakdown.propulsion.contains_key("motor|Propeller"));

    let cruise = result
        .performance
        .iter()
        .find(|segment| segment.segment == "cruise")
        .ok_or("no cruise segment")?;
    assert!(cruise.group(RotorRole::LiftRotor).is_none());
    let propeller = cruise.group(RotorRole::Propeller).ok_or("no propeller")?;
    assert_relative_eq!(propeller.thrust_per_rotor_n, cruise.drag_n, max_relative = 1e-6);
    Ok(())
}
