use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

#[test]
fn sizes_the_bundled_multirotor_and_writes_outputs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv_path = dir.path().join("out/quad.csv");
    let json_path = dir.path().join("quad.json");

    let output = Command::cargo_bin("evtol-size")
        .expect("evtol-size bin")
        .args([
            "configs/cases/multirotor.yaml",
            "--csv",
            csv_path.to_str().unwrap(),
            "--json",
            json_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).expect("utf8 stdout");
    assert!(stdout.starts_with("Case: quad_air_taxi (fixed_point)"));
    assert!(stdout.contains("Weight|takeoff"), "output:\n{stdout}");

    let mut reader = csv::Reader::from_path(&csv_path).expect("csv output");
    let headers = reader.headers().expect("csv headers").clone();
    assert_eq!(headers.iter().collect::<Vec<_>>(), ["quantity", "value"]);
    let takeoff: f64 = reader
        .records()
        .map(|record| record.expect("csv record"))
        .find(|record| &record[0] == "Weight|takeoff")
        .expect("take-off row")[1]
        .parse()
        .expect("numeric take-off mass");
    assert!((takeoff - 1447.5).abs() < 0.02 * 1447.5, "take-off {takeoff}");

    let json = fs::read_to_string(&json_path).expect("json output");
    assert!(json.contains("\"case\": \"quad_air_taxi\""));
    assert!(json.contains("\"history\""));
}

#[test]
fn newton_method_flag_overrides_the_case() {
    Command::cargo_bin("evtol-size")
        .expect("evtol-size bin")
        .args(["configs/cases/multirotor.yaml", "--method", "newton"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Case: quad_air_taxi (newton)"));
}

#[test]
fn out_of_bound_design_values_fail() {
    Command::cargo_bin("evtol-size")
        .expect("evtol-size bin")
        .args([
            "configs/cases/multirotor.yaml",
            "--design",
            "lift_rotor_radius=7.0",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("lift_rotor_radius"));
}

#[test]
fn design_values_without_bounds_fail() {
    Command::cargo_bin("evtol-size")
        .expect("evtol-size bin")
        .args([
            "configs/cases/multirotor.yaml",
            "--design",
            "lift_rotor_advance_ratio=0.3",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no declared bounds"));
}

#[test]
fn malformed_design_assignment_is_a_usage_error() {
    Command::cargo_bin("evtol-size")
        .expect("evtol-size bin")
        .args(["configs/cases/multirotor.yaml", "--design", "cruise_speed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NAME=VALUE"));
}
