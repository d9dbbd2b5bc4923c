use approx::assert_relative_eq;
use evtol_mdo::mission::{Mission, MissionError, Segment, SegmentKind, SegmentSpec};
use std::error::Error;

fn spec(speed: Option<f64>, distance: Option<f64>, duration: Option<f64>) -> SegmentSpec {
    SegmentSpec {
        speed_m_s: speed,
        distance_m: distance,
        duration_s: duration,
        ..SegmentSpec::default()
    }
}

#[test]
fn any_two_of_three_resolve_the_third() -> Result<(), Box<dyn Error>> {
    let from_distance = Segment::new("a", SegmentKind::Cruise, spec(Some(50.0), Some(30_000.0), None))?;
    assert_relative_eq!(from_distance.duration_s, 600.0);

    let from_duration = Segment::new("b", SegmentKind::Cruise, spec(Some(50.0), None, Some(600.0)))?;
    assert_relative_eq!(from_duration.distance_m, 30_000.0);

    let from_both = Segment::new("c", SegmentKind::Cruise, spec(None, Some(30_000.0), Some(600.0)))?;
    assert_relative_eq!(from_both.speed_m_s, 50.0);

    for segment in [&from_distance, &from_duration, &from_both] {
        assert_relative_eq!(
            segment.distance_m,
            segment.speed_m_s * segment.duration_s,
            max_relative = 1e-12
        );
    }
    Ok(())
}

#[test]
fn missing_quantities_are_underspecified() {
    let one_given = Segment::new("cruise", SegmentKind::Cruise, spec(Some(50.0), None, None));
    assert!(matches!(one_given, Err(MissionError::Underspecified { .. })));

    let hover_without_time = Segment::new("hover", SegmentKind::HoverStay, spec(None, None, None));
    assert!(matches!(hover_without_time, Err(MissionError::Underspecified { .. })));

    let stalled = Segment::new("x", SegmentKind::Cruise, spec(Some(0.0), Some(100.0), None));
    assert!(matches!(stalled, Err(MissionError::Underspecified { .. })));

    let no_angle = Segment::new("climb", SegmentKind::Climb, spec(Some(40.0), None, Some(60.0)));
    assert!(matches!(no_angle, Err(MissionError::Underspecified { .. })));
}

#[test]
fn overspecified_triples_must_agree() -> Result<(), Box<dyn Error>> {
    let consistent = Segment::new(
        "ok",
        SegmentKind::Cruise,
        spec(Some(50.0), Some(30_000.0 * (1.0 + 1e-9)), Some(600.0)),
    )?;
    assert_eq!(consistent.speed_m_s, 50.0);

    let inconsistent = Segment::new("bad", SegmentKind::Cruise, spec(Some(50.0), Some(31_000.0), Some(600.0)));
    assert!(matches!(
        inconsistent,
        Err(MissionError::Inconsistent { ref segment, .. }) if segment == "bad"
    ));
    Ok(())
}

#[test]
fn negative_values_are_domain_errors() {
    let negative = Segment::new("x", SegmentKind::Cruise, spec(Some(-5.0), Some(100.0), None));
    assert!(matches!(negative, Err(MissionError::Domain { .. })));

    let steep = Segment::new(
        "climb",
        SegmentKind::Climb,
        SegmentSpec {
            climb_angle_deg: Some(95.0),
            ..spec(Some(40.0), None, Some(60.0))
        },
    );
    assert!(matches!(steep, Err(MissionError::Domain { .. })));
}

#[test]
fn mission_energy_integrates_power_over_time() -> Result<(), Box<dyn Error>> {
    let climb = Segment::new(
        "climb",
        SegmentKind::Climb,
        SegmentSpec {
            climb_angle_deg: Some(5.0),
            ..spec(Some(40.0), None, Some(100.0))
        },
    )?;
    let mission = Mission::new(vec![
        Segment::new("takeoff", SegmentKind::HoverClimb, spec(Some(2.5), Some(150.0), None))?,
        climb,
        Segment::new("cruise", SegmentKind::Cruise, spec(Some(50.0), Some(30_000.0), None))?,
        Segment::new("reserve", SegmentKind::HoverStay, spec(None, None, Some(120.0)))?,
    ])?;
    assert_relative_eq!(mission.total_duration_s(), 60.0 + 100.0 + 600.0 + 120.0);
    assert_relative_eq!(
        mission.total_horizontal_distance_m(),
        4_000.0 * 5f64.to_radians().cos() + 30_000.0,
        max_relative = 1e-12
    );

    let energy = mission.required_energy(&[400e3, 250e3, 150e3, 380e3])?;
    assert_eq!(energy.segment_j("takeoff"), Some(400e3 * 60.0));
    assert_eq!(energy.segment_j("reserve"), Some(380e3 * 120.0));
    let expected = 400e3 * 60.0 + 250e3 * 100.0 + 150e3 * 600.0 + 380e3 * 120.0;
    assert_relative_eq!(energy.total_j, expected, max_relative = 1e-12);

    assert!(matches!(
        mission.required_energy(&[1.0, 2.0]),
        Err(MissionError::Configuration(_))
    ));
    Ok(())
}

#[test]
fn missions_need_unique_names() -> Result<(), Box<dyn Error>> {
    let hover = Segment::new("hover", SegmentKind::HoverStay, spec(None, None, Some(30.0)))?;
    assert!(matches!(
        Mission::new(vec![hover.clone(), hover]),
        Err(MissionError::Configuration(_))
    ));
    assert!(matches!(Mission::new(Vec::new()), Err(MissionError::Configuration(_))));
    Ok(())
}
