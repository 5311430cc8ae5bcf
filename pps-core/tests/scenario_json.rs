use pps_core::models::{DemandCurve, PlanId, Scenario, SegmentId, ValidationError};

const SCENARIO: &str = r#"{
    "plans": [
        { "id": "P2", "name": "Standard", "data_limit": 10, "cost": 5 },
        { "id": "P1", "data_limit": 1, "cost": 2 }
    ],
    "segments": [
        {
            "id": "S_Low",
            "size": 5000,
            "demand": {
                "P1": { "a": 5000, "b": 200 },
                "P2": { "a": 4000 }
            }
        }
    ],
    "capacity": 100000
}"#;

#[test]
fn test_parse() {
    let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
    assert_eq!(scenario.validate(), Ok(()));

    // Input order is preserved; the ordering ladder sorts separately
    assert_eq!(scenario.plans[0].id, PlanId::from("P2"));
    assert_eq!(scenario.plans[1].name, "");
    let sorted = scenario.sorted_plans();
    assert_eq!(sorted[0].id, PlanId::from("P1"));

    let segment = &scenario.segments[0];
    assert_eq!(segment.id, SegmentId::from("S_Low"));
    assert_eq!(segment.name, "");
    assert_eq!(segment.demand_for(&"P1".into()), DemandCurve::new(5000.0, 200.0).unwrap());
    assert_eq!(segment.demand_for(&"P2".into()).slope(), 0.0);
    assert_eq!(segment.demand_for(&"P9".into()), DemandCurve::ZERO);
}

#[test]
fn test_segments_optional() {
    let scenario: Scenario =
        serde_json::from_str(r#"{"plans": [{"id": "P1", "data_limit": 1, "cost": 0}], "capacity": 0}"#)
            .unwrap();
    assert!(scenario.segments.is_empty());
    assert_eq!(scenario.validate(), Ok(()));
}

#[test]
fn test_bad_curve_rejected_on_parse() {
    let json = SCENARIO.replace(r#""b": 200"#, r#""b": -200"#);
    assert!(serde_json::from_str::<Scenario>(&json).is_err());
}

#[test]
fn test_unknown_plan_rejected_on_validate() {
    let json = SCENARIO.replace(r#""P2": { "a": 4000 }"#, r#""P7": { "a": 4000 }"#);
    let scenario: Scenario = serde_json::from_str(&json).unwrap();
    assert_eq!(
        scenario.validate(),
        Err(ValidationError::UnknownPlan {
            segment: "S_Low".into(),
            plan: "P7".into(),
        })
    );
}

#[test]
fn test_demand_order_is_stable() {
    let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
    let json = serde_json::to_string(&scenario).unwrap();
    let again: Scenario = serde_json::from_str(&json).unwrap();
    assert_eq!(scenario, again);
    let keys = again.segments[0]
        .demand
        .keys()
        .map(PlanId::as_str)
        .collect::<Vec<_>>();
    assert_eq!(keys, vec!["P1", "P2"]);
}
