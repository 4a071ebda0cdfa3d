mod common;

use std::f32::consts::TAU;

use approx::assert_relative_eq;
use arview_core::config::{CapacityPolicy, SelectionPolicy};
use arview_core::viewer::{CAPACITY_REACHED, MODEL_PLACED};
use arview_core::{ModelId, Pose, ViewerConfig, ViewerEvent};
use common::{hit_at, placeholder_config, Harness};
use nalgebra::{Point3, UnitQuaternion, Vector3};

fn ready(config: ViewerConfig) -> Harness {
    let mut harness = Harness::new(config);
    harness.load("fast-charger");
    harness.load("wall-charger");
    harness.enter_ar(1);
    harness
}

#[test]
fn test_reticle_follows_nearest_hit() {
    let mut harness = ready(placeholder_config());
    let near = hit_at(0.0, -1.5, -1.0);
    let far = hit_at(0.0, -1.5, -4.0);

    harness.frame(&[near, far]);
    let reticle = harness.viewer.reticle();
    assert!(reticle.is_visible());
    assert_eq!(reticle.pose(), &near);
    assert_eq!(harness.host().reticle, Some((true, near)));
    assert!(harness.host().surface_hint);

    harness.frame(&[]);
    assert!(!harness.viewer.reticle().is_visible());
    assert_eq!(harness.host().reticle.map(|(visible, _)| visible), Some(false));
    assert!(!harness.host().surface_hint);
}

#[test]
fn test_select_without_reticle_places_nothing() {
    let mut harness = ready(placeholder_config());

    harness.select();
    assert!(harness.viewer.placements().is_empty());

    // A surface seen earlier does not count once a later frame lost it
    harness.frame(&[hit_at(0.0, 0.0, -1.0)]);
    harness.frame(&[]);
    harness.select();
    assert!(harness.viewer.placements().is_empty());
    assert!(harness.host().nodes.is_empty());
}

#[test]
fn test_select_while_session_is_ending_places_nothing() {
    let mut harness = ready(placeholder_config());
    harness.frame(&[hit_at(0.0, 0.0, -1.0)]);
    assert!(harness.viewer.reticle().is_visible());

    // Exit requested, runtime has not confirmed the end yet
    harness.send(ViewerEvent::TogglePressed);
    assert!(harness.viewer.session().is_active());
    assert!(!harness.viewer.reticle().is_visible());
    assert_eq!(harness.host().reticle.map(|(visible, _)| visible), Some(false));
    assert!(!harness.host().surface_hint);

    harness.select();
    harness.frame(&[hit_at(0.0, 0.0, -1.0)]);
    harness.select();
    assert!(harness.viewer.placements().is_empty());
    assert!(harness.host().nodes.is_empty());
}

#[test]
fn test_select_before_any_model_loads_places_nothing() {
    let mut harness = Harness::new(placeholder_config());
    harness.enter_ar(1);
    harness.frame(&[hit_at(0.0, 0.0, -1.0)]);

    harness.select();
    assert!(harness.viewer.placements().is_empty());
}

#[test]
fn test_placement_uses_hit_translation() {
    let mut harness = ready(placeholder_config());
    let orientation = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.4);
    let pose = Pose::from_parts(Point3::new(0.3, -1.2, -2.0), orientation);

    harness.frame(&[pose]);
    harness.select();

    let placements = harness.viewer.placements();
    assert_eq!(placements.len(), 1);
    let placed = placements.iter().next().unwrap();
    assert_relative_eq!(placed.position(), Point3::new(0.3, -1.2, -2.0), epsilon = 1e-6);

    let node = &harness.host().nodes[&placed.node];
    assert_eq!(node.model, placed.model);
    assert_relative_eq!(node.position, placed.position(), epsilon = 1e-6);
    assert_eq!(harness.status_text(), Some(MODEL_PLACED));
}

#[test]
fn test_every_select_appends_one_model() {
    let mut harness = ready(placeholder_config());
    for i in 0..5 {
        harness.frame(&[hit_at(i as f32, 0.0, -1.0)]);
        harness.select();
        assert_eq!(harness.viewer.placements().len(), i + 1);
    }
    assert_eq!(harness.host().nodes.len(), 5);
}

#[test]
fn test_idle_rotation_advances_by_step_per_frame() {
    let config = ViewerConfig {
        rotation_step: 0.5,
        ..placeholder_config()
    };
    let mut harness = ready(config);
    harness.frame(&[hit_at(0.0, 0.0, -1.0)]);
    harness.select();
    harness.frame(&[hit_at(1.0, 0.0, -1.0)]);
    harness.select();

    let before: Vec<f32> = harness.viewer.placements().iter().map(|m| m.rotation.y).collect();
    let frames = 20;
    for _ in 0..frames {
        harness.frame(&[]);
    }

    let expected_delta = frames as f32 * 0.5;
    for (model, start) in harness.viewer.placements().iter().zip(before) {
        let expected = (start + expected_delta).rem_euclid(TAU);
        let diff = (model.rotation.y - expected).rem_euclid(TAU);
        assert!(diff < 1e-3 || diff > TAU - 1e-3, "off by {}", diff);
        assert!((0.0..TAU).contains(&model.rotation.y));

        let node = &harness.host().nodes[&model.node];
        assert_eq!(node.rotation, model.rotation);
        assert_relative_eq!(node.position, model.position());
    }
}

#[test]
fn test_first_policy_always_uses_first_loaded() {
    let config = ViewerConfig {
        selection: SelectionPolicy::First,
        ..placeholder_config()
    };
    let mut harness = ready(config);
    for _ in 0..3 {
        harness.frame(&[hit_at(0.0, 0.0, -1.0)]);
        harness.select();
    }
    assert!(harness
        .viewer
        .placements()
        .iter()
        .all(|m| m.model == ModelId::from("fast-charger")));
}

#[test]
fn test_capacity_evicts_oldest() {
    let config = ViewerConfig {
        max_models: Some(2),
        capacity_policy: CapacityPolicy::EvictOldest,
        ..placeholder_config()
    };
    let mut harness = ready(config);
    for x in [1.0, 2.0, 3.0] {
        harness.frame(&[hit_at(x, 0.0, -1.0)]);
        harness.select();
    }

    let xs: Vec<f32> = harness.viewer.placements().iter().map(|m| m.position().x).collect();
    assert_eq!(xs, vec![2.0, 3.0]);
    assert_eq!(harness.host().nodes.len(), 2);
    assert!(harness.host().nodes.values().all(|n| n.position.x > 1.5));
}

#[test]
fn test_capacity_rejects_new() {
    let config = ViewerConfig {
        max_models: Some(1),
        capacity_policy: CapacityPolicy::RejectNew,
        ..placeholder_config()
    };
    let mut harness = ready(config);
    harness.frame(&[hit_at(1.0, 0.0, -1.0)]);
    harness.select();
    harness.select();

    assert_eq!(harness.viewer.placements().len(), 1);
    assert_eq!(harness.host().nodes.len(), 1);
    assert_eq!(harness.status_text(), Some(CAPACITY_REACHED));
}

#[test]
fn test_frames_without_session_still_animate() {
    let mut harness = ready(placeholder_config());
    harness.frame(&[hit_at(0.0, 0.0, -1.0)]);
    harness.select();
    harness.send(ViewerEvent::TogglePressed);
    let epoch = harness.host().last_epoch.unwrap();
    harness.send(arview_core::ViewerEvent::SessionEnded { epoch });

    let before = harness.viewer.placements().iter().next().unwrap().rotation.y;
    harness.viewer.on_frame(None);
    let after = harness.viewer.placements().iter().next().unwrap().rotation.y;
    assert_relative_eq!(after - before, 0.01, epsilon = 1e-6);
}
