mod common;

use arview_core::config::DecoderKind;
use arview_core::registry::Slot;
use arview_core::{LoadIndicator, ModelId, ViewerConfig, ViewerEvent};
use common::{hit_at, placeholder_config, Harness};

#[test]
fn test_failed_model_is_never_placed() {
    let mut harness = Harness::new(ViewerConfig {
        seed: None,
        ..placeholder_config()
    });
    harness.load("fast-charger");
    harness.fail("wall-charger", "HTTP 404");
    harness.enter_ar(1);

    for i in 0..30 {
        harness.frame(&[hit_at(i as f32 * 0.1, 0.0, -1.0)]);
        harness.select();
    }

    let placements = harness.viewer.placements();
    assert_eq!(placements.len(), 30);
    assert!(placements
        .iter()
        .all(|m| m.model == ModelId::from("fast-charger")));

    let shown = &harness.host().shown;
    assert!(shown.iter().any(|s| s == "fast-charger model loaded successfully"));
    assert!(shown.iter().any(|s| s == "Error loading wall-charger model"));
    assert!(!shown.iter().any(|s| s == "Error loading fast-charger model"));
    assert!(!shown.iter().any(|s| s == "wall-charger model loaded successfully"));
}

#[test]
fn test_indicators_progress_then_hide() {
    let mut harness = Harness::new(placeholder_config());
    let fast = ModelId::from("fast-charger");
    let wall = ModelId::from("wall-charger");
    assert_eq!(harness.host().indicators[&fast], LoadIndicator::Progress(0.0));

    harness.send(ViewerEvent::AssetProgress {
        model: fast.clone(),
        fraction: 0.4,
    });
    assert_eq!(harness.host().indicators[&fast], LoadIndicator::Progress(0.4));

    harness.load("fast-charger");
    harness.fail("wall-charger", "network error");
    assert_eq!(harness.host().indicators[&fast], LoadIndicator::Hidden);
    assert_eq!(harness.host().indicators[&wall], LoadIndicator::Hidden);

    // Progress after settling does not bring the bar back
    harness.send(ViewerEvent::AssetProgress {
        model: fast.clone(),
        fraction: 1.0,
    });
    assert_eq!(harness.host().indicators[&fast], LoadIndicator::Hidden);
}

#[test]
fn test_undecodable_asset_fails_its_slot() {
    let mut harness = Harness::new(ViewerConfig {
        decoder: DecoderKind::Gltf,
        ..placeholder_config()
    });
    harness.send(ViewerEvent::AssetFetched {
        model: ModelId::from("wall-charger"),
        bytes: b"<html>not found</html>".to_vec(),
    });

    let wall = ModelId::from("wall-charger");
    assert!(matches!(harness.viewer.registry().slot(&wall), Some(Slot::Failed(_))));
    assert_eq!(harness.status_text(), Some("Error loading wall-charger model"));
    let (_, ticket) = harness.host().status.clone().unwrap();
    assert_eq!(ticket.duration_ms, 5000);
    assert!(harness.host().templates.is_empty());
}

#[test]
fn test_slot_settles_once() {
    let mut harness = Harness::new(placeholder_config());
    harness.fail("wall-charger", "timeout");
    harness.load("wall-charger");

    let wall = ModelId::from("wall-charger");
    assert!(harness.viewer.registry().get(&wall).is_none());
    assert!(harness.host().templates.is_empty());
}

#[test]
fn test_loaded_template_is_registered_scaled() {
    let mut harness = Harness::new(placeholder_config());
    harness.load("fast-charger");

    let fast = ModelId::from("fast-charger");
    assert_eq!(harness.host().templates, vec![fast.clone()]);
    let template = harness.viewer.registry().get(&fast).unwrap();
    let size = template.mesh.bounds().unwrap().size();
    assert!((size.y - 0.5).abs() < 1e-6);
}
