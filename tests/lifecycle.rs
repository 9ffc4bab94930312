//! End-to-end widget behavior: attach/detach lifecycle, attribute-driven
//! rebuilds and registry forwarding, all without opening a window.

use std::time::{Duration, Instant};

use dialgauge::{
    ConfigChange, Gauge, GaugeConfig, GaugeEvent, GaugeRegistry, RenderNode, Shape, StyleVars,
};
use std::sync::mpsc;

#[test]
fn value_pushed_before_attach_shows_up_after() {
    let mut gauge = Gauge::new(GaugeConfig::default());
    gauge.update(75.0);
    assert_eq!(gauge.readout(), "");

    gauge.attach(300.0);
    assert_eq!(gauge.readout(), "75.0");
    assert_eq!(gauge.percent(), 75.0);
}

#[test]
fn value_survives_a_detach_reattach_cycle() {
    let mut gauge = Gauge::new(GaugeConfig::default());
    gauge.attach(300.0);
    gauge.update(30.0);
    gauge.detach();
    assert_eq!(gauge.readout(), "");
    gauge.attach(300.0);
    assert_eq!(gauge.readout(), "30.0");
    assert_eq!(gauge.percent(), 30.0);
}

#[test]
fn rescaling_moves_the_needle_without_a_new_value() {
    let mut gauge = Gauge::new(GaugeConfig::default());
    gauge.attach(300.0);
    gauge.update(600.0);
    // Far past the default 0..100 range; the needle is not clamped.
    assert_eq!(gauge.percent(), 600.0);

    gauge.set_attribute("max", "1200");
    assert_eq!(gauge.percent(), 50.0);
    assert_eq!(gauge.readout(), "600.0");

    gauge.set_attribute("multiplier", "100");
    assert_eq!(gauge.readout(), "6.0");
    assert_eq!(gauge.percent(), 50.0);
}

#[test]
fn attribute_changes_rebuild_the_tree() {
    let mut gauge = Gauge::new(GaugeConfig::default());
    gauge.attach(300.0);
    let numbers = |gauge: &Gauge| -> Vec<String> {
        gauge
            .tree()
            .unwrap()
            .nodes
            .iter()
            .filter_map(|n| match n {
                RenderNode::Number { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    };
    assert_eq!(numbers(&gauge)[10], "100");
    gauge.set_attribute("max", "1200");
    gauge.set_attribute("multiplier", "100");
    assert_eq!(numbers(&gauge)[10], "12");
    assert_eq!(numbers(&gauge)[1], "1.2");
}

#[test]
fn repeated_raw_value_short_circuits() {
    let mut gauge = Gauge::new(GaugeConfig::default());
    gauge.attach(300.0);
    assert_eq!(gauge.set_attribute("shape", "round"), ConfigChange::Applied);
    assert_eq!(gauge.config().shape, Shape::Round);
    assert_eq!(
        gauge.set_attribute("shape", "round"),
        ConfigChange::Unchanged
    );
}

#[test]
fn malformed_zones_keep_the_rendered_overlays() {
    let mut gauge = Gauge::new(GaugeConfig::default());
    gauge.attach(300.0);
    gauge.set_attribute("zones", r#"[{"type":"warn","cover":2,"rotate":189}]"#);
    let zone_count = |gauge: &Gauge| {
        gauge
            .tree()
            .unwrap()
            .nodes
            .iter()
            .filter(|n| matches!(n, RenderNode::Zone(_)))
            .count()
    };
    assert_eq!(zone_count(&gauge), 1);
    assert_eq!(gauge.set_attribute("zones", "[{]"), ConfigChange::Retained);
    assert_eq!(zone_count(&gauge), 1);
}

#[test]
fn platehue_resolves_through_host_style_vars() {
    let mut vars = StyleVars::new();
    vars.set("--panel-hue", "200");
    let mut gauge = Gauge::new(GaugeConfig::default());
    gauge.set_style_vars(vars);
    gauge.attach(300.0);
    gauge.set_attribute("platehue", "--panel-hue");
    assert_eq!(gauge.tree().unwrap().plate_hue, 200.0);
}

#[test]
fn registry_announces_creations_and_forwards_by_topic() {
    let (tx, rx) = mpsc::channel();
    let mut registry = GaugeRegistry::new();
    registry.set_event_sink(tx);

    let a = registry.create(GaugeConfig::default());
    let b = registry.create(GaugeConfig::default());
    assert_eq!(rx.try_recv(), Ok(GaugeEvent::Created(a)));
    assert_eq!(rx.try_recv(), Ok(GaugeEvent::Created(b)));

    registry.get_mut(a).unwrap().attach(300.0);
    registry.get_mut(b).unwrap().attach(300.0);

    assert_eq!(registry.forward("plant/gauge/boiler", 42.0), 2);
    assert_eq!(registry.get(a).unwrap().readout(), "42.0");
    assert_eq!(registry.get(b).unwrap().readout(), "42.0");

    assert_eq!(registry.forward("plant/valve/boiler", 99.0), 0);
    assert_eq!(registry.get(a).unwrap().readout(), "42.0");
}

#[test]
fn rapid_updates_restart_the_blink_window() {
    let t0 = Instant::now();
    let mut gauge = Gauge::new(GaugeConfig::default());
    gauge.attach(300.0);

    gauge.update_at(1.0, t0);
    gauge.update_at(2.0, t0 + Duration::from_millis(500));
    // 900ms after the first update the restarted window is still open.
    assert!(gauge.blink_active(t0 + Duration::from_millis(900)));
    assert!(!gauge.blink_active(t0 + Duration::from_millis(1400)));
}
