//! Pure render-tree derivation from the resolved configuration.
//!
//! The tree carries structure only (which elements exist, in paint order,
//! with their indices and text); geometry and colors are assigned by the
//! painting backend. It is rebuilt wholesale on every configuration change,
//! never diffed.

use crate::config::{GaugeConfig, Shape, Zone};

/// Major tick elements around the dial.
pub const MAJOR_TICK_COUNT: u8 = 11;
/// Angular divisions for major ticks over the arc.
pub const MAJOR_DIVISIONS: f64 = 10.0;
/// Angular divisions for subticks over the arc.
pub const SUBTICK_DIVISIONS: f64 = 100.0;
/// The dial covers 270 degrees.
pub const ARC_SPAN: f64 = 1.5 * std::f64::consts::PI;
/// Screen-space angle of the first tick (down-left of the dial).
pub const ARC_START: f64 = std::f64::consts::FRAC_PI_2;
/// Pixels of measured width per container-size unit.
const CONTAINER_UNIT: f64 = 50.0;

/// One visual element. Variants appear in [`RenderTree::nodes`] in the
/// fixed structural order the widget always renders in.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    /// Square-ish panel; `round` drops the corners (and the rivets).
    Body { round: bool },
    Ring,
    /// Corner rivet, `corner` 0..4 = TL, TR, BL, BR.
    Rivet { corner: u8 },
    Plate,
    Zone(Zone),
    Led,
    /// Major tick, `index` 1..=11.
    MajorTick { index: u8 },
    /// Subtick, `index` 2..=100 excluding indices ending in 1.
    SubTick { index: u8 },
    /// Scale number at the major tick position of the same index.
    Number { index: u8, text: String },
    MeasurementLabel { text: String },
    UnitLabel { text: String },
    MultiplierLabel { text: String },
    Needle,
    NeedleHub,
    /// Numeric value readout, initially empty.
    Readout,
}

/// The complete derived visual tree for one configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTree {
    /// CSS size string of the outer wrapper, passed through to the host.
    pub size: String,
    /// Shared visual parameter derived from the measured width at render
    /// time; 0 before layout, fixed by a later render with a real width.
    pub container_size: f64,
    /// Digit font size, percent.
    pub digit_size: f64,
    /// Digit distance from center, container-size units.
    pub digit_distance: f64,
    pub plate_hue: f64,
    /// Visual elements in paint order.
    pub nodes: Vec<RenderNode>,
}

/// Build the full visual tree for `config`, replacing any prior one.
///
/// `measured_width` is the host-measured width in pixels at render time.
pub fn build_render_tree(config: &GaugeConfig, measured_width: f64) -> RenderTree {
    let mut nodes = Vec::new();

    nodes.push(RenderNode::Body {
        round: config.shape == Shape::Round,
    });
    nodes.push(RenderNode::Ring);

    // Rivets belong to the rectangular panel; a round body has no corners.
    if config.rivets && config.shape == Shape::Rect {
        for corner in 0..4 {
            nodes.push(RenderNode::Rivet { corner });
        }
    }

    nodes.push(RenderNode::Plate);

    for zone in &config.zones {
        nodes.push(RenderNode::Zone(*zone));
    }

    if config.led {
        nodes.push(RenderNode::Led);
    }

    for index in 1..=MAJOR_TICK_COUNT {
        nodes.push(RenderNode::MajorTick { index });
    }
    for index in subtick_indices() {
        nodes.push(RenderNode::SubTick { index });
    }

    for (i, value) in config.scales.iter().enumerate() {
        nodes.push(RenderNode::Number {
            index: i as u8 + 1,
            text: format!("{value}"),
        });
    }

    if !config.measurement.is_empty() {
        nodes.push(RenderNode::MeasurementLabel {
            text: config.measurement.clone(),
        });
    }
    if !config.unit.is_empty() {
        nodes.push(RenderNode::UnitLabel {
            text: config.unit.clone(),
        });
    }
    if let Some(multiplier) = config.multiplier {
        nodes.push(RenderNode::MultiplierLabel {
            text: format!("x{multiplier}"),
        });
    }

    nodes.push(RenderNode::Needle);
    nodes.push(RenderNode::NeedleHub);
    nodes.push(RenderNode::Readout);

    RenderTree {
        size: config.size.clone(),
        container_size: measured_width / CONTAINER_UNIT,
        digit_size: config.digits.size,
        digit_distance: config.digits.distance,
        plate_hue: config.platehue,
        nodes,
    }
}

/// Subtick indices: 2..=100, skipping every index whose last decimal digit
/// is 1 (those positions coincide with major ticks).
pub fn subtick_indices() -> impl Iterator<Item = u8> {
    (2..=100).filter(|i| i % 10 != 1)
}

/// Screen-space angle (radians) of major tick `index`, 1..=11.
pub fn major_tick_angle(index: u8) -> f64 {
    ARC_START + ARC_SPAN * f64::from(index - 1) / MAJOR_DIVISIONS
}

/// Screen-space angle (radians) of subtick `index`, 2..=100.
pub fn subtick_angle(index: u8) -> f64 {
    ARC_START + ARC_SPAN * f64::from(index - 1) / SUBTICK_DIVISIONS
}

/// Needle angle for a 0-100 driving percentage. Deliberately unclamped:
/// out-of-range readings rotate past the dial bounds.
pub fn needle_angle(percent: f64) -> f64 {
    ARC_START + ARC_SPAN * percent / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GaugeConfig, ZoneCover, ZoneKind};

    fn tree_for(config: &mut GaugeConfig) -> RenderTree {
        config.refresh_scales();
        build_render_tree(config, 300.0)
    }

    fn count(tree: &RenderTree, pred: impl Fn(&RenderNode) -> bool) -> usize {
        tree.nodes.iter().filter(|n| pred(n)).count()
    }

    #[test]
    fn default_tree_has_fixed_tick_population() {
        let tree = tree_for(&mut GaugeConfig::default());
        assert_eq!(count(&tree, |n| matches!(n, RenderNode::MajorTick { .. })), 11);
        assert_eq!(count(&tree, |n| matches!(n, RenderNode::SubTick { .. })), 90);
        assert_eq!(count(&tree, |n| matches!(n, RenderNode::Number { .. })), 11);
        assert_eq!(count(&tree, |n| matches!(n, RenderNode::Rivet { .. })), 4);
        assert_eq!(count(&tree, |n| matches!(n, RenderNode::Led)), 1);
    }

    #[test]
    fn structural_order_starts_with_body_and_ends_with_readout() {
        let tree = tree_for(&mut GaugeConfig::default());
        assert!(matches!(tree.nodes.first(), Some(RenderNode::Body { .. })));
        assert!(matches!(tree.nodes.last(), Some(RenderNode::Readout)));
        let needle = tree
            .nodes
            .iter()
            .position(|n| matches!(n, RenderNode::Needle))
            .unwrap();
        let hub = tree
            .nodes
            .iter()
            .position(|n| matches!(n, RenderNode::NeedleHub))
            .unwrap();
        assert!(needle < hub);
    }

    #[test]
    fn round_shape_suppresses_rivets_even_when_enabled() {
        let mut config = GaugeConfig::builder().shape(Shape::Round).build();
        assert!(config.rivets);
        let tree = tree_for(&mut config);
        assert!(matches!(tree.nodes[0], RenderNode::Body { round: true }));
        assert_eq!(count(&tree, |n| matches!(n, RenderNode::Rivet { .. })), 0);
    }

    #[test]
    fn subticks_skip_indices_ending_in_one() {
        let indices: Vec<u8> = subtick_indices().collect();
        assert_eq!(indices.len(), 90);
        assert!(indices.iter().all(|i| i % 10 != 1));
        assert!(indices.contains(&2));
        assert!(indices.contains(&100));
        assert!(!indices.contains(&11));
        assert!(!indices.contains(&91));
    }

    #[test]
    fn numbers_carry_scale_values_as_text() {
        let mut config = GaugeConfig::builder().max(1200.0).multiplier(100.0).build();
        let tree = tree_for(&mut config);
        let texts: Vec<&str> = tree
            .nodes
            .iter()
            .filter_map(|n| match n {
                RenderNode::Number { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            texts,
            ["0", "1.2", "2.4", "3.6", "4.8", "6", "7.2", "8.4", "9.6", "10.8", "12"]
        );
    }

    #[test]
    fn zone_nodes_preserve_cover_kind_and_rotation() {
        let mut config = GaugeConfig::default();
        config.zones = vec![Zone {
            kind: ZoneKind::High,
            cover: ZoneCover::Three,
            rotate: 189.0,
        }];
        let tree = tree_for(&mut config);
        let zone = tree
            .nodes
            .iter()
            .find_map(|n| match n {
                RenderNode::Zone(z) => Some(*z),
                _ => None,
            })
            .unwrap();
        assert_eq!(zone.kind, ZoneKind::High);
        assert_eq!(zone.cover.steps(), 3);
        assert_eq!(zone.rotate, 189.0);
    }

    #[test]
    fn labels_appear_only_when_configured() {
        let tree = tree_for(&mut GaugeConfig::default());
        assert_eq!(
            count(&tree, |n| {
                matches!(
                    n,
                    RenderNode::MeasurementLabel { .. }
                        | RenderNode::UnitLabel { .. }
                        | RenderNode::MultiplierLabel { .. }
                )
            }),
            0
        );

        let mut config = GaugeConfig::builder()
            .measurement("temperature".to_string())
            .unit("C".to_string())
            .multiplier(10.0)
            .build();
        let tree = tree_for(&mut config);
        assert!(tree
            .nodes
            .iter()
            .any(|n| matches!(n, RenderNode::MultiplierLabel { text } if text == "x10")));
        assert!(tree
            .nodes
            .iter()
            .any(|n| matches!(n, RenderNode::MeasurementLabel { text } if text == "temperature")));
        assert!(tree
            .nodes
            .iter()
            .any(|n| matches!(n, RenderNode::UnitLabel { text } if text == "C")));
    }

    #[test]
    fn angles_cover_the_270_degree_arc() {
        let first = major_tick_angle(1);
        let last = major_tick_angle(11);
        assert!((first - ARC_START).abs() < 1e-12);
        assert!((last - (ARC_START + ARC_SPAN)).abs() < 1e-12);
        assert!((subtick_angle(2) - major_tick_angle(1)).abs() < ARC_SPAN / 100.0 + 1e-12);
        assert!((needle_angle(0.0) - first).abs() < 1e-12);
        assert!((needle_angle(100.0) - last).abs() < 1e-12);
        // Unclamped: an overshoot rotates past the dial.
        assert!(needle_angle(150.0) > last);
    }

    #[test]
    fn container_size_derives_from_measured_width() {
        let mut config = GaugeConfig::default();
        config.refresh_scales();
        let tree = build_render_tree(&config, 300.0);
        assert_eq!(tree.container_size, 6.0);
        // Zero width is not special-cased.
        let tree = build_render_tree(&config, 0.0);
        assert_eq!(tree.container_size, 0.0);
    }
}
