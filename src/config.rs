//! Typed gauge configuration, the attribute resolver, and the scale
//! generator.
//!
//! External input arrives as untyped attribute strings. The resolver turns
//! each one into a legal typed value or falls back: hard-coded defaults for
//! `min`/`max`, the previous valid value for `platehue`/`digits`/`zones`.
//! No malformed input is ever stored raw and no parse failure escapes this
//! module as an error.

use bon::Builder;
use serde::Deserialize;
use std::collections::HashMap;

/// Fallback when the `min` attribute does not parse.
pub const DEFAULT_MIN: f64 = 0.0;
/// Fallback when the `max` attribute does not parse.
pub const DEFAULT_MAX: f64 = 100.0;

/// Gauge body shape. Anything other than `"round"` renders as `Rect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    #[default]
    Rect,
    Round,
}

impl Shape {
    fn from_attr(raw: &str) -> Self {
        if raw == "round" {
            Shape::Round
        } else {
            Shape::Rect
        }
    }
}

/// Sizing and placement of the scale digits.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Digits {
    /// Digit font size as a percentage of the base size.
    pub size: f64,
    /// Distance of the digits from the dial center, in container-size units.
    pub distance: f64,
}

impl Default for Digits {
    fn default() -> Self {
        Self {
            size: 100.0,
            distance: 14.0,
        }
    }
}

/// Color category of a zone overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Low,
    Normal,
    Warn,
    High,
}

/// Angular coverage of a zone. `One` spans the space between two adjacent
/// major ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum ZoneCover {
    One,
    Two,
    Three,
}

impl ZoneCover {
    /// Coverage expressed in major-tick intervals.
    pub fn steps(self) -> u8 {
        match self {
            ZoneCover::One => 1,
            ZoneCover::Two => 2,
            ZoneCover::Three => 3,
        }
    }
}

impl TryFrom<u8> for ZoneCover {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ZoneCover::One),
            2 => Ok(ZoneCover::Two),
            3 => Ok(ZoneCover::Three),
            other => Err(format!("zone cover must be 1, 2 or 3, got {other}")),
        }
    }
}

/// One colored angular overlay on the plate.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Zone {
    #[serde(rename = "type")]
    pub kind: ZoneKind,
    pub cover: ZoneCover,
    /// Clockwise offset from the unrotated (12 o'clock) position, degrees.
    pub rotate: f64,
}

/// Host-supplied style variables: the explicit stand-in for page-level
/// custom properties when resolving a named `platehue`.
#[derive(Debug, Clone, Default)]
pub struct StyleVars {
    vars: HashMap<String, String>,
}

impl StyleVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

/// Outcome of applying one external attribute mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChange {
    /// The configuration was updated (possibly to a fallback default).
    Applied,
    /// The input was malformed; the previous valid value was kept.
    Retained,
    /// The new raw string equals the previously seen one; nothing was done.
    /// Produced by the widget, never by the resolver itself.
    Unchanged,
    /// The attribute name is not recognized.
    Unknown,
}

/// The single source of truth for the gauge's appearance.
///
/// Owned by the widget and mutated only through [`apply_attribute`]
/// (or replaced wholesale). Every field always holds a legal typed value.
///
/// [`apply_attribute`]: GaugeConfig::apply_attribute
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct GaugeConfig {
    #[builder(default = DEFAULT_MIN)]
    pub min: f64,
    #[builder(default = DEFAULT_MAX)]
    pub max: f64,
    #[builder(default)]
    pub shape: Shape,
    /// Corner rivets, rendered only when the shape is `Rect`.
    #[builder(default = true)]
    pub rivets: bool,
    /// Activity LED that blinks when a value arrives.
    #[builder(default = true)]
    pub led: bool,
    /// Derived 11-value scale; recomputed on every render.
    #[builder(default)]
    pub scales: Vec<f64>,
    #[builder(default = "".to_string())]
    pub measurement: String,
    #[builder(default = "".to_string())]
    pub unit: String,
    /// Scale numbers and readout are divided by this; `None` = disabled.
    pub multiplier: Option<f64>,
    #[builder(default)]
    pub digits: Digits,
    #[builder(default)]
    pub zones: Vec<Zone>,
    #[builder(default = 0.0)]
    pub platehue: f64,
    /// Outer size as a CSS dimension string, passed through to the host.
    #[builder(default = "100%".to_string())]
    pub size: String,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GaugeConfig {
    /// The attribute names the resolver recognizes.
    pub const ATTRIBUTES: [&'static str; 12] = [
        "min",
        "max",
        "shape",
        "multiplier",
        "measurement",
        "unit",
        "rivets",
        "digits",
        "led",
        "zones",
        "platehue",
        "size",
    ];

    /// Resolve one attribute string and store the typed result.
    ///
    /// Each attribute gets its own independent parsing branch. Malformed
    /// `digits`/`zones` input is logged and the previous value kept; a
    /// `platehue` that is neither a number nor a resolvable style variable
    /// keeps the previous hue.
    pub fn apply_attribute(&mut self, name: &str, raw: &str, vars: &StyleVars) -> ConfigChange {
        match name {
            "min" => {
                self.min = parse_number(raw).unwrap_or(DEFAULT_MIN);
                ConfigChange::Applied
            }
            "max" => {
                self.max = parse_number(raw).unwrap_or(DEFAULT_MAX);
                ConfigChange::Applied
            }
            "platehue" => match parse_number(raw) {
                Some(hue) => {
                    self.platehue = hue;
                    ConfigChange::Applied
                }
                None => match vars.get(raw).and_then(parse_number) {
                    Some(hue) => {
                        self.platehue = hue;
                        ConfigChange::Applied
                    }
                    None => {
                        log::warn!(
                            "platehue {raw:?} did not resolve to a number, keeping {}",
                            self.platehue
                        );
                        ConfigChange::Retained
                    }
                },
            },
            // Zero would make the later division undefined, so it disables
            // the multiplier like a parse failure does.
            "multiplier" => {
                self.multiplier = parse_number(raw).filter(|m| *m != 0.0);
                ConfigChange::Applied
            }
            "led" => {
                self.led = raw == "true";
                ConfigChange::Applied
            }
            "rivets" => {
                self.rivets = raw == "true";
                ConfigChange::Applied
            }
            "digits" => match serde_json::from_str::<Digits>(raw) {
                Ok(digits) => {
                    self.digits = digits;
                    ConfigChange::Applied
                }
                Err(err) => {
                    log::warn!("malformed digits attribute {raw:?}: {err}");
                    ConfigChange::Retained
                }
            },
            "zones" => match serde_json::from_str::<Vec<Zone>>(raw) {
                Ok(zones) => {
                    self.zones = zones;
                    ConfigChange::Applied
                }
                Err(err) => {
                    log::warn!("malformed zones attribute {raw:?}: {err}");
                    ConfigChange::Retained
                }
            },
            "shape" => {
                self.shape = Shape::from_attr(raw);
                ConfigChange::Applied
            }
            "measurement" => {
                self.measurement = raw.to_string();
                ConfigChange::Applied
            }
            "unit" => {
                self.unit = raw.to_string();
                ConfigChange::Applied
            }
            "size" => {
                self.size = raw.to_string();
                ConfigChange::Applied
            }
            _ => {
                log::debug!("ignoring unknown attribute {name:?}");
                ConfigChange::Unknown
            }
        }
    }

    /// Recompute the derived 11-value scale from the current bounds.
    pub fn refresh_scales(&mut self) {
        self.scales = scale_values(self.min, self.max, self.multiplier);
    }
}

/// The eleven major-tick values, evenly spaced from `min` to `max`.
///
/// The running value is rounded to 2 decimals after every step so
/// floating-point drift never accumulates visibly. An active multiplier
/// divides every value and re-rounds.
pub fn scale_values(min: f64, max: f64, multiplier: Option<f64>) -> Vec<f64> {
    let gap = (max - min) / 10.0;
    let mut values = Vec::with_capacity(11);
    let mut n = min;
    for _ in 0..11 {
        values.push(n);
        n = round2(n + gap);
    }
    if let Some(m) = multiplier {
        for v in &mut values {
            *v = round2(*v / m);
        }
    }
    values
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Strict float parse that never yields NaN.
fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}
