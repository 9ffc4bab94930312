//! Analog dial gauge widget.
//!
//! A [`Gauge`] owns a typed [`GaugeConfig`], derives a retained
//! [`RenderTree`] from it, and paints frames through a software rasterizer
//! into a [`pixels`] framebuffer. Values pushed with [`Gauge::update`] move
//! the needle, refresh the readout and blink the activity LED.
//!
//! The widget is headless until [`Gauge::show`] (or
//! [`Gauge::show_with_commands`]) opens a window; before that, updates are
//! absorbed and reapplied once the gauge is attached. Hosts that manage
//! several gauges construct them through a [`GaugeRegistry`].

use bon::Builder;
use pixels::{Pixels, SurfaceTexture};
use rusttype::Font;

use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use std::time::Instant;

use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

pub mod blink;
pub mod config;
pub mod paint;
pub mod registry;
pub mod tree;

pub use blink::{Blinker, BLINK_DURATION};
pub use config::{
    ConfigChange, Digits, GaugeConfig, Shape, StyleVars, Zone, ZoneCover, ZoneKind,
};
pub use paint::{build_scene, Canvas, Color, FrameState, Scene};
pub use registry::{GaugeEvent, GaugeId, GaugeRegistry};
pub use tree::{build_render_tree, RenderNode, RenderTree};

/// Command enum for driving a shown gauge from another thread.
#[derive(Debug, Clone)]
pub enum GaugeCommand {
    /// Push a new measured value.
    Update(f64),
    /// Apply an attribute mutation, name and raw string value.
    SetAttribute(String, String),
    /// Host bus message; forwarded to the gauge only when the topic
    /// carries the gauge keyword.
    Message { topic: String, value: f64 },
}

/// Window and font options for [`Gauge::show`].
#[derive(Debug, Clone, Builder)]
pub struct ShowOptions {
    #[builder(default = "gauge".to_string())]
    pub title: String,
    #[builder(default = 300)]
    pub window_width: usize,
    #[builder(default = 300)]
    pub window_height: usize,
    #[builder(default = 60.0)]
    pub max_framerate: f64,
    /// TTF/OTF bytes for all dial text.
    pub font_data: Vec<u8>,
}

/// The gauge widget: configuration, derived render tree and live state.
#[derive(Debug, Clone)]
pub struct Gauge {
    config: GaugeConfig,
    style_vars: StyleVars,
    /// Raw attribute strings as last seen, for the no-op short-circuit.
    raw_attrs: HashMap<String, String>,
    /// Present only while attached.
    tree: Option<RenderTree>,
    /// Last pushed value; survives detach and re-applies on attach.
    last_value: Option<f64>,
    percent: f64,
    readout: String,
    blinker: Blinker,
    measured_width: f64,
}

impl Gauge {
    pub fn new(config: GaugeConfig) -> Self {
        Self {
            config,
            style_vars: StyleVars::new(),
            raw_attrs: HashMap::new(),
            tree: None,
            last_value: None,
            percent: 0.0,
            readout: String::new(),
            blinker: Blinker::new(),
            measured_width: 0.0,
        }
    }

    pub fn config(&self) -> &GaugeConfig {
        &self.config
    }

    /// The retained render tree, `None` while detached.
    pub fn tree(&self) -> Option<&RenderTree> {
        self.tree.as_ref()
    }

    /// Needle driving percentage of the last applied value, unclamped.
    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Readout text; empty until a value has been applied while attached.
    pub fn readout(&self) -> &str {
        &self.readout
    }

    pub fn last_value(&self) -> Option<f64> {
        self.last_value
    }

    pub fn is_attached(&self) -> bool {
        self.tree.is_some()
    }

    /// Replace the style variables used to resolve named `platehue` values.
    pub fn set_style_vars(&mut self, vars: StyleVars) {
        self.style_vars = vars;
    }

    /// Enter the rendered state with a host-measured width in pixels.
    /// Builds the tree and re-applies any value pushed while detached.
    pub fn attach(&mut self, measured_width: f64) {
        self.measured_width = measured_width;
        self.redraw();
        self.reapply_last_value();
    }

    /// Leave the rendered state. Configuration and the last value are kept;
    /// the tree and any pending blink are dropped.
    pub fn detach(&mut self) {
        self.tree = None;
        self.blinker.cancel();
        self.readout.clear();
        log::debug!("gauge detached");
    }

    /// Propagate a host resize. A full rebuild, not a patch.
    pub fn set_measured_width(&mut self, measured_width: f64) {
        self.measured_width = measured_width;
        if self.is_attached() {
            self.redraw();
            self.reapply_last_value();
        }
    }

    /// Apply one external attribute mutation.
    ///
    /// An unchanged raw string is a no-op. A recognized attribute rebuilds
    /// the tree (when attached) and re-applies the last value so the needle
    /// and readout reflect the new bounds immediately.
    pub fn set_attribute(&mut self, name: &str, raw: &str) -> ConfigChange {
        if self.raw_attrs.get(name).map(String::as_str) == Some(raw) {
            return ConfigChange::Unchanged;
        }
        let change = self.config.apply_attribute(name, raw, &self.style_vars);
        if change == ConfigChange::Unknown {
            return change;
        }
        self.raw_attrs.insert(name.to_string(), raw.to_string());
        if self.is_attached() {
            self.redraw();
            self.reapply_last_value();
        }
        change
    }

    /// Push a new measured value.
    pub fn update(&mut self, value: f64) {
        self.update_at(value, Instant::now());
    }

    /// [`update`](Self::update) with an explicit clock, for blink timing.
    pub fn update_at(&mut self, value: f64, now: Instant) {
        self.last_value = Some(value);
        if self.tree.is_none() {
            return;
        }
        let shown = match self.config.multiplier {
            Some(multiplier) => value / multiplier,
            None => value,
        };
        self.readout = format!("{shown:.1}");
        self.percent =
            (value - self.config.min) / (self.config.max - self.config.min) * 100.0;
        if self.config.led {
            self.blinker.trigger(now);
        }
    }

    /// Whether the activity LED is lit at `now`.
    pub fn blink_active(&mut self, now: Instant) -> bool {
        self.blinker.poll(now)
    }

    /// Rebuild the render tree from the current configuration.
    fn redraw(&mut self) {
        self.config.refresh_scales();
        self.tree = Some(tree::build_render_tree(&self.config, self.measured_width));
    }

    fn reapply_last_value(&mut self) {
        if let Some(value) = self.last_value {
            self.update_at(value, Instant::now());
        }
    }

    /// Open a window and render until it is closed.
    pub fn show(&mut self, options: ShowOptions) -> Result<(), Box<dyn std::error::Error>> {
        self.run_window(options, None)
    }

    /// Like [`show`](Self::show), but drains `receiver` every frame so
    /// another thread can push values and attribute changes.
    pub fn show_with_commands(
        &mut self,
        options: ShowOptions,
        receiver: Receiver<GaugeCommand>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.run_window(options, Some(receiver))
    }

    fn run_window(
        &mut self,
        options: ShowOptions,
        receiver: Option<Receiver<GaugeCommand>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let font = Font::try_from_vec(options.font_data.clone())
            .ok_or("failed to parse font data")?;

        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(&options.title)
            .with_inner_size(LogicalSize::new(
                options.window_width as f64,
                options.window_height as f64,
            ))
            .with_resizable(true)
            .build(&event_loop)?;
        let window = std::sync::Arc::new(window);

        let size = window.inner_size();
        let mut fb_width = size.width as usize;
        let mut fb_height = size.height as usize;
        let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
        let mut pixels = Pixels::new(size.width, size.height, surface_texture)?;

        self.attach(fb_width as f64);
        log::info!(
            "gauge window {:?} open at {}x{}",
            options.title,
            fb_width,
            fb_height
        );

        let window_clone = window.clone();
        let frame_duration = std::time::Duration::from_secs_f64(1.0 / options.max_framerate);
        let mut last_frame = Instant::now();

        event_loop.run(move |event, window_target| {
            window_target.set_control_flow(ControlFlow::Poll);
            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        fb_width = new_size.width as usize;
                        fb_height = new_size.height as usize;
                        let _ = pixels.resize_buffer(new_size.width, new_size.height);
                        let _ = pixels.resize_surface(new_size.width, new_size.height);
                        self.set_measured_width(fb_width as f64);
                    }
                    WindowEvent::RedrawRequested => {
                        if let Some(ref receiver) = receiver {
                            self.drain_commands(receiver);
                        }
                        let blink_active = self.blinker.poll(Instant::now());
                        if let Some(ref tree) = self.tree {
                            let state = FrameState {
                                tree,
                                percent: self.percent,
                                readout: &self.readout,
                                blink_active,
                            };
                            let scene = build_scene(&state, fb_width, fb_height);
                            let frame = pixels.frame_mut();
                            let mut canvas = Canvas::new(frame, fb_width, fb_height);
                            scene.paint(&mut canvas, &font);
                            let _ = pixels.render();
                        }
                    }
                    _ => {}
                },
                Event::AboutToWait => {
                    if last_frame.elapsed() >= frame_duration {
                        window_clone.request_redraw();
                        last_frame = Instant::now();
                    }
                }
                _ => {}
            }
        })?;

        Ok(())
    }

    fn drain_commands(&mut self, receiver: &Receiver<GaugeCommand>) {
        while let Ok(command) = receiver.try_recv() {
            match command {
                GaugeCommand::Update(value) => self.update(value),
                GaugeCommand::SetAttribute(name, raw) => {
                    self.set_attribute(&name, &raw);
                }
                GaugeCommand::Message { topic, value } => {
                    if registry::topic_matches(&topic) {
                        self.update(value);
                    } else {
                        log::debug!("dropping message on topic {topic:?}");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn detached_gauge_absorbs_updates_silently() {
        let mut gauge = Gauge::new(GaugeConfig::default());
        gauge.update(75.0);
        assert_eq!(gauge.readout(), "");
        assert_eq!(gauge.percent(), 0.0);
        assert_eq!(gauge.last_value(), Some(75.0));
    }

    #[test]
    fn attach_reapplies_the_absorbed_value() {
        let mut gauge = Gauge::new(GaugeConfig::default());
        gauge.update(75.0);
        gauge.attach(300.0);
        assert_eq!(gauge.readout(), "75.0");
        assert_eq!(gauge.percent(), 75.0);
        assert!(gauge.tree().is_some());
    }

    #[test]
    fn a_zero_value_is_reapplied_like_any_other() {
        let mut gauge = Gauge::new(GaugeConfig::default());
        gauge.attach(300.0);
        gauge.update(0.0);
        gauge.set_attribute("max", "200");
        assert_eq!(gauge.readout(), "0.0");
        assert_eq!(gauge.percent(), 0.0);
        assert_eq!(gauge.last_value(), Some(0.0));
    }

    #[test]
    fn percent_is_unclamped_beyond_the_bounds() {
        let mut gauge = Gauge::new(GaugeConfig::default());
        gauge.attach(300.0);
        gauge.update(150.0);
        assert_eq!(gauge.percent(), 150.0);
        gauge.update(-20.0);
        assert_eq!(gauge.percent(), -20.0);
    }

    #[test]
    fn multiplier_divides_the_readout_but_not_the_needle() {
        let mut gauge = Gauge::new(GaugeConfig::default());
        gauge.attach(300.0);
        gauge.set_attribute("max", "1200");
        gauge.set_attribute("multiplier", "100");
        gauge.update(600.0);
        assert_eq!(gauge.readout(), "6.0");
        assert_eq!(gauge.percent(), 50.0);
    }

    #[test]
    fn repeated_raw_attribute_is_a_noop() {
        let mut gauge = Gauge::new(GaugeConfig::default());
        assert_eq!(gauge.set_attribute("max", "1200"), ConfigChange::Applied);
        assert_eq!(gauge.set_attribute("max", "1200"), ConfigChange::Unchanged);
        assert_eq!(gauge.set_attribute("max", "1300"), ConfigChange::Applied);
    }

    #[test]
    fn unknown_attribute_does_not_touch_the_tree() {
        let mut gauge = Gauge::new(GaugeConfig::default());
        gauge.attach(300.0);
        let before = gauge.tree().cloned();
        assert_eq!(gauge.set_attribute("sparkle", "lots"), ConfigChange::Unknown);
        assert_eq!(gauge.tree().cloned(), before);
    }

    #[test]
    fn attribute_change_rebuilds_the_tree_and_reapplies_the_value() {
        let mut gauge = Gauge::new(GaugeConfig::default());
        gauge.attach(300.0);
        gauge.update(600.0);
        assert_eq!(gauge.percent(), 600.0);
        gauge.set_attribute("max", "1200");
        assert_eq!(gauge.percent(), 50.0);
        assert_eq!(gauge.readout(), "600.0");
    }

    #[test]
    fn detach_drops_tree_readout_and_pending_blink() {
        let t0 = Instant::now();
        let mut gauge = Gauge::new(GaugeConfig::default());
        gauge.attach(300.0);
        gauge.update_at(42.0, t0);
        assert!(gauge.blink_active(t0 + Duration::from_millis(100)));
        gauge.update_at(43.0, t0 + Duration::from_millis(200));
        gauge.detach();
        assert!(!gauge.is_attached());
        assert_eq!(gauge.readout(), "");
        assert!(!gauge.blink_active(t0 + Duration::from_millis(300)));
        // The value itself survives for the next attach.
        assert_eq!(gauge.last_value(), Some(43.0));
    }

    #[test]
    fn disabled_led_never_blinks() {
        let t0 = Instant::now();
        let mut gauge = Gauge::new(GaugeConfig::builder().led(false).build());
        gauge.attach(300.0);
        gauge.update_at(10.0, t0);
        assert!(!gauge.blink_active(t0 + Duration::from_millis(1)));
    }

    #[test]
    fn resize_rebuilds_with_the_new_width() {
        let mut gauge = Gauge::new(GaugeConfig::default());
        gauge.attach(300.0);
        assert_eq!(gauge.tree().unwrap().container_size, 6.0);
        gauge.set_measured_width(500.0);
        assert_eq!(gauge.tree().unwrap().container_size, 10.0);
    }
}
