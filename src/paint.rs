//! Scene lowering and software rasterization of the render tree.
//!
//! The tree is structural only; this module assigns geometry (the fixed
//! 270-degree arc), the palette, and text layout, producing a flat list of
//! draw commands that are then painted into an RGBA frame with
//! anti-aliased primitives.

use rusttype::{point, Font, PositionedGlyph, Scale};

use crate::config::ZoneKind;
use crate::tree::{
    major_tick_angle, needle_angle, subtick_angle, RenderNode, RenderTree, ARC_SPAN,
    MAJOR_DIVISIONS,
};

/// RGB color of a painted element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

// Dark palette, hues lifted from the widget's stylesheet.
const BACKGROUND: Color = Color::new(0x14, 0x15, 0x18);
const BODY_COLOR: Color = Color::new(0x2b, 0x2e, 0x33);
const RING_COLOR: Color = Color::new(0x53, 0x57, 0x5e);
const TEXT_COLOR: Color = Color::new(0xd8, 0xda, 0xde);
const NEEDLE_COLOR: Color = Color::new(0xdf, 0x30, 0x2a); // hsl(1 74% 52%)
const HUB_COLOR: Color = Color::new(0xb4, 0xb6, 0xba);
const RIVET_COLOR: Color = Color::new(0x1e, 0x20, 0x24);
const LED_ACTIVE: Color = Color::new(0xff, 0x26, 0x26);
const LED_IDLE: Color = Color::new(0x54, 0x12, 0x12);
const ZONE_ALPHA: f32 = 0.45;

/// One major-tick interval, radians.
const ZONE_STEP: f64 = ARC_SPAN / MAJOR_DIVISIONS;

fn zone_color(kind: ZoneKind) -> Color {
    match kind {
        ZoneKind::Low => Color::new(0x4d, 0xc4, 0xff),    // hsl(200 100% 65%)
        ZoneKind::Normal => Color::new(0x91, 0xff, 0x4d), // hsl(97 100% 65%)
        ZoneKind::Warn => Color::new(0xff, 0xb6, 0x2e),   // hsl(39 100% 59%)
        ZoneKind::High => Color::new(0xff, 0x6c, 0x59),   // hsl(5 100% 65%)
    }
}

/// hue in degrees, saturation and lightness in 0..=1.
fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Color {
    let h = h.rem_euclid(360.0);
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = l - c / 2.0;
    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    Color::new(
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    )
}

/// Everything needed to paint one frame: the retained tree plus the
/// driving properties that change without a rebuild.
pub struct FrameState<'a> {
    pub tree: &'a RenderTree,
    /// Needle driving percentage, 0-100, unclamped.
    pub percent: f64,
    /// Readout text; empty until the first update.
    pub readout: &'a str,
    pub blink_active: bool,
}

#[derive(Debug, Clone)]
pub enum DrawCommand {
    Clear(Color),
    /// Rounded square panel.
    Panel {
        cx: i32,
        cy: i32,
        half: i32,
        corner: i32,
        color: Color,
    },
    Disc {
        cx: i32,
        cy: i32,
        r: i32,
        color: Color,
    },
    /// Annular sector between two radii and two screen-space angles.
    ArcBand {
        cx: i32,
        cy: i32,
        inner: f64,
        outer: f64,
        start: f64,
        end: f64,
        color: Color,
        alpha: f32,
    },
    /// Radial tick from `r` inward by `length`.
    Tick {
        cx: i32,
        cy: i32,
        r: i32,
        angle: f64,
        length: i32,
        thickness: f32,
        color: Color,
    },
    NeedleLine {
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        thickness: f32,
        tapered: bool,
        color: Color,
    },
    /// Text centered on (x, y).
    Text {
        x: i32,
        y: i32,
        text: String,
        size: f32,
        color: Color,
    },
}

pub struct Scene {
    commands: Vec<DrawCommand>,
}

impl Scene {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn paint(&self, canvas: &mut Canvas<'_>, font: &Font<'_>) {
        for command in &self.commands {
            match command {
                DrawCommand::Clear(color) => canvas.clear(*color),
                DrawCommand::Panel {
                    cx,
                    cy,
                    half,
                    corner,
                    color,
                } => canvas.rounded_panel(*cx, *cy, *half, *corner, *color),
                DrawCommand::Disc { cx, cy, r, color } => canvas.disc(*cx, *cy, *r, *color),
                DrawCommand::ArcBand {
                    cx,
                    cy,
                    inner,
                    outer,
                    start,
                    end,
                    color,
                    alpha,
                } => canvas.arc_band(*cx, *cy, *inner, *outer, *start, *end, *color, *alpha),
                DrawCommand::Tick {
                    cx,
                    cy,
                    r,
                    angle,
                    length,
                    thickness,
                    color,
                } => {
                    let outer_x = f64::from(*cx) + angle.cos() * f64::from(*r - 1);
                    let outer_y = f64::from(*cy) + angle.sin() * f64::from(*r - 1);
                    let inner_x = f64::from(*cx) + angle.cos() * f64::from(*r - *length);
                    let inner_y = f64::from(*cy) + angle.sin() * f64::from(*r - *length);
                    canvas.thick_line(
                        inner_x.round() as i32,
                        inner_y.round() as i32,
                        outer_x.round() as i32,
                        outer_y.round() as i32,
                        *thickness,
                        *color,
                    );
                }
                DrawCommand::NeedleLine {
                    x0,
                    y0,
                    x1,
                    y1,
                    thickness,
                    tapered,
                    color,
                } => {
                    if *tapered {
                        canvas.tapered_line(*x0, *y0, *x1, *y1, *thickness, *color);
                    } else {
                        canvas.thick_line(*x0, *y0, *x1, *y1, *thickness, *color);
                    }
                }
                DrawCommand::Text {
                    x,
                    y,
                    text,
                    size,
                    color,
                } => canvas.text(*x, *y, text, font, Scale::uniform(*size), *color),
            }
        }
    }
}

/// Lower the render tree and driving properties into draw commands for a
/// frame of the given size.
pub fn build_scene(state: &FrameState<'_>, width: usize, height: usize) -> Scene {
    let tree = state.tree;
    let cx = width as i32 / 2;
    let cy = height as i32 / 2;
    let half = (width.min(height) as f64 * 0.49) as i32;
    let ring_r = (f64::from(half) * 0.94) as i32;
    let plate_r = (f64::from(ring_r) * 0.93) as i32;
    let pr = f64::from(plate_r);

    let mut scene = Scene::new();
    scene.push(DrawCommand::Clear(BACKGROUND));

    for node in &tree.nodes {
        match node {
            RenderNode::Body { round } => {
                if *round {
                    scene.push(DrawCommand::Disc {
                        cx,
                        cy,
                        r: half,
                        color: BODY_COLOR,
                    });
                } else {
                    scene.push(DrawCommand::Panel {
                        cx,
                        cy,
                        half,
                        corner: (f64::from(half) * 0.3) as i32,
                        color: BODY_COLOR,
                    });
                }
            }
            RenderNode::Ring => scene.push(DrawCommand::Disc {
                cx,
                cy,
                r: ring_r,
                color: RING_COLOR,
            }),
            RenderNode::Rivet { corner } => {
                let inset = (f64::from(half) * 0.88) as i32;
                let (sx, sy) = match corner {
                    0 => (-1, -1),
                    1 => (1, -1),
                    2 => (-1, 1),
                    _ => (1, 1),
                };
                scene.push(DrawCommand::Disc {
                    cx: cx + sx * inset,
                    cy: cy + sy * inset,
                    r: ((f64::from(half) * 0.05) as i32).max(2),
                    color: RIVET_COLOR,
                });
            }
            RenderNode::Plate => {
                // Coarse stand-in for the radial gradient: three discs.
                scene.push(DrawCommand::Disc {
                    cx,
                    cy,
                    r: plate_r,
                    color: hsl_to_rgb(tree.plate_hue, 0.69, 0.10),
                });
                scene.push(DrawCommand::Disc {
                    cx,
                    cy,
                    r: (pr * 0.80) as i32,
                    color: hsl_to_rgb(tree.plate_hue, 0.20, 0.30),
                });
                scene.push(DrawCommand::Disc {
                    cx,
                    cy,
                    r: (pr * 0.45) as i32,
                    color: hsl_to_rgb(tree.plate_hue, 0.31, 0.17),
                });
            }
            RenderNode::Zone(zone) => {
                let span = ZONE_STEP * f64::from(zone.cover.steps());
                // Unrotated zones start at 12 o'clock; rotation is clockwise.
                let start = -std::f64::consts::FRAC_PI_2 + zone.rotate.to_radians();
                scene.push(DrawCommand::ArcBand {
                    cx,
                    cy,
                    inner: pr * 0.78,
                    outer: pr * 0.97,
                    start,
                    end: start + span,
                    color: zone_color(zone.kind),
                    alpha: ZONE_ALPHA,
                });
            }
            RenderNode::Led => scene.push(DrawCommand::Disc {
                cx,
                cy: cy - (pr * 0.46) as i32,
                r: ((pr * 0.035) as i32).max(2),
                color: if state.blink_active { LED_ACTIVE } else { LED_IDLE },
            }),
            RenderNode::MajorTick { index } => scene.push(DrawCommand::Tick {
                cx,
                cy,
                r: (pr * 0.97) as i32,
                angle: major_tick_angle(*index),
                length: (pr * 0.10) as i32,
                thickness: 2.0,
                color: TEXT_COLOR,
            }),
            RenderNode::SubTick { index } => scene.push(DrawCommand::Tick {
                cx,
                cy,
                r: (pr * 0.97) as i32,
                angle: subtick_angle(*index),
                length: (pr * 0.05) as i32,
                thickness: 0.75,
                color: TEXT_COLOR,
            }),
            RenderNode::Number { index, text } => {
                let angle = major_tick_angle(*index);
                // Digit distance is given in container-size units.
                let r_label = (tree.container_size * tree.digit_distance).min(pr * 0.80);
                scene.push(DrawCommand::Text {
                    x: cx + (angle.cos() * r_label) as i32,
                    y: cy + (angle.sin() * r_label) as i32,
                    text: text.clone(),
                    size: (pr * 0.16 * tree.digit_size / 100.0) as f32,
                    color: TEXT_COLOR,
                });
            }
            RenderNode::MeasurementLabel { text } => scene.push(DrawCommand::Text {
                x: cx,
                y: cy - (pr * 0.30) as i32,
                text: text.clone(),
                size: (pr * 0.11) as f32,
                color: TEXT_COLOR,
            }),
            RenderNode::UnitLabel { text } => scene.push(DrawCommand::Text {
                x: cx,
                y: cy + (pr * 0.24) as i32,
                text: text.clone(),
                size: (pr * 0.11) as f32,
                color: TEXT_COLOR,
            }),
            RenderNode::MultiplierLabel { text } => scene.push(DrawCommand::Text {
                x: cx,
                y: cy + (pr * 0.38) as i32,
                text: text.clone(),
                size: (pr * 0.14) as f32,
                color: TEXT_COLOR,
            }),
            RenderNode::Needle => {
                let angle = needle_angle(state.percent);
                let tip_x = (f64::from(cx) + angle.cos() * pr * 0.92) as i32;
                let tip_y = (f64::from(cy) + angle.sin() * pr * 0.92) as i32;
                scene.push(DrawCommand::NeedleLine {
                    x0: cx,
                    y0: cy,
                    x1: tip_x,
                    y1: tip_y,
                    thickness: 4.0,
                    tapered: true,
                    color: NEEDLE_COLOR,
                });
                let back_x = (f64::from(cx) - angle.cos() * pr * 0.22) as i32;
                let back_y = (f64::from(cy) - angle.sin() * pr * 0.22) as i32;
                scene.push(DrawCommand::NeedleLine {
                    x0: cx,
                    y0: cy,
                    x1: back_x,
                    y1: back_y,
                    thickness: 4.0,
                    tapered: false,
                    color: NEEDLE_COLOR,
                });
            }
            RenderNode::NeedleHub => scene.push(DrawCommand::Disc {
                cx,
                cy,
                r: ((pr * 0.07) as i32).max(3),
                color: HUB_COLOR,
            }),
            RenderNode::Readout => {
                if !state.readout.is_empty() {
                    scene.push(DrawCommand::Text {
                        x: cx,
                        y: cy + (pr * 0.72) as i32,
                        text: state.readout.to_string(),
                        size: (pr * 0.13) as f32,
                        color: TEXT_COLOR,
                    });
                }
            }
        }
    }

    scene
}

/// Mutable view of one RGBA frame.
pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: usize,
    height: usize,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: usize, height: usize) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn clear(&mut self, color: Color) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[color.r, color.g, color.b, 0xff]);
        }
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Color, alpha: f32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = (y as usize * self.width + x as usize) * 4;
        if idx + 4 > self.frame.len() {
            return;
        }
        let a = alpha.clamp(0.0, 1.0);
        let dst = &mut self.frame[idx..idx + 4];
        dst[0] = (f32::from(color.r) * a + f32::from(dst[0]) * (1.0 - a)).round() as u8;
        dst[1] = (f32::from(color.g) * a + f32::from(dst[1]) * (1.0 - a)).round() as u8;
        dst[2] = (f32::from(color.b) * a + f32::from(dst[2]) * (1.0 - a)).round() as u8;
        dst[3] = 0xff;
    }

    /// Filled disc with a 1px anti-aliased rim.
    fn disc(&mut self, cx: i32, cy: i32, radius: i32, color: Color) {
        for y in -radius - 1..=radius + 1 {
            for x in -radius - 1..=radius + 1 {
                let dist = f64::from(x * x + y * y).sqrt();
                if dist > f64::from(radius) + 1.0 {
                    continue;
                }
                let aa = if dist > f64::from(radius) {
                    1.0 - (dist - f64::from(radius)).min(1.0)
                } else {
                    1.0
                };
                if aa > 0.0 {
                    self.set_pixel(cx + x, cy + y, color, aa as f32);
                }
            }
        }
    }

    /// Filled rounded square, signed-distance based.
    fn rounded_panel(&mut self, cx: i32, cy: i32, half: i32, corner: i32, color: Color) {
        let corner = corner.min(half) as f32;
        let inner = half as f32 - corner;
        for y in cy - half - 1..=cy + half + 1 {
            for x in cx - half - 1..=cx + half + 1 {
                let qx = (x - cx).abs() as f32 - inner;
                let qy = (y - cy).abs() as f32 - inner;
                let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
                let d = outside + qx.max(qy).min(0.0) - corner;
                let aa = (0.5 - d).clamp(0.0, 1.0);
                if aa > 0.01 {
                    self.set_pixel(x, y, color, aa);
                }
            }
        }
    }

    /// Annular sector with radial anti-aliasing. Angles are screen-space
    /// radians; the sector runs from `start` to `end` clockwise.
    #[allow(clippy::too_many_arguments)]
    fn arc_band(
        &mut self,
        cx: i32,
        cy: i32,
        inner: f64,
        outer: f64,
        start: f64,
        end: f64,
        color: Color,
        alpha: f32,
    ) {
        const TAU: f64 = 2.0 * std::f64::consts::PI;
        let start_n = start.rem_euclid(TAU);
        let end_n = end.rem_euclid(TAU);
        let reach = outer.ceil() as i32 + 1;
        for y in cy - reach..=cy + reach {
            for x in cx - reach..=cx + reach {
                let dx = f64::from(x - cx);
                let dy = f64::from(y - cy);
                let dist = (dx * dx + dy * dy).sqrt();
                if dist < inner - 1.0 || dist > outer + 1.0 {
                    continue;
                }
                let angle = dy.atan2(dx).rem_euclid(TAU);
                let in_arc = if start_n <= end_n {
                    angle >= start_n && angle <= end_n
                } else {
                    angle >= start_n || angle <= end_n
                };
                if !in_arc {
                    continue;
                }
                let radial = if dist < inner + 1.0 {
                    (dist - (inner - 1.0)) / 2.0
                } else if dist > outer - 1.0 {
                    ((outer + 1.0) - dist) / 2.0
                } else {
                    1.0
                };
                let aa = alpha * radial.clamp(0.0, 1.0) as f32;
                if aa > 0.01 {
                    self.set_pixel(x, y, color, aa);
                }
            }
        }
    }

    /// Anti-aliased line of constant thickness.
    fn thick_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, thickness: f32, color: Color) {
        self.line_impl(x0, y0, x1, y1, thickness, false, color);
    }

    /// Anti-aliased line tapering towards (x1, y1).
    fn tapered_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, thickness: f32, color: Color) {
        self.line_impl(x0, y0, x1, y1, thickness, true, color);
    }

    fn line_impl(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        thickness: f32,
        tapered: bool,
        color: Color,
    ) {
        let pad = thickness.ceil() as i32 + 1;
        let dx = (x1 - x0) as f32;
        let dy = (y1 - y0) as f32;
        let len_sq = (dx * dx + dy * dy).max(1.0);
        for y in y0.min(y1) - pad..=y0.max(y1) + pad {
            for x in x0.min(x1) - pad..=x0.max(x1) + pad {
                let px = (x - x0) as f32;
                let py = (y - y0) as f32;
                let t = ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0);
                let lx = x0 as f32 + t * dx;
                let ly = y0 as f32 + t * dy;
                let dist = ((lx - x as f32).powi(2) + (ly - y as f32).powi(2)).sqrt();
                let local = if tapered {
                    // 0.05 floor keeps the tip from vanishing early.
                    thickness * (1.0 - t * 0.95)
                } else {
                    thickness
                };
                let aa = (1.0 - (dist - local / 2.0).clamp(0.0, 1.0)).clamp(0.0, 1.0);
                if aa > 0.01 {
                    self.set_pixel(x, y, color, aa);
                }
            }
        }
    }

    /// Text centered on (x, y).
    fn text(&mut self, x: i32, y: i32, text: &str, font: &Font<'_>, scale: Scale, color: Color) {
        let v_metrics = font.v_metrics(scale);
        let glyphs: Vec<PositionedGlyph<'_>> = font
            .layout(text, scale, point(0.0, v_metrics.ascent))
            .collect();
        let (min_x, max_x, min_y, max_y) = glyphs.iter().filter_map(|g| g.pixel_bounding_box()).fold(
            (i32::MAX, i32::MIN, i32::MAX, i32::MIN),
            |(min_x, max_x, min_y, max_y), bb| {
                (
                    min_x.min(bb.min.x),
                    max_x.max(bb.max.x),
                    min_y.min(bb.min.y),
                    max_y.max(bb.max.y),
                )
            },
        );
        let width_px = if min_x < max_x { max_x - min_x } else { 0 };
        let height_px = if min_y < max_y { max_y - min_y } else { 0 };
        let offset_x = x - width_px / 2;
        let offset_y = y - height_px / 2;
        for glyph in glyphs {
            if let Some(bb) = glyph.pixel_bounding_box() {
                let (gx0, gy0) = (offset_x + bb.min.x - min_x, offset_y + bb.min.y - min_y);
                glyph.draw(|gx, gy, v| {
                    if v > 0.01 {
                        self.set_pixel(gx0 + gx as i32, gy0 + gy as i32, color, v);
                    }
                });
            }
        }
    }
}
