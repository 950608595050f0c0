//! Radial wheel: guide lines, one ring per style, one point per playable
//! (segment, style) pair, and the inverse mapping from a pointer position
//! back to the point under it.

use egui::{Color32, Painter, Pos2, Stroke, Vec2};
use std::f32::consts::{FRAC_PI_2, TAU};
use std::rc::Rc;
use std::time::Duration;
use web_time::Instant;

use crate::album::Album;
use crate::config::WheelConfig;
use crate::styles::StyleConfig;

const POINT_RADIUS: f32 = 6.0;
const HOVER_POINT_RADIUS: f32 = 10.0;
const ACTIVE_POINT_RADIUS: f32 = 12.0;
const GLOW_RADIUS: f32 = 24.0;
const RING_WIDTH: f32 = 3.0;
const ACTIVE_RING_WIDTH: f32 = 5.0;
const ACTIVE_BORDER_WIDTH: f32 = 3.0;

/// A (segment, style) pair on the wheel.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HitPoint {
    pub segment: u32,
    pub style: String,
}

impl HitPoint {
    pub fn new(segment: u32, style: impl Into<String>) -> Self {
        Self {
            segment,
            style: style.into(),
        }
    }
}

/// Canvas geometry in logical pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelLayout {
    pub size: f32,
    pub pixels_per_point: f32,
    pub mobile: bool,
}

impl WheelLayout {
    pub fn for_viewport(width: f32, pixels_per_point: f32, config: &WheelConfig) -> Self {
        let mobile = config.is_mobile_width(width);
        Self {
            size: if mobile {
                config.mobile_canvas_size
            } else {
                config.desktop_canvas_size
            },
            pixels_per_point: if pixels_per_point > 0.0 { pixels_per_point } else { 1.0 },
            mobile,
        }
    }

    pub fn center(&self) -> Pos2 {
        Pos2::new(self.size / 2.0, self.size / 2.0)
    }

    /// Backing-store size in device pixels.
    pub fn physical_size(&self) -> u32 {
        (self.size * self.pixels_per_point).round() as u32
    }
}

/// Relayout only after the viewport size actually changes, once it has been
/// stable for the debounce window.
#[derive(Clone, Debug)]
struct ResizeTracker {
    debounce: Duration,
    last_size: Option<(f32, f32)>,
    pending: Option<PendingResize>,
}

#[derive(Clone, Copy, Debug)]
struct PendingResize {
    width: f32,
    pixels_per_point: f32,
    due: Instant,
}

impl ResizeTracker {
    fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            last_size: None,
            pending: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointTreatment {
    Normal,
    Hover,
    Active,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GuideLine {
    pub from: Pos2,
    pub to: Pos2,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ring {
    pub style: String,
    pub radius: f32,
    pub color: Color32,
    pub width: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WheelPoint {
    pub at: HitPoint,
    pub pos: Pos2,
    pub color: Color32,
    pub treatment: PointTreatment,
}

/// Everything one paint needs, in canvas-local coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WheelScene {
    pub center: Pos2,
    pub guide_color: Color32,
    pub guides: Vec<GuideLine>,
    pub rings: Vec<Ring>,
    pub points: Vec<WheelPoint>,
}

pub struct WheelRenderer {
    config: WheelConfig,
    layout: WheelLayout,
    resize: ResizeTracker,
    album: Option<Rc<Album>>,
    styles: Rc<StyleConfig>,
    num_tracks: usize,
    num_styles: usize,
    selection: Option<HitPoint>,
    hover: Option<HitPoint>,
    // None means the next paint rebuilds it.
    scene: Option<WheelScene>,
}

impl WheelRenderer {
    pub fn new(config: &WheelConfig) -> Self {
        Self {
            layout: WheelLayout::for_viewport(f32::INFINITY, 1.0, config),
            resize: ResizeTracker::new(config.resize_debounce()),
            album: None,
            styles: Rc::new(StyleConfig::empty(config)),
            num_tracks: 0,
            num_styles: 0,
            selection: None,
            hover: None,
            scene: None,
            config: config.clone(),
        }
    }

    /// Replace the render model. The previous album is dropped here.
    pub fn configure(&mut self, album: Option<Rc<Album>>, styles: Rc<StyleConfig>) {
        self.num_tracks = album.as_ref().map_or(0, |a| a.track_count());
        self.num_styles = styles.len();
        log::debug!(
            "wheel configured: {} tracks, {} styles",
            self.num_tracks,
            self.num_styles
        );
        self.album = album;
        self.styles = styles;
        self.hover = None;
        self.invalidate();
    }

    pub fn set_styles(&mut self, styles: Rc<StyleConfig>) {
        self.num_styles = styles.len();
        self.styles = styles;
        self.invalidate();
    }

    pub fn set_selection(&mut self, selection: Option<HitPoint>) {
        if self.selection != selection {
            self.selection = selection;
            self.invalidate();
        }
    }

    pub fn set_hover(&mut self, hover: Option<HitPoint>) {
        if self.hover != hover {
            self.hover = hover;
            self.invalidate();
        }
    }

    pub fn selection(&self) -> Option<&HitPoint> {
        self.selection.as_ref()
    }

    pub fn hover(&self) -> Option<&HitPoint> {
        self.hover.as_ref()
    }

    pub fn layout(&self) -> WheelLayout {
        self.layout
    }

    pub fn num_tracks(&self) -> usize {
        self.num_tracks
    }

    pub fn num_styles(&self) -> usize {
        self.num_styles
    }

    pub fn needs_repaint(&self) -> bool {
        self.scene.is_none()
    }

    fn invalidate(&mut self) {
        self.scene = None;
    }

    // ===== Viewport =====

    /// Feed the current viewport every frame; only a real size change arms
    /// the debounce timer.
    pub fn observe_viewport(&mut self, width: f32, height: f32, pixels_per_point: f32, now: Instant) {
        match self.resize.last_size {
            None => {
                self.resize.last_size = Some((width, height));
                self.apply_layout(WheelLayout::for_viewport(width, pixels_per_point, &self.config));
            }
            Some(last) if last == (width, height) => {}
            Some(_) => {
                self.resize.last_size = Some((width, height));
                self.resize.pending = Some(PendingResize {
                    width,
                    pixels_per_point,
                    due: now + self.resize.debounce,
                });
            }
        }
    }

    /// Applies a settled resize. Returns `true` when the layout changed.
    pub fn poll_resize(&mut self, now: Instant) -> bool {
        match self.resize.pending {
            Some(p) if now >= p.due => {
                self.resize.pending = None;
                let layout = WheelLayout::for_viewport(p.width, p.pixels_per_point, &self.config);
                let changed = layout != self.layout;
                self.apply_layout(layout);
                changed
            }
            _ => false,
        }
    }

    fn apply_layout(&mut self, layout: WheelLayout) {
        if layout != self.layout {
            log::debug!(
                "canvas relayout: {}px ({} device px, mobile={})",
                layout.size,
                layout.physical_size(),
                layout.mobile
            );
            self.layout = layout;
            self.invalidate();
        }
    }

    // ===== Geometry =====

    fn slot_count(&self) -> usize {
        self.num_tracks * 2
    }

    fn slot_angle(&self, segment: u32) -> f32 {
        (segment as f32 - 1.0) * TAU / self.slot_count() as f32 - FRAC_PI_2
    }

    pub fn radius(&self, style: &str) -> f32 {
        self.styles.radius(style, self.layout.mobile)
    }

    /// Canvas position of a drawn point, `None` when nothing is drawn there.
    pub fn point_position(&self, segment: u32, style: &str) -> Option<Pos2> {
        let album = self.album.as_ref()?;
        album.audio(segment, style)?;
        self.styles.get(style)?;
        let angle = self.slot_angle(segment);
        let radius = self.radius(style);
        Some(self.layout.center() + Vec2::angled(angle) * radius)
    }

    /// Maps a canvas-local position to the point under it.
    ///
    /// The angle snaps to the nearest of the 2N slots; the first style in
    /// declaration order whose ring lies within the tolerance and whose track
    /// has audio wins.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<HitPoint> {
        let album = self.album.as_ref()?;
        let slots = self.slot_count();
        if slots == 0 {
            return None;
        }
        let center = self.layout.center();
        let (dx, dy) = (x - center.x, y - center.y);
        let distance = dx.hypot(dy);
        let mut angle = dy.atan2(dx) + FRAC_PI_2;
        if angle < 0.0 {
            angle += TAU;
        }
        let slot_width = TAU / slots as f32;
        let index = (angle / slot_width).round() as usize % slots;
        let segment = index as u32 + 1;
        let track = album.track(segment)?;

        self.styles
            .iter()
            .filter(|style| track.audio(&style.key).is_some())
            .find(|style| {
                (distance - style.radius(self.layout.mobile)).abs() < self.config.hit_tolerance
            })
            .map(|style| HitPoint::new(segment, style.key.clone()))
    }

    /// Hit-test and store the result as the hover point.
    pub fn pointer_moved(&mut self, x: f32, y: f32) -> Option<HitPoint> {
        let hit = self.hit_test(x, y);
        self.set_hover(hit.clone());
        hit
    }

    pub fn pointer_left(&mut self) {
        self.set_hover(None);
    }

    // ===== Scene =====

    /// Deterministic function of the current state.
    pub fn build_scene(&self) -> WheelScene {
        let center = self.layout.center();
        let alpha = (self.config.guide_line_opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        let mut scene = WheelScene {
            center,
            guide_color: Color32::from_rgba_unmultiplied(255, 255, 255, alpha),
            ..Default::default()
        };

        let slots = self.slot_count();
        let guide_length = self
            .styles
            .first_key()
            .map_or(self.config.guide_fallback_length, |k| {
                self.radius(k) * self.config.guide_overshoot
            });
        for i in 0..slots {
            let angle = i as f32 * TAU / slots as f32 - FRAC_PI_2;
            scene.guides.push(GuideLine {
                from: center,
                to: center + Vec2::angled(angle) * guide_length,
            });
        }

        if self.styles.is_empty() {
            log::debug!("no styles configured, skipping rings");
        }
        let active_style = self.selection.as_ref().map(|s| s.style.as_str());
        for style in self.styles.iter() {
            let active = active_style == Some(style.key.as_str());
            scene.rings.push(Ring {
                style: style.key.clone(),
                radius: style.radius(self.layout.mobile),
                color: style.color32(),
                width: if active { ACTIVE_RING_WIDTH } else { RING_WIDTH },
            });
        }

        let Some(album) = self.album.as_ref() else {
            return scene;
        };
        for (&segment, track) in &album.tracks {
            let direction = Vec2::angled(self.slot_angle(segment));
            for style in self.styles.iter() {
                if track.audio(&style.key).is_none() {
                    continue;
                }
                let at = HitPoint::new(segment, style.key.clone());
                let treatment = if self.selection.as_ref() == Some(&at) {
                    PointTreatment::Active
                } else if self.hover.as_ref() == Some(&at) {
                    PointTreatment::Hover
                } else {
                    PointTreatment::Normal
                };
                scene.points.push(WheelPoint {
                    pos: center + direction * style.radius(self.layout.mobile),
                    color: style.color32(),
                    treatment,
                    at,
                });
            }
        }
        scene
    }

    pub fn scene(&mut self) -> &WheelScene {
        if self.scene.is_none() {
            self.scene = Some(self.build_scene());
        }
        self.scene.get_or_insert_with(WheelScene::default)
    }

    /// Paint with the canvas' top-left corner at `origin`.
    pub fn paint(&mut self, painter: &Painter, origin: Pos2) {
        let offset = origin.to_vec2();
        let scene = self.scene();

        for guide in &scene.guides {
            painter.line_segment(
                [guide.from + offset, guide.to + offset],
                Stroke::new(1.0, scene.guide_color),
            );
        }

        for ring in &scene.rings {
            painter.circle_stroke(
                scene.center + offset,
                ring.radius,
                Stroke::new(ring.width, ring.color),
            );
        }

        for point in &scene.points {
            let pos = point.pos + offset;
            if point.treatment != PointTreatment::Normal {
                paint_glow(painter, pos);
            }
            match point.treatment {
                PointTreatment::Active => painter.circle(
                    pos,
                    ACTIVE_POINT_RADIUS,
                    point.color,
                    Stroke::new(ACTIVE_BORDER_WIDTH, Color32::WHITE),
                ),
                PointTreatment::Hover => painter.circle_filled(pos, HOVER_POINT_RADIUS, Color32::WHITE),
                PointTreatment::Normal => painter.circle_filled(
                    pos,
                    POINT_RADIUS,
                    Color32::from_rgba_unmultiplied(255, 255, 255, 230),
                ),
            };
        }
    }
}

// Stacked translucent discs stand in for a radial gradient.
fn paint_glow(painter: &Painter, pos: Pos2) {
    const LAYERS: u8 = 4;
    for layer in 0..LAYERS {
        let t = f32::from(layer + 1) / f32::from(LAYERS);
        let alpha = (0.6 * 255.0 / f32::from(LAYERS) * t) as u8;
        painter.circle_filled(
            pos,
            GLOW_RADIUS * (1.0 - t) + POINT_RADIUS * t,
            Color32::from_rgba_unmultiplied(255, 255, 255, alpha),
        );
    }
}
