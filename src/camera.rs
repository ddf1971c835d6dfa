//! Camera: pan/zoom transform over the world canvas
//!
//! `scale`, `tx`, `ty` map world pixels to canvas backing-store pixels:
//! `screen = world * scale + (tx, ty)`. Page (CSS) coordinates divide by the
//! device pixel ratio and add the canvas rect origin.

use glam::Vec2;

use crate::sim::WorldState;
use crate::sim::math::{ease_in_out_cubic, lerp};
use crate::tuning::CameraTuning;
use crate::world_center;

/// Options for `Camera::focus_on_address`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusOptions {
    /// Zoom relative to fit scale; `None` keeps the current zoom
    pub zoom: Option<f32>,
    pub duration_ms: f64,
}

impl Default for FocusOptions {
    fn default() -> Self {
        Self {
            zoom: Some(2.5),
            duration_ms: 600.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FocusTween {
    from_center: Vec2,
    to_center: Vec2,
    from_scale: f32,
    to_scale: f32,
    start_ms: f64,
    dur_ms: f64,
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub scale: f32,
    pub tx: f32,
    pub ty: f32,
    /// Pan momentum in backing px per 60 Hz frame
    pub vx: f32,
    pub vy: f32,
    /// Scale at which the whole world fits the canvas
    pub fit_scale: f32,
    initialized: bool,
    /// Canvas backing-store size
    canvas: Vec2,
    dpr: f32,
    /// Canvas rect origin in page coordinates
    origin: Vec2,
    dragging: bool,
    last_drag: Option<Vec2>,
    tween: Option<FocusTween>,
    tuning: CameraTuning,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraTuning::default())
    }
}

impl Camera {
    pub fn new(tuning: CameraTuning) -> Self {
        Self {
            scale: 1.0,
            tx: 0.0,
            ty: 0.0,
            vx: 0.0,
            vy: 0.0,
            fit_scale: 1.0,
            initialized: false,
            canvas: Vec2::ZERO,
            dpr: 1.0,
            origin: Vec2::ZERO,
            dragging: false,
            last_drag: None,
            tween: None,
            tuning,
        }
    }

    /// Record the canvas CSS size, device pixel ratio and page origin
    pub fn set_viewport(&mut self, css_size: Vec2, dpr: f32, origin: Vec2) {
        self.dpr = if dpr > 0.0 { dpr } else { 1.0 };
        self.canvas = css_size * self.dpr;
        self.origin = origin;
    }

    #[inline]
    pub fn canvas_size(&self) -> Vec2 {
        self.canvas
    }

    #[inline]
    pub fn dpr(&self) -> f32 {
        self.dpr
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Current zoom relative to the fit scale
    #[inline]
    pub fn zoom(&self) -> f32 {
        if self.fit_scale > 0.0 {
            self.scale / self.fit_scale
        } else {
            1.0
        }
    }

    #[inline]
    pub fn min_scale(&self) -> f32 {
        self.fit_scale * self.tuning.min_fit_factor
    }

    #[inline]
    pub fn max_scale(&self) -> f32 {
        self.tuning.max_zoom.max(self.min_scale())
    }

    #[inline]
    fn clamp_scale(&self, scale: f32) -> f32 {
        scale.clamp(self.min_scale(), self.max_scale())
    }

    /// Compute the fit scale for `world` and (re)position the view.
    ///
    /// With `fit_fully`, or on first use, snaps to the fit scale centered on
    /// the world. Otherwise keeps the world point at the old canvas center,
    /// which is what a resize wants.
    pub fn position_to_world(
        &mut self,
        world: Vec2,
        fit_fully: bool,
        previous_canvas: Option<Vec2>,
    ) {
        if self.canvas.x <= 0.0 || self.canvas.y <= 0.0 || world.x <= 0.0 || world.y <= 0.0 {
            return;
        }
        self.fit_scale = (self.canvas.x / world.x).min(self.canvas.y / world.y);

        if fit_fully || !self.initialized {
            self.scale = self.fit_scale;
            self.center_on(world_center(world));
            self.initialized = true;
            self.vx = 0.0;
            self.vy = 0.0;
            self.tween = None;
            return;
        }

        let old_half = previous_canvas.unwrap_or(self.canvas) * 0.5;
        let focal = self.screen_to_world(old_half);
        self.scale = self.clamp_scale(self.scale);
        self.center_on(focal);
    }

    /// Put world point `p` at the canvas center at the current scale
    pub fn center_on(&mut self, p: Vec2) {
        self.tx = self.canvas.x * 0.5 - p.x * self.scale;
        self.ty = self.canvas.y * 0.5 - p.y * self.scale;
    }

    /// Animate to center the sprite for `address`. False if it is not indexed.
    pub fn focus_on_address(
        &mut self,
        world: &WorldState,
        address: &str,
        options: FocusOptions,
        now_ms: f64,
    ) -> bool {
        let Some(sprite) = world.sprite(address) else {
            return false;
        };
        self.focus_on(sprite.target, options, now_ms);
        true
    }

    /// Animate toward `point` at the requested zoom
    pub fn focus_on(&mut self, point: Vec2, options: FocusOptions, now_ms: f64) {
        let to_scale = options
            .zoom
            .map_or(self.scale, |z| self.clamp_scale(z * self.fit_scale));
        let dur_ms = options
            .duration_ms
            .clamp(self.tuning.focus_min_ms, self.tuning.focus_max_ms);
        self.vx = 0.0;
        self.vy = 0.0;
        self.tween = Some(FocusTween {
            from_center: self.screen_to_world(self.canvas * 0.5),
            to_center: point,
            from_scale: self.scale,
            to_scale,
            start_ms: now_ms,
            dur_ms,
        });
    }

    #[inline]
    pub fn is_animating(&self) -> bool {
        self.tween.is_some()
    }

    /// Advance the focus tween. Returns true while one is running.
    pub fn update(&mut self, now_ms: f64) -> bool {
        let Some(tween) = self.tween else {
            return false;
        };
        let u = ((now_ms - tween.start_ms) / tween.dur_ms.max(1.0)).clamp(0.0, 1.0) as f32;
        let e = ease_in_out_cubic(u);
        self.scale = lerp(tween.from_scale, tween.to_scale, e);
        self.center_on(tween.from_center.lerp(tween.to_center, e));
        if u >= 1.0 {
            self.tween = None;
        }
        true
    }

    /// Coast on release momentum. Skipped while dragging or tweening.
    pub fn apply_momentum(&mut self, dt_ms: f64) {
        if self.dragging || self.tween.is_some() {
            return;
        }
        if self.vx.abs() < 0.01 && self.vy.abs() < 0.01 {
            self.vx = 0.0;
            self.vy = 0.0;
            return;
        }
        let frames = (dt_ms / (1000.0 / 60.0)) as f32;
        self.tx += self.vx * frames;
        self.ty += self.vy * frames;
        let decay = self.tuning.momentum_damping.powf(frames);
        self.vx *= decay;
        self.vy *= decay;
    }

    // ---- Input ----

    /// Start a pan at canvas point `at` (backing px); cancels tween and momentum
    pub fn begin_drag(&mut self, at: Vec2) {
        self.dragging = true;
        self.last_drag = Some(at);
        self.tween = None;
        self.vx = 0.0;
        self.vy = 0.0;
    }

    /// Pan to canvas point `at`; release velocity is tracked per 60 Hz frame
    pub fn drag_to(&mut self, at: Vec2, dt_ms: f64) {
        let Some(last) = self.last_drag else {
            return;
        };
        let delta = at - last;
        self.tx += delta.x;
        self.ty += delta.y;
        let frames = ((dt_ms / (1000.0 / 60.0)) as f32).max(1.0);
        // Light smoothing so a single jittery move does not dominate the fling
        self.vx = lerp(self.vx, delta.x / frames, 0.5);
        self.vy = lerp(self.vy, delta.y / frames, 0.5);
        self.last_drag = Some(at);
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
        self.last_drag = None;
    }

    /// Multiply scale by `factor` keeping the world point under `at` fixed
    pub fn zoom_at(&mut self, at: Vec2, factor: f32) {
        if factor <= 0.0 {
            return;
        }
        let anchor = self.screen_to_world(at);
        self.scale = self.clamp_scale(self.scale * factor);
        self.tx = at.x - anchor.x * self.scale;
        self.ty = at.y - anchor.y * self.scale;
        self.tween = None;
    }

    // ---- Projection ----

    #[inline]
    pub fn world_to_screen(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x * self.scale + self.tx, p.y * self.scale + self.ty)
    }

    #[inline]
    pub fn screen_to_world(&self, s: Vec2) -> Vec2 {
        let scale = if self.scale.abs() > f32::EPSILON { self.scale } else { 1.0 };
        Vec2::new((s.x - self.tx) / scale, (s.y - self.ty) / scale)
    }

    /// World point to page (CSS) coordinates, for DOM overlays
    pub fn world_to_page(&self, p: Vec2) -> Vec2 {
        self.origin + self.world_to_screen(p) / self.dpr
    }

    /// Page (CSS) point to canvas backing px
    pub fn page_to_screen(&self, page: Vec2) -> Vec2 {
        (page - self.origin) * self.dpr
    }

    /// Visible world rect `(min, max)` grown by `margin` screen px
    pub fn visible_world_rect(&self, margin: f32) -> (Vec2, Vec2) {
        let min = self.screen_to_world(Vec2::splat(-margin));
        let max = self.screen_to_world(self.canvas + Vec2::splat(margin));
        (min, max)
    }
}
