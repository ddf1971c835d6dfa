//! Per-frame render pipeline
//!
//! Order of work each animation frame:
//! 1. Camera tween and momentum
//! 2. Background tile and vignette
//! 3. Entry physics / idle settling
//! 4. Depth-sorted sprites with highlight shaping and overlays
//! 5. Zoom labels

use glam::Vec2;

use super::frames::FrameAtlas;
use super::labels::{LabelCandidate, LabelLayer, candidate_cap, eligible};
use super::surface::DrawSurface;
use crate::camera::Camera;
use crate::events::WorldEvent;
use crate::settings::Settings;
use crate::sim::{Sprite, WorldState};

const BACKGROUND_COLOR: &str = "#1b2a1f";
const VIGNETTE_INNER: &str = "rgba(255, 244, 214, 0.10)";
const VIGNETTE_OUTER: &str = "rgba(0, 0, 0, 0.45)";
const OWNED_RING: &str = "#ffd24a";
const OPPONENT_RING: &str = "#ff4d5e";
const HOVER_RING: &str = "#ffffff";
const INSPECT_RING: &str = "#7cc7ff";

/// Alpha applied to sprites outside the emphasized set in scout mode
pub const DIM_ALPHA: f32 = 0.35;
/// Extra screen px around the viewport before a sprite is culled
pub const CULL_MARGIN: f32 = 64.0;

/// Per-frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub drawn: usize,
    pub culled: usize,
    /// Sprites with no resolvable frame
    pub skipped: usize,
    pub labels: usize,
}

/// Draw-time options derived from `Settings`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub bob: bool,
    pub labels: bool,
    pub vignette: bool,
    pub label_cap_multiplier: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            bob: true,
            labels: true,
            vignette: true,
            label_cap_multiplier: 1.0,
        }
    }
}

impl From<&Settings> for RenderOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            bob: !settings.reduced_motion,
            labels: settings.show_labels,
            vignette: settings.quality.vignette(),
            label_cap_multiplier: settings.quality.label_cap_multiplier(),
        }
    }
}

/// Owns the frame atlas, background tile and label state
pub struct FrameRenderer<I> {
    pub atlas: FrameAtlas<I>,
    pub background: Option<I>,
    pub options: RenderOptions,
    labels: LabelLayer,
    render_ready_sent: bool,
    order: Vec<usize>,
}

impl<I> FrameRenderer<I> {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            atlas: FrameAtlas::new(),
            background: None,
            options,
            labels: LabelLayer::new(),
            render_ready_sent: false,
            order: Vec::new(),
        }
    }

    #[inline]
    pub fn labels(&self) -> &LabelLayer {
        &self.labels
    }

    #[inline]
    pub fn render_ready(&self) -> bool {
        self.render_ready_sent
    }

    /// Render one frame. `dt_ms` should already be clamped by the driver.
    pub fn render<S: DrawSurface<Image = I>>(
        &mut self,
        surface: &mut S,
        world: &mut WorldState,
        camera: &mut Camera,
        now_ms: f64,
        dt_ms: f64,
    ) -> FrameStats {
        let mut stats = FrameStats::default();

        camera.update(now_ms);
        camera.apply_momentum(dt_ms);

        self.draw_background(surface, world, camera);
        world.step(now_ms, dt_ms);

        if !self.atlas.is_ready() {
            return stats;
        }

        // Painter's order by current draw y
        let sprites = world.sprites();
        self.order.clear();
        self.order.extend(0..sprites.len());
        let bob = self.options.bob;
        self.order.sort_by(|&a, &b| {
            let ya = sprites[a].draw_pos(now_ms, bob).y;
            let yb = sprites[b].draw_pos(now_ms, bob).y;
            ya.total_cmp(&yb)
        });

        let canvas = surface.size();
        let zoom = camera.zoom();
        let mut candidates = Vec::new();

        for &i in &self.order {
            let sprite = &sprites[i];
            let Some(frame) = self.atlas.resolve(sprite) else {
                stats.skipped += 1;
                continue;
            };
            let pos = sprite.draw_pos(now_ms, bob);
            let (scale, mut alpha) = sprite.draw_scale_alpha(now_ms);
            let size = sprite.draw_diameter() * scale * camera.scale;
            let screen = camera.world_to_screen(pos);
            let half = size * 0.5;
            if screen.x + half < -CULL_MARGIN
                || screen.y + half < -CULL_MARGIN
                || screen.x - half > canvas.x + CULL_MARGIN
                || screen.y - half > canvas.y + CULL_MARGIN
            {
                stats.culled += 1;
                continue;
            }

            let highlights = &world.highlights;
            if highlights.active && !sprite.placeholder && !highlights.emphasizes(&sprite.address) {
                alpha *= DIM_ALPHA;
            }
            if alpha <= 0.0 {
                continue;
            }

            surface.set_alpha(alpha);
            surface.draw_image(&frame.image, screen.x - half, screen.y - half, size, size);
            draw_overlays(surface, world, sprite, screen, half, alpha, now_ms);
            stats.drawn += 1;

            if self.options.labels
                && !sprite.placeholder
                && eligible(
                    sprite.tier,
                    sprite.is_landmark(),
                    zoom,
                    &world.tuning.labels,
                )
            {
                candidates.push(LabelCandidate {
                    address: sprite.address.clone(),
                    tier: if sprite.is_landmark() { 0 } else { sprite.tier },
                    anchor: Vec2::new(screen.x, screen.y - half),
                    name: sprite.display_name(),
                    handle: sprite
                        .visuals
                        .social_handle
                        .as_deref()
                        .filter(|h| !h.is_empty())
                        .map(|h| format!("@{}", h.trim_start_matches('@'))),
                });
            }
        }
        surface.set_alpha(1.0);

        if self.options.labels {
            let tuning = &world.tuning.labels;
            let cap = candidate_cap(zoom, tuning, self.options.label_cap_multiplier);
            stats.labels = self
                .labels
                .update(surface, candidates, canvas * 0.5, cap, tuning);
            self.labels.draw(surface, tuning);
        } else if !self.labels.is_empty() {
            self.labels.clear();
        }

        if stats.drawn > 0 && !self.render_ready_sent {
            self.render_ready_sent = true;
            log::info!("first frame drawn: {} sprites", stats.drawn);
            world.push_event(WorldEvent::RenderReady);
        }
        stats
    }

    fn draw_background<S: DrawSurface<Image = I>>(
        &self,
        surface: &mut S,
        world: &WorldState,
        camera: &Camera,
    ) {
        surface.set_alpha(1.0);
        surface.clear(BACKGROUND_COLOR);
        if let Some(tile) = &self.background {
            surface.fill_pattern(tile, Vec2::new(camera.tx, camera.ty), camera.scale);
        }
        if self.options.vignette {
            let center = camera.world_to_screen(world.center());
            let extent = surface.size().length();
            surface.fill_radial(
                center,
                extent * 0.1,
                extent * 0.75,
                VIGNETTE_INNER,
                VIGNETTE_OUTER,
            );
        }
    }
}

/// Ownership ring/pulse and selection rings, layered over the base image
fn draw_overlays<S: DrawSurface>(
    surface: &mut S,
    world: &WorldState,
    sprite: &Sprite,
    screen: Vec2,
    half: f32,
    alpha: f32,
    now_ms: f64,
) {
    let highlights = &world.highlights;
    let owned = match (&highlights.self_address, sprite.landmark.as_ref()) {
        (Some(me), Some(info)) => info
            .owner
            .as_deref()
            .is_some_and(|owner| owner.eq_ignore_ascii_case(me)),
        _ => false,
    };
    if owned {
        let t = (now_ms / 1000.0) as f32;
        let pulse = 0.5 + 0.5 * (t * 3.0).sin();
        surface.set_alpha(alpha * (0.12 + 0.12 * pulse));
        surface.fill_circle(screen, half * (1.05 + 0.08 * pulse), OWNED_RING);
        surface.set_alpha(alpha);
        surface.stroke_circle(screen, half * 1.08, 3.0, OWNED_RING);
    }

    let is = |key: &Option<String>| key.as_deref() == Some(sprite.address.as_str());
    if is(&highlights.selected_opponent) {
        surface.set_alpha(1.0);
        surface.stroke_circle(screen, half * 1.15, 3.0, OPPONENT_RING);
    }
    if is(&highlights.inspected) {
        surface.set_alpha(1.0);
        surface.stroke_circle(screen, half * 1.12, 2.0, INSPECT_RING);
    }
    if is(&highlights.hovered) {
        surface.set_alpha(0.85);
        surface.stroke_circle(screen, half * 1.1, 2.0, HOVER_RING);
    }
}
