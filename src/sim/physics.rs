//! Entry animation physics
//!
//! New snapshots spawn every sprite at world center. While in `Entry`, a
//! sprite is blown outward by a decaying radial pressure and pulled toward its
//! target by a stiffening spring (semi-implicit Euler). Overlaps between
//! entering sprites are resolved with a few position-based passes over a
//! spatial grid. Near the target (or at the global deadline) a sprite hands
//! off to a short eased `Glide`, then rests in `Idle`.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::grid::SpatialGrid;
use super::math::{address_rng, ease_in_out_cubic, ease_out_back, hash_angle, lerp};
use super::sprite::{Sprite, SpriteMode, glide_progress};
use crate::tuning::PhysicsTuning;

/// Timing of the current entry animation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryWindow {
    pub start_ms: f64,
    /// Hard deadline: every entering sprite starts gliding at this time
    pub end_by_ms: f64,
    pub active: bool,
}

impl Default for EntryWindow {
    fn default() -> Self {
        Self {
            start_ms: 0.0,
            end_by_ms: 0.0,
            active: false,
        }
    }
}

impl EntryWindow {
    pub fn open(now_ms: f64, tuning: &PhysicsTuning) -> Self {
        Self {
            start_ms: now_ms,
            end_by_ms: now_ms + tuning.entry_dur_ms,
            active: true,
        }
    }
}

/// Reusable broad-phase storage for the entry solver
#[derive(Debug, Clone)]
pub struct EntrySolver {
    grid: SpatialGrid,
    scratch: Vec<usize>,
}

impl EntrySolver {
    pub fn new(cell: f32) -> Self {
        Self {
            grid: SpatialGrid::new(cell),
            scratch: Vec::new(),
        }
    }
}

/// Advance entering/gliding sprites by `dt_ms`.
///
/// Returns true when this step closed the entry window.
pub fn step_entry(
    sprites: &mut [Sprite],
    window: &mut EntryWindow,
    center: Vec2,
    now_ms: f64,
    dt_ms: f64,
    tuning: &PhysicsTuning,
    solver: &mut EntrySolver,
) -> bool {
    if !window.active {
        return false;
    }
    let dt = (dt_ms / 1000.0) as f32;
    let elapsed = now_ms - window.start_ms;
    let t_norm = (elapsed / tuning.entry_dur_ms.max(1.0)).clamp(0.0, 1.0) as f32;
    let decay = (1.0 - elapsed / tuning.pressure_decay_ms.max(1.0)).max(0.0) as f32;
    let k = lerp(tuning.spring_k_start, tuning.spring_k_end, ease_in_out_cubic(t_norm));
    let damping = tuning.damping.powf(dt * 60.0);
    let deadline_passed = now_ms >= window.end_by_ms;

    for sprite in sprites.iter_mut() {
        let mode = sprite.mode;
        match mode {
            SpriteMode::Entry => {
                integrate_entry(sprite, center, decay, k, damping, dt, tuning);
                sprite.alpha = (t_norm * 1.2).clamp(0.0, 1.0);
                sprite.scale_bump = lerp(0.2, 1.0, ease_out_back(t_norm));

                let dist = sprite.pos.distance(sprite.target);
                let speed = sprite.vel.length() / 60.0;
                let close = dist <= (0.1 * sprite.radius).max(0.5);
                if (close && speed <= tuning.settle_speed) || deadline_passed {
                    let dur = glide_duration(dist, sprite.radius, tuning);
                    sprite.begin_glide(now_ms, dur);
                }
            }
            SpriteMode::Glide {
                start_ms, dur_ms, ..
            } => {
                if glide_progress(now_ms, start_ms, dur_ms) >= 1.0 {
                    sprite.snap_idle();
                } else {
                    let (scale, alpha) = sprite.draw_scale_alpha(now_ms);
                    sprite.pos = sprite.draw_pos(now_ms, false);
                    sprite.scale_bump = scale;
                    sprite.alpha = alpha;
                }
            }
            SpriteMode::Idle => {}
        }
    }

    for _ in 0..tuning.collision_iterations {
        resolve_entry_collisions(sprites, tuning, solver);
    }

    let unsettled = sprites.iter().any(|s| !s.mode.is_idle());
    if !unsettled || now_ms >= window.end_by_ms + tuning.grace_ms {
        let mut snapped = 0;
        for sprite in sprites.iter_mut().filter(|s| !s.mode.is_idle()) {
            let mut rng = address_rng(&sprite.address, 0x51A9);
            let jitter = Vec2::new(
                (rng.random::<f32>() * 2.0 - 1.0) * tuning.snap_jitter,
                (rng.random::<f32>() * 2.0 - 1.0) * tuning.snap_jitter,
            );
            sprite.target += jitter;
            sprite.snap_idle();
            snapped += 1;
        }
        if snapped > 0 {
            log::debug!("entry window closed; snapped {snapped} sprites to idle");
        }
        window.active = false;
        return true;
    }
    false
}

fn integrate_entry(
    sprite: &mut Sprite,
    center: Vec2,
    decay: f32,
    k: f32,
    damping: f32,
    dt: f32,
    tuning: &PhysicsTuning,
) {
    let outward = sprite.pos - center;
    let dir = if outward.length_squared() < 1e-6 {
        Vec2::from_angle(hash_angle(&sprite.address))
    } else {
        outward.normalize()
    };
    let pressure = dir * tuning.pressure * decay;
    let spring = (sprite.target - sprite.pos) * k * sprite.mass;
    let force = pressure + spring;

    sprite.vel += force / sprite.mass * dt;
    sprite.vel *= damping;
    sprite.pos += sprite.vel * dt;
}

fn glide_duration(dist: f32, radius: f32, tuning: &PhysicsTuning) -> f64 {
    let t = (dist / (radius * 4.0).max(1.0)).clamp(0.0, 1.0) as f64;
    tuning.glide_min_ms + (tuning.glide_max_ms - tuning.glide_min_ms) * t
}

/// One broad-phase rebuild plus position-based overlap correction among `Entry` sprites
fn resolve_entry_collisions(
    sprites: &mut [Sprite],
    tuning: &PhysicsTuning,
    solver: &mut EntrySolver,
) {
    solver.grid.clear();
    let mut any = false;
    for (i, sprite) in sprites.iter().enumerate() {
        if sprite.mode.is_entry() {
            solver.grid.insert_index(i, sprite.pos);
            any = true;
        }
    }
    if !any {
        return;
    }

    for i in 0..sprites.len() {
        if !sprites[i].mode.is_entry() {
            continue;
        }
        solver.scratch.clear();
        let range = sprites[i].radius * tuning.neighbor_range;
        solver
            .grid
            .neighbors_into(sprites[i].pos, range, &mut solver.scratch);

        for n in 0..solver.scratch.len() {
            let j = solver.scratch[n];
            if j <= i || !sprites[j].mode.is_entry() {
                continue;
            }
            let (a, b) = (&sprites[i], &sprites[j]);
            let delta = b.pos - a.pos;
            let dist = delta.length();
            let min = a.radius + b.radius;
            if dist >= min {
                continue;
            }
            let dir = if dist < 1e-4 {
                Vec2::from_angle(hash_angle(&b.address))
            } else {
                delta / dist
            };
            let inv_a = 1.0 / a.mass;
            let inv_b = 1.0 / b.mass;
            let mut overlap = min - dist;
            if near_target(a, tuning) || near_target(b, tuning) {
                overlap *= tuning.near_target_softening;
            }
            let share_a = inv_a / (inv_a + inv_b);
            let share_b = 1.0 - share_a;
            sprites[i].pos -= dir * overlap * share_a;
            sprites[j].pos += dir * overlap * share_b;
        }
    }
}

#[inline]
fn near_target(sprite: &Sprite, tuning: &PhysicsTuning) -> bool {
    let remaining = sprite.pos.distance(sprite.target);
    remaining <= sprite.entry_dist.max(sprite.radius) * tuning.near_target_fraction
}

/// Retire finished glides outside an entry window (incremental adds pop in this way)
pub fn settle_glides(sprites: &mut [Sprite], now_ms: f64) -> usize {
    let mut settled = 0;
    for sprite in sprites.iter_mut() {
        if let SpriteMode::Glide {
            start_ms, dur_ms, ..
        } = sprite.mode
            && glide_progress(now_ms, start_ms, dur_ms) >= 1.0
        {
            sprite.snap_idle();
            settled += 1;
        }
    }
    settled
}

/// Nudge overlapping idle sprites apart. Landmarks and the placeholder hold still.
///
/// Plain pairwise pass; fine for the few thousand sprites a world holds.
pub fn resolve_idle_overlaps(sprites: &mut [Sprite], dt_ms: f64, tuning: &PhysicsTuning) -> usize {
    let frames = (dt_ms / (1000.0 / 60.0)) as f32;
    let rate = (tuning.idle_nudge * frames).min(1.0);
    let mut nudged = 0;

    for i in 0..sprites.len() {
        if !sprites[i].mode.is_idle() {
            continue;
        }
        for j in i + 1..sprites.len() {
            if !sprites[j].mode.is_idle() {
                continue;
            }
            let fixed_i = !sprites[i].is_avatar();
            let fixed_j = !sprites[j].is_avatar();
            if fixed_i && fixed_j {
                continue;
            }
            let delta = sprites[j].target - sprites[i].target;
            let dist = delta.length();
            let min = (sprites[i].radius + sprites[j].radius) * tuning.idle_overlap;
            if dist >= min {
                continue;
            }
            let dir = if dist < 1e-4 {
                Vec2::from_angle(hash_angle(&sprites[j].address))
            } else {
                delta / dist
            };
            let push = (min - dist) * rate;
            let (wi, wj) = match (fixed_i, fixed_j) {
                (true, _) => (0.0, 1.0),
                (_, true) => (1.0, 0.0),
                _ => (0.5, 0.5),
            };
            sprites[i].target -= dir * push * wi;
            sprites[j].target += dir * push * wj;
            sprites[i].pos = sprites[i].target;
            sprites[j].pos = sprites[j].target;
            nudged += 1;
        }
    }
    nudged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::snapshot::EntityRecord;

    fn entering(address: &str, target: Vec2, radius: f32) -> Sprite {
        let mut s = Sprite::from_record(&EntityRecord::bloblet(address, 2), 2, target, radius);
        s.begin_entry(Vec2::new(500.0, 500.0));
        s
    }

    fn run(sprites: &mut [Sprite], window: &mut EntryWindow, until_ms: f64) -> f64 {
        let tuning = PhysicsTuning::default();
        let mut solver = EntrySolver::new(64.0);
        let mut now = window.start_ms;
        while now < until_ms {
            now += 1000.0 / 60.0;
            let center = Vec2::new(500.0, 500.0);
            step_entry(sprites, window, center, now, 1000.0 / 60.0, &tuning, &mut solver);
            if !window.active {
                break;
            }
        }
        now
    }

    #[test]
    fn test_single_sprite_settles_on_target() {
        let target = Vec2::new(700.0, 400.0);
        let mut sprites = vec![entering("0x1", target, 20.0)];
        let mut window = EntryWindow::open(0.0, &PhysicsTuning::default());
        run(&mut sprites, &mut window, 10_000.0);
        assert!(!window.active);
        assert!(sprites[0].mode.is_idle());
        assert!(sprites[0].pos.distance(target) <= PhysicsTuning::default().snap_jitter * 2.0);
        assert_eq!(sprites[0].alpha, 1.0);
    }

    #[test]
    fn test_deadline_forces_idle() {
        let tuning = PhysicsTuning::default();
        let mut sprites: Vec<Sprite> = (0..30)
            .map(|i| entering(&format!("0x{i}"), Vec2::new(500.0, 500.0), 24.0))
            .collect();
        let mut window = EntryWindow::open(0.0, &tuning);
        let ended = run(&mut sprites, &mut window, 60_000.0);
        assert!(!window.active);
        assert!(ended <= tuning.entry_dur_ms + tuning.grace_ms + 1000.0 / 60.0);
        assert!(sprites.iter().all(|s| s.mode.is_idle()));
    }

    #[test]
    fn test_deadline_follows_ramp_duration() {
        let tuning = PhysicsTuning {
            entry_dur_ms: 500.0,
            ..Default::default()
        };
        let window = EntryWindow::open(100.0, &tuning);
        assert_eq!(window.end_by_ms, 600.0);
        assert_eq!(EntryWindow::open(0.0, &PhysicsTuning::default()).end_by_ms, 1600.0);
    }

    #[test]
    fn test_alpha_and_scale_ramp() {
        let tuning = PhysicsTuning::default();
        let mut sprites = vec![entering("0x1", Vec2::new(900.0, 500.0), 20.0)];
        let mut window = EntryWindow::open(0.0, &tuning);
        let mut solver = EntrySolver::new(64.0);
        let center = Vec2::new(500.0, 500.0);
        step_entry(&mut sprites, &mut window, center, 100.0, 16.0, &tuning, &mut solver);
        let s = &sprites[0];
        assert!(s.alpha > 0.0 && s.alpha < 0.2);
        assert!(s.scale_bump > 0.2 && s.scale_bump < 1.0);
        assert!(s.pos != Vec2::new(500.0, 500.0));
    }

    #[test]
    fn test_entry_collisions_push_apart() {
        let tuning = PhysicsTuning::default();
        let mut solver = EntrySolver::new(64.0);
        let mut a = entering("a", Vec2::new(5000.0, 5000.0), 20.0);
        let mut b = entering("b", Vec2::new(5000.0, 5000.0), 20.0);
        a.pos = Vec2::new(100.0, 100.0);
        b.pos = Vec2::new(110.0, 100.0);
        a.entry_dist = 1000.0;
        b.entry_dist = 1000.0;
        let mut sprites = vec![a, b];
        resolve_entry_collisions(&mut sprites, &tuning, &mut solver);
        let d = sprites[0].pos.distance(sprites[1].pos);
        assert!((d - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_idle_overlap_nudges_avatars_only() {
        let tuning = PhysicsTuning::default();
        let mut landmark = EntityRecord::landmark("lm", "tower");
        landmark.anchor_x = Some(100.0);
        landmark.anchor_y = Some(100.0);
        let lm = Sprite::from_record(&landmark, 0, Vec2::new(100.0, 100.0), 100.0);
        let record = EntityRecord::bloblet("x", 2);
        let av = Sprite::from_record(&record, 2, Vec2::new(150.0, 100.0), 20.0);
        let mut sprites = vec![lm, av];
        let before = sprites[1].target.x;
        assert_eq!(resolve_idle_overlaps(&mut sprites, 16.7, &tuning), 1);
        assert_eq!(sprites[0].target, Vec2::new(100.0, 100.0));
        assert!(sprites[1].target.x > before);
    }
}
