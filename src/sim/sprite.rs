//! Live sprite records
//!
//! A sprite is the animated instance of one entity. `target` is the settled
//! position; `pos`/`vel` are the simulated state used while entering.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::math::{address_rng, ease_in_out_cubic, lerp};
use super::snapshot::{EntityKind, EntityRecord};
use crate::consts::TIER_RADII;

/// Animation state. One-way `Entry -> Glide -> Idle` until the world is re-seeded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpriteMode {
    /// Pressure + spring simulation toward `target`
    Entry,
    /// Eased tween from a captured pose to the exact target
    Glide {
        from: Vec2,
        from_scale: f32,
        from_alpha: f32,
        start_ms: f64,
        dur_ms: f64,
    },
    /// Settled; drawn at target plus bob
    Idle,
}

impl SpriteMode {
    #[inline]
    pub fn is_idle(&self) -> bool {
        matches!(self, SpriteMode::Idle)
    }

    #[inline]
    pub fn is_entry(&self) -> bool {
        matches!(self, SpriteMode::Entry)
    }
}

/// Idle breathing motion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bob {
    pub phase: f32,
    /// Radians per second
    pub speed: f32,
    /// World pixels
    pub amp: f32,
}

impl Bob {
    /// Per-address bob so neighbors do not breathe in lockstep
    pub fn for_address(address: &str) -> Self {
        let mut rng = address_rng(address, 0xB0B);
        Self {
            phase: rng.random::<f32>() * std::f32::consts::TAU,
            speed: 0.8 + rng.random::<f32>() * 0.6,
            amp: 1.5 + rng.random::<f32>() * 2.0,
        }
    }

    #[inline]
    pub fn offset(&self, now_ms: f64) -> f32 {
        let t = (now_ms / 1000.0) as f32;
        (self.phase + t * self.speed).sin() * self.amp
    }
}

/// Per-entity visual overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpriteVisuals {
    /// Owner-set size multiplier. Already folded into `Sprite::radius` for
    /// avatars and landmarks; the placeholder draws with it on top of its fixed footprint.
    pub size_mult: f32,
    pub custom_name: Option<String>,
    pub social_handle: Option<String>,
    pub alive_url: Option<String>,
    pub dead_url: Option<String>,
}

/// Landmark-only attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkInfo {
    pub prop_id: Option<u64>,
    pub prop_type: Option<String>,
    pub name: Option<String>,
    pub owner: Option<String>,
    pub rename_count: u32,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub address: String,
    pub kind: EntityKind,
    pub tier: usize,
    pub alive: bool,
    pub target: Vec2,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Footprint radius in world pixels (already includes size multiplier)
    pub radius: f32,
    pub mass: f32,
    pub alpha: f32,
    pub scale_bump: f32,
    pub mode: SpriteMode,
    /// Spawn-to-target distance when entry started
    pub entry_dist: f32,
    pub bob: Bob,
    pub visuals: SpriteVisuals,
    pub landmark: Option<LandmarkInfo>,
    pub placeholder: bool,
}

/// Mass reference radius: a sprite of this radius has mass 1
const MASS_REF_RADIUS: f32 = 20.0;

impl Sprite {
    /// Settled sprite for `record` at `target`
    pub fn from_record(record: &EntityRecord, tier: usize, target: Vec2, radius: f32) -> Self {
        let landmark = record.is_landmark().then(|| LandmarkInfo {
            prop_id: record.prop_id,
            prop_type: record.prop_type.clone(),
            name: record.name.clone(),
            owner: record.last_owner.clone(),
            rename_count: record.rename_count.unwrap_or(0),
            price: record.price,
        });
        Self {
            address: record.address.clone(),
            kind: record.kind(),
            tier,
            alive: record.is_alive,
            target,
            pos: target,
            vel: Vec2::ZERO,
            radius,
            mass: mass_for_radius(radius),
            alpha: 1.0,
            scale_bump: 1.0,
            mode: SpriteMode::Idle,
            entry_dist: 0.0,
            bob: Bob::for_address(&record.address),
            visuals: SpriteVisuals {
                size_mult: record.size_multiplier.unwrap_or(1.0),
                custom_name: record.custom_name.clone(),
                social_handle: record.social_handle.clone(),
                alive_url: record.image_url_alive.clone(),
                dead_url: record.image_url_dead.clone(),
            },
            landmark,
            placeholder: record.is_placeholder(),
        }
    }

    #[inline]
    pub fn is_landmark(&self) -> bool {
        self.kind == EntityKind::Landmark
    }

    /// Avatars that take part in avatar/avatar separation
    #[inline]
    pub fn is_avatar(&self) -> bool {
        !self.is_landmark() && !self.placeholder
    }

    /// On-screen diameter in world px
    pub fn draw_diameter(&self) -> f32 {
        if self.placeholder {
            TIER_RADII[0] * 2.0 * self.visuals.size_mult
        } else {
            self.radius * 2.0
        }
    }

    /// Put the sprite at `spawn` and start the entry animation
    pub fn begin_entry(&mut self, spawn: Vec2) {
        self.pos = spawn;
        self.vel = Vec2::ZERO;
        self.alpha = 0.0;
        self.scale_bump = 0.2;
        self.entry_dist = spawn.distance(self.target);
        self.mode = SpriteMode::Entry;
    }

    /// Pop in place (used for incremental adds)
    pub fn begin_pop(&mut self, now_ms: f64, dur_ms: f64) {
        self.pos = self.target;
        self.vel = Vec2::ZERO;
        self.alpha = 0.0;
        self.scale_bump = 0.2;
        self.mode = SpriteMode::Glide {
            from: self.target,
            from_scale: 0.2,
            from_alpha: 0.0,
            start_ms: now_ms,
            dur_ms,
        };
    }

    /// Capture the current pose and start gliding to the exact target
    pub fn begin_glide(&mut self, now_ms: f64, dur_ms: f64) {
        self.mode = SpriteMode::Glide {
            from: self.pos,
            from_scale: self.scale_bump,
            from_alpha: self.alpha,
            start_ms: now_ms,
            dur_ms,
        };
        self.vel = Vec2::ZERO;
    }

    /// Settle immediately
    pub fn snap_idle(&mut self) {
        self.pos = self.target;
        self.vel = Vec2::ZERO;
        self.alpha = 1.0;
        self.scale_bump = 1.0;
        self.mode = SpriteMode::Idle;
    }

    /// World position to draw at this instant
    pub fn draw_pos(&self, now_ms: f64, bob_enabled: bool) -> Vec2 {
        match self.mode {
            SpriteMode::Entry => self.pos,
            SpriteMode::Glide {
                from,
                start_ms,
                dur_ms,
                ..
            } => {
                let u = glide_progress(now_ms, start_ms, dur_ms);
                from.lerp(self.target, ease_in_out_cubic(u))
            }
            SpriteMode::Idle => {
                if self.alive && bob_enabled {
                    self.target + Vec2::new(0.0, self.bob.offset(now_ms))
                } else {
                    self.target
                }
            }
        }
    }

    /// Scale and alpha to draw at this instant
    pub fn draw_scale_alpha(&self, now_ms: f64) -> (f32, f32) {
        match self.mode {
            SpriteMode::Glide {
                from_scale,
                from_alpha,
                start_ms,
                dur_ms,
                ..
            } => {
                let e = ease_in_out_cubic(glide_progress(now_ms, start_ms, dur_ms));
                (lerp(from_scale, 1.0, e), lerp(from_alpha, 1.0, e))
            }
            _ => (self.scale_bump, self.alpha),
        }
    }

    /// Label text: custom name, landmark name, else shortened address
    pub fn display_name(&self) -> String {
        if let Some(name) = self.visuals.custom_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        if let Some(name) = self
            .landmark
            .as_ref()
            .and_then(|l| l.name.as_deref())
            .filter(|n| !n.is_empty())
        {
            return name.to_string();
        }
        crate::short_address(&self.address)
    }
}

#[inline]
pub fn mass_for_radius(radius: f32) -> f32 {
    let r = radius / MASS_REF_RADIUS;
    (r * r).max(0.05)
}

#[inline]
pub fn glide_progress(now_ms: f64, start_ms: f64, dur_ms: f64) -> f32 {
    if dur_ms <= 0.0 {
        return 1.0;
    }
    ((now_ms - start_ms) / dur_ms).clamp(0.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite() -> Sprite {
        Sprite::from_record(
            &EntityRecord::bloblet("0xabc", 2),
            2,
            Vec2::new(100.0, 100.0),
            28.0,
        )
    }

    #[test]
    fn test_glide_interpolates_to_target() {
        let mut s = sprite();
        s.begin_entry(Vec2::new(0.0, 100.0));
        s.pos = Vec2::new(50.0, 100.0);
        s.scale_bump = 0.6;
        s.begin_glide(1000.0, 200.0);

        assert_eq!(s.draw_pos(1000.0, true), Vec2::new(50.0, 100.0));
        assert_eq!(s.draw_pos(1100.0, true), Vec2::new(75.0, 100.0));
        assert_eq!(s.draw_pos(1300.0, true), Vec2::new(100.0, 100.0));
        let (scale, _) = s.draw_scale_alpha(1200.0);
        assert!((scale - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_idle_bob_only_when_alive() {
        let mut s = sprite();
        let moved = (0..20).any(|i| s.draw_pos(i as f64 * 137.0, true) != s.target);
        assert!(moved);
        s.alive = false;
        assert_eq!(s.draw_pos(500.0, true), s.target);
        s.alive = true;
        assert_eq!(s.draw_pos(500.0, false), s.target);
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut s = sprite();
        assert_eq!(s.display_name(), "0xabc");
        s.visuals.custom_name = Some("Blobby".into());
        assert_eq!(s.display_name(), "Blobby");
    }

    #[test]
    fn test_mass_grows_with_radius() {
        assert!(mass_for_radius(40.0) > mass_for_radius(20.0));
        assert!((mass_for_radius(20.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_placeholder_draws_with_size_mult() {
        let mut record = EntityRecord::bloblet(crate::consts::PLACEHOLDER_ADDRESS, 0);
        record.size_multiplier = Some(3.0);
        let mut ph = Sprite::from_record(&record, 0, Vec2::ZERO, 150.0);
        assert_eq!(ph.draw_diameter(), TIER_RADII[0] * 6.0);
        ph.visuals.size_mult = 4.0;
        assert_eq!(ph.draw_diameter(), TIER_RADII[0] * 8.0);
        assert_eq!(sprite().draw_diameter(), 56.0);
    }

    #[test]
    fn test_sprite_json_round_trip_keeps_kind() {
        let mut lm = EntityRecord::landmark("lm", "tree");
        lm.anchor_x = Some(10.0);
        let s = Sprite::from_record(&lm, 0, Vec2::new(10.0, 20.0), 65.0);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains(r#""kind":"landmark""#));
        let back: Sprite = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert!(back.is_landmark());
    }
}
