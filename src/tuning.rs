//! Data-driven layout and animation constants
//!
//! Every value here was tuned by eye. They live in one serde struct so a host
//! (or a test harness) can override any subset from JSON without code changes.

use serde::{Deserialize, Serialize};

use crate::consts::TIER_COUNT;

/// An elliptical region of elevated placement density, in normalized [0,1]² space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityPocket {
    pub cx: f32,
    pub cy: f32,
    pub rx: f32,
    pub ry: f32,
    pub weight: f32,
}

impl DensityPocket {
    pub const fn new(cx: f32, cy: f32, rx: f32, ry: f32, weight: f32) -> Self {
        Self { cx, cy, rx, ry, weight }
    }
}

/// Default neighborhood layout
pub const DEFAULT_POCKETS: [DensityPocket; 7] = [
    DensityPocket::new(0.50, 0.50, 0.22, 0.26, 1.00),
    DensityPocket::new(0.22, 0.28, 0.16, 0.20, 0.80),
    DensityPocket::new(0.78, 0.26, 0.15, 0.19, 0.75),
    DensityPocket::new(0.20, 0.74, 0.17, 0.18, 0.70),
    DensityPocket::new(0.80, 0.72, 0.16, 0.20, 0.80),
    DensityPocket::new(0.50, 0.14, 0.20, 0.10, 0.45),
    DensityPocket::new(0.50, 0.88, 0.22, 0.10, 0.45),
];

/// Slot generator knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotTuning {
    /// Upper bound on the skeleton pass total
    pub skeleton_cap: usize,
    /// Placement attempts per cooperative chunk
    pub chunk_attempts: usize,
    /// Every Nth attempt samples uniformly over the whole canvas
    pub uniform_every: u64,
    /// Acceptance bias for the two lowest-priority tiers during fill
    pub fill_bias: f32,
    /// Extra clearance between slots (px)
    pub min_gap: f32,
    /// Clearance from the world edge beyond the slot radius (px)
    pub edge_margin: f32,
    /// Attempt budget per requested slot before a tier gives up
    pub attempts_per_slot: u64,
    /// Pool size over the counted demand when topping up for a snapshot
    pub slack: f32,
    /// Per-tier slot counts the host generates in the background at startup
    pub prewarm_counts: Vec<usize>,
    pub pockets: Vec<DensityPocket>,
}

impl Default for SlotTuning {
    fn default() -> Self {
        Self {
            skeleton_cap: 400,
            chunk_attempts: 800,
            uniform_every: 64,
            fill_bias: 0.15,
            min_gap: 1.0,
            edge_margin: 8.0,
            attempts_per_slot: 400,
            slack: 1.25,
            prewarm_counts: vec![24, 64, 160, 320, 560],
            pockets: DEFAULT_POCKETS.to_vec(),
        }
    }
}

/// Entry animation and idle settling knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    /// Spring stiffness ramp duration (ms)
    pub entry_dur_ms: f64,
    /// Radial pressure decay window (ms)
    pub pressure_decay_ms: f64,
    /// Grace after the ramp ends before the entry phase is force-closed (ms)
    pub grace_ms: f64,
    /// Initial outward pressure (force units)
    pub pressure: f32,
    pub spring_k_start: f32,
    pub spring_k_end: f32,
    /// Velocity retained per 60 Hz frame
    pub damping: f32,
    /// Settle threshold in px per 60 Hz frame
    pub settle_speed: f32,
    pub glide_min_ms: f64,
    pub glide_max_ms: f64,
    /// Broad-phase query radius as a multiple of sprite radius
    pub neighbor_range: f32,
    /// Collision passes per tick
    pub collision_iterations: usize,
    /// Correction scale when either sprite is nearly settled
    pub near_target_softening: f32,
    /// Fraction of remaining travel counted as "nearly settled"
    pub near_target_fraction: f32,
    /// Idle sprites closer than this fraction of combined radii get nudged
    pub idle_overlap: f32,
    /// Fraction of idle overlap removed per 60 Hz frame
    pub idle_nudge: f32,
    /// Max jitter applied when snapping stragglers to idle (px)
    pub snap_jitter: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            entry_dur_ms: 1600.0,
            pressure_decay_ms: 1400.0,
            grace_ms: 200.0,
            pressure: 4000.0,
            spring_k_start: 6.0,
            spring_k_end: 28.0,
            damping: 0.9,
            settle_speed: 0.8,
            glide_min_ms: 180.0,
            glide_max_ms: 320.0,
            neighbor_range: 2.2,
            collision_iterations: 2,
            near_target_softening: 0.5,
            near_target_fraction: 0.2,
            idle_overlap: 0.9,
            idle_nudge: 0.1,
            snap_jitter: 1.5,
        }
    }
}

/// Post-assignment separation knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparationTuning {
    pub landmark_padding: f32,
    pub placeholder_padding: f32,
    pub avatar_padding: f32,
    pub grid_cell: f32,
    /// Upper bound on repeated separation rounds
    pub max_rounds: usize,
    /// Landmark ring layout around world center
    pub ring_base: f32,
    pub ring_step: f32,
    pub ring_angle_offset: f32,
    pub anchor_margin: f32,
}

impl Default for SeparationTuning {
    fn default() -> Self {
        Self {
            landmark_padding: 18.0,
            placeholder_padding: 24.0,
            avatar_padding: 8.0,
            grid_cell: 96.0,
            max_rounds: 6,
            ring_base: 320.0,
            ring_step: 220.0,
            ring_angle_offset: 0.12,
            anchor_margin: 120.0,
        }
    }
}

/// Zoom label knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelTuning {
    /// Zoom (relative to fit scale) at which each tier's labels unlock
    pub tier_zoom: [f32; TIER_COUNT],
    /// Zoom at which landmark labels unlock
    pub landmark_zoom: f32,
    /// (zoom threshold, candidate cap) ascending; the last matching entry wins
    pub candidate_caps: Vec<(f32, usize)>,
    pub fade_in: f32,
    pub fade_out: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub line_height: f32,
    /// Extra clearance between accepted pills (px)
    pub margin: f32,
    /// Gap between sprite top and pill bottom (px)
    pub lift: f32,
    pub font: String,
    pub handle_font: String,
}

impl Default for LabelTuning {
    fn default() -> Self {
        Self {
            tier_zoom: [1.0, 1.6, 2.4, 3.4, 4.5],
            landmark_zoom: 0.8,
            candidate_caps: vec![(0.0, 80), (2.0, 160), (4.0, 320)],
            fade_in: 0.12,
            fade_out: 0.08,
            pad_x: 8.0,
            pad_y: 4.0,
            line_height: 14.0,
            margin: 4.0,
            lift: 6.0,
            font: "600 12px system-ui, sans-serif".to_string(),
            handle_font: "11px system-ui, sans-serif".to_string(),
        }
    }
}

/// Camera knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraTuning {
    /// Momentum retained per 60 Hz frame
    pub momentum_damping: f32,
    pub max_zoom: f32,
    /// Minimum scale as a multiple of fit scale
    pub min_fit_factor: f32,
    pub focus_min_ms: f64,
    pub focus_max_ms: f64,
}

impl Default for CameraTuning {
    fn default() -> Self {
        Self {
            momentum_damping: 0.92,
            max_zoom: 10.0,
            min_fit_factor: 0.6,
            focus_min_ms: 120.0,
            focus_max_ms: 1500.0,
        }
    }
}

/// All tunables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub slots: SlotTuning,
    pub physics: PhysicsTuning,
    pub separation: SeparationTuning,
    pub labels: LabelTuning,
    pub camera: CameraTuning,
    /// Balance thresholds (descending) bucketing raw balances into tiers
    pub balance_tiers: Vec<f64>,
}

impl Tuning {
    /// Parse a (possibly partial) JSON override on top of the defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Tier for a raw balance: first threshold the balance meets, else the last tier
    pub fn tier_for_balance(&self, balance: f64) -> usize {
        let thresholds: &[f64] = if self.balance_tiers.is_empty() {
            &DEFAULT_BALANCE_TIERS
        } else {
            &self.balance_tiers
        };
        thresholds
            .iter()
            .position(|&t| balance >= t)
            .unwrap_or(TIER_COUNT - 1)
            .min(TIER_COUNT - 1)
    }
}

const DEFAULT_BALANCE_TIERS: [f64; TIER_COUNT - 1] = [1_000_000.0, 250_000.0, 50_000.0, 5_000.0];
