//! Placement slot generation
//!
//! Produces non-overlapping slots per size tier, biased toward density
//! pockets. Generation is an explicit state machine: `step` performs a bounded
//! number of placement attempts and returns, so a frame driver can spread the
//! work across animation frames. A skeleton pass (a capped, proportional
//! subset of every tier) runs first so early frames already cover the world;
//! the fill pass then tops each tier up to its target.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::grid::SpatialGrid;
use super::math::seeded_rng;
use crate::tuning::{DensityPocket, SlotTuning};

/// A candidate placement, not yet bound to an entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub pos: Vec2,
    pub tier: usize,
    pub r: f32,
}

/// Tier-bucketed slots (index = tier)
pub type SlotPools = Vec<Vec<Slot>>;

/// Summed radial falloff of every pocket at a normalized point, capped at 1
pub fn density_at_norm(pockets: &[DensityPocket], nx: f32, ny: f32) -> f32 {
    let sum: f32 = pockets
        .iter()
        .map(|p| {
            let dx = (nx - p.cx) / p.rx.max(1e-4);
            let dy = (ny - p.cy) / p.ry.max(1e-4);
            let d = (dx * dx + dy * dy).sqrt();
            (1.0 - d).max(0.0) * p.weight
        })
        .sum();
    sum.min(1.0)
}

/// Split `min(cap, total)` across tiers proportionally, remainder round-robin
pub fn skeleton_split(counts: &[usize], cap: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }
    let skeleton_total = cap.min(total);
    let mut split: Vec<usize> = counts.iter().map(|&c| c * skeleton_total / total).collect();
    let mut remaining = skeleton_total - split.iter().sum::<usize>();
    let mut tier = 0;
    while remaining > 0 {
        if split[tier] < counts[tier] {
            split[tier] += 1;
            remaining -= 1;
        }
        tier = (tier + 1) % counts.len();
    }
    split
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPhase {
    Skeleton,
    Fill,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Complete,
}

/// Resumable slot generator
pub struct SlotGenerator {
    world: Vec2,
    radii: Vec<f32>,
    max_radius: f32,
    skeleton: Vec<usize>,
    fill: Vec<usize>,
    phase: SlotPhase,
    tier: usize,
    tier_attempts: u64,
    attempts: u64,
    phase_placed: Vec<usize>,
    placed: Vec<(Vec2, f32)>,
    pools: SlotPools,
    grid: SpatialGrid,
    pocket_cdf: Vec<f32>,
    rng: Pcg32,
    tuning: SlotTuning,
    scratch: Vec<usize>,
}

impl SlotGenerator {
    /// `counts[t]` slots of radius `radii[t]` for each tier `t`
    pub fn new(
        world: Vec2,
        counts: &[usize],
        radii: &[f32],
        seed: u64,
        tuning: &SlotTuning,
    ) -> Self {
        let tiers = counts.len().min(radii.len());
        let counts = &counts[..tiers];
        let radii = radii[..tiers].to_vec();
        let max_radius = radii.iter().copied().fold(1.0f32, f32::max);
        let skeleton = skeleton_split(counts, tuning.skeleton_cap);
        let fill = counts.iter().zip(&skeleton).map(|(c, s)| c - s).collect();

        let mut acc = 0.0;
        let pocket_cdf = tuning
            .pockets
            .iter()
            .map(|p| {
                acc += p.weight.max(0.0);
                acc
            })
            .collect();

        Self {
            world,
            radii,
            max_radius,
            skeleton,
            fill,
            phase: SlotPhase::Skeleton,
            tier: 0,
            tier_attempts: 0,
            attempts: 0,
            phase_placed: vec![0; tiers],
            placed: Vec::new(),
            pools: vec![Vec::new(); tiers],
            grid: SpatialGrid::new(max_radius * 2.0 + tuning.min_gap),
            pocket_cdf,
            rng: seeded_rng(seed),
            tuning: tuning.clone(),
            scratch: Vec::new(),
        }
    }

    #[inline]
    pub fn phase(&self) -> SlotPhase {
        self.phase
    }

    /// Total placement attempts made so far
    #[inline]
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Slots placed so far across all tiers
    #[inline]
    pub fn placed(&self) -> usize {
        self.placed.len()
    }

    /// Slots requested across all tiers
    pub fn requested(&self) -> usize {
        self.skeleton.iter().sum::<usize>() + self.fill.iter().sum::<usize>()
    }

    /// Run up to `budget` placement attempts
    pub fn step(&mut self, budget: usize) -> StepStatus {
        for _ in 0..budget {
            let Some(tier) = self.current_tier() else {
                return StepStatus::Complete;
            };
            self.attempt(tier);
        }
        if self.current_tier().is_none() {
            StepStatus::Complete
        } else {
            StepStatus::Pending
        }
    }

    /// Drive to completion in chunk-sized steps
    pub fn run_to_completion(mut self) -> SlotPools {
        let chunk = self.tuning.chunk_attempts.max(1);
        while self.step(chunk) == StepStatus::Pending {}
        self.pools
    }

    /// Finished (or partial) pools
    pub fn into_pools(self) -> SlotPools {
        self.pools
    }

    /// Tier to work on next, advancing tier/phase past satisfied or exhausted tiers
    fn current_tier(&mut self) -> Option<usize> {
        loop {
            let targets = match self.phase {
                SlotPhase::Skeleton => &self.skeleton,
                SlotPhase::Fill => &self.fill,
                SlotPhase::Done => return None,
            };
            if self.tier >= targets.len() {
                self.phase = match self.phase {
                    SlotPhase::Skeleton => SlotPhase::Fill,
                    _ => SlotPhase::Done,
                };
                self.tier = 0;
                self.tier_attempts = 0;
                self.phase_placed.iter_mut().for_each(|p| *p = 0);
                continue;
            }

            let target = targets[self.tier];
            let placed = self.phase_placed[self.tier];
            let budget = target as u64 * self.tuning.attempts_per_slot;
            if placed >= target {
                self.next_tier();
                continue;
            }
            if self.tier_attempts >= budget {
                log::warn!(
                    "slot tier {} under-filled in {:?}: {}/{} after {} attempts",
                    self.tier,
                    self.phase,
                    placed,
                    target,
                    self.tier_attempts
                );
                self.next_tier();
                continue;
            }
            return Some(self.tier);
        }
    }

    fn next_tier(&mut self) {
        self.tier += 1;
        self.tier_attempts = 0;
    }

    fn attempt(&mut self, tier: usize) -> bool {
        let uniform = self.pocket_cdf.is_empty()
            || self.attempts % self.tuning.uniform_every.max(1) == 0;
        self.attempts += 1;
        self.tier_attempts += 1;

        let (nx, ny) = if uniform {
            // Fallback samples skip the density gate so sparse regions still get coverage
            (self.rng.random::<f32>(), self.rng.random::<f32>())
        } else {
            let (nx, ny) = self.sample_pocket();
            let low_priority = tier + 2 >= self.radii.len();
            let bias = if self.phase == SlotPhase::Fill && low_priority {
                self.tuning.fill_bias
            } else {
                0.0
            };
            let p = (density_at_norm(&self.tuning.pockets, nx, ny) + bias).min(1.0);
            if self.rng.random::<f32>() >= p {
                return false;
            }
            (nx, ny)
        };

        let r = self.radii[tier];
        let pos = Vec2::new(nx * self.world.x, ny * self.world.y);
        let margin = r + self.tuning.edge_margin;
        if pos.x < margin
            || pos.y < margin
            || pos.x > self.world.x - margin
            || pos.y > self.world.y - margin
        {
            return false;
        }
        if !self.is_clear(pos, r) {
            return false;
        }

        let index = self.placed.len();
        self.placed.push((pos, r));
        self.grid.insert_index(index, pos);
        self.pools[tier].push(Slot { pos, tier, r });
        self.phase_placed[tier] += 1;
        true
    }

    /// Weighted pocket pick plus triangular disk jitter (denser near the pocket center)
    fn sample_pocket(&mut self) -> (f32, f32) {
        let total = self.pocket_cdf.last().copied().unwrap_or(0.0);
        let u = self.rng.random::<f32>() * total;
        let index = self
            .pocket_cdf
            .iter()
            .position(|&c| u <= c)
            .unwrap_or(self.pocket_cdf.len() - 1);
        let pocket = self.tuning.pockets[index];

        let angle = self.rng.random::<f32>() * std::f32::consts::TAU;
        let radial = (self.rng.random::<f32>() + self.rng.random::<f32>() - 1.0).abs();
        (
            pocket.cx + angle.cos() * pocket.rx * radial,
            pocket.cy + angle.sin() * pocket.ry * radial,
        )
    }

    fn is_clear(&mut self, pos: Vec2, r: f32) -> bool {
        let gap = self.tuning.min_gap;
        self.scratch.clear();
        self.grid
            .neighbors_into(pos, r + self.max_radius + gap, &mut self.scratch);
        self.scratch.iter().all(|&i| {
            let (p, pr) = self.placed[i];
            p.distance(pos) >= r + pr + gap
        })
    }
}
