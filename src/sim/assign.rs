//! Entity → slot assignment and post-hoc separation
//!
//! Avatars pick a slot by hashing their address into their tier's pool and
//! probing forward; landmarks sit on explicit anchors or concentric rings
//! around world center; the placeholder is pinned to the center. Separation
//! then clears avatars out of landmark and placeholder footprints and splits
//! any remaining avatar/avatar overlap.

use std::collections::HashSet;

use glam::Vec2;

use super::grid::SpatialGrid;
use super::math::{hash_angle, hash_str};
use super::slots::SlotPools;
use super::snapshot::EntityRecord;
use super::sprite::Sprite;
use crate::consts::{PLACEHOLDER_MIN_SIZE_MULT, PLACEHOLDER_RADIUS, TIER_RADII};
use crate::tuning::{SeparationTuning, Tuning};
use crate::world_center;

/// Fallback landmark size when the prop type is unknown
pub const LANDMARK_DEFAULT_SIZE: f32 = 140.0;

const LANDMARK_SIZES: [(&str, f32); 7] = [
    ("castle", 260.0),
    ("arena", 240.0),
    ("tower", 220.0),
    ("fountain", 180.0),
    ("statue", 160.0),
    ("shop", 150.0),
    ("tree", 130.0),
];

const EPS: f32 = 1e-3;

/// Visual base size (px) for a landmark prop type
pub fn landmark_base_size(prop_type: Option<&str>) -> f32 {
    prop_type
        .and_then(|t| {
            LANDMARK_SIZES
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(t))
        })
        .map(|(_, size)| *size)
        .unwrap_or(LANDMARK_DEFAULT_SIZE)
}

/// Footprint radius of a landmark, including its owner-set multiplier
pub fn landmark_radius(record: &EntityRecord) -> f32 {
    landmark_base_size(record.prop_type.as_deref()) * record.size_multiplier.unwrap_or(1.0) * 0.5
}

/// `index`-th position on the concentric landmark rings
pub fn ring_position(index: usize, world: Vec2, tuning: &SeparationTuning) -> Vec2 {
    let mut ring = 0usize;
    let mut k = index;
    loop {
        let capacity = 6 + ring * 6;
        if k < capacity {
            break;
        }
        k -= capacity;
        ring += 1;
    }
    let capacity = (6 + ring * 6) as f32;
    let angle =
        k as f32 * (std::f32::consts::TAU / capacity) + ring as f32 * tuning.ring_angle_offset;
    let radius = tuning.ring_base + ring as f32 * tuning.ring_step;
    let aspect = if world.x > 0.0 { world.y / world.x } else { 1.0 };

    let center = world_center(world);
    let pos = center + Vec2::new(angle.cos() * radius, angle.sin() * radius * aspect);
    let margin = tuning.anchor_margin.min(world.x * 0.5).min(world.y * 0.5);
    pos.clamp(Vec2::splat(margin), world - Vec2::splat(margin))
}

/// Explicit anchor, unless missing or sitting on the world-center sentinel
pub fn explicit_anchor(record: &EntityRecord, world: Vec2) -> Option<Vec2> {
    let anchor = Vec2::new(record.anchor_x?, record.anchor_y?);
    (anchor.distance(world_center(world)) > 1.0).then_some(anchor)
}

/// Which slots of each pool are taken
#[derive(Debug, Clone)]
pub struct SlotLedger {
    used: Vec<Vec<bool>>,
}

impl SlotLedger {
    pub fn new(pools: &SlotPools) -> Self {
        Self {
            used: pools.iter().map(|p| vec![false; p.len()]).collect(),
        }
    }

    #[inline]
    pub fn is_used(&self, tier: usize, index: usize) -> bool {
        self.used[tier][index]
    }

    #[inline]
    pub fn mark(&mut self, tier: usize, index: usize) {
        self.used[tier][index] = true;
    }

    /// First free slot in `tier` probing forward from `start`
    fn probe(&self, tier: usize, start: u32) -> Option<usize> {
        let used = &self.used[tier];
        let len = used.len();
        if len == 0 {
            return None;
        }
        let start = start as usize % len;
        (0..len).map(|k| (start + k) % len).find(|&i| !used[i])
    }
}

/// Tier search order after the home tier: +1, +2, +3, then -1, -2, -3 (mod tier count)
pub fn fallback_tiers(tier: usize, tier_count: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(tier_count);
    if tier_count == 0 {
        return order;
    }
    let ups = (1..=3).map(|d| (tier + d) % tier_count);
    let downs = (1..=3).map(|d| (tier + tier_count * 3 - d) % tier_count);
    for t in ups.chain(downs).chain(0..tier_count) {
        if t != tier && !order.contains(&t) {
            order.push(t);
        }
    }
    order
}

/// Deterministic slot pick for `address`. Marks the slot used.
///
/// Returns `(tier, index)`. When every slot is taken, double-books slot 0 of
/// the home tier (or the first non-empty pool). `None` only if no pool has any slot.
pub fn pick_slot(
    address: &str,
    tier: usize,
    pools: &SlotPools,
    ledger: &mut SlotLedger,
) -> Option<(usize, usize)> {
    if pools.is_empty() {
        return None;
    }
    let tier = tier.min(pools.len() - 1);
    let hash = hash_str(address);

    let found = std::iter::once(tier)
        .chain(fallback_tiers(tier, pools.len()))
        .find_map(|t| ledger.probe(t, hash).map(|i| (t, i)));

    match found {
        Some((t, i)) => {
            if t != tier {
                log::debug!("slot fallback for {address}: tier {tier} -> {t}");
            }
            ledger.mark(t, i);
            Some((t, i))
        }
        None => {
            let t = if pools[tier].is_empty() {
                pools.iter().position(|p| !p.is_empty())?
            } else {
                tier
            };
            log::warn!("slot pools exhausted; double-booking slot 0 of tier {t} for {address}");
            Some((t, 0))
        }
    }
}

/// Build settled sprites for a snapshot (separation already applied)
pub fn assign_sprites(
    records: &[EntityRecord],
    pools: &SlotPools,
    world: Vec2,
    tuning: &Tuning,
) -> Vec<Sprite> {
    let center = world_center(world);
    let mut ledger = SlotLedger::new(pools);
    let mut seen = HashSet::with_capacity(records.len());
    let mut ring_index = 0;
    let mut sprites = Vec::with_capacity(records.len());

    for record in records {
        if !seen.insert(record.address.as_str()) {
            log::debug!("duplicate address in snapshot: {}", record.address);
            continue;
        }
        let tier = record.resolved_tier(tuning);
        let size_mult = record.size_multiplier.unwrap_or(1.0);

        let sprite = if record.is_placeholder() {
            let mut sprite = Sprite::from_record(record, tier, center, PLACEHOLDER_RADIUS);
            sprite.visuals.size_mult = size_mult.max(PLACEHOLDER_MIN_SIZE_MULT);
            sprite
        } else if record.is_landmark() {
            let anchor = explicit_anchor(record, world).unwrap_or_else(|| {
                let pos = ring_position(ring_index, world, &tuning.separation);
                ring_index += 1;
                pos
            });
            Sprite::from_record(record, tier, anchor, landmark_radius(record))
        } else {
            let radius = TIER_RADII[tier] * size_mult;
            let target = match pick_slot(&record.address, tier, pools, &mut ledger) {
                Some((t, i)) => pools[t][i].pos,
                None => {
                    log::warn!("no slots available; {} placed at world center", record.address);
                    center
                }
            };
            Sprite::from_record(record, tier, target, radius)
        };
        sprites.push(sprite);
    }

    enforce_separation(&mut sprites, world, &tuning.separation);
    for sprite in &mut sprites {
        sprite.pos = sprite.target;
    }
    sprites
}

/// Push avatars out of landmark and placeholder footprints, then split avatar overlaps.
///
/// Each round runs the three passes in order. Rounds repeat until nothing moves
/// or `max_rounds` is reached. If the limit is hit, every avatar is settled in
/// index order: it keeps its target when that clears the landmarks, the
/// placeholder and all previously settled avatars, otherwise it takes the
/// nearest free spot on a spiral around that target.
pub fn enforce_separation(sprites: &mut [Sprite], world: Vec2, tuning: &SeparationTuning) {
    let center = world_center(world);
    let rounds = tuning.max_rounds.max(1);
    for _ in 0..rounds {
        let mut moved = push_from_landmarks(sprites, tuning.landmark_padding);
        moved |= pin_placeholder(sprites, center, tuning.placeholder_padding);
        moved |= separate_avatars(sprites, tuning.avatar_padding, tuning.grid_cell);
        if !moved {
            return;
        }
    }
    let relocated = settle_avatars(sprites, world, center, tuning);
    log::debug!("separation did not converge in {rounds} rounds; settled {relocated} avatars");
}

/// Move `target` out to `min` from `anchor`; zero distance resolves along a hashed angle
fn push_out(target: &mut Vec2, address: &str, anchor: Vec2, min: f32) -> bool {
    let delta = *target - anchor;
    let dist = delta.length();
    if dist >= min - EPS {
        return false;
    }
    let dir = if dist < EPS {
        Vec2::from_angle(hash_angle(address))
    } else {
        delta / dist
    };
    *target = anchor + dir * min;
    true
}

fn push_from_landmarks(sprites: &mut [Sprite], padding: f32) -> bool {
    let landmarks: Vec<(Vec2, f32)> = sprites
        .iter()
        .filter(|s| s.is_landmark())
        .map(|s| (s.target, s.radius))
        .collect();
    if landmarks.is_empty() {
        return false;
    }
    let mut moved = false;
    for sprite in sprites.iter_mut().filter(|s| s.is_avatar()) {
        for &(anchor, radius) in &landmarks {
            let min = sprite.radius + radius + padding;
            moved |= push_out(&mut sprite.target, &sprite.address, anchor, min);
        }
    }
    moved
}

fn pin_placeholder(sprites: &mut [Sprite], center: Vec2, padding: f32) -> bool {
    let Some(index) = sprites.iter().position(|s| s.placeholder) else {
        return false;
    };
    let mut moved = sprites[index].target != center;
    sprites[index].target = center;
    let radius = sprites[index].radius;
    for sprite in sprites.iter_mut().filter(|s| s.is_avatar()) {
        let min = sprite.radius + radius + padding;
        moved |= push_out(&mut sprite.target, &sprite.address, center, min);
    }
    moved
}

fn separate_avatars(sprites: &mut [Sprite], padding: f32, cell: f32) -> bool {
    let mut grid = SpatialGrid::new(cell);
    let mut max_radius = 0.0f32;
    for (i, sprite) in sprites.iter().enumerate().filter(|(_, s)| s.is_avatar()) {
        grid.insert_index(i, sprite.target);
        max_radius = max_radius.max(sprite.radius);
    }

    let mut moved = false;
    let mut neighbors = Vec::new();
    for i in 0..sprites.len() {
        if !sprites[i].is_avatar() {
            continue;
        }
        neighbors.clear();
        // Corrections move entries after insertion; widen the query to cover the drift
        let range = sprites[i].radius + max_radius + padding * 2.0;
        grid.neighbors_into(sprites[i].target, range, &mut neighbors);

        for &j in &neighbors {
            if j <= i {
                continue;
            }
            let (a, b) = (sprites[i].target, sprites[j].target);
            let min = sprites[i].radius + sprites[j].radius + padding;
            let delta = b - a;
            let dist = delta.length();
            if dist >= min - EPS {
                continue;
            }
            let dir = if dist < EPS {
                Vec2::from_angle(hash_angle(&sprites[j].address))
            } else {
                delta / dist
            };
            let correction = dir * ((min - dist) * 0.5);
            sprites[i].target = a - correction;
            sprites[j].target = b + correction;
            moved = true;
        }
    }
    moved
}

/// Spiral rings tried per avatar before giving up on a free spot
const SETTLE_MAX_RINGS: usize = 4096;

/// Fixed footprint an avatar has to clear: (center, radius, padding)
type Obstacle = (Vec2, f32, f32);

fn clears(pos: Vec2, radius: f32, obstacles: &[Obstacle]) -> bool {
    obstacles
        .iter()
        .all(|&(at, r, padding)| pos.distance(at) >= radius + r + padding)
}

/// Greedy placement against fixed footprints and already settled avatars.
/// Returns how many avatars moved.
fn settle_avatars(
    sprites: &mut [Sprite],
    world: Vec2,
    center: Vec2,
    tuning: &SeparationTuning,
) -> usize {
    let mut obstacles: Vec<Obstacle> = sprites
        .iter()
        .filter(|s| s.is_landmark())
        .map(|s| (s.target, s.radius, tuning.landmark_padding))
        .collect();
    if let Some(placeholder) = sprites.iter().find(|s| s.placeholder) {
        obstacles.push((center, placeholder.radius, tuning.placeholder_padding));
    }
    let max_radius = sprites
        .iter()
        .filter(|s| s.is_avatar())
        .map(|s| s.radius)
        .fold(0.0f32, f32::max);
    let padding = tuning.avatar_padding;
    let diagonal = world.length();

    let mut grid = SpatialGrid::new(tuning.grid_cell);
    let mut neighbors = Vec::new();
    let mut relocated = 0;
    for i in 0..sprites.len() {
        if !sprites[i].is_avatar() {
            continue;
        }
        let radius = sprites[i].radius;
        let range = radius + max_radius + padding;
        let free = |pos: Vec2, neighbors: &mut Vec<usize>| {
            if !clears(pos, radius, &obstacles) {
                return false;
            }
            neighbors.clear();
            grid.neighbors_into(pos, range, neighbors);
            neighbors.iter().all(|&j| {
                pos.distance(sprites[j].target) >= sprites[j].radius + radius + padding
            })
        };

        let origin = sprites[i].target;
        if !free(origin, &mut neighbors) {
            let step = (radius * 0.5).max(4.0);
            let base = hash_angle(&sprites[i].address);
            let lo = Vec2::splat(radius);
            let hi = world - Vec2::splat(radius);
            let spot = (1..=SETTLE_MAX_RINGS).find_map(|ring| {
                let dist = ring as f32 * step;
                // Past the diagonal the world bounds are dropped so the search ends
                let bounded = dist <= diagonal && lo.cmple(hi).all();
                let count = ring * 6;
                (0..count).find_map(|k| {
                    let angle = base + k as f32 * std::f32::consts::TAU / count as f32;
                    let pos = origin + Vec2::from_angle(angle) * dist;
                    let inside = !bounded || (pos.cmpge(lo).all() && pos.cmple(hi).all());
                    (inside && free(pos, &mut neighbors)).then_some(pos)
                })
            });
            match spot {
                Some(pos) => {
                    sprites[i].target = pos;
                    relocated += 1;
                }
                None => log::warn!("no free spot for {}", sprites[i].address),
            }
        }
        grid.insert_index(i, sprites[i].target);
    }
    relocated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{PLACEHOLDER_ADDRESS, WORLD_HEIGHT, WORLD_WIDTH};
    use crate::sim::slots::{Slot, SlotGenerator};

    fn world() -> Vec2 {
        Vec2::new(WORLD_WIDTH, WORLD_HEIGHT)
    }

    fn grid_pools(per_tier: usize) -> SlotPools {
        (0..TIER_RADII.len())
            .map(|tier| {
                (0..per_tier)
                    .map(|i| Slot {
                        pos: Vec2::new(200.0 + i as f32 * 150.0, 200.0 + tier as f32 * 300.0),
                        tier,
                        r: TIER_RADII[tier],
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_landmark_sizes() {
        assert_eq!(landmark_base_size(Some("Tower")), 220.0);
        assert_eq!(landmark_base_size(Some("unknown")), LANDMARK_DEFAULT_SIZE);
        assert_eq!(landmark_base_size(None), LANDMARK_DEFAULT_SIZE);
        let mut record = EntityRecord::landmark("lm", "statue");
        record.size_multiplier = Some(1.5);
        assert_eq!(landmark_radius(&record), 120.0);
    }

    #[test]
    fn test_explicit_anchor_ignores_center_sentinel() {
        let mut record = EntityRecord::landmark("lm", "statue");
        assert_eq!(explicit_anchor(&record, world()), None);
        record.anchor_x = Some(1920.5);
        record.anchor_y = Some(1080.0);
        assert_eq!(explicit_anchor(&record, world()), None);
        record.anchor_x = Some(500.0);
        record.anchor_y = Some(600.0);
        assert_eq!(explicit_anchor(&record, world()), Some(Vec2::new(500.0, 600.0)));
    }

    #[test]
    fn test_ring_positions() {
        let tuning = SeparationTuning::default();
        let center = world_center(world());
        let first = ring_position(0, world(), &tuning);
        assert!((first - (center + Vec2::new(tuning.ring_base, 0.0))).length() < 1e-3);
        // Index 6 opens the second ring (capacity 12) at the ring offset angle
        let second = ring_position(6, world(), &tuning);
        let r = tuning.ring_base + tuning.ring_step;
        let angle = tuning.ring_angle_offset;
        let aspect = WORLD_HEIGHT / WORLD_WIDTH;
        let expected = center + Vec2::new(angle.cos() * r, angle.sin() * r * aspect);
        assert!((second - expected).length() < 1e-3);
    }

    #[test]
    fn test_fallback_tier_order() {
        assert_eq!(fallback_tiers(1, 5), vec![2, 3, 4, 0]);
        assert_eq!(fallback_tiers(0, 2), vec![1]);
        assert_eq!(fallback_tiers(3, 7), vec![4, 5, 6, 2, 1, 0]);
    }

    #[test]
    fn test_pick_slot_is_deterministic_and_probes() {
        let pools = grid_pools(4);
        let mut ledger = SlotLedger::new(&pools);
        let first = pick_slot("0xabc", 2, &pools, &mut ledger).unwrap();
        assert_eq!(first, (2, hash_str("0xabc") as usize % 4));

        let mut again = SlotLedger::new(&pools);
        assert_eq!(pick_slot("0xabc", 2, &pools, &mut again), Some(first));

        // Same address in a used ledger probes to the next free slot
        let second = pick_slot("0xabc", 2, &pools, &mut ledger).unwrap();
        assert_eq!(second, (2, (first.1 + 1) % 4));
    }

    #[test]
    fn test_pick_slot_falls_back_then_double_books() {
        let pools = grid_pools(1);
        let mut ledger = SlotLedger::new(&pools);
        assert_eq!(pick_slot("a", 4, &pools, &mut ledger), Some((4, 0)));
        assert_eq!(pick_slot("b", 4, &pools, &mut ledger), Some((0, 0)));
        for address in ["c", "d", "e"] {
            assert!(pick_slot(address, 4, &pools, &mut ledger).is_some());
        }
        assert_eq!(pick_slot("f", 4, &pools, &mut ledger), Some((4, 0)));
        assert_eq!(pick_slot("g", 0, &Vec::new(), &mut SlotLedger::new(&Vec::new())), None);
    }

    #[test]
    fn test_placeholder_pinned_and_cleared() {
        let pools = grid_pools(6);
        let mut placeholder = EntityRecord::bloblet(PLACEHOLDER_ADDRESS, 0);
        placeholder.size_multiplier = Some(1.0);
        let mut records = vec![placeholder];
        records.extend((0..10).map(|i| EntityRecord::bloblet(format!("0x{i}"), i % 5)));

        let sprites = assign_sprites(&records, &pools, world(), &Tuning::default());
        let center = world_center(world());
        let ph = &sprites[0];
        assert_eq!(ph.target, center);
        assert_eq!(ph.radius, PLACEHOLDER_RADIUS);
        assert_eq!(ph.visuals.size_mult, PLACEHOLDER_MIN_SIZE_MULT);
        for s in &sprites[1..] {
            assert!(s.target.distance(center) >= s.radius + PLACEHOLDER_RADIUS + 24.0 - 0.01);
        }
    }

    #[test]
    fn test_coincident_avatars_split_deterministically() {
        let pools: SlotPools = vec![vec![Slot {
            pos: Vec2::new(1000.0, 1000.0),
            tier: 0,
            r: TIER_RADII[0],
        }]];
        let records = vec![EntityRecord::bloblet("a", 0), EntityRecord::bloblet("b", 0)];
        let a = assign_sprites(&records, &pools, world(), &Tuning::default());
        let b = assign_sprites(&records, &pools, world(), &Tuning::default());
        assert_eq!(a, b);
        let d = a[0].target.distance(a[1].target);
        assert!(d >= TIER_RADII[0] * 2.0 + 8.0 - 0.01);
    }

    #[test]
    fn test_avatar_pushed_out_of_landmark() {
        let pools = grid_pools(6);
        let mut landmark = EntityRecord::landmark("lm", "tower");
        landmark.anchor_x = Some(200.0);
        landmark.anchor_y = Some(200.0);
        let records = vec![landmark, EntityRecord::bloblet("x", 0)];
        let sprites = assign_sprites(&records, &pools, world(), &Tuning::default());
        assert_eq!(sprites[0].target, Vec2::new(200.0, 200.0));
        let d = sprites[0].target.distance(sprites[1].target);
        assert!(d >= sprites[0].radius + sprites[1].radius + 18.0 - 0.01);
    }

    fn assert_separated(sprites: &[Sprite], tuning: &SeparationTuning) {
        let center = world_center(world());
        for (i, a) in sprites.iter().enumerate() {
            if !a.is_avatar() {
                continue;
            }
            for (j, b) in sprites.iter().enumerate() {
                let gap = a.target.distance(b.target) - a.radius - b.radius;
                if b.is_landmark() {
                    assert!(gap >= tuning.landmark_padding - 0.01, "{} in landmark", a.address);
                } else if b.placeholder {
                    assert_eq!(b.target, center);
                    assert!(gap >= tuning.placeholder_padding - 0.01, "{} in center", a.address);
                } else if j > i {
                    assert!(
                        gap >= tuning.avatar_padding - 0.01,
                        "{} and {} gap {gap}",
                        a.address,
                        b.address
                    );
                }
            }
        }
    }

    #[test]
    fn test_crowded_world_keeps_every_clearance() {
        let tuning = Tuning::default();
        for seed in [1, 7, 42, 1234] {
            let pools = SlotGenerator::new(world(), &[70; 5], &TIER_RADII, seed, &tuning.slots)
                .run_to_completion();
            let mut records: Vec<EntityRecord> = (0..300)
                .map(|i| EntityRecord::bloblet(format!("0x{seed}-{i}"), i % 5))
                .collect();
            records.extend((0..6).map(|i| EntityRecord::landmark(format!("lm{i}"), "castle")));
            records.push(EntityRecord::bloblet(PLACEHOLDER_ADDRESS, 0));

            let sprites = assign_sprites(&records, &pools, world(), &tuning);
            assert_eq!(sprites.len(), records.len());
            assert_separated(&sprites, &tuning.separation);
            for sprite in &sprites {
                assert_eq!(sprite.pos, sprite.target);
            }
        }
    }

    #[test]
    fn test_double_booked_avatars_all_separate() {
        let tuning = Tuning::default();
        let pools = grid_pools(1);
        let records: Vec<EntityRecord> = (0..80)
            .map(|i| EntityRecord::bloblet(format!("0x{i}"), i % 5))
            .collect();
        let sprites = assign_sprites(&records, &pools, world(), &tuning);
        assert_separated(&sprites, &tuning.separation);
        assert_eq!(sprites, assign_sprites(&records, &pools, world(), &tuning));
    }

    #[test]
    fn test_settle_keeps_clear_targets() {
        let tuning = SeparationTuning::default();
        let a = Sprite::from_record(
            &EntityRecord::bloblet("a", 0),
            0,
            Vec2::new(500.0, 500.0),
            TIER_RADII[0],
        );
        let mut b = a.clone();
        b.address = "b".into();
        b.target = Vec2::new(900.0, 500.0);
        let mut c = a.clone();
        c.address = "c".into();
        let mut sprites = vec![a, b, c];

        let relocated = settle_avatars(&mut sprites, world(), world_center(world()), &tuning);
        assert_eq!(relocated, 1);
        assert_eq!(sprites[0].target, Vec2::new(500.0, 500.0));
        assert_eq!(sprites[1].target, Vec2::new(900.0, 500.0));
        let gap = sprites[2].target.distance(sprites[0].target) - TIER_RADII[0] * 2.0;
        assert!(gap >= tuning.avatar_padding);
        // First free ring sits within one spiral step of the minimum distance
        assert!(gap < tuning.avatar_padding + TIER_RADII[0] * 0.5 + 1.0);
    }
}
