//! World state container
//!
//! Owns every live sprite plus the address -> index table, the slot pools and
//! the entry animation window. All sprite-list mutation goes through methods
//! on `WorldState` so the index can be rebuilt before anyone reads it again.

use std::collections::HashMap;

use glam::Vec2;
use rand::Rng;

use super::assign::{assign_sprites, explicit_anchor, landmark_radius, ring_position};
use super::math::address_rng;
use super::physics::{
    EntrySolver, EntryWindow, resolve_idle_overlaps, settle_glides, step_entry,
};
use super::slots::{SlotGenerator, SlotPools, StepStatus};
use super::snapshot::{EntityRecord, SpriteDelta};
use super::sprite::{LandmarkInfo, Sprite, mass_for_radius};
use crate::consts::{
    MAX_FRAME_DT_MS, PLACEHOLDER_MIN_SIZE_MULT, PLACEHOLDER_RADIUS, TIER_COUNT, TIER_RADII,
};
use crate::error::WorldError;
use crate::events::WorldEvent;
use crate::tuning::Tuning;
use crate::world_center;

/// Maximum distance (px) an entering sprite spawns from world center
const SPAWN_JITTER: f32 = 24.0;

/// UI-driven emphasis keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Highlights {
    /// The local player's address
    pub self_address: Option<String>,
    /// Scout mode: everything not emphasized is dimmed
    pub active: bool,
    pub inspected: Option<String>,
    pub hovered: Option<String>,
    pub selected_opponent: Option<String>,
}

impl Highlights {
    /// Whether `address` stays at full alpha while scout mode is on
    pub fn emphasizes(&self, address: &str) -> bool {
        [
            &self.self_address,
            &self.inspected,
            &self.hovered,
            &self.selected_opponent,
        ]
        .iter()
        .any(|key| key.as_deref() == Some(address))
    }
}

/// A background slot generation, tagged with the generation it will install as
pub struct SlotJob {
    pub generation: u64,
    generator: SlotGenerator,
}

impl SlotJob {
    /// Slots placed so far out of the requested total
    pub fn progress(&self) -> (usize, usize) {
        (self.generator.placed(), self.generator.requested())
    }
}

pub struct WorldState {
    /// World canvas size in world pixels
    pub size: Vec2,
    pub tuning: Tuning,
    pub highlights: Highlights,
    /// Play the scatter-in animation on new snapshots
    pub animate_entry: bool,
    /// Base seed for slot generation
    pub seed: u64,
    sprites: Vec<Sprite>,
    /// Address -> position in `sprites`. Rebuilt by `rebuild_index` after
    /// every insert/remove; never read between a mutation and the rebuild.
    index: HashMap<String, usize>,
    slot_pools: SlotPools,
    /// Generation of the installed pools
    pools_generation: u64,
    next_generation: u64,
    slot_job: Option<SlotJob>,
    entry: EntryWindow,
    solver: EntrySolver,
    events: Vec<WorldEvent>,
}

impl WorldState {
    pub fn new(size: Vec2, tuning: Tuning, seed: u64) -> Self {
        let cell = tuning.separation.grid_cell;
        Self {
            size,
            tuning,
            highlights: Highlights::default(),
            animate_entry: true,
            seed,
            sprites: Vec::new(),
            index: HashMap::new(),
            slot_pools: Vec::new(),
            pools_generation: 0,
            next_generation: 1,
            slot_job: None,
            entry: EntryWindow::default(),
            solver: EntrySolver::new(cell),
            events: Vec::new(),
        }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        world_center(self.size)
    }

    #[inline]
    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    #[inline]
    pub fn slot_pools(&self) -> &SlotPools {
        &self.slot_pools
    }

    #[inline]
    pub fn pools_generation(&self) -> u64 {
        self.pools_generation
    }

    #[inline]
    pub fn entry_window(&self) -> &EntryWindow {
        &self.entry
    }

    #[inline]
    pub fn entry_active(&self) -> bool {
        self.entry.active
    }

    /// Rebuild the address index from the current sprite order.
    ///
    /// Must run after any insert, remove or reorder of `sprites`.
    pub fn rebuild_index(&mut self) {
        self.index.clear();
        self.index.reserve(self.sprites.len());
        for (i, sprite) in self.sprites.iter().enumerate() {
            self.index.insert(sprite.address.clone(), i);
        }
    }

    #[inline]
    pub fn index_of(&self, address: &str) -> Option<usize> {
        self.index.get(address).copied()
    }

    pub fn sprite(&self, address: &str) -> Option<&Sprite> {
        self.index_of(address).map(|i| &self.sprites[i])
    }

    /// Every indexed address paired with its index
    pub fn index_entries(&self) -> impl Iterator<Item = (&str, usize)> {
        self.index.iter().map(|(a, &i)| (a.as_str(), i))
    }

    /// Landmarks whose last owner is `owner` (case-insensitive)
    pub fn owned_landmark_count(&self, owner: &str) -> usize {
        self.sprites
            .iter()
            .filter_map(|s| s.landmark.as_ref())
            .filter_map(|l| l.owner.as_deref())
            .filter(|o| o.eq_ignore_ascii_case(owner))
            .count()
    }

    // ---- Snapshot / delta / add / remove ----

    /// Replace the whole sprite set and restart the entry animation
    pub fn apply_snapshot(&mut self, records: &[EntityRecord], now_ms: f64) {
        self.ensure_pools_for(records);

        self.sprites = assign_sprites(records, &self.slot_pools, self.size, &self.tuning);
        self.rebuild_index();

        if self.animate_entry && !self.sprites.is_empty() {
            let center = self.center();
            for sprite in &mut self.sprites {
                let mut rng = address_rng(&sprite.address, 0xE17);
                let angle = rng.random::<f32>() * std::f32::consts::TAU;
                let dist = rng.random::<f32>() * SPAWN_JITTER;
                sprite.begin_entry(center + Vec2::from_angle(angle) * dist);
            }
            self.entry = EntryWindow::open(now_ms, &self.tuning.physics);
        } else {
            self.entry = EntryWindow::default();
        }

        log::info!(
            "snapshot applied: {} sprites ({} landmarks)",
            self.sprites.len(),
            self.sprites.iter().filter(|s| s.is_landmark()).count()
        );
        self.push_event(WorldEvent::SpritesUpdated {
            count: self.sprites.len(),
        });
    }

    /// Apply partial updates in place. Returns the number of sprites changed.
    pub fn apply_deltas(&mut self, deltas: &[SpriteDelta]) -> usize {
        let mut changed = 0;
        let mut removed = false;

        for delta in deltas {
            if delta.removed {
                if let Some(i) = self.index_of(&delta.address) {
                    self.sprites.remove(i);
                    self.rebuild_index();
                    self.forget_highlights(&delta.address);
                    changed += 1;
                    removed = true;
                }
                continue;
            }
            let Some(i) = self.index_of(&delta.address) else {
                continue;
            };
            if apply_delta(&mut self.sprites[i], delta) {
                changed += 1;
            }
        }

        if removed {
            log::debug!("deltas removed sprites; {} remain", self.sprites.len());
        }
        if changed > 0 {
            self.push_event(WorldEvent::SpritesUpdated {
                count: self.sprites.len(),
            });
        }
        changed
    }

    /// Add an entity that was not in the last snapshot.
    ///
    /// With `replace`, an existing sprite for the address keeps its place and
    /// takes the record's visuals; without it a duplicate is refused.
    pub fn add_sprite(
        &mut self,
        record: &EntityRecord,
        replace: bool,
        now_ms: f64,
    ) -> Result<usize, WorldError> {
        if let Some(i) = self.index_of(&record.address) {
            if !replace {
                log::warn!("add_sprite: {} already present", record.address);
                return Err(WorldError::DuplicateAddress(record.address.clone()));
            }
            replace_visuals(&mut self.sprites[i], record);
            self.push_event(WorldEvent::SpritesUpdated {
                count: self.sprites.len(),
            });
            return Ok(i);
        }

        let tier = record.resolved_tier(&self.tuning);
        let mut sprite = if record.is_placeholder() {
            let mut sprite = Sprite::from_record(record, tier, self.center(), PLACEHOLDER_RADIUS);
            sprite.visuals.size_mult = sprite.visuals.size_mult.max(PLACEHOLDER_MIN_SIZE_MULT);
            sprite
        } else if record.is_landmark() {
            let anchor = explicit_anchor(record, self.size).unwrap_or_else(|| {
                let ring_index = self.sprites.iter().filter(|s| s.is_landmark()).count();
                ring_position(ring_index, self.size, &self.tuning.separation)
            });
            Sprite::from_record(record, tier, anchor, landmark_radius(record))
        } else {
            let radius = TIER_RADII[tier] * record.size_multiplier.unwrap_or(1.0);
            let target = self.find_free_slot(tier, radius)?;
            Sprite::from_record(record, tier, target, radius)
        };

        if self.animate_entry {
            sprite.begin_pop(now_ms, self.tuning.physics.glide_max_ms);
        }
        self.sprites.push(sprite);
        self.rebuild_index();
        self.push_event(WorldEvent::SpritesUpdated {
            count: self.sprites.len(),
        });
        Ok(self.sprites.len() - 1)
    }

    /// Remove a sprite by address. Returns false if it is not present.
    pub fn remove_sprite(&mut self, address: &str) -> bool {
        let Some(i) = self.index_of(address) else {
            return false;
        };
        self.sprites.remove(i);
        self.rebuild_index();
        self.forget_highlights(address);
        self.push_event(WorldEvent::SpritesUpdated {
            count: self.sprites.len(),
        });
        true
    }

    /// Drop every highlight key pointing at a removed sprite
    fn forget_highlights(&mut self, address: &str) {
        for key in [
            &mut self.highlights.inspected,
            &mut self.highlights.hovered,
            &mut self.highlights.selected_opponent,
        ] {
            if key.as_deref() == Some(address) {
                *key = None;
            }
        }
    }

    /// Free slot for an incremental add: home tier first, then from the
    /// lowest-priority tier upward, checked against every existing sprite.
    fn find_free_slot(&self, tier: usize, radius: f32) -> Result<Vec2, WorldError> {
        if self.slot_pools.iter().all(|p| p.is_empty()) {
            return Err(WorldError::NoFreeSlot);
        }
        let padding = self.tuning.separation.avatar_padding;
        let order = std::iter::once(tier)
            .chain((0..self.slot_pools.len()).rev().filter(|&t| t != tier));

        for t in order {
            let Some(pool) = self.slot_pools.get(t) else {
                continue;
            };
            let free = pool.iter().find(|slot| {
                self.sprites
                    .iter()
                    .all(|s| s.target.distance(slot.pos) >= s.radius + radius + padding)
            });
            if let Some(slot) = free {
                return Ok(slot.pos);
            }
        }

        let home = tier.min(self.slot_pools.len() - 1);
        let fallback = self.slot_pools[home]
            .first()
            .or_else(|| self.slot_pools.iter().find_map(|p| p.first()))
            .ok_or(WorldError::NoFreeSlot)?;
        log::warn!("no clear slot for incremental add; overlapping at tier {home} slot 0");
        Ok(fallback.pos)
    }

    // ---- Highlights ----

    pub fn set_highlight_mode(&mut self, active: bool) {
        self.highlights.active = active;
    }

    /// Set (or clear with `None`) the hover preview. False if the address is unknown.
    pub fn set_hovered(&mut self, address: Option<&str>) -> bool {
        Self::set_key(&self.index, &mut self.highlights.hovered, address)
    }

    pub fn set_inspected(&mut self, address: Option<&str>) -> bool {
        Self::set_key(&self.index, &mut self.highlights.inspected, address)
    }

    pub fn select_opponent(&mut self, address: Option<&str>) -> bool {
        Self::set_key(&self.index, &mut self.highlights.selected_opponent, address)
    }

    /// The self address may name a player with no sprite yet
    pub fn set_self_address(&mut self, address: Option<&str>) -> bool {
        self.highlights.self_address = address.map(str::to_string);
        address.is_none_or(|a| self.index.contains_key(a))
    }

    fn set_key(
        index: &HashMap<String, usize>,
        key: &mut Option<String>,
        address: Option<&str>,
    ) -> bool {
        match address {
            None => {
                *key = None;
                true
            }
            Some(a) if index.contains_key(a) => {
                *key = Some(a.to_string());
                true
            }
            Some(_) => false,
        }
    }

    // ---- Simulation ----

    /// Advance animation by one frame. `dt_ms` is clamped to the max frame delta.
    pub fn step(&mut self, now_ms: f64, dt_ms: f64) {
        let dt_ms = dt_ms.clamp(0.0, MAX_FRAME_DT_MS);
        if self.entry.active {
            let center = self.center();
            let closed = step_entry(
                &mut self.sprites,
                &mut self.entry,
                center,
                now_ms,
                dt_ms,
                &self.tuning.physics,
                &mut self.solver,
            );
            if closed {
                log::debug!("entry animation finished");
            }
        } else {
            settle_glides(&mut self.sprites, now_ms);
            resolve_idle_overlaps(&mut self.sprites, dt_ms, &self.tuning.physics);
        }
    }

    // ---- Slot pools ----

    /// Start a background slot generation for `counts` slots per tier.
    ///
    /// Replaces any job in flight. Returns the new job's generation.
    pub fn start_slot_job(&mut self, counts: &[usize]) -> u64 {
        let generation = self.take_generation();
        if let Some(old) = self.slot_job.take() {
            log::debug!("slot job {} superseded by {generation}", old.generation);
        }
        let generator = SlotGenerator::new(
            self.size,
            counts,
            &TIER_RADII,
            self.seed ^ generation,
            &self.tuning.slots,
        );
        self.slot_job = Some(SlotJob {
            generation,
            generator,
        });
        generation
    }

    #[inline]
    pub fn slot_job(&self) -> Option<&SlotJob> {
        self.slot_job.as_ref()
    }

    /// Run up to `budget` placement attempts of the pending job.
    ///
    /// Returns the generation installed when the job finished with fresh
    /// results. Results older than the installed pools are dropped.
    pub fn drive_slot_job(&mut self, budget: usize) -> Option<u64> {
        let job = self.slot_job.as_mut()?;
        if job.generator.step(budget) == StepStatus::Pending {
            return None;
        }
        let job = self.slot_job.take()?;
        if job.generation < self.pools_generation {
            log::debug!(
                "discarding stale slot job {} (installed {})",
                job.generation,
                self.pools_generation
            );
            return None;
        }
        let generation = job.generation;
        self.install_pools(job.generator.into_pools(), generation);
        Some(generation)
    }

    /// Install pools produced elsewhere (tests, hosts with their own generator)
    pub fn install_pools(&mut self, pools: SlotPools, generation: u64) {
        let slots = pools.iter().map(Vec::len).sum();
        log::info!("slot pools installed: generation {generation}, {slots} slots");
        self.slot_pools = pools;
        self.pools_generation = generation;
        self.next_generation = self.next_generation.max(generation + 1);
        self.push_event(WorldEvent::SlotsReady { generation, slots });
    }

    /// Synchronously regenerate pools when a snapshot needs more avatar slots
    /// than some tier currently holds
    fn ensure_pools_for(&mut self, records: &[EntityRecord]) {
        let mut needed = [0usize; TIER_COUNT];
        for record in records.iter().filter(|r| !r.is_landmark() && !r.is_placeholder()) {
            needed[record.resolved_tier(&self.tuning)] += 1;
        }
        let short = needed
            .iter()
            .enumerate()
            .any(|(t, &n)| n > self.slot_pools.get(t).map_or(0, Vec::len));
        if !short {
            return;
        }

        let counts: Vec<usize> = needed
            .iter()
            .enumerate()
            .map(|(t, &n)| {
                let want = (n as f32 * self.tuning.slots.slack).ceil() as usize + 4;
                want.max(self.slot_pools.get(t).map_or(0, Vec::len))
            })
            .collect();
        let generation = self.take_generation();
        log::debug!("topping up slot pools synchronously: {counts:?}");
        let pools = SlotGenerator::new(
            self.size,
            &counts,
            &TIER_RADII,
            self.seed ^ generation,
            &self.tuning.slots,
        )
        .run_to_completion();
        self.install_pools(pools, generation);
    }

    fn take_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    // ---- Events ----

    pub fn push_event(&mut self, event: WorldEvent) {
        self.events.push(event);
    }

    /// Take all queued events
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Apply one delta to a sprite. Returns true if anything changed.
fn apply_delta(sprite: &mut Sprite, delta: &SpriteDelta) -> bool {
    let mut changed = false;
    if let Some(alive) = delta.is_alive
        && sprite.alive != alive
    {
        sprite.alive = alive;
        changed = true;
    }
    changed |= set_if_changed(&mut sprite.visuals.custom_name, &delta.custom_name);
    changed |= set_if_changed(&mut sprite.visuals.social_handle, &delta.social_handle);

    if let Some(info) = sprite.landmark.as_mut() {
        changed |= set_if_changed(&mut info.owner, &delta.last_owner);
        changed |= set_if_changed(&mut info.name, &delta.name);
        if let Some(id) = delta.prop_id
            && info.prop_id != Some(id)
        {
            info.prop_id = Some(id);
            changed = true;
        }
        if let Some(price) = delta.price
            && info.price != Some(price)
        {
            info.price = Some(price);
            changed = true;
        }
        if let Some(count) = delta.rename_count
            && info.rename_count != count
        {
            info.rename_count = count;
            changed = true;
        }
    }
    changed
}

fn set_if_changed(field: &mut Option<String>, update: &Option<String>) -> bool {
    match update {
        Some(value) if field.as_deref() != Some(value.as_str()) => {
            *field = Some(value.clone());
            true
        }
        _ => false,
    }
}

/// In-place visual refresh for `add_sprite(.., replace = true)`
fn replace_visuals(sprite: &mut Sprite, record: &EntityRecord) {
    sprite.alive = record.is_alive;
    sprite.visuals.custom_name = record.custom_name.clone();
    sprite.visuals.social_handle = record.social_handle.clone();
    sprite.visuals.alive_url = record.image_url_alive.clone();
    sprite.visuals.dead_url = record.image_url_dead.clone();
    if let Some(mult) = record.size_multiplier {
        if sprite.placeholder {
            sprite.visuals.size_mult = mult.max(PLACEHOLDER_MIN_SIZE_MULT);
        } else {
            sprite.visuals.size_mult = mult;
            sprite.radius = if sprite.is_landmark() {
                landmark_radius(record)
            } else {
                TIER_RADII[sprite.tier.min(TIER_COUNT - 1)] * mult
            };
            sprite.mass = mass_for_radius(sprite.radius);
        }
    }
    if record.is_landmark() {
        sprite.landmark = Some(LandmarkInfo {
            prop_id: record.prop_id,
            prop_type: record.prop_type.clone(),
            name: record.name.clone(),
            owner: record.last_owner.clone(),
            rename_count: record.rename_count.unwrap_or(0),
            price: record.price,
        });
    }
}
