//! World simulation
//!
//! Everything here is deterministic for a given seed, address set and frame
//! timing, and free of platform dependencies:
//! - `slots`: density-weighted placement slots, generated incrementally
//! - `assign`: entity -> slot binding and separation
//! - `physics`: entry animation and idle settling
//! - `world`: the owning container and its mutation API

pub mod assign;
pub mod grid;
pub mod math;
pub mod physics;
pub mod slots;
pub mod snapshot;
pub mod sprite;
pub mod world;

pub use assign::{assign_sprites, enforce_separation, pick_slot, SlotLedger};
pub use grid::SpatialGrid;
pub use physics::{EntrySolver, EntryWindow};
pub use slots::{Slot, SlotGenerator, SlotPhase, SlotPools, StepStatus};
pub use snapshot::{EntityKind, EntityRecord, SpriteDelta, parse_deltas, parse_snapshot};
pub use sprite::{Sprite, SpriteMode};
pub use world::{Highlights, SlotJob, WorldState};
