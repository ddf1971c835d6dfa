//! Bloblets World - canvas world renderer and sprite simulation
//!
//! Core modules:
//! - `sim`: Deterministic layout and animation (slots, assignment, entry physics)
//! - `camera`: Pan/zoom transform and world/screen projection
//! - `renderer`: Canvas2D-style frame pipeline and zoom labels
//! - `platform`: Browser bindings (wasm32 only)
//! - `persistence`: Client-side key-value preferences
//! - `tuning`: Data-driven layout and animation constants

pub mod camera;
pub mod error;
pub mod events;
pub mod persistence;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use camera::{Camera, FocusOptions};
pub use error::WorldError;
pub use events::WorldEvent;
pub use settings::{QualityPreset, Settings};
pub use sim::WorldState;
pub use tuning::Tuning;

use glam::Vec2;

/// World configuration constants
pub mod consts {
    /// World canvas size in world pixels
    pub const WORLD_WIDTH: f32 = 3840.0;
    pub const WORLD_HEIGHT: f32 = 2160.0;

    /// Number of size tiers (0 = largest)
    pub const TIER_COUNT: usize = 5;
    /// Slot radius per tier, descending
    pub const TIER_RADII: [f32; TIER_COUNT] = [56.0, 40.0, 28.0, 20.0, 14.0];
    /// Pre-rasterized frame size per tier (pixels)
    pub const FRAME_SIZES: [u32; TIER_COUNT] = [128, 96, 64, 48, 32];

    /// Sentinel address of the "mystery" entity pinned at world center
    pub const PLACEHOLDER_ADDRESS: &str = "placeholder_sprite";
    /// Placeholder footprint radius
    pub const PLACEHOLDER_RADIUS: f32 = 150.0;
    /// Placeholder minimum size multiplier
    pub const PLACEHOLDER_MIN_SIZE_MULT: f32 = 3.0;

    /// Largest frame delta the simulation accepts (ms)
    pub const MAX_FRAME_DT_MS: f64 = 33.0;
}

/// Center point of a world of the given size
#[inline]
pub fn world_center(size: Vec2) -> Vec2 {
    size * 0.5
}

/// Shorten an address for display ("0x12ab…9f3c")
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}\u{2026}{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_address() {
        assert_eq!(short_address("abc"), "abc");
        assert_eq!(
            short_address("0x1234567890abcdef"),
            "0x1234\u{2026}cdef"
        );
    }

    #[test]
    fn test_world_center() {
        let c = world_center(Vec2::new(consts::WORLD_WIDTH, consts::WORLD_HEIGHT));
        assert_eq!(c, Vec2::new(1920.0, 1080.0));
    }
}
