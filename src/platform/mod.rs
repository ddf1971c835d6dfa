//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Frame timing (`FrameClock`, shared by every driver)
//! - Canvas drawing, image loading and input (`web`, wasm32 only)

#[cfg(target_arch = "wasm32")]
pub mod web;

use crate::consts::MAX_FRAME_DT_MS;

/// Turns animation-frame timestamps into clamped frame deltas
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delta since the previous tick, clamped to `[0, MAX_FRAME_DT_MS]`.
    ///
    /// The first tick reports one nominal 60 Hz frame.
    pub fn tick(&mut self, now_ms: f64) -> f64 {
        let dt = match self.last_ms {
            Some(last) => now_ms - last,
            None => 1000.0 / 60.0,
        };
        self.last_ms = Some(now_ms);
        dt.clamp(0.0, MAX_FRAME_DT_MS)
    }

    /// Forget the previous timestamp (e.g. after the tab was hidden)
    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_clamps_long_pauses() {
        let mut clock = FrameClock::new();
        assert!((clock.tick(1000.0) - 1000.0 / 60.0).abs() < 1e-9);
        assert_eq!(clock.tick(1016.0), 16.0);
        assert_eq!(clock.tick(9000.0), MAX_FRAME_DT_MS);
        // Timestamps going backwards never produce negative time
        assert_eq!(clock.tick(8000.0), 0.0);
        clock.reset();
        assert!((clock.tick(20_000.0) - 1000.0 / 60.0).abs() < 1e-9);
    }
}
