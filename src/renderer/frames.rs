//! Pre-rasterized sprite frames
//!
//! Every tier has a square frame at a fixed pixel size. Default frames cover
//! sprites without custom art; per-entity art is rasterized lazily into the
//! same size ladder and cached by URL, separately for alive and dead variants.

use std::collections::{HashMap, HashSet};

use crate::consts::{FRAME_SIZES, TIER_COUNT};
use crate::sim::Sprite;

/// One rasterized image at a fixed pixel size
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<I> {
    pub image: I,
    pub size: u32,
}

/// One frame per tier, largest first
pub type FrameSet<I> = Vec<Frame<I>>;

/// Load state of a custom-art URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantState {
    Unseen,
    Pending,
    Ready,
    Failed,
}

#[derive(Debug)]
pub struct FrameAtlas<I> {
    default_alive: Option<FrameSet<I>>,
    default_dead: Option<FrameSet<I>>,
    alive: HashMap<String, FrameSet<I>>,
    dead: HashMap<String, FrameSet<I>>,
    pending: HashSet<String>,
    failed: HashSet<String>,
}

impl<I> Default for FrameAtlas<I> {
    fn default() -> Self {
        Self {
            default_alive: None,
            default_dead: None,
            alive: HashMap::new(),
            dead: HashMap::new(),
            pending: HashSet::new(),
            failed: HashSet::new(),
        }
    }
}

/// Frame index for a sprite: landmarks and the placeholder use the largest frame
#[inline]
pub fn frame_tier(sprite: &Sprite) -> usize {
    if sprite.is_avatar() {
        sprite.tier.min(TIER_COUNT - 1)
    } else {
        0
    }
}

impl<I> FrameAtlas<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the default alive/dead frame sets (one frame per tier)
    pub fn set_defaults(&mut self, alive: FrameSet<I>, dead: FrameSet<I>) {
        if alive.len() != TIER_COUNT || dead.len() != TIER_COUNT {
            log::warn!(
                "default frame sets have {} alive / {} dead frames, expected {TIER_COUNT}",
                alive.len(),
                dead.len()
            );
        }
        self.default_alive = Some(alive);
        self.default_dead = Some(dead);
    }

    /// Both default sets are loaded
    pub fn is_ready(&self) -> bool {
        self.default_alive.is_some() && self.default_dead.is_some()
    }

    pub fn state(&self, url: &str, alive: bool) -> VariantState {
        let cache = if alive { &self.alive } else { &self.dead };
        if cache.contains_key(url) {
            VariantState::Ready
        } else if self.failed.contains(url) {
            VariantState::Failed
        } else if self.pending.contains(url) {
            VariantState::Pending
        } else {
            VariantState::Unseen
        }
    }

    /// Claim `url` for loading. False if it is cached, in flight or failed.
    pub fn request(&mut self, url: &str, alive: bool) -> bool {
        if self.state(url, alive) != VariantState::Unseen {
            return false;
        }
        self.pending.insert(url.to_string());
        true
    }

    /// URLs referenced by `sprites` that have never been requested
    pub fn missing_urls<'a>(&self, sprites: &'a [Sprite]) -> Vec<(&'a str, bool)> {
        let mut seen = HashSet::new();
        sprites
            .iter()
            .filter_map(|s| {
                let url = if s.alive {
                    s.visuals.alive_url.as_deref()
                } else {
                    s.visuals.dead_url.as_deref()
                }?;
                (self.state(url, s.alive) == VariantState::Unseen && seen.insert((url, s.alive)))
                    .then_some((url, s.alive))
            })
            .collect()
    }

    pub fn insert(&mut self, url: &str, alive: bool, frames: FrameSet<I>) {
        self.pending.remove(url);
        let cache = if alive { &mut self.alive } else { &mut self.dead };
        cache.insert(url.to_string(), frames);
    }

    pub fn mark_failed(&mut self, url: &str) {
        self.pending.remove(url);
        self.failed.insert(url.to_string());
    }

    /// Frame to draw for `sprite`.
    ///
    /// Custom art wins once loaded; while it loads the default frame stands in.
    /// A URL that failed to load resolves to nothing and the sprite is skipped.
    pub fn resolve(&self, sprite: &Sprite) -> Option<&Frame<I>> {
        let tier = frame_tier(sprite);
        let (url, custom, defaults) = if sprite.alive {
            (sprite.visuals.alive_url.as_deref(), &self.alive, &self.default_alive)
        } else {
            (sprite.visuals.dead_url.as_deref(), &self.dead, &self.default_dead)
        };
        if let Some(url) = url {
            if let Some(set) = custom.get(url) {
                return set.get(tier);
            }
            if self.failed.contains(url) {
                return None;
            }
        }
        defaults.as_ref()?.get(tier)
    }

    /// Custom-art entries cached so far (alive, dead)
    pub fn cached_counts(&self) -> (usize, usize) {
        (self.alive.len(), self.dead.len())
    }
}

/// Build a frame set by calling `make(tier, size)` for each tier size
pub fn build_frame_set<I, E>(
    mut make: impl FnMut(usize, u32) -> Result<I, E>,
) -> Result<FrameSet<I>, E> {
    FRAME_SIZES
        .iter()
        .enumerate()
        .map(|(tier, &size)| Ok(Frame { image: make(tier, size)?, size }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::EntityRecord;
    use glam::Vec2;

    fn set(prefix: &str) -> FrameSet<String> {
        build_frame_set(|tier, size| Ok::<_, ()>(format!("{prefix}-{tier}-{size}"))).unwrap()
    }

    fn sprite(tier: usize, alive_url: Option<&str>) -> Sprite {
        let mut record = EntityRecord::bloblet("0xabc", tier);
        record.image_url_alive = alive_url.map(str::to_string);
        Sprite::from_record(&record, tier, Vec2::ZERO, 20.0)
    }

    #[test]
    fn test_not_ready_until_defaults() {
        let mut atlas: FrameAtlas<String> = FrameAtlas::new();
        assert!(!atlas.is_ready());
        assert!(atlas.resolve(&sprite(1, None)).is_none());
        atlas.set_defaults(set("alive"), set("dead"));
        assert!(atlas.is_ready());
        assert_eq!(atlas.resolve(&sprite(1, None)).map(|f| f.image.as_str()), Some("alive-1-96"));
    }

    #[test]
    fn test_dead_sprite_uses_dead_set() {
        let mut atlas = FrameAtlas::new();
        atlas.set_defaults(set("alive"), set("dead"));
        let mut s = sprite(3, None);
        s.alive = false;
        assert_eq!(atlas.resolve(&s).map(|f| f.size), Some(48));
        assert_eq!(atlas.resolve(&s).map(|f| f.image.as_str()), Some("dead-3-48"));
    }

    #[test]
    fn test_custom_variant_lifecycle() {
        let mut atlas = FrameAtlas::new();
        atlas.set_defaults(set("alive"), set("dead"));
        let s = sprite(2, Some("https://img/a.png"));

        assert_eq!(atlas.missing_urls(std::slice::from_ref(&s)), vec![("https://img/a.png", true)]);
        assert!(atlas.request("https://img/a.png", true));
        assert!(!atlas.request("https://img/a.png", true));
        assert!(atlas.missing_urls(std::slice::from_ref(&s)).is_empty());
        // Default stands in while loading
        assert_eq!(atlas.resolve(&s).map(|f| f.image.as_str()), Some("alive-2-64"));

        atlas.insert("https://img/a.png", true, set("custom"));
        assert_eq!(atlas.resolve(&s).map(|f| f.image.as_str()), Some("custom-2-64"));
        assert_eq!(atlas.cached_counts(), (1, 0));
    }

    #[test]
    fn test_failed_variant_is_skipped() {
        let mut atlas = FrameAtlas::new();
        atlas.set_defaults(set("alive"), set("dead"));
        let s = sprite(0, Some("bad.png"));
        atlas.request("bad.png", true);
        atlas.mark_failed("bad.png");
        assert_eq!(atlas.state("bad.png", true), VariantState::Failed);
        assert!(atlas.resolve(&s).is_none());
    }
}
