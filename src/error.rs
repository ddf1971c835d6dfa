//! Error types for world operations
//!
//! Most world commands degrade instead of failing (see `WorldState`); the
//! variants here cover malformed input and the few hard refusals.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    /// Snapshot/delta JSON could not be decoded
    #[error("malformed world input: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// `add_sprite` without `replace` for an address already present
    #[error("sprite already present: {0}")]
    DuplicateAddress(String),

    /// No slot pools exist at all
    #[error("no free slot available")]
    NoFreeSlot,

    /// Image variant could not be fetched or decoded
    #[error("failed to load asset {url}: {reason}")]
    AssetLoad { url: String, reason: String },
}
