//! Outbound notifications for the UI layer
//!
//! The world queues events as it mutates; the host drains them once per frame
//! so derived UI counts refresh without polling sprite state.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldEvent {
    /// Sprite set changed (snapshot, delta, add, remove)
    SpritesUpdated { count: usize },
    /// First frame that actually drew sprites
    RenderReady,
    /// A slot job finished and its pools were installed
    SlotsReady { generation: u64, slots: usize },
}

impl WorldEvent {
    /// DOM event name used by the browser bridge
    pub fn name(&self) -> &'static str {
        match self {
            WorldEvent::SpritesUpdated { .. } => "bloblets:sprites-updated",
            WorldEvent::RenderReady => "bloblets:render-ready",
            WorldEvent::SlotsReady { .. } => "bloblets:slots-ready",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_tagged() {
        let json = serde_json::to_string(&WorldEvent::SpritesUpdated { count: 3 }).unwrap();
        assert_eq!(json, r#"{"type":"sprites_updated","count":3}"#);
        assert_eq!(WorldEvent::RenderReady.name(), "bloblets:render-ready");
    }
}
