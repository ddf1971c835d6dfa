//! Boundary records: full snapshots, incremental deltas, ad-hoc adds
//!
//! These mirror the JSON the backend hands the UI. Every field other than the
//! address is optional so partially populated rows still decode.

use serde::{Deserialize, Serialize};

use crate::consts::{PLACEHOLDER_ADDRESS, TIER_COUNT};
use crate::error::WorldError;
use crate::tuning::Tuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[default]
    Bloblet,
    Landmark,
}

impl EntityKind {
    /// Anything other than "landmark" is an avatar
    pub fn from_type(entity_type: Option<&str>) -> Self {
        match entity_type {
            Some("landmark") => EntityKind::Landmark,
            _ => EntityKind::Bloblet,
        }
    }
}

/// One entity in a world snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityRecord {
    pub address: String,
    pub tier: Option<usize>,
    /// Raw balance, bucketed into a tier when `tier` is absent
    pub balance: Option<f64>,
    #[serde(default = "default_alive")]
    pub is_alive: bool,
    pub entity_type: Option<String>,
    pub size_multiplier: Option<f32>,
    pub custom_name: Option<String>,
    pub social_handle: Option<String>,
    pub image_url_alive: Option<String>,
    pub image_url_dead: Option<String>,
    // Landmark fields
    pub prop_id: Option<u64>,
    pub prop_type: Option<String>,
    pub name: Option<String>,
    pub rename_count: Option<u32>,
    pub anchor_x: Option<f32>,
    pub anchor_y: Option<f32>,
    pub last_owner: Option<String>,
    pub price: Option<f64>,
}

fn default_alive() -> bool {
    true
}

impl EntityRecord {
    pub fn bloblet(address: impl Into<String>, tier: usize) -> Self {
        Self {
            address: address.into(),
            tier: Some(tier),
            is_alive: true,
            ..Self::default()
        }
    }

    pub fn landmark(address: impl Into<String>, prop_type: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            is_alive: true,
            entity_type: Some("landmark".to_string()),
            prop_type: Some(prop_type.into()),
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.address == PLACEHOLDER_ADDRESS
    }

    #[inline]
    pub fn kind(&self) -> EntityKind {
        EntityKind::from_type(self.entity_type.as_deref())
    }

    #[inline]
    pub fn is_landmark(&self) -> bool {
        self.kind() == EntityKind::Landmark
    }

    /// Resolved tier: explicit tier, else bucketed balance, else the last tier
    pub fn resolved_tier(&self, tuning: &Tuning) -> usize {
        self.tier
            .or_else(|| self.balance.map(|b| tuning.tier_for_balance(b)))
            .unwrap_or(TIER_COUNT - 1)
            .min(TIER_COUNT - 1)
    }
}

/// Partial update keyed by address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteDelta {
    pub address: String,
    pub is_alive: Option<bool>,
    pub custom_name: Option<String>,
    pub social_handle: Option<String>,
    pub last_owner: Option<String>,
    pub rename_count: Option<u32>,
    pub price: Option<f64>,
    pub prop_id: Option<u64>,
    pub name: Option<String>,
    pub removed: bool,
}

/// Decode a JSON array of entity records
pub fn parse_snapshot(json: &str) -> Result<Vec<EntityRecord>, WorldError> {
    Ok(serde_json::from_str(json)?)
}

/// Decode a JSON array of deltas
pub fn parse_deltas(json: &str) -> Result<Vec<SpriteDelta>, WorldError> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_snapshot() {
        let json = r#"[
            {"address":"0xa","tier":0},
            {"address":"0xb","balance":60000,"is_alive":false},
            {"address":"lm-1","entity_type":"landmark","prop_type":"fountain",
             "anchor_x":100,"anchor_y":200,"last_owner":"0xa"},
            {"address":"0xc","entity_type":"mystery"}
        ]"#;
        let records = parse_snapshot(json).unwrap();
        assert_eq!(records.len(), 4);
        assert!(records[0].is_alive);
        assert!(!records[1].is_alive);
        assert_eq!(records[1].resolved_tier(&Tuning::default()), 2);
        assert!(records[2].is_landmark());
        assert_eq!(records[2].anchor_x, Some(100.0));
        assert_eq!(records[3].kind(), EntityKind::Bloblet);
        assert_eq!(records[3].resolved_tier(&Tuning::default()), TIER_COUNT - 1);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_snapshot("{"), Err(WorldError::Snapshot(_))));
    }

    #[test]
    fn test_parse_deltas() {
        let json = r#"[{"address":"0xa","is_alive":false},{"address":"0xb","removed":true}]"#;
        let deltas = parse_deltas(json)
            .unwrap();
        assert_eq!(deltas[0].is_alive, Some(false));
        assert!(deltas[1].removed);
        assert!(!deltas[0].removed);
    }
}
