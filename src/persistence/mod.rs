//! Client-side key-value persistence
//!
//! Features:
//! - `KeyValueStore` trait over string keys/values
//! - LocalStorage backend on web, in-memory backend everywhere
//! - `ClientPrefs`: last wallet/display address and the navigation hint flag

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

/// String key-value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);

    /// Decode a JSON value; missing or malformed entries read as `None`
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T>
    where
        Self: Sized,
    {
        let raw = self.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("ignoring malformed stored value for {key}: {e}");
                None
            }
        }
    }

    fn set_json<T: Serialize>(&mut self, key: &str, value: &T)
    where
        Self: Sized,
    {
        match serde_json::to_string(value) {
            Ok(json) => self.set(key, &json),
            Err(e) => log::warn!("failed to encode {key}: {e}"),
        }
    }
}

/// Process-local store (native builds and tests)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Browser LocalStorage. Reads and writes fail silently when storage is unavailable.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Default)]
pub struct LocalStorageStore;

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.set_item(key, value);
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }
}

/// Default store for the current target
#[cfg(target_arch = "wasm32")]
pub fn default_store() -> LocalStorageStore {
    LocalStorageStore
}

#[cfg(not(target_arch = "wasm32"))]
pub fn default_store() -> MemoryStore {
    MemoryStore::new()
}

/// Small per-browser preferences read by the world view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientPrefs {
    pub wallet_address: Option<String>,
    pub display_address: Option<String>,
    pub nav_hint_seen: bool,
}

impl ClientPrefs {
    const WALLET_KEY: &'static str = "bloblets_wallet_address";
    const DISPLAY_KEY: &'static str = "bloblets_display_address";
    const NAV_HINT_KEY: &'static str = "bloblets_nav_hint_seen";

    /// Each field lives under its own key so other page scripts can read them
    pub fn load(store: &impl KeyValueStore) -> Self {
        Self {
            wallet_address: store.get(Self::WALLET_KEY).filter(|s| !s.is_empty()),
            display_address: store.get(Self::DISPLAY_KEY).filter(|s| !s.is_empty()),
            nav_hint_seen: store.get(Self::NAV_HINT_KEY).as_deref() == Some("1"),
        }
    }

    pub fn save(&self, store: &mut impl KeyValueStore) {
        for (key, value) in [
            (Self::WALLET_KEY, &self.wallet_address),
            (Self::DISPLAY_KEY, &self.display_address),
        ] {
            match value {
                Some(v) => store.set(key, v),
                None => store.remove(key),
            }
        }
        store.set(Self::NAV_HINT_KEY, if self.nav_hint_seen { "1" } else { "0" });
    }

    /// Address to highlight as "self": the display address if set, else the wallet
    pub fn self_address(&self) -> Option<&str> {
        self.display_address
            .as_deref()
            .or(self.wallet_address.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefs_round_trip_through_store() {
        let mut store = MemoryStore::new();
        assert_eq!(ClientPrefs::load(&store), ClientPrefs::default());

        let prefs = ClientPrefs {
            wallet_address: Some("0xwallet".into()),
            display_address: None,
            nav_hint_seen: true,
        };
        prefs.save(&mut store);
        assert_eq!(store.get("bloblets_nav_hint_seen").as_deref(), Some("1"));
        let loaded = ClientPrefs::load(&store);
        assert_eq!(loaded, prefs);
        assert_eq!(loaded.self_address(), Some("0xwallet"));
    }

    #[test]
    fn test_clearing_address_removes_key() {
        let mut store = MemoryStore::new();
        store.set("bloblets_display_address", "0xold");
        ClientPrefs::default().save(&mut store);
        assert_eq!(store.get("bloblets_display_address"), None);
    }

    #[test]
    fn test_malformed_json_reads_as_none() {
        let mut store = MemoryStore::new();
        store.set("k", "{not json");
        assert_eq!(store.get_json::<ClientPrefs>("k"), None);
        store.set_json("k", &ClientPrefs::default());
        assert_eq!(store.get_json::<ClientPrefs>("k"), Some(ClientPrefs::default()));
    }
}
