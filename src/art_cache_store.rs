//! On-disk album→artwork-URL cache.
//!
//! Whole-file JSON reads and writes; the only consumer is the art resolver,
//! which is single-threaded, so there is no row-level locking.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use log::warn;

/// Persists previously issued public artwork URLs keyed by album name.
pub struct ArtCacheStore {
    cache_path: PathBuf,
}

impl ArtCacheStore {
    pub fn new(cache_path: PathBuf) -> Self {
        Self { cache_path }
    }

    /// Loads the cache, treating a missing or unparsable file as empty.
    pub fn load(&self) -> BTreeMap<String, String> {
        let raw = match fs::read_to_string(&self.cache_path) {
            Ok(raw) => raw,
            Err(_) => return BTreeMap::new(),
        };
        match serde_json::from_str(&raw) {
            Ok(cache) => cache,
            Err(err) => {
                warn!(
                    "Art cache file is not valid JSON, starting empty. path={} error={}",
                    self.cache_path.display(),
                    err
                );
                BTreeMap::new()
            }
        }
    }

    /// Rewrites the whole cache file as pretty-printed UTF-8 JSON.
    pub fn save(&self, cache: &BTreeMap<String, String>) -> Result<(), String> {
        let serialized = serde_json::to_string_pretty(cache)
            .map_err(|err| format!("Failed to serialize art cache: {err}"))?;
        fs::write(&self.cache_path, serialized).map_err(|err| {
            format!(
                "Failed to write art cache {}: {err}",
                self.cache_path.display()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ArtCacheStore;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_cache_path(name: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be valid")
            .as_nanos();
        std::env::temp_dir().join(format!("vlcord_{name}_{nonce}.json"))
    }

    #[test]
    fn test_round_trip_preserves_entries() {
        let path = unique_temp_cache_path("round_trip");
        let store = ArtCacheStore::new(path.clone());
        let mut cache = BTreeMap::new();
        cache.insert("Göttsching".to_string(), "https://host/a.jpg".to_string());
        cache.insert("Plain Album".to_string(), "https://host/b.png".to_string());
        store.save(&cache).expect("save should succeed");
        assert_eq!(store.load(), cache);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let store = ArtCacheStore::new(unique_temp_cache_path("missing"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let path = unique_temp_cache_path("corrupt");
        fs::write(&path, "{not json").expect("should write fixture");
        let store = ArtCacheStore::new(path.clone());
        assert!(store.load().is_empty());
        fs::remove_file(&path).ok();
    }
}
