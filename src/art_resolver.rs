//! Artwork URL resolution: cache, liveness probe, and guarded upload.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use log::{info, warn};

use crate::art_cache_store::ArtCacheStore;
use crate::art_uploader::ArtHost;

const LIVENESS_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Seam for the bounded-timeout URL reachability probe.
pub trait UrlLiveness {
    fn is_live(&self, url: &str) -> bool;
}

/// `UrlLiveness` over an HTTP HEAD request; only a 200 counts as alive.
pub struct HeadProbe {
    http_client: ureq::Agent,
}

impl HeadProbe {
    pub fn new() -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(LIVENESS_PROBE_TIMEOUT)
            .timeout_read(LIVENESS_PROBE_TIMEOUT)
            .build();
        Self { http_client }
    }
}

impl Default for HeadProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlLiveness for HeadProbe {
    fn is_live(&self, url: &str) -> bool {
        match self.http_client.head(url).call() {
            Ok(response) => response.status() == 200,
            Err(_) => false,
        }
    }
}

/// Resolves an album to a public artwork URL.
///
/// Cached URLs are verified live before being served and evicted when dead.
/// At most one upload may be in flight at a time; while one is, every other
/// resolution falls back to the default image for that cycle instead of
/// blocking the poll loop.
pub struct ArtResolver {
    store: ArtCacheStore,
    host: Box<dyn ArtHost>,
    liveness: Box<dyn UrlLiveness>,
    default_image: String,
    upload_guard: Mutex<()>,
}

impl ArtResolver {
    pub fn new(
        store: ArtCacheStore,
        host: Box<dyn ArtHost>,
        liveness: Box<dyn UrlLiveness>,
        default_image: String,
    ) -> Self {
        Self {
            store,
            host,
            liveness,
            default_image,
            upload_guard: Mutex::new(()),
        }
    }

    /// Returns the artwork URL for the album, or the default image
    /// identifier when none is available this cycle.
    pub fn resolve(&self, album: Option<&str>, artwork_path: Option<&str>) -> String {
        let (album, artwork_path) = match (album, artwork_path) {
            (Some(album), Some(path)) if !album.is_empty() && !path.is_empty() => (album, path),
            // No art expected for this item; not an error.
            _ => return self.default_image.clone(),
        };

        let mut cache = self.store.load();
        if let Some(cached_url) = cache.get(album) {
            if self.liveness.is_live(cached_url) {
                return cached_url.clone();
            }
            let dead_url = cached_url.clone();
            cache.remove(album);
            if let Err(err) = self.store.save(&cache) {
                warn!("{err}");
            }
            info!("Evicted dead art cache entry. album={album} url={dead_url}");
        }

        // Non-blocking: if an upload is already in flight, fall back for
        // this cycle and let a later poll retry.
        let guard = match self.upload_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => return self.default_image.clone(),
        };

        if !Path::new(artwork_path).exists() {
            return self.default_image.clone();
        }

        info!("Uploading album art. album={album}");
        let resolved = match self.host.upload(Path::new(artwork_path)) {
            Ok(url) => {
                cache.insert(album.to_string(), url.clone());
                if let Err(err) = self.store.save(&cache) {
                    warn!("{err}");
                }
                info!("Album art uploaded and cached. url={url}");
                url
            }
            Err(err) => {
                warn!("Album art upload failed: {err}");
                self.default_image.clone()
            }
        };
        drop(guard);
        resolved
    }
}
