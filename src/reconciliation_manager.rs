//! Polling driver that reconciles player state with the presence sink.
//!
//! One snapshot is built per poll cycle and compared against the previous
//! one; a meaningful difference (or a non-empty raw player state, which
//! re-triggers unconditionally) pushes either a "now playing" or an idle
//! update through the sink. All calls are blocking and sequential; the only
//! overlap concern is the upload guard inside the art resolver.

use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::art_resolver::ArtResolver;
use crate::config::Config;
use crate::metadata_normalizer::normalize;
use crate::player_status::PlayerStatusSource;
use crate::presence::PresenceSink;
use crate::protocol::{PlaybackSnapshot, PlayerState, PresenceUpdate};

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(10);
const LARGE_TEXT: &str = "VLC Media Player";
const IDLE_DETAILS: &str = "Idling";
const IDLE_STATE: &str = "Nothing is playing";
const PAUSED_LABEL: &str = "Paused";

pub struct ReconciliationManager {
    status_source: Box<dyn PlayerStatusSource>,
    presence: Box<dyn PresenceSink>,
    art_resolver: ArtResolver,
    default_image: String,
    playing_icon: String,
    paused_icon: String,
    stopped_icon: String,
    strip_words: Vec<String>,
    last_snapshot: Option<PlaybackSnapshot>,
    last_raw_state: String,
}

impl ReconciliationManager {
    pub fn new(
        status_source: Box<dyn PlayerStatusSource>,
        presence: Box<dyn PresenceSink>,
        art_resolver: ArtResolver,
        config: &Config,
    ) -> Self {
        Self {
            status_source,
            presence,
            art_resolver,
            default_image: config.art.default_image.clone(),
            playing_icon: config.icons.playing.clone(),
            paused_icon: config.icons.paused.clone(),
            stopped_icon: config.icons.stopped.clone(),
            strip_words: config.strip_word_list(),
            last_snapshot: None,
            last_raw_state: String::new(),
        }
    }

    /// Establishes the presence connection, retrying forever at a fixed
    /// delay. Only returns on success.
    pub fn connect(&mut self) {
        loop {
            match self.presence.connect() {
                Ok(()) => {
                    info!("Discord Rich Presence started.");
                    return;
                }
                Err(err) => {
                    error!("{err}");
                    warn!("Retrying in {} seconds...", CONNECT_RETRY_DELAY.as_secs());
                    thread::sleep(CONNECT_RETRY_DELAY);
                }
            }
        }
    }

    /// Polls and reconciles until the process is terminated.
    pub fn run(&mut self) -> ! {
        loop {
            if let Some(status) = self.status_source.fetch_status() {
                self.tick(&status, now_epoch());
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// One reconciliation iteration over an already-fetched status payload.
    pub fn tick(&mut self, status: &Value, now_epoch: i64) {
        let raw_state = status
            .get("state")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if raw_state != self.last_raw_state {
            debug!(
                "Player state changed. previous={:?} current={:?}",
                self.last_raw_state, raw_state
            );
        }
        let snapshot = normalize(status, now_epoch);

        let fields_changed = match &self.last_snapshot {
            Some(last) => comparison_fields_differ(last, &snapshot),
            None => true,
        };
        // Any non-empty raw state re-triggers even with zero field changes,
        // so a steady "playing" still re-evaluates every cycle.
        if !fields_changed && raw_state.is_empty() {
            self.last_raw_state = raw_state;
            return;
        }

        let details = snapshot
            .title
            .as_deref()
            .map(|title| strip_title(title, &self.strip_words))
            .filter(|stripped| !stripped.is_empty());

        let (update, is_idle) = match details {
            Some(details) => {
                let large_image = self.art_resolver.resolve(
                    snapshot.album.as_deref(),
                    snapshot.artwork_path.as_deref(),
                );
                (self.build_now_playing(&snapshot, details, large_image), false)
            }
            None => (self.build_idle(), true),
        };
        match self.presence.update(&update) {
            Ok(()) if is_idle => {
                info!("Player is stopped or no song info available. Updated to idle status.")
            }
            Ok(()) => info!(
                "Now playing: {}{} [{}]",
                update.details,
                update
                    .state
                    .as_deref()
                    .map(|artist| format!(" - {artist}"))
                    .unwrap_or_default(),
                raw_state
            ),
            Err(err) => error!("{err}"),
        }

        // Advance the memory slot whether or not the push succeeded.
        self.last_snapshot = Some(snapshot);
        self.last_raw_state = raw_state;
    }

    fn build_now_playing(
        &self,
        snapshot: &PlaybackSnapshot,
        details: String,
        large_image: String,
    ) -> PresenceUpdate {
        let mut update = PresenceUpdate {
            details,
            state: snapshot.artist.clone(),
            large_image,
            large_text: LARGE_TEXT.to_string(),
            small_image: None,
            small_text: None,
            start: None,
            end: None,
        };
        let has_timing = snapshot.state == PlayerState::Playing
            && matches!(
                (snapshot.start_epoch, snapshot.end_epoch),
                (Some(start), Some(end)) if end > start
            );
        if has_timing {
            update.start = snapshot.start_epoch;
            update.end = snapshot.end_epoch;
            if update.large_image == self.default_image {
                update.small_image = Some(self.playing_icon.clone());
            }
        } else if snapshot.state == PlayerState::Paused {
            update.small_image = Some(self.paused_icon.clone());
            update.small_text = Some(PAUSED_LABEL.to_string());
        } else if update.large_image == self.default_image {
            // Default-art fallback always shows some status icon.
            update.small_image = Some(self.playing_icon.clone());
        }
        update
    }

    fn build_idle(&self) -> PresenceUpdate {
        PresenceUpdate {
            details: IDLE_DETAILS.to_string(),
            state: Some(IDLE_STATE.to_string()),
            large_image: self.default_image.clone(),
            large_text: LARGE_TEXT.to_string(),
            small_image: Some(self.stopped_icon.clone()),
            small_text: None,
            start: None,
            end: None,
        }
    }
}

/// Compares the five snapshot fields (plus both epochs) that warrant a
/// presence update; the parsed player state itself is not one of them.
fn comparison_fields_differ(last: &PlaybackSnapshot, current: &PlaybackSnapshot) -> bool {
    last.title != current.title
        || last.artist != current.artist
        || last.album != current.album
        || last.artwork_path != current.artwork_path
        || last.start_epoch != current.start_epoch
        || last.end_epoch != current.end_epoch
}

/// Removes each configured substring from the title in configuration order.
/// Plain substring removal: surrounding whitespace is left untouched.
fn strip_title(title: &str, strip_words: &[String]) -> String {
    strip_words
        .iter()
        .fold(title.to_string(), |stripped, word| {
            stripped.replace(word.as_str(), "")
        })
}

fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{strip_title, ReconciliationManager};
    use crate::art_cache_store::ArtCacheStore;
    use crate::art_resolver::{ArtResolver, UrlLiveness};
    use crate::art_uploader::{ArtHost, UploadError};
    use crate::config::Config;
    use crate::player_status::PlayerStatusSource;
    use crate::presence::PresenceSink;
    use crate::protocol::PresenceUpdate;
    use serde_json::{json, Value};
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::{SystemTime, UNIX_EPOCH};

    struct NoStatus;

    impl PlayerStatusSource for NoStatus {
        fn fetch_status(&self) -> Option<Value> {
            None
        }
    }

    struct NoHost;

    impl ArtHost for NoHost {
        fn upload(&self, _path: &Path) -> Result<String, UploadError> {
            Err(UploadError::Transport("no network in tests".to_string()))
        }
    }

    struct NoLiveness;

    impl UrlLiveness for NoLiveness {
        fn is_live(&self, _url: &str) -> bool {
            false
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        updates: Arc<Mutex<Vec<PresenceUpdate>>>,
        fail_updates: bool,
    }

    impl PresenceSink for RecordingSink {
        fn connect(&mut self) -> Result<(), String> {
            Ok(())
        }

        fn update(&mut self, update: &PresenceUpdate) -> Result<(), String> {
            self.updates
                .lock()
                .expect("updates lock should not be poisoned")
                .push(update.clone());
            if self.fail_updates {
                Err("Failed to update Rich Presence: ipc closed".to_string())
            } else {
                Ok(())
            }
        }
    }

    fn make_manager(config: Config, sink: RecordingSink) -> ReconciliationManager {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be valid")
            .as_nanos();
        let cache_path = std::env::temp_dir().join(format!("vlcord_manager_{nonce}.json"));
        let resolver = ArtResolver::new(
            ArtCacheStore::new(cache_path),
            Box::new(NoHost),
            Box::new(NoLiveness),
            config.art.default_image.clone(),
        );
        ReconciliationManager::new(Box::new(NoStatus), Box::new(sink), resolver, &config)
    }

    fn playing_status(title: &str, time: i64, length: i64) -> Value {
        json!({
            "state": "playing",
            "time": time,
            "length": length,
            "information": {"category": {"meta": {"title": title, "artist": "Artist"}}}
        })
    }

    #[test]
    fn test_strip_title_keeps_exact_whitespace() {
        let words = vec!["[HD]".to_string(), " (Remastered)".to_string()];
        assert_eq!(strip_title("Song [HD] (Remastered)", &words), "Song ");
    }

    #[test]
    fn test_no_update_when_unchanged_and_raw_state_empty() {
        let sink = RecordingSink::default();
        let updates = sink.updates.clone();
        let mut manager = make_manager(Config::default(), sink);
        let status = json!({"information": {"category": {"meta": {"title": "Song"}}}});
        manager.tick(&status, 100);
        manager.tick(&status, 105);
        manager.tick(&status, 110);
        // Only the first cycle differs from the (absent) last snapshot.
        assert_eq!(updates.lock().expect("lock").len(), 1);
    }

    #[test]
    fn test_retrigger_on_nonempty_raw_state_with_no_field_changes() {
        let sink = RecordingSink::default();
        let updates = sink.updates.clone();
        let mut manager = make_manager(Config::default(), sink);
        let status = json!({
            "state": "paused",
            "information": {"category": {"meta": {"title": "Song"}}}
        });
        manager.tick(&status, 100);
        manager.tick(&status, 105);
        manager.tick(&status, 110);
        // Paused yields no epochs, so no field ever changes; the non-empty
        // raw state still re-triggers every cycle.
        assert_eq!(updates.lock().expect("lock").len(), 3);
    }

    #[test]
    fn test_playing_update_carries_timing_and_playing_icon() {
        let sink = RecordingSink::default();
        let updates = sink.updates.clone();
        let mut manager = make_manager(Config::default(), sink);
        let now = 1_700_000_000;
        manager.tick(&playing_status("Song", 30, 200), now);

        let updates = updates.lock().expect("lock");
        let update = updates.last().expect("one update");
        assert_eq!(update.details, "Song");
        assert_eq!(update.state.as_deref(), Some("Artist"));
        assert_eq!(update.start, Some(now - 30));
        assert_eq!(update.end, Some(now + 170));
        // Artwork fell back to the default image, so the playing icon shows.
        assert_eq!(update.large_image, "vlc");
        assert_eq!(update.small_image.as_deref(), Some("playing"));
        assert_eq!(update.small_text, None);
    }

    #[test]
    fn test_paused_update_omits_timing_and_shows_paused_icon() {
        let sink = RecordingSink::default();
        let updates = sink.updates.clone();
        let mut manager = make_manager(Config::default(), sink);
        let status = json!({
            "state": "paused",
            "time": 30,
            "length": 200,
            "information": {"category": {"meta": {"title": "Song"}}}
        });
        manager.tick(&status, 1_700_000_000);

        let updates = updates.lock().expect("lock");
        let update = updates.last().expect("one update");
        assert_eq!(update.start, None);
        assert_eq!(update.end, None);
        assert_eq!(update.small_image.as_deref(), Some("paused"));
        assert_eq!(update.small_text.as_deref(), Some("Paused"));
    }

    #[test]
    fn test_zero_duration_playing_sets_fallback_icon_without_timing() {
        let sink = RecordingSink::default();
        let updates = sink.updates.clone();
        let mut manager = make_manager(Config::default(), sink);
        manager.tick(&playing_status("Song", 0, 0), 1_700_000_000);

        let updates = updates.lock().expect("lock");
        let update = updates.last().expect("one update");
        assert_eq!(update.start, None);
        assert_eq!(update.end, None);
        assert_eq!(update.small_image.as_deref(), Some("playing"));
    }

    #[test]
    fn test_idle_update_when_stripping_empties_the_title() {
        let config = Config {
            strip_words: "Song".to_string(),
            ..Config::default()
        };
        let sink = RecordingSink::default();
        let updates = sink.updates.clone();
        let mut manager = make_manager(config, sink);
        let status = json!({
            "state": "stopped",
            "information": {"category": {"meta": {"title": "Song"}}}
        });
        manager.tick(&status, 100);

        let updates = updates.lock().expect("lock");
        let update = updates.last().expect("one update");
        assert_eq!(update.details, "Idling");
        assert_eq!(update.state.as_deref(), Some("Nothing is playing"));
        assert_eq!(update.large_image, "vlc");
        assert_eq!(update.small_image.as_deref(), Some("stopped"));
        assert_eq!(update.start, None);
        assert_eq!(update.end, None);
    }

    #[test]
    fn test_failed_push_still_advances_the_snapshot() {
        let sink = RecordingSink {
            fail_updates: true,
            ..RecordingSink::default()
        };
        let updates = sink.updates.clone();
        let mut manager = make_manager(Config::default(), sink);
        let status = json!({"information": {"category": {"meta": {"title": "Song"}}}});
        manager.tick(&status, 100);
        manager.tick(&status, 105);
        // The failed first push is not retried: the stored snapshot advanced
        // and the raw state is empty, so the second cycle is quiet.
        assert_eq!(updates.lock().expect("lock").len(), 1);
    }

    #[test]
    fn test_track_change_triggers_new_update() {
        let sink = RecordingSink::default();
        let updates = sink.updates.clone();
        let mut manager = make_manager(Config::default(), sink);
        let first = json!({"information": {"category": {"meta": {"title": "One"}}}});
        let second = json!({"information": {"category": {"meta": {"title": "Two"}}}});
        manager.tick(&first, 100);
        manager.tick(&second, 105);
        let updates = updates.lock().expect("lock");
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].details, "One");
        assert_eq!(updates[1].details, "Two");
    }
}
