//! Value types shared by the normalizer, artwork pipeline, and presence sink.

/// Transport state reported by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    Playing,
    Paused,
    Stopped,
    #[default]
    Unknown,
}

impl PlayerState {
    /// Parses the raw `state` string from the player status payload.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "playing" => Self::Playing,
            "paused" => Self::Paused,
            "stopped" => Self::Stopped,
            _ => Self::Unknown,
        }
    }
}

/// Normalized playback state derived from one poll of the player.
///
/// Rebuilt every cycle and compared structurally against the previous
/// snapshot to decide whether a presence update is warranted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaybackSnapshot {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Local filesystem path to the current cover art, after URL decoding.
    pub artwork_path: Option<String>,
    pub state: PlayerState,
    /// Wall-clock second at which playback of the current position began.
    /// Present only while playing.
    pub start_epoch: Option<i64>,
    /// `start_epoch + duration`. Present only while playing.
    pub end_epoch: Option<i64>,
}

/// Field set pushed to the presence sink for one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceUpdate {
    pub details: String,
    pub state: Option<String>,
    pub large_image: String,
    pub large_text: String,
    pub small_image: Option<String>,
    pub small_text: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
}
