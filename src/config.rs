//! Application configuration model and defaults.

/// Root configuration persisted to `vlcord.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    /// Discord application id used for the presence connection.
    #[serde(default)]
    pub discord_client_id: String,
    #[serde(default)]
    /// VLC process and HTTP interface settings.
    pub vlc: VlcConfig,
    #[serde(default)]
    /// Artwork fallback settings.
    pub art: ArtConfig,
    #[serde(default)]
    /// Small status-icon asset names.
    pub icons: IconConfig,
    /// Comma-separated substrings removed from displayed titles,
    /// in configuration order.
    #[serde(default)]
    pub strip_words: String,
}

/// VLC HTTP interface endpoint and optional executable path.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct VlcConfig {
    #[serde(default = "default_vlc_host")]
    pub host: String,
    #[serde(default = "default_vlc_port")]
    pub port: u16,
    #[serde(default)]
    pub password: String,
    /// Path to the VLC executable. Empty means VLC is launched manually.
    #[serde(default)]
    pub path: String,
}

/// Fallback artwork shown when no real cover URL is available.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ArtConfig {
    #[serde(default = "default_art_image")]
    pub default_image: String,
}

/// Asset names for the small play/pause/stop indicator.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct IconConfig {
    #[serde(default = "default_playing_icon")]
    pub playing: String,
    #[serde(default = "default_paused_icon")]
    pub paused: String,
    #[serde(default = "default_stopped_icon")]
    pub stopped: String,
}

impl Default for VlcConfig {
    fn default() -> Self {
        Self {
            host: default_vlc_host(),
            port: default_vlc_port(),
            password: String::new(),
            path: String::new(),
        }
    }
}

impl Default for ArtConfig {
    fn default() -> Self {
        Self {
            default_image: default_art_image(),
        }
    }
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            playing: default_playing_icon(),
            paused: default_paused_icon(),
            stopped: default_stopped_icon(),
        }
    }
}

impl Config {
    /// Splits `strip_words` into trimmed, non-empty substrings,
    /// preserving configuration order.
    pub fn strip_word_list(&self) -> Vec<String> {
        self.strip_words
            .split(',')
            .map(str::trim)
            .filter(|word| !word.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }
}

fn default_vlc_host() -> String {
    "localhost".to_string()
}

fn default_vlc_port() -> u16 {
    8080
}

fn default_art_image() -> String {
    "vlc".to_string()
}

fn default_playing_icon() -> String {
    "playing".to_string()
}

fn default_paused_icon() -> String {
    "paused".to_string()
}

fn default_stopped_icon() -> String {
    "stopped".to_string()
}
