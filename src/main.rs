mod art_cache_store;
mod art_resolver;
mod art_uploader;
mod config;
mod metadata_normalizer;
mod player_launcher;
mod player_status;
mod presence;
mod protocol;
mod reconciliation_manager;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use log::{error, info, warn};

use art_cache_store::ArtCacheStore;
use art_resolver::{ArtResolver, HeadProbe};
use art_uploader::UguuUploader;
use config::Config;
use player_status::VlcStatusClient;
use presence::DiscordPresence;
use reconciliation_manager::ReconciliationManager;

const CONFIG_FILE_NAME: &str = "vlcord.toml";
const ART_CACHE_FILE_NAME: &str = "art.json";
const VLC_STARTUP_GRACE: Duration = Duration::from_secs(2);

fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    let config_dir = dirs::config_dir().ok_or("could not determine config directory")?;
    let config_file = config_dir.join(CONFIG_FILE_NAME);

    if !config_file.exists() {
        let default_config = Config::default();
        info!(
            "Config file not found. Creating default config. path={}",
            config_file.display()
        );
        match toml::to_string_pretty(&default_config) {
            Ok(serialized) => {
                if let Err(err) = std::fs::write(&config_file, serialized) {
                    warn!("Failed to write default config: {}", err);
                }
            }
            Err(err) => warn!("Failed to serialize default config: {}", err),
        }
        return Ok(default_config);
    }

    let raw = std::fs::read_to_string(&config_file)?;
    match toml::from_str(&raw) {
        Ok(config) => Ok(config),
        Err(err) => {
            warn!(
                "Config file is not valid TOML, using defaults. path={} error={}",
                config_file.display(),
                err
            );
            Ok(Config::default())
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Info);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let config = load_config()?;
    if config.discord_client_id.is_empty() {
        error!("discord_client_id is not configured; set it in {CONFIG_FILE_NAME}");
        return Err("missing discord_client_id".into());
    }

    if player_launcher::launch_vlc(&config.vlc) {
        // Give VLC time to bring up its HTTP interface.
        thread::sleep(VLC_STARTUP_GRACE);
    }

    let status_client = VlcStatusClient::new(
        &config.vlc.host,
        config.vlc.port,
        &config.vlc.password,
    );
    let presence = DiscordPresence::new(&config.discord_client_id)?;
    let art_resolver = ArtResolver::new(
        ArtCacheStore::new(PathBuf::from(ART_CACHE_FILE_NAME)),
        Box::new(UguuUploader::new()),
        Box::new(HeadProbe::new()),
        config.art.default_image.clone(),
    );

    let mut manager = ReconciliationManager::new(
        Box::new(status_client),
        Box::new(presence),
        art_resolver,
        &config,
    );
    manager.connect();
    manager.run()
}
