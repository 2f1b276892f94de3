//! Presence sink seam and its Discord IPC implementation.

use discord_rich_presence::activity::{Activity, Assets, Timestamps};
use discord_rich_presence::{DiscordIpc, DiscordIpcClient};

use crate::protocol::PresenceUpdate;

/// External service displaying "now playing" status to viewers. Kept as a
/// seam so the reconciliation loop can run against a recording fake.
pub trait PresenceSink {
    fn connect(&mut self) -> Result<(), String>;
    fn update(&mut self, update: &PresenceUpdate) -> Result<(), String>;
}

/// `PresenceSink` over the Discord IPC socket.
pub struct DiscordPresence {
    client: DiscordIpcClient,
}

impl DiscordPresence {
    pub fn new(client_id: &str) -> Result<Self, String> {
        let client = DiscordIpcClient::new(client_id)
            .map_err(|err| format!("Failed to create Discord IPC client: {err}"))?;
        Ok(Self { client })
    }
}

impl PresenceSink for DiscordPresence {
    fn connect(&mut self) -> Result<(), String> {
        self.client
            .connect()
            .map_err(|err| format!("Could not connect to Discord: {err}"))
    }

    fn update(&mut self, update: &PresenceUpdate) -> Result<(), String> {
        let mut assets = Assets::new()
            .large_image(&update.large_image)
            .large_text(&update.large_text);
        if let Some(small_image) = &update.small_image {
            assets = assets.small_image(small_image);
        }
        if let Some(small_text) = &update.small_text {
            assets = assets.small_text(small_text);
        }

        let mut activity = Activity::new().details(&update.details).assets(assets);
        if let Some(state) = &update.state {
            activity = activity.state(state);
        }
        if update.start.is_some() || update.end.is_some() {
            let mut timestamps = Timestamps::new();
            if let Some(start) = update.start {
                timestamps = timestamps.start(start);
            }
            if let Some(end) = update.end {
                timestamps = timestamps.end(end);
            }
            activity = activity.timestamps(timestamps);
        }

        self.client
            .set_activity(activity)
            .map_err(|err| format!("Failed to update Rich Presence: {err}"))
    }
}
