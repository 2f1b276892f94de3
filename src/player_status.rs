//! VLC HTTP interface status client.

use std::time::Duration;

use base64::Engine;
use log::debug;
use serde_json::Value;

const STATUS_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const STATUS_READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Seam for the raw player status feed.
pub trait PlayerStatusSource {
    /// Fetches the current raw status payload, or `None` when the player
    /// is unreachable or answered with something other than JSON.
    fn fetch_status(&self) -> Option<Value>;
}

/// `PlayerStatusSource` over VLC's `/requests/status.json` endpoint with
/// basic auth (empty username, configured password).
pub struct VlcStatusClient {
    http_client: ureq::Agent,
    status_url: String,
    auth_header: String,
}

impl VlcStatusClient {
    pub fn new(host: &str, port: u16, password: &str) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(STATUS_CONNECT_TIMEOUT)
            .timeout_read(STATUS_READ_TIMEOUT)
            .build();
        let token = base64::engine::general_purpose::STANDARD.encode(format!(":{password}"));
        Self {
            http_client,
            status_url: format!("http://{host}:{port}/requests/status.json"),
            auth_header: format!("Basic {token}"),
        }
    }
}

impl PlayerStatusSource for VlcStatusClient {
    fn fetch_status(&self) -> Option<Value> {
        let response = self
            .http_client
            .get(&self.status_url)
            .set("Authorization", &self.auth_header)
            .call()
            .map_err(|err| debug!("VLC status fetch failed: {err}"))
            .ok()?;
        response
            .into_json()
            .map_err(|err| debug!("VLC status parse failed: {err}"))
            .ok()
    }
}
