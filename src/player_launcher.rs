//! Optional VLC process launch with the HTTP interface enabled.

use std::path::Path;
use std::process::Command;

use log::{error, info};

use crate::config::VlcConfig;

/// Spawns VLC with its HTTP interface if an executable path is configured.
/// Returns whether a process was started.
///
/// A missing executable is reported once and skipped; the reconciliation
/// loop only needs the status endpoint to become reachable eventually.
pub fn launch_vlc(vlc: &VlcConfig) -> bool {
    if vlc.path.is_empty() {
        return false;
    }
    if !Path::new(&vlc.path).exists() {
        error!("VLC executable not found. path={}", vlc.path);
        return false;
    }
    info!("Launching VLC with HTTP interface...");
    match Command::new(&vlc.path)
        .arg("--extraintf=http")
        .arg("--http-host=0.0.0.0")
        .arg(format!("--http-port={}", vlc.port))
        .arg(format!("--http-password={}", vlc.password))
        .spawn()
    {
        Ok(_) => true,
        Err(err) => {
            error!("Failed to launch VLC: {err}");
            false
        }
    }
}
