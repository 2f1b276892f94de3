//! Normalizes raw VLC status payloads into playback snapshots.
//!
//! This is a pure transform: no network or disk access, and any subset of
//! status fields may be absent without failing. Text values coming out of
//! VLC's HTTP interface are sometimes raw byte sequences and sometimes
//! UTF-8 that was mis-decoded through a single-byte codec one layer too
//! early; both cases are repaired here and nowhere else.

use serde_json::Value;

use crate::protocol::{PlaybackSnapshot, PlayerState};

/// Builds a snapshot from one raw status payload.
///
/// `now_epoch` is the wall-clock second at which the status was sampled;
/// start/end epochs are reconstructed from it only while playing.
pub fn normalize(status: &Value, now_epoch: i64) -> PlaybackSnapshot {
    let raw_state = status
        .get("state")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let state = PlayerState::from_raw(raw_state);

    static NO_META: Value = Value::Null;
    let meta = status.get("information").map(|information| {
        information
            .get("category")
            .and_then(|category| category.get("meta"))
            .unwrap_or(&NO_META)
    });

    let (title, artist, album, artwork_path) = match meta {
        Some(meta) => {
            let title = meta_text(meta, "title")
                .or_else(|| meta_text(meta, "filename"))
                .unwrap_or_else(|| "Unknown".to_string());
            let artist = meta_text(meta, "artist");
            let album = meta_text(meta, "album").map(|value| {
                urlencoding::decode(&value)
                    .map(|decoded| decoded.to_string())
                    .unwrap_or(value)
            });
            let artwork_path = meta_text(meta, "artwork_url")
                .or_else(|| meta_text(meta, "artwork"))
                .map(|locator| decode_artwork_locator(&locator));
            (Some(title), artist, album, artwork_path)
        }
        None => (None, None, None, None),
    };

    let (start_epoch, end_epoch) = if state == PlayerState::Playing {
        let position = status.get("time").and_then(Value::as_i64).unwrap_or(0);
        let duration = status.get("length").and_then(Value::as_i64).unwrap_or(0);
        let start = now_epoch - position;
        (Some(start), Some(start + duration))
    } else {
        (None, None)
    };

    PlaybackSnapshot {
        title,
        artist,
        album,
        artwork_path,
        state,
        start_epoch,
        end_epoch,
    }
}

/// Reads one metadata field as repaired text, treating empty values as absent.
fn meta_text(meta: &Value, key: &str) -> Option<String> {
    let text = match meta.get(key)? {
        Value::String(text) => repair_text(text),
        Value::Array(items) => decode_byte_values(items)?,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Object(_) => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Decodes a metadata value delivered as a raw byte sequence: UTF-8 first,
/// falling back to the replacement-free Latin-1 mapping (every byte is a
/// valid Latin-1 code point).
fn decode_byte_values(items: &[Value]) -> Option<String> {
    let bytes = items
        .iter()
        .map(|item| {
            item.as_u64()
                .filter(|&value| value <= u8::MAX as u64)
                .map(|value| value as u8)
        })
        .collect::<Option<Vec<u8>>>()?;
    Some(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err.into_bytes().iter().map(|&byte| byte as char).collect(),
    })
}

/// Best-effort repair for UTF-8 that was mistakenly decoded through a
/// single-byte codec: re-encode as Latin-1 and decode as UTF-8. Returns the
/// input unchanged when either step fails, so correct text passes through.
pub fn repair_text(text: &str) -> String {
    let bytes = text
        .chars()
        .map(|character| {
            let code_point = character as u32;
            if code_point <= u8::MAX as u32 {
                Some(code_point as u8)
            } else {
                None
            }
        })
        .collect::<Option<Vec<u8>>>();
    match bytes.map(String::from_utf8) {
        Some(Ok(repaired)) => repaired,
        _ => text.to_string(),
    }
}

/// Turns an artwork locator into a local filesystem path.
///
/// `file://` locators have the scheme and authority stripped and the path
/// percent-decoded; a leading separator is removed when a Windows drive
/// designator follows. Plain locators are only percent-decoded.
pub fn decode_artwork_locator(locator: &str) -> String {
    if let Some(rest) = locator.strip_prefix("file://") {
        let path_part = if rest.starts_with('/') {
            rest
        } else {
            // Authority component before the path, as in file://host/share.
            rest.find('/').map(|index| &rest[index..]).unwrap_or("")
        };
        let decoded = urlencoding::decode(path_part)
            .map(|decoded| decoded.to_string())
            .unwrap_or_else(|_| path_part.to_string());
        if decoded.starts_with('/') && decoded.contains(':') {
            decoded[1..].to_string()
        } else {
            decoded
        }
    } else {
        urlencoding::decode(locator)
            .map(|decoded| decoded.to_string())
            .unwrap_or_else(|_| locator.to_string())
    }
}
