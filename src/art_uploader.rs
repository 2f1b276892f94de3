//! Artwork upload to the public uguu.se host.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;

const UPLOAD_URL: &str = "https://uguu.se/upload?output=json";
const UPLOAD_READ_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upload failure with enough context to diagnose the remote interaction.
#[derive(Debug)]
pub enum UploadError {
    /// Local file read or HTTP transport failure.
    Transport(String),
    /// The host answered, but not with the expected success/files shape.
    /// Carries the raw response body.
    UnexpectedResponse(String),
}

impl fmt::Display for UploadError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(formatter, "upload transport failed: {message}"),
            Self::UnexpectedResponse(body) => {
                write!(formatter, "unexpected upload response: {body}")
            }
        }
    }
}

/// Seam for the artwork host so the resolver can be exercised without
/// network access.
pub trait ArtHost {
    /// Uploads a local file and returns its durable public URL.
    fn upload(&self, path: &Path) -> Result<String, UploadError>;
}

/// `ArtHost` backed by uguu.se over `ureq`. Stateless aside from the agent;
/// retry policy belongs to the caller (the resolver applies none, so a
/// failed upload is retried naturally on a later poll cycle).
pub struct UguuUploader {
    http_client: ureq::Agent,
}

impl UguuUploader {
    pub fn new() -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(UPLOAD_CONNECT_TIMEOUT)
            .timeout_read(UPLOAD_READ_TIMEOUT)
            .build();
        Self { http_client }
    }
}

impl Default for UguuUploader {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtHost for UguuUploader {
    fn upload(&self, path: &Path) -> Result<String, UploadError> {
        let file_bytes = fs::read(path)
            .map_err(|err| UploadError::Transport(format!("read {}: {err}", path.display())))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("artwork");
        let boundary = make_boundary();
        let body = build_multipart_body(&boundary, file_name, &file_bytes);

        let response = self
            .http_client
            .post(UPLOAD_URL)
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .send_bytes(&body)
            .map_err(|err| UploadError::Transport(err.to_string()))?;
        let payload: Value = response
            .into_json()
            .map_err(|err| UploadError::Transport(format!("response parse failed: {err}")))?;
        parse_upload_response(&payload)
    }
}

/// Extracts the first file URL from an upload response, rejecting any
/// payload without the success flag and files array.
fn parse_upload_response(payload: &Value) -> Result<String, UploadError> {
    let succeeded = payload
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let url = payload
        .get("files")
        .and_then(Value::as_array)
        .and_then(|files| files.first())
        .and_then(|file| file.get("url"))
        .and_then(Value::as_str);
    match (succeeded, url) {
        (true, Some(url)) => Ok(url.to_string()),
        _ => Err(UploadError::UnexpectedResponse(payload.to_string())),
    }
}

fn make_boundary() -> String {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos())
        .unwrap_or(0);
    format!("----vlcord{nonce:032x}")
}

fn build_multipart_body(boundary: &str, file_name: &str, file_bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(file_bytes.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"files[]\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(file_bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::{build_multipart_body, parse_upload_response, UploadError};
    use serde_json::json;

    #[test]
    fn test_parse_accepts_success_with_files() {
        let payload = json!({
            "success": true,
            "files": [{"url": "https://a.uguu.se/abc.jpg", "name": "abc.jpg"}]
        });
        let url = parse_upload_response(&payload).expect("should parse");
        assert_eq!(url, "https://a.uguu.se/abc.jpg");
    }

    #[test]
    fn test_parse_rejects_missing_success_flag() {
        let payload = json!({"files": [{"url": "https://a.uguu.se/abc.jpg"}]});
        match parse_upload_response(&payload) {
            Err(UploadError::UnexpectedResponse(body)) => {
                assert!(body.contains("abc.jpg"), "raw body kept for diagnostics")
            }
            other => panic!("expected UnexpectedResponse, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_empty_files_array() {
        let payload = json!({"success": true, "files": []});
        assert!(parse_upload_response(&payload).is_err());
    }

    #[test]
    fn test_multipart_body_wraps_file_in_single_part() {
        let body = build_multipart_body("----b0", "cover.png", b"PNGDATA");
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with("------b0\r\n"));
        assert!(text.contains("name=\"files[]\"; filename=\"cover.png\""));
        assert!(text.contains("PNGDATA"));
        assert!(text.ends_with("\r\n------b0--\r\n"));
    }
}
