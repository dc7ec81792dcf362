// ABOUTME: Google Drive API client for file metadata and media download
// ABOUTME: Builds direct-download sessions and proxies file bytes with a single 401 refresh retry

use crate::config::AppConfig;
use crate::error::{GatewayError, Result};
use crate::oauth;
use crate::session::{self, Session};
use fastly::http::{header, Method, StatusCode};
use fastly::{Request, Response};
use serde::Deserialize;

/// Backend name for www.googleapis.com (must match fastly.toml)
const DRIVE_BACKEND: &str = "drive_api";

/// File name and MIME type reported by the Drive metadata endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// Direct-download listing entry: the file's title plus a redemption URL
#[derive(Debug, Clone)]
pub struct DirectDownload {
    pub title: String,
    pub download_url: String,
}

/// Media endpoint URL for a file
pub fn media_url(file_id: &str) -> String {
    format!("https://www.googleapis.com/drive/v3/files/{}?alt=media", file_id)
}

/// Does a MIME type denote a video file
pub fn is_video_mime(mime_type: &str) -> bool {
    mime_type.starts_with("video/")
}

/// Fetch a file's name and MIME type
pub fn get_file_metadata(access_token: &str, file_id: &str) -> Result<FileMetadata> {
    let url = format!(
        "https://www.googleapis.com/drive/v3/files/{}?fields=name,mimeType",
        file_id
    );
    let mut req = Request::new(Method::GET, &url);
    req.set_header("Host", "www.googleapis.com");
    req.set_header(header::AUTHORIZATION, format!("Bearer {}", access_token));

    let mut resp = req
        .send(DRIVE_BACKEND)
        .map_err(|e| GatewayError::Upstream(format!("metadata fetch failed: {}", e)))?;

    if !resp.get_status().is_success() {
        return Err(GatewayError::Upstream(format!(
            "metadata fetch returned {}",
            resp.get_status()
        )));
    }

    let body = resp.take_body().into_string();
    parse_metadata(&body)
}

/// Parse a metadata response body
fn parse_metadata(body: &str) -> Result<FileMetadata> {
    serde_json::from_str(body)
        .map_err(|e| GatewayError::Upstream(format!("invalid metadata response: {}", e)))
}

/// True only when the file's MIME type begins with `video/`.
/// Fail-closed: any fetch or parse failure reads as "not a video".
pub fn is_video_file(access_token: &str, file_id: &str) -> bool {
    let metadata = get_file_metadata(access_token, file_id);
    if let Err(ref e) = metadata {
        eprintln!("[DRIVE] video check failed for {}: {}", file_id, e);
    }
    video_verdict(metadata)
}

/// Fail-closed video determination from a metadata fetch outcome
fn video_verdict(metadata: Result<FileMetadata>) -> bool {
    match metadata {
        Ok(metadata) => is_video_mime(&metadata.mime_type),
        Err(_) => false,
    }
}

/// Validate file access and build a direct-download session.
/// An upstream failure means the file is missing or inaccessible: `Ok(None)`.
pub fn direct_download(
    config: &AppConfig,
    access_token: &str,
    file_id: &str,
) -> Result<Option<DirectDownload>> {
    let metadata = match get_file_metadata(access_token, file_id) {
        Ok(metadata) => metadata,
        Err(GatewayError::Upstream(reason)) => {
            eprintln!("[DRIVE] direct download unavailable for {}: {}", file_id, reason);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let mut download_session = Session::from_credentials(config, access_token);
    download_session.url = media_url(file_id);
    let token = session::encode(&download_session)?;

    Ok(Some(DirectDownload {
        title: metadata.name,
        download_url: session::redemption_url(config, &token),
    }))
}

/// Proxy the file's media bytes through unchanged.
/// On an upstream 401 the access token is refreshed once and the fetch
/// retried once; no further retries, and non-auth failures pass through.
pub fn download_file(config: &AppConfig, access_token: &str, file_id: &str) -> Result<Response> {
    download_with_retry(
        access_token,
        |token| media_request(token, file_id),
        || {
            let grant = oauth::refresh(config)?;
            eprintln!("[DRIVE] retrying download of {} with refreshed token", file_id);
            Ok(grant)
        },
    )
}

/// Single 401-triggered refresh-and-retry sequence: the second fetch result
/// is returned as-is, whatever its status
fn download_with_retry(
    access_token: &str,
    mut fetch: impl FnMut(&str) -> Result<Response>,
    refresh: impl FnOnce() -> Result<oauth::TokenGrant>,
) -> Result<Response> {
    let resp = fetch(access_token)?;

    if resp.get_status() != StatusCode::UNAUTHORIZED {
        return Ok(resp);
    }

    let grant = refresh()?;
    fetch(&grant.access_token)
}

/// One fetch against the media endpoint
fn media_request(access_token: &str, file_id: &str) -> Result<Response> {
    let mut req = Request::new(Method::GET, media_url(file_id));
    req.set_header("Host", "www.googleapis.com");
    req.set_header(header::AUTHORIZATION, format!("Bearer {}", access_token));
    req.send(DRIVE_BACKEND)
        .map_err(|e| GatewayError::Upstream(format!("download fetch failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_video_mime() {
        assert!(is_video_mime("video/mp4"));
        assert!(is_video_mime("video/webm"));
        assert!(!is_video_mime("image/png"));
        assert!(!is_video_mime("application/vnd.google-apps.folder"));
        assert!(!is_video_mime(""));
    }

    #[test]
    fn test_media_url() {
        assert_eq!(
            media_url("abc123"),
            "https://www.googleapis.com/drive/v3/files/abc123?alt=media"
        );
    }

    #[test]
    fn test_metadata_parses_drive_response() {
        let metadata = parse_metadata(r#"{"name":"clip.mp4","mimeType":"video/mp4"}"#).unwrap();
        assert_eq!(metadata.name, "clip.mp4");
        assert!(is_video_mime(&metadata.mime_type));
    }

    #[test]
    fn test_video_verdict_fails_closed_on_unparsable_metadata() {
        assert!(!video_verdict(parse_metadata("")));
        assert!(!video_verdict(parse_metadata("<!DOCTYPE html><html>Server Error</html>")));
        // Valid JSON but not the metadata shape
        assert!(!video_verdict(parse_metadata(r#"{"name":"clip.mp4"}"#)));
        // Fetch-level failures read the same way
        assert!(!video_verdict(Err(GatewayError::Upstream(
            "metadata fetch returned 500".into()
        ))));
    }

    #[test]
    fn test_video_verdict_on_parsed_metadata() {
        assert!(video_verdict(parse_metadata(
            r#"{"name":"clip.mp4","mimeType":"video/mp4"}"#
        )));
        assert!(!video_verdict(parse_metadata(
            r#"{"name":"doc.pdf","mimeType":"application/pdf"}"#
        )));
    }

    fn grant(token: &str) -> crate::oauth::TokenGrant {
        crate::oauth::TokenGrant {
            access_token: token.into(),
            expires_in: 3600,
            refresh_token: None,
        }
    }

    #[test]
    fn test_download_retries_once_after_401() {
        let mut fetched_with = Vec::new();
        let mut refreshes = 0;

        let resp = download_with_retry(
            "stale",
            |token| {
                fetched_with.push(token.to_string());
                let status = if token == "fresh" { StatusCode::OK } else { StatusCode::UNAUTHORIZED };
                Ok(Response::from_status(status))
            },
            || {
                refreshes += 1;
                Ok(grant("fresh"))
            },
        )
        .unwrap();

        assert_eq!(resp.get_status(), StatusCode::OK);
        assert_eq!(refreshes, 1);
        assert_eq!(fetched_with, vec!["stale".to_string(), "fresh".to_string()]);
    }

    #[test]
    fn test_download_does_not_retry_on_success() {
        let mut fetches = 0;
        let resp = download_with_retry(
            "T",
            |_| {
                fetches += 1;
                Ok(Response::from_status(StatusCode::OK))
            },
            || panic!("refresh must not be called"),
        )
        .unwrap();
        assert_eq!(resp.get_status(), StatusCode::OK);
        assert_eq!(fetches, 1);
    }

    #[test]
    fn test_second_401_passes_through_without_another_retry() {
        let mut fetches = 0;
        let mut refreshes = 0;

        let resp = download_with_retry(
            "stale",
            |_| {
                fetches += 1;
                Ok(Response::from_status(StatusCode::UNAUTHORIZED))
            },
            || {
                refreshes += 1;
                Ok(grant("still-rejected"))
            },
        )
        .unwrap();

        assert_eq!(resp.get_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(fetches, 2);
        assert_eq!(refreshes, 1);
    }

    #[test]
    fn test_refresh_failure_propagates() {
        let result = download_with_retry(
            "stale",
            |_| Ok(Response::from_status(StatusCode::UNAUTHORIZED)),
            || Err(GatewayError::TokenRefresh("invalid_grant".into())),
        );
        assert!(matches!(result, Err(GatewayError::TokenRefresh(_))));
    }

    #[test]
    fn test_non_auth_failures_are_not_retried() {
        let mut fetches = 0;
        let resp = download_with_retry(
            "T",
            |_| {
                fetches += 1;
                Ok(Response::from_status(StatusCode::NOT_FOUND))
            },
            || panic!("refresh must not be called"),
        )
        .unwrap();
        assert_eq!(resp.get_status(), StatusCode::NOT_FOUND);
        assert_eq!(fetches, 1);
    }
}
