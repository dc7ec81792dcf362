// ABOUTME: Legacy video-info stream descriptor parsing
// ABOUTME: Maps itag format codes to resolutions and builds per-format download sessions

use crate::config::AppConfig;
use crate::error::{GatewayError, Result};
use crate::session::{self, Session};
use fastly::http::Method;
use fastly::Request;
use serde::Serialize;
use std::collections::HashMap;

/// Backend name for drive.google.com (must match fastly.toml)
const VIDEO_INFO_BACKEND: &str = "drive_web";

/// Resolution label for format codes absent from the table
const UNKNOWN_RESOLUTION: &str = "Unknown";

/// Legacy itag format code to human resolution label
pub const ITAG_RESOLUTIONS: &[(&str, &str)] = &[
    ("5", "240"),
    ("6", "270"),
    ("17", "144"),
    ("18", "360"),
    ("22", "720"),
    ("34", "360"),
    ("35", "480"),
    ("36", "240"),
    ("37", "1080"),
    ("38", "3072"),
    ("43", "360"),
    ("44", "480"),
    ("45", "720"),
    ("46", "1080"),
    ("82", "360 [3D]"),
    ("83", "480 [3D]"),
    ("84", "720 [3D]"),
    ("85", "1080p [3D]"),
    ("100", "360 [3D]"),
    ("101", "480 [3D]"),
    ("102", "720 [3D]"),
    ("92", "240"),
    ("93", "360"),
    ("94", "480"),
    ("95", "720"),
    ("96", "1080"),
    ("132", "240"),
    ("151", "72"),
    ("133", "240"),
    ("134", "360"),
    ("135", "480"),
    ("136", "720"),
    ("137", "1080"),
    ("138", "2160"),
    ("160", "144"),
    ("264", "1440"),
    ("298", "720"),
    ("299", "1080"),
    ("266", "2160"),
    ("167", "360"),
    ("168", "480"),
    ("169", "720"),
    ("170", "1080"),
    ("218", "480"),
    ("219", "480"),
    ("242", "240"),
    ("243", "360"),
    ("244", "480"),
    ("245", "480"),
    ("246", "480"),
    ("247", "720"),
    ("248", "1080"),
    ("271", "1440"),
    ("272", "2160"),
    ("302", "2160"),
    ("303", "1080"),
    ("308", "1440"),
    ("313", "2160"),
    ("315", "2160"),
    ("59", "480"),
];

/// Resolution label for an itag code, `"Unknown"` when unmapped
pub fn resolution_for(itag: &str) -> &'static str {
    ITAG_RESOLUTIONS
        .iter()
        .find(|(code, _)| *code == itag)
        .map(|(_, resolution)| *resolution)
        .unwrap_or(UNKNOWN_RESOLUTION)
}

/// One stream candidate parsed out of the legacy descriptor lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    pub itag: String,
    pub url: String,
    pub signature: Option<String>,
}

/// One resolved download candidate in the listing
#[derive(Debug, Clone, Serialize)]
pub struct StreamFormat {
    /// Redemption URL carrying an encoded session for this stream
    pub url: String,
    pub resolution: String,
    pub transcoded: bool,
}

/// Read a single field out of a form-encoded video-info body (percent-decoded)
pub fn video_info_field(body: &str, key: &str) -> Option<String> {
    form_urlencoded::parse(body.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.to_string())
}

/// Parse the stream descriptor lists of a video-info body.
/// `url_encoded_fmt_stream_map` and `adaptive_fmts` are concatenated in that
/// order; either may be absent.
pub fn parse_stream_entries(body: &str) -> Vec<StreamEntry> {
    let mut raw = Vec::new();
    for key in ["url_encoded_fmt_stream_map", "adaptive_fmts"] {
        if let Some(list) = video_info_field(body, key) {
            raw.extend(list.split(',').map(|s| s.to_string()));
        }
    }
    raw.iter().filter_map(|entry| parse_entry(entry)).collect()
}

/// Parse one comma-separated descriptor: a query-string record with `itag`,
/// `url`, and a signature under `s` or `sig` (`s` preferred, first occurrence
/// of each key wins). Entries missing `itag` or `url` are dropped.
fn parse_entry(entry: &str) -> Option<StreamEntry> {
    let mut itag = None;
    let mut url = None;
    let mut s = None;
    let mut sig = None;

    for (key, value) in form_urlencoded::parse(entry.as_bytes()) {
        let slot = match key.as_ref() {
            "itag" => &mut itag,
            "url" => &mut url,
            "s" => &mut s,
            "sig" => &mut sig,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }

    Some(StreamEntry {
        itag: itag?,
        url: url?,
        signature: s.or(sig),
    })
}

/// Build the itag-keyed download mapping for a video-info response.
/// Each entry gets a session cloned from `base` with the stream URL, the
/// response's Set-Cookie value, and the transcoded flag; later entries with a
/// repeated itag overwrite earlier ones.
pub fn transcoded_download_urls(
    config: &AppConfig,
    base: &Session,
    body: &str,
    set_cookie: Option<&str>,
) -> Result<HashMap<String, StreamFormat>> {
    let mut formats = HashMap::new();

    for entry in parse_stream_entries(body) {
        let stream_url = match &entry.signature {
            Some(signature) => format!("{}&{}", entry.url, signature),
            None => entry.url.clone(),
        };

        let mut stream_session = base.clone();
        stream_session.url = stream_url;
        stream_session.cookie = set_cookie.map(|c| c.to_string());
        stream_session.transcoded = Some(true);

        let token = session::encode(&stream_session)?;
        formats.insert(
            entry.itag.clone(),
            StreamFormat {
                url: session::redemption_url(config, &token),
                resolution: resolution_for(&entry.itag).to_string(),
                transcoded: true,
            },
        );
    }

    Ok(formats)
}

/// Fetch the legacy video-info document for a file.
/// Returns the form-encoded body plus the response's Set-Cookie header;
/// a body not reporting `status=ok` fails the operation.
pub fn fetch_video_info(access_token: &str, file_id: &str) -> Result<(String, Option<String>)> {
    let url = format!("https://drive.google.com/get_video_info?docid={}", file_id);
    let mut req = Request::new(Method::GET, &url);
    req.set_header("Host", "drive.google.com");
    req.set_header("Authorization", format!("Bearer {}", access_token));

    let mut resp = req
        .send(VIDEO_INFO_BACKEND)
        .map_err(|e| GatewayError::Upstream(format!("video info fetch failed: {}", e)))?;

    let set_cookie = resp
        .get_header("set-cookie")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let body = resp.take_body().into_string();

    if video_info_field(&body, "status").as_deref() != Some("ok") {
        eprintln!("[VIDEO] video info status not ok for file {}", file_id);
        return Err(GatewayError::Upstream("failed to get video info".into()));
    }

    Ok((body, set_cookie))
}
