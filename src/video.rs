// ABOUTME: Video listing handler (itag variant)
// ABOUTME: Resolves a file into an HTML page of direct plus per-format download links

use crate::config::AppConfig;
use crate::drive;
use crate::error::{GatewayError, Result};
use crate::oauth;
use crate::render;
use crate::session::Session;
use crate::streams;
use fastly::{Request, Response};
use std::collections::HashMap;

/// Fallback cookie lifetime when the active token's expiry is unknown
const DEFAULT_COOKIE_MAX_AGE: u64 = 3600;

/// GET /?file_id=... - List download links for a file.
///
/// Auth policy for this variant: use a token resolved from the request when
/// one is present; otherwise refresh unconditionally with the configured
/// refresh token. This differs from the main-site routes, which redirect to
/// the authorization endpoint instead.
pub fn handle_video_listing(req: Request, config: &AppConfig) -> Result<Response> {
    let file_id = crate::query_param(&req, "file_id")
        .filter(|v| !v.is_empty())
        .ok_or(GatewayError::MissingParameter("file_id"))?;

    let (access_token, cookie_max_age) = match oauth::access_token_from_request(&req) {
        Some(token) => (token, DEFAULT_COOKIE_MAX_AGE),
        None => {
            let grant = oauth::refresh(config)?;
            (grant.access_token, grant.expires_in)
        }
    };

    let direct = drive::direct_download(config, &access_token, &file_id)?
        .ok_or_else(|| GatewayError::Upstream("failed to fetch file metadata".into()))?;

    let formats = if drive::is_video_file(&access_token, &file_id) {
        let (body, set_cookie) = streams::fetch_video_info(&access_token, &file_id)?;
        let base = Session::from_credentials(config, &access_token);
        streams::transcoded_download_urls(config, &base, &body, set_cookie.as_deref())?
    } else {
        HashMap::new()
    };

    eprintln!(
        "[VIDEO] listing for {}: {} transcoded format(s)",
        file_id,
        formats.len()
    );

    let page = render::download_page(&direct.title, &direct.download_url, &formats);
    let mut resp = render::html_response(page);
    resp.set_header(
        "Set-Cookie",
        oauth::auth_cookie("access_token", &access_token, cookie_max_age),
    );
    Ok(resp)
}
