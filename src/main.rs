// ABOUTME: Main entry point for the Drive download gateway
// ABOUTME: Routes requests to the OAuth callback, video listing, and download handlers

mod config;
mod drive;
mod error;
mod oauth;
mod render;
mod session;
mod streams;
mod video;

use crate::config::AppConfig;
use crate::error::{GatewayError, Result};
use fastly::http::{header, Method, StatusCode};
use fastly::{Error, Request, Response};

/// Entry point
#[fastly::main]
fn main(req: Request) -> std::result::Result<Response, Error> {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => return Ok(error_response(&e)),
    };
    match handle_request(req, &config) {
        Ok(resp) => Ok(resp),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Route and handle the request
fn handle_request(req: Request, config: &AppConfig) -> Result<Response> {
    let method = req.get_method().clone();
    let path = req.get_url().path().to_string();

    eprintln!("[ROUTE] method={} path={}", method, path);

    match (method, path.as_str()) {
        // OAuth callback is reachable without credentials
        (Method::GET, p) if p.starts_with("/oauth2/callback") => handle_callback(req, config),

        // A file_id on the root path selects the video-listing variant,
        // which has its own refresh-based auth fallback
        (Method::GET, "/") if query_param(&req, "file_id").is_some() => {
            video::handle_video_listing(req, config)
        }

        // Everything else requires a resolved access token; absent
        // credentials redirect to the authorization endpoint
        (Method::GET, p) => {
            let access_token = match oauth::access_token_from_request(&req) {
                Some(token) => token,
                None => return Ok(authorize_redirect(config)),
            };

            if p == "/" {
                return handle_site_info();
            }
            if p.to_lowercase().starts_with("/api/v1/download") {
                return handle_download(&req, config, &access_token);
            }
            Err(GatewayError::NotFound("Not Found".into()))
        }

        _ => Err(GatewayError::NotFound("Not Found".into())),
    }
}

/// GET /oauth2/callback?code=... - Exchange the authorization code for a grant
fn handle_callback(req: Request, config: &AppConfig) -> Result<Response> {
    let code = query_param(&req, "code")
        .ok_or_else(|| GatewayError::AuthRequired("Authorization failed".into()))?;

    let grant = oauth::exchange_code(config, &code)?;
    eprintln!("[AUTH] Code exchange succeeded, expires in {}s", grant.expires_in);

    let mut resp = render::json_response(StatusCode::OK, &grant)?;
    resp.set_header(
        "Set-Cookie",
        oauth::auth_cookie("access_token", &grant.access_token, grant.expires_in),
    );
    if let Some(ref refresh_token) = grant.refresh_token {
        resp.append_header(
            "Set-Cookie",
            oauth::auth_cookie("refresh_token", refresh_token, oauth::REFRESH_COOKIE_MAX_AGE),
        );
    }
    Ok(resp)
}

/// GET / - Route hints for authenticated callers
fn handle_site_info() -> Result<Response> {
    let body = serde_json::json!({
        "message": "You are logged in! Here are some available api routes",
        "download": "/api/v1/download?fileId=xxx"
    });
    render::json_response(StatusCode::OK, &body)
}

/// GET /api/v1/download?fileId=... - Proxy the raw file bytes
fn handle_download(req: &Request, config: &AppConfig, access_token: &str) -> Result<Response> {
    let file_id =
        query_param(req, "fileId").ok_or(GatewayError::MissingParameter("fileId"))?;
    drive::download_file(config, access_token, &file_id)
}

/// 302 to the OAuth authorization endpoint
fn authorize_redirect(config: &AppConfig) -> Response {
    let mut resp = Response::from_status(StatusCode::FOUND);
    resp.set_header(header::LOCATION, oauth::authorization_url(config));
    resp
}

/// Read a single query parameter off the request URL
fn query_param(req: &Request, name: &str) -> Option<String> {
    req.get_url()
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.to_string())
}

/// Convert an error to an HTTP response
fn error_response(e: &GatewayError) -> Response {
    let status = e.status();
    if status.is_server_error() {
        eprintln!("[ERROR] {}", e);
    }
    let mut resp = Response::from_status(status);
    resp.set_header(header::CONTENT_TYPE, "text/plain; charset=utf-8");
    resp.set_body(e.to_string());
    resp
}
