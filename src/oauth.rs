// ABOUTME: OAuth token service and per-request credential resolution
// ABOUTME: Exchanges authorization codes and refresh tokens against Google's token endpoint

use crate::config::AppConfig;
use crate::error::{GatewayError, Result};
use fastly::http::{header, Method};
use fastly::Request;
use serde::{Deserialize, Serialize};

/// Google OAuth authorization endpoint
const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth token endpoint
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Drive scope requested during authorization
const SCOPES: &str = "https://www.googleapis.com/auth/drive";

/// Backend name for the token endpoint (must match fastly.toml)
const OAUTH_BACKEND: &str = "google_oauth";

/// Refresh-token cookie lifetime: 60 days
pub const REFRESH_COOKIE_MAX_AGE: u64 = 60 * 24 * 60 * 60;

/// Access/refresh token pair returned by a token exchange.
/// Not cached anywhere server-side; callers store it in cookies or embed it
/// inside a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Exchange an authorization code for a token grant
pub fn exchange_code(config: &AppConfig, code: &str) -> Result<TokenGrant> {
    let body = form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", "authorization_code")
        .append_pair("client_id", &config.client_id)
        .append_pair("client_secret", &config.client_secret)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("code", code)
        .finish();

    let mut resp = token_request(body)?;
    let resp_body = resp.take_body().into_string();

    if !resp.get_status().is_success() {
        let code = provider_error(&resp_body);
        eprintln!("[AUTH] Code exchange rejected: {}", code);
        return Err(GatewayError::AuthRequired(format!(
            "Code exchange failed: {}",
            code
        )));
    }

    let grant: TokenGrant = serde_json::from_str(&resp_body)
        .map_err(|_| GatewayError::AuthRequired("No access token in response".into()))?;
    Ok(grant)
}

/// Refresh an access token using the configured long-lived refresh token.
/// Does not retry on failure.
pub fn refresh(config: &AppConfig) -> Result<TokenGrant> {
    let body = form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", "refresh_token")
        .append_pair("client_id", &config.client_id)
        .append_pair("client_secret", &config.client_secret)
        .append_pair("refresh_token", &config.refresh_token)
        .finish();

    let mut resp = token_request(body)?;
    let resp_body = resp.take_body().into_string();

    if !resp.get_status().is_success() {
        let code = provider_error(&resp_body);
        eprintln!("[AUTH] Token refresh rejected: {}", code);
        return Err(GatewayError::TokenRefresh(code));
    }

    let grant: TokenGrant = serde_json::from_str(&resp_body)
        .map_err(|_| GatewayError::TokenRefresh("no access token in response".into()))?;
    eprintln!("[AUTH] Access token refreshed, expires in {}s", grant.expires_in);
    Ok(grant)
}

/// POST a form-encoded body to the token endpoint
fn token_request(body: String) -> Result<fastly::Response> {
    let mut req = Request::new(Method::POST, TOKEN_ENDPOINT);
    req.set_header("Host", "oauth2.googleapis.com");
    req.set_header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    req.set_body(body);
    req.send(OAUTH_BACKEND)
        .map_err(|e| GatewayError::Internal(format!("Token endpoint unreachable: {}", e)))
}

/// Extract the provider's `error` code from a token-endpoint error body
fn provider_error(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"].as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown".into())
}

/// Authorization URL users are redirected to when unauthenticated
pub fn authorization_url(config: &AppConfig) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", SCOPES)
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent")
        .finish();
    format!("{}?{}", AUTHORIZATION_ENDPOINT, query)
}

/// Resolve the active access token for a request, checking in order:
/// the `access_token` query parameter, a Bearer `Authorization` header,
/// then an `access_token` cookie.
pub fn access_token_from_request(req: &Request) -> Option<String> {
    let query_token = req
        .get_url()
        .query_pairs()
        .find(|(k, _)| k == "access_token")
        .map(|(_, v)| v.to_string());

    resolve_access_token(
        query_token.as_deref(),
        req.get_header(header::AUTHORIZATION).and_then(|h| h.to_str().ok()),
        req.get_header(header::COOKIE).and_then(|h| h.to_str().ok()),
    )
}

/// Pure resolution over the three raw request inputs
pub fn resolve_access_token(
    query_token: Option<&str>,
    authorization: Option<&str>,
    cookie_header: Option<&str>,
) -> Option<String> {
    if let Some(token) = query_token {
        return Some(token.to_string());
    }
    if let Some(token) = authorization.and_then(bearer_token) {
        return Some(token.to_string());
    }
    cookie_header.and_then(|cookies| cookie_value(cookies, "access_token"))
}

/// Token part of a `Bearer` Authorization header
fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ")
}

/// Value of a named cookie in a `Cookie` header
pub fn cookie_value(cookie_header: &str, name: &str) -> Option<String> {
    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if let Some(value) = cookie.strip_prefix(name) {
            if let Some(value) = value.strip_prefix('=') {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Build a Set-Cookie value for auth cookies
pub fn auth_cookie(name: &str, value: &str, max_age: u64) -> String {
    format!(
        "{}={}; Secure; HttpOnly; SameSite=None; Max-Age={}; Path=/",
        name, value, max_age
    )
}
