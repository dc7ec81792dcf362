// ABOUTME: Stateless session record and opaque token codec
// ABOUTME: Serializes credentials plus a target URL into a URL-safe token for one-shot redemption

use crate::config::AppConfig;
use crate::error::{GatewayError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Everything needed to perform one authenticated fetch against the Drive API
/// without re-deriving credentials. Constructed fresh per request, encoded to
/// an opaque token, and never mutated after encoding. The token is only
/// opaque-encoded, not encrypted: anyone holding it can decode the embedded
/// credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Expiry of the embedded access token as epoch seconds, or empty when unknown
    pub token_expiry: String,
    /// Final resource URL to fetch when the session is redeemed
    pub url: String,
    /// Upstream cookie required by transcoded stream URLs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
    /// Set when `url` points at a transcoded stream rather than the raw file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcoded: Option<bool>,
}

impl Session {
    /// Base session carrying only credentials; `url` is filled in by the caller
    pub fn from_credentials(config: &AppConfig, access_token: &str) -> Session {
        Session {
            access_token: access_token.to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            token_expiry: String::new(),
            url: String::new(),
            cookie: None,
            transcoded: None,
        }
    }
}

/// Encode a session as an opaque URL-safe token.
/// The output alphabet is `[A-Za-z0-9_-]`, so the token needs no further
/// escaping as a query-parameter value.
pub fn encode(session: &Session) -> Result<String> {
    let json = serde_json::to_string(session)
        .map_err(|e| GatewayError::Internal(format!("Failed to serialize session: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(json.as_bytes()))
}

/// Decode a token produced by `encode`. The redemption endpoint consumes
/// decoded sessions; the codec lives here so encode and decode stay inverse.
pub fn decode(token: &str) -> Result<Session> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.as_bytes())
        .map_err(|e| GatewayError::BadRequest(format!("Invalid session token: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| GatewayError::BadRequest(format!("Invalid session payload: {}", e)))
}

/// Redemption URL handed back to the caller for a given encoded session
pub fn redemption_url(config: &AppConfig, token: &str) -> String {
    format!("{}/api/v1/download?session={}", config.public_base_url, token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Session {
        Session {
            access_token: "ya29.token".into(),
            client_id: "client".into(),
            client_secret: "secret".into(),
            refresh_token: "1//refresh".into(),
            token_expiry: "1700000000".into(),
            url: "https://www.googleapis.com/drive/v3/files/abc?alt=media".into(),
            cookie: None,
            transcoded: None,
        }
    }

    #[test]
    fn test_round_trip() {
        let session = sample();
        let token = encode(&session).unwrap();
        assert_eq!(decode(&token).unwrap(), session);
    }

    #[test]
    fn test_round_trip_with_optional_fields() {
        let mut session = sample();
        session.cookie = Some("DRIVE_STREAM=abc; NID=x".into());
        session.transcoded = Some(true);
        let token = encode(&session).unwrap();
        assert_eq!(decode(&token).unwrap(), session);
    }

    #[test]
    fn test_token_is_url_safe() {
        let mut session = sample();
        // Force bytes that standard base64 would encode as '+' and '/'
        session.url = "https://r3---sn.example/videoplayback?expire=~~~&sig=>>>???".into();
        session.cookie = Some("a=\u{00ff}\u{00fe}".into());
        let token = encode(&session).unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not!!valid!!base64").is_err());
        // Valid base64 but not a session record
        let token = URL_SAFE_NO_PAD.encode(b"[1,2,3]");
        assert!(decode(&token).is_err());
    }

    #[test]
    fn test_optional_fields_omitted_from_payload() {
        let token = encode(&sample()).unwrap();
        let json = String::from_utf8(URL_SAFE_NO_PAD.decode(token).unwrap()).unwrap();
        assert!(!json.contains("cookie"));
        assert!(!json.contains("transcoded"));
    }
}
