// ABOUTME: Static gateway configuration loaded from Fastly config and secret stores
// ABOUTME: Collected once per request into an immutable AppConfig passed to handlers

use crate::error::{GatewayError, Result};

/// Config store name (must match fastly.toml)
const CONFIG_STORE: &str = "gateway_config";

/// Secret store name (must match fastly.toml)
const SECRET_STORE: &str = "gateway_secrets";

/// Immutable per-process configuration. Never read from request input.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Google OAuth client ID
    pub client_id: String,
    /// Google OAuth client secret
    pub client_secret: String,
    /// Registered redirect URI for the authorization-code flow
    pub redirect_uri: String,
    /// Long-lived refresh token for server-side refresh
    pub refresh_token: String,
    /// Public base URL of this service, used to build redemption links
    pub public_base_url: String,
}

impl AppConfig {
    /// Load configuration from the Fastly config and secret stores
    pub fn load() -> Result<AppConfig> {
        Ok(AppConfig {
            client_id: require_config("client_id")?,
            client_secret: require_secret("client_secret")?,
            redirect_uri: require_config("redirect_uri")?,
            refresh_token: require_secret("refresh_token")?,
            public_base_url: require_config("public_base_url")
                .map(|u| u.trim_end_matches('/').to_string())?,
        })
    }
}

/// Get a value from the config store
fn get_config(key: &str) -> Option<String> {
    fastly::config_store::ConfigStore::open(CONFIG_STORE).get(key)
}

/// Get a value from the secret store
fn get_secret(key: &str) -> Option<String> {
    fastly::secret_store::SecretStore::open(SECRET_STORE)
        .ok()
        .and_then(|store| store.get(key))
        .map(|secret| {
            String::from_utf8(secret.plaintext().to_vec())
                .unwrap_or_default()
                .trim()
                .to_string()
        })
        .filter(|s| !s.is_empty())
}

fn require_config(key: &str) -> Result<String> {
    get_config(key).ok_or_else(|| GatewayError::Internal(format!("'{}' not configured", key)))
}

fn require_secret(key: &str) -> Result<String> {
    get_secret(key).ok_or_else(|| GatewayError::Internal(format!("'{}' not configured", key)))
}
