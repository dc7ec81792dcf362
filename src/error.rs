// ABOUTME: Error types for the gateway
// ABOUTME: Maps each error kind to an HTTP status for the top-level handler

use fastly::http::StatusCode;
use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, GatewayError>;

/// All failure modes surfaced by request handlers
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A required query parameter was absent
    #[error("Error: missing {0} parameter")]
    MissingParameter(&'static str),

    /// Malformed request input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No usable credentials on the request
    #[error("{0}")]
    AuthRequired(String),

    /// No route matched
    #[error("{0}")]
    NotFound(String),

    /// A metadata or video-info call failed or reported a non-ok status
    #[error("Error: {0}")]
    Upstream(String),

    /// The token endpoint rejected a refresh attempt
    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    /// Configuration or serialization failure inside the gateway
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::AuthRequired(_) => StatusCode::UNAUTHORIZED,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Upstream(_) => StatusCode::BAD_REQUEST,
            GatewayError::TokenRefresh(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GatewayError::MissingParameter("file_id").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::Upstream("failed to get video info".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::AuthRequired("Authorization failed".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::TokenRefresh("invalid_grant".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_missing_parameter_message() {
        let e = GatewayError::MissingParameter("file_id");
        assert_eq!(e.to_string(), "Error: missing file_id parameter");
    }
}
