// ── Core error types ──
//
// User-facing errors from utec-core. Consumers never match on HTTP
// statuses or JSON failures directly; `From<utec_api::Error>` folds
// transport-layer errors into these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Token refresh failed: {reason}")]
    RefreshFailed { reason: String },

    // ── Connectivity ─────────────────────────────────────────────────
    #[error("Cannot reach the U-tec cloud: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Polling ──────────────────────────────────────────────────────
    #[error("Device update failed: {message}")]
    UpdateFailed { message: String },

    // ── Data / commands ──────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("{command} command rejected for device {device_id}")]
    CommandFailed { command: String, device_id: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` for failures that better credentials would fix.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed { .. } | Self::RefreshFailed { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<utec_api::Error> for CoreError {
    fn from(err: utec_api::Error) -> Self {
        use utec_api::Error as E;

        match err {
            E::NoCredentials => CoreError::AuthenticationFailed {
                message: "no access token or refresh token configured".into(),
            },
            E::AuthFailed { status, body } => CoreError::AuthenticationFailed {
                message: format!("token rejected (HTTP {status}): {body}"),
            },
            E::RefreshFailed { reason } => CoreError::RefreshFailed { reason },
            E::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() || e.is_request() {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            E::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            E::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            E::HttpClient(message) => CoreError::Internal(message),
            E::Api {
                status: 401,
                namespace,
                name,
                ..
            } => CoreError::AuthenticationFailed {
                message: format!("{namespace}/{name} rejected the access token"),
            },
            E::Api {
                namespace,
                name,
                status,
                body,
            } => CoreError::Api {
                message: format!("{namespace}/{name}: {body}"),
                status: Some(status),
            },
            E::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
