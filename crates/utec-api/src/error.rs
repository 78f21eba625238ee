use thiserror::Error;

/// Top-level error type for the `utec-api` crate.
///
/// Covers every failure mode of the cloud API surface: token acquisition,
/// transport, and the action endpoint envelope. `utec-core` maps these into
/// user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Neither an access token nor a refresh token is available.
    #[error("No access token or refresh token available")]
    NoCredentials,

    /// The access token was rejected by the validation probe.
    #[error("Authentication failed (HTTP {status}): {body}")]
    AuthFailed { status: u16, body: String },

    /// The token endpoint rejected a grant or returned a malformed response.
    #[error("Token refresh failed: {reason}")]
    RefreshFailed { reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    // ── Action API ──────────────────────────────────────────────────
    /// Non-200 response from the action endpoint.
    #[error("{namespace}/{name} failed (HTTP {status}): {body}")]
    Api {
        namespace: String,
        name: String,
        status: u16,
        body: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthFailed { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if the server rejected the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Returns `true` if this error concerns credentials rather than transport.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::NoCredentials | Self::AuthFailed { .. } | Self::RefreshFailed { .. }
        ) || self.is_unauthorized()
    }

    /// Returns `true` if this is a transient error worth retrying on the next poll.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Truncated body preview for log lines.
    pub(crate) fn preview(body: &str) -> &str {
        let end = body
            .char_indices()
            .nth(200)
            .map_or(body.len(), |(idx, _)| idx);
        &body[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_detection_uses_status() {
        let err = Error::Api {
            namespace: "Uhome.Device".into(),
            name: "List".into(),
            status: 401,
            body: String::new(),
        };
        assert!(err.is_unauthorized());
        assert!(err.is_auth_error());
        assert!(!err.is_transient());
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Api {
            namespace: "Uhome.Device".into(),
            name: "Status".into(),
            status: 503,
            body: "busy".into(),
        };
        assert!(err.is_transient());
        assert!(Error::Timeout { timeout_secs: 10 }.is_transient());
        assert!(!Error::NoCredentials.is_transient());
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let body = "é".repeat(300);
        assert_eq!(Error::preview(&body).chars().count(), 200);
        assert_eq!(Error::preview("short"), "short");
    }
}
