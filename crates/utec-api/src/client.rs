// Action endpoint HTTP client
//
// Wraps `reqwest::Client` with envelope construction, bearer injection from
// the shared credentials, and the one-shot refresh-and-retry on HTTP 401.
// Grant handling (oauth.rs), device reads (devices.rs) and lock commands
// (lock.rs) are inherent methods in their own files.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth::Credentials;
use crate::envelope::{Action, Envelope, ResponseEnvelope};
use crate::error::Error;
use crate::transport::{Endpoints, TransportConfig};

/// Client for one U-tec account.
///
/// Every call goes to the single action endpoint wrapped in a
/// `{header, payload}` envelope; the response's `payload` is returned
/// unwrapped. Token state lives in the shared [`Credentials`].
pub struct UhomeClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    credentials: Arc<Credentials>,
    /// Serializes every token write (refresh and the other grants).
    pub(crate) refresh_lock: Mutex<()>,
    timeout: Duration,
}

impl UhomeClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(credentials: Arc<Credentials>, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            endpoints: transport.endpoints.clone(),
            credentials,
            refresh_lock: Mutex::new(()),
            timeout: transport.timeout,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// The timeout reported in [`Error::Timeout`] is whatever the caller
    /// configured on `http`; pass it here so the error is accurate.
    pub fn with_client(
        http: reqwest::Client,
        endpoints: Endpoints,
        credentials: Arc<Credentials>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            endpoints,
            credentials,
            refresh_lock: Mutex::new(()),
            timeout,
        }
    }

    pub fn credentials(&self) -> &Arc<Credentials> {
        &self.credentials
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Invoke `action` with `payload` and return the response payload.
    ///
    /// Acquires a token first if only a refresh token is held. On HTTP 401
    /// the token is refreshed once and the call is retried once under a new
    /// message id.
    pub async fn request(&self, action: Action, payload: Value) -> Result<Value, Error> {
        let body = self.request_body(action, &payload).await?;
        unwrap_payload(body)
    }

    /// Like [`request`](Self::request), but success is HTTP 200 alone and
    /// the reply body is never parsed.
    pub async fn request_status(&self, action: Action, payload: Value) -> Result<(), Error> {
        self.request_body(action, &payload).await.map(drop)
    }

    async fn request_body(&self, action: Action, payload: &Value) -> Result<String, Error> {
        if !self.credentials.has_access_token() {
            if !self.credentials.has_refresh_token() {
                return Err(Error::NoCredentials);
            }
            self.refresh_access_token().await?;
        }

        let seen = self.credentials.generation();
        match self.send_raw(action, payload).await {
            Err(e) if e.is_unauthorized() && self.credentials.has_refresh_token() => {
                debug!(action = %action, "token rejected, refreshing and retrying once");
                self.refresh_since(seen).await?;
                self.send_raw(action, payload).await
            }
            other => other,
        }
    }

    /// Single POST to the action endpoint, returning the unwrapped payload.
    /// Never retries.
    pub(crate) async fn send_envelope(&self, action: Action, payload: &Value) -> Result<Value, Error> {
        let body = self.send_raw(action, payload).await?;
        unwrap_payload(body)
    }

    /// Single POST to the action endpoint. Non-200 statuses become `Api`;
    /// on 200 the raw body is returned as-is.
    pub(crate) async fn send_raw(&self, action: Action, payload: &Value) -> Result<String, Error> {
        let envelope = Envelope::new(action, payload);
        debug!(action = %action, message_id = envelope.message_id(), "POST {}", self.endpoints.action);

        let mut builder = self.http.post(self.endpoints.action.clone()).json(&envelope);
        if let Some(token) = self.credentials.access_token() {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let resp = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;

        if status != StatusCode::OK {
            warn!(
                action = %action,
                status = status.as_u16(),
                body = Error::preview(&body),
                "action request failed"
            );
            return Err(Error::Api {
                namespace: action.namespace.to_owned(),
                name: action.name.to_owned(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    pub(crate) fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(e)
        }
    }
}

/// Parse a 200 reply as a response envelope. A null or missing payload
/// becomes an empty object.
fn unwrap_payload(body: String) -> Result<Value, Error> {
    let envelope: ResponseEnvelope = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return Err(Error::Deserialization {
                message: e.to_string(),
                body,
            });
        }
    };

    Ok(match envelope.payload {
        Value::Null => Value::Object(Map::new()),
        payload => payload,
    })
}
