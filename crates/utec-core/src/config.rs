// ── Runtime account configuration ──
//
// Describes how to reach one U-tec account: client credentials, the
// persisted token pair, endpoints, and polling cadence. Built by the
// CLI from its profile; core never reads config files.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use utec_api::{
    Credentials, DEFAULT_API_BASE, DEFAULT_OAUTH_BASE, Endpoints, TransportConfig, UhomeClient,
};

use crate::error::CoreError;

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a single account.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    /// Persisted access token, if any.
    pub access_token: Option<SecretString>,
    /// Persisted refresh token, if any.
    pub refresh_token: Option<SecretString>,
    /// Action API host (e.g., `https://api.u-tec.com`).
    pub api_url: String,
    /// OAuth host (e.g., `https://oauth.u-tec.com`).
    pub oauth_url: String,
    /// Interval between scheduled polls. Zero disables the poll task.
    pub scan_interval: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl AccountConfig {
    pub fn new(client_id: impl Into<String>, client_secret: SecretString) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            access_token: None,
            refresh_token: None,
            api_url: DEFAULT_API_BASE.to_owned(),
            oauth_url: DEFAULT_OAUTH_BASE.to_owned(),
            scan_interval: DEFAULT_SCAN_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Transport settings derived from the endpoint URLs and timeout.
    pub fn transport(&self) -> Result<TransportConfig, CoreError> {
        let endpoints =
            Endpoints::from_bases(&self.api_url, &self.oauth_url).map_err(|e| CoreError::Config {
                message: e.to_string(),
            })?;
        Ok(TransportConfig {
            endpoints,
            timeout: self.timeout,
        })
    }

    /// Fresh shared credentials seeded with the persisted token pair.
    pub fn credentials(&self) -> Arc<Credentials> {
        Arc::new(
            Credentials::new(self.client_id.clone(), self.client_secret.clone())
                .with_tokens(self.access_token.clone(), self.refresh_token.clone()),
        )
    }

    /// An unauthenticated client seeded with the persisted token pair.
    pub fn build_client(&self) -> Result<UhomeClient, CoreError> {
        self.build_client_with(self.credentials())
    }

    /// An unauthenticated client sharing `credentials` with the caller.
    pub fn build_client_with(&self, credentials: Arc<Credentials>) -> Result<UhomeClient, CoreError> {
        let transport = self.transport()?;
        Ok(UhomeClient::new(credentials, &transport)?)
    }
}
