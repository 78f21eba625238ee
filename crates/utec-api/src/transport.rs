// Shared transport configuration for building reqwest::Client instances.
//
// Endpoint URLs live here alongside the timeout so tests and staging
// deployments can point the client at a different host.

use std::time::Duration;

use url::Url;

use crate::error::Error;

pub const DEFAULT_API_BASE: &str = "https://api.u-tec.com";
pub const DEFAULT_OAUTH_BASE: &str = "https://oauth.u-tec.com";

const USER_AGENT: &str = concat!("utec/", env!("CARGO_PKG_VERSION"));

/// The three URLs the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// `POST` target for every enveloped action.
    pub action: Url,
    /// OAuth token endpoint (form-encoded grants).
    pub token: Url,
    /// Browser authorize endpoint for the authorization-code flow.
    pub authorize: Url,
}

impl Endpoints {
    /// Derive all endpoints from an API host and an OAuth host.
    ///
    /// `https://api.u-tec.com` becomes `https://api.u-tec.com/action`;
    /// `https://oauth.u-tec.com` yields `/token` and `/authorize`.
    pub fn from_bases(api_base: &str, oauth_base: &str) -> Result<Self, Error> {
        let api = normalize_base(api_base)?;
        let oauth = normalize_base(oauth_base)?;
        Ok(Self {
            action: api.join("action")?,
            token: oauth.join("token")?,
            authorize: oauth.join("authorize")?,
        })
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        // Both constants are valid absolute URLs.
        #[allow(clippy::unwrap_used)]
        Self::from_bases(DEFAULT_API_BASE, DEFAULT_OAUTH_BASE).unwrap()
    }
}

/// Ensure the base URL ends with `/` so `join` appends instead of replacing.
fn normalize_base(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    let path = url.path().trim_end_matches('/').to_owned();
    url.set_path(&format!("{path}/"));
    Ok(url)
}

/// Shared transport configuration for building the HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub endpoints: Endpoints,
    /// Per-call timeout. A poll cycle's calls each get this budget.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::HttpClient(format!("failed to build HTTP client: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoints_point_at_vendor_hosts() {
        let ep = Endpoints::default();
        assert_eq!(ep.action.as_str(), "https://api.u-tec.com/action");
        assert_eq!(ep.token.as_str(), "https://oauth.u-tec.com/token");
        assert_eq!(ep.authorize.as_str(), "https://oauth.u-tec.com/authorize");
    }

    #[test]
    fn bases_with_paths_keep_their_prefix() {
        let ep = Endpoints::from_bases("http://127.0.0.1:9000/mock/", "http://127.0.0.1:9001")
            .unwrap();
        assert_eq!(ep.action.as_str(), "http://127.0.0.1:9000/mock/action");
        assert_eq!(ep.token.as_str(), "http://127.0.0.1:9001/token");
    }

    #[test]
    fn invalid_base_is_rejected() {
        assert!(matches!(
            Endpoints::from_bases("not a url", DEFAULT_OAUTH_BASE),
            Err(Error::InvalidUrl(_))
        ));
    }
}
