// Token acquisition
//
// Validation probe, refresh, and the other grants the U-tec OAuth server
// supports. Every token write goes through `Credentials::store` while
// holding `refresh_lock`.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{OAUTH_SCOPE, TokenSet};
use crate::client::UhomeClient;
use crate::envelope::Action;
use crate::error::Error;
use crate::models::TokenResponse;

impl UhomeClient {
    /// Make sure the client holds a usable bearer token.
    ///
    /// - no tokens at all: `NoCredentials`
    /// - refresh token only: refresh, never probe
    /// - access token: probe with `Uhome.System/Check`; a 401 triggers
    ///   exactly one refresh, any other failure is `AuthFailed`
    pub async fn authenticate(&self) -> Result<(), Error> {
        let creds = self.credentials();
        if !creds.has_access_token() {
            if !creds.has_refresh_token() {
                return Err(Error::NoCredentials);
            }
            debug!("no access token, refreshing");
            return self.refresh_access_token().await;
        }

        let seen = creds.generation();
        match self.send_raw(Action::SYSTEM_CHECK, &json!({})).await {
            Ok(_) => {
                debug!("access token accepted");
                Ok(())
            }
            Err(e) if e.is_unauthorized() => {
                info!("access token expired, refreshing");
                self.refresh_since(seen).await
            }
            Err(Error::Api { status, body, .. }) => Err(Error::AuthFailed { status, body }),
            Err(e) => Err(e),
        }
    }

    /// Exchange the refresh token for a new token pair.
    ///
    /// A caller that waited on a concurrent refresh returns as soon as it
    /// sees the rotated tokens, without a second network call.
    pub async fn refresh_access_token(&self) -> Result<(), Error> {
        self.refresh_since(self.credentials().generation()).await
    }

    /// Refresh unless the tokens have rotated since generation `seen`.
    pub(crate) async fn refresh_since(&self, seen: u64) -> Result<(), Error> {
        let _guard = self.refresh_lock.lock().await;
        let creds = self.credentials();
        if creds.generation() != seen {
            debug!("tokens already rotated by a concurrent refresh");
            return Ok(());
        }

        let refresh_token = creds.refresh_token().ok_or_else(|| Error::RefreshFailed {
            reason: "no refresh token available".into(),
        })?;

        let tokens = self
            .token_grant(&[
                ("grant_type", "refresh_token"),
                ("client_id", creds.client_id()),
                ("client_secret", creds.client_secret().expose_secret()),
                ("refresh_token", refresh_token.expose_secret()),
            ])
            .await?;

        creds.store(tokens);
        info!("access token refreshed");
        Ok(())
    }

    /// Authorization-code grant: trade the code from the authorize redirect.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<(), Error> {
        let _guard = self.refresh_lock.lock().await;
        let creds = self.credentials();
        let tokens = self
            .token_grant(&[
                ("grant_type", "authorization_code"),
                ("client_id", creds.client_id()),
                ("client_secret", creds.client_secret().expose_secret()),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .await?;

        creds.store(tokens);
        info!("authorization code exchanged");
        Ok(())
    }

    /// Client-credentials grant.
    pub async fn client_credentials(&self) -> Result<(), Error> {
        let _guard = self.refresh_lock.lock().await;
        let creds = self.credentials();
        let tokens = self
            .token_grant(&[
                ("grant_type", "client_credentials"),
                ("client_id", creds.client_id()),
                ("client_secret", creds.client_secret().expose_secret()),
                ("scope", OAUTH_SCOPE),
            ])
            .await?;

        creds.store(tokens);
        info!("client credentials grant succeeded");
        Ok(())
    }

    /// Legacy login through the `Uhome.Auth/Request` action.
    ///
    /// Older accounts obtain their token from the action endpoint rather
    /// than the OAuth server. The token comes back as `payload.access_token`.
    pub async fn action_login(&self) -> Result<(), Error> {
        let _guard = self.refresh_lock.lock().await;
        let creds = self.credentials();
        let payload = json!({
            "client_id": creds.client_id(),
            "client_secret": creds.client_secret().expose_secret(),
            "scope": OAUTH_SCOPE,
        });

        let resp = match self.send_envelope(Action::AUTH_REQUEST, &payload).await {
            Ok(resp) => resp,
            Err(Error::Api { status, body, .. }) => {
                return Err(Error::AuthFailed { status, body });
            }
            Err(e) => return Err(e),
        };

        let Some(access) = resp.get("access_token").and_then(Value::as_str) else {
            warn!("Uhome.Auth/Request returned no access token");
            return Err(Error::AuthFailed {
                status: 200,
                body: "response did not contain an access_token".into(),
            });
        };

        let refresh = resp
            .get("refresh_token")
            .and_then(Value::as_str)
            .map(|s| SecretString::from(s.to_owned()))
            .or_else(|| creds.refresh_token());

        creds.store(TokenSet {
            access_token: Some(SecretString::from(access.to_owned())),
            refresh_token: refresh,
            expires_at: expiry(resp.get("expires_in").and_then(Value::as_i64)),
        });
        info!("action login succeeded");
        Ok(())
    }

    /// Browser URL that starts the authorization-code flow.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> Url {
        let mut url = self.endpoints().authorize.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", self.credentials().client_id())
            .append_pair("scope", OAUTH_SCOPE)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", state);
        url
    }

    // ── Token endpoint ───────────────────────────────────────────────

    /// POST a form-encoded grant and convert the reply into a `TokenSet`.
    ///
    /// Does not touch stored tokens. A reply without `refresh_token` keeps
    /// the one currently held.
    async fn token_grant(&self, form: &[(&str, &str)]) -> Result<TokenSet, Error> {
        let grant = form
            .iter()
            .find(|(k, _)| *k == "grant_type")
            .map_or("unknown", |(_, v)| *v);
        debug!(grant, "POST {}", self.endpoints().token);

        let resp = self
            .http()
            .post(self.endpoints().token.clone())
            .form(form)
            .send()
            .await
            .map_err(|e| Error::RefreshFailed {
                reason: format!("token endpoint unreachable: {e}"),
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::RefreshFailed {
            reason: format!("failed to read token response: {e}"),
        })?;

        if !status.is_success() {
            warn!(grant, status = status.as_u16(), "token grant rejected");
            return Err(Error::RefreshFailed {
                reason: format!("HTTP {}: {}", status.as_u16(), Error::preview(&body)),
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::RefreshFailed {
                reason: format!("malformed token response: {e}"),
            })?;

        let access = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::RefreshFailed {
                reason: "response did not contain an access_token".into(),
            })?;

        let refresh = parsed
            .refresh_token
            .filter(|t| !t.is_empty())
            .map(SecretString::from)
            .or_else(|| self.credentials().refresh_token());

        Ok(TokenSet {
            access_token: Some(SecretString::from(access)),
            refresh_token: refresh,
            expires_at: expiry(parsed.expires_in),
        })
    }
}

fn expiry(expires_in: Option<i64>) -> Option<chrono::DateTime<Utc>> {
    expires_in
        .filter(|secs| *secs > 0)
        .map(|secs| Utc::now() + chrono::Duration::seconds(secs))
}
