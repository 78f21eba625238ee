// Credential material shared by the authenticator and the transport.
//
// The token pair is the only mutable state. It is replaced as a unit,
// and only through `Credentials::store`, which is crate-private and called
// exclusively by the grant handlers in `oauth.rs`.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tokio::sync::watch;

/// OAuth scope requested by every grant.
pub const OAUTH_SCOPE: &str = "openapi";

/// Access + refresh token pair, replaced atomically.
#[derive(Debug, Clone, Default)]
pub struct TokenSet {
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    /// Derived from `expires_in` at the time the token was issued.
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenSet {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }

    /// `true` when the server-declared lifetime has elapsed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Client credentials plus the current token pair for one account.
///
/// Shared by reference (`Arc<Credentials>`) between the client and whoever
/// needs to persist rotated tokens. Observers can [`subscribe`](Self::subscribe)
/// to the token generation counter, which bumps on every write.
#[derive(Debug)]
pub struct Credentials {
    client_id: String,
    client_secret: SecretString,
    tokens: RwLock<TokenSet>,
    generation: watch::Sender<u64>,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: SecretString) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            client_id: client_id.into(),
            client_secret,
            tokens: RwLock::new(TokenSet::default()),
            generation,
        }
    }

    /// Seed the token pair from persisted configuration.
    pub fn with_tokens(
        self,
        access_token: Option<SecretString>,
        refresh_token: Option<SecretString>,
    ) -> Self {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = TokenSet {
            access_token,
            refresh_token,
            expires_at: None,
        };
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    /// A copy of the current token pair.
    pub fn tokens(&self) -> TokenSet {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_access_token(&self) -> bool {
        self.read_with(|t| t.access_token.is_some())
    }

    pub fn has_refresh_token(&self) -> bool {
        self.read_with(|t| t.refresh_token.is_some())
    }

    pub(crate) fn access_token(&self) -> Option<SecretString> {
        self.read_with(|t| t.access_token.clone())
    }

    pub(crate) fn refresh_token(&self) -> Option<SecretString> {
        self.read_with(|t| t.refresh_token.clone())
    }

    /// Number of token writes since construction.
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Watch token rotations. The value is the generation counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// Replace the token pair. The single write path for token state.
    pub(crate) fn store(&self, tokens: TokenSet) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = tokens;
        self.generation.send_modify(|g| *g += 1);
    }

    fn read_with<R>(&self, f: impl FnOnce(&TokenSet) -> R) -> R {
        f(&self.tokens.read().unwrap_or_else(PoisonError::into_inner))
    }
}
