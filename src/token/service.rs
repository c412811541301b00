use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::core::config::TokenOptions;
use crate::core::error::Error;
use crate::token::claim::Claim;
use crate::token::store::{MemoryTokenStore, TokenEntry, TokenStore};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenValidationResult {
    pub is_valid: bool,
    pub claims: Vec<Claim>,
}

impl TokenValidationResult {
    pub fn valid(claims: Vec<Claim>) -> Self {
        Self {
            is_valid: true,
            claims,
        }
    }

    pub fn invalid() -> Self {
        Self::default()
    }
}

/// Issues and redeems single-use tokens.
///
/// Cloning is cheap and every clone shares the same store, so one instance
/// can be handed to each request handler.
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn TokenStore>,
    options: Arc<TokenOptions>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("options", &self.options)
            .field("outstanding", &self.store.len())
            .finish()
    }
}

impl Default for TokenService {
    fn default() -> Self {
        Self::new(TokenOptions::default())
    }
}

impl TokenService {
    pub fn new(options: TokenOptions) -> Self {
        Self::with_store(options, Arc::new(MemoryTokenStore::new()))
    }

    pub fn with_store(options: TokenOptions, store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &TokenOptions {
        &self.options
    }

    fn now(&self) -> DateTime<Utc> {
        (self.options.now)()
    }

    /// Mints a token carrying `claims`, valid for `expires_in` (or the
    /// configured default). `None` claims are dropped.
    ///
    /// Fails with [`Error::InvalidArgument`] when `expires_in` is negative.
    /// Durations reaching past the representable range expire at
    /// `DateTime::<Utc>::MAX_UTC`.
    #[instrument(skip_all)]
    pub fn create_token<I, C>(
        &self,
        claims: I,
        expires_in: Option<Duration>,
    ) -> Result<String, Error>
    where
        I: IntoIterator<Item = C>,
        C: Into<Option<Claim>>,
    {
        let expires_in = match expires_in {
            Some(expires_in) if expires_in < Duration::zero() => {
                return Err(Error::InvalidArgument(format!(
                    "expiration must not be negative, got {}",
                    expires_in
                )));
            }
            Some(expires_in) => expires_in,
            None => self.options.default_expire_time,
        };

        let claims: Vec<Claim> = claims.into_iter().filter_map(Into::into).collect();
        let expires_at = expiration(self.now(), expires_in);
        let id = Uuid::new_v4().to_string();

        tracing::debug!(claims = claims.len(), %expires_at, "issuing one-time token");

        self.store.insert(TokenEntry::new(id.clone(), claims, expires_at));

        Ok(id)
    }

    /// Mints a token granting each of `roles` as a role claim.
    pub fn create_role_token<I, R>(
        &self,
        roles: I,
        expires_in: Option<Duration>,
    ) -> Result<String, Error>
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.create_token(roles.into_iter().map(Claim::role), expires_in)
    }

    /// Redeems `token`. The entry is consumed whatever the outcome, so a
    /// token validates successfully at most once.
    #[instrument(skip_all)]
    pub fn validate_token(&self, token: &str) -> TokenValidationResult {
        let now = self.now();

        let swept = self.store.remove_expired(now);
        if swept > 0 {
            tracing::debug!(swept, "removed expired one-time tokens");
        }

        let Some(entry) = self.store.try_remove(token) else {
            tracing::debug!("one-time token unknown or already redeemed");
            return TokenValidationResult::invalid();
        };

        if entry.is_expired(now) {
            tracing::debug!(expires_at = %entry.expires_at, "one-time token expired");
            return TokenValidationResult::invalid();
        }

        tracing::debug!(claims = entry.claims.len(), "one-time token redeemed");

        TokenValidationResult::valid(entry.claims)
    }

    /// Sweeps expired entries without redeeming anything.
    pub fn sweep_expired(&self) -> usize {
        let swept = self.store.remove_expired(self.now());

        tracing::debug!(swept, "swept expired one-time tokens");

        swept
    }

    /// Copy of the outstanding entries, keyed by token.
    pub fn tokens(&self) -> HashMap<String, TokenEntry> {
        self.store.snapshot()
    }
}

fn expiration(now: DateTime<Utc>, expires_in: Duration) -> DateTime<Utc> {
    match now.checked_add_signed(expires_in) {
        Some(expires_at) => expires_at,
        None if expires_in < Duration::zero() => DateTime::<Utc>::MIN_UTC,
        None => DateTime::<Utc>::MAX_UTC,
    }
}
