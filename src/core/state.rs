use crate::core::config::{AUTHENTICATION_SCHEME, TokenOptions};
use crate::token::claim::Claim;
use crate::token::service::TokenService;
use crate::utils::auth::Principal;

/// Axum state for the one-time token middleware.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub(crate) token_service: TokenService,
}

impl AppState {
    pub fn new(token_service: TokenService) -> Self {
        Self { token_service }
    }

    pub fn token_service(&self) -> &TokenService {
        &self.token_service
    }

    pub(crate) fn options(&self) -> &TokenOptions {
        self.token_service.options()
    }

    /// Redeems `token` and builds the principal it grants.
    pub(crate) fn authenticate(&self, token: &str) -> Option<Principal> {
        let result = self.token_service.validate_token(token);

        if !result.is_valid {
            return None;
        }

        let mut claims = Vec::with_capacity(result.claims.len() + 1);
        claims.push(Claim::name_identifier(&self.options().name_identifier));
        claims.extend(result.claims);

        Some(Principal::new(AUTHENTICATION_SCHEME, claims))
    }
}

impl From<TokenService> for AppState {
    fn from(token_service: TokenService) -> Self {
        Self::new(token_service)
    }
}
