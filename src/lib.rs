//! Single-use, short-lived access tokens layered on top of another
//! authentication scheme.
//!
//! A caller that is already authenticated mints a token carrying role claims
//! through [`TokenService::create_token`]. The token can later be redeemed
//! exactly once, before it expires, via [`TokenService::validate_token`] or
//! the [`authenticate`] middleware.

pub mod core;
pub mod token;
pub mod utils;

pub use crate::core::config::{AUTHENTICATION_SCHEME, Clock, TokenOptions, system_clock};
pub use crate::core::error::{ConfigError, Error};
pub use crate::core::state::AppState;
pub use crate::token::claim::Claim;
pub use crate::token::service::{TokenService, TokenValidationResult};
pub use crate::token::store::{MemoryTokenStore, TokenEntry, TokenStore};
pub use crate::utils::auth::{
    Principal, RequiredRole, authenticate, authorize, extract_token, require_role,
};
