use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, OptionalFromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri};
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;

use crate::core::config::TokenOptions;
use crate::core::error::Error;
use crate::core::state::AppState;
use crate::token::claim::{self, Claim};

/// Identity established by redeeming a one-time token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub authentication_type: String,
    pub claims: Vec<Claim>,
}

impl Principal {
    pub fn new(authentication_type: impl Into<String>, claims: Vec<Claim>) -> Self {
        Self {
            authentication_type: authentication_type.into(),
            claims,
        }
    }

    pub fn name_identifier(&self) -> Option<&str> {
        self.claims
            .iter()
            .find(|claim| claim.claim_type == claim::NAME_IDENTIFIER)
            .map(|claim| claim.value.as_str())
    }

    pub fn is_in_role(&self, role: &str) -> bool {
        self.claims.iter().any(|claim| claim.is_role(role))
    }

    fn current(parts: &Parts) -> Option<Self> {
        parts.extensions.get::<Option<Principal>>().cloned().flatten()
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::current(parts).ok_or(Error::Unauthorized)
    }
}

impl<S> OptionalFromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(Self::current(parts))
    }
}

/// Role that [`require_role`] demands of the principal.
#[derive(Clone, Debug)]
pub struct RequiredRole(Arc<str>);

impl RequiredRole {
    pub fn new(role: impl AsRef<str>) -> Self {
        Self(Arc::from(role.as_ref()))
    }
}

/// Finds the candidate token of a request. A header of the form
/// `<prefix> <token>` wins over the query parameter.
pub fn extract_token(headers: &HeaderMap, uri: &Uri, options: &TokenOptions) -> Option<String> {
    token_from_header(headers, options).or_else(|| token_from_query(uri, options))
}

fn token_from_header(headers: &HeaderMap, options: &TokenOptions) -> Option<String> {
    let value = headers
        .get(options.authorization_header_name.as_str())?
        .to_str()
        .ok()?;

    let token = value
        .strip_prefix(options.authorization_header_prefix.as_str())?
        .strip_prefix(' ')?;

    (!token.is_empty()).then(|| token.to_string())
}

fn token_from_query(uri: &Uri, options: &TokenOptions) -> Option<String> {
    let params: Vec<(String, String)> = serde_urlencoded::from_str(uri.query()?).ok()?;

    params
        .into_iter()
        .find(|(name, _)| *name == options.authorization_query_param_name)
        .map(|(_, token)| token)
        .filter(|token| !token.is_empty())
}

/// Redeems the request's token, if any, and stores the resulting
/// `Option<Principal>` in the request extensions. Never rejects.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let principal = extract_token(request.headers(), request.uri(), state.options())
        .and_then(|token| state.authenticate(&token));

    match principal {
        Some(ref principal) => tracing::debug!(
            claims = principal.claims.len(),
            "authenticated with one-time token"
        ),
        None => tracing::trace!("no valid one-time token on request"),
    }

    request.extensions_mut().insert(principal);

    next.run(request).await
}

/// Rejects requests that [`authenticate`] found no principal for.
pub async fn authorize(request: Request, next: Next) -> Result<Response, Error> {
    match request.extensions().get::<Option<Principal>>() {
        Some(Some(_)) => Ok(next.run(request).await),
        _ => Err(Error::Unauthorized),
    }
}

pub async fn require_role(
    State(role): State<RequiredRole>,
    request: Request,
    next: Next,
) -> Result<Response, Error> {
    match request.extensions().get::<Option<Principal>>() {
        Some(Some(principal)) if principal.is_in_role(&role.0) => Ok(next.run(request).await),
        Some(Some(_)) => Err(Error::Forbidden),
        _ => Err(Error::Unauthorized),
    }
}
