//! Bearer-token extractor.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use spoke_core::{
  identity::{Identity, IdentityProvider},
  store::Classify,
};

use crate::{AppState, error::ApiError};

/// The signed-in caller. Present in a handler means the request carried a
/// live session token; mutations take the identity from here.
#[derive(Debug, Clone)]
pub struct CurrentUser {
  pub identity: Identity,
  pub token:    String,
}

/// Pull the token out of an `Authorization: Bearer …` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| ApiError::Unauthorized("sign-in required".into()))
}

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: IdentityProvider + 'static,
  S::Error: Classify,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)?.to_owned();
    let identity = state
      .store
      .resolve(&token)
      .await
      .map_err(ApiError::from_failure)?
      .ok_or_else(|| ApiError::Unauthorized("session expired or unknown".into()))?;
    Ok(CurrentUser { identity, token })
  }
}
