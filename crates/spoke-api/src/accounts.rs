//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/signup` | Body: [`SignUpBody`]; returns 201 + session |
//! | `POST` | `/auth/signin` | Body: [`SignInBody`]; returns session |
//! | `POST` | `/auth/signout` | Bearer; returns 204 |
//! | `GET`  | `/auth/me` | Bearer; the current identity |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use spoke_core::{
  identity::{Identity, IdentityProvider, Session},
  store::Classify,
};

use crate::{AppState, auth::CurrentUser, error::ApiError};

// ─── Sign up ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpBody {
  pub email:        String,
  pub password:     String,
  #[serde(default)]
  pub display_name: String,
}

/// `POST /auth/signup`
pub async fn sign_up<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<SignUpBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: IdentityProvider + 'static,
  S::Error: Classify,
{
  let session: Session = state
    .store
    .sign_up(&body.email, &body.password, &body.display_name)
    .await
    .map_err(ApiError::from_auth_failure)?;
  Ok((StatusCode::CREATED, Json(session)))
}

// ─── Sign in ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignInBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/signin`
pub async fn sign_in<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<SignInBody>,
) -> Result<Json<Session>, ApiError>
where
  S: IdentityProvider + 'static,
  S::Error: Classify,
{
  let session = state
    .store
    .sign_in(&body.email, &body.password)
    .await
    .map_err(ApiError::from_auth_failure)?;
  Ok(Json(session))
}

// ─── Sign out ─────────────────────────────────────────────────────────────────

/// `POST /auth/signout`
pub async fn sign_out<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
) -> Result<StatusCode, ApiError>
where
  S: IdentityProvider + 'static,
  S::Error: Classify,
{
  state
    .store
    .sign_out(&user.token)
    .await
    .map_err(ApiError::from_failure)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Me ───────────────────────────────────────────────────────────────────────

/// `GET /auth/me`
pub async fn me<S>(user: CurrentUser) -> Json<Identity>
where
  S: IdentityProvider + 'static,
  S::Error: Classify,
{
  Json(user.identity)
}
