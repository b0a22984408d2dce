//! Typed writes for the two user-authored catalog collections.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/adventures` | Bearer; body: [`NewAdventure`]; returns 201 |
//! | `POST` | `/events` | Bearer; body: [`NewEvent`]; returns 201 |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use spoke_core::{
  catalog::{ADVENTURES, EVENTS, NewAdventure, NewEvent},
  identity::IdentityProvider,
  store::{Classify, DocumentStore},
};

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// `POST /adventures`. Body: `{"title":..,"category":"Gravel","description":..}`
pub async fn share_adventure<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<NewAdventure>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore + IdentityProvider + 'static,
  <S as IdentityProvider>::Error: Classify,
{
  let item = body.into_document(&user.identity, Utc::now().date_naive())?;
  let doc = state
    .mutations
    .create_item(&user.identity, ADVENTURES, item)
    .await
    .map_err(ApiError::from_failure)?;
  Ok((StatusCode::CREATED, Json(doc)))
}

/// `POST /events`. Body: `{"title":..,"date":"2024-10-20","location":..,"type":"Social"}`
pub async fn create_event<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Json(body): Json<NewEvent>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore + IdentityProvider + 'static,
  <S as IdentityProvider>::Error: Classify,
{
  let item = body.into_document(&user.identity)?;
  let doc = state
    .mutations
    .create_item(&user.identity, EVENTS, item)
    .await
    .map_err(ApiError::from_failure)?;
  Ok((StatusCode::CREATED, Json(doc)))
}
