//! Handlers for `/collections` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/collections/:name` | Optional `order_by`, `direction`, `category` |
//! | `POST` | `/collections/:name` | Bearer; body: field object; returns 201 |
//! | `GET`  | `/collections/:name/:id` | 404 if not found |
//! | `POST` | `/collections/:name/:id/increment` | Bearer; body: [`IncrementBody`] |
//! | `POST` | `/collections/:name/:id/append` | Bearer; body: [`AppendBody`]; 204 if blank |
//! | `POST` | `/collections/:name/:id/comments` | Bearer; body: [`CommentBody`]; 204 if blank |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::Value;
use spoke_core::{
  catalog::default_query,
  document::{Document, DocumentId, NewDocument},
  filter::Filter,
  identity::IdentityProvider,
  mutation::WriteOutcome,
  query::{CollectionQuery, Direction},
  store::{Classify, DocumentStore},
};

use crate::{AppState, auth::CurrentUser, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  /// Field to order by. Defaults to the catalog ordering of the collection.
  pub order_by:  Option<String>,
  pub direction: Option<Direction>,
  /// Category label; `All` or absent selects everything.
  pub category:  Option<String>,
}

impl ListParams {
  fn query(&self, collection: &str) -> Result<CollectionQuery, ApiError> {
    match (&self.order_by, default_query(collection)) {
      (Some(order_by), _) => Ok(CollectionQuery::new(
        collection,
        order_by.as_str(),
        self.direction.unwrap_or_default(),
      )),
      (None, Some(mut query)) => {
        if let Some(direction) = self.direction {
          query.direction = direction;
        }
        Ok(query)
      }
      (None, None) => Err(ApiError::BadRequest(format!(
        "order_by is required for collection {collection:?}"
      ))),
    }
  }
}

/// `GET /collections/:name[?order_by=..][&direction=asc|desc][&category=..]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Path(name): Path<String>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Document>>, ApiError>
where
  S: DocumentStore + 'static,
{
  let query = params.query(&name)?;
  let documents = state
    .store
    .query(&query)
    .await
    .map_err(ApiError::from_failure)?;
  let filter = Filter::category(params.category.as_deref());
  Ok(Json(filter.apply(&documents)))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /collections/:name`. The body is the document's field object.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Path(name): Path<String>,
  user: CurrentUser,
  Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore + IdentityProvider + 'static,
  <S as IdentityProvider>::Error: Classify,
{
  let item = NewDocument::from_json(body)?;
  let doc = state
    .mutations
    .create_item(&user.identity, &name, item)
    .await
    .map_err(ApiError::from_failure)?;
  Ok((StatusCode::CREATED, Json(doc)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /collections/:name/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path((name, id)): Path<(String, String)>,
) -> Result<Json<Document>, ApiError>
where
  S: DocumentStore + 'static,
{
  let doc = state
    .store
    .get_document(&name, &DocumentId::from(id.as_str()))
    .await
    .map_err(ApiError::from_failure)?
    .ok_or_else(|| ApiError::NotFound(format!("document {name}/{id} not found")))?;
  Ok(Json(doc))
}

// ─── Increment ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IncrementBody {
  pub field:    String,
  /// The counter value the caller last saw. Required.
  pub observed: i64,
}

/// `POST /collections/:name/:id/increment`. Body: `{"field":"likes","observed":5}`
pub async fn increment<S>(
  State(state): State<AppState<S>>,
  Path((name, id)): Path<(String, String)>,
  user: CurrentUser,
  Json(body): Json<IncrementBody>,
) -> Result<Json<Document>, ApiError>
where
  S: DocumentStore + IdentityProvider + 'static,
  <S as IdentityProvider>::Error: Classify,
{
  let doc = state
    .mutations
    .increment_counter(&user.identity, &name, &DocumentId::from(id), &body.field, body.observed)
    .await
    .map_err(ApiError::from_failure)?;
  Ok(Json(doc))
}

// ─── Append ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AppendBody {
  pub field: String,
  #[serde(default)]
  pub entry: Value,
}

fn outcome_response(outcome: WriteOutcome) -> Response {
  match outcome {
    WriteOutcome::Written(doc) => Json(doc).into_response(),
    WriteOutcome::Skipped => StatusCode::NO_CONTENT.into_response(),
  }
}

/// `POST /collections/:name/:id/append`. Body: `{"field":"tags","entry":"gravel"}`
pub async fn append<S>(
  State(state): State<AppState<S>>,
  Path((name, id)): Path<(String, String)>,
  user: CurrentUser,
  Json(body): Json<AppendBody>,
) -> Result<Response, ApiError>
where
  S: DocumentStore + IdentityProvider + 'static,
  <S as IdentityProvider>::Error: Classify,
{
  let outcome = state
    .mutations
    .append_to_list(&user.identity, &name, &DocumentId::from(id), &body.field, body.entry)
    .await
    .map_err(ApiError::from_failure)?;
  Ok(outcome_response(outcome))
}

// ─── Comments ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CommentBody {
  #[serde(default)]
  pub text: String,
}

/// `POST /collections/:name/:id/comments`. Body: `{"text":"Great ride!"}`
pub async fn comment<S>(
  State(state): State<AppState<S>>,
  Path((name, id)): Path<(String, String)>,
  user: CurrentUser,
  Json(body): Json<CommentBody>,
) -> Result<Response, ApiError>
where
  S: DocumentStore + IdentityProvider + 'static,
  <S as IdentityProvider>::Error: Classify,
{
  let outcome = state
    .mutations
    .add_comment(&user.identity, &name, &DocumentId::from(id), &body.text)
    .await
    .map_err(ApiError::from_failure)?;
  Ok(outcome_response(outcome))
}
