//! Live feeds: one [`LiveCollection`] per configured feed, opened at startup
//! and served from its mirror.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/feeds` | Every feed with its loading/error status |
//! | `GET`  | `/feeds/:name` | Mirror items; optional `category`; 503 while loading |

use std::{
  collections::BTreeMap,
  sync::{Mutex, PoisonError},
};

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use spoke_core::{
  catalog::{COLLECTIONS, default_query},
  document::Document,
  filter::Filter,
  live::{LiveCollection, ViewState},
  query::{CollectionQuery, Direction},
  store::{DocumentStore, SubscriptionError},
};
use tracing::info;

use crate::{AppState, error::ApiError};

// ─── Specs ────────────────────────────────────────────────────────────────────

/// One feed as configured: a name and the ordered query it mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSpec {
  pub name:       String,
  pub collection: String,
  pub order_by:   String,
  #[serde(default)]
  pub direction:  Direction,
}

impl FeedSpec {
  pub fn query(&self) -> CollectionQuery {
    CollectionQuery::new(&self.collection, &self.order_by, self.direction)
  }

  /// A feed per catalog collection, named after it, in its default ordering.
  pub fn catalog() -> Vec<FeedSpec> {
    COLLECTIONS
      .into_iter()
      .filter_map(default_query)
      .map(|q| FeedSpec {
        name:       q.collection.clone(),
        collection: q.collection,
        order_by:   q.order_by,
        direction:  q.direction,
      })
      .collect()
  }
}

// ─── Registry ─────────────────────────────────────────────────────────────────

/// The open views, by feed name.
#[derive(Default)]
pub struct Feeds {
  views: Mutex<BTreeMap<String, LiveCollection>>,
}

impl Feeds {
  pub fn empty() -> Self { Self::default() }

  /// Open a view for every configured feed. A view that cannot subscribe still opens,
  /// in its failed state.
  pub async fn open<S: DocumentStore>(store: &S, specs: &[FeedSpec]) -> Self {
    let mut views = BTreeMap::new();
    for spec in specs {
      let view = LiveCollection::open(store, spec.query()).await;
      info!(feed = %spec.name, query = %view.query(), "feed opened");
      views.insert(spec.name.clone(), view);
    }
    Self { views: Mutex::new(views) }
  }

  pub fn names(&self) -> Vec<String> { self.lock().keys().cloned().collect() }

  /// Current state of the named feed.
  pub fn state(&self, name: &str) -> Option<(CollectionQuery, ViewState)> {
    self.lock().get(name).map(|v| (v.query().clone(), v.state()))
  }

  /// Release every subscription. Later lookups find nothing.
  pub fn close(&self) {
    let views = std::mem::take(&mut *self.lock());
    for (name, view) in views {
      view.close();
      info!(feed = %name, "feed closed");
    }
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, LiveCollection>> {
    self.views.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct FeedStatus {
  pub name:     String,
  pub query:    CollectionQuery,
  pub loading:  bool,
  pub error:    Option<SubscriptionError>,
  pub revision: u64,
  pub count:    usize,
}

/// `GET /feeds`
pub async fn list<S>(State(state): State<AppState<S>>) -> Json<Vec<FeedStatus>>
where
  S: DocumentStore + 'static,
{
  let feeds = state
    .feeds
    .names()
    .into_iter()
    .filter_map(|name| {
      let (query, view) = state.feeds.state(&name)?;
      Some(FeedStatus {
        name,
        query,
        loading: view.loading,
        error: view.error,
        revision: view.revision,
        count: view.items.len(),
      })
    })
    .collect();
  Json(feeds)
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
  pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedBody {
  pub name:     String,
  pub revision: u64,
  pub items:    Vec<Document>,
}

/// `GET /feeds/:name[?category=..]`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(name): Path<String>,
  Query(params): Query<FeedParams>,
) -> Result<Json<FeedBody>, ApiError>
where
  S: DocumentStore + 'static,
{
  let (_, view) = state
    .feeds
    .state(&name)
    .ok_or_else(|| ApiError::NotFound(format!("feed {name:?} not found")))?;

  if let Some(error) = view.error {
    return Err(ApiError::from_failure(error));
  }
  if view.loading {
    return Err(ApiError::Unavailable(format!("feed {name:?} is loading")));
  }

  let filter = Filter::category(params.category.as_deref());
  Ok(Json(FeedBody {
    name,
    revision: view.revision,
    items: filter.apply(&view.items),
  }))
}
