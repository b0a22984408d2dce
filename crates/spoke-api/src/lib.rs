//! JSON REST API for Spoke.
//!
//! Exposes an axum [`Router`] backed by any store that implements both
//! [`DocumentStore`] and [`IdentityProvider`]. TLS and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", spoke_api::api_router(state.clone()))
//! ```

pub mod accounts;
pub mod auth;
pub mod catalog;
pub mod collections;
pub mod error;
pub mod feeds;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use spoke_core::{
  identity::IdentityProvider,
  mutation::{CounterMode, Mutations},
  store::{Classify, DocumentStore},
};

pub use error::ApiError;
pub use feeds::{FeedSpec, Feeds};

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:     Arc<S>,
  pub mutations: Mutations<S>,
  pub feeds:     Arc<Feeds>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:     self.store.clone(),
      mutations: self.mutations.clone(),
      feeds:     self.feeds.clone(),
    }
  }
}

impl<S: DocumentStore> AppState<S> {
  pub fn new(store: Arc<S>, feeds: Feeds) -> Self {
    Self {
      mutations: Mutations::new(store.clone()),
      store,
      feeds: Arc::new(feeds),
    }
  }

  pub fn with_counter_mode(mut self, mode: CounterMode) -> Self {
    self.mutations = self.mutations.with_counter_mode(mode);
    self
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: DocumentStore + IdentityProvider + 'static,
  <S as IdentityProvider>::Error: Classify,
{
  Router::new()
    // Accounts
    .route("/auth/signup", post(accounts::sign_up::<S>))
    .route("/auth/signin", post(accounts::sign_in::<S>))
    .route("/auth/signout", post(accounts::sign_out::<S>))
    .route("/auth/me", get(accounts::me::<S>))
    // Generic collections
    .route(
      "/collections/{name}",
      get(collections::list::<S>).post(collections::create::<S>),
    )
    .route("/collections/{name}/{id}", get(collections::get_one::<S>))
    .route("/collections/{name}/{id}/increment", post(collections::increment::<S>))
    .route("/collections/{name}/{id}/append", post(collections::append::<S>))
    .route("/collections/{name}/{id}/comments", post(collections::comment::<S>))
    // Typed catalog writes
    .route("/adventures", post(catalog::share_adventure::<S>))
    .route("/events", post(catalog::create_event::<S>))
    // Live feeds
    .route("/feeds", get(feeds::list::<S>))
    .route("/feeds/{name}", get(feeds::get_one::<S>))
    .with_state(state)
}
