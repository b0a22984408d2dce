//! The `DocumentStore` trait and its push-based subscription channel.
//!
//! The trait is implemented by storage backends (e.g. `spoke-store-sqlite`).
//! Higher layers (`spoke-api`, the `spoke` binary) depend on this
//! abstraction, not on any concrete backend.

use std::{fmt, future::Future};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
  document::{Document, DocumentId, NewDocument, Patch},
  query::{CollectionQuery, Snapshot},
};

// ─── Failure classification ──────────────────────────────────────────────────

/// Backend-independent category of a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  /// Rejected by the store's access rules.
  PermissionDenied,
  NotFound,
  InvalidArgument,
  Unavailable,
  Internal,
}

impl fmt::Display for FailureKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::PermissionDenied => "permission denied",
      Self::NotFound => "not found",
      Self::InvalidArgument => "invalid argument",
      Self::Unavailable => "unavailable",
      Self::Internal => "internal error",
    })
  }
}

/// Implemented by backend error types so generic layers can tell a
/// permission error apart from everything else.
pub trait Classify {
  fn kind(&self) -> FailureKind;

  fn is_permission_denied(&self) -> bool {
    self.kind() == FailureKind::PermissionDenied
  }
}

/// A failed subscription, as delivered to its consumer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct SubscriptionError {
  pub kind:    FailureKind,
  pub message: String,
}

impl SubscriptionError {
  pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
    Self { kind, message: message.into() }
  }

  pub fn from_failure<E: Classify + fmt::Display>(err: &E) -> Self {
    Self::new(err.kind(), err.to_string())
  }
}

impl Classify for SubscriptionError {
  fn kind(&self) -> FailureKind { self.kind }
}

// ─── Subscription channel ────────────────────────────────────────────────────

/// One delivery on a subscription: a full result set, or the failure that
/// ended it.
pub type SnapshotEvent = Result<Snapshot, SubscriptionError>;

/// Producer half of a subscription, held by the store.
#[derive(Debug, Clone)]
pub struct SubscriptionSink {
  tx: mpsc::Sender<SnapshotEvent>,
}

impl SubscriptionSink {
  /// Deliver an event in order. Returns `false` once the consumer is gone.
  pub async fn deliver(&self, event: SnapshotEvent) -> bool {
    self.tx.send(event).await.is_ok()
  }

  /// Resolves when the consumer has dropped its [`Subscription`].
  pub async fn closed(&self) { self.tx.closed().await }

  pub fn is_closed(&self) -> bool { self.tx.is_closed() }
}

/// Consumer half of a subscription. Dropping it cancels the subscription.
#[derive(Debug)]
pub struct Subscription {
  rx: mpsc::Receiver<SnapshotEvent>,
}

impl Subscription {
  /// Create a connected sink/subscription pair with `buffer` slots.
  pub fn channel(buffer: usize) -> (SubscriptionSink, Subscription) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (SubscriptionSink { tx }, Subscription { rx })
  }

  /// The next event, in delivery order; `None` once the store has stopped.
  pub async fn next(&mut self) -> Option<SnapshotEvent> { self.rx.recv().await }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a schemaless document store addressed by named
/// collections.
///
/// Documents are never deleted through this interface. Identifiers are
/// assigned by the store and never reused.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  /// Append a new document to `collection` and return it as stored.
  fn add_document<'a>(
    &'a self,
    collection: &'a str,
    document: NewDocument,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + 'a;

  /// Apply `patch` to an existing document and return the result.
  fn update_document<'a>(
    &'a self,
    collection: &'a str,
    id: &'a DocumentId,
    patch: Patch,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + 'a;

  /// Fetch one document. Returns `None` if not found.
  fn get_document<'a>(
    &'a self,
    collection: &'a str,
    id: &'a DocumentId,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + 'a;

  /// Run `query` once and return the ordered result set.
  fn query<'a>(
    &'a self,
    query: &'a CollectionQuery,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + 'a;

  /// Open a standing subscription to `query`.
  ///
  /// The store pushes a full [`Snapshot`] immediately and again after every
  /// change to the collection, in server order. A failure is delivered as
  /// the final event. Dropping the returned [`Subscription`] cancels it.
  fn subscribe(
    &self,
    query: CollectionQuery,
  ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send + '_;
}
