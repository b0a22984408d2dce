//! Write-through mutation helpers.
//!
//! None of these patch the local mirror; the effect becomes visible when the
//! store pushes the next snapshot to open [`crate::live::LiveCollection`]s.
//! Every helper takes the caller's [`Identity`] as proof that the capability
//! check already happened. Failures are logged here and returned to the call
//! site; nothing is retried.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
  document::{CREATED_AT_FIELD, Comment, Document, DocumentId, NewDocument, Patch},
  identity::Identity,
  store::DocumentStore,
};

/// How `increment_counter` writes the new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterMode {
  /// Use the store's atomic increment; concurrent increments never lose
  /// updates.
  #[default]
  Atomic,
  /// Write `observed + 1`. Two writers that observed the same value produce
  /// a single increment.
  ObservedPlusOne,
}

/// Result of a write that may be skipped by input validation.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
  Written(Document),
  /// Input was blank; nothing was sent to the store.
  Skipped,
}

impl WriteOutcome {
  pub fn is_written(&self) -> bool { matches!(self, Self::Written(_)) }
}

/// `true` for values that count as empty input: null, whitespace-only
/// strings, and comment-like objects whose `text` is whitespace-only.
pub fn is_blank(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::String(s) => s.trim().is_empty(),
    Value::Object(map) => match map.get("text") {
      Some(Value::String(s)) => s.trim().is_empty(),
      _ => map.is_empty(),
    },
    _ => false,
  }
}

/// Typed write operations over a [`DocumentStore`].
pub struct Mutations<S> {
  store:        Arc<S>,
  counter_mode: CounterMode,
}

impl<S> Clone for Mutations<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), counter_mode: self.counter_mode }
  }
}

impl<S: DocumentStore> Mutations<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store, counter_mode: CounterMode::default() }
  }

  pub fn with_counter_mode(mut self, mode: CounterMode) -> Self {
    self.counter_mode = mode;
    self
  }

  pub fn counter_mode(&self) -> CounterMode { self.counter_mode }

  /// Append a new item. `createdAt` is set to the store's write-time clock
  /// unless the caller already supplied it.
  pub async fn create_item(
    &self,
    who: &Identity,
    collection: &str,
    item: NewDocument,
  ) -> Result<Document, S::Error> {
    let item = if item.contains(CREATED_AT_FIELD) {
      item
    } else {
      item.server_timestamp(CREATED_AT_FIELD)
    };
    match self.store.add_document(collection, item).await {
      Ok(doc) => {
        debug!(collection, id = %doc.id, uid = %who.uid, "item created");
        Ok(doc)
      }
      Err(e) => {
        warn!(collection, uid = %who.uid, error = %e, "error adding document");
        Err(e)
      }
    }
  }

  /// Bump a counter field by one, using the configured [`CounterMode`].
  /// `observed` is the value the caller last saw.
  pub async fn increment_counter(
    &self,
    who: &Identity,
    collection: &str,
    id: &DocumentId,
    field: &str,
    observed: i64,
  ) -> Result<Document, S::Error> {
    let patch = match self.counter_mode {
      CounterMode::Atomic => Patch::new().increment(field, 1),
      CounterMode::ObservedPlusOne => Patch::new().set(field, observed.saturating_add(1)),
    };
    self.update(who, collection, id, patch).await
  }

  /// Append `entry` to an array field with the store's union primitive.
  /// Blank entries are dropped without a write.
  pub async fn append_to_list(
    &self,
    who: &Identity,
    collection: &str,
    id: &DocumentId,
    field: &str,
    entry: Value,
  ) -> Result<WriteOutcome, S::Error> {
    if is_blank(&entry) {
      debug!(collection, %id, field, "blank entry skipped");
      return Ok(WriteOutcome::Skipped);
    }
    let patch = Patch::new().array_union(field, entry);
    self.update(who, collection, id, patch).await.map(WriteOutcome::Written)
  }

  /// Append a comment authored by `who`. Blank text is dropped without a
  /// write.
  pub async fn add_comment(
    &self,
    who: &Identity,
    collection: &str,
    id: &DocumentId,
    text: &str,
  ) -> Result<WriteOutcome, S::Error> {
    if text.trim().is_empty() {
      return Ok(WriteOutcome::Skipped);
    }
    let comment = Comment {
      user:       who.author_label().to_owned(),
      text:       text.to_owned(),
      created_at: Utc::now(),
    };
    self.append_to_list(who, collection, id, Comment::FIELD, comment.to_value()).await
  }

  async fn update(
    &self,
    who: &Identity,
    collection: &str,
    id: &DocumentId,
    patch: Patch,
  ) -> Result<Document, S::Error> {
    match self.store.update_document(collection, id, patch).await {
      Ok(doc) => Ok(doc),
      Err(e) => {
        warn!(collection, %id, uid = %who.uid, error = %e, "error updating document");
        Err(e)
      }
    }
  }
}
