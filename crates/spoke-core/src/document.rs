//! Documents: the schemaless records that every collection holds.
//!
//! A document is an identifier plus an open mapping of named fields. Writes
//! are expressed as a [`NewDocument`] (creation) or a [`Patch`] (field
//! updates); both may carry store-resolved values such as the server
//! timestamp, which the backend fills in at write time.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{Error, Result};

/// Field name holding the identifier when a document is flattened.
pub const ID_FIELD: &str = "id";

/// Field name of the creation instant written by
/// [`crate::mutation::Mutations::create_item`].
pub const CREATED_AT_FIELD: &str = "createdAt";

/// The open field mapping of a document.
pub type Fields = serde_json::Map<String, Value>;

// ─── Names ───────────────────────────────────────────────────────────────────

/// Validate a collection or field name. Names end up inside JSON paths, so
/// they are restricted to ASCII alphanumerics and underscores.
pub fn validate_name(name: &str) -> Result<()> {
  let ok = !name.is_empty()
    && name.len() <= 64
    && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
  if ok { Ok(()) } else { Err(Error::InvalidName(name.to_owned())) }
}

fn validate_field(name: &str) -> Result<()> {
  validate_name(name)?;
  if name == ID_FIELD {
    return Err(Error::ReservedField(name.to_owned()));
  }
  Ok(())
}

// ─── Timestamps ──────────────────────────────────────────────────────────────

/// Encode an instant the way it is stored inside documents.
///
/// Fixed-width UTC with microseconds, so lexical order equals chronological
/// order when the store sorts by a timestamp field.
pub fn encode_timestamp(at: DateTime<Utc>) -> String {
  at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ─── DocumentId ──────────────────────────────────────────────────────────────

/// Store-assigned identifier; immutable for the lifetime of the document and
/// never reused.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
  /// A fresh random identifier.
  pub fn generate() -> Self { Self(Uuid::new_v4().simple().to_string()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl From<String> for DocumentId {
  fn from(s: String) -> Self { Self(s) }
}

impl From<&str> for DocumentId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl fmt::Display for DocumentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Document ────────────────────────────────────────────────────────────────

/// A document as delivered by the store: its identifier merged into its field
/// mapping when serialised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
  pub id:     DocumentId,
  #[serde(flatten)]
  pub fields: Fields,
}

impl Document {
  pub fn new(id: DocumentId, fields: Fields) -> Self { Self { id, fields } }

  pub fn get(&self, field: &str) -> Option<&Value> { self.fields.get(field) }

  /// A string field, if present and a string.
  pub fn text(&self, field: &str) -> Option<&str> {
    self.fields.get(field).and_then(Value::as_str)
  }

  /// A numeric counter field; absent or non-integer values read as zero.
  pub fn counter(&self, field: &str) -> i64 {
    self.fields.get(field).and_then(Value::as_i64).unwrap_or(0)
  }

  /// The embedded comments, in stored order. Malformed entries are skipped.
  pub fn comments(&self) -> Vec<Comment> {
    match self.fields.get(Comment::FIELD) {
      Some(Value::Array(items)) => items
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect(),
      _ => Vec::new(),
    }
  }
}

// ─── Comment ─────────────────────────────────────────────────────────────────

/// A comment embedded in its parent item's `comments` array. Never
/// independently addressable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  /// Display name of the author at the time of writing.
  pub user:       String,
  pub text:       String,
  pub created_at: DateTime<Utc>,
}

impl Comment {
  /// Name of the array field comments are appended to.
  pub const FIELD: &'static str = "comments";

  /// The array entry stored for this comment.
  pub fn to_value(&self) -> Value {
    let mut entry = serde_json::Map::new();
    entry.insert("user".into(), Value::String(self.user.clone()));
    entry.insert("text".into(), Value::String(self.text.clone()));
    entry.insert("createdAt".into(), Value::String(encode_timestamp(self.created_at)));
    Value::Object(entry)
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// A field value in a write, possibly resolved by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  Value(Value),
  /// Replaced by the store's clock at write time.
  ServerTimestamp,
}

impl FieldValue {
  fn resolve(self, now: DateTime<Utc>) -> Value {
    match self {
      Self::Value(v) => v,
      Self::ServerTimestamp => Value::String(encode_timestamp(now)),
    }
  }
}

/// Input to [`crate::store::DocumentStore::add_document`].
/// The identifier is always assigned by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewDocument {
  fields: BTreeMap<String, FieldValue>,
}

impl NewDocument {
  pub fn new() -> Self { Self::default() }

  /// Build from a JSON object. Fails on non-objects.
  pub fn from_json(value: Value) -> Result<Self> {
    match value {
      Value::Object(map) => Ok(map.into_iter().fold(Self::new(), |d, (k, v)| d.set(k, v))),
      other => Err(Error::NotAnObject(other.to_string())),
    }
  }

  pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.fields.insert(field.into(), FieldValue::Value(value.into()));
    self
  }

  pub fn server_timestamp(mut self, field: impl Into<String>) -> Self {
    self.fields.insert(field.into(), FieldValue::ServerTimestamp);
    self
  }

  pub fn contains(&self, field: &str) -> bool { self.fields.contains_key(field) }

  pub fn get(&self, field: &str) -> Option<&FieldValue> { self.fields.get(field) }

  /// Reject reserved or malformed field names.
  pub fn validate(&self) -> Result<()> {
    self.fields.keys().try_for_each(|k| validate_field(k))
  }

  /// Resolve store-assigned values against `now` and produce the stored
  /// field mapping.
  pub fn resolve(self, now: DateTime<Utc>) -> Result<Fields> {
    self.validate()?;
    Ok(
      self
        .fields
        .into_iter()
        .map(|(k, v)| (k, v.resolve(now)))
        .collect(),
    )
  }
}

/// A single field mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
  /// Overwrite the field.
  Set(Value),
  /// Overwrite the field with the store's clock.
  ServerTimestamp,
  /// Append each element not already present; creates the array if the field
  /// is absent or not an array.
  ArrayUnion(Vec<Value>),
  /// Add to a numeric field; an absent or non-numeric field becomes the delta.
  Increment(i64),
}

/// Input to [`crate::store::DocumentStore::update_document`]. Updates apply
/// in order, atomically with respect to other writes on the same document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
  updates: Vec<(String, FieldUpdate)>,
}

impl Patch {
  pub fn new() -> Self { Self::default() }

  pub fn with(mut self, field: impl Into<String>, update: FieldUpdate) -> Self {
    self.updates.push((field.into(), update));
    self
  }

  pub fn set(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.with(field, FieldUpdate::Set(value.into()))
  }

  pub fn array_union(self, field: impl Into<String>, entry: Value) -> Self {
    self.with(field, FieldUpdate::ArrayUnion(vec![entry]))
  }

  pub fn increment(self, field: impl Into<String>, delta: i64) -> Self {
    self.with(field, FieldUpdate::Increment(delta))
  }

  pub fn is_empty(&self) -> bool { self.updates.is_empty() }

  pub fn validate(&self) -> Result<()> {
    self.updates.iter().try_for_each(|(k, _)| validate_field(k))
  }

  /// Apply every update to `fields` in order.
  pub fn apply(self, fields: &mut Fields, now: DateTime<Utc>) -> Result<()> {
    self.validate()?;
    for (field, update) in self.updates {
      match update {
        FieldUpdate::Set(v) => {
          fields.insert(field, v);
        }
        FieldUpdate::ServerTimestamp => {
          fields.insert(field, Value::String(encode_timestamp(now)));
        }
        FieldUpdate::ArrayUnion(entries) => match fields.get_mut(&field) {
          Some(Value::Array(existing)) => {
            for entry in entries {
              if !existing.contains(&entry) {
                existing.push(entry);
              }
            }
          }
          _ => {
            let mut fresh: Vec<Value> = Vec::with_capacity(entries.len());
            for entry in entries {
              if !fresh.contains(&entry) {
                fresh.push(entry);
              }
            }
            fields.insert(field, Value::Array(fresh));
          }
        },
        FieldUpdate::Increment(delta) => {
          let next = match fields.get(&field) {
            Some(Value::Number(n)) => match n.as_i64() {
              Some(i) => Value::from(i.saturating_add(delta)),
              None => Value::from(n.as_f64().unwrap_or(0.0) + delta as f64),
            },
            _ => Value::from(delta),
          };
          fields.insert(field, next);
        }
      }
    }
    Ok(())
  }
}
