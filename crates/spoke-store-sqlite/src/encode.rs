//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored with [`spoke_core::document::encode_timestamp`];
//! document bodies are compact JSON objects.

use chrono::{DateTime, Utc};
use spoke_core::document::{Document, DocumentId, Fields, encode_timestamp};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { encode_timestamp(dt) }

// ─── Fields ──────────────────────────────────────────────────────────────────

pub fn encode_fields(fields: &Fields) -> Result<String> { Ok(serde_json::to_string(fields)?) }

pub fn decode_fields(doc_id: &str, s: &str) -> Result<Fields> {
  match serde_json::from_str(s)? {
    serde_json::Value::Object(map) => Ok(map),
    _ => Err(Error::CorruptDocument(doc_id.to_owned())),
  }
}

/// JSON path addressing a top-level field. Field names are validated before
/// they reach here.
pub fn field_path(field: &str) -> String { format!("$.{field}") }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `documents` row.
pub struct RawDocument {
  pub doc_id: String,
  pub data:   String,
}

impl RawDocument {
  pub fn into_document(self) -> Result<Document> {
    let fields = decode_fields(&self.doc_id, &self.data)?;
    Ok(Document::new(DocumentId::from(self.doc_id), fields))
  }
}

/// Raw strings read from an `accounts` row.
pub struct RawAccount {
  pub uid:           String,
  pub display_name:  Option<String>,
  pub password_hash: String,
}
