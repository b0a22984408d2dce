//! Ordered collection queries and the snapshots they produce.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  document::{Document, validate_name},
};

/// Sort direction of an ordered query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
  #[default]
  #[serde(rename = "asc", alias = "ascending")]
  Ascending,
  #[serde(rename = "desc", alias = "descending")]
  Descending,
}

impl Direction {
  pub fn as_sql(self) -> &'static str {
    match self {
      Self::Ascending => "ASC",
      Self::Descending => "DESC",
    }
  }
}

impl fmt::Display for Direction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Ascending => "asc",
      Self::Descending => "desc",
    })
  }
}

/// A whole-collection query ordered by one field. Ordering happens in the
/// store; consumers preserve the delivered order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionQuery {
  pub collection: String,
  pub order_by:   String,
  #[serde(default)]
  pub direction:  Direction,
}

impl CollectionQuery {
  pub fn new(
    collection: impl Into<String>,
    order_by: impl Into<String>,
    direction: Direction,
  ) -> Self {
    Self {
      collection: collection.into(),
      order_by: order_by.into(),
      direction,
    }
  }

  pub fn ascending(collection: impl Into<String>, order_by: impl Into<String>) -> Self {
    Self::new(collection, order_by, Direction::Ascending)
  }

  pub fn descending(collection: impl Into<String>, order_by: impl Into<String>) -> Self {
    Self::new(collection, order_by, Direction::Descending)
  }

  pub fn validate(&self) -> Result<()> {
    validate_name(&self.collection)?;
    validate_name(&self.order_by)
  }
}

impl fmt::Display for CollectionQuery {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} by {} {}", self.collection, self.order_by, self.direction)
  }
}

/// The complete, ordered result set of a query at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
  pub documents: Vec<Document>,
  pub read_at:   DateTime<Utc>,
}

impl Snapshot {
  pub fn new(documents: Vec<Document>) -> Self {
    Self { documents, read_at: Utc::now() }
  }

  pub fn len(&self) -> usize { self.documents.len() }

  pub fn is_empty(&self) -> bool { self.documents.is_empty() }
}
