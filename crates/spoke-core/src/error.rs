//! Error types for `spoke-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid name {0:?}: only ASCII letters, digits and '_' are allowed")]
  InvalidName(String),

  #[error("field {0:?} is reserved")]
  ReservedField(String),

  #[error("document {0:?} is not a JSON object")]
  NotAnObject(String),

  #[error("{0} is required")]
  MissingField(&'static str),

  #[error("unknown category: {0:?}")]
  UnknownCategory(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
