//! Error type for `spoke-store-sqlite`.

use spoke_core::store::{Classify, FailureKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] spoke_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// The collection is locked by the store's access rules.
  #[error("missing or insufficient permissions for collection {0:?}")]
  PermissionDenied(String),

  #[error("document {collection}/{id} not found")]
  DocumentNotFound { collection: String, id: String },

  #[error("stored document {0} is not a JSON object")]
  CorruptDocument(String),

  // ── Accounts ──────────────────────────────────────────────────────────────

  #[error("the email address is badly formatted")]
  InvalidEmail,

  #[error("password should be at least {0} characters")]
  WeakPassword(usize),

  #[error("the email address is already in use by another account")]
  EmailInUse,

  #[error("invalid email or password")]
  InvalidCredentials,

  #[error("password hashing failed: {0}")]
  PasswordHash(String),
}

impl Classify for Error {
  fn kind(&self) -> FailureKind {
    match self {
      Error::PermissionDenied(_) | Error::InvalidCredentials => FailureKind::PermissionDenied,
      Error::DocumentNotFound { .. } => FailureKind::NotFound,
      Error::Core(_)
      | Error::InvalidEmail
      | Error::WeakPassword(_)
      | Error::EmailInUse => FailureKind::InvalidArgument,
      Error::Database(_) | Error::Sqlite(_) => FailureKind::Unavailable,
      Error::Json(_)
      | Error::CorruptDocument(_)
      | Error::PasswordHash(_) => FailureKind::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
