//! Collection-level access rules.
//!
//! A locked collection rejects every read, write and subscription with
//! [`Error::PermissionDenied`]. Everything else is open.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRules {
  #[serde(default)]
  pub locked: BTreeSet<String>,
}

impl AccessRules {
  /// Rules that allow everything.
  pub fn open() -> Self { Self::default() }

  pub fn lock(mut self, collection: impl Into<String>) -> Self {
    self.locked.insert(collection.into());
    self
  }

  pub fn is_locked(&self, collection: &str) -> bool { self.locked.contains(collection) }

  pub(crate) fn check(&self, collection: &str) -> Result<()> {
    if self.is_locked(collection) {
      Err(Error::PermissionDenied(collection.to_owned()))
    } else {
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn locked_collections_are_denied() {
    let rules = AccessRules::open().lock("events");
    assert!(rules.check("adventures").is_ok());
    assert!(matches!(rules.check("events"), Err(Error::PermissionDenied(c)) if c == "events"));
  }

  #[test]
  fn deserialises_from_config_shape() {
    let rules: AccessRules = serde_json::from_str(r#"{"locked":["riders"]}"#).unwrap();
    assert!(rules.is_locked("riders"));
    let empty: AccessRules = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, AccessRules::open());
  }
}
