//! Identities and the `IdentityProvider` trait.
//!
//! Sign-up, sign-in and token verification are delegated entirely to the
//! provider; this crate only consumes the resulting [`Identity`].

use std::future::Future;

use serde::{Deserialize, Serialize};

/// Author label used when an identity has no display name.
pub const ANONYMOUS: &str = "Anonymous";

/// The authenticated user's public identifier and display name. Read-only to
/// everything but the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
  pub uid:          String,
  pub display_name: Option<String>,
}

impl Identity {
  /// The name shown as author on items and comments.
  pub fn author_label(&self) -> &str {
    self
      .display_name
      .as_deref()
      .map(str::trim)
      .filter(|n| !n.is_empty())
      .unwrap_or(ANONYMOUS)
  }
}

/// A signed-in identity plus the bearer token that proves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub token:    String,
  pub identity: Identity,
}

/// Abstraction over an email/password identity provider.
pub trait IdentityProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create an account and sign it in.
  fn sign_up<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
    display_name: &'a str,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + 'a;

  fn sign_in<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + 'a;

  /// Invalidate `token`. Unknown tokens are not an error.
  fn sign_out<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The identity `token` belongs to, or `None` if it is not a live session.
  fn resolve<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn author_label_falls_back_to_anonymous() {
    let named = Identity { uid: "u1".into(), display_name: Some("Dawit Abebe".into()) };
    let blank = Identity { uid: "u2".into(), display_name: Some("  ".into()) };
    let none = Identity { uid: "u3".into(), display_name: None };
    assert_eq!(named.author_label(), "Dawit Abebe");
    assert_eq!(blank.author_label(), ANONYMOUS);
    assert_eq!(none.author_label(), ANONYMOUS);
  }
}
