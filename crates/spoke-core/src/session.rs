//! Process-wide authentication state.
//!
//! An [`AuthSession`] is created once at startup, initialised by
//! [`AuthSession::restore`], and dropped on shutdown. Consumers read it through
//! [`AuthSession::current`] and observe changes through
//! [`AuthSession::changes`]; only the session itself mutates the state, in
//! response to provider calls.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::identity::{Identity, IdentityProvider, Session};

/// Lifecycle of the current identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "identity", rename_all = "snake_case")]
pub enum AuthState {
  /// Not yet initialised from the provider.
  Loading,
  SignedOut,
  SignedIn(Identity),
}

impl AuthState {
  pub fn identity(&self) -> Option<&Identity> {
    match self {
      Self::SignedIn(identity) => Some(identity),
      _ => None,
    }
  }
}

/// Returned by [`AuthSession::require`] when no identity is present; callers
/// respond by sending the user through the sign-in flow instead of writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sign-in required")]
pub struct SignInRequired;

/// The current identity of this process, backed by an [`IdentityProvider`].
pub struct AuthSession<P> {
  provider: Arc<P>,
  state:    watch::Sender<AuthState>,
  token:    Mutex<Option<String>>,
}

impl<P: IdentityProvider> AuthSession<P> {
  pub fn new(provider: Arc<P>) -> Self {
    let (state, _) = watch::channel(AuthState::Loading);
    Self { provider, state, token: Mutex::new(None) }
  }

  /// Initialise from a previously issued token, if any. The state leaves
  /// `Loading` even when the provider fails.
  pub async fn restore(&self, token: Option<String>) -> Result<AuthState, P::Error> {
    let resolved = match &token {
      Some(t) => self.provider.resolve(t).await,
      None => Ok(None),
    };
    match resolved {
      Ok(Some(identity)) => {
        self.set_token(token);
        self.publish(AuthState::SignedIn(identity));
      }
      Ok(None) => {
        self.set_token(None);
        self.publish(AuthState::SignedOut);
      }
      Err(e) => {
        self.set_token(None);
        self.publish(AuthState::SignedOut);
        return Err(e);
      }
    }
    Ok(self.state())
  }

  pub async fn sign_up(
    &self,
    email: &str,
    password: &str,
    display_name: &str,
  ) -> Result<Identity, P::Error> {
    let session = self.provider.sign_up(email, password, display_name).await?;
    Ok(self.adopt(session))
  }

  pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, P::Error> {
    let session = self.provider.sign_in(email, password).await?;
    Ok(self.adopt(session))
  }

  /// Sign out. Provider failures are logged; the local state is cleared
  /// regardless.
  pub async fn sign_out(&self) {
    let token = self.token.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(token) = token
      && let Err(e) = self.provider.sign_out(&token).await
    {
      warn!(error = %e, "error signing out");
    }
    self.publish(AuthState::SignedOut);
  }

  pub fn state(&self) -> AuthState { self.state.borrow().clone() }

  /// The single read accessor for the current identity.
  pub fn current(&self) -> Option<Identity> { self.state.borrow().identity().cloned() }

  /// Bearer token of the current session.
  pub fn token(&self) -> Option<String> {
    self.token.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Change notifications; the receiver starts at the current state.
  pub fn changes(&self) -> watch::Receiver<AuthState> { self.state.subscribe() }

  /// Capability check performed before any write.
  pub fn require(&self) -> Result<Identity, SignInRequired> {
    self.current().ok_or(SignInRequired)
  }

  fn adopt(&self, session: Session) -> Identity {
    info!(uid = %session.identity.uid, "signed in");
    self.set_token(Some(session.token));
    self.publish(AuthState::SignedIn(session.identity.clone()));
    session.identity
  }

  fn set_token(&self, token: Option<String>) {
    *self.token.lock().unwrap_or_else(PoisonError::into_inner) = token;
  }

  fn publish(&self, state: AuthState) { self.state.send_replace(state); }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  #[derive(Debug, Error)]
  #[error("{0}")]
  struct FakeError(&'static str);

  /// Accepts one fixed account; tokens are `tok-<uid>`.
  #[derive(Default)]
  struct FakeProvider {
    sessions:      Mutex<HashMap<String, Identity>>,
    fail_sign_out: bool,
  }

  impl IdentityProvider for FakeProvider {
    type Error = FakeError;

    async fn sign_up(&self, email: &str, _: &str, name: &str) -> Result<Session, FakeError> {
      let identity = Identity { uid: email.into(), display_name: Some(name.into()) };
      let token = format!("tok-{email}");
      self.sessions.lock().unwrap().insert(token.clone(), identity.clone());
      Ok(Session { token, identity })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, FakeError> {
      if password != "secret" {
        return Err(FakeError("invalid credentials"));
      }
      self.sign_up(email, password, "Rider").await
    }

    async fn sign_out(&self, token: &str) -> Result<(), FakeError> {
      if self.fail_sign_out {
        return Err(FakeError("network"));
      }
      self.sessions.lock().unwrap().remove(token);
      Ok(())
    }

    async fn resolve(&self, token: &str) -> Result<Option<Identity>, FakeError> {
      Ok(self.sessions.lock().unwrap().get(token).cloned())
    }
  }

  #[tokio::test]
  async fn starts_loading_then_signed_out() {
    let session = AuthSession::new(Arc::new(FakeProvider::default()));
    assert_eq!(session.state(), AuthState::Loading);
    assert_eq!(session.restore(None).await.unwrap(), AuthState::SignedOut);
    assert_eq!(session.require(), Err(SignInRequired));
  }

  #[tokio::test]
  async fn sign_in_publishes_identity() {
    let session = AuthSession::new(Arc::new(FakeProvider::default()));
    session.restore(None).await.unwrap();
    let mut changes = session.changes();

    let identity = session.sign_in("sara@example.com", "secret").await.unwrap();
    assert!(changes.has_changed().unwrap());
    assert_eq!(changes.borrow_and_update().identity(), Some(&identity));
    assert_eq!(session.require().unwrap(), identity);
    assert_eq!(session.token().as_deref(), Some("tok-sara@example.com"));
  }

  #[tokio::test]
  async fn failed_sign_in_leaves_state_alone() {
    let session = AuthSession::new(Arc::new(FakeProvider::default()));
    session.restore(None).await.unwrap();
    assert!(session.sign_in("sara@example.com", "wrong").await.is_err());
    assert_eq!(session.state(), AuthState::SignedOut);
  }

  #[tokio::test]
  async fn restore_resolves_known_token() {
    let provider = Arc::new(FakeProvider::default());
    let token = provider.sign_up("d@example.com", "pw", "Dawit").await.unwrap().token;

    let session = AuthSession::new(provider);
    let state = session.restore(Some(token)).await.unwrap();
    assert_eq!(state.identity().unwrap().author_label(), "Dawit");

    let stale = AuthSession::new(Arc::new(FakeProvider::default()));
    assert_eq!(
      stale.restore(Some("tok-gone".into())).await.unwrap(),
      AuthState::SignedOut
    );
  }

  #[tokio::test]
  async fn sign_out_clears_state_even_when_provider_fails() {
    let provider = Arc::new(FakeProvider { fail_sign_out: true, ..Default::default() });
    let session = AuthSession::new(provider);
    session.sign_up("h@example.com", "pw", "Helen").await.unwrap();

    session.sign_out().await;
    assert_eq!(session.state(), AuthState::SignedOut);
    assert!(session.token().is_none());
  }
}
