//! Live collection views: a local, read-only mirror of an ordered query kept
//! current by a standing subscription.
//!
//! A [`LiveCollection`] owns exactly one subscription for its whole lifetime.
//! Every snapshot the store pushes replaces the mirror wholesale; there is no
//! incremental merge. Readers get a cheap, restartable handle to the current
//! mirror ([`Mirror`]) and may project it with [`crate::filter::Filter`]
//! without touching the subscription.
//!
//! The subscription is released when the view is closed or dropped, on every
//! exit path.

use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
  document::Document,
  query::CollectionQuery,
  store::{DocumentStore, FailureKind, Subscription, SubscriptionError},
};

/// A point-in-time copy of the query result, in server order. Cloning shares
/// the underlying slice; iterating does not consume it.
pub type Mirror = Arc<[Document]>;

/// Observable state of a view.
#[derive(Debug, Clone)]
pub struct ViewState {
  pub items:    Mirror,
  /// `true` from open until the first snapshot or error; never `true` again.
  pub loading:  bool,
  /// Set when the subscription failed. The view stops updating afterwards.
  pub error:    Option<SubscriptionError>,
  /// Number of snapshots applied so far.
  pub revision: u64,
}

impl ViewState {
  fn opening() -> Self {
    Self {
      items:    Arc::from(Vec::new()),
      loading:  true,
      error:    None,
      revision: 0,
    }
  }

  fn failed(error: SubscriptionError) -> Self {
    Self { loading: false, error: Some(error), ..Self::opening() }
  }
}

/// A mirror of one ordered collection query.
pub struct LiveCollection {
  query: CollectionQuery,
  state: watch::Receiver<ViewState>,
  pump:  Option<JoinHandle<()>>,
}

impl LiveCollection {
  /// Subscribe to `query` and start mirroring it.
  ///
  /// Never fails: a rejected subscription is reported through
  /// [`LiveCollection::error`], with `loading` already resolved to `false`.
  pub async fn open<S: DocumentStore>(store: &S, query: CollectionQuery) -> Self {
    match store.subscribe(query.clone()).await {
      Ok(subscription) => {
        let (tx, rx) = watch::channel(ViewState::opening());
        let pump = tokio::spawn(pump(subscription, tx, query.clone()));
        debug!(%query, "live view opened");
        Self { query, state: rx, pump: Some(pump) }
      }
      Err(e) => {
        let error = SubscriptionError::from_failure(&e);
        warn!(%query, %error, "subscription rejected");
        let (_tx, rx) = watch::channel(ViewState::failed(error));
        Self { query, state: rx, pump: None }
      }
    }
  }

  pub fn query(&self) -> &CollectionQuery { &self.query }

  /// The current mirror.
  pub fn items(&self) -> Mirror { self.state.borrow().items.clone() }

  pub fn loading(&self) -> bool { self.state.borrow().loading }

  pub fn error(&self) -> Option<SubscriptionError> { self.state.borrow().error.clone() }

  pub fn state(&self) -> ViewState { self.state.borrow().clone() }

  /// A receiver that observes every state change of this view.
  pub fn watch(&self) -> watch::Receiver<ViewState> { self.state.clone() }

  /// Wait for the next state change. Returns `None` once the view can no
  /// longer change (closed, failed, or the store ended the subscription).
  pub async fn changed(&mut self) -> Option<ViewState> {
    self.state.changed().await.ok()?;
    Some(self.state.borrow_and_update().clone())
  }

  /// Wait until the first snapshot or error has been applied.
  pub async fn loaded(&mut self) -> ViewState {
    let waited = self.state.wait_for(|s| !s.loading).await.map(|s| s.clone());
    match waited {
      Ok(state) => state,
      Err(_) => self.state.borrow().clone(),
    }
  }

  /// Release the subscription. Equivalent to dropping the view.
  pub fn close(mut self) { self.release(); }

  fn release(&mut self) {
    if let Some(pump) = self.pump.take() {
      pump.abort();
      debug!(query = %self.query, "live view closed");
    }
  }
}

impl Drop for LiveCollection {
  fn drop(&mut self) { self.release(); }
}

/// Apply subscription events to the mirror in delivery order.
async fn pump(
  mut subscription: Subscription,
  tx: watch::Sender<ViewState>,
  query: CollectionQuery,
) {
  loop {
    let Some(event) = subscription.next().await else {
      if tx.borrow().loading {
        tx.send_modify(|s| {
          s.loading = false;
          s.error = Some(SubscriptionError::new(
            FailureKind::Unavailable,
            "subscription ended before the first snapshot",
          ));
        });
      }
      return;
    };

    match event {
      Ok(snapshot) => {
        let count = snapshot.documents.len();
        tx.send_modify(|s| {
          s.items = Arc::from(snapshot.documents);
          s.loading = false;
          s.revision += 1;
        });
        debug!(%query, count, "snapshot applied");
      }
      Err(error) => {
        warn!(%query, %error, "subscription failed");
        tx.send_modify(|s| {
          s.loading = false;
          s.error = Some(error);
        });
        return;
      }
    }
  }
}
