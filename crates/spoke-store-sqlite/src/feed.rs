//! In-process change feed and the per-subscription pump that turns change
//! notifications into full snapshots.

use std::sync::Arc;

use spoke_core::{
  query::{CollectionQuery, Snapshot},
  store::{DocumentStore, SubscriptionError, SubscriptionSink},
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use crate::SqliteStore;

/// Buffered notifications before a slow subscriber starts lagging. A lagging
/// subscriber simply re-reads.
const FEED_CAPACITY: usize = 256;

/// Announces the name of every collection that just committed a write.
#[derive(Clone)]
pub(crate) struct ChangeFeed {
  tx: broadcast::Sender<Arc<str>>,
}

impl ChangeFeed {
  pub fn new() -> Self {
    let (tx, _) = broadcast::channel(FEED_CAPACITY);
    Self { tx }
  }

  pub fn notify(&self, collection: &str) {
    // No listeners is not an error.
    let _ = self.tx.send(Arc::from(collection));
  }

  pub fn listen(&self) -> broadcast::Receiver<Arc<str>> { self.tx.subscribe() }

  /// Number of live subscription pumps.
  #[cfg(test)]
  pub fn listeners(&self) -> usize { self.tx.receiver_count() }
}

/// Push the initial snapshot, then a fresh one after every change to the
/// collection, until the subscriber goes away or a read fails.
pub(crate) async fn pump(
  store: SqliteStore,
  query: CollectionQuery,
  sink: SubscriptionSink,
  mut changes: broadcast::Receiver<Arc<str>>,
) {
  if !deliver(&store, &query, &sink).await {
    return;
  }

  loop {
    tokio::select! {
      _ = sink.closed() => {
        debug!(%query, "subscriber gone");
        return;
      }
      change = changes.recv() => match change {
        Ok(collection) if &*collection == query.collection.as_str() => {}
        Ok(_) => continue,
        Err(RecvError::Lagged(skipped)) => {
          debug!(%query, skipped, "change feed lagged; re-reading");
        }
        Err(RecvError::Closed) => return,
      },
    }

    if !deliver(&store, &query, &sink).await {
      return;
    }
  }
}

/// Read and deliver one snapshot. Returns `false` when the subscription is
/// over, either because the consumer left or because the read failed.
async fn deliver(store: &SqliteStore, query: &CollectionQuery, sink: &SubscriptionSink) -> bool {
  let event = match store.query(query).await {
    Ok(documents) => Ok(Snapshot::new(documents)),
    Err(e) => Err(SubscriptionError::from_failure(&e)),
  };
  let failed = event.is_err();
  if let Ok(snapshot) = &event {
    debug!(%query, count = snapshot.len(), "pushing snapshot");
  }
  sink.deliver(event).await && !failed
}
