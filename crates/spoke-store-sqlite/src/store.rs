//! [`SqliteStore`]: the SQLite implementation of [`DocumentStore`].

use std::{path::Path, sync::Arc};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use spoke_core::{
  document::{Document, DocumentId, Fields, NewDocument, Patch, validate_name},
  query::CollectionQuery,
  store::{DocumentStore, Subscription},
};
use tracing::debug;

use crate::{
  AccessRules, Error, Result,
  encode::{RawDocument, encode_dt, encode_fields, field_path},
  feed::{ChangeFeed, pump},
  schema::SCHEMA,
};

/// Events buffered per subscription before the pump waits for its consumer.
const SUBSCRIPTION_BUFFER: usize = 16;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Spoke document store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection and change feed are shared.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  feed:            ChangeFeed,
  access:          Arc<AccessRules>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self {
      conn,
      feed: ChangeFeed::new(),
      access: Arc::new(AccessRules::open()),
    })
  }

  /// Replace the access rules for this handle and its future clones.
  pub fn with_access_rules(mut self, rules: AccessRules) -> Self {
    self.access = Arc::new(rules);
    self
  }

  pub fn access_rules(&self) -> &AccessRules { &self.access }

  #[cfg(test)]
  pub(crate) fn listeners(&self) -> usize { self.feed.listeners() }

  fn guard(&self, collection: &str) -> Result<()> {
    validate_name(collection)?;
    self.access.check(collection)
  }
}

/// Read-modify-write of one document inside a transaction. Returns `None`
/// if the document does not exist.
fn patch_in_tx(
  conn: &mut rusqlite::Connection,
  collection: &str,
  doc_id: &str,
  patch: Patch,
) -> Result<Option<Fields>> {
  let tx = conn.transaction()?;
  let data: Option<String> = tx
    .query_row(
      "SELECT data FROM documents WHERE collection = ?1 AND doc_id = ?2",
      rusqlite::params![collection, doc_id],
      |row| row.get(0),
    )
    .optional()?;

  let Some(data) = data else { return Ok(None) };

  let now = Utc::now();
  let mut fields = crate::encode::decode_fields(doc_id, &data)?;
  patch.apply(&mut fields, now)?;

  tx.execute(
    "UPDATE documents SET data = ?3, updated_at = ?4
     WHERE collection = ?1 AND doc_id = ?2",
    rusqlite::params![collection, doc_id, encode_fields(&fields)?, encode_dt(now)],
  )?;
  tx.commit()?;
  Ok(Some(fields))
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  async fn add_document(&self, collection: &str, document: NewDocument) -> Result<Document> {
    self.guard(collection)?;

    let now = Utc::now();
    let fields = document.resolve(now)?;
    let id = DocumentId::generate();

    let collection_str = collection.to_owned();
    let id_str         = id.as_str().to_owned();
    let data_str       = encode_fields(&fields)?;
    let at_str         = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documents (collection, doc_id, data, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?4)",
          rusqlite::params![collection_str, id_str, data_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    debug!(collection, %id, "document added");
    self.feed.notify(collection);
    Ok(Document::new(id, fields))
  }

  async fn update_document(
    &self,
    collection: &str,
    id: &DocumentId,
    patch: Patch,
  ) -> Result<Document> {
    self.guard(collection)?;
    patch.validate()?;

    let collection_str = collection.to_owned();
    let id_str         = id.as_str().to_owned();

    let fields = self
      .conn
      .call(move |conn| Ok(patch_in_tx(conn, &collection_str, &id_str, patch)))
      .await??;

    let Some(fields) = fields else {
      return Err(Error::DocumentNotFound {
        collection: collection.to_owned(),
        id:         id.to_string(),
      });
    };

    debug!(collection, %id, "document updated");
    self.feed.notify(collection);
    Ok(Document::new(id.clone(), fields))
  }

  async fn get_document(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>> {
    self.guard(collection)?;

    let collection_str = collection.to_owned();
    let id_str         = id.as_str().to_owned();

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT doc_id, data FROM documents WHERE collection = ?1 AND doc_id = ?2",
              rusqlite::params![collection_str, id_str],
              |row| Ok(RawDocument { doc_id: row.get(0)?, data: row.get(1)? }),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn query(&self, query: &CollectionQuery) -> Result<Vec<Document>> {
    query.validate()?;
    self.access.check(&query.collection)?;

    let collection_str = query.collection.clone();
    let path_str       = field_path(&query.order_by);
    let direction      = query.direction.as_sql();

    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        // Documents without the order field are not part of the result.
        // Insertion order breaks ties so equal keys stay stable.
        let sql = format!(
          "SELECT doc_id, data FROM documents
           WHERE collection = ?1 AND json_type(data, ?2) IS NOT NULL
           ORDER BY json_extract(data, ?2) {direction}, seq {direction}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![collection_str, path_str], |row| {
            Ok(RawDocument { doc_id: row.get(0)?, data: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }

  async fn subscribe(&self, query: CollectionQuery) -> Result<Subscription> {
    query.validate()?;
    self.access.check(&query.collection)?;

    // Listen before the first read so no write can slip between them.
    let changes = self.feed.listen();
    let (sink, subscription) = Subscription::channel(SUBSCRIPTION_BUFFER);
    debug!(%query, "subscription opened");
    tokio::spawn(pump(self.clone(), query, sink, changes));
    Ok(subscription)
  }
}
