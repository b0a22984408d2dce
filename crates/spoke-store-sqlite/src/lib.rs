//! SQLite backend for the Spoke community store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Documents live as JSON objects per
//! named collection; every committed write is announced on an in-process
//! change feed that drives standing subscriptions.

mod encode;
mod feed;
mod identity;
mod schema;
mod store;

pub mod access;
pub mod error;

pub use access::AccessRules;
pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
