//! Core types and trait definitions for the Spoke community store.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the document model, the [`store::DocumentStore`] and
//! [`identity::IdentityProvider`] abstractions, and the client-side layer that
//! every list page reuses: the [`live::LiveCollection`] mirror and the
//! [`mutation::Mutations`] write-through helpers.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod document;
pub mod error;
pub mod filter;
pub mod identity;
pub mod live;
pub mod mutation;
pub mod query;
pub mod seed;
pub mod session;
pub mod store;

pub use error::{Error, Result};
