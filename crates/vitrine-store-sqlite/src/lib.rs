//! SQLite backend for the Vitrine collection manager.
//!
//! One [`SqliteBackend`] stands in for the whole hosted platform: it
//! implements the collection table CRUD, the password/token auth transport,
//! the per-table change feed, and the elevated admin directory. Wraps
//! [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod auth;
mod encode;
mod feed;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteBackend;

#[cfg(test)]
mod tests;
