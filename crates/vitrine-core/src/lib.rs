//! Core types and trait definitions for the Vitrine collection manager.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod artifact;
pub mod auth;
pub mod error;
pub mod event;
pub mod profile;
pub mod report;
pub mod role;
pub mod store;

pub use error::{ClassifyError, Error, ErrorClass, Result};
