//! Conversation search for chat history
//!
//! Keyword search over stored conversations backed by an
//! Elasticsearch-compatible document store, exposed over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod search;

pub use error::{AppError, Result};
