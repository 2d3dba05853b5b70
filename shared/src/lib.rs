//! Shared types for the bookstore backend
//!
//! Error types, catalog and user models, and small utilities used by the
//! server and by API consumers written in Rust.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
