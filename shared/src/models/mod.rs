//! Data models
//!
//! Shared between the server and its API consumers.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64`; timestamps are unix milliseconds.

pub mod category;
pub mod product;
pub mod user;

// Re-exports
pub use category::*;
pub use product::*;
pub use user::*;
