//! Database access layer

pub mod catalog;
pub mod products;
pub mod users;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
