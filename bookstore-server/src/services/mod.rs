//! Business logic between the HTTP handlers and the database layer

pub mod product_service;
pub mod user_service;
