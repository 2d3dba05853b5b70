//! Category and BookGenre Models

use serde::{Deserialize, Serialize};

/// Name of the category pinned to the top of category listings
pub const BOOK_CATEGORY_NAME: &str = "Sách";

/// Category entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Book genre entity (referenced by book details)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct BookGenre {
    pub id: i64,
    pub name: String,
}
