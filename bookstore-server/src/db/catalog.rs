//! Category and book genre lookups

use shared::models::{BOOK_CATEGORY_NAME, BookGenre, Category};
use sqlx::PgPool;

use super::BoxError;

/// Categories with the book category pinned first, then by name
pub async fn list_categories(pool: &PgPool) -> Result<Vec<Category>, BoxError> {
    let rows: Vec<Category> = sqlx::query_as(
        r#"
        SELECT id, name
        FROM categories
        ORDER BY CASE WHEN name = $1 THEN 0 ELSE 1 END, name ASC
        "#,
    )
    .bind(BOOK_CATEGORY_NAME)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_book_genres(pool: &PgPool) -> Result<Vec<BookGenre>, BoxError> {
    let rows: Vec<BookGenre> =
        sqlx::query_as("SELECT id, name FROM book_genres ORDER BY name ASC")
            .fetch_all(pool)
            .await?;
    Ok(rows)
}

pub async fn category_exists(pool: &PgPool, id: i64) -> Result<bool, BoxError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

pub async fn book_genre_exists(pool: &PgPool, id: i64) -> Result<bool, BoxError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM book_genres WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}
