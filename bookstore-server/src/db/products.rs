//! Product database operations
//!
//! Reads load the base rows first (one query, with category), then the
//! details and gallery of the whole page with `= ANY($1)` lookups.
//! Writes touch `products`, one detail table and `product_images` in a
//! single transaction.

use std::collections::HashMap;

use rust_decimal::Decimal;
use shared::models::{
    BookDetail, BookGenre, Category, Product, ProductDetail, ProductImage, ProductInput,
    ProductPage, ProductType, StationeryDetail, TrendingProduct,
};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use super::BoxError;

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.price, p.discount, p.stock, p.description, \
     p.cover_image_url, p.dimension, p.type AS product_type, p.category_id, \
     p.created_at, p.updated_at, c.name AS category_name";

const PRODUCT_FROM: &str = " FROM products p LEFT JOIN categories c ON c.id = p.category_id";

/// Discounted price as a SQL expression over `products p`
const FINAL_PRICE_SQL: &str = "(p.price * (100 - p.discount) / 100)";

// ── Query parameters ──

/// Page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub items_per_page: u32,
}

impl Pagination {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_ITEMS_PER_PAGE: u32 = 12;

    pub fn new(page: Option<u32>, items_per_page: Option<u32>) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(Self::DEFAULT_PAGE),
            items_per_page: items_per_page
                .filter(|n| *n > 0)
                .unwrap_or(Self::DEFAULT_ITEMS_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.items_per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)).saturating_mul(i64::from(self.items_per_page))
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Product list filters; every field is optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    /// Name contains (case-insensitive)
    pub search: Option<String>,
    pub product_type: Option<ProductType>,
    pub book_genre_id: Option<i64>,
    /// Book language contains (case-insensitive)
    pub language: Option<String>,
    pub category_id: Option<i64>,
    /// Bounds on the discounted price
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl ProductFilter {
    /// Book-detail filters turn the detail join into an inner join
    fn requires_book_detail(&self) -> bool {
        self.book_genre_id.is_some() || self.language.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductOrder {
    /// Stable insertion order
    Id,
    /// Most recently updated first
    RecentlyUpdated,
}

impl ProductOrder {
    const fn sql(&self) -> &'static str {
        match self {
            Self::Id => " ORDER BY p.id ASC",
            Self::RecentlyUpdated => " ORDER BY p.updated_at DESC, p.id DESC",
        }
    }
}

/// `%text%` with LIKE wildcards in `text` matched literally
pub fn contains_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn push_from_where(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(PRODUCT_FROM);
    if filter.requires_book_detail() {
        qb.push(" INNER JOIN book_details bd ON bd.product_id = p.id AND p.type = 'BOOK'");
    }
    qb.push(" WHERE TRUE");

    if let Some(search) = &filter.search {
        qb.push(" AND p.name ILIKE ")
            .push_bind(contains_pattern(search))
            .push(" ESCAPE '\\'");
    }
    if let Some(product_type) = filter.product_type {
        qb.push(" AND p.type = ").push_bind(product_type.as_str());
    }
    if let Some(category_id) = filter.category_id {
        qb.push(" AND p.category_id = ").push_bind(category_id);
    }
    if let Some(genre_id) = filter.book_genre_id {
        qb.push(" AND bd.book_genre_id = ").push_bind(genre_id);
    }
    if let Some(language) = &filter.language {
        qb.push(" AND bd.language ILIKE ")
            .push_bind(contains_pattern(language))
            .push(" ESCAPE '\\'");
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND ")
            .push(FINAL_PRICE_SQL)
            .push(" >= ")
            .push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND ")
            .push(FINAL_PRICE_SQL)
            .push(" <= ")
            .push_bind(max);
    }
}

fn build_count_query(filter: &ProductFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(DISTINCT p.id)");
    push_from_where(&mut qb, filter);
    qb
}

fn build_page_query(
    filter: &ProductFilter,
    order: ProductOrder,
    page: Pagination,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS}"));
    push_from_where(&mut qb, filter);
    qb.push(order.sql());
    qb.push(" LIMIT ").push_bind(page.limit());
    qb.push(" OFFSET ").push_bind(page.offset());
    qb
}

// ── Rows ──

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    price: Decimal,
    discount: i32,
    stock: i32,
    description: Option<String>,
    cover_image_url: String,
    dimension: Option<String>,
    product_type: String,
    category_id: Option<i64>,
    created_at: i64,
    updated_at: i64,
    category_name: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct TrendingRow {
    #[sqlx(flatten)]
    product: ProductRow,
    sold_quantity: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct BookDetailRow {
    product_id: i64,
    book_genre_id: i64,
    author: String,
    translator: Option<String>,
    language: Option<String>,
    publisher: Option<String>,
    publish_year: Option<i32>,
    page_count: Option<i32>,
    genre_name: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct StationeryDetailRow {
    product_id: i64,
    brand: Option<String>,
    place_production: Option<String>,
    color: Option<String>,
    material: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductImageRow {
    id: i64,
    product_id: i64,
    image_url: String,
}

/// Review and sales aggregates of one product
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ProductStats {
    pub avg_rating: f64,
    pub total_reviews: i64,
    /// Excludes returned orders
    pub total_sold: i64,
}

/// Load details and gallery for `rows`, keeping their order.
/// Only the detail matching each product's type is attached.
async fn attach_includes(pool: &PgPool, rows: Vec<ProductRow>) -> Result<Vec<Product>, BoxError> {
    if rows.is_empty() {
        return Ok(vec![]);
    }
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

    let books: Vec<BookDetailRow> = sqlx::query_as(
        r#"
        SELECT bd.product_id, bd.book_genre_id, bd.author, bd.translator, bd.language,
               bd.publisher, bd.publish_year, bd.page_count, g.name AS genre_name
        FROM book_details bd
        LEFT JOIN book_genres g ON g.id = bd.book_genre_id
        WHERE bd.product_id = ANY($1)
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let stationery: Vec<StationeryDetailRow> = sqlx::query_as(
        r#"
        SELECT product_id, brand, place_production, color, material
        FROM stationery_details
        WHERE product_id = ANY($1)
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let images: Vec<ProductImageRow> = sqlx::query_as(
        "SELECT id, product_id, image_url FROM product_images WHERE product_id = ANY($1) ORDER BY id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut book_map: HashMap<i64, BookDetail> = books
        .into_iter()
        .map(|b| {
            let book_genre = b.genre_name.map(|name| BookGenre {
                id: b.book_genre_id,
                name,
            });
            (
                b.product_id,
                BookDetail {
                    book_genre_id: b.book_genre_id,
                    author: b.author,
                    translator: b.translator,
                    language: b.language,
                    publisher: b.publisher,
                    publish_year: b.publish_year,
                    page_count: b.page_count,
                    book_genre,
                },
            )
        })
        .collect();

    let mut stationery_map: HashMap<i64, StationeryDetail> = stationery
        .into_iter()
        .map(|s| {
            (
                s.product_id,
                StationeryDetail {
                    brand: s.brand,
                    place_production: s.place_production,
                    color: s.color,
                    material: s.material,
                },
            )
        })
        .collect();

    let mut image_map: HashMap<i64, Vec<ProductImage>> = HashMap::new();
    for img in images {
        image_map.entry(img.product_id).or_default().push(ProductImage {
            id: img.id,
            image_url: img.image_url,
        });
    }

    rows.into_iter()
        .map(|r| -> Result<Product, BoxError> {
            let product_type = ProductType::from_db(&r.product_type)
                .ok_or_else(|| format!("Unknown product type '{}' on product {}", r.product_type, r.id))?;
            let category = match (r.category_id, r.category_name) {
                (Some(id), Some(name)) => Some(Category { id, name }),
                _ => None,
            };
            Ok(Product {
                book_detail: match product_type {
                    ProductType::Book => book_map.remove(&r.id),
                    ProductType::Stationery => None,
                },
                stationery_detail: match product_type {
                    ProductType::Stationery => stationery_map.remove(&r.id),
                    ProductType::Book => None,
                },
                product_images: image_map.remove(&r.id).unwrap_or_default(),
                category,
                id: r.id,
                name: r.name,
                price: r.price,
                discount: r.discount,
                stock: r.stock,
                description: r.description,
                cover_image_url: r.cover_image_url,
                dimension: r.dimension,
                product_type,
                category_id: r.category_id,
                created_at: r.created_at,
                updated_at: r.updated_at,
            })
        })
        .collect()
}

// ── Reads ──

/// One page of products plus the total number of matches
pub async fn list_products(
    pool: &PgPool,
    filter: &ProductFilter,
    order: ProductOrder,
    page: Pagination,
) -> Result<ProductPage, BoxError> {
    let count: i64 = build_count_query(filter)
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    let rows: Vec<ProductRow> = build_page_query(filter, order, page)
        .build_query_as::<ProductRow>()
        .fetch_all(pool)
        .await?;

    Ok(ProductPage {
        data: attach_includes(pool, rows).await?,
        count,
    })
}

pub async fn find_product(pool: &PgPool, id: i64) -> Result<Option<Product>, BoxError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS}{PRODUCT_FROM} WHERE p.id = $1");
    let row: Option<ProductRow> = sqlx::query_as(&sql).bind(id).fetch_optional(pool).await?;

    let Some(row) = row else {
        return Ok(None);
    };
    Ok(attach_includes(pool, vec![row]).await?.into_iter().next())
}

pub async fn product_stats(pool: &PgPool, id: i64) -> Result<ProductStats, BoxError> {
    let stats: ProductStats = sqlx::query_as(
        r#"
        SELECT
            (SELECT COALESCE(AVG(r.rating)::float8, 0)
               FROM reviews r WHERE r.product_id = $1) AS avg_rating,
            (SELECT COUNT(*)
               FROM reviews r WHERE r.product_id = $1) AS total_reviews,
            (SELECT COALESCE(SUM(oi.quantity), 0)::bigint
               FROM order_items oi
               JOIN orders o ON o.id = oi.order_id
              WHERE oi.product_id = $1 AND o.status <> 'RETURNED') AS total_sold
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(stats)
}

/// Products ranked by units sold over all orders, unsold products included
pub async fn top_trending(pool: &PgPool, limit: i64) -> Result<Vec<TrendingProduct>, BoxError> {
    let sql = format!(
        r#"
        SELECT {PRODUCT_COLUMNS},
               (SELECT COALESCE(SUM(oi.quantity), 0)::bigint
                  FROM order_items oi
                 WHERE oi.product_id = p.id) AS sold_quantity
        {PRODUCT_FROM}
        ORDER BY sold_quantity DESC, p.id ASC
        LIMIT $1
        "#
    );
    let rows: Vec<TrendingRow> = sqlx::query_as(&sql).bind(limit).fetch_all(pool).await?;

    let sold: Vec<i64> = rows.iter().map(|r| r.sold_quantity).collect();
    let products = attach_includes(pool, rows.into_iter().map(|r| r.product).collect()).await?;

    Ok(products
        .into_iter()
        .zip(sold)
        .map(|(product, sold_quantity)| TrendingProduct {
            product,
            sold_quantity,
        })
        .collect())
}

/// Case-insensitive name check, optionally ignoring one product
pub async fn name_exists(
    pool: &PgPool,
    name: &str,
    exclude_id: Option<i64>,
) -> Result<bool, BoxError> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM products
            WHERE LOWER(name) = LOWER($1) AND ($2::bigint IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(name.trim())
    .bind(exclude_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

// ── Writes ──

/// What happens to the detail rows on update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailChange {
    /// Same type: update (or repair) the detail row in place
    Upsert,
    /// Type switched: drop the old detail, create the new one
    Migrate { from: ProductType, to: ProductType },
}

pub fn plan_detail_change(current: ProductType, next: ProductType) -> DetailChange {
    if current == next {
        DetailChange::Upsert
    } else {
        DetailChange::Migrate {
            from: current,
            to: next,
        }
    }
}

/// Resolved values for a product write
#[derive(Debug, Clone)]
pub struct ProductWrite<'a> {
    pub input: &'a ProductInput,
    pub detail: &'a ProductDetail,
    pub cover_image_url: &'a str,
}

async fn upsert_detail(
    conn: &mut PgConnection,
    product_id: i64,
    detail: &ProductDetail,
) -> Result<(), sqlx::Error> {
    match detail {
        ProductDetail::Book(book) => {
            sqlx::query(
                r#"
                INSERT INTO book_details (
                    product_id, book_genre_id, author, translator, language,
                    publisher, publish_year, page_count
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (product_id) DO UPDATE SET
                    book_genre_id = EXCLUDED.book_genre_id, author = EXCLUDED.author,
                    translator = EXCLUDED.translator, language = EXCLUDED.language,
                    publisher = EXCLUDED.publisher, publish_year = EXCLUDED.publish_year,
                    page_count = EXCLUDED.page_count
                "#,
            )
            .bind(product_id)
            .bind(book.book_genre_id)
            .bind(&book.author)
            .bind(&book.translator)
            .bind(&book.language)
            .bind(&book.publisher)
            .bind(book.publish_year)
            .bind(book.page_count)
            .execute(&mut *conn)
            .await?;
        }
        ProductDetail::Stationery(st) => {
            sqlx::query(
                r#"
                INSERT INTO stationery_details (product_id, brand, place_production, color, material)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (product_id) DO UPDATE SET
                    brand = EXCLUDED.brand, place_production = EXCLUDED.place_production,
                    color = EXCLUDED.color, material = EXCLUDED.material
                "#,
            )
            .bind(product_id)
            .bind(&st.brand)
            .bind(&st.place_production)
            .bind(&st.color)
            .bind(&st.material)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

async fn delete_detail(
    conn: &mut PgConnection,
    product_id: i64,
    product_type: ProductType,
) -> Result<(), sqlx::Error> {
    let sql = match product_type {
        ProductType::Book => "DELETE FROM book_details WHERE product_id = $1",
        ProductType::Stationery => "DELETE FROM stationery_details WHERE product_id = $1",
    };
    sqlx::query(sql).bind(product_id).execute(&mut *conn).await?;
    Ok(())
}

async fn insert_images(
    conn: &mut PgConnection,
    product_id: i64,
    urls: &[String],
    now: i64,
) -> Result<(), sqlx::Error> {
    if urls.is_empty() {
        return Ok(());
    }
    let product_ids: Vec<i64> = urls.iter().map(|_| product_id).collect();
    let created: Vec<i64> = urls.iter().map(|_| now).collect();
    sqlx::query(
        r#"
        INSERT INTO product_images (product_id, image_url, created_at)
        SELECT * FROM UNNEST($1::bigint[], $2::text[], $3::bigint[])
        "#,
    )
    .bind(&product_ids)
    .bind(urls)
    .bind(&created)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Insert product, detail and gallery in one transaction
pub async fn create_product(
    pool: &PgPool,
    id: i64,
    write: &ProductWrite<'_>,
    image_urls: &[String],
    now: i64,
) -> Result<(), BoxError> {
    let input = write.input;
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, price, discount, stock, description, cover_image_url,
            dimension, type, category_id, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
        "#,
    )
    .bind(id)
    .bind(input.name.trim())
    .bind(input.price)
    .bind(input.discount)
    .bind(input.stock)
    .bind(&input.description)
    .bind(write.cover_image_url)
    .bind(&input.dimension)
    .bind(write.detail.product_type().as_str())
    .bind(input.category_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    upsert_detail(&mut *tx, id, write.detail).await?;
    insert_images(&mut *tx, id, image_urls, now).await?;

    tx.commit().await?;
    Ok(())
}

/// Update product and detail in one transaction.
///
/// The stored type is read under a row lock, so the detail plan always
/// matches what is committed. `images`: `Some` replaces the whole gallery,
/// `None` leaves it untouched. Returns `false` when the product is gone.
pub async fn update_product(
    pool: &PgPool,
    id: i64,
    write: &ProductWrite<'_>,
    images: Option<&[String]>,
    now: i64,
) -> Result<bool, BoxError> {
    let input = write.input;
    let next_type = write.detail.product_type();
    let mut tx = pool.begin().await?;

    let stored: Option<String> =
        sqlx::query_scalar("SELECT type FROM products WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some(stored) = stored else {
        tx.rollback().await?;
        return Ok(false);
    };
    let current_type = ProductType::from_db(&stored)
        .ok_or_else(|| format!("Unknown product type '{stored}' on product {id}"))?;

    if let DetailChange::Migrate { from, to } = plan_detail_change(current_type, next_type) {
        tracing::info!(product_id = id, from = %from, to = %to, "Migrating product type");
        delete_detail(&mut *tx, id, from).await?;
    }

    sqlx::query(
        r#"
        UPDATE products SET
            name = $2, price = $3, discount = $4, stock = $5, description = $6,
            cover_image_url = $7, dimension = $8, type = $9, category_id = $10,
            updated_at = $11
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(input.name.trim())
    .bind(input.price)
    .bind(input.discount)
    .bind(input.stock)
    .bind(&input.description)
    .bind(write.cover_image_url)
    .bind(&input.dimension)
    .bind(next_type.as_str())
    .bind(input.category_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    upsert_detail(&mut *tx, id, write.detail).await?;

    if let Some(urls) = images {
        sqlx::query("DELETE FROM product_images WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_images(&mut *tx, id, urls, now).await?;
    }

    tx.commit().await?;
    Ok(true)
}

/// Delete gallery, both details and the product. Returns products rows deleted.
pub async fn delete_product(pool: &PgPool, id: i64) -> Result<u64, BoxError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM product_images WHERE product_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    delete_detail(&mut *tx, id, ProductType::Book).await?;
    delete_detail(&mut *tx, id, ProductType::Stationery).await?;

    let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if deleted == 0 {
        tx.rollback().await?;
        return Ok(0);
    }

    tx.commit().await?;
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_offset() {
        let page = Pagination::default();
        assert_eq!((page.page, page.items_per_page), (1, 12));
        assert_eq!(page.offset(), 0);

        let page = Pagination::new(Some(3), Some(20));
        assert_eq!(page.limit(), 20);
        assert_eq!(page.offset(), 40);

        // Zero falls back to the defaults
        assert_eq!(Pagination::new(Some(0), Some(0)), Pagination::default());

        let page = Pagination::new(Some(u32::MAX), Some(u32::MAX));
        assert!(page.offset() > 0);
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("harry"), "%harry%");
        assert_eq!(contains_pattern("100%_off"), "%100\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_unfiltered_query_has_no_binds_before_paging() {
        let qb = build_page_query(
            &ProductFilter::default(),
            ProductOrder::Id,
            Pagination::default(),
        );
        let sql = qb.sql();
        assert!(sql.starts_with("SELECT p.id, p.name"));
        assert!(sql.contains("LEFT JOIN categories c ON c.id = p.category_id WHERE TRUE ORDER BY p.id ASC"));
        assert!(sql.ends_with(" LIMIT $1 OFFSET $2"));
        assert!(!sql.contains("book_details"));
    }

    #[test]
    fn test_search_query_binds_every_filter() {
        let filter = ProductFilter {
            search: Some("tô hoài".into()),
            product_type: Some(ProductType::Book),
            book_genre_id: Some(4),
            language: Some("Việt".into()),
            category_id: Some(1),
            min_price: Some(Decimal::from(10_000)),
            max_price: Some(Decimal::from(90_000)),
        };
        let qb = build_page_query(&filter, ProductOrder::RecentlyUpdated, Pagination::default());
        let sql = qb.sql();

        assert!(sql.contains("INNER JOIN book_details bd ON bd.product_id = p.id AND p.type = 'BOOK'"));
        assert!(sql.contains("p.name ILIKE $1 ESCAPE '\\'"));
        assert!(sql.contains("p.type = $2"));
        assert!(sql.contains("p.category_id = $3"));
        assert!(sql.contains("bd.book_genre_id = $4"));
        assert!(sql.contains("bd.language ILIKE $5"));
        assert!(sql.contains("(p.price * (100 - p.discount) / 100) >= $6"));
        assert!(sql.contains("(p.price * (100 - p.discount) / 100) <= $7"));
        assert!(sql.contains("ORDER BY p.updated_at DESC"));
        assert!(sql.ends_with("LIMIT $8 OFFSET $9"));
    }

    #[test]
    fn test_count_query_counts_distinct_products() {
        let filter = ProductFilter {
            language: Some("Anh".into()),
            ..Default::default()
        };
        let qb = build_count_query(&filter);
        let sql = qb.sql();
        assert!(sql.starts_with("SELECT COUNT(DISTINCT p.id) FROM products p"));
        assert!(sql.contains("INNER JOIN book_details"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn test_price_bounds_alone_do_not_join_details() {
        let filter = ProductFilter {
            min_price: Some(Decimal::ZERO),
            ..Default::default()
        };
        assert!(!filter.requires_book_detail());
        assert!(!build_count_query(&filter).sql().contains("book_details"));
    }

    #[test]
    fn test_plan_detail_change() {
        assert_eq!(
            plan_detail_change(ProductType::Book, ProductType::Book),
            DetailChange::Upsert
        );
        assert_eq!(
            plan_detail_change(ProductType::Book, ProductType::Stationery),
            DetailChange::Migrate {
                from: ProductType::Book,
                to: ProductType::Stationery
            }
        );
    }

    // ── Against a migrated database ──

    async fn seed_refs(pool: &PgPool) -> (i64, i64) {
        let category_id: i64 =
            sqlx::query_scalar("INSERT INTO categories (name) VALUES ('Kiểm thử') RETURNING id")
                .fetch_one(pool)
                .await
                .unwrap();
        let genre_id: i64 =
            sqlx::query_scalar("INSERT INTO book_genres (name) VALUES ('Thiếu nhi') RETURNING id")
                .fetch_one(pool)
                .await
                .unwrap();
        (category_id, genre_id)
    }

    fn book_input(name: &str, category_id: i64, genre_id: i64) -> ProductInput {
        serde_json::from_value(serde_json::json!({
            "categoryId": category_id,
            "name": name,
            "price": 120000,
            "discount": 10,
            "stock": 5,
            "type": "BOOK",
            "bookDetail": { "bookGenreId": genre_id, "author": "Tô Hoài", "language": "Việt" }
        }))
        .unwrap()
    }

    fn stationery_input(name: &str, category_id: i64) -> ProductInput {
        serde_json::from_value(serde_json::json!({
            "categoryId": category_id,
            "name": name,
            "price": 5000,
            "type": "STATIONERY",
            "stationeryDetail": { "brand": "Thiên Long", "color": "Xanh" }
        }))
        .unwrap()
    }

    async fn insert(pool: &PgPool, id: i64, input: &ProductInput, images: &[String]) {
        let detail = input.detail().unwrap();
        let write = ProductWrite {
            input,
            detail: &detail,
            cover_image_url: "/uploads/coverImages/cover.jpg",
        };
        create_product(pool, id, &write, images, 1_000).await.unwrap();
    }

    async fn update(
        pool: &PgPool,
        id: i64,
        input: &ProductInput,
        images: Option<&[String]>,
    ) -> bool {
        let detail = input.detail().unwrap();
        let write = ProductWrite {
            input,
            detail: &detail,
            cover_image_url: "/uploads/coverImages/cover.jpg",
        };
        update_product(pool, id, &write, images, 2_000).await.unwrap()
    }

    async fn count_rows(pool: &PgPool, table: &str, id: i64) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE product_id = $1"))
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn detail_counts(pool: &PgPool, id: i64) -> (i64, i64) {
        (
            count_rows(pool, "book_details", id).await,
            count_rows(pool, "stationery_details", id).await,
        )
    }

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|u| u.to_string()).collect()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_type_switch_moves_detail_row(pool: PgPool) {
        let (category_id, genre_id) = seed_refs(&pool).await;
        insert(&pool, 10, &book_input("Dế Mèn", category_id, genre_id), &[]).await;
        assert_eq!(detail_counts(&pool, 10).await, (1, 0));

        assert!(update(&pool, 10, &stationery_input("Dế Mèn", category_id), None).await);
        assert_eq!(detail_counts(&pool, 10).await, (0, 1));

        let product = find_product(&pool, 10).await.unwrap().unwrap();
        assert_eq!(product.product_type, ProductType::Stationery);
        assert!(product.book_detail.is_none());
        assert_eq!(
            product.stationery_detail.unwrap().brand.as_deref(),
            Some("Thiên Long")
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_update_plans_from_stored_type(pool: PgPool) {
        let (category_id, genre_id) = seed_refs(&pool).await;
        let book = book_input("Đất Rừng Phương Nam", category_id, genre_id);
        insert(&pool, 11, &book, &[]).await;

        // A caller that last saw BOOK writes BOOK after another switched to STATIONERY
        assert!(update(&pool, 11, &stationery_input("Đất Rừng Phương Nam", category_id), None).await);
        assert!(update(&pool, 11, &book, None).await);

        assert_eq!(detail_counts(&pool, 11).await, (1, 0));
        let product = find_product(&pool, 11).await.unwrap().unwrap();
        assert_eq!(product.product_type, ProductType::Book);
        let detail = product.book_detail.unwrap();
        assert_eq!(detail.author, "Tô Hoài");
        assert_eq!(detail.book_genre.unwrap().name, "Thiếu nhi");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_update_missing_product_reports_false(pool: PgPool) {
        let (category_id, _) = seed_refs(&pool).await;
        assert!(!update(&pool, 404, &stationery_input("Bút chì", category_id), None).await);
        assert_eq!(detail_counts(&pool, 404).await, (0, 0));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_gallery_kept_or_replaced(pool: PgPool) {
        let (category_id, _) = seed_refs(&pool).await;
        let input = stationery_input("Vở kẻ ngang", category_id);
        insert(&pool, 12, &input, &urls(&["/a.jpg", "/b.jpg"])).await;

        assert!(update(&pool, 12, &input, None).await);
        let images = find_product(&pool, 12).await.unwrap().unwrap().product_images;
        let kept: Vec<&str> = images.iter().map(|i| i.image_url.as_str()).collect();
        assert_eq!(kept, vec!["/a.jpg", "/b.jpg"]);

        let replacement = urls(&["/c.jpg"]);
        assert!(update(&pool, 12, &input, Some(&replacement)).await);
        let images = find_product(&pool, 12).await.unwrap().unwrap().product_images;
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].image_url, "/c.jpg");

        assert!(update(&pool, 12, &input, Some(&[])).await);
        assert_eq!(count_rows(&pool, "product_images", 12).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_delete_removes_details_and_gallery(pool: PgPool) {
        let (category_id, genre_id) = seed_refs(&pool).await;
        insert(
            &pool,
            13,
            &book_input("Tắt Đèn", category_id, genre_id),
            &urls(&["/a.jpg", "/b.jpg"]),
        )
        .await;

        assert_eq!(delete_product(&pool, 13).await.unwrap(), 1);
        assert_eq!(detail_counts(&pool, 13).await, (0, 0));
        assert_eq!(count_rows(&pool, "product_images", 13).await, 0);
        assert!(find_product(&pool, 13).await.unwrap().is_none());

        assert_eq!(delete_product(&pool, 13).await.unwrap(), 0);
    }

    async fn add_order(pool: &PgPool, product_id: i64, status: &str, quantity: i32) {
        let order_id: i64 =
            sqlx::query_scalar("INSERT INTO orders (status, created_at) VALUES ($1, 0) RETURNING id")
                .bind(status)
                .fetch_one(pool)
                .await
                .unwrap();
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, price) VALUES ($1, $2, $3, 1000)",
        )
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .execute(pool)
        .await
        .unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_stats_skip_returned_orders_but_trending_counts_all(pool: PgPool) {
        let (category_id, genre_id) = seed_refs(&pool).await;
        insert(&pool, 20, &book_input("Số Đỏ", category_id, genre_id), &[]).await;
        insert(&pool, 21, &stationery_input("Thước kẻ", category_id), &[]).await;

        add_order(&pool, 20, "DELIVERED", 3).await;
        add_order(&pool, 20, "RETURNED", 2).await;
        for rating in [4_i16, 5] {
            sqlx::query("INSERT INTO reviews (product_id, rating, created_at) VALUES (20, $1, 0)")
                .bind(rating)
                .execute(&pool)
                .await
                .unwrap();
        }

        let stats = product_stats(&pool, 20).await.unwrap();
        assert_eq!(stats.total_sold, 3);
        assert_eq!(stats.total_reviews, 2);
        assert!((stats.avg_rating - 4.5).abs() < f64::EPSILON);

        let empty = product_stats(&pool, 21).await.unwrap();
        assert_eq!((empty.avg_rating, empty.total_reviews, empty.total_sold), (0.0, 0, 0));

        let trending = top_trending(&pool, 8).await.unwrap();
        let ranked: Vec<(i64, i64)> = trending
            .iter()
            .map(|t| (t.product.id, t.sold_quantity))
            .collect();
        assert_eq!(ranked, vec![(20, 5), (21, 0)]);
    }
}
