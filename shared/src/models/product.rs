//! Product Model
//!
//! A product is either a book or a stationery item. The common columns live
//! in `products`; the type-specific columns live in exactly one of
//! `book_details` / `stationery_details`, keyed by product id.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::category::{BookGenre, Category};
use crate::error::{AppError, ErrorCode};

/// Product type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Book,
    Stationery,
}

impl ProductType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Book => "BOOK",
            Self::Stationery => "STATIONERY",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "BOOK" => Some(Self::Book),
            "STATIONERY" => Some(Self::Stationery),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Book-specific attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetail {
    pub book_genre_id: i64,
    pub author: String,
    #[serde(default)]
    pub translator: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub publish_year: Option<i32>,
    #[serde(default)]
    pub page_count: Option<i32>,
    /// Genre name, filled on every read; ignored on input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_genre: Option<BookGenre>,
}

/// Stationery-specific attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationeryDetail {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub place_production: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
}

/// Type-specific detail, guaranteed to match the product type
#[derive(Debug, Clone, PartialEq)]
pub enum ProductDetail {
    Book(BookDetail),
    Stationery(StationeryDetail),
}

impl ProductDetail {
    pub fn product_type(&self) -> ProductType {
        match self {
            Self::Book(_) => ProductType::Book,
            Self::Stationery(_) => ProductType::Stationery,
        }
    }
}

/// Gallery image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProductImage {
    pub id: i64,
    pub image_url: String,
}

/// Product entity with its includes (category, detail, gallery)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    /// Discount in percent (0-100)
    pub discount: i32,
    pub stock: i32,
    pub description: Option<String>,
    pub cover_image_url: String,
    pub dimension: Option<String>,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub category_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,

    // -- Includes --
    pub category: Option<Category>,
    pub book_detail: Option<BookDetail>,
    pub stationery_detail: Option<StationeryDetail>,
    #[serde(default)]
    pub product_images: Vec<ProductImage>,
}

/// Product detail view with review and sales aggregates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductWithStats {
    #[serde(flatten)]
    pub product: Product,
    pub avg_rating: f64,
    pub total_reviews: i64,
    /// Units sold, excluding returned orders
    pub total_sold: i64,
}

/// Trending list entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingProduct {
    #[serde(flatten)]
    pub product: Product,
    pub sold_quantity: i64,
}

/// Paginated product list: `{ data, count }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    pub data: Vec<Product>,
    /// Number of distinct products matching the filter (all pages)
    pub count: i64,
}

/// Gallery entry in a create/update payload: a bare URL or `{ imageUrl }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    Url(String),
    Object {
        #[serde(rename = "imageUrl", default)]
        image_url: Option<String>,
    },
}

impl ImageRef {
    /// The URL, if present and non-empty
    pub fn url(&self) -> Option<&str> {
        let url = match self {
            Self::Url(url) => Some(url.as_str()),
            Self::Object { image_url } => image_url.as_deref(),
        };
        url.filter(|u| !u.trim().is_empty())
    }
}

/// Create/update product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub category_id: i64,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount: i32,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dimension: Option<String>,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    #[serde(default)]
    pub book_detail: Option<BookDetail>,
    #[serde(default)]
    pub stationery_detail: Option<StationeryDetail>,
    /// Gallery URLs; `None` means "not sent" (keep images on update)
    #[serde(default)]
    pub product_images: Option<Vec<ImageRef>>,
}

impl ProductInput {
    /// The detail matching `product_type`; the other detail is ignored
    pub fn detail(&self) -> Result<ProductDetail, AppError> {
        match self.product_type {
            ProductType::Book => self
                .book_detail
                .clone()
                .map(ProductDetail::Book)
                .ok_or_else(|| {
                    AppError::new(ErrorCode::ProductDetailMissing)
                        .with_detail("field", "bookDetail")
                }),
            ProductType::Stationery => self
                .stationery_detail
                .clone()
                .map(ProductDetail::Stationery)
                .ok_or_else(|| {
                    AppError::new(ErrorCode::ProductDetailMissing)
                        .with_detail("field", "stationeryDetail")
                }),
        }
    }

    /// Gallery URLs sent in the payload, empty entries dropped
    pub fn image_urls(&self) -> Option<Vec<String>> {
        self.product_images.as_ref().map(|images| {
            images
                .iter()
                .filter_map(|img| img.url().map(str::to_string))
                .collect()
        })
    }
}
