//! Product catalog endpoints

use axum::extract::{Multipart, Path, Query, State};
use axum::{Json, http::StatusCode};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    BookGenre, Category, Product, ProductInput, ProductPage, ProductWithStats, TrendingProduct,
};

use super::ApiResult;
use super::multipart::read_form;
use crate::services::product_service::{self, ProductUploads};
use crate::state::AppState;
use crate::validation::{ListQuery, SearchQuery};

/// Form field carrying the product JSON
const DATA_FIELD: &str = "data";
const COVER_FIELD: &str = "coverImageUrl";
const GALLERY_FIELD: &str = "productImages";

/// Max files per form field
const PRODUCT_FILE_FIELDS: &[(&str, usize)] = &[(COVER_FIELD, 1), (GALLERY_FIELD, 10)];

async fn read_product_form(multipart: Multipart) -> Result<(ProductInput, ProductUploads), AppError> {
    let mut form = read_form(multipart, PRODUCT_FILE_FIELDS).await?;

    let data = form.text(DATA_FIELD).ok_or_else(|| {
        AppError::with_message(ErrorCode::RequiredField, "Form field 'data' is required")
            .with_detail("field", DATA_FIELD)
    })?;
    let input: ProductInput = serde_json::from_str(data).map_err(|e| {
        AppError::with_message(ErrorCode::InvalidFormat, format!("Invalid product data: {e}"))
            .with_detail("field", DATA_FIELD)
    })?;

    let uploads = ProductUploads {
        cover: form.take_file(COVER_FIELD),
        gallery: form.take_files(GALLERY_FIELD),
    };
    Ok((input, uploads))
}

/// GET /v1/products
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<ProductPage> {
    let (filter, page) = query.into_parts();
    Ok(Json(product_service::get_products(&state, &filter, page).await?))
}

/// GET /v1/products/search
pub async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<ProductPage> {
    let (filter, page) = query.validate()?;
    Ok(Json(
        product_service::search_and_filter_products(&state, &filter, page).await?,
    ))
}

/// GET /v1/products/trend-products
pub async fn trending_products(State(state): State<AppState>) -> ApiResult<Vec<TrendingProduct>> {
    Ok(Json(product_service::get_top_trending_products(&state).await?))
}

/// GET /v1/products/categories
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    Ok(Json(product_service::get_categories(&state).await?))
}

/// GET /v1/products/book-genres
pub async fn list_book_genres(State(state): State<AppState>) -> ApiResult<Vec<BookGenre>> {
    Ok(Json(product_service::get_book_genres(&state).await?))
}

/// GET /v1/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ProductWithStats> {
    Ok(Json(product_service::get_product_by_id(&state, id).await?))
}

/// POST /v1/products
pub async fn create_product(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let (input, uploads) = read_product_form(multipart).await?;
    let product = product_service::create(&state, input, uploads).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /v1/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Product> {
    let (input, uploads) = read_product_form(multipart).await?;
    Ok(Json(product_service::update(&state, id, input, uploads).await?))
}

/// DELETE /v1/products/{id}
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Product> {
    Ok(Json(product_service::delete_by_id(&state, id).await?))
}
