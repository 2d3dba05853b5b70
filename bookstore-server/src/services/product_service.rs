//! Product service: catalog reads with aggregates, and product writes that
//! coordinate image uploads with the transactional DB layer

use shared::error::{AppError, ErrorCode};
use shared::models::{
    BookGenre, Category, Product, ProductDetail, ProductInput, ProductPage, ProductWithStats,
    TrendingProduct,
};
use shared::util::{now_millis, snowflake_id};

use crate::db::catalog;
use crate::db::products::{self, Pagination, ProductFilter, ProductOrder, ProductWrite};
use crate::error::ServiceResult;
use crate::state::AppState;
use crate::storage::{ImageFolder, ImageStore, UploadFile};
use crate::validation::validate_product_input;

/// Size of the trending list
pub const TRENDING_LIMIT: i64 = 8;

/// Files received with a create/update form
#[derive(Debug, Default)]
pub struct ProductUploads {
    pub cover: Option<UploadFile>,
    pub gallery: Vec<UploadFile>,
}

pub async fn get_products(
    state: &AppState,
    filter: &ProductFilter,
    page: Pagination,
) -> ServiceResult<ProductPage> {
    Ok(products::list_products(&state.pool, filter, ProductOrder::Id, page).await?)
}

pub async fn get_product_by_id(state: &AppState, id: i64) -> ServiceResult<ProductWithStats> {
    let product = find_or_404(state, id).await?;
    let stats = products::product_stats(&state.pool, id).await?;
    Ok(ProductWithStats {
        product,
        avg_rating: stats.avg_rating,
        total_reviews: stats.total_reviews,
        total_sold: stats.total_sold,
    })
}

pub async fn search_and_filter_products(
    state: &AppState,
    filter: &ProductFilter,
    page: Pagination,
) -> ServiceResult<ProductPage> {
    Ok(products::list_products(&state.pool, filter, ProductOrder::RecentlyUpdated, page).await?)
}

pub async fn get_top_trending_products(state: &AppState) -> ServiceResult<Vec<TrendingProduct>> {
    Ok(products::top_trending(&state.pool, TRENDING_LIMIT).await?)
}

pub async fn get_categories(state: &AppState) -> ServiceResult<Vec<Category>> {
    Ok(catalog::list_categories(&state.pool).await?)
}

pub async fn get_book_genres(state: &AppState) -> ServiceResult<Vec<BookGenre>> {
    Ok(catalog::list_book_genres(&state.pool).await?)
}

pub async fn create(
    state: &AppState,
    input: ProductInput,
    uploads: ProductUploads,
) -> ServiceResult<Product> {
    let detail = validate_product_input(&input)?;

    if products::name_exists(&state.pool, &input.name, None).await? {
        return Err(AppError::new(ErrorCode::ProductAlreadyExists)
            .with_detail("name", input.name.trim())
            .into());
    }
    ensure_references(state, &input, &detail).await?;

    let cover = uploads
        .cover
        .ok_or_else(|| AppError::new(ErrorCode::CoverImageRequired))?;
    let cover_image_url = state
        .images
        .upload(&cover, ImageFolder::CoverImages)
        .await?
        .file_url;

    let uploaded = upload_gallery(state.images.as_ref(), &uploads.gallery).await?;
    let image_urls = create_gallery(uploaded, input.image_urls());

    let id = snowflake_id();
    let write = ProductWrite {
        input: &input,
        detail: &detail,
        cover_image_url: &cover_image_url,
    };
    products::create_product(&state.pool, id, &write, &image_urls, now_millis()).await?;

    tracing::info!(
        product_id = id,
        product_type = %detail.product_type(),
        images = image_urls.len(),
        "Product created"
    );

    find_or_404(state, id).await
}

pub async fn update(
    state: &AppState,
    id: i64,
    input: ProductInput,
    uploads: ProductUploads,
) -> ServiceResult<Product> {
    let existing = find_or_404(state, id).await?;
    let detail = validate_product_input(&input)?;

    if products::name_exists(&state.pool, &input.name, Some(id)).await? {
        return Err(AppError::new(ErrorCode::ProductAlreadyExists)
            .with_detail("name", input.name.trim())
            .into());
    }
    ensure_references(state, &input, &detail).await?;

    let cover_image_url = match &uploads.cover {
        Some(file) => {
            state
                .images
                .upload(file, ImageFolder::CoverImages)
                .await?
                .file_url
        }
        None => existing.cover_image_url,
    };

    let uploaded = upload_gallery(state.images.as_ref(), &uploads.gallery).await?;
    let images = merge_gallery(uploaded, input.image_urls());

    let write = ProductWrite {
        input: &input,
        detail: &detail,
        cover_image_url: &cover_image_url,
    };
    let updated =
        products::update_product(&state.pool, id, &write, images.as_deref(), now_millis())
            .await?;
    if !updated {
        return Err(AppError::new(ErrorCode::ProductNotFound)
            .with_detail("id", id)
            .into());
    }

    tracing::info!(
        product_id = id,
        product_type = %detail.product_type(),
        images_replaced = images.is_some(),
        "Product updated"
    );

    find_or_404(state, id).await
}

/// Returns the product as it was before deletion
pub async fn delete_by_id(state: &AppState, id: i64) -> ServiceResult<Product> {
    let existing = find_or_404(state, id).await?;

    let deleted = products::delete_product(&state.pool, id).await?;
    if deleted == 0 {
        tracing::error!(product_id = id, "Product delete affected no rows");
        return Err(AppError::new(ErrorCode::ProductDeleteFailed).into());
    }

    tracing::info!(product_id = id, "Product deleted");
    Ok(existing)
}

async fn find_or_404(state: &AppState, id: i64) -> ServiceResult<Product> {
    products::find_product(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound).with_detail("id", id).into())
}

/// Category (and genre, for books) must exist
async fn ensure_references(
    state: &AppState,
    input: &ProductInput,
    detail: &ProductDetail,
) -> ServiceResult<()> {
    if !catalog::category_exists(&state.pool, input.category_id).await? {
        return Err(AppError::new(ErrorCode::CategoryNotFound)
            .with_detail("categoryId", input.category_id)
            .into());
    }
    if let ProductDetail::Book(book) = detail
        && !catalog::book_genre_exists(&state.pool, book.book_genre_id).await?
    {
        return Err(AppError::new(ErrorCode::BookGenreNotFound)
            .with_detail("bookGenreId", book.book_genre_id)
            .into());
    }
    Ok(())
}

async fn upload_gallery(
    images: &dyn ImageStore,
    files: &[UploadFile],
) -> Result<Vec<String>, AppError> {
    let mut urls = Vec::with_capacity(files.len());
    for file in files {
        urls.push(images.upload(file, ImageFolder::ProductImages).await?.file_url);
    }
    Ok(urls)
}

/// Gallery of a new product: uploaded files, or the URLs from the payload
fn create_gallery(uploaded: Vec<String>, from_payload: Option<Vec<String>>) -> Vec<String> {
    if uploaded.is_empty() {
        from_payload.unwrap_or_default()
    } else {
        uploaded
    }
}

/// Gallery on update: uploaded files followed by the payload URLs.
/// `None` when neither was sent, meaning "keep the current images".
fn merge_gallery(uploaded: Vec<String>, from_payload: Option<Vec<String>>) -> Option<Vec<String>> {
    if uploaded.is_empty() && from_payload.is_none() {
        return None;
    }
    let mut urls = uploaded;
    urls.extend(from_payload.unwrap_or_default());
    Some(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_gallery_prefers_uploads() {
        assert_eq!(
            create_gallery(urls(&["/u/a.jpg"]), Some(urls(&["https://x/b.jpg"]))),
            urls(&["/u/a.jpg"])
        );
        assert_eq!(
            create_gallery(vec![], Some(urls(&["https://x/b.jpg"]))),
            urls(&["https://x/b.jpg"])
        );
        assert!(create_gallery(vec![], None).is_empty());
    }

    #[test]
    fn test_merge_gallery() {
        assert_eq!(merge_gallery(vec![], None), None);
        // An explicit empty list clears the gallery
        assert_eq!(merge_gallery(vec![], Some(vec![])), Some(vec![]));
        assert_eq!(
            merge_gallery(urls(&["/u/new.jpg"]), Some(urls(&["/u/old.jpg"]))),
            Some(urls(&["/u/new.jpg", "/u/old.jpg"]))
        );
        assert_eq!(
            merge_gallery(urls(&["/u/new.jpg"]), None),
            Some(urls(&["/u/new.jpg"]))
        );
    }
}
