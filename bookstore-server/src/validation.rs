//! Input validation helpers
//!
//! Text length limits and the checks applied to product payloads, search
//! queries and account forms before they reach the database.

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{ProductDetail, ProductInput, ProductType};

use crate::db::products::{Pagination, ProductFilter};

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: product, author, publisher, ...
pub const MAX_NAME_LEN: usize = 200;

/// Product descriptions
pub const MAX_DESCRIPTION_LEN: usize = 5000;

/// Short attributes: dimension, language, color, brand, ...
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Passwords (before hashing)
pub const MAX_PASSWORD_LEN: usize = 128;

/// Largest page size a search may request
pub const MAX_ITEMS_PER_PAGE: u32 = 100;

// ── Generic helpers ─────────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::with_message(
            ErrorCode::RequiredField,
            format!("{field} must not be empty"),
        )
        .with_detail("field", field));
    }
    if value.chars().count() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.chars().count()
        ))
        .with_detail("field", field));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.chars().count() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.chars().count()
        ))
        .with_detail("field", field));
    }
    Ok(())
}

fn out_of_range(field: &str, message: String) -> AppError {
    AppError::with_message(ErrorCode::ValueOutOfRange, message).with_detail("field", field)
}

// ── Accounts ────────────────────────────────────────────────────────

pub fn validate_email(email: &str) -> Result<(), AppError> {
    validate_required_text(email, "email", MAX_EMAIL_LEN)?;
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        });
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(AppError::with_message(
            ErrorCode::InvalidFormat,
            "Email address is not valid",
        )
        .with_detail("field", "email"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::new(ErrorCode::PasswordTooShort)
            .with_detail("min_length", MIN_PASSWORD_LEN));
    }
    if password.chars().count() > MAX_PASSWORD_LEN {
        return Err(out_of_range(
            "password",
            format!("password is too long (max {MAX_PASSWORD_LEN})"),
        ));
    }
    Ok(())
}

// ── Products ────────────────────────────────────────────────────────

/// Check a create/update payload and return its type-matching detail
pub fn validate_product_input(input: &ProductInput) -> Result<ProductDetail, AppError> {
    validate_required_text(&input.name, "name", MAX_NAME_LEN)?;
    validate_optional_text(&input.description, "description", MAX_DESCRIPTION_LEN)?;
    validate_optional_text(&input.dimension, "dimension", MAX_SHORT_TEXT_LEN)?;

    if input.price < Decimal::ZERO {
        return Err(AppError::new(ErrorCode::ProductInvalidPrice).with_detail("field", "price"));
    }
    if !(0..=100).contains(&input.discount) {
        return Err(out_of_range(
            "discount",
            format!("discount must be between 0 and 100, got {}", input.discount),
        ));
    }
    if input.stock < 0 {
        return Err(out_of_range("stock", "stock must not be negative".into()));
    }
    if input.category_id <= 0 {
        return Err(AppError::with_message(ErrorCode::RequiredField, "categoryId is required")
            .with_detail("field", "categoryId"));
    }

    let detail = input.detail()?;
    match &detail {
        ProductDetail::Book(book) => {
            validate_required_text(&book.author, "bookDetail.author", MAX_NAME_LEN)?;
            validate_optional_text(&book.translator, "bookDetail.translator", MAX_NAME_LEN)?;
            validate_optional_text(&book.publisher, "bookDetail.publisher", MAX_NAME_LEN)?;
            validate_optional_text(&book.language, "bookDetail.language", MAX_SHORT_TEXT_LEN)?;
            if book.publish_year.is_some_and(|y| y < 0) {
                return Err(out_of_range(
                    "bookDetail.publishYear",
                    "publishYear must not be negative".into(),
                ));
            }
            if book.page_count.is_some_and(|n| n < 0) {
                return Err(out_of_range(
                    "bookDetail.pageCount",
                    "pageCount must not be negative".into(),
                ));
            }
        }
        ProductDetail::Stationery(st) => {
            validate_optional_text(&st.brand, "stationeryDetail.brand", MAX_SHORT_TEXT_LEN)?;
            validate_optional_text(
                &st.place_production,
                "stationeryDetail.placeProduction",
                MAX_SHORT_TEXT_LEN,
            )?;
            validate_optional_text(&st.color, "stationeryDetail.color", MAX_SHORT_TEXT_LEN)?;
            validate_optional_text(&st.material, "stationeryDetail.material", MAX_SHORT_TEXT_LEN)?;
        }
    }
    Ok(detail)
}

// ── Query strings ───────────────────────────────────────────────────

/// `GET /v1/products` query
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub items_per_page: Option<String>,
    pub q: Option<String>,
}

impl ListQuery {
    /// Unparseable paging falls back to the defaults; page size is capped
    pub fn into_parts(self) -> (ProductFilter, Pagination) {
        let page = Pagination::new(
            self.page.and_then(|p| p.trim().parse().ok()),
            self.items_per_page
                .and_then(|n| n.trim().parse::<u32>().ok())
                .map(|n| n.min(MAX_ITEMS_PER_PAGE)),
        );
        let filter = ProductFilter {
            search: non_blank(self.q),
            ..Default::default()
        };
        (filter, page)
    }
}

/// `GET /v1/products/search` query
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub page: Option<String>,
    pub items_per_page: Option<String>,
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub book_genre_id: Option<String>,
    pub language: Option<String>,
    pub category_id: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

impl SearchQuery {
    pub fn validate(self) -> Result<(ProductFilter, Pagination), AppError> {
        let page = parse_u32(self.page.as_deref(), "page")?;
        if page == Some(0) {
            return Err(out_of_range("page", "page must be at least 1".into()));
        }
        let items_per_page = parse_u32(self.items_per_page.as_deref(), "itemsPerPage")?;
        if items_per_page.is_some_and(|n| n == 0 || n > MAX_ITEMS_PER_PAGE) {
            return Err(out_of_range(
                "itemsPerPage",
                format!("itemsPerPage must be between 1 and {MAX_ITEMS_PER_PAGE}"),
            ));
        }

        let product_type = match non_blank(self.product_type) {
            None => None,
            Some(raw) => Some(ProductType::from_db(&raw.to_uppercase()).ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::InvalidFormat,
                    "type must be BOOK or STATIONERY",
                )
                .with_detail("field", "type")
            })?),
        };

        let min_price = parse_price_bound(self.min_price.as_deref(), "minPrice")?;
        let max_price = parse_price_bound(self.max_price.as_deref(), "maxPrice")?;
        if let (Some(min), Some(max)) = (min_price, max_price)
            && min > max
        {
            return Err(out_of_range(
                "minPrice",
                "minPrice must not exceed maxPrice".into(),
            ));
        }

        let filter = ProductFilter {
            search: non_blank(self.search),
            product_type,
            book_genre_id: parse_id(self.book_genre_id.as_deref(), "bookGenreId")?,
            language: non_blank(self.language),
            category_id: parse_id(self.category_id.as_deref(), "categoryId")?,
            min_price,
            max_price,
        };
        Ok((filter, Pagination::new(page, items_per_page)))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_u32(raw: Option<&str>, field: &str) -> Result<Option<u32>, AppError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|_| {
            AppError::with_message(ErrorCode::InvalidFormat, format!("{field} must be a positive integer"))
                .with_detail("field", field)
        }),
    }
}

fn parse_id(raw: Option<&str>, field: &str) -> Result<Option<i64>, AppError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => match v.parse::<i64>() {
            Ok(id) if id > 0 => Ok(Some(id)),
            _ => Err(AppError::with_message(
                ErrorCode::InvalidFormat,
                format!("{field} must be a positive integer"),
            )
            .with_detail("field", field)),
        },
    }
}

/// Blank or non-numeric bounds are ignored; negative bounds are rejected
fn parse_price_bound(raw: Option<&str>, field: &str) -> Result<Option<Decimal>, AppError> {
    let Some(value) = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<Decimal>().ok())
    else {
        return Ok(None);
    };
    if value < Decimal::ZERO {
        return Err(out_of_range(field, format!("{field} must not be negative")));
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{BookDetail, StationeryDetail};

    fn stationery_input() -> ProductInput {
        ProductInput {
            category_id: 2,
            name: "Bút bi Thiên Long".into(),
            price: Decimal::from(5000),
            discount: 0,
            stock: 10,
            description: None,
            dimension: Some("14 cm".into()),
            product_type: ProductType::Stationery,
            book_detail: None,
            stationery_detail: Some(StationeryDetail {
                brand: Some("Thiên Long".into()),
                place_production: None,
                color: Some("Xanh".into()),
                material: None,
            }),
            product_images: None,
        }
    }

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("ok", "name", 10).is_ok());
        let err = validate_required_text("   ", "name", 10).unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredField);
        // Counted in characters, not bytes
        assert!(validate_required_text("Sách hay", "name", 8).is_ok());
        assert!(validate_required_text("Sách hay!", "name", 8).is_err());
    }

    #[test]
    fn test_product_input_ok() {
        let detail = validate_product_input(&stationery_input()).unwrap();
        assert_eq!(detail.product_type(), ProductType::Stationery);
    }

    #[test]
    fn test_product_input_rejects_bad_numbers() {
        let mut input = stationery_input();
        input.price = Decimal::from(-1);
        assert_eq!(
            validate_product_input(&input).unwrap_err().code,
            ErrorCode::ProductInvalidPrice
        );

        let mut input = stationery_input();
        input.discount = 101;
        assert_eq!(
            validate_product_input(&input).unwrap_err().code,
            ErrorCode::ValueOutOfRange
        );

        let mut input = stationery_input();
        input.stock = -3;
        assert_eq!(
            validate_product_input(&input).unwrap_err().code,
            ErrorCode::ValueOutOfRange
        );
    }

    #[test]
    fn test_product_input_requires_matching_detail() {
        let mut input = stationery_input();
        input.product_type = ProductType::Book;
        assert_eq!(
            validate_product_input(&input).unwrap_err().code,
            ErrorCode::ProductDetailMissing
        );

        input.book_detail = Some(BookDetail {
            book_genre_id: 1,
            author: "".into(),
            translator: None,
            language: None,
            publisher: None,
            publish_year: None,
            page_count: None,
            book_genre: None,
        });
        assert_eq!(
            validate_product_input(&input).unwrap_err().code,
            ErrorCode::RequiredField
        );
    }

    #[test]
    fn test_email_and_password() {
        assert!(validate_email("reader@example.com").is_ok());
        assert!(validate_email("reader@localhost").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a b@example.com").is_err());

        assert_eq!(
            validate_password("short").unwrap_err().code,
            ErrorCode::PasswordTooShort
        );
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_search_query_full() {
        let query = SearchQuery {
            page: Some("2".into()),
            items_per_page: Some("24".into()),
            search: Some("  harry ".into()),
            product_type: Some("book".into()),
            book_genre_id: Some("5".into()),
            language: Some("".into()),
            category_id: Some("1".into()),
            min_price: Some("10000".into()),
            max_price: Some("50000.5".into()),
        };
        let (filter, page) = query.validate().unwrap();
        assert_eq!(page, Pagination::new(Some(2), Some(24)));
        assert_eq!(filter.search.as_deref(), Some("harry"));
        assert_eq!(filter.product_type, Some(ProductType::Book));
        assert_eq!(filter.book_genre_id, Some(5));
        assert_eq!(filter.language, None);
        assert_eq!(filter.category_id, Some(1));
        assert_eq!(filter.min_price, Some(Decimal::from(10_000)));
        assert_eq!(filter.max_price, Some(Decimal::new(500_005, 1)));
    }

    #[test]
    fn test_search_query_ignores_non_numeric_prices() {
        let query = SearchQuery {
            min_price: Some("abc".into()),
            max_price: Some(" ".into()),
            ..Default::default()
        };
        let (filter, page) = query.validate().unwrap();
        assert_eq!(filter, ProductFilter::default());
        assert_eq!(page, Pagination::default());
    }

    #[test]
    fn test_search_query_rejects_out_of_range() {
        let bad = [
            SearchQuery { page: Some("0".into()), ..Default::default() },
            SearchQuery { items_per_page: Some("101".into()), ..Default::default() },
            SearchQuery { min_price: Some("-5".into()), ..Default::default() },
            SearchQuery {
                min_price: Some("100".into()),
                max_price: Some("10".into()),
                ..Default::default()
            },
        ];
        for query in bad {
            assert_eq!(query.validate().unwrap_err().code, ErrorCode::ValueOutOfRange);
        }

        let err = SearchQuery { product_type: Some("FOOD".into()), ..Default::default() }
            .validate()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);

        let err = SearchQuery { category_id: Some("x".into()), ..Default::default() }
            .validate()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
    }

    #[test]
    fn test_list_query_is_lenient() {
        let (filter, page) = ListQuery {
            page: Some("nope".into()),
            items_per_page: Some("5".into()),
            q: Some("bút".into()),
        }
        .into_parts();
        assert_eq!(page, Pagination::new(None, Some(5)));
        assert_eq!(filter.search.as_deref(), Some("bút"));
    }

    #[test]
    fn test_list_query_caps_huge_paging() {
        let (_, page) = ListQuery {
            page: Some("4294967295".into()),
            items_per_page: Some("4294967295".into()),
            q: None,
        }
        .into_parts();
        assert_eq!(page.items_per_page, MAX_ITEMS_PER_PAGE);
        assert_eq!(page.limit(), i64::from(MAX_ITEMS_PER_PAGE));
        assert_eq!(
            page.offset(),
            i64::from(u32::MAX - 1) * i64::from(MAX_ITEMS_PER_PAGE)
        );
    }
}
