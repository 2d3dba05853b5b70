//! Service-layer error type
//!
//! `ServiceError` bridges DB-layer errors (`sqlx::Error`, `BoxError`) and the
//! API-layer error (`AppError`), so handlers can use `?` on both.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service-layer error
///
/// - `Db`: database/infrastructure errors (logged, mapped to InternalError)
/// - `App`: business-rule errors (passed through to the client)
#[derive(Debug)]
pub enum ServiceError {
    /// Database or infrastructure error (sqlx, io, serde, ...)
    Db(BoxError),
    /// Business-rule error carrying its own ErrorCode
    App(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                if let Some(code) = unique_violation_code(db_err.as_ref()) {
                    return AppError::new(code);
                }
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Map a unique-constraint violation that slipped past the pre-checks
/// (concurrent insert) to the matching conflict code.
fn unique_violation_code(err: &(dyn std::error::Error + Send + Sync + 'static)) -> Option<ErrorCode> {
    let sqlx::Error::Database(db_err) = err.downcast_ref::<sqlx::Error>()? else {
        return None;
    };
    if !db_err.is_unique_violation() {
        return None;
    }
    match db_err.constraint() {
        Some("idx_products_name_lower") => Some(ErrorCode::ProductAlreadyExists),
        Some("users_email_key") => Some(ErrorCode::EmailAlreadyExists),
        _ => Some(ErrorCode::AlreadyExists),
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_passes_through() {
        let err: AppError = ServiceError::App(AppError::not_found("Product")).into();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn test_infrastructure_error_is_internal() {
        let err: AppError = ServiceError::Db("disk on fire".into()).into();
        assert_eq!(err.code, ErrorCode::InternalError);
        assert_eq!(err.http_status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_row_not_found_is_internal() {
        let err: AppError = ServiceError::from(sqlx::Error::RowNotFound).into();
        assert_eq!(err.code, ErrorCode::InternalError);
    }
}
