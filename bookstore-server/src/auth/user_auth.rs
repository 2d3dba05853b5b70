//! Cookie-based user authentication for the API

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use shared::error::{AppError, ErrorCode};
use shared::models::UserRole;

use super::token::{ACCESS_TOKEN_COOKIE, TokenKind};
use crate::state::AppState;

/// Authenticated user extracted from the access token cookie
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i64,
    pub email: String,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Verifies the `accessToken` cookie and stores a [`CurrentUser`] in the
/// request extensions. Missing/invalid → 401, expired → 410.
pub async fn user_auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AppError::with_message(ErrorCode::NotAuthenticated, "Unauthorized! (Token not found)")
        })?;

    let claims = state.jwt.verify(TokenKind::Access, &token)?;

    let user = CurrentUser {
        user_id: claims.user_id()?,
        email: claims.email,
        role: claims.role,
    };
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Must run after [`user_auth_middleware`]
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(AppError::not_authenticated)?;

    if !user.is_admin() {
        tracing::warn!(user_id = user.user_id, email = %user.email, "Non-admin attempted a catalog write");
        return Err(AppError::new(ErrorCode::AdminRequired));
    }

    Ok(next.run(request).await)
}
