//! Account endpoints: register, verify, login/logout, token refresh, profile

use axum::extract::{Multipart, State};
use axum::{Extension, Json, http::StatusCode};
use axum_extra::extract::cookie::CookieJar;
use shared::error::{AppError, ErrorCode};
use shared::models::{LoginRequest, RegisterRequest, UserResponse, UserUpdate, VerifyAccountRequest};

use super::ApiResult;
use super::multipart::read_form;
use crate::auth::CurrentUser;
use crate::auth::token::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, clear_session, session_cookie};
use crate::services::user_service;
use crate::state::AppState;

const AVATAR_FIELD: &str = "avatar";

/// POST /v1/users/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = user_service::register(&state, req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /v1/users/verify
pub async fn verify_account(
    State(state): State<AppState>,
    Json(req): Json<VerifyAccountRequest>,
) -> ApiResult<UserResponse> {
    Ok(Json(user_service::verify_account(&state, req).await?))
}

/// POST /v1/users/login: tokens go to HTTP-only cookies, the body is the user
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<UserResponse>), AppError> {
    let result = user_service::login(&state, req).await?;
    let jar = jar
        .add(session_cookie(ACCESS_TOKEN_COOKIE, result.access_token))
        .add(session_cookie(REFRESH_TOKEN_COOKIE, result.refresh_token));
    Ok((jar, Json(result.user)))
}

/// DELETE /v1/users/logout
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    (
        clear_session(jar),
        Json(serde_json::json!({ "loggedOut": true })),
    )
}

/// GET /v1/users/refresh_token: any failure asks the client to sign in again
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<serde_json::Value>), AppError> {
    let token = jar.get(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_string());

    let access_token = user_service::refresh_token(&state, token.as_deref())
        .await
        .map_err(|e| {
            let cause = AppError::from(e);
            tracing::debug!(code = ?cause.code, "Refresh token rejected");
            AppError::with_message(
                ErrorCode::RefreshTokenInvalid,
                "Please Sign In! (Error from refresh Token)",
            )
        })?;

    let jar = jar.add(session_cookie(ACCESS_TOKEN_COOKIE, access_token.clone()));
    Ok((jar, Json(serde_json::json!({ "accessToken": access_token }))))
}

/// PUT /v1/users/update, multipart: displayName, currentPassword, newPassword, avatar
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    multipart: Multipart,
) -> ApiResult<UserResponse> {
    let mut form = read_form(multipart, &[(AVATAR_FIELD, 1)]).await?;

    let non_empty = |name: &str| {
        form.text(name)
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
    };
    let body = UserUpdate {
        display_name: non_empty("displayName"),
        current_password: non_empty("currentPassword"),
        new_password: non_empty("newPassword"),
    };
    let avatar = form.take_file(AVATAR_FIELD);

    Ok(Json(
        user_service::update(&state, user.user_id, body, avatar).await?,
    ))
}
