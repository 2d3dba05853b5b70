//! Account lifecycle: register → verify → login/refresh → profile updates

use shared::error::{AppError, ErrorCode};
use shared::models::{LoginRequest, RegisterRequest, UserResponse, UserUpdate, VerifyAccountRequest};
use shared::util::{now_millis, snowflake_id};

use crate::auth::{TokenKind, TokenSubject};
use crate::db::users::{self, NewUser, ProfileUpdate, UserRow};
use crate::error::ServiceResult;
use crate::state::AppState;
use crate::storage::{ImageFolder, UploadFile};
use crate::util::{generate_verify_token, hash_password, username_from_email, verify_password};
use crate::validation::{MAX_NAME_LEN, validate_email, validate_password, validate_required_text};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Issued on login; the tokens travel in cookies only
#[derive(Debug)]
pub struct LoginResult {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Storefront link that completes registration
fn verification_link(origin: &str, email: &str, token: &str) -> String {
    format!(
        "{origin}/account/verification?email={}&token={}",
        urlencoding::encode(email),
        urlencoding::encode(token)
    )
}

fn subject(user: &UserRow) -> TokenSubject<'_> {
    TokenSubject {
        user_id: user.id,
        email: &user.email,
        role: user.role(),
    }
}

async fn find_by_email_or_404(state: &AppState, email: &str) -> ServiceResult<UserRow> {
    users::find_by_email(&state.pool, email)
        .await?
        .ok_or_else(|| AppError::with_message(ErrorCode::UserNotFound, "Account not found!").into())
}

pub async fn register(state: &AppState, req: RegisterRequest) -> ServiceResult<UserResponse> {
    let email = normalize_email(&req.email);
    validate_email(&email)?;
    validate_password(&req.password)?;

    if users::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::new(ErrorCode::EmailAlreadyExists).into());
    }

    let password_hash = hash_password(&req.password).map_err(|e| BoxError::from(e.to_string()))?;
    let verify_token = generate_verify_token();
    let username = username_from_email(&email);

    let user = users::create_user(
        &state.pool,
        &NewUser {
            id: snowflake_id(),
            email: &email,
            username: &username,
            password_hash: &password_hash,
            verify_token: &verify_token,
            now: now_millis(),
        },
    )
    .await?;

    // Email delivery is out of scope; operators pick the link up from the log
    tracing::info!(
        user_id = user.id,
        link = %verification_link(&state.public_origin, &user.email, &verify_token),
        "Account registered, verification link issued"
    );

    Ok(user.to_response())
}

pub async fn verify_account(
    state: &AppState,
    req: VerifyAccountRequest,
) -> ServiceResult<UserResponse> {
    let user = find_by_email_or_404(state, &normalize_email(&req.email)).await?;

    if user.is_active {
        return Err(AppError::new(ErrorCode::AccountAlreadyActive).into());
    }
    if user.verify_token.as_deref() != Some(req.token.as_str()) {
        return Err(AppError::new(ErrorCode::VerifyTokenInvalid).into());
    }

    let user = users::activate(&state.pool, user.id, now_millis()).await?;
    tracing::info!(user_id = user.id, "Account verified");
    Ok(user.to_response())
}

pub async fn login(state: &AppState, req: LoginRequest) -> ServiceResult<LoginResult> {
    let user = find_by_email_or_404(state, &normalize_email(&req.email)).await?;

    if !user.is_active {
        return Err(AppError::new(ErrorCode::AccountNotActive).into());
    }
    if !verify_password(&req.password, &user.password_hash) {
        return Err(AppError::with_message(
            ErrorCode::InvalidCredentials,
            "Your email or password is incorrect!",
        )
        .into());
    }

    let access_token = state
        .jwt
        .issue(TokenKind::Access, &subject(&user))
        .map_err(BoxError::from)?;
    let refresh_token = state
        .jwt
        .issue(TokenKind::Refresh, &subject(&user))
        .map_err(BoxError::from)?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(LoginResult {
        user: user.to_response(),
        access_token,
        refresh_token,
    })
}

/// Exchange a refresh token for a new access token
pub async fn refresh_token(state: &AppState, token: Option<&str>) -> ServiceResult<String> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(AppError::not_authenticated)?;
    let claims = state.jwt.verify(TokenKind::Refresh, token)?;

    let user = users::find_by_id(&state.pool, claims.user_id()?)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

    let access_token = state
        .jwt
        .issue(TokenKind::Access, &subject(&user))
        .map_err(BoxError::from)?;
    Ok(access_token)
}

pub async fn update(
    state: &AppState,
    user_id: i64,
    body: UserUpdate,
    avatar: Option<UploadFile>,
) -> ServiceResult<UserResponse> {
    let user = users::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    if !user.is_active {
        return Err(AppError::new(ErrorCode::AccountNotActive).into());
    }

    let mut changes = ProfileUpdate::default();

    if let Some(name) = body.display_name {
        validate_required_text(&name, "displayName", MAX_NAME_LEN)?;
        changes.display_name = Some(name.trim().to_string());
    }

    match (body.current_password, body.new_password) {
        (Some(current), Some(new)) => {
            if !verify_password(&current, &user.password_hash) {
                return Err(AppError::with_message(
                    ErrorCode::InvalidCredentials,
                    "Your current password is incorrect!",
                )
                .into());
            }
            validate_password(&new)?;
            let hash = hash_password(&new).map_err(|e| BoxError::from(e.to_string()))?;
            changes.password_hash = Some(hash);
        }
        (None, None) => {}
        _ => {
            return Err(AppError::with_message(
                ErrorCode::RequiredField,
                "currentPassword and newPassword must be sent together",
            )
            .into());
        }
    }

    if let Some(file) = avatar {
        let stored = state.images.upload(&file, ImageFolder::Avatars).await?;
        changes.avatar = Some(stored.file_url);
    }

    let updated = users::update_profile(&state.pool, user_id, &changes, now_millis()).await?;
    tracing::info!(
        user_id,
        password_changed = changes.password_hash.is_some(),
        avatar_changed = changes.avatar.is_some(),
        "Profile updated"
    );
    Ok(updated.to_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_link_encodes_query_values() {
        let link = verification_link("http://localhost:5173", "a+b&c@example.com", "tok en");
        assert_eq!(
            link,
            "http://localhost:5173/account/verification?email=a%2Bb%26c%40example.com&token=tok%20en"
        );
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Reader@Example.COM "), "reader@example.com");
    }
}
