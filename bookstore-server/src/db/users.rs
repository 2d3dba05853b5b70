//! User account database operations

use shared::models::{UserResponse, UserRole};
use sqlx::PgPool;

use super::BoxError;

const USER_COLUMNS: &str = "id, email, username, display_name, password_hash, avatar, role, \
     is_active, verify_token, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub avatar: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub verify_token: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl UserRow {
    pub fn role(&self) -> UserRole {
        UserRole::from_db(&self.role)
    }

    /// Public view without password hash and verify token
    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            avatar: self.avatar.clone(),
            role: self.role(),
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

pub struct NewUser<'a> {
    pub id: i64,
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub verify_token: &'a str,
    pub now: i64,
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, BoxError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let row: Option<UserRow> = sqlx::query_as(&sql).bind(email).fetch_optional(pool).await?;
    Ok(row)
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<UserRow>, BoxError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let row: Option<UserRow> = sqlx::query_as(&sql).bind(id).fetch_optional(pool).await?;
    Ok(row)
}

/// New accounts start inactive with role CLIENT and display name = username
pub async fn create_user(pool: &PgPool, user: &NewUser<'_>) -> Result<UserRow, BoxError> {
    let sql = format!(
        r#"
        INSERT INTO users (
            id, email, username, display_name, password_hash, role,
            is_active, verify_token, created_at, updated_at
        )
        VALUES ($1, $2, $3, $3, $4, 'CLIENT', FALSE, $5, $6, $6)
        RETURNING {USER_COLUMNS}
        "#
    );
    let row: UserRow = sqlx::query_as(&sql)
        .bind(user.id)
        .bind(user.email)
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.verify_token)
        .bind(user.now)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn activate(pool: &PgPool, id: i64, now: i64) -> Result<UserRow, BoxError> {
    let sql = format!(
        "UPDATE users SET is_active = TRUE, verify_token = NULL, updated_at = $2 \
         WHERE id = $1 RETURNING {USER_COLUMNS}"
    );
    let row: UserRow = sqlx::query_as(&sql).bind(id).bind(now).fetch_one(pool).await?;
    Ok(row)
}

/// Profile changes; `None` keeps the stored value
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub password_hash: Option<String>,
    pub avatar: Option<String>,
}

pub async fn update_profile(
    pool: &PgPool,
    id: i64,
    update: &ProfileUpdate,
    now: i64,
) -> Result<UserRow, BoxError> {
    let sql = format!(
        r#"
        UPDATE users SET
            display_name = COALESCE($2, display_name),
            password_hash = COALESCE($3, password_hash),
            avatar = COALESCE($4, avatar),
            updated_at = $5
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    );
    let row: UserRow = sqlx::query_as(&sql)
        .bind(id)
        .bind(&update.display_name)
        .bind(&update.password_hash)
        .bind(&update.avatar)
        .bind(now)
        .fetch_one(pool)
        .await?;
    Ok(row)
}
