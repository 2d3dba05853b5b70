//! JWT session tokens and the cookies that carry them

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::UserRole;

use crate::config::Config;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Cookie lifetime, independent of the token lifetime
const COOKIE_MAX_AGE_DAYS: i64 = 14;

/// JWT claims shared by access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// User ID
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

impl UserClaims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse()
            .map_err(|_| AppError::new(ErrorCode::TokenInvalid))
    }
}

/// Minimal identity needed to mint tokens
#[derive(Debug, Clone)]
pub struct TokenSubject<'a> {
    pub user_id: i64,
    pub email: &'a str,
    pub role: UserRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Signing keys and lifetimes for both token kinds
#[derive(Clone)]
pub struct JwtKeys {
    access_secret: String,
    refresh_secret: String,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl JwtKeys {
    pub fn from_config(config: &Config) -> Self {
        Self {
            access_secret: config.access_token_secret.clone(),
            refresh_secret: config.refresh_token_secret.clone(),
            access_ttl_secs: config.access_token_ttl_secs,
            refresh_ttl_secs: config.refresh_token_ttl_secs,
        }
    }

    fn secret(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => self.access_secret.as_bytes(),
            TokenKind::Refresh => self.refresh_secret.as_bytes(),
        }
    }

    fn ttl_secs(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        }
    }

    pub fn issue(
        &self,
        kind: TokenKind,
        subject: &TokenSubject<'_>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(kind, subject, chrono::Utc::now().timestamp())
    }

    fn issue_at(
        &self,
        kind: TokenKind,
        subject: &TokenSubject<'_>,
        now_secs: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = UserClaims {
            sub: subject.user_id.to_string(),
            email: subject.email.to_string(),
            role: subject.role,
            exp: (now_secs + self.ttl_secs(kind)).max(0) as usize,
            iat: now_secs.max(0) as usize,
        };

        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret(kind)),
        )
    }

    /// Verify a token; expiry is reported separately so clients know to refresh
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<UserClaims, AppError> {
        let validation = Validation::default();
        jsonwebtoken::decode::<UserClaims>(
            token,
            &DecodingKey::from_secret(self.secret(kind)),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::token_expired(),
            _ => {
                tracing::debug!(kind = ?kind, "JWT validation failed: {e}");
                AppError::new(ErrorCode::TokenInvalid)
            }
        })
    }
}

/// HTTP-only session cookie
pub fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::days(COOKIE_MAX_AGE_DAYS))
        .build()
}

/// Remove both session cookies
pub fn clear_session(jar: CookieJar) -> CookieJar {
    [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE]
        .into_iter()
        .fold(jar, |jar, name| {
            let mut cookie = Cookie::from(name);
            cookie.set_path("/");
            jar.remove(cookie)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys {
            access_secret: "access".into(),
            refresh_secret: "refresh".into(),
            access_ttl_secs: 3600,
            refresh_ttl_secs: 14 * 24 * 3600,
        }
    }

    fn subject() -> TokenSubject<'static> {
        TokenSubject {
            user_id: 42,
            email: "admin@example.com",
            role: UserRole::Admin,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys();
        let token = keys.issue(TokenKind::Access, &subject()).unwrap();
        let claims = keys.verify(TokenKind::Access, &token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.email, "admin@example.com");
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_kinds_use_separate_secrets() {
        let keys = keys();
        let refresh = keys.issue(TokenKind::Refresh, &subject()).unwrap();
        assert!(keys.verify(TokenKind::Refresh, &refresh).is_ok());
        let err = keys.verify(TokenKind::Access, &refresh).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn test_expired_token_reports_expiry() {
        let keys = keys();
        let issued_long_ago = chrono::Utc::now().timestamp() - 10 * 3600;
        let token = keys
            .issue_at(TokenKind::Access, &subject(), issued_long_ago)
            .unwrap();
        let err = keys.verify(TokenKind::Access, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
        assert_eq!(err.http_status(), http::StatusCode::GONE);
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let err = keys().verify(TokenKind::Access, "not.a.jwt").unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie(ACCESS_TOKEN_COOKIE, "abc".into()).to_string();
        assert!(cookie.starts_with("accessToken=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=1209600"));
    }
}
