//! Authentication: session tokens, cookie middleware, rate limiting

pub mod rate_limit;
pub mod token;
pub mod user_auth;

pub use token::{JwtKeys, TokenKind, TokenSubject};
pub use user_auth::CurrentUser;
