//! Unified error codes for the bookstore backend
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 6xxx: Catalog errors (65xx: file upload)
//! - 8xxx: User errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the storefront can
/// branch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Too many requests from one client
    TooManyRequests = 9,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Access token has expired, client should refresh
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account has not been verified yet
    AccountNotActive = 1005,
    /// Account was already verified
    AccountAlreadyActive = 1006,
    /// Verification token does not match
    VerifyTokenInvalid = 1007,
    /// Refresh token missing, invalid or expired
    RefreshTokenInvalid = 1008,
    /// Email is already registered
    EmailAlreadyExists = 1009,
    /// Password too short
    PasswordTooShort = 1010,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2002,

    // ==================== 6xxx: Catalog ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product with the same name exists
    ProductAlreadyExists = 6002,
    /// Product has invalid price or discount
    ProductInvalidPrice = 6003,
    /// Type-specific detail missing for the product type
    ProductDetailMissing = 6004,
    /// Cover image is required
    CoverImageRequired = 6005,
    /// Product row could not be deleted
    ProductDeleteFailed = 6006,
    /// Category not found
    CategoryNotFound = 6101,
    /// Book genre not found
    BookGenreNotFound = 6201,

    // ==================== 65xx: File Upload ====================
    /// File too large
    FileTooLarge = 6501,
    /// Unsupported file format
    UnsupportedFileFormat = 6502,
    /// Invalid/corrupted image file
    InvalidImageFile = 6503,
    /// No file provided in request
    NoFileProvided = 6504,
    /// Empty file provided
    EmptyFile = 6505,
    /// Too many files in one field
    TooManyFiles = 6506,
    /// File storage failed
    FileStorageFailed = 6509,

    // ==================== 8xxx: User ====================
    /// User not found
    UserNotFound = 8001,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",
            ErrorCode::TooManyRequests => "Too many requests, try again later",

            // Auth
            ErrorCode::NotAuthenticated => "Unauthorized! (Token not found)",
            ErrorCode::InvalidCredentials => "Your email or password is incorrect",
            ErrorCode::TokenExpired => "Need to refresh token",
            ErrorCode::TokenInvalid => "Unauthorized! (Token is invalid)",
            ErrorCode::AccountNotActive => "Your account is not active",
            ErrorCode::AccountAlreadyActive => "Your account is already active",
            ErrorCode::VerifyTokenInvalid => "Token is invalid",
            ErrorCode::RefreshTokenInvalid => "Please Sign In! (Error from refresh Token)",
            ErrorCode::EmailAlreadyExists => "Email already exists",
            ErrorCode::PasswordTooShort => "Password must be at least 8 characters",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Administrator role is required",

            // Catalog
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductAlreadyExists => "Product already exists",
            ErrorCode::ProductInvalidPrice => "Product has invalid price",
            ErrorCode::ProductDetailMissing => "Product detail does not match product type",
            ErrorCode::CoverImageRequired => "Cover image is required",
            ErrorCode::ProductDeleteFailed => "Failed to delete product",
            ErrorCode::CategoryNotFound => "Category not found",
            ErrorCode::BookGenreNotFound => "Book genre not found",

            // File Upload
            ErrorCode::FileTooLarge => "File too large",
            ErrorCode::UnsupportedFileFormat => "Unsupported file format",
            ErrorCode::InvalidImageFile => "Invalid image file",
            ErrorCode::NoFileProvided => "No file provided",
            ErrorCode::EmptyFile => "Empty file provided",
            ErrorCode::TooManyFiles => "Too many files",
            ErrorCode::FileStorageFailed => "File storage failed",

            // User
            ErrorCode::UserNotFound => "Account not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::TooManyRequests),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1005 => Ok(ErrorCode::AccountNotActive),
            1006 => Ok(ErrorCode::AccountAlreadyActive),
            1007 => Ok(ErrorCode::VerifyTokenInvalid),
            1008 => Ok(ErrorCode::RefreshTokenInvalid),
            1009 => Ok(ErrorCode::EmailAlreadyExists),
            1010 => Ok(ErrorCode::PasswordTooShort),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::AdminRequired),

            // Catalog
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::ProductAlreadyExists),
            6003 => Ok(ErrorCode::ProductInvalidPrice),
            6004 => Ok(ErrorCode::ProductDetailMissing),
            6005 => Ok(ErrorCode::CoverImageRequired),
            6006 => Ok(ErrorCode::ProductDeleteFailed),
            6101 => Ok(ErrorCode::CategoryNotFound),
            6201 => Ok(ErrorCode::BookGenreNotFound),

            // File Upload
            6501 => Ok(ErrorCode::FileTooLarge),
            6502 => Ok(ErrorCode::UnsupportedFileFormat),
            6503 => Ok(ErrorCode::InvalidImageFile),
            6504 => Ok(ErrorCode::NoFileProvided),
            6505 => Ok(ErrorCode::EmptyFile),
            6506 => Ok(ErrorCode::TooManyFiles),
            6509 => Ok(ErrorCode::FileStorageFailed),

            // User
            8001 => Ok(ErrorCode::UserNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
