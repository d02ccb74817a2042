use crate::database::DatabaseError;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Listing, user or booking absent
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Stay of zero or negative nights
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    /// Dates already taken by another active booking
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Payment or webhook signature mismatch
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Authenticated, but not allowed to act on the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Cancellation attempted inside the policy window
    #[error("Too late: {0}")]
    TooLate(String),

    /// Missing or unknown requester
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database errors
    #[error("SQL error: {0}")]
    Sqlx(#[from] SqlxError),

    /// Store-level failure that has no domain meaning
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Payment provider errors
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Check if error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Check if error is an availability conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }

    /// Errors that are the caller's fault and safe to show verbatim
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }

    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::InvalidRange(_) => "invalid_range",
            AppError::Conflict(_) => "conflict",
            AppError::InvalidSignature(_) => "invalid_signature",
            AppError::Forbidden(_) => "forbidden",
            AppError::TooLate(_) => "too_late",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Validation(_) => "validation",
            AppError::ExternalService(_) => "payment_provider",
            _ => "internal",
        }
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::InvalidRange(_) => 400,
            AppError::Conflict(_) => 409,
            AppError::InvalidSignature(_) => 400,
            AppError::Forbidden(_) => 403,
            AppError::TooLate(_) => 400,
            AppError::Unauthorized(_) => 401,
            AppError::Validation(_) => 400,
            AppError::ExternalService(_) => 502,
            AppError::Config(_) => 500,
            AppError::Database(_) | AppError::Sqlx(_) | AppError::Storage(_) => 500,
            _ => 500,
        }
    }
}

/// Repository-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database query error
    #[error("Query error: {0}")]
    Query(SqlxError),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Unique constraint tripped; carries the constraint name when known
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Exclusion constraint tripped: an active booking already covers the range
    #[error("Overlapping booking: {0}")]
    Overlap(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Store internals failed (poisoned lock, corrupt row)
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => AppError::NotFound(msg),
            RepositoryError::Query(e) => AppError::Sqlx(e),
            RepositoryError::Duplicate(msg) => AppError::Conflict(format!("Duplicate: {}", msg)),
            RepositoryError::Overlap(_) => {
                AppError::Conflict("Listing is not available for the selected dates".to_string())
            }
            RepositoryError::ConstraintViolation(msg) => AppError::Validation(msg),
            RepositoryError::Storage(msg) => AppError::Storage(msg),
        }
    }
}

impl From<SqlxError> for RepositoryError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => RepositoryError::NotFound("Record not found".to_string()),
            SqlxError::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                let detail = db_err
                    .constraint()
                    .map(str::to_string)
                    .unwrap_or_else(|| db_err.message().to_string());
                match code.as_deref() {
                    // unique_violation
                    Some("23505") => RepositoryError::Duplicate(detail),
                    // exclusion_violation
                    Some("23P01") => RepositoryError::Overlap(detail),
                    // foreign_key_violation, check_violation
                    Some("23503") | Some("23514") => RepositoryError::ConstraintViolation(detail),
                    _ => RepositoryError::Query(err),
                }
            }
            _ => RepositoryError::Query(err),
        }
    }
}
