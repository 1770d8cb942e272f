/// Error handling for the server
///
/// Two error types map failures to HTTP responses:
///
/// - [`ApiError`] for JSON endpoints (`/token-reset`, `/webhooks`, `/health`)
/// - [`PageError`] for HTML pages, rendered with the site layout
///
/// JSON handlers return `ApiResult<T>`, page handlers return `PageResult<T>`. Internal
/// errors are logged and never exposed to clients.
///
/// # Example
///
/// ```no_run
/// use witness_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler() -> ApiResult<Json<serde_json::Value>> {
///     Err(ApiError::NotFound("Subscription not found".to_string()))
/// }
/// ```

use axum::{
    extract::rejection::FormRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use witness_shared::{
    auth::password::PasswordError, auth::session::SessionError, mail::MailError,
    models::ModelError,
};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Page result type alias
pub type PageResult<T> = Result<T, PageError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - e.g., duplicate email
    Conflict(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // Check for unique constraint violations
                if db_err.is_unique_violation() {
                    if let Some(constraint) = db_err.constraint() {
                        if constraint.contains("email") {
                            return ApiError::Conflict("Email already exists".to_string());
                        }
                        return ApiError::Conflict(format!("Constraint violation: {}", constraint));
                    }
                }

                // Other database errors are internal
                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert model errors to API errors
impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::DuplicateEmail => ApiError::Conflict(err.to_string()),
            ModelError::EmailRequired | ModelError::UnknownEventType(_) => {
                ApiError::BadRequest(err.to_string())
            }
            ModelError::Database(db_err) => db_err.into(),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert session errors to API errors
impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::CreateError(msg) => {
                ApiError::InternalError(format!("Failed to create session: {}", msg))
            }
            SessionError::Expired => ApiError::Unauthorized("Session expired".to_string()),
            SessionError::Invalid(msg) => ApiError::Unauthorized(format!("Invalid session: {}", msg)),
        }
    }
}

/// Marks a response whose body is replaced with the site's error page
///
/// Page errors, panics and unmatched routes carry this marker; the `error_pages`
/// middleware renders the page because it has the site configuration at hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPage(pub StatusCode);

impl ErrorPage {
    /// Response carrying the marker and a plain placeholder body
    pub fn response(status: StatusCode) -> Response {
        (
            status,
            Extension(ErrorPage(status)),
            status.canonical_reason().unwrap_or("Error"),
        )
            .into_response()
    }
}

/// HTML page errors
///
/// Rendered with the common layout; the body never includes internal details.
#[derive(Debug)]
pub enum PageError {
    /// Malformed request (400)
    BadRequest,

    /// Cross-site form submission (403)
    CsrfFailure,

    /// Not found (404)
    NotFound,

    /// Internal server error (500); the message is logged only
    Internal(String),
}

impl PageError {
    pub fn status(&self) -> StatusCode {
        match self {
            PageError::BadRequest => StatusCode::BAD_REQUEST,
            PageError::CsrfFailure => StatusCode::FORBIDDEN,
            PageError::NotFound => StatusCode::NOT_FOUND,
            PageError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageError::BadRequest => write!(f, "Bad request"),
            PageError::CsrfFailure => write!(f, "CSRF verification failed"),
            PageError::NotFound => write!(f, "Not found"),
            PageError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for PageError {}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        if let PageError::Internal(msg) = &self {
            tracing::error!("Internal error: {}", msg);
        }

        ErrorPage::response(self.status())
    }
}

impl From<FormRejection> for PageError {
    fn from(rejection: FormRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected form body");
        PageError::BadRequest
    }
}

impl From<sqlx::Error> for PageError {
    fn from(err: sqlx::Error) -> Self {
        PageError::Internal(format!("Database error: {}", err))
    }
}

impl From<ModelError> for PageError {
    fn from(err: ModelError) -> Self {
        PageError::Internal(err.to_string())
    }
}

impl From<MailError> for PageError {
    fn from(err: MailError) -> Self {
        PageError::Internal(format!("Failed to send email: {}", err))
    }
}

impl From<SessionError> for PageError {
    fn from(err: SessionError) -> Self {
        PageError::Internal(format!("Session error: {}", err))
    }
}
