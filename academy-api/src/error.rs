/// Error handling for the API server
///
/// All handlers return `Result<T, ApiError>`. Every error becomes the same
/// JSON envelope as a success response, with `success: false`:
///
/// ```json
/// { "success": false, "status": 409, "message": "Email already registered" }
/// ```
///
/// Internal errors are logged and replaced by a generic message.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use academy_shared::auth::{
    authorization::AuthzError,
    credentials::CredentialError,
    federated::FederatedError,
    jwt::JwtError,
    middleware::AuthError,
    password::PasswordError,
};
use academy_shared::models::pagination::PaginationError;
use academy_shared::store::{unique_violation_field, StoreError};

use crate::response::Envelope;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate email
    Conflict(String),

    /// Unprocessable entity (422)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Single-field validation failure
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.to_string(),
            message: message.into(),
        }])
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, details) = match self {
            ApiError::ValidationError(errors) => {
                ("Request validation failed".to_string(), Some(errors))
            }
            ApiError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ("An internal error occurred".to_string(), None)
            }
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::ServiceUnavailable(msg) => (msg, None),
        };

        let body = Envelope::<()> {
            success: false,
            status: status.as_u16(),
            message: Some(message),
            data: None,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(field) = unique_violation_field(&err) {
            return ApiError::Conflict(format!("{} already exists", field));
        }

        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            other => ApiError::InternalError(format!("Database error: {}", other)),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(field) => ApiError::Conflict(format!("{} already exists", field)),
            StoreError::Database(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            CredentialError::Conflict(msg) => ApiError::Conflict(msg),
            CredentialError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            CredentialError::Forbidden(msg) => ApiError::Forbidden(msg),
            CredentialError::NotFound(msg) => ApiError::NotFound(msg),
            CredentialError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<FederatedError> for ApiError {
    fn from(err: FederatedError) -> Self {
        CredentialError::from(err).into()
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Empty => ApiError::BadRequest(err.to_string()),
            other => ApiError::InternalError(format!("Password operation failed: {}", other)),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl From<PaginationError> for ApiError {
    fn from(err: PaginationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        ApiError::ValidationError(details)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<crate::uploads::UploadError> for ApiError {
    fn from(err: crate::uploads::UploadError) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_shared::models::account::Role;
    use academy_shared::auth::authorization::Capability;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");
    }

    #[test]
    fn test_credential_error_status() {
        let cases = [
            (CredentialError::InvalidFormat("x".into()), StatusCode::BAD_REQUEST),
            (CredentialError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (CredentialError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (CredentialError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (CredentialError::Conflict("x".into()), StatusCode::CONFLICT),
            (CredentialError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_gate_errors_are_unauthorized() {
        assert_eq!(
            ApiError::from(AuthError::MissingCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidFormat("Basic".into())).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthzError::InsufficientRole {
                role: Role::Member,
                capability: Capability::ManagePayments,
            })
            .status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_row_not_found_is_404() {
        assert_eq!(
            ApiError::from(sqlx::Error::RowNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(sqlx::Error::PoolTimedOut).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let response = ApiError::Conflict("Email already registered".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["status"], 409);
        assert_eq!(json["message"], "Email already registered");
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = ApiError::InternalError("connection refused".to_string()).into_response();
        let json = body_json(response).await;

        assert_eq!(json["status"], 500);
        assert_eq!(json["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_validation_details() {
        let response = ApiError::invalid("name", "Name is required").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let json = body_json(response).await;
        assert_eq!(json["details"][0]["field"], "name");
        assert_eq!(json["details"][0]["message"], "Name is required");
    }
}
