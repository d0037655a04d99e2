/// Response envelope shared by every endpoint
///
/// ```json
/// { "success": true, "status": 200, "message": "Login successful", "data": { ... } }
/// ```
///
/// `message`, `data` and `details` are omitted when empty. Errors use the
/// same shape through [`crate::error::ApiError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ValidationErrorDetail;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub status: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

/// Successful response with an HTTP status
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    message: Option<String>,
    data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 200 with data
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: None,
            data: Some(data),
        }
    }

    /// 201 with the created record
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl ApiResponse<()> {
    /// 200 with only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            success: true,
            status: self.status.as_u16(),
            message: self.message,
            data: self.data,
            details: None,
        };

        (self.status, Json(body)).into_response()
    }
}
