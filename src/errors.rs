use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Bad Request",
    "message": "Invalid operation: Row 3: insufficient stock for Zipper at Adama",
    "request_id": "3f0c2d9e-6a51-4c1b-9a55-2f1f8f0de9a1",
    "timestamp": "2024-06-02T08:15:00+00:00"
}))]
pub struct ErrorResponse {
    /// Reason phrase of the status code
    #[schema(example = "Bad Request")]
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Echo of `x-request-id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ErrorResponse {
    fn render(status: StatusCode, message: String) -> Response {
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            details: None,
            request_id: crate::tracing::current_request_id().map(|rid| rid.to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}

/// Failures raised by the service layer
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or out-of-range input, including bad CSV sheets
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Well-formed input that the current data does not allow
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Hash error: {0}")]
    HashError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<csv::Error> for ServiceError {
    fn from(err: csv::Error) -> Self {
        ServiceError::ValidationError(format!("CSV error: {}", err))
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::InternalError(format!("I/O error: {}", err))
    }
}

impl ServiceError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} {} not found", entity, id))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::DatabaseError(_)
            | Self::HashError(_)
            | Self::MigrationError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Server-side failures are reported without their details
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            _ if self.status_code().is_server_error() => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        ErrorResponse::render(status, self.response_message())
    }
}

/// Handler-level error: either a service failure or a request the handler rejected itself
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    ServiceError(#[from] ServiceError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::ServiceError(err) => err.into_response(),
            ApiError::ValidationError(msg) | ApiError::BadRequest(msg) => {
                ErrorResponse::render(StatusCode::BAD_REQUEST, msg)
            }
            ApiError::NotFound(msg) => ErrorResponse::render(StatusCode::NOT_FOUND, msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracing::{scope_request_id, RequestId};
    use axum::body::to_bytes;

    async fn payload(response: Response) -> ErrorResponse {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn responses_echo_the_request_id() {
        let response = scope_request_id(RequestId::new("req-123"), async {
            ServiceError::not_found("Order", 42).into_response()
        })
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = payload(response).await;
        assert_eq!(body.request_id.as_deref(), Some("req-123"));
        assert_eq!(body.error, "Not Found");
        assert_eq!(body.message, "Not found: Order 42 not found");
    }

    #[tokio::test]
    async fn wrapped_service_errors_keep_their_status() {
        let response = ApiError::from(ServiceError::Conflict("SKU taken".into())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = ApiError::bad_request("missing boundary").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(payload(response).await.message, "missing boundary");
    }

    #[test]
    fn status_codes() {
        let cases = [
            (ServiceError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::InvalidOperation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::PayloadTooLarge("x".into()), StatusCode::PAYLOAD_TOO_LARGE),
            (
                ServiceError::UnsupportedMediaType("x".into()),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (ServiceError::HashError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{}", err);
        }
    }

    #[test]
    fn csv_errors_are_client_errors() {
        let err: ServiceError = csv::Reader::from_reader(&b"a,b\n1\n"[..])
            .records()
            .find_map(Result::err)
            .map(Into::into)
            .unwrap();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ServiceError::DatabaseError(DbErr::Custom("secret table".into()));
        assert_eq!(err.response_message(), "Database error");

        let err = ServiceError::InternalError("disk path /var/x".into());
        assert_eq!(err.response_message(), "Internal server error");

        let err = ServiceError::Conflict("username taken".into());
        assert_eq!(err.response_message(), "Conflict: username taken");
    }
}
