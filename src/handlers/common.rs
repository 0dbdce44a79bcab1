use crate::errors::{ApiError, ServiceError};
use crate::services::exports::CsvExport;
use axum::{
    extract::{multipart::MultipartError, Multipart},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {}", e)))
}

fn disposition(kind: &str, filename: &str) -> HeaderValue {
    let safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && *c != '"' && *c != '\\')
        .collect();
    HeaderValue::from_str(&format!("{}; filename=\"{}\"", kind, safe))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// CSV download
pub fn csv_response(export: CsvExport) -> Response {
    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition("attachment", &export.filename)),
        ],
        export.bytes,
    )
        .into_response()
}

/// Stored file served inline
pub fn file_response(filename: &str, content_type: &'static str, bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition("inline", filename)),
        ],
        bytes,
    )
        .into_response()
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Text fields plus the first file part of a multipart body
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn require_text(&self, name: &str) -> Result<&str, ApiError> {
        self.text(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::ValidationError(format!("Field '{}' is required", name)))
    }

    pub fn require_file(self) -> Result<UploadedFile, ApiError> {
        self.file
            .ok_or_else(|| ApiError::ValidationError("A file is required".into()))
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge(err.body_text()).into()
    } else {
        ApiError::bad_request(err.body_text())
    }
}

pub async fn read_multipart(mut multipart: Multipart) -> Result<MultipartForm, ApiError> {
    let mut form = MultipartForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(filename) if form.file.is_none() => {
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.file = Some(UploadedFile {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            Some(_) => {
                field.bytes().await.map_err(multipart_error)?;
            }
            None => {
                let value = field.text().await.map_err(multipart_error)?;
                form.fields.insert(name, value);
            }
        }
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_headers() {
        let export = CsvExport {
            filename: "orders.csv".into(),
            bytes: b"a,b\n".to_vec(),
        };
        let response = csv_response(export);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"orders.csv\""
        );
    }

    #[test]
    fn disposition_strips_quotes() {
        assert_eq!(
            disposition("inline", "a\"b.pdf"),
            HeaderValue::from_static("inline; filename=\"ab.pdf\"")
        );
    }

    #[test]
    fn missing_text_field_is_validation_error() {
        let form = MultipartForm::default();
        assert!(matches!(
            form.require_text("title"),
            Err(ApiError::ValidationError(_))
        ));
    }
}
