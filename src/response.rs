use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::AppError;

pub type ApiResult = Result<Response, AppError>;

/// Конверт всех JSON-ответов API.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

pub fn success<T: Serialize>(data: T) -> Response {
    respond(StatusCode::OK, None, Some(data))
}

pub fn created<T: Serialize>(message: &str, data: T) -> Response {
    respond(StatusCode::CREATED, Some(message), Some(data))
}

pub fn with_message<T: Serialize>(message: &str, data: T) -> Response {
    respond(StatusCode::OK, Some(message), Some(data))
}

pub fn message(message: &str) -> Response {
    respond::<()>(StatusCode::OK, Some(message), None)
}

pub fn failure(status: StatusCode, message: String, errors: Option<Vec<FieldError>>) -> Response {
    let body: ApiResponse<()> = ApiResponse {
        success: false,
        message: Some(message),
        data: None,
        errors,
    };
    (status, Json(body)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, message: Option<&str>, data: Option<T>) -> Response {
    let body = ApiResponse {
        success: true,
        message: message.map(str::to_string),
        data,
        errors: None,
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_fields_are_omitted() {
        let body: ApiResponse<()> = ApiResponse {
            success: true,
            message: Some("Booking cancelled successfully".into()),
            data: None,
            errors: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "success": true, "message": "Booking cancelled successfully" })
        );
    }

    #[test]
    fn failure_carries_field_errors() {
        let response = failure(
            StatusCode::BAD_REQUEST,
            "Validation failed".into(),
            Some(vec![FieldError { field: "title".into(), message: "too short".into() }]),
        );
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
