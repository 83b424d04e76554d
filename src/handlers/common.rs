use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::ApiResponse;

/// Standard success response
pub fn success_response<T: Serialize>(data: T, message: &str) -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse::new(data, message, StatusCode::OK)),
    )
        .into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T, message: &str) -> Response {
    (
        StatusCode::CREATED,
        Json(ApiResponse::new(data, message, StatusCode::CREATED)),
    )
        .into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
