use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    error::{AppError, Result},
    models::dto::ApiResponse,
};

const FALLBACK_ERROR: &str = r#"{"success":false,"error":"Internal server error","code":500}"#;

/// Serializes `payload` with sonic-rs into a JSON response.
pub fn respond_json<T: Serialize>(status: StatusCode, payload: &T) -> Response {
    match sonic_rs::to_string(payload) {
        Ok(body) => (status, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!("❌ Response serialization failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                FALLBACK_ERROR,
            )
                .into_response()
        }
    }
}

/// 200 with the success envelope.
pub fn respond_success<T: Serialize>(data: T, message: Option<&str>) -> Response {
    let payload = match message {
        Some(message) => ApiResponse::with_message(data, message),
        None => ApiResponse::data(data),
    };
    respond_json(StatusCode::OK, &payload)
}

/// 201 with the success envelope.
pub fn respond_created<T: Serialize>(data: T, message: &str) -> Response {
    respond_json(StatusCode::CREATED, &ApiResponse::with_message(data, message))
}

/// Unwraps a JSON body, mapping any rejection to a 400.
pub fn json_payload<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(payload)| payload).map_err(|e| {
        tracing::debug!("Rejected request body: {}", e);
        AppError::Validation("Invalid request payload".to_string())
    })
}
