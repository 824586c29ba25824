use crate::models::StatusResponse;
use axum::Json;
use service_core::error::AppError;

pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "API is running 🚀".to_string(),
        endpoint: "/ask".to_string(),
    })
}

pub async fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Not found"))
}
