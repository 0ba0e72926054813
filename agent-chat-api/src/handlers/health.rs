use crate::error::ApiError;
use crate::AppState;
use actix_web::{get, web, HttpResponse};
use openrouter_sdk::ChatError;
use shared_types::ServerStatus;

#[get("/health")]
pub async fn health_check(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let uptime = data
        .start_time
        .elapsed()
        .map_err(|e| ChatError::internal(format!("Failed to calculate uptime: {e}")))?
        .as_secs();

    let status = ServerStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime,
    };

    Ok(HttpResponse::Ok().json(status))
}
