use crate::error::ApiError;
use crate::AppState;
use actix_web::{get, web, HttpResponse};

#[get("/models")]
pub async fn list_models(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let models = data.openrouter.list_models().await?;
    Ok(HttpResponse::Ok().json(models))
}

#[get("/key")]
pub async fn key_info(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let info = data.openrouter.key_info().await?;
    Ok(HttpResponse::Ok().json(info))
}
