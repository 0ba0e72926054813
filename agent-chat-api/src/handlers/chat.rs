use crate::error::ApiError;
use crate::AppState;
use actix_web::{delete, get, post, web, HttpResponse};
use shared_types::SendMessageRequest;
use tracing::info;

#[post("/chat/{agent_id}")]
pub async fn send_message(
    agent_id: web::Path<String>,
    req: web::Json<SendMessageRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let agent_id = agent_id.into_inner();
    info!(agent_id = %agent_id, chars = req.message.chars().count(), "Chat message received");

    let response = data.chat.send_message(&agent_id, &req.message).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[get("/chat/{agent_id}/history")]
pub async fn get_history(
    agent_id: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let messages = data.chat.history(&agent_id).await?;
    Ok(HttpResponse::Ok().json(messages))
}

#[delete("/chat/{agent_id}/history")]
pub async fn clear_history(
    agent_id: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    data.chat.clear(&agent_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
