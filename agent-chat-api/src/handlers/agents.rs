use crate::error::ApiError;
use crate::AppState;
use actix_web::{delete, get, patch, post, web, HttpResponse};
use shared_types::{validate_agent_config, Agent, AgentConfig, AgentUpdate};
use tracing::{info, warn};

fn agent_not_found(id: &str) -> ApiError {
    warn!(agent_id = %id, "Agent not found");
    ApiError::NotFound("Agent not found".to_string())
}

#[get("/agents")]
pub async fn list_agents(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let agents = data.agents.list().await?;
    Ok(HttpResponse::Ok().json(agents))
}

#[post("/agents")]
pub async fn create_agent(
    req: web::Json<AgentConfig>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let config = req.into_inner();
    let errors = validate_agent_config(&config);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let agent = data.agents.create(Agent::new(config)).await?;
    info!(agent_id = %agent.id, name = %agent.config.name, "Created agent");
    Ok(HttpResponse::Created().json(agent))
}

#[get("/agents/{id}")]
pub async fn get_agent(
    id: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    match data.agents.get(&id).await? {
        Some(agent) => Ok(HttpResponse::Ok().json(agent)),
        None => Err(agent_not_found(&id)),
    }
}

#[patch("/agents/{id}")]
pub async fn update_agent(
    id: web::Path<String>,
    req: web::Json<AgentUpdate>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let mut agent = data
        .agents
        .get(&id)
        .await?
        .ok_or_else(|| agent_not_found(&id))?;

    agent.apply(req.into_inner());
    let errors = validate_agent_config(&agent.config);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let agent = data.agents.update(agent).await?;
    info!(agent_id = %agent.id, "Updated agent");
    Ok(HttpResponse::Ok().json(agent))
}

#[delete("/agents/{id}")]
pub async fn delete_agent(
    id: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    if !data.agents.delete(&id).await? {
        return Err(agent_not_found(&id));
    }

    data.chat.clear(&id).await?;
    info!(agent_id = %id, "Deleted agent and its chat history");
    Ok(HttpResponse::NoContent().finish())
}
