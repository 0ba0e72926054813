use actix_web::web;

use crate::error::ApiError;

pub mod agents;
pub mod chat;
pub mod health;
pub mod models;

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::InvalidRequest(format!("Invalid request body: {}", err)).into()
    })
}

/// Mount every route under `/api`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(json_config())
            .service(chat::send_message)
            .service(chat::get_history)
            .service(chat::clear_history)
            .service(agents::list_agents)
            .service(agents::create_agent)
            .service(agents::get_agent)
            .service(agents::update_agent)
            .service(agents::delete_agent)
            .service(models::list_models)
            .service(models::key_info)
            .service(health::health_check),
    );
}
