use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use agent_chat_api::config::{ApiConfig, StorageBackend};
use agent_chat_api::storage::{
    initialize_database, AgentStore, InMemoryAgentStore, InMemorySessionStore, SessionStore,
    SqliteAgentStore, SqliteSessionStore,
};
use agent_chat_api::{handlers, logging, AppState};
use clap::Parser;
use openrouter_sdk::{ChatTransport, OpenRouterClient};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "agent-chat-api", version, about = "Chat with configurable OpenRouter agents")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(short, long)]
    port: Option<u16>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, config_path) = match cli.config {
        Some(path) => (ApiConfig::load_from(&path)?, path),
        None => ApiConfig::load()?,
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let _log_guard = logging::init_tracing(config.logging.as_ref());
    info!("Loaded configuration from {}", config_path.display());

    let (sessions, agents): (Arc<dyn SessionStore>, Arc<dyn AgentStore>) =
        match config.database.backend {
            StorageBackend::Sqlite => {
                let conn = initialize_database(&config.database.path)?;
                info!("Database initialized at {}", config.database.path.display());
                (
                    Arc::new(SqliteSessionStore::new(conn.clone())),
                    Arc::new(SqliteAgentStore::new(conn)),
                )
            }
            StorageBackend::Memory => {
                info!("Using in-memory storage; data is lost on exit");
                (
                    Arc::new(InMemorySessionStore::new()),
                    Arc::new(InMemoryAgentStore::new()),
                )
            }
        };

    let openrouter = Arc::new(
        OpenRouterClient::new(config.api_key()?)?
            .with_base_url(config.openrouter.base_url.clone())
            .with_app_info(
                config.openrouter.app_url.clone(),
                config.openrouter.app_title.clone(),
            )
            .with_timeout(Duration::from_secs(config.openrouter.timeout_secs))?,
    );
    let transport: Arc<dyn ChatTransport> = openrouter.clone();

    let state = web::Data::new(AppState::new(sessions, agents, transport, openrouter));
    let allowed_origins = config
        .cors
        .as_ref()
        .map(|c| c.allowed_origins.clone())
        .unwrap_or_default();

    let bind_addr = config.bind_address();
    info!("Starting agent-chat-api server at http://{}", bind_addr);

    HttpServer::new(move || {
        let cors = allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
