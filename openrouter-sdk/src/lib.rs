//! # OpenRouter SDK
//!
//! Request normalization, response reconciliation and transport for the
//! OpenRouter chat-completions API.
//!
//! ## Example
//!
//! ```rust,no_run
//! use openrouter_sdk::{build_request, ChatParams, OpenRouterClient};
//! use shared_types::{AgentConfig, ChatSession, Message};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenRouterClient::new("your-openrouter-key")?;
//!     let agent = AgentConfig {
//!         name: "Helper".to_string(),
//!         description: String::new(),
//!         model: "openai/gpt-4o-mini".to_string(),
//!         system_prompt: "You are a helpful assistant.".to_string(),
//!         temperature: 0.7,
//!         max_tokens: 1024,
//!     };
//!
//!     let mut session = ChatSession::new("agent-1");
//!     session.push(Message::user("Hello!"));
//!
//!     let params = ChatParams::from_agent(&agent);
//!     let request = build_request(&session, &agent, Some(&params));
//!     let reply = client.chat_completion(&request).await?;
//!
//!     println!("Response: {}", reply.content);
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod error;
pub mod models;
pub mod normalize;
pub mod openrouter;
pub mod reconcile;
pub mod tools;
pub mod types;

pub use builder::ChatRequestBuilder;
pub use client::{ChatTransport, TransportResponse};
pub use error::{ChatError, ChatErrorKind};
pub use normalize::{build_request, ChatParams};
pub use openrouter::OpenRouterClient;
pub use reconcile::{parse_response, reconcile, NormalizedReply};
