//! Types shared between the OpenRouter SDK and the agent chat API.

pub mod agent;
pub mod message;
pub mod session;
pub mod validation;

pub use agent::{Agent, AgentConfig, AgentUpdate};
pub use message::{ContentPart, FunctionCall, ImageUrl, Message, Role, ToolCall};
pub use session::{
    ChatResponse, ChatSession, ErrorResponse, SendMessageRequest, ServerStatus, UsageInfo,
};
pub use validation::{validate_agent_config, validate_message};
