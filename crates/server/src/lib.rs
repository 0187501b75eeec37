//! HTTP server for the meeting agent
//!
//! REST endpoints for session management and chat, plus a streaming chat
//! variant that sends a cosmetic status line followed by the reply in
//! whitespace-preserving chunks.

pub mod http;
pub mod session;
pub mod state;

pub use http::create_router;
pub use session::{Session, SessionManager};
pub use state::AppState;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Agent error: {0}")]
    Agent(#[from] meeting_agent_agent::AgentError),

    #[error("Configuration error: {0}")]
    Config(#[from] meeting_agent_config::ConfigError),
}
