//! Conversation state machine and orchestration
//!
//! Features:
//! - Statically-shaped per-session conversation state
//! - One turn handler per booking stage, with auto-advance for slot fetch
//!   and booking commit
//! - Intent routing between the informational sub-agent and the funnel,
//!   with cancellation detection
//! - Informational handler that degrades from retrieval to a direct model
//!   answer to canned text

pub mod agent;
pub mod funnel;
pub mod info;
pub mod router;
pub mod state;

pub use agent::MeetingAgent;
pub use funnel::{BookingFunnel, TurnOutcome};
pub use info::InfoHandler;
pub use router::{IntentRouter, Route};
pub use state::ConversationState;

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Stage error: {0}")]
    Stage(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Gateway error: {0}")]
    Gateway(String),
}

impl From<meeting_agent_llm::LlmError> for AgentError {
    fn from(err: meeting_agent_llm::LlmError) -> Self {
        AgentError::Llm(err.to_string())
    }
}

impl From<meeting_agent_core::GatewayError> for AgentError {
    fn from(err: meeting_agent_core::GatewayError) -> Self {
        AgentError::Gateway(err.to_string())
    }
}
