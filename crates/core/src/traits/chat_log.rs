//! Chat-log persistence boundary
//!
//! Logging is fire-and-forget from the conversation core's perspective: the
//! core never reads this data back, and a sink failure must never fail a turn.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::conversation::TurnRole;
use crate::stage::AgentMode;

/// Booking fields recorded against a session once known
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingInfo {
    pub completed: bool,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Message/booking sink
#[async_trait]
pub trait ChatLogger: Send + Sync {
    /// Record one message of a session
    async fn log_message(&self, session_id: &str, role: TurnRole, content: &str, mode: AgentMode);

    /// Record/refresh booking fields for a session
    async fn update_booking_info(&self, session_id: &str, info: &BookingInfo);
}

/// Sink that drops everything
#[derive(Debug, Default)]
pub struct NullChatLogger;

#[async_trait]
impl ChatLogger for NullChatLogger {
    async fn log_message(&self, _: &str, _: TurnRole, _: &str, _: AgentMode) {}

    async fn update_booking_info(&self, _: &str, _: &BookingInfo) {}
}

/// One recorded message
#[derive(Debug, Clone)]
pub struct LoggedMessage {
    pub session_id: String,
    pub role: TurnRole,
    pub content: String,
    pub mode: AgentMode,
}

/// In-memory sink, used in tests and when no database is configured
#[derive(Debug, Default)]
pub struct MemoryChatLogger {
    messages: Mutex<Vec<LoggedMessage>>,
    bookings: Mutex<Vec<(String, BookingInfo)>>,
}

impl MemoryChatLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<LoggedMessage> {
        self.messages.lock().expect("chat log poisoned").clone()
    }

    pub fn bookings(&self) -> Vec<(String, BookingInfo)> {
        self.bookings.lock().expect("chat log poisoned").clone()
    }
}

#[async_trait]
impl ChatLogger for MemoryChatLogger {
    async fn log_message(&self, session_id: &str, role: TurnRole, content: &str, mode: AgentMode) {
        self.messages
            .lock()
            .expect("chat log poisoned")
            .push(LoggedMessage {
                session_id: session_id.to_string(),
                role,
                content: content.to_string(),
                mode,
            });
    }

    async fn update_booking_info(&self, session_id: &str, info: &BookingInfo) {
        self.bookings
            .lock()
            .expect("chat log poisoned")
            .push((session_id.to_string(), info.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_logger_records() {
        let logger = MemoryChatLogger::new();
        logger
            .log_message("s1", TurnRole::User, "hello", AgentMode::Informational)
            .await;
        logger
            .log_message("s1", TurnRole::Assistant, "hi!", AgentMode::Informational)
            .await;

        let messages = logger.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[1].role, TurnRole::Assistant);
    }
}
