//! Intent routing between the informational sub-agent and the booking funnel
//!
//! An in-progress booking stage routes unconditionally to the funnel:
//! contact details must never be hijacked by a misclassified informational
//! query. Outside the funnel, an explicit booking phrase forces the funnel
//! regardless of what the classifier thinks.

use std::sync::Arc;

use meeting_agent_core::TurnRole;
use meeting_agent_llm::{Classifier, Message, RouteIntent};

use crate::state::ConversationState;

/// Where a message goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Informational,
    Booking,
}

const BOOKING_PHRASES: &[&str] = &[
    "book a meeting",
    "schedule a meeting",
    "arrange a meeting",
    "set up a meeting",
    "book meeting",
    "schedule meeting",
    "i want to book",
    "i'd like to book",
    "can i book",
    "help me book",
];

/// Per-turn router
pub struct IntentRouter {
    classifier: Arc<Classifier>,
}

impl IntentRouter {
    pub fn new(classifier: Arc<Classifier>) -> Self {
        Self { classifier }
    }

    /// Decide where this message goes given the current state.
    pub async fn route(&self, state: &ConversationState, message: &str) -> Route {
        if state.stage.in_funnel() {
            return Route::Booking;
        }

        let lower = message.to_lowercase();
        if BOOKING_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
            tracing::debug!("explicit booking phrase, overriding classifier");
            return Route::Booking;
        }

        // Last few turns (excluding the message being routed) as context
        let turns = state.recent_turns(4);
        let context: Vec<Message> = turns
            .iter()
            .take(turns.len().saturating_sub(1))
            .map(|turn| match turn.role {
                TurnRole::User => Message::user(turn.content.clone()),
                TurnRole::Assistant => Message::assistant(turn.content.clone()),
            })
            .collect();

        match self.classifier.route(message, &context).await {
            RouteIntent::Booking => Route::Booking,
            RouteIntent::Informational => Route::Informational,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_phrases_cover_common_forms() {
        let lower = "hey, can I book a meeting next week?".to_lowercase();
        assert!(BOOKING_PHRASES.iter().any(|p| lower.contains(p)));

        let lower = "what services do you offer".to_lowercase();
        assert!(!BOOKING_PHRASES.iter().any(|p| lower.contains(p)));
    }
}
