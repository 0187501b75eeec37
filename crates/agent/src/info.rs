//! Informational sub-agent
//!
//! Answers company questions through the retrieval service. The degrade
//! chain never errors a turn: retrieval failure falls back to a direct model
//! answer over a fixed company profile, and a model failure falls back to
//! canned text that still offers to book a meeting.

use std::sync::Arc;

use meeting_agent_core::{Retriever, TurnRole};
use meeting_agent_llm::{LlmBackend, Message};

use crate::state::ConversationState;

const COMPANY_PROFILE: &str = "\
You are a helpful AI assistant for Ixora Solution.

What you know about Ixora Solution:
- Full-cycle offshore software development company based in Bangladesh
- Specializes in custom software solutions, web and mobile development, and \
IT consulting services
- Works with experienced development teams across many technologies

Important:
- Answer from the general information above
- If more specific details are needed, suggest booking a meeting with the team
- Don't make up specific details you don't know
- Be conversational and natural";

const CANNED_FALLBACK: &str = "\
I apologize for the inconvenience. Our knowledge base is temporarily \
unavailable. However, I can still help you book a meeting with our team.\n\n\
Ixora Solution is a full-cycle offshore software development company based \
in Bangladesh, specializing in custom software solutions, web and mobile \
development, and IT consulting services.\n\n\
Would you like to schedule a meeting to learn more?";

const BOOKING_VOCAB: &[&str] = &[
    "book",
    "schedule",
    "meeting",
    "appointment",
    "talk",
    "discuss",
    "consultation",
    "demo",
];

/// Answer plus whether the exchange touched booking vocabulary
#[derive(Debug)]
pub struct InfoReply {
    pub text: String,
    pub suggest_booking: bool,
}

/// Informational handler over the retrieval service
pub struct InfoHandler {
    retriever: Option<Arc<dyn Retriever>>,
    llm: Arc<dyn LlmBackend>,
}

impl InfoHandler {
    pub fn new(retriever: Option<Arc<dyn Retriever>>, llm: Arc<dyn LlmBackend>) -> Self {
        Self { retriever, llm }
    }

    /// Answer one informational turn.
    pub async fn answer(&self, state: &ConversationState, question: &str) -> InfoReply {
        let mut text = match self.retrieve(state, question).await {
            Some(answer) => answer,
            None => self.model_fallback(state, question).await,
        };

        let question_has_vocab = contains_booking_vocab(question);
        let answer_has_vocab = contains_booking_vocab(&text);

        if answer_has_vocab && !text.to_lowercase().contains("would you like me to help you book") {
            text.push_str("\n\nWould you like me to help you book a meeting with our team?");
        }

        InfoReply {
            text,
            suggest_booking: question_has_vocab || answer_has_vocab,
        }
    }

    async fn retrieve(&self, state: &ConversationState, question: &str) -> Option<String> {
        let retriever = self.retriever.as_ref()?;

        // History excludes the question currently being asked
        let transcript = state.recent_turns(12);
        let history = &transcript[..transcript.len().saturating_sub(1)];

        match retriever.answer(question, history).await {
            Ok(answer) => Some(answer.answer),
            Err(e) if e.quota_exhausted() => {
                tracing::warn!(error = %e, "retrieval quota exhausted, degrading to model answer");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "retrieval failed, degrading to model answer");
                None
            }
        }
    }

    async fn model_fallback(&self, state: &ConversationState, question: &str) -> String {
        let mut messages = vec![Message::system(COMPANY_PROFILE)];
        for turn in state.recent_turns(6) {
            messages.push(match turn.role {
                TurnRole::User => Message::user(turn.content.clone()),
                TurnRole::Assistant => Message::assistant(turn.content.clone()),
            });
        }
        messages.push(Message::user(question.to_string()));

        match self.llm.generate(&messages).await {
            Ok(result) => result.text,
            Err(e) => {
                tracing::error!(error = %e, "model fallback failed, using canned answer");
                CANNED_FALLBACK.to_string()
            }
        }
    }
}

fn contains_booking_vocab(text: &str) -> bool {
    let lower = text.to_lowercase();
    BOOKING_VOCAB.iter().any(|word| lower.contains(word))
}
