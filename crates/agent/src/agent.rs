//! Meeting agent orchestrator
//!
//! Holds the per-session conversation state and drives one turn at a time:
//! route the message, run the cancellation pre-check where it applies,
//! dispatch to the funnel or the informational handler, and return exactly
//! one reply. Chat logging is fire-and-forget.

use std::sync::Arc;

use chrono::Local;
use tokio::sync::Mutex;

use meeting_agent_core::{
    AgentMode, BookingInfo, BookingStage, BookingStatus, ChatLogger, Retriever,
    SchedulingGateway, TurnRole,
};
use meeting_agent_llm::{Classifier, LlmBackend};

use crate::funnel::{BookingFunnel, TurnOutcome};
use crate::info::InfoHandler;
use crate::router::{IntentRouter, Route};
use crate::state::ConversationState;
use crate::AgentError;

/// One conversational assistant instance, bound to a session
pub struct MeetingAgent {
    session_id: String,
    state: Mutex<ConversationState>,
    funnel: BookingFunnel,
    router: IntentRouter,
    info: InfoHandler,
    classifier: Arc<Classifier>,
    chat_log: Arc<dyn ChatLogger>,
}

impl MeetingAgent {
    pub fn new(
        session_id: impl Into<String>,
        llm: Arc<dyn LlmBackend>,
        classifier: Arc<Classifier>,
        gateway: Arc<dyn SchedulingGateway>,
        retriever: Option<Arc<dyn Retriever>>,
        chat_log: Arc<dyn ChatLogger>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            state: Mutex::new(ConversationState::new()),
            funnel: BookingFunnel::new(llm.clone(), classifier.clone(), gateway),
            router: IntentRouter::new(classifier.clone()),
            info: InfoHandler::new(retriever, llm),
            classifier,
            chat_log,
        }
    }

    /// Process one user message and produce the assistant reply.
    ///
    /// Single-writer per session: the state lock is held for the whole turn,
    /// so a turn either completes and returns a reply or fails without
    /// leaving partial mutations visible to another turn.
    pub async fn process(&self, message: &str) -> Result<String, AgentError> {
        let mut state = self.state.lock().await;
        let today = Local::now().date_naive();

        tracing::info!(
            session_id = %self.session_id,
            stage = %state.stage,
            "processing message"
        );

        state.push_user(message);
        self.log(TurnRole::User, message, state.agent_mode);

        let was_booked = state.booking == BookingStatus::Succeeded;
        let route = self.router.route(&state, message).await;

        let reply = match route {
            Route::Booking => self.booking_turn(&mut state, message, today).await?,
            Route::Informational => {
                state.agent_mode = AgentMode::Informational;
                let info = self.info.answer(&state, message).await;
                state.suggest_booking = info.suggest_booking;
                info.text
            }
        };

        // A funnel that ended idle hands the next turn to the informational
        // sub-agent by default
        if state.stage == BookingStage::Idle {
            state.agent_mode = AgentMode::Informational;
        }

        state.push_assistant(&reply);
        self.log(TurnRole::Assistant, &reply, state.agent_mode);

        if state.booking == BookingStatus::Succeeded && !was_booked {
            self.log_booking(&state);
        }

        Ok(reply)
    }

    async fn booking_turn(
        &self,
        state: &mut ConversationState,
        message: &str,
        today: chrono::NaiveDate,
    ) -> Result<String, AgentError> {
        // Cancellation pre-check for an in-progress funnel. The cancelling
        // turn only emits the acknowledgement; the informational sub-agent
        // picks up from the next message.
        if state.stage.cancellable()
            && self
                .classifier
                .cancellation(message, state.stage.display_name())
                .await
        {
            tracing::info!(session_id = %self.session_id, "booking abandoned by user");
            state.reset_booking();
            state.transition(BookingStage::Idle)?;
            state.agent_mode = AgentMode::Informational;
            return Ok(
                "No problem! I'd be happy to tell you more about Ixora Solution. \
                 What would you like to know?"
                    .to_string(),
            );
        }

        state.agent_mode = AgentMode::Booking;
        if state.stage == BookingStage::Idle {
            state.transition(BookingStage::CollectingRequirements)?;
        }

        match self.funnel.handle_turn(state, message, today).await? {
            TurnOutcome::Reply(reply) => Ok(reply),
            TurnOutcome::HandOff => {
                state.transition(BookingStage::Idle)?;
                state.agent_mode = AgentMode::Informational;
                let info = self.info.answer(state, message).await;
                state.suggest_booking = info.suggest_booking;
                Ok(info.text)
            }
        }
    }

    fn log(&self, role: TurnRole, content: &str, mode: AgentMode) {
        let chat_log = self.chat_log.clone();
        let session_id = self.session_id.clone();
        let content = content.to_string();
        tokio::spawn(async move {
            chat_log.log_message(&session_id, role, &content, mode).await;
        });
    }

    fn log_booking(&self, state: &ConversationState) {
        let info = BookingInfo {
            completed: true,
            date: state.date.as_ref().map(|d| d.date),
            time: state.selected_slot.as_ref().map(|s| s.display_time.clone()),
            name: state.contact.name.value().map(str::to_string),
            email: state.contact.email.value().map(str::to_string),
            phone: state.contact.phone.value().map(str::to_string),
        };
        let chat_log = self.chat_log.clone();
        let session_id = self.session_id.clone();
        tokio::spawn(async move {
            chat_log.update_booking_info(&session_id, &info).await;
        });
    }

    /// Current stage
    pub async fn stage(&self) -> BookingStage {
        self.state.lock().await.stage
    }

    /// Last routing decision
    pub async fn agent_mode(&self) -> AgentMode {
        self.state.lock().await.agent_mode
    }

    /// Cosmetic status line for the stream header
    pub async fn status_line(&self) -> &'static str {
        self.state.lock().await.stage.status_line()
    }

    /// Number of transcript turns
    pub async fn turn_count(&self) -> usize {
        self.state.lock().await.transcript.len()
    }

    /// Snapshot of the state for inspection (tests, admin views)
    pub async fn snapshot(&self) -> ConversationState {
        self.state.lock().await.clone()
    }

    /// Throw away the conversation entirely
    pub async fn reset(&self) {
        *self.state.lock().await = ConversationState::new();
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}
