//! Per-session conversation state
//!
//! One instance per active session, owned by the orchestrator and mutated by
//! exactly one logical turn at a time. The transcript is append-only; the
//! booking fields are reset as a unit, never piecemeal.

use meeting_agent_core::{
    AgentMode, BookingStage, BookingStatus, ContactInfo, Slot, Turn, TurnRole,
};
use meeting_agent_extract::ResolvedDate;

use crate::AgentError;

/// Everything known about the current conversation and booking attempt
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    /// Ordered message history; append-only within a turn
    pub transcript: Vec<Turn>,
    /// The state machine's program counter
    pub stage: BookingStage,
    /// Last routing decision, persisted so short acknowledgements are read
    /// in the context of the ongoing funnel
    pub agent_mode: AgentMode,
    /// Resolved date preference; never stored as raw free text
    pub date: Option<ResolvedDate>,
    /// Free-text meeting purpose, forwarded as booking notes
    pub meeting_purpose: Option<String>,
    /// Contact fields, each with its own lifecycle
    pub contact: ContactInfo,
    /// Open slots for the resolved date; replaced wholesale per date,
    /// never merged
    pub available_slots: Vec<Slot>,
    /// The chosen slot; always an element of `available_slots`
    pub selected_slot: Option<Slot>,
    /// Whether a commit has been attempted and how it went
    pub booking: BookingStatus,
    /// Set when an informational answer touched booking vocabulary
    pub suggest_booking: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.transcript.push(Turn::user(content));
    }

    /// Append an assistant turn
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.transcript.push(Turn::assistant(content));
    }

    /// Most recent assistant message, if any
    pub fn last_assistant(&self) -> Option<&str> {
        self.transcript
            .iter()
            .rev()
            .find(|turn| turn.role == TurnRole::Assistant)
            .map(|turn| turn.content.as_str())
    }

    /// Most recent user message, if any
    pub fn last_user(&self) -> Option<&str> {
        self.transcript
            .iter()
            .rev()
            .find(|turn| turn.role == TurnRole::User)
            .map(|turn| turn.content.as_str())
    }

    /// The last few turns, oldest first, for model context
    pub fn recent_turns(&self, count: usize) -> &[Turn] {
        let len = self.transcript.len();
        &self.transcript[len.saturating_sub(count)..]
    }

    /// Move to another stage, enforcing the transition table. Staying put is
    /// always allowed.
    pub fn transition(&mut self, to: BookingStage) -> Result<(), AgentError> {
        if to == self.stage {
            return Ok(());
        }
        if !self.stage.can_transition_to(to) {
            return Err(AgentError::Stage(format!(
                "invalid transition from {} to {}",
                self.stage, to
            )));
        }
        tracing::debug!(from = %self.stage, to = %to, "stage transition");
        self.stage = to;
        Ok(())
    }

    /// Replace the offered slots for a newly resolved date. Stale slots from
    /// a previous date never survive this.
    pub fn set_slots(&mut self, slots: Vec<Slot>) {
        self.available_slots = slots;
        self.selected_slot = None;
    }

    /// Forget the resolved date and everything scoped to it
    pub fn clear_date(&mut self) {
        self.date = None;
        self.available_slots.clear();
        self.selected_slot = None;
    }

    /// Reset every booking field, keeping the transcript. The stage is left
    /// for the caller to move explicitly through the transition table.
    pub fn reset_booking(&mut self) {
        self.date = None;
        self.meeting_purpose = None;
        self.contact = ContactInfo::default();
        self.available_slots.clear();
        self.selected_slot = None;
        self.booking = BookingStatus::NotAttempted;
        self.suggest_booking = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn slot(h: u32) -> Slot {
        Slot::new(
            NaiveDate::from_ymd_opt(2025, 10, 14)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_transition_table_enforced() {
        let mut state = ConversationState::new();
        assert!(state.transition(BookingStage::AwaitingConfirmation).is_err());
        assert_eq!(state.stage, BookingStage::Idle);

        state.transition(BookingStage::CollectingRequirements).unwrap();
        state.transition(BookingStage::FetchingSlots).unwrap();
        state.transition(BookingStage::AwaitingSlotSelection).unwrap();
        assert_eq!(state.stage, BookingStage::AwaitingSlotSelection);

        // Staying put is a no-op
        state.transition(BookingStage::AwaitingSlotSelection).unwrap();
    }

    #[test]
    fn test_set_slots_drops_selection() {
        let mut state = ConversationState::new();
        state.set_slots(vec![slot(10), slot(14)]);
        state.selected_slot = Some(state.available_slots[0].clone());

        state.set_slots(vec![slot(9)]);
        assert_eq!(state.available_slots.len(), 1);
        assert!(state.selected_slot.is_none());
    }

    #[test]
    fn test_reset_booking_preserves_transcript() {
        let mut state = ConversationState::new();
        state.push_user("book a meeting");
        state.push_assistant("what date?");
        state.meeting_purpose = Some("demo".to_string());
        state.set_slots(vec![slot(10)]);
        state.booking = BookingStatus::Failed;

        state.reset_booking();
        assert_eq!(state.transcript.len(), 2);
        assert!(state.meeting_purpose.is_none());
        assert!(state.available_slots.is_empty());
        assert_eq!(state.booking, BookingStatus::NotAttempted);
    }

    #[test]
    fn test_last_messages() {
        let mut state = ConversationState::new();
        assert!(state.last_assistant().is_none());

        state.push_user("hello");
        state.push_assistant("hi there");
        state.push_user("book a meeting");

        assert_eq!(state.last_assistant(), Some("hi there"));
        assert_eq!(state.last_user(), Some("book a meeting"));
        assert_eq!(state.recent_turns(2).len(), 2);
        assert_eq!(state.recent_turns(10).len(), 3);
    }
}
