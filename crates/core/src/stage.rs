//! Booking stage state machine types
//!
//! `BookingStage` is the single source of truth for what happens on the next
//! user message. Every transition goes through the stage handlers; the
//! transition table below is what those handlers are allowed to do.

use serde::{Deserialize, Serialize};

/// Which sub-agent handled (or should handle) a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    /// Answering company-information questions
    #[default]
    Informational,
    /// Driving the booking funnel
    Booking,
}

impl AgentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentMode::Informational => "informational",
            AgentMode::Booking => "booking",
        }
    }
}

/// Position in the booking funnel
///
/// `FetchingSlots` and `Booking` are auto-advance stages: they execute within
/// the turn that entered them and are never the resting stage between turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStage {
    /// No booking in progress; routing decides per message
    #[default]
    Idle,
    /// Waiting for a usable date preference
    CollectingRequirements,
    /// Date resolved; querying the provider for open slots
    FetchingSlots,
    /// No slots (or a failed fetch/commit); asking whether to try another date
    AwaitingNewDate,
    /// Slots presented; waiting for a selection
    AwaitingSlotSelection,
    /// Slot chosen; collecting name, email and phone
    CollectingContactInfo,
    /// Everything gathered; waiting for a yes/no on the summary
    AwaitingConfirmation,
    /// Confirmed; committing the booking with the provider
    Booking,
    /// Booking committed successfully
    BookingComplete,
}

impl BookingStage {
    /// Get stage display name
    pub fn display_name(&self) -> &'static str {
        match self {
            BookingStage::Idle => "Idle",
            BookingStage::CollectingRequirements => "Collecting Requirements",
            BookingStage::FetchingSlots => "Fetching Slots",
            BookingStage::AwaitingNewDate => "Awaiting New Date",
            BookingStage::AwaitingSlotSelection => "Awaiting Slot Selection",
            BookingStage::CollectingContactInfo => "Collecting Contact Info",
            BookingStage::AwaitingConfirmation => "Awaiting Confirmation",
            BookingStage::Booking => "Booking",
            BookingStage::BookingComplete => "Booking Complete",
        }
    }

    /// Whether a booking is in progress (routes unconditionally to the funnel)
    pub fn in_funnel(&self) -> bool {
        !matches!(self, BookingStage::Idle)
    }

    /// Whether the cancellation pre-check runs before this stage's handler
    ///
    /// Confirmation has its own dedicated yes/no handling, and a completed
    /// booking has nothing left to cancel.
    pub fn cancellable(&self) -> bool {
        self.in_funnel()
            && !matches!(
                self,
                BookingStage::AwaitingConfirmation | BookingStage::BookingComplete
            )
    }

    /// Get allowed transitions from this stage
    pub fn allowed_transitions(&self) -> &'static [BookingStage] {
        match self {
            BookingStage::Idle => &[BookingStage::CollectingRequirements],
            BookingStage::CollectingRequirements => {
                &[BookingStage::FetchingSlots, BookingStage::Idle]
            }
            BookingStage::FetchingSlots => &[
                BookingStage::AwaitingSlotSelection,
                BookingStage::AwaitingNewDate,
            ],
            BookingStage::AwaitingNewDate => &[
                BookingStage::CollectingRequirements,
                BookingStage::FetchingSlots,
                BookingStage::Idle,
            ],
            BookingStage::AwaitingSlotSelection => {
                &[BookingStage::CollectingContactInfo, BookingStage::Idle]
            }
            BookingStage::CollectingContactInfo => &[
                BookingStage::AwaitingConfirmation,
                BookingStage::CollectingRequirements,
                BookingStage::FetchingSlots,
                BookingStage::Idle,
            ],
            BookingStage::AwaitingConfirmation => {
                &[BookingStage::Booking, BookingStage::AwaitingNewDate]
            }
            BookingStage::Booking => {
                &[BookingStage::BookingComplete, BookingStage::AwaitingNewDate]
            }
            BookingStage::BookingComplete => &[
                BookingStage::CollectingRequirements,
                BookingStage::FetchingSlots,
                BookingStage::Idle,
            ],
        }
    }

    /// Check if transition to target stage is allowed
    pub fn can_transition_to(&self, target: BookingStage) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Cosmetic status line shown while this stage's handler executes
    pub fn status_line(&self) -> &'static str {
        match self {
            BookingStage::Idle => "Thinking...",
            BookingStage::AwaitingSlotSelection => "Processing your selection...",
            BookingStage::CollectingContactInfo => "Extracting your information...",
            BookingStage::AwaitingConfirmation => "Processing confirmation...",
            BookingStage::CollectingRequirements
            | BookingStage::FetchingSlots
            | BookingStage::AwaitingNewDate => "Fetching available time slots...",
            BookingStage::Booking => "Booking your meeting...",
            BookingStage::BookingComplete => "Processing your request...",
        }
    }
}

impl std::fmt::Display for BookingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_only_enters_requirements() {
        let stage = BookingStage::Idle;
        assert!(stage.can_transition_to(BookingStage::CollectingRequirements));
        assert!(!stage.can_transition_to(BookingStage::AwaitingConfirmation));
        assert!(!stage.in_funnel());
    }

    #[test]
    fn test_fetching_cannot_skip_selection() {
        let stage = BookingStage::FetchingSlots;
        assert!(stage.can_transition_to(BookingStage::AwaitingSlotSelection));
        assert!(stage.can_transition_to(BookingStage::AwaitingNewDate));
        assert!(!stage.can_transition_to(BookingStage::CollectingContactInfo));
    }

    #[test]
    fn test_confirmation_is_not_cancellable() {
        assert!(!BookingStage::AwaitingConfirmation.cancellable());
        assert!(!BookingStage::BookingComplete.cancellable());
        assert!(BookingStage::CollectingContactInfo.cancellable());
        assert!(BookingStage::AwaitingSlotSelection.cancellable());
    }

    #[test]
    fn test_booking_outcomes() {
        let stage = BookingStage::Booking;
        assert!(stage.can_transition_to(BookingStage::BookingComplete));
        assert!(stage.can_transition_to(BookingStage::AwaitingNewDate));
        assert!(!stage.can_transition_to(BookingStage::Idle));
    }
}
