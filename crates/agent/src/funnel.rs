//! Booking funnel turn handlers
//!
//! One handler per resting stage. `FetchingSlots` and `Booking` are executed
//! inline by the handler that enters them (auto-advance); each still
//! re-checks its own entry condition before acting. Every handler returns
//! exactly one outbound reply — or hands the turn to the informational
//! sub-agent — and leaves the stage somewhere its preconditions hold.

use std::sync::Arc;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use meeting_agent_core::{
    AgentMode, BookingRequest, BookingStage, BookingStatus, SchedulingGateway, Slot,
};
use meeting_agent_extract::{
    extract_contact, parse_selection, resolve_phrase, scan_message, validate_email, validate_name,
    validate_phone, DateSignal, ResolvedDate, SelectionOutcome,
};
use meeting_agent_llm::{
    classify::parse_json_payload, Classifier, Confirmation, ContactTurnIntent, LlmBackend,
    Message, NewBookingIntent,
};

use crate::state::ConversationState;
use crate::AgentError;

/// Result of a funnel turn
#[derive(Debug)]
pub enum TurnOutcome {
    /// The funnel produced this reply
    Reply(String),
    /// The turn belongs to the informational sub-agent (post-completion talk)
    HandOff,
}

/// Payload shape for model-based requirements extraction
#[derive(Debug, Deserialize)]
struct RequirementsPayload {
    date_preference: Option<String>,
    meeting_purpose: Option<String>,
}

/// Payload shape for model-based contact extraction
#[derive(Debug, Deserialize)]
struct ContactPayload {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

/// Payload shape for the fuzzy slot match
#[derive(Debug, Deserialize)]
struct SlotMatchPayload {
    time: Option<String>,
}

static PURPOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:to discuss|regarding|to talk about)\s+([^.!?]{3,100})").unwrap()
});

/// The booking funnel: stage handlers plus their gateway/model calls
pub struct BookingFunnel {
    llm: Arc<dyn LlmBackend>,
    classifier: Arc<Classifier>,
    gateway: Arc<dyn SchedulingGateway>,
}

impl BookingFunnel {
    pub fn new(
        llm: Arc<dyn LlmBackend>,
        classifier: Arc<Classifier>,
        gateway: Arc<dyn SchedulingGateway>,
    ) -> Self {
        Self {
            llm,
            classifier,
            gateway,
        }
    }

    /// Process one user message while in the funnel.
    pub async fn handle_turn(
        &self,
        state: &mut ConversationState,
        message: &str,
        today: NaiveDate,
    ) -> Result<TurnOutcome, AgentError> {
        let reply = match state.stage {
            BookingStage::CollectingRequirements => {
                self.handle_requirements(state, message, today).await?
            }
            BookingStage::AwaitingNewDate => self.handle_new_date(state, message, today).await?,
            BookingStage::AwaitingSlotSelection => {
                self.handle_slot_selection(state, message).await?
            }
            BookingStage::CollectingContactInfo => {
                self.handle_contact_info(state, message, today).await?
            }
            BookingStage::AwaitingConfirmation => {
                self.handle_confirmation(state, message).await?
            }
            BookingStage::BookingComplete => {
                return self.handle_complete(state, message, today).await;
            }
            // Transient stages never rest between turns; reaching one here
            // means a handler failed to advance.
            BookingStage::Idle | BookingStage::FetchingSlots | BookingStage::Booking => {
                return Err(AgentError::Stage(format!(
                    "funnel dispatched while in {}",
                    state.stage
                )));
            }
        };
        Ok(TurnOutcome::Reply(reply))
    }

    // ---- collecting_requirements ------------------------------------------

    async fn handle_requirements(
        &self,
        state: &mut ConversationState,
        message: &str,
        today: NaiveDate,
    ) -> Result<String, AgentError> {
        if state.meeting_purpose.is_none() {
            if let Some(caps) = PURPOSE.captures(message) {
                let candidate = caps[1].trim();
                // A purpose that reads as a date phrase isn't a purpose
                if resolve_phrase(candidate, today).is_none() {
                    state.meeting_purpose = Some(candidate.to_string());
                }
            }
        }

        match scan_message(message, today) {
            DateSignal::Resolved(resolved) => {
                state.date = Some(resolved);
                self.fetch_and_present(state).await
            }
            DateSignal::Unparseable(phrase) => Ok(format!(
                "I couldn't make sense of the date \"{phrase}\". \
                 Could you try something like 'tomorrow', 'next Monday', or 'October 15'?"
            )),
            DateSignal::NotSpecified => {
                // Model fallback over the recent turns; strict parse, and a
                // malformed payload is the same as no date at all.
                if let Some(resolved) = self.extract_requirements_llm(state, today).await {
                    state.date = Some(resolved);
                    return self.fetch_and_present(state).await;
                }
                Ok(ask_for_date())
            }
        }
    }

    async fn extract_requirements_llm(
        &self,
        state: &mut ConversationState,
        today: NaiveDate,
    ) -> Option<ResolvedDate> {
        let system = "\
You extract meeting requirements from a conversation. Identify:
- date_preference: the preferred meeting date as the user phrased it \
(only the date, not the time)
- meeting_purpose: the purpose or topic of the meeting

Use null for anything not mentioned. Return ONLY a JSON object with keys \
date_preference and meeting_purpose.";

        let mut messages = vec![Message::system(system)];
        for turn in state.recent_turns(6) {
            messages.push(match turn.role {
                meeting_agent_core::TurnRole::User => Message::user(turn.content.clone()),
                meeting_agent_core::TurnRole::Assistant => {
                    Message::assistant(turn.content.clone())
                }
            });
        }
        messages.push(Message::user(
            "Extract the meeting requirements from the conversation above.",
        ));

        let result = match self.llm.generate(&messages).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "requirements extraction call failed");
                return None;
            }
        };

        let payload: RequirementsPayload = parse_json_payload(&result.text)?;

        if state.meeting_purpose.is_none() {
            if let Some(purpose) = payload.meeting_purpose.filter(|p| !p.trim().is_empty()) {
                state.meeting_purpose = Some(purpose);
            }
        }

        payload
            .date_preference
            .and_then(|phrase| resolve_phrase(&phrase, today))
    }

    // ---- fetching_slots (auto-advance) ------------------------------------

    async fn fetch_and_present(&self, state: &mut ConversationState) -> Result<String, AgentError> {
        // Entry condition: a resolved date
        let Some(date) = state.date.clone() else {
            return Err(AgentError::Stage(
                "fetching slots without a resolved date".to_string(),
            ));
        };
        state.transition(BookingStage::FetchingSlots)?;

        match self.gateway.fetch_slots(date.date).await {
            Ok(slots) if !slots.is_empty() => {
                state.set_slots(slots);
                state.transition(BookingStage::AwaitingSlotSelection)?;
                Ok(slot_list_message(&date, &state.available_slots))
            }
            Ok(_) => {
                state.clear_date();
                state.transition(BookingStage::AwaitingNewDate)?;
                Ok(format!(
                    "No available slots found for {}. Would you like to try a different date?",
                    date.display
                ))
            }
            Err(e) => {
                tracing::error!(error = %e, date = %date.display, "slot fetch failed");
                state.clear_date();
                state.transition(BookingStage::AwaitingNewDate)?;
                let retry_hint = if e.is_transient() {
                    " Please try again in a moment."
                } else {
                    ""
                };
                Ok(format!(
                    "I couldn't look up available times: {}.{retry_hint} \
                     Would you like to try a different date?",
                    e.user_message()
                ))
            }
        }
    }

    // ---- awaiting_new_date ------------------------------------------------

    async fn handle_new_date(
        &self,
        state: &mut ConversationState,
        message: &str,
        today: NaiveDate,
    ) -> Result<String, AgentError> {
        // Whatever happens next starts from a clean date
        state.clear_date();

        match self.classifier.new_booking(message).await {
            NewBookingIntent::Yes => {
                state.transition(BookingStage::CollectingRequirements)?;
                Ok("Great! What date would work best for you?".to_string())
            }
            NewBookingIntent::No => {
                state.reset_booking();
                state.transition(BookingStage::Idle)?;
                Ok(
                    "No problem! Feel free to reach out when you'd like to book a meeting. \
                     Have a great day!"
                        .to_string(),
                )
            }
            NewBookingIntent::NewRequest => {
                state.transition(BookingStage::CollectingRequirements)?;
                self.handle_requirements(state, message, today).await
            }
        }
    }

    // ---- awaiting_slot_selection ------------------------------------------

    async fn handle_slot_selection(
        &self,
        state: &mut ConversationState,
        message: &str,
    ) -> Result<String, AgentError> {
        if state.available_slots.is_empty() {
            return Err(AgentError::Stage(
                "awaiting slot selection with no slots".to_string(),
            ));
        }

        match parse_selection(message, state.available_slots.len()) {
            SelectionOutcome::Chosen(index) => {
                let slot = state.available_slots[index].clone();
                self.accept_slot(state, slot)
            }
            SelectionOutcome::OutOfRange { given, max } => Ok(format!(
                "Sorry, slot number {given} is not valid. \
                 Please choose a number between 1 and {max}."
            )),
            SelectionOutcome::NotNumeric => match self.fuzzy_match_slot(state, message).await {
                Some(slot) => self.accept_slot(state, slot),
                None => Ok(
                    "I couldn't understand your selection. Please choose a slot number \
                     (e.g., '1', '2') or try again."
                        .to_string(),
                ),
            },
        }
    }

    fn accept_slot(
        &self,
        state: &mut ConversationState,
        slot: Slot,
    ) -> Result<String, AgentError> {
        let time = slot.display_time.clone();
        state.selected_slot = Some(slot);
        state.transition(BookingStage::CollectingContactInfo)?;
        Ok(format!(
            "Perfect! You've selected the {time} slot.\n\n\
             To complete the booking, I need your name, email, and phone number."
        ))
    }

    /// Natural-language match against the offered list. The match is only
    /// accepted if it names a slot we actually offered; anything else is
    /// treated as an unparseable selection.
    async fn fuzzy_match_slot(
        &self,
        state: &ConversationState,
        message: &str,
    ) -> Option<Slot> {
        let listing = state
            .available_slots
            .iter()
            .enumerate()
            .map(|(i, slot)| format!("{}. {}", i + 1, slot.display_time))
            .collect::<Vec<_>>()
            .join("\n");

        let system = format!(
            "\
You match a user's time preference against a numbered list of available \
meeting slots.

Available slots:
{listing}

Pick the single best matching slot for the user's message. Return ONLY a \
JSON object: {{\"time\": \"<display time exactly as listed>\"}} — or \
{{\"time\": null}} if nothing matches."
        );

        let messages = vec![Message::system(system), Message::user(message.to_string())];

        let result = match self.llm.generate(&messages).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "fuzzy slot match call failed");
                return None;
            }
        };

        let payload: SlotMatchPayload = parse_json_payload(&result.text)?;
        let wanted = payload.time?;

        state
            .available_slots
            .iter()
            .find(|slot| slot.display_time.eq_ignore_ascii_case(wanted.trim()))
            .cloned()
    }

    // ---- collecting_contact_info ------------------------------------------

    async fn handle_contact_info(
        &self,
        state: &mut ConversationState,
        message: &str,
        today: NaiveDate,
    ) -> Result<String, AgentError> {
        // A date-bearing message here usually means the user restarted
        let intent = self
            .classifier
            .contact_turn(
                message,
                "We asked for the user's contact information (name, email, phone).",
            )
            .await;

        if intent == ContactTurnIntent::NewBooking {
            state.reset_booking();
            state.transition(BookingStage::CollectingRequirements)?;
            return self.handle_requirements(state, message, today).await;
        }

        // Deterministic pass first, then the model fills what's still missing
        let extraction = extract_contact(message);
        extraction.merge_into(&mut state.contact);

        if !state.contact.name.is_set()
            || !state.contact.email.is_set()
            || !state.contact.phone.is_set()
        {
            self.extract_contact_llm(state).await;
        }

        let corrections = validate_contact(state);
        if !corrections.is_empty() {
            let mut reply = String::from("I found some issues with the information provided:\n");
            for correction in &corrections {
                reply.push_str(&format!("- {correction}\n"));
            }
            reply.push_str("\nPlease provide the correct information.");
            return Ok(reply);
        }

        let missing = state.contact.missing_fields();
        if missing.is_empty() {
            state.transition(BookingStage::AwaitingConfirmation)?;
            return Ok(confirmation_summary(state));
        }

        let prompt = if missing.len() == 3 {
            "To complete the booking, I need your name, email, and phone number.".to_string()
        } else {
            format!(
                "I still need your {}. Please provide the missing information.",
                missing.join(", ")
            )
        };

        // Don't repeat the exact same ask twice in a row
        if state.last_assistant() == Some(prompt.as_str()) {
            return Ok(format!("Still missing: {}.", missing.join(", ")));
        }
        Ok(prompt)
    }

    async fn extract_contact_llm(&self, state: &mut ConversationState) {
        let system = "\
Extract the user's contact information from the conversation.
Look for: name, email, phone number. They may arrive comma-separated or in \
natural language.

Return ONLY a JSON object with keys name, email, phone; use null for \
anything not found.

Example input: \"sohel@gmail.com, sohel rana, +8801711000000\"
Example output: {\"name\": \"sohel rana\", \"email\": \"sohel@gmail.com\", \
\"phone\": \"+8801711000000\"}";

        let mut messages = vec![Message::system(system)];
        for turn in state.recent_turns(3) {
            messages.push(match turn.role {
                meeting_agent_core::TurnRole::User => Message::user(turn.content.clone()),
                meeting_agent_core::TurnRole::Assistant => {
                    Message::assistant(turn.content.clone())
                }
            });
        }
        messages.push(Message::user(
            "Extract the user's contact information and return ONLY the JSON object.",
        ));

        let result = match self.llm.generate(&messages).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "contact extraction call failed");
                return;
            }
        };

        let Some(payload) = parse_json_payload::<ContactPayload>(&result.text) else {
            tracing::warn!("contact extraction reply was not valid JSON");
            return;
        };

        // Field-by-field merge: the model never overwrites what the
        // deterministic pass or earlier turns already produced.
        if let Some(name) = payload.name.filter(|v| !v.trim().is_empty()) {
            state.contact.name.fill(name);
        }
        if let Some(email) = payload.email.filter(|v| !v.trim().is_empty()) {
            state.contact.email.fill(email);
        }
        if let Some(phone) = payload.phone.filter(|v| !v.trim().is_empty()) {
            state.contact.phone.fill(phone);
        }
    }

    // ---- awaiting_confirmation --------------------------------------------

    async fn handle_confirmation(
        &self,
        state: &mut ConversationState,
        message: &str,
    ) -> Result<String, AgentError> {
        if !state.contact.is_complete() {
            return Err(AgentError::Stage(
                "awaiting confirmation with incomplete contact info".to_string(),
            ));
        }

        match self
            .classifier
            .confirmation(message, "Is this booking information correct?")
            .await
        {
            Confirmation::Confirmed => self.commit_booking(state).await,
            Confirmation::Cancelled => {
                state.reset_booking();
                state.transition(BookingStage::AwaitingNewDate)?;
                state.agent_mode = AgentMode::Informational;
                Ok(
                    "Booking cancelled. No problem!\n\n\
                     Would you like to book a meeting for a different date?"
                        .to_string(),
                )
            }
            Confirmation::Unclear => Ok(
                "I didn't quite catch that. Please confirm if the booking details are \
                 correct by saying 'yes' to proceed or 'no' to cancel."
                    .to_string(),
            ),
        }
    }

    // ---- booking (auto-advance) -------------------------------------------

    async fn commit_booking(&self, state: &mut ConversationState) -> Result<String, AgentError> {
        // Entry condition: everything needed for the commit is in hand
        let (Some(date), Some(slot)) = (state.date.clone(), state.selected_slot.clone()) else {
            return Err(AgentError::Stage(
                "booking without a date and selected slot".to_string(),
            ));
        };
        let (Some(name), Some(email), Some(phone)) = (
            state.contact.name.value().map(str::to_string),
            state.contact.email.value().map(str::to_string),
            state.contact.phone.value().map(str::to_string),
        ) else {
            return Err(AgentError::Stage(
                "booking with incomplete contact info".to_string(),
            ));
        };

        state.transition(BookingStage::Booking)?;

        let request = BookingRequest {
            date: date.date,
            time: slot.display_time.clone(),
            name,
            email,
            phone,
            notes: state.meeting_purpose.clone().unwrap_or_default(),
        };

        match self.gateway.book(&request).await {
            Ok(receipt) => {
                state.booking = BookingStatus::Succeeded;
                state.transition(BookingStage::BookingComplete)?;
                tracing::info!(booking_id = ?receipt.booking_id, "booking complete");
                Ok(format!(
                    "Great news! Your meeting has been successfully booked!\n\n\
                     Confirmation details:\n\
                     - Date: {}\n\
                     - Time: {}\n\
                     - Name: {}\n\
                     - Email: {}\n\n\
                     You will receive a confirmation email shortly. \
                     Looking forward to meeting with you!",
                    date.display, request.time, request.name, request.email
                ))
            }
            Err(e) => {
                // Never resubmitted automatically: a duplicate appointment is
                // worse than asking the user to retry.
                tracing::error!(error = %e, "booking commit failed");
                state.booking = BookingStatus::Failed;
                state.clear_date();
                state.transition(BookingStage::AwaitingNewDate)?;
                let retry_hint = if e.is_transient() {
                    " Please try again in a few minutes."
                } else {
                    ""
                };
                Ok(format!(
                    "I apologize, but your meeting could not be booked: {}.{retry_hint}\n\n\
                     Would you like to try a different time slot?",
                    e.user_message()
                ))
            }
        }
    }

    // ---- booking_complete -------------------------------------------------

    async fn handle_complete(
        &self,
        state: &mut ConversationState,
        message: &str,
        today: NaiveDate,
    ) -> Result<TurnOutcome, AgentError> {
        match self.classifier.new_booking(message).await {
            NewBookingIntent::NewRequest => {
                // A fresh booking starts from a fresh record; the completed
                // one stays frozen in the transcript.
                state.reset_booking();
                state.transition(BookingStage::CollectingRequirements)?;
                let reply = self.handle_requirements(state, message, today).await?;
                Ok(TurnOutcome::Reply(reply))
            }
            NewBookingIntent::Yes | NewBookingIntent::No => Ok(TurnOutcome::HandOff),
        }
    }
}

/// Validate any provided-but-unvalidated contact fields in place. Returns
/// one correction line per rejected field.
fn validate_contact(state: &mut ConversationState) -> Vec<&'static str> {
    let mut corrections = Vec::new();

    if let Some(name) = state.contact.name.value() {
        if !state.contact.name.is_valid() {
            if validate_name(name) {
                state.contact.name.mark_valid();
            } else {
                state.contact.name.clear();
                corrections.push("name should be at least 2 characters");
            }
        }
    }

    if let Some(email) = state.contact.email.value() {
        if !state.contact.email.is_valid() {
            if validate_email(email) {
                state.contact.email.mark_valid();
            } else {
                state.contact.email.clear();
                corrections.push("email format is invalid");
            }
        }
    }

    if let Some(phone) = state.contact.phone.value() {
        if !state.contact.phone.is_valid() {
            if validate_phone(phone) {
                state.contact.phone.mark_valid();
            } else {
                state.contact.phone.clear();
                corrections.push("phone number should have at least 10 digits");
            }
        }
    }

    corrections
}

fn ask_for_date() -> String {
    "What date would you like to schedule the meeting? \
     (e.g., 'tomorrow', 'next Monday', 'October 15')"
        .to_string()
}

fn slot_list_message(date: &ResolvedDate, slots: &[Slot]) -> String {
    let listing = slots
        .iter()
        .enumerate()
        .map(|(i, slot)| format!("  {}. {}", i + 1, slot.display_time))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Great! I found {} available time slot(s) for {}:\n\n{listing}\n\n\
         Please select a time slot by number (e.g., \"1\" for the first slot).",
        slots.len(),
        date.display
    )
}

fn confirmation_summary(state: &ConversationState) -> String {
    let date = state
        .date
        .as_ref()
        .map(|d| d.display.clone())
        .unwrap_or_default();
    let time = state
        .selected_slot
        .as_ref()
        .map(|s| s.display_time.clone())
        .unwrap_or_default();

    format!(
        "Let me confirm the details:\n\
         - Date: {date}\n\
         - Time: {time}\n\
         - Name: {}\n\
         - Email: {}\n\
         - Phone: {}\n\n\
         Should I proceed with the booking?",
        state.contact.name.value().unwrap_or("N/A"),
        state.contact.email.value().unwrap_or("N/A"),
        state.contact.phone.value().unwrap_or("N/A"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use meeting_agent_core::ContactField;

    #[test]
    fn test_validate_contact_clears_only_offenders() {
        let mut state = ConversationState::new();
        state.contact.name = ContactField::Provided("Sohel Rana".to_string());
        state.contact.email = ContactField::Provided("not-an-email".to_string());
        state.contact.phone = ContactField::Provided("+8801711000000".to_string());

        let corrections = validate_contact(&mut state);
        assert_eq!(corrections, vec!["email format is invalid"]);
        assert!(state.contact.name.is_valid());
        assert!(state.contact.phone.is_valid());
        assert!(!state.contact.email.is_set());
    }

    #[test]
    fn test_validate_contact_skips_already_valid() {
        let mut state = ConversationState::new();
        state.contact.email = ContactField::Valid("a@b.co".to_string());
        assert!(validate_contact(&mut state).is_empty());
        assert!(state.contact.email.is_valid());
    }

    #[test]
    fn test_slot_list_message_numbers_from_one() {
        let date = ResolvedDate::new(chrono::NaiveDate::from_ymd_opt(2025, 10, 14).unwrap());
        let slots = vec![
            Slot::new(date.date.and_hms_opt(10, 0, 0).unwrap()),
            Slot::new(date.date.and_hms_opt(14, 30, 0).unwrap()),
        ];
        let message = slot_list_message(&date, &slots);
        assert!(message.contains("2 available time slot(s)"));
        assert!(message.contains("1. 10:00 AM"));
        assert!(message.contains("2. 02:30 PM"));
        assert!(message.contains("October 14, 2025"));
    }

    #[test]
    fn test_purpose_capture() {
        let caps = PURPOSE.captures("I'd like to book a meeting to discuss a mobile app project");
        assert_eq!(caps.unwrap()[1].trim(), "a mobile app project");
        assert!(PURPOSE.captures("book a meeting for tomorrow").is_none());
    }
}
