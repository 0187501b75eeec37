//! End-to-end funnel tests over mock collaborators
//!
//! The mock model answers classifier prompts from keyword rules, so the
//! tests exercise the real routing, stage handlers, extractors and
//! validators without a live backend.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Days, Local, NaiveDate, Weekday};
use parking_lot::Mutex;

use meeting_agent_agent::MeetingAgent;
use meeting_agent_core::{
    AgentMode, BookingReceipt, BookingRequest, BookingStage, BookingStatus, GatewayError,
    MemoryChatLogger, RetrievedAnswer, Retriever, RetrieverError, SchedulingGateway, Slot, Turn,
};
use meeting_agent_llm::{
    ClassifyCache, Classifier, GenerationResult, LlmBackend, LlmError, Message, Throttle,
};

/// Model stub that answers each classifier prompt from keyword rules
struct RuleLlm;

impl RuleLlm {
    fn classify(system: &str, user: &str) -> String {
        let user = user.to_lowercase();
        let has_date_word = ["monday", "tuesday", "friday", "tomorrow", "how about"]
            .iter()
            .any(|w| user.contains(w));

        if system.contains("intent router") {
            let intent = if user.contains("book") || user.contains("schedule") {
                "booking"
            } else {
                "informational"
            };
            return format!(r#"{{"intent": "{intent}", "confidence": 0.9}}"#);
        }
        if system.contains("abandons the booking") {
            let intent = if user.contains("nevermind") || user.contains("forget the booking") {
                "cancel"
            } else {
                "continue"
            };
            return format!(r#"{{"intent": "{intent}", "confidence": 0.9}}"#);
        }
        if system.contains("We asked the user") {
            let intent = if user.contains("nevermind") || user.contains("no") {
                "cancelled"
            } else if user.contains("yes") || user.contains("sure") {
                "confirmed"
            } else {
                "unclear"
            };
            return format!(r#"{{"intent": "{intent}", "confidence": 0.9}}"#);
        }
        if system.contains("different date") {
            let intent = if has_date_word {
                "new_request"
            } else if user.contains("yes") {
                "yes"
            } else {
                "no"
            };
            return format!(r#"{{"intent": "{intent}", "confidence": 0.9}}"#);
        }
        if system.contains("providing_info") {
            let intent = if user.contains("book") {
                "new_booking"
            } else {
                "providing_info"
            };
            return format!(r#"{{"intent": "{intent}", "confidence": 0.9}}"#);
        }
        if system.contains("date_preference") {
            return r#"{"date_preference": null, "meeting_purpose": null}"#.to_string();
        }
        if system.contains("numbered list of available") {
            return r#"{"time": null}"#.to_string();
        }
        if system.contains("Extract the user's contact information")
            || system.contains("contact information from the conversation")
        {
            return r#"{"name": null, "email": null, "phone": null}"#.to_string();
        }
        "Ixora Solution builds custom software.".to_string()
    }
}

#[async_trait]
impl LlmBackend for RuleLlm {
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError> {
        let system = messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let user = messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        // Classifier prompts carry the utterance in the last user message;
        // extraction prompts carry it in the turns before the instruction.
        let utterance = if messages.len() >= 2 {
            messages[messages.len() - 2].content.clone()
        } else {
            user.to_string()
        };
        let effective = if user.starts_with("Classify") || messages.len() == 2 {
            user.to_string()
        } else {
            utterance
        };
        Ok(GenerationResult {
            text: Self::classify(system, &effective),
            tokens: 1,
            total_time_ms: 0,
        })
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        "rule-llm"
    }
}

/// Gateway stub with programmable availability and commit outcomes
struct MockGateway {
    hours: Vec<u32>,
    fetch_empty: AtomicBool,
    book_fails: AtomicBool,
    fetch_calls: Mutex<Vec<NaiveDate>>,
    book_calls: Mutex<Vec<BookingRequest>>,
}

impl MockGateway {
    fn new() -> Self {
        Self {
            hours: vec![10, 14, 16],
            fetch_empty: AtomicBool::new(false),
            book_fails: AtomicBool::new(false),
            fetch_calls: Mutex::new(Vec::new()),
            book_calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SchedulingGateway for MockGateway {
    async fn fetch_slots(&self, date: NaiveDate) -> Result<Vec<Slot>, GatewayError> {
        self.fetch_calls.lock().push(date);
        if self.fetch_empty.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        Ok(self
            .hours
            .iter()
            .map(|&h| Slot::new(date.and_hms_opt(h, 0, 0).unwrap()))
            .collect())
    }

    async fn book(&self, request: &BookingRequest) -> Result<BookingReceipt, GatewayError> {
        self.book_calls.lock().push(request.clone());
        if self.book_fails.load(Ordering::SeqCst) {
            return Err(GatewayError::ServerUnavailable("maintenance".to_string()));
        }
        Ok(BookingReceipt {
            booking_id: Some("apt-123".to_string()),
        })
    }
}

/// Retriever stub with a fixed answer
struct FixedRetriever(String);

#[async_trait]
impl Retriever for FixedRetriever {
    async fn answer(&self, _: &str, _: &[Turn]) -> Result<RetrievedAnswer, RetrieverError> {
        Ok(RetrievedAnswer {
            answer: self.0.clone(),
            sources: vec![],
        })
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

fn make_agent(gateway: Arc<MockGateway>) -> MeetingAgent {
    let llm: Arc<dyn LlmBackend> = Arc::new(RuleLlm);
    let classifier = Arc::new(Classifier::new(
        llm.clone(),
        Arc::new(ClassifyCache::default()),
        Arc::new(Throttle::new(std::time::Duration::ZERO)),
    ));
    MeetingAgent::new(
        "test-session",
        llm,
        classifier,
        gateway,
        Some(Arc::new(FixedRetriever(
            "We offer custom software development.".to_string(),
        ))),
        Arc::new(MemoryChatLogger::new()),
    )
}

fn upcoming(weekday: Weekday) -> NaiveDate {
    let today = Local::now().date_naive();
    let mut ahead =
        weekday.num_days_from_monday() as i64 - today.weekday().num_days_from_monday() as i64;
    if ahead <= 0 {
        ahead += 7;
    }
    today + Days::new(ahead as u64)
}

/// Drive a fresh agent to the confirmation stage
async fn drive_to_confirmation(agent: &MeetingAgent) {
    agent
        .process("I want to book a meeting for next Tuesday")
        .await
        .unwrap();
    agent.process("1").await.unwrap();
    agent
        .process("sohel@gmail.com, sohel rana, +8801711000000")
        .await
        .unwrap();
    assert_eq!(agent.stage().await, BookingStage::AwaitingConfirmation);
}

#[tokio::test]
async fn booking_request_resolves_date_and_lists_slots() {
    let gateway = Arc::new(MockGateway::new());
    let agent = make_agent(gateway.clone());

    let reply = agent
        .process("I want to book a meeting for next Tuesday")
        .await
        .unwrap();

    let expected = upcoming(Weekday::Tue);
    assert_eq!(gateway.fetch_calls.lock().clone(), vec![expected]);
    assert!(expected > Local::now().date_naive());

    assert!(reply.contains("3 available time slot(s)"));
    assert!(reply.contains("1. 10:00 AM"));
    assert_eq!(agent.stage().await, BookingStage::AwaitingSlotSelection);
}

#[tokio::test]
async fn out_of_range_selection_keeps_stage() {
    let gateway = Arc::new(MockGateway::new());
    let agent = make_agent(gateway.clone());

    agent
        .process("book a meeting for next Tuesday")
        .await
        .unwrap();

    let reply = agent.process("5").await.unwrap();
    assert!(reply.contains("between 1 and 3"));
    assert_eq!(agent.stage().await, BookingStage::AwaitingSlotSelection);

    let snapshot = agent.snapshot().await;
    assert!(snapshot.selected_slot.is_none());
    assert_eq!(snapshot.available_slots.len(), 3);
}

#[tokio::test]
async fn numeric_selection_picks_nth_slot() {
    let gateway = Arc::new(MockGateway::new());
    let agent = make_agent(gateway.clone());

    agent
        .process("book a meeting for next Tuesday")
        .await
        .unwrap();
    let reply = agent.process("2").await.unwrap();

    assert!(reply.contains("02:00 PM"));
    assert_eq!(agent.stage().await, BookingStage::CollectingContactInfo);

    let snapshot = agent.snapshot().await;
    let selected = snapshot.selected_slot.unwrap();
    assert_eq!(selected, snapshot.available_slots[1]);
}

#[tokio::test]
async fn contact_info_in_one_turn_advances_to_confirmation() {
    let gateway = Arc::new(MockGateway::new());
    let agent = make_agent(gateway.clone());

    agent
        .process("book a meeting for next Tuesday")
        .await
        .unwrap();
    agent.process("1").await.unwrap();

    let reply = agent
        .process("sohel@gmail.com, sohel rana, +8801711000000")
        .await
        .unwrap();

    assert!(reply.contains("Let me confirm the details"));
    assert!(reply.contains("sohel@gmail.com"));
    assert_eq!(agent.stage().await, BookingStage::AwaitingConfirmation);

    let snapshot = agent.snapshot().await;
    assert!(snapshot.contact.is_complete());
}

#[tokio::test]
async fn partial_contact_info_prompts_for_missing_subset() {
    let gateway = Arc::new(MockGateway::new());
    let agent = make_agent(gateway.clone());

    agent
        .process("book a meeting for next Tuesday")
        .await
        .unwrap();
    agent.process("1").await.unwrap();

    // Email only; name and phone still missing
    let reply = agent.process("sohel@gmail.com").await.unwrap();
    assert!(reply.contains("name"));
    assert!(reply.contains("phone number"));
    assert!(!reply.contains("email,"));
    assert_eq!(agent.stage().await, BookingStage::CollectingContactInfo);

    // Identical ask is not repeated verbatim
    let nudge = agent.process(",").await.unwrap();
    assert!(nudge.starts_with("Still missing:"));

    // The rest arrives; the turn advances
    let reply = agent
        .process("sohel rana, +8801711000000")
        .await
        .unwrap();
    assert!(reply.contains("Should I proceed with the booking?"));
    assert_eq!(agent.stage().await, BookingStage::AwaitingConfirmation);
}

#[tokio::test]
async fn invalid_phone_is_cleared_with_correction() {
    let gateway = Arc::new(MockGateway::new());
    let agent = make_agent(gateway.clone());

    agent
        .process("book a meeting for next Tuesday")
        .await
        .unwrap();
    agent.process("1").await.unwrap();

    let reply = agent
        .process("sohel rana, sohel@gmail.com, 123456")
        .await
        .unwrap();
    assert!(reply.contains("phone number should have at least 10 digits"));

    let snapshot = agent.snapshot().await;
    assert!(snapshot.contact.name.is_valid());
    assert!(snapshot.contact.email.is_valid());
    assert!(!snapshot.contact.phone.is_set());
    assert_eq!(snapshot.stage, BookingStage::CollectingContactInfo);
}

#[tokio::test]
async fn confirmed_booking_commits_and_completes() {
    let gateway = Arc::new(MockGateway::new());
    let agent = make_agent(gateway.clone());
    drive_to_confirmation(&agent).await;

    let reply = agent.process("yes, go ahead").await.unwrap();

    assert!(reply.contains("successfully booked"));
    assert_eq!(agent.stage().await, BookingStage::BookingComplete);

    let snapshot = agent.snapshot().await;
    assert_eq!(snapshot.booking, BookingStatus::Succeeded);

    let booked = gateway.book_calls.lock();
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0].email, "sohel@gmail.com");
    assert_eq!(booked[0].time, "10:00 AM");
}

#[tokio::test]
async fn failed_commit_returns_to_new_date() {
    let gateway = Arc::new(MockGateway::new());
    gateway.book_fails.store(true, Ordering::SeqCst);
    let agent = make_agent(gateway.clone());
    drive_to_confirmation(&agent).await;

    let reply = agent.process("yes").await.unwrap();

    assert!(reply.contains("could not be booked"));
    assert_eq!(agent.stage().await, BookingStage::AwaitingNewDate);

    let snapshot = agent.snapshot().await;
    assert_eq!(snapshot.booking, BookingStatus::Failed);
    assert_ne!(snapshot.booking, BookingStatus::Succeeded);
}

#[tokio::test]
async fn cancellation_at_confirmation_reinitializes_but_keeps_transcript() {
    let gateway = Arc::new(MockGateway::new());
    let agent = make_agent(gateway.clone());
    drive_to_confirmation(&agent).await;
    let turns_before = agent.turn_count().await;

    let reply = agent.process("actually nevermind").await.unwrap();

    assert!(reply.contains("Booking cancelled"));
    assert_eq!(agent.stage().await, BookingStage::AwaitingNewDate);
    assert_eq!(agent.agent_mode().await, AgentMode::Informational);

    let snapshot = agent.snapshot().await;
    assert!(snapshot.transcript.len() > turns_before);
    assert!(!snapshot.contact.name.is_set());
    assert!(snapshot.selected_slot.is_none());
    assert_eq!(snapshot.booking, BookingStatus::NotAttempted);
}

#[tokio::test]
async fn mid_funnel_cancellation_acknowledges_and_goes_idle() {
    let gateway = Arc::new(MockGateway::new());
    let agent = make_agent(gateway.clone());

    agent
        .process("book a meeting for next Tuesday")
        .await
        .unwrap();
    assert_eq!(agent.stage().await, BookingStage::AwaitingSlotSelection);

    let reply = agent
        .process("nevermind, tell me about your company instead")
        .await
        .unwrap();

    assert!(reply.contains("No problem"));
    assert_eq!(agent.stage().await, BookingStage::Idle);
    assert_eq!(agent.agent_mode().await, AgentMode::Informational);
}

#[tokio::test]
async fn empty_slots_then_new_date_retries_fetch_in_same_turn() {
    let gateway = Arc::new(MockGateway::new());
    gateway.fetch_empty.store(true, Ordering::SeqCst);
    let agent = make_agent(gateway.clone());

    let reply = agent.process("book a meeting for tomorrow").await.unwrap();
    assert!(reply.contains("No available slots"));
    assert_eq!(agent.stage().await, BookingStage::AwaitingNewDate);

    gateway.fetch_empty.store(false, Ordering::SeqCst);
    let reply = agent.process("how about Friday").await.unwrap();

    let calls = gateway.fetch_calls.lock().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].weekday(), Weekday::Fri);
    assert!(calls[1] > Local::now().date_naive());

    assert!(reply.contains("available time slot(s)"));
    assert_eq!(agent.stage().await, BookingStage::AwaitingSlotSelection);
}

#[tokio::test]
async fn declining_a_new_date_goes_idle() {
    let gateway = Arc::new(MockGateway::new());
    gateway.fetch_empty.store(true, Ordering::SeqCst);
    let agent = make_agent(gateway.clone());

    agent.process("book a meeting for tomorrow").await.unwrap();
    assert_eq!(agent.stage().await, BookingStage::AwaitingNewDate);

    let reply = agent.process("not right now, thanks").await.unwrap();
    assert!(reply.contains("Feel free to reach out"));
    assert_eq!(agent.stage().await, BookingStage::Idle);
    assert_eq!(agent.agent_mode().await, AgentMode::Informational);
}

#[tokio::test]
async fn informational_question_routes_to_retriever() {
    let gateway = Arc::new(MockGateway::new());
    let agent = make_agent(gateway.clone());

    let reply = agent.process("what do you build?").await.unwrap();
    assert!(reply.contains("We offer custom software development."));
    assert_eq!(agent.stage().await, BookingStage::Idle);
    assert!(gateway.fetch_calls.lock().is_empty());
}

#[tokio::test]
async fn booking_vocab_in_question_sets_suggest_flag() {
    let gateway = Arc::new(MockGateway::new());
    let agent = make_agent(gateway.clone());

    // "discuss" is booking vocabulary; the message has no explicit booking
    // phrase so it routes informationally
    agent
        .process("could we discuss your pricing sometime?")
        .await
        .unwrap();

    let snapshot = agent.snapshot().await;
    assert_eq!(snapshot.stage, BookingStage::Idle);
    assert!(snapshot.suggest_booking);
}

#[tokio::test]
async fn unknown_date_text_reprompts_without_advancing() {
    let gateway = Arc::new(MockGateway::new());
    let agent = make_agent(gateway.clone());

    let reply = agent.process("I want to book a meeting").await.unwrap();
    assert!(reply.contains("What date"));
    assert_eq!(agent.stage().await, BookingStage::CollectingRequirements);
    assert!(gateway.fetch_calls.lock().is_empty());

    // An impossible date is called out rather than silently dropped
    let reply = agent.process("February 31").await.unwrap();
    assert!(reply.to_lowercase().contains("couldn't make sense of the date"));
    assert_eq!(agent.stage().await, BookingStage::CollectingRequirements);
}

#[tokio::test]
async fn completed_booking_hands_off_small_talk() {
    let gateway = Arc::new(MockGateway::new());
    let agent = make_agent(gateway.clone());
    drive_to_confirmation(&agent).await;
    agent.process("yes").await.unwrap();
    assert_eq!(agent.stage().await, BookingStage::BookingComplete);

    // "thanks!" is not a new booking request; the informational sub-agent
    // takes the turn and the funnel is closed out
    let reply = agent.process("thanks!").await.unwrap();
    assert!(!reply.is_empty());
    assert_eq!(agent.stage().await, BookingStage::Idle);
}

#[tokio::test]
async fn slots_are_scoped_to_a_single_date() {
    let gateway = Arc::new(MockGateway::new());
    let agent = make_agent(gateway.clone());

    agent
        .process("book a meeting for next Tuesday")
        .await
        .unwrap();
    let first: HashSet<NaiveDate> = agent
        .snapshot()
        .await
        .available_slots
        .iter()
        .map(|s| s.date)
        .collect();
    assert_eq!(first.len(), 1);

    // Abandon and rebook a different day: the slot list is replaced
    // wholesale, never merged
    agent.process("forget the booking please").await.unwrap();
    assert_eq!(agent.stage().await, BookingStage::Idle);

    agent
        .process("book a meeting for next Friday")
        .await
        .unwrap();
    let snapshot = agent.snapshot().await;
    let second: HashSet<NaiveDate> = snapshot.available_slots.iter().map(|s| s.date).collect();
    assert_eq!(second.len(), 1);
    assert!(first.is_disjoint(&second));
}
