//! Closed-enum intent classifiers
//!
//! Each classifier turns one user utterance (plus the question that prompted
//! it) into a closed enumeration. The contract with the model is strict
//! parse-or-fallback: the reply must deserialize into the expected verdict
//! shape, and anything else — fenced prose, partial JSON, an unknown label —
//! collapses to the conservative branch for that classifier. Ambiguity never
//! destroys in-progress state and never commits a booking.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::backend::LlmBackend;
use crate::cache::ClassifyCache;
use crate::prompt::Message;
use crate::throttle::Throttle;

const ROUTE_TTL: Duration = Duration::from_secs(300);
const VERDICT_TTL: Duration = Duration::from_secs(600);

/// Which sub-agent a message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteIntent {
    Informational,
    Booking,
}

/// Reply to a booking summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Cancelled,
    Unclear,
}

/// Reply to "would you like to try a different date?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewBookingIntent {
    Yes,
    No,
    /// A concrete new booking request ("how about Friday")
    NewRequest,
}

/// What a message during contact collection actually is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactTurnIntent {
    ProvidingInfo,
    NewBooking,
}

/// Raw verdict shape every classifier prompt asks for
#[derive(Debug, Deserialize)]
struct Verdict {
    intent: String,
    #[serde(default)]
    #[allow(dead_code)]
    confidence: Option<f32>,
}

/// Strictly parse a model reply as JSON.
///
/// Markdown fences are stripped deterministically; after that the content
/// must deserialize as a whole. There is no salvage path for malformed
/// payloads.
pub fn parse_json_payload<T: DeserializeOwned>(text: &str) -> Option<T> {
    let trimmed = text.trim();
    let inner = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest.split("```").next()?
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest.split("```").next()?
    } else {
        trimmed
    };
    serde_json::from_str(inner.trim()).ok()
}

/// Classifier over a shared backend, cache and throttle
pub struct Classifier {
    llm: Arc<dyn LlmBackend>,
    cache: Arc<ClassifyCache>,
    throttle: Arc<Throttle>,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmBackend>, cache: Arc<ClassifyCache>, throttle: Arc<Throttle>) -> Self {
        Self { llm, cache, throttle }
    }

    /// One cached classification round trip. Returns the validated intent
    /// label, or `None` for any failure (caller applies its fallback).
    async fn verdict(
        &self,
        kind: &str,
        cache_text: &str,
        ttl: Duration,
        messages: Vec<Message>,
        allowed: &[&str],
    ) -> Option<String> {
        let key = ClassifyCache::key(kind, cache_text);
        if let Some(cached) = self.cache.get(&key) {
            if allowed.contains(&cached.as_str()) {
                tracing::debug!(kind, text = cache_text, "using cached classification");
                return Some(cached);
            }
        }

        self.throttle.acquire().await;

        let result = match self.llm.generate(&messages).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(kind, error = %e, "classification call failed");
                return None;
            }
        };

        let verdict: Verdict = match parse_json_payload(&result.text) {
            Some(v) => v,
            None => {
                tracing::warn!(kind, reply = %result.text, "classifier reply was not valid JSON");
                return None;
            }
        };

        let intent = verdict.intent.trim().to_lowercase();
        if !allowed.contains(&intent.as_str()) {
            tracing::warn!(kind, %intent, "classifier returned an unknown label");
            return None;
        }

        self.cache.insert_with_ttl(key, intent.clone(), ttl);
        Some(intent)
    }

    /// Informational vs booking routing for a message outside the funnel.
    /// Fallback: informational (a misrouted question is recoverable, a
    /// misrouted funnel entry is annoying).
    pub async fn route(&self, message: &str, recent_turns: &[Message]) -> RouteIntent {
        let system = "\
You are the intent router for a company assistant that can either answer \
questions about the company (services, team, capabilities, process, pricing) \
or schedule a meeting with the team.

Classify the user's message:
- \"informational\": questions about the company, greetings, acknowledgements
- \"booking\": requests to book/schedule/arrange a meeting, or mentions of \
meeting dates and times

Return ONLY a JSON object: {\"intent\": \"informational\" or \"booking\", \
\"confidence\": 0.0 to 1.0}";

        let mut messages = vec![Message::system(system)];
        messages.extend(recent_turns.iter().cloned());
        messages.push(Message::user(format!("Classify this message: {message}")));

        match self
            .verdict("route", message, ROUTE_TTL, messages, &["informational", "booking"])
            .await
            .as_deref()
        {
            Some("booking") => RouteIntent::Booking,
            _ => RouteIntent::Informational,
        }
    }

    /// Confirmed / cancelled / unclear against the question we asked.
    /// Fallback: unclear, which re-prompts instead of acting.
    pub async fn confirmation(&self, message: &str, context: &str) -> Confirmation {
        let system = format!(
            "\
We asked the user: \"{context}\"

Decide what their reply means:
- \"confirmed\": agreeing in any form (yes, yeah, sure, sounds good, go ahead)
- \"cancelled\": declining in any form (no, nope, cancel, not now, changed my mind)
- \"unclear\": ambiguous, or a question back

Return ONLY a JSON object: {{\"intent\": \"confirmed\" or \"cancelled\" or \
\"unclear\", \"confidence\": 0.0 to 1.0}}"
        );

        let messages = vec![Message::system(system), Message::user(message.to_string())];

        match self
            .verdict(
                "confirmation",
                message,
                VERDICT_TTL,
                messages,
                &["confirmed", "cancelled", "unclear"],
            )
            .await
            .as_deref()
        {
            Some("confirmed") => Confirmation::Confirmed,
            Some("cancelled") => Confirmation::Cancelled,
            _ => Confirmation::Unclear,
        }
    }

    /// Does the user want to abandon the in-progress booking?
    /// Fallback: false — never throw away collected state on a guess.
    pub async fn cancellation(&self, message: &str, stage_name: &str) -> bool {
        let system = format!(
            "\
The user is in the middle of booking a meeting (current step: {stage_name}). \
Decide whether this message abandons the booking to talk about something else.

- \"cancel\": clearly wants to stop booking (nevermind, forget it, actually \
tell me about your services instead)
- \"continue\": anything that could plausibly be part of the booking flow

Return ONLY a JSON object: {{\"intent\": \"cancel\" or \"continue\", \
\"confidence\": 0.0 to 1.0}}"
        );

        let messages = vec![Message::system(system), Message::user(message.to_string())];

        matches!(
            self.verdict("cancellation", message, VERDICT_TTL, messages, &["cancel", "continue"])
                .await
                .as_deref(),
            Some("cancel")
        )
    }

    /// Reply to "book a meeting for a different date?".
    /// Fallback: no — the idle path never fabricates a booking.
    pub async fn new_booking(&self, message: &str) -> NewBookingIntent {
        let system = "\
We asked: \"Would you like to book a meeting for a different date?\"

Decide what the user's reply means:
- \"yes\": wants to try again (yes, sure, let's try)
- \"no\": doesn't want to book (no, not now, maybe later)
- \"new_request\": names a concrete new request (\"book for next Monday\", \
\"how about tomorrow\")

Return ONLY a JSON object: {\"intent\": \"yes\" or \"no\" or \"new_request\", \
\"confidence\": 0.0 to 1.0}";

        let messages = vec![Message::system(system.to_string()), Message::user(message.to_string())];

        match self
            .verdict(
                "new_booking",
                message,
                VERDICT_TTL,
                messages,
                &["yes", "no", "new_request"],
            )
            .await
            .as_deref()
        {
            Some("yes") => NewBookingIntent::Yes,
            Some("new_request") => NewBookingIntent::NewRequest,
            _ => NewBookingIntent::No,
        }
    }

    /// During contact collection: answering us, or starting over?
    /// Fallback: providing-info, which keeps collected state intact.
    pub async fn contact_turn(&self, message: &str, context: &str) -> ContactTurnIntent {
        let system = format!(
            "\
Context: {context}

Decide what the user's reply is:
- \"providing_info\": answering the question (contact details, partial details)
- \"new_booking\": starting a new booking request (mentions dates/times, wants \
a different meeting)

Return ONLY a JSON object: {{\"intent\": \"providing_info\" or \
\"new_booking\", \"confidence\": 0.0 to 1.0}}"
        );

        let messages = vec![Message::system(system), Message::user(message.to_string())];

        match self
            .verdict(
                "contact_turn",
                message,
                ROUTE_TTL,
                messages,
                &["providing_info", "new_booking"],
            )
            .await
            .as_deref()
        {
            Some("new_booking") => ContactTurnIntent::NewBooking,
            _ => ContactTurnIntent::ProvidingInfo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GenerationResult;
    use crate::LlmError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that replays a fixed reply and counts calls
    struct FixedBackend {
        reply: String,
        calls: AtomicUsize,
    }

    impl FixedBackend {
        fn new(reply: impl Into<String>) -> Self {
            Self {
                reply: reply.into(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmBackend for FixedBackend {
        async fn generate(&self, _: &[Message]) -> Result<GenerationResult, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GenerationResult {
                text: self.reply.clone(),
                tokens: 1,
                total_time_ms: 0,
            })
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    fn classifier_with(reply: &str) -> (Classifier, Arc<FixedBackend>) {
        let backend = Arc::new(FixedBackend::new(reply));
        let classifier = Classifier::new(
            backend.clone(),
            Arc::new(ClassifyCache::default()),
            Arc::new(Throttle::new(Duration::ZERO)),
        );
        (classifier, backend)
    }

    #[test]
    fn test_parse_json_payload_strict() {
        #[derive(Deserialize)]
        struct P {
            intent: String,
        }

        let p: P = parse_json_payload(r#"{"intent": "yes"}"#).unwrap();
        assert_eq!(p.intent, "yes");

        let p: P = parse_json_payload("```json\n{\"intent\": \"yes\"}\n```").unwrap();
        assert_eq!(p.intent, "yes");

        // Trailing prose is a shape mismatch, not something to salvage
        assert!(parse_json_payload::<P>("{\"intent\": \"yes\"} extra words").is_none());
        assert!(parse_json_payload::<P>("the user agreed").is_none());
        assert!(parse_json_payload::<P>("{\"other\": 1}").is_none());
    }

    #[tokio::test]
    async fn test_confirmation_happy_path() {
        let (classifier, _) = classifier_with(r#"{"intent": "confirmed", "confidence": 0.95}"#);
        let result = classifier.confirmation("yes please", "Proceed with the booking?").await;
        assert_eq!(result, Confirmation::Confirmed);
    }

    #[tokio::test]
    async fn test_malformed_reply_falls_back_conservatively() {
        let (classifier, _) = classifier_with("I think the user agreed!");
        assert_eq!(
            classifier.confirmation("yes", "Proceed?").await,
            Confirmation::Unclear
        );
        assert!(!classifier.cancellation("yes", "Collecting Contact Info").await);
        assert_eq!(classifier.new_booking("yes").await, NewBookingIntent::No);
        assert_eq!(
            classifier.contact_turn("yes", "asked for contact info").await,
            ContactTurnIntent::ProvidingInfo
        );
        assert_eq!(
            classifier.route("yes", &[]).await,
            RouteIntent::Informational
        );
    }

    #[tokio::test]
    async fn test_unknown_label_falls_back() {
        let (classifier, _) = classifier_with(r#"{"intent": "definitely"}"#);
        assert_eq!(
            classifier.confirmation("sure", "Proceed?").await,
            Confirmation::Unclear
        );
    }

    #[tokio::test]
    async fn test_cache_skips_second_call() {
        let (classifier, backend) = classifier_with(r#"{"intent": "booking"}"#);

        assert_eq!(classifier.route("book a meeting", &[]).await, RouteIntent::Booking);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        // Same normalized text: cache hit, no new model call
        assert_eq!(classifier.route("  BOOK A MEETING ", &[]).await, RouteIntent::Booking);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }
}
