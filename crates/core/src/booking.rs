//! Booking types and the scheduling gateway boundary
//!
//! The gateway is an unreliable remote dependency. Its error taxonomy is a
//! closed set of categories so the state machine can pick a user-facing
//! message without ever leaking transport details into the conversation.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One bookable time offered by the provider for a single calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Display form, e.g. "10:00 AM"
    pub display_time: String,
    /// Provider-local start timestamp
    pub start: NaiveDateTime,
    /// The calendar date this slot belongs to
    pub date: NaiveDate,
}

impl Slot {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            display_time: start.format("%I:%M %p").to_string(),
            date: start.date(),
            start,
        }
    }
}

/// Outcome of the booking attempt for this conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// No commit attempted yet
    #[default]
    NotAttempted,
    /// The provider accepted the booking
    Succeeded,
    /// The last commit attempt failed
    Failed,
}

/// Everything the provider needs to reserve one slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub date: NaiveDate,
    /// Display time of the chosen slot, e.g. "10:00 AM"
    pub time: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Meeting purpose, forwarded as appointment notes
    pub notes: String,
}

/// Provider confirmation for a committed booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingReceipt {
    /// Provider-side appointment id, when one is returned
    pub booking_id: Option<String>,
}

/// Category-level gateway failure
///
/// Transport and provider details stay in the error source / log fields;
/// the variants are what the conversation layer is allowed to react to.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway rejected the request: {0}")]
    BadRequest(String),

    #[error("gateway authentication failed")]
    Auth,

    #[error("gateway refused access")]
    Forbidden,

    #[error("gateway resource not found: {0}")]
    NotFound(String),

    #[error("slot conflict: {0}")]
    Conflict(String),

    #[error("gateway unavailable: {0}")]
    ServerUnavailable(String),

    #[error("gateway request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected gateway response: {0}")]
    Unknown(String),
}

impl GatewayError {
    /// Whether a user-initiated retry is reasonable advice
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::Timeout(_)
                | GatewayError::Network(_)
                | GatewayError::ServerUnavailable(_)
                | GatewayError::Conflict(_)
        )
    }

    /// Plain-language description for the user, by category
    pub fn user_message(&self) -> &'static str {
        match self {
            GatewayError::BadRequest(_) => {
                "the scheduling service rejected the request details"
            }
            GatewayError::Auth | GatewayError::Forbidden => {
                "the scheduling service refused access"
            }
            GatewayError::NotFound(_) => {
                "the scheduling service could not find the booking calendar"
            }
            GatewayError::Conflict(_) => {
                "that time slot appears to have just been taken"
            }
            GatewayError::ServerUnavailable(_) => {
                "the scheduling service is temporarily unavailable"
            }
            GatewayError::Timeout(_) => "the scheduling service took too long to respond",
            GatewayError::Network(_) => "the scheduling service could not be reached",
            GatewayError::Unknown(_) => "the scheduling service returned an unexpected answer",
        }
    }
}

/// The external scheduling provider's availability/booking interface
#[async_trait]
pub trait SchedulingGateway: Send + Sync {
    /// Fetch the ordered list of open slots for exactly one calendar date.
    /// An empty list is a valid, non-error outcome.
    async fn fetch_slots(&self, date: NaiveDate) -> Result<Vec<Slot>, GatewayError>;

    /// Attempt to reserve exactly one slot. Never retried automatically:
    /// resubmitting a write risks duplicate appointments.
    async fn book(&self, request: &BookingRequest) -> Result<BookingReceipt, GatewayError>;
}
