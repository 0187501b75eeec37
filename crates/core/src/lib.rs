//! Core traits and types for the meeting agent
//!
//! This crate provides the foundational types used across all other crates:
//! - Conversation turns and transcript types
//! - The booking stage enum (the state machine's program counter)
//! - Contact fields with explicit unset/provided/valid states
//! - Booking types and the scheduling gateway trait with its error taxonomy
//! - Traits for pluggable collaborators (retriever, chat logger)

pub mod booking;
pub mod contact;
pub mod conversation;
pub mod stage;
pub mod traits;

pub use booking::{
    BookingReceipt, BookingRequest, BookingStatus, GatewayError, SchedulingGateway, Slot,
};
pub use contact::{ContactField, ContactInfo};
pub use conversation::{Turn, TurnRole};
pub use stage::{AgentMode, BookingStage};
pub use traits::chat_log::{BookingInfo, ChatLogger, MemoryChatLogger, NullChatLogger};
pub use traits::retriever::{RetrievedAnswer, Retriever, RetrieverError};
