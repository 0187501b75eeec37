//! Traits for pluggable external collaborators

pub mod chat_log;
pub mod retriever;

pub use chat_log::{BookingInfo, ChatLogger, MemoryChatLogger, NullChatLogger};
pub use retriever::{RetrievedAnswer, Retriever, RetrieverError};
