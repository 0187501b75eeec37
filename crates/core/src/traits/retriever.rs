//! Retrieval interface for the informational sub-agent
//!
//! The knowledge base (vector store, embeddings, generation chain) lives in an
//! external service; this is the only surface the conversation core consumes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::Turn;

/// Answer produced by the retrieval service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedAnswer {
    /// Generated answer text
    pub answer: String,
    /// Source document snippets backing the answer
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Retrieval failure
#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    /// Upstream quota or rate limit exhausted
    #[error("retrieval quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("retrieval request failed: {0}")]
    Request(String),

    #[error("retrieval service returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl RetrieverError {
    /// Quota-flavored errors get the degraded-answer path rather than a retry hint
    pub fn quota_exhausted(&self) -> bool {
        matches!(self, RetrieverError::QuotaExhausted(_))
    }
}

/// Document retriever interface
///
/// # Example
///
/// ```ignore
/// let retriever: Arc<dyn Retriever> = Arc::new(HttpRetriever::new(config)?);
/// let answer = retriever.answer("What services do you offer?", &history).await?;
/// println!("{}", answer.answer);
/// ```
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Answer a question given the conversation so far
    async fn answer(
        &self,
        question: &str,
        history: &[Turn],
    ) -> Result<RetrievedAnswer, RetrieverError>;

    /// Retriever name for logging
    fn name(&self) -> &str;
}
