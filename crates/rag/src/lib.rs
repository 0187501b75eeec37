//! Retrieval service client
//!
//! The knowledge base itself (documents, embeddings, vector search,
//! generation) runs as a separate service; this crate is the HTTP client
//! side of the core `Retriever` trait. Quota-flavored refusals are surfaced
//! distinctly so the informational handler can degrade instead of erroring
//! the turn.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use meeting_agent_config::RagSettings;
use meeting_agent_core::{RetrievedAnswer, Retriever, RetrieverError, Turn};

/// HTTP retriever over the external retrieval service
pub struct HttpRetriever {
    client: Client,
    settings: RagSettings,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    question: &'a str,
    chat_history: Vec<HistoryEntry<'a>>,
    top_k: usize,
}

#[derive(Debug, Serialize)]
struct HistoryEntry<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    answer: String,
    #[serde(default)]
    source_documents: Vec<String>,
}

impl HttpRetriever {
    pub fn new(settings: RagSettings) -> Result<Self, RetrieverError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| RetrieverError::Request(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, settings })
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn answer(
        &self,
        question: &str,
        history: &[Turn],
    ) -> Result<RetrievedAnswer, RetrieverError> {
        let request = QueryRequest {
            question,
            chat_history: history
                .iter()
                .map(|turn| HistoryEntry {
                    role: turn.role.as_str(),
                    content: &turn.content,
                })
                .collect(),
            top_k: self.settings.top_k,
        };

        let url = format!("{}/api/query", self.settings.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RetrieverError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrieverError::QuotaExhausted(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Some backends report quota exhaustion as a plain 500
            if body.to_lowercase().contains("quota") {
                return Err(RetrieverError::QuotaExhausted(body));
            }
            return Err(RetrieverError::Request(format!("status {status}: {body}")));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| RetrieverError::InvalidResponse(e.to_string()))?;

        tracing::debug!(
            sources = parsed.source_documents.len(),
            "retrieval answered"
        );

        Ok(RetrievedAnswer {
            answer: parsed.answer,
            sources: parsed.source_documents,
        })
    }

    fn name(&self) -> &str {
        "http-retriever"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let history = vec![Turn::user("hi"), Turn::assistant("hello!")];
        let request = QueryRequest {
            question: "what do you do?",
            chat_history: history
                .iter()
                .map(|t| HistoryEntry {
                    role: t.role.as_str(),
                    content: &t.content,
                })
                .collect(),
            top_k: 4,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["chat_history"][0]["role"], "user");
        assert_eq!(json["chat_history"][1]["role"], "assistant");
        assert_eq!(json["top_k"], 4);
    }

    #[test]
    fn test_response_defaults_sources() {
        let parsed: QueryResponse = serde_json::from_str(r#"{"answer": "We build software."}"#).unwrap();
        assert_eq!(parsed.answer, "We build software.");
        assert!(parsed.source_documents.is_empty());
    }
}
