//! HTTP endpoints

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, post},
    Json, Router,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.config.server.cors_origins,
        state.config.server.cors_enabled,
    );

    Router::new()
        // Session endpoints
        .route("/api/session", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id", delete(delete_session))
        // Chat endpoints
        .route("/api/chat", post(chat))
        .route("/api/chat/stream", post(chat_stream))
        // Health check
        .route("/api/health", get(health_check))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns a permissive layer (for dev)
/// - If cors_origins is empty, defaults to localhost:3000
/// - Otherwise, uses the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(true)
}

/// Session creation response
#[derive(Debug, Serialize)]
struct SessionResponse {
    success: bool,
    session_id: String,
}

/// Create a new chat session
async fn create_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let session_id = Uuid::new_v4().to_string();
    state
        .sessions
        .get_or_create(&session_id, |id| state.create_agent(id));

    Json(SessionResponse {
        success: true,
        session_id,
    })
}

/// Get session info
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let session = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(serde_json::json!({
        "session_id": session.id,
        "stage": session.agent.stage().await.display_name(),
        "agent_mode": session.agent.agent_mode().await.as_str(),
        "turn_count": session.agent.turn_count().await,
    })))
}

/// Delete session
async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.sessions.remove(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Chat request
#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    session_id: Option<String>,
}

/// Chat response
#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    session_id: String,
    stage: String,
}

/// Non-streaming chat endpoint; creates the session on demand
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, StatusCode> {
    if request.message.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let session_id = request
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let session = state
        .sessions
        .get_or_create(&session_id, |id| state.create_agent(id));

    let response = session.agent.process(&request.message).await.map_err(|e| {
        tracing::error!(session_id = %session_id, error = %e, "turn failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let stage = session.agent.stage().await.display_name().to_string();

    Ok(Json(ChatResponse {
        response,
        session_id,
        stage,
    }))
}

/// Streaming chat endpoint
///
/// Emits one cosmetic status event describing the executing stage, then the
/// reply in whitespace-preserving chunks, then a done event.
async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = request
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let session = state
        .sessions
        .get_or_create(&session_id, |id| state.create_agent(id));

    let agent = session.agent.clone();
    let message = request.message;

    let stream = async_stream::stream! {
        let status = agent.status_line().await;
        yield Ok(stream_event(serde_json::json!({
            "type": "status",
            "message": status,
        })));

        let reply = match agent.process(&message).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "turn failed mid-stream");
                "I apologize, but I encountered an error. Please try again or \
                 rephrase your question."
                    .to_string()
            }
        };

        for part in word_chunks(&reply) {
            let is_space = part.chars().all(char::is_whitespace);
            yield Ok(stream_event(serde_json::json!({
                "type": "chunk",
                "data": part,
            })));
            if !is_space {
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
        }

        yield Ok(stream_event(serde_json::json!({ "type": "done" })));
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn stream_event(payload: serde_json::Value) -> Event {
    Event::default().data(payload.to_string())
}

/// Split a reply into alternating word and whitespace runs, so newlines and
/// indentation survive client-side reassembly
fn word_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut in_space: Option<bool> = None;

    for c in text.chars() {
        let is_space = c.is_whitespace();
        if in_space != Some(is_space) && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        in_space = Some(is_space);
        current.push(c);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Health check
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "active_sessions": state.sessions.count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_chunks_preserve_whitespace() {
        let text = "Great news!\n\n- Date: today";
        let chunks = word_chunks(text);
        assert_eq!(chunks.join(""), text);
        assert!(chunks.contains(&"\n\n".to_string()));
        assert_eq!(chunks[0], "Great");
        assert_eq!(chunks[1], " ");
    }

    #[test]
    fn test_word_chunks_empty() {
        assert!(word_chunks("").is_empty());
    }
}
