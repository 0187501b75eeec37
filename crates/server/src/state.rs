//! Shared application state

use std::sync::Arc;
use std::time::Duration;

use meeting_agent_agent::MeetingAgent;
use meeting_agent_config::Settings;
use meeting_agent_core::{ChatLogger, Retriever, SchedulingGateway};
use meeting_agent_llm::{Classifier, LlmBackend};

use crate::session::SessionManager;

/// Everything the HTTP handlers need
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub sessions: Arc<SessionManager>,
    llm: Arc<dyn LlmBackend>,
    classifier: Arc<Classifier>,
    gateway: Arc<dyn SchedulingGateway>,
    retriever: Option<Arc<dyn Retriever>>,
    chat_log: Arc<dyn ChatLogger>,
}

impl AppState {
    pub fn new(
        config: Settings,
        llm: Arc<dyn LlmBackend>,
        classifier: Arc<Classifier>,
        gateway: Arc<dyn SchedulingGateway>,
        retriever: Option<Arc<dyn Retriever>>,
        chat_log: Arc<dyn ChatLogger>,
    ) -> Self {
        let idle_timeout = Duration::from_secs(config.server.session_timeout_minutes * 60);
        Self {
            config: Arc::new(config),
            sessions: Arc::new(SessionManager::new(idle_timeout)),
            llm,
            classifier,
            gateway,
            retriever,
            chat_log,
        }
    }

    /// Build a fresh agent bound to a session id
    pub fn create_agent(&self, session_id: &str) -> Arc<MeetingAgent> {
        Arc::new(MeetingAgent::new(
            session_id,
            self.llm.clone(),
            self.classifier.clone(),
            self.gateway.clone(),
            self.retriever.clone(),
            self.chat_log.clone(),
        ))
    }
}
