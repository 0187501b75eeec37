//! Meeting agent server entry point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use meeting_agent_config::{load_settings, Settings};
use meeting_agent_core::{ChatLogger, MemoryChatLogger, Retriever, SchedulingGateway};
use meeting_agent_gateway::BookingsClient;
use meeting_agent_llm::{
    ClassifyCache, Classifier, LlmBackend, LlmConfig, OllamaBackend, Throttle,
};
use meeting_agent_rag::HttpRetriever;
use meeting_agent_server::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env}.toml > config/default.toml > defaults
    let env = std::env::var("MEETING_AGENT_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing not yet initialized, use eprintln for early logging
            eprintln!("Warning: failed to load config: {e}. Using defaults.");
            Settings::default()
        }
    };

    init_tracing(&config);

    tracing::info!("Starting Meeting Agent Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_env = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    // A turn must never be the first place a broken configuration surfaces
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "configuration invalid; refusing to start");
        std::process::exit(1);
    }

    let llm_config = LlmConfig {
        model: config.llm.model.clone(),
        endpoint: config.llm.endpoint.clone(),
        api_key: config.llm.api_key.clone(),
        max_tokens: config.llm.max_tokens,
        temperature: config.llm.temperature,
        timeout: Duration::from_secs(config.llm.timeout_secs),
        ..LlmConfig::default()
    };
    let llm: Arc<dyn LlmBackend> = Arc::new(OllamaBackend::new(llm_config)?);

    if !llm.is_available().await {
        tracing::warn!(
            endpoint = %config.llm.endpoint,
            "LLM backend not reachable at startup; classification will fall back conservatively"
        );
    }

    let cache = Arc::new(ClassifyCache::new(Duration::from_secs(
        config.llm.classify_cache_ttl_secs,
    )));
    let throttle = Arc::new(Throttle::new(Duration::from_millis(
        config.llm.classify_min_interval_ms,
    )));
    let classifier = Arc::new(Classifier::new(llm.clone(), cache, throttle));

    let gateway: Arc<dyn SchedulingGateway> = Arc::new(BookingsClient::new(
        config.gateway.clone(),
    )?);

    let retriever: Option<Arc<dyn Retriever>> = if config.rag.enabled {
        match HttpRetriever::new(config.rag.clone()) {
            Ok(retriever) => {
                tracing::info!(endpoint = %config.rag.endpoint, "retrieval service configured");
                Some(Arc::new(retriever))
            }
            Err(e) => {
                tracing::warn!(error = %e, "retriever init failed; informational answers will degrade");
                None
            }
        }
    } else {
        tracing::info!("RAG disabled; informational answers use the model fallback");
        None
    };

    // The real chat-log sink is an external service; keep an in-memory one
    // so dev runs still record the conversation shape.
    let chat_log: Arc<dyn ChatLogger> = Arc::new(MemoryChatLogger::new());

    let state = AppState::new(config.clone(), llm, classifier, gateway, retriever, chat_log);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("meeting_agent={level},tower_http=info").into()
    });

    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
