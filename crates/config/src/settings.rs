//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("missing required setting: {field}")]
    Missing { field: String },
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub gateway: GatewaySettings,

    #[serde(default)]
    pub rag: RagSettings,

    #[serde(default)]
    pub observability: ObservabilitySettings,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Enforce the configured CORS origins (disable only for local dev)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Sessions idle longer than this are discarded
    #[serde(default = "default_session_timeout_minutes")]
    pub session_timeout_minutes: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

fn default_session_timeout_minutes() -> u64 {
    30
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            session_timeout_minutes: default_session_timeout_minutes(),
        }
    }
}

/// Language model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Process-wide minimum spacing between classification calls
    #[serde(default = "default_classify_min_interval_ms")]
    pub classify_min_interval_ms: u64,

    /// How long classification verdicts for identical text are reused
    #[serde(default = "default_classify_cache_ttl_secs")]
    pub classify_cache_ttl_secs: u64,
}

fn default_llm_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_model() -> String {
    "qwen2.5:7b-instruct-q4_K_M".to_string()
}

fn default_max_tokens() -> usize {
    512
}

fn default_temperature() -> f32 {
    0.2
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_classify_min_interval_ms() -> u64 {
    250
}

fn default_classify_cache_ttl_secs() -> u64 {
    600
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout_secs(),
            classify_min_interval_ms: default_classify_min_interval_ms(),
            classify_cache_ttl_secs: default_classify_cache_ttl_secs(),
        }
    }
}

/// Scheduling provider settings
///
/// `service_id` and `staff_ids` come from the provider's booking page and are
/// required; the agent refuses to start without them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Base URL of the provider's booking business endpoint
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub service_id: String,

    #[serde(default)]
    pub staff_ids: Vec<String>,

    /// Named provider timezone used on every timestamp in the wire payloads
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Fixed appointment length
    #[serde(default = "default_meeting_duration_minutes")]
    pub meeting_duration_minutes: i64,

    #[serde(default = "default_availability_timeout_secs")]
    pub availability_timeout_secs: u64,

    /// Booking is a side-effecting write and gets a much longer deadline
    #[serde(default = "default_booking_timeout_secs")]
    pub booking_timeout_secs: u64,

    #[serde(default = "default_slot_cache_ttl_secs")]
    pub slot_cache_ttl_secs: u64,
}

fn default_timezone() -> String {
    "Bangladesh Standard Time".to_string()
}

fn default_meeting_duration_minutes() -> i64 {
    30
}

fn default_availability_timeout_secs() -> u64 {
    120
}

fn default_booking_timeout_secs() -> u64 {
    300
}

fn default_slot_cache_ttl_secs() -> u64 {
    600
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            service_id: String::new(),
            staff_ids: Vec::new(),
            timezone: default_timezone(),
            meeting_duration_minutes: default_meeting_duration_minutes(),
            availability_timeout_secs: default_availability_timeout_secs(),
            booking_timeout_secs: default_booking_timeout_secs(),
            slot_cache_ttl_secs: default_slot_cache_ttl_secs(),
        }
    }
}

/// Retrieval service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_rag_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_rag_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_rag_endpoint() -> String {
    "http://localhost:8100".to_string()
}

fn default_top_k() -> usize {
    4
}

fn default_rag_timeout_secs() -> u64 {
    30
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_rag_endpoint(),
            top_k: default_top_k(),
            timeout_secs: default_rag_timeout_secs(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl Settings {
    /// Validate settings. Gateway identifiers are required at startup:
    /// a turn must never be the first place a missing id is discovered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.base_url.is_empty() {
            return Err(ConfigError::Missing {
                field: "gateway.base_url".to_string(),
            });
        }
        if self.gateway.service_id.is_empty() {
            return Err(ConfigError::Missing {
                field: "gateway.service_id".to_string(),
            });
        }
        if self.gateway.staff_ids.is_empty() {
            return Err(ConfigError::Missing {
                field: "gateway.staff_ids".to_string(),
            });
        }
        if self.gateway.meeting_duration_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "gateway.meeting_duration_minutes".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.gateway.booking_timeout_secs < self.gateway.availability_timeout_secs {
            return Err(ConfigError::InvalidValue {
                field: "gateway.booking_timeout_secs".to_string(),
                message: "booking commit deadline must not be shorter than availability lookup"
                    .to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("must be between 0.0 and 2.0, got {}", self.llm.temperature),
            });
        }
        if self.rag.enabled && self.rag.endpoint.is_empty() {
            return Err(ConfigError::Missing {
                field: "rag.endpoint".to_string(),
            });
        }
        Ok(())
    }
}

/// Load settings from config files and environment.
///
/// Priority: env vars > `config/{env}.toml` > `config/default.toml` > defaults.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder().add_source(File::with_name("config/default").required(false));

    if let Some(env) = env {
        builder = builder.add_source(File::with_name(&format!("config/{env}")).required(false));
    }

    let config = builder
        .add_source(Environment::with_prefix("MEETING_AGENT").separator("__"))
        .build()?;

    let settings: Settings = config.try_deserialize()?;
    Ok(settings)
}
