//! Configuration for the meeting agent
//!
//! Settings are layered: `config/default.toml`, then `config/{env}.toml`,
//! then `MEETING_AGENT_*` environment variables (double underscore as the
//! section separator, e.g. `MEETING_AGENT_SERVER__PORT=8080`).

mod settings;

pub use settings::{
    load_settings, ConfigError, GatewaySettings, LlmSettings, ObservabilitySettings, RagSettings,
    RuntimeEnvironment, ServerSettings, Settings,
};
