//! Environment-driven process settings (C8).
//!
//! Mirrors the teacher's `voice-agent-config` crate: a single typed struct
//! loaded once at startup via the `config` crate, with defaults compiled in
//! so the gateway boots with zero environment variables set.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Which engine back-end the process should serve from on startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineType {
    Funasr,
    Mlx,
}

/// Typed, validated process configuration (§1.1, §6).
///
/// Every field has a compiled-in default; `ENGINE_TYPE` is the only one
/// that meaningfully changes behavior if left unset, since it picks which
/// concrete [`Engine`](stt_gateway_core::Engine) is loaded at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    #[serde(default = "default_engine_type")]
    pub engine_type: EngineType,

    /// Registry alias or free-form model identifier to load at startup.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Bounded FIFO queue capacity (§4.6); beyond this, admission rejects
    /// with `QueueFull` rather than blocking.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    #[serde(default = "default_max_upload_size_mb")]
    pub max_upload_size_mb: u64,

    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Base URL of the FunASR HTTP sidecar process.
    #[serde(default = "default_funasr_sidecar_url")]
    pub funasr_sidecar_url: String,

    /// Path to the MLX CLI binary invoked as a subprocess.
    #[serde(default = "default_mlx_binary_path")]
    pub mlx_binary_path: PathBuf,
}

impl GatewaySettings {
    /// Load settings from the process environment, layering compiled-in
    /// defaults underneath whatever environment variables are present.
    ///
    /// Recognized variables: `ENGINE_TYPE`, `MODEL_ID`, `PORT`,
    /// `MAX_QUEUE_SIZE`, `MAX_UPLOAD_SIZE_MB`, `ALLOWED_ORIGINS` (comma
    /// separated), `LOG_LEVEL`, `FUNASR_SIDECAR_URL`, `MLX_BINARY_PATH`.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(config::Environment::default().try_parsing(true))
    }

    fn load_from(source: config::Environment) -> Result<Self, SettingsError> {
        let defaults = config::Config::builder()
            .set_default("engine_type", "funasr")?
            .set_default("model_id", default_model_id())?
            .set_default("port", i64::from(default_port()))?
            .set_default("max_queue_size", default_max_queue_size() as i64)?
            .set_default("max_upload_size_mb", default_max_upload_size_mb() as i64)?
            .set_default("allowed_origins", default_allowed_origins())?
            .set_default("log_level", default_log_level())?
            .set_default("funasr_sidecar_url", default_funasr_sidecar_url())?
            .set_default(
                "mlx_binary_path",
                default_mlx_binary_path().to_string_lossy().into_owned(),
            )?
            .add_source(source.separator("__").list_separator(",").with_list_parse_key("allowed_origins"))
            .build()?;

        let settings: Self = defaults.try_deserialize()?;
        settings.validate()
    }

    fn validate(self) -> Result<Self, SettingsError> {
        if self.max_queue_size == 0 {
            return Err(SettingsError::Invalid {
                field: "max_queue_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_upload_size_mb == 0 {
            return Err(SettingsError::Invalid {
                field: "max_upload_size_mb",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(self)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Source(#[from] config::ConfigError),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

fn default_engine_type() -> EngineType {
    EngineType::Funasr
}

fn default_model_id() -> String {
    "paraformer".to_string()
}

fn default_port() -> u16 {
    50070
}

fn default_max_queue_size() -> usize {
    50
}

fn default_max_upload_size_mb() -> u64 {
    200
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_funasr_sidecar_url() -> String {
    "http://127.0.0.1:10095".to_string()
}

fn default_mlx_binary_path() -> PathBuf {
    PathBuf::from("mlx_whisper")
}
