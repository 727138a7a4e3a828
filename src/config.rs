//! # Configuration Management
//!
//! Loads application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, OPENAI_API_KEY, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)
//!
//! The OpenAI credential is special: it is read from `OPENAI_API_KEY`, kept
//! server-side only, and never serialized into any HTTP response.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub vad: VadConfig,
    pub performance: PerformanceConfig,
}

/// Server-specific configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Upstream speech-provider settings.
///
/// `api_key` never leaves the process: it is skipped on serialization so no
/// config endpoint or log dump can leak it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    pub model: String,
    pub voice: String,
    pub transcription_model: String,
    /// When true the assistant also speaks its replies (`["text","audio"]`
    /// modalities); when false it emits silent action JSON only.
    pub spoken_responses: bool,
}

/// Server-side voice activity detection parameters forwarded upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadConfig {
    pub threshold: f32,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

/// Performance tuning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    pub max_concurrent_sessions: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            openai: OpenAiConfig {
                api_key: None,
                model: "gpt-4o-realtime-preview".to_string(),
                voice: "alloy".to_string(),
                transcription_model: "whisper-1".to_string(),
                spoken_responses: false,
            },
            vad: VadConfig {
                threshold: 0.5,
                prefix_padding_ms: 300,
                silence_duration_ms: 500,
            },
            performance: PerformanceConfig {
                max_concurrent_sessions: 10,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, config.toml (if present) and the
    /// environment.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER_HOST=0.0.0.0`: override server host
    /// - `APP_OPENAI_MODEL=gpt-4o-realtime-preview`: override model
    /// - `OPENAI_API_KEY=sk-...`: the server-held credential
    /// - `HOST` / `PORT`: deployment-platform conventions
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment-platform conventions that don't follow the APP_ prefix
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        // The upstream credential is only ever read from the environment
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            settings = settings.set_override("openai.api_key", key)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Whether the server-held credential is available. Sessions are
    /// rejected (and the health endpoint reports it) when this is false.
    pub fn openai_configured(&self) -> bool {
        self.openai
            .api_key
            .as_deref()
            .map_or(false, |key| !key.trim().is_empty())
    }

    /// Validate that the configuration values make sense.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if !(self.vad.threshold > 0.0 && self.vad.threshold <= 1.0) {
            return Err(anyhow::anyhow!("VAD threshold must be in (0, 1]"));
        }

        if self.vad.silence_duration_ms < 100 || self.vad.silence_duration_ms > 5000 {
            return Err(anyhow::anyhow!(
                "VAD silence duration must be between 100 and 5000 ms"
            ));
        }

        if self.performance.max_concurrent_sessions == 0 {
            return Err(anyhow::anyhow!(
                "Max concurrent sessions must be greater than 0"
            ));
        }

        Ok(())
    }

    /// Apply a partial update from a JSON string (runtime config endpoint).
    ///
    /// Only the fields present in the JSON are touched; the credential is
    /// not updatable this way. The updated configuration is re-validated.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial: serde_json::Value = serde_json::from_str(json_str)?;

        if let Some(server) = partial.get("server") {
            if let Some(host) = server.get("host").and_then(|v| v.as_str()) {
                self.server.host = host.to_string();
            }
            if let Some(port) = server.get("port").and_then(|v| v.as_u64()) {
                self.server.port = port as u16;
            }
        }

        if let Some(openai) = partial.get("openai") {
            if let Some(model) = openai.get("model").and_then(|v| v.as_str()) {
                self.openai.model = model.to_string();
            }
            if let Some(voice) = openai.get("voice").and_then(|v| v.as_str()) {
                self.openai.voice = voice.to_string();
            }
            if let Some(model) = openai.get("transcription_model").and_then(|v| v.as_str()) {
                self.openai.transcription_model = model.to_string();
            }
            if let Some(spoken) = openai.get("spoken_responses").and_then(|v| v.as_bool()) {
                self.openai.spoken_responses = spoken;
            }
        }

        if let Some(vad) = partial.get("vad") {
            if let Some(threshold) = vad.get("threshold").and_then(|v| v.as_f64()) {
                self.vad.threshold = threshold as f32;
            }
            if let Some(prefix) = vad.get("prefix_padding_ms").and_then(|v| v.as_u64()) {
                self.vad.prefix_padding_ms = prefix as u32;
            }
            if let Some(silence) = vad.get("silence_duration_ms").and_then(|v| v.as_u64()) {
                self.vad.silence_duration_ms = silence as u32;
            }
        }

        if let Some(performance) = partial.get("performance") {
            if let Some(sessions) = performance
                .get("max_concurrent_sessions")
                .and_then(|v| v.as_u64())
            {
                self.performance.max_concurrent_sessions = sessions as usize;
            }
        }

        self.validate()?;
        Ok(())
    }
}
