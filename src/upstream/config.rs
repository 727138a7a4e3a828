//! # Upstream Session Configuration
//!
//! The `session.update` payload sent on every (re)connect, plus the connect
//! parameters of the upstream socket. No session state survives a reconnect
//! upstream, so the full settings object is re-issued each time.

use serde::{Deserialize, Serialize};

/// Default realtime endpoint; the model name is appended as a query
/// parameter.
pub const REALTIME_ENDPOINT: &str = "wss://api.openai.com/v1/realtime";

/// Session settings mirrored into the provider's `session.update` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// `["text"]` for the silent action-only mode, `["text", "audio"]` for
    /// the spoken variant.
    pub modalities: Vec<String>,
    pub instructions: String,
    pub voice: String,
    pub input_audio_format: String,
    pub output_audio_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<TranscriptionSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
}

impl SessionSettings {
    /// Settings for the relay's quote assistant: pcm16 both ways, input
    /// transcription on, server-side voice activity detection.
    pub fn for_assistant(
        instructions: String,
        voice: String,
        transcription_model: String,
        spoken: bool,
        vad: TurnDetection,
    ) -> Self {
        let modalities = if spoken {
            vec!["text".to_string(), "audio".to_string()]
        } else {
            vec!["text".to_string()]
        };
        Self {
            modalities,
            instructions,
            voice,
            input_audio_format: "pcm16".to_string(),
            output_audio_format: "pcm16".to_string(),
            input_audio_transcription: Some(TranscriptionSettings {
                model: transcription_model,
            }),
            turn_detection: Some(vad),
        }
    }
}

/// Input-audio transcription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionSettings {
    pub model: String,
}

/// Server-side voice activity detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: String,
    pub threshold: f32,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

impl TurnDetection {
    pub fn server_vad(threshold: f32, prefix_padding_ms: u32, silence_duration_ms: u32) -> Self {
        Self {
            kind: "server_vad".to_string(),
            threshold,
            prefix_padding_ms,
            silence_duration_ms,
        }
    }
}

/// Everything needed to open (and reopen) the upstream connection.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub api_key: String,
    pub model: String,
    /// Endpoint without the model query parameter; overridable for tests.
    pub endpoint: String,
    pub session: SessionSettings,
}

impl UpstreamConfig {
    pub fn url(&self) -> String {
        format!("{}?model={}", self.endpoint, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_update_payload_shape() {
        let settings = SessionSettings::for_assistant(
            "instructions".to_string(),
            "alloy".to_string(),
            "whisper-1".to_string(),
            false,
            TurnDetection::server_vad(0.5, 300, 500),
        );
        let json = serde_json::to_value(&settings).unwrap();

        assert_eq!(json["modalities"], serde_json::json!(["text"]));
        assert_eq!(json["input_audio_format"], "pcm16");
        assert_eq!(json["output_audio_format"], "pcm16");
        assert_eq!(json["input_audio_transcription"]["model"], "whisper-1");
        assert_eq!(json["turn_detection"]["type"], "server_vad");
        assert_eq!(json["turn_detection"]["threshold"], 0.5);
        assert_eq!(json["turn_detection"]["prefix_padding_ms"], 300);
        assert_eq!(json["turn_detection"]["silence_duration_ms"], 500);
    }

    #[test]
    fn test_spoken_variant_enables_audio_modality() {
        let settings = SessionSettings::for_assistant(
            String::new(),
            "verse".to_string(),
            "whisper-1".to_string(),
            true,
            TurnDetection::server_vad(0.5, 300, 800),
        );
        assert_eq!(settings.modalities, vec!["text", "audio"]);
    }

    #[test]
    fn test_connect_url_appends_model() {
        let config = UpstreamConfig {
            api_key: "sk-test".to_string(),
            model: "gpt-4o-realtime-preview".to_string(),
            endpoint: REALTIME_ENDPOINT.to_string(),
            session: SessionSettings::for_assistant(
                String::new(),
                "alloy".to_string(),
                "whisper-1".to_string(),
                false,
                TurnDetection::server_vad(0.5, 300, 500),
            ),
        };
        assert_eq!(
            config.url(),
            "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview"
        );
    }
}
