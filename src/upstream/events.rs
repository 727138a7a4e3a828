//! # Realtime API Event Vocabulary
//!
//! Typed subset of the speech provider's WebSocket protocol: the client
//! events the relay sends upstream and the server events it consumes.
//! Unknown server events deserialize to [`ServerEvent::Unknown`] so protocol
//! additions never break the bridge.

use serde::{Deserialize, Serialize};

/// Events sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate { session: crate::upstream::config::SessionSettings },
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: String },
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit,
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },
    #[serde(rename = "response.create")]
    ResponseCreate,
    #[serde(rename = "response.cancel")]
    ResponseCancel,
}

/// A conversation item injected by the relay (synthetic user turns).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub role: String,
    pub content: Vec<ContentPart>,
}

impl ConversationItem {
    /// Build a user text turn, as used by `sendText`.
    pub fn user_text(text: &str) -> Self {
        Self {
            kind: "message".to_string(),
            role: "user".to_string(),
            content: vec![ContentPart {
                kind: "input_text".to_string(),
                text: Some(text.to_string()),
                transcript: None,
            }],
        }
    }
}

/// One content part of a conversation or response item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

/// Events received from the provider. Only the variants the bridge reacts
/// to carry payloads; everything else is logged and dropped.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: ErrorDetail,
    },
    #[serde(rename = "session.created")]
    SessionCreated,
    #[serde(rename = "session.updated")]
    SessionUpdated,
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted,
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped,
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    InputTranscriptionCompleted {
        #[serde(default)]
        transcript: String,
    },
    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta {
        #[serde(default)]
        delta: String,
    },
    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone {
        #[serde(default)]
        transcript: String,
    },
    #[serde(rename = "response.text.delta")]
    TextDelta {
        #[serde(default)]
        delta: String,
    },
    #[serde(rename = "response.text.done")]
    TextDone {
        #[serde(default)]
        text: String,
    },
    #[serde(rename = "response.output_item.done")]
    OutputItemDone {
        #[serde(default)]
        item: OutputItem,
    },
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        #[serde(default)]
        delta: String,
    },
    #[serde(rename = "response.audio.done")]
    AudioDone,
    #[serde(rename = "response.done")]
    ResponseDone,
    #[serde(other)]
    Unknown,
}

/// Provider error payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Completed output item of a response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputItem {
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

impl OutputItem {
    /// Extract the textual content of the item, if any: a `text` part wins,
    /// otherwise an audio part's transcript.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find_map(|part| match part.kind.as_str() {
                "text" => part.text.as_deref(),
                _ => None,
            })
            .or_else(|| self.content.iter().find_map(|part| part.transcript.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_wire_names() {
        let json = serde_json::to_value(ClientEvent::InputAudioBufferCommit).unwrap();
        assert_eq!(json["type"], "input_audio_buffer.commit");

        let json = serde_json::to_value(ClientEvent::InputAudioBufferAppend {
            audio: "AAAA".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "input_audio_buffer.append");
        assert_eq!(json["audio"], "AAAA");
    }

    #[test]
    fn test_user_text_item_shape() {
        let json = serde_json::to_value(ClientEvent::ConversationItemCreate {
            item: ConversationItem::user_text("bonjour"),
        })
        .unwrap();
        assert_eq!(json["item"]["type"], "message");
        assert_eq!(json["item"]["role"], "user");
        assert_eq!(json["item"]["content"][0]["type"], "input_text");
        assert_eq!(json["item"]["content"][0]["text"], "bonjour");
    }

    #[test]
    fn test_server_event_parsing() {
        let event: ServerEvent = serde_json::from_str(
            r#"{"type":"input_audio_buffer.speech_started","audio_start_ms":120}"#,
        )
        .unwrap();
        assert!(matches!(event, ServerEvent::SpeechStarted));

        let event: ServerEvent = serde_json::from_str(
            r#"{"type":"response.audio_transcript.delta","delta":"bon"}"#,
        )
        .unwrap();
        match event {
            ServerEvent::AudioTranscriptDelta { delta } => assert_eq!(delta, "bon"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_server_event_does_not_fail() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"rate_limits.updated","rate_limits":[]}"#).unwrap();
        assert!(matches!(event, ServerEvent::Unknown));
    }

    #[test]
    fn test_output_item_text_prefers_text_part() {
        let item = OutputItem {
            content: vec![
                ContentPart {
                    kind: "audio".to_string(),
                    text: None,
                    transcript: Some("spoken".to_string()),
                },
                ContentPart {
                    kind: "text".to_string(),
                    text: Some("written".to_string()),
                    transcript: None,
                },
            ],
        };
        assert_eq!(item.text(), Some("written"));
    }
}
