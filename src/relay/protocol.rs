//! # Client Wire Protocol
//!
//! JSON message vocabulary between the browser/mobile client and the relay.
//! Binary WebSocket frames are not represented here: they are always raw
//! PCM16 audio and bypass JSON parsing entirely.

use serde::{Deserialize, Serialize};

/// Messages the client sends to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open the upstream session
    Start,
    /// Close the upstream session but keep this socket open
    Stop,
    /// Base64 PCM16 audio chunk
    Audio { audio: String },
    /// Force the provider to process pending audio (client-side VAD)
    CommitAudio,
    /// Inject a text turn instead of speech
    Text { text: String },
    /// Cancel the in-flight response
    Cancel,
}

/// Messages the relay sends to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayMessage {
    /// Upstream session is live
    Connected { message: String },
    SpeechStarted,
    SpeechStopped,
    /// Final transcription of the user's speech
    Transcript { text: String },
    /// Incremental piece of the assistant's response transcript
    ResponseTranscriptDelta { delta: String },
    /// Assistant output that was not recognized JSON
    ResponseText { text: String },
    /// Assistant output decoded into the action contract
    Intent { intent: serde_json::Value },
    /// Base64 PCM16 chunk of the spoken response
    AudioDelta { audio: String },
    AudioDone,
    ResponseDone,
    Error { error: String },
    /// Upstream session closed after a client `stop`
    Stopped,
}

impl RelayMessage {
    /// Serialize for the socket. Infallible in practice; a serialization
    /// failure degrades to an error frame rather than dropping the message.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            format!(r#"{{"type":"error","error":"serialization failed: {}"}}"#, err)
        })
    }
}
