//! # Voice Relay WebSocket Handler
//!
//! Bridges one client connection to one upstream Transport Session.
//! Clients connect to `/ws/voice`, send control messages as JSON and audio
//! as either binary frames or base64 `audio` messages; the relay forwards
//! everything upstream and streams typed events back.
//!
//! ## WebSocket Protocol:
//! 1. **Connection**: rejected immediately when the server credential is
//!    absent or the session limit is reached
//! 2. **`start`**: opens the upstream session with the server-held prompt
//!    and configuration; `connected` is sent once the session is live
//! 3. **Audio streaming**: binary frames are raw PCM16 and bypass JSON
//!    parsing; JSON `audio` messages carry base64 payloads
//! 4. **Responses**: transcripts, decoded intents, audio deltas and
//!    lifecycle events stream back as typed JSON messages
//! 5. **`stop`**: closes the upstream session but keeps this socket open
//!
//! ## Session Isolation:
//! Each connection is an independent actor owning its own upstream session;
//! a failure while processing one client's messages never reaches another
//! client.

use crate::actions;
use crate::config::AppConfig;
use crate::relay::prompt::ASSISTANT_INSTRUCTIONS;
use crate::relay::protocol::{ClientMessage, RelayMessage};
use crate::relay::registry::{SessionRegistry, SessionStatus};
use crate::state::AppState;
use crate::upstream::config::REALTIME_ENDPOINT;
use crate::upstream::{SessionSettings, TransportEvent, TurnDetection, UpstreamConfig, UpstreamSession};

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How often the relay pings the client.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// How long a silent client survives before the connection is dropped.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// WebSocket actor for one voice relay client.
pub struct VoiceRelaySocket {
    /// Unique identifier for this connection
    session_id: String,

    /// Shared application state (config + metrics)
    app_state: web::Data<AppState>,

    /// Shared connection registry
    registry: SessionRegistry,

    /// Upstream session; absent until the client sends `start`
    upstream: Option<UpstreamSession>,

    /// Last heartbeat from the client
    last_heartbeat: Instant,
}

impl VoiceRelaySocket {
    pub fn new(app_state: web::Data<AppState>, registry: SessionRegistry) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            app_state,
            registry,
            upstream: None,
            last_heartbeat: Instant::now(),
        }
    }

    fn send(&self, ctx: &mut ws::WebsocketContext<Self>, message: RelayMessage) {
        ctx.text(message.to_json());
    }

    fn reject(&self, ctx: &mut ws::WebsocketContext<Self>, error: &str) {
        warn!(session_id = %self.session_id, error, "rejecting relay connection");
        self.send(
            ctx,
            RelayMessage::Error {
                error: error.to_string(),
            },
        );
        ctx.close(Some(ws::CloseReason {
            code: ws::CloseCode::Policy,
            description: Some(error.to_string()),
        }));
        ctx.stop();
    }

    /// Handle one parsed control message from the client.
    fn handle_control(&mut self, message: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match message {
            ClientMessage::Start => self.handle_start(ctx),
            ClientMessage::Stop => {
                if let Some(upstream) = self.upstream.take() {
                    upstream.close();
                }
                self.registry.set_status(&self.session_id, SessionStatus::Closed);
                self.send(ctx, RelayMessage::Stopped);
            }
            ClientMessage::Audio { audio } => {
                // Already base64; forwarded as-is.
                if let Some(upstream) = &self.upstream {
                    upstream.append_audio(audio);
                }
            }
            ClientMessage::CommitAudio => {
                if let Some(upstream) = &self.upstream {
                    upstream.commit_audio();
                }
            }
            ClientMessage::Text { text } => {
                if let Some(upstream) = &self.upstream {
                    upstream.send_text(text);
                }
            }
            ClientMessage::Cancel => {
                if let Some(upstream) = &self.upstream {
                    upstream.cancel_response();
                }
            }
        }
    }

    fn handle_start(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        if self.upstream.is_some() {
            debug!(session_id = %self.session_id, "duplicate start ignored");
            return;
        }

        let config = self.app_state.get_config();

        // Re-checked here as a guard: the connection-time rejection closes
        // asynchronously and a fast client may get a `start` in first.
        if !config.openai_configured() {
            self.reject(ctx, "OPENAI_API_KEY is not configured on the server");
            return;
        }

        self.registry
            .set_status(&self.session_id, SessionStatus::Connecting);
        info!(session_id = %self.session_id, "opening upstream session");

        let connect = UpstreamSession::connect(upstream_config_for(&config));
        let connect = actix::fut::wrap_future::<_, Self>(connect).map(|result, act, ctx| {
            match result {
                Ok((session, events)) => {
                    act.upstream = Some(session);
                    act.registry
                        .set_status(&act.session_id, SessionStatus::Connected);
                    // The first event on the stream is `Connected`, which
                    // becomes the client's `connected` message.
                    ctx.add_stream(UnboundedReceiverStream::new(events));
                }
                Err(err) => {
                    act.registry.set_status(&act.session_id, SessionStatus::Error);
                    warn!(session_id = %act.session_id, error = %err, "upstream connect failed");
                    ctx.text(
                        RelayMessage::Error {
                            error: err.to_string(),
                        }
                        .to_json(),
                    );
                }
            }
        });
        ctx.spawn(connect);
    }
}

/// Build the upstream connect parameters from the live configuration: the
/// server-held credential and prompt, the configured voice/model, and the
/// VAD settings.
pub fn upstream_config_for(config: &AppConfig) -> UpstreamConfig {
    UpstreamConfig {
        api_key: config.openai.api_key.clone().unwrap_or_default(),
        model: config.openai.model.clone(),
        endpoint: REALTIME_ENDPOINT.to_string(),
        session: SessionSettings::for_assistant(
            ASSISTANT_INSTRUCTIONS.to_string(),
            config.openai.voice.clone(),
            config.openai.transcription_model.clone(),
            config.openai.spoken_responses,
            TurnDetection::server_vad(
                config.vad.threshold,
                config.vad.prefix_padding_ms,
                config.vad.silence_duration_ms,
            ),
        ),
    }
}

/// Map a transport event to the client wire message, running assistant
/// output through the action decoder.
///
/// Returns `None` for events with no client-visible counterpart (e.g. the
/// `Disconnected` that follows a client-requested stop).
pub fn relay_message_for(event: TransportEvent) -> Option<RelayMessage> {
    match event {
        TransportEvent::Connected => Some(RelayMessage::Connected {
            message: "Session vocale prête".to_string(),
        }),
        TransportEvent::Disconnected { reason: None } => None,
        TransportEvent::Disconnected {
            reason: Some(reason),
        } => Some(RelayMessage::Error { error: reason }),
        TransportEvent::SpeechStarted => Some(RelayMessage::SpeechStarted),
        TransportEvent::SpeechStopped => Some(RelayMessage::SpeechStopped),
        TransportEvent::Transcript {
            text,
            is_final: true,
        } => Some(RelayMessage::Transcript { text }),
        TransportEvent::Transcript {
            text,
            is_final: false,
        } => Some(RelayMessage::ResponseTranscriptDelta { delta: text }),
        TransportEvent::Response { text } => {
            let decoded = actions::decode(&text);
            if decoded.structured {
                Some(RelayMessage::Intent {
                    intent: serde_json::json!({
                        "actions": decoded.actions,
                        "message": decoded.message,
                    }),
                })
            } else {
                Some(RelayMessage::ResponseText { text })
            }
        }
        TransportEvent::AudioChunk { bytes } => Some(RelayMessage::AudioDelta {
            audio: crate::audio::codec::encode_base64(&bytes),
        }),
        TransportEvent::AudioDone => Some(RelayMessage::AudioDone),
        TransportEvent::ResponseDone => Some(RelayMessage::ResponseDone),
        TransportEvent::Error { message } => Some(RelayMessage::Error { error: message }),
    }
}

impl Actor for VoiceRelaySocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(session_id = %self.session_id, "relay connection started");
        self.app_state.increment_active_sessions();

        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(session_id = %act.session_id, "client heartbeat timeout");
                ctx.stop();
            } else {
                ctx.ping(b"");
            }
        });

        let config = self.app_state.get_config();

        // No credential, no session: reject before anything upstream is
        // even attempted.
        if !config.openai_configured() {
            self.reject(ctx, "OPENAI_API_KEY is not configured on the server");
            return;
        }

        if let Err(err) = self
            .registry
            .register(&self.session_id, config.performance.max_concurrent_sessions)
        {
            self.reject(ctx, &err);
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!(session_id = %self.session_id, "relay connection stopped");
        if let Some(upstream) = self.upstream.take() {
            upstream.close();
        }
        self.registry.remove(&self.session_id);
        self.app_state.decrement_active_sessions();
    }
}

/// Client-socket frames.
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for VoiceRelaySocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => self.handle_control(message, ctx),
                Err(err) => {
                    self.send(
                        ctx,
                        RelayMessage::Error {
                            error: format!("invalid control message: {}", err),
                        },
                    );
                }
            },
            Ok(ws::Message::Binary(data)) => {
                // Binary frames are always raw audio; no JSON parsing.
                if let Some(upstream) = &self.upstream {
                    upstream.append_audio(crate::audio::codec::encode_base64(&data));
                } else {
                    debug!(session_id = %self.session_id, "audio frame before start, dropped");
                }
            }
            Ok(ws::Message::Ping(data)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&data);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                debug!(session_id = %self.session_id, ?reason, "client closed");
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(err) => {
                warn!(session_id = %self.session_id, error = %err, "client protocol error");
                ctx.stop();
            }
        }
    }
}

/// Upstream transport events for this session.
impl StreamHandler<TransportEvent> for VoiceRelaySocket {
    fn handle(&mut self, event: TransportEvent, ctx: &mut Self::Context) {
        match &event {
            TransportEvent::Disconnected { .. } => {
                self.upstream = None;
                self.registry.set_status(&self.session_id, SessionStatus::Closed);
            }
            TransportEvent::Error { .. } => {
                self.registry.set_status(&self.session_id, SessionStatus::Error);
            }
            _ => {}
        }

        if let Some(message) = relay_message_for(event) {
            ctx.text(message.to_json());
        }
    }

    fn finished(&mut self, _ctx: &mut Self::Context) {
        // The upstream event stream ended; the client socket stays open so
        // the client can `start` a fresh session.
        self.upstream = None;
    }
}

/// HTTP → WebSocket upgrade handler for `/ws/voice`.
pub async fn voice_websocket(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
    registry: web::Data<SessionRegistry>,
) -> ActixResult<HttpResponse> {
    debug!(peer = ?req.connection_info().peer_addr(), "new relay connection request");
    let socket = VoiceRelaySocket::new(app_state, registry.get_ref().clone());
    ws::start(socket, &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;

    #[test]
    fn test_upstream_config_uses_server_held_settings() {
        let mut config = AppConfig::default();
        config.openai.api_key = Some("sk-test".to_string());
        config.openai.voice = "verse".to_string();
        config.vad.silence_duration_ms = 800;

        let upstream = upstream_config_for(&config);
        assert_eq!(upstream.api_key, "sk-test");
        assert_eq!(upstream.session.voice, "verse");
        assert_eq!(upstream.session.modalities, vec!["text"]);
        assert_eq!(
            upstream.session.turn_detection.as_ref().unwrap().silence_duration_ms,
            800
        );
        assert!(upstream
            .session
            .instructions
            .contains("update_client"));
    }

    #[test]
    fn test_transport_events_map_to_wire_messages() {
        assert_eq!(
            relay_message_for(TransportEvent::SpeechStarted),
            Some(RelayMessage::SpeechStarted)
        );
        assert_eq!(
            relay_message_for(TransportEvent::Transcript {
                text: "bonjour".to_string(),
                is_final: true
            }),
            Some(RelayMessage::Transcript {
                text: "bonjour".to_string()
            })
        );
        assert_eq!(
            relay_message_for(TransportEvent::Transcript {
                text: "bon".to_string(),
                is_final: false
            }),
            Some(RelayMessage::ResponseTranscriptDelta {
                delta: "bon".to_string()
            })
        );
        // A manual close has no client-visible counterpart.
        assert_eq!(
            relay_message_for(TransportEvent::Disconnected { reason: None }),
            None
        );
    }

    #[test]
    fn test_structured_response_becomes_intent() {
        let message = relay_message_for(TransportEvent::Response {
            text: r#"{"message": "ok", "actions": [{"type": "remove_discount"}]}"#.to_string(),
        });
        match message {
            Some(RelayMessage::Intent { intent }) => {
                let actions: Vec<Action> =
                    serde_json::from_value(intent["actions"].clone()).unwrap();
                assert_eq!(actions, vec![Action::RemoveDiscount]);
                assert_eq!(intent["message"], "ok");
            }
            other => panic!("expected intent, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_response_becomes_response_text() {
        let message = relay_message_for(TransportEvent::Response {
            text: "je n'ai pas compris".to_string(),
        });
        assert_eq!(
            message,
            Some(RelayMessage::ResponseText {
                text: "je n'ai pas compris".to_string()
            })
        );
    }

    #[test]
    fn test_audio_chunk_is_reencoded_for_the_wire() {
        let message = relay_message_for(TransportEvent::AudioChunk {
            bytes: vec![1, 2, 3],
        });
        match message {
            Some(RelayMessage::AudioDelta { audio }) => {
                assert_eq!(crate::audio::codec::decode_base64(&audio).unwrap(), vec![1, 2, 3]);
            }
            other => panic!("expected audio delta, got {:?}", other),
        }
    }
}
