//! # Transport Session
//!
//! Owns exactly one upstream streaming connection per logical session and
//! translates the provider's event vocabulary into the typed
//! [`TransportEvent`] stream the rest of the relay consumes.
//!
//! ## Lifecycle:
//! - `connect()` resolves only once the socket is open and the session
//!   configuration has been sent, so callers never race the handshake
//! - Commands (audio, text, cancel) are queued over an mpsc channel and
//!   forwarded in send order
//! - On unexpected close: up to 3 reconnect attempts with linearly
//!   increasing backoff (attempt × 2s), each re-issuing the full session
//!   configuration; never after a manual `close()`

use crate::error::AppError;
use crate::upstream::config::UpstreamConfig;
use crate::upstream::events::{ClientEvent, ConversationItem, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Typed event stream emitted by a transport session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Socket open and session configuration sent (also after a reconnect).
    Connected,
    /// Connection lost for good: manual close or reconnect attempts exhausted.
    Disconnected { reason: Option<String> },
    SpeechStarted,
    SpeechStopped,
    /// User-speech transcription; `is_final` distinguishes the completed
    /// transcript from response transcript deltas.
    Transcript { text: String, is_final: bool },
    /// Complete assistant response text, ready for the action decoder.
    Response { text: String },
    /// Decoded PCM16 audio bytes of the spoken response.
    AudioChunk { bytes: Vec<u8> },
    AudioDone,
    ResponseDone,
    Error { message: String },
}

enum Command {
    AppendAudio(String),
    CommitAudio,
    SendText(String),
    CancelResponse,
    Close,
}

/// Handle to one upstream session. Dropping the handle closes the session.
pub struct UpstreamSession {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl UpstreamSession {
    /// Open the upstream connection, send the session configuration, and
    /// spawn the bridging task.
    ///
    /// The returned receiver yields [`TransportEvent::Connected`] first.
    /// Initial connect failures are returned directly; there is no
    /// automatic retry before the session was ever established.
    pub async fn connect(
        config: UpstreamConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>), AppError> {
        let stream = open_socket(&config).await?;
        info!(model = %config.model, "upstream session established");

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let _ = event_tx.send(TransportEvent::Connected);

        tokio::spawn(run_session(config, stream, cmd_rx, event_tx));

        Ok((Self { cmd_tx }, event_rx))
    }

    /// Forward a base64 PCM16 chunk to the provider's input buffer.
    pub fn append_audio(&self, audio_b64: String) {
        let _ = self.cmd_tx.send(Command::AppendAudio(audio_b64));
    }

    /// Force the provider to process whatever audio is pending.
    pub fn commit_audio(&self) {
        let _ = self.cmd_tx.send(Command::CommitAudio);
    }

    /// Inject a synthetic user turn and request a response.
    pub fn send_text(&self, text: String) {
        let _ = self.cmd_tx.send(Command::SendText(text));
    }

    /// Best-effort cancellation of the in-flight response.
    pub fn cancel_response(&self) {
        let _ = self.cmd_tx.send(Command::CancelResponse);
    }

    /// Close the session. Idempotent; suppresses reconnection.
    pub fn close(&self) {
        let _ = self.cmd_tx.send(Command::Close);
    }
}

/// Open the socket and send the session configuration. Used for the initial
/// connect and for every reconnect attempt.
async fn open_socket(config: &UpstreamConfig) -> Result<WsStream, AppError> {
    let mut request = config
        .url()
        .into_client_request()
        .map_err(|err| AppError::Transport(format!("invalid upstream URL: {}", err)))?;

    let auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
        .map_err(|err| AppError::Transport(format!("invalid credential header: {}", err)))?;
    request.headers_mut().insert("Authorization", auth);
    request
        .headers_mut()
        .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

    let (mut stream, _) = connect_async(request)
        .await
        .map_err(|err| AppError::Transport(format!("upstream connect failed: {}", err)))?;

    let update = ClientEvent::SessionUpdate {
        session: config.session.clone(),
    };
    let payload = serde_json::to_string(&update)
        .map_err(|err| AppError::Internal(format!("session config serialization: {}", err)))?;
    stream
        .send(Message::Text(payload))
        .await
        .map_err(|err| AppError::Transport(format!("session config send failed: {}", err)))?;

    Ok(stream)
}

/// Bridging task: pump commands upstream and translate frames downstream
/// until the session ends.
async fn run_session(
    config: UpstreamConfig,
    stream: WsStream,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
) {
    let mut accumulator = ResponseAccumulator::default();
    let mut attempts = 0u32;
    let (mut write, mut read) = stream.split();

    'session: loop {
        loop {
            tokio::select! {
                command = cmd_rx.recv() => {
                    match command {
                        None | Some(Command::Close) => {
                            let _ = write.close().await;
                            let _ = event_tx.send(TransportEvent::Disconnected { reason: None });
                            break 'session;
                        }
                        Some(command) => {
                            if let Err(err) = forward_command(&mut write, command).await {
                                warn!(error = %err, "upstream send failed");
                                break;
                            }
                        }
                    }
                }
                frame = read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            attempts = 0;
                            handle_server_frame(&text, &mut accumulator, &event_tx);
                        }
                        Some(Ok(Message::Close(reason))) => {
                            debug!(?reason, "upstream closed the connection");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Ping/pong are answered by the transport layer;
                            // the provider sends no binary frames.
                        }
                        Some(Err(err)) => {
                            let _ = event_tx.send(TransportEvent::Error {
                                message: format!("upstream socket error: {}", err),
                            });
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        // Unexpected close: bounded reconnect with linear backoff. The full
        // session configuration is re-issued; nothing survives upstream.
        while attempts < MAX_RECONNECT_ATTEMPTS {
            attempts += 1;
            let delay = std::time::Duration::from_secs(2 * attempts as u64);
            info!(attempt = attempts, delay_s = delay.as_secs(), "reconnecting upstream");
            tokio::time::sleep(delay).await;

            match open_socket(&config).await {
                Ok(reopened) => {
                    let (reopened_write, reopened_read) = reopened.split();
                    write = reopened_write;
                    read = reopened_read;
                    let _ = event_tx.send(TransportEvent::Connected);
                    continue 'session;
                }
                Err(err) => {
                    warn!(attempt = attempts, error = %err, "reconnect attempt failed");
                }
            }
        }

        let _ = event_tx.send(TransportEvent::Disconnected {
            reason: Some("upstream connection lost".to_string()),
        });
        break;
    }
}

async fn forward_command(
    write: &mut futures_util::stream::SplitSink<WsStream, Message>,
    command: Command,
) -> Result<(), AppError> {
    let events = match command {
        Command::AppendAudio(audio) => vec![ClientEvent::InputAudioBufferAppend { audio }],
        Command::CommitAudio => vec![ClientEvent::InputAudioBufferCommit],
        Command::SendText(text) => vec![
            ClientEvent::ConversationItemCreate {
                item: ConversationItem::user_text(&text),
            },
            ClientEvent::ResponseCreate,
        ],
        Command::CancelResponse => vec![ClientEvent::ResponseCancel],
        Command::Close => Vec::new(),
    };

    for event in events {
        let payload = serde_json::to_string(&event)
            .map_err(|err| AppError::Internal(format!("event serialization: {}", err)))?;
        write
            .send(Message::Text(payload))
            .await
            .map_err(|err| AppError::Transport(err.to_string()))?;
    }
    Ok(())
}

/// Buffered response text for the current turn. Deltas accumulate here and
/// are flushed through a `Response` event at the terminal `response.done`
/// if no explicit `*.done` text event arrived first.
#[derive(Debug, Default)]
struct ResponseAccumulator {
    text: String,
    flushed: bool,
}

/// Translate one upstream frame into transport events. Pure with respect to
/// the socket, which keeps the whole mapping table testable offline.
fn handle_server_frame(
    frame: &str,
    accumulator: &mut ResponseAccumulator,
    event_tx: &mpsc::UnboundedSender<TransportEvent>,
) {
    let event: ServerEvent = match serde_json::from_str(frame) {
        Ok(event) => event,
        Err(err) => {
            debug!(error = %err, "unparseable upstream frame");
            return;
        }
    };

    match event {
        ServerEvent::SessionCreated | ServerEvent::SessionUpdated => {
            debug!("upstream session configured");
        }
        ServerEvent::SpeechStarted => {
            let _ = event_tx.send(TransportEvent::SpeechStarted);
        }
        ServerEvent::SpeechStopped => {
            let _ = event_tx.send(TransportEvent::SpeechStopped);
        }
        ServerEvent::InputTranscriptionCompleted { transcript } => {
            let _ = event_tx.send(TransportEvent::Transcript {
                text: transcript,
                is_final: true,
            });
        }
        ServerEvent::AudioTranscriptDelta { delta } => {
            accumulator.text.push_str(&delta);
            let _ = event_tx.send(TransportEvent::Transcript {
                text: delta,
                is_final: false,
            });
        }
        ServerEvent::TextDelta { delta } => {
            accumulator.text.push_str(&delta);
        }
        ServerEvent::AudioTranscriptDone { transcript } => {
            flush_response(accumulator, &transcript, event_tx);
        }
        ServerEvent::TextDone { text } => {
            flush_response(accumulator, &text, event_tx);
        }
        ServerEvent::OutputItemDone { item } => {
            if let Some(text) = item.text() {
                let owned = text.to_string();
                flush_response(accumulator, &owned, event_tx);
            }
        }
        ServerEvent::AudioDelta { delta } => match crate::audio::codec::decode_base64(&delta) {
            Ok(bytes) => {
                let _ = event_tx.send(TransportEvent::AudioChunk { bytes });
            }
            Err(err) => {
                let _ = event_tx.send(TransportEvent::Error {
                    message: format!("malformed audio delta: {}", err),
                });
            }
        },
        ServerEvent::AudioDone => {
            let _ = event_tx.send(TransportEvent::AudioDone);
        }
        ServerEvent::ResponseDone => {
            // A cancelled turn may still deliver its terminal event with
            // partial text; flush whatever accumulated before completing.
            if !accumulator.flushed && !accumulator.text.is_empty() {
                let pending = std::mem::take(&mut accumulator.text);
                let _ = event_tx.send(TransportEvent::Response { text: pending });
            }
            *accumulator = ResponseAccumulator::default();
            let _ = event_tx.send(TransportEvent::ResponseDone);
        }
        ServerEvent::Error { error } => {
            let _ = event_tx.send(TransportEvent::Error {
                message: error.message,
            });
        }
        ServerEvent::Unknown => {
            debug!("ignoring unknown upstream event");
        }
    }
}

fn flush_response(
    accumulator: &mut ResponseAccumulator,
    done_text: &str,
    event_tx: &mpsc::UnboundedSender<TransportEvent>,
) {
    let text = if done_text.is_empty() {
        accumulator.text.clone()
    } else {
        done_text.to_string()
    };
    if !text.is_empty() {
        let _ = event_tx.send(TransportEvent::Response { text });
    }
    accumulator.flushed = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_speech_boundary_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut acc = ResponseAccumulator::default();

        handle_server_frame(r#"{"type":"input_audio_buffer.speech_started"}"#, &mut acc, &tx);
        handle_server_frame(r#"{"type":"input_audio_buffer.speech_stopped"}"#, &mut acc, &tx);

        assert_eq!(
            drain(&mut rx),
            vec![TransportEvent::SpeechStarted, TransportEvent::SpeechStopped]
        );
    }

    #[test]
    fn test_transcript_events_carry_finality() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut acc = ResponseAccumulator::default();

        handle_server_frame(
            r#"{"type":"conversation.item.input_audio_transcription.completed","transcript":"ajoute une ligne"}"#,
            &mut acc,
            &tx,
        );
        handle_server_frame(
            r#"{"type":"response.audio_transcript.delta","delta":"d'ac"}"#,
            &mut acc,
            &tx,
        );

        assert_eq!(
            drain(&mut rx),
            vec![
                TransportEvent::Transcript {
                    text: "ajoute une ligne".to_string(),
                    is_final: true
                },
                TransportEvent::Transcript {
                    text: "d'ac".to_string(),
                    is_final: false
                },
            ]
        );
    }

    #[test]
    fn test_text_done_flushes_response_before_done() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut acc = ResponseAccumulator::default();

        handle_server_frame(r#"{"type":"response.text.delta","delta":"{\"actions\""}"#, &mut acc, &tx);
        handle_server_frame(r#"{"type":"response.text.delta","delta":":[]}"}"#, &mut acc, &tx);
        handle_server_frame(r#"{"type":"response.text.done","text":"{\"actions\":[]}"}"#, &mut acc, &tx);
        handle_server_frame(r#"{"type":"response.done"}"#, &mut acc, &tx);

        assert_eq!(
            drain(&mut rx),
            vec![
                TransportEvent::Response {
                    text: "{\"actions\":[]}".to_string()
                },
                TransportEvent::ResponseDone,
            ]
        );
    }

    #[test]
    fn test_response_done_flushes_unflushed_deltas() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut acc = ResponseAccumulator::default();

        // Cancelled turn: deltas arrived but no terminal text event did.
        handle_server_frame(r#"{"type":"response.text.delta","delta":"partial"}"#, &mut acc, &tx);
        handle_server_frame(r#"{"type":"response.done"}"#, &mut acc, &tx);

        assert_eq!(
            drain(&mut rx),
            vec![
                TransportEvent::Response {
                    text: "partial".to_string()
                },
                TransportEvent::ResponseDone,
            ]
        );
    }

    #[test]
    fn test_empty_cancelled_turn_yields_only_done() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut acc = ResponseAccumulator::default();

        handle_server_frame(r#"{"type":"response.done"}"#, &mut acc, &tx);
        assert_eq!(drain(&mut rx), vec![TransportEvent::ResponseDone]);
    }

    #[test]
    fn test_audio_delta_is_decoded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut acc = ResponseAccumulator::default();
        let encoded = crate::audio::codec::encode_base64(&[1u8, 2, 3, 4]);

        handle_server_frame(
            &format!(r#"{{"type":"response.audio.delta","delta":"{}"}}"#, encoded),
            &mut acc,
            &tx,
        );
        handle_server_frame(r#"{"type":"response.audio.done"}"#, &mut acc, &tx);

        assert_eq!(
            drain(&mut rx),
            vec![
                TransportEvent::AudioChunk {
                    bytes: vec![1, 2, 3, 4]
                },
                TransportEvent::AudioDone,
            ]
        );
    }

    #[test]
    fn test_provider_error_is_surfaced() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut acc = ResponseAccumulator::default();

        handle_server_frame(
            r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad session"}}"#,
            &mut acc,
            &tx,
        );
        assert_eq!(
            drain(&mut rx),
            vec![TransportEvent::Error {
                message: "bad session".to_string()
            }]
        );
    }

    #[test]
    fn test_session_lifecycle_and_unknown_events_emit_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut acc = ResponseAccumulator::default();

        handle_server_frame(r#"{"type":"session.created","session":{}}"#, &mut acc, &tx);
        handle_server_frame(r#"{"type":"session.updated","session":{}}"#, &mut acc, &tx);
        handle_server_frame(r#"{"type":"rate_limits.updated"}"#, &mut acc, &tx);
        handle_server_frame("not json", &mut acc, &tx);

        assert!(drain(&mut rx).is_empty());
    }
}
