//! # Voice Controller
//!
//! Platform-agnostic client counterpart of the relay: owns the transport,
//! the capture seam and the decode→reduce pipeline, and exposes the
//! connection/listening/speaking/processing state the UI binds to. The
//! browser hook and the mobile client differ only in the capture and
//! transport implementations they wire in.
//!
//! ## State machine:
//! - `start_listening` connects first if needed (connect is awaited, not
//!   assumed after a delay), then acquires the microphone
//! - upstream speech boundaries drive `is_speaking`; a speech stop enters
//!   `is_processing` until the response is fully decoded
//! - `stop_listening` releases the microphone and commits the audio buffer
//! - errors are recorded in the state but never force a disconnect; the
//!   caller decides whether to retry

use crate::actions::{self, Action, Quote};
use crate::audio::codec;
use crate::audio::SAMPLE_RATE;
use crate::error::AppError;
use crate::upstream::session::TransportEvent;
use crate::upstream::{UpstreamConfig, UpstreamSession};
use crate::voice::capture::AudioCapture;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

/// Transport seam: the controller drives either a direct upstream session
/// or a connection through the relay with the same calls.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Open the connection and return its event stream. Resolves only once
    /// the session is actually usable.
    async fn connect(&self) -> Result<mpsc::UnboundedReceiver<TransportEvent>, AppError>;

    /// Forward a base64 PCM16 chunk. No-op while not connected.
    fn append_audio(&self, audio_b64: String);

    fn commit_audio(&self);

    fn send_text(&self, text: String);

    fn cancel_response(&self);

    /// Close the connection. Idempotent.
    fn close(&self);
}

/// Transport implementation talking straight to the speech provider, as
/// the mobile client does.
pub struct DirectTransport {
    config: UpstreamConfig,
    session: Mutex<Option<UpstreamSession>>,
}

impl DirectTransport {
    pub fn new(config: UpstreamConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }
}

#[async_trait]
impl VoiceTransport for DirectTransport {
    async fn connect(&self) -> Result<mpsc::UnboundedReceiver<TransportEvent>, AppError> {
        let (session, events) = UpstreamSession::connect(self.config.clone()).await?;
        *self.session.lock().unwrap() = Some(session);
        Ok(events)
    }

    fn append_audio(&self, audio_b64: String) {
        if let Some(session) = &*self.session.lock().unwrap() {
            session.append_audio(audio_b64);
        }
    }

    fn commit_audio(&self) {
        if let Some(session) = &*self.session.lock().unwrap() {
            session.commit_audio();
        }
    }

    fn send_text(&self, text: String) {
        if let Some(session) = &*self.session.lock().unwrap() {
            session.send_text(text);
        }
    }

    fn cancel_response(&self) {
        if let Some(session) = &*self.session.lock().unwrap() {
            session.cancel_response();
        }
    }

    fn close(&self) {
        if let Some(session) = self.session.lock().unwrap().take() {
            session.close();
        }
    }
}

/// Observable state of the voice session, bound by the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceState {
    pub is_connected: bool,
    pub is_connecting: bool,
    pub is_listening: bool,
    pub is_speaking: bool,
    pub is_processing: bool,
    /// Last final transcription of the user's speech
    pub transcript: String,
    /// Last assistant response summary (the `message` field, or raw text)
    pub response: String,
    pub error: Option<String>,
}

/// The voice session controller.
pub struct VoiceController {
    state: VoiceState,
    quote: Quote,
    actions: Vec<Action>,
    transport: Arc<dyn VoiceTransport>,
    capture: Box<dyn AudioCapture>,
    events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    capture_task: Option<tokio::task::JoinHandle<()>>,
    /// PCM16 bytes of the spoken response accumulated for playback
    audio_buffer: Vec<u8>,
}

impl VoiceController {
    pub fn new(transport: Arc<dyn VoiceTransport>, capture: Box<dyn AudioCapture>) -> Self {
        Self {
            state: VoiceState::default(),
            quote: Quote::default(),
            actions: Vec::new(),
            transport,
            capture,
            events: None,
            capture_task: None,
            audio_buffer: Vec::new(),
        }
    }

    pub fn state(&self) -> &VoiceState {
        &self.state
    }

    /// The quote as built up by the applied actions so far.
    pub fn quote(&self) -> &Quote {
        &self.quote
    }

    /// Every action applied this session, in order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Connect the transport. Resolves when the session is usable; no
    /// fixed "assume ready" delay is involved.
    pub async fn connect(&mut self) -> Result<(), AppError> {
        if self.state.is_connected || self.state.is_connecting {
            return Ok(());
        }
        self.state.is_connecting = true;

        match self.transport.connect().await {
            Ok(events) => {
                self.events = Some(events);
                self.state.is_connecting = false;
                self.state.is_connected = true;
                Ok(())
            }
            Err(err) => {
                self.state.is_connecting = false;
                self.state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Begin streaming microphone audio upstream, connecting first when
    /// needed. Idempotent while already listening.
    pub async fn start_listening(&mut self) -> Result<(), AppError> {
        if self.state.is_listening {
            return Ok(());
        }
        self.connect().await?;

        let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<Vec<f32>>();
        if let Err(err) = self.capture.start(SAMPLE_RATE, frames_tx).await {
            // Listening simply does not start; the session stays usable.
            self.state.error = Some(err.to_string());
            return Err(err);
        }

        let transport = Arc::clone(&self.transport);
        self.capture_task = Some(tokio::spawn(async move {
            while let Some(frame) = frames_rx.recv().await {
                let pcm = codec::float_to_pcm16(&frame);
                let encoded = codec::encode_base64(&codec::pcm16_to_bytes(&pcm));
                transport.append_audio(encoded);
            }
        }));

        self.state.is_listening = true;
        Ok(())
    }

    /// Stop capturing and commit the pending audio so the provider
    /// processes whatever was said.
    pub fn stop_listening(&mut self) {
        if !self.state.is_listening {
            return;
        }
        self.capture.stop();
        if let Some(task) = self.capture_task.take() {
            task.abort();
        }
        self.transport.commit_audio();
        self.state.is_listening = false;
    }

    /// Inject a typed request instead of speech.
    pub fn send_text(&self, text: &str) {
        self.transport.send_text(text.to_string());
    }

    /// Best-effort cancellation of the in-flight response.
    pub fn cancel(&self) {
        self.transport.cancel_response();
    }

    /// Tear down capture and transport from any state. Idempotent.
    pub fn disconnect(&mut self) {
        self.capture.stop();
        if let Some(task) = self.capture_task.take() {
            task.abort();
        }
        self.transport.close();
        self.events = None;
        self.state.is_connected = false;
        self.state.is_connecting = false;
        self.state.is_listening = false;
        self.state.is_speaking = false;
        self.state.is_processing = false;
    }

    /// Reset the observable state and the document to their defaults.
    pub fn reset(&mut self) {
        self.state = VoiceState::default();
        self.quote = Quote::default();
        self.actions.clear();
        self.audio_buffer.clear();
    }

    /// Await and apply the next transport event. Returns `None` when the
    /// stream has ended or the controller is not connected.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        let event = self.events.as_mut()?.recv().await?;
        self.handle_event(event.clone());
        Some(event)
    }

    /// Take the spoken response accumulated so far as a playable WAV file.
    pub fn take_response_audio(&mut self) -> Option<Vec<u8>> {
        if self.audio_buffer.is_empty() {
            return None;
        }
        let pcm = codec::bytes_to_pcm16(&std::mem::take(&mut self.audio_buffer));
        Some(crate::audio::wav::build_wav(&pcm, SAMPLE_RATE))
    }

    /// Apply one transport event to the state machine and, for responses,
    /// run the decode→reduce pipeline.
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                self.state.is_connected = true;
                self.state.is_connecting = false;
            }
            TransportEvent::Disconnected { reason } => {
                self.state.is_connected = false;
                if let Some(reason) = reason {
                    self.state.error = Some(reason);
                }
            }
            TransportEvent::SpeechStarted => {
                self.state.is_speaking = true;
            }
            TransportEvent::SpeechStopped => {
                self.state.is_speaking = false;
                self.state.is_processing = true;
            }
            TransportEvent::Transcript { text, is_final } => {
                if is_final {
                    self.state.transcript = text;
                }
            }
            TransportEvent::Response { text } => {
                let decoded = actions::decode(&text);
                debug!(count = decoded.actions.len(), "applying decoded actions");
                self.quote = actions::apply_actions(&self.quote, &decoded.actions);
                self.actions.extend(decoded.actions);
                self.state.response = decoded.message.unwrap_or(text);
            }
            TransportEvent::AudioChunk { bytes } => {
                self.audio_buffer.extend_from_slice(&bytes);
            }
            TransportEvent::AudioDone => {}
            TransportEvent::ResponseDone => {
                self.state.is_processing = false;
            }
            TransportEvent::Error { message } => {
                // Recorded, not fatal: the caller decides whether to retry.
                self.state.error = Some(message);
            }
        }
    }
}
