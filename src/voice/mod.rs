//! # Voice Client Module
//!
//! The client-side counterpart of the relay, consolidated into one
//! platform-agnostic controller: capture wiring and transport choice vary
//! per platform, the session/state/decode pipeline does not.

pub mod capture; // Microphone capture seam + null implementation
pub mod controller; // State machine + decode→reduce pipeline

pub use capture::{AudioCapture, NullCapture};
pub use controller::{DirectTransport, VoiceController, VoiceState, VoiceTransport};
