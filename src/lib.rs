//! # devis-voice-relay
//!
//! Realtime voice relay for voice-driven quote building: a WebSocket bridge
//! between browser/mobile clients and the realtime speech provider, plus
//! the typed action pipeline that turns assistant output into quote
//! mutations.
//!
//! ## Crate layout:
//! - Server side: [`relay`] (client-facing actor), [`upstream`] (Transport
//!   Session to the provider), [`health`]/[`handlers`]/[`middleware`]
//! - Shared: [`audio`] (PCM codec + WAV), [`actions`] (decoder, document,
//!   reducer), [`config`], [`error`], [`state`]
//! - Client side: [`voice`] (platform-agnostic controller for embedding
//!   hosts; only capture/transport wiring varies per platform)

pub mod actions; // Action decoder, quote document, reducer
pub mod audio; // PCM codec and WAV container
pub mod config; // Configuration management
pub mod error; // Error handling types
pub mod handlers; // Runtime config endpoints
pub mod health; // Health check endpoints
pub mod middleware; // Custom middleware
pub mod relay; // Client-facing relay server
pub mod state; // Application state management
pub mod upstream; // Transport session to the speech provider
pub mod voice; // Platform-agnostic voice controller
