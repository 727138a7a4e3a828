//! # Upstream Transport Module
//!
//! Everything that talks to the realtime speech provider: the typed event
//! vocabulary, the session configuration payload, and the transport session
//! that owns one WebSocket per logical session.

pub mod config; // session.update payload + connect parameters
pub mod events; // typed client/server event vocabulary
pub mod session; // the transport session itself

pub use config::{SessionSettings, TurnDetection, UpstreamConfig};
pub use session::{TransportEvent, UpstreamSession};
