//! # Relay Server Module
//!
//! The client-facing half of the voice relay: the `/ws/voice` actor that
//! bridges each client to its own upstream Transport Session, the wire
//! protocol between client and relay, the shared session registry, and the
//! server-held assistant instructions.

pub mod prompt; // Server-held assistant instructions
pub mod protocol; // Client ⇄ relay wire vocabulary
pub mod registry; // Connection registry with per-session status
pub mod websocket; // Per-client bridging actor

pub use protocol::{ClientMessage, RelayMessage};
pub use registry::SessionRegistry;
pub use websocket::voice_websocket;
