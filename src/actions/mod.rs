//! # Action Pipeline Module
//!
//! The structured-output contract between the voice assistant and the quote
//! editor: typed actions, the tolerant decoder that produces them from raw
//! assistant text, and the pure reducer that applies them to the document.
//!
//! ## Pipeline:
//! assistant text → [`decoder::decode`] → `Vec<Action>` →
//! [`reducer::apply_actions`] → new [`document::Quote`]

pub mod action; // Typed action vocabulary
pub mod decoder; // Tolerant assistant-output decoder
pub mod document; // Quote document model
pub mod reducer; // Pure action application
pub mod vat; // Department → VAT rate collaborator

pub use action::Action;
pub use decoder::{decode, DecodedResponse};
pub use document::{ClientInfo, Quote, QuoteLine};
pub use reducer::apply_actions;
