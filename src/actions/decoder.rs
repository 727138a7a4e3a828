//! # Action Protocol Decoder
//!
//! Turns the assistant's raw text output into a typed action list. The
//! upstream model is instructed to emit strict JSON but does not always
//! comply; this module is the boundary that absorbs that unreliability.
//!
//! ## Accepted shapes:
//! 1. `{"actions": [...], "message": "..."}` — the instructed format
//! 2. `{"spoken": "...", "actions": [...]}` — spoken-variant format
//! 3. `{"action": "...", "client": {...}}` — single-action shape seen in
//!    practice
//! 4. Anything else — zero actions, raw text surfaced as the message
//!
//! Decoding never raises: every input yields a (possibly empty) action list
//! plus a human-readable status string.

use crate::actions::action::Action;
use serde_json::Value;

/// Result of decoding one assistant response.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedResponse {
    /// Mutations to apply, in order. Empty when nothing was recognized.
    pub actions: Vec<Action>,
    /// Spoken/status text accompanying the actions, or the raw text when
    /// the input was not recognized JSON.
    pub message: Option<String>,
    /// Whether the input parsed as one of the recognized JSON shapes.
    /// Drives the relay's choice between `intent` and `response_text`.
    pub structured: bool,
}

impl DecodedResponse {
    fn plain(text: &str) -> Self {
        Self {
            actions: Vec::new(),
            message: if text.is_empty() {
                None
            } else {
                Some(text.to_string())
            },
            structured: false,
        }
    }
}

/// Decode assistant output into actions. Total: never panics, never errors.
pub fn decode(text: &str) -> DecodedResponse {
    let stripped = strip_code_fence(text);

    let parsed: Value = match serde_json::from_str(stripped) {
        Ok(value) => value,
        Err(_) => return DecodedResponse::plain(stripped),
    };

    let Some(object) = parsed.as_object() else {
        return DecodedResponse::plain(stripped);
    };

    let message = object
        .get("message")
        .or_else(|| object.get("spoken"))
        .and_then(Value::as_str)
        .map(str::to_string);

    if let Some(actions) = object.get("actions").and_then(Value::as_array) {
        return DecodedResponse {
            actions: actions.iter().map(Action::from_value).collect(),
            message,
            structured: true,
        };
    }

    // Single-action shape: {"action": "update_client", "client": {...}}
    if let Some(kind) = object.get("action").and_then(Value::as_str) {
        let params = object
            .get("params")
            .or_else(|| object.get("client"))
            .or_else(|| object.get("line"))
            .cloned()
            .unwrap_or(parsed.clone());
        let action = Action::from_value(&serde_json::json!({
            "type": kind,
            "params": params,
        }));
        return DecodedResponse {
            actions: vec![action],
            message,
            structured: true,
        };
    }

    if message.is_some() {
        return DecodedResponse {
            actions: Vec::new(),
            message,
            structured: true,
        };
    }

    // Valid JSON but not a shape we know; hand it back as plain text.
    DecodedResponse::plain(stripped)
}

/// Strip a surrounding markdown code fence (```json ... ``` or ``` ... ```).
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", or nothing) up to the newline.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::action::{Action, SetObjectParams};
    use serde_json::json;

    #[test]
    fn test_decodes_instructed_format() {
        let decoded = decode(r#"{"message": "Ligne ajoutée", "actions": [{"type": "add_line", "params": {"designation": "Peinture"}}]}"#);
        assert!(decoded.structured);
        assert_eq!(decoded.actions.len(), 1);
        assert_eq!(decoded.message.as_deref(), Some("Ligne ajoutée"));
    }

    #[test]
    fn test_decodes_spoken_variant() {
        let decoded = decode(r#"{"spoken": "C'est fait", "actions": []}"#);
        assert!(decoded.structured);
        assert!(decoded.actions.is_empty());
        assert_eq!(decoded.message.as_deref(), Some("C'est fait"));
    }

    #[test]
    fn test_decodes_single_action_shape() {
        let decoded = decode(r#"{"action": "update_client", "client": {"nom": "Durand", "ville": "Lyon"}}"#);
        assert!(decoded.structured);
        assert_eq!(decoded.actions.len(), 1);
        match &decoded.actions[0] {
            Action::UpdateClient(patch) => {
                assert_eq!(patch.nom.as_deref(), Some("Durand"));
                assert_eq!(patch.ville.as_deref(), Some("Lyon"));
            }
            other => panic!("expected update_client, got {:?}", other),
        }
    }

    #[test]
    fn test_strips_json_code_fence() {
        let fenced = "```json\n{\"actions\":[{\"type\":\"set_object\",\"params\":{\"objet\":\"Installation\"}}]}\n```";
        let decoded = decode(fenced);
        assert_eq!(
            decoded.actions,
            vec![Action::SetObject(SetObjectParams {
                objet: Some("Installation".to_string())
            })]
        );
    }

    #[test]
    fn test_strips_bare_code_fence() {
        let fenced = "```\n{\"actions\":[]}\n```";
        assert!(decode(fenced).structured);
    }

    #[test]
    fn test_garbage_never_throws() {
        for garbage in [
            "",
            "bonjour, je n'ai pas compris",
            "{not json at all",
            "[1, 2, 3]",
            "```json\nbroken{\n```",
        ] {
            let decoded = decode(garbage);
            assert!(decoded.actions.is_empty(), "input: {:?}", garbage);
            assert!(!decoded.structured, "input: {:?}", garbage);
        }
    }

    #[test]
    fn test_garbage_surfaces_raw_text_as_message() {
        let decoded = decode("je vais ajouter une ligne");
        assert_eq!(decoded.message.as_deref(), Some("je vais ajouter une ligne"));
    }

    #[test]
    fn test_round_trip_through_serialization() {
        let actions = vec![Action::AddLine(crate::actions::action::LinePatch {
            designation: Some("Pose parquet".to_string()),
            quantite: Some(12.0),
            ..Default::default()
        })];
        let text = serde_json::to_string(&json!({ "actions": actions })).unwrap();

        let decoded = decode(&text);
        assert_eq!(decoded.actions, actions);

        let fenced = format!("```json\n{}\n```", text);
        assert_eq!(decode(&fenced).actions, actions);
    }

    #[test]
    fn test_unknown_action_types_are_kept_as_unknown() {
        let decoded = decode(r#"{"actions": [{"type": "teleport"}, {"type": "remove_discount"}]}"#);
        assert_eq!(decoded.actions, vec![Action::Unknown, Action::RemoveDiscount]);
    }
}
