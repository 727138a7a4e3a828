//! # Action Vocabulary
//!
//! The typed form of the assistant's document-mutation commands. Actions are
//! produced only by the decoder and consumed only by the reducer; nothing
//! else constructs them.
//!
//! ## Wire Shape:
//! `{"type": "<action>", "params": {...}}` — the tag/params split maps to an
//! adjacently tagged enum so the reducer can pattern-match exhaustively
//! instead of probing field presence at runtime.

use crate::actions::vat::VatKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single document-mutation command from the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum Action {
    UpdateClient(ClientPatch),
    AddLine(LinePatch),
    UpdateLine(UpdateLineParams),
    DeleteLine(DeleteLineParams),
    ApplyDiscount(DiscountParams),
    RemoveDiscount,
    SetObject(SetObjectParams),
    /// Anything the decoder did not recognize; the reducer ignores it.
    Unknown,
}

/// Partial client update; only present fields are merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prenom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adresse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ville: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_postal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telephone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Partial line content, used both for new lines and for merges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantite: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unite: Option<String>,
    #[serde(rename = "prixUnitaireHT", skip_serializing_if = "Option::is_none")]
    pub prix_unitaire_ht: Option<f64>,
    #[serde(rename = "tauxTVA", skip_serializing_if = "Option::is_none")]
    pub taux_tva: Option<f64>,
    #[serde(rename = "typeTVA", skip_serializing_if = "Option::is_none")]
    pub type_tva: Option<VatKind>,
}

/// Targeted line update: either a `field`/`value` pair, direct line fields,
/// or both. `index` -1 (the default) addresses the last line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateLineParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(flatten)]
    pub patch: LinePatch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteLineParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
}

/// Discount kind; percent and amount are mutually exclusive on the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountKind {
    #[serde(rename = "percent", alias = "pourcentage")]
    Percent,
    #[serde(rename = "amount", alias = "montant")]
    Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscountParams {
    #[serde(rename = "type")]
    pub kind: Option<DiscountKind>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetObjectParams {
    #[serde(alias = "value", alias = "object", skip_serializing_if = "Option::is_none")]
    pub objet: Option<String>,
}

impl Action {
    /// Lenient construction from a raw JSON element.
    ///
    /// Missing `params` become empty params; an unrecognized `type`, a
    /// missing `type`, or params that do not fit the declared type all fold
    /// to [`Action::Unknown`] rather than failing the batch.
    pub fn from_value(value: &Value) -> Action {
        let Some(kind) = value.get("type").and_then(Value::as_str) else {
            return Action::Unknown;
        };
        let params = value
            .get("params")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));

        match kind {
            "update_client" => serde_json::from_value(params)
                .map(Action::UpdateClient)
                .unwrap_or(Action::Unknown),
            "add_line" => serde_json::from_value(params)
                .map(Action::AddLine)
                .unwrap_or(Action::Unknown),
            "update_line" => serde_json::from_value(params)
                .map(Action::UpdateLine)
                .unwrap_or(Action::Unknown),
            "delete_line" => serde_json::from_value(params)
                .map(Action::DeleteLine)
                .unwrap_or(Action::Unknown),
            "apply_discount" => serde_json::from_value(params)
                .map(Action::ApplyDiscount)
                .unwrap_or(Action::Unknown),
            "remove_discount" => Action::RemoveDiscount,
            "set_object" => serde_json::from_value(params)
                .map(Action::SetObject)
                .unwrap_or(Action::Unknown),
            _ => Action::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_parses_known_action() {
        let action = Action::from_value(&json!({
            "type": "set_object",
            "params": {"objet": "Installation"}
        }));
        assert_eq!(
            action,
            Action::SetObject(SetObjectParams {
                objet: Some("Installation".to_string())
            })
        );
    }

    #[test]
    fn test_from_value_tolerates_missing_params() {
        assert_eq!(
            Action::from_value(&json!({"type": "remove_discount"})),
            Action::RemoveDiscount
        );
        assert_eq!(
            Action::from_value(&json!({"type": "add_line"})),
            Action::AddLine(LinePatch::default())
        );
    }

    #[test]
    fn test_from_value_unknown_or_malformed_folds_to_unknown() {
        assert_eq!(
            Action::from_value(&json!({"type": "reticulate_splines"})),
            Action::Unknown
        );
        assert_eq!(Action::from_value(&json!({"no_type": true})), Action::Unknown);
        assert_eq!(Action::from_value(&json!("just a string")), Action::Unknown);
    }

    #[test]
    fn test_serialized_shape_matches_wire_contract() {
        let action = Action::UpdateLine(UpdateLineParams {
            index: Some(-1),
            field: Some("quantite".to_string()),
            value: Some(json!(3)),
            patch: LinePatch::default(),
        });
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "update_line");
        assert_eq!(json["params"]["index"], -1);
        assert_eq!(json["params"]["field"], "quantite");
    }

    #[test]
    fn test_discount_kind_accepts_french_aliases() {
        let params: DiscountParams =
            serde_json::from_value(json!({"type": "pourcentage", "value": 10})).unwrap();
        assert_eq!(params.kind, Some(DiscountKind::Percent));
    }
}
