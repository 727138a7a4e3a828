//! # Document Action Reducer
//!
//! Applies a decoded action list to a quote, producing a new quote. Pure:
//! no I/O, no side effects, and no failure path — assistant output is
//! inherently unreliable, so invalid indices and unknown actions degrade to
//! no-ops instead of poisoning the whole batch.

use crate::actions::action::{Action, ClientPatch, DiscountKind, LinePatch, UpdateLineParams};
use crate::actions::document::{Quote, QuoteLine};
use crate::actions::vat::{vat_rate_for_department, VatKind};
use serde_json::Value;

/// Apply a batch of actions in order, returning the resulting quote.
pub fn apply_actions(quote: &Quote, actions: &[Action]) -> Quote {
    let mut next = quote.clone();
    for action in actions {
        apply_action(&mut next, action);
    }
    next
}

fn apply_action(quote: &mut Quote, action: &Action) {
    match action {
        Action::UpdateClient(patch) => merge_client(quote, patch),
        Action::AddLine(patch) => add_line(quote, patch),
        Action::UpdateLine(params) => update_line(quote, params),
        Action::DeleteLine(params) => delete_line(quote, params.index.unwrap_or(-1)),
        Action::ApplyDiscount(params) => {
            let value = params.value.unwrap_or(0.0);
            match params.kind {
                Some(DiscountKind::Percent) => {
                    quote.remise_pourcentage = Some(value);
                    quote.remise_montant = None;
                }
                Some(DiscountKind::Amount) => {
                    quote.remise_montant = Some(value);
                    quote.remise_pourcentage = None;
                }
                None => {}
            }
        }
        Action::RemoveDiscount => {
            quote.remise_pourcentage = None;
            quote.remise_montant = None;
        }
        Action::SetObject(params) => {
            if let Some(objet) = &params.objet {
                quote.objet = objet.clone();
            }
        }
        Action::Unknown => {}
    }
}

/// Merge only the fields the patch actually carries.
fn merge_client(quote: &mut Quote, patch: &ClientPatch) {
    let client = &mut quote.client;
    if let Some(nom) = &patch.nom {
        client.nom = nom.clone();
    }
    if let Some(prenom) = &patch.prenom {
        client.prenom = prenom.clone();
    }
    if let Some(adresse) = &patch.adresse {
        client.adresse = adresse.clone();
    }
    if let Some(ville) = &patch.ville {
        client.ville = ville.clone();
    }
    if let Some(code_postal) = &patch.code_postal {
        client.code_postal = code_postal.clone();
    }
    if let Some(departement) = &patch.departement {
        client.departement = departement.clone();
    }
    if let Some(telephone) = &patch.telephone {
        client.telephone = telephone.clone();
    }
    if let Some(email) = &patch.email {
        client.email = email.clone();
    }
}

fn add_line(quote: &mut Quote, patch: &LinePatch) {
    let kind = patch.type_tva.unwrap_or(VatKind::Normale);
    let line = QuoteLine {
        designation: patch
            .designation
            .clone()
            .unwrap_or_else(|| "Prestation".to_string()),
        quantite: patch.quantite.unwrap_or(1.0),
        unite: patch.unite.clone().unwrap_or_else(|| "u".to_string()),
        prix_unitaire_ht: patch.prix_unitaire_ht.unwrap_or(0.0),
        taux_tva: patch
            .taux_tva
            .unwrap_or_else(|| vat_rate_for_department(&quote.client.departement, kind)),
        type_tva: kind,
    };
    quote.lignes.push(line);
}

fn update_line(quote: &mut Quote, params: &UpdateLineParams) {
    let Some(index) = resolve_index(params.index.unwrap_or(-1), quote.lignes.len()) else {
        // The assistant may assume more lines than the document has.
        return;
    };
    let department = quote.client.departement.clone();
    let line = &mut quote.lignes[index];

    merge_line(line, &params.patch, &department);

    if let (Some(field), Some(value)) = (&params.field, &params.value) {
        set_line_field(line, field, value, &department);
    }
}

fn merge_line(line: &mut QuoteLine, patch: &LinePatch, department: &str) {
    if let Some(designation) = &patch.designation {
        line.designation = designation.clone();
    }
    if let Some(quantite) = patch.quantite {
        line.quantite = quantite;
    }
    if let Some(unite) = &patch.unite {
        line.unite = unite.clone();
    }
    if let Some(prix) = patch.prix_unitaire_ht {
        line.prix_unitaire_ht = prix;
    }
    if let Some(kind) = patch.type_tva {
        line.type_tva = kind;
        line.taux_tva = vat_rate_for_department(department, kind);
    }
    if let Some(taux) = patch.taux_tva {
        line.taux_tva = taux;
    }
}

/// Single-field update by name. Field names arrive in whichever casing the
/// assistant chose; unknown fields are ignored.
fn set_line_field(line: &mut QuoteLine, field: &str, value: &Value, department: &str) {
    match field {
        "designation" | "description" => {
            if let Some(text) = value.as_str() {
                line.designation = text.to_string();
            }
        }
        "quantite" | "quantity" => {
            if let Some(number) = value_as_f64(value) {
                line.quantite = number;
            }
        }
        "unite" | "unit" => {
            if let Some(text) = value.as_str() {
                line.unite = text.to_string();
            }
        }
        "prixUnitaireHT" | "prix_unitaire_ht" | "prix" | "price" => {
            if let Some(number) = value_as_f64(value) {
                line.prix_unitaire_ht = number;
            }
        }
        "tauxTVA" | "taux_tva" | "tva" => {
            if let Some(number) = value_as_f64(value) {
                line.taux_tva = number;
            }
        }
        "typeTVA" | "type_tva" => {
            if let Ok(kind) = serde_json::from_value::<VatKind>(value.clone()) {
                line.type_tva = kind;
                line.taux_tva = vat_rate_for_department(department, kind);
            }
        }
        _ => {}
    }
}

fn delete_line(quote: &mut Quote, index: i64) {
    let Some(index) = resolve_index(index, quote.lignes.len()) else {
        return;
    };
    if quote.lignes.len() == 1 {
        // Never reduce to zero lines; the editor always shows one.
        quote.lignes[0] = QuoteLine::blank_for_department(&quote.client.departement);
    } else {
        quote.lignes.remove(index);
    }
}

/// Resolve the `-1` "last line" sentinel to a concrete index.
///
/// Returns `None` for anything out of range; the caller treats that as a
/// no-op.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    if index == -1 {
        Some(len - 1)
    } else if index >= 0 && (index as usize) < len {
        Some(index as usize)
    } else {
        None
    }
}

/// Parse a numeric value that may arrive as a JSON number or as text
/// (including a French decimal comma).
fn value_as_f64(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str()?.trim().replace(',', ".").parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::action::{DeleteLineParams, DiscountParams, SetObjectParams};
    use crate::actions::decoder::decode;
    use serde_json::json;

    fn quote_with_lines(count: usize) -> Quote {
        Quote {
            lignes: (0..count)
                .map(|i| QuoteLine {
                    designation: format!("Ligne {}", i),
                    ..QuoteLine::default()
                })
                .collect(),
            ..Quote::default()
        }
    }

    #[test]
    fn test_update_client_merges_only_present_fields() {
        let mut quote = Quote::default();
        quote.client.nom = "Martin".to_string();
        quote.client.ville = "Nantes".to_string();

        let next = apply_actions(
            &quote,
            &[Action::UpdateClient(ClientPatch {
                ville: Some("Rennes".to_string()),
                departement: Some("35".to_string()),
                ..Default::default()
            })],
        );

        assert_eq!(next.client.nom, "Martin");
        assert_eq!(next.client.ville, "Rennes");
        assert_eq!(next.client.departement, "35");
    }

    #[test]
    fn test_add_line_defaults_and_department_vat() {
        let mut quote = Quote::default();
        quote.client.departement = "971".to_string();

        let next = apply_actions(&quote, &[Action::AddLine(LinePatch::default())]);
        let added = next.lignes.last().unwrap();
        assert_eq!(added.designation, "Prestation");
        assert_eq!(added.quantite, 1.0);
        assert_eq!(added.unite, "u");
        assert_eq!(added.prix_unitaire_ht, 0.0);
        assert_eq!(added.taux_tva, 8.5);
    }

    #[test]
    fn test_update_line_sentinel_targets_last_line() {
        let quote = quote_with_lines(3);
        let next = apply_actions(
            &quote,
            &[Action::UpdateLine(UpdateLineParams {
                index: Some(-1),
                field: Some("quantite".to_string()),
                value: Some(json!(7)),
                ..Default::default()
            })],
        );
        assert_eq!(next.lignes[2].quantite, 7.0);
        assert_eq!(next.lignes[0].quantite, 1.0);
    }

    #[test]
    fn test_update_line_out_of_range_is_noop() {
        let quote = quote_with_lines(2);
        let next = apply_actions(
            &quote,
            &[Action::UpdateLine(UpdateLineParams {
                index: Some(5),
                field: Some("quantite".to_string()),
                value: Some(json!(9)),
                ..Default::default()
            })],
        );
        assert_eq!(next, quote);
    }

    #[test]
    fn test_delete_never_empties_lines() {
        let mut quote = quote_with_lines(2);
        quote.client.departement = "974".to_string();

        let delete_last = Action::DeleteLine(DeleteLineParams { index: Some(-1) });
        let next = apply_actions(&quote, &[delete_last.clone(), delete_last.clone(), delete_last]);

        assert_eq!(next.lignes.len(), 1);
        assert!(next.lignes[0].designation.is_empty());
        // Placeholder line picks up the client's department rate.
        assert_eq!(next.lignes[0].taux_tva, 8.5);
    }

    #[test]
    fn test_discount_exclusivity() {
        let quote = Quote::default();
        let next = apply_actions(
            &quote,
            &[Action::ApplyDiscount(DiscountParams {
                kind: Some(DiscountKind::Percent),
                value: Some(10.0),
            })],
        );
        assert_eq!(next.remise_pourcentage, Some(10.0));
        assert_eq!(next.remise_montant, None);

        let next = apply_actions(
            &next,
            &[Action::ApplyDiscount(DiscountParams {
                kind: Some(DiscountKind::Amount),
                value: Some(50.0),
            })],
        );
        assert_eq!(next.remise_pourcentage, None);
        assert_eq!(next.remise_montant, Some(50.0));

        let next = apply_actions(&next, &[Action::RemoveDiscount]);
        assert_eq!(next.remise_pourcentage, None);
        assert_eq!(next.remise_montant, None);
    }

    #[test]
    fn test_set_object_overwrites_title() {
        let next = apply_actions(
            &Quote::default(),
            &[Action::SetObject(SetObjectParams {
                objet: Some("Rénovation salle de bain".to_string()),
            })],
        );
        assert_eq!(next.objet, "Rénovation salle de bain");
    }

    #[test]
    fn test_unknown_action_is_ignored() {
        let quote = quote_with_lines(2);
        assert_eq!(apply_actions(&quote, &[Action::Unknown]), quote);
    }

    #[test]
    fn test_value_as_f64_accepts_french_decimal_comma() {
        assert_eq!(value_as_f64(&json!("12,5")), Some(12.5));
        assert_eq!(value_as_f64(&json!(3)), Some(3.0));
        assert_eq!(value_as_f64(&json!("douze")), None);
    }

    // End-to-end: fenced assistant output through decoder and reducer.
    #[test]
    fn test_fenced_set_object_end_to_end() {
        let text = "```json\n{\"actions\":[{\"type\":\"set_object\",\"params\":{\"objet\":\"Installation\"}}]}\n```";
        let decoded = decode(text);
        assert_eq!(decoded.actions.len(), 1);
        let next = apply_actions(&Quote::default(), &decoded.actions);
        assert_eq!(next.objet, "Installation");
    }

    // End-to-end: sentinel update on a single-line document.
    #[test]
    fn test_sentinel_update_end_to_end() {
        let mut quote = Quote::default();
        quote.lignes[0] = QuoteLine {
            designation: "X".to_string(),
            quantite: 1.0,
            prix_unitaire_ht: 100.0,
            ..QuoteLine::default()
        };

        let decoded = decode(
            r#"{"actions":[{"type":"update_line","params":{"index":-1,"field":"quantite","value":3}}]}"#,
        );
        let next = apply_actions(&quote, &decoded.actions);

        assert_eq!(next.lignes[0].quantite, 3.0);
        assert_eq!(next.lignes[0].designation, "X");
        assert_eq!(next.lignes[0].prix_unitaire_ht, 100.0);
    }
}
