//! # Quote Document Model
//!
//! The in-memory quote being built during a voice session. Field names on
//! the wire match the form fields of the quote editor (French), so a reduced
//! document can be handed straight to the UI layer.
//!
//! ## Invariant:
//! A quote always carries at least one line. Deleting the last remaining
//! line replaces it with a blank placeholder instead of emptying the list.

use crate::actions::vat::{vat_rate_for_department, VatKind};
use serde::{Deserialize, Serialize};

/// Client sub-record of a quote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientInfo {
    pub nom: String,
    pub prenom: String,
    pub adresse: String,
    pub ville: String,
    pub code_postal: String,
    pub departement: String,
    pub telephone: String,
    pub email: String,
}

/// One line of the quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuoteLine {
    pub designation: String,
    pub quantite: f64,
    pub unite: String,
    #[serde(rename = "prixUnitaireHT")]
    pub prix_unitaire_ht: f64,
    #[serde(rename = "tauxTVA")]
    pub taux_tva: f64,
    #[serde(rename = "typeTVA")]
    pub type_tva: VatKind,
}

impl Default for QuoteLine {
    fn default() -> Self {
        Self {
            designation: String::new(),
            quantite: 1.0,
            unite: "u".to_string(),
            prix_unitaire_ht: 0.0,
            taux_tva: 20.0,
            type_tva: VatKind::Normale,
        }
    }
}

impl QuoteLine {
    /// Blank placeholder line with VAT derived from the client's department.
    pub fn blank_for_department(department: &str) -> Self {
        Self {
            taux_tva: vat_rate_for_department(department, VatKind::Normale),
            ..Self::default()
        }
    }

    /// Line subtotal excluding VAT.
    pub fn total_ht(&self) -> f64 {
        self.quantite * self.prix_unitaire_ht
    }
}

/// The quote document driven by the voice assistant's actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Quote {
    pub client: ClientInfo,
    pub lignes: Vec<QuoteLine>,
    pub remise_pourcentage: Option<f64>,
    pub remise_montant: Option<f64>,
    pub objet: String,
}

impl Default for Quote {
    fn default() -> Self {
        Self {
            client: ClientInfo::default(),
            lignes: vec![QuoteLine::default()],
            remise_pourcentage: None,
            remise_montant: None,
            objet: String::new(),
        }
    }
}

impl Quote {
    /// Sum of line subtotals before discount and VAT.
    pub fn total_ht(&self) -> f64 {
        self.lignes.iter().map(QuoteLine::total_ht).sum()
    }

    /// Total excluding VAT after the discount (percent or absolute) is
    /// applied. The two discount fields are mutually exclusive by
    /// construction; if both were somehow present the percent wins.
    pub fn total_ht_after_discount(&self) -> f64 {
        let base = self.total_ht();
        if let Some(percent) = self.remise_pourcentage {
            (base - base * percent / 100.0).max(0.0)
        } else if let Some(amount) = self.remise_montant {
            (base - amount).max(0.0)
        } else {
            base
        }
    }

    /// VAT amount over the discounted base, prorated per line rate.
    pub fn total_tva(&self) -> f64 {
        let base = self.total_ht();
        if base == 0.0 {
            return 0.0;
        }
        let discount_factor = self.total_ht_after_discount() / base;
        self.lignes
            .iter()
            .map(|line| line.total_ht() * discount_factor * line.taux_tva / 100.0)
            .sum()
    }

    /// Grand total including VAT.
    pub fn total_ttc(&self) -> f64 {
        self.total_ht_after_discount() + self.total_tva()
    }
}
