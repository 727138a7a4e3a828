//! # VAT Rate Lookup
//!
//! Maps a French department code and a VAT category to the applicable rate.
//! The overseas departments carry their own rates, which is why new quote
//! lines derive their VAT from the client's department rather than a fixed
//! constant.

use serde::{Deserialize, Serialize};

/// VAT category attached to a quote line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VatKind {
    /// Standard rate (new construction, supplies)
    #[default]
    Normale,
    /// Intermediate rate (renovation work on housing over two years old)
    Intermediaire,
    /// Reduced rate (energy-efficiency improvement work)
    Reduite,
}

/// Resolve the VAT rate (percent) for a department code and category.
///
/// - Guadeloupe (971), Martinique (972), La Réunion (974): 8.5% standard,
///   2.1% intermediate/reduced
/// - Guyane (973), Mayotte (976): VAT not applicable, 0%
/// - Everything else (including an empty or unknown department): the
///   metropolitan rates 20 / 10 / 5.5
pub fn vat_rate_for_department(department: &str, kind: VatKind) -> f64 {
    match department.trim() {
        "971" | "972" | "974" => match kind {
            VatKind::Normale => 8.5,
            VatKind::Intermediaire | VatKind::Reduite => 2.1,
        },
        "973" | "976" => 0.0,
        _ => match kind {
            VatKind::Normale => 20.0,
            VatKind::Intermediaire => 10.0,
            VatKind::Reduite => 5.5,
        },
    }
}
