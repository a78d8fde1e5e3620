//! Shared primitive types used across the whole pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The unified column set both sources are normalized into, in output order.
pub const CANONICAL_COLUMNS: [&str; 8] = [
    "campaign",
    "channel",
    "impressions",
    "clicks",
    "leads",
    "conversions",
    "cost",
    "revenue",
];

/// The canonical columns that hold numbers.
pub const NUMERIC_COLUMNS: [&str; 6] = [
    "impressions",
    "clicks",
    "leads",
    "conversions",
    "cost",
    "revenue",
];

/// Which export a raw file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Ppc,
    Marketing,
}

impl SourceKind {
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Ppc       => "PPC",
            SourceKind::Marketing => "Marketing",
        }
    }

    /// Table name used when the cleaned file is loaded into the store.
    pub fn table_name(self) -> &'static str {
        match self {
            SourceKind::Ppc       => "ppc_campaign",
            SourceKind::Marketing => "marketing_campaign",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the canonical schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRow {
    pub campaign:    String,
    pub channel:     String,
    pub impressions: f64,
    pub clicks:      f64,
    pub leads:       f64,
    pub conversions: f64,
    pub cost:        f64,
    pub revenue:     f64,
}

impl CanonicalRow {
    /// Cells in `CANONICAL_COLUMNS` order, rendered for CSV output.
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.campaign.clone(),
            self.channel.clone(),
            format_number(self.impressions),
            format_number(self.clicks),
            format_number(self.leads),
            format_number(self.conversions),
            format_number(self.cost),
            format_number(self.revenue),
        ]
    }
}

/// Deterministic text form of a number: integral values carry no fraction,
/// everything else uses the shortest round-trip representation.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // Also folds -0.0.
        return "0".to_string();
    }
    format!("{value}")
}

/// Round to `places` decimals, ties to even.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}
