//! Schema normalizers: map a raw export onto the canonical schema.
//!
//! STEP ORDER (fixed, shared by every source):
//!   1. Normalize header names
//!   2. Drop fully empty rows, fill the remaining gaps with 0
//!   3. Parse `date` if present
//!   4. Apply the source rename table
//!   5. Derive `leads` from `clicks` and default `revenue`
//!   6. Source-specific derivations
//!   7. Select the canonical columns
//!
//! Leads are copied from clicks because neither export tracks them
//! separately. Keep it that way until a source carries a real leads field.

use crate::{
    error::FunnelResult,
    report,
    table::RawTable,
    types::{format_number, round_to, CanonicalRow, SourceKind, CANONICAL_COLUMNS},
};
use std::path::Path;

/// The contract every source-specific normalizer fulfills.
pub trait SchemaNormalizer {
    fn kind(&self) -> SourceKind;

    /// `(raw name, canonical name)` pairs, applied after header normalization.
    fn renames(&self) -> &'static [(&'static str, &'static str)];

    /// Extra columns computed after `leads` exists.
    fn derive(&self, _table: &mut RawTable) -> FunnelResult<()> {
        Ok(())
    }

    fn normalize(&self, mut table: RawTable) -> FunnelResult<Vec<CanonicalRow>> {
        table.normalize_headers();
        table.drop_empty_rows();
        table.fill_missing("0");

        if table.has_column("date") {
            table.parse_dates("date");
        }

        table.rename(self.renames());

        let leads = table.column_or("clicks", "0");
        table.set_column("leads", leads);
        let revenue = table.column_or("revenue", "0");
        table.set_column("revenue", revenue);

        self.derive(&mut table)?;

        let selected = table.select(&CANONICAL_COLUMNS)?;
        Ok(to_canonical_rows(&selected))
    }
}

pub struct PpcNormalizer;

impl SchemaNormalizer for PpcNormalizer {
    fn kind(&self) -> SourceKind {
        SourceKind::Ppc
    }

    fn renames(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("campaign_id", "campaign"),
            ("platform",    "channel"),
            ("spend",       "cost"),
        ]
    }
}

pub struct MarketingNormalizer;

impl SchemaNormalizer for MarketingNormalizer {
    fn kind(&self) -> SourceKind {
        SourceKind::Marketing
    }

    fn renames(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("company",          "campaign"),
            ("channel_used",     "channel"),
            ("acquisition_cost", "cost"),
            ("roi",              "revenue"),
        ]
    }

    /// conversions = round(conversion_rate × leads)
    fn derive(&self, table: &mut RawTable) -> FunnelResult<()> {
        let (Some(rates), Some(leads)) = (table.numbers("conversion_rate"), table.numbers("leads"))
        else {
            log::warn!("{}: no conversion_rate column, conversions not derived", table.source);
            return Ok(());
        };
        let conversions = rates
            .iter()
            .zip(&leads)
            .map(|(rate, leads)| Some(format_number(round_to(rate * leads, 0))))
            .collect();
        table.set_column("conversions", conversions);
        Ok(())
    }
}

pub fn normalizer_for(kind: SourceKind) -> Box<dyn SchemaNormalizer> {
    match kind {
        SourceKind::Ppc       => Box::new(PpcNormalizer),
        SourceKind::Marketing => Box::new(MarketingNormalizer),
    }
}

/// Read `input`, normalize it, and write the cleaned file to `output`.
/// Returns the number of rows written.
pub fn clean_file(
    normalizer: &dyn SchemaNormalizer,
    input: &Path,
    output: &Path,
) -> FunnelResult<usize> {
    let table = RawTable::read_path(input)?;
    let raw_rows = table.len();
    let rows = normalizer.normalize(table)?;
    report::write_canonical(output, &rows)?;
    log::info!(
        "{} cleaned: {} -> {} ({} of {raw_rows} rows kept)",
        normalizer.kind(),
        input.display(),
        output.display(),
        rows.len(),
    );
    Ok(rows.len())
}

/// Typed rows from a table already projected onto `CANONICAL_COLUMNS`.
pub(crate) fn to_canonical_rows(table: &RawTable) -> Vec<CanonicalRow> {
    (0..table.len())
        .map(|i| CanonicalRow {
            campaign:    table.text(i, "campaign"),
            channel:     table.text(i, "channel"),
            impressions: table.number(i, "impressions"),
            clicks:      table.number(i, "clicks"),
            leads:       table.number(i, "leads"),
            conversions: table.number(i, "conversions"),
            cost:        table.number(i, "cost"),
            revenue:     table.number(i, "revenue"),
        })
        .collect()
}
