//! Funnel metrics over the union of every cleaned source.
//!
//! Every ratio is defined as 0 when its denominator is 0 or when the
//! division is not finite. Negative inputs pass through unchanged.

use crate::{
    error::{FunnelError, FunnelResult},
    normalize::to_canonical_rows,
    report,
    table::RawTable,
    types::{round_to, CanonicalRow, CANONICAL_COLUMNS},
};
use serde::Serialize;
use std::path::Path;

/// `numerator / denominator`, or 0 when that is not a finite number.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    finite_or_zero(numerator / denominator)
}

/// Scaling and rounding can still overflow a finite ratio.
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn percent(numerator: f64, denominator: f64) -> f64 {
    finite_or_zero(round_to(safe_ratio(numerator, denominator) * 100.0, 2))
}

fn per_unit(numerator: f64, denominator: f64) -> f64 {
    finite_or_zero(round_to(safe_ratio(numerator, denominator), 2))
}

fn roi_percent(revenue: f64, cost: f64) -> f64 {
    percent(revenue - cost, cost)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub impressions: f64,
    pub clicks:      f64,
    pub leads:       f64,
    pub conversions: f64,
    pub cost:        f64,
    pub revenue:     f64,
}

impl Totals {
    pub fn from_rows(rows: &[CanonicalRow]) -> Self {
        rows.iter().fold(Totals::default(), |acc, r| Totals {
            impressions: acc.impressions + r.impressions,
            clicks:      acc.clicks + r.clicks,
            leads:       acc.leads + r.leads,
            conversions: acc.conversions + r.conversions,
            cost:        acc.cost + r.cost,
            revenue:     acc.revenue + r.revenue,
        })
    }
}

/// The overall report: six totals and seven funnel ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FunnelSummary {
    pub total_impressions:       f64,
    pub total_clicks:            f64,
    pub total_leads:             f64,
    pub total_conversions:       f64,
    pub total_cost:              f64,
    pub total_revenue:           f64,
    pub ctr_pct:                 f64,
    pub lead_conversion_pct:     f64,
    pub final_conversion_pct:    f64,
    pub cost_per_click:          f64,
    pub cost_per_lead:           f64,
    pub cost_per_acquisition:    f64,
    pub roi_pct:                 f64,
}

impl FunnelSummary {
    pub fn from_totals(t: &Totals) -> Self {
        Self {
            total_impressions:    t.impressions,
            total_clicks:         t.clicks,
            total_leads:          t.leads,
            total_conversions:    t.conversions,
            total_cost:           round_to(t.cost, 2),
            total_revenue:        round_to(t.revenue, 2),
            ctr_pct:              percent(t.clicks, t.impressions),
            lead_conversion_pct:  percent(t.leads, t.clicks),
            final_conversion_pct: percent(t.conversions, t.leads),
            cost_per_click:       per_unit(t.cost, t.clicks),
            cost_per_lead:        per_unit(t.cost, t.leads),
            cost_per_acquisition: per_unit(t.cost, t.conversions),
            roi_pct:              roi_percent(t.revenue, t.cost),
        }
    }

    /// Named metrics in report order.
    pub fn entries(&self) -> [(&'static str, f64); 13] {
        [
            ("Total Impressions",                          self.total_impressions),
            ("Total Clicks",                               self.total_clicks),
            ("Total Leads",                                self.total_leads),
            ("Total Conversions",                          self.total_conversions),
            ("Total Cost",                                 self.total_cost),
            ("Total Revenue",                              self.total_revenue),
            ("Click-Through Rate (CTR)%",                  self.ctr_pct),
            ("Lead Conversion Rate (Leads/Clicks)%",       self.lead_conversion_pct),
            ("Final Conversion Rate (Conversions/Leads)%", self.final_conversion_pct),
            ("Cost Per Click (CPC)",                       self.cost_per_click),
            ("Cost Per Lead (CPL)",                        self.cost_per_lead),
            ("Cost Per Acquisition (CPA)",                 self.cost_per_acquisition),
            ("Return on Investment (ROI)%",                self.roi_pct),
        ]
    }
}

/// Column names of the per-row derived metrics, in output order.
pub const ROW_METRIC_COLUMNS: [&str; 5] =
    ["CTR (%)", "Lead Rate (%)", "Conversion Rate (%)", "CPA", "ROI (%)"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RowMetrics {
    pub ctr_pct:             f64,
    pub lead_rate_pct:       f64,
    pub conversion_rate_pct: f64,
    pub cpa:                 f64,
    pub roi_pct:             f64,
}

impl RowMetrics {
    pub fn for_row(r: &CanonicalRow) -> Self {
        Self {
            ctr_pct:             percent(r.clicks, r.impressions),
            lead_rate_pct:       percent(r.leads, r.clicks),
            conversion_rate_pct: percent(r.conversions, r.leads),
            cpa:                 per_unit(r.cost, r.conversions),
            roi_pct:             roi_percent(r.revenue, r.cost),
        }
    }

    pub fn values(&self) -> [f64; 5] {
        [self.ctr_pct, self.lead_rate_pct, self.conversion_rate_pct, self.cpa, self.roi_pct]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignMetrics {
    pub row:     CanonicalRow,
    pub metrics: RowMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsOutcome {
    /// Row count of each input, in input order.
    pub input_rows: Vec<usize>,
    pub summary:    FunnelSummary,
    pub rows:       Vec<CampaignMetrics>,
}

/// Read a cleaned canonical file. Missing cells become 0, numbers are coerced.
pub fn read_canonical(path: &Path) -> FunnelResult<Vec<CanonicalRow>> {
    let mut table = RawTable::read_path(path)?;
    table.fill_missing("0");
    let selected = table.select(&CANONICAL_COLUMNS)?;
    Ok(to_canonical_rows(&selected))
}

/// Concatenate tables in the order given, keeping row order within each.
pub fn union(tables: Vec<Vec<CanonicalRow>>) -> Vec<CanonicalRow> {
    tables.into_iter().flatten().collect()
}

pub fn campaign_metrics(rows: Vec<CanonicalRow>) -> Vec<CampaignMetrics> {
    rows.into_iter()
        .map(|row| {
            let metrics = RowMetrics::for_row(&row);
            CampaignMetrics { row, metrics }
        })
        .collect()
}

/// Union every input, write the summary report and the per-row report.
///
/// All inputs are checked before anything is read, so a missing file
/// leaves both outputs untouched.
pub fn generate_metrics(
    inputs: &[&Path],
    report_path: &Path,
    campaign_path: &Path,
) -> FunnelResult<MetricsOutcome> {
    if let Some(missing) = inputs.iter().find(|p| !p.exists()) {
        return Err(FunnelError::MissingFile { path: missing.to_path_buf() });
    }

    let tables = inputs
        .iter()
        .map(|p| read_canonical(p))
        .collect::<FunnelResult<Vec<_>>>()?;
    let input_rows: Vec<usize> = tables.iter().map(Vec::len).collect();
    log::info!("loaded cleaned inputs with row counts {input_rows:?}");

    let rows = union(tables);
    let summary = FunnelSummary::from_totals(&Totals::from_rows(&rows));
    report::write_summary(report_path, &summary)?;
    log::info!("overall metrics saved to {}", report_path.display());

    let rows = campaign_metrics(rows);
    report::write_campaign_metrics(campaign_path, &rows)?;
    log::info!("campaign-level metrics saved to {}", campaign_path.display());

    Ok(MetricsOutcome { input_rows, summary, rows })
}
