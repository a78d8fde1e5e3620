//! CSV writers for the cleaned files and both metrics reports.
//!
//! Output is rendered to a string first and then written in one go, so a
//! failed render never leaves a half-written file behind.

use crate::{
    error::FunnelResult,
    metrics::{CampaignMetrics, FunnelSummary, ROW_METRIC_COLUMNS},
    types::{format_number, CanonicalRow, CANONICAL_COLUMNS},
};
use csv::Writer;
use std::path::Path;

fn finish(wtr: Writer<Vec<u8>>) -> FunnelResult<String> {
    let data = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("CSV writer error: {e}"))?;
    let text = String::from_utf8(data).map_err(|e| anyhow::anyhow!("UTF-8 conversion error: {e}"))?;
    Ok(text)
}

pub fn canonical_csv(rows: &[CanonicalRow]) -> FunnelResult<String> {
    let mut wtr = Writer::from_writer(vec![]);
    wtr.write_record(CANONICAL_COLUMNS)?;
    for row in rows {
        wtr.write_record(row.to_record())?;
    }
    finish(wtr)
}

pub fn summary_csv(summary: &FunnelSummary) -> FunnelResult<String> {
    let mut wtr = Writer::from_writer(vec![]);
    wtr.write_record(["Metric", "Value"])?;
    for (name, value) in summary.entries() {
        wtr.write_record([name.to_string(), format_number(value)])?;
    }
    finish(wtr)
}

pub fn campaign_metrics_csv(rows: &[CampaignMetrics]) -> FunnelResult<String> {
    let mut wtr = Writer::from_writer(vec![]);
    wtr.write_record(CANONICAL_COLUMNS.iter().chain(ROW_METRIC_COLUMNS.iter()))?;
    for entry in rows {
        let mut record = entry.row.to_record();
        record.extend(entry.metrics.values().into_iter().map(format_number));
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

pub fn write_canonical(path: &Path, rows: &[CanonicalRow]) -> FunnelResult<()> {
    std::fs::write(path, canonical_csv(rows)?)?;
    Ok(())
}

pub fn write_summary(path: &Path, summary: &FunnelSummary) -> FunnelResult<()> {
    std::fs::write(path, summary_csv(summary)?)?;
    Ok(())
}

pub fn write_campaign_metrics(path: &Path, rows: &[CampaignMetrics]) -> FunnelResult<()> {
    std::fs::write(path, campaign_metrics_csv(rows)?)?;
    Ok(())
}
