//! The pipeline — one explicit entry point over every stage.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Clean    (PPC, then Marketing)
//!   2. Metrics  (summary report + campaign-level report)
//!   3. Load     (ppc_campaign, marketing_campaign)
//!   4. Script   (external aggregation SQL, then the two previews)
//!
//! RULES:
//!   - Stages hand off through files only; no stage reads another's state.
//!   - A missing input file is reported and stops the remaining stages.
//!   - A missing canonical column is fatal and propagates as an error.
//!   - Database failures are reported, never retried, never rolled back.
//!   - Load and Script share one connection, dropped when `run()` returns.

use crate::{
    config::PipelineConfig,
    error::{FunnelError, FunnelResult},
    metrics::{generate_metrics, FunnelSummary},
    normalize::{clean_file, normalizer_for},
    store::{FunnelStore, LeadsPreview, LoadOutcome, RoiPreview},
    types::SourceKind,
};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus<T> {
    Completed { result: T },
    Skipped { reason: String },
}

impl<T> StageStatus<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, StageStatus::Completed { .. })
    }

    pub fn result(&self) -> Option<&T> {
        match self {
            StageStatus::Completed { result } => Some(result),
            StageStatus::Skipped { .. } => None,
        }
    }

    fn skipped(reason: impl Into<String>) -> Self {
        StageStatus::Skipped { reason: reason.into() }
    }

    fn not_run() -> Self {
        Self::skipped("not run: an earlier stage stopped the pipeline")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanReport {
    pub source: SourceKind,
    pub rows:   usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub input_rows:  Vec<usize>,
    pub output_rows: usize,
    pub summary:     FunnelSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScriptStatus {
    Executed,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptReport {
    pub status:         ScriptStatus,
    pub leads_preview:  Option<Vec<LeadsPreview>>,
    pub roi_preview:    Option<Vec<RoiPreview>>,
    pub preview_errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub clean:   StageStatus<Vec<CleanReport>>,
    pub metrics: StageStatus<MetricsReport>,
    pub load:    StageStatus<Vec<LoadOutcome>>,
    pub script:  StageStatus<ScriptReport>,
}

/// Turn a missing-file error into a skipped stage; everything else propagates.
fn skip_if_missing<T>(result: FunnelResult<T>) -> FunnelResult<StageStatus<T>> {
    match result {
        Ok(result) => Ok(StageStatus::Completed { result }),
        Err(FunnelError::MissingFile { path }) => {
            log::error!("file not found: {}", path.display());
            Ok(StageStatus::skipped(format!("file not found: {}", path.display())))
        }
        Err(e) => Err(e),
    }
}

fn require_files(paths: &[&Path]) -> FunnelResult<()> {
    match paths.iter().find(|p| !p.exists()) {
        Some(missing) => Err(FunnelError::MissingFile { path: missing.to_path_buf() }),
        None => Ok(()),
    }
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run every stage in the documented order.
    pub fn run(&self) -> FunnelResult<RunSummary> {
        let mut summary = RunSummary {
            clean:   self.clean()?,
            metrics: StageStatus::not_run(),
            load:    StageStatus::not_run(),
            script:  StageStatus::not_run(),
        };
        if !summary.clean.is_completed() {
            return Ok(summary);
        }

        summary.metrics = self.metrics()?;
        if !summary.metrics.is_completed() {
            return Ok(summary);
        }

        let store = match self.open_store() {
            Ok(store) => store,
            Err(e) => {
                log::error!("cannot open database {}: {e}", self.config.database.display());
                summary.load = StageStatus::skipped(format!("cannot open database: {e}"));
                return Ok(summary);
            }
        };

        summary.load = self.load(&store)?;
        if !summary.load.is_completed() {
            return Ok(summary);
        }

        summary.script = self.run_script(&store)?;
        Ok(summary)
    }

    pub fn open_store(&self) -> FunnelResult<FunnelStore> {
        FunnelStore::open(&self.config.database)
    }

    // ── Stage 1: clean ─────────────────────────────────────────

    pub fn clean(&self) -> FunnelResult<StageStatus<Vec<CleanReport>>> {
        let jobs = [
            (SourceKind::Ppc,       &self.config.ppc_raw,       &self.config.ppc_cleaned),
            (SourceKind::Marketing, &self.config.marketing_raw, &self.config.marketing_cleaned),
        ];
        let mut reports = Vec::with_capacity(jobs.len());
        for (kind, input, output) in jobs {
            let normalizer = normalizer_for(kind);
            match skip_if_missing(clean_file(normalizer.as_ref(), input, output))? {
                StageStatus::Completed { result: rows } => {
                    reports.push(CleanReport { source: kind, rows })
                }
                StageStatus::Skipped { reason } => return Ok(StageStatus::Skipped { reason }),
            }
        }
        Ok(StageStatus::Completed { result: reports })
    }

    // ── Stage 2: metrics ───────────────────────────────────────

    pub fn metrics(&self) -> FunnelResult<StageStatus<MetricsReport>> {
        let outcome = generate_metrics(
            &self.config.cleaned_inputs(),
            &self.config.metrics_report,
            &self.config.campaign_metrics,
        );
        skip_if_missing(outcome.map(|o| MetricsReport {
            output_rows: o.rows.len(),
            input_rows:  o.input_rows,
            summary:     o.summary,
        }))
    }

    // ── Stage 3: load ──────────────────────────────────────────

    pub fn load(&self, store: &FunnelStore) -> FunnelResult<StageStatus<Vec<LoadOutcome>>> {
        let inputs = self.config.cleaned_inputs();
        if let StageStatus::Skipped { reason } = skip_if_missing(require_files(&inputs))? {
            return Ok(StageStatus::Skipped { reason });
        }
        let sources = [
            (SourceKind::Ppc.table_name(),       inputs[0]),
            (SourceKind::Marketing.table_name(), inputs[1]),
        ];
        Ok(StageStatus::Completed { result: store.load_tables(&sources) })
    }

    // ── Stage 4: script + previews ─────────────────────────────

    pub fn run_script(&self, store: &FunnelStore) -> FunnelResult<StageStatus<ScriptReport>> {
        let path = &self.config.sql_script;
        let sql = match skip_if_missing(read_script(path))? {
            StageStatus::Completed { result } => result,
            StageStatus::Skipped { reason } => return Ok(StageStatus::Skipped { reason }),
        };

        let status = match store.execute_script(&sql) {
            Ok(()) => {
                log::info!("all statements in {} executed", path.display());
                ScriptStatus::Executed
            }
            Err(e) => {
                log::error!("script {} failed: {e}", path.display());
                ScriptStatus::Failed { error: e.to_string() }
            }
        };

        let mut report = ScriptReport {
            status,
            leads_preview:  None,
            roi_preview:    None,
            preview_errors: Vec::new(),
        };
        if self.config.run_previews {
            match store.leads_per_campaign() {
                Ok(rows) => report.leads_preview = Some(rows),
                Err(e) => report.preview_errors.push(format!("leads per campaign: {e}")),
            }
            match store.roi_per_campaign() {
                Ok(rows) => report.roi_preview = Some(rows),
                Err(e) => report.preview_errors.push(format!("ROI per campaign: {e}")),
            }
            for err in &report.preview_errors {
                log::warn!("preview failed: {err}");
            }
        }
        Ok(StageStatus::Completed { result: report })
    }
}

fn read_script(path: &Path) -> FunnelResult<String> {
    require_files(&[path])?;
    Ok(std::fs::read_to_string(path)?)
}
