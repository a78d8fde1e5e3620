//! funnel-runner: headless runner for the marketing funnel pipeline.
//!
//! Usage:
//!   funnel-runner [all|clean|metrics|load|sql] [--base-dir DIR] [--config FILE]
//!                 [--no-preview] [--json]

use anyhow::Result;
use funnel_core::{
    config::PipelineConfig,
    error::FunnelError,
    pipeline::{
        CleanReport, MetricsReport, Pipeline, RunSummary, ScriptReport, ScriptStatus, StageStatus,
    },
    store::LoadOutcome,
};
use std::env;

const STAGES: &[&str] = &["all", "clean", "metrics", "load", "sql"];

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let stage = args
        .get(1)
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .unwrap_or("all");
    if !STAGES.contains(&stage) {
        anyhow::bail!("unknown stage '{stage}', expected one of {STAGES:?}");
    }
    let json = args.iter().any(|a| a == "--json");
    let no_preview = args.iter().any(|a| a == "--no-preview");

    let mut config = match arg_value(&args, "--config") {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::from_data_dir(arg_value(&args, "--base-dir").unwrap_or(".")),
    };
    if no_preview {
        config.run_previews = false;
    }

    if !json {
        println!("Marketing Funnel Analytics — funnel-runner");
        println!("  stage:     {stage}");
        println!("  database:  {}", config.database.display());
        println!("  sql:       {}", config.sql_script.display());
        println!();
    }

    let pipeline = Pipeline::new(config);
    let summary = match run_stage(&pipeline, stage) {
        Ok(summary) => summary,
        // A missing canonical column cannot be recovered from.
        Err(e @ FunnelError::MissingColumn { .. }) => return Err(e.into()),
        Err(e) => {
            log::error!("{e}");
            println!("Error: {e}");
            return Ok(());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn run_stage(pipeline: &Pipeline, stage: &str) -> Result<RunSummary, FunnelError> {
    let mut summary = RunSummary {
        clean:   not_requested(),
        metrics: not_requested(),
        load:    not_requested(),
        script:  not_requested(),
    };
    match stage {
        "clean"   => summary.clean = pipeline.clean()?,
        "metrics" => summary.metrics = pipeline.metrics()?,
        "load"    => summary.load = pipeline.load(&pipeline.open_store()?)?,
        "sql"     => summary.script = pipeline.run_script(&pipeline.open_store()?)?,
        _         => summary = pipeline.run()?,
    }
    Ok(summary)
}

fn not_requested<T>() -> StageStatus<T> {
    StageStatus::Skipped { reason: "not requested".into() }
}

fn print_summary(summary: &RunSummary) {
    println!("=== CLEAN ===");
    print_stage(&summary.clean, |reports: &Vec<CleanReport>| {
        for r in reports {
            println!("  {:<10} {} rows", r.source.label(), r.rows);
        }
    });

    println!();
    println!("=== FUNNEL & ROI METRICS ===");
    print_stage(&summary.metrics, |m: &MetricsReport| {
        println!("  input rows: {:?} -> {} campaign rows", m.input_rows, m.output_rows);
        for (name, value) in m.summary.entries() {
            println!("  {name}: {value}");
        }
    });

    println!();
    println!("=== LOAD ===");
    print_stage(&summary.load, |loads: &Vec<LoadOutcome>| {
        for outcome in loads {
            match outcome {
                LoadOutcome::Loaded { table, rows } => println!("  {table}: {rows} rows"),
                LoadOutcome::Failed { table, error } => println!("  {table}: FAILED ({error})"),
            }
        }
    });

    println!();
    println!("=== SQL SCRIPT ===");
    print_stage(&summary.script, print_script);
}

fn print_stage<T>(status: &StageStatus<T>, show: impl FnOnce(&T)) {
    match status {
        StageStatus::Completed { result } => show(result),
        StageStatus::Skipped { reason } => println!("  (skipped: {reason})"),
    }
}

fn print_script(report: &ScriptReport) {
    match &report.status {
        ScriptStatus::Executed => println!("  all statements executed"),
        ScriptStatus::Failed { error } => println!("  Error: {error}"),
    }

    if let Some(rows) = &report.leads_preview {
        println!();
        println!("  Preview: Total Leads per Campaign");
        println!("  {:<30} {:>12}", "campaign_name", "total_leads");
        for r in rows {
            println!("  {:<30} {:>12}", r.campaign_name, r.total_leads);
        }
    }

    if let Some(rows) = &report.roi_preview {
        println!();
        println!("  Preview: ROI per Campaign");
        println!(
            "  {:<30} {:>14} {:>14} {:>14} {:>14}",
            "campaign_name", "total_revenue", "budget", "profit_or_loss", "ROI_percentage"
        );
        for r in rows {
            println!(
                "  {:<30} {:>14} {:>14} {:>14} {:>14}",
                r.campaign_name,
                opt(r.total_revenue),
                opt(r.budget),
                opt(r.profit_or_loss),
                opt(r.roi_percentage),
            );
        }
    }

    for err in &report.preview_errors {
        println!("  preview error: {err}");
    }
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "NULL".into())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
