//! Pipeline configuration tests.

use funnel_core::config::PipelineConfig;
use std::path::Path;

#[test]
fn data_dir_layout() {
    let config = PipelineConfig::from_data_dir("/srv/funnel");
    assert_eq!(config.ppc_cleaned, Path::new("/srv/funnel/Data/ppc_cleaned.csv"));
    assert_eq!(config.database, Path::new("/srv/funnel/Data/campaigns.db"));
    assert_eq!(config.sql_script, Path::new("/srv/funnel/SQL/funnel_metrics.sql"));
    assert!(config.run_previews);
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("funnel.json");
    let mut config = PipelineConfig::from_data_dir(dir.path());
    config.run_previews = false;

    config.save(&path).unwrap();
    assert_eq!(PipelineConfig::load(&path).unwrap(), config);
}

/// Older config files without the preview switch keep previews on.
#[test]
fn run_previews_defaults_to_true() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("funnel.json");
    std::fs::write(
        &path,
        r#"{
            "ppc_raw": "a.csv", "marketing_raw": "b.csv",
            "ppc_cleaned": "c.csv", "marketing_cleaned": "d.csv",
            "metrics_report": "e.csv", "campaign_metrics": "f.csv",
            "database": "g.db", "sql_script": "h.sql"
        }"#,
    )
    .unwrap();

    assert!(PipelineConfig::load(&path).unwrap().run_previews);
}

#[test]
fn missing_config_file_is_reported() {
    let err = PipelineConfig::load("/definitely/not/here.json").unwrap_err();
    assert!(err.is_missing_file());
}
