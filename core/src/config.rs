use crate::error::{FunnelError, FunnelResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

/// Every path the pipeline touches, supplied once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub ppc_raw:           PathBuf,
    pub marketing_raw:     PathBuf,
    pub ppc_cleaned:       PathBuf,
    pub marketing_cleaned: PathBuf,
    pub metrics_report:    PathBuf,
    pub campaign_metrics:  PathBuf,
    pub database:          PathBuf,
    pub sql_script:        PathBuf,
    /// Run the two read-only preview queries after the script.
    #[serde(default = "default_true")]
    pub run_previews:      bool,
}

impl PipelineConfig {
    /// Conventional project layout: data files under `<base>/Data`,
    /// the aggregation script under `<base>/SQL`.
    pub fn from_data_dir(base_dir: impl AsRef<Path>) -> Self {
        let base = base_dir.as_ref();
        let data = base.join("Data");
        Self {
            ppc_raw:           data.join("ppc_campaign_performance_data.csv"),
            marketing_raw:     data.join("marketing_campaign_dataset.csv"),
            ppc_cleaned:       data.join("ppc_cleaned.csv"),
            marketing_cleaned: data.join("marketing_cleaned.csv"),
            metrics_report:    data.join("metrics_report.csv"),
            campaign_metrics:  data.join("campaign_level_metrics.csv"),
            database:          data.join("campaigns.db"),
            sql_script:        base.join("SQL").join("funnel_metrics.sql"),
            run_previews:      true,
        }
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> FunnelResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FunnelError::MissingFile { path: path.to_path_buf() });
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> FunnelResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Cleaned file for each source, in load order.
    pub fn cleaned_inputs(&self) -> [&Path; 2] {
        [self.ppc_cleaned.as_path(), self.marketing_cleaned.as_path()]
    }
}
