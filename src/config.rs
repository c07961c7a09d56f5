use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::{CorrespondenceTable, EngineConfig};
use crate::util::read_json;

/// Optional JSON configuration file. Every section falls back to the
/// built-in Synthea to OMOP defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    pub engine: EngineConfig,
    pub correspondences: Option<CorrespondenceTable>,
}

/// Command-line overrides applied on top of the file values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineOverrides {
    pub default_success_rate: Option<f64>,
    pub default_concept_mapping_rate: Option<f64>,
    pub default_processing_seconds: Option<f64>,
}

impl ReconConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let config: Self = read_json(path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        info!(
            path = %path.display(),
            custom_correspondences = config.correspondences.is_some(),
            "loaded reconciliation config"
        );
        Ok(config)
    }

    pub fn with_overrides(mut self, overrides: EngineOverrides) -> Self {
        if let Some(rate) = overrides.default_success_rate {
            self.engine.default_success_rate = rate;
        }
        if let Some(rate) = overrides.default_concept_mapping_rate {
            self.engine.default_concept_mapping_rate = rate;
        }
        if let Some(seconds) = overrides.default_processing_seconds {
            self.engine.default_processing_seconds = seconds;
        }
        self
    }

    pub fn table(&self) -> CorrespondenceTable {
        self.correspondences.clone().unwrap_or_default()
    }
}
