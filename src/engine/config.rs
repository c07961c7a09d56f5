use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};

pub const DEFAULT_SUCCESS_RATE: f64 = 0.95;
pub const DEFAULT_CONCEPT_MAPPING_RATE: f64 = 0.92;
pub const DEFAULT_PROCESSING_SECONDS: f64 = 180.0;
pub const SUCCESS_RATE_TARGET: f64 = 0.90;
pub const CONCEPT_MAPPING_TARGET: f64 = 0.90;

/// Fallback values and quality targets used when measured data is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub default_success_rate: f64,
    pub default_concept_mapping_rate: f64,
    pub default_processing_seconds: f64,
    pub success_rate_target: f64,
    pub concept_mapping_target: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_success_rate: DEFAULT_SUCCESS_RATE,
            default_concept_mapping_rate: DEFAULT_CONCEPT_MAPPING_RATE,
            default_processing_seconds: DEFAULT_PROCESSING_SECONDS,
            success_rate_target: SUCCESS_RATE_TARGET,
            concept_mapping_target: CONCEPT_MAPPING_TARGET,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        let fractions = [
            ("default_success_rate", self.default_success_rate),
            ("default_concept_mapping_rate", self.default_concept_mapping_rate),
            ("success_rate_target", self.success_rate_target),
            ("concept_mapping_target", self.concept_mapping_target),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        if !self.default_processing_seconds.is_finite() || self.default_processing_seconds < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "default_processing_seconds must be a non-negative number, got {}",
                self.default_processing_seconds
            )));
        }

        Ok(())
    }
}
