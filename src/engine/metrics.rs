use serde::Serialize;
use tracing::debug;

use super::config::EngineConfig;
use super::correspondence::CorrespondenceTable;
use super::run_report::RunReport;
use super::snapshot::EntityCountSnapshot;

/// Where the success rate came from, in decreasing order of confidence.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessRateTier {
    /// Recorded by the pipeline run itself.
    Measured,
    /// Anchor target count over anchor source count.
    Derived,
    /// Configured fallback.
    Default,
}

impl SuccessRateTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Measured => "measured",
            Self::Derived => "derived",
            Self::Default => "default",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    Reported,
    Default,
}

impl MetricSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reported => "reported",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedMetrics {
    pub success_rate: f64,
    pub success_rate_tier: SuccessRateTier,
    pub concept_mapping_rate: f64,
    pub concept_mapping_source: MetricSource,
    pub processing_seconds: f64,
    pub processing_source: MetricSource,
    pub target_connected: bool,
}

pub fn aggregate(
    snapshot: &EntityCountSnapshot,
    report: Option<&RunReport>,
    table: &CorrespondenceTable,
    config: &EngineConfig,
) -> AggregatedMetrics {
    let (success_rate, success_rate_tier) = success_rate(snapshot, report, table, config);
    let (concept_mapping_rate, concept_mapping_source) = concept_mapping_rate(report, config);
    let (processing_seconds, processing_source) = processing_seconds(report, config);
    let target_connected = target_connected(snapshot, table);

    debug!(
        success_rate,
        tier = success_rate_tier.as_str(),
        concept_mapping_rate,
        concept_source = concept_mapping_source.as_str(),
        processing_seconds,
        processing_source = processing_source.as_str(),
        target_connected,
        "aggregated migration metrics"
    );

    AggregatedMetrics {
        success_rate,
        success_rate_tier,
        concept_mapping_rate,
        concept_mapping_source,
        processing_seconds,
        processing_source,
        target_connected,
    }
}

pub fn success_rate(
    snapshot: &EntityCountSnapshot,
    report: Option<&RunReport>,
    table: &CorrespondenceTable,
    config: &EngineConfig,
) -> (f64, SuccessRateTier) {
    if let Some(rate) = report.and_then(|report| report.overall_success_rate) {
        return (rate, SuccessRateTier::Measured);
    }

    let (anchor_source, anchor_target) = anchor_counts(snapshot, table);
    match capped_ratio(anchor_target, anchor_source) {
        Some(rate) => (rate, SuccessRateTier::Derived),
        None => (config.default_success_rate, SuccessRateTier::Default),
    }
}

/// Unweighted mean over the coverage entries that carry a usable `mapped_rate`.
pub fn concept_mapping_rate(report: Option<&RunReport>, config: &EngineConfig) -> (f64, MetricSource) {
    let rates = report.map(RunReport::mapped_rates).unwrap_or_default();
    if rates.is_empty() {
        return (config.default_concept_mapping_rate, MetricSource::Default);
    }

    let mean = rates.iter().sum::<f64>() / rates.len() as f64;
    (mean, MetricSource::Reported)
}

pub fn processing_seconds(report: Option<&RunReport>, config: &EngineConfig) -> (f64, MetricSource) {
    match report.and_then(RunReport::total_phase_seconds) {
        Some(total) if total.is_finite() && total > 0.0 => (total, MetricSource::Reported),
        _ => (config.default_processing_seconds, MetricSource::Default),
    }
}

pub fn target_connected(snapshot: &EntityCountSnapshot, table: &CorrespondenceTable) -> bool {
    table
        .target_entities()
        .into_iter()
        .any(|entity| snapshot.target_count(entity) > 0)
}

pub fn anchor_counts(snapshot: &EntityCountSnapshot, table: &CorrespondenceTable) -> (u64, u64) {
    table
        .anchor()
        .map(|anchor| {
            (
                snapshot.source_sum(&anchor.sources),
                snapshot.target_sum(&anchor.targets),
            )
        })
        .unwrap_or((0, 0))
}

fn capped_ratio(numerator: u64, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some((numerator as f64 / denominator as f64).min(1.0))
    }
}
