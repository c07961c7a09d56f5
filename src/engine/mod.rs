mod config;
mod correspondence;
mod error;
mod metrics;
mod reconciliation;
mod run_report;
mod snapshot;
mod summary;
#[cfg(test)]
mod tests;

pub use self::config::EngineConfig;
pub use self::correspondence::{Correspondence, CorrespondenceKind, CorrespondenceTable};
pub use self::error::{EngineError, EngineResult, SnapshotSide};
pub use self::metrics::{
    AggregatedMetrics, MetricSource, SuccessRateTier, aggregate, concept_mapping_rate,
    processing_seconds, success_rate, target_connected,
};
pub use self::reconciliation::{Classification, ReconciliationRow, classify, reconcile};
pub use self::run_report::{ConceptCoverage, ReportIssue, RunReport};
pub use self::snapshot::{CountMap, EntityCountSnapshot};
pub use self::summary::{
    ConceptBreakdownRow, DataAvailability, MigrationSummary, QualityAssessment, RecordTotals,
    compose, format_duration,
};

/// Reconciles the snapshot, aggregates metrics and composes the summary.
///
/// A missing snapshot is a hard `MissingInput` failure; everything missing
/// from the run report degrades to the documented fallbacks instead.
pub fn summarize(
    snapshot: Option<&EntityCountSnapshot>,
    report: Option<&RunReport>,
    table: &CorrespondenceTable,
    config: &EngineConfig,
) -> EngineResult<MigrationSummary> {
    let snapshot = snapshot.ok_or(EngineError::MissingInput {
        side: SnapshotSide::Source,
    })?;
    table.validate()?;
    config.validate()?;

    let rows = reconcile(snapshot, table);
    let metrics = aggregate(snapshot, report, table, config);

    Ok(compose(snapshot, report, table, config, rows, metrics))
}
