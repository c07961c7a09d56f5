use serde::Serialize;

use super::config::EngineConfig;
use super::correspondence::CorrespondenceTable;
use super::metrics::{AggregatedMetrics, anchor_counts};
use super::reconciliation::ReconciliationRow;
use super::run_report::{ReportIssue, RunReport};
use super::snapshot::EntityCountSnapshot;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataAvailability {
    /// Anchor records exist on both sides.
    Complete,
    SourceOnly,
    Empty,
}

impl DataAvailability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::SourceOnly => "source_only",
            Self::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordTotals {
    pub source_total: u64,
    pub target_total: u64,
    /// `target_total / source_total`; absent when there are no source records.
    pub efficiency: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityAssessment {
    pub success_meets_target: bool,
    pub concept_mapping_meets_target: bool,
    pub subjects_preserved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptBreakdownRow {
    pub field: String,
    pub mapped_rate: Option<f64>,
    pub meets_target: Option<bool>,
}

/// Everything a presentation layer needs to render one migration report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationSummary {
    pub metrics: AggregatedMetrics,
    pub rows: Vec<ReconciliationRow>,
    pub totals: RecordTotals,
    pub availability: DataAvailability,
    pub assessment: QualityAssessment,
    pub concept_breakdown: Vec<ConceptBreakdownRow>,
    pub processing_display: String,
    pub unresolved_source: Vec<String>,
    pub unresolved_target: Vec<String>,
    pub report_issues: Vec<ReportIssue>,
}

pub fn compose(
    snapshot: &EntityCountSnapshot,
    report: Option<&RunReport>,
    table: &CorrespondenceTable,
    config: &EngineConfig,
    rows: Vec<ReconciliationRow>,
    metrics: AggregatedMetrics,
) -> MigrationSummary {
    let (anchor_source, anchor_target) = anchor_counts(snapshot, table);

    let availability = match (anchor_source > 0, anchor_target > 0) {
        (true, true) => DataAvailability::Complete,
        (true, false) => DataAvailability::SourceOnly,
        _ => DataAvailability::Empty,
    };

    let assessment = QualityAssessment {
        success_meets_target: metrics.success_rate >= config.success_rate_target,
        concept_mapping_meets_target: metrics.concept_mapping_rate >= config.concept_mapping_target,
        subjects_preserved: anchor_source > 0 && anchor_source == anchor_target,
    };

    let concept_breakdown = report
        .and_then(|report| report.concept_coverage.as_ref())
        .map(|coverage| {
            coverage
                .iter()
                .map(|(field, entry)| ConceptBreakdownRow {
                    field: field.clone(),
                    mapped_rate: entry.mapped_rate,
                    meets_target: entry
                        .mapped_rate
                        .map(|rate| rate >= config.concept_mapping_target),
                })
                .collect()
        })
        .unwrap_or_default();

    MigrationSummary {
        totals: record_totals(table, &rows),
        processing_display: format_duration(metrics.processing_seconds),
        metrics,
        rows,
        availability,
        assessment,
        concept_breakdown,
        unresolved_source: snapshot.unresolved_source().iter().cloned().collect(),
        unresolved_target: snapshot.unresolved_target().iter().cloned().collect(),
        report_issues: report
            .map(|report| report.issues.clone())
            .unwrap_or_default(),
    }
}

fn record_totals(table: &CorrespondenceTable, rows: &[ReconciliationRow]) -> RecordTotals {
    let (source_total, target_total) = table
        .correspondences
        .iter()
        .zip(rows)
        .filter(|(correspondence, _)| correspondence.in_totals)
        .fold((0_u64, 0_u64), |(source, target), (_, row)| {
            (
                source.saturating_add(row.source_count),
                target.saturating_add(row.target_count),
            )
        });

    let efficiency = if source_total == 0 {
        None
    } else {
        Some(target_total as f64 / source_total as f64)
    };

    RecordTotals {
        source_total,
        target_total,
        efficiency,
    }
}

/// Whole minutes and seconds, e.g. `3m 5s`.
pub fn format_duration(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}m {}s", whole / 60, whole % 60)
}
