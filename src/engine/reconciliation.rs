use serde::Serialize;

use super::correspondence::{CorrespondenceKind, CorrespondenceTable};
use super::snapshot::EntityCountSnapshot;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Exact,
    Transformed,
    Discrepant,
    NoData,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Transformed => "transformed",
            Self::Discrepant => "discrepant",
            Self::NoData => "no_data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationRow {
    pub label: String,
    pub source_entities: Vec<String>,
    pub target_entities: Vec<String>,
    pub kind: CorrespondenceKind,
    pub source_count: u64,
    pub target_count: u64,
    /// Signed difference `target_count - source_count`, saturating at the `i64` bounds.
    pub delta: i64,
    pub classification: Classification,
}

fn signed_delta(source_count: u64, target_count: u64) -> i64 {
    let delta = i128::from(target_count) - i128::from(source_count);
    i64::try_from(delta).unwrap_or(if delta < 0 { i64::MIN } else { i64::MAX })
}

pub fn classify(kind: CorrespondenceKind, source_count: u64, target_count: u64) -> Classification {
    if source_count == 0 {
        return Classification::NoData;
    }

    match kind {
        CorrespondenceKind::OneToOne if source_count == target_count => Classification::Exact,
        CorrespondenceKind::Split | CorrespondenceKind::Merge if target_count > 0 => {
            Classification::Transformed
        }
        _ => Classification::Discrepant,
    }
}

/// One row per declared correspondence, in declaration order.
pub fn reconcile(
    snapshot: &EntityCountSnapshot,
    table: &CorrespondenceTable,
) -> Vec<ReconciliationRow> {
    table
        .correspondences
        .iter()
        .map(|correspondence| {
            let source_count = snapshot.source_sum(&correspondence.sources);
            let target_count = snapshot.target_sum(&correspondence.targets);

            ReconciliationRow {
                label: correspondence.label.clone(),
                source_entities: correspondence.sources.clone(),
                target_entities: correspondence.targets.clone(),
                kind: correspondence.kind,
                source_count,
                target_count,
                delta: signed_delta(source_count, target_count),
                classification: classify(correspondence.kind, source_count, target_count),
            }
        })
        .collect()
}
