use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult, SnapshotSide};

pub type CountMap = BTreeMap<String, u64>;

/// Per-entity record counts for both sides of a migration.
///
/// Entities that are not present in a map count as zero. The unresolved sets
/// only disclose which expected entities a loader could not find; they never
/// change a count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCountSnapshot {
    source_counts: CountMap,
    target_counts: CountMap,
    #[serde(default)]
    unresolved_source: BTreeSet<String>,
    #[serde(default)]
    unresolved_target: BTreeSet<String>,
}

impl EntityCountSnapshot {
    pub fn new(source_counts: CountMap, target_counts: CountMap) -> Self {
        Self {
            source_counts,
            target_counts,
            unresolved_source: BTreeSet::new(),
            unresolved_target: BTreeSet::new(),
        }
    }

    /// Builds a snapshot from collaborator output, where `None` means the
    /// whole side could not be loaded.
    pub fn from_sides(source: Option<CountMap>, target: Option<CountMap>) -> EngineResult<Self> {
        let source_counts = source.ok_or(EngineError::MissingInput {
            side: SnapshotSide::Source,
        })?;
        let target_counts = target.ok_or(EngineError::MissingInput {
            side: SnapshotSide::Target,
        })?;
        Ok(Self::new(source_counts, target_counts))
    }

    pub fn with_unresolved<S, T>(mut self, source: S, target: T) -> Self
    where
        S: IntoIterator<Item = String>,
        T: IntoIterator<Item = String>,
    {
        self.unresolved_source.extend(source);
        self.unresolved_target.extend(target);
        self
    }

    pub fn source_count(&self, entity: &str) -> u64 {
        self.source_counts.get(entity).copied().unwrap_or(0)
    }

    pub fn target_count(&self, entity: &str) -> u64 {
        self.target_counts.get(entity).copied().unwrap_or(0)
    }

    pub fn source_sum(&self, entities: &[String]) -> u64 {
        entities
            .iter()
            .map(|entity| self.source_count(entity))
            .fold(0_u64, u64::saturating_add)
    }

    pub fn target_sum(&self, entities: &[String]) -> u64 {
        entities
            .iter()
            .map(|entity| self.target_count(entity))
            .fold(0_u64, u64::saturating_add)
    }

    pub fn source_counts(&self) -> &CountMap {
        &self.source_counts
    }

    pub fn target_counts(&self) -> &CountMap {
        &self.target_counts
    }

    pub fn unresolved_source(&self) -> &BTreeSet<String> {
        &self.unresolved_source
    }

    pub fn unresolved_target(&self) -> &BTreeSet<String> {
        &self.unresolved_target
    }
}
