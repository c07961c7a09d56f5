//! Filesystem and database collaborators that materialize engine inputs.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, warn};

use crate::engine::{
    CorrespondenceTable, CountMap, EngineError, EntityCountSnapshot, SnapshotSide,
};
use crate::model::{
    CountBackend, CountSnapshotManifest, CountedEntity, SNAPSHOT_MANIFEST_VERSION,
};
use crate::util::now_utc_string;

pub mod cache;
pub mod csv_counts;
pub mod run_report_files;
pub mod sqlite_counts;

use self::cache::CountCache;
use self::csv_counts::scan_csv_dataset;
use self::sqlite_counts::scan_sqlite_dataset;

#[derive(Debug, Clone, Default)]
pub struct DatasetScan {
    pub counts: CountMap,
    pub entities: Vec<CountedEntity>,
    pub unresolved: BTreeSet<String>,
}

impl DatasetScan {
    fn unavailable(entities: &BTreeSet<&str>) -> Self {
        Self {
            unresolved: entities.iter().map(|entity| entity.to_string()).collect(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct InputLocations {
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    pub target_db: Option<PathBuf>,
    pub cache_path: PathBuf,
}

impl InputLocations {
    pub fn target_backend(&self) -> CountBackend {
        if self.target_db.is_some() {
            CountBackend::Sqlite
        } else {
            CountBackend::Csv
        }
    }

    pub fn target_location(&self) -> String {
        self.target_db
            .as_ref()
            .unwrap_or(&self.target_dir)
            .display()
            .to_string()
    }
}

/// Counts every entity the table names on both sides.
///
/// The table is validated first, so a misconfigured table is never reported
/// as missing data.
/// An unavailable source dataset fails with the engine's `MissingInput`
/// error. An unavailable target dataset is reported as all zero, with every
/// target entity unresolved, so the summary shows a disconnected target.
pub fn load_snapshot(
    locations: &InputLocations,
    table: &CorrespondenceTable,
) -> Result<CountSnapshotManifest> {
    table.validate()?;

    let source_entities = table.source_entities();
    let target_entities = table.target_entities();

    let mut cache = CountCache::load(&locations.cache_path);

    let source = scan_csv_dataset(&locations.source_dir, &source_entities, &mut cache)?;
    let Some(source) = source else {
        return Err(EngineError::MissingInput {
            side: SnapshotSide::Source,
        }
        .into());
    };

    let target = match &locations.target_db {
        Some(db_path) => scan_sqlite_dataset(db_path, &target_entities)?,
        None => scan_csv_dataset(&locations.target_dir, &target_entities, &mut cache)?,
    };

    cache.save(&locations.cache_path)?;

    let target = target.unwrap_or_else(|| {
        warn!(
            location = %locations.target_location(),
            "target dataset unavailable; every target entity counts as zero"
        );
        DatasetScan::unavailable(&target_entities)
    });

    let snapshot = EntityCountSnapshot::from_sides(
        Some(source.counts.clone()),
        Some(target.counts.clone()),
    )?
    .with_unresolved(source.unresolved.clone(), target.unresolved.clone());

    info!(
        source_entities = source.entities.len(),
        target_entities = target.entities.len(),
        unresolved_source = source.unresolved.len(),
        unresolved_target = target.unresolved.len(),
        cached_entries = cache.len(),
        "loaded count snapshot"
    );

    Ok(CountSnapshotManifest {
        manifest_version: SNAPSHOT_MANIFEST_VERSION,
        generated_at: now_utc_string(),
        source_location: locations.source_dir.display().to_string(),
        target_location: locations.target_location(),
        target_backend: locations.target_backend(),
        source_entities: source.entities,
        target_entities: target.entities,
        snapshot,
    })
}
