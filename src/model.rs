use serde::{Deserialize, Serialize};

use crate::engine::{EntityCountSnapshot, MigrationSummary};

pub const SNAPSHOT_MANIFEST_VERSION: u32 = 1;
pub const SUMMARY_MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountedEntity {
    pub entity: String,
    pub location: String,
    pub rows: u64,
    pub sha256: Option<String>,
    #[serde(default)]
    pub reused_from_cache: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountBackend {
    Csv,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountSnapshotManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_location: String,
    pub target_location: String,
    pub target_backend: CountBackend,
    pub source_entities: Vec<CountedEntity>,
    pub target_entities: Vec<CountedEntity>,
    pub snapshot: EntityCountSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_location: String,
    pub target_location: String,
    pub run_report_path: Option<String>,
    pub summary: MigrationSummary,
}
