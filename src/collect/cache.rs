use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::csv_counts::count_csv_rows;
use crate::util::{read_json, sha256_file, write_json_pretty};

const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedCount {
    pub modified: DateTime<Utc>,
    pub size: u64,
    pub sha256: String,
    pub rows: u64,
}

/// Row counts keyed by file path. An entry is reused only while the file's
/// modification time and size are unchanged. Saving keeps only the entries
/// counted since the cache was loaded.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CountCache {
    #[serde(default)]
    cache_version: u32,
    #[serde(default)]
    entries: BTreeMap<String, CachedCount>,
    #[serde(skip)]
    dirty: bool,
    #[serde(skip)]
    seen: BTreeSet<String>,
}

impl CountCache {
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match read_json::<Self>(path) {
            Ok(cache) if cache.cache_version == CACHE_VERSION => cache,
            Ok(cache) => {
                warn!(
                    path = %path.display(),
                    found = cache.cache_version,
                    expected = CACHE_VERSION,
                    "count cache version mismatch; recounting"
                );
                Self::default()
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "count cache unreadable; recounting");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let entries = self
            .entries
            .iter()
            .filter(|(key, _)| self.seen.contains(*key))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect::<BTreeMap<_, _>>();
        let pruned = self.entries.len() - entries.len();
        if !self.dirty && pruned == 0 {
            return Ok(());
        }
        if pruned > 0 {
            debug!(path = %path.display(), pruned, "dropping stale count cache entries");
        }

        let stored = Self {
            cache_version: CACHE_VERSION,
            entries,
            dirty: false,
            seen: BTreeSet::new(),
        };
        write_json_pretty(path, &stored)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the row count for `path` and whether it came from the cache.
    pub fn count_csv(&mut self, path: &Path) -> Result<(CachedCount, bool)> {
        let metadata = fs::metadata(path)
            .with_context(|| format!("failed to stat {}", path.display()))?;
        let modified: DateTime<Utc> = metadata
            .modified()
            .with_context(|| format!("failed to read modification time: {}", path.display()))?
            .into();
        let size = metadata.len();
        let key = path.display().to_string();
        self.seen.insert(key.clone());

        if let Some(entry) = self.entries.get(&key) {
            if entry.modified == modified && entry.size == size {
                debug!(path = %key, rows = entry.rows, "count cache hit");
                return Ok((entry.clone(), true));
            }
        }

        let entry = CachedCount {
            modified,
            size,
            sha256: sha256_file(path)?,
            rows: count_csv_rows(path)?,
        };
        self.entries.insert(key, entry.clone());
        self.dirty = true;

        Ok((entry, false))
    }
}
