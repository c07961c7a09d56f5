use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ByteRecord, ReaderBuilder};
use tracing::{debug, warn};

use super::DatasetScan;
use super::cache::CountCache;
use crate::model::CountedEntity;

/// Number of data rows in a CSV file, header excluded.
pub fn count_csv_rows(path: &Path) -> Result<u64> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open csv: {}", path.display()))?;

    let mut record = ByteRecord::new();
    let mut rows = 0_u64;
    while reader
        .read_byte_record(&mut record)
        .with_context(|| format!("failed to read csv row {} in {}", rows + 1, path.display()))?
    {
        rows += 1;
    }

    Ok(rows)
}

/// Counts `<entity>.csv` for every expected entity under `dir`.
///
/// Returns `None` when the directory is missing or holds none of the
/// expected files, which callers treat as an unavailable dataset.
pub fn scan_csv_dataset(
    dir: &Path,
    entities: &BTreeSet<&str>,
    cache: &mut CountCache,
) -> Result<Option<DatasetScan>> {
    if !dir.is_dir() {
        warn!(path = %dir.display(), "dataset directory missing");
        return Ok(None);
    }

    let mut scan = DatasetScan::default();
    for entity in entities {
        let path = dir.join(format!("{entity}.csv"));
        if !path.is_file() {
            debug!(entity, path = %path.display(), "entity file missing");
            scan.unresolved.insert(entity.to_string());
            continue;
        }

        let (cached, reused) = cache.count_csv(&path)?;
        scan.counts.insert(entity.to_string(), cached.rows);
        scan.entities.push(CountedEntity {
            entity: entity.to_string(),
            location: path.display().to_string(),
            rows: cached.rows,
            sha256: Some(cached.sha256),
            reused_from_cache: reused,
        });
    }

    if scan.entities.is_empty() {
        warn!(path = %dir.display(), "no expected entity files found");
        return Ok(None);
    }

    Ok(Some(scan))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::fs;

    use super::{count_csv_rows, scan_csv_dataset};
    use crate::collect::cache::CountCache;

    #[test]
    fn header_is_not_counted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("patients.csv");
        fs::write(&path, "Id,BIRTHDATE\np1,1980-01-01\np2,1975-03-09\np3,\n").expect("write csv");

        assert_eq!(count_csv_rows(&path).expect("count rows"), 3);
    }

    #[test]
    fn header_only_and_empty_files_count_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        let header_only = dir.path().join("allergies.csv");
        let empty = dir.path().join("providers.csv");
        fs::write(&header_only, "START,PATIENT,CODE\n").expect("write csv");
        fs::write(&empty, "").expect("write csv");

        assert_eq!(count_csv_rows(&header_only).expect("count rows"), 0);
        assert_eq!(count_csv_rows(&empty).expect("count rows"), 0);
    }

    #[test]
    fn quoted_newlines_stay_in_one_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("conditions.csv");
        fs::write(&path, "CODE,DESCRIPTION\n1,\"line one\nline two\"\n2,plain\n").expect("write csv");

        assert_eq!(count_csv_rows(&path).expect("count rows"), 2);
    }

    #[test]
    fn scan_marks_missing_files_unresolved() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("patients.csv"), "Id\na\nb\n").expect("write csv");
        let entities = BTreeSet::from(["patients", "allergies"]);
        let mut cache = CountCache::default();

        let scan = scan_csv_dataset(dir.path(), &entities, &mut cache)
            .expect("scan")
            .expect("dataset present");

        assert_eq!(scan.counts.get("patients"), Some(&2));
        assert!(!scan.counts.contains_key("allergies"));
        assert!(scan.unresolved.contains("allergies"));
        assert_eq!(scan.entities.len(), 1);
    }

    #[test]
    fn directory_without_expected_files_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("notes.txt"), "x").expect("write file");
        let entities = BTreeSet::from(["patients"]);
        let mut cache = CountCache::default();

        assert!(
            scan_csv_dataset(dir.path(), &entities, &mut cache)
                .expect("scan")
                .is_none()
        );
        assert!(
            scan_csv_dataset(&dir.path().join("absent"), &entities, &mut cache)
                .expect("scan")
                .is_none()
        );
    }
}
