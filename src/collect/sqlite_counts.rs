use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, warn};

use super::DatasetScan;
use crate::model::CountedEntity;

/// Counts rows of every expected OMOP table in a SQLite database.
///
/// Tables that do not exist are unresolved and count as zero. Returns `None`
/// when the database file is missing or contains none of the tables.
pub fn scan_sqlite_dataset(db_path: &Path, entities: &BTreeSet<&str>) -> Result<Option<DatasetScan>> {
    if !db_path.is_file() {
        warn!(path = %db_path.display(), "target database missing");
        return Ok(None);
    }

    let connection = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open database read-only: {}", db_path.display()))?;
    let identifier =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").context("failed to compile table name regex")?;

    let mut scan = DatasetScan::default();
    for entity in entities {
        if !identifier.is_match(entity) {
            warn!(entity, "entity is not a plain table name; skipping");
            scan.unresolved.insert(entity.to_string());
            continue;
        }

        let exists = connection
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1 LIMIT 1",
                params![entity],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .with_context(|| format!("failed to look up table {entity}"))?;
        if exists.is_none() {
            debug!(entity, "table missing");
            scan.unresolved.insert(entity.to_string());
            continue;
        }

        let rows = query_count(&connection, &format!("SELECT COUNT(*) FROM \"{entity}\""))
            .with_context(|| format!("failed to count rows in {entity}"))?;
        scan.counts.insert(entity.to_string(), rows);
        scan.entities.push(CountedEntity {
            entity: entity.to_string(),
            location: format!("{}#{entity}", db_path.display()),
            rows,
            sha256: None,
            reused_from_cache: false,
        });
    }

    if scan.entities.is_empty() {
        warn!(path = %db_path.display(), "database holds none of the expected tables");
        return Ok(None);
    }

    Ok(Some(scan))
}

fn query_count(connection: &Connection, sql: &str) -> Result<u64> {
    let count: i64 = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(u64::try_from(count).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rusqlite::Connection;

    use super::scan_sqlite_dataset;

    #[test]
    fn counts_existing_tables_and_flags_missing_ones() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("omop.sqlite");
        let connection = Connection::open(&db_path).expect("open db");
        connection
            .execute_batch(
                "
                CREATE TABLE person (person_id INTEGER PRIMARY KEY);
                INSERT INTO person (person_id) VALUES (1), (2), (3);
                CREATE TABLE measurement (measurement_id INTEGER PRIMARY KEY);
                ",
            )
            .expect("seed db");
        drop(connection);

        let entities = BTreeSet::from(["person", "measurement", "observation"]);
        let scan = scan_sqlite_dataset(&db_path, &entities)
            .expect("scan")
            .expect("database present");

        assert_eq!(scan.counts.get("person"), Some(&3));
        assert_eq!(scan.counts.get("measurement"), Some(&0));
        assert!(scan.unresolved.contains("observation"));
    }

    #[test]
    fn missing_database_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let entities = BTreeSet::from(["person"]);

        assert!(
            scan_sqlite_dataset(&dir.path().join("absent.sqlite"), &entities)
                .expect("scan")
                .is_none()
        );
    }
}
