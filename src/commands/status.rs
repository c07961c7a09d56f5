use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use omop_recon::collect::run_report_files::find_latest_run_report;
use omop_recon::config::ReconConfig;
use omop_recon::model::CountSnapshotManifest;
use omop_recon::util::read_json;

use crate::cli::StatusArgs;

pub fn run(args: StatusArgs) -> Result<()> {
    let input = &args.input;
    let config = ReconConfig::load(input.config_path.as_deref())?;
    let table = config.table();
    let snapshot_path = input.manifest_dir().join("count_snapshot.json");

    info!(
        cache_root = %input.cache_root.display(),
        correspondences = table.correspondences.len(),
        anchor = %table.anchor,
        "status requested"
    );

    report_dataset("source", &input.source_dir, &table.source_entities());
    match &input.target_db {
        Some(db_path) if db_path.is_file() => {
            info!(path = %db_path.display(), "target database present");
        }
        Some(db_path) => warn!(path = %db_path.display(), "target database missing"),
        None => report_dataset("target", &input.target_dir, &table.target_entities()),
    }

    match find_latest_run_report(&args.report_dir)? {
        Some(path) => info!(path = %path.display(), "latest run report"),
        None => warn!(dir = %args.report_dir.display(), "no run report; metrics will use fallbacks"),
    }

    if snapshot_path.exists() {
        let manifest: CountSnapshotManifest = read_json(&snapshot_path)?;
        info!(
            path = %snapshot_path.display(),
            generated_at = %manifest.generated_at,
            source_entities = manifest.source_entities.len(),
            target_entities = manifest.target_entities.len(),
            "loaded count snapshot manifest"
        );
    } else {
        warn!(path = %snapshot_path.display(), "count snapshot manifest missing");
    }

    Ok(())
}

fn report_dataset(side: &str, dir: &Path, entities: &BTreeSet<&str>) {
    if !dir.is_dir() {
        warn!(side, path = %dir.display(), "dataset directory missing");
        return;
    }

    let missing = entities
        .iter()
        .filter(|entity| !dir.join(format!("{entity}.csv")).is_file())
        .copied()
        .collect::<Vec<&str>>();
    info!(
        side,
        path = %dir.display(),
        expected = entities.len(),
        present = entities.len() - missing.len(),
        "dataset directory present"
    );
    if !missing.is_empty() {
        warn!(side, missing = ?missing, "expected entity files missing");
    }
}
