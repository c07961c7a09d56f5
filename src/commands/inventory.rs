use anyhow::Result;
use tracing::info;

use omop_recon::collect::load_snapshot;
use omop_recon::config::ReconConfig;
use omop_recon::util::write_json_pretty;

use crate::cli::InventoryArgs;

pub fn run(args: InventoryArgs) -> Result<()> {
    let config = ReconConfig::load(args.input.config_path.as_deref())?;
    let table = config.table();
    table.validate()?;

    let manifest = load_snapshot(&args.input.locations(), &table)?;

    let source_rows: u64 = manifest.source_entities.iter().map(|entity| entity.rows).sum();
    let target_rows: u64 = manifest.target_entities.iter().map(|entity| entity.rows).sum();
    let reused = manifest
        .source_entities
        .iter()
        .chain(manifest.target_entities.iter())
        .filter(|entity| entity.reused_from_cache)
        .count();

    if args.dry_run {
        info!(
            source = %manifest.source_location,
            target = %manifest.target_location,
            source_rows,
            target_rows,
            reused_from_cache = reused,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| args.input.manifest_dir().join("count_snapshot.json"));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote count snapshot manifest");
    info!(
        source_entities = manifest.source_entities.len(),
        target_entities = manifest.target_entities.len(),
        source_rows,
        target_rows,
        reused_from_cache = reused,
        "inventory completed"
    );

    Ok(())
}
