use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

use omop_recon::collect::load_snapshot;
use omop_recon::collect::run_report_files::resolve_run_report;
use omop_recon::config::ReconConfig;
use omop_recon::engine::{Classification, MigrationSummary, summarize};
use omop_recon::model::{SUMMARY_MANIFEST_VERSION, SummaryManifest};
use omop_recon::util::{now_utc_string, write_json_pretty};

use crate::cli::ReportArgs;

pub fn run(args: ReportArgs) -> Result<()> {
    let manifest = build_manifest(&args)?;
    log_summary(&manifest.summary);

    let output_path = summary_path(&args);
    write_json_pretty(&output_path, &manifest)?;
    info!(path = %output_path.display(), "wrote migration summary");

    if args.json {
        println!("{}", render_json(&manifest)?);
    }

    Ok(())
}

pub(crate) fn build_manifest(args: &ReportArgs) -> Result<SummaryManifest> {
    let config =
        ReconConfig::load(args.input.config_path.as_deref())?.with_overrides(args.overrides());
    config.engine.validate()?;
    let table = config.table();
    table.validate()?;

    let snapshot_manifest = load_snapshot(&args.input.locations(), &table)?;
    let run_report = resolve_run_report(args.run_report_path.as_deref(), &args.report_dir)?;

    let summary = summarize(
        Some(&snapshot_manifest.snapshot),
        run_report.as_ref().map(|(_, report)| report),
        &table,
        &config.engine,
    )
    .context("failed to compute migration summary")?;

    Ok(SummaryManifest {
        manifest_version: SUMMARY_MANIFEST_VERSION,
        generated_at: now_utc_string(),
        source_location: snapshot_manifest.source_location,
        target_location: snapshot_manifest.target_location,
        run_report_path: run_report
            .as_ref()
            .map(|(path, _)| path.display().to_string()),
        summary,
    })
}

pub(crate) fn summary_path(args: &ReportArgs) -> PathBuf {
    args.output_path.clone().unwrap_or_else(|| {
        args.input
            .cache_root
            .join("reports")
            .join("migration_summary.json")
    })
}

pub(crate) fn render_json(manifest: &SummaryManifest) -> Result<String> {
    serde_json::to_string_pretty(manifest).context("failed to render summary json")
}

fn log_summary(summary: &MigrationSummary) {
    let metrics = &summary.metrics;
    info!(
        success_rate = metrics.success_rate,
        success_rate_tier = metrics.success_rate_tier.as_str(),
        concept_mapping_rate = metrics.concept_mapping_rate,
        concept_mapping_source = metrics.concept_mapping_source.as_str(),
        processing = %summary.processing_display,
        processing_source = metrics.processing_source.as_str(),
        target_connected = metrics.target_connected,
        availability = summary.availability.as_str(),
        "migration metrics"
    );

    for row in &summary.rows {
        info!(
            correspondence = %row.label,
            kind = row.kind.as_str(),
            source_count = row.source_count,
            target_count = row.target_count,
            classification = row.classification.as_str(),
            "reconciliation row"
        );
    }

    let discrepant = summary
        .rows
        .iter()
        .filter(|row| row.classification == Classification::Discrepant)
        .map(|row| row.label.as_str())
        .collect::<Vec<&str>>();
    if !discrepant.is_empty() {
        warn!(correspondences = ?discrepant, "record counts need review");
    }
    if !summary.assessment.success_meets_target {
        warn!(success_rate = metrics.success_rate, "success rate below target");
    }
    if !summary.assessment.concept_mapping_meets_target {
        warn!(
            concept_mapping_rate = metrics.concept_mapping_rate,
            "concept mapping rate below target"
        );
    }
    if !summary.unresolved_source.is_empty() || !summary.unresolved_target.is_empty() {
        warn!(
            source = ?summary.unresolved_source,
            target = ?summary.unresolved_target,
            "entities not found; counted as zero"
        );
    }
}
