use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use omop_recon::collect::InputLocations;
use omop_recon::config::EngineOverrides;

#[derive(Parser, Debug)]
#[command(
    name = "omop-recon",
    version,
    about = "Reconciliation and quality metrics for Synthea to OMOP migration runs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Count every mapped entity and write the count snapshot manifest.
    Inventory(InventoryArgs),
    /// Reconcile counts, aggregate metrics and write the migration summary.
    Report(ReportArgs),
    /// Show which inputs are available without computing anything.
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    #[arg(long, default_value = ".cache/omop-recon")]
    pub cache_root: PathBuf,

    #[arg(long, default_value = "data/synthea")]
    pub source_dir: PathBuf,

    #[arg(long, default_value = "data/omop")]
    pub target_dir: PathBuf,

    /// Read target counts from an OMOP SQLite database instead of CSV files.
    #[arg(long)]
    pub target_db: Option<PathBuf>,

    #[arg(long)]
    pub config_path: Option<PathBuf>,
}

impl InputArgs {
    pub fn manifest_dir(&self) -> PathBuf {
        self.cache_root.join("manifests")
    }

    pub fn locations(&self) -> InputLocations {
        InputLocations {
            source_dir: self.source_dir.clone(),
            target_dir: self.target_dir.clone(),
            target_db: self.target_db.clone(),
            cache_path: self.manifest_dir().join("count_cache.json"),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Directory searched for the latest `pipeline_report_*.json`.
    #[arg(long, default_value = "data")]
    pub report_dir: PathBuf,

    #[arg(long)]
    pub run_report_path: Option<PathBuf>,

    #[arg(long)]
    pub default_success_rate: Option<f64>,

    #[arg(long)]
    pub default_concept_rate: Option<f64>,

    #[arg(long)]
    pub default_processing_seconds: Option<f64>,

    #[arg(long)]
    pub output_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl ReportArgs {
    pub fn overrides(&self) -> EngineOverrides {
        EngineOverrides {
            default_success_rate: self.default_success_rate,
            default_concept_mapping_rate: self.default_concept_rate,
            default_processing_seconds: self.default_processing_seconds,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[arg(long, default_value = "data")]
    pub report_dir: PathBuf,
}
