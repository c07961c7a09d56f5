use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::{info, warn};

use crate::engine::RunReport;

/// Picks the `pipeline_report_<stamp>.json` with the greatest stamp.
pub fn find_latest_run_report(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let pattern = Regex::new(r"^pipeline_report_(.+)\.json$")
        .context("failed to compile run report filename regex")?;

    let mut latest: Option<(String, PathBuf)> = None;
    let entries = fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(stamp) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| pattern.captures(name))
            .and_then(|captures| captures.get(1))
            .map(|stamp| stamp.as_str().to_string())
        else {
            continue;
        };

        let newer = latest
            .as_ref()
            .map(|(current, _)| stamp > *current)
            .unwrap_or(true);
        if newer {
            latest = Some((stamp, path));
        }
    }

    Ok(latest.map(|(_, path)| path))
}

/// Reads a run report. Invalid JSON degrades to "no report" with a warning.
pub fn load_run_report(path: &Path) -> Result<Option<RunReport>> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    match RunReport::from_slice(&raw) {
        Ok(report) => {
            for issue in report.issues.iter().filter(|issue| issue.is_malformed()) {
                warn!(path = %path.display(), field = issue.path(), "ignoring malformed run report field");
            }
            Ok(Some(report))
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "run report is not valid JSON; ignoring it");
            Ok(None)
        }
    }
}

/// An explicit path must exist; otherwise the latest report in `report_dir`
/// is used when there is one.
pub fn resolve_run_report(
    explicit: Option<&Path>,
    report_dir: &Path,
) -> Result<Option<(PathBuf, RunReport)>> {
    let path = match explicit {
        Some(path) if !path.is_file() => bail!("run report not found: {}", path.display()),
        Some(path) => path.to_path_buf(),
        None => match find_latest_run_report(report_dir)? {
            Some(path) => path,
            None => {
                info!(dir = %report_dir.display(), "no run report found; using fallback metrics");
                return Ok(None);
            }
        },
    };

    Ok(load_run_report(&path)?.map(|report| (path, report)))
}
