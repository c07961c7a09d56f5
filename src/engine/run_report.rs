use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

const VALIDATION_RESULTS: &str = "validation_results";
const SUMMARY: &str = "summary";
const OVERALL_SUCCESS_RATE: &str = "overall_success_rate";
const PHASE_PERFORMANCE: &str = "phase_performance";
const DURATION_SECONDS: &str = "duration_seconds";
const CONCEPT_COVERAGE: &str = "concept_coverage";
const MAPPED_RATE: &str = "mapped_rate";

/// Measured results of a completed pipeline run.
///
/// Every section is independently optional. Fields of the wrong shape or out
/// of range are dropped and recorded in `issues` instead of failing the parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub overall_success_rate: Option<f64>,
    pub phase_durations: Option<BTreeMap<String, f64>>,
    pub concept_coverage: Option<BTreeMap<String, ConceptCoverage>>,
    pub issues: Vec<ReportIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConceptCoverage {
    pub mapped_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportIssue {
    SectionAbsent { path: String },
    Malformed { path: String, reason: String },
}

impl ReportIssue {
    fn absent(path: impl Into<String>) -> Self {
        Self::SectionAbsent { path: path.into() }
    }

    fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::SectionAbsent { path } | Self::Malformed { path, .. } => path,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

impl RunReport {
    pub fn from_slice(raw: &[u8]) -> serde_json::Result<Self> {
        let document: Value = serde_json::from_slice(raw)?;
        Ok(Self::from_value(&document))
    }

    pub fn from_value(document: &Value) -> Self {
        let mut issues = Vec::new();

        let Some(root) = document.as_object() else {
            issues.push(ReportIssue::malformed("$", "document is not an object"));
            return Self {
                issues,
                ..Self::default()
            };
        };

        let validation = match root.get(VALIDATION_RESULTS) {
            None => {
                issues.push(ReportIssue::absent(VALIDATION_RESULTS));
                None
            }
            Some(value) => match value.as_object() {
                Some(map) => Some(map),
                None => {
                    issues.push(ReportIssue::malformed(VALIDATION_RESULTS, "not an object"));
                    None
                }
            },
        };

        let overall_success_rate = validation.and_then(|map| parse_success_rate(map, &mut issues));
        let concept_coverage = validation.and_then(|map| parse_concept_coverage(map, &mut issues));
        let phase_durations = parse_phase_durations(root, &mut issues);

        Self {
            overall_success_rate,
            phase_durations,
            concept_coverage,
            issues,
        }
    }

    /// Sum of all phase durations, or `None` when the section is absent.
    pub fn total_phase_seconds(&self) -> Option<f64> {
        self.phase_durations
            .as_ref()
            .map(|phases| phases.values().sum())
    }

    pub fn mapped_rates(&self) -> Vec<f64> {
        self.concept_coverage
            .iter()
            .flat_map(|coverage| coverage.values())
            .filter_map(|entry| entry.mapped_rate)
            .collect()
    }
}

fn parse_success_rate(validation: &Map<String, Value>, issues: &mut Vec<ReportIssue>) -> Option<f64> {
    let summary_path = format!("{VALIDATION_RESULTS}.{SUMMARY}");
    let summary = match validation.get(SUMMARY) {
        None => {
            issues.push(ReportIssue::absent(summary_path));
            return None;
        }
        Some(value) => match value.as_object() {
            Some(map) => map,
            None => {
                issues.push(ReportIssue::malformed(summary_path, "not an object"));
                return None;
            }
        },
    };

    let path = format!("{summary_path}.{OVERALL_SUCCESS_RATE}");
    match summary.get(OVERALL_SUCCESS_RATE) {
        None => {
            issues.push(ReportIssue::absent(path));
            None
        }
        Some(value) => fraction(value, &path, issues),
    }
}

fn parse_concept_coverage(
    validation: &Map<String, Value>,
    issues: &mut Vec<ReportIssue>,
) -> Option<BTreeMap<String, ConceptCoverage>> {
    let section_path = format!("{VALIDATION_RESULTS}.{CONCEPT_COVERAGE}");
    let entries = match validation.get(CONCEPT_COVERAGE) {
        None => {
            issues.push(ReportIssue::absent(section_path));
            return None;
        }
        Some(value) => match value.as_object() {
            Some(map) => map,
            None => {
                issues.push(ReportIssue::malformed(section_path, "not an object"));
                return None;
            }
        },
    };

    let mut coverage = BTreeMap::new();
    for (field, stats) in entries {
        let entry_path = format!("{section_path}.{field}");
        let mapped_rate = match stats.as_object() {
            None => {
                issues.push(ReportIssue::malformed(entry_path, "not an object"));
                None
            }
            Some(stats) => stats
                .get(MAPPED_RATE)
                .and_then(|value| fraction(value, &format!("{entry_path}.{MAPPED_RATE}"), issues)),
        };
        coverage.insert(field.clone(), ConceptCoverage { mapped_rate });
    }

    Some(coverage)
}

fn parse_phase_durations(
    root: &Map<String, Value>,
    issues: &mut Vec<ReportIssue>,
) -> Option<BTreeMap<String, f64>> {
    let phases = match root.get(PHASE_PERFORMANCE) {
        None => {
            issues.push(ReportIssue::absent(PHASE_PERFORMANCE));
            return None;
        }
        Some(value) => match value.as_object() {
            Some(map) => map,
            None => {
                issues.push(ReportIssue::malformed(PHASE_PERFORMANCE, "not an object"));
                return None;
            }
        },
    };

    let mut durations = BTreeMap::new();
    for (phase, stats) in phases {
        let path = format!("{PHASE_PERFORMANCE}.{phase}");
        let Some(stats) = stats.as_object() else {
            issues.push(ReportIssue::malformed(path, "not an object"));
            continue;
        };
        let Some(value) = stats.get(DURATION_SECONDS) else {
            continue;
        };
        let path = format!("{path}.{DURATION_SECONDS}");
        match value.as_f64() {
            Some(seconds) if seconds.is_finite() && seconds >= 0.0 => {
                durations.insert(phase.clone(), seconds);
            }
            Some(seconds) => {
                issues.push(ReportIssue::malformed(path, format!("invalid duration {seconds}")));
            }
            None => issues.push(ReportIssue::malformed(path, "not a number")),
        }
    }

    Some(durations)
}

fn fraction(value: &Value, path: &str, issues: &mut Vec<ReportIssue>) -> Option<f64> {
    match value.as_f64() {
        Some(rate) if (0.0..=1.0).contains(&rate) => Some(rate),
        Some(rate) => {
            issues.push(ReportIssue::malformed(path, format!("{rate} is outside [0, 1]")));
            None
        }
        None => {
            issues.push(ReportIssue::malformed(path, "not a number"));
            None
        }
    }
}
