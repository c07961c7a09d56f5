use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrespondenceKind {
    OneToOne,
    /// One source entity spread over several target entities.
    Split,
    /// Source records folded into a target entity shared with other sources.
    Merge,
}

impl CorrespondenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneToOne => "one_to_one",
            Self::Split => "split",
            Self::Merge => "merge",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correspondence {
    pub label: String,
    pub sources: Vec<String>,
    pub targets: Vec<String>,
    pub kind: CorrespondenceKind,
    /// Counted in the source/target record totals of the summary.
    #[serde(default)]
    pub in_totals: bool,
}

impl Correspondence {
    fn new(label: &str, sources: &[&str], targets: &[&str], kind: CorrespondenceKind) -> Self {
        Self {
            label: label.to_string(),
            sources: sources.iter().map(|name| name.to_string()).collect(),
            targets: targets.iter().map(|name| name.to_string()).collect(),
            kind,
            in_totals: false,
        }
    }

    fn totals(mut self) -> Self {
        self.in_totals = true;
        self
    }
}

/// Declared source to target correspondences, in reporting order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrespondenceTable {
    /// Label of the one-to-one correspondence used for the derived success rate.
    pub anchor: String,
    pub correspondences: Vec<Correspondence>,
}

impl Default for CorrespondenceTable {
    fn default() -> Self {
        Self::synthea_to_omop()
    }
}

impl CorrespondenceTable {
    pub fn synthea_to_omop() -> Self {
        use CorrespondenceKind::{Merge, OneToOne, Split};

        Self {
            anchor: "patients".to_string(),
            correspondences: vec![
                Correspondence::new("patients", &["patients"], &["person"], OneToOne).totals(),
                Correspondence::new("encounters", &["encounters"], &["visit_occurrence"], OneToOne)
                    .totals(),
                Correspondence::new(
                    "conditions",
                    &["conditions"],
                    &["condition_occurrence"],
                    OneToOne,
                )
                .totals(),
                Correspondence::new("medications", &["medications"], &["drug_exposure"], OneToOne)
                    .totals(),
                Correspondence::new(
                    "procedures",
                    &["procedures"],
                    &["procedure_occurrence"],
                    OneToOne,
                )
                .totals(),
                Correspondence::new(
                    "observations",
                    &["observations"],
                    &["measurement", "observation"],
                    Split,
                ),
                Correspondence::new(
                    "organizations",
                    &["organizations"],
                    &["care_site", "location"],
                    Split,
                ),
                Correspondence::new("providers", &["providers"], &["provider"], OneToOne),
                Correspondence::new(
                    "observation_periods",
                    &["patients"],
                    &["observation_period"],
                    OneToOne,
                ),
                Correspondence::new("allergies", &["allergies"], &["observation"], Merge),
            ],
        }
    }

    pub fn anchor(&self) -> Option<&Correspondence> {
        self.correspondences
            .iter()
            .find(|correspondence| correspondence.label == self.anchor)
    }

    pub fn source_entities(&self) -> BTreeSet<&str> {
        self.correspondences
            .iter()
            .flat_map(|correspondence| correspondence.sources.iter().map(String::as_str))
            .collect()
    }

    pub fn target_entities(&self) -> BTreeSet<&str> {
        self.correspondences
            .iter()
            .flat_map(|correspondence| correspondence.targets.iter().map(String::as_str))
            .collect()
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.correspondences.is_empty() {
            return Err(invalid("no correspondences declared"));
        }

        let mut labels = HashSet::new();
        for correspondence in &self.correspondences {
            let label = &correspondence.label;
            if !labels.insert(label.as_str()) {
                return Err(invalid(format!("duplicate label '{label}'")));
            }
            if correspondence.sources.is_empty() || correspondence.targets.is_empty() {
                return Err(invalid(format!(
                    "'{label}' needs at least one source and one target entity"
                )));
            }
            if correspondence
                .sources
                .iter()
                .chain(correspondence.targets.iter())
                .any(|entity| entity.trim().is_empty())
            {
                return Err(invalid(format!("'{label}' names an empty entity")));
            }

            let shape_ok = match correspondence.kind {
                CorrespondenceKind::OneToOne => {
                    correspondence.sources.len() == 1 && correspondence.targets.len() == 1
                }
                CorrespondenceKind::Split => correspondence.sources.len() == 1,
                CorrespondenceKind::Merge => correspondence.targets.len() == 1,
            };
            if !shape_ok {
                return Err(invalid(format!(
                    "'{label}' has {} source(s) and {} target(s), which does not fit kind {}",
                    correspondence.sources.len(),
                    correspondence.targets.len(),
                    correspondence.kind.as_str()
                )));
            }
        }

        match self.anchor() {
            None => Err(invalid(format!("anchor '{}' is not declared", self.anchor))),
            Some(anchor) if anchor.kind != CorrespondenceKind::OneToOne => Err(invalid(format!(
                "anchor '{}' must be one_to_one",
                self.anchor
            ))),
            Some(_) => Ok(()),
        }
    }
}

fn invalid(message: impl Into<String>) -> EngineError {
    EngineError::InvalidCorrespondence(message.into())
}
