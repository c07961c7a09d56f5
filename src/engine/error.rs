use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A count snapshot is unavailable as a whole, not merely empty.
    #[error("no data available: {side} count snapshot is missing")]
    MissingInput { side: SnapshotSide },

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid correspondence table: {0}")]
    InvalidCorrespondence(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSide {
    Source,
    Target,
}

impl SnapshotSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for SnapshotSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
