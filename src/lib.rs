//! Reconciliation and quality metrics for a Synthea to OMOP migration run.
//!
//! [`engine`] is pure: it takes already-loaded count snapshots and an optional
//! run report and returns a [`engine::MigrationSummary`]. [`collect`] holds the
//! filesystem and database collaborators that materialize those inputs.

pub mod collect;
pub mod config;
pub mod engine;
pub mod model;
pub mod util;
