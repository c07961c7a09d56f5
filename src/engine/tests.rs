use serde_json::json;

use super::*;

fn counts(entries: &[(&str, u64)]) -> CountMap {
    entries
        .iter()
        .map(|(name, count)| (name.to_string(), *count))
        .collect()
}

fn snapshot(source: &[(&str, u64)], target: &[(&str, u64)]) -> EntityCountSnapshot {
    EntityCountSnapshot::new(counts(source), counts(target))
}

fn run(snapshot: &EntityCountSnapshot, report: Option<&RunReport>) -> MigrationSummary {
    summarize(
        Some(snapshot),
        report,
        &CorrespondenceTable::synthea_to_omop(),
        &EngineConfig::default(),
    )
    .expect("summary should compose")
}

fn row<'a>(summary: &'a MigrationSummary, label: &str) -> &'a ReconciliationRow {
    summary
        .rows
        .iter()
        .find(|row| row.label == label)
        .unwrap_or_else(|| panic!("row {label} should exist"))
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-12,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn matching_patient_counts_are_exact_with_full_success() {
    let summary = run(&snapshot(&[("patients", 30)], &[("person", 30)]), None);

    assert_eq!(row(&summary, "patients").classification, Classification::Exact);
    assert_eq!(summary.metrics.success_rate, 1.0);
    assert_eq!(summary.metrics.success_rate_tier, SuccessRateTier::Derived);
    assert!(summary.assessment.subjects_preserved);
}

#[test]
fn missing_persons_lower_the_derived_success_rate() {
    let summary = run(&snapshot(&[("patients", 30)], &[("person", 28)]), None);

    assert_eq!(
        row(&summary, "patients").classification,
        Classification::Discrepant
    );
    assert_close(summary.metrics.success_rate, 28.0 / 30.0);
    assert!(summary.assessment.success_meets_target);
    assert!(!summary.assessment.subjects_preserved);
}

#[test]
fn split_observations_sum_their_targets() {
    let summary = run(
        &snapshot(
            &[("observations", 50)],
            &[("measurement", 20), ("observation", 30)],
        ),
        None,
    );

    let observations = row(&summary, "observations");
    assert_eq!(observations.target_count, 50);
    assert_eq!(observations.classification, Classification::Transformed);
    assert_eq!(observations.delta, 0);
}

#[test]
fn rows_serialize_their_signed_delta() {
    let summary = run(&snapshot(&[("patients", 30)], &[("person", 28)]), None);

    let patients = row(&summary, "patients");
    assert_eq!(patients.delta, -2);
    let value = serde_json::to_value(patients).expect("row should serialize");
    assert_eq!(value["delta"], -2);
}

#[test]
fn concept_mapping_rate_is_the_mean_of_reported_rates() {
    let report = RunReport::from_value(&json!({
        "validation_results": {
            "concept_coverage": {
                "conditions": { "mapped_rate": 0.467 },
                "drugs": { "mapped_rate": 0.88 }
            }
        }
    }));

    let summary = run(&snapshot(&[("patients", 30)], &[("person", 30)]), Some(&report));

    assert_close(summary.metrics.concept_mapping_rate, 0.6735);
    assert_eq!(summary.metrics.concept_mapping_source, MetricSource::Reported);
    assert_eq!(
        summary
            .concept_breakdown
            .iter()
            .map(|row| (row.field.as_str(), row.meets_target))
            .collect::<Vec<_>>(),
        vec![("conditions", Some(false)), ("drugs", Some(false))]
    );
}

#[test]
fn empty_snapshot_falls_back_to_default_success_rate() {
    let summary = run(&EntityCountSnapshot::default(), None);

    assert!(
        summary
            .rows
            .iter()
            .all(|row| row.classification == Classification::NoData)
    );
    assert_eq!(summary.metrics.success_rate, 0.95);
    assert_eq!(summary.metrics.success_rate_tier, SuccessRateTier::Default);
    assert_eq!(summary.metrics.concept_mapping_rate, 0.92);
    assert_eq!(summary.metrics.processing_seconds, 180.0);
    assert!(!summary.metrics.target_connected);
    assert_eq!(summary.availability, DataAvailability::Empty);
    assert_eq!(summary.totals.efficiency, None);
}

#[test]
fn target_counts_equal_the_sum_of_declared_targets() {
    let snapshot = snapshot(
        &[
            ("patients", 12),
            ("observations", 40),
            ("organizations", 3),
            ("allergies", 4),
        ],
        &[
            ("person", 12),
            ("measurement", 25),
            ("observation", 19),
            ("care_site", 3),
            ("unrelated", 999),
        ],
    );
    let table = CorrespondenceTable::synthea_to_omop();

    for row in reconcile(&snapshot, &table) {
        let expected = row
            .target_entities
            .iter()
            .map(|entity| snapshot.target_count(entity))
            .sum::<u64>();
        assert_eq!(row.target_count, expected, "row {}", row.label);
        assert_eq!(
            row.classification == Classification::NoData,
            row.source_count == 0,
            "row {}",
            row.label
        );
    }
}

#[test]
fn classification_follows_declared_kind() {
    assert_eq!(
        classify(CorrespondenceKind::OneToOne, 0, 0),
        Classification::NoData
    );
    assert_eq!(
        classify(CorrespondenceKind::OneToOne, 7, 7),
        Classification::Exact
    );
    assert_eq!(
        classify(CorrespondenceKind::OneToOne, 7, 9),
        Classification::Discrepant
    );
    assert_eq!(
        classify(CorrespondenceKind::Split, 7, 7),
        Classification::Transformed
    );
    assert_eq!(
        classify(CorrespondenceKind::Merge, 4, 0),
        Classification::Discrepant
    );
    assert_eq!(
        classify(CorrespondenceKind::Merge, 4, 3),
        Classification::Transformed
    );
}

#[test]
fn duplicated_targets_never_exceed_full_success() {
    let summary = run(&snapshot(&[("patients", 10)], &[("person", 1_000)]), None);

    assert_eq!(summary.metrics.success_rate, 1.0);
    assert_eq!(
        row(&summary, "patients").classification,
        Classification::Discrepant
    );
}

#[test]
fn measured_success_rate_takes_priority() {
    let report = RunReport::from_value(&json!({
        "validation_results": { "summary": { "overall_success_rate": 0.81 } }
    }));

    let summary = run(&snapshot(&[("patients", 30)], &[("person", 30)]), Some(&report));

    assert_eq!(summary.metrics.success_rate, 0.81);
    assert_eq!(summary.metrics.success_rate_tier, SuccessRateTier::Measured);
    assert!(!summary.assessment.success_meets_target);
}

#[test]
fn out_of_range_success_rate_is_ignored() {
    let report = RunReport::from_value(&json!({
        "validation_results": { "summary": { "overall_success_rate": 1.7 } }
    }));

    let summary = run(&snapshot(&[("patients", 20)], &[("person", 15)]), Some(&report));

    assert_eq!(summary.metrics.success_rate_tier, SuccessRateTier::Derived);
    assert_close(summary.metrics.success_rate, 0.75);
    assert!(summary.report_issues.iter().any(|issue| {
        issue.is_malformed() && issue.path() == "validation_results.summary.overall_success_rate"
    }));
}

#[test]
fn malformed_and_missing_mapped_rates_are_skipped() {
    let report = RunReport::from_value(&json!({
        "validation_results": {
            "concept_coverage": {
                "conditions": { "mapped_rate": 0.5 },
                "drugs": { "mapped_rate": "high" },
                "procedures": { "unmapped": 3 },
                "visits": 0.9,
                "measurements": { "mapped_rate": 1.0 }
            }
        }
    }));

    assert_eq!(report.mapped_rates(), vec![0.5, 1.0]);
    let (rate, source) = concept_mapping_rate(Some(&report), &EngineConfig::default());
    assert_close(rate, 0.75);
    assert_eq!(source, MetricSource::Reported);
    assert_eq!(
        report
            .issues
            .iter()
            .filter(|issue| issue.is_malformed())
            .count(),
        2
    );
}

#[test]
fn coverage_without_any_rate_uses_default() {
    let report = RunReport::from_value(&json!({
        "validation_results": { "concept_coverage": { "conditions": { "total": 10 } } }
    }));

    let (rate, source) = concept_mapping_rate(Some(&report), &EngineConfig::default());
    assert_eq!(rate, 0.92);
    assert_eq!(source, MetricSource::Default);
}

#[test]
fn processing_seconds_sum_phase_durations() {
    let report = RunReport::from_value(&json!({
        "phase_performance": {
            "extract": { "duration_seconds": 40.5 },
            "transform": { "duration_seconds": 100 },
            "load": { "rows": 12 },
            "validate": { "duration_seconds": 4.5 }
        }
    }));

    let summary = run(&snapshot(&[("patients", 1)], &[("person", 1)]), Some(&report));

    assert_eq!(summary.metrics.processing_seconds, 145.0);
    assert_eq!(summary.metrics.processing_source, MetricSource::Reported);
    assert_eq!(summary.processing_display, "2m 25s");
}

#[test]
fn overflowing_phase_total_uses_default_duration() {
    let report = RunReport::from_value(&json!({
        "phase_performance": {
            "extract": { "duration_seconds": 1.0e308 },
            "load": { "duration_seconds": 1.0e308 }
        }
    }));

    assert_eq!(
        processing_seconds(Some(&report), &EngineConfig::default()),
        (180.0, MetricSource::Default)
    );

    let summary = run(&snapshot(&[("patients", 1)], &[("person", 1)]), Some(&report));
    let value = serde_json::to_value(&summary).expect("summary should serialize");
    assert_eq!(value["metrics"]["processing_seconds"], 180.0);
    assert_eq!(summary.processing_display, "3m 0s");
}

#[test]
fn zero_phase_total_uses_default_duration() {
    let config = EngineConfig::default();
    let empty = RunReport::from_value(&json!({ "phase_performance": {} }));
    let zero = RunReport::from_value(&json!({
        "phase_performance": { "extract": { "duration_seconds": 0 } }
    }));

    assert_eq!(
        processing_seconds(Some(&empty), &config),
        (180.0, MetricSource::Default)
    );
    assert_eq!(
        processing_seconds(Some(&zero), &config),
        (180.0, MetricSource::Default)
    );
    assert_eq!(
        processing_seconds(None, &config),
        (180.0, MetricSource::Default)
    );
}

#[test]
fn partial_report_records_absent_sections() {
    let report = RunReport::from_value(&json!({ "pipeline": "synthea" }));

    assert_eq!(report, RunReport {
        issues: vec![
            ReportIssue::SectionAbsent {
                path: "validation_results".to_string()
            },
            ReportIssue::SectionAbsent {
                path: "phase_performance".to_string()
            },
        ],
        ..RunReport::default()
    });
}

#[test]
fn non_object_report_is_treated_as_absent() {
    let report = RunReport::from_slice(b"[1, 2, 3]").expect("valid json should parse");

    assert_eq!(report.overall_success_rate, None);
    assert_eq!(report.phase_durations, None);
    assert_eq!(report.concept_coverage, None);
    assert!(report.issues[0].is_malformed());
}

#[test]
fn target_connected_ignores_undeclared_targets() {
    let table = CorrespondenceTable::synthea_to_omop();

    let stray = snapshot(&[("patients", 3)], &[("cohort", 3)]);
    assert!(!target_connected(&stray, &table));

    let connected = snapshot(&[], &[("location", 1)]);
    assert!(target_connected(&connected, &table));
}

#[test]
fn availability_reports_source_only_runs() {
    let summary = run(&snapshot(&[("patients", 5)], &[]), None);

    assert_eq!(summary.availability, DataAvailability::SourceOnly);
    assert_eq!(summary.metrics.success_rate, 0.0);
    assert_eq!(summary.metrics.success_rate_tier, SuccessRateTier::Derived);
}

#[test]
fn totals_cover_flagged_correspondences_only() {
    let summary = run(
        &snapshot(
            &[
                ("patients", 10),
                ("encounters", 40),
                ("observations", 500),
            ],
            &[
                ("person", 10),
                ("visit_occurrence", 30),
                ("observation_period", 10),
                ("measurement", 500),
            ],
        ),
        None,
    );

    assert_eq!(summary.totals.source_total, 50);
    assert_eq!(summary.totals.target_total, 40);
    assert_eq!(summary.totals.efficiency, Some(0.8));
}

#[test]
fn missing_snapshot_is_a_hard_failure() {
    let error = summarize(
        None,
        None,
        &CorrespondenceTable::synthea_to_omop(),
        &EngineConfig::default(),
    )
    .expect_err("missing snapshot must not produce a summary");

    assert_eq!(error, EngineError::MissingInput {
        side: SnapshotSide::Source
    });
    assert!(error.to_string().contains("no data available"));
}

#[test]
fn snapshot_sides_must_both_be_present() {
    let error = EntityCountSnapshot::from_sides(Some(counts(&[("patients", 1)])), None)
        .expect_err("target side is missing");
    assert_eq!(error, EngineError::MissingInput {
        side: SnapshotSide::Target
    });

    let empty = EntityCountSnapshot::from_sides(Some(CountMap::new()), Some(CountMap::new()))
        .expect("empty sides are valid");
    assert_eq!(empty.source_count("patients"), 0);
}

#[test]
fn identical_inputs_give_identical_summaries() {
    let snapshot = snapshot(
        &[("patients", 30), ("conditions", 12)],
        &[("person", 29), ("condition_occurrence", 12)],
    );
    let report = RunReport::from_value(&json!({
        "phase_performance": { "load": { "duration_seconds": 12.25 } },
        "validation_results": { "concept_coverage": { "conditions": { "mapped_rate": 0.4 } } }
    }));

    let first = run(&snapshot, Some(&report));
    let second = run(&snapshot, Some(&report));

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("summary serializes"),
        serde_json::to_string(&second).expect("summary serializes")
    );
}

#[test]
fn unresolved_entities_are_disclosed_without_changing_counts() {
    let snapshot = snapshot(&[("patients", 2)], &[("person", 2)])
        .with_unresolved(vec!["allergies".to_string()], vec!["location".to_string()]);

    let summary = run(&snapshot, None);

    assert_eq!(summary.unresolved_source, vec!["allergies".to_string()]);
    assert_eq!(summary.unresolved_target, vec!["location".to_string()]);
    assert_eq!(row(&summary, "allergies").classification, Classification::NoData);
}

#[test]
fn default_table_validates() {
    CorrespondenceTable::synthea_to_omop()
        .validate()
        .expect("built-in table should be valid");
}

#[test]
fn table_rejects_split_anchor_and_bad_shapes() {
    let mut table = CorrespondenceTable::synthea_to_omop();
    table.anchor = "observations".to_string();
    assert!(matches!(
        table.validate(),
        Err(EngineError::InvalidCorrespondence(message)) if message.contains("one_to_one")
    ));

    let mut table = CorrespondenceTable::synthea_to_omop();
    table.correspondences[1].targets.push("visit_detail".to_string());
    assert!(table.validate().is_err());

    let mut table = CorrespondenceTable::synthea_to_omop();
    table.correspondences[2].label = "patients".to_string();
    assert!(table.validate().is_err());
}

#[test]
fn config_rejects_out_of_range_defaults() {
    let config = EngineConfig {
        default_success_rate: 1.2,
        ..EngineConfig::default()
    };
    let error = summarize(
        Some(&EntityCountSnapshot::default()),
        None,
        &CorrespondenceTable::synthea_to_omop(),
        &config,
    )
    .expect_err("out of range default must be rejected");

    assert!(matches!(error, EngineError::InvalidConfig(_)));
}

#[test]
fn duration_display_uses_whole_minutes_and_seconds() {
    assert_eq!(format_duration(180.0), "3m 0s");
    assert_eq!(format_duration(185.9), "3m 5s");
    assert_eq!(format_duration(0.0), "0m 0s");
}
