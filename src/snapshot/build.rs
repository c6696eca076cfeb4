//! Construction of reported-variant snapshots from rendered reports.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::{
    annos::{resolve::latest_as_of, Scope, VariantIdentity},
    common::io::open_read_maybe_gz,
    conf::ReportingConfig,
    err::{ReportError, SnapshotFailure},
    hgvsp::normalize_hgvsp,
    schema::{
        annotation::AnnotationRecord,
        report::{Report, ReportFormat, ReportedVariantSnapshot, Sample},
        variant::VariantCallRecord,
    },
    snapshot::{
        extract::{extract_rows, ExtractedRow},
        store::{InsertOutcome, SnapshotStore},
    },
};

/// A sample together with its variant calls and the annotation log.
#[derive(Debug, Clone, Copy, derive_new::new)]
pub struct SampleInputs<'a> {
    pub sample: &'a Sample,
    /// Variant calls; calls of other samples are ignored.
    pub variants: &'a [VariantCallRecord],
    pub annotations: &'a [AnnotationRecord],
}

/// A report, or a row of a report, that could not be turned into a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotError {
    pub sample_oid: String,
    pub sample_name: String,
    pub report_oid: String,
    /// The offending row; `None` if the whole report failed.
    pub row: Option<ExtractedRow>,
    pub tier: Option<u16>,
    pub failure: SnapshotFailure,
}

/// Snapshots and failures of one build run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOutcome {
    pub snapshots: Vec<ReportedVariantSnapshot>,
    pub errors: Vec<SnapshotError>,
}

impl BuildOutcome {
    pub fn extend(&mut self, other: BuildOutcome) {
        self.snapshots.extend(other.snapshots);
        self.errors.extend(other.errors);
    }
}

/// Counters of `persist_outcome`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistStats {
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Builds snapshots for the reports of samples.
#[derive(Debug, Clone, Copy, derive_new::new)]
pub struct SnapshotBuilder<'a> {
    config: &'a ReportingConfig,
}

impl<'a> SnapshotBuilder<'a> {
    /// Build the snapshots of all reports of the sample.  Report paths are resolved
    /// relative to `base_dir` if given.
    pub fn build_sample(&self, inputs: SampleInputs, base_dir: Option<&Path>) -> BuildOutcome {
        let mut result = BuildOutcome::default();
        for report in &inputs.sample.reports {
            let outcome = match read_report(report, base_dir) {
                Ok(markup) => self.build_report(inputs, report, &markup),
                Err(err) => {
                    tracing::warn!(
                        "skipping report {} of sample {}: {}",
                        &report.id,
                        &inputs.sample.name,
                        &err
                    );
                    BuildOutcome {
                        snapshots: Vec::new(),
                        errors: vec![report_error(inputs.sample, report, err)],
                    }
                }
            };
            result.extend(outcome);
        }
        result
    }

    /// Build the snapshots of one report from its `markup`.
    pub fn build_report(
        &self,
        inputs: SampleInputs,
        report: &Report,
        markup: &str,
    ) -> BuildOutcome {
        let sample = inputs.sample;
        let mut result = BuildOutcome::default();

        let time_created = match report.time_created {
            Some(time_created) => time_created,
            None => {
                result.errors.push(report_error(
                    sample,
                    report,
                    ReportError::MissingMetadata("time_created"),
                ));
                return result;
            }
        };
        let extraction = match extract_rows(markup, self.config) {
            Ok(extraction) => extraction,
            Err(err) => {
                tracing::warn!("report {} yields no rows: {}", &report.id, &err);
                result.errors.push(report_error(sample, report, err));
                return result;
            }
        };

        for rejected in extraction.rejected {
            tracing::debug!("rejected row in report {}: {}", &report.id, &rejected.reason);
            result.errors.push(SnapshotError {
                sample_oid: sample.id.clone(),
                sample_name: sample.name.clone(),
                report_oid: report.id.clone(),
                failure: SnapshotFailure::UnknownClassification(
                    rejected.row.classification.clone(),
                ),
                row: Some(rejected.row),
                tier: None,
            });
        }

        let scope = Scope::new(
            &sample.assay,
            sample.subpanel.as_deref(),
            self.config.is_subpanel_scoped(&sample.assay),
        );
        let comment = sample.latest_visible_comment(time_created);
        for (row, tier) in extraction.rows {
            let variant = match find_variant(inputs, &row) {
                Some(variant) => variant,
                None => {
                    result.errors.push(SnapshotError {
                        sample_oid: sample.id.clone(),
                        sample_name: sample.name.clone(),
                        report_oid: report.id.clone(),
                        failure: SnapshotFailure::NoMatchingVariant {
                            gene: row.gene.clone(),
                            variant: row.variant.clone(),
                        },
                        row: Some(row),
                        tier: Some(tier),
                    });
                    continue;
                }
            };
            let (annotation_oid, annotation_text_oid) =
                annotations_at(variant, tier, inputs.annotations, &scope, time_created);
            let csq = variant.info.selected_csq.as_ref();
            result.snapshots.push(ReportedVariantSnapshot {
                sample_oid: sample.id.clone(),
                sample_name: sample.name.clone(),
                report_oid: report.id.clone(),
                report_id: report.report_id.clone(),
                simple_id: variant.simple_id(),
                var_oid: variant.id.clone(),
                tier,
                gene: row.gene,
                transcript: csq.and_then(|csq| csq.feature.clone()),
                hgvsp: csq.and_then(|csq| csq.short_hgvsp()),
                hgvsc: csq.and_then(|csq| csq.short_hgvsc()),
                annotation_oid,
                annotation_text_oid,
                sample_comment_oid: comment.map(|c| c.id.clone()),
                time_created,
            });
        }

        tracing::debug!(
            "report {} of sample {}: {} snapshots, {} errors",
            &report.id,
            &sample.name,
            result.snapshots.len(),
            result.errors.len()
        );
        result
    }
}

/// Read the rendered markup of `report`.
pub fn read_report(report: &Report, base_dir: Option<&Path>) -> Result<String, ReportError> {
    if report.format != ReportFormat::Html {
        return Err(ReportError::UnsupportedFormat(report.format.to_string()));
    }
    let filepath = report
        .filepath
        .as_deref()
        .ok_or(ReportError::MissingMetadata("filepath"))?;
    let path = match base_dir {
        Some(base_dir) => base_dir.join(filepath),
        None => Path::new(filepath).to_path_buf(),
    };
    let unreadable = |reason: String| ReportError::Unreadable {
        path: path.display().to_string(),
        reason,
    };
    let mut reader = open_read_maybe_gz(&path).map_err(|e| unreadable(e.to_string()))?;
    let mut markup = String::new();
    reader
        .read_to_string(&mut markup)
        .map_err(|e| unreadable(e.to_string()))?;
    Ok(markup)
}

fn report_error<E>(sample: &Sample, report: &Report, err: E) -> SnapshotError
where
    E: Into<SnapshotFailure>,
{
    SnapshotError {
        sample_oid: sample.id.clone(),
        sample_name: sample.name.clone(),
        report_oid: report.id.clone(),
        row: None,
        tier: None,
        failure: err.into(),
    }
}

/// The variant of the sample reported by `row`: same gene on the selected consequence
/// and the row text equal to its protein change, coding change, or simple id.
fn find_variant<'a>(
    inputs: SampleInputs<'a>,
    row: &ExtractedRow,
) -> Option<&'a VariantCallRecord> {
    inputs
        .variants
        .iter()
        .filter(|v| v.sample_id == inputs.sample.id)
        .filter(|v| v.selected_gene() == Some(row.gene.as_str()))
        .find(|v| {
            let csq = v.info.selected_csq.as_ref();
            csq.and_then(|csq| csq.short_hgvsp())
                .map(|hgvsp| normalize_hgvsp(&hgvsp) == row.variant)
                .unwrap_or(false)
                || csq.and_then(|csq| csq.short_hgvsc()).as_deref() == Some(row.variant.as_str())
                || v.simple_id() == row.variant
        })
}

/// Ids of the tier annotation backing `tier` and of the free-text annotation that were in
/// effect for `variant` at `as_of`.
fn annotations_at(
    variant: &VariantCallRecord,
    tier: u16,
    annotations: &[AnnotationRecord],
    scope: &Scope,
    as_of: DateTime<Utc>,
) -> (Option<String>, Option<String>) {
    let identity = match VariantIdentity::of_record(variant) {
        Some(identity) => identity,
        None => return (None, None),
    };
    let tier_annotation = latest_as_of(annotations, as_of, |a| {
        identity.matches(a) && scope.contains(a) && a.class() == Some(tier)
    });
    let text_annotation = latest_as_of(annotations, as_of, |a| {
        identity.matches(a) && scope.contains(a) && a.text().is_some()
    });
    (
        tier_annotation.map(|a| a.id.clone()),
        text_annotation.map(|a| a.id.clone()),
    )
}

/// Insert all snapshots of `outcome` into `store`.  Rows that the store rejects are
/// appended to the returned errors.
pub fn persist_outcome<S: SnapshotStore + ?Sized>(
    outcome: BuildOutcome,
    store: &mut S,
) -> (PersistStats, Vec<SnapshotError>) {
    let mut stats = PersistStats::default();
    let mut errors = outcome.errors;
    for snapshot in outcome.snapshots {
        let sample_oid = snapshot.sample_oid.clone();
        let sample_name = snapshot.sample_name.clone();
        let report_oid = snapshot.report_oid.clone();
        let tier = snapshot.tier;
        match store.insert(snapshot) {
            Ok(InsertOutcome::Inserted) => stats.inserted += 1,
            Ok(InsertOutcome::Duplicate) => stats.duplicates += 1,
            Err(err) => {
                tracing::warn!("could not persist snapshot: {}", &err);
                stats.failed += 1;
                errors.push(SnapshotError {
                    sample_oid,
                    sample_name,
                    report_oid,
                    row: None,
                    tier: Some(tier),
                    failure: err.into(),
                });
            }
        }
    }
    (stats, errors)
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        schema::{
            annotation::{test::record, AnnotationBody},
            report::SampleComment,
            variant::test::example_record,
        },
        snapshot::store::MemorySnapshotStore,
    };

    fn day(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0)
            .single()
            .expect("valid date")
    }

    fn variants() -> Vec<VariantCallRecord> {
        let mut tp53 = example_record();
        tp53.info.selected_csq = Some(tp53.info.csq[0].clone());

        let mut flt3 = example_record();
        flt3.id = "var-2".into();
        flt3.chrom = "chr13".into();
        flt3.pos = 28608250;
        flt3.alternative = "CTTTGAGACTTCTTCTGCAGACATGCTCCCA".into();
        let mut csq = flt3.info.csq[0].clone();
        csq.symbol = Some("FLT3".into());
        csq.feature = Some("ENST00000241453.12".into());
        csq.hgvsc = Some("ENST00000241453.12:c.1772_1773ins30".into());
        csq.hgvsp = None;
        flt3.info.csq = vec![csq.clone()];
        flt3.info.selected_csq = Some(csq);

        let mut other_sample = tp53.clone();
        other_sample.id = "var-3".into();
        other_sample.sample_id = "sample-2".into();
        other_sample.info.selected_csq.as_mut().expect("set").symbol = Some("KRAS".into());
        other_sample.info.selected_csq.as_mut().expect("set").hgvsp =
            Some("ENSP00000256078.4:p.Gly12Asp".into());

        vec![tp53, flt3, other_sample]
    }

    fn sample() -> Sample {
        Sample {
            id: "sample-1".into(),
            name: "S1".into(),
            assay: "myeloid".into(),
            subpanel: None,
            comments: vec![
                SampleComment {
                    id: "c-old".into(),
                    text: "first".into(),
                    author: "reviewer".into(),
                    time_created: day(2),
                    hidden: false,
                },
                SampleComment {
                    id: "c-hidden".into(),
                    text: "withdrawn".into(),
                    author: "reviewer".into(),
                    time_created: day(3),
                    hidden: true,
                },
                SampleComment {
                    id: "c-late".into(),
                    text: "after the report".into(),
                    author: "reviewer".into(),
                    time_created: day(20),
                    hidden: false,
                },
            ],
            reports: vec![Report::new(
                "report-1".into(),
                Some("S1.1".into()),
                Some("report.html".into()),
                "reviewer".into(),
                Some(day(10)),
                ReportFormat::Html,
            )],
        }
    }

    fn annotations() -> Vec<AnnotationRecord> {
        vec![
            record("tier-1-old", "myeloid", None, AnnotationBody::Class(1), 1),
            record("tier-2", "myeloid", None, AnnotationBody::Class(2), 4),
            record("tier-1", "myeloid", None, AnnotationBody::Class(1), 5),
            record("tier-1-late", "myeloid", None, AnnotationBody::Class(1), 15),
            record("text", "myeloid", None, AnnotationBody::Text("hotspot".into()), 6),
            record("text-late", "myeloid", None, AnnotationBody::Text("later".into()), 12),
            record("tier-1-solid", "solid", Some("A"), AnnotationBody::Class(1), 7),
        ]
    }

    fn build() -> BuildOutcome {
        let config = ReportingConfig::default();
        let sample = sample();
        let variants = variants();
        let annotations = annotations();

        SnapshotBuilder::new(&config).build_sample(
            SampleInputs::new(&sample, &variants, &annotations),
            Some(Path::new("tests/snapshot")),
        )
    }

    #[test]
    fn build_sample_from_report() {
        let outcome = build();

        assert_eq!(
            outcome
                .snapshots
                .iter()
                .map(|s| (s.simple_id.as_str(), s.gene.as_str(), s.tier))
                .collect::<Vec<_>>(),
            vec![
                ("17_7577120_C_T", "TP53", 1),
                ("13_28608250_C_CTTTGAGACTTCTTCTGCAGACATGCTCCCA", "FLT3", 2),
            ]
        );
        let tp53 = &outcome.snapshots[0];
        assert_eq!(tp53.report_id.as_deref(), Some("S1.1"));
        assert_eq!(tp53.var_oid, "var-1");
        assert_eq!(tp53.hgvsp.as_deref(), Some("p.Arg273His"));
        assert_eq!(tp53.time_created, day(10));
    }

    #[test]
    fn build_uses_state_at_report_time() {
        let outcome = build();
        let tp53 = &outcome.snapshots[0];

        assert_eq!(tp53.annotation_oid.as_deref(), Some("tier-1"));
        assert_eq!(tp53.annotation_text_oid.as_deref(), Some("text"));
        assert_eq!(tp53.sample_comment_oid.as_deref(), Some("c-old"));
    }

    #[test]
    fn unmatched_and_unknown_rows_are_reported() {
        let outcome = build();

        let failures = outcome
            .errors
            .iter()
            .map(|e| (e.row.as_ref().map(|r| r.gene.as_str()), e.failure.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            failures,
            vec![
                (
                    Some("NRAS"),
                    SnapshotFailure::UnknownClassification("Okänd".into())
                ),
                (
                    Some("KRAS"),
                    SnapshotFailure::NoMatchingVariant {
                        gene: "KRAS".into(),
                        variant: "p.Gly12Asp".into(),
                    }
                ),
            ]
        );
    }

    #[test]
    fn report_level_failures() {
        let config = ReportingConfig::default();
        let mut sample = sample();
        let mut pdf = sample.reports[0].clone();
        pdf.id = "report-pdf".into();
        pdf.format = ReportFormat::Pdf;
        let mut missing = sample.reports[0].clone();
        missing.id = "report-missing".into();
        missing.filepath = Some("does-not-exist.html".into());
        let mut untimed = sample.reports[0].clone();
        untimed.id = "report-untimed".into();
        untimed.time_created = None;
        sample.reports = vec![pdf, missing, untimed];

        let outcome = SnapshotBuilder::new(&config).build_sample(
            SampleInputs::new(&sample, &[], &[]),
            Some(Path::new("tests/snapshot")),
        );

        assert!(outcome.snapshots.is_empty());
        assert_eq!(outcome.errors.len(), 3);
        assert_eq!(
            outcome.errors[0].failure,
            SnapshotFailure::Report(ReportError::UnsupportedFormat("pdf".into()))
        );
        assert!(matches!(
            outcome.errors[1].failure,
            SnapshotFailure::Report(ReportError::Unreadable { .. })
        ));
        assert_eq!(
            outcome.errors[2].failure,
            SnapshotFailure::Report(ReportError::MissingMetadata("time_created"))
        );
    }

    #[test]
    fn persist_is_idempotent() {
        let mut store = MemorySnapshotStore::default();

        let (first, errors) = persist_outcome(build(), &mut store);
        assert_eq!(
            first,
            PersistStats {
                inserted: 2,
                duplicates: 0,
                failed: 0
            }
        );
        assert_eq!(errors.len(), 2);

        let (second, _) = persist_outcome(build(), &mut store);
        assert_eq!(
            second,
            PersistStats {
                inserted: 0,
                duplicates: 2,
                failed: 0
            }
        );
        assert_eq!(store.len(), 2);
    }

    #[test]
    #[tracing_test::traced_test]
    fn missing_report_is_logged() {
        let config = ReportingConfig::default();
        let mut sample = sample();
        sample.reports[0].filepath = None;

        let outcome = SnapshotBuilder::new(&config)
            .build_sample(SampleInputs::new(&sample, &[], &[]), None);

        assert_eq!(outcome.errors.len(), 1);
        assert!(logs_contain("skipping report report-1 of sample S1"));
    }
}
