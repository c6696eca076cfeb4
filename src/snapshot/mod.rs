//! Code implementing the "snapshot build" sub command.

pub mod build;
pub mod extract;
pub mod store;

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use thousands::Separable;

use crate::{
    annos::read_annotation_log,
    common::io::{open_write_maybe_gz, read_json, read_jsonl, write_jsonl},
    conf::ReportingConfig,
    schema::{
        report::{ReportedVariantSnapshot, Sample},
        variant::VariantCallRecord,
    },
};

pub use self::build::{
    persist_outcome, BuildOutcome, PersistStats, SampleInputs, SnapshotBuilder, SnapshotError,
};
pub use self::store::{InsertOutcome, MemorySnapshotStore, SnapshotStore};

/// One line of the error TSV file.
#[derive(Debug, serde::Serialize)]
struct ErrorRow<'a> {
    sample_oid: &'a str,
    sample_name: &'a str,
    report_oid: &'a str,
    gene: Option<&'a str>,
    mutation: Option<&'a str>,
    classification: Option<&'a str>,
    tier: Option<u16>,
    reason: String,
}

impl<'a> From<&'a SnapshotError> for ErrorRow<'a> {
    fn from(err: &'a SnapshotError) -> Self {
        Self {
            sample_oid: &err.sample_oid,
            sample_name: &err.sample_name,
            report_oid: &err.report_oid,
            gene: err.row.as_ref().map(|r| r.gene.as_str()),
            mutation: err.row.as_ref().map(|r| r.mutation.as_str()),
            classification: err.row.as_ref().map(|r| r.classification.as_str()),
            tier: err.tier,
            reason: err.failure.to_string(),
        }
    }
}

/// Write `errors` as tab-separated values with header to `writer`.
pub fn write_errors<W: Write>(writer: W, errors: &[SnapshotError]) -> Result<(), anyhow::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_writer(writer);
    for err in errors {
        writer.serialize(ErrorRow::from(err))?;
    }
    writer.flush()?;
    Ok(())
}

/// Command line arguments for `snapshot build` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Build reported-variant snapshots", long_about = None)]
pub struct Args {
    /// Path to the reporting configuration JSON; built-in defaults if omitted.
    #[arg(long)]
    pub path_config: Option<String>,
    /// Path to the JSON array of samples with their reports and comments.
    #[arg(long)]
    pub path_samples: String,
    /// Path to the JSONL file with variant call records, consequences selected.
    #[arg(long)]
    pub path_variants: String,
    /// Path to the JSONL file with the annotation log.
    #[arg(long)]
    pub path_annotations: String,
    /// Directory that report file paths are relative to.
    #[arg(long)]
    pub base_dir: Option<PathBuf>,
    /// Snapshots of earlier runs; rows of this run with the same key are skipped.
    #[arg(long)]
    pub path_existing: Option<String>,
    /// Path to the output JSONL file with all snapshots.
    #[arg(long)]
    pub path_output: String,
    /// Path to the output TSV file with rows that could not be snapshotted.
    #[arg(long)]
    pub path_errors: String,
}

/// Main entry point for `snapshot build` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let config = match &args.path_config {
        Some(path) => ReportingConfig::load(path)?,
        None => ReportingConfig::default(),
    };

    tracing::info!("Loading samples, variants, and annotations...");
    let samples: Vec<Sample> = read_json(&args.path_samples)?;
    let variants: Vec<VariantCallRecord> = read_jsonl(&args.path_variants)?;
    let annotations = read_annotation_log(&args.path_annotations)?;
    tracing::info!(
        "... loaded {} samples, {} variants, and {} annotations",
        samples.len().separate_with_commas(),
        variants.len().separate_with_commas(),
        annotations.len().separate_with_commas()
    );

    let mut store = match &args.path_existing {
        Some(path) => {
            let existing: Vec<ReportedVariantSnapshot> = read_jsonl(path)?;
            MemorySnapshotStore::with_rows(existing)
        }
        None => MemorySnapshotStore::default(),
    };
    tracing::info!(
        "starting from {} existing snapshots",
        store.len().separate_with_commas()
    );

    let builder = SnapshotBuilder::new(&config);
    let base_dir = args.base_dir.as_deref();
    let mut outcome = BuildOutcome::default();
    for sample in &samples {
        outcome.extend(
            builder.build_sample(SampleInputs::new(sample, &variants, &annotations), base_dir),
        );
    }
    let (stats, errors) = persist_outcome(outcome, &mut store);
    tracing::info!(
        "summary: {} inserted, {} already present, {} failed, {} errors",
        stats.inserted.separate_with_commas(),
        stats.duplicates.separate_with_commas(),
        stats.failed.separate_with_commas(),
        errors.len().separate_with_commas()
    );

    let rows = store.rows().cloned().collect::<Vec<_>>();
    let mut writer = open_write_maybe_gz(&args.path_output)?;
    write_jsonl(&mut writer, &rows)?;
    write_errors(
        open_write_maybe_gz(&args.path_errors).map_err(|e| {
            anyhow::anyhow!("Cannot open {:?} for writing: {:?}", &args.path_errors, e)
        })?,
        &errors,
    )?;

    tracing::info!(
        "All of `snapshot build` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::err::SnapshotFailure;

    #[test]
    fn write_errors_as_tsv() -> Result<(), anyhow::Error> {
        let errors = vec![SnapshotError {
            sample_oid: "sample-1".into(),
            sample_name: "S1".into(),
            report_oid: "report-1".into(),
            row: None,
            tier: None,
            failure: SnapshotFailure::UnknownClassification("Okänd".into()),
        }];
        let mut buf = Vec::new();

        write_errors(&mut buf, &errors)?;

        assert_eq!(
            String::from_utf8(buf)?,
            "sample_oid\tsample_name\treport_oid\tgene\tmutation\tclassification\ttier\treason\n\
             sample-1\tS1\treport-1\t\t\t\t\t\"unknown classification \"\"Okänd\"\"\"\n"
        );

        Ok(())
    }

    /// Write the inputs of a run over `tests/snapshot/report.html` into `dir`.
    fn smoke_args(dir: &std::path::Path, annotations: &str) -> Result<Args, anyhow::Error> {
        let mut variant = crate::schema::variant::test::example_record();
        variant.info.selected_csq = Some(variant.info.csq[0].clone());
        let path_variants = dir.join("variants.jsonl");
        write_jsonl(&mut std::fs::File::create(&path_variants)?, &[variant])?;
        let path_annotations = dir.join("annotations.jsonl");
        std::fs::write(&path_annotations, annotations)?;
        let path_samples = dir.join("samples.json");
        std::fs::write(
            &path_samples,
            serde_json::to_string(&serde_json::json!([{
                "_id": "sample-1",
                "name": "S1",
                "assay": "myeloid",
                "reports": [{
                    "_id": "report-1",
                    "report_id": "S1.1",
                    "filepath": "report.html",
                    "time_created": "2024-01-10T12:00:00Z"
                }]
            }]))?,
        )?;

        Ok(Args {
            path_config: None,
            path_samples: path_samples.display().to_string(),
            path_variants: path_variants.display().to_string(),
            path_annotations: path_annotations.display().to_string(),
            base_dir: Some(PathBuf::from("tests/snapshot")),
            path_existing: None,
            path_output: dir.join("out.jsonl").display().to_string(),
            path_errors: dir.join("errors.tsv").display().to_string(),
        })
    }

    #[test]
    fn run_smoke() -> Result<(), anyhow::Error> {
        let tmpdir = tempfile::tempdir()?;
        let args = smoke_args(tmpdir.path(), "")?;
        run(&crate::common::Args::default(), &args)?;

        let snapshots: Vec<ReportedVariantSnapshot> = read_jsonl(&args.path_output)?;
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].simple_id, "17_7577120_C_T");
        let errors = std::fs::read_to_string(&args.path_errors)?;
        // header plus FLT3, NRAS, and KRAS rows
        assert_eq!(errors.lines().count(), 4);

        // re-running on the output changes nothing
        let rerun = Args {
            path_existing: Some(args.path_output.clone()),
            path_output: tmpdir.path().join("out2.jsonl").display().to_string(),
            ..args
        };
        run(&crate::common::Args::default(), &rerun)?;
        let rerun_snapshots: Vec<ReportedVariantSnapshot> = read_jsonl(&rerun.path_output)?;
        assert_eq!(rerun_snapshots, snapshots);

        Ok(())
    }

    #[test]
    fn run_skips_invalid_annotation_records() -> Result<(), anyhow::Error> {
        let tmpdir = tempfile::tempdir()?;
        let annotations = [
            serde_json::json!({
                "_id": "good",
                "gene": "TP53",
                "variant": "p.Arg273His",
                "nomenclature": "p",
                "assay": "myeloid",
                "time_created": "2024-01-02T12:00:00Z",
                "class": 1
            }),
            serde_json::json!({
                "_id": "bad",
                "gene": "TP53",
                "variant": "p.Arg273His",
                "nomenclature": "p",
                "assay": "myeloid",
                "time_created": "2024-01-03T12:00:00Z",
                "class": 999
            }),
        ]
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("\n");
        let args = smoke_args(tmpdir.path(), &annotations)?;

        run(&crate::common::Args::default(), &args)?;

        let snapshots: Vec<ReportedVariantSnapshot> = read_jsonl(&args.path_output)?;
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].annotation_oid.as_deref(), Some("good"));

        Ok(())
    }
}
