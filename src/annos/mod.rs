//! Code implementing the "annos resolve" sub command.

pub mod resolve;

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use clap::Parser;
use thousands::Separable;

use crate::{
    common::io::{open_write_maybe_gz, read_json, read_jsonl, write_jsonl},
    conf::ReportingConfig,
    csq::{attach_selected, CanonicalTranscripts},
    schema::{
        annotation::{AnnotationRecord, RawAnnotationRecord, UNCLASSIFIED},
        variant::VariantCallRecord,
    },
};

pub use self::resolve::{
    attach_additional_classification, get_additional_classifications, resolve_annotations,
    ClassificationResolution, Scope, VariantIdentity,
};

/// A variant together with its resolved annotations, as written by `annos resolve`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ResolvedVariant {
    pub simple_id: String,
    pub identity: Option<VariantIdentity>,
    pub tier: u16,
    pub resolution: ClassificationResolution,
    pub variant: VariantCallRecord,
}

/// Load the annotation log from a JSONL file.
///
/// Records that cannot be decoded or that fail validation are logged and skipped.
pub fn read_annotation_log<P>(path: P) -> Result<Vec<AnnotationRecord>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let values: Vec<serde_json::Value> = read_jsonl(path.as_ref())?;
    let mut result = Vec::with_capacity(values.len());
    for (idx, value) in values.into_iter().enumerate() {
        let record = serde_json::from_value::<RawAnnotationRecord>(value)
            .map_err(anyhow::Error::from)
            .and_then(|raw| AnnotationRecord::try_from(raw).map_err(anyhow::Error::from));
        match record {
            Ok(record) => result.push(record),
            Err(e) => tracing::warn!(
                "skipping annotation record #{} of {:?}: {}",
                idx + 1,
                path.as_ref(),
                e
            ),
        }
    }
    Ok(result)
}

/// Resolve all `records` for `scope`; records without selected consequence are reported
/// as unclassified.
pub fn resolve_all(
    records: Vec<VariantCallRecord>,
    annotations: &[AnnotationRecord],
    scope: &Scope,
) -> Vec<ResolvedVariant> {
    records
        .into_iter()
        .map(|mut variant| {
            attach_additional_classification(&mut variant, annotations, scope);
            let identity = VariantIdentity::of_record(&variant);
            let resolution = match &identity {
                Some(identity) => resolve_annotations(identity, annotations, scope),
                None => ClassificationResolution::default(),
            };
            ResolvedVariant {
                simple_id: variant.simple_id(),
                tier: resolution.current_tier(),
                identity,
                resolution,
                variant,
            }
        })
        .collect()
}

/// Command line arguments for `annos resolve` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Resolve variant annotations", long_about = None)]
pub struct Args {
    /// Path to the reporting configuration JSON; built-in defaults if omitted.
    #[arg(long)]
    pub path_config: Option<String>,
    /// Optional JSON object of canonical transcripts; if given, consequences are
    /// (re-)selected before resolution.
    #[arg(long)]
    pub path_canonical: Option<String>,
    /// Path to the input JSONL file with variant call records.
    #[arg(long)]
    pub path_variants: String,
    /// Path to the JSONL file with the annotation log.
    #[arg(long)]
    pub path_annotations: String,
    /// Assay to resolve for.
    #[arg(long)]
    pub assay: String,
    /// Subpanel to resolve for, only used by subpanel-scoped assays.
    #[arg(long)]
    pub subpanel: Option<String>,
    /// Path to the output JSONL file.
    #[arg(long)]
    pub path_output: String,
}

/// Main entry point for `annos resolve` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let config = match &args.path_config {
        Some(path) => ReportingConfig::load(path)?,
        None => ReportingConfig::default(),
    };
    let scope = Scope::new(
        &args.assay,
        args.subpanel.as_deref(),
        config.is_subpanel_scoped(&args.assay),
    );

    tracing::info!("Loading variants and annotations...");
    let mut records: Vec<VariantCallRecord> = read_jsonl(&args.path_variants)?;
    let annotations = read_annotation_log(&args.path_annotations)?;
    tracing::info!(
        "... loaded {} variants and {} annotations",
        records.len().separate_with_commas(),
        annotations.len().separate_with_commas()
    );

    if let Some(path_canonical) = &args.path_canonical {
        let canonical: HashMap<String, String> = read_json(path_canonical)?;
        let canonical = CanonicalTranscripts::new(canonical);
        for record in records.iter_mut() {
            attach_selected(record, &canonical);
        }
    }

    let resolved = resolve_all(records, &annotations, &scope);
    let unclassified = resolved.iter().filter(|r| r.tier == UNCLASSIFIED).count();
    tracing::info!(
        "summary: {} of {} variants unclassified",
        unclassified.separate_with_commas(),
        resolved.len().separate_with_commas()
    );

    let mut writer = open_write_maybe_gz(&args.path_output)?;
    write_jsonl(&mut writer, &resolved)?;

    tracing::info!(
        "All of `annos resolve` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::schema::{
        annotation::{test::record, AnnotationBody},
        variant::test::example_record,
    };

    #[test]
    #[tracing_test::traced_test]
    fn read_annotation_log_skips_invalid_records() -> Result<(), anyhow::Error> {
        let tmpdir = tempfile::tempdir()?;
        let path = tmpdir.path().join("annotations.jsonl");
        let lines = [
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
                "_id": "sentinel",
                "gene": "TP53",
                "variant": "p.Arg273His",
                "nomenclature": "p",
                "time_created": "2024-01-03T12:00:00Z",
                "class": 999
            }),
            serde_json::json!({"_id": "no-gene", "variant": "p.Arg273His"}),
        ];
        std::fs::write(
            &path,
            lines
                .iter()
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .join("\n"),
        )?;

        let annotations = read_annotation_log(&path)?;

        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].id, "good");
        assert!(logs_contain("skipping annotation record #2"));
        assert!(logs_contain("skipping annotation record #3"));

        Ok(())
    }

    #[test]
    fn resolve_all_attaches_everything() {
        let mut with_csq = example_record();
        with_csq.info.selected_csq = Some(with_csq.info.csq[0].clone());
        let without_csq = example_record();
        let mut annotation = record("a", "myeloid", None, AnnotationBody::Class(1), 1);
        annotation.transcript = Some("ENST00000269305.9".into());

        let resolved = resolve_all(
            vec![with_csq, without_csq],
            &[annotation],
            &Scope::new("myeloid", None, false),
        );

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].tier, 1);
        assert_eq!(resolved[1].tier, UNCLASSIFIED);
        assert_eq!(resolved[1].identity, None);
        // the transcript lookup does not need a selected consequence
        assert_eq!(
            resolved[1]
                .variant
                .additional_classification
                .as_ref()
                .map(|a| a.class),
            Some(1)
        );
    }
}
