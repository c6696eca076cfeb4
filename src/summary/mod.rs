//! Code implementing the "summary render" sub command.

pub mod biomarkers;
pub mod cnvs;
pub mod fusions;
pub mod lang;
pub mod snvs;

use std::io::Write;
use std::time::Instant;

use clap::Parser;

use crate::{
    annos::ResolvedVariant,
    common::io::{open_write_maybe_gz, read_json, read_jsonl},
};

pub use self::biomarkers::{summarize_biomarkers, Biomarkers};
pub use self::cnvs::{summarize_cnvs, CopyNumberVariant};
pub use self::fusions::{summarize_translocations, Translocation};
pub use self::lang::join_and;
pub use self::snvs::{summarize_snvs, GeneFilter, SnvSummary, TierStatistics};

/// Findings other than small variants that enter the summary.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SummaryInput {
    #[serde(default)]
    pub gene_filter: GeneFilter,
    #[serde(default)]
    pub translocations: Vec<Translocation>,
    #[serde(default)]
    pub cnvs: Vec<CopyNumberVariant>,
    #[serde(default)]
    pub biomarkers: Biomarkers,
}

/// The rendered summary, one paragraph per kind of finding.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Summary {
    pub snvs: String,
    pub translocations: Option<String>,
    pub cnvs: Option<String>,
    pub biomarkers: Option<String>,
    pub statistics: TierStatistics,
}

impl Summary {
    /// All paragraphs separated by blank lines.
    pub fn text(&self) -> String {
        std::iter::once(Some(&self.snvs))
            .chain([
                self.translocations.as_ref(),
                self.cnvs.as_ref(),
                self.biomarkers.as_ref(),
            ])
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Render the summary of the resolved `variants` and the further findings of `input`.
pub fn summarize(variants: &[ResolvedVariant], input: &SummaryInput) -> Summary {
    let SnvSummary { text, statistics } = summarize_snvs(variants, &input.gene_filter);
    Summary {
        snvs: text,
        translocations: summarize_translocations(&input.translocations),
        cnvs: summarize_cnvs(&input.cnvs),
        biomarkers: summarize_biomarkers(&input.biomarkers),
        statistics,
    }
}

/// Command line arguments for `summary render` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Render the clinical summary text", long_about = None)]
pub struct Args {
    /// Path to the JSONL file written by `annos resolve`.
    #[arg(long)]
    pub path_variants: String,
    /// Optional JSON file with gene filter, translocations, CNVs, and biomarkers.
    #[arg(long)]
    pub path_input: Option<String>,
    /// Path to the output JSON file.
    #[arg(long)]
    pub path_output: String,
}

/// Main entry point for `summary render` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let variants: Vec<ResolvedVariant> = read_jsonl(&args.path_variants)?;
    let input: SummaryInput = match &args.path_input {
        Some(path) => read_json(path)?,
        None => SummaryInput::default(),
    };

    let summary = summarize(&variants, &input);
    tracing::info!("summary text:\n{}", summary.text());

    let mut writer = open_write_maybe_gz(&args.path_output)?;
    serde_json::to_writer_pretty(&mut writer, &summary)?;
    writer.flush()?;

    tracing::info!(
        "All of `summary render` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::summary::snvs::test::resolved;

    #[test]
    fn summarize_all_kinds() {
        let input = SummaryInput {
            gene_filter: GeneFilter::default(),
            translocations: vec![],
            cnvs: vec![CopyNumberVariant::new(vec!["ERBB2".into()], 0, 6.0, 40.0)],
            biomarkers: Biomarkers {
                hrd_sum: None,
                msi_percent: Some(16.0),
            },
        };

        let summary = summarize(&[resolved("TP53", 1)], &input);

        assert_eq!(summary.translocations, None);
        insta::assert_snapshot!(summary.text(), @r###"
        Analysen påvisar en variant av stark klinisk signifikans (tier I) i genen TP53.

        Analysen påvisar amplifiering av genen ERBB2 (uppskattat kopietal 6,0, 40,0 % av läsningarna stödjer förändringen).

        Andelen instabila mikrosatelliter är 16,0 %, vilket överstiger tröskelvärdet 15 % och talar för mikrosatellitinstabilitet (MSI-H).
        "###);
    }

    #[test]
    fn input_from_json() -> Result<(), anyhow::Error> {
        let input: SummaryInput = serde_json::from_value(serde_json::json!({
            "gene_filter": ["TP53"],
            "translocations": [{
                "gene1": "BCR",
                "gene2": "ABL1",
                "split_reads": 1,
                "paired_reads": 2,
                "total_reads": 10,
                "unique_reads": 3
            }],
            "biomarkers": {"hrd_sum": 50}
        }))?;

        assert!(input.gene_filter.is_active());
        assert!(!input.translocations[0].irrelevant);
        assert_eq!(input.biomarkers.hrd_sum, Some(50.0));
        assert!(input.cnvs.is_empty());

        Ok(())
    }
}
