//! Code implementing the "query" sub commands: assay-specific inclusion predicates.

pub mod predicate;

use std::collections::BTreeSet;
use std::io::Write;
use std::time::Instant;

use clap::{Args as ClapArgs, Parser, Subcommand};
use thousands::Separable;

use crate::{
    common::io::{open_write_maybe_gz, read_jsonl, write_jsonl},
    conf::{AssayGroupConfig, FilterThresholds, ReportingConfig},
    err::AppError,
    schema::variant::{CallType, VariantCallRecord},
};

use self::predicate::{Bound, CallField, Cmp, Predicate};

/// Build the inclusion predicate for the assay group `assay` with `thresholds`.
pub fn build_predicate(
    config: &ReportingConfig,
    assay: &str,
    thresholds: &FilterThresholds,
) -> Result<Predicate, AppError> {
    let group = config.assay_group(assay)?;
    let allowed = thresholds.expanded_consequences(config);
    Ok(build_predicate_for_group(group, thresholds, allowed))
}

/// Build the predicate from the settings of one assay group.
///
/// The result is an OR of the configured carve-outs and the main rule, or the main rule
/// alone if the group has no carve-outs.
pub fn build_predicate_for_group(
    group: &AssayGroupConfig,
    thresholds: &FilterThresholds,
    allowed_consequences: BTreeSet<String>,
) -> Predicate {
    let mut carve_outs = Vec::new();
    if let Some(germline) = &group.germline {
        let mut clauses = vec![Predicate::HasFilter(germline.filter_flag.clone())];
        if !germline.genes.is_empty() {
            clauses.push(Predicate::GeneIn(germline.genes.iter().cloned().collect()));
        }
        if let Some(marker) = &germline.marker_field {
            clauses.push(Predicate::Marker(marker.clone()));
        }
        carve_outs.push(Predicate::And(clauses));
    }
    if let Some(locus) = &group.fixed_locus {
        carve_outs.push(Predicate::Locus {
            chrom: locus.chrom.clone(),
            start: locus.start,
            end: locus.end,
        });
    }

    let main = main_rule(group, thresholds, allowed_consequences);
    if carve_outs.is_empty() {
        main
    } else {
        carve_outs.push(main);
        Predicate::Or(carve_outs)
    }
}

/// Main rule: case call quality, control call (if any) quality, and consequence.
fn main_rule(
    group: &AssayGroupConfig,
    thresholds: &FilterThresholds,
    allowed_consequences: BTreeSet<String>,
) -> Predicate {
    let case_call = Predicate::CallMatches {
        call_type: CallType::Case,
        bounds: vec![
            Bound::new(CallField::Af, Cmp::Gte, thresholds.min_freq),
            Bound::new(CallField::Dp, Cmp::Gte, thresholds.min_depth),
            Bound::new(CallField::Vd, Cmp::Gte, thresholds.min_reads),
        ],
    };
    let control_call = Predicate::Or(vec![
        Predicate::NoCall {
            call_type: CallType::Control,
        },
        Predicate::CallMatches {
            call_type: CallType::Control,
            bounds: vec![
                Bound::new(CallField::Af, Cmp::Lte, thresholds.max_freq),
                Bound::new(CallField::Dp, Cmp::Gte, thresholds.min_depth),
            ],
        },
    ]);

    let mut consequence = vec![Predicate::ConsequenceIn(allowed_consequences)];
    if let Some(rule) = &group.large_insertion {
        consequence.push(Predicate::And(vec![
            Predicate::InsertionLength {
                min: rule.min_length,
                max: rule.max_length,
            },
            Predicate::GeneIn(rule.genes.iter().cloned().collect()),
        ]));
    }
    if let Some(rule) = &group.regulatory {
        consequence.push(Predicate::And(vec![
            Predicate::ConsequenceIn(rule.consequences.iter().cloned().collect()),
            Predicate::GeneIn(rule.genes.iter().cloned().collect()),
        ]));
    }

    Predicate::And(vec![case_call, control_call, Predicate::Or(consequence)])
}

/// Command line arguments for the `query` sub commands.
#[derive(Debug, ClapArgs)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Args {
    /// The sub command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Enum supporting the parsing of "query *" sub commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the predicate for an assay group as JSON.
    Predicate(PredicateArgs),
    /// Filter a JSONL file of variant call records with the predicate.
    Filter(FilterArgs),
}

/// Arguments shared by the "query *" sub commands.
#[derive(Parser, Debug)]
pub struct SelectionArgs {
    /// Path to the reporting configuration JSON; built-in defaults if omitted.
    #[arg(long)]
    pub path_config: Option<String>,
    /// Name of the assay group.
    #[arg(long)]
    pub assay: String,
    /// Override minimal case allele fraction.
    #[arg(long)]
    pub min_freq: Option<f64>,
    /// Override maximal control allele fraction.
    #[arg(long)]
    pub max_freq: Option<f64>,
    /// Override minimal depth.
    #[arg(long)]
    pub min_depth: Option<f64>,
    /// Override minimal number of supporting reads.
    #[arg(long)]
    pub min_reads: Option<f64>,
}

impl SelectionArgs {
    /// Load config and build the predicate with overrides applied.
    fn predicate(&self) -> Result<Predicate, anyhow::Error> {
        let config = match &self.path_config {
            Some(path) => ReportingConfig::load(path)?,
            None => ReportingConfig::default(),
        };
        let mut thresholds = config.assay_group(&self.assay)?.thresholds.clone();
        if let Some(min_freq) = self.min_freq {
            thresholds.min_freq = min_freq;
        }
        if let Some(max_freq) = self.max_freq {
            thresholds.max_freq = max_freq;
        }
        if let Some(min_depth) = self.min_depth {
            thresholds.min_depth = min_depth;
        }
        if let Some(min_reads) = self.min_reads {
            thresholds.min_reads = min_reads;
        }
        tracing::debug!("thresholds = {:?}", &thresholds);
        Ok(build_predicate(&config, &self.assay, &thresholds)?)
    }
}

/// Arguments for `query predicate`.
#[derive(Parser, Debug)]
pub struct PredicateArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
    /// Path to the output JSON file.
    #[arg(long)]
    pub path_output: String,
}

/// Arguments for `query filter`.
#[derive(Parser, Debug)]
pub struct FilterArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
    /// Path to the input JSONL file with variant call records.
    #[arg(long)]
    pub path_input: String,
    /// Path to the output JSONL file.
    #[arg(long)]
    pub path_output: String,
}

/// Main entry point for the `query` sub commands.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    match &args.command {
        Commands::Predicate(args) => {
            let predicate = args.selection.predicate()?;
            let mut writer = open_write_maybe_gz(&args.path_output)?;
            serde_json::to_writer_pretty(&mut writer, &predicate)?;
            writer.flush()?;
        }
        Commands::Filter(args) => {
            let predicate = args.selection.predicate()?;
            tracing::info!("Loading variants...");
            let records: Vec<VariantCallRecord> = read_jsonl(&args.path_input)?;
            let passing = predicate.filter(&records);
            tracing::info!(
                "summary: {} records passed out of {}",
                passing.len().separate_with_commas(),
                records.len().separate_with_commas()
            );
            let mut writer = open_write_maybe_gz(&args.path_output)?;
            write_jsonl(&mut writer, &passing)?;
        }
    }

    tracing::info!(
        "All of `query` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
