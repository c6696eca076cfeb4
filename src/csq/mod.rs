//! Selection of the representative transcript consequence of a variant.

use std::collections::HashMap;
use std::time::Instant;

use clap::Parser;
use thousands::Separable;

use crate::{
    common::{
        io::{open_write_maybe_gz, read_json, read_jsonl, write_jsonl},
        strip_version,
    },
    schema::variant::{Consequence, CsqProvenance, Impact, VariantCallRecord},
};

/// Impact tiers in the order they are scanned.
pub const IMPACT_ORDER: [Impact; 4] = [
    Impact::High,
    Impact::Moderate,
    Impact::Low,
    Impact::Modifier,
];

/// Gene symbol to canonical transcript accession, without version.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CanonicalTranscripts(HashMap<String, String>);

impl CanonicalTranscripts {
    /// Build from (gene, accession) pairs; versions are stripped.
    pub fn new<I, G, A>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (G, A)>,
        G: Into<String>,
        A: AsRef<str>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(gene, acc)| (gene.into(), strip_version(acc.as_ref()).to_string()))
                .collect(),
        )
    }

    /// Whether the consequence is on the canonical transcript of its gene.
    pub fn is_canonical(&self, csq: &Consequence) -> bool {
        match (csq.symbol.as_deref(), csq.feature.as_deref()) {
            (Some(symbol), Some(feature)) => self
                .0
                .get(symbol)
                .map(|acc| strip_version(acc) == strip_version(feature))
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// The chosen consequence together with how it was chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct CsqSelection<'a> {
    pub csq: &'a Consequence,
    pub provenance: CsqProvenance,
}

/// Pick one consequence from `csqs`.
///
/// Impact tiers are scanned from `HIGH` to `MODIFIER`, entries within a tier in input
/// order.  The first entry on the database canonical transcript wins.  Otherwise the
/// first entry flagged canonical by VEP, then the first protein-coding entry, and finally
/// the first entry of the list are used.  Returns `None` only for an empty list.
pub fn select_consequence<'a>(
    csqs: &'a [Consequence],
    canonical: &CanonicalTranscripts,
) -> Option<CsqSelection<'a>> {
    let first = csqs.first()?;
    let mut vep_canonical: Option<&Consequence> = None;
    let mut first_protein_coding: Option<&Consequence> = None;

    for impact in IMPACT_ORDER {
        for csq in csqs.iter().filter(|csq| csq.impact == Some(impact)) {
            if canonical.is_canonical(csq) {
                return Some(CsqSelection {
                    csq,
                    provenance: CsqProvenance::Db,
                });
            }
            if vep_canonical.is_none() && csq.is_vep_canonical() {
                vep_canonical = Some(csq);
            }
            if first_protein_coding.is_none() && csq.is_protein_coding() {
                first_protein_coding = Some(csq);
            }
        }
    }

    Some(match (vep_canonical, first_protein_coding) {
        (Some(csq), _) => CsqSelection {
            csq,
            provenance: CsqProvenance::Vep,
        },
        (None, Some(csq)) => CsqSelection {
            csq,
            provenance: CsqProvenance::Random,
        },
        (None, None) => CsqSelection {
            csq: first,
            provenance: CsqProvenance::Random,
        },
    })
}

/// Select and store the representative consequence on `record`.  Returns the provenance,
/// or `None` if the record has no consequences.
pub fn attach_selected(
    record: &mut VariantCallRecord,
    canonical: &CanonicalTranscripts,
) -> Option<CsqProvenance> {
    let (csq, provenance) = {
        let selection = select_consequence(&record.info.csq, canonical)?;
        (selection.csq.clone(), selection.provenance)
    };
    tracing::trace!(
        "selected {:?} ({}) for {}",
        csq.feature,
        provenance,
        record.simple_id()
    );
    record.info.selected_csq = Some(csq);
    record.info.selected_csq_criteria = Some(provenance);
    Some(provenance)
}

/// Command line arguments for `csq select` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Select representative consequences", long_about = None)]
pub struct Args {
    /// Path to JSON object mapping gene symbols to canonical transcript accessions.
    #[arg(long)]
    pub path_canonical: String,
    /// Path to the input JSONL file with variant call records.
    #[arg(long)]
    pub path_input: String,
    /// Path to the output JSONL file.
    #[arg(long)]
    pub path_output: String,
}

/// Main entry point for `csq select` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let canonical: HashMap<String, String> = read_json(&args.path_canonical)?;
    let canonical = CanonicalTranscripts::new(canonical);
    let mut records: Vec<VariantCallRecord> = read_jsonl(&args.path_input)?;

    let mut by_provenance: HashMap<CsqProvenance, usize> = HashMap::new();
    for record in records.iter_mut() {
        match attach_selected(record, &canonical) {
            Some(provenance) => *by_provenance.entry(provenance).or_default() += 1,
            None => tracing::warn!("variant {} has no consequences", record.simple_id()),
        }
    }
    for (provenance, count) in &by_provenance {
        tracing::info!("{} -- {}", provenance, count.separate_with_commas());
    }

    let mut writer = open_write_maybe_gz(&args.path_output)?;
    write_jsonl(&mut writer, &records)?;

    tracing::info!(
        "All of `csq select` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
