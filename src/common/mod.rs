//! Common functionality.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

pub mod io;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Strip the version suffix from a transcript accession, e.g., `NM_000546.6` becomes
/// `NM_000546`.
pub fn strip_version(accession: &str) -> &str {
    match accession.rsplit_once('.') {
        Some((stem, version))
            if !stem.is_empty() && version.chars().all(|c| c.is_ascii_digit()) =>
        {
            stem
        }
        _ => accession,
    }
}

/// Canonicalize chromosome name by removing any `chr` prefix.
pub fn canonicalize_chrom(chrom: &str) -> &str {
    chrom
        .strip_prefix("chr")
        .or_else(|| chrom.strip_prefix("CHR"))
        .unwrap_or(chrom)
}

/// Remove the sequence accession prefix from an HGVS string and decode the `=` escape
/// used by VEP, e.g., `ENSP00000269305.4:p.Arg175His` becomes `p.Arg175His`.
pub fn short_hgvs(hgvs: &str) -> String {
    let short = match hgvs.split_once(':') {
        Some((_, rest)) => rest,
        None => hgvs,
    };
    short.replace("%3D", "=")
}

/// Expand `~` and environment variables in a path given on the command line.
pub fn expand_path(path: &str) -> Result<String, anyhow::Error> {
    Ok(shellexpand::full(path)
        .map_err(|e| anyhow::anyhow!("could not expand path {:?}: {}", path, e))?
        .into_owned())
}
