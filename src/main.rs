//! Variant report worker main executable

pub mod annos;
pub mod common;
pub mod conf;
pub mod csq;
pub mod err;
pub mod hgvsp;
pub mod query;
pub mod schema;
pub mod snapshot;
pub mod summary;

use clap::{Args, Parser, Subcommand};
use console::{Emoji, Term};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Clinical variant classification and reporting",
    long_about = "This tool filters, classifies, and summarizes variants for clinical reports \
                  and snapshots what was reported"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Variant query related commands.
    Query(query::Args),
    /// Consequence related commands.
    Csq(Csq),
    /// Annotation related commands.
    Annos(Annos),
    /// Reported-variant snapshot commands.
    Snapshot(Snapshot),
    /// Report summary commands.
    Summary(Summary),
}

/// Parsing of "csq *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Csq {
    /// The sub command to run
    #[command(subcommand)]
    command: CsqCommands,
}

/// Enum supporting the parsing of "csq *" sub commands.
#[derive(Debug, Subcommand)]
enum CsqCommands {
    Select(csq::Args),
}

/// Parsing of "annos *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Annos {
    /// The sub command to run
    #[command(subcommand)]
    command: AnnosCommands,
}

/// Enum supporting the parsing of "annos *" sub commands.
#[derive(Debug, Subcommand)]
enum AnnosCommands {
    Resolve(annos::Args),
}

/// Parsing of "snapshot *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Snapshot {
    /// The sub command to run
    #[command(subcommand)]
    command: SnapshotCommands,
}

/// Enum supporting the parsing of "snapshot *" sub commands.
#[derive(Debug, Subcommand)]
enum SnapshotCommands {
    Build(snapshot::Args),
}

/// Parsing of "summary *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Summary {
    /// The sub command to run
    #[command(subcommand)]
    command: SummaryCommands,
}

/// Enum supporting the parsing of "summary *" sub commands.
#[derive(Debug, Subcommand)]
enum SummaryCommands {
    Render(summary::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Query(args) => query::run(&cli.common, args)?,
            Commands::Csq(csq) => match &csq.command {
                CsqCommands::Select(args) => csq::run(&cli.common, args)?,
            },
            Commands::Annos(annos) => match &annos.command {
                AnnosCommands::Resolve(args) => annos::run(&cli.common, args)?,
            },
            Commands::Snapshot(snapshot) => match &snapshot.command {
                SnapshotCommands::Build(args) => snapshot::run(&cli.common, args)?,
            },
            Commands::Summary(summary) => match &summary.command {
                SummaryCommands::Render(args) => summary::run(&cli.common, args)?,
            },
        }

        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line(&format!("All done. Have a nice day!{}", Emoji(" ðŸ˜ƒ", "")))?;

    Ok(())
}
