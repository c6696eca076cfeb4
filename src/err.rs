//! Error types for the boundaries of the reporting core.

use std::process::{ExitCode, Termination};

#[derive(thiserror::Error, Debug, Clone)]
pub enum AppError {
    #[error("Unknown assay group: {0}")]
    UnknownAssayGroup(String),
}

impl Termination for AppError {
    fn report(self) -> ExitCode {
        match self {
            AppError::UnknownAssayGroup(_) => ExitCode::from(1),
        }
    }
}

/// Failure to read or interpret a rendered report artifact.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("could not read report file {path:?}: {reason}")]
    Unreadable { path: String, reason: String },
    #[error("report format {0:?} cannot be parsed")]
    UnsupportedFormat(String),
    #[error("report is missing required metadata: {0}")]
    MissingMetadata(&'static str),
    #[error("report has no results section")]
    NoResultsSection,
}

/// An annotation document that violates the record invariants.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("annotation {0:?} carries both class and text")]
    BothClassAndText(String),
    #[error("annotation {0:?} carries neither class nor text")]
    NeitherClassNorText(String),
    #[error("annotation {id:?} has class {class} outside of 1..=4")]
    ClassOutOfRange { id: String, class: u16 },
    #[error("annotation {id:?} is missing field {field}")]
    MissingField { id: String, field: &'static str },
}

/// Failure when writing to a snapshot store.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store rejected snapshot: {0}")]
    Rejected(String),
}

/// Reason why a report, or a row of a report, did not yield a snapshot.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotFailure {
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("unknown classification {0:?}")]
    UnknownClassification(String),
    #[error("no variant of gene {gene} matches {variant:?}")]
    NoMatchingVariant { gene: String, variant: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}
