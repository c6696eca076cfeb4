//! Samples, rendered reports, and reported-variant snapshots.

use chrono::{DateTime, Utc};

/// Format that a report was rendered in.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Clone,
    Copy,
    Default,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Html,
    Pdf,
}

/// A report generated for a sample; immutable once written.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, derive_new::new)]
pub struct Report {
    /// Store identifier of the report.
    #[serde(rename = "_id")]
    pub id: String,
    /// Human-readable report identifier, e.g. `S123.1`.
    pub report_id: Option<String>,
    /// Path of the rendered artifact.
    pub filepath: Option<String>,
    #[serde(default)]
    pub author: String,
    pub time_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub format: ReportFormat,
}

/// A comment on a sample.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct SampleComment {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author: String,
    pub time_created: DateTime<Utc>,
    #[serde(default)]
    pub hidden: bool,
}

/// The parts of a sample document that the reporting core reads.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Sample {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// Assay group the sample was analysed with.
    pub assay: String,
    #[serde(default)]
    pub subpanel: Option<String>,
    #[serde(default)]
    pub comments: Vec<SampleComment>,
    #[serde(default)]
    pub reports: Vec<Report>,
}

impl Sample {
    /// Newest non-hidden comment created at or before `as_of`.
    pub fn latest_visible_comment(&self, as_of: DateTime<Utc>) -> Option<&SampleComment> {
        self.comments
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.hidden && c.time_created <= as_of)
            .max_by_key(|(idx, c)| (c.time_created, *idx))
            .map(|(_, c)| c)
    }
}

/// Identity of a snapshot row; at most one row exists per key.
#[derive(
    serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct SnapshotKey {
    pub sample_oid: String,
    pub report_oid: String,
    pub simple_id: String,
}

/// Point-in-time record of a variant as reported in a specific report.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct ReportedVariantSnapshot {
    pub sample_oid: String,
    pub sample_name: String,
    pub report_oid: String,
    pub report_id: Option<String>,
    /// Variant identity `CHROM_POS_REF_ALT`.
    pub simple_id: String,
    /// Store identifier of the backing variant call.
    pub var_oid: String,
    /// Tier as printed in the report.
    pub tier: u16,
    pub gene: String,
    pub transcript: Option<String>,
    pub hgvsp: Option<String>,
    pub hgvsc: Option<String>,
    /// Annotation that justified the tier, if one existed at report time.
    pub annotation_oid: Option<String>,
    /// Free-text annotation in effect at report time.
    pub annotation_text_oid: Option<String>,
    /// Newest visible sample comment at report time.
    pub sample_comment_oid: Option<String>,
    /// Timestamp of the report itself.
    pub time_created: DateTime<Utc>,
}

impl ReportedVariantSnapshot {
    pub fn key(&self) -> SnapshotKey {
        SnapshotKey {
            sample_oid: self.sample_oid.clone(),
            report_oid: self.report_oid.clone(),
            simple_id: self.simple_id.clone(),
        }
    }
}
