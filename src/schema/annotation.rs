//! Annotation log records (classifications and free-text comments).

use chrono::{DateTime, Utc};

use crate::err::RecordError;

/// Value of the `class` field for a variant without any classification.
pub const UNCLASSIFIED: u16 = 999;

/// Clinical significance tier.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub enum Tier {
    /// Strong clinical significance.
    Strong,
    /// Potential clinical significance.
    Potential,
    /// Unclear clinical significance.
    Unclear,
    /// Benign or likely benign.
    Benign,
}

impl Tier {
    /// Numeric class, 1 through 4.
    pub fn class(self) -> u16 {
        match self {
            Tier::Strong => 1,
            Tier::Potential => 2,
            Tier::Unclear => 3,
            Tier::Benign => 4,
        }
    }

    /// Roman numeral used in report prose.
    pub fn roman(self) -> &'static str {
        match self {
            Tier::Strong => "I",
            Tier::Potential => "II",
            Tier::Unclear => "III",
            Tier::Benign => "IV",
        }
    }
}

/// Kind of identity stored in `AnnotationRecord::variant`.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Clone,
    Copy,
    strum::Display,
)]
pub enum Nomenclature {
    /// Protein-level HGVS.
    #[serde(rename = "p")]
    #[strum(serialize = "p")]
    Protein,
    /// Coding HGVS.
    #[serde(rename = "c")]
    #[strum(serialize = "c")]
    Coding,
    /// Genomic location `CHROM:POS:REF/ALT`.
    #[serde(rename = "g")]
    #[strum(serialize = "g")]
    Genomic,
    #[serde(rename = "f")]
    #[strum(serialize = "f")]
    Fusion,
    #[serde(rename = "t")]
    #[strum(serialize = "t")]
    Translocation,
    #[serde(rename = "cn")]
    #[strum(serialize = "cn")]
    CopyNumber,
}

/// Payload of an annotation record: exactly one of tier or free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationBody {
    Class(u16),
    Text(String),
}

/// Annotation document as found in the store, before validation.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default)]
pub struct RawAnnotationRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub gene: String,
    #[serde(default)]
    pub transcript: Option<String>,
    pub variant: String,
    pub nomenclature: Option<Nomenclature>,
    #[serde(default)]
    pub assay: Option<String>,
    #[serde(default)]
    pub subpanel: Option<String>,
    pub time_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub seq: Option<u64>,
    #[serde(default)]
    pub class: Option<u16>,
    #[serde(default)]
    pub text: Option<String>,
}

/// One entry of the append-only annotation log.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "RawAnnotationRecord", into = "RawAnnotationRecord")]
pub struct AnnotationRecord {
    pub id: String,
    pub gene: String,
    pub transcript: Option<String>,
    pub variant: String,
    pub nomenclature: Nomenclature,
    pub assay: Option<String>,
    pub subpanel: Option<String>,
    pub time_created: DateTime<Utc>,
    pub author: String,
    /// Insertion sequence number, used to order records with identical timestamps.
    pub seq: Option<u64>,
    pub body: AnnotationBody,
}

impl TryFrom<RawAnnotationRecord> for AnnotationRecord {
    type Error = RecordError;

    fn try_from(raw: RawAnnotationRecord) -> Result<Self, Self::Error> {
        let body = match (raw.class, raw.text) {
            (Some(_), Some(_)) => return Err(RecordError::BothClassAndText(raw.id)),
            (None, None) => return Err(RecordError::NeitherClassNorText(raw.id)),
            (Some(class), None) => {
                if !(1..=4).contains(&class) {
                    return Err(RecordError::ClassOutOfRange { id: raw.id, class });
                }
                AnnotationBody::Class(class)
            }
            (None, Some(text)) => AnnotationBody::Text(text),
        };
        Ok(Self {
            nomenclature: raw.nomenclature.ok_or_else(|| RecordError::MissingField {
                id: raw.id.clone(),
                field: "nomenclature",
            })?,
            time_created: raw.time_created.ok_or_else(|| RecordError::MissingField {
                id: raw.id.clone(),
                field: "time_created",
            })?,
            id: raw.id,
            gene: raw.gene,
            transcript: raw.transcript,
            variant: raw.variant,
            assay: raw.assay,
            subpanel: raw.subpanel,
            author: raw.author,
            seq: raw.seq,
            body,
        })
    }
}

impl From<AnnotationRecord> for RawAnnotationRecord {
    fn from(record: AnnotationRecord) -> Self {
        let (class, text) = match record.body {
            AnnotationBody::Class(class) => (Some(class), None),
            AnnotationBody::Text(text) => (None, Some(text)),
        };
        Self {
            id: record.id,
            gene: record.gene,
            transcript: record.transcript,
            variant: record.variant,
            nomenclature: Some(record.nomenclature),
            assay: record.assay,
            subpanel: record.subpanel,
            time_created: Some(record.time_created),
            author: record.author,
            seq: record.seq,
            class,
            text,
        }
    }
}

impl AnnotationRecord {
    /// The tier class, if this is a classification record.
    pub fn class(&self) -> Option<u16> {
        match &self.body {
            AnnotationBody::Class(class) => Some(*class),
            AnnotationBody::Text(_) => None,
        }
    }

    /// The free text, if this is a text record.
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            AnnotationBody::Class(_) => None,
            AnnotationBody::Text(text) => Some(text),
        }
    }

    /// Scope key `assay:subpanel`, with `NA` standing in for a missing part.
    pub fn scope_key(&self) -> String {
        format!(
            "{}:{}",
            self.assay.as_deref().unwrap_or("NA"),
            self.subpanel.as_deref().unwrap_or("NA")
        )
    }

    /// Key used to order the log: creation time, then insertion sequence.
    pub fn order_key(&self, position: usize) -> (DateTime<Utc>, u64) {
        (self.time_created, self.seq.unwrap_or(position as u64))
    }
}

/// Classification found through the transcript set, stripped of provenance fields.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct AdditionalClassification {
    pub gene: String,
    pub transcript: Option<String>,
    pub variant: String,
    pub nomenclature: Nomenclature,
    pub assay: Option<String>,
    pub subpanel: Option<String>,
    pub class: u16,
}
