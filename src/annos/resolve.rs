//! Resolution of the latest tier and free-text annotations of a variant.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use regex::Regex;

use crate::{
    common::strip_version,
    schema::{
        annotation::{AdditionalClassification, AnnotationRecord, Nomenclature, UNCLASSIFIED},
        variant::VariantCallRecord,
    },
};

/// The identity under which annotations of a variant are stored.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VariantIdentity {
    pub gene: String,
    pub nomenclature: Nomenclature,
    pub variant: String,
}

impl VariantIdentity {
    /// Derive the identity from the selected consequence of `record`: protein change if
    /// present, else coding change, else the genomic location.
    pub fn of_record(record: &VariantCallRecord) -> Option<Self> {
        let csq = record.info.selected_csq.as_ref()?;
        let gene = csq.symbol.clone().filter(|s| !s.is_empty())?;
        let (nomenclature, variant) = if let Some(hgvsp) = csq.short_hgvsp() {
            (Nomenclature::Protein, hgvsp)
        } else if let Some(hgvsc) = csq.short_hgvsc() {
            (Nomenclature::Coding, hgvsc)
        } else {
            (Nomenclature::Genomic, record.genomic_identity())
        };
        Some(Self {
            gene,
            nomenclature,
            variant,
        })
    }

    /// Whether `annotation` was recorded for this identity.
    pub fn matches(&self, annotation: &AnnotationRecord) -> bool {
        annotation.gene == self.gene
            && annotation.nomenclature == self.nomenclature
            && annotation.variant == self.variant
    }
}

/// The assay (and, where the assay is scoped by it, subpanel) to resolve for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub assay: String,
    /// Only set if the assay scopes classifications by subpanel.
    pub subpanel: Option<String>,
    pub subpanel_scoped: bool,
}

impl Scope {
    /// Build the scope, dropping `subpanel` if the assay is not subpanel-scoped.
    pub fn new(assay: &str, subpanel: Option<&str>, subpanel_scoped: bool) -> Self {
        Self {
            assay: assay.to_string(),
            subpanel: if subpanel_scoped {
                subpanel.map(String::from)
            } else {
                None
            },
            subpanel_scoped,
        }
    }

    /// Whether `annotation` belongs to this scope.
    pub fn contains(&self, annotation: &AnnotationRecord) -> bool {
        annotation.assay.as_deref() == Some(self.assay.as_str())
            && (!self.subpanel_scoped || annotation.subpanel == self.subpanel)
    }
}

/// Everything known about the classification of one variant in one scope.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassificationResolution {
    /// Latest tier record in the current scope, if any.
    pub latest_classification: Option<AnnotationRecord>,
    /// Latest tier record of every other scope, keyed by `assay:subpanel`.
    pub other_classifications: IndexMap<String, AnnotationRecord>,
    /// All free-text records, oldest first.
    pub annotations: Vec<AnnotationRecord>,
    /// Latest free-text record of the current scope, keyed by `assay:subpanel`.
    pub latest_texts: IndexMap<String, AnnotationRecord>,
}

impl ClassificationResolution {
    /// Tier of the current scope, `UNCLASSIFIED` if there is none.
    pub fn current_tier(&self) -> u16 {
        self.latest_classification
            .as_ref()
            .and_then(|record| record.class())
            .unwrap_or(UNCLASSIFIED)
    }
}

/// Return `annotations` matching `pred` ordered by creation time, ties broken by
/// insertion sequence (or log position if records carry none).
pub fn sorted_matching<'a, F>(
    annotations: &'a [AnnotationRecord],
    pred: F,
) -> Vec<&'a AnnotationRecord>
where
    F: Fn(&AnnotationRecord) -> bool,
{
    let mut result = annotations
        .iter()
        .enumerate()
        .filter(|(_, a)| pred(*a))
        .collect::<Vec<_>>();
    result.sort_by_key(|(idx, a)| a.order_key(*idx));
    result.into_iter().map(|(_, a)| a).collect()
}

/// Newest record matching `pred` and created at or before `as_of`.
pub fn latest_as_of<'a, F>(
    annotations: &'a [AnnotationRecord],
    as_of: DateTime<Utc>,
    pred: F,
) -> Option<&'a AnnotationRecord>
where
    F: Fn(&AnnotationRecord) -> bool,
{
    sorted_matching(annotations, |a| a.time_created <= as_of && pred(a))
        .into_iter()
        .last()
}

/// Resolve the annotations of the variant with `identity` for `scope`.
pub fn resolve_annotations(
    identity: &VariantIdentity,
    annotations: &[AnnotationRecord],
    scope: &Scope,
) -> ClassificationResolution {
    let mut result = ClassificationResolution::default();
    for annotation in sorted_matching(annotations, |a| identity.matches(a)) {
        let current = scope.contains(annotation);
        if annotation.class().is_some() {
            if current {
                result.latest_classification = Some(annotation.clone());
            } else {
                result
                    .other_classifications
                    .insert(annotation.scope_key(), annotation.clone());
            }
        } else {
            if current {
                result
                    .latest_texts
                    .insert(annotation.scope_key(), annotation.clone());
            }
            result.annotations.push(annotation.clone());
        }
    }
    tracing::trace!(
        "resolved {:?} in {:?} to tier {}",
        identity,
        scope,
        result.current_tier()
    );
    result
}

/// Look up the newest classification for `scope` through the full transcript and gene
/// set of `record`, with provenance fields removed.
pub fn get_additional_classifications(
    record: &VariantCallRecord,
    annotations: &[AnnotationRecord],
    scope: &Scope,
) -> Option<AdditionalClassification> {
    let mut transcripts = record
        .info
        .csq
        .iter()
        .filter_map(|csq| csq.feature.as_deref())
        .map(strip_version)
        .filter(|tx| !tx.is_empty())
        .collect::<Vec<_>>();
    transcripts.sort_unstable();
    transcripts.dedup();
    let patterns = transcripts
        .iter()
        .filter_map(|tx| Regex::new(&format!(r"^{}(\.\d+)?$", regex::escape(tx))).ok())
        .collect::<Vec<_>>();
    let genes = record
        .info
        .csq
        .iter()
        .filter_map(|csq| csq.symbol.as_deref())
        .collect::<Vec<_>>();
    let mut variants = record
        .info
        .csq
        .iter()
        .flat_map(|csq| [csq.short_hgvsp(), csq.short_hgvsc()])
        .flatten()
        .collect::<Vec<_>>();
    variants.push(record.genomic_identity());

    sorted_matching(annotations, |a| {
        a.class().is_some()
            && scope.contains(a)
            && genes.contains(&a.gene.as_str())
            && variants.contains(&a.variant)
            && a
                .transcript
                .as_deref()
                .map(|tx| patterns.iter().any(|p| p.is_match(tx)))
                .unwrap_or(false)
    })
    .into_iter()
    .last()
    .and_then(|a| {
        Some(AdditionalClassification {
            gene: a.gene.clone(),
            transcript: a.transcript.clone(),
            variant: a.variant.clone(),
            nomenclature: a.nomenclature,
            assay: a.assay.clone(),
            subpanel: a.subpanel.clone(),
            class: a.class()?,
        })
    })
}

/// Attach the result of `get_additional_classifications` to `record`.
pub fn attach_additional_classification(
    record: &mut VariantCallRecord,
    annotations: &[AnnotationRecord],
    scope: &Scope,
) {
    record.additional_classification = get_additional_classifications(record, annotations, scope);
}
