//! Variant call records as written by the assay pipelines.

use indexmap::IndexMap;
use serde_with::{formats::Separator, serde_as, DisplayFromStr, PickFirst, StringWithSeparator};

use crate::{
    common::{canonicalize_chrom, short_hgvs},
    schema::annotation::AdditionalClassification,
};

/// Separator used by VEP when joining several consequence terms.
pub struct AmpersandSeparator;

impl Separator for AmpersandSeparator {
    fn separator() -> &'static str {
        "&"
    }
}

/// VEP impact class of a transcript consequence.
#[derive(
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Clone,
    Copy,
    strum::Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Impact {
    High,
    Moderate,
    Low,
    Modifier,
    /// Anything else found in the input, never selected by impact.
    #[serde(other)]
    Other,
}

/// Transcript-level consequence entry (`INFO.CSQ[]`).
#[serde_as]
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Consequence {
    /// Alternate allele.
    #[serde(rename = "Allele", skip_serializing_if = "Option::is_none")]
    pub allele: Option<String>,
    /// Sequence ontology consequence terms.
    #[serde_as(as = "PickFirst<(_, StringWithSeparator::<AmpersandSeparator, String>)>")]
    #[serde(rename = "Consequence", default)]
    pub consequence: Vec<String>,
    /// Impact class.
    #[serde(rename = "IMPACT")]
    pub impact: Option<Impact>,
    /// Gene symbol.
    #[serde(rename = "SYMBOL")]
    pub symbol: Option<String>,
    /// Gene accession.
    #[serde(rename = "Gene", skip_serializing_if = "Option::is_none")]
    pub gene: Option<String>,
    /// Transcript accession, with version.
    #[serde(rename = "Feature")]
    pub feature: Option<String>,
    /// Transcript biotype.
    #[serde(rename = "BIOTYPE")]
    pub biotype: Option<String>,
    #[serde(rename = "EXON", skip_serializing_if = "Option::is_none")]
    pub exon: Option<String>,
    #[serde(rename = "INTRON", skip_serializing_if = "Option::is_none")]
    pub intron: Option<String>,
    /// Coding HGVS, prefixed with the transcript accession.
    #[serde(rename = "HGVSc")]
    pub hgvsc: Option<String>,
    /// Protein HGVS, prefixed with the protein accession.
    #[serde(rename = "HGVSp")]
    pub hgvsp: Option<String>,
    /// `YES` if VEP flagged the transcript as canonical.
    #[serde(rename = "CANONICAL")]
    pub canonical: Option<String>,
}

impl Consequence {
    /// Whether VEP flagged this transcript as canonical.
    pub fn is_vep_canonical(&self) -> bool {
        self.canonical.as_deref() == Some("YES")
    }

    /// Whether the transcript is protein-coding.
    pub fn is_protein_coding(&self) -> bool {
        self.biotype.as_deref() == Some("protein_coding")
    }

    /// Protein change without accession, if any.
    pub fn short_hgvsp(&self) -> Option<String> {
        self.hgvsp
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(short_hgvs)
    }

    /// Coding change without accession, if any.
    pub fn short_hgvsc(&self) -> Option<String> {
        self.hgvsc
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(short_hgvs)
    }
}

/// Provenance of the selected consequence.
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
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CsqProvenance {
    /// Matched the database-declared canonical transcript.
    Db,
    /// Flagged canonical by VEP.
    Vep,
    /// Fallback choice.
    Random,
}

/// The `INFO` block of a variant call record.
#[serde_as]
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default, PartialEq)]
pub struct VariantInfo {
    /// All transcript consequences in pipeline order.
    #[serde(rename = "CSQ", default)]
    pub csq: Vec<Consequence>,
    /// Consequence chosen as representative.
    #[serde(rename = "selected_CSQ", skip_serializing_if = "Option::is_none")]
    pub selected_csq: Option<Consequence>,
    /// How `selected_csq` was chosen.
    #[serde(
        rename = "selected_CSQ_criteria",
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_csq_criteria: Option<CsqProvenance>,
    /// Structural variant length, if reported by the caller.
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(rename = "SVLEN", skip_serializing_if = "Option::is_none")]
    pub svlen: Option<f64>,
}

/// Whether a genotype call comes from the tumor/case or the normal/control sample.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CallType {
    Case,
    Control,
}

/// One genotype call (`GT[]`); numeric values are coerced from strings if needed.
#[serde_as]
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct GenotypeCall {
    /// Sample name.
    #[serde(default)]
    pub sample: String,
    /// Case or control.
    #[serde(rename = "type")]
    pub call_type: CallType,
    /// Allele fraction.
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(rename = "AF")]
    pub af: Option<f64>,
    /// Read depth.
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(rename = "DP")]
    pub dp: Option<f64>,
    /// Variant-supporting reads.
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(rename = "VD")]
    pub vd: Option<f64>,
    /// Genotype string.
    #[serde(rename = "GT", skip_serializing_if = "Option::is_none")]
    pub genotype: Option<String>,
}

/// A small variant call as stored by the assay pipeline.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct VariantCallRecord {
    /// Store identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Identifier of the owning sample.
    #[serde(rename = "SAMPLE_ID")]
    pub sample_id: String,
    #[serde(rename = "CHROM")]
    pub chrom: String,
    #[serde(rename = "POS")]
    pub pos: i64,
    #[serde(rename = "REF")]
    pub reference: String,
    #[serde(rename = "ALT")]
    pub alternative: String,
    /// Caller / pipeline filter flags, e.g., `GERMLINE`.
    #[serde(rename = "FILTER", default)]
    pub filter: Vec<String>,
    #[serde(rename = "INFO", default)]
    pub info: VariantInfo,
    /// Genotype calls.
    #[serde(rename = "GT", default)]
    pub calls: Vec<GenotypeCall>,
    /// Flagged as irrelevant by a reviewer.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub irrelevant: bool,
    /// Narrow classification looked up through the transcript set, request-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_classification: Option<AdditionalClassification>,
    /// Any further fields, e.g., marker flags used by carve-outs.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl VariantCallRecord {
    /// Compact identity `CHROM_POS_REF_ALT`.
    pub fn simple_id(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            canonicalize_chrom(&self.chrom),
            self.pos,
            self.reference,
            self.alternative
        )
    }

    /// Genomic identity `CHROM:POS:REF/ALT` as used for `g` nomenclature annotations.
    pub fn genomic_identity(&self) -> String {
        format!(
            "{}:{}:{}/{}",
            canonicalize_chrom(&self.chrom),
            self.pos,
            self.reference,
            self.alternative
        )
    }

    /// Genotype calls of the given type.
    pub fn calls_of(&self, call_type: CallType) -> impl Iterator<Item = &GenotypeCall> {
        self.calls.iter().filter(move |c| c.call_type == call_type)
    }

    /// Length of a structural event from `SVLEN`, else the number of inserted bases;
    /// `None` for substitutions and deletions.
    pub fn insertion_length(&self) -> Option<f64> {
        match self.info.svlen {
            Some(svlen) => Some(svlen.abs()),
            None => {
                let inserted = self.alternative.len() as f64 - self.reference.len() as f64;
                (inserted > 0.0).then_some(inserted)
            }
        }
    }

    /// Whether the marker field `name` is set to a truthy value.
    pub fn has_marker(&self, name: &str) -> bool {
        match self.extra.get(name) {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::Null) | None => false,
            Some(serde_json::Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    /// Gene symbol of the selected consequence, if any.
    pub fn selected_gene(&self) -> Option<&str> {
        self.info
            .selected_csq
            .as_ref()
            .and_then(|csq| csq.symbol.as_deref())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Minimal record used across the test modules of this crate.
    pub(crate) fn example_record() -> VariantCallRecord {
        serde_json::from_value(serde_json::json!({
            "_id": "var-1",
            "SAMPLE_ID": "sample-1",
            "CHROM": "chr17",
            "POS": 7577120,
            "REF": "C",
            "ALT": "T",
            "FILTER": ["PASS"],
            "INFO": {
                "CSQ": [
                    {
                        "Consequence": "missense_variant&splice_region_variant",
                        "IMPACT": "MODERATE",
                        "SYMBOL": "TP53",
                        "Feature": "ENST00000269305.9",
                        "BIOTYPE": "protein_coding",
                        "HGVSc": "ENST00000269305.9:c.818G>A",
                        "HGVSp": "ENSP00000269305.4:p.Arg273His",
                        "CANONICAL": "YES"
                    }
                ]
            },
            "GT": [
                {"sample": "tumor", "type": "case", "AF": "0.20", "DP": 100, "VD": "40"}
            ]
        }))
        .expect("valid example record")
    }

    #[test]
    fn deserialize_coerces_numbers_and_terms() {
        let record = example_record();

        assert_eq!(record.calls[0].af, Some(0.2));
        assert_eq!(record.calls[0].dp, Some(100.0));
        assert_eq!(record.calls[0].vd, Some(40.0));
        assert_eq!(
            record.info.csq[0].consequence,
            vec![
                String::from("missense_variant"),
                String::from("splice_region_variant")
            ]
        );
        assert_eq!(record.info.csq[0].impact, Some(Impact::Moderate));
    }

    #[test]
    fn identities() {
        let record = example_record();

        assert_eq!(record.simple_id(), "17_7577120_C_T");
        assert_eq!(record.genomic_identity(), "17:7577120:C/T");
        assert_eq!(
            record.info.csq[0].short_hgvsp().as_deref(),
            Some("p.Arg273His")
        );
        assert_eq!(
            record.info.csq[0].short_hgvsc().as_deref(),
            Some("c.818G>A")
        );
    }

    #[test]
    fn unknown_impact_and_markers() {
        let record: VariantCallRecord = serde_json::from_value(serde_json::json!({
            "_id": "var-2",
            "SAMPLE_ID": "sample-1",
            "CHROM": "13",
            "POS": 28608250,
            "REF": "A",
            "ALT": "AGGGCCCTTTAAACCC",
            "INFO": {"CSQ": [{"Consequence": ["inframe_insertion"], "IMPACT": "SEVERE"}]},
            "germline_confirmed": true
        }))
        .expect("valid record");

        assert_eq!(record.info.csq[0].impact, Some(Impact::Other));
        assert!(record.has_marker("germline_confirmed"));
        assert!(!record.has_marker("absent"));
        assert_eq!(record.insertion_length(), Some(15.0));
    }

    #[test]
    fn insertion_length_of_deletion_and_structural_event() {
        let mut record = example_record();
        assert_eq!(record.insertion_length(), None);

        record.reference = format!("C{}", "A".repeat(20));
        assert_eq!(record.insertion_length(), None);

        record.info.svlen = Some(-120.0);
        assert_eq!(record.insertion_length(), Some(120.0));
    }
}
