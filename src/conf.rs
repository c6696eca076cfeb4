//! Reporting configuration: assay groups, term mappings, and report layout hints.
//!
//! The configuration is loaded once per batch and passed explicitly into the builders and
//! resolvers; nothing in this crate mutates it after loading.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::err::AppError;

/// Thresholds applied by the main inclusion rule.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FilterThresholds {
    /// Minimal allele fraction in the case call.
    pub min_freq: f64,
    /// Maximal allele fraction in the control call.
    pub max_freq: f64,
    /// Minimal depth in both case and control call.
    pub min_depth: f64,
    /// Minimal number of variant-supporting reads in the case call.
    pub min_reads: f64,
    /// Allowed consequence terms or names of consequence groups.
    #[serde(default)]
    pub consequences: BTreeSet<String>,
}

impl FilterThresholds {
    /// Expand group names in `consequences` to the VEP terms they stand for.  Names
    /// that are not groups are kept as they are.
    pub fn expanded_consequences(&self, config: &ReportingConfig) -> BTreeSet<String> {
        self.consequences
            .iter()
            .flat_map(|name| match config.consequence_groups.get(name) {
                Some(terms) => terms.clone(),
                None => vec![name.clone()],
            })
            .collect()
    }
}

/// Carve-out for variants flagged as germline.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GermlineCarveOut {
    /// Filter flag marking germline variants.
    #[serde(default = "default_germline_flag")]
    pub filter_flag: String,
    /// Restrict to these genes; empty means no gene restriction.
    #[serde(default)]
    pub genes: Vec<String>,
    /// Additionally require this marker field to be set on the record.
    #[serde(default)]
    pub marker_field: Option<String>,
}

fn default_germline_flag() -> String {
    String::from("GERMLINE")
}

/// Carve-out for a hardcoded coordinate window.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LocusWindow {
    pub chrom: String,
    /// First position in the window, 1-based, inclusive.
    pub start: i64,
    /// Last position in the window, 1-based, inclusive.
    pub end: i64,
}

/// Rule admitting long insertions or structural events in named genes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LargeInsertionRule {
    pub genes: Vec<String>,
    pub min_length: f64,
    pub max_length: f64,
}

impl Default for LargeInsertionRule {
    fn default() -> Self {
        Self {
            genes: vec![String::from("FLT3")],
            min_length: 10.0,
            max_length: 200.0,
        }
    }
}

/// Rule admitting regulatory consequences in a small set of genes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RegulatoryRule {
    pub genes: Vec<String>,
    pub consequences: Vec<String>,
}

impl Default for RegulatoryRule {
    fn default() -> Self {
        Self {
            genes: vec![String::from("TERT"), String::from("NFKBIE")],
            consequences: vec![
                String::from("regulatory_region_variant"),
                String::from("TF_binding_site_variant"),
            ],
        }
    }
}

/// Settings of one assay group.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AssayGroupConfig {
    /// Default thresholds of the group.
    pub thresholds: FilterThresholds,
    #[serde(default)]
    pub germline: Option<GermlineCarveOut>,
    #[serde(default)]
    pub fixed_locus: Option<LocusWindow>,
    #[serde(default)]
    pub large_insertion: Option<LargeInsertionRule>,
    #[serde(default)]
    pub regulatory: Option<RegulatoryRule>,
    /// Whether classifications are scoped by subpanel in addition to assay.
    #[serde(default)]
    pub subpanel_scoped: bool,
}

/// Header synonyms of the result table columns in rendered reports.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ColumnSynonyms {
    pub gene: Vec<String>,
    pub mutation: Vec<String>,
    pub exon: Vec<String>,
    pub variant_fraction: Vec<String>,
    pub classification: Vec<String>,
}

impl Default for ColumnSynonyms {
    fn default() -> Self {
        fn strs(values: &[&str]) -> Vec<String> {
            values.iter().map(|s| s.to_string()).collect()
        }
        Self {
            gene: strs(&["gen", "gene"]),
            mutation: strs(&["mutation", "variant", "förändring", "alteration"]),
            exon: strs(&["exon", "intron"]),
            variant_fraction: strs(&[
                "variantfraktion",
                "variant fraction",
                "allelfrekvens",
                "vaf",
                "andel",
            ]),
            classification: strs(&["klassificering", "classification", "tier", "klass"]),
        }
    }
}

/// The complete configuration of the reporting core.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReportingConfig {
    pub assay_groups: IndexMap<String, AssayGroupConfig>,
    /// Consequence groups used in thresholds, mapped to VEP terms.
    #[serde(default = "default_consequence_groups")]
    pub consequence_groups: IndexMap<String, Vec<String>>,
    /// Classification names found in reports, lower case, mapped to tiers.
    #[serde(default = "default_classification_names")]
    pub classification_names: IndexMap<String, u16>,
    #[serde(default)]
    pub column_synonyms: ColumnSynonyms,
    /// Value of the `id` attribute of the results section in rendered reports.
    #[serde(default = "default_results_section_id")]
    pub results_section_id: String,
}

fn default_results_section_id() -> String {
    String::from("results")
}

fn default_classification_names() -> IndexMap<String, u16> {
    [
        ("tier i", 1),
        ("tier ii", 2),
        ("tier iii", 3),
        ("tier iv", 4),
        ("stark klinisk signifikans", 1),
        ("potentiell klinisk signifikans", 2),
        ("oklar klinisk signifikans", 3),
        ("benign", 4),
        ("sannolikt benign", 4),
        ("strong clinical significance", 1),
        ("potential clinical significance", 2),
        ("unknown clinical significance", 3),
        ("likely benign", 4),
        ("i", 1),
        ("ii", 2),
        ("iii", 3),
        ("iv", 4),
    ]
    .into_iter()
    .map(|(name, tier)| (name.to_string(), tier))
    .collect()
}

fn default_consequence_groups() -> IndexMap<String, Vec<String>> {
    let groups: &[(&str, &[&str])] = &[
        (
            "splicing",
            &[
                "splice_acceptor_variant",
                "splice_donor_variant",
                "splice_region_variant",
            ],
        ),
        ("stop_gained", &["stop_gained"]),
        (
            "frameshift",
            &["frameshift_variant", "frameshift_elongation", "frameshift_truncation"],
        ),
        ("stop_lost", &["stop_lost"]),
        ("start_lost", &["start_lost"]),
        (
            "inframe_indel",
            &[
                "inframe_insertion",
                "inframe_deletion",
                "disruptive_inframe_insertion",
                "disruptive_inframe_deletion",
            ],
        ),
        ("missense", &["missense_variant", "protein_altering_variant"]),
        ("synonymous", &["synonymous_variant", "stop_retained_variant"]),
        ("utr", &["5_prime_UTR_variant", "3_prime_UTR_variant"]),
    ];
    groups
        .iter()
        .map(|(name, terms)| {
            (
                name.to_string(),
                terms.iter().map(|t| t.to_string()).collect(),
            )
        })
        .collect()
}

fn default_somatic_consequences() -> BTreeSet<String> {
    [
        "splicing",
        "stop_gained",
        "frameshift",
        "stop_lost",
        "start_lost",
        "inframe_indel",
        "missense",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for ReportingConfig {
    fn default() -> Self {
        let mut assay_groups = IndexMap::new();
        assay_groups.insert(
            String::from("myeloid"),
            AssayGroupConfig {
                thresholds: FilterThresholds {
                    min_freq: 0.05,
                    max_freq: 0.05,
                    min_depth: 100.0,
                    min_reads: 10.0,
                    consequences: default_somatic_consequences(),
                },
                germline: Some(GermlineCarveOut {
                    filter_flag: default_germline_flag(),
                    genes: ["CEBPA", "DDX41", "ETV6", "GATA2", "RUNX1"]
                        .into_iter()
                        .map(String::from)
                        .collect(),
                    marker_field: None,
                }),
                fixed_locus: None,
                large_insertion: Some(LargeInsertionRule::default()),
                regulatory: None,
                subpanel_scoped: false,
            },
        );
        assay_groups.insert(
            String::from("myeloid_legacy"),
            AssayGroupConfig {
                thresholds: FilterThresholds {
                    min_freq: 0.05,
                    max_freq: 0.05,
                    min_depth: 100.0,
                    min_reads: 10.0,
                    consequences: default_somatic_consequences(),
                },
                germline: None,
                // CALR exon 9 on GRCh37
                fixed_locus: Some(LocusWindow {
                    chrom: String::from("19"),
                    start: 13_054_527,
                    end: 13_055_304,
                }),
                large_insertion: Some(LargeInsertionRule::default()),
                regulatory: None,
                subpanel_scoped: false,
            },
        );
        assay_groups.insert(
            String::from("lymphoid"),
            AssayGroupConfig {
                thresholds: FilterThresholds {
                    min_freq: 0.03,
                    max_freq: 0.05,
                    min_depth: 100.0,
                    min_reads: 10.0,
                    consequences: default_somatic_consequences(),
                },
                germline: None,
                fixed_locus: None,
                large_insertion: None,
                regulatory: Some(RegulatoryRule::default()),
                subpanel_scoped: false,
            },
        );
        assay_groups.insert(
            String::from("solid"),
            AssayGroupConfig {
                thresholds: FilterThresholds {
                    min_freq: 0.05,
                    max_freq: 0.05,
                    min_depth: 200.0,
                    min_reads: 10.0,
                    consequences: default_somatic_consequences(),
                },
                germline: Some(GermlineCarveOut {
                    filter_flag: default_germline_flag(),
                    genes: vec![],
                    marker_field: Some(String::from("germline_confirmed")),
                }),
                fixed_locus: None,
                large_insertion: None,
                regulatory: Some(RegulatoryRule::default()),
                subpanel_scoped: true,
            },
        );
        Self {
            assay_groups,
            consequence_groups: default_consequence_groups(),
            classification_names: default_classification_names(),
            column_synonyms: ColumnSynonyms::default(),
            results_section_id: default_results_section_id(),
        }
    }
}

impl ReportingConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &str) -> Result<Self, anyhow::Error> {
        let path = crate::common::expand_path(path)?;
        tracing::debug!("loading reporting configuration from {:?}", &path);
        crate::common::io::read_json(&path)
    }

    /// Look up the settings of an assay group.
    pub fn assay_group(&self, name: &str) -> Result<&AssayGroupConfig, AppError> {
        self.assay_groups
            .get(name)
            .ok_or_else(|| AppError::UnknownAssayGroup(name.to_string()))
    }

    /// Whether classifications for `assay` are scoped by subpanel.  Unknown assays are
    /// scoped by assay only.
    pub fn is_subpanel_scoped(&self, assay: &str) -> bool {
        self.assay_groups
            .get(assay)
            .map(|group| group.subpanel_scoped)
            .unwrap_or(false)
    }

    /// Map a classification text from a report to a tier.
    pub fn tier_for_name(&self, name: &str) -> Option<u16> {
        let name = name.trim().to_lowercase();
        if let Ok(number) = name.parse::<u16>() {
            return (1..=4).contains(&number).then_some(number);
        }
        self.classification_names.get(name.as_str()).copied()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn load_from_file() -> Result<(), anyhow::Error> {
        let config = ReportingConfig::load("tests/conf/reporting.json")?;

        let myeloid = config.assay_group("myeloid")?;
        assert_eq!(myeloid.thresholds.min_depth, 100.0);
        assert!(myeloid.germline.is_some());
        assert!(config.is_subpanel_scoped("solid"));
        assert!(!config.is_subpanel_scoped("myeloid"));
        assert_eq!(config.results_section_id, "results");
        // defaults are filled in for omitted sections
        assert_eq!(config.tier_for_name("Tier II"), Some(2));

        Ok(())
    }

    #[test]
    fn unknown_assay_group() {
        let config = ReportingConfig::default();

        assert_eq!(
            config.assay_group("nonexistent").unwrap_err().to_string(),
            "Unknown assay group: nonexistent"
        );
    }

    #[rstest]
    #[case("Tier I", Some(1))]
    #[case(" stark klinisk signifikans ", Some(1))]
    #[case("3", Some(3))]
    #[case("IV", Some(4))]
    #[case("7", None)]
    #[case("kanske", None)]
    fn tier_for_name(#[case] name: &str, #[case] expected: Option<u16>) {
        assert_eq!(ReportingConfig::default().tier_for_name(name), expected);
    }

    #[test]
    fn expanded_consequences() {
        let config = ReportingConfig::default();
        let thresholds = FilterThresholds {
            min_freq: 0.05,
            max_freq: 0.05,
            min_depth: 100.0,
            min_reads: 10.0,
            consequences: ["splicing", "intron_variant"]
                .into_iter()
                .map(String::from)
                .collect(),
        };

        let terms = thresholds.expanded_consequences(&config);

        assert_eq!(
            terms.into_iter().collect::<Vec<_>>(),
            vec![
                "intron_variant",
                "splice_acceptor_variant",
                "splice_donor_variant",
                "splice_region_variant",
            ]
        );
    }
}
