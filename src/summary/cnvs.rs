//! Prose for copy-number variants.

use crate::summary::lang::{count_word, decimal, findings_to_prose, genes_phrase, plural};

/// Copy number of a diploid region.
pub const NEUTRAL_COPY_NUMBER: f64 = 2.0;

/// A copy-number change spanning one or more genes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct CopyNumberVariant {
    /// Reported genes within the segment.
    pub genes: Vec<String>,
    /// Number of further genes spanned by the segment.
    #[serde(default)]
    pub other_genes: usize,
    /// Estimated absolute copy number.
    pub copy_number: f64,
    /// Percentage of reads supporting the change.
    pub read_support: f64,
    #[serde(default)]
    #[new(default)]
    pub irrelevant: bool,
}

/// Direction of a copy-number change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CopyNumberChange {
    #[strum(serialize = "amplifiering")]
    Amplification,
    #[strum(serialize = "förlust")]
    Loss,
}

impl CopyNumberVariant {
    /// Amplification above two copies, loss below, `None` if neutral.
    pub fn change(&self) -> Option<CopyNumberChange> {
        if self.copy_number > NEUTRAL_COPY_NUMBER {
            Some(CopyNumberChange::Amplification)
        } else if self.copy_number < NEUTRAL_COPY_NUMBER {
            Some(CopyNumberChange::Loss)
        } else {
            None
        }
    }
}

fn finding(cnv: &CopyNumberVariant, change: CopyNumberChange) -> String {
    let mut result = format!(
        "{} av {} (uppskattat kopietal {}, {} % av läsningarna stödjer förändringen)",
        change,
        genes_phrase(&cnv.genes),
        decimal(cnv.copy_number, 1),
        decimal(cnv.read_support, 1),
    );
    if cnv.other_genes > 0 {
        result.push_str(&format!(
            " som även omfattar {} {}",
            count_word(cnv.other_genes),
            plural(cnv.other_genes, "annan gen", "andra gener")
        ));
    }
    result
}

/// Summarize the relevant, non-neutral copy-number variants; `None` if there are none.
pub fn summarize_cnvs(cnvs: &[CopyNumberVariant]) -> Option<String> {
    let findings = cnvs
        .iter()
        .filter(|cnv| !cnv.irrelevant && !cnv.genes.is_empty())
        .filter_map(|cnv| cnv.change().map(|change| finding(cnv, change)))
        .collect::<Vec<_>>();
    (!findings.is_empty()).then(|| findings_to_prose(&findings))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(8.0, Some(CopyNumberChange::Amplification))]
    #[case(2.0, None)]
    #[case(1.2, Some(CopyNumberChange::Loss))]
    #[case(0.0, Some(CopyNumberChange::Loss))]
    fn change(#[case] copy_number: f64, #[case] expected: Option<CopyNumberChange>) {
        let cnv = CopyNumberVariant::new(vec!["ERBB2".into()], 0, copy_number, 50.0);

        assert_eq!(cnv.change(), expected);
    }

    #[test]
    fn amplification_and_loss() {
        let cnvs = vec![
            CopyNumberVariant::new(vec!["ERBB2".into(), "GRB7".into()], 3, 8.0, 62.0),
            CopyNumberVariant::new(vec!["MYC".into()], 0, 2.0, 10.0),
            CopyNumberVariant::new(vec!["CDKN2A".into()], 1, 0.6, 71.3),
        ];

        insta::assert_snapshot!(
            summarize_cnvs(&cnvs).unwrap_or_default(),
            @"Analysen påvisar amplifiering av generna ERBB2 och GRB7 (uppskattat kopietal 8,0, 62,0 % av läsningarna stödjer förändringen) som även omfattar tre andra gener. Slutligen påvisas förlust av genen CDKN2A (uppskattat kopietal 0,6, 71,3 % av läsningarna stödjer förändringen) som även omfattar en annan gen."
        );
    }

    #[test]
    fn neutral_and_irrelevant_are_skipped() {
        let mut ignored = CopyNumberVariant::new(vec!["EGFR".into()], 0, 12.0, 80.0);
        ignored.irrelevant = true;
        let neutral = CopyNumberVariant::new(vec!["MYC".into()], 0, 2.0, 10.0);

        assert_eq!(summarize_cnvs(&[ignored, neutral]), None);
    }
}
