//! Prose for translocations (gene fusions).

use crate::summary::lang::{count_word, decimal, findings_to_prose, plural};

/// A translocation between two genes as called by the fusion caller.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct Translocation {
    pub gene1: String,
    pub gene2: String,
    /// Reads spanning the breakpoint.
    pub split_reads: u32,
    /// Read pairs with one mate on each side of the breakpoint.
    pub paired_reads: u32,
    /// Total reads covering the breakpoint region.
    pub total_reads: u32,
    /// Estimate of unique (deduplicated) supporting reads.
    pub unique_reads: u32,
    #[serde(default)]
    #[new(default)]
    pub irrelevant: bool,
}

impl Translocation {
    fn percentage(&self, reads: u32) -> f64 {
        if self.total_reads == 0 {
            0.0
        } else {
            100.0 * reads as f64 / self.total_reads as f64
        }
    }

    pub fn split_read_percentage(&self) -> f64 {
        self.percentage(self.split_reads)
    }

    pub fn paired_read_percentage(&self) -> f64 {
        self.percentage(self.paired_reads)
    }

    /// Name of the fusion, e.g., `BCR::ABL1`.
    pub fn name(&self) -> String {
        format!("{}::{}", &self.gene1, &self.gene2)
    }
}

fn finding(translocation: &Translocation) -> String {
    format!(
        "en translokation mellan generna {} och {} ({}), där {} % av läsningarna är \
         split reads och {} % är läspar över brytpunkten, uppskattningsvis {} {}",
        &translocation.gene1,
        &translocation.gene2,
        translocation.name(),
        decimal(translocation.split_read_percentage(), 1),
        decimal(translocation.paired_read_percentage(), 1),
        count_word(translocation.unique_reads as usize),
        plural(
            translocation.unique_reads as usize,
            "unik läsning",
            "unika läsningar"
        ),
    )
}

/// Summarize the relevant translocations; `None` if there are none.
pub fn summarize_translocations(translocations: &[Translocation]) -> Option<String> {
    let findings = translocations
        .iter()
        .filter(|t| !t.irrelevant)
        .map(finding)
        .collect::<Vec<_>>();
    (!findings.is_empty()).then(|| findings_to_prose(&findings))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn single_translocation() {
        let translocations = vec![Translocation::new(
            "BCR".into(),
            "ABL1".into(),
            25,
            15,
            200,
            38,
        )];

        insta::assert_snapshot!(
            summarize_translocations(&translocations).unwrap_or_default(),
            @"Analysen påvisar en translokation mellan generna BCR och ABL1 (BCR::ABL1), där 12,5 % av läsningarna är split reads och 7,5 % är läspar över brytpunkten, uppskattningsvis 38 unika läsningar."
        );
    }

    #[test]
    fn several_translocations_and_irrelevant() {
        let mut ignored = Translocation::new("ETV6".into(), "RUNX1".into(), 1, 1, 10, 1);
        ignored.irrelevant = true;
        let translocations = vec![
            Translocation::new("PML".into(), "RARA".into(), 10, 10, 40, 1),
            ignored,
            Translocation::new("KMT2A".into(), "MLLT3".into(), 0, 0, 0, 0),
        ];

        insta::assert_snapshot!(
            summarize_translocations(&translocations).unwrap_or_default(),
            @"Analysen påvisar en translokation mellan generna PML och RARA (PML::RARA), där 25,0 % av läsningarna är split reads och 25,0 % är läspar över brytpunkten, uppskattningsvis en unik läsning. Slutligen påvisas en translokation mellan generna KMT2A och MLLT3 (KMT2A::MLLT3), där 0,0 % av läsningarna är split reads och 0,0 % är läspar över brytpunkten, uppskattningsvis inga unika läsningar."
        );
    }

    #[test]
    fn nothing_relevant() {
        let mut ignored = Translocation::new("ETV6".into(), "RUNX1".into(), 1, 1, 10, 1);
        ignored.irrelevant = true;

        assert_eq!(summarize_translocations(&[ignored]), None);
    }
}
