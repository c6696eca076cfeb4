//! Canned sentences for genomic biomarkers.

use crate::summary::lang::decimal;

/// HRD sums above this value indicate homologous recombination deficiency.
pub const HRD_THRESHOLD: f64 = 42.0;
/// MSI percentages above this value indicate microsatellite instability.
pub const MSI_THRESHOLD: f64 = 15.0;

/// Biomarker values of a sample; missing values are not reported.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Biomarkers {
    /// Sum of LOH, TAI, and LST scores.
    #[serde(default)]
    pub hrd_sum: Option<f64>,
    /// Percentage of unstable microsatellite sites.
    #[serde(default)]
    pub msi_percent: Option<f64>,
}

/// Sentences for the biomarkers above their thresholds; `None` if there are none.
pub fn summarize_biomarkers(biomarkers: &Biomarkers) -> Option<String> {
    let mut sentences = Vec::new();
    if let Some(hrd_sum) = biomarkers.hrd_sum.filter(|v| *v > HRD_THRESHOLD) {
        sentences.push(format!(
            "HRD-summan är {}, vilket överstiger tröskelvärdet {} och talar för homolog \
             rekombinationsdefekt (HRD).",
            decimal(hrd_sum, 0),
            decimal(HRD_THRESHOLD, 0)
        ));
    }
    if let Some(msi_percent) = biomarkers.msi_percent.filter(|v| *v > MSI_THRESHOLD) {
        sentences.push(format!(
            "Andelen instabila mikrosatelliter är {} %, vilket överstiger tröskelvärdet {} % \
             och talar för mikrosatellitinstabilitet (MSI-H).",
            decimal(msi_percent, 1),
            decimal(MSI_THRESHOLD, 0)
        ));
    }
    (!sentences.is_empty()).then(|| sentences.join(" "))
}
