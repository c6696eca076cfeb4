//! Prose and statistics for small variants.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::{
    annos::ResolvedVariant,
    schema::annotation::{Tier, UNCLASSIFIED},
    summary::lang::{count_word, findings_to_prose, genes_phrase, plural},
};

/// Tiers mentioned in the prose, in order.
pub const PROSE_TIERS: [Tier; 3] = [Tier::Strong, Tier::Potential, Tier::Unclear];

/// Text used when no variant of tier I to III remains.
pub const NOTHING_FOUND: &str =
    "Analysen påvisar inga varianter av stark, potentiell eller oklar klinisk signifikans.";

/// Restriction of the summary to a set of genes; inactive if empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GeneFilter(pub Vec<String>);

impl GeneFilter {
    pub fn is_active(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn admits(&self, gene: &str) -> bool {
        !self.is_active() || self.0.iter().any(|g| g == gene)
    }
}

/// Gene of a resolved variant for the purpose of the summary.
pub fn gene_of(variant: &ResolvedVariant) -> Option<&str> {
    variant
        .identity
        .as_ref()
        .map(|identity| identity.gene.as_str())
        .or_else(|| variant.variant.selected_gene())
}

/// Variants that enter the summary: not flagged irrelevant and admitted by `filter`.
pub fn summarized<'a>(
    variants: &'a [ResolvedVariant],
    filter: &'a GeneFilter,
) -> impl Iterator<Item = &'a ResolvedVariant> + 'a {
    variants.iter().filter(move |v| {
        !v.variant.irrelevant && gene_of(v).map(|g| filter.admits(g)).unwrap_or(false)
    })
}

/// Number and share of variants per tier.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TierStatistics {
    pub total: usize,
    /// Count per tier; unclassified variants are counted under `UNCLASSIFIED`.
    pub counts: BTreeMap<u16, usize>,
    /// Percentage of `total` per tier.
    pub percentages: BTreeMap<u16, f64>,
}

impl TierStatistics {
    pub fn from_tiers<I: IntoIterator<Item = u16>>(tiers: I) -> Self {
        let counts = tiers.into_iter().counts().into_iter().collect::<BTreeMap<_, _>>();
        let total = counts.values().sum::<usize>();
        let percentages = counts
            .iter()
            .map(|(tier, count)| (*tier, 100.0 * *count as f64 / total as f64))
            .collect();
        Self {
            total,
            counts,
            percentages,
        }
    }

    pub fn count(&self, tier: u16) -> usize {
        self.counts.get(&tier).copied().unwrap_or_default()
    }

    pub fn percentage(&self, tier: u16) -> f64 {
        self.percentages.get(&tier).copied().unwrap_or_default()
    }

    pub fn unclassified(&self) -> usize {
        self.count(UNCLASSIFIED)
    }
}

fn tier_phrase(tier: Tier) -> &'static str {
    match tier {
        Tier::Strong => "stark klinisk signifikans",
        Tier::Potential => "potentiell klinisk signifikans",
        Tier::Unclear => "oklar klinisk signifikans",
        Tier::Benign => "ingen klinisk signifikans",
    }
}

/// Finding for one tier, e.g., "två varianter av stark klinisk signifikans (tier I) i
/// generna KRAS och TP53".
fn tier_finding(tier: Tier, variants: &[&ResolvedVariant]) -> String {
    let genes = variants
        .iter()
        .filter_map(|v| gene_of(v))
        .sorted()
        .dedup()
        .collect::<Vec<_>>();
    format!(
        "{} {} av {} (tier {}) i {}",
        count_word(variants.len()),
        plural(variants.len(), "variant", "varianter"),
        tier_phrase(tier),
        tier.roman(),
        genes_phrase(&genes)
    )
}

/// Summary text of the small variants together with the tier statistics.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SnvSummary {
    pub text: String,
    pub statistics: TierStatistics,
}

/// Summarize `variants` tier by tier.
pub fn summarize_snvs(variants: &[ResolvedVariant], filter: &GeneFilter) -> SnvSummary {
    let included = summarized(variants, filter).collect::<Vec<_>>();
    let statistics = TierStatistics::from_tiers(included.iter().map(|v| v.tier));

    let findings = PROSE_TIERS
        .iter()
        .filter_map(|tier| {
            let in_tier = included
                .iter()
                .copied()
                .filter(|v| v.tier == tier.class())
                .collect::<Vec<_>>();
            (!in_tier.is_empty()).then(|| tier_finding(*tier, &in_tier))
        })
        .collect::<Vec<_>>();

    let text = if findings.is_empty() {
        String::from(NOTHING_FOUND)
    } else {
        findings_to_prose(&findings)
    };
    tracing::debug!(
        "summarized {} of {} variants into {} findings",
        included.len(),
        variants.len(),
        findings.len()
    );
    SnvSummary { text, statistics }
}
