//! Boolean predicate trees over `VariantCallRecord` fields.
//!
//! The tree serializes to JSON for handing to an external store and can be evaluated in
//! memory with `Predicate::matches`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    common::canonicalize_chrom,
    schema::variant::{CallType, GenotypeCall, VariantCallRecord},
};

/// Numeric field of a genotype call.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CallField {
    #[serde(rename = "AF")]
    #[strum(serialize = "AF")]
    Af,
    #[serde(rename = "DP")]
    #[strum(serialize = "DP")]
    Dp,
    #[serde(rename = "VD")]
    #[strum(serialize = "VD")]
    Vd,
}

/// Comparison operator.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Cmp {
    Gte,
    Lte,
}

/// One numeric bound on a genotype call field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, derive_new::new)]
pub struct Bound {
    pub field: CallField,
    pub cmp: Cmp,
    pub value: f64,
}

impl Bound {
    /// Whether the call satisfies this bound; missing values never do.
    pub fn holds(&self, call: &GenotypeCall) -> bool {
        let value = match self.field {
            CallField::Af => call.af,
            CallField::Dp => call.dp,
            CallField::Vd => call.vd,
        };
        match (value, self.cmp) {
            (Some(value), Cmp::Gte) => value >= self.value,
            (Some(value), Cmp::Lte) => value <= self.value,
            (None, _) => false,
        }
    }
}

/// Predicate tree node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// All children hold.
    And(Vec<Predicate>),
    /// Any child holds.
    Or(Vec<Predicate>),
    /// Some genotype call of the given type satisfies all bounds.
    CallMatches {
        call_type: CallType,
        bounds: Vec<Bound>,
    },
    /// No genotype call of the given type exists.
    NoCall { call_type: CallType },
    /// The `FILTER` list contains the flag.
    HasFilter(String),
    /// The selected consequence or any consequence entry carries one of the terms.
    ConsequenceIn(BTreeSet<String>),
    /// The selected consequence or any consequence entry is in one of the genes.
    GeneIn(BTreeSet<String>),
    /// The named marker field is set.
    Marker(String),
    /// The position lies in the inclusive window on the chromosome.
    Locus { chrom: String, start: i64, end: i64 },
    /// The record is an insertion or structural event with length in the inclusive range.
    InsertionLength { min: f64, max: f64 },
}

impl Predicate {
    /// Evaluate the predicate for one record.
    pub fn matches(&self, record: &VariantCallRecord) -> bool {
        match self {
            Predicate::And(children) => children.iter().all(|c| c.matches(record)),
            Predicate::Or(children) => children.iter().any(|c| c.matches(record)),
            Predicate::CallMatches { call_type, bounds } => record
                .calls_of(*call_type)
                .any(|call| bounds.iter().all(|b| b.holds(call))),
            Predicate::NoCall { call_type } => record.calls_of(*call_type).next().is_none(),
            Predicate::HasFilter(flag) => record.filter.iter().any(|f| f == flag),
            Predicate::ConsequenceIn(terms) => record
                .info
                .selected_csq
                .iter()
                .chain(record.info.csq.iter())
                .any(|csq| csq.consequence.iter().any(|term| terms.contains(term))),
            Predicate::GeneIn(genes) => record
                .info
                .selected_csq
                .iter()
                .chain(record.info.csq.iter())
                .filter_map(|csq| csq.symbol.as_ref())
                .any(|symbol| genes.contains(symbol)),
            Predicate::Marker(name) => record.has_marker(name),
            Predicate::Locus { chrom, start, end } => {
                canonicalize_chrom(&record.chrom) == canonicalize_chrom(chrom)
                    && *start <= record.pos
                    && record.pos <= *end
            }
            Predicate::InsertionLength { min, max } => record
                .insertion_length()
                .is_some_and(|length| *min <= length && length <= *max),
        }
    }

    /// Select the matching records, keeping their order.
    pub fn filter<'a, I>(&self, records: I) -> Vec<&'a VariantCallRecord>
    where
        I: IntoIterator<Item = &'a VariantCallRecord>,
    {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}
