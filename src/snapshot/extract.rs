//! Extraction of reported variants from the results section of rendered reports.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    conf::{ColumnSynonyms, ReportingConfig},
    err::ReportError,
    hgvsp::{is_protein_notation, normalize_hgvsp},
};

static TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<table\b[^>]*>(.*?)</table\s*>").expect("valid regex"));
static ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>").expect("valid regex"));
static CELL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<t([hd])\b[^>]*>(.*?)</t[hd]\s*>").expect("valid regex")
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// One table of the results section, as plain cell texts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Positions of the known columns in a result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub gene: usize,
    pub mutation: usize,
    pub classification: usize,
    pub exon: Option<usize>,
    pub variant_fraction: Option<usize>,
}

/// A reported variant as read from a result table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExtractedRow {
    pub gene: String,
    /// Mutation text as printed.
    pub mutation: String,
    /// Mutation text after normalization, used for matching.
    pub variant: String,
    /// Classification text as printed.
    pub classification: String,
    pub exon: Option<String>,
    pub variant_fraction: Option<String>,
    pub table: usize,
    pub row: usize,
}

/// A row whose classification text could not be mapped to a tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub row: ExtractedRow,
    pub reason: String,
}

/// Rows extracted from one report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    /// Deduplicated rows with their tier.
    pub rows: Vec<(ExtractedRow, u16)>,
    /// Rows that look like variants but could not be interpreted.
    pub rejected: Vec<RejectedRow>,
}

/// Convert the markup of a cell to plain text.
pub fn cell_text(markup: &str) -> String {
    let text = TAG.replace_all(markup, " ");
    let text = NUMERIC_ENTITY.replace_all(&text, |caps: &regex::Captures| {
        let code = &caps[1];
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        value
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Return the markup inside the element with `id="section_id"`, if any.
pub fn results_section<'a>(markup: &'a str, section_id: &str) -> Option<&'a str> {
    let open = Regex::new(&format!(
        r#"(?i)<([a-z][a-z0-9]*)\b[^>]*\sid\s*=\s*["']{}["'][^>]*>"#,
        regex::escape(section_id)
    ))
    .ok()?;
    let caps = open.captures(markup)?;
    let tag = caps.get(1)?.as_str();
    let start = caps.get(0)?.end();

    // find the matching close tag, honouring nested elements of the same name
    let nested = Regex::new(&format!(r"(?i)<(/?){}\b[^>]*>", regex::escape(tag))).ok()?;
    let mut depth = 1usize;
    for m in nested.captures_iter(&markup[start..]) {
        let whole = m.get(0)?;
        if m[1].is_empty() {
            if !whole.as_str().ends_with("/>") {
                depth += 1;
            }
        } else {
            depth -= 1;
            if depth == 0 {
                return Some(&markup[start..start + whole.start()]);
            }
        }
    }
    Some(&markup[start..])
}

/// Split `section` into tables; the header is the first row with `th` cells, or the
/// first row if there is none.
pub fn result_tables(section: &str) -> Vec<ResultTable> {
    TABLE
        .captures_iter(section)
        .map(|table| {
            let rows = ROW
                .captures_iter(&table[1])
                .map(|row| {
                    CELL.captures_iter(&row[1])
                        .map(|cell| (&cell[1] == "h" || &cell[1] == "H", cell_text(&cell[2])))
                        .collect::<Vec<_>>()
                })
                .filter(|cells| !cells.is_empty())
                .collect::<Vec<_>>();
            let header_idx = rows
                .iter()
                .position(|cells| cells.iter().any(|(is_th, _)| *is_th))
                .unwrap_or(0);
            let mut rows = rows
                .into_iter()
                .map(|cells| cells.into_iter().map(|(_, text)| text).collect::<Vec<_>>())
                .skip(header_idx)
                .collect::<Vec<_>>();
            if rows.is_empty() {
                ResultTable::default()
            } else {
                let header = rows.remove(0);
                ResultTable { header, rows }
            }
        })
        .collect()
}

/// Locate the known columns by case-insensitive substring match of the header cells.
/// Returns `None` if gene, mutation, or classification cannot be found.
pub fn map_columns(header: &[String], synonyms: &ColumnSynonyms) -> Option<ColumnMap> {
    let lower = header.iter().map(|h| h.to_lowercase()).collect::<Vec<_>>();
    let mut taken = vec![false; header.len()];
    let mut find = |candidates: &[String]| -> Option<usize> {
        let idx = lower.iter().enumerate().position(|(idx, text)| {
            !taken[idx]
                && candidates
                    .iter()
                    .any(|c| text.contains(c.to_lowercase().as_str()))
        })?;
        taken[idx] = true;
        Some(idx)
    };

    // more specific columns first so that, e.g., "Variantfraktion" is not taken as the
    // mutation column
    let variant_fraction = find(synonyms.variant_fraction.as_slice());
    let classification = find(synonyms.classification.as_slice())?;
    let exon = find(synonyms.exon.as_slice());
    let gene = find(synonyms.gene.as_slice())?;
    let mutation = find(synonyms.mutation.as_slice())?;
    Some(ColumnMap {
        gene,
        mutation,
        classification,
        exon,
        variant_fraction,
    })
}

/// Normalize mutation text for matching against the variant store.
pub fn normalize_mutation(text: &str) -> String {
    let mut s = text.trim();
    while let Some(inner) = s.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        s = inner.trim();
    }
    if is_protein_notation(s) {
        normalize_hgvsp(s)
    } else {
        s.to_string()
    }
}

/// Extract and deduplicate the reported variants of a rendered report.
pub fn extract_rows(markup: &str, config: &ReportingConfig) -> Result<Extraction, ReportError> {
    let section = results_section(markup, &config.results_section_id)
        .ok_or(ReportError::NoResultsSection)?;

    let mut result = Extraction::default();
    let mut rows = Vec::new();
    for (table_idx, table) in result_tables(section).into_iter().enumerate() {
        let columns = match map_columns(&table.header, &config.column_synonyms) {
            Some(columns) => columns,
            None => {
                tracing::debug!(
                    "skipping table {} with header {:?}",
                    table_idx,
                    &table.header
                );
                continue;
            }
        };
        for (row_idx, cells) in table.rows.iter().enumerate() {
            let cell = |idx: usize| cells.get(idx).cloned().unwrap_or_default();
            let optional = |idx: Option<usize>| {
                idx.and_then(|idx| cells.get(idx))
                    .filter(|text| !text.is_empty())
                    .cloned()
            };
            let gene = cell(columns.gene);
            let mutation = cell(columns.mutation);
            if gene.is_empty() || mutation.is_empty() {
                tracing::trace!("skipping row {:?} without gene or mutation", cells);
                continue;
            }
            let row = ExtractedRow {
                variant: normalize_mutation(&mutation),
                gene,
                mutation,
                classification: cell(columns.classification),
                exon: optional(columns.exon),
                variant_fraction: optional(columns.variant_fraction),
                table: table_idx,
                row: row_idx,
            };
            match config.tier_for_name(&row.classification) {
                Some(tier) => rows.push((row, tier)),
                None => result.rejected.push(RejectedRow {
                    reason: format!("unknown classification {:?}", &row.classification),
                    row,
                }),
            }
        }
    }

    result.rows = rows
        .into_iter()
        .unique_by(|(row, tier)| (row.gene.clone(), *tier, row.variant.clone()))
        .collect();
    Ok(result)
}
