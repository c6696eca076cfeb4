//! Conversion of one-letter HGVS protein notation to three-letter notation.
//!
//! Rendered reports print protein changes as, e.g., `p.(G62R)` while the variant store
//! holds `p.Gly62Arg`.  `normalize_hgvsp` bridges the two; input it does not recognize
//! is returned unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

/// Three-letter code for a one-letter amino acid code.
pub fn three_letter(one: char) -> Option<&'static str> {
    Some(match one {
        'A' => "Ala",
        'R' => "Arg",
        'N' => "Asn",
        'D' => "Asp",
        'C' => "Cys",
        'Q' => "Gln",
        'E' => "Glu",
        'G' => "Gly",
        'H' => "His",
        'I' => "Ile",
        'L' => "Leu",
        'K' => "Lys",
        'M' => "Met",
        'F' => "Phe",
        'P' => "Pro",
        'S' => "Ser",
        'T' => "Thr",
        'W' => "Trp",
        'Y' => "Tyr",
        'V' => "Val",
        'U' => "Sec",
        'O' => "Pyl",
        'X' => "Xaa",
        '*' => "Ter",
        _ => return None,
    })
}

/// Expand a run of one-letter codes token by token, e.g., `A*` to `AlaTer`.
fn expand_run(run: &str) -> Option<String> {
    run.chars().map(three_letter).collect()
}

/// Expand a single one-letter code given as string.
fn expand_one(code: &str) -> Option<&'static str> {
    let mut chars = code.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => three_letter(c),
        _ => None,
    }
}

const AA: &str = r"[ACDEFGHIKLMNOPQRSTUVWXY*]";

static FRAMESHIFT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^p\.({AA})(\d+)({AA})?fs(?:\*|Ter|X)?(\d+|\?)?$"
    ))
    .expect("valid regex")
});
static RANGE_DELINS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^p\.({AA})(\d+)_({AA})(\d+)delins({AA}+)$")).expect("valid regex")
});
static RANGE_INS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^p\.({AA})(\d+)_({AA})(\d+)ins({AA}+)$")).expect("valid regex")
});
static SINGLE_DELINS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^p\.({AA})(\d+)delins({AA}+)$")).expect("valid regex")
});
static RANGE_DEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^p\.({AA})(\d+)_({AA})(\d+)del$")).expect("valid regex")
});
static RANGE_DUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^p\.({AA})(\d+)_({AA})(\d+)dup$")).expect("valid regex")
});
static SINGLE_DEL_DUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^p\.({AA})(\d+)(del|dup)$")).expect("valid regex"));
static UNCERTAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^p\.({AA})(\d+)\?$")).expect("valid regex"));
static EQUALITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^p\.([ACDEFGHIKLMNOPQRSTUVWXY*]|[A-Z][a-z]{2})(\d+)=$").expect("valid regex")
});
static SUBSTITUTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^p\.({AA})(\d+)({AA}|=)$")).expect("valid regex")
});
static THREE_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^p\.[A-Z][a-z]{2}\d+").expect("valid regex"));

/// Remove wrapping parentheses and whitespace, e.g., `(p.G62R)` and `p.(G62R)`.
fn unwrap_notation(raw: &str) -> String {
    let mut s = raw.trim();
    while let Some(inner) = s.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        s = inner.trim();
    }
    match s
        .strip_prefix("p.(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => format!("p.{}", inner.trim()),
        None => s.to_string(),
    }
}

/// Convert one-letter protein notation to three-letter notation.
///
/// Forms are tried in this order: frameshift, range deletion-insertion, range insertion,
/// single-position deletion-insertion, range deletion, range duplication, single-position
/// deletion/duplication, uncertain, equality, and substitution.  Text already in
/// three-letter notation only loses its wrapping.  Anything else is returned as given.
pub fn normalize_hgvsp(raw: &str) -> String {
    let s = unwrap_notation(raw);
    match try_normalize(&s) {
        Some(normalized) => normalized,
        None if THREE_LETTER.is_match(&s) => s,
        None => {
            tracing::trace!("leaving protein notation {:?} unchanged", raw);
            raw.to_string()
        }
    }
}

fn try_normalize(s: &str) -> Option<String> {
    if let Some(caps) = FRAMESHIFT.captures(s) {
        let alt = match caps.get(3) {
            Some(alt) => expand_one(alt.as_str())?,
            None => "",
        };
        let tail = match caps.get(4) {
            Some(len) => format!("Ter{}", len.as_str()),
            None => String::new(),
        };
        return Some(format!(
            "p.{}{}{}fs{}",
            expand_one(&caps[1])?,
            &caps[2],
            alt,
            tail
        ));
    }
    if let Some(caps) = RANGE_DELINS.captures(s) {
        return Some(format!(
            "p.{}{}_{}{}delins{}",
            expand_one(&caps[1])?,
            &caps[2],
            expand_one(&caps[3])?,
            &caps[4],
            expand_run(&caps[5])?
        ));
    }
    if let Some(caps) = RANGE_INS.captures(s) {
        return Some(format!(
            "p.{}{}_{}{}ins{}",
            expand_one(&caps[1])?,
            &caps[2],
            expand_one(&caps[3])?,
            &caps[4],
            expand_run(&caps[5])?
        ));
    }
    if let Some(caps) = SINGLE_DELINS.captures(s) {
        return Some(format!(
            "p.{}{}delins{}",
            expand_one(&caps[1])?,
            &caps[2],
            expand_run(&caps[3])?
        ));
    }
    if let Some(caps) = RANGE_DEL.captures(s) {
        return Some(format!(
            "p.{}{}_{}{}del",
            expand_one(&caps[1])?,
            &caps[2],
            expand_one(&caps[3])?,
            &caps[4]
        ));
    }
    if let Some(caps) = RANGE_DUP.captures(s) {
        return Some(format!(
            "p.{}{}_{}{}dup",
            expand_one(&caps[1])?,
            &caps[2],
            expand_one(&caps[3])?,
            &caps[4]
        ));
    }
    if let Some(caps) = SINGLE_DEL_DUP.captures(s) {
        return Some(format!(
            "p.{}{}{}",
            expand_one(&caps[1])?,
            &caps[2],
            &caps[3]
        ));
    }
    if let Some(caps) = UNCERTAIN.captures(s) {
        return Some(format!("p.{}{}?", expand_one(&caps[1])?, &caps[2]));
    }
    if let Some(caps) = EQUALITY.captures(s) {
        let residue = &caps[1];
        let residue = if residue.len() == 3 {
            residue
        } else {
            expand_one(residue)?
        };
        return Some(format!("p.{}{}=", residue, &caps[2]));
    }
    if let Some(caps) = SUBSTITUTION.captures(s) {
        let alt = match &caps[3] {
            "=" => "=",
            alt => expand_one(alt)?,
        };
        return Some(format!("p.{}{}{}", expand_one(&caps[1])?, &caps[2], alt));
    }
    None
}

/// Whether `text` looks like protein-level notation.
pub fn is_protein_notation(text: &str) -> bool {
    let s = unwrap_notation(text);
    s.starts_with("p.")
}
