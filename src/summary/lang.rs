//! Swedish language helpers for report prose.

/// Opening verb phrase of the first finding.
pub const OPENING: &str = "Analysen påvisar";
/// Verb phrase of findings between the first and the last one.
pub const FURTHERMORE: &str = "Vidare påvisas";
/// Verb phrase of the last finding.
pub const FINALLY: &str = "Slutligen påvisas";

/// Join `items` with commas and a final "och".
///
/// ```text
/// ["A"]           -> "A"
/// ["A", "B"]      -> "A och B"
/// ["A", "B", "C"] -> "A, B och C"
/// ```
pub fn join_and<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [head @ .., last] => format!(
            "{} och {}",
            head.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(", "),
            last.as_ref()
        ),
    }
}

/// Pick the singular or plural form for `count`.
pub fn plural<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 {
        singular
    } else {
        plural
    }
}

/// Number word for small counts of common-gender nouns, digits otherwise.
pub fn count_word(count: usize) -> String {
    const WORDS: [&str; 13] = [
        "inga", "en", "två", "tre", "fyra", "fem", "sex", "sju", "åtta", "nio", "tio", "elva",
        "tolv",
    ];
    WORDS
        .get(count)
        .map(|w| w.to_string())
        .unwrap_or_else(|| count.to_string())
}

/// "genen X" or "generna X och Y".
pub fn genes_phrase<S: AsRef<str>>(genes: &[S]) -> String {
    format!("{} {}", plural(genes.len(), "genen", "generna"), join_and(genes))
}

/// Format `value` with `digits` decimals and a decimal comma.
pub fn decimal(value: f64, digits: usize) -> String {
    format!("{:.*}", digits, value).replace('.', ",")
}

/// Turn findings into sentences; the first opens the paragraph, the last one is
/// introduced by "Slutligen", and any in between by "Vidare".
pub fn findings_to_prose<S: AsRef<str>>(findings: &[S]) -> String {
    let last = findings.len().saturating_sub(1);
    findings
        .iter()
        .enumerate()
        .map(|(idx, finding)| {
            let verb = if idx == 0 {
                OPENING
            } else if idx == last {
                FINALLY
            } else {
                FURTHERMORE
            };
            format!("{} {}.", verb, finding.as_ref())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(&[], "")]
    #[case(&["TP53"], "TP53")]
    #[case(&["TP53", "KRAS"], "TP53 och KRAS")]
    #[case(&["TP53", "KRAS", "NRAS"], "TP53, KRAS och NRAS")]
    fn join_and(#[case] items: &[&str], #[case] expected: &str) {
        assert_eq!(super::join_and(items), expected);
    }

    #[test]
    fn join_and_leaves_input_intact() {
        let genes = vec![String::from("A"), String::from("B")];

        assert_eq!(super::join_and(&genes), "A och B");
        assert_eq!(super::join_and(&genes), "A och B");
        assert_eq!(genes.len(), 2);
    }

    #[rstest]
    #[case(0, "inga")]
    #[case(1, "en")]
    #[case(2, "två")]
    #[case(12, "tolv")]
    #[case(13, "13")]
    fn count_word(#[case] count: usize, #[case] expected: &str) {
        assert_eq!(super::count_word(count), expected);
    }

    #[test]
    fn genes_phrase_pluralizes() {
        assert_eq!(genes_phrase(&["TP53"]), "genen TP53");
        assert_eq!(genes_phrase(&["TP53", "KRAS"]), "generna TP53 och KRAS");
    }

    #[test]
    fn decimal_comma() {
        assert_eq!(decimal(12.345, 1), "12,3");
        assert_eq!(decimal(8.0, 0), "8");
    }

    #[rstest]
    #[case(&["a"], "Analysen påvisar a.")]
    #[case(&["a", "b"], "Analysen påvisar a. Slutligen påvisas b.")]
    #[case(&["a", "b", "c"], "Analysen påvisar a. Vidare påvisas b. Slutligen påvisas c.")]
    fn findings_to_prose(#[case] findings: &[&str], #[case] expected: &str) {
        assert_eq!(super::findings_to_prose(findings), expected);
    }
}
