//! Answer normalization and synonym expansion.
//!
//! Comparison always runs expand → normalize each variant → membership test.

use std::collections::HashSet;

/// Characters removed anywhere in an answer before comparison.
const STRIPPED_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"', '(', ')'];

/// Infinitive markers dropped from the start of an answer.
const INFINITIVE_MARKERS: &[&str] = &["to ", "å "];

/// Canonicalize a raw answer for comparison.
///
/// Lower-cases, removes punctuation, collapses whitespace runs, trims, and
/// drops leading infinitive markers ("to run" and "å løpe" become "run" and
/// "løpe"). Total and idempotent; blank input yields `""`.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut rest = collapsed.as_str();
    while let Some(next) = INFINITIVE_MARKERS
        .iter()
        .find_map(|marker| rest.strip_prefix(marker))
    {
        rest = next;
    }
    rest.to_string()
}

/// Flatten slash-separated synonyms into a set of variants.
///
/// `["run/jog", "sprint"]` becomes `{"run", "jog", "sprint"}`. Parts are
/// trimmed and empty parts dropped.
pub fn expand<S: AsRef<str>>(candidates: &[S]) -> HashSet<String> {
    candidates
        .iter()
        .flat_map(|c| c.as_ref().split('/'))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalized forms of every expanded variant. Variants that normalize to
/// nothing are dropped so a blank answer can never match.
pub fn normalized_variants<S: AsRef<str>>(candidates: &[S]) -> HashSet<String> {
    expand(candidates)
        .iter()
        .map(|v| normalize(v))
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_whitespace_and_punctuation_insensitive() {
        assert_eq!(normalize("Kjøre."), normalize("  kjøre "));
        assert_eq!(normalize("  Eat   (a meal)! "), "eat a meal");
        assert_eq!(normalize("\"don't\""), "dont");
    }

    #[test]
    fn strips_leading_infinitive_markers() {
        assert_eq!(normalize("to run"), normalize("run"));
        assert_eq!(normalize("Å løpe"), "løpe");
        assert_eq!(normalize("To  to run"), "run");
        // Markers only count at the very start.
        assert_eq!(normalize("want to run"), "want to run");
        assert_eq!(normalize("to"), "to");
    }

    #[test]
    fn blank_input_is_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t\n"), "");
        assert_eq!(normalize("?!."), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "Kjøre.",
            "  to   TO run ",
            "run .",
            "a . b",
            "to. run",
            "å å",
            "(to) go",
            "  ",
            "Gikk, gått",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn expand_splits_synonyms() {
        let expanded = expand(&["run/jog", "sprint"]);
        let expected: HashSet<String> = ["run", "jog", "sprint"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(expanded, expected);
    }

    #[test]
    fn expand_trims_and_drops_empty_parts() {
        let expanded = expand(&[" to eat / ", "/", "eat"]);
        assert_eq!(expanded.len(), 2);
        assert!(expanded.contains("to eat"));
        assert!(expanded.contains("eat"));
    }

    #[test]
    fn normalized_variants_collapse_markers() {
        let variants = normalized_variants(&["to eat/eat", "To Dine"]);
        assert_eq!(variants.len(), 2);
        assert!(variants.contains("eat"));
        assert!(variants.contains("dine"));
        assert!(normalized_variants(&["?"]).is_empty());
    }
}
