//! Hint text helpers.

use crate::model::{ExerciseDirection, Verb};
use crate::normalize::{expand, normalize};

/// Shown when a hint writer fails.
pub const NO_CONTEXT_HINT: &str = "No additional context is available at this time.";

const SECTION_LABELS: &[&str] = &["Concise Explanation:", "Example Sentence:", "Mnemonic:"];

/// Put each labelled section of a generated hint on its own line.
pub fn tidy_hint(text: &str) -> String {
    let mut tidy = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    for label in &SECTION_LABELS[1..] {
        if let Some(pos) = tidy.find(label) {
            if pos > 0 && !tidy[..pos].ends_with('\n') {
                let head = tidy[..pos].trim_end().to_string();
                tidy = format!("{head}\n{}", &tidy[pos..]);
            }
        }
    }
    tidy
}

/// A hint built without a language model.
///
/// The stored mnemonic wins when present.
pub fn fallback_hint(verb: &Verb, direction: ExerciseDirection) -> String {
    if let Some(mnemonic) = verb.mnemonic.as_deref().filter(|m| !m.trim().is_empty()) {
        return mnemonic.to_string();
    }

    let first_letter = verb
        .infinitive
        .trim_start_matches("å ")
        .chars()
        .next()
        .map(|c| c.to_string())
        .unwrap_or_default();

    match direction {
        ExerciseDirection::VerbToMeaning => {
            let keyword = expand(&[verb.canonical_meaning()])
                .iter()
                .map(|v| normalize(v))
                .filter(|v| !v.is_empty())
                .min()
                .and_then(|v| v.split(' ').next().map(str::to_string))
                .unwrap_or_else(|| "an action".to_string());
            format!(
                "Think about what \"{}\" might mean in English. It's related to {keyword}.",
                verb.infinitive
            )
        }
        ExerciseDirection::MeaningToVerb => format!(
            "The Norwegian word starts with \"{first_letter}\". It's a common verb used in everyday conversation."
        ),
        ExerciseDirection::TenseProduction => match verb.tense_forms() {
            Some((past, _)) => format!(
                "The past tense of \"{}\" starts with \"{}\".",
                verb.infinitive,
                past.chars().next().map(|c| c.to_string()).unwrap_or_default()
            ),
            None => format!(
                "No past tense forms are recorded for \"{}\".",
                verb.infinitive
            ),
        },
    }
}
