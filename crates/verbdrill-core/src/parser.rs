//! TOML verb corpus parser.
//!
//! Loads verb corpora from TOML files and validates them.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{parse_meanings, Verb};
use crate::normalize::normalize;

/// A named collection of verbs.
#[derive(Debug, Clone)]
pub struct VerbCorpus {
    pub name: String,
    pub description: String,
    pub verbs: Vec<Verb>,
}

/// Intermediate TOML structure for corpus files.
#[derive(Debug, Deserialize)]
struct TomlCorpusFile {
    #[serde(default)]
    corpus: Option<TomlCorpusHeader>,
    #[serde(default)]
    verbs: Vec<TomlVerb>,
}

#[derive(Debug, Deserialize)]
struct TomlCorpusHeader {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlVerb {
    #[serde(default)]
    id: Option<String>,
    infinitive: String,
    meanings: TomlMeanings,
    #[serde(default)]
    past: Option<String>,
    #[serde(default)]
    past_participle: Option<String>,
    #[serde(default)]
    mnemonic: Option<String>,
}

/// Meanings may be a list or a single comma-delimited string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TomlMeanings {
    List(Vec<String>),
    Delimited(String),
}

impl TomlMeanings {
    fn into_vec(self) -> Vec<String> {
        match self {
            TomlMeanings::List(list) => list
                .into_iter()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            TomlMeanings::Delimited(raw) => parse_meanings(&raw),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Derive an id from an infinitive: "å spise" becomes "spise".
pub fn default_verb_id(infinitive: &str) -> String {
    normalize(infinitive).replace(' ', "-")
}

/// Parse a single TOML file into a `VerbCorpus`.
pub fn parse_corpus(path: &Path) -> Result<VerbCorpus> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read verb corpus: {}", path.display()))?;

    parse_corpus_str(&content, path)
}

/// Parse a TOML string into a `VerbCorpus`.
pub fn parse_corpus_str(content: &str, source_path: &Path) -> Result<VerbCorpus> {
    let parsed: TomlCorpusFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let verbs = parsed
        .verbs
        .into_iter()
        .map(|v| {
            let infinitive = v.infinitive.trim().to_string();
            anyhow::ensure!(!infinitive.is_empty(), "verb with an empty infinitive");
            let id = non_blank(v.id).unwrap_or_else(|| default_verb_id(&infinitive));
            let meanings = v.meanings.into_vec();
            anyhow::ensure!(!meanings.is_empty(), "verb '{id}' has no meanings");

            Ok(Verb {
                id,
                infinitive,
                meanings,
                past: non_blank(v.past),
                past_participle: non_blank(v.past_participle),
                mnemonic: non_blank(v.mnemonic),
            })
        })
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("invalid verb in {}", source_path.display()))?;

    let (name, description) = match parsed.corpus {
        Some(header) => (header.name, header.description),
        None => (
            source_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "verbs".to_string()),
            String::new(),
        ),
    };

    Ok(VerbCorpus {
        name,
        description,
        verbs,
    })
}

/// A non-fatal problem found in a corpus.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub verb_id: Option<String>,
    pub message: String,
}

/// Check a parsed corpus for problems that do not stop loading.
pub fn validate_corpus(corpus: &VerbCorpus) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if corpus.verbs.is_empty() {
        warnings.push(ValidationWarning {
            verb_id: None,
            message: "corpus has no verbs".into(),
        });
    }

    let mut ids: HashMap<&str, usize> = HashMap::new();
    let mut infinitives: HashMap<String, &str> = HashMap::new();

    for verb in &corpus.verbs {
        let seen = ids.entry(verb.id.as_str()).or_insert(0);
        *seen += 1;
        if *seen == 2 {
            warnings.push(ValidationWarning {
                verb_id: Some(verb.id.clone()),
                message: "duplicate id; later entries replace earlier ones".into(),
            });
        }

        let key = normalize(&verb.infinitive);
        if let Some(other) = infinitives.get(&key) {
            if *other != verb.id {
                warnings.push(ValidationWarning {
                    verb_id: Some(verb.id.clone()),
                    message: format!("same infinitive as '{other}'"),
                });
            }
        } else {
            infinitives.insert(key, verb.id.as_str());
        }

        if verb.meaning_variants().is_empty() {
            warnings.push(ValidationWarning {
                verb_id: Some(verb.id.clone()),
                message: "meanings contain no usable variant".into(),
            });
        }

        match (&verb.past, &verb.past_participle) {
            (Some(_), Some(_)) => {}
            (None, None) => warnings.push(ValidationWarning {
                verb_id: Some(verb.id.clone()),
                message: "no tense forms; excluded from tense exercises".into(),
            }),
            _ => warnings.push(ValidationWarning {
                verb_id: Some(verb.id.clone()),
                message: "only one tense form; excluded from tense exercises".into(),
            }),
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[corpus]
name = "Sample"
description = "A few verbs"

[[verbs]]
id = "spise"
infinitive = "å spise"
meanings = ["to eat", "have a meal"]
past = "spiste"
past_participle = "spist"
mnemonic = "Spice up your food."

[[verbs]]
infinitive = "løpe"
meanings = "run/jog, sprint"
past = "løp"
past_participle = "løpt"

[[verbs]]
infinitive = "å være"
meanings = "be"
"#;

    #[test]
    fn parse_sample_corpus() {
        let corpus = parse_corpus_str(SAMPLE, Path::new("sample.toml")).unwrap();
        assert_eq!(corpus.name, "Sample");
        assert_eq!(corpus.verbs.len(), 3);

        let spise = &corpus.verbs[0];
        assert_eq!(spise.meanings, vec!["to eat", "have a meal"]);
        assert_eq!(spise.tense_forms(), Some(("spiste", "spist")));

        let lope = &corpus.verbs[1];
        assert_eq!(lope.id, "løpe");
        assert_eq!(lope.meanings, vec!["run/jog", "sprint"]);

        assert_eq!(corpus.verbs[2].id, "være");
        assert!(corpus.verbs[2].past.is_none());
    }

    #[test]
    fn header_is_optional() {
        let corpus = parse_corpus_str(
            "[[verbs]]\ninfinitive = \"gå\"\nmeanings = \"walk\"\n",
            Path::new("basics.toml"),
        )
        .unwrap();
        assert_eq!(corpus.name, "basics");
    }

    #[test]
    fn verb_without_meanings_is_rejected() {
        let err = parse_corpus_str(
            "[[verbs]]\ninfinitive = \"gå\"\nmeanings = \" , \"\n",
            Path::new("bad.toml"),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("has no meanings"));
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(parse_corpus_str("[[verbs]\n", Path::new("broken.toml")).is_err());
    }

    #[test]
    fn validation_flags_problems() {
        let mut corpus = parse_corpus_str(SAMPLE, Path::new("sample.toml")).unwrap();
        let warnings = validate_corpus(&corpus);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].verb_id.as_deref(), Some("være"));

        let mut dup = corpus.verbs[1].clone();
        dup.id = "løpe-2".into();
        corpus.verbs.push(dup);
        corpus.verbs.push(corpus.verbs[0].clone());
        let warnings = validate_corpus(&corpus);
        assert!(warnings.iter().any(|w| w.message.contains("same infinitive as 'løpe'")));
        assert!(warnings.iter().any(|w| w.message.contains("duplicate id")));
    }

    #[test]
    fn empty_corpus_warns() {
        let corpus = parse_corpus_str("", Path::new("empty.toml")).unwrap();
        let warnings = validate_corpus(&corpus);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].verb_id.is_none());
    }
}
