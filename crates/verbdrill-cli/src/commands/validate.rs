//! The `verbdrill validate` command.

use std::path::{Path, PathBuf};

use anyhow::Result;

use verbdrill_core::parser::{parse_corpus, validate_corpus};
use verbdrill_oracle::config::load_config_from;

pub fn execute(config: Option<&Path>, corpus: Option<PathBuf>) -> Result<()> {
    let path = match corpus {
        Some(path) => path,
        None => load_config_from(config)?.corpus,
    };

    let corpus = parse_corpus(&path)?;
    println!("Corpus: {} ({} verbs)", corpus.name, corpus.verbs.len());

    let warnings = validate_corpus(&corpus);
    for w in &warnings {
        let prefix = w
            .verb_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    let tense_ready = corpus
        .verbs
        .iter()
        .filter(|v| v.tense_forms().is_some())
        .count();
    println!("{tense_ready} verb(s) available for tense exercises.");

    if warnings.is_empty() {
        println!("Corpus valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
