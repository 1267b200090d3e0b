//! The `verbdrill init` command.

use std::path::Path;

use anyhow::Result;

use verbdrill_oracle::config::CONFIG_FILE_NAME;

const CORPUS_FILE_NAME: &str = "verbs.toml";

pub fn execute() -> Result<()> {
    write_if_missing(Path::new(CONFIG_FILE_NAME), SAMPLE_CONFIG)?;
    write_if_missing(Path::new(CORPUS_FILE_NAME), SAMPLE_CORPUS)?;

    println!("\nNext steps:");
    println!("  1. Set OPENAI_API_KEY, or edit {CONFIG_FILE_NAME} to pick another oracle");
    println!("  2. Run: verbdrill validate");
    println!("  3. Run: verbdrill --user <name> drill --rounds 10");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# verbdrill configuration

corpus = "./verbs.toml"
store_path = "./verbdrill-data/records.json"
oracle_timeout_secs = 10
hint_ttl_secs = 3600

# Remove this section to grade by exact match only.
[oracle]
type = "openai"
api_key = "${OPENAI_API_KEY}"
model = "gpt-4o"

# [oracle]
# type = "anthropic"
# api_key = "${ANTHROPIC_API_KEY}"

[selection]
policy = "least-practiced"
pool_size = 10
scope = "direction"
"#;

const SAMPLE_CORPUS: &str = include_str!("../../../../corpus/norwegian-verbs.toml");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_parses() {
        let config = verbdrill_oracle::config::parse_config(SAMPLE_CONFIG).unwrap();
        assert_eq!(
            config.oracle.as_ref().map(|o| o.kind()),
            Some("openai")
        );
        assert_eq!(config.selection.pool_size, 10);
    }

    #[test]
    fn sample_corpus_is_clean() {
        let corpus =
            verbdrill_core::parser::parse_corpus_str(SAMPLE_CORPUS, Path::new(CORPUS_FILE_NAME))
                .unwrap();
        assert!(corpus.verbs.len() >= 20);
        assert!(verbdrill_core::parser::validate_corpus(&corpus).is_empty());
    }
}
