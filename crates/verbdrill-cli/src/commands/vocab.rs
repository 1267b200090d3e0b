//! The `verbdrill vocab` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Table};

use verbdrill_core::model::VocabularyEntry;

use super::context::{identity, Session};
use crate::OutputFormat;

pub async fn execute(config: Option<&Path>, user: Option<&str>, format: OutputFormat) -> Result<()> {
    let session = Session::open(config).await?;
    let caller = identity(user);
    let entries = session.engine.vocabulary(caller.as_ref()).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => print_table(&entries),
    }
    Ok(())
}

fn print_table(entries: &[VocabularyEntry]) {
    let mut table = Table::new();
    table.set_header(vec!["Verb", "Meanings", "Tenses", "Attempts", "Accuracy"]);

    for entry in entries {
        let verb = &entry.verb;
        let attempts: u32 = entry.progress.iter().map(|p| p.total_attempts).sum();
        let tenses = verb
            .tense_forms()
            .map(|(past, participle)| format!("{past}, {participle}"))
            .unwrap_or_else(|| "-".to_string());
        let accuracy = entry
            .accuracy()
            .map(|a| format!("{:.0}%", a * 100.0))
            .unwrap_or_else(|| "untested".to_string());

        table.add_row(vec![
            Cell::new(&verb.infinitive),
            Cell::new(verb.joined_meanings()),
            Cell::new(tenses),
            Cell::new(attempts),
            Cell::new(accuracy),
        ]);
    }

    println!("{table}");
}
