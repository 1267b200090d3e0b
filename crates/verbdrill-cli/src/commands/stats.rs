//! The `verbdrill stats` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Table};

use verbdrill_core::model::ExerciseDirection;
use verbdrill_core::statistics::{ProgressStats, Stats};

use super::context::{identity, Session};
use crate::OutputFormat;

pub async fn execute(config: Option<&Path>, user: Option<&str>, format: OutputFormat) -> Result<()> {
    let session = Session::open(config).await?;
    let caller = identity(user);
    let stats = session.engine.progress_stats(caller.as_ref()).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => print_summary(&stats),
    }
    Ok(())
}

fn stats_row(label: &str, stats: &Stats) -> Vec<Cell> {
    vec![
        Cell::new(label),
        Cell::new(stats.verbs_attempted),
        Cell::new(format!("{}/{}", stats.total_correct, stats.total_attempts)),
        Cell::new(format!("{:.1}%", stats.accuracy)),
        Cell::new(stats.mastered_verbs),
        Cell::new(format!("{:.1}%", stats.mastery_percentage)),
    ]
}

fn print_summary(progress: &ProgressStats) {
    let mut table = Table::new();
    table.set_header(vec![
        "Direction",
        "Verbs",
        "Correct",
        "Accuracy",
        "Mastered",
        "Mastery",
    ]);

    for direction in ExerciseDirection::ALL {
        table.add_row(stats_row(direction.as_str(), progress.for_direction(direction)));
    }
    table.add_row(stats_row("overall", &progress.overall));

    println!("Verbs in corpus: {}", progress.total_verbs);
    println!("{table}");
}
