//! The `verbdrill next` command.

use std::path::Path;

use anyhow::Result;

use verbdrill_core::model::ExerciseDirection;

use super::context::{identity, Session};
use crate::OutputFormat;

pub async fn execute(
    config: Option<&Path>,
    user: Option<&str>,
    direction: Option<ExerciseDirection>,
    format: OutputFormat,
) -> Result<()> {
    let session = Session::open(config).await?;
    let caller = identity(user);
    let exercise = session
        .engine
        .next_exercise(caller.as_ref(), direction)
        .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&exercise)?),
        OutputFormat::Text => {
            println!("[{}] {} ({})", exercise.direction, exercise.prompt(), exercise.verb.id);
            if let Some(progress) = &exercise.progress {
                println!(
                    "  practiced {} time(s), {} correct",
                    progress.total_attempts, progress.correct_attempts
                );
            }
        }
    }
    Ok(())
}
