//! The `verbdrill answer` command.

use std::path::Path;

use anyhow::Result;

use verbdrill_core::model::ExerciseDirection;

use super::context::{identity, Session};
use crate::OutputFormat;

pub async fn execute(
    config: Option<&Path>,
    user: Option<&str>,
    verb_id: &str,
    direction: ExerciseDirection,
    answer: &str,
    format: OutputFormat,
) -> Result<()> {
    let session = Session::open(config).await?;
    let caller = identity(user);
    let grade = session
        .engine
        .submit_answer(caller.as_ref(), verb_id, answer, direction)
        .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&grade)?),
        OutputFormat::Text => println!("{}", grade.feedback),
    }
    Ok(())
}
