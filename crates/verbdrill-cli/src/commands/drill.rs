//! The `verbdrill drill` command.
//!
//! Reads one answer per line from stdin. `?` asks for a hint (the answer
//! then counts as incorrect); an empty line or end of input stops early.

use std::path::Path;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use verbdrill_core::model::{ExerciseDirection, GradeMethod};

use super::context::{identity, Session};

const HINT_COMMAND: &str = "?";

pub async fn execute(
    config: Option<&Path>,
    user: Option<&str>,
    direction: Option<ExerciseDirection>,
    rounds: usize,
) -> Result<()> {
    let session = Session::open(config).await?;
    let caller = identity(user);
    let engine = &session.engine;
    // Fail before prompting when the caller is unknown.
    engine.authenticate(caller.as_ref()).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut answered = 0usize;
    let mut correct = 0usize;

    'rounds: for round in 1..=rounds {
        let exercise = engine.next_exercise(caller.as_ref(), direction).await?;
        println!("\n[{round}/{rounds}] {}", exercise.prompt());

        let answer = loop {
            let Some(line) = lines.next_line().await? else {
                break 'rounds;
            };
            let line = line.trim().to_string();
            if line == HINT_COMMAND {
                let hint = engine
                    .hint(caller.as_ref(), &exercise.verb.id, Some(exercise.direction))
                    .await?;
                println!("Hint: {hint}");
                continue;
            }
            break line;
        };
        if answer.is_empty() {
            break;
        }

        let grade = engine
            .submit_answer(caller.as_ref(), &exercise.verb.id, &answer, exercise.direction)
            .await?;
        answered += 1;
        if grade.is_correct {
            correct += 1;
        }

        let note = match grade.method {
            GradeMethod::Oracle => " (accepted as a synonym)",
            _ => "",
        };
        println!("{}{note}", grade.feedback);
    }

    println!("\nRound summary: {correct}/{answered} correct");
    Ok(())
}
