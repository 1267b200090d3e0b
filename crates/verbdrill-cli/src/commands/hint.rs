//! The `verbdrill hint` command.

use std::path::Path;

use anyhow::Result;

use verbdrill_core::model::ExerciseDirection;

use super::context::{identity, Session};

pub async fn execute(
    config: Option<&Path>,
    user: Option<&str>,
    verb_id: &str,
    direction: Option<ExerciseDirection>,
) -> Result<()> {
    let session = Session::open(config).await?;
    let caller = identity(user);
    let text = session
        .engine
        .hint(caller.as_ref(), verb_id, direction)
        .await?;

    println!("{text}");
    Ok(())
}
