//! verbdrill CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use verbdrill_core::model::ExerciseDirection;

mod commands;

#[derive(Parser)]
#[command(name = "verbdrill", version, about = "Norwegian verb drill")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Learner identity (subject id)
    #[arg(long, global = true, env = "VERBDRILL_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for reporting commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive drill session
    Drill {
        /// Exercise direction: nor-to-eng, eng-to-nor, tenses (random if omitted)
        #[arg(long)]
        direction: Option<ExerciseDirection>,

        /// Number of exercises
        #[arg(long, default_value = "10")]
        rounds: usize,
    },

    /// Show the next exercise without answering it
    Next {
        #[arg(long)]
        direction: Option<ExerciseDirection>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Grade a single answer
    Answer {
        /// Verb id
        #[arg(long)]
        verb: String,

        #[arg(long)]
        direction: ExerciseDirection,

        /// The answer to grade
        answer: String,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Get a hint for a verb (the next answer for it will not count)
    Hint {
        #[arg(long)]
        verb: String,

        #[arg(long)]
        direction: Option<ExerciseDirection>,
    },

    /// Show progress statistics
    Stats {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List every verb with your accuracy, weakest first
    Vocab {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate a verb corpus file
    Validate {
        /// Corpus file (defaults to the configured corpus)
        #[arg(long)]
        corpus: Option<PathBuf>,
    },

    /// Create a starter config and verb corpus
    Init,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("verbdrill=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let user = cli.user.as_deref();

    let result = match cli.command {
        Commands::Drill { direction, rounds } => {
            commands::drill::execute(config, user, direction, rounds).await
        }
        Commands::Next { direction, format } => {
            commands::next::execute(config, user, direction, format).await
        }
        Commands::Answer {
            verb,
            direction,
            answer,
            format,
        } => commands::answer::execute(config, user, &verb, direction, &answer, format).await,
        Commands::Hint { verb, direction } => {
            commands::hint::execute(config, user, &verb, direction).await
        }
        Commands::Stats { format } => commands::stats::execute(config, user, format).await,
        Commands::Vocab { format } => commands::vocab::execute(config, user, format).await,
        Commands::Validate { corpus } => commands::validate::execute(config, corpus),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
