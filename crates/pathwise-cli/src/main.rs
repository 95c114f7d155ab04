//! pathwise CLI — quiz grading and learner progression from the command line.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use pathwise_core::error::{AnswersError, InvalidTransitionError, ProgressionError, SchemaError};

mod commands;
mod context;

use context::{Context, ContentUnavailable};

#[derive(Parser)]
#[command(name = "pathwise", version, about = "ESL curriculum quiz grading and progression")]
struct Cli {
    /// Content file or directory (overrides the config file)
    #[arg(long, global = true)]
    content: Option<PathBuf>,

    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a quiz submission and print the result as JSON
    ScoreQuiz {
        /// Lesson ID, e.g. "1.1"
        lesson_id: String,

        /// JSON file mapping question IDs to answers
        answers_file: PathBuf,

        /// Compare multiple-choice answers case-insensitively
        #[arg(long)]
        case_insensitive: bool,
    },

    /// Score a submission and record the lesson as completed
    Complete {
        /// Learner ID
        #[arg(long)]
        learner: String,

        /// Lesson ID, e.g. "1.1"
        lesson_id: String,

        /// JSON file mapping question IDs to answers
        answers_file: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show a learner's progress
    Progress {
        /// Learner ID
        #[arg(long)]
        learner: String,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Generate a learner progress report
    Report {
        /// Learner ID
        #[arg(long)]
        learner: String,

        /// Output format: markdown, html, json
        #[arg(long, default_value = "markdown")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate lesson content
    Validate,

    /// List lessons in curriculum order
    Lessons {
        /// Only lessons of this path
        #[arg(long)]
        path: Option<u32>,
    },

    /// List paths
    Paths,

    /// Print a lesson's content
    Show {
        /// Lesson ID, e.g. "1.1"
        lesson_id: String,

        /// Only this slot (hook, video, strategy, written, oral, quiz, coaching)
        #[arg(long)]
        slot: Option<String>,
    },

    /// Create starter config and sample content
    Init,
}

/// Map a failure to the process exit code.
///
/// 2: malformed answers, 3: content failed to load, 4: lesson locked.
/// Not-found and everything else exit with 1.
fn exit_code(err: &anyhow::Error) -> i32 {
    let locked = matches!(
        err.downcast_ref::<ProgressionError>(),
        Some(ProgressionError::InvalidTransition(_))
    ) || err.downcast_ref::<InvalidTransitionError>().is_some();

    if locked {
        4
    } else if err.downcast_ref::<AnswersError>().is_some() {
        2
    } else if err.downcast_ref::<SchemaError>().is_some()
        || err.downcast_ref::<ContentUnavailable>().is_some()
    {
        3
    } else {
        1
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Init = cli.command {
        return commands::init::execute();
    }

    let ctx = Context::load(cli.config.as_deref(), cli.content)?;

    match cli.command {
        Commands::ScoreQuiz {
            lesson_id,
            answers_file,
            case_insensitive,
        } => commands::score_quiz::execute(&ctx, lesson_id, answers_file, case_insensitive),
        Commands::Complete {
            learner,
            lesson_id,
            answers_file,
            format,
        } => commands::complete::execute(&ctx, learner, lesson_id, answers_file, format),
        Commands::Progress { learner, format } => {
            commands::progress::execute(&ctx, learner, format)
        }
        Commands::Report {
            learner,
            format,
            output,
        } => commands::report::execute(&ctx, learner, format, output),
        Commands::Validate => commands::validate::execute(&ctx),
        Commands::Lessons { path } => commands::lessons::execute(&ctx, path),
        Commands::Paths => commands::paths::execute(&ctx),
        Commands::Show { lesson_id, slot } => commands::show::execute(&ctx, lesson_id, slot),
        Commands::Init => commands::init::execute(),
    }
}

fn main() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "pathwise=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        if let Some(schema) = e.downcast_ref::<SchemaError>() {
            for v in &schema.violations {
                eprintln!("  {v}");
            }
        }
        process::exit(exit_code(&e));
    }
}
