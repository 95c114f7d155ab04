//! The `pathwise score-quiz` command.

use std::path::PathBuf;

use anyhow::Result;

use pathwise_core::scoring::{load_answers, QuizScorer};

use crate::context::Context;

pub fn execute(
    ctx: &Context,
    lesson_id: String,
    answers_file: PathBuf,
    case_insensitive: bool,
) -> Result<()> {
    let repo = ctx.repository()?;
    let quiz = repo.get_quiz(&lesson_id)?;
    let answers = load_answers(&answers_file)?;

    let mut config = ctx.config.scoring;
    if case_insensitive {
        config.case_insensitive = true;
    }

    let result = QuizScorer::new(config).score(quiz, &answers);
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
