//! The `pathwise complete` command.

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use pathwise_core::progression::Completion;
use pathwise_core::scoring::{load_answers, ScoreResult};

use crate::context::Context;

#[derive(Serialize)]
struct CompletionOutput<'a> {
    learner_id: &'a str,
    result: &'a ScoreResult,
    completion: &'a Completion,
    next_lesson_id: Option<String>,
}

pub fn execute(
    ctx: &Context,
    learner_id: String,
    lesson_id: String,
    answers_file: PathBuf,
    format: String,
) -> Result<()> {
    let session = ctx.session(&learner_id)?;
    let tracker = &session.tracker;

    let quiz = tracker.repository().get_quiz(&lesson_id)?;
    let answers = load_answers(&answers_file)?;
    let result = ctx.scorer().score(quiz, &answers);

    let completion = tracker.record_completion(&learner_id, &lesson_id, &result)?;
    tracing::debug!(store = session.store.name(), "progress written through");

    let next = tracker.get_progress(&learner_id).next_lesson_id;

    match format.as_str() {
        "json" => {
            let output = CompletionOutput {
                learner_id: &learner_id,
                result: &result,
                completion: &completion,
                next_lesson_id: next.map(|id| id.to_string()),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!(
                "Lesson {} completed{}: {}/{} correct ({}%), {}",
                completion.lesson_id,
                if completion.retake { " (retake)" } else { "" },
                result.correct_count,
                result.total_count,
                result.percentage,
                if result.passed { "passed" } else { "below pass mark" }
            );

            for q in result.questions.iter().filter(|q| !q.correct) {
                let submitted = q.submitted.as_deref().unwrap_or("(no answer)");
                println!("  Q{} \"{}\": {}", q.question_id, submitted, q.feedback);
            }

            if let Some(unlocked) = completion.newly_unlocked {
                println!("Unlocked lesson {unlocked}");
            }
            match next {
                Some(id) => println!("Next lesson: {id}"),
                None => println!("Curriculum complete!"),
            }
        }
    }

    Ok(())
}
