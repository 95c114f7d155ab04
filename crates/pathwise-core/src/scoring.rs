//! Quiz scoring.
//!
//! Scoring is a pure function of `(quiz, answers, config)`: no shared state,
//! safe to call from any number of threads.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AnswersError;
use crate::model::{Question, QuestionKind, Quiz};

/// Learner answers keyed by question ID.
pub type SubmittedAnswers = BTreeMap<u32, String>;

/// Scoring knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Compare multiple-choice answers case-insensitively.
    #[serde(default)]
    pub case_insensitive: bool,
    /// Minimum percentage for `passed`.
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: u8,
}

fn default_pass_threshold() -> u8 {
    70
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            pass_threshold: default_pass_threshold(),
        }
    }
}

/// Per-question outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: u32,
    pub correct: bool,
    /// What the learner sent, if anything.
    #[serde(default)]
    pub submitted: Option<String>,
    /// The authored feedback, shown regardless of correctness.
    pub feedback: String,
}

/// The scored result of one quiz submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub questions: Vec<QuestionOutcome>,
    pub correct_count: u32,
    pub total_count: u32,
    /// Rounded half-up, 0..=100.
    pub percentage: u8,
    pub passed: bool,
    /// Submitted IDs that are not part of the quiz.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored_question_ids: Vec<u32>,
}

/// Integer percentage rounded half-up. `total == 0` yields 0.
pub fn percentage(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(total));
    let total = u64::from(total);
    let pct = (correct * 200 + total) / (2 * total);
    u8::try_from(pct).unwrap_or(100)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministic quiz scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuizScorer {
    config: ScoringConfig,
}

impl QuizScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Whether `submitted` is a correct answer to `question`.
    pub fn is_correct(&self, question: &Question, submitted: &str) -> bool {
        match &question.kind {
            QuestionKind::MultipleChoice { answer, .. } => {
                let submitted = submitted.trim();
                let answer = answer.trim();
                if self.config.case_insensitive {
                    submitted.to_lowercase() == answer.to_lowercase()
                } else {
                    submitted == answer
                }
            }
            QuestionKind::FillInTheBlank {
                answer,
                alternatives,
            } => {
                let submitted = collapse_whitespace(submitted).to_lowercase();
                !submitted.is_empty()
                    && std::iter::once(answer)
                        .chain(alternatives)
                        .any(|a| collapse_whitespace(a).to_lowercase() == submitted)
            }
        }
    }

    /// Score a submission. Unanswered questions are incorrect; answers for
    /// question IDs the quiz doesn't have are ignored.
    pub fn score(&self, quiz: &Quiz, answers: &SubmittedAnswers) -> ScoreResult {
        let questions: Vec<QuestionOutcome> = quiz
            .questions
            .iter()
            .map(|q| {
                let submitted = answers.get(&q.id);
                QuestionOutcome {
                    question_id: q.id,
                    correct: submitted.is_some_and(|a| self.is_correct(q, a)),
                    submitted: submitted.cloned(),
                    feedback: q.feedback.clone(),
                }
            })
            .collect();

        let ignored_question_ids: Vec<u32> = answers
            .keys()
            .copied()
            .filter(|id| quiz.question(*id).is_none())
            .collect();
        if !ignored_question_ids.is_empty() {
            tracing::debug!(?ignored_question_ids, "ignoring answers for unknown questions");
        }

        let total_count = u32::try_from(questions.len()).unwrap_or(u32::MAX);
        let correct_count =
            u32::try_from(questions.iter().filter(|o| o.correct).count()).unwrap_or(u32::MAX);
        let percentage = percentage(correct_count, total_count);

        ScoreResult {
            questions,
            correct_count,
            total_count,
            percentage,
            passed: percentage >= self.config.pass_threshold,
            ignored_question_ids,
        }
    }
}

/// Score with the default configuration (case-sensitive, 70% to pass).
pub fn score(quiz: &Quiz, answers: &SubmittedAnswers) -> ScoreResult {
    QuizScorer::default().score(quiz, answers)
}

/// Parse an answers document: a JSON object mapping question IDs to answers.
pub fn parse_answers(json: &str) -> Result<SubmittedAnswers, AnswersError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| AnswersError::Malformed(e.to_string()))?;
    let obj = value.as_object().ok_or_else(|| {
        AnswersError::Malformed("expected an object mapping question IDs to answers".into())
    })?;

    let mut answers = SubmittedAnswers::new();
    for (key, answer) in obj {
        let id = key.trim().parse::<u32>().map_err(|_| {
            AnswersError::Malformed(format!("question ID '{key}' is not a number"))
        })?;
        let answer = answer.as_str().ok_or_else(|| {
            AnswersError::Malformed(format!("answer for question {id} must be a string"))
        })?;
        if answers.insert(id, answer.to_string()).is_some() {
            return Err(AnswersError::Malformed(format!(
                "question {id} is answered more than once"
            )));
        }
    }
    Ok(answers)
}

/// Read and parse an answers file.
pub fn load_answers(path: &Path) -> Result<SubmittedAnswers, AnswersError> {
    let content = std::fs::read_to_string(path).map_err(|source| AnswersError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_answers(&content)
}
