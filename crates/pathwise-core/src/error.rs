//! Error taxonomy for the content, scoring, and progression layers.
//!
//! `SchemaError` is fatal at load time. `NotFoundError` and
//! `InvalidTransitionError` are expected, recoverable conditions that the
//! caller translates into a user-facing message.

use std::fmt;

use thiserror::Error;

/// A single structural problem found while validating content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The lesson ID (if applicable), as written in the source.
    pub lesson_id: Option<String>,
    pub message: String,
}

impl Violation {
    pub fn new(lesson_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            lesson_id: lesson_id.map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lesson_id {
            Some(id) => write!(f, "[{id}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Content failed structural validation. Carries every violation found, not
/// just the first.
#[derive(Debug, Clone, Error)]
#[error("content failed validation with {} violation(s)", violations.len())]
pub struct SchemaError {
    pub violations: Vec<Violation>,
}

/// A lesson, quiz, or question ID that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    #[error("lesson not found: {0}")]
    Lesson(String),

    #[error("lesson {0} has no quiz")]
    Quiz(String),

    #[error("question {question_id} not found in quiz for lesson {lesson_id}")]
    Question { lesson_id: String, question_id: u32 },
}

/// Attempt to complete a lesson the learner has not unlocked yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lesson {lesson_id} is locked for learner {learner_id}")]
pub struct InvalidTransitionError {
    pub learner_id: String,
    pub lesson_id: String,
}

/// Failures of progression operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressionError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransitionError),
}

/// A submitted-answers document could not be used.
#[derive(Debug, Error)]
pub enum AnswersError {
    #[error("failed to read answers file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed answers: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_display() {
        let v = Violation::new(Some("1.2"), "missing slot: video");
        assert_eq!(v.to_string(), "[1.2] missing slot: video");
        let v = Violation::new(None, "content table contains no lessons");
        assert_eq!(v.to_string(), "content table contains no lessons");
    }

    #[test]
    fn schema_error_counts_violations() {
        let err = SchemaError {
            violations: vec![
                Violation::new(Some("1.1"), "a"),
                Violation::new(Some("1.2"), "b"),
            ],
        };
        assert_eq!(err.to_string(), "content failed validation with 2 violation(s)");
    }

    #[test]
    fn progression_error_is_transparent() {
        let err: ProgressionError = InvalidTransitionError {
            learner_id: "ana".into(),
            lesson_id: "1.2".into(),
        }
        .into();
        assert_eq!(err.to_string(), "lesson 1.2 is locked for learner ana");
    }
}
