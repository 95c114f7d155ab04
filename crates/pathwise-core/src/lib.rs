//! pathwise-core — Curriculum content, quiz scoring, and learner progression.
//!
//! This crate defines the content schema, the validated content repository,
//! the quiz scoring engine, and the progression tracker that the rest of
//! pathwise builds on.

pub mod error;
pub mod lesson_id;
pub mod markdown;
pub mod model;
pub mod parser;
pub mod progression;
pub mod report;
pub mod repository;
pub mod scoring;
pub mod traits;
pub mod validate;

pub use error::{
    AnswersError, InvalidTransitionError, NotFoundError, ProgressionError, SchemaError, Violation,
};
pub use lesson_id::LessonId;
pub use model::{Lesson, PathGroup, Question, QuestionKind, Quiz, Slot, SlotKind};
pub use progression::{
    LearnerProgress, LearnerView, LessonState, ProgressSummary, ProgressionTracker, UnlockPolicy,
};
pub use repository::ContentRepository;
pub use scoring::{QuizScorer, ScoreResult, ScoringConfig};
