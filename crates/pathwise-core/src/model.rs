//! Core data model types for pathwise.
//!
//! These are the validated shapes every other component works with: a
//! [`Lesson`] made of seven named [`Slot`]s, and the [`Quiz`] nested inside
//! the quiz slot. Values of these types are only produced by the content
//! repository after validation, so their invariants can be relied upon.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::NotFoundError;
use crate::lesson_id::LessonId;

/// The seven fixed sections of every lesson, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Hook,
    Video,
    Strategy,
    Written,
    Oral,
    Quiz,
    Coaching,
}

impl SlotKind {
    /// All slots in display order.
    pub const ALL: [SlotKind; 7] = [
        SlotKind::Hook,
        SlotKind::Video,
        SlotKind::Strategy,
        SlotKind::Written,
        SlotKind::Oral,
        SlotKind::Quiz,
        SlotKind::Coaching,
    ];

    /// 1-based slot number as used in lesson markdown (`## SLOT 3`).
    pub fn position(self) -> u8 {
        match self {
            SlotKind::Hook => 1,
            SlotKind::Video => 2,
            SlotKind::Strategy => 3,
            SlotKind::Written => 4,
            SlotKind::Oral => 5,
            SlotKind::Quiz => 6,
            SlotKind::Coaching => 7,
        }
    }

    pub fn from_position(position: u8) -> Option<SlotKind> {
        SlotKind::ALL.get(usize::from(position).checked_sub(1)?).copied()
    }

    /// Field name in raw content tables.
    pub fn key(self) -> &'static str {
        match self {
            SlotKind::Hook => "hook",
            SlotKind::Video => "video",
            SlotKind::Strategy => "strategy",
            SlotKind::Written => "written",
            SlotKind::Oral => "oral",
            SlotKind::Quiz => "quiz",
            SlotKind::Coaching => "coaching",
        }
    }

    /// Default human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            SlotKind::Hook => "Introduction",
            SlotKind::Video => "Video Scenario",
            SlotKind::Strategy => "Grammar Strategy",
            SlotKind::Written => "Written Practice",
            SlotKind::Oral => "Oral Practice",
            SlotKind::Quiz => "Quiz",
            SlotKind::Coaching => "Coaching Tip",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SlotKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        SlotKind::ALL
            .into_iter()
            .find(|k| k.key() == lowered)
            .ok_or_else(|| format!("unknown slot: {s}"))
    }
}

/// One section of a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub title: String,
    /// Markdown-like body text, stored verbatim.
    pub content: String,
    /// Only ever present on the quiz slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Quiz>,
}

/// A complete, validated lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    #[serde(default)]
    pub title: String,
    pub hook: Slot,
    pub video: Slot,
    pub strategy: Slot,
    pub written: Slot,
    pub oral: Slot,
    pub quiz: Slot,
    pub coaching: Slot,
}

impl Lesson {
    pub fn slot(&self, kind: SlotKind) -> &Slot {
        match kind {
            SlotKind::Hook => &self.hook,
            SlotKind::Video => &self.video,
            SlotKind::Strategy => &self.strategy,
            SlotKind::Written => &self.written,
            SlotKind::Oral => &self.oral,
            SlotKind::Quiz => &self.quiz,
            SlotKind::Coaching => &self.coaching,
        }
    }

    /// Slots in display order.
    pub fn slots(&self) -> impl Iterator<Item = (SlotKind, &Slot)> {
        SlotKind::ALL.into_iter().map(move |k| (k, self.slot(k)))
    }

    /// The structured quiz carried by the quiz slot, if any.
    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.quiz.as_ref()
    }

    /// Lesson title, falling back to the hook slot's title.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.hook.title
        } else {
            &self.title
        }
    }
}

/// An ordered list of questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub title: String,
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn question(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// A single quiz question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub question: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    /// Shown to the learner whether or not the answer was correct.
    #[serde(default)]
    pub feedback: String,
}

/// Question variants, tagged by the `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
    /// Pick one of a fixed set of literal options.
    MultipleChoice { options: Vec<String>, answer: String },
    /// Free text compared after normalization.
    FillInTheBlank {
        answer: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        alternatives: Vec<String>,
    },
}

impl QuestionKind {
    /// The `type` tag as written in content files.
    pub fn tag(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice { .. } => "multiple-choice",
            QuestionKind::FillInTheBlank { .. } => "fill-in-the-blank",
        }
    }

    /// The authored correct answer.
    pub fn answer(&self) -> &str {
        match self {
            QuestionKind::MultipleChoice { answer, .. }
            | QuestionKind::FillInTheBlank { answer, .. } => answer,
        }
    }
}

/// A Path: consecutive lessons sharing the same leading integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathGroup {
    pub path_number: u32,
    pub lesson_ids: Vec<LessonId>,
}

impl PathGroup {
    pub fn first(&self) -> Option<LessonId> {
        self.lesson_ids.first().copied()
    }

    pub fn last(&self) -> Option<LessonId> {
        self.lesson_ids.last().copied()
    }
}

/// Look up a question in a lesson's quiz.
pub fn find_question<'a>(
    lesson: &'a Lesson,
    question_id: u32,
) -> Result<&'a Question, NotFoundError> {
    let quiz = lesson
        .quiz()
        .ok_or_else(|| NotFoundError::Quiz(lesson.id.to_string()))?;
    quiz.question(question_id)
        .ok_or_else(|| NotFoundError::Question {
            lesson_id: lesson.id.to_string(),
            question_id,
        })
}
