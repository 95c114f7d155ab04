//! The content repository: validated, immutable, keyed lesson lookup.
//!
//! Built once from a [`RawContent`] table and never mutated afterwards, so it
//! can be shared across threads behind an `Arc` without locking.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::{NotFoundError, SchemaError};
use crate::lesson_id::LessonId;
use crate::model::{find_question, Lesson, PathGroup, Question, Quiz};
use crate::parser::{self, RawContent};
use crate::validate;

/// Read-only lesson store ordered by numeric lesson ID.
#[derive(Debug, Clone)]
pub struct ContentRepository {
    lessons: BTreeMap<LessonId, Lesson>,
    paths: Vec<PathGroup>,
}

impl ContentRepository {
    /// Validate a raw table and build the repository.
    ///
    /// Fails with every violation in the table, not just the first.
    pub fn load(raw: &RawContent) -> Result<Self, SchemaError> {
        let lessons = validate::validate(raw).map_err(|violations| SchemaError { violations })?;

        let lessons: BTreeMap<LessonId, Lesson> =
            lessons.into_iter().map(|l| (l.id, l)).collect();

        let mut paths: Vec<PathGroup> = Vec::new();
        for id in lessons.keys() {
            match paths.last_mut() {
                Some(group) if group.path_number == id.path() => group.lesson_ids.push(*id),
                _ => paths.push(PathGroup {
                    path_number: id.path(),
                    lesson_ids: vec![*id],
                }),
            }
        }

        tracing::info!(
            lessons = lessons.len(),
            paths = paths.len(),
            "content repository loaded"
        );

        Ok(Self { lessons, paths })
    }

    /// Load and validate a content file or directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = parser::load_content(path)
            .with_context(|| format!("failed to load content from {}", path.display()))?;
        Ok(Self::load(&raw)?)
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    /// Whether `id` names a lesson. Malformed IDs simply don't exist.
    pub fn contains(&self, id: &str) -> bool {
        id.parse::<LessonId>()
            .is_ok_and(|id| self.lessons.contains_key(&id))
    }

    pub fn get_lesson(&self, id: &str) -> Result<&Lesson, NotFoundError> {
        id.parse::<LessonId>()
            .ok()
            .and_then(|id| self.lessons.get(&id))
            .ok_or_else(|| NotFoundError::Lesson(id.to_string()))
    }

    pub fn lesson(&self, id: LessonId) -> Option<&Lesson> {
        self.lessons.get(&id)
    }

    /// The structured quiz of a lesson. A lesson whose quiz slot carries no
    /// quiz is reported as not found.
    pub fn get_quiz(&self, id: &str) -> Result<&Quiz, NotFoundError> {
        self.get_lesson(id)?
            .quiz()
            .ok_or_else(|| NotFoundError::Quiz(id.to_string()))
    }

    pub fn get_question(&self, lesson_id: &str, question_id: u32) -> Result<&Question, NotFoundError> {
        find_question(self.get_lesson(lesson_id)?, question_id)
    }

    /// Lesson IDs ordered by Path, then by index within the Path.
    pub fn list_lesson_ids(&self) -> Vec<LessonId> {
        self.lessons.keys().copied().collect()
    }

    /// Lessons in curriculum order.
    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.lessons.values()
    }

    /// Paths in ascending order, each with its lessons in order.
    pub fn list_paths(&self) -> &[PathGroup] {
        &self.paths
    }

    pub fn path(&self, path_number: u32) -> Option<&PathGroup> {
        self.paths.iter().find(|p| p.path_number == path_number)
    }

    /// The Path following `path_number`, skipping numbering gaps.
    pub fn path_after(&self, path_number: u32) -> Option<&PathGroup> {
        self.paths.iter().find(|p| p.path_number > path_number)
    }

    /// The Path preceding `path_number`, skipping numbering gaps.
    pub fn path_before(&self, path_number: u32) -> Option<&PathGroup> {
        self.paths.iter().rev().find(|p| p.path_number < path_number)
    }

    /// The first lesson of the curriculum.
    pub fn first_lesson(&self) -> Option<LessonId> {
        self.lessons.keys().next().copied()
    }

    /// The lesson after `id` in curriculum order, crossing Path boundaries.
    pub fn next_lesson(&self, id: LessonId) -> Option<LessonId> {
        use std::ops::Bound::{Excluded, Unbounded};
        self.lessons
            .range((Excluded(id), Unbounded))
            .next()
            .map(|(k, _)| *k)
    }

    /// The lesson before `id` within the same Path.
    pub fn previous_in_path(&self, id: LessonId) -> Option<LessonId> {
        self.lessons
            .range(..id)
            .next_back()
            .map(|(k, _)| *k)
            .filter(|prev| prev.path() == id.path())
    }

    /// Soft-convention warnings; see [`validate::lint`].
    pub fn lint(&self) -> Vec<crate::error::Violation> {
        validate::lint(self)
    }
}
