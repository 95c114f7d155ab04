//! Dotted lesson identifiers (`"<path>.<index>"`).
//!
//! Lesson IDs are compared numerically: `2.9` sorts before `2.10`, and every
//! Path 1 lesson sorts before every Path 2 lesson.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A parsed lesson identifier.
///
/// Field order matters: the derived `Ord` compares `path` first, then `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LessonId {
    path: u32,
    index: u32,
}

/// Why a string is not a lesson ID.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid lesson ID '{input}': expected \"<path>.<index>\" with decimal integers")]
pub struct LessonIdError {
    pub input: String,
}

impl LessonId {
    pub fn new(path: u32, index: u32) -> Self {
        Self { path, index }
    }

    /// The Path this lesson belongs to.
    pub fn path(&self) -> u32 {
        self.path
    }

    /// Position of the lesson within its Path.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.path, self.index)
    }
}

/// Parse one decimal component. Leading zeros are rejected so that every ID
/// has exactly one spelling.
fn parse_component(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    s.parse().ok()
}

impl FromStr for LessonId {
    type Err = LessonIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || LessonIdError {
            input: s.to_string(),
        };
        let (path, index) = s.split_once('.').ok_or_else(err)?;
        let path = parse_component(path).ok_or_else(err)?;
        let index = parse_component(index).ok_or_else(err)?;
        Ok(LessonId { path, index })
    }
}

impl TryFrom<String> for LessonId {
    type Error = LessonIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LessonId> for String {
    fn from(id: LessonId) -> Self {
        id.to_string()
    }
}
