//! Structural validation of raw content, and soft-convention lints.
//!
//! Validation never stops at the first problem: every violation in the table
//! is collected so a content author can fix them all in one pass.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::Violation;
use crate::lesson_id::LessonId;
use crate::model::{Lesson, Question, QuestionKind, Quiz, Slot, SlotKind};
use crate::parser::RawContent;
use crate::repository::ContentRepository;

/// Collects violations for one lesson.
struct Checker<'a> {
    lesson_id: &'a str,
    violations: &'a mut Vec<Violation>,
}

impl Checker<'_> {
    fn report(&mut self, message: impl Into<String>) {
        self.violations
            .push(Violation::new(Some(self.lesson_id), message));
    }

    /// A required, non-blank string field.
    fn required_str(&mut self, obj: &Map<String, Value>, key: &str, what: &str) -> Option<String> {
        match obj.get(key) {
            None | Some(Value::Null) => {
                self.report(format!("{what}: missing {key}"));
                None
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                self.report(format!("{what}: {key} is empty"));
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.report(format!("{what}: {key} must be a string"));
                None
            }
        }
    }

    /// An optional string field: `Some(None)` when absent, `None` when mistyped.
    fn optional_str(&mut self, obj: &Map<String, Value>, key: &str, what: &str) -> Option<Option<String>> {
        match obj.get(key) {
            None | Some(Value::Null) => Some(None),
            Some(Value::String(s)) => Some(Some(s.clone())),
            Some(_) => {
                self.report(format!("{what}: {key} must be a string"));
                None
            }
        }
    }

    fn string_list(&mut self, value: &Value, what: &str) -> Option<Vec<String>> {
        let Some(items) = value.as_array() else {
            self.report(format!("{what} must be a list of strings"));
            return None;
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item.as_str() {
                Some(s) => out.push(s.to_string()),
                None => {
                    self.report(format!("{what} must be a list of strings"));
                    return None;
                }
            }
        }
        Some(out)
    }

    fn lesson(&mut self, id: Option<LessonId>, value: &Value) -> Option<Lesson> {
        let Some(obj) = value.as_object() else {
            self.report("lesson must be a table of slots");
            return None;
        };

        let title = self.optional_str(obj, "title", "lesson");

        for key in obj.keys() {
            if key != "title" && !SlotKind::ALL.iter().any(|k| k.key() == key) {
                self.report(format!("unknown slot: {key}"));
            }
        }

        let mut slots = Vec::with_capacity(SlotKind::ALL.len());
        for kind in SlotKind::ALL {
            match obj.get(kind.key()) {
                Some(slot) => slots.push(self.slot(kind, slot)),
                None => {
                    self.report(format!("missing slot: {kind}"));
                    slots.push(None);
                }
            }
        }

        let id = id?;
        let title = title?.unwrap_or_default();
        let mut slots = slots.into_iter().collect::<Option<Vec<Slot>>>()?.into_iter();
        let mut next = || slots.next();
        Some(Lesson {
            id,
            title,
            hook: next()?,
            video: next()?,
            strategy: next()?,
            written: next()?,
            oral: next()?,
            quiz: next()?,
            coaching: next()?,
        })
    }

    fn slot(&mut self, kind: SlotKind, value: &Value) -> Option<Slot> {
        let what = format!("{kind} slot");
        let Some(obj) = value.as_object() else {
            self.report(format!("{what} must be a table with title and content"));
            return None;
        };

        let title = self.required_str(obj, "title", &what);
        let content = self.required_str(obj, "content", &what);

        let quiz = match obj.get("quiz") {
            None | Some(Value::Null) => Some(None),
            Some(_) if kind != SlotKind::Quiz => {
                self.report(format!("{what}: only the quiz slot may carry a quiz"));
                None
            }
            Some(quiz) => self
                .quiz(quiz, title.as_deref().unwrap_or(SlotKind::Quiz.label()))
                .map(Some),
        };

        Some(Slot {
            title: title?,
            content: content?,
            quiz: quiz?,
        })
    }

    fn quiz(&mut self, value: &Value, fallback_title: &str) -> Option<Quiz> {
        let Some(obj) = value.as_object() else {
            self.report("quiz must be a table with a list of questions");
            return None;
        };

        let title = self.optional_str(obj, "title", "quiz");
        let questions = match obj.get("questions") {
            Some(Value::Array(items)) if items.is_empty() => {
                self.report("quiz has no questions");
                None
            }
            Some(Value::Array(items)) => {
                let mut seen = HashSet::new();
                let parsed: Vec<Option<Question>> = items
                    .iter()
                    .enumerate()
                    .map(|(i, q)| {
                        let question = self.question(i, q)?;
                        if !seen.insert(question.id) {
                            self.report(format!("duplicate question ID: {}", question.id));
                            return None;
                        }
                        Some(question)
                    })
                    .collect();
                parsed.into_iter().collect::<Option<Vec<_>>>()
            }
            None | Some(Value::Null) => {
                self.report("quiz has no questions");
                None
            }
            Some(_) => {
                self.report("quiz: questions must be a list");
                None
            }
        };

        let title = title?
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| fallback_title.to_string());
        Some(Quiz {
            title,
            questions: questions?,
        })
    }

    fn question(&mut self, position: usize, value: &Value) -> Option<Question> {
        let fallback_id = u32::try_from(position + 1).ok()?;
        let Some(obj) = value.as_object() else {
            self.report(format!("question {fallback_id} must be a table"));
            return None;
        };

        let id = match obj.get("id") {
            None | Some(Value::Null) => Some(fallback_id),
            Some(v) => match v.as_u64().and_then(|n| u32::try_from(n).ok()) {
                Some(n) if n > 0 => Some(n),
                _ => {
                    self.report(format!(
                        "question {fallback_id}: id must be a positive integer"
                    ));
                    None
                }
            },
        };
        let label = format!("question {}", id.unwrap_or(fallback_id));

        let text = self.required_str(obj, "question", &label);
        let feedback = self.optional_str(obj, "feedback", &label);
        let kind = match self.optional_str(obj, "type", &label)? {
            None => self.multiple_choice(obj, &label),
            Some(tag) => match tag.as_str() {
                "multiple-choice" => self.multiple_choice(obj, &label),
                "fill-in-the-blank" => self.fill_in_the_blank(obj, &label),
                other => {
                    self.report(format!("{label}: unknown question type '{other}'"));
                    None
                }
            },
        };

        Some(Question {
            id: id?,
            question: text?,
            kind: kind?,
            feedback: feedback?.unwrap_or_default(),
        })
    }

    fn multiple_choice(&mut self, obj: &Map<String, Value>, label: &str) -> Option<QuestionKind> {
        let answer = self.required_str(obj, "answer", label);
        let options = match obj.get("options") {
            Some(v) => self.string_list(v, &format!("{label}: options"))?,
            None => Vec::new(),
        };
        if options.is_empty() {
            self.report(format!("{label}: multiple-choice question has no options"));
            return None;
        }

        let mut seen = HashSet::new();
        let mut valid = true;
        for option in &options {
            if !seen.insert(option.as_str()) {
                self.report(format!("{label}: duplicate option '{option}'"));
                valid = false;
            }
        }

        let answer = answer?;
        if !options.contains(&answer) {
            self.report(format!("{label}: answer '{answer}' is not one of its options"));
            return None;
        }

        valid.then_some(QuestionKind::MultipleChoice { options, answer })
    }

    fn fill_in_the_blank(&mut self, obj: &Map<String, Value>, label: &str) -> Option<QuestionKind> {
        let answer = self.required_str(obj, "answer", label);
        let alternatives = match obj.get("alternatives") {
            Some(v) => self.string_list(v, &format!("{label}: alternatives"))?,
            None => Vec::new(),
        };
        Some(QuestionKind::FillInTheBlank {
            answer: answer?,
            alternatives,
        })
    }
}

/// Validate a raw table into lessons, or return every violation found.
pub(crate) fn validate(raw: &RawContent) -> Result<Vec<Lesson>, Vec<Violation>> {
    let mut violations = Vec::new();
    let mut lessons = Vec::with_capacity(raw.len());

    if raw.is_empty() {
        violations.push(Violation::new(None, "content table contains no lessons"));
    }

    let mut seen = HashSet::new();
    for entry in raw.entries() {
        let mut checker = Checker {
            lesson_id: &entry.id,
            violations: &mut violations,
        };

        let id = match entry.id.parse::<LessonId>() {
            Ok(id) => Some(id),
            Err(e) => {
                checker.report(e.to_string());
                None
            }
        };
        let duplicate = match id {
            Some(id) => !seen.insert(id),
            None => false,
        };
        if duplicate {
            checker.report(format!("duplicate lesson ID: {}", entry.id));
        }

        if let Some(lesson) = checker.lesson(id, &entry.value) {
            if !duplicate {
                lessons.push(lesson);
            }
        }
    }

    if violations.is_empty() {
        Ok(lessons)
    } else {
        Err(violations)
    }
}

/// Soft-convention warnings for loaded content. These never fail a load.
pub fn lint(repo: &ContentRepository) -> Vec<Violation> {
    let mut warnings = Vec::new();

    for path in repo.list_paths() {
        for (expected, id) in (1u32..).zip(&path.lesson_ids) {
            if id.index() != expected {
                warnings.push(Violation::new(
                    Some(&id.to_string()),
                    format!(
                        "path {} lesson indices are not contiguous from 1 (expected {}.{expected})",
                        path.path_number, path.path_number
                    ),
                ));
                break;
            }
        }
    }

    for lesson in repo.lessons() {
        let id = lesson.id.to_string();
        let Some(quiz) = lesson.quiz() else {
            warnings.push(Violation::new(
                Some(&id),
                "quiz slot carries no structured quiz",
            ));
            continue;
        };

        if quiz.questions.iter().zip(1u32..).any(|(q, n)| q.id != n) {
            warnings.push(Violation::new(
                Some(&id),
                "question IDs are not contiguous from 1",
            ));
        }
        for q in &quiz.questions {
            if q.feedback.trim().is_empty() {
                warnings.push(Violation::new(
                    Some(&id),
                    format!("question {} has no feedback", q.id),
                ));
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slot(title: &str) -> Value {
        json!({ "title": title, "content": format!("{title} body") })
    }

    fn lesson_value() -> Value {
        json!({
            "title": "Hello",
            "hook": slot("Hook"),
            "video": slot("Video"),
            "strategy": slot("Strategy"),
            "written": slot("Written"),
            "oral": slot("Oral"),
            "quiz": {
                "title": "Quiz",
                "content": "Check yourself.",
                "quiz": {
                    "title": "Quiz 1.1",
                    "questions": [
                        {"id": 1, "type": "multiple-choice", "question": "She ___ here.",
                         "options": ["is", "are"], "answer": "is", "feedback": "She is."},
                        {"id": 2, "type": "fill-in-the-blank", "question": "I ___ Ana.",
                         "answer": "am", "feedback": "I am."}
                    ]
                }
            },
            "coaching": slot("Coaching"),
        })
    }

    fn raw(entries: Vec<(&str, Value)>) -> RawContent {
        let mut raw = RawContent::new();
        for (id, value) in entries {
            raw.push(id, value);
        }
        raw
    }

    fn messages(violations: &[Violation]) -> Vec<String> {
        violations.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn valid_lesson_passes() {
        let lessons = validate(&raw(vec![("1.1", lesson_value())])).unwrap();
        assert_eq!(lessons.len(), 1);
        let quiz = lessons[0].quiz().unwrap();
        assert_eq!(quiz.title, "Quiz 1.1");
        assert_eq!(quiz.questions.len(), 2);
        assert_eq!(lessons[0].title, "Hello");
    }

    #[test]
    fn empty_table_is_a_violation() {
        let err = validate(&RawContent::new()).unwrap_err();
        assert_eq!(messages(&err), vec!["content table contains no lessons"]);
    }

    #[test]
    fn collects_violations_across_lessons() {
        let mut missing_video = lesson_value();
        missing_video.as_object_mut().unwrap().remove("video");
        let mut empty_hook = lesson_value();
        empty_hook["hook"]["content"] = json!("   ");
        let mut bad_answer = lesson_value();
        bad_answer["quiz"]["quiz"]["questions"][0]["answer"] = json!("am");

        let err = validate(&raw(vec![
            ("1.1", missing_video),
            ("1.2", empty_hook),
            ("1.x", lesson_value()),
            ("1.3", bad_answer),
        ]))
        .unwrap_err();
        let msgs = messages(&err);

        assert!(msgs.contains(&"[1.1] missing slot: video".to_string()));
        assert!(msgs.contains(&"[1.2] hook slot: content is empty".to_string()));
        assert!(msgs.iter().any(|m| m.starts_with("[1.x] invalid lesson ID")));
        assert!(msgs.contains(&"[1.3] question 1: answer 'am' is not one of its options".to_string()));
        assert_eq!(msgs.len(), 4);
    }

    #[test]
    fn duplicate_ids_are_reported() {
        let err = validate(&raw(vec![
            ("2.1", lesson_value()),
            ("2.1", lesson_value()),
        ]))
        .unwrap_err();
        assert_eq!(messages(&err), vec!["[2.1] duplicate lesson ID: 2.1"]);
    }

    #[test]
    fn unknown_slot_and_misplaced_quiz() {
        let mut value = lesson_value();
        value["summary"] = slot("Summary");
        value["oral"]["quiz"] = value["quiz"]["quiz"].clone();
        let err = validate(&raw(vec![("1.1", value)])).unwrap_err();
        let msgs = messages(&err);
        assert!(msgs.contains(&"[1.1] unknown slot: summary".to_string()));
        assert!(msgs.contains(&"[1.1] oral slot: only the quiz slot may carry a quiz".to_string()));
    }

    #[test]
    fn quiz_level_violations() {
        let mut empty = lesson_value();
        empty["quiz"]["quiz"]["questions"] = json!([]);
        let mut dupes = lesson_value();
        dupes["quiz"]["quiz"]["questions"][1]["id"] = json!(1);
        let mut bad_type = lesson_value();
        bad_type["quiz"]["quiz"]["questions"][0]["type"] = json!("essay");
        let mut dup_options = lesson_value();
        dup_options["quiz"]["quiz"]["questions"][0]["options"] = json!(["is", "is"]);

        let err = validate(&raw(vec![
            ("1.1", empty),
            ("1.2", dupes),
            ("1.3", bad_type),
            ("1.4", dup_options),
        ]))
        .unwrap_err();
        let msgs = messages(&err);
        assert!(msgs.contains(&"[1.1] quiz has no questions".to_string()));
        assert!(msgs.contains(&"[1.2] duplicate question ID: 1".to_string()));
        assert!(msgs.contains(&"[1.3] question 1: unknown question type 'essay'".to_string()));
        assert!(msgs.contains(&"[1.4] question 1: duplicate option 'is'".to_string()));
    }

    #[test]
    fn question_defaults() {
        let mut value = lesson_value();
        value["quiz"]["quiz"] = json!({
            "questions": [
                {"question": "Pick one", "options": ["a", "b"], "answer": "b"}
            ]
        });
        let lessons = validate(&raw(vec![("1.1", value)])).unwrap();
        let quiz = lessons[0].quiz().unwrap();
        assert_eq!(quiz.title, "Quiz");
        assert_eq!(quiz.questions[0].id, 1);
        assert!(quiz.questions[0].feedback.is_empty());
        assert_eq!(quiz.questions[0].kind.tag(), "multiple-choice");
    }

    #[test]
    fn quiz_slot_without_quiz_is_valid() {
        let mut value = lesson_value();
        value["quiz"].as_object_mut().unwrap().remove("quiz");
        let lessons = validate(&raw(vec![("1.1", value)])).unwrap();
        assert!(lessons[0].quiz().is_none());
    }
}
