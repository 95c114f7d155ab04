//! Lesson markdown import.
//!
//! Lesson files are split into slots by `## SLOT <n> — <title>` headers. The
//! quiz slot embeds its questions as a JSON block. The result is a raw JSON
//! lesson body with the same shape as a JSON content table entry, so it goes
//! through exactly the same validation.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::model::SlotKind;

/// Compile a fixed pattern once. A pattern that fails to compile is logged
/// and treated as matching nothing.
fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern, error = %e, "invalid built-in regex");
            None
        }
    })
    .as_ref()
}

fn slot_header_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(
        &RE,
        r"(?mi)^#{2,3}[ \t]*\**[ \t]*SLOT[ \t]+(\d+)[ \t]*(?:[—–:\-][ \t]*)?(.*?)[ \t]*\**[ \t]*$",
    )
}

fn lesson_id_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r"(\d+)\.(\d+)")
}

fn trailing_comma_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, r",\s*([}\]])")
}

/// First `<int>.<int>` in a file name, e.g. `Lesson_1.1_Hello.md` -> `1.1`.
pub fn lesson_id_from_file_name(file_name: &str) -> Option<String> {
    lesson_id_re()?
        .find(file_name)
        .map(|m| m.as_str().to_string())
}

struct SlotSection<'a> {
    number: u8,
    header: String,
    body: &'a str,
}

fn split_slots(content: &str) -> (Option<String>, Vec<SlotSection<'_>>) {
    let headers: Vec<_> = slot_header_re()
        .map(|re| re.captures_iter(content).collect())
        .unwrap_or_default();

    let preamble_end = headers
        .first()
        .and_then(|c| c.get(0))
        .map_or(content.len(), |m| m.start());
    let title = content[..preamble_end]
        .lines()
        .map(str::trim)
        .find_map(|l| l.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let mut sections = Vec::with_capacity(headers.len());
    for (i, caps) in headers.iter().enumerate() {
        let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = headers
            .get(i + 1)
            .and_then(|c| c.get(0))
            .map_or(content.len(), |m| m.start());
        let mut body = content[whole.end()..end].trim();
        if let Some(annex) = body.find("## ANNEXES") {
            body = body[..annex].trim();
        }
        sections.push(SlotSection {
            number: number.as_str().parse().unwrap_or(u8::MAX),
            header: caps
                .get(2)
                .map(|m| m.as_str().trim_end_matches('*').trim().to_string())
                .unwrap_or_default(),
            body,
        });
    }

    (title, sections)
}

/// Some exports squash the preamble and the whole first slot onto the first
/// line (`# Title intro ## SLOT 1 — body...`). Move the slot 1 header onto
/// its own line so the header regex sees it; its title falls back to the
/// default label and the rest of the line becomes the slot body.
fn unfold_inline_first_slot(text: &str) -> Option<String> {
    const MARKER: &str = "## SLOT 1";

    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    let at = first.find(MARKER)?;
    let before = &first[..at];
    if before.trim().trim_matches(|c: char| c == '#' || c == '*').trim().is_empty() {
        return None;
    }
    let after = &first[at + MARKER.len()..];
    if after.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let body = after.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '—' | '–' | '-'));

    Some(format!("{}\n{MARKER}\n{body}\n{rest}", before.trim_end()))
}

/// Parse a lesson markdown document into a raw lesson body.
///
/// Missing or malformed slots are not an error here; they surface as
/// violations when the repository validates the result.
pub fn parse_lesson_markdown(text: &str) -> Value {
    let mut text = text.replace("'''", "");
    if let Some(unfolded) = unfold_inline_first_slot(&text) {
        text = unfolded;
    }
    let (title, sections) = split_slots(&text);

    let mut lesson = Map::new();
    if let Some(title) = title {
        lesson.insert("title".into(), Value::String(title));
    }

    for section in sections {
        let kind = SlotKind::from_position(section.number);
        let slot_title = match (&kind, section.header.is_empty()) {
            (Some(k), true) => k.label().to_string(),
            _ => section.header.clone(),
        };

        let mut slot = Map::new();
        slot.insert("title".into(), Value::String(slot_title.clone()));
        slot.insert("content".into(), Value::String(section.body.to_string()));
        if kind == Some(SlotKind::Quiz) {
            match extract_quiz(section.body, &slot_title) {
                Some(quiz) => {
                    slot.insert("quiz".into(), quiz);
                }
                None => tracing::warn!("quiz slot has no parseable embedded quiz"),
            }
        }

        let key = match kind {
            Some(k) => k.key().to_string(),
            None => format!("slot {}", section.number),
        };
        if lesson.contains_key(&key) {
            lesson.insert(format!("{key} (repeated)"), Value::Object(slot));
        } else {
            lesson.insert(key, Value::Object(slot));
        }
    }

    Value::Object(lesson)
}

/// Pull the body of the first ```` ```json ```` block, or the first balanced
/// `{ ... }` object mentioning `"questions"`.
fn extract_json_text(content: &str) -> Option<String> {
    let mut in_block = false;
    let mut block = String::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if !in_block && trimmed.starts_with("```") {
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            if lang == "json" {
                in_block = true;
                block.clear();
            }
            continue;
        }
        if in_block && trimmed == "```" {
            return Some(block);
        }
        if in_block {
            if !block.is_empty() {
                block.push('\n');
            }
            block.push_str(line);
        }
    }

    // Unclosed block: take what we have.
    if in_block && !block.is_empty() {
        return Some(block);
    }

    let start = content.find("\"questions\"")?;
    let open = content[..start].rfind('{')?;
    balanced_object(&content[open..]).map(str::to_string)
}

/// The prefix of `s` (which starts with `{`) up to its matching `}`.
fn balanced_object(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match (escaped, c) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_lenient(text: &str) -> Option<Value> {
    if let Ok(v) = serde_json::from_str(text) {
        return Some(v);
    }
    let repaired = trailing_comma_re()?
        .replace_all(text, "$1")
        .replace("\\'", "'");
    serde_json::from_str(&repaired).ok()
}

/// Extract a structured quiz from quiz-slot markdown.
///
/// Accepts `{"questions": [...]}`, `{"quiz": [...]}`, or a bare array.
pub fn extract_quiz(content: &str, default_title: &str) -> Option<Value> {
    let parsed = parse_lenient(&extract_json_text(content)?)?;

    let (title, questions) = match parsed {
        Value::Array(questions) => (None, questions),
        Value::Object(mut obj) => {
            let title = obj
                .remove("title")
                .and_then(|t| t.as_str().map(str::to_string));
            match obj.remove("questions").or_else(|| obj.remove("quiz")) {
                Some(Value::Array(questions)) => (title, questions),
                _ => return None,
            }
        }
        _ => return None,
    };

    Some(json!({
        "title": title.unwrap_or_else(|| default_title.to_string()),
        "questions": questions.into_iter().map(normalize_question).collect::<Vec<_>>(),
    }))
}

/// Move the first present alias of `key` into `key`. The canonical name wins
/// when both are present.
fn adopt_alias(q: &mut Map<String, Value>, key: &str, aliases: &[&str]) {
    for alias in aliases {
        if let Some(value) = q.remove(*alias) {
            q.entry(key.to_string()).or_insert(value);
        }
    }
}

/// Bring an authored question into the canonical shape.
///
/// Older lesson exports use `question_text`/`questionText`,
/// `question_type`/`questionType`, `correct_answer` and `explanation`, spell
/// the type loosely (`fill_blank`, `multiple_choice`), and give the answer as
/// a 0- or 1-based option index. Anything that still doesn't fit is left
/// alone for validation to report.
fn normalize_question(question: Value) -> Value {
    let mut q = match question {
        Value::Object(q) => q,
        other => return other,
    };

    adopt_alias(&mut q, "question", &["question_text", "questionText"]);
    adopt_alias(&mut q, "type", &["question_type", "questionType"]);
    adopt_alias(&mut q, "answer", &["correct_answer", "correctAnswer"]);
    adopt_alias(&mut q, "feedback", &["explanation"]);

    if let Some(Value::String(kind)) = q.get_mut("type") {
        let lower = kind.to_lowercase();
        if lower.contains("fill") || lower.contains("blank") || lower.contains("complet") {
            *kind = "fill-in-the-blank".into();
        } else if lower.contains("multiple") || lower.contains("choice") {
            *kind = "multiple-choice".into();
        }
    }

    let options: Vec<String> = q
        .get("options")
        .and_then(Value::as_array)
        .map(|opts| {
            opts.iter()
                .filter_map(|o| o.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let resolved = match q.get("answer") {
        Some(Value::Number(n)) => n.as_u64().and_then(|i| option_at_index(&options, i)),
        Some(Value::String(answer)) if !options.contains(answer) => options
            .iter()
            .find(|o| o.trim().eq_ignore_ascii_case(answer.trim()))
            .cloned(),
        _ => None,
    };
    if let Some(answer) = resolved {
        q.insert("answer".into(), Value::String(answer));
    }

    Value::Object(q)
}

/// An index into `options`: 0-based when in range, 1-based when it is one
/// past the end.
fn option_at_index(options: &[String], index: u64) -> Option<String> {
    let index = usize::try_from(index).ok()?;
    if index < options.len() {
        options.get(index).cloned()
    } else if index == options.len() && index > 0 {
        options.get(index - 1).cloned()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LESSON_MD: &str = r#"# Hello, My Name Is...

## SLOT 1 — The First Handshake
Your first morning at the department.

## SLOT 2: Video Scenario
Watch Maya meet her new team.

### **SLOT 3 - Verb "to be"**
I am, you are, she is.

## SLOT 4 – Written Practice
Write three sentences introducing yourself.

## SLOT 5 — Oral Practice
Record a 30-second introduction.

## SLOT 6 — Quiz
Test what you learned.

```json
{
  "questions": [
    {"id": 1, "type": "multiple-choice", "question": "She ___ an analyst.", "options": ["is", "are"], "answer": "is", "feedback": "She is.",},
  ]
}
```

## SLOT 7 — Coaching Tip
Smile and make eye contact.

## ANNEXES
Internal notes for authors.
"#;

    #[test]
    fn id_from_file_name() {
        assert_eq!(
            lesson_id_from_file_name("Lesson_13.2_Briefings.md").as_deref(),
            Some("13.2")
        );
        assert_eq!(lesson_id_from_file_name("overview.md"), None);
    }

    #[test]
    fn parses_all_slots_and_title() {
        let lesson = parse_lesson_markdown(LESSON_MD);
        assert_eq!(lesson["title"], "Hello, My Name Is...");
        assert_eq!(lesson["hook"]["title"], "The First Handshake");
        assert_eq!(lesson["video"]["title"], "Video Scenario");
        assert_eq!(lesson["strategy"]["title"], "Verb \"to be\"");
        assert_eq!(lesson["oral"]["content"], "Record a 30-second introduction.");
        assert_eq!(lesson["coaching"]["content"], "Smile and make eye contact.");
        for kind in SlotKind::ALL {
            assert!(lesson.get(kind.key()).is_some(), "missing {kind}");
        }
    }

    #[test]
    fn embedded_quiz_survives_trailing_commas() {
        let lesson = parse_lesson_markdown(LESSON_MD);
        let quiz = &lesson["quiz"]["quiz"];
        assert_eq!(quiz["title"], "Quiz");
        assert_eq!(quiz["questions"][0]["answer"], "is");
    }

    #[test]
    fn bare_questions_object_without_fence() {
        let body = r#"Answer these: {"questions": [{"question": "Pick {one}", "options": ["a"], "answer": "a"}]} Good luck."#;
        let quiz = extract_quiz(body, "Check-in").unwrap();
        assert_eq!(quiz["title"], "Check-in");
        assert_eq!(quiz["questions"][0]["question"], "Pick {one}");
    }

    #[test]
    fn unparseable_quiz_is_omitted() {
        let md = "## SLOT 6 — Quiz\n```json\n{ this is not json\n```\n";
        let lesson = parse_lesson_markdown(md);
        assert!(lesson["quiz"].get("quiz").is_none());
        assert!(lesson["quiz"]["content"].as_str().unwrap().contains("not json"));
    }

    #[test]
    fn unknown_and_repeated_slots_are_kept_for_validation() {
        let md = "## SLOT 1 — A\nx\n## SLOT 1 — B\ny\n## SLOT 9 — C\nz\n";
        let lesson = parse_lesson_markdown(md);
        assert_eq!(lesson["hook"]["title"], "A");
        assert_eq!(lesson["hook (repeated)"]["title"], "B");
        assert_eq!(lesson["slot 9"]["title"], "C");
    }

    #[test]
    fn empty_header_uses_default_label() {
        let lesson = parse_lesson_markdown("## SLOT 7\nKeep going.");
        assert_eq!(lesson["coaching"]["title"], "Coaching Tip");
    }

    #[test]
    fn built_in_patterns_compile() {
        assert!(slot_header_re().is_some());
        assert!(lesson_id_re().is_some());
        assert!(trailing_comma_re().is_some());
    }

    #[test]
    fn legacy_field_names_are_normalized() {
        let body = r#"```json
{"questions": [
  {"id": 1, "question_text": "She ___ an analyst.", "question_type": "multiple_choice",
   "options": ["is", "are"], "correct_answer": "is", "explanation": "She is."},
  {"id": 2, "questionText": "I ___ from Ottawa.", "questionType": "fill_blank",
   "answer": "come"}
]}
```"#;
        let quiz = extract_quiz(body, "Quiz").unwrap();
        let q1 = &quiz["questions"][0];
        assert_eq!(q1["question"], "She ___ an analyst.");
        assert_eq!(q1["type"], "multiple-choice");
        assert_eq!(q1["answer"], "is");
        assert_eq!(q1["feedback"], "She is.");
        assert!(q1.get("question_text").is_none());
        assert!(q1.get("correct_answer").is_none());

        let q2 = &quiz["questions"][1];
        assert_eq!(q2["question"], "I ___ from Ottawa.");
        assert_eq!(q2["type"], "fill-in-the-blank");
    }

    #[test]
    fn canonical_names_win_over_aliases() {
        let body = r#"{"questions": [{"question": "kept", "question_text": "dropped", "options": ["a"], "answer": "a"}]}"#;
        let quiz = extract_quiz(body, "Quiz").unwrap();
        assert_eq!(quiz["questions"][0]["question"], "kept");
    }

    #[test]
    fn numeric_answers_resolve_to_options() {
        let body = r#"{"questions": [
            {"question": "zero-based", "options": ["is", "are", "am"], "answer": 0},
            {"question": "one past the end", "options": ["is", "are", "am"], "correct_answer": 3},
            {"question": "out of range", "options": ["is", "are"], "answer": 7},
            {"question": "case differs", "options": ["He", "She"], "answer": " he "}
        ]}"#;
        let quiz = extract_quiz(body, "Quiz").unwrap();
        assert_eq!(quiz["questions"][0]["answer"], "is");
        assert_eq!(quiz["questions"][1]["answer"], "am");
        assert_eq!(quiz["questions"][2]["answer"], 7);
        assert_eq!(quiz["questions"][3]["answer"], "He");
    }

    #[test]
    fn inline_first_slot_is_unfolded() {
        let md = "# Greetings intro text ## SLOT 1 — Meet the team today.\n## SLOT 2 — Video\nWatch.\n";
        let lesson = parse_lesson_markdown(md);
        assert_eq!(lesson["title"], "Greetings intro text");
        assert_eq!(lesson["hook"]["title"], "Introduction");
        assert_eq!(lesson["hook"]["content"], "Meet the team today.");
        assert_eq!(lesson["video"]["content"], "Watch.");
    }

    #[test]
    fn leading_slot_header_is_left_alone() {
        assert!(unfold_inline_first_slot("## SLOT 1 — A\nbody").is_none());
        assert!(unfold_inline_first_slot("### **SLOT 1 — A\nbody").is_none());
        assert!(unfold_inline_first_slot("# Title ## SLOT 12 — A").is_none());
    }
}
