//! Learner progress reports with JSON persistence and markdown output.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lesson_id::LessonId;
use crate::progression::{LessonScore, LessonState, ProgressSummary, ProgressionTracker};

/// A complete progress report for one learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    pub learner_id: String,
    pub summary: ProgressSummary,
    /// One row per lesson, in curriculum order.
    pub lessons: Vec<LessonRow>,
}

/// One lesson as it stands for the learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonRow {
    pub lesson_id: LessonId,
    pub title: String,
    pub state: LessonState,
    #[serde(default)]
    pub score: Option<LessonScore>,
}

impl ProgressReport {
    /// Build a report from the tracker's current view of a learner.
    ///
    /// Rows and summary come from one consistent read, even while other
    /// threads record completions for the same learner.
    pub fn build(tracker: &ProgressionTracker, learner_id: &str) -> Self {
        let view = tracker.view(learner_id);
        let repo = tracker.repository();

        let lessons = view
            .states
            .into_iter()
            .map(|(lesson_id, state)| LessonRow {
                lesson_id,
                title: repo
                    .lesson(lesson_id)
                    .map(|l| l.display_title().to_string())
                    .unwrap_or_default(),
                state,
                score: view.progress.scores.get(&lesson_id).cloned(),
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            learner_id: learner_id.to_string(),
            summary: view.summary,
            lessons,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ProgressReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let s = &self.summary;

        md.push_str(&format!("# Progress report: {}\n\n", self.learner_id));
        md.push_str(&format!(
            "Generated {}\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        ));
        md.push_str(&format!(
            "**Summary:** {}/{} lessons completed ({}%)",
            s.completed_count, s.total_count, s.overall_percent
        ));
        match s.next_lesson_id {
            Some(next) => md.push_str(&format!(", next lesson: {next}\n\n")),
            None => md.push_str(", curriculum complete\n\n"),
        }

        md.push_str("## Paths\n\n");
        md.push_str("| Path | Completed | Percent | Status |\n");
        md.push_str("|------|-----------|---------|--------|\n");
        for p in &s.percent_per_path {
            md.push_str(&format!(
                "| {} | {}/{} | {}% | {} |\n",
                p.path_number, p.completed, p.total, p.percent, p.status
            ));
        }
        md.push('\n');

        md.push_str("## Lessons\n\n");
        md.push_str("| Lesson | Title | State | Score |\n");
        md.push_str("|--------|-------|-------|-------|\n");
        for row in &self.lessons {
            let score = row.score.as_ref().map_or_else(
                || "-".to_string(),
                |sc| format!("{}/{} ({}%)", sc.correct_count, sc.total_count, sc.percentage),
            );
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                row.lesson_id,
                row.title.replace('|', "\\|"),
                row.state,
                score
            ));
        }

        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::tests::repo_with;
    use crate::progression::UnlockPolicy;
    use crate::scoring::ScoreResult;
    use std::sync::Arc;

    fn tracker_with_one_done() -> ProgressionTracker {
        let tracker = ProgressionTracker::new(Arc::new(repo_with(&["1.1", "1.2", "2.1"])));
        let result = ScoreResult {
            questions: Vec::new(),
            correct_count: 4,
            total_count: 5,
            percentage: 80,
            passed: true,
            ignored_question_ids: Vec::new(),
        };
        tracker.record_completion("ana", "1.1", &result).unwrap();
        tracker
    }

    #[test]
    fn build_lists_every_lesson() {
        let report = ProgressReport::build(&tracker_with_one_done(), "ana");
        assert_eq!(report.lessons.len(), 3);
        assert_eq!(report.lessons[0].state, LessonState::Completed);
        assert_eq!(report.lessons[0].score.as_ref().unwrap().percentage, 80);
        assert_eq!(report.lessons[1].state, LessonState::Unlocked);
        assert_eq!(report.lessons[2].state, LessonState::Locked);
        assert_eq!(report.summary.completed_count, 1);
    }

    #[test]
    fn json_roundtrip() {
        let report = ProgressReport::build(&tracker_with_one_done(), "ana");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.json");

        report.save_json(&path).unwrap();
        let loaded = ProgressReport::load_json(&path).unwrap();

        assert_eq!(loaded.id, report.id);
        assert_eq!(loaded.lessons.len(), 3);
        assert_eq!(loaded.summary, report.summary);
    }

    #[test]
    fn markdown_output() {
        let md = ProgressReport::build(&tracker_with_one_done(), "ana").to_markdown();
        assert!(md.contains("# Progress report: ana"));
        assert!(md.contains("1/3 lessons completed (33%), next lesson: 1.2"));
        assert!(md.contains("| 1 | 1/2 | 50% | in progress |"));
        assert!(md.contains("| 1.1 |"));
        assert!(md.contains("4/5 (80%)"));
    }

    #[test]
    fn rows_agree_with_summary_under_concurrent_completions() {
        let ids: Vec<String> = (1..=20).map(|i| format!("1.{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let tracker = ProgressionTracker::new(Arc::new(repo_with(&id_refs)))
            .with_policy(UnlockPolicy::Open);
        let result = ScoreResult {
            questions: Vec::new(),
            correct_count: 1,
            total_count: 1,
            percentage: 100,
            passed: true,
            ignored_question_ids: Vec::new(),
        };

        std::thread::scope(|s| {
            s.spawn(|| {
                for id in &ids {
                    tracker.record_completion("ana", id, &result).unwrap();
                }
            });
            for _ in 0..200 {
                let report = ProgressReport::build(&tracker, "ana");
                let completed_rows = report
                    .lessons
                    .iter()
                    .filter(|r| r.state == LessonState::Completed)
                    .count();
                let scored_rows = report.lessons.iter().filter(|r| r.score.is_some()).count();
                assert_eq!(completed_rows, report.summary.completed_count);
                assert_eq!(scored_rows, report.summary.completed_count);
            }
        });
    }
}

