//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use pathwise_core::progression::{LessonState, PathProgress, PathStatus};
use pathwise_core::report::ProgressReport;

/// Escape a string for safe HTML insertion.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn state_class(state: LessonState) -> &'static str {
    match state {
        LessonState::Completed => "completed",
        LessonState::Unlocked => "unlocked",
        LessonState::Locked => "locked",
    }
}

/// Generate an HTML page from a progress report.
pub fn generate_html(report: &ProgressReport) -> String {
    let mut html = String::new();
    let summary = &report.summary;

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>pathwise progress: {}</title>\n",
        html_escape(&report.learner_id)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str(&format!(
        "<h1>Progress report: {}</h1>\n",
        html_escape(&report.learner_id)
    ));
    let next = match summary.next_lesson_id {
        Some(id) => format!("next lesson <strong>{id}</strong>"),
        None => "curriculum complete".to_string(),
    };
    html.push_str(&format!(
        "<p class=\"meta\">{}/{} lessons completed ({}%) | {} | {}</p>\n",
        summary.completed_count,
        summary.total_count,
        summary.overall_percent,
        next,
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Paths
    html.push_str("<section class=\"paths\">\n");
    html.push_str("<h2>Paths</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Path</th><th>Completed</th><th>Percent</th><th>Status</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for p in &summary.percent_per_path {
        let class = match p.status {
            PathStatus::Completed => "completed",
            PathStatus::InProgress => "unlocked",
            PathStatus::NotStarted => "locked",
        };
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}/{}</td><td>{}%</td><td class=\"{}\">{}</td></tr>\n",
            p.path_number, p.completed, p.total, p.percent, class, p.status
        ));
    }
    html.push_str("</tbody></table>\n");

    if !summary.percent_per_path.is_empty() {
        html.push_str(&generate_bar_chart(&summary.percent_per_path));
    }
    html.push_str("</section>\n");

    // Lessons
    html.push_str("<section class=\"lessons\">\n");
    html.push_str("<h2>Lessons</h2>\n");
    html.push_str("<table class=\"lessons-table\">\n");
    html.push_str("<thead><tr><th>Lesson</th><th>Title</th><th>State</th><th>Score</th><th>Recorded</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for row in &report.lessons {
        let (score, recorded) = match &row.score {
            Some(s) => (
                format!(
                    "{}/{} ({}%){}",
                    s.correct_count,
                    s.total_count,
                    s.percentage,
                    if s.passed { "" } else { " below pass mark" }
                ),
                s.recorded_at.format("%Y-%m-%d").to_string(),
            ),
            None => ("-".to_string(), "-".to_string()),
        };
        let class = state_class(row.state);
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            class,
            row.lesson_id,
            html_escape(&row.title),
            row.state,
            score,
            recorded
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &ProgressReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

fn generate_bar_chart(paths: &[PathProgress]) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 10;
    let label_width = 80;

    let total_height = paths.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, p) in paths.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let width = usize::from(p.percent) * max_width / 100;

        let color = match p.status {
            PathStatus::Completed => "#22c55e",
            PathStatus::InProgress => "#eab308",
            PathStatus::NotStarted => "#9ca3af",
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">Path {}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            p.path_number
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}%</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            p.percent
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --done: #dcfce7; --open: #fef9c3; --locked: #f3f4f6; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --done: #064e3b; --open: #713f12; --locked: #1f2937; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); }
.completed { background: var(--done); }
.unlocked { background: var(--open); }
.locked { background: var(--locked); color: #6b7280; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pathwise_core::lesson_id::LessonId;
    use pathwise_core::progression::{LessonScore, ProgressSummary};
    use pathwise_core::report::LessonRow;

    fn make_test_report() -> ProgressReport {
        ProgressReport {
            id: uuid::Uuid::nil(),
            generated_at: chrono::Utc::now(),
            learner_id: "ana <admin>".into(),
            summary: ProgressSummary {
                learner_id: "ana <admin>".into(),
                completed_count: 1,
                total_count: 2,
                overall_percent: 50,
                percent_per_path: vec![PathProgress {
                    path_number: 1,
                    completed: 1,
                    total: 2,
                    percent: 50,
                    status: PathStatus::InProgress,
                }],
                next_lesson_id: Some(LessonId::new(1, 2)),
            },
            lessons: vec![
                LessonRow {
                    lesson_id: LessonId::new(1, 1),
                    title: "Hello & <Welcome>".into(),
                    state: LessonState::Completed,
                    score: Some(LessonScore {
                        correct_count: 5,
                        total_count: 5,
                        percentage: 100,
                        passed: true,
                        recorded_at: chrono::Utc::now(),
                    }),
                },
                LessonRow {
                    lesson_id: LessonId::new(1, 2),
                    title: "Small Talk".into(),
                    state: LessonState::Unlocked,
                    score: None,
                },
            ],
        }
    }

    #[test]
    fn html_contains_key_elements() {
        let html = generate_html(&make_test_report());
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("Progress report: ana &lt;admin&gt;"));
        assert!(html.contains("1/2 lessons completed (50%)"));
        assert!(html.contains("next lesson <strong>1.2</strong>"));
        assert!(html.contains("<svg"));
        assert!(html.contains("5/5 (100%)"));
        assert!(html.contains("Raw JSON Data"));
    }

    #[test]
    fn html_escapes_user_text() {
        let html = generate_html(&make_test_report());
        assert!(html.contains("Hello &amp; &lt;Welcome&gt;"));
        assert!(!html.contains("<Welcome>"));
        assert!(!html.contains("<admin>"));
    }

    #[test]
    fn html_escape_function() {
        assert_eq!(html_escape("<b>\"x\" & 'y'</b>"), "&lt;b&gt;&quot;x&quot; &amp; &#x27;y&#x27;&lt;/b&gt;");
    }

    #[test]
    fn write_html_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/report.html");
        write_html_report(&make_test_report(), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<!DOCTYPE html>"));
    }
}
