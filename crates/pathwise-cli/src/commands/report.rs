//! The `pathwise report` command.

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use pathwise_core::report::ProgressReport;
use pathwise_report::html::{generate_html, write_html_report};

use crate::context::Context;

pub fn execute(
    ctx: &Context,
    learner_id: String,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let session = ctx.session(&learner_id)?;
    let report = ProgressReport::build(&session.tracker, &learner_id);

    match (format.as_str(), output) {
        ("html", Some(path)) => {
            write_html_report(&report, &path)?;
            println!("HTML report written to {}", path.display());
        }
        ("html", None) => println!("{}", generate_html(&report)),
        ("json", Some(path)) => {
            report.save_json(&path)?;
            println!("JSON report written to {}", path.display());
        }
        ("json", None) => println!("{}", serde_json::to_string_pretty(&report)?),
        (_, Some(path)) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, report.to_markdown())
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            println!("Markdown report written to {}", path.display());
        }
        (_, None) => print!("{}", report.to_markdown()),
    }

    Ok(())
}
