//! The `pathwise validate` command.

use anyhow::Result;

use crate::context::Context;

pub fn execute(ctx: &Context) -> Result<()> {
    let repo = ctx.repository()?;

    println!(
        "Content: {} ({} lessons in {} paths)",
        ctx.content_path().display(),
        repo.len(),
        repo.list_paths().len()
    );

    let warnings = repo.lint();
    for w in &warnings {
        let prefix = w
            .lesson_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("All content valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
