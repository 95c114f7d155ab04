//! The `pathwise lessons` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use crate::context::Context;

pub fn execute(ctx: &Context, path: Option<u32>) -> Result<()> {
    let repo = ctx.repository()?;

    let ids = match path {
        Some(n) => match repo.path(n) {
            Some(group) => group.lesson_ids.clone(),
            None => anyhow::bail!("path {n} not found"),
        },
        None => repo.list_lesson_ids(),
    };

    let mut table = Table::new();
    table.set_header(vec!["Lesson", "Title", "Questions"]);
    for lesson in ids.into_iter().filter_map(|id| repo.lesson(id)) {
        let questions = lesson
            .quiz()
            .map_or_else(|| "-".to_string(), |q| q.len().to_string());
        table.add_row(vec![
            Cell::new(lesson.id),
            Cell::new(lesson.display_title()),
            Cell::new(questions),
        ]);
    }
    println!("{table}");

    Ok(())
}
