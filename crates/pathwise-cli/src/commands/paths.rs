//! The `pathwise paths` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use crate::context::Context;

pub fn execute(ctx: &Context) -> Result<()> {
    let repo = ctx.repository()?;

    let mut table = Table::new();
    table.set_header(vec!["Path", "Lessons", "First", "Last"]);
    for group in repo.list_paths() {
        let id_or_dash = |id: Option<pathwise_core::LessonId>| {
            id.map_or_else(|| "-".to_string(), |id| id.to_string())
        };
        table.add_row(vec![
            Cell::new(group.path_number),
            Cell::new(group.lesson_ids.len()),
            Cell::new(id_or_dash(group.first())),
            Cell::new(id_or_dash(group.last())),
        ]);
    }
    println!("{table}");

    Ok(())
}
