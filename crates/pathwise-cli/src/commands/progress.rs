//! The `pathwise progress` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use crate::context::Context;

pub fn execute(ctx: &Context, learner_id: String, format: String) -> Result<()> {
    let session = ctx.session(&learner_id)?;
    let summary = session.tracker.get_progress(&learner_id);

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ => {
            println!(
                "Learner {}: {}/{} lessons completed ({}%)",
                summary.learner_id,
                summary.completed_count,
                summary.total_count,
                summary.overall_percent
            );

            let mut table = Table::new();
            table.set_header(vec!["Path", "Completed", "Percent", "Status"]);
            for p in &summary.percent_per_path {
                table.add_row(vec![
                    Cell::new(p.path_number),
                    Cell::new(format!("{}/{}", p.completed, p.total)),
                    Cell::new(format!("{}%", p.percent)),
                    Cell::new(p.status),
                ]);
            }
            println!("{table}");

            match summary.next_lesson_id {
                Some(id) => println!("Next lesson: {id}"),
                None => println!("Curriculum complete!"),
            }
        }
    }

    Ok(())
}
