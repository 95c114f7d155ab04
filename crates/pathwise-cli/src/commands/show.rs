//! The `pathwise show` command.

use anyhow::Result;

use pathwise_core::model::{QuestionKind, Slot, SlotKind};

use crate::context::Context;

fn print_slot(kind: SlotKind, slot: &Slot) {
    println!("## {}. {}\n", kind.position(), slot.title);
    println!("{}\n", slot.content);

    if let Some(quiz) = &slot.quiz {
        println!("### {}\n", quiz.title);
        for q in &quiz.questions {
            println!("{}. {}", q.id, q.question);
            match &q.kind {
                QuestionKind::MultipleChoice { options, .. } => {
                    for option in options {
                        println!("   - {option}");
                    }
                }
                QuestionKind::FillInTheBlank { .. } => println!("   (fill in the blank)"),
            }
        }
        println!();
    }
}

pub fn execute(ctx: &Context, lesson_id: String, slot: Option<String>) -> Result<()> {
    let repo = ctx.repository()?;
    let lesson = repo.get_lesson(&lesson_id)?;

    println!("# {} {}\n", lesson.id, lesson.display_title());

    match slot {
        Some(name) => {
            let kind: SlotKind = name.parse().map_err(anyhow::Error::msg)?;
            print_slot(kind, lesson.slot(kind));
        }
        None => {
            for (kind, slot) in lesson.slots() {
                print_slot(kind, slot);
            }
        }
    }

    Ok(())
}
