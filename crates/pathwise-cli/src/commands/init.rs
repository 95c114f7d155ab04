//! The `pathwise init` command.

use std::path::Path;

use anyhow::Result;

use pathwise_store::config::STARTER_CONFIG;

const SAMPLE_CURRICULUM: &str = include_str!("../../../../content/sample-curriculum.json");

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    println!("Created {}", path.display());
    Ok(())
}

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("pathwise.toml"), STARTER_CONFIG)?;
    write_if_missing(Path::new("content/sample-curriculum.json"), SAMPLE_CURRICULUM)?;

    println!("\nNext steps:");
    println!("  1. Run: pathwise validate");
    println!("  2. Run: pathwise lessons");
    println!("  3. Run: pathwise complete --learner <name> 1.1 answers.json");

    Ok(())
}
