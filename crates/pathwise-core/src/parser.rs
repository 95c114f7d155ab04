//! Raw content loading.
//!
//! Reads lesson tables from JSON, TOML, and markdown files (or whole
//! directories of them) into an unvalidated [`RawContent`]. Validation is the
//! repository's job; this module only cares about file formats.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::markdown;

/// One unvalidated `(lesson ID, lesson body)` pair, as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub id: String,
    pub value: serde_json::Value,
}

/// An ordered, unvalidated content table.
///
/// Entries keep their source order and duplicates are preserved so that the
/// repository can report them instead of silently keeping the last one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawContent {
    entries: Vec<RawEntry>,
}

impl RawContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: impl Into<String>, value: serde_json::Value) {
        self.entries.push(RawEntry {
            id: id.into(),
            value,
        });
    }

    pub fn extend(&mut self, other: RawContent) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[RawEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a JSON object keyed by lesson ID.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("failed to parse content JSON")
    }

    /// Parse a TOML document whose top-level tables are keyed by lesson ID.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse content TOML")
    }
}

impl<'de> Deserialize<'de> for RawContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RawContent;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table mapping lesson IDs to lessons")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<RawContent, A::Error> {
                let mut content = RawContent::new();
                while let Some((id, value)) = map.next_entry::<String, serde_json::Value>()? {
                    content.push(id, value);
                }
                Ok(content)
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Supported content file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Json,
    Toml,
    Markdown,
}

impl ContentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(ContentFormat::Json),
            "toml" => Some(ContentFormat::Toml),
            "md" | "markdown" => Some(ContentFormat::Markdown),
            _ => None,
        }
    }
}

/// Parse a single content file.
pub fn parse_content_file(path: &Path) -> Result<RawContent> {
    let format = ContentFormat::from_path(path)
        .with_context(|| format!("unsupported content file type: {}", path.display()))?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read content file: {}", path.display()))?;

    parse_content_str(&content, format, path)
}

/// Parse content text in the given format (useful for testing).
///
/// `source_path` names the file in error messages; for markdown it also
/// supplies the lesson ID.
pub fn parse_content_str(
    content: &str,
    format: ContentFormat,
    source_path: &Path,
) -> Result<RawContent> {
    match format {
        ContentFormat::Json => RawContent::from_json_str(content)
            .with_context(|| format!("in {}", source_path.display())),
        ContentFormat::Toml => RawContent::from_toml_str(content)
            .with_context(|| format!("in {}", source_path.display())),
        ContentFormat::Markdown => {
            let file_name = source_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            let id = markdown::lesson_id_from_file_name(file_name).with_context(|| {
                format!(
                    "cannot derive a lesson ID from file name: {}",
                    source_path.display()
                )
            })?;
            let mut raw = RawContent::new();
            raw.push(id, markdown::parse_lesson_markdown(content));
            Ok(raw)
        }
    }
}

/// Recursively load every content file in a directory, in path order.
pub fn load_content_directory(dir: &Path) -> Result<RawContent> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    paths.sort();

    let mut raw = RawContent::new();
    for path in paths {
        if path.is_dir() {
            raw.extend(load_content_directory(&path)?);
        } else if ContentFormat::from_path(&path).is_some() {
            raw.extend(parse_content_file(&path)?);
        } else {
            tracing::debug!("ignoring non-content file {}", path.display());
        }
    }

    Ok(raw)
}

/// Load a content file or directory.
pub fn load_content(path: &Path) -> Result<RawContent> {
    if path.is_dir() {
        load_content_directory(path)
    } else {
        parse_content_file(path)
    }
}
