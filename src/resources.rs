//! External content referenced from annotations.
//!
//! `@Description file(name)` pulls in a markdown file and `@x-codeSamples`
//! pulls in a code example. Both directories are read once, up front, into a
//! [`ContentStore`] that is then shared read-only.

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Markdown documents and code examples loaded from disk.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    markdown: HashMap<String, String>,
    code_examples: HashMap<String, String>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads both directories. A directory that is `None` or missing yields
    /// no entries; an unreadable file is an error.
    pub fn load(markdown_dir: Option<&Path>, code_example_dir: Option<&Path>) -> Result<Self> {
        let mut store = Self::new();

        if let Some(dir) = markdown_dir {
            for (relative, content) in read_tree(dir, |p| p.extension().is_some_and(|e| e == "md"))? {
                // `file(users)` refers to `users.md`
                let key = relative.strip_suffix(".md").unwrap_or(&relative).to_string();
                store.markdown.insert(key, content);
            }
        }

        if let Some(dir) = code_example_dir {
            for (relative, content) in read_tree(dir, |_| true)? {
                store.code_examples.insert(relative, content);
            }
        }

        info!(
            "Loaded {} markdown file(s) and {} code example(s)",
            store.markdown.len(),
            store.code_examples.len()
        );
        Ok(store)
    }

    pub fn insert_markdown(&mut self, key: impl Into<String>, content: impl Into<String>) {
        self.markdown.insert(key.into(), content.into());
    }

    pub fn insert_code_example(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.code_examples.insert(path.into(), content.into());
    }

    /// Markdown content by name, with or without the `.md` extension.
    pub fn markdown(&self, key: &str) -> Option<&str> {
        let key = key.trim();
        self.markdown
            .get(key)
            .or_else(|| key.strip_suffix(".md").and_then(|k| self.markdown.get(k)))
            .map(String::as_str)
    }

    /// Code example by path relative to the examples directory.
    pub fn code_example(&self, path: &str) -> Option<&str> {
        self.code_examples.get(path.trim()).map(String::as_str)
    }
}

/// Reads every matching file under `dir`, keyed by its `/`-separated relative path.
fn read_tree(dir: &Path, filter: impl Fn(&Path) -> bool) -> Result<Vec<(String, String)>> {
    if !dir.is_dir() {
        debug!("Content directory {} does not exist, skipping", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || !filter(path) {
            continue;
        }

        let relative = path.strip_prefix(dir).unwrap_or(path);
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read content file: {}", path.display()))?;

        debug!("Loaded content file {}", key);
        files.push((key, content));
    }

    Ok(files)
}

/// `x-codeSamples` language for a file name, by extension.
pub fn language_for_extension(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "go" => "go",
        "py" => "python",
        "js" | "mjs" => "javascript",
        "ts" => "typescript",
        "java" => "java",
        "kt" => "kotlin",
        "rb" => "ruby",
        "php" => "php",
        "cs" => "csharp",
        "rs" => "rust",
        "swift" => "swift",
        "c" => "c",
        "cpp" | "cc" => "cpp",
        "sh" | "bash" => "shell",
        "curl" => "curl",
        _ => "text",
    }
}
