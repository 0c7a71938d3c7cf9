//! Generator configuration.

use crate::naming::PropertyStrategy;
use crate::type_resolver::{TypeOverrides, DEFAULT_MAX_DEPTH};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Collection formats accepted for array parameters.
pub const COLLECTION_FORMATS: [&str; 5] = ["csv", "multi", "pipes", "tsv", "ssv"];

/// Options controlling one generation run.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Naming strategy for properties without a `json` tag name
    pub property_strategy: PropertyStrategy,
    /// Whether fields are required unless `omitempty` or a pointer
    pub required_by_default: bool,
    /// Also read directives from comments inside function bodies
    pub parse_func_body: bool,
    /// Also scan `internal/` directories
    pub parse_internal: bool,
    pub markdown_files_dir: Option<PathBuf>,
    pub code_example_files_dir: Option<PathBuf>,
    pub overrides_file: Option<PathBuf>,
    /// Operations must carry at least one of these tags (when non-empty)
    pub include_tags: Vec<String>,
    /// Operations carrying any of these tags are dropped
    pub exclude_tags: Vec<String>,
    /// Operations must carry an extension key with this prefix (when set)
    pub parse_extension: Option<String>,
    /// Type nesting ceiling; 0 disables the guard
    pub max_depth: usize,
    /// Default collection format for array parameters
    pub collection_format: String,
    /// File holding the general-info block; auto-detected when unset
    pub general_info_file: Option<PathBuf>,
    /// Path fragments excluded from scanning
    pub exclude_patterns: Vec<String>,
}

impl ParserConfig {
    pub fn new() -> Self {
        Self {
            property_strategy: PropertyStrategy::default(),
            required_by_default: false,
            parse_func_body: false,
            parse_internal: false,
            markdown_files_dir: None,
            code_example_files_dir: None,
            overrides_file: None,
            include_tags: Vec::new(),
            exclude_tags: Vec::new(),
            parse_extension: None,
            max_depth: DEFAULT_MAX_DEPTH,
            collection_format: "csv".to_string(),
            general_info_file: None,
            exclude_patterns: Vec::new(),
        }
    }

    pub fn with_property_strategy(mut self, strategy: PropertyStrategy) -> Self {
        self.property_strategy = strategy;
        self
    }

    pub fn with_required_by_default(mut self, required: bool) -> Self {
        self.required_by_default = required;
        self
    }

    pub fn with_parse_func_body(mut self, enabled: bool) -> Self {
        self.parse_func_body = enabled;
        self
    }

    pub fn with_parse_internal(mut self, enabled: bool) -> Self {
        self.parse_internal = enabled;
        self
    }

    pub fn with_markdown_files_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.markdown_files_dir = Some(dir.into());
        self
    }

    pub fn with_code_example_files_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.code_example_files_dir = Some(dir.into());
        self
    }

    pub fn with_overrides_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.overrides_file = Some(path.into());
        self
    }

    /// Sets tag filters from a comma list where `!tag` excludes and `tag` includes.
    pub fn with_tags(mut self, filter: &str) -> Self {
        self.set_tag_filters(filter);
        self
    }

    pub fn with_parse_extension(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.parse_extension = Some(prefix).filter(|p| !p.is_empty());
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Invalid formats fall back to `csv`.
    pub fn with_collection_format(mut self, format: &str) -> Self {
        self.collection_format = to_valid_collection_format(format);
        self
    }

    pub fn with_general_info_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.general_info_file = Some(path.into());
        self
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    pub fn set_tag_filters(&mut self, filter: &str) {
        self.include_tags.clear();
        self.exclude_tags.clear();
        for tag in filter.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match tag.strip_prefix('!') {
                Some(excluded) => self.exclude_tags.push(excluded.trim().to_string()),
                None => self.include_tags.push(tag.to_string()),
            }
        }
    }

    /// Tag filter: no excluded tag, and at least one included tag when an
    /// include list is configured.
    pub fn should_include_operation(&self, tags: &[String]) -> bool {
        if tags.iter().any(|t| self.exclude_tags.contains(t)) {
            return false;
        }
        self.include_tags.is_empty() || tags.iter().any(|t| self.include_tags.contains(t))
    }

    /// Extension filter: at least one extension key starts with the prefix.
    pub fn should_include_extensions<'k>(&self, mut keys: impl Iterator<Item = &'k String>) -> bool {
        match &self.parse_extension {
            Some(prefix) => keys.any(|k| k.starts_with(prefix.as_str())),
            None => true,
        }
    }

    /// Loads the configured override table, or an empty one.
    pub fn overrides(&self) -> TypeOverrides {
        self.overrides_file
            .as_deref()
            .map(load_overrides)
            .unwrap_or_default()
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct OverridesFile {
    #[serde(default)]
    replace: IndexMap<String, String>,
}

/// Reads `{"replace": {"<Type>": "<override>"}}`.
///
/// A missing or malformed file yields an empty table.
pub fn load_overrides(path: &Path) -> TypeOverrides {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!("No overrides loaded from {}: {}", path.display(), e);
            return TypeOverrides::default();
        }
    };

    match serde_json::from_str::<OverridesFile>(&content) {
        Ok(file) => {
            debug!("Loaded {} type override(s) from {}", file.replace.len(), path.display());
            TypeOverrides::new(file.replace)
        }
        Err(e) => {
            warn!("Ignoring malformed overrides file {}: {}", path.display(), e);
            TypeOverrides::default()
        }
    }
}

/// Lowercased `format` if it is a known collection format, otherwise `csv`.
pub fn to_valid_collection_format(format: &str) -> String {
    let format = format.trim().to_lowercase();
    if COLLECTION_FORMATS.contains(&format.as_str()) {
        format
    } else {
        "csv".to_string()
    }
}
