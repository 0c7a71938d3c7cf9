use anyhow::{bail, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directories that never hold API sources.
const SKIPPED_DIRS: [&str; 4] = ["vendor", "testdata", "docs", "node_modules"];

/// File scanner for traversing Go project directories.
///
/// The `FileScanner` recursively walks a directory to find `.go` files,
/// skipping test files, hidden directories, `vendor`, `testdata`, `docs`,
/// and `internal` unless internal packages are enabled. Entries are visited
/// in file-name order so the output is stable across runs.
///
/// # Example
///
/// ```no_run
/// use openapi_from_comments::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-service"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} Go files", result.go_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
    parse_internal: bool,
    exclude_patterns: Vec<String>,
}

/// Result of directory scanning operation.
pub struct ScanResult {
    /// Every discovered `.go` file, excluding `_test.go`
    pub go_files: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            parse_internal: false,
            exclude_patterns: Vec::new(),
        }
    }

    /// Also descend into `internal/` directories.
    pub fn with_parse_internal(mut self, enabled: bool) -> Self {
        self.parse_internal = enabled;
        self
    }

    /// Skips any entry whose root-relative path equals, or lies under, one
    /// of these patterns.
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns.into_iter().filter(|p| !p.trim().is_empty()).collect();
        self
    }

    /// Scans the directory tree and collects all `.go` files.
    ///
    /// Inaccessible entries are logged and recorded in the result as
    /// warnings; scanning continues past them.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is not a directory.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.is_dir() {
            bail!("Search directory is not a directory: {}", self.root_path.display());
        }

        let mut go_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.keep(e))
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    let name = entry.file_name().to_string_lossy();
                    if entry.file_type().is_file() && name.ends_with(".go") && !name.ends_with("_test.go") {
                        go_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        debug!("Scanned {}: {} Go files", self.root_path.display(), go_files.len());
        Ok(ScanResult { go_files, warnings })
    }

    fn keep(&self, entry: &DirEntry) -> bool {
        if entry.path() == self.root_path {
            return true;
        }

        if self.is_excluded(entry.path()) {
            debug!("Excluded: {}", entry.path().display());
            return false;
        }

        if !entry.file_type().is_dir() {
            return true;
        }

        let name = entry.file_name().to_string_lossy();
        let skip = name.starts_with('.')
            || name.starts_with('_')
            || SKIPPED_DIRS.contains(&&*name)
            || (name == "internal" && !self.parse_internal);
        !skip
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root_path).unwrap_or(path);
        let relative = relative.to_string_lossy().replace('\\', "/");
        self.exclude_patterns.iter().any(|pattern| {
            let pattern = pattern.trim().trim_start_matches("./").trim_end_matches('/');
            relative == pattern || relative.starts_with(&format!("{}/", pattern))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(result: &ScanResult, root: &Path) -> Vec<String> {
        result
            .go_files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_scan_normal_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("main.go"), "package main").unwrap();
        fs::write(root.join("user.go"), "package main").unwrap();
        fs::write(root.join("user_test.go"), "package main").unwrap();
        fs::write(root.join("readme.md"), "# README").unwrap();

        let scanner = FileScanner::new(root.to_path_buf());
        let result = scanner.scan().unwrap();

        assert_eq!(names(&result, root), vec!["main.go", "user.go"]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let scanner = FileScanner::new(temp_dir.path().to_path_buf());
        let result = scanner.scan().unwrap();

        assert!(result.go_files.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_missing_root_fails() {
        let scanner = FileScanner::new(PathBuf::from("/nonexistent/project"));
        assert!(scanner.scan().is_err());
    }

    #[test]
    fn test_scan_nested_directories_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("handlers")).unwrap();
        fs::create_dir_all(root.join("models/v2")).unwrap();
        fs::write(root.join("main.go"), "package main").unwrap();
        fs::write(root.join("handlers/user.go"), "package handlers").unwrap();
        fs::write(root.join("models/v2/pet.go"), "package v2").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();
        assert_eq!(
            names(&result, root),
            vec!["handlers/user.go", "main.go", "models/v2/pet.go"]
        );
    }

    #[test]
    fn test_scan_skips_vendor_hidden_and_internal() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        for dir in ["vendor/lib", ".git", "internal/auth", "testdata", "docs"] {
            fs::create_dir_all(root.join(dir)).unwrap();
            fs::write(root.join(dir).join("x.go"), "package x").unwrap();
        }
        fs::write(root.join("main.go"), "package main").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();
        assert_eq!(names(&result, root), vec!["main.go"]);

        let with_internal = FileScanner::new(root.to_path_buf())
            .with_parse_internal(true)
            .scan()
            .unwrap();
        assert_eq!(names(&with_internal, root), vec!["internal/auth/x.go", "main.go"]);
    }

    #[test]
    fn test_scan_exclude_patterns() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("legacy/api")).unwrap();
        fs::create_dir_all(root.join("api")).unwrap();
        fs::write(root.join("legacy/api/old.go"), "package api").unwrap();
        fs::write(root.join("api/new.go"), "package api").unwrap();
        fs::write(root.join("gen.go"), "package main").unwrap();

        let result = FileScanner::new(root.to_path_buf())
            .with_exclude_patterns(vec!["./legacy/".to_string(), "gen.go".to_string()])
            .scan()
            .unwrap();
        assert_eq!(names(&result, root), vec!["api/new.go"]);
    }
}
