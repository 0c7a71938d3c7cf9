//! Declaration model extracted from Go source files.
//!
//! The parser lowers a tree-sitter syntax tree into these plain structures so
//! that the schema and operation layers never touch tree-sitter nodes.

use crate::type_expr::TypeExpr;
use std::path::PathBuf;

/// A block of adjacent `//` or `/* */` comment lines with the markers removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentGroup {
    /// Comment text, one entry per source line, trimmed
    pub lines: Vec<String>,
    /// Zero-based row of the first line
    pub start_row: usize,
    /// Zero-based row of the last line
    pub end_row: usize,
}

impl CommentGroup {
    /// Builds a comment group from already-stripped lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        let end_row = lines.len().saturating_sub(1);
        Self {
            lines,
            start_row: 0,
            end_row,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines that look like directives (start with `@`).
    pub fn directives(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .map(|l| l.as_str())
            .filter(|l| l.starts_with('@'))
    }

    /// Appends the raw text of one comment node, stripping `//` or `/* */`.
    pub fn push_raw(&mut self, raw: &str) {
        if let Some(rest) = raw.strip_prefix("//") {
            self.lines.push(rest.trim().to_string());
            return;
        }

        let body = raw
            .strip_prefix("/*")
            .and_then(|s| s.strip_suffix("*/"))
            .unwrap_or(raw);
        for line in body.lines() {
            let line = line.trim();
            let line = line.strip_prefix('*').map(str::trim).unwrap_or(line);
            self.lines.push(line.to_string());
        }
    }
}

/// One field declaration inside a struct type.
///
/// Go allows `A, B int` so a single declaration may carry several names.
/// Embedded fields have no names at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub names: Vec<String>,
    pub ty: TypeExpr,
    /// Raw tag text with the surrounding backticks or quotes removed
    pub tag: Option<String>,
    pub doc: CommentGroup,
}

impl Field {
    pub fn is_embedded(&self) -> bool {
        self.names.is_empty()
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.ty, TypeExpr::Pointer(_))
    }
}

/// A `type Name <expr>` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub doc: CommentGroup,
    /// One-based source line of the type spec
    pub line: usize,
}

/// A function or method declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    /// Receiver type for methods, `None` for plain functions
    pub receiver: Option<String>,
    pub doc: CommentGroup,
    /// Comment groups located strictly inside the function body
    pub body_comments: Vec<CommentGroup>,
    pub line: usize,
}

/// Everything the generator needs from one `.go` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub package: String,
    pub types: Vec<TypeDecl>,
    pub funcs: Vec<FuncDecl>,
    /// Every comment group in the file, in source order
    pub comments: Vec<CommentGroup>,
}

impl SourceFile {
    /// Whether any comment in the file declares `@title` or `@version`.
    pub fn has_general_info(&self) -> bool {
        self.comments.iter().any(|group| {
            group
                .lines
                .iter()
                .any(|l| l.starts_with("@title") || l.starts_with("@version"))
        })
    }
}
