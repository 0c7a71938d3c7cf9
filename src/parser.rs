use crate::syntax::{CommentGroup, Field, FuncDecl, SourceFile, TypeDecl};
use crate::type_expr::TypeExpr;
use anyhow::{anyhow, Context, Result};
use log::{debug, trace, warn};
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser};

/// Parser for Go source files.
///
/// The `AstParser` uses tree-sitter's Go grammar to build a concrete syntax
/// tree and lowers the parts the generator cares about (package name, type
/// declarations, function declarations and their comments) into a
/// [`SourceFile`].
///
/// # Example
///
/// ```no_run
/// use openapi_from_comments::parser::AstParser;
/// use std::path::Path;
///
/// let parsed = AstParser::parse_file(Path::new("handlers/user.go")).unwrap();
/// println!("Parsed {} functions", parsed.funcs.len());
/// ```
pub struct AstParser;

/// A comment group plus whether it trails code on its first line.
///
/// Trailing comments (`Name string // note`) never become doc comments.
struct RawGroup {
    group: CommentGroup,
    trailing: bool,
}

struct Lowering<'s> {
    source: &'s [u8],
    groups: Vec<RawGroup>,
}

impl AstParser {
    /// Parses a single Go source file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - tree-sitter fails to produce a syntax tree
    pub fn parse_file(path: &Path) -> Result<SourceFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let parsed = Self::parse_source(path, &content)
            .with_context(|| format!("Failed to parse Go syntax in file: {}", path.display()))?;

        debug!(
            "Successfully parsed file: {} ({} types, {} functions)",
            path.display(),
            parsed.types.len(),
            parsed.funcs.len()
        );
        Ok(parsed)
    }

    /// Parses Go source text that is already in memory.
    pub fn parse_source(path: &Path, content: &str) -> Result<SourceFile> {
        let mut parser = Parser::new();
        parser
            .set_language(tree_sitter_go::language())
            .map_err(|e| anyhow!("Failed to load Go grammar: {}", e))?;

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| anyhow!("tree-sitter produced no syntax tree"))?;
        let root = tree.root_node();

        let mut lowering = Lowering {
            source: content.as_bytes(),
            groups: Vec::new(),
        };
        lowering.collect_comments(root);

        let mut file = SourceFile {
            path: path.to_path_buf(),
            ..Default::default()
        };

        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            match node.kind() {
                "package_clause" => {
                    if let Some(name) = node.named_child(0) {
                        file.package = lowering.text(name).to_string();
                    }
                }
                "type_declaration" => file.types.extend(lowering.type_declaration(node)),
                "function_declaration" | "method_declaration" => {
                    if let Some(func) = lowering.function(node) {
                        file.funcs.push(func);
                    }
                }
                _ => {}
            }
        }

        file.comments = lowering.groups.into_iter().map(|g| g.group).collect();
        Ok(file)
    }

    /// Parses multiple Go source files, continuing even if some fail.
    ///
    /// Files that fail to parse are logged as warnings and returned as `Err`
    /// so callers can still build a partial document from the rest.
    pub fn parse_files(paths: &[PathBuf]) -> Vec<Result<SourceFile>> {
        debug!("Parsing {} files", paths.len());

        let results: Vec<Result<SourceFile>> = paths
            .iter()
            .map(|path| match Self::parse_file(path) {
                Ok(parsed) => Ok(parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    Err(e)
                }
            })
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }
}

impl<'s> Lowering<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.source).unwrap_or_default()
    }

    /// Groups every comment node in the tree by row adjacency.
    fn collect_comments(&mut self, node: Node<'_>) {
        if node.kind() == "comment" {
            let row = node.start_position().row;
            // Statement terminators are anonymous and end at column 0 of the
            // next row, so only named code on the same row makes a comment trailing.
            let trailing = node.prev_named_sibling().is_some_and(|prev| {
                let end = prev.end_position();
                prev.kind() != "comment" && end.row == row && end.column > 0
            });

            let extends_last = !trailing
                && self
                    .groups
                    .last()
                    .is_some_and(|last| !last.trailing && last.group.end_row + 1 == row);

            if !extends_last {
                self.groups.push(RawGroup {
                    group: CommentGroup {
                        lines: Vec::new(),
                        start_row: row,
                        end_row: row,
                    },
                    trailing,
                });
            }
            let text = self.text(node);
            if let Some(last) = self.groups.last_mut() {
                last.group.push_raw(text);
                last.group.end_row = node.end_position().row;
            }
            return;
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_comments(child);
        }
    }

    /// The comment group ending on the row right above `row`.
    fn doc_above(&self, row: usize) -> Option<&CommentGroup> {
        let above = row.checked_sub(1)?;
        self.groups
            .iter()
            .find(|g| !g.trailing && g.group.end_row == above)
            .map(|g| &g.group)
    }

    fn type_declaration(&self, decl: Node<'_>) -> Vec<TypeDecl> {
        let decl_doc = self.doc_above(decl.start_position().row);

        let mut types = Vec::new();
        let mut cursor = decl.walk();
        for spec in decl.named_children(&mut cursor) {
            if spec.kind() != "type_spec" {
                continue;
            }
            let (Some(name), Some(ty)) = (spec.child_by_field_name("name"), spec.child_by_field_name("type")) else {
                continue;
            };

            // Grouped `type ( ... )` specs carry their own doc; a lone spec
            // uses the declaration's.
            let doc = self
                .doc_above(spec.start_position().row)
                .or(decl_doc)
                .cloned()
                .unwrap_or_default();

            trace!("Type declaration {} at line {}", self.text(name), spec.start_position().row + 1);
            types.push(TypeDecl {
                name: self.text(name).to_string(),
                ty: self.lower_type(ty),
                doc,
                line: spec.start_position().row + 1,
            });
        }
        types
    }

    fn function(&self, node: Node<'_>) -> Option<FuncDecl> {
        let name = self.text(node.child_by_field_name("name")?).to_string();

        let receiver = node.child_by_field_name("receiver").and_then(|params| {
            let param = params.named_child(0)?;
            let ty = param.child_by_field_name("type")?;
            Some(self.text(ty).trim_start_matches('*').to_string())
        });

        let body_comments = match node.child_by_field_name("body") {
            Some(body) => {
                let (start, end) = (body.start_position().row, body.end_position().row);
                self.groups
                    .iter()
                    .filter(|g| g.group.start_row >= start && g.group.end_row <= end)
                    .map(|g| g.group.clone())
                    .collect()
            }
            None => Vec::new(),
        };

        Some(FuncDecl {
            name,
            receiver,
            doc: self.doc_above(node.start_position().row).cloned().unwrap_or_default(),
            body_comments,
            line: node.start_position().row + 1,
        })
    }

    fn lower_type(&self, node: Node<'_>) -> TypeExpr {
        match node.kind() {
            "type_identifier" | "identifier" => TypeExpr::Ident(self.text(node).to_string()),
            "qualified_type" => match (node.child_by_field_name("package"), node.child_by_field_name("name")) {
                (Some(package), Some(name)) => TypeExpr::Qualified {
                    package: self.text(package).to_string(),
                    name: self.text(name).to_string(),
                },
                _ => TypeExpr::Unsupported(self.text(node).to_string()),
            },
            "pointer_type" => match node.named_child(0) {
                Some(inner) => TypeExpr::Pointer(Box::new(self.lower_type(inner))),
                None => TypeExpr::Unsupported(self.text(node).to_string()),
            },
            "slice_type" | "array_type" => match node.child_by_field_name("element") {
                Some(element) => TypeExpr::Slice(Box::new(self.lower_type(element))),
                None => TypeExpr::Unsupported(self.text(node).to_string()),
            },
            "map_type" => match (node.child_by_field_name("key"), node.child_by_field_name("value")) {
                (Some(key), Some(value)) => TypeExpr::Map {
                    key: Box::new(self.lower_type(key)),
                    value: Box::new(self.lower_type(value)),
                },
                _ => TypeExpr::Unsupported(self.text(node).to_string()),
            },
            "struct_type" => TypeExpr::Struct(self.struct_fields(node)),
            "interface_type" => TypeExpr::Interface,
            "parenthesized_type" => match node.named_child(0) {
                Some(inner) => self.lower_type(inner),
                None => TypeExpr::Unsupported(self.text(node).to_string()),
            },
            _ => TypeExpr::Unsupported(self.text(node).to_string()),
        }
    }

    fn struct_fields(&self, struct_node: Node<'_>) -> Vec<Field> {
        let mut fields = Vec::new();
        let mut cursor = struct_node.walk();
        for list in struct_node.named_children(&mut cursor) {
            if list.kind() != "field_declaration_list" {
                continue;
            }
            let mut list_cursor = list.walk();
            for decl in list.named_children(&mut list_cursor) {
                if decl.kind() == "field_declaration" {
                    if let Some(field) = self.field(decl) {
                        fields.push(field);
                    }
                }
            }
        }
        fields
    }

    fn field(&self, decl: Node<'_>) -> Option<Field> {
        let ty_node = decl.child_by_field_name("type")?;

        let mut cursor = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut cursor)
            .map(|n| self.text(n).to_string())
            .collect();

        let mut ty = self.lower_type(ty_node);
        if names.is_empty() {
            // Embedded `*Base` keeps the star outside the type field
            let mut star_cursor = decl.walk();
            let has_star = decl.children(&mut star_cursor).any(|c| c.kind() == "*");
            if has_star {
                ty = TypeExpr::Pointer(Box::new(ty));
            }
        }

        let tag = decl.child_by_field_name("tag").map(|t| unquote_tag(self.text(t)));

        Some(Field {
            names,
            ty,
            tag,
            doc: self.doc_above(decl.start_position().row).cloned().unwrap_or_default(),
        })
    }
}

/// Strips backticks, or quotes plus `\"` escapes, from a struct tag literal.
fn unquote_tag(literal: &str) -> String {
    if let Some(raw) = literal.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        return raw.to_string();
    }
    literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map(|s| s.replace("\\\"", "\""))
        .unwrap_or_else(|| literal.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::TempDir;

    /// Helper function to create a temporary file with content
    fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path
    }

    fn parse(content: &str) -> SourceFile {
        AstParser::parse_source(Path::new("test.go"), content).unwrap()
    }

    #[test]
    fn test_parse_package_and_struct() {
        let file = parse(
            r#"package models

// User account
// @Description A registered user
type User struct {
	// Unique identifier
	ID    int64  `json:"id" binding:"required"`
	First, Last string
	Email *string `json:"email,omitempty"` // trailing note
	Tags  []string
	Meta  map[string]interface{}
	Base
	*Audit
	Address struct {
		City string
	}
}
"#,
        );

        assert_eq!(file.package, "models");
        assert_eq!(file.types.len(), 1);
        let user = &file.types[0];
        assert_eq!(user.name, "User");
        assert_eq!(user.line, 5);
        assert_eq!(user.doc.lines, vec!["User account", "@Description A registered user"]);

        let TypeExpr::Struct(fields) = &user.ty else {
            panic!("expected struct, got {:?}", user.ty);
        };
        assert_eq!(fields.len(), 8);

        assert_eq!(fields[0].names, vec!["ID"]);
        assert_eq!(fields[0].ty, TypeExpr::Ident("int64".into()));
        assert_eq!(fields[0].tag.as_deref(), Some(r#"json:"id" binding:"required""#));
        assert_eq!(fields[0].doc.lines, vec!["Unique identifier"]);

        assert_eq!(fields[1].names, vec!["First", "Last"]);
        assert!(fields[2].is_pointer());
        assert!(fields[2].doc.is_empty());
        assert_eq!(fields[3].ty, TypeExpr::Slice(Box::new(TypeExpr::Ident("string".into()))));
        assert!(matches!(fields[4].ty, TypeExpr::Map { .. }));

        assert!(fields[5].is_embedded());
        assert_eq!(fields[5].ty, TypeExpr::Ident("Base".into()));
        assert!(fields[6].is_embedded());
        assert_eq!(fields[6].ty, TypeExpr::Pointer(Box::new(TypeExpr::Ident("Audit".into()))));

        assert!(matches!(fields[7].ty, TypeExpr::Struct(ref inner) if inner.len() == 1));
    }

    #[test]
    fn test_parse_qualified_types() {
        let file = parse(
            "package api\n\ntype Event struct {\n\tAt time.Time\n\tOwner *models.User\n}\n",
        );
        let TypeExpr::Struct(fields) = &file.types[0].ty else {
            panic!("expected struct");
        };
        assert_eq!(
            fields[0].ty,
            TypeExpr::Qualified {
                package: "time".into(),
                name: "Time".into()
            }
        );
        assert_eq!(fields[1].ty.deref().type_name().as_deref(), Some("models.User"));
    }

    #[test]
    fn test_parse_grouped_type_declaration() {
        let file = parse(
            r#"package models

type (
	// Pet is an animal
	Pet struct {
		Name string
	}

	// Status of a pet
	Status string
)
"#,
        );
        assert_eq!(file.types.len(), 2);
        assert_eq!(file.types[0].doc.lines, vec!["Pet is an animal"]);
        assert_eq!(file.types[1].name, "Status");
        assert_eq!(file.types[1].ty, TypeExpr::Ident("string".into()));
    }

    #[test]
    fn test_parse_functions_with_doc_and_body_comments() {
        let file = parse(
            r#"package handlers

// GetUser godoc
// @Summary Get user
// @Router /users/{id} [get]
func GetUser(c *gin.Context) {
	// @Summary Inner
	// @Router /inner [post]
	doSomething()
}

func (h *Handler) List() {}

// Detached comment

func Orphan() {}
"#,
        );

        assert_eq!(file.funcs.len(), 3);
        let get_user = &file.funcs[0];
        assert_eq!(get_user.name, "GetUser");
        assert_eq!(get_user.receiver, None);
        assert_eq!(
            get_user.doc.lines,
            vec!["GetUser godoc", "@Summary Get user", "@Router /users/{id} [get]"]
        );
        assert_eq!(get_user.body_comments.len(), 1);
        assert_eq!(get_user.body_comments[0].lines, vec!["@Summary Inner", "@Router /inner [post]"]);

        assert_eq!(file.funcs[1].receiver.as_deref(), Some("Handler"));
        assert!(file.funcs[1].doc.is_empty());
        assert!(file.funcs[2].doc.is_empty());
    }

    #[test]
    fn test_doc_starting_with_directive_keeps_first_line() {
        let file = parse(
            r#"package main

// @title Demo
// @version 1.0
func main() {}

// @Summary Get user
// @Router /users [get]
func GetUser() {}
type Empty struct{} // not a doc
// @Description Directly after a declaration
type Note struct{}
"#,
        );

        assert_eq!(file.funcs[0].doc.lines, vec!["@title Demo", "@version 1.0"]);
        assert_eq!(file.funcs[1].doc.lines, vec!["@Summary Get user", "@Router /users [get]"]);
        assert_eq!(file.types[0].name, "Empty");
        assert!(file.types[0].doc.is_empty());
        assert_eq!(file.types[1].doc.lines, vec!["@Description Directly after a declaration"]);
    }

    #[test]
    fn test_general_info_detection() {
        let file = parse("// @title Pets\n// @version 1.0\npackage main\n\nfunc main() {}\n");
        assert_eq!(file.package, "main");
        assert!(file.has_general_info());
    }

    #[test]
    fn test_unquote_tag() {
        assert_eq!(unquote_tag("`json:\"id\"`"), r#"json:"id""#);
        assert_eq!(unquote_tag(r#""json:\"id\"""#), r#"json:"id""#);
    }

    #[test]
    fn test_parse_file_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_temp_file(&temp_dir, "user.go", "package models\n\ntype User struct{}\n");

        let parsed = AstParser::parse_file(&path).unwrap();
        assert_eq!(parsed.path, path);
        assert_eq!(parsed.types[0].name, "User");
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = AstParser::parse_file(Path::new("/nonexistent/file.go"));

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Failed to read file"));
    }

    #[test]
    fn test_parse_files_batch() {
        let temp_dir = TempDir::new().unwrap();
        let ok = create_temp_file(&temp_dir, "a.go", "package a\n");
        let missing = temp_dir.path().join("missing.go");

        let results = AstParser::parse_files(&[ok, missing]);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
