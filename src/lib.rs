//! openapi-from-comments - OpenAPI 3.1 documents from annotated Go source code.
//!
//! Go handlers and models carry `@Directive` comments (`@Summary`, `@Param`,
//! `@Success`, `@Router`, ...). This library reads those comments together
//! with struct declarations and their tags, and assembles a validated OpenAPI
//! 3.1 document.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Recursively scans a directory for `.go` files
//! 2. [`parser`] - Parses Go files with tree-sitter into [`syntax`] declarations
//! 3. [`type_resolver`] - Maps Go type expressions ([`type_expr`]) to schemas
//! 4. [`schema_generator`] - Turns struct declarations and [`struct_tags`] into object schemas
//! 5. [`directives`] - Interprets operation and general-info comment directives
//! 6. [`openapi_builder`] - Walks parsed files and assembles the [`openapi::Document`]
//! 7. [`validator`] - Checks required info and schema references
//! 8. [`serializer`] - Serializes the document to YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_comments::{
//!     config::ParserConfig,
//!     openapi_builder::OpenApiBuilder,
//!     parser::AstParser,
//!     scanner::FileScanner,
//!     serializer::serialize_yaml,
//!     validator,
//! };
//! use std::path::PathBuf;
//!
//! let scan_result = FileScanner::new(PathBuf::from("./my-service")).scan().unwrap();
//! let parsed: Vec<_> = AstParser::parse_files(&scan_result.go_files)
//!     .into_iter()
//!     .filter_map(Result::ok)
//!     .collect();
//!
//! let mut builder = OpenApiBuilder::new(ParserConfig::default()).unwrap();
//! builder.add_files(&parsed);
//! let document = builder.build();
//!
//! validator::validate(&document).unwrap();
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod cli;
pub mod config;
pub mod directives;
pub mod error;
pub mod naming;
pub mod openapi;
pub mod openapi_builder;
pub mod parser;
pub mod resources;
pub mod scanner;
pub mod schema_generator;
pub mod serializer;
pub mod struct_tags;
pub mod syntax;
pub mod type_expr;
pub mod type_resolver;
pub mod validator;
