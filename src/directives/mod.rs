//! Annotation directive registries.
//!
//! A directive is one comment line of the form `@Keyword arguments`. Two
//! registries interpret them:
//!
//! - [`operation::OperationProcessor`] handles function doc comments
//!   (`@Summary`, `@Param`, `@Success`, `@Router`, ...) and builds an
//!   [`Operation`](crate::openapi::Operation).
//! - [`general_info::GeneralInfoProcessor`] handles the document-level block
//!   (`@title`, `@version`, `@host`, `@securityDefinitions.*`, ...).
//!
//! Both are ordered `(pattern, handler)` tables where the first matching
//! pattern wins. Lines that match nothing are ignored.
//!
//! # Example
//!
//! ```
//! use openapi_from_comments::directives::operation::OperationProcessor;
//! use openapi_from_comments::resources::ContentStore;
//! use openapi_from_comments::syntax::CommentGroup;
//! use openapi_from_comments::type_resolver::{TypeOverrides, TypeResolver};
//!
//! let resolver = TypeResolver::new(TypeOverrides::default(), 100);
//! let content = ContentStore::new();
//! let processor = OperationProcessor::new(&resolver, &content, "csv");
//!
//! let doc = CommentGroup::from_lines(["@Summary List pets", "@Router /pets [get]"]);
//! let op = processor.process(&doc).unwrap();
//! assert_eq!(op.summary.as_deref(), Some("List pets"));
//! assert_eq!(processor.route_info(&doc).unwrap().path, "/pets");
//! ```

pub mod general_info;
pub mod operation;

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

static ATTRIBUTE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\(([^)]+)\)").expect("attribute pattern is valid"));

/// Path and method declared by `@Router`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// The URL path template (e.g., "/users/{id}")
    pub path: String,
    /// The HTTP method for this route
    pub method: HttpMethod,
}

/// HTTP methods an operation can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            "put" => Ok(HttpMethod::Put),
            "delete" => Ok(HttpMethod::Delete),
            "patch" => Ok(HttpMethod::Patch),
            "options" => Ok(HttpMethod::Options),
            "head" => Ok(HttpMethod::Head),
            "trace" => Ok(HttpMethod::Trace),
            other => Err(format!("unsupported HTTP method: {}", other)),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Expands a comma-separated list of MIME aliases.
///
/// Known short names map to their full type, anything containing `/` is kept
/// as is, and any other token becomes `application/<token>`.
pub fn parse_mime_types(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|token| match mime_alias(token) {
            Some(full) => full.to_string(),
            None if token.contains('/') => token.to_string(),
            None => format!("application/{}", token),
        })
        .collect()
}

fn mime_alias(token: &str) -> Option<&'static str> {
    let full = match token {
        "json" => "application/json",
        "xml" => "text/xml",
        "plain" => "text/plain",
        "html" => "text/html",
        "form" | "x-www-form-urlencoded" => "application/x-www-form-urlencoded",
        "mpfd" | "multipart" => "multipart/form-data",
        "json-api" => "application/vnd.api+json",
        "json-stream" => "application/x-json-stream",
        "octet-stream" => "application/octet-stream",
        "png" => "image/png",
        "jpeg" | "jpg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "csv" => "text/csv",
        _ => return None,
    };
    Some(full)
}

/// Parses trailing `key(value)` attributes, lowercasing keys and keeping source order.
pub fn parse_attributes(text: &str) -> Vec<(String, String)> {
    ATTRIBUTE_REGEX
        .captures_iter(text)
        .map(|caps| (caps[1].to_lowercase(), caps[2].to_string()))
        .collect()
}
