//! Typed Go type expressions.
//!
//! Both the tree-sitter lowering in [`crate::parser`] and the annotation
//! type-spec strings (`[]model.User`, `map[string]int`, `*Pet`) produce a
//! [`TypeExpr`], so schema resolution has a single input shape.

use crate::syntax::Field;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// `string`, `User`, `date-time`
    Ident(String),
    /// `pkg.Name`
    Qualified { package: String, name: String },
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `[]T` and `[N]T`
    Slice(Box<TypeExpr>),
    /// `map[K]V`
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    /// Inline `struct { ... }`
    Struct(Vec<Field>),
    /// `interface{...}` and `any`
    Interface,
    /// Channels, functions, generics and anything else without a schema shape
    Unsupported(String),
}

impl TypeExpr {
    /// Parses an annotation type-spec string.
    ///
    /// Never fails: input that fits no production becomes
    /// [`TypeExpr::Unsupported`] and resolves to an empty schema.
    pub fn parse(text: &str) -> TypeExpr {
        let mut parser = TypeSpecParser::new(text.trim());
        let expr = parser.parse_type();
        if parser.at_end() {
            expr
        } else {
            TypeExpr::Unsupported(text.trim().to_string())
        }
    }

    /// Strips any number of leading pointers.
    pub fn deref(&self) -> &TypeExpr {
        match self {
            TypeExpr::Pointer(inner) => inner.deref(),
            other => other,
        }
    }

    /// The name a named type is referenced by: `User` or `pkg.User`.
    pub fn type_name(&self) -> Option<String> {
        match self {
            TypeExpr::Ident(name) => Some(name.clone()),
            TypeExpr::Qualified { package, name } => Some(format!("{}.{}", package, name)),
            _ => None,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Ident(name) => write!(f, "{}", name),
            TypeExpr::Qualified { package, name } => write!(f, "{}.{}", package, name),
            TypeExpr::Pointer(inner) => write!(f, "*{}", inner),
            TypeExpr::Slice(inner) => write!(f, "[]{}", inner),
            TypeExpr::Map { key, value } => write!(f, "map[{}]{}", key, value),
            TypeExpr::Struct(_) => write!(f, "struct{{...}}"),
            TypeExpr::Interface => write!(f, "interface{{}}"),
            TypeExpr::Unsupported(text) => write!(f, "{}", text),
        }
    }
}

/// Recursive-descent parser over the type-spec grammar:
///
/// ```text
/// type  := '*' type
///        | '[' digits? ']' type
///        | 'map' '[' type ']' type
///        | 'interface{}' | 'any'
///        | name ('.' name)?
/// name  := [A-Za-z0-9_-]+
/// ```
struct TypeSpecParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> TypeSpecParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn parse_type(&mut self) -> TypeExpr {
        if self.eat("*") {
            return TypeExpr::Pointer(Box::new(self.parse_type()));
        }

        if self.eat("[") {
            let len: String = self
                .rest()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            self.pos += len.len();
            if !self.eat("]") {
                return self.unsupported();
            }
            return TypeExpr::Slice(Box::new(self.parse_type()));
        }

        if self.eat("map[") {
            let key = self.parse_type();
            if !self.eat("]") {
                return self.unsupported();
            }
            let value = self.parse_type();
            return TypeExpr::Map {
                key: Box::new(key),
                value: Box::new(value),
            };
        }

        if self.eat("interface{}") {
            return TypeExpr::Interface;
        }

        let first = self.parse_name();
        if first.is_empty() {
            return self.unsupported();
        }
        if first == "any" {
            return TypeExpr::Interface;
        }

        if self.rest().starts_with('.') {
            self.pos += 1;
            let second = self.parse_name();
            if second.is_empty() {
                return self.unsupported();
            }
            return TypeExpr::Qualified {
                package: first,
                name: second,
            };
        }

        TypeExpr::Ident(first)
    }

    fn parse_name(&mut self) -> String {
        let name: String = self
            .rest()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        self.pos += name.len();
        name
    }

    fn unsupported(&mut self) -> TypeExpr {
        self.pos = self.input.len();
        TypeExpr::Unsupported(self.input.to_string())
    }
}
