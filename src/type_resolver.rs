use crate::openapi::{AdditionalProperties, Schema};
use crate::syntax::Field;
use crate::type_expr::TypeExpr;
use indexmap::IndexMap;
use log::{debug, trace};
use std::path::PathBuf;

/// Default ceiling for nested type resolution.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Type resolver - turns Go type expressions into OpenAPI schemas
pub struct TypeResolver {
    /// Caller-supplied replacements for named types
    overrides: TypeOverrides,
    /// Depth at which resolution gives up and returns an empty schema (0 = unbounded)
    max_depth: usize,
    /// Every record type registered so far, keyed by simple and qualified name
    type_cache: IndexMap<String, TypeInfo>,
}

/// A registered record type
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// Name the schema is registered under (`User` or `models.User`)
    pub name: String,
    /// Declaring Go package
    pub package: String,
    /// The synthesized object schema
    pub schema: Schema,
    /// File declaring the type
    pub source: PathBuf,
    /// One-based line of the type spec
    pub line: usize,
}

/// Name -> replacement table loaded from an overrides file.
///
/// Values are either primitive keywords (`string`, `integer`, `number`,
/// `boolean`), Go primitive names, `time.Time`, or the name of another
/// schema to reference instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeOverrides {
    replace: IndexMap<String, String>,
}

impl TypeOverrides {
    pub fn new(replace: IndexMap<String, String>) -> Self {
        Self { replace }
    }

    pub fn is_empty(&self) -> bool {
        self.replace.is_empty()
    }

    pub fn insert(&mut self, name: impl Into<String>, replacement: impl Into<String>) {
        self.replace.insert(name.into(), replacement.into());
    }

    /// Finds the replacement for a type name.
    ///
    /// Tries an exact match, then a table key ending in `.<name>`, then the
    /// part of `name` after its last dot. So `sql.NullInt64` in the table
    /// matches a query for `NullInt64` and vice versa.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        if let Some(found) = self.replace.get(name) {
            return Some(found);
        }

        let suffix = format!(".{}", name);
        if let Some((_, found)) = self.replace.iter().find(|(key, _)| key.ends_with(&suffix)) {
            return Some(found);
        }

        name.rsplit_once('.')
            .and_then(|(_, short)| self.replace.get(short))
            .map(String::as_str)
    }
}

/// Builds object schemas for inline `struct { ... }` expressions.
///
/// Implemented by the schema generator so that field handling lives in one place.
pub trait StructSynthesizer {
    fn synthesize_struct(&self, fields: &[Field], depth: usize) -> Schema;
}

/// Which identifier vocabulary applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vocabulary {
    /// Go source: only Go builtin type names are primitives
    Source,
    /// Annotation type-specs: also `integer`, `number`, `date-time`, `file`, ...
    Annotation,
}

struct NoInlineStructs;

impl StructSynthesizer for NoInlineStructs {
    fn synthesize_struct(&self, _fields: &[Field], _depth: usize) -> Schema {
        Schema::default()
    }
}

impl TypeResolver {
    /// Create a new TypeResolver
    pub fn new(overrides: TypeOverrides, max_depth: usize) -> Self {
        debug!(
            "Initializing TypeResolver with {} overrides, max depth {}",
            overrides.replace.len(),
            max_depth
        );
        Self {
            overrides,
            max_depth,
            type_cache: IndexMap::new(),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolves a type expression taken from Go source.
    pub fn resolve(&self, expr: &TypeExpr, depth: usize, structs: &dyn StructSynthesizer) -> Schema {
        self.resolve_with(expr, depth, Vocabulary::Source, structs)
    }

    /// Resolves an annotation type-spec such as `[]model.User` or `map[string]int`.
    pub fn resolve_annotation(&self, type_spec: &str) -> Schema {
        let expr = TypeExpr::parse(type_spec);
        trace!("Annotation type-spec {:?} parsed as {:?}", type_spec, expr);
        self.resolve_with(&expr, 0, Vocabulary::Annotation, &NoInlineStructs)
    }

    fn resolve_with(
        &self,
        expr: &TypeExpr,
        depth: usize,
        vocabulary: Vocabulary,
        structs: &dyn StructSynthesizer,
    ) -> Schema {
        if self.max_depth > 0 && depth >= self.max_depth {
            debug!("Depth limit {} reached while resolving {}", self.max_depth, expr);
            return Schema::default();
        }

        match expr {
            TypeExpr::Ident(name) => self.named_schema(name, vocabulary),
            TypeExpr::Qualified { .. } => self.named_schema(&expr.to_string(), vocabulary),
            TypeExpr::Pointer(inner) => self.resolve_with(inner, depth, vocabulary, structs),
            TypeExpr::Slice(element) => {
                Schema::array(self.resolve_with(element, depth + 1, vocabulary, structs))
            }
            TypeExpr::Map { value, .. } => {
                let values = self.resolve_with(value, depth + 1, vocabulary, structs);
                Schema::map(AdditionalProperties::Schema(Box::new(values)))
            }
            TypeExpr::Struct(fields) => structs.synthesize_struct(fields, depth + 1),
            TypeExpr::Interface => Schema::default(),
            TypeExpr::Unsupported(text) => {
                trace!("No schema shape for type expression {:?}", text);
                Schema::default()
            }
        }
    }

    /// Override, then primitive table, then `$ref`.
    fn named_schema(&self, name: &str, vocabulary: Vocabulary) -> Schema {
        if let Some(replacement) = self.overrides.lookup(name) {
            debug!("Type override applied: {} -> {}", name, replacement);
            return override_schema(replacement);
        }

        if vocabulary == Vocabulary::Annotation {
            if let Some(schema) = annotation_keyword_schema(name) {
                return schema;
            }
        }

        primitive_schema(name).unwrap_or_else(|| Schema::reference(name))
    }

    /// Registers a record type for later lookup.
    pub fn register(&mut self, info: TypeInfo) {
        debug!("Registering type {} from package {}", info.name, info.package);
        self.type_cache.insert(info.name.clone(), info);
    }

    pub fn get(&self, name: &str) -> Option<&TypeInfo> {
        self.type_cache.get(name)
    }

    pub fn registered_types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.type_cache.values()
    }
}

/// Go builtin types with a direct schema. `None` for everything else.
pub fn primitive_schema(name: &str) -> Option<Schema> {
    let schema = match name {
        "string" => Schema::typed("string"),
        "int" | "int8" | "int16" | "int32" | "uint" | "uint8" | "uint16" | "uint32" | "rune" => {
            Schema::formatted("integer", "int32")
        }
        "int64" | "uint64" => Schema::formatted("integer", "int64"),
        "float32" => Schema::formatted("number", "float"),
        "float64" => Schema::formatted("number", "double"),
        "bool" => Schema::typed("boolean"),
        "byte" => Schema::formatted("string", "byte"),
        "any" => Schema::default(),
        _ => return None,
    };
    Some(schema)
}

/// Extra names understood in annotation type-specs.
fn annotation_keyword_schema(name: &str) -> Option<Schema> {
    let schema = match name {
        "integer" => Schema::formatted("integer", "int32"),
        "number" | "float" | "double" => Schema::formatted("number", "double"),
        "boolean" => Schema::typed("boolean"),
        "object" => Schema::typed("object"),
        "date" => Schema::formatted("string", "date"),
        "date-time" | "time.Time" => Schema::formatted("string", "date-time"),
        "file" => Schema::formatted("string", "binary"),
        _ => return None,
    };
    Some(schema)
}

/// Schema for an override table value.
pub fn override_schema(replacement: &str) -> Schema {
    match replacement {
        "string" | "number" | "integer" | "boolean" | "object" | "array" => Schema::typed(replacement),
        "time.Time" => Schema::formatted("string", "date-time"),
        other => primitive_schema(other).unwrap_or_else(|| Schema::reference(other)),
    }
}
