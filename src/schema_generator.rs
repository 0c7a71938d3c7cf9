use crate::naming::PropertyStrategy;
use crate::openapi::Schema;
use crate::struct_tags::StructTags;
use crate::syntax::{CommentGroup, Field, TypeDecl};
use crate::type_expr::TypeExpr;
use crate::type_resolver::{StructSynthesizer, TypeResolver};
use log::{debug, trace};
use serde_json::Value;

/// Schema generator - converts Go struct declarations to OpenAPI object schemas
pub struct SchemaGenerator {
    /// Type resolver for field type expressions
    type_resolver: TypeResolver,
    /// How field names become property names when no `json` tag names them
    strategy: PropertyStrategy,
    /// Required-ness of fields with no explicit signal either way
    required_by_default: bool,
}

impl SchemaGenerator {
    /// Create a new SchemaGenerator with a TypeResolver
    pub fn new(type_resolver: TypeResolver, strategy: PropertyStrategy, required_by_default: bool) -> Self {
        debug!(
            "Initializing SchemaGenerator (strategy: {}, required by default: {})",
            strategy, required_by_default
        );
        Self {
            type_resolver,
            strategy,
            required_by_default,
        }
    }

    pub fn type_resolver(&self) -> &TypeResolver {
        &self.type_resolver
    }

    pub fn type_resolver_mut(&mut self) -> &mut TypeResolver {
        &mut self.type_resolver
    }

    /// Object schema for a top-level `type X struct {...}` declaration.
    ///
    /// Returns `None` for non-struct declarations (aliases, interfaces, ...).
    pub fn generate_type_schema(&self, decl: &TypeDecl) -> Option<Schema> {
        match &decl.ty {
            TypeExpr::Struct(fields) => {
                debug!("Generating schema for struct: {}", decl.name);
                Some(self.generate_struct_schema(fields, Some(&decl.doc), 0))
            }
            _ => {
                trace!("Skipping non-struct type declaration: {}", decl.name);
                None
            }
        }
    }

    /// Object schema for a field list.
    pub fn generate_struct_schema(&self, fields: &[Field], doc: Option<&CommentGroup>, depth: usize) -> Schema {
        let mut schema = Schema::typed("object");

        if let Some(doc) = doc {
            apply_struct_doc(doc, &mut schema);
        }

        for field in fields {
            self.add_field(field, &mut schema, depth);
        }

        schema
    }

    fn add_field(&self, field: &Field, schema: &mut Schema, depth: usize) {
        if field.is_embedded() {
            // Composition by reference, the embedded fields are not inlined
            match field.ty.deref().type_name() {
                Some(name) => schema.all_of.push(Schema::reference(&name)),
                None => trace!("Skipping embedded field of type {}", field.ty),
            }
            return;
        }

        let tags = field.tag.as_deref().map(StructTags::parse).unwrap_or_default();
        if tags.ignore || tags.is_json_hidden() {
            return;
        }

        for name in field.names.iter().filter(|n| is_exported(n)) {
            let property = match tags.json_name() {
                Some(json_name) => json_name.to_string(),
                None => self.strategy.apply(name),
            };

            let mut field_schema = self.type_resolver.resolve(&field.ty, depth, self);
            apply_field_doc(&field.doc, &mut field_schema);
            tags.apply(&mut field_schema);

            trace!("Property {} -> {}", name, property);
            schema.properties.insert(property.clone(), field_schema);

            if is_required(&tags, field.is_pointer(), self.required_by_default) {
                schema.required.push(property);
            }
        }
    }
}

impl StructSynthesizer for SchemaGenerator {
    fn synthesize_struct(&self, fields: &[Field], depth: usize) -> Schema {
        self.generate_struct_schema(fields, None, depth)
    }
}

/// Go exports identifiers that start with an uppercase letter.
fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Required-ness decision.
///
/// An explicit required signal beats everything; otherwise `omitempty` and
/// pointer types mean optional; otherwise the document default applies.
pub fn is_required(tags: &StructTags, is_pointer: bool, required_by_default: bool) -> bool {
    if tags.required {
        true
    } else if tags.omit_empty || is_pointer {
        false
    } else {
        required_by_default
    }
}

fn append_line(target: &mut Option<String>, text: &str, separator: &str) {
    match target {
        Some(existing) => {
            existing.push_str(separator);
            existing.push_str(text);
        }
        None => *target = Some(text.to_string()),
    }
}

/// `@Description`, `@Title`, `@Example`, `@Deprecated` and plain doc lines on a struct.
fn apply_struct_doc(doc: &CommentGroup, schema: &mut Schema) {
    for line in &doc.lines {
        if let Some(description) = line.strip_prefix("@Description ") {
            append_line(&mut schema.description, description.trim(), "\n");
        } else if let Some(title) = line.strip_prefix("@Title ") {
            schema.title = Some(title.trim().to_string());
        } else if line == "@Deprecated" {
            schema.deprecated = true;
        } else if let Some(example) = line.strip_prefix("@Example ") {
            let example = example.trim();
            schema.example =
                Some(serde_json::from_str(example).unwrap_or_else(|_| Value::String(example.to_string())));
        } else if !line.is_empty() && !line.starts_with('@') {
            append_line(&mut schema.description, line, "\n");
        }
    }
}

/// Field doc lines: plain text and `@Description` are space-joined.
fn apply_field_doc(doc: &CommentGroup, schema: &mut Schema) {
    for line in &doc.lines {
        if let Some(description) = line.strip_prefix("@Description ") {
            append_line(&mut schema.description, description.trim(), " ");
        } else if let Some(example) = line.strip_prefix("@Example ") {
            schema.example = Some(schema.coerce(example));
        } else if line == "@Deprecated" {
            schema.deprecated = true;
        } else if !line.is_empty() && !line.starts_with('@') {
            append_line(&mut schema.description, line, " ");
        }
    }
}
