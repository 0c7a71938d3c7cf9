//! Operation-level directives found in function doc comments.

use super::{parse_attributes, parse_mime_types, HttpMethod, RouteInfo};
use crate::config::to_valid_collection_format;
use crate::openapi::{
    coerce_value, try_coerce_value, Header, MediaType, Operation, Parameter, RequestBody, Response, Schema,
    SecurityRequirement,
};
use crate::resources::{language_for_extension, ContentStore};
use crate::syntax::CommentGroup;
use crate::type_resolver::TypeResolver;
use indexmap::IndexMap;
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{json, Value};

const JSON_CONTENT_TYPE: &str = "application/json";

type Handler = fn(&OperationProcessor<'_>, &Captures<'_>, &mut Operation);

struct Directive {
    name: &'static str,
    pattern: Regex,
    handler: Handler,
}

impl Directive {
    fn new(name: &'static str, pattern: &str, handler: Handler) -> Self {
        Self {
            name,
            // Patterns are literals below; a typo is a programming error.
            pattern: Regex::new(pattern).expect("directive pattern is valid"),
            handler,
        }
    }
}

/// Match order matters: the first pattern that matches a line handles it.
static DIRECTIVES: Lazy<Vec<Directive>> = Lazy::new(|| {
    vec![
        Directive::new("Summary", r"^@Summary\s+(.+)$", |p, c, o| p.summary(c, o)),
        Directive::new("Description", r"^@Description\s+(.+)$", |p, c, o| p.description(c, o)),
        Directive::new("ID", r"^@ID\s+(.+)$", |p, c, o| p.id(c, o)),
        Directive::new("Tags", r"^@Tags\s+(.+)$", |p, c, o| p.tags(c, o)),
        Directive::new("Accept", r"^@Accept\s+(.+)$", |p, c, o| p.accept(c, o)),
        Directive::new("Produce", r"^@Produce\s+(.+)$", |p, c, o| p.produce(c, o)),
        Directive::new(
            "Param",
            r#"^@Param\s+(\S+)\s+(\w+)\s+(\S+)\s+(true|false)\s+"([^"]*)"(?:\s+(.+))?"#,
            |p, c, o| p.param(c, o),
        ),
        Directive::new(
            "Success",
            r#"^@Success\s+(\d+)\s+\{(\w+)\}\s+(\S+)(?:\s+"([^"]*)")?"#,
            |p, c, o| p.response(c, o),
        ),
        Directive::new(
            "Failure",
            r#"^@Failure\s+(\d+)\s+\{(\w+)\}\s+(\S+)(?:\s+"([^"]*)")?"#,
            |p, c, o| p.response(c, o),
        ),
        Directive::new(
            "Response",
            r#"^@Response\s+(\d+)\s+\{(\w+)\}\s+(\S+)(?:\s+"([^"]*)")?"#,
            |p, c, o| p.response(c, o),
        ),
        Directive::new(
            "Header",
            r#"^@Header\s+(\d+)\s+\{(\w+)\}\s+(\S+)\s+"([^"]*)""#,
            |p, c, o| p.header(c, o),
        ),
        Directive::new("Security", r"^@Security\s+([^\[\s]+)(?:\[([^\]]+)\])?", |p, c, o| p.security(c, o)),
        Directive::new("Deprecated", r"^@Deprecated\s*$", |p, c, o| p.deprecated(c, o)),
        Directive::new("State", r"^@State\s+(.+)$", |p, c, o| p.state(c, o)),
        Directive::new("x-codeSamples", r"^@x-codeSamples\s+(.+)$", |p, c, o| p.code_samples(c, o)),
        Directive::new("Router", ROUTER_PATTERN, |_, _, _| {}),
    ]
});

const ROUTER_PATTERN: &str = r"^@Router\s+(\S+)\s+\[(\w+)\]";

static ROUTER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(ROUTER_PATTERN).expect("router pattern is valid"));

/// Builds operations from function doc comments.
///
/// Borrows the type resolver for annotation type-specs and the content store
/// for `file(...)` descriptions and code samples.
pub struct OperationProcessor<'a> {
    type_resolver: &'a TypeResolver,
    content: &'a ContentStore,
    collection_format: String,
}

impl<'a> OperationProcessor<'a> {
    pub fn new(type_resolver: &'a TypeResolver, content: &'a ContentStore, collection_format: &str) -> Self {
        Self {
            type_resolver,
            content,
            collection_format: to_valid_collection_format(collection_format),
        }
    }

    /// Builds an operation from a doc comment.
    ///
    /// Returns `None` when the comment holds no `@` line at all.
    pub fn process(&self, doc: &CommentGroup) -> Option<Operation> {
        let mut op = Operation::default();
        if self.process_into(doc, &mut op) {
            Some(op)
        } else {
            None
        }
    }

    /// Applies every directive in `doc` to an existing operation.
    ///
    /// Returns whether any `@` line was present.
    pub fn process_into(&self, doc: &CommentGroup, op: &mut Operation) -> bool {
        let mut seen = false;
        for line in doc.directives() {
            seen = true;
            self.process_line(line, op);
        }
        seen
    }

    /// Dispatches one line. Returns the directive name that handled it.
    pub fn process_line(&self, line: &str, op: &mut Operation) -> Option<&'static str> {
        for directive in DIRECTIVES.iter() {
            if let Some(caps) = directive.pattern.captures(line) {
                trace!("@{} <- {:?}", directive.name, line);
                (directive.handler)(self, &caps, op);
                return Some(directive.name);
            }
        }
        trace!("Unrecognized directive: {:?}", line);
        None
    }

    /// Route declared by the first `@Router` line.
    pub fn route_info(&self, doc: &CommentGroup) -> Option<RouteInfo> {
        doc.lines.iter().find_map(|line| {
            let caps = ROUTER_REGEX.captures(line)?;
            match caps[2].parse::<HttpMethod>() {
                Ok(method) => Some(RouteInfo {
                    path: caps[1].to_string(),
                    method,
                }),
                Err(e) => {
                    debug!("Ignoring @Router {}: {}", &caps[1], e);
                    None
                }
            }
        })
    }

    fn summary(&self, caps: &Captures<'_>, op: &mut Operation) {
        op.summary = Some(caps[1].trim().to_string());
    }

    fn description(&self, caps: &Captures<'_>, op: &mut Operation) {
        let mut text = caps[1].trim().to_string();

        if let Some(name) = text.strip_prefix("file(").and_then(|t| t.strip_suffix(')')) {
            match self.content.markdown(name) {
                Some(markdown) => text = markdown.to_string(),
                None => debug!("No markdown content for {}, keeping literal", name),
            }
        }

        match &mut op.description {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(&text);
            }
            None => op.description = Some(text),
        }
    }

    fn id(&self, caps: &Captures<'_>, op: &mut Operation) {
        op.operation_id = Some(caps[1].trim().to_string());
    }

    fn tags(&self, caps: &Captures<'_>, op: &mut Operation) {
        op.tags = caps[1].split(',').map(|t| t.trim().to_string()).collect();
    }

    /// Rewrites the content types of an existing request body.
    ///
    /// Has no effect before a body parameter has been declared.
    fn accept(&self, caps: &Captures<'_>, op: &mut Operation) {
        let content_types = parse_mime_types(&caps[1]);
        if let Some(body) = op.request_body.as_mut() {
            rewrite_content_types(&mut body.content, &content_types);
        } else {
            debug!("@Accept before any body parameter has nothing to rewrite");
        }
    }

    /// Rewrites the content types of every response declared so far.
    fn produce(&self, caps: &Captures<'_>, op: &mut Operation) {
        let content_types = parse_mime_types(&caps[1]);
        for response in op.responses.values_mut() {
            rewrite_content_types(&mut response.content, &content_types);
        }
    }

    fn param(&self, caps: &Captures<'_>, op: &mut Operation) {
        let name = &caps[1];
        let location = &caps[2];
        let type_spec = &caps[3];
        let required = &caps[4] == "true";
        let description = &caps[5];
        let attributes = caps.get(6).map(|m| parse_attributes(m.as_str())).unwrap_or_default();

        if location == "body" {
            let body = op.request_body.get_or_insert_with(|| RequestBody {
                description: Some(description.to_string()).filter(|d| !d.is_empty()),
                required,
                content: Default::default(),
            });
            body.content.insert(
                JSON_CONTENT_TYPE.to_string(),
                MediaType::with_schema(self.type_resolver.resolve_annotation(type_spec)),
            );
            return;
        }

        let mut param = Parameter {
            name: name.to_string(),
            location: location.to_string(),
            description: Some(description.to_string()).filter(|d| !d.is_empty()),
            required,
            schema: Some(self.type_resolver.resolve_annotation(type_spec)),
            ..Default::default()
        };

        let mut collection_format = None;
        for (key, value) in &attributes {
            if key == "collectionformat" {
                collection_format = Some(to_valid_collection_format(value));
            } else {
                apply_parameter_attribute(&mut param, key, value);
            }
        }

        let is_array = param.schema.as_ref().and_then(Schema::type_name) == Some("array");
        if is_array && matches!(location, "query" | "header" | "path" | "cookie") {
            let format = collection_format.unwrap_or_else(|| self.collection_format.clone());
            let (style, explode) = collection_style(&format);
            param.style = Some(style.to_string());
            param.explode = Some(explode);
        }

        op.parameters.push(param);
    }

    /// `@Success`, `@Failure` and `@Response` share one shape.
    fn response(&self, caps: &Captures<'_>, op: &mut Operation) {
        let status = caps[1].to_string();
        let kind = &caps[2];
        let schema_ref = &caps[3];
        let description = caps
            .get(4)
            .map(|m| m.as_str())
            .filter(|d| !d.is_empty())
            .unwrap_or("Success");

        let mut response = Response {
            description: description.to_string(),
            ..Default::default()
        };

        if kind == "object" || kind == "array" {
            let mut schema = self.type_resolver.resolve_annotation(schema_ref);
            if kind == "array" {
                schema = Schema::array(schema);
            }
            response
                .content
                .insert(JSON_CONTENT_TYPE.to_string(), MediaType::with_schema(schema));
        }

        op.responses.insert(status, response);
    }

    fn header(&self, caps: &Captures<'_>, op: &mut Operation) {
        let status = &caps[1];
        let response = op
            .responses
            .entry(status.to_string())
            .or_insert_with(|| Response {
                description: format!("Response {}", status),
                ..Default::default()
            });

        response.headers.insert(
            caps[3].to_string(),
            Header {
                description: Some(caps[4].to_string()).filter(|d| !d.is_empty()),
                schema: Some(self.type_resolver.resolve_annotation(&caps[2])),
            },
        );
    }

    fn security(&self, caps: &Captures<'_>, op: &mut Operation) {
        let scopes = caps
            .get(2)
            .map(|m| m.as_str().split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        let mut requirement = SecurityRequirement::new();
        requirement.insert(caps[1].to_string(), scopes);
        op.security.push(requirement);
    }

    fn deprecated(&self, _caps: &Captures<'_>, op: &mut Operation) {
        op.deprecated = true;
    }

    fn state(&self, caps: &Captures<'_>, op: &mut Operation) {
        op.extensions
            .insert("x-state".to_string(), Value::String(caps[1].trim().to_string()));
    }

    /// `@x-codeSamples lang:file`; an empty `lang` is guessed from the extension.
    fn code_samples(&self, caps: &Captures<'_>, op: &mut Operation) {
        let Some((lang, filename)) = caps[1].split_once(':') else {
            debug!("Malformed @x-codeSamples, expected lang:file: {}", &caps[1]);
            return;
        };
        let filename = filename.trim();

        let Some(source) = self.content.code_example(filename).filter(|s| !s.is_empty()) else {
            debug!("No code example loaded for {}", filename);
            return;
        };

        let lang = match lang.trim() {
            "" => language_for_extension(filename),
            lang => lang,
        };

        let samples = op
            .extensions
            .entry("x-codeSamples".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(samples) = samples {
            samples.push(json!({ "lang": lang, "source": source }));
        }
    }
}

/// Replaces the content-type keys, keeping the first existing schema.
fn rewrite_content_types(content: &mut IndexMap<String, MediaType>, content_types: &[String]) {
    if content.is_empty() || content_types.is_empty() {
        return;
    }
    let schema = content.values().next().and_then(|m| m.schema.clone());
    *content = content_types
        .iter()
        .map(|ct| {
            (
                ct.clone(),
                MediaType {
                    schema: schema.clone(),
                    example: None,
                },
            )
        })
        .collect();
}

/// OpenAPI 3 `style`/`explode` for a collection format.
///
/// `tsv` has no 3.x counterpart and is serialized like `csv`.
pub fn collection_style(format: &str) -> (&'static str, bool) {
    match format {
        "multi" => ("form", true),
        "pipes" => ("pipeDelimited", false),
        "ssv" => ("spaceDelimited", false),
        _ => ("form", false),
    }
}

/// Applies one `key(value)` attribute of a `@Param` line.
///
/// Values that fail to parse leave the attribute unset.
fn apply_parameter_attribute(param: &mut Parameter, key: &str, value: &str) {
    let flag = value.trim() == "true";
    if key == "deprecated" {
        param.deprecated = flag;
        return;
    }
    if key == "allowemptyvalue" {
        param.allow_empty_value = flag;
        return;
    }

    let schema = param.schema.get_or_insert_with(Schema::default);
    let float = || value.trim().parse::<f64>().ok();
    let unsigned = || value.trim().parse::<u64>().ok();

    match key {
        "minimum" | "min" => schema.minimum = float().or(schema.minimum),
        "maximum" | "max" => schema.maximum = float().or(schema.maximum),
        "exclusiveminimum" => schema.exclusive_minimum = float().or(schema.exclusive_minimum),
        "exclusivemaximum" => schema.exclusive_maximum = float().or(schema.exclusive_maximum),
        "minlength" => schema.min_length = unsigned().or(schema.min_length),
        "maxlength" => schema.max_length = unsigned().or(schema.max_length),
        "pattern" => schema.pattern = Some(value.to_string()),
        "multipleof" => schema.multiple_of = float().or(schema.multiple_of),
        "minitems" => schema.min_items = unsigned().or(schema.min_items),
        "maxitems" => schema.max_items = unsigned().or(schema.max_items),
        "uniqueitems" => schema.unique_items = flag,
        "enum" | "enums" => {
            // Array parameters take their enum from the element type
            let element = match schema.items.as_deref() {
                Some(items) if schema.type_name() == Some("array") => items.type_name(),
                _ => schema.type_name(),
            };
            let values: Vec<Value> = value.split(',').map(|v| coerce_value(v, element)).collect();
            schema.enum_values = values;
        }
        "default" => match try_coerce_value(value, schema.type_name()) {
            Some(default) => schema.default = Some(default),
            None => debug!("Dropping default({}): not a {:?}", value, schema.type_name()),
        },
        "example" => match try_coerce_value(value, schema.type_name()) {
            Some(example) => param.example = Some(example),
            None => debug!("Dropping example({}): not a {:?}", value, schema.type_name()),
        },
        "format" => schema.format = Some(value.to_string()),
        "readonly" => schema.read_only = flag,
        "writeonly" => schema.write_only = flag,
        "nullable" => schema.nullable = flag,
        other => trace!("Ignoring @Param attribute {}({})", other, value),
    }
}
