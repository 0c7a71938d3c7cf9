//! Struct-tag interpretation.
//!
//! A Go field tag such as
//! `` `json:"name,omitempty" binding:"required,min=3" swaggertype:"string"` ``
//! is parsed once into [`StructTags`], which then knows how to decorate the
//! field's resolved [`Schema`].

use crate::openapi::Schema;
use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static TAG_PAIR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|\s)([A-Za-z_][\w-]*):"([^"]*)""#).expect("tag pair pattern is valid")
});

const PRIMITIVE_TYPES: [&str; 4] = ["string", "integer", "number", "boolean"];

/// Raw tag values of one field.
///
/// Empty values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructTags {
    pub json: Option<String>,
    pub binding: Option<String>,
    pub validate: Option<String>,
    pub swagger_type: Option<String>,
    pub extensions: Option<String>,
    pub example: Option<String>,
    pub format: Option<String>,
    pub default: Option<String>,
    pub enum_values: Option<String>,
    pub minimum: Option<String>,
    pub maximum: Option<String>,
    pub min_length: Option<String>,
    pub max_length: Option<String>,
    pub pattern: Option<String>,
    /// `swaggerignore:"true"`
    pub ignore: bool,
    /// `required` rule in either dialect, or `required:"true"`
    pub required: bool,
    pub omit_empty: bool,
    pub read_only: bool,
    pub write_only: bool,
}

/// Which validation tag a rule list came from.
///
/// Both share the numeric and length rules; `validate` also knows a few
/// format and pattern shorthands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleDialect {
    Binding,
    Validate,
}

/// Returns the value of `key` in a raw tag string.
pub fn extract_tag(tag: &str, key: &str) -> Option<String> {
    TAG_PAIR_REGEX
        .captures_iter(tag)
        .find(|caps| &caps[1] == key)
        .map(|caps| caps[2].to_string())
}

impl StructTags {
    pub fn parse(tag: &str) -> Self {
        let get = |key: &str| extract_tag(tag, key).filter(|v| !v.is_empty());

        let json = get("json");
        let binding = get("binding");
        let validate = get("validate");

        // Only the bare `required` rule counts; `required_with=...` and friends are conditional
        let mentions_required = |rules: &Option<String>| {
            rules
                .as_deref()
                .is_some_and(|r| r.split(',').any(|rule| rule.trim() == "required"))
        };

        Self {
            omit_empty: json.as_deref().is_some_and(|j| j.contains("omitempty")),
            required: mentions_required(&binding)
                || mentions_required(&validate)
                || get("required").as_deref() == Some("true"),
            ignore: get("swaggerignore").is_some_and(|v| v.eq_ignore_ascii_case("true")),
            read_only: get("readonly").as_deref() == Some("true"),
            write_only: get("writeonly").as_deref() == Some("true"),
            swagger_type: get("swaggertype"),
            extensions: get("extensions"),
            example: get("example"),
            format: get("format"),
            default: get("default"),
            enum_values: get("enum"),
            minimum: get("minimum"),
            maximum: get("maximum"),
            min_length: get("minLength"),
            max_length: get("maxLength"),
            pattern: get("pattern"),
            json,
            binding,
            validate,
        }
    }

    /// Whether `json:"-"` hides the field.
    pub fn is_json_hidden(&self) -> bool {
        self.json.as_deref() == Some("-")
    }

    /// Property name from the `json` tag, if it names one.
    pub fn json_name(&self) -> Option<&str> {
        let name = self.json.as_deref()?.split(',').next()?.trim();
        if name.is_empty() || name == "-" {
            None
        } else {
            Some(name)
        }
    }

    /// Applies every tag to the field schema.
    ///
    /// `swaggertype` goes first so that later rules see the replaced type.
    pub fn apply(&self, schema: &mut Schema) {
        if let Some(swagger_type) = &self.swagger_type {
            apply_swagger_type(swagger_type, schema);
        }
        if let Some(extensions) = &self.extensions {
            apply_extensions(extensions, schema);
        }
        if let Some(example) = &self.example {
            schema.example = Some(schema.coerce(example));
        }
        if let Some(format) = &self.format {
            schema.format = Some(format.clone());
        }
        if let Some(default) = &self.default {
            schema.default = Some(schema.coerce(default));
        }
        if let Some(values) = &self.enum_values {
            let values: Vec<Value> = values.split(',').map(|v| schema.coerce(v)).collect();
            schema.enum_values.extend(values);
        }
        if let Some(min) = self.minimum.as_deref().and_then(parse_f64) {
            schema.minimum = Some(min);
        }
        if let Some(max) = self.maximum.as_deref().and_then(parse_f64) {
            schema.maximum = Some(max);
        }
        if let Some(min) = self.min_length.as_deref().and_then(parse_u64) {
            schema.min_length = Some(min);
        }
        if let Some(max) = self.max_length.as_deref().and_then(parse_u64) {
            schema.max_length = Some(max);
        }
        if let Some(pattern) = &self.pattern {
            schema.pattern = Some(pattern.clone());
        }
        if self.read_only {
            schema.read_only = true;
        }
        if self.write_only {
            schema.write_only = true;
        }
        if let Some(rules) = &self.binding {
            apply_rules(rules, RuleDialect::Binding, schema);
        }
        if let Some(rules) = &self.validate {
            apply_rules(rules, RuleDialect::Validate, schema);
        }
    }
}

fn parse_f64(value: &str) -> Option<f64> {
    value.trim().parse().ok()
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}

/// Interprets a comma-separated validation rule list.
pub fn apply_rules(rules: &str, dialect: RuleDialect, schema: &mut Schema) {
    for rule in rules.split(',').map(str::trim).filter(|r| !r.is_empty()) {
        match rule.split_once('=') {
            Some((name, value)) => apply_parameterized_rule(name, value, schema),
            None => apply_bare_rule(rule, dialect, schema),
        }
    }
}

fn apply_bare_rule(rule: &str, dialect: RuleDialect, schema: &mut Schema) {
    let set_format = |schema: &mut Schema, format: &str| schema.format = Some(format.to_string());
    let set_pattern = |schema: &mut Schema, pattern: &str| schema.pattern = Some(pattern.to_string());

    match (rule, dialect) {
        ("required", _) => {}
        ("email", _) => set_format(schema, "email"),
        ("url", _) => set_format(schema, "uri"),
        ("uuid" | "uuid4", RuleDialect::Validate) => set_format(schema, "uuid"),
        ("datetime", RuleDialect::Validate) => set_format(schema, "date-time"),
        ("date", RuleDialect::Validate) => set_format(schema, "date"),
        ("numeric", RuleDialect::Validate) => set_pattern(schema, "^[0-9]+$"),
        ("alpha", RuleDialect::Validate) => set_pattern(schema, "^[a-zA-Z]+$"),
        ("alphanum", RuleDialect::Validate) => set_pattern(schema, "^[a-zA-Z0-9]+$"),
        _ => trace!("Ignoring validation rule {:?}", rule),
    }
}

fn apply_parameterized_rule(name: &str, value: &str, schema: &mut Schema) {
    let kind = schema.type_name().map(str::to_string);
    match (name, kind.as_deref()) {
        ("min", Some("string")) => schema.min_length = parse_u64(value).or(schema.min_length),
        ("min", Some("array")) => schema.min_items = parse_u64(value).or(schema.min_items),
        ("min", Some("integer" | "number")) => schema.minimum = parse_f64(value).or(schema.minimum),
        ("max", Some("string")) => schema.max_length = parse_u64(value).or(schema.max_length),
        ("max", Some("array")) => schema.max_items = parse_u64(value).or(schema.max_items),
        ("max", Some("integer" | "number")) => schema.maximum = parse_f64(value).or(schema.maximum),
        ("len", _) => {
            if let Some(len) = parse_u64(value) {
                schema.min_length = Some(len);
                schema.max_length = Some(len);
            }
        }
        ("gte", _) => schema.minimum = parse_f64(value).or(schema.minimum),
        ("lte", _) => schema.maximum = parse_f64(value).or(schema.maximum),
        ("gt", _) => schema.exclusive_minimum = parse_f64(value).or(schema.exclusive_minimum),
        ("lt", _) => schema.exclusive_maximum = parse_f64(value).or(schema.exclusive_maximum),
        ("oneof", _) => schema
            .enum_values
            .extend(value.split_whitespace().map(|v| Value::String(v.to_string()))),
        _ => trace!("Ignoring validation rule {}={}", name, value),
    }
}

/// `swaggertype:"string"`, `swaggertype:"primitive,integer"`, `swaggertype:"array,number"`.
pub fn apply_swagger_type(swagger_type: &str, schema: &mut Schema) {
    let parts: Vec<&str> = swagger_type.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [single] if PRIMITIVE_TYPES.contains(single) || *single == "object" || *single == "array" => {
            schema.set_type(single);
            schema.reference = None;
        }
        ["primitive", inner] if PRIMITIVE_TYPES.contains(inner) => {
            schema.set_type(inner);
            schema.reference = None;
        }
        ["array", inner] => {
            schema.set_type("array");
            schema.reference = None;
            if PRIMITIVE_TYPES.contains(inner) || *inner == "object" {
                schema.items = Some(Box::new(Schema::typed(inner)));
            }
        }
        _ => trace!("Ignoring swaggertype {:?}", swagger_type),
    }
}

/// `extensions:"x-nullable,x-order=1,!x-omitempty"`.
pub fn apply_extensions(extensions: &str, schema: &mut Schema) {
    for entry in extensions.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        if let Some(key) = entry.strip_prefix('!') {
            if key.starts_with("x-") {
                schema.extensions.insert(key.to_string(), Value::Bool(false));
            }
        } else if let Some((key, value)) = entry.split_once('=') {
            let key = key.trim();
            if key.starts_with("x-") {
                schema.extensions.insert(key.to_string(), extension_value(value.trim()));
            }
        } else if entry.starts_with("x-") {
            schema.extensions.insert(entry.to_string(), Value::Bool(true));
        }
    }
}

/// Number, then boolean, then string.
fn extension_value(value: &str) -> Value {
    if let Ok(int) = value.parse::<i64>() {
        return Value::from(int);
    }
    if let Some(number) = value.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        return Value::Number(number);
    }
    match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_extract_tag() {
        let tag = r#"json:"name,omitempty" binding:"required" xjson:"other""#;
        assert_eq!(extract_tag(tag, "json"), Some("name,omitempty".to_string()));
        assert_eq!(extract_tag(tag, "binding"), Some("required".to_string()));
        assert_eq!(extract_tag(tag, "validate"), None);
        assert_eq!(extract_tag(r#"xjson:"other""#, "json"), None);
    }

    #[test]
    fn test_parse_flags() {
        let tags = StructTags::parse(r#"json:"email,omitempty" validate:"required,email" readonly:"true""#);
        assert!(tags.omit_empty);
        assert!(tags.required);
        assert!(tags.read_only);
        assert!(!tags.write_only);
        assert_eq!(tags.json_name(), Some("email"));

        let explicit = StructTags::parse(r#"required:"true""#);
        assert!(explicit.required);
    }

    #[test]
    fn test_conditional_required_rules_are_not_required() {
        let tags = StructTags::parse(r#"json:"nick,omitempty" validate:"omitempty,required_with=Email""#);
        assert!(!tags.required);
        assert!(!StructTags::parse(r#"binding:"required_if=Kind dog""#).required);
        assert!(!StructTags::parse(r#"validate:"required_without=Phone""#).required);
        assert!(StructTags::parse(r#"binding:"max=5, required""#).required);
    }

    #[test]
    fn test_ignore_and_hidden() {
        assert!(StructTags::parse(r#"swaggerignore:"TRUE""#).ignore);
        assert!(!StructTags::parse(r#"swaggerignore:"false""#).ignore);
        let hidden = StructTags::parse(r#"json:"-""#);
        assert!(hidden.is_json_hidden());
        assert_eq!(hidden.json_name(), None);
        assert_eq!(StructTags::parse(r#"json:",omitempty""#).json_name(), None);
    }

    #[test]
    fn test_min_max_are_type_sensitive() {
        let mut string = Schema::typed("string");
        apply_rules("min=3,max=20", RuleDialect::Binding, &mut string);
        assert_eq!((string.min_length, string.max_length), (Some(3), Some(20)));
        assert_eq!(string.minimum, None);

        let mut array = Schema::array(Schema::typed("string"));
        apply_rules("min=1,max=5", RuleDialect::Binding, &mut array);
        assert_eq!((array.min_items, array.max_items), (Some(1), Some(5)));

        let mut number = Schema::formatted("integer", "int32");
        apply_rules("min=18,max=130", RuleDialect::Validate, &mut number);
        assert_eq!((number.minimum, number.maximum), (Some(18.0), Some(130.0)));
        assert_eq!(number.min_length, None);
    }

    #[test]
    fn test_bounds_and_oneof() {
        let mut schema = Schema::typed("integer");
        apply_rules("gte=1,lte=9,gt=0,lt=10,oneof=1 3 5", RuleDialect::Binding, &mut schema);
        assert_eq!(schema.minimum, Some(1.0));
        assert_eq!(schema.maximum, Some(9.0));
        assert_eq!(schema.exclusive_minimum, Some(0.0));
        assert_eq!(schema.exclusive_maximum, Some(10.0));
        assert_eq!(schema.enum_values, vec![json!("1"), json!("3"), json!("5")]);

        let mut code = Schema::typed("string");
        apply_rules("len=6,numeric", RuleDialect::Validate, &mut code);
        assert_eq!((code.min_length, code.max_length), (Some(6), Some(6)));
        assert_eq!(code.pattern.as_deref(), Some("^[0-9]+$"));
    }

    #[test]
    fn test_bare_rules_by_dialect() {
        let mut binding = Schema::typed("string");
        apply_rules("uuid", RuleDialect::Binding, &mut binding);
        assert_eq!(binding.format, None);

        let mut validate = Schema::typed("string");
        apply_rules("uuid4", RuleDialect::Validate, &mut validate);
        assert_eq!(validate.format.as_deref(), Some("uuid"));

        let mut url = Schema::typed("string");
        apply_rules("required,url", RuleDialect::Binding, &mut url);
        assert_eq!(url.format.as_deref(), Some("uri"));
    }

    #[test]
    fn test_unparseable_rule_values_are_skipped() {
        let mut schema = Schema::typed("string");
        apply_rules("min=abc,len=x", RuleDialect::Binding, &mut schema);
        assert_eq!(schema, Schema::typed("string"));
    }

    #[test]
    fn test_swagger_type_forms() {
        let mut replaced = Schema::reference("time.Time");
        apply_swagger_type("string", &mut replaced);
        assert_eq!(replaced, Schema::typed("string"));

        let mut primitive = Schema::reference("Money");
        apply_swagger_type("primitive,integer", &mut primitive);
        assert_eq!(primitive, Schema::typed("integer"));

        let mut array = Schema::reference("IDs");
        apply_swagger_type("array,number", &mut array);
        assert_eq!(array, Schema::array(Schema::typed("number")));

        let mut untouched = Schema::reference("User");
        apply_swagger_type("primitive,object", &mut untouched);
        assert_eq!(untouched, Schema::reference("User"));
    }

    #[test]
    fn test_extensions() {
        let mut schema = Schema::typed("string");
        apply_extensions("x-nullable,!x-omitempty,x-order=2,x-ratio=0.5,x-flag=true,x-name=abc,y-skip", &mut schema);
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "string",
                "x-nullable": true,
                "x-omitempty": false,
                "x-order": 2,
                "x-ratio": 0.5,
                "x-flag": true,
                "x-name": "abc"
            })
        );
    }

    #[test]
    fn test_apply_order_and_coercion() {
        let tags = StructTags::parse(
            r#"json:"age" example:"30" default:"18" enum:"18, 21" minimum:"0" maximum:"150" binding:"max=120""#,
        );
        let mut schema = Schema::formatted("integer", "int32");
        tags.apply(&mut schema);

        assert_eq!(schema.example, Some(json!(30)));
        assert_eq!(schema.default, Some(json!(18)));
        assert_eq!(schema.enum_values, vec![json!(18), json!(21)]);
        assert_eq!(schema.minimum, Some(0.0));
        // binding rules run after the plain bounds
        assert_eq!(schema.maximum, Some(120.0));
    }

    #[test]
    fn test_swagger_type_runs_before_rules() {
        let tags = StructTags::parse(r#"swaggertype:"string" binding:"min=2""#);
        let mut schema = Schema::reference("Code");
        tags.apply(&mut schema);
        assert_eq!(schema.type_name(), Some("string"));
        assert_eq!(schema.min_length, Some(2));
    }
}
