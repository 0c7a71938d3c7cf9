//! Referential validation of a finished document.
//!
//! Checks run in a fixed order and stop at the first failure: title,
//! version, then for every operation its parameters, request body and
//! responses. A schema reference is valid when it carries the
//! `#/components/schemas/` prefix and names a registered component.

use crate::error::{RefError, ValidationError};
use crate::openapi::{AdditionalProperties, Document, Operation, Schema, SCHEMA_REF_PREFIX};
use log::debug;

/// Validates `document`, returning the first problem found.
pub fn validate(document: &Document) -> Result<(), ValidationError> {
    if document.info.title.trim().is_empty() {
        return Err(ValidationError::MissingTitle);
    }
    if document.info.version.trim().is_empty() {
        return Err(ValidationError::MissingVersion);
    }

    for (path, method, operation) in document.operations() {
        debug!("Validating {} {}", method, path);
        validate_operation(document, path, method, operation)?;
    }

    Ok(())
}

fn validate_operation(
    document: &Document,
    path: &str,
    method: &str,
    operation: &Operation,
) -> Result<(), ValidationError> {
    for param in &operation.parameters {
        if let Some(schema) = &param.schema {
            check_schema(document, schema).map_err(|source| ValidationError::InvalidParameterRef {
                path: path.to_string(),
                source,
            })?;
        }
    }

    if let Some(body) = &operation.request_body {
        for (content_type, media) in &body.content {
            if let Some(schema) = &media.schema {
                check_schema(document, schema).map_err(|source| ValidationError::InvalidRequestBodyRef {
                    path: path.to_string(),
                    content_type: content_type.clone(),
                    source,
                })?;
            }
        }
    }

    if operation.responses.is_empty() {
        return Err(ValidationError::NoResponses {
            path: path.to_string(),
            method: method.to_uppercase(),
        });
    }

    for (status, response) in &operation.responses {
        for (content_type, media) in &response.content {
            if let Some(schema) = &media.schema {
                check_schema(document, schema).map_err(|source| ValidationError::InvalidResponseRef {
                    path: path.to_string(),
                    status: status.clone(),
                    content_type: content_type.clone(),
                    source,
                })?;
            }
        }
    }

    Ok(())
}

/// Checks the schema's own `$ref` and those of its container children
/// (`items`, `additionalProperties`, `allOf`/`oneOf`/`anyOf`).
fn check_schema(document: &Document, schema: &Schema) -> Result<(), RefError> {
    if let Some(reference) = &schema.reference {
        check_ref(document, reference)?;
    }
    if let Some(items) = &schema.items {
        check_schema(document, items)?;
    }
    if let Some(AdditionalProperties::Schema(values)) = &schema.additional_properties {
        check_schema(document, values)?;
    }
    for child in schema.all_of.iter().chain(&schema.one_of).chain(&schema.any_of) {
        check_schema(document, child)?;
    }
    Ok(())
}

/// Checks one `$ref` string against the registered component schemas.
pub fn check_ref(document: &Document, reference: &str) -> Result<(), RefError> {
    let name = reference
        .strip_prefix(SCHEMA_REF_PREFIX)
        .ok_or_else(|| RefError::Malformed(reference.to_string()))?;

    if document.components.schemas.contains_key(name) {
        Ok(())
    } else {
        Err(RefError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi::{MediaType, Parameter, RequestBody, Response};
    use pretty_assertions::assert_eq;

    fn document() -> Document {
        let mut doc = Document::new();
        doc.info.title = "Pets".to_string();
        doc.info.version = "1.0".to_string();
        doc.components.schemas.insert("Pet".to_string(), Schema::typed("object"));
        doc
    }

    fn ok_response() -> Response {
        Response {
            description: "OK".to_string(),
            ..Default::default()
        }
    }

    fn attach(doc: &mut Document, path: &str, op: Operation) {
        doc.paths.entry(path.to_string()).or_default().get = Some(op);
    }

    fn operation_with_response(schema: Schema) -> Operation {
        let mut op = Operation::default();
        let mut response = ok_response();
        response
            .content
            .insert("application/json".to_string(), MediaType::with_schema(schema));
        op.responses.insert("200".to_string(), response);
        op
    }

    #[test]
    fn test_missing_title_then_version() {
        let mut doc = Document::new();
        assert_eq!(validate(&doc), Err(ValidationError::MissingTitle));
        doc.info.title = "T".to_string();
        assert_eq!(validate(&doc), Err(ValidationError::MissingVersion));
        doc.info.version = "1".to_string();
        assert_eq!(validate(&doc), Ok(()));
    }

    #[test]
    fn test_valid_references_pass() {
        let mut doc = document();
        attach(&mut doc, "/pets", operation_with_response(Schema::array(Schema::reference("Pet"))));
        assert_eq!(validate(&doc), Ok(()));
    }

    #[test]
    fn test_missing_response_schema() {
        let mut doc = document();
        attach(&mut doc, "/pets", operation_with_response(Schema::reference("Dog")));

        let err = validate(&doc).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidResponseRef {
                path: "/pets".to_string(),
                status: "200".to_string(),
                content_type: "application/json".to_string(),
                source: RefError::NotFound("Dog".to_string()),
            }
        );
        assert_eq!(
            err.to_string(),
            "invalid response schema reference (200, application/json) in /pets: schema 'Dog' not found"
        );
    }

    #[test]
    fn test_nested_reference_is_checked() {
        let mut doc = document();
        attach(&mut doc, "/pets", operation_with_response(Schema::array(Schema::reference("Dog"))));
        assert!(matches!(
            validate(&doc),
            Err(ValidationError::InvalidResponseRef { source: RefError::NotFound(ref name), .. }) if name == "Dog"
        ));
    }

    #[test]
    fn test_malformed_parameter_reference() {
        let mut doc = document();
        let mut op = operation_with_response(Schema::reference("Pet"));
        op.parameters.push(Parameter {
            name: "filter".to_string(),
            location: "query".to_string(),
            schema: Some(Schema {
                reference: Some("#/definitions/Pet".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });
        attach(&mut doc, "/pets", op);

        let err = validate(&doc).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid parameter schema reference in /pets: invalid schema reference format: #/definitions/Pet"
        );
    }

    #[test]
    fn test_request_body_checked_before_responses() {
        let mut doc = document();
        let mut op = operation_with_response(Schema::reference("Missing"));
        let mut body = RequestBody::default();
        body.content
            .insert("text/xml".to_string(), MediaType::with_schema(Schema::reference("Cat")));
        op.request_body = Some(body);
        attach(&mut doc, "/pets", op);

        assert_eq!(
            validate(&doc),
            Err(ValidationError::InvalidRequestBodyRef {
                path: "/pets".to_string(),
                content_type: "text/xml".to_string(),
                source: RefError::NotFound("Cat".to_string()),
            })
        );
    }

    #[test]
    fn test_empty_responses_fail() {
        let mut doc = document();
        attach(&mut doc, "/pets", Operation::default());
        assert_eq!(
            validate(&doc),
            Err(ValidationError::NoResponses {
                path: "/pets".to_string(),
                method: "GET".to_string(),
            })
        );
    }
}
