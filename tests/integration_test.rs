use openapi_from_comments::{
    config::ParserConfig,
    error::{RefError, ValidationError},
    openapi::{Document, Schema},
    openapi_builder::OpenApiBuilder,
    parser::AstParser,
    scanner::FileScanner,
    serializer::{serialize_json, serialize_yaml},
    validator,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

/// Helper function to create a temporary test project
fn create_test_project(files: Vec<(&str, &str)>) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    for (path, content) in files {
        let file_path = temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&file_path, content).expect("Failed to write test file");
    }

    temp_dir
}

fn petstore() -> TempDir {
    create_test_project(vec![
        ("service/main.go", include_str!("fixtures/petstore/main.go")),
        ("service/handlers/pets.go", include_str!("fixtures/petstore/handlers/pets.go")),
        ("service/models/pet.go", include_str!("fixtures/petstore/models/pet.go")),
        ("service/handlers/pets_test.go", "package handlers\n\n// @title Wrong\nfunc TestX() {}\n"),
        ("markdown/list_pets.md", "Lists every pet.\n\nSupports filtering by kind."),
        ("samples/list_pets.py", "requests.get('https://petstore.example.com/api/v1/pets')"),
    ])
}

/// Scans, parses and builds, the way the CLI does.
fn generate(root: &Path, config: ParserConfig) -> Document {
    let scan_result = FileScanner::new(root.join("service"))
        .with_parse_internal(config.parse_internal)
        .scan()
        .expect("Failed to scan directory");
    assert_eq!(scan_result.go_files.len(), 3, "test files must be skipped");

    let parsed: Vec<_> = AstParser::parse_files(&scan_result.go_files)
        .into_iter()
        .map(|r| r.expect("fixture parses"))
        .collect();

    let mut builder = OpenApiBuilder::new(config).expect("Failed to create builder");
    builder.add_files(&parsed);
    builder.build()
}

fn petstore_config(root: &Path) -> ParserConfig {
    ParserConfig::default()
        .with_markdown_files_dir(root.join("markdown"))
        .with_code_example_files_dir(root.join("samples"))
}

#[test]
fn test_petstore_end_to_end() {
    let project = petstore();
    let doc = generate(project.path(), petstore_config(project.path()));

    validator::validate(&doc).expect("petstore document validates");

    // General info
    assert_eq!(doc.info.title, "Petstore API");
    assert_eq!(doc.info.version, "1.2.0");
    assert_eq!(
        doc.info.description.as_deref(),
        Some("Manage pets and their owners.\nSecond paragraph of the description.")
    );
    assert_eq!(doc.info.license.as_ref().unwrap().identifier.as_deref(), Some("MIT"));
    assert_eq!(doc.servers[0].url, "https://petstore.example.com/api/v1");
    assert_eq!(doc.tags[0].name, "pets");
    let schemes = &doc.components.security_schemes;
    assert_eq!(schemes["ApiKeyAuth"].name.as_deref(), Some("X-API-Key"));
    assert_eq!(schemes["ApiKeyAuth"].location.as_deref(), Some("header"));
    assert_eq!(schemes["BasicAuth"].scheme.as_deref(), Some("basic"));

    // Paths
    assert_eq!(doc.paths.keys().collect::<Vec<_>>(), vec!["/pets", "/pets/{id}"]);
    let list = doc.paths["/pets"].get.as_ref().unwrap();
    assert_eq!(list.operation_id.as_deref(), Some("list-pets"));
    assert_eq!(list.description.as_deref(), Some("Lists every pet.\n\nSupports filtering by kind."));
    assert_eq!(list.tags, vec!["pets"]);
    assert_eq!(list.parameters.len(), 3);
    assert_eq!(
        list.parameters[0].schema.as_ref().unwrap().enum_values,
        vec![json!("dog"), json!("cat"), json!("bird")]
    );
    assert_eq!(list.parameters[1].schema.as_ref().unwrap().default, Some(json!(20)));
    assert_eq!(list.parameters[2].style.as_deref(), Some("form"));
    assert_eq!(list.parameters[2].explode, Some(false));
    assert_eq!(
        list.responses["200"].content["application/json"].schema,
        Some(Schema::array(Schema::reference("models.Pet")))
    );
    assert_eq!(
        list.responses["200"].headers["X-Total-Count"].schema,
        Some(Schema::formatted("integer", "int32"))
    );
    assert_eq!(list.security[0]["ApiKeyAuth"], Vec::<String>::new());
    assert_eq!(
        list.extensions["x-codeSamples"],
        json!([{"lang": "python", "source": "requests.get('https://petstore.example.com/api/v1/pets')"}])
    );

    let create = doc.paths["/pets"].post.as_ref().unwrap();
    let body = create.request_body.as_ref().unwrap();
    assert_eq!(body.content.keys().collect::<Vec<_>>(), vec!["application/json", "text/xml"]);
    assert_eq!(create.extensions["x-state"], json!("beta"));

    let delete = doc.paths["/pets/{id}"].delete.as_ref().unwrap();
    assert_eq!(delete.summary.as_deref(), Some("Delete a pet"));
    assert!(delete.deprecated);
    assert!(delete.responses["204"].content.is_empty());
}

#[test]
fn test_petstore_schemas() {
    let project = petstore();
    let doc = generate(project.path(), petstore_config(project.path()));
    let schemas = &doc.components.schemas;

    for name in ["Pet", "models.Pet", "Base", "Owner", "ErrorResponse", "handlers.ErrorResponse"] {
        assert!(schemas.contains_key(name), "missing schema {}", name);
    }
    assert!(!schemas.contains_key("Status"));

    let pet = &schemas["Pet"];
    assert_eq!(
        pet.description.as_deref(),
        Some("Pet is an animal in the store\nA pet that can be adopted")
    );
    assert_eq!(pet.all_of, vec![Schema::reference("Base")]);
    assert_eq!(
        pet.properties.keys().collect::<Vec<_>>(),
        vec!["name", "kind", "age", "tags", "owner", "attrs", "born"]
    );
    assert_eq!(pet.required, vec!["name"]);

    let name = &pet.properties["name"];
    assert_eq!(name.description.as_deref(), Some("Name shown to customers"));
    assert_eq!(name.example, Some(json!("Rex")));

    assert_eq!(
        pet.properties["kind"].enum_values,
        vec![json!("dog"), json!("cat"), json!("bird")]
    );
    assert_eq!(pet.properties["age"].minimum, Some(0.0));
    assert_eq!(pet.properties["age"].maximum, Some(30.0));
    assert_eq!(pet.properties["tags"].max_items, Some(5));
    assert_eq!(pet.properties["owner"], Schema::reference("Owner"));
    assert_eq!(pet.properties["attrs"].type_name(), Some("object"));
    assert_eq!(pet.properties["born"], Schema::formatted("string", "date-time"));

    assert!(schemas["Base"].properties["id"].read_only);

    let owner = &schemas["Owner"];
    assert_eq!(owner.required, vec!["fullName"]);
    assert_eq!(owner.properties["email"].format.as_deref(), Some("email"));
    assert_eq!(
        owner.properties["pets"],
        Schema::array(Schema::reference("Pet"))
    );
}

#[test]
fn test_petstore_tag_filter() {
    let project = petstore();
    let config = petstore_config(project.path()).with_tags("!admin");
    let doc = generate(project.path(), config);

    assert!(doc.paths.contains_key("/pets"));
    assert!(!doc.paths.contains_key("/pets/{id}"));
}

#[test]
fn test_petstore_serialization() {
    let project = petstore();
    let doc = generate(project.path(), petstore_config(project.path()));

    let json: Value = serde_json::from_str(&serialize_json(&doc).unwrap()).unwrap();
    assert_eq!(json["openapi"], "3.1.0");
    assert_eq!(json["paths"]["/pets"]["post"]["x-state"], "beta");
    assert_eq!(
        json["paths"]["/pets"]["get"]["responses"]["200"]["content"]["application/json"]["schema"],
        json!({"type": "array", "items": {"$ref": "#/components/schemas/models.Pet"}})
    );
    assert!(json["paths"]["/pets"]["get"].get("extensions").is_none());

    let yaml = serialize_yaml(&doc).unwrap();
    let from_yaml: Value = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(from_yaml["info"]["title"], "Petstore API");
}

#[test]
fn test_user_end_to_end_scenario() {
    let source = r#"package main

// @title Users
// @version 1.0

type User struct {
	ID   int `json:"id"`
	Name string
}

// @Summary Get user
// @Success 200 {object} User
// @Router /users/{id} [get]
func GetUser() {}
"#;

    let file = AstParser::parse_source(Path::new("main.go"), source).unwrap();
    let mut builder = OpenApiBuilder::new(ParserConfig::default()).unwrap();
    builder.add_file(&file);
    let doc = builder.build();

    let user = &doc.components.schemas["User"];
    assert_eq!(user.type_name(), Some("object"));
    assert_eq!(user.properties["id"], Schema::formatted("integer", "int32"));
    assert_eq!(user.properties["name"], Schema::typed("string"));
    assert!(user.required.is_empty());

    let get = doc.paths["/users/{id}"].get.as_ref().unwrap();
    assert_eq!(get.summary.as_deref(), Some("Get user"));
    assert_eq!(
        get.responses["200"].content["application/json"]
            .schema
            .as_ref()
            .unwrap()
            .reference
            .as_deref(),
        Some("#/components/schemas/User")
    );

    assert_eq!(validator::validate(&doc), Ok(()));
}

#[test]
fn test_accept_order_scenario() {
    let source = r#"package main

// @Param user body User true "desc"
// @Accept xml
// @Success 200 {object} User
// @Router /late [post]
func Late() {}

// @Accept xml
// @Param user body User true "desc"
// @Success 200 {object} User
// @Router /early [post]
func Early() {}
"#;

    let file = AstParser::parse_source(Path::new("main.go"), source).unwrap();
    let mut builder = OpenApiBuilder::new(ParserConfig::default()).unwrap();
    builder.add_file(&file);
    let doc = builder.build();

    let late = doc.paths["/late"].post.as_ref().unwrap().request_body.as_ref().unwrap();
    assert_eq!(late.content.keys().collect::<Vec<_>>(), vec!["text/xml"]);

    let early = doc.paths["/early"].post.as_ref().unwrap().request_body.as_ref().unwrap();
    assert_eq!(early.content.keys().collect::<Vec<_>>(), vec!["application/json"]);
}

#[test]
fn test_dangling_reference_fails_validation() {
    let source = r#"package main

// @title Broken
// @version 1.0
func main() {}

// Get godoc
// @Success 200 {object} DoesNotExist
// @Router /broken [get]
func Get() {}
"#;

    let file = AstParser::parse_source(Path::new("main.go"), source).unwrap();
    let mut builder = OpenApiBuilder::new(ParserConfig::default()).unwrap();
    builder.add_file(&file);
    let doc = builder.build();

    let err = validator::validate(&doc).unwrap_err();
    assert_eq!(
        err,
        ValidationError::InvalidResponseRef {
            path: "/broken".to_string(),
            status: "200".to_string(),
            content_type: "application/json".to_string(),
            source: RefError::NotFound("DoesNotExist".to_string()),
        }
    );
    assert!(err.to_string().contains("DoesNotExist"));
}

#[test]
fn test_overrides_file_replaces_types() {
    let project = create_test_project(vec![
        (
            "service/main.go",
            r#"package main

// @title Accounts
// @version 1.0
func main() {}

type Account struct {
	Balance sql.NullInt64 `json:"balance"`
	Created time.Time     `json:"created"`
}
"#,
        ),
        (".swaggo", r#"{"replace": {"NullInt64": "integer", "time.Time": "string"}}"#),
    ]);

    let config = ParserConfig::default().with_overrides_file(project.path().join(".swaggo"));
    let file = AstParser::parse_file(&project.path().join("service/main.go")).unwrap();
    let mut builder = OpenApiBuilder::new(config).unwrap();
    builder.add_file(&file);
    let doc = builder.build();

    let account = &doc.components.schemas["Account"];
    assert_eq!(account.properties["balance"], Schema::typed("integer"));
    assert_eq!(account.properties["created"], Schema::typed("string"));
}
