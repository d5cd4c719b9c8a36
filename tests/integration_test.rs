use openapi_from_comments::{
    cli::{self, CliArgs, OutputFormat},
    model::ParameterKind,
    parser::parse_package,
    resolver::{BodyShape, ResolvedPackage, Resolver, ResolverConfig},
    serializer::{serialize_json, serialize_yaml},
    type_resolver::{FieldKind, OpenApiType},
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Helper function to create a temporary Go package
fn create_test_package(files: Vec<(&str, &str)>) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    for (path, content) in files {
        std::fs::write(temp_dir.path().join(path), content).expect("Failed to write test file");
    }

    temp_dir
}

fn resolve_dir(temp_dir: &TempDir) -> ResolvedPackage {
    let (parsed, source) = parse_package(temp_dir.path()).expect("Failed to parse package");
    Resolver::new(&source.types)
        .with_inlines(&source.comments.func_inlines)
        .resolve(&parsed)
        .expect("Failed to resolve package")
}

fn resolve_fixture(name: &str, content: &str) -> ResolvedPackage {
    let temp_dir = create_test_package(vec![(name, content)]);
    resolve_dir(&temp_dir)
}

fn field_names(fields: &[openapi_from_comments::resolver::ResolvedField]) -> Vec<&str> {
    fields.iter().map(|f| f.name.as_str()).collect()
}

#[test]
fn test_petstore_api_info() {
    let resolved = resolve_fixture("petstore.go", include_str!("fixtures/petstore.go"));
    let api = &resolved.api;

    assert_eq!(resolved.package_name, "petstore");
    assert_eq!(api.title, "Pet Shop API");
    assert_eq!(api.version, "2.1.0");
    assert_eq!(
        api.description.as_deref(),
        Some("Manage the pets of a shop.\nSupports listing, lookup and adoption.")
    );
    assert_eq!(
        api.contact.as_ref().and_then(|c| c.email.as_deref()),
        Some("help@shop.example.com")
    );
    assert_eq!(
        api.license.as_ref().and_then(|l| l.name.as_deref()),
        Some("Apache-2.0")
    );
    assert_eq!(api.servers.len(), 1);
    assert_eq!(api.servers[0].url, "https://api.shop.example.com");
    assert_eq!(api.tags[0].name, "pets");

    let scheme = &api.security_schemes["apiKey"];
    assert_eq!(scheme.scheme_type, "apiKey");
    assert_eq!(scheme.location.as_deref(), Some("header"));
    assert_eq!(scheme.parameter_name.as_deref(), Some("X-API-Key"));
    assert_eq!(api.security[0][0].scheme_name, "apiKey");
    assert_eq!(api.default_content_type.as_deref(), Some("application/json"));
}

#[test]
fn test_petstore_schemas() {
    let resolved = resolve_fixture("petstore.go", include_str!("fixtures/petstore.go"));

    let names: Vec<&str> = resolved.schemas.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Audit", "Error", "NewPet", "Pet"]);

    let pet = &resolved.schemas["Pet"];
    assert_eq!(pet.description.as_deref(), Some("A pet in the shop"));
    assert_eq!(
        field_names(&pet.fields),
        vec![
            "createdAt",
            "updatedBy",
            "id",
            "name",
            "species",
            "age",
            "photo",
            "owner",
            "attributes",
            "vaccinations",
            "siblings",
        ]
    );
    assert!(pet
        .fields
        .iter()
        .all(|f| f.go_name != "SkippedField" && f.name != "WontBeUsed"));

    let created_at = &pet.fields[0];
    assert_eq!(created_at.description.as_deref(), Some("Creation time"));
    assert_eq!(created_at.format.as_deref(), Some("date-time"));
    assert!(!pet.fields[1].required);

    let id = &pet.fields[2];
    assert_eq!(id.kind, FieldKind::primitive(OpenApiType::Integer, Some("int64")));
    assert_eq!(id.example.as_deref(), Some("42"));
    assert!(id.required);

    let name = &pet.fields[3];
    assert_eq!(name.description.as_deref(), Some("Pet name"));
    assert_eq!((name.min_length, name.max_length), (Some(1), Some(64)));

    let species = &pet.fields[4];
    assert_eq!(species.enum_values, vec!["dog", "cat", "bird"]);
    assert_eq!(species.default.as_deref(), Some("dog"));

    let age = &pet.fields[5];
    assert!(age.nullable);
    assert_eq!(age.maximum, Some(40.0));

    assert_eq!(pet.fields[6].format.as_deref(), Some("uri"));
    assert_eq!(pet.fields[7].unresolved_struct(), Some("Owner"));
    assert_eq!(
        pet.fields[8].kind,
        FieldKind::Map {
            values: Box::new(FieldKind::AnyValue)
        }
    );

    let FieldKind::Array { items } = &pet.fields[9].kind else {
        panic!("vaccinations should be an array");
    };
    let FieldKind::InlineObject { fields } = items.as_ref() else {
        panic!("vaccinations should hold inline objects");
    };
    assert_eq!(field_names(fields), vec!["name", "date"]);

    assert_eq!(
        pet.fields[10].kind,
        FieldKind::Array {
            items: Box::new(FieldKind::SchemaRef {
                name: "Pet".to_string()
            })
        }
    );

    let error = &resolved.schemas["Error"];
    assert!(error.deprecated);
    assert_eq!(error.fields[0].format.as_deref(), Some("int32"));

    assert_eq!(
        cli::unresolved_structs(&resolved).into_iter().collect::<Vec<_>>(),
        vec!["Owner"]
    );
}

#[test]
fn test_petstore_endpoints() {
    let resolved = resolve_fixture("petstore.go", include_str!("fixtures/petstore.go"));

    let routes: Vec<(&str, &str)> = resolved
        .endpoints
        .iter()
        .map(|e| (e.method.as_str(), e.path.as_str()))
        .collect();
    assert_eq!(
        routes,
        vec![("GET", "/pets"), ("GET", "/pets/{id}"), ("POST", "/pets")]
    );

    let list = &resolved.endpoints[0];
    assert_eq!(list.operation_id.as_deref(), Some("listPets"));
    assert_eq!(list.tags, vec!["pets"]);
    assert!(Arc::ptr_eq(&list.query_params[0], &resolved.parameters["ListQuery"]));
    let ok = &list.responses["200"];
    let body = ok.body.as_ref().unwrap();
    assert_eq!(body.shape, BodyShape::Array);
    assert_eq!(body.element_type, "Pet");
    assert_eq!(ok.content_type.as_deref(), Some("application/json"));
    assert_eq!(ok.headers[0].name, "TraceHeaders");
    assert_eq!(ok.headers[0].fields[0].name, "X-Request-ID");

    let get = &resolved.endpoints[1];
    assert_eq!(get.params(ParameterKind::Path)[0].fields[0].name, "id");
    let not_found = &get.responses["404"];
    assert!(not_found.body.is_none());
    assert!(not_found.content_type.is_none());
    assert_eq!(not_found.description.as_deref(), Some("Not found"));

    let adopt = &resolved.endpoints[2];
    assert!(adopt.deprecated);
    assert_eq!(adopt.auth.as_deref(), Some("apiKey"));
    let request = adopt.request.as_ref().unwrap();
    assert_eq!(request.content_type, "application/xml");
    assert_eq!(request.body.element_type, "NewPet");
    assert_eq!(request.body.shape, BodyShape::Single);

    let limit = &resolved.parameters["ListQuery"].fields[0];
    assert_eq!(limit.name, "limit");
    assert_eq!(limit.default.as_deref(), Some("20"));
}

#[test]
fn test_generic_aliases() {
    let resolved = resolve_fixture("generics.go", include_str!("fixtures/generics.go"));

    let envelope = &resolved.schemas["Envelope"];
    assert!(envelope.is_generic);

    let account_envelope = &resolved.schemas["AccountEnvelope"];
    assert!(account_envelope.is_type_alias);
    assert_eq!(account_envelope.type_arg.as_deref(), Some("Account"));
    assert_eq!(account_envelope.description.as_deref(), Some("Standard envelope"));
    assert_eq!(field_names(&account_envelope.fields), vec!["ok", "data", "errors"]);
    assert_eq!(account_envelope.fields[1].description.as_deref(), Some("Payload"));
    assert_eq!(
        account_envelope.fields[1].kind,
        FieldKind::SchemaRef {
            name: "Account".to_string()
        }
    );

    let account_page = &resolved.schemas["AccountPage"];
    assert_eq!(account_page.description.as_deref(), Some("Accounts, paginated"));
    assert_eq!(
        account_page.fields[0].kind,
        FieldKind::Array {
            items: Box::new(FieldKind::SchemaRef {
                name: "Account".to_string()
            })
        }
    );

    let account = &resolved.schemas["Account"];
    assert_eq!(
        account.fields[2].kind,
        FieldKind::SchemaRef {
            name: "LimitPage".to_string()
        }
    );

    let emitted: Vec<&str> = resolved.component_schemas().map(|s| s.name.as_str()).collect();
    assert_eq!(
        emitted,
        vec!["Account", "AccountEnvelope", "AccountPage", "Limit", "LimitPage"]
    );

    let bind = resolved.endpoints[0].responses["200"]
        .body
        .as_ref()
        .and_then(|b| b.bind.as_ref())
        .unwrap();
    assert_eq!(bind.wrapper, "AccountEnvelope");
    assert_eq!(bind.field, "Data");
    assert!(bind.wrapper_schema.is_some());

    let map_body = resolved.endpoints[1].responses["200"].body.as_ref().unwrap();
    assert_eq!(map_body.shape, BodyShape::Map);
    assert_eq!(map_body.element_type, "Account");
}

#[test]
fn test_inline_declarations() {
    let resolved = resolve_fixture("inline.go", include_str!("fixtures/inline.go"));

    let create = &resolved.endpoints[0];
    assert_eq!(create.func_name, "CreateOrder");

    let path = &create.inline_params[&ParameterKind::Path];
    assert_eq!(path[0].name, "customerID");
    assert_eq!(path[0].format.as_deref(), Some("uuid"));
    assert_eq!(create.inline_params[&ParameterKind::Header][0].name, "Idempotency-Key");

    let request = create.inline_request.as_ref().unwrap();
    assert_eq!(request.content_type, "application/json");
    assert_eq!(request.description.as_deref(), Some("Order to place"));
    assert_eq!(field_names(&request.fields), vec!["lines", "note"]);
    assert_eq!(request.fields[0].min_items, Some(1));

    let created = &create.inline_responses["201"];
    assert_eq!(created.description.as_deref(), Some("Order placed"));
    assert_eq!(created.headers[0].name, "Quota");
    assert_eq!(created.bind.as_ref().map(|b| b.wrapper.as_str()), Some("Result"));
    assert_eq!(created.fields[1].format.as_deref(), Some("date-time"));

    let invalid = &create.inline_responses["422"];
    assert_eq!(
        invalid.fields[0].kind,
        FieldKind::Array {
            items: Box::new(FieldKind::SchemaRef {
                name: "Problem".to_string()
            })
        }
    );

    let search = &resolved.endpoints[1];
    let query = &search.inline_params[&ParameterKind::Query];
    assert_eq!(field_names(query), vec!["limit", "status", "Since"]);
    assert_eq!(query[0].maximum, Some(50.0));
    assert!(query[2].nullable);
    assert!(search.inline_responses.contains_key("200"));
    assert!(search.responses.is_empty());
}

#[test]
fn test_package_spread_over_files() {
    let temp_dir = create_test_package(vec![
        (
            "doc.go",
            "// @api { @title Split @version 1 }\npackage split\n",
        ),
        (
            "models.go",
            r#"package split

// User is a user.
// @schema
type User struct {
	// @field { @description Login name }
	Login string `json:"login"`
}
"#,
        ),
        (
            "handlers.go",
            r#"package split

// GetUser returns a user.
// @endpoint GET /user {
//   @response 200 {
//     @body User
//   }
// }
func GetUser() {}
"#,
        ),
        ("handlers_test.go", "package split_test\n"),
    ]);

    let resolved = resolve_dir(&temp_dir);
    assert_eq!(resolved.api.title, "Split");
    assert_eq!(
        resolved.schemas["User"].fields[0].description.as_deref(),
        Some("Login name")
    );
    assert_eq!(resolved.endpoints.len(), 1);
}

#[test]
fn test_custom_resolver_config() {
    let temp_dir = create_test_package(vec![(
        "api.go",
        r#"// @api { @title Tags @version 1 }
package tags

// Item uses yaml tags.
// @schema
type Item struct {
	Name string `json:"name" yaml:"item_name"`
}

// GetItem returns an item.
// @endpoint GET /item {
//   @response 200 {
//     @body Item
//   }
// }
func GetItem() {}
"#,
    )]);

    let (parsed, source) = parse_package(temp_dir.path()).unwrap();
    let config = ResolverConfig {
        name_tags: vec!["yaml".to_string()],
        default_content_type: "application/yaml".to_string(),
    };
    let resolved = Resolver::new(&source.types)
        .with_config(config)
        .resolve(&parsed)
        .unwrap();

    assert_eq!(resolved.schemas["Item"].fields[0].name, "item_name");
    assert_eq!(
        resolved.endpoints[0].responses["200"].content_type.as_deref(),
        Some("application/yaml")
    );
}

#[test]
fn test_missing_api_annotation() {
    let temp_dir = create_test_package(vec![("api.go", "// Package api has no annotations.\npackage api\n")]);

    let err = parse_package(temp_dir.path()).unwrap_err();
    assert_eq!(err.to_string(), "package comment at api.go:1:1 has no @api annotation");
}

#[test]
fn test_grammar_error_names_declaration() {
    let temp_dir = create_test_package(vec![(
        "user.go",
        r#"// @api { @title Broken @version 1 }
package broken

// User is a user.
// @schema
type User struct {
	// @field { @bogus value }
	Email string `json:"email"`
}
"#,
    )]);

    let err = parse_package(temp_dir.path()).unwrap_err();
    let message = err.to_string();
    assert!(
        message.starts_with("failed to parse @field for User.Email (user.go:7:2)"),
        "{}",
        message
    );
    assert!(message.contains("unknown annotation @bogus in @field"), "{}", message);
}

#[test]
fn test_schema_on_non_struct_fails_resolution() {
    let temp_dir = create_test_package(vec![(
        "status.go",
        r#"// @api { @title Status @version 1 }
package status

// Status is a string.
// @schema
type Status string
"#,
    )]);

    let (parsed, source) = parse_package(temp_dir.path()).unwrap();
    let err = Resolver::new(&source.types).resolve(&parsed).unwrap_err();
    assert_eq!(
        err.to_string(),
        "failed to resolve schema Status: Status is not a struct"
    );
}

#[test]
fn test_empty_package_directory() {
    let temp_dir = create_test_package(vec![("README.md", "# nothing here")]);

    let err = parse_package(temp_dir.path()).unwrap_err();
    assert!(err.to_string().contains("no Go source files found"), "{}", err);
}

#[test]
fn test_yaml_serialization_format() {
    let resolved = resolve_fixture("petstore.go", include_str!("fixtures/petstore.go"));
    let yaml = serialize_yaml(&resolved).unwrap();

    assert!(yaml.contains("title: Pet Shop API"));
    assert!(yaml.contains("kind: schema_ref"));
    assert!(yaml.contains("kind: unresolved_struct"));
    assert!(yaml.contains("shape: array"));
}

#[test]
fn test_json_serialization_format() {
    let resolved = resolve_fixture("petstore.go", include_str!("fixtures/petstore.go"));
    let json = serialize_json(&resolved).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["schemas"]["Pet"]["fields"][2]["kind"]["type"], "integer");
    assert_eq!(value["endpoints"][0]["query_params"], serde_json::json!(["ListQuery"]));
    assert_eq!(
        value["endpoints"][0]["responses"]["200"]["headers"],
        serde_json::json!(["TraceHeaders"])
    );
}

#[test]
fn test_cli_run_writes_output() {
    let package = create_test_package(vec![("petstore.go", include_str!("fixtures/petstore.go"))]);
    let output_dir = TempDir::new().unwrap();
    let output_path = output_dir.path().join("out").join("resolved.json");

    let args = CliArgs {
        package_path: package.path().to_path_buf(),
        output_format: OutputFormat::Json,
        output_path: Some(output_path.clone()),
        name_tags: vec![],
        default_content_type: "json".to_string(),
        verbose: false,
    };
    cli::run(args).unwrap();

    let written = std::fs::read_to_string(&output_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(value["package_name"], "petstore");
}

#[test]
fn test_cli_rejects_file_as_package() {
    let package = create_test_package(vec![("api.go", "package api\n")]);
    let args = CliArgs {
        package_path: PathBuf::from(package.path().join("api.go")),
        output_format: OutputFormat::Yaml,
        output_path: None,
        name_tags: vec![],
        default_content_type: "json".to_string(),
        verbose: false,
    };

    let err = cli::parse_args_from_parsed(args).unwrap_err();
    assert!(err.to_string().contains("not a directory"));
}
