//! Classification of Go field types into OpenAPI shapes.
//!
//! [`TypeResolver`] maps a [`GoType`] to a [`FieldKind`] and turns struct
//! field lists into [`ResolvedField`]s, applying the tag naming rules. It sees
//! the package only through [`TypeSystem`], caches every classification by
//! the type's Go spelling and cuts cycles through non-struct named types.

use crate::model::{Field, ParameterKind, Schema};
use crate::resolver::model::ResolvedField;
use crate::types::{BasicKind, GoType, StructField, TypeSystem};
use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Naming tags tried in order when no other list is configured.
pub const DEFAULT_NAME_TAGS: [&str; 2] = ["json", "xml"];

/// JSON Schema primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenApiType {
    String,
    Integer,
    Number,
    Boolean,
}

impl OpenApiType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenApiType::String => "string",
            OpenApiType::Integer => "integer",
            OpenApiType::Number => "number",
            OpenApiType::Boolean => "boolean",
        }
    }
}

/// How a field's type is represented, exactly one outcome per field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Primitive {
        #[serde(rename = "type")]
        openapi_type: OpenApiType,
        #[serde(skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    /// A declared `@schema` struct
    SchemaRef { name: String },
    Array { items: Box<FieldKind> },
    /// An object with string keys, `additionalProperties` of `values`
    Map { values: Box<FieldKind> },
    /// An anonymous struct, emitted as a nested object
    InlineObject { fields: Vec<ResolvedField> },
    /// Accepts any JSON value
    #[default]
    AnyValue,
    /// A named struct that is not declared as a schema
    UnresolvedStruct { name: String },
}

impl FieldKind {
    pub fn primitive(openapi_type: OpenApiType, format: Option<&str>) -> Self {
        FieldKind::Primitive {
            openapi_type,
            format: format.map(str::to_string),
        }
    }

    pub fn string() -> Self {
        FieldKind::primitive(OpenApiType::String, None)
    }

    fn array(items: FieldKind) -> Self {
        FieldKind::Array {
            items: Box::new(items),
        }
    }

    /// Format implied by the type itself, e.g. `int64` or `date-time`.
    pub fn format(&self) -> Option<&str> {
        match self {
            FieldKind::Primitive { format, .. } => format.as_deref(),
            _ => None,
        }
    }

    /// The first undeclared struct referenced anywhere inside this kind.
    pub fn unresolved_struct(&self) -> Option<&str> {
        match self {
            FieldKind::UnresolvedStruct { name } => Some(name),
            FieldKind::Array { items } => items.unresolved_struct(),
            FieldKind::Map { values } => values.unresolved_struct(),
            FieldKind::InlineObject { fields } => {
                fields.iter().find_map(ResolvedField::unresolved_struct)
            }
            _ => None,
        }
    }
}

/// Which tag supplies a field's serialized name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldNaming {
    /// Body fields: the configured naming tags in order, then the Go name
    Body,
    /// Parameter fields: the tag of the parameter kind, then the Go name
    Parameter(ParameterKind),
}

/// Classifies Go types against one package. Scoped to a single resolution.
pub struct TypeResolver<'t> {
    types: &'t dyn TypeSystem,
    /// Names declared with `@schema`
    schema_names: BTreeSet<String>,
    /// Generic instantiation text (whitespace removed) to the alias naming it
    instantiations: HashMap<String, String>,
    /// `@field` annotations of each schema, used for flattened embedded structs
    annotations: HashMap<String, Vec<Field>>,
    name_tags: Vec<String>,
    /// Classifications keyed by the type's Go spelling
    cache: HashMap<String, FieldKind>,
    /// Types being classified, to detect cycles
    resolving: HashSet<String>,
}

impl<'t> TypeResolver<'t> {
    pub fn new(types: &'t dyn TypeSystem) -> Self {
        Self {
            types,
            schema_names: BTreeSet::new(),
            instantiations: HashMap::new(),
            annotations: HashMap::new(),
            name_tags: DEFAULT_NAME_TAGS.iter().map(|t| t.to_string()).collect(),
            cache: HashMap::new(),
            resolving: HashSet::new(),
        }
    }

    pub fn with_name_tags(mut self, tags: &[String]) -> Self {
        self.name_tags = tags.to_vec();
        self
    }

    /// Registers a `@schema`, making fields of its type schema references.
    pub fn declare_schema(&mut self, schema: &Schema) {
        self.schema_names.insert(schema.name.clone());
        if let Some(alias_of) = schema.alias_of.as_deref().filter(|_| schema.is_type_alias) {
            self.instantiations
                .insert(normalize(alias_of), schema.name.clone());
        }
        self.annotations
            .insert(schema.name.clone(), schema.fields.clone());
        self.cache.clear();
    }

    pub fn is_schema(&self, name: &str) -> bool {
        self.schema_names.contains(name)
    }

    /// Number of cached classifications.
    pub fn cached_types(&self) -> usize {
        self.cache.len()
    }

    /// Classifies a field type. The flag is true when a pointer was unwrapped.
    pub fn classify(&mut self, ty: &GoType) -> (FieldKind, bool) {
        match ty {
            GoType::Pointer(inner) => (self.classify_value(inner), true),
            other => (self.classify_value(other), false),
        }
    }

    fn classify_value(&mut self, ty: &GoType) -> FieldKind {
        let key = ty.to_string();

        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        if self.resolving.contains(&key) {
            warn!("Cyclic type {} detected, treating as string", key);
            return FieldKind::string();
        }

        self.resolving.insert(key.clone());
        let kind = match ty {
            GoType::Basic(kind) => basic_kind(*kind),
            GoType::Pointer(inner) => self.classify_value(inner),
            GoType::Slice(elem) | GoType::Array { elem, .. } => {
                FieldKind::array(self.classify_value(elem))
            }
            GoType::Map { value, .. } => FieldKind::Map {
                values: Box::new(self.classify_value(value)),
            },
            GoType::Struct(fields) => FieldKind::InlineObject {
                fields: self.resolve_fields(fields, FieldNaming::Body, &[]),
            },
            GoType::Interface => FieldKind::AnyValue,
            GoType::TypeParam(name) => {
                debug!("Unbound type parameter {}, treating as string", name);
                FieldKind::string()
            }
            GoType::Other(text) => {
                debug!("Type {} has no JSON shape, treating as string", text);
                FieldKind::string()
            }
            GoType::Named {
                package: Some(package),
                name,
                ..
            } => special_type(package, name).unwrap_or_else(|| {
                debug!("External type {}.{}, treating as string", package, name);
                FieldKind::string()
            }),
            GoType::Named {
                package: None,
                name,
                args,
            } => self.classify_named(name, args, ty),
        };
        self.resolving.remove(&key);

        self.cache.insert(key, kind.clone());
        kind
    }

    fn classify_named(&mut self, name: &str, args: &[GoType], ty: &GoType) -> FieldKind {
        let Some(decl) = self.types.lookup(name) else {
            warn!("Unknown type {}, treating as string", ty);
            return FieldKind::string();
        };
        let decl = decl.clone();

        match self.types.underlying(ty) {
            Some(GoType::Struct(_)) => {
                if !args.is_empty() {
                    match self.instantiations.get(&normalize(&ty.to_string())) {
                        Some(alias) => FieldKind::SchemaRef {
                            name: alias.clone(),
                        },
                        None => FieldKind::UnresolvedStruct {
                            name: ty.to_string(),
                        },
                    }
                } else if self.schema_names.contains(name) {
                    FieldKind::SchemaRef {
                        name: name.to_string(),
                    }
                } else if decl.is_alias {
                    self.classify_value(&decl.ty)
                } else {
                    debug!("Struct {} is not declared as a schema", name);
                    FieldKind::UnresolvedStruct {
                        name: name.to_string(),
                    }
                }
            }
            Some(other) => self.classify_value(&other),
            // Defined on top of an external type, e.g. `type Stamp time.Time`
            None => self.classify_value(&decl.instantiate(args)),
        }
    }

    /// Resolves the exported fields of a struct in declaration order.
    ///
    /// Fields omitted by a `-` tag are dropped. Embedded structs without an
    /// explicit name are flattened into the parent for body naming. Each
    /// field's `@field` annotation in `annotations` (matched by Go name)
    /// overrides the classified values.
    pub fn resolve_fields(
        &mut self,
        fields: &[StructField],
        naming: FieldNaming,
        annotations: &[Field],
    ) -> Vec<ResolvedField> {
        let mut resolved = Vec::with_capacity(fields.len());

        for field in fields {
            if !field.is_exported() {
                debug!("Skipping unexported field {}", field.name);
                continue;
            }

            if field.embedded && naming == FieldNaming::Body && !self.has_explicit_name(field) {
                if let Some(promoted) = self.embedded_fields(field) {
                    resolved.extend(promoted);
                    continue;
                }
            }

            let Some(name) = self.field_name(field, naming) else {
                debug!("Field {} omitted by its tag", field.name);
                continue;
            };

            let (kind, nullable) = self.classify(&field.ty);
            let mut out = ResolvedField {
                name,
                go_name: field.name.clone(),
                go_type: field.ty.to_string(),
                format: kind.format().map(str::to_string),
                kind,
                required: !field.tag.contains("omitempty"),
                nullable,
                ..ResolvedField::default()
            };
            if let Some(annotation) = annotations.iter().find(|a| a.go_name == field.name) {
                out.apply_annotation(annotation);
            }
            resolved.push(out);
        }

        resolved
    }

    /// Serialized name of a field, `None` when its tag omits it.
    pub fn field_name(&self, field: &StructField, naming: FieldNaming) -> Option<String> {
        match naming {
            FieldNaming::Body => {
                for key in &self.name_tags {
                    let Some(value) = field.tag_value(key).filter(|v| !v.is_empty()) else {
                        continue;
                    };
                    if value == "-" {
                        return None;
                    }
                    let name = value.split(',').next().unwrap_or_default();
                    if !name.is_empty() {
                        return Some(name.to_string());
                    }
                }
                Some(field.name.clone())
            }
            FieldNaming::Parameter(kind) => {
                let value = field.tag_value(kind.tag_key()).unwrap_or_default();
                match value.split(',').next().unwrap_or_default() {
                    "" | "-" => Some(field.name.clone()),
                    name => Some(name.to_string()),
                }
            }
        }
    }

    fn has_explicit_name(&self, field: &StructField) -> bool {
        self.name_tags.iter().any(|key| {
            field
                .tag_value(key)
                .is_some_and(|v| !v.split(',').next().unwrap_or_default().is_empty())
        })
    }

    /// Fields promoted from an embedded struct of this package.
    fn embedded_fields(&mut self, field: &StructField) -> Option<Vec<ResolvedField>> {
        let inner = match &field.ty {
            GoType::Pointer(inner) => inner.as_ref(),
            other => other,
        };
        let GoType::Named {
            package: None,
            name,
            ..
        } = inner
        else {
            return None;
        };
        let Some(GoType::Struct(fields)) = self.types.underlying(inner) else {
            return None;
        };

        let key = format!("embedded {}", inner);
        if !self.resolving.insert(key.clone()) {
            warn!("Embedded struct {} contains itself, skipping", inner);
            return Some(Vec::new());
        }
        let annotations = self.annotations.get(name).cloned().unwrap_or_default();
        let promoted = self.resolve_fields(&fields, FieldNaming::Body, &annotations);
        self.resolving.remove(&key);

        debug!("Flattened {} fields of embedded {}", promoted.len(), inner);
        Some(promoted)
    }
}

fn basic_kind(kind: BasicKind) -> FieldKind {
    match kind {
        BasicKind::Bool => FieldKind::primitive(OpenApiType::Boolean, None),
        BasicKind::Int | BasicKind::Int8 | BasicKind::Int16 => {
            FieldKind::primitive(OpenApiType::Integer, None)
        }
        BasicKind::Int32 => FieldKind::primitive(OpenApiType::Integer, Some("int32")),
        BasicKind::Int64 => FieldKind::primitive(OpenApiType::Integer, Some("int64")),
        BasicKind::Uint
        | BasicKind::Uint8
        | BasicKind::Uint16
        | BasicKind::Uint32
        | BasicKind::Uint64 => FieldKind::primitive(OpenApiType::Integer, None),
        BasicKind::Float32 => FieldKind::primitive(OpenApiType::Number, Some("float")),
        BasicKind::Float64 => FieldKind::primitive(OpenApiType::Number, Some("double")),
        BasicKind::String | BasicKind::Uintptr | BasicKind::Complex64 | BasicKind::Complex128 => {
            FieldKind::string()
        }
    }
}

/// Standard library types with a fixed scalar representation.
fn special_type(package: &str, name: &str) -> Option<FieldKind> {
    let kind = match (package, name) {
        ("time", "Time") => FieldKind::primitive(OpenApiType::String, Some("date-time")),
        ("net/url", "URL") => FieldKind::primitive(OpenApiType::String, Some("uri")),
        ("net/netip", "Addr" | "AddrPort" | "Prefix")
        | ("math/big", "Int" | "Float" | "Rat")
        | ("regexp", "Regexp") => FieldKind::string(),
        _ => return None,
    };
    Some(kind)
}

fn normalize(type_text: &str) -> String {
    type_text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PackageTypes, TypeDecl};
    use pretty_assertions::assert_eq;

    fn string() -> GoType {
        GoType::Basic(BasicKind::String)
    }

    fn package() -> PackageTypes {
        [
            TypeDecl::defined(
                "User",
                GoType::Struct(vec![
                    StructField::new("ID", string(), r#"json:"id""#),
                    StructField::new("Manager", GoType::pointer(GoType::named("User")), r#"json:"manager,omitempty""#),
                ]),
            ),
            TypeDecl::defined(
                "Audit",
                GoType::Struct(vec![
                    StructField::new("CreatedBy", string(), r#"json:"createdBy""#),
                    StructField::new("note", string(), ""),
                ]),
            ),
            TypeDecl::defined(
                "Page",
                GoType::Struct(vec![StructField::new(
                    "Items",
                    GoType::slice(GoType::TypeParam("T".to_string())),
                    r#"json:"items""#,
                )]),
            )
            .with_type_params(&["T"]),
            TypeDecl::alias(
                "UserPage",
                GoType::Named {
                    package: None,
                    name: "Page".to_string(),
                    args: vec![GoType::named("User")],
                },
            ),
            TypeDecl::alias("Person", GoType::named("User")),
            TypeDecl::defined("Status", string()),
            TypeDecl::defined("Stamp", GoType::qualified("time", "Time")),
            TypeDecl::defined("List", GoType::slice(GoType::named("List"))),
        ]
        .into_iter()
        .collect()
    }

    fn schema(name: &str) -> Schema {
        Schema {
            name: name.to_string(),
            ..Schema::default()
        }
    }

    fn resolver(types: &PackageTypes) -> TypeResolver<'_> {
        let mut resolver = TypeResolver::new(types);
        resolver.declare_schema(&schema("User"));
        resolver.declare_schema(&Schema {
            is_type_alias: true,
            alias_of: Some("Page[User]".to_string()),
            ..schema("UserPage")
        });
        resolver
    }

    #[test]
    fn test_basic_kinds() {
        let types = package();
        let mut resolver = resolver(&types);

        let cases = [
            (BasicKind::Bool, FieldKind::primitive(OpenApiType::Boolean, None)),
            (BasicKind::Int, FieldKind::primitive(OpenApiType::Integer, None)),
            (BasicKind::Int32, FieldKind::primitive(OpenApiType::Integer, Some("int32"))),
            (BasicKind::Int64, FieldKind::primitive(OpenApiType::Integer, Some("int64"))),
            (BasicKind::Uint64, FieldKind::primitive(OpenApiType::Integer, None)),
            (BasicKind::Float32, FieldKind::primitive(OpenApiType::Number, Some("float"))),
            (BasicKind::Float64, FieldKind::primitive(OpenApiType::Number, Some("double"))),
            (BasicKind::Complex128, FieldKind::string()),
        ];
        for (basic, expected) in cases {
            assert_eq!(resolver.classify(&GoType::Basic(basic)), (expected, false), "{:?}", basic);
        }
    }

    #[test]
    fn test_pointer_is_nullable() {
        let types = package();
        let mut resolver = resolver(&types);

        let (kind, nullable) = resolver.classify(&GoType::pointer(GoType::named("User")));
        assert_eq!(kind, FieldKind::SchemaRef { name: "User".to_string() });
        assert!(nullable);
    }

    #[test]
    fn test_special_standard_types() {
        let types = package();
        let mut resolver = resolver(&types);

        let (time, _) = resolver.classify(&GoType::qualified("time", "Time"));
        assert_eq!(time.format(), Some("date-time"));
        let (url, nullable) = resolver.classify(&GoType::pointer(GoType::qualified("net/url", "URL")));
        assert_eq!(url.format(), Some("uri"));
        assert!(nullable);
        let (big, _) = resolver.classify(&GoType::qualified("math/big", "Int"));
        assert_eq!(big, FieldKind::string());
        let (external, _) = resolver.classify(&GoType::qualified("github.com/google/uuid", "UUID"));
        assert_eq!(external, FieldKind::string());

        // A defined type over an external one follows it.
        let (stamp, _) = resolver.classify(&GoType::named("Stamp"));
        assert_eq!(stamp.format(), Some("date-time"));
    }

    #[test]
    fn test_named_structs() {
        let types = package();
        let mut resolver = resolver(&types);

        let (audit, _) = resolver.classify(&GoType::named("Audit"));
        assert_eq!(audit, FieldKind::UnresolvedStruct { name: "Audit".to_string() });

        let (person, _) = resolver.classify(&GoType::named("Person"));
        assert_eq!(person, FieldKind::SchemaRef { name: "User".to_string() });

        let (status, _) = resolver.classify(&GoType::named("Status"));
        assert_eq!(status, FieldKind::string());

        let (missing, _) = resolver.classify(&GoType::named("Missing"));
        assert_eq!(missing, FieldKind::string());
    }

    #[test]
    fn test_generic_instantiation_resolves_to_alias() {
        let types = package();
        let mut resolver = resolver(&types);

        let page_of_user = GoType::Named {
            package: None,
            name: "Page".to_string(),
            args: vec![GoType::named("User")],
        };
        let (kind, _) = resolver.classify(&page_of_user);
        assert_eq!(kind, FieldKind::SchemaRef { name: "UserPage".to_string() });

        let page_of_string = GoType::Named {
            package: None,
            name: "Page".to_string(),
            args: vec![string()],
        };
        let (kind, _) = resolver.classify(&page_of_string);
        assert_eq!(kind, FieldKind::UnresolvedStruct { name: "Page[string]".to_string() });
    }

    #[test]
    fn test_containers() {
        let types = package();
        let mut resolver = resolver(&types);

        let (kind, _) = resolver.classify(&GoType::slice(GoType::pointer(GoType::named("User"))));
        assert_eq!(
            kind,
            FieldKind::Array {
                items: Box::new(FieldKind::SchemaRef { name: "User".to_string() })
            }
        );

        let (kind, _) = resolver.classify(&GoType::map(string(), GoType::Interface));
        assert_eq!(kind, FieldKind::Map { values: Box::new(FieldKind::AnyValue) });

        let (kind, _) = resolver.classify(&GoType::slice(GoType::named("Audit")));
        assert_eq!(kind.unresolved_struct(), Some("Audit"));
    }

    #[test]
    fn test_anonymous_struct_inlines_fields() {
        let types = package();
        let mut resolver = resolver(&types);

        let anonymous = GoType::slice(GoType::Struct(vec![
            StructField::new("Street", string(), r#"json:"street""#),
            StructField::new("Zip", GoType::pointer(string()), r#"json:"zip,omitempty""#),
        ]));
        let (kind, _) = resolver.classify(&anonymous);

        let FieldKind::Array { items } = kind else {
            panic!("expected array, got {:?}", kind);
        };
        let FieldKind::InlineObject { fields } = *items else {
            panic!("expected inline object");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "street");
        assert!(fields[0].required);
        assert_eq!(fields[1].name, "zip");
        assert!(fields[1].nullable);
        assert!(!fields[1].required);
    }

    #[test]
    fn test_cyclic_named_type_terminates() {
        let types = package();
        let mut resolver = resolver(&types);

        let (kind, _) = resolver.classify(&GoType::named("List"));
        assert_eq!(kind, FieldKind::array(FieldKind::string()));
    }

    #[test]
    fn test_classification_caching() {
        let types = package();
        let mut resolver = resolver(&types);

        let first = resolver.classify(&GoType::slice(GoType::named("User")));
        let cached = resolver.cached_types();
        assert!(cached >= 2);

        let second = resolver.classify(&GoType::slice(GoType::named("User")));
        assert_eq!(first, second);
        assert_eq!(resolver.cached_types(), cached);
    }

    #[test]
    fn test_body_name_fallback_chain() {
        let types = package();
        let resolver = resolver(&types);
        let name = |tag: &str| {
            resolver.field_name(&StructField::new("Email", string(), tag), FieldNaming::Body)
        };

        assert_eq!(name(r#"json:"email""#), Some("email".to_string()));
        assert_eq!(name(r#"json:"email,omitempty""#), Some("email".to_string()));
        assert_eq!(name(r#"json:",omitempty" xml:"mail""#), Some("mail".to_string()));
        assert_eq!(name(r#"json:",omitempty""#), Some("Email".to_string()));
        assert_eq!(name(r#"json:"-""#), None);
        assert_eq!(name(r#"xml:"-""#), None);
        assert_eq!(name(r#"json:"-" xml:"WontBeUsed""#), None);
        assert_eq!(name(r#"json:"-,""#), Some("-".to_string()));
        assert_eq!(name(""), Some("Email".to_string()));
    }

    #[test]
    fn test_custom_name_tags() {
        let types = package();
        let resolver = TypeResolver::new(&types).with_name_tags(&["yaml".to_string()]);
        let field = StructField::new("Email", string(), r#"json:"email" yaml:"e_mail""#);
        assert_eq!(resolver.field_name(&field, FieldNaming::Body), Some("e_mail".to_string()));
    }

    #[test]
    fn test_parameter_names_use_kind_tag() {
        let types = package();
        let resolver = resolver(&types);
        let naming = FieldNaming::Parameter(ParameterKind::Query);

        let limit = StructField::new("Limit", GoType::Basic(BasicKind::Int), r#"query:"limit" json:"max""#);
        assert_eq!(resolver.field_name(&limit, naming), Some("limit".to_string()));
        let untagged = StructField::new("Offset", GoType::Basic(BasicKind::Int), r#"json:"offset""#);
        assert_eq!(resolver.field_name(&untagged, naming), Some("Offset".to_string()));
        let dashed = StructField::new("Sort", string(), r#"query:"-""#);
        assert_eq!(resolver.field_name(&dashed, naming), Some("Sort".to_string()));
    }

    #[test]
    fn test_resolve_fields_with_annotations_and_embedding() {
        let types = package();
        let mut resolver = resolver(&types);
        resolver.declare_schema(&Schema {
            fields: vec![Field {
                go_name: "CreatedBy".to_string(),
                description: Some("Creator".to_string()),
                ..Field::default()
            }],
            ..schema("Audit")
        });

        let fields = vec![
            StructField::new("ID", string(), r#"json:"id""#),
            StructField::new("secret", string(), r#"json:"secret""#),
            StructField::new("Internal", string(), r#"json:"-""#),
            StructField {
                embedded: true,
                ..StructField::new("Audit", GoType::named("Audit"), "")
            },
            StructField::new("Count", GoType::Basic(BasicKind::Int64), r#"json:"count,omitempty""#),
        ];
        let annotations = vec![Field {
            go_name: "Count".to_string(),
            minimum: Some(0.0),
            format: Some("int32".to_string()),
            ..Field::default()
        }];

        let resolved = resolver.resolve_fields(&fields, FieldNaming::Body, &annotations);
        let names: Vec<&str> = resolved.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "createdBy", "count"]);

        assert_eq!(resolved[1].description.as_deref(), Some("Creator"));
        assert_eq!(resolved[2].go_type, "int64");
        assert_eq!(resolved[2].format.as_deref(), Some("int32"));
        assert_eq!(resolved[2].minimum, Some(0.0));
        assert!(!resolved[2].required);
    }

    #[test]
    fn test_tagged_embedded_struct_is_a_field() {
        let types = package();
        let mut resolver = resolver(&types);

        let fields = vec![StructField {
            embedded: true,
            ..StructField::new("User", GoType::pointer(GoType::named("User")), r#"json:"user""#)
        }];
        let resolved = resolver.resolve_fields(&fields, FieldNaming::Body, &[]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "user");
        assert_eq!(resolved[0].kind, FieldKind::SchemaRef { name: "User".to_string() });
        assert!(resolved[0].nullable);
    }
}
