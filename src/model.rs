//! Parsed package model.
//!
//! These types hold what the annotations say, with no knowledge of Go types:
//! references are plain names and bodies are type text such as `[]User`.
//! The [`resolver`](crate::resolver) turns them into typed objects.

use log::warn;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// The parser's complete output for one package.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedPackage {
    pub package_name: String,
    pub api: ApiInfo,
    /// `@schema` structs and generic aliases, keyed by type name
    pub schemas: BTreeMap<String, Schema>,
    /// `@path`/`@query`/`@header`/`@cookie` structs, keyed by type name
    pub parameters: BTreeMap<String, Parameter>,
    /// `@endpoint` functions in source order
    pub endpoints: Vec<Endpoint>,
}

/// The package-level `@api` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    pub terms_of_service: Option<String>,
    pub contact: Option<Contact>,
    pub license: Option<License>,
    pub servers: Vec<Server>,
    pub security_schemes: BTreeMap<String, SecurityScheme>,
    /// Alternatives; each inner list must be satisfied together
    pub security: Vec<Vec<SecurityRequirement>>,
    pub tags: Vec<Tag>,
    pub default_content_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct License {
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Server {
    pub url: String,
    pub description: Option<String>,
}

/// A named security scheme, e.g. `@securityScheme bearerAuth { @type http @scheme bearer }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecurityScheme {
    pub name: String,
    /// http, apiKey, oauth2 or openIdConnect
    #[serde(rename = "type")]
    pub scheme_type: String,
    pub scheme: Option<String>,
    pub bearer_format: Option<String>,
    /// header, query or cookie, for apiKey schemes
    #[serde(rename = "in")]
    pub location: Option<String>,
    /// Header, query or cookie name, for apiKey schemes
    pub parameter_name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecurityRequirement {
    pub scheme_name: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub name: String,
    pub description: Option<String>,
}

/// A `@schema` struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub name: String,
    pub description: Option<String>,
    pub deprecated: bool,
    /// `@field` annotations, one per annotated Go field
    pub fields: Vec<Field>,
    /// Declares type parameters and is only a template
    pub is_generic: bool,
    pub is_type_alias: bool,
    /// Alias target in Go syntax, e.g. `Response[User]`
    pub alias_of: Option<String>,
}

impl Schema {
    /// The annotation of the Go field `go_name`, if it has one.
    pub fn field(&self, go_name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.go_name == go_name)
    }
}

/// A `@field` annotation on one struct field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Field {
    /// Go field name the annotation is attached to
    pub go_name: String,
    pub description: Option<String>,
    pub format: Option<String>,
    pub example: Option<String>,
    #[serde(rename = "enum")]
    pub enum_values: Vec<String>,
    pub default: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
    pub pattern: Option<String>,
    pub deprecated: bool,
}

/// Where a parameter struct's fields are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterKind {
    /// All kinds, in marker priority order.
    pub const ALL: [ParameterKind; 4] = [
        ParameterKind::Path,
        ParameterKind::Query,
        ParameterKind::Header,
        ParameterKind::Cookie,
    ];

    /// The struct tag key naming the parameter, e.g. `query` in `query:"limit"`.
    pub fn tag_key(&self) -> &'static str {
        match self {
            ParameterKind::Path => "path",
            ParameterKind::Query => "query",
            ParameterKind::Header => "header",
            ParameterKind::Cookie => "cookie",
        }
    }

    /// The marker annotation, e.g. `@query`.
    pub fn annotation(&self) -> &'static str {
        match self {
            ParameterKind::Path => "@path",
            ParameterKind::Query => "@query",
            ParameterKind::Header => "@header",
            ParameterKind::Cookie => "@cookie",
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_key())
    }
}

/// A struct marked `@path`, `@query`, `@header` or `@cookie`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    pub fields: Vec<Field>,
}

impl Parameter {
    pub fn field(&self, go_name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.go_name == go_name)
    }
}

/// An `@endpoint` function.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Endpoint {
    /// Go function name, used to find inline declarations
    pub func_name: String,
    pub method: String,
    pub path: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
    /// Security scheme overriding the API default
    pub auth: Option<String>,
    pub path_params: Vec<String>,
    pub query_params: Vec<String>,
    pub header_params: Vec<String>,
    pub cookie_params: Vec<String>,
    pub request: Option<RequestBody>,
    /// Keyed by status code
    pub responses: BTreeMap<String, Response>,
}

impl Endpoint {
    /// Parameter struct names referenced for `kind`.
    pub fn params(&self, kind: ParameterKind) -> &[String] {
        match kind {
            ParameterKind::Path => &self.path_params,
            ParameterKind::Query => &self.query_params,
            ParameterKind::Header => &self.header_params,
            ParameterKind::Cookie => &self.cookie_params,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestBody {
    pub content_type: Option<String>,
    pub body: Option<Body>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Response {
    pub status_code: String,
    pub content_type: Option<String>,
    pub body: Option<Body>,
    pub description: Option<String>,
    /// Header parameter struct names
    pub headers: Vec<String>,
}

/// A `@body` value with its optional `@bind` envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Body {
    /// Type text, e.g. `User`, `[]User` or `map[string]User`
    pub schema: String,
    pub bind: Option<BindTarget>,
}

/// `@bind Wrapper.Field`: the body is placed in `Field` of schema `Wrapper`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BindTarget {
    pub wrapper: String,
    pub field: String,
}

impl BindTarget {
    /// Parses `Wrapper.Field`, splitting at the first `.`.
    ///
    /// # Example
    ///
    /// ```
    /// use openapi_from_comments::model::BindTarget;
    ///
    /// let bind = BindTarget::parse("DataResponse.Data").unwrap();
    /// assert_eq!(bind.wrapper, "DataResponse");
    /// assert_eq!(bind.field, "Data");
    /// assert!(BindTarget::parse("DataResponse").is_none());
    /// ```
    pub fn parse(value: &str) -> Option<Self> {
        let (wrapper, field) = value.trim().split_once('.')?;
        let (wrapper, field) = (wrapper.trim(), field.trim());
        if wrapper.is_empty() || field.is_empty() {
            return None;
        }
        Some(Self {
            wrapper: wrapper.to_string(),
            field: field.to_string(),
        })
    }
}

/// Expands a content type shorthand to a media type.
///
/// Values containing `/` are returned unchanged, `empty` and the empty string
/// mean "no content type", and unknown shorthands are kept with a warning.
///
/// # Example
///
/// ```
/// use openapi_from_comments::model::expand_content_type;
///
/// assert_eq!(expand_content_type("json").as_deref(), Some("application/json"));
/// assert_eq!(expand_content_type("application/vnd.api+json").as_deref(), Some("application/vnd.api+json"));
/// assert_eq!(expand_content_type("empty"), None);
/// ```
pub fn expand_content_type(value: &str) -> Option<String> {
    let value = value.trim();
    if value.contains('/') {
        return Some(value.to_string());
    }

    let expanded = match value.to_ascii_lowercase().as_str() {
        "" | "empty" => return None,
        "json" => "application/json",
        "xml" => "application/xml",
        "form" => "application/x-www-form-urlencoded",
        "multipart" => "multipart/form-data",
        "text" => "text/plain",
        "csv" => "text/csv",
        "binary" => "application/octet-stream",
        "html" => "text/html",
        _ => {
            warn!("Unknown content type shorthand: {}", value);
            return Some(value.to_string());
        }
    };
    Some(expanded.to_string())
}
