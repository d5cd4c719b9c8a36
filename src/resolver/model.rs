use crate::model::{ApiInfo, Field, ParameterKind};
use crate::type_resolver::FieldKind;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A fully resolved package, the sole input of document generation.
///
/// Parameter structs and schemas referenced from several places are shared
/// through [`Arc`] and never mutated after resolution.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPackage {
    pub package_name: String,
    pub api: ApiInfo,
    pub schemas: BTreeMap<String, Arc<ResolvedSchema>>,
    pub parameters: BTreeMap<String, Arc<ResolvedParameter>>,
    pub endpoints: Vec<ResolvedEndpoint>,
}

impl ResolvedPackage {
    /// Schemas to emit as reusable components: everything except generic templates.
    pub fn component_schemas(&self) -> impl Iterator<Item = &Arc<ResolvedSchema>> {
        self.schemas.values().filter(|schema| !schema.is_generic)
    }
}

/// One struct field with its name, type classification and constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedField {
    /// Serialized name, from the naming tags or the Go name
    pub name: String,
    pub go_name: String,
    /// Declared type in Go syntax
    pub go_type: String,
    pub kind: FieldKind,
    pub required: bool,
    pub nullable: bool,
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    pub unique_items: bool,
}

impl ResolvedField {
    /// Overrides type-derived values with what the `@field` annotation states.
    pub fn apply_annotation(&mut self, annotation: &Field) {
        fn set<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                target.clone_from(value);
            }
        }

        set(&mut self.description, &annotation.description);
        set(&mut self.format, &annotation.format);
        set(&mut self.example, &annotation.example);
        set(&mut self.default, &annotation.default);
        set(&mut self.pattern, &annotation.pattern);
        set(&mut self.minimum, &annotation.minimum);
        set(&mut self.maximum, &annotation.maximum);
        set(&mut self.min_length, &annotation.min_length);
        set(&mut self.max_length, &annotation.max_length);
        set(&mut self.min_items, &annotation.min_items);
        set(&mut self.max_items, &annotation.max_items);

        if !annotation.enum_values.is_empty() {
            self.enum_values.clone_from(&annotation.enum_values);
        }
        self.unique_items |= annotation.unique_items;
        self.deprecated |= annotation.deprecated;
    }

    /// Name of the undeclared struct this field references, at any depth.
    pub fn unresolved_struct(&self) -> Option<&str> {
        self.kind.unresolved_struct()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedSchema {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub deprecated: bool,
    pub fields: Vec<ResolvedField>,
    /// A template with unbound type parameters, not emitted as a component
    pub is_generic: bool,
    pub is_type_alias: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<String>,
    /// Type argument of a generic instantiation, e.g. `User` for `Page[User]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_arg: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedParameter {
    pub name: String,
    pub kind: ParameterKind,
    pub fields: Vec<ResolvedField>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedEndpoint {
    pub func_name: String,
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(serialize_with = "parameter_names")]
    pub path_params: Vec<Arc<ResolvedParameter>>,
    #[serde(serialize_with = "parameter_names")]
    pub query_params: Vec<Arc<ResolvedParameter>>,
    #[serde(serialize_with = "parameter_names")]
    pub header_params: Vec<Arc<ResolvedParameter>>,
    #[serde(serialize_with = "parameter_names")]
    pub cookie_params: Vec<Arc<ResolvedParameter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<ResolvedRequestBody>,
    /// Keyed by status code
    pub responses: BTreeMap<String, ResolvedResponse>,
    /// Parameter fields declared inside the handler body
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub inline_params: BTreeMap<ParameterKind, Vec<ResolvedField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_request: Option<ResolvedInlineBody>,
    /// Keyed by status code
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub inline_responses: BTreeMap<String, ResolvedInlineBody>,
}

impl ResolvedEndpoint {
    /// Parameter structs referenced for `kind`.
    pub fn params(&self, kind: ParameterKind) -> &[Arc<ResolvedParameter>] {
        match kind {
            ParameterKind::Path => &self.path_params,
            ParameterKind::Query => &self.query_params,
            ParameterKind::Header => &self.header_params,
            ParameterKind::Cookie => &self.cookie_params,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRequestBody {
    pub content_type: String,
    pub body: ResolvedBody,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedResponse {
    pub status_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Set whenever there is a body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<ResolvedBody>,
    #[serde(serialize_with = "parameter_names")]
    pub headers: Vec<Arc<ResolvedParameter>>,
}

/// Container shape of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyShape {
    Single,
    Array,
    Map,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedBody {
    /// Body type text as written, e.g. `[]User`
    pub schema: String,
    pub shape: BodyShape,
    /// Element schema name, e.g. `User` for `[]User`
    pub element_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<ResolvedBindTarget>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedBindTarget {
    pub wrapper: String,
    pub field: String,
    /// The wrapper schema, when it is declared
    #[serde(skip)]
    pub wrapper_schema: Option<Arc<ResolvedSchema>>,
}

/// A request or response body declared as a struct inside a handler.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedInlineBody {
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<ResolvedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<ResolvedBindTarget>,
    #[serde(serialize_with = "parameter_names")]
    pub headers: Vec<Arc<ResolvedParameter>>,
}

fn parameter_names<S: Serializer>(
    params: &[Arc<ResolvedParameter>],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(params.iter().map(|param| param.name.as_str()))
}
