//! Resolution of parsed annotations against the package's types.
//!
//! The [`Resolver`] looks up the actual fields of every `@schema` and
//! parameter struct, classifies each field's type and merges the `@field`
//! annotations onto it. Endpoints get their parameter and header references
//! replaced by shared [`ResolvedParameter`]s, their bodies classified, and
//! their inline declarations resolved.
//!
//! # Example
//!
//! ```no_run
//! use openapi_from_comments::parser::parse_package;
//! use openapi_from_comments::resolver::Resolver;
//! use std::path::Path;
//!
//! let (parsed, source) = parse_package(Path::new("./api")).unwrap();
//! let resolved = Resolver::new(&source.types)
//!     .with_inlines(&source.comments.func_inlines)
//!     .resolve(&parsed)
//!     .unwrap();
//! println!("{} endpoints", resolved.endpoints.len());
//! ```

mod inline;
pub mod model;

pub use model::{
    BodyShape, ResolvedBindTarget, ResolvedBody, ResolvedEndpoint, ResolvedField,
    ResolvedInlineBody, ResolvedPackage, ResolvedParameter, ResolvedRequestBody,
    ResolvedResponse, ResolvedSchema,
};

use crate::error::{Error, Result};
use crate::extractor::FuncInlines;
use crate::model::{Body, Endpoint, Parameter, ParameterKind, ParsedPackage, Schema};
use crate::parser::Parser;
use crate::type_resolver::{FieldNaming, TypeResolver, DEFAULT_NAME_TAGS};
use crate::types::TypeSystem;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Content type used when neither the annotation nor `@api` names one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Settings of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Struct tags tried in order for body field names
    pub name_tags: Vec<String>,
    /// Fallback when `@api` has no `@defaultContentType`
    pub default_content_type: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            name_tags: DEFAULT_NAME_TAGS.iter().map(|t| t.to_string()).collect(),
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

/// Resolves a [`ParsedPackage`] against a [`TypeSystem`].
pub struct Resolver<'a> {
    types: &'a dyn TypeSystem,
    inlines: Option<&'a BTreeMap<String, FuncInlines>>,
    config: ResolverConfig,
    parser: Parser<'static>,
}

/// Already resolved objects that endpoints refer to.
struct Scope<'r> {
    schemas: &'r BTreeMap<String, Arc<ResolvedSchema>>,
    parameters: &'r BTreeMap<String, Arc<ResolvedParameter>>,
    default_content_type: &'r str,
}

impl Scope<'_> {
    fn parameter(&self, name: &str, referrer: &str) -> Option<Arc<ResolvedParameter>> {
        let found = self.parameters.get(name).cloned();
        if found.is_none() {
            warn!("{} references undeclared parameter struct {}, skipping", referrer, name);
        }
        found
    }

    fn parameters(&self, names: &[String], referrer: &str) -> Vec<Arc<ResolvedParameter>> {
        names
            .iter()
            .filter_map(|name| self.parameter(name, referrer))
            .collect()
    }

    fn body(&self, body: &Body) -> ResolvedBody {
        let schema = body.schema.trim();
        let (shape, element) = if let Some(element) = schema.strip_prefix("[]") {
            (BodyShape::Array, element)
        } else if let Some(element) = schema.strip_prefix("map[string]") {
            (BodyShape::Map, element)
        } else {
            (BodyShape::Single, schema)
        };

        ResolvedBody {
            schema: schema.to_string(),
            shape,
            element_type: element.trim().to_string(),
            bind: body.bind.as_ref().map(|bind| self.bind_target(&bind.wrapper, &bind.field)),
        }
    }

    fn bind_target(&self, wrapper: &str, field: &str) -> ResolvedBindTarget {
        let wrapper_schema = self.schemas.get(wrapper).cloned();
        if wrapper_schema.is_none() {
            debug!("Bind wrapper {} is not a declared schema", wrapper);
        }
        ResolvedBindTarget {
            wrapper: wrapper.to_string(),
            field: field.to_string(),
            wrapper_schema,
        }
    }
}

impl<'a> Resolver<'a> {
    pub fn new(types: &'a dyn TypeSystem) -> Self {
        Self {
            types,
            inlines: None,
            config: ResolverConfig::default(),
            parser: Parser::new(),
        }
    }

    /// Supplies the function-body declarations of the package, keyed by function name.
    pub fn with_inlines(mut self, inlines: &'a BTreeMap<String, FuncInlines>) -> Self {
        self.inlines = Some(inlines);
        self
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolves all schemas, parameter structs and endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A schema or parameter struct is not declared in the package, or is not a struct
    /// - An inline declaration's annotations are invalid
    pub fn resolve(&self, parsed: &ParsedPackage) -> Result<ResolvedPackage> {
        info!("Resolving package {}", parsed.package_name);

        let mut types = TypeResolver::new(self.types).with_name_tags(&self.config.name_tags);
        for schema in parsed.schemas.values() {
            types.declare_schema(schema);
        }

        let mut schemas = BTreeMap::new();
        for (name, schema) in &parsed.schemas {
            let resolved = self
                .resolve_schema(&mut types, schema)
                .map_err(|e| Error::resolve(format!("schema {}", name), e))?;
            schemas.insert(name.clone(), Arc::new(resolved));
        }

        let mut parameters = BTreeMap::new();
        for (name, parameter) in &parsed.parameters {
            let resolved = self
                .resolve_parameter(&mut types, parameter)
                .map_err(|e| Error::resolve(format!("{} parameter {}", parameter.kind, name), e))?;
            parameters.insert(name.clone(), Arc::new(resolved));
        }

        let default_content_type = parsed
            .api
            .default_content_type
            .clone()
            .unwrap_or_else(|| self.config.default_content_type.clone());
        let scope = Scope {
            schemas: &schemas,
            parameters: &parameters,
            default_content_type: &default_content_type,
        };

        let mut endpoints = Vec::with_capacity(parsed.endpoints.len());
        for endpoint in &parsed.endpoints {
            let mut resolved = resolve_endpoint(endpoint, &scope);
            if let Some(inlines) = self.inlines.and_then(|all| all.get(&endpoint.func_name)) {
                self.resolve_inlines(&mut types, &mut resolved, inlines, &scope)
                    .map_err(|e| {
                        Error::resolve(format!("endpoint {} {}", endpoint.method, endpoint.path), e)
                    })?;
            }
            endpoints.push(resolved);
        }

        info!(
            "Resolved {} schemas, {} parameter structs, {} endpoints ({} type classifications cached)",
            schemas.len(),
            parameters.len(),
            endpoints.len(),
            types.cached_types()
        );

        Ok(ResolvedPackage {
            package_name: parsed.package_name.clone(),
            api: parsed.api.clone(),
            schemas,
            parameters,
            endpoints,
        })
    }

    fn resolve_schema(&self, types: &mut TypeResolver<'_>, schema: &Schema) -> Result<ResolvedSchema> {
        debug!("Resolving schema {}", schema.name);
        let fields = self.types.struct_fields(&schema.name)?;

        let type_arg = schema
            .alias_of
            .as_deref()
            .filter(|_| schema.is_type_alias)
            .and_then(type_argument);

        Ok(ResolvedSchema {
            name: schema.name.clone(),
            description: schema.description.clone(),
            deprecated: schema.deprecated,
            fields: types.resolve_fields(&fields, FieldNaming::Body, &schema.fields),
            is_generic: schema.is_generic,
            is_type_alias: schema.is_type_alias,
            alias_of: schema.alias_of.clone(),
            type_arg,
        })
    }

    fn resolve_parameter(
        &self,
        types: &mut TypeResolver<'_>,
        parameter: &Parameter,
    ) -> Result<ResolvedParameter> {
        debug!("Resolving {} parameter {}", parameter.kind, parameter.name);
        let fields = self.types.struct_fields(&parameter.name)?;

        Ok(ResolvedParameter {
            name: parameter.name.clone(),
            kind: parameter.kind,
            fields: types.resolve_fields(
                &fields,
                FieldNaming::Parameter(parameter.kind),
                &parameter.fields,
            ),
        })
    }
}

fn resolve_endpoint(endpoint: &Endpoint, scope: &Scope<'_>) -> ResolvedEndpoint {
    debug!("Resolving endpoint {} {}", endpoint.method, endpoint.path);
    let referrer = format!("endpoint {}", endpoint.func_name);

    let request = endpoint.request.as_ref().and_then(|request| {
        let Some(body) = &request.body else {
            debug!("@request of {} has no @body, ignoring", endpoint.func_name);
            return None;
        };
        Some(ResolvedRequestBody {
            content_type: request
                .content_type
                .clone()
                .unwrap_or_else(|| scope.default_content_type.to_string()),
            body: scope.body(body),
            required: true,
        })
    });

    let responses = endpoint
        .responses
        .iter()
        .map(|(status, response)| {
            let body = response.body.as_ref().map(|body| scope.body(body));
            let content_type = match (&response.content_type, &body) {
                (Some(content_type), _) => Some(content_type.clone()),
                (None, Some(_)) => Some(scope.default_content_type.to_string()),
                (None, None) => None,
            };
            let resolved = ResolvedResponse {
                status_code: status.clone(),
                description: response.description.clone(),
                content_type,
                body,
                headers: scope.parameters(&response.headers, &referrer),
            };
            (status.clone(), resolved)
        })
        .collect();

    ResolvedEndpoint {
        func_name: endpoint.func_name.clone(),
        method: endpoint.method.clone(),
        path: endpoint.path.clone(),
        operation_id: endpoint.operation_id.clone(),
        summary: endpoint.summary.clone(),
        description: endpoint.description.clone(),
        tags: endpoint.tags.clone(),
        deprecated: endpoint.deprecated,
        auth: endpoint.auth.clone(),
        path_params: scope.parameters(endpoint.params(ParameterKind::Path), &referrer),
        query_params: scope.parameters(endpoint.params(ParameterKind::Query), &referrer),
        header_params: scope.parameters(endpoint.params(ParameterKind::Header), &referrer),
        cookie_params: scope.parameters(endpoint.params(ParameterKind::Cookie), &referrer),
        request,
        responses,
        inline_params: BTreeMap::new(),
        inline_request: None,
        inline_responses: BTreeMap::new(),
    }
}

/// The text between the first `[` and the last `]` of a generic instantiation.
fn type_argument(alias_of: &str) -> Option<String> {
    let start = alias_of.find('[')?;
    let end = alias_of.rfind(']')?;
    if end <= start + 1 {
        return None;
    }
    Some(alias_of[start + 1..end].trim().to_string())
}
