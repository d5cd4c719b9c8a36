//! Annotation parser orchestrator.
//!
//! Drives the block/line parser over a package's extracted comments and
//! collects the results into a [`ParsedPackage`]: the `@api` block, `@schema`
//! structs with their `@field` annotations, parameter structs and `@endpoint`
//! functions.

use crate::annotation::{parse_annotation, ParsedAnnotation};
use crate::error::{Error, GrammarError, Result};
use crate::extractor::{load_package, CommentBlock, PackageComments, SourcePackage};
use crate::model::{
    expand_content_type, ApiInfo, BindTarget, Body, Contact, Endpoint, Field, License, Parameter,
    ParameterKind, ParsedPackage, RequestBody, Response, Schema, SecurityRequirement,
    SecurityScheme, Server, Tag,
};
use crate::schema::{annotation_schema, inline_schema, AnnotationSchema, SchemaNode};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// Parses one package directory: load, extract and parse.
///
/// # Returns
///
/// The parsed package together with the loaded source package, which the
/// resolver needs for type lookups and inline declarations.
///
/// # Errors
///
/// Returns an error if the package cannot be loaded or its annotations are invalid.
pub fn parse_package(path: &Path) -> Result<(ParsedPackage, SourcePackage)> {
    let source = load_package(path)?;
    let parsed = Parser::new().parse(&source.comments)?;
    Ok((parsed, source))
}

/// Annotation parser for one package's comments.
///
/// The grammars are passed in by reference; [`Parser::new`] uses the standard ones.
#[derive(Debug, Clone, Copy)]
pub struct Parser<'s> {
    schema: &'s AnnotationSchema,
    inline: &'s AnnotationSchema,
}

impl Default for Parser<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser<'static> {
    /// Creates a parser using the standard annotation grammars.
    pub fn new() -> Self {
        Self {
            schema: annotation_schema(),
            inline: inline_schema(),
        }
    }
}

impl<'s> Parser<'s> {
    /// Creates a parser using custom grammars.
    ///
    /// # Arguments
    ///
    /// * `schema` - Grammar for package, type, field and function annotations
    /// * `inline` - Grammar for `@request`/`@response` inline declarations
    pub fn with_schemas(schema: &'s AnnotationSchema, inline: &'s AnnotationSchema) -> Self {
        Self { schema, inline }
    }

    /// Parses all annotations of a package.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The package has no doc comment, or it has no `@api` annotation
    /// - `@api` lacks `@title` or `@version`
    /// - Any annotation violates the grammar
    /// - An `@endpoint` lacks its method or path
    pub fn parse(&self, comments: &PackageComments) -> Result<ParsedPackage> {
        info!("Parsing annotations of package {}", comments.name);

        let api = self.parse_api(comments)?;

        let mut schemas = self.parse_schemas(comments)?;
        synthesize_generic_aliases(&mut schemas, comments);

        let parameters = self.parse_parameters(comments)?;
        let endpoints = self.parse_endpoints(comments)?;

        info!(
            "Parsed {} schemas, {} parameter structs, {} endpoints",
            schemas.len(),
            parameters.len(),
            endpoints.len()
        );

        Ok(ParsedPackage {
            package_name: comments.name.clone(),
            api,
            schemas,
            parameters,
            endpoints,
        })
    }

    /// Parses a field comment's `@field` annotation.
    ///
    /// # Returns
    ///
    /// `None` if the comment has no `@field` annotation.
    ///
    /// # Errors
    ///
    /// Returns an error naming `owner.go_name` if the annotation is invalid.
    pub fn parse_field(&self, owner: &str, go_name: &str, comment: &CommentBlock) -> Result<Option<Field>> {
        if !comment.has_annotation("@field") {
            return Ok(None);
        }
        let node = self.top_level(self.schema, "@field")?;
        let parsed = parse_comment(comment, node, &format!("@field for {}.{}", owner, go_name))?;
        Ok(Some(field_from_annotation(go_name, &parsed)))
    }

    /// Parses the `@request` or `@response` comment of an inline declaration.
    ///
    /// # Arguments
    ///
    /// * `name` - `@request` or `@response`
    /// * `owner` - Function the declaration belongs to, for error messages
    pub fn parse_inline_declaration(
        &self,
        name: &str,
        owner: &str,
        comment: &CommentBlock,
    ) -> Result<ParsedAnnotation> {
        let node = self.top_level(self.inline, name)?;
        parse_comment(comment, node, &format!("inline {} in {}", name, owner))
    }

    fn top_level(&self, schema: &'s AnnotationSchema, name: &str) -> Result<SchemaNode<'s>> {
        schema.root().child(name).ok_or_else(|| {
            Error::grammar(
                "annotation schema",
                GrammarError::InvalidSchema {
                    node: name.to_string(),
                    message: "not a top-level annotation".to_string(),
                },
            )
        })
    }

    fn parse_api(&self, comments: &PackageComments) -> Result<ApiInfo> {
        let Some(doc) = &comments.package_comment else {
            return Err(Error::MissingApi(
                "no package-level comments found (missing @api annotation)".to_string(),
            ));
        };
        if !doc.has_annotation("@api") {
            return Err(Error::MissingApi(format!(
                "package comment at {} has no @api annotation",
                doc.position
            )));
        }

        let parsed = parse_comment(doc, self.top_level(self.schema, "@api")?, "@api")?;

        let title = value(&parsed, "@title")
            .ok_or_else(|| Error::MissingApi("@api missing required @title".to_string()))?;
        let version = value(&parsed, "@version")
            .ok_or_else(|| Error::MissingApi("@api missing required @version".to_string()))?;

        let contact = parsed.child("@contact").map(|c| Contact {
            name: value(c, "@name"),
            email: value(c, "@email"),
            url: value(c, "@url"),
        });
        let license = parsed.child("@license").map(|l| License {
            name: value(l, "@name"),
            url: value(l, "@url"),
        });

        let servers = parsed
            .repeated("@server")
            .iter()
            .map(|s| Server {
                url: s.metadata.clone().unwrap_or_default(),
                description: value(s, "@description"),
            })
            .collect();

        let mut security_schemes = BTreeMap::new();
        for s in parsed.repeated("@securityScheme") {
            let scheme = SecurityScheme {
                name: s.metadata.clone().unwrap_or_default(),
                scheme_type: value(s, "@type").unwrap_or_default(),
                scheme: value(s, "@scheme"),
                bearer_format: value(s, "@bearerFormat"),
                location: value(s, "@in"),
                parameter_name: value(s, "@name"),
                description: value(s, "@description"),
            };
            if security_schemes.contains_key(&scheme.name) {
                warn!("Security scheme {} declared twice, keeping the last one", scheme.name);
            }
            security_schemes.insert(scheme.name.clone(), scheme);
        }

        let security = parsed
            .repeated("@security")
            .iter()
            .map(|group| {
                group
                    .repeated("@with")
                    .iter()
                    .map(|with| SecurityRequirement {
                        scheme_name: with.metadata.clone().unwrap_or_default(),
                        scopes: with
                            .repeated("@scope")
                            .iter()
                            .filter_map(|scope| scope.value.clone())
                            .filter(|scope| !scope.is_empty())
                            .collect(),
                    })
                    .collect()
            })
            .collect();

        let tags = parsed
            .repeated("@tag")
            .iter()
            .map(|t| Tag {
                name: t.metadata.clone().unwrap_or_default(),
                description: value(t, "@description"),
            })
            .collect();

        debug!("Parsed @api: {} {}", title, version);

        Ok(ApiInfo {
            title,
            version,
            description: value(&parsed, "@description"),
            terms_of_service: value(&parsed, "@termsOfService"),
            contact,
            license,
            servers,
            security_schemes,
            security,
            tags,
            default_content_type: value(&parsed, "@defaultContentType")
                .and_then(|ct| expand_content_type(&ct)),
        })
    }

    fn parse_schemas(&self, comments: &PackageComments) -> Result<BTreeMap<String, Schema>> {
        let node = self.top_level(self.schema, "@schema")?;
        let mut schemas = BTreeMap::new();

        for (name, comment) in &comments.struct_comments {
            if !comment.has_annotation("@schema") {
                continue;
            }
            let parsed = parse_comment(comment, node, &format!("@schema for {}", name))?;
            let info = comments.type_info.get(name);

            let schema = Schema {
                name: name.clone(),
                description: value(&parsed, "@description"),
                deprecated: parsed.has_child("@deprecated"),
                fields: self.parse_fields(name, comments)?,
                is_generic: info.is_some_and(|i| i.is_generic),
                is_type_alias: info.is_some_and(|i| i.is_type_alias),
                alias_of: info.and_then(|i| i.alias_of.clone()),
            };
            debug!("Parsed schema {} with {} annotated fields", name, schema.fields.len());
            schemas.insert(name.clone(), schema);
        }

        Ok(schemas)
    }

    fn parse_fields(&self, struct_name: &str, comments: &PackageComments) -> Result<Vec<Field>> {
        let mut fields = Vec::new();
        let Some(field_comments) = comments.field_comments.get(struct_name) else {
            return Ok(fields);
        };

        for (go_name, comment) in field_comments {
            if let Some(field) = self.parse_field(struct_name, go_name, comment)? {
                fields.push(field);
            }
        }
        Ok(fields)
    }

    fn parse_parameters(&self, comments: &PackageComments) -> Result<BTreeMap<String, Parameter>> {
        let mut parameters = BTreeMap::new();

        for (name, comment) in &comments.struct_comments {
            let Some(kind) = ParameterKind::ALL
                .into_iter()
                .find(|kind| comment.has_annotation(kind.annotation()))
            else {
                continue;
            };

            let parameter = Parameter {
                name: name.clone(),
                kind,
                fields: self.parse_fields(name, comments)?,
            };
            debug!("Parsed {} parameter struct {}", kind, name);
            parameters.insert(name.clone(), parameter);
        }

        Ok(parameters)
    }

    fn parse_endpoints(&self, comments: &PackageComments) -> Result<Vec<Endpoint>> {
        let node = self.top_level(self.schema, "@endpoint")?;
        let mut endpoints = Vec::new();

        for function in &comments.function_comments {
            let comment = &function.comment;
            if !comment.has_annotation("@endpoint") {
                continue;
            }
            let parsed = parse_comment(comment, node, &format!("@endpoint for {}", function.name))?;

            let metadata = parsed.metadata.clone().unwrap_or_default();
            let mut parts = metadata.split_whitespace();
            let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
                return Err(Error::Parse {
                    file: comment.position.file.clone(),
                    message: format!(
                        "@endpoint for {} missing method and path: {:?} ({})",
                        function.name, metadata, comment.position
                    ),
                });
            };

            let request = parsed.child("@request").map(|request| RequestBody {
                content_type: value(request, "@contentType").and_then(|ct| expand_content_type(&ct)),
                body: parse_body(request, &function.name),
            });

            let mut responses = BTreeMap::new();
            for response in parsed.repeated("@response") {
                let status_code = response
                    .metadata
                    .clone()
                    .filter(|status| !status.is_empty())
                    .unwrap_or_else(|| "200".to_string());
                let response = Response {
                    status_code: status_code.clone(),
                    content_type: value(response, "@contentType")
                        .and_then(|ct| expand_content_type(&ct)),
                    body: parse_body(response, &function.name),
                    description: value(response, "@description"),
                    headers: references(response, "@header"),
                };
                if responses.insert(status_code.clone(), response).is_some() {
                    warn!(
                        "@response {} declared twice for {}, keeping the last one",
                        status_code, function.name
                    );
                }
            }

            let endpoint = Endpoint {
                func_name: function.name.clone(),
                method: method.to_ascii_uppercase(),
                path: path.to_string(),
                operation_id: value(&parsed, "@operationID"),
                summary: value(&parsed, "@summary"),
                description: value(&parsed, "@description"),
                tags: references(&parsed, "@tag"),
                deprecated: parsed.has_child("@deprecated"),
                auth: value(&parsed, "@auth"),
                path_params: references(&parsed, "@path"),
                query_params: references(&parsed, "@query"),
                header_params: references(&parsed, "@header"),
                cookie_params: references(&parsed, "@cookie"),
                request,
                responses,
            };
            debug!("Parsed endpoint {} {}", endpoint.method, endpoint.path);
            endpoints.push(endpoint);
        }

        Ok(endpoints)
    }
}

/// Parses the annotation `node` out of a comment, wrapping errors with `subject` and position.
fn parse_comment(comment: &CommentBlock, node: SchemaNode<'_>, subject: &str) -> Result<ParsedAnnotation> {
    let wrap = |source| Error::grammar(format!("failed to parse {} ({})", subject, comment.position), source);

    let lines = comment.annotation_lines(node.name());
    if lines.is_empty() {
        return Err(wrap(GrammarError::NoLines {
            name: node.name().to_string(),
        }));
    }
    parse_annotation(&lines, node).map_err(wrap)
}

/// Adds schemas for type aliases that instantiate a generic schema.
///
/// `type UserPage = Page[User]` gets a copy of `Page`'s field annotations and
/// description; the type argument is bound by the resolver. An alias that is
/// itself marked `@schema` keeps its own annotations and only inherits what it
/// leaves empty.
fn synthesize_generic_aliases(schemas: &mut BTreeMap<String, Schema>, comments: &PackageComments) {
    for (name, info) in &comments.type_info {
        let Some(alias_of) = info.alias_of.as_deref().filter(|_| info.is_type_alias) else {
            continue;
        };
        let Some(generic) = schemas
            .get(base_type_name(alias_of))
            .filter(|schema| schema.is_generic)
            .cloned()
        else {
            continue;
        };

        match schemas.get_mut(name) {
            Some(existing) => {
                if existing.fields.is_empty() {
                    existing.fields = generic.fields;
                }
                if existing.description.is_none() {
                    existing.description = generic.description;
                }
            }
            None => {
                debug!("Synthesized schema {} from generic {}", name, generic.name);
                schemas.insert(
                    name.clone(),
                    Schema {
                        name: name.clone(),
                        description: generic.description,
                        deprecated: false,
                        fields: generic.fields,
                        is_generic: false,
                        is_type_alias: true,
                        alias_of: Some(alias_of.to_string()),
                    },
                );
            }
        }
    }
}

/// `Page[User]` -> `Page`
fn base_type_name(type_text: &str) -> &str {
    match type_text.find('[') {
        Some(idx) if idx > 0 => &type_text[..idx],
        _ => type_text,
    }
}

/// Builds a [`Field`] from a parsed `@field` annotation.
///
/// Numeric constraints that do not parse are dropped with a warning.
pub fn field_from_annotation(go_name: &str, parsed: &ParsedAnnotation) -> Field {
    Field {
        go_name: go_name.to_string(),
        description: value(parsed, "@description"),
        format: value(parsed, "@format"),
        example: value(parsed, "@example"),
        enum_values: value(parsed, "@enum")
            .map(|values| {
                values
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        default: value(parsed, "@default"),
        minimum: number(parsed, "@minimum", go_name),
        maximum: number(parsed, "@maximum", go_name),
        min_length: number(parsed, "@minLength", go_name),
        max_length: number(parsed, "@maxLength", go_name),
        min_items: number(parsed, "@minItems", go_name),
        max_items: number(parsed, "@maxItems", go_name),
        unique_items: parsed.has_child("@uniqueItems"),
        pattern: value(parsed, "@pattern"),
        deprecated: parsed.has_child("@deprecated"),
    }
}

/// Non-empty value of a singleton child.
fn value(parsed: &ParsedAnnotation, name: &str) -> Option<String> {
    parsed
        .child_value(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn number<T: FromStr>(parsed: &ParsedAnnotation, name: &str, go_name: &str) -> Option<T> {
    let raw = value(parsed, name)?;
    match raw.parse() {
        Ok(number) => Some(number),
        Err(_) => {
            warn!("Ignoring invalid {} value {:?} on field {}", name, raw, go_name);
            None
        }
    }
}

/// Values of a repeatable reference child; a single value may list several names.
fn references(parsed: &ParsedAnnotation, name: &str) -> Vec<String> {
    parsed
        .repeated(name)
        .iter()
        .filter_map(|child| child.value.as_deref())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_body(block: &ParsedAnnotation, func_name: &str) -> Option<Body> {
    let bind = value(block, "@bind");

    let Some(body) = block.child("@body") else {
        if bind.is_some() {
            warn!("@bind without @body in {} {}, ignoring", block.name, func_name);
        }
        return None;
    };

    let schema = body
        .metadata
        .clone()
        .or_else(|| body.value.clone())
        .unwrap_or_default();

    let bind = bind.and_then(|raw| {
        let target = BindTarget::parse(&raw);
        if target.is_none() {
            warn!("Ignoring @bind {:?} in {}: expected Wrapper.Field", raw, func_name);
        }
        target
    });

    Some(Body {
        schema: schema.trim().to_string(),
        bind,
    })
}
