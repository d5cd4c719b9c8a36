//! Inline declarations: parameter and body structs declared inside handlers.

use super::{ResolvedEndpoint, ResolvedField, ResolvedInlineBody, Resolver, Scope};
use crate::error::Result;
use crate::extractor::{FuncInlines, InlineStructInfo};
use crate::model::{expand_content_type, BindTarget, ParameterKind};
use crate::type_resolver::{FieldNaming, TypeResolver};
use log::{debug, warn};

impl Resolver<'_> {
    pub(super) fn resolve_inlines(
        &self,
        types: &mut TypeResolver<'_>,
        endpoint: &mut ResolvedEndpoint,
        inlines: &FuncInlines,
        scope: &Scope<'_>,
    ) -> Result<()> {
        debug!("Resolving inline declarations of {}", endpoint.func_name);

        for kind in ParameterKind::ALL {
            if let Some(info) = inlines.params(kind) {
                let fields = self.inline_fields(types, info, FieldNaming::Parameter(kind))?;
                endpoint.inline_params.insert(kind, fields);
            }
        }

        if let Some(info) = &inlines.request {
            let body = self.inline_body(types, info, "@request", &endpoint.func_name, scope)?;
            endpoint.inline_request = Some(body);
        }

        for (status, info) in &inlines.responses {
            let body = self.inline_body(types, info, "@response", &endpoint.func_name, scope)?;
            endpoint.inline_responses.insert(status.clone(), body);
        }

        Ok(())
    }

    /// Resolves the struct's fields with their `@field` annotations.
    fn inline_fields(
        &self,
        types: &mut TypeResolver<'_>,
        info: &InlineStructInfo,
        naming: FieldNaming,
    ) -> Result<Vec<ResolvedField>> {
        let mut annotations = Vec::new();
        for (go_name, comment) in &info.field_comments {
            if let Some(field) = self.parser.parse_field(&info.var_name, go_name, comment)? {
                annotations.push(field);
            }
        }

        Ok(types.resolve_fields(&info.fields, naming, &annotations))
    }

    fn inline_body(
        &self,
        types: &mut TypeResolver<'_>,
        info: &InlineStructInfo,
        name: &str,
        func_name: &str,
        scope: &Scope<'_>,
    ) -> Result<ResolvedInlineBody> {
        let parsed = self
            .parser
            .parse_inline_declaration(name, func_name, &info.comment)?;
        let referrer = format!("inline {} of {}", name, func_name);

        let bind = parsed.child_value("@bind").and_then(|value| {
            let target = BindTarget::parse(value);
            if target.is_none() {
                warn!("{}: invalid @bind {:?}, expected Wrapper.Field", referrer, value);
            }
            target.map(|t| scope.bind_target(&t.wrapper, &t.field))
        });

        let headers = parsed
            .repeated("@header")
            .iter()
            .filter_map(|header| header.value.as_deref())
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter_map(|name| scope.parameter(name, &referrer))
            .collect();

        Ok(ResolvedInlineBody {
            content_type: parsed
                .child_value("@contentType")
                .and_then(expand_content_type)
                .unwrap_or_else(|| scope.default_content_type.to_string()),
            description: parsed.child_value("@description").map(str::to_string),
            fields: self.inline_fields(types, info, FieldNaming::Body)?,
            bind,
            headers,
        })
    }
}
