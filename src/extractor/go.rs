use crate::error::{Error, Result};
use crate::extractor::{
    detect_inline_annotation, CommentBlock, CommentExtractor, FuncInlines, FunctionComment,
    InlineStructInfo, PackageComments, SourcePackage, SourcePosition, TypeDeclInfo,
};
use crate::syntax::ParsedFile;
use crate::types::{BasicKind, GoType, PackageTypes, StructField, TypeDecl};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use tree_sitter::Node;

/// Go comment extractor
///
/// Doc comments are attached the way Go attaches them: a run of comments on
/// consecutive lines, each starting its own line, ending on the line right
/// above the declaration.
pub struct GoExtractor;

impl CommentExtractor for GoExtractor {
    fn extract(&self, parsed_files: &[ParsedFile]) -> Result<SourcePackage> {
        let mut package = SourcePackage::default();

        for parsed_file in parsed_files {
            let mut visitor = GoVisitor::new(parsed_file);
            visitor.visit_file(&mut package.comments, &mut package.types)?;
        }

        debug!(
            "Extracted package {}: {} types, {} documented functions, {} functions with inline declarations",
            package.comments.name,
            package.types.len(),
            package.comments.function_comments.len(),
            package.comments.func_inlines.len()
        );

        Ok(package)
    }
}

/// An own-line comment node
struct RawComment {
    start_row: usize,
    start_column: usize,
    text: String,
}

/// Visitor over one file's syntax tree
struct GoVisitor<'f> {
    file: &'f ParsedFile,
    /// Own-line comments keyed by the row they end on
    comments: BTreeMap<usize, RawComment>,
    /// Import qualifier -> import path
    imports: HashMap<String, String>,
}

impl<'f> GoVisitor<'f> {
    fn new(file: &'f ParsedFile) -> Self {
        let mut visitor = Self {
            file,
            comments: BTreeMap::new(),
            imports: HashMap::new(),
        };
        visitor.index_comments();
        visitor
    }

    fn index_comments(&mut self) {
        let file = self.file;
        let mut stack = vec![file.root()];
        while let Some(node) = stack.pop() {
            if node.kind() == "comment" {
                if self.starts_line(node) {
                    let comment = RawComment {
                        start_row: node.start_position().row,
                        start_column: node.start_position().column,
                        text: file.text(node).to_string(),
                    };
                    self.comments.insert(node.end_position().row, comment);
                }
                continue;
            }
            let mut cursor = node.walk();
            stack.extend(node.children(&mut cursor));
        }
    }

    /// True if only whitespace precedes `node` on its line.
    fn starts_line(&self, node: Node<'_>) -> bool {
        self.file.source.as_bytes()[..node.start_byte()]
            .iter()
            .rev()
            .take_while(|&&b| b != b'\n')
            .all(|&b| b == b' ' || b == b'\t' || b == b'\r')
    }

    /// The doc comment of a declaration starting on `row`.
    fn doc_comment(&self, row: usize) -> Option<CommentBlock> {
        let mut texts = Vec::new();
        let mut position = None;
        let mut next_row = row;

        while next_row > 0 {
            let Some(comment) = self.comments.get(&(next_row - 1)) else {
                break;
            };
            texts.push(comment.text.as_str());
            position = Some((comment.start_row, comment.start_column));
            next_row = comment.start_row;
        }

        let (line, column) = position?;
        texts.reverse();
        CommentBlock::from_comments(
            &texts,
            SourcePosition {
                file: self.file.path.clone(),
                line: line + 1,
                column: column + 1,
            },
        )
    }

    fn text(&self, node: Node<'_>) -> String {
        self.file.text(node).to_string()
    }

    fn visit_file(&mut self, comments: &mut PackageComments, types: &mut PackageTypes) -> Result<()> {
        let file = self.file;
        let root = file.root();
        let mut cursor = root.walk();
        let top_level: Vec<Node<'f>> = root.named_children(&mut cursor).collect();

        for node in top_level.iter().filter(|n| n.kind() == "import_declaration") {
            self.collect_imports(*node);
        }

        for node in top_level {
            match node.kind() {
                "package_clause" => self.visit_package_clause(node, comments)?,
                "type_declaration" => {
                    for spec in type_specs(node) {
                        self.visit_type_spec(spec, comments, types);
                    }
                }
                "function_declaration" | "method_declaration" => {
                    self.visit_function(node, comments)
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn visit_package_clause(&self, node: Node<'_>, comments: &mut PackageComments) -> Result<()> {
        let mut cursor = node.walk();
        let name = node
            .named_children(&mut cursor)
            .find(|n| n.kind() == "package_identifier")
            .map(|n| self.text(n))
            .unwrap_or_default();

        if comments.name.is_empty() {
            comments.name = name;
        } else if comments.name != name {
            return Err(Error::Parse {
                file: self.file.path.clone(),
                message: format!(
                    "found package {} but expected {}",
                    name, comments.name
                ),
            });
        }

        if let Some(doc) = self.doc_comment(node.start_position().row) {
            let replace = match &comments.package_comment {
                None => true,
                Some(existing) => !existing.has_annotation("@api") && doc.has_annotation("@api"),
            };
            if replace {
                comments.package_comment = Some(doc);
            } else if doc.has_annotation("@api") {
                warn!(
                    "Ignoring second @api package comment at {}",
                    doc.position
                );
            }
        }
        Ok(())
    }

    fn collect_imports(&mut self, node: Node<'_>) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current.kind() != "import_spec" {
                let mut cursor = current.walk();
                stack.extend(current.named_children(&mut cursor));
                continue;
            }

            let Some(path_node) = current.child_by_field_name("path") else {
                continue;
            };
            let path = self
                .text(path_node)
                .trim_matches(|c| c == '"' || c == '`')
                .to_string();
            let alias = current
                .child_by_field_name("name")
                .map(|n| self.text(n))
                .filter(|n| n != "_" && n != ".")
                .unwrap_or_else(|| path.rsplit('/').next().unwrap_or(&path).to_string());

            self.imports.insert(alias, path);
        }
    }

    fn visit_type_spec(
        &self,
        spec: Node<'_>,
        comments: &mut PackageComments,
        types: &mut PackageTypes,
    ) {
        let (Some(name_node), Some(type_node)) = (
            spec.child_by_field_name("name"),
            spec.child_by_field_name("type"),
        ) else {
            return;
        };

        let name = self.text(name_node);
        let type_params = spec
            .child_by_field_name("type_parameters")
            .map(|list| self.type_param_names(list))
            .unwrap_or_default();
        let is_alias = spec.kind() == "type_alias";
        let ty = self.convert_type(type_node, &type_params);

        if let Some(doc) = self.doc_comment(spec.start_position().row) {
            comments.struct_comments.insert(name.clone(), doc);
        }
        if type_node.kind() == "struct_type" {
            let field_comments = self.field_comments(type_node);
            if !field_comments.is_empty() {
                comments.field_comments.insert(name.clone(), field_comments);
            }
        }

        comments.type_info.insert(
            name.clone(),
            TypeDeclInfo {
                name: name.clone(),
                is_generic: !type_params.is_empty(),
                is_type_alias: is_alias,
                alias_of: is_alias.then(|| self.text(type_node)),
            },
        );

        types.insert(TypeDecl {
            name,
            type_params,
            ty,
            is_alias,
        });
    }

    fn type_param_names(&self, list: Node<'_>) -> Vec<String> {
        let mut names = Vec::new();
        let mut cursor = list.walk();
        for decl in list.named_children(&mut cursor) {
            let mut name_cursor = decl.walk();
            let declared: Vec<String> = decl
                .children_by_field_name("name", &mut name_cursor)
                .map(|n| self.text(n))
                .collect();
            if declared.is_empty() && decl.kind() == "identifier" {
                names.push(self.text(decl));
            } else {
                names.extend(declared);
            }
        }
        names
    }

    /// Converts a type expression node to a [`GoType`].
    ///
    /// # Arguments
    ///
    /// * `node` - Any type node
    /// * `type_params` - Names of the enclosing declaration's type parameters
    fn convert_type(&self, node: Node<'_>, type_params: &[String]) -> GoType {
        let other = || GoType::Other(self.text(node));

        match node.kind() {
            "type_identifier" | "identifier" => {
                let name = self.text(node);
                if type_params.contains(&name) {
                    GoType::TypeParam(name)
                } else if name == "any" || name == "error" {
                    GoType::Interface
                } else if let Some(kind) = BasicKind::from_name(&name) {
                    GoType::Basic(kind)
                } else {
                    GoType::named(&name)
                }
            }
            "qualified_type" => {
                let (Some(package), Some(name)) = (
                    node.child_by_field_name("package"),
                    node.child_by_field_name("name"),
                ) else {
                    return other();
                };
                let qualifier = self.text(package);
                let path = self.imports.get(&qualifier).cloned().unwrap_or(qualifier);
                GoType::qualified(&path, &self.text(name))
            }
            "generic_type" => {
                let Some(base) = node.child_by_field_name("type") else {
                    return other();
                };
                let args = node
                    .child_by_field_name("type_arguments")
                    .map(|list| {
                        let mut cursor = list.walk();
                        list.named_children(&mut cursor)
                            .filter(|n| n.kind() != "comment")
                            .map(|arg| {
                                let arg = if arg.kind() == "type_elem" {
                                    arg.named_child(0).unwrap_or(arg)
                                } else {
                                    arg
                                };
                                self.convert_type(arg, type_params)
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                match self.convert_type(base, type_params) {
                    GoType::Named { package, name, .. } => GoType::Named {
                        package,
                        name,
                        args,
                    },
                    _ => other(),
                }
            }
            "pointer_type" => match node.named_child(0) {
                Some(inner) => GoType::pointer(self.convert_type(inner, type_params)),
                None => other(),
            },
            "slice_type" => match node.child_by_field_name("element") {
                Some(elem) => GoType::slice(self.convert_type(elem, type_params)),
                None => other(),
            },
            "array_type" | "implicit_length_array_type" => {
                let Some(elem) = node.child_by_field_name("element") else {
                    return other();
                };
                GoType::Array {
                    len: node
                        .child_by_field_name("length")
                        .map(|n| self.text(n))
                        .unwrap_or_else(|| "...".to_string()),
                    elem: Box::new(self.convert_type(elem, type_params)),
                }
            }
            "map_type" => match (
                node.child_by_field_name("key"),
                node.child_by_field_name("value"),
            ) {
                (Some(key), Some(value)) => GoType::map(
                    self.convert_type(key, type_params),
                    self.convert_type(value, type_params),
                ),
                _ => other(),
            },
            "struct_type" => GoType::Struct(self.struct_fields(node, type_params)),
            "interface_type" => GoType::Interface,
            "parenthesized_type" => match node.named_child(0) {
                Some(inner) => self.convert_type(inner, type_params),
                None => other(),
            },
            _ => other(),
        }
    }

    fn field_declarations<'t>(&self, struct_node: Node<'t>) -> Vec<Node<'t>> {
        let mut cursor = struct_node.walk();
        let Some(list) = struct_node
            .named_children(&mut cursor)
            .find(|n| n.kind() == "field_declaration_list")
        else {
            return Vec::new();
        };

        let mut cursor = list.walk();
        list.named_children(&mut cursor)
            .filter(|n| n.kind() == "field_declaration")
            .collect()
    }

    fn struct_fields(&self, struct_node: Node<'_>, type_params: &[String]) -> Vec<StructField> {
        let mut fields = Vec::new();

        for decl in self.field_declarations(struct_node) {
            let Some(type_node) = decl.child_by_field_name("type") else {
                continue;
            };
            let ty = self.convert_type(type_node, type_params);
            let tag = decl
                .child_by_field_name("tag")
                .map(|t| tag_literal(&self.text(t)))
                .unwrap_or_default();

            let mut cursor = decl.walk();
            let names: Vec<String> = decl
                .children_by_field_name("name", &mut cursor)
                .map(|n| self.text(n))
                .collect();

            if names.is_empty() {
                let mut cursor = decl.walk();
                let has_star = decl.children(&mut cursor).any(|c| c.kind() == "*");
                let name = match &ty {
                    GoType::Named { name, .. } => name.clone(),
                    GoType::Pointer(inner) => match inner.as_ref() {
                        GoType::Named { name, .. } => name.clone(),
                        other => other.to_string(),
                    },
                    other => other.to_string(),
                };
                let ty = if has_star && !matches!(ty, GoType::Pointer(_)) {
                    GoType::pointer(ty)
                } else {
                    ty
                };
                fields.push(StructField {
                    name,
                    ty,
                    tag,
                    embedded: true,
                });
                continue;
            }

            for name in names {
                fields.push(StructField::new(&name, ty.clone(), &tag));
            }
        }

        fields
    }

    /// Doc comments of the struct's named fields, keyed by field name.
    ///
    /// A field that shares its line with other code has no doc comment.
    fn field_comments(&self, struct_node: Node<'_>) -> BTreeMap<String, CommentBlock> {
        let mut comments = BTreeMap::new();

        for decl in self.field_declarations(struct_node) {
            if !self.starts_line(decl) {
                continue;
            }
            let mut cursor = decl.walk();
            let Some(name) = decl
                .children_by_field_name("name", &mut cursor)
                .next()
                .map(|n| self.text(n))
            else {
                continue;
            };
            if let Some(doc) = self.doc_comment(decl.start_position().row) {
                comments.insert(name, doc);
            }
        }

        comments
    }

    fn visit_function(&self, node: Node<'_>, comments: &mut PackageComments) {
        let Some(name) = node.child_by_field_name("name").map(|n| self.text(n)) else {
            return;
        };

        if let Some(doc) = self.doc_comment(node.start_position().row) {
            comments.function_comments.push(FunctionComment {
                name: name.clone(),
                comment: doc,
            });
        }

        if let Some(body) = node.child_by_field_name("body") {
            let inlines = self.func_inlines(body);
            if !inlines.is_empty() {
                debug!("Found inline declarations in {}", name);
                if comments.func_inlines.insert(name.clone(), inlines).is_some() {
                    warn!(
                        "Inline declarations of {} replace those of another function with the same name",
                        name
                    );
                }
            }
        }
    }

    /// Collects annotated struct declarations among the top-level statements of a body.
    fn func_inlines(&self, body: Node<'_>) -> FuncInlines {
        let mut inlines = FuncInlines::default();

        let mut statements = Vec::new();
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            if child.kind() == "statement_list" {
                let mut inner = child.walk();
                statements.extend(child.named_children(&mut inner));
            } else {
                statements.push(child);
            }
        }

        for statement in statements {
            if !matches!(statement.kind(), "var_declaration" | "type_declaration") {
                continue;
            }
            let Some(comment) = self.doc_comment(statement.start_position().row) else {
                continue;
            };
            let Some((kind, status_code)) = detect_inline_annotation(&comment.lines) else {
                continue;
            };
            let Some((var_name, struct_node)) = self.declared_struct(statement) else {
                warn!(
                    "{} at {} does not declare a struct, ignoring",
                    kind.annotation(),
                    comment.position
                );
                continue;
            };

            inlines.insert(InlineStructInfo {
                var_name,
                kind,
                fields: self.struct_fields(struct_node, &[]),
                field_comments: self.field_comments(struct_node),
                status_code,
                comment,
            });
        }

        inlines
    }

    /// The name and struct type node of `var x struct{...}` or `type X struct{...}`.
    fn declared_struct<'t>(&self, statement: Node<'t>) -> Option<(String, Node<'t>)> {
        let spec_kinds: &[&str] = if statement.kind() == "var_declaration" {
            &["var_spec"]
        } else {
            &["type_spec", "type_alias"]
        };

        let mut stack = vec![statement];
        while let Some(node) = stack.pop() {
            if spec_kinds.contains(&node.kind()) {
                let mut cursor = node.walk();
                let name = node.children_by_field_name("name", &mut cursor).next()?;
                let ty = node.child_by_field_name("type")?;
                return (ty.kind() == "struct_type").then(|| (self.text(name), ty));
            }
            let mut cursor = node.walk();
            let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        None
    }
}

/// Type specs of a `type` declaration, grouped or not.
fn type_specs(declaration: Node<'_>) -> Vec<Node<'_>> {
    let mut specs = Vec::new();
    let mut cursor = declaration.walk();
    for child in declaration.named_children(&mut cursor) {
        match child.kind() {
            "type_spec" | "type_alias" => specs.push(child),
            "comment" => {}
            _ => specs.extend(type_specs(child)),
        }
    }
    specs
}

/// Strips the quotes of a raw or interpreted string literal.
fn tag_literal(literal: &str) -> String {
    if let Some(raw) = literal.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        return raw.to_string();
    }
    let Some(quoted) = literal.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return literal.to_string();
    };

    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
