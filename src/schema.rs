//! The annotation grammar.
//!
//! An [`AnnotationSchema`] is an immutable tree describing every recognized
//! annotation name, its [`AnnotationKind`], and which children it accepts. The
//! tree is stored in an arena so that parent links can be computed once at
//! build time without reference cycles. Parsers receive the grammar by
//! reference; the two standard grammars are built lazily and shared for the
//! life of the process.

use crate::error::GrammarError;
use std::fmt;
use std::sync::LazyLock;

/// How an annotation's content is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    /// `{ ... }`-delimited set of child annotations
    Block,
    /// Scalar text after the annotation name
    Value,
    /// Presence-only annotation inside a block, e.g. `@deprecated`
    Flag,
    /// Presence-only top-level annotation that tags a declaration, e.g. `@path`
    Marker,
    /// Name of another declaration, kept verbatim
    Reference,
    /// Block nested under another block that carries its own metadata
    SubCommand,
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnnotationKind::Block => "block",
            AnnotationKind::Value => "value",
            AnnotationKind::Flag => "flag",
            AnnotationKind::Marker => "marker",
            AnnotationKind::Reference => "reference",
            AnnotationKind::SubCommand => "subcommand",
        };
        f.write_str(name)
    }
}

/// Declarative description of one grammar node, used to build an [`AnnotationSchema`].
#[derive(Debug, Clone)]
pub struct NodeSpec {
    name: String,
    kind: AnnotationKind,
    required: bool,
    has_metadata: bool,
    repeatable: bool,
    multiline: bool,
    children: Vec<NodeSpec>,
}

impl NodeSpec {
    fn new(name: &str, kind: AnnotationKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            has_metadata: false,
            repeatable: false,
            multiline: false,
            children: Vec::new(),
        }
    }

    pub fn block(name: &str) -> Self {
        Self::new(name, AnnotationKind::Block)
    }

    pub fn value(name: &str) -> Self {
        Self::new(name, AnnotationKind::Value)
    }

    pub fn flag(name: &str) -> Self {
        Self::new(name, AnnotationKind::Flag)
    }

    pub fn marker(name: &str) -> Self {
        Self::new(name, AnnotationKind::Marker)
    }

    pub fn reference(name: &str) -> Self {
        Self::new(name, AnnotationKind::Reference)
    }

    pub fn sub_command(name: &str) -> Self {
        Self::new(name, AnnotationKind::SubCommand)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// The opening line carries a payload before the block, e.g. `GET /users`.
    pub fn metadata(mut self) -> Self {
        self.has_metadata = true;
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    /// Continuation lines are appended to the value until a sibling starts.
    pub fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = NodeSpec>) -> Self {
        self.children.extend(children);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeId(usize);

#[derive(Debug)]
struct NodeData {
    name: String,
    kind: AnnotationKind,
    required: bool,
    has_metadata: bool,
    repeatable: bool,
    multiline: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An immutable annotation grammar.
#[derive(Debug)]
pub struct AnnotationSchema {
    nodes: Vec<NodeData>,
}

impl AnnotationSchema {
    /// Builds a grammar from its root specification.
    ///
    /// Parent links are assigned while flattening the tree; nothing changes afterwards.
    pub fn build(root: NodeSpec) -> Self {
        let mut schema = Self { nodes: Vec::new() };
        schema.insert(root, None);
        schema
    }

    fn insert(&mut self, spec: NodeSpec, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            name: spec.name,
            kind: spec.kind,
            required: spec.required,
            has_metadata: spec.has_metadata,
            repeatable: spec.repeatable,
            multiline: spec.multiline,
            parent,
            children: Vec::new(),
        });

        for child in spec.children {
            let child_id = self.insert(child, Some(id));
            self.nodes[id.0].children.push(child_id);
        }

        id
    }

    /// The synthetic root whose children are the top-level annotations.
    pub fn root(&self) -> SchemaNode<'_> {
        SchemaNode {
            schema: self,
            id: NodeId(0),
        }
    }

    /// Looks up a top-level annotation by name.
    pub fn get(&self, name: &str) -> Option<SchemaNode<'_>> {
        self.root().child(name)
    }

    /// Checks the structural invariants of every node.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::InvalidSchema`] naming the first offending node when:
    /// - a node is both required and repeatable
    /// - a marker or flag has children
    /// - a marker is nested below the top level
    /// - a node has two children with the same name
    /// - a non-root node name does not start with `@`
    pub fn validate(&self) -> Result<(), GrammarError> {
        for (index, data) in self.nodes.iter().enumerate() {
            let node = SchemaNode {
                schema: self,
                id: NodeId(index),
            };
            let invalid = |message: &str| GrammarError::InvalidSchema {
                node: node.path(),
                message: message.to_string(),
            };

            if data.required && data.repeatable {
                return Err(invalid("annotation cannot be both required and repeatable"));
            }
            if matches!(data.kind, AnnotationKind::Marker | AnnotationKind::Flag)
                && !data.children.is_empty()
            {
                return Err(invalid("marker and flag annotations cannot have children"));
            }
            if data.kind == AnnotationKind::Marker && !node.is_top_level() {
                return Err(invalid("marker annotations must be top-level"));
            }
            if data.parent.is_some() && !data.name.starts_with('@') {
                return Err(invalid("annotation names must start with @"));
            }
            for (i, child) in data.children.iter().enumerate() {
                let name = &self.nodes[child.0].name;
                if data.children[..i]
                    .iter()
                    .any(|other| &self.nodes[other.0].name == name)
                {
                    return Err(invalid(&format!("duplicate child {}", name)));
                }
            }
        }
        Ok(())
    }
}

/// A borrowed handle to one node of an [`AnnotationSchema`].
#[derive(Clone, Copy)]
pub struct SchemaNode<'a> {
    schema: &'a AnnotationSchema,
    id: NodeId,
}

impl fmt::Debug for SchemaNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaNode")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

impl PartialEq for SchemaNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema) && self.id == other.id
    }
}

impl<'a> SchemaNode<'a> {
    fn data(&self) -> &'a NodeData {
        &self.schema.nodes[self.id.0]
    }

    fn handle(&self, id: NodeId) -> SchemaNode<'a> {
        SchemaNode {
            schema: self.schema,
            id,
        }
    }

    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    pub fn kind(&self) -> AnnotationKind {
        self.data().kind
    }

    pub fn is_required(&self) -> bool {
        self.data().required
    }

    pub fn has_metadata(&self) -> bool {
        self.data().has_metadata
    }

    pub fn is_repeatable(&self) -> bool {
        self.data().repeatable
    }

    pub fn supports_multiline(&self) -> bool {
        self.data().multiline
    }

    pub fn parent(&self) -> Option<SchemaNode<'a>> {
        self.data().parent.map(|id| self.handle(id))
    }

    pub fn children(&self) -> impl Iterator<Item = SchemaNode<'a>> + 'a {
        let schema = self.schema;
        self.data()
            .children
            .iter()
            .map(move |&id| SchemaNode { schema, id })
    }

    pub fn child(&self, name: &str) -> Option<SchemaNode<'a>> {
        self.children().find(|child| child.name() == name)
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    /// True if `name` is declared under this node's parent.
    pub fn is_sibling(&self, name: &str) -> bool {
        self.parent().is_some_and(|parent| parent.has_child(name))
    }

    /// Names of the other children of this node's parent.
    pub fn siblings(&self) -> Vec<&'a str> {
        match self.parent() {
            Some(parent) => parent
                .children()
                .filter(|child| child != self)
                .map(|child| child.name())
                .collect(),
            None => Vec::new(),
        }
    }

    /// A block may be written without content only if none of its children are required.
    pub fn can_be_empty(&self) -> bool {
        !self.children().any(|child| child.is_required())
    }

    pub fn is_top_level(&self) -> bool {
        self.parent().is_some_and(|parent| parent.parent().is_none())
    }

    /// True if `name` names this node or one of its ancestors.
    pub fn has_ancestor(&self, name: &str) -> bool {
        let mut current = self.parent();
        while let Some(node) = current {
            if node.name() == name {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Human-readable position in the tree, e.g. `@api > @contact > @email`.
    pub fn path(&self) -> String {
        let mut names = vec![self.name()];
        let mut current = self.parent();
        while let Some(node) = current {
            if node.parent().is_some() {
                names.push(node.name());
            }
            current = node.parent();
        }
        names.reverse();
        names.join(" > ")
    }
}

static ANNOTATION_SCHEMA: LazyLock<AnnotationSchema> = LazyLock::new(standard_schema);
static INLINE_SCHEMA: LazyLock<AnnotationSchema> = LazyLock::new(inline_declaration_schema);

/// The grammar for package, type, field and function annotations.
pub fn annotation_schema() -> &'static AnnotationSchema {
    &ANNOTATION_SCHEMA
}

/// The grammar for `@request`/`@response` comments on function-body declarations.
pub fn inline_schema() -> &'static AnnotationSchema {
    &INLINE_SCHEMA
}

fn body_children() -> Vec<NodeSpec> {
    vec![
        NodeSpec::value("@contentType"),
        NodeSpec::value("@body").metadata(),
        NodeSpec::value("@bind"),
    ]
}

/// Builds the standard annotation grammar.
pub fn standard_schema() -> AnnotationSchema {
    let api = NodeSpec::block("@api").required().children([
        NodeSpec::value("@title").required(),
        NodeSpec::value("@version").required(),
        NodeSpec::value("@description").multiline(),
        NodeSpec::value("@termsOfService"),
        NodeSpec::block("@contact").children([
            NodeSpec::value("@name"),
            NodeSpec::value("@email"),
            NodeSpec::value("@url"),
        ]),
        NodeSpec::block("@license").children([NodeSpec::value("@name"), NodeSpec::value("@url")]),
        NodeSpec::block("@server")
            .metadata()
            .repeatable()
            .children([NodeSpec::value("@description").multiline()]),
        NodeSpec::block("@securityScheme")
            .metadata()
            .repeatable()
            .children([
                NodeSpec::value("@type").required(),
                NodeSpec::value("@scheme"),
                NodeSpec::value("@bearerFormat"),
                NodeSpec::value("@in"),
                NodeSpec::value("@name"),
                NodeSpec::value("@description").multiline(),
            ]),
        NodeSpec::block("@security").repeatable().children([NodeSpec::sub_command("@with")
            .metadata()
            .repeatable()
            .children([NodeSpec::value("@scope").repeatable()])]),
        NodeSpec::block("@tag")
            .metadata()
            .repeatable()
            .children([NodeSpec::value("@description").multiline()]),
        NodeSpec::value("@defaultContentType"),
    ]);

    let mut response_children = body_children();
    response_children.extend([
        NodeSpec::value("@description").multiline(),
        NodeSpec::value("@header").repeatable(),
    ]);

    let endpoint = NodeSpec::block("@endpoint").metadata().children([
        NodeSpec::value("@operationID"),
        NodeSpec::value("@summary"),
        NodeSpec::value("@description").multiline(),
        NodeSpec::reference("@tag").repeatable(),
        NodeSpec::flag("@deprecated"),
        NodeSpec::value("@auth"),
        NodeSpec::reference("@path").repeatable(),
        NodeSpec::reference("@query").repeatable(),
        NodeSpec::reference("@header").repeatable(),
        NodeSpec::reference("@cookie").repeatable(),
        NodeSpec::block("@request").children(body_children()),
        NodeSpec::block("@response")
            .metadata()
            .repeatable()
            .children(response_children),
    ]);

    let field = NodeSpec::block("@field").children([
        NodeSpec::value("@description").multiline(),
        NodeSpec::value("@format"),
        NodeSpec::value("@example"),
        NodeSpec::value("@enum"),
        NodeSpec::value("@default"),
        NodeSpec::value("@minimum"),
        NodeSpec::value("@maximum"),
        NodeSpec::value("@minLength"),
        NodeSpec::value("@maxLength"),
        NodeSpec::value("@minItems"),
        NodeSpec::value("@maxItems"),
        NodeSpec::flag("@uniqueItems"),
        NodeSpec::value("@pattern"),
        NodeSpec::flag("@deprecated"),
    ]);

    let schema = NodeSpec::block("@schema").children([
        NodeSpec::value("@description").multiline(),
        NodeSpec::flag("@deprecated"),
    ]);

    AnnotationSchema::build(NodeSpec::block("root").children([
        api,
        endpoint,
        field,
        schema,
        NodeSpec::marker("@path"),
        NodeSpec::marker("@query"),
        NodeSpec::marker("@header"),
        NodeSpec::marker("@cookie"),
    ]))
}

/// Builds the grammar used for inline request and response declarations.
pub fn inline_declaration_schema() -> AnnotationSchema {
    AnnotationSchema::build(NodeSpec::block("inline").children([
        NodeSpec::block("@request").children([
            NodeSpec::value("@contentType"),
            NodeSpec::value("@description"),
            NodeSpec::value("@bind"),
        ]),
        NodeSpec::block("@response").metadata().children([
            NodeSpec::value("@contentType"),
            NodeSpec::value("@description"),
            NodeSpec::value("@header").repeatable(),
            NodeSpec::value("@bind"),
        ]),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_schemas_are_valid() {
        assert!(annotation_schema().validate().is_ok());
        assert!(inline_schema().validate().is_ok());
    }

    #[test]
    fn test_top_level_annotations() {
        let schema = annotation_schema();
        let names: Vec<&str> = schema.root().children().map(|n| n.name()).collect();
        assert_eq!(
            names,
            vec!["@api", "@endpoint", "@field", "@schema", "@path", "@query", "@header", "@cookie"]
        );

        let api = schema.get("@api").unwrap();
        assert!(api.is_required());
        assert!(api.is_top_level());
        assert_eq!(api.kind(), AnnotationKind::Block);
        assert!(!api.can_be_empty());

        let path = schema.get("@path").unwrap();
        assert_eq!(path.kind(), AnnotationKind::Marker);
        assert_eq!(path.children().count(), 0);
    }

    #[test]
    fn test_endpoint_children() {
        let endpoint = annotation_schema().get("@endpoint").unwrap();
        assert!(endpoint.has_metadata());
        assert!(endpoint.can_be_empty());

        let response = endpoint.child("@response").unwrap();
        assert!(response.is_repeatable());
        assert!(response.has_metadata());
        assert_eq!(response.child("@header").unwrap().kind(), AnnotationKind::Value);
        assert!(response.child("@description").unwrap().supports_multiline());

        let body = response.child("@body").unwrap();
        assert!(body.has_metadata());
        assert!(body.has_ancestor("@endpoint"));
        assert_eq!(body.path(), "@endpoint > @response > @body");

        assert_eq!(endpoint.child("@query").unwrap().kind(), AnnotationKind::Reference);
        assert_eq!(endpoint.child("@deprecated").unwrap().kind(), AnnotationKind::Flag);
    }

    #[test]
    fn test_parents_and_siblings() {
        let field = annotation_schema().get("@field").unwrap();
        let format = field.child("@format").unwrap();

        assert_eq!(format.parent().unwrap(), field);
        assert!(format.is_sibling("@description"));
        assert!(!format.is_sibling("@title"));
        assert!(format.siblings().contains(&"@pattern"));
        assert!(!format.siblings().contains(&"@format"));
    }

    #[test]
    fn test_security_sub_command() {
        let security = annotation_schema()
            .get("@api")
            .and_then(|api| api.child("@security"))
            .unwrap();
        let with = security.child("@with").unwrap();
        assert_eq!(with.kind(), AnnotationKind::SubCommand);
        assert!(with.has_metadata());
        assert!(with.child("@scope").unwrap().is_repeatable());
    }

    #[test]
    fn test_validate_rejects_required_and_repeatable() {
        let schema = AnnotationSchema::build(
            NodeSpec::block("root").children([NodeSpec::value("@x").required().repeatable()]),
        );
        match schema.validate() {
            Err(GrammarError::InvalidSchema { node, message }) => {
                assert_eq!(node, "@x");
                assert!(message.contains("required and repeatable"));
            }
            other => panic!("Expected InvalidSchema error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_marker_with_children() {
        let schema = AnnotationSchema::build(NodeSpec::block("root").children([
            NodeSpec::marker("@path").children([NodeSpec::value("@description")]),
        ]));
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nested_marker() {
        let schema = AnnotationSchema::build(NodeSpec::block("root").children([
            NodeSpec::block("@endpoint").children([NodeSpec::marker("@query")]),
        ]));
        match schema.validate() {
            Err(GrammarError::InvalidSchema { node, message }) => {
                assert_eq!(node, "@endpoint > @query");
                assert!(message.contains("top-level"));
            }
            other => panic!("Expected InvalidSchema error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_duplicate_children() {
        let schema = AnnotationSchema::build(NodeSpec::block("root").children([
            NodeSpec::value("@a"),
            NodeSpec::value("@a"),
        ]));
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_inline_schema_response() {
        let response = inline_schema().get("@response").unwrap();
        assert!(response.has_metadata());
        assert!(response.can_be_empty());
        assert!(response.child("@header").unwrap().is_repeatable());
        assert!(response.child("@body").is_none());
    }
}
