//! Block/line parser for annotation comments.
//!
//! Given the comment lines of one annotation and its [`SchemaNode`], the parser
//! produces a [`ParsedAnnotation`] tree. Blocks may be written over several
//! lines or inline on a single line:
//!
//! ```text
//! @field {
//!   @description User email
//!   @format email
//! }
//!
//! @field { @description User email @format email }
//! ```
//!
//! Both forms produce the same tree. The inline form cannot contain nested
//! blocks, and its values cannot contain a literal `@` (every unescaped `@`
//! starts a new annotation); use the multi-line form or `\@` for those.

use crate::error::GrammarError;
use crate::escape::{
    contains_unescaped_brace, count_braces_from, count_unescaped_at, find_block_opener,
    protect_escaped_at, restore_escaped_at, starts_with_unescaped_at, unescape,
};
use crate::schema::{AnnotationKind, SchemaNode};
use log::debug;
use std::collections::BTreeMap;

/// One parsed annotation occurrence.
///
/// A child name appears either in `children` or in `repeated_children`,
/// depending on whether the grammar marks it repeatable.
#[derive(Debug, Clone, Default)]
pub struct ParsedAnnotation {
    pub name: String,
    /// Opening-line payload, set only for nodes that carry metadata
    pub metadata: Option<String>,
    /// Scalar payload of value and reference annotations
    pub value: Option<String>,
    pub is_flag: bool,
    pub children: BTreeMap<String, ParsedAnnotation>,
    pub repeated_children: BTreeMap<String, Vec<ParsedAnnotation>>,
    /// Source lines, kept for diagnostics only
    pub lines: Vec<String>,
}

// Source lines differ between the inline and multi-line spelling of the same
// annotation, so they take no part in equality.
impl PartialEq for ParsedAnnotation {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.metadata == other.metadata
            && self.value == other.value
            && self.is_flag == other.is_flag
            && self.children == other.children
            && self.repeated_children == other.repeated_children
    }
}

impl ParsedAnnotation {
    fn new(name: &str, lines: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            lines,
            ..Self::default()
        }
    }

    pub fn child(&self, name: &str) -> Option<&ParsedAnnotation> {
        self.children.get(name)
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// Value of a singleton child, if the child exists and carries one.
    pub fn child_value(&self, name: &str) -> Option<&str> {
        self.children.get(name).and_then(|child| child.value.as_deref())
    }

    /// All occurrences of a repeatable child, in source order.
    pub fn repeated(&self, name: &str) -> &[ParsedAnnotation] {
        self.repeated_children
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn store(&mut self, node: SchemaNode<'_>, parsed: ParsedAnnotation) -> Result<(), GrammarError> {
        if node.is_repeatable() {
            self.repeated_children
                .entry(parsed.name.clone())
                .or_default()
                .push(parsed);
            return Ok(());
        }

        if self.children.contains_key(&parsed.name) {
            return Err(GrammarError::DuplicateAnnotation { name: parsed.name });
        }
        self.children.insert(parsed.name.clone(), parsed);
        Ok(())
    }
}

/// Extracts the annotation name at the start of a line.
///
/// The name ends at the first space, tab or `{`.
///
/// # Example
///
/// ```
/// use openapi_from_comments::annotation::extract_annotation_name;
///
/// assert_eq!(extract_annotation_name("@field {"), Some("@field"));
/// assert_eq!(extract_annotation_name("@title My API"), Some("@title"));
/// assert_eq!(extract_annotation_name("plain text"), None);
/// ```
pub fn extract_annotation_name(line: &str) -> Option<&str> {
    let line = line.trim();
    if !line.starts_with('@') {
        return None;
    }
    let end = line
        .find(|c: char| c == ' ' || c == '\t' || c == '{')
        .unwrap_or(line.len());
    Some(&line[..end])
}

/// Locates the block opener of an annotation line.
///
/// A `{` directly after the annotation name always opens the block; otherwise
/// the whitespace-before-brace rule of [`find_block_opener`] applies.
fn locate_block_opener(line: &str, name: &str) -> Option<usize> {
    if let Some(rest) = line.strip_prefix(name) {
        if rest.starts_with('{') {
            return Some(name.len());
        }
    }
    find_block_opener(line)
}

/// Extracts the opening-line payload of an annotation.
///
/// # Example
///
/// ```
/// use openapi_from_comments::annotation::extract_metadata;
///
/// assert_eq!(
///     extract_metadata("@endpoint GET /users/{id} {", "@endpoint"),
///     "GET /users/{id}"
/// );
/// assert_eq!(extract_metadata("@response 204", "@response"), "204");
/// ```
pub fn extract_metadata(line: &str, name: &str) -> String {
    let line = line.trim();
    let rest = line.strip_prefix(name).unwrap_or(line);
    if rest.starts_with('{') {
        return String::new();
    }
    let rest = match find_block_opener(rest) {
        Some(pos) => &rest[..pos - 1],
        None => rest,
    };
    rest.trim().to_string()
}

/// Extracts the lines between an annotation's block braces.
///
/// Lines are trimmed and empty lines dropped. Content that shares a line with
/// the opening or closing brace is kept.
///
/// # Returns
///
/// An empty vector if the annotation opens no block.
///
/// # Errors
///
/// Returns an error if a closing brace appears before its opener, or if the
/// input ends while a block is still open.
pub fn parse_braced_block(lines: &[String], name: &str) -> Result<Vec<String>, GrammarError> {
    let Some((open_index, open_pos)) = lines
        .iter()
        .enumerate()
        .find_map(|(i, line)| locate_block_opener(line.trim(), name).map(|pos| (i, pos)))
    else {
        return Ok(Vec::new());
    };

    let mut content = Vec::new();
    let mut depth = 0;

    for (i, raw) in lines.iter().enumerate().skip(open_index) {
        let line = if i == open_index {
            let opener_line = raw.trim();
            depth += count_braces_from(opener_line, open_pos);
            &opener_line[open_pos + 1..]
        } else {
            depth += count_braces_from(raw, 0);
            raw.as_str()
        };
        let line = line.trim();

        if depth == 0 {
            let closing = line.strip_suffix('}').unwrap_or(line).trim();
            if !closing.is_empty() {
                content.push(closing.to_string());
            }
            return Ok(content);
        }

        if depth < 0 {
            return Err(GrammarError::UnexpectedClosingBrace {
                line: raw.trim().to_string(),
            });
        }

        if !line.is_empty() {
            content.push(line.to_string());
        }
    }

    Err(GrammarError::UnbalancedBraces { depth })
}

/// Parses one annotation against its grammar node.
///
/// `lines` start with the annotation's own line (`@name ...`) and may continue
/// with its block content or multi-line value.
///
/// # Errors
///
/// Returns a [`GrammarError`] for unknown or duplicated children, unbalanced
/// braces, an empty block that has required children, or a nested block
/// written inline.
///
/// # Example
///
/// ```
/// use openapi_from_comments::annotation::parse_annotation;
/// use openapi_from_comments::schema::annotation_schema;
///
/// let node = annotation_schema().get("@field").unwrap();
/// let parsed = parse_annotation(&["@field { @description User email @format email }"], node).unwrap();
/// assert_eq!(parsed.child_value("@format"), Some("email"));
/// ```
pub fn parse_annotation<S: AsRef<str>>(
    lines: &[S],
    node: SchemaNode<'_>,
) -> Result<ParsedAnnotation, GrammarError> {
    let lines: Vec<String> = lines.iter().map(|l| l.as_ref().to_string()).collect();
    parse_lines(lines, node)
}

fn parse_lines(lines: Vec<String>, node: SchemaNode<'_>) -> Result<ParsedAnnotation, GrammarError> {
    let name = node.name();
    let first_line = lines.first().map(|l| l.trim().to_string()).unwrap_or_default();
    let after_name = first_line
        .strip_prefix(name)
        .unwrap_or(&first_line)
        .trim()
        .to_string();

    let mut result = ParsedAnnotation::new(name, lines);

    if node.has_metadata() && !first_line.is_empty() {
        result.metadata = Some(extract_metadata(&first_line, name));
    }

    match node.kind() {
        AnnotationKind::Marker | AnnotationKind::Flag => {
            result.is_flag = true;
        }
        AnnotationKind::Value => {
            let mut value = after_name;
            if node.supports_multiline() {
                for continuation in result.lines.iter().skip(1) {
                    let continuation = continuation.trim();
                    if !continuation.is_empty() {
                        value.push('\n');
                        value.push_str(continuation);
                    }
                }
            }
            result.value = Some(unescape(&value));
        }
        AnnotationKind::Reference => {
            result.value = Some(after_name);
        }
        AnnotationKind::Block | AnnotationKind::SubCommand => {
            let content = parse_braced_block(&result.lines, name).map_err(|err| nest(name, err))?;

            if content.is_empty() {
                if !node.can_be_empty() {
                    return Err(GrammarError::EmptyBlock {
                        name: name.to_string(),
                    });
                }
                return Ok(result);
            }

            let parsed = if content.len() == 1 && count_unescaped_at(&content[0]) > 1 {
                parse_inline_children(&content[0], node, &mut result)
            } else {
                parse_children(&content, node, &mut result)
            };
            parsed.map_err(|err| nest(name, err))?;
        }
    }

    Ok(result)
}

fn nest(name: &str, source: GrammarError) -> GrammarError {
    GrammarError::Nested {
        name: name.to_string(),
        source: Box::new(source),
    }
}

/// Splits one line of inline content into sibling annotations.
fn parse_inline_children(
    content: &str,
    parent: SchemaNode<'_>,
    result: &mut ParsedAnnotation,
) -> Result<(), GrammarError> {
    if contains_unescaped_brace(content) {
        return Err(GrammarError::NestedInlineBlock {
            name: parent.name().to_string(),
        });
    }

    let protected = protect_escaped_at(content);
    for part in protected.split('@') {
        let part = restore_escaped_at(part);
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (name, value) = match part.find([' ', '\t']) {
            Some(idx) => (format!("@{}", &part[..idx]), part[idx + 1..].trim()),
            None => (format!("@{}", part), ""),
        };

        let child = parent
            .child(&name)
            .ok_or_else(|| GrammarError::UnknownAnnotation {
                name: name.clone(),
                parent: parent.name().to_string(),
            })?;

        let value = unescape(value);
        let mut parsed = ParsedAnnotation::new(&name, vec![format!("{} {}", name, value)]);
        if child.has_metadata() {
            parsed.metadata = Some(value.clone());
        }
        match child.kind() {
            AnnotationKind::Flag | AnnotationKind::Marker => parsed.is_flag = true,
            AnnotationKind::Value | AnnotationKind::Reference => parsed.value = Some(value),
            AnnotationKind::Block | AnnotationKind::SubCommand => {
                if !child.can_be_empty() {
                    return Err(GrammarError::EmptyBlock { name });
                }
            }
        }

        debug!("Parsed inline child {} of {}", parsed.name, parent.name());
        result.store(child, parsed)?;
    }

    Ok(())
}

/// Parses block content written one child per line.
fn parse_children(
    lines: &[String],
    parent: SchemaNode<'_>,
    result: &mut ParsedAnnotation,
) -> Result<(), GrammarError> {
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        i += 1;

        let Some(name) = extract_annotation_name(line) else {
            continue;
        };
        let child = parent
            .child(name)
            .ok_or_else(|| GrammarError::UnknownAnnotation {
                name: name.to_string(),
                parent: parent.name().to_string(),
            })?;

        let mut child_lines = vec![line.to_string()];

        if let Some(pos) = locate_block_opener(line, name) {
            let mut depth = count_braces_from(line, pos);
            while i < lines.len() && depth > 0 {
                depth += count_braces_from(&lines[i], 0);
                child_lines.push(lines[i].clone());
                i += 1;
            }
        } else if child.supports_multiline() {
            while i < lines.len() {
                let next = lines[i].trim();
                if next.is_empty() {
                    i += 1;
                    continue;
                }
                if starts_with_unescaped_at(next)
                    && extract_annotation_name(next).is_some_and(|n| parent.has_child(n))
                {
                    break;
                }
                child_lines.push(next.to_string());
                i += 1;
            }
        }

        let parsed = parse_lines(child_lines, child)?;
        result.store(child, parsed)?;
    }

    Ok(())
}
