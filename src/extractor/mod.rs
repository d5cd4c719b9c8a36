//! Source comment extraction.
//!
//! This module buckets a package's comment text by attachment point (package
//! clause, type declaration, struct field, function) and captures
//! function-body declarations annotated as inline parameters or bodies. The
//! same pass records every package-scope type declaration so the resolver can
//! look types up later.
//!
//! # Example
//!
//! ```no_run
//! use openapi_from_comments::extractor::load_package;
//! use std::path::Path;
//!
//! let package = load_package(Path::new("./api")).unwrap();
//! println!(
//!     "package {} has {} annotated types",
//!     package.comments.name,
//!     package.comments.struct_comments.len()
//! );
//! ```

pub mod go;

use crate::error::{Error, Result};
use crate::model::ParameterKind;
use crate::scanner::FileScanner;
use crate::syntax::{AstParser, ParsedFile};
use crate::types::{PackageTypes, StructField};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Trait for building a [`SourcePackage`] from parsed source files.
pub trait CommentExtractor {
    /// Extracts comments and type declarations from all files of one package.
    ///
    /// # Errors
    ///
    /// Returns an error if the files do not form a package.
    fn extract(&self, parsed_files: &[ParsedFile]) -> Result<SourcePackage>;
}

/// Everything the parser and resolver need from one source package.
#[derive(Debug, Default)]
pub struct SourcePackage {
    pub comments: PackageComments,
    pub types: PackageTypes,
}

/// Location of a comment, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePosition {
    pub file: PathBuf,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self
            .file
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| self.file.to_string_lossy());
        write!(f, "{}:{}:{}", file, self.line, self.column)
    }
}

/// Comment lines attached to one syntactic location.
///
/// Comment markers are stripped, each line is trimmed, and empty lines are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentBlock {
    pub lines: Vec<String>,
    pub position: SourcePosition,
}

impl CommentBlock {
    /// Builds a block from raw comment texts (`// ...` or `/* ... */`).
    ///
    /// # Returns
    ///
    /// `None` if no non-empty line remains.
    pub fn from_comments<S: AsRef<str>>(comments: &[S], position: SourcePosition) -> Option<Self> {
        let mut lines = Vec::new();

        for comment in comments {
            let text = comment.as_ref();
            let text = if let Some(rest) = text.strip_prefix("//") {
                rest
            } else if let Some(rest) = text.strip_prefix("/*") {
                rest.strip_suffix("*/").unwrap_or(rest)
            } else {
                text
            };

            lines.extend(
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string),
            );
        }

        if lines.is_empty() {
            return None;
        }
        Some(Self { lines, position })
    }

    /// True if a line starts with the annotation `name`.
    pub fn has_annotation(&self, name: &str) -> bool {
        self.lines
            .iter()
            .any(|line| annotation_name(line) == Some(name))
    }

    /// The lines of annotation `name`: its own line and everything after it.
    pub fn annotation_lines(&self, name: &str) -> Vec<String> {
        self.lines
            .iter()
            .skip_while(|line| annotation_name(line) != Some(name))
            .cloned()
            .collect()
    }
}

impl fmt::Display for CommentBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

fn annotation_name(line: &str) -> Option<&str> {
    crate::annotation::extract_annotation_name(line)
}

/// Metadata recorded for every package-scope type declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDeclInfo {
    pub name: String,
    /// Declares type parameters, e.g. `type Page[T any] struct{...}`
    pub is_generic: bool,
    /// Declared with `=`, e.g. `type UserPage = Page[User]`
    pub is_type_alias: bool,
    /// For aliases, the target type in Go syntax, e.g. `Page[User]`
    pub alias_of: Option<String>,
}

/// Which inline annotation marks a function-body declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InlineKind {
    Path,
    Query,
    Header,
    Cookie,
    Request,
    Response,
}

impl InlineKind {
    pub fn annotation(&self) -> &'static str {
        match self {
            InlineKind::Path => "@path",
            InlineKind::Query => "@query",
            InlineKind::Header => "@header",
            InlineKind::Cookie => "@cookie",
            InlineKind::Request => "@request",
            InlineKind::Response => "@response",
        }
    }

    fn from_annotation(name: &str) -> Option<Self> {
        let kind = match name {
            "@path" => InlineKind::Path,
            "@query" => InlineKind::Query,
            "@header" => InlineKind::Header,
            "@cookie" => InlineKind::Cookie,
            "@request" => InlineKind::Request,
            "@response" => InlineKind::Response,
            _ => return None,
        };
        Some(kind)
    }
}

/// Finds the inline annotation of a declaration comment.
///
/// For `@response`, the status code is the first word after the name when it
/// looks like an HTTP status (three characters, leading digit 1 to 5);
/// otherwise `200`.
pub fn detect_inline_annotation(lines: &[String]) -> Option<(InlineKind, Option<String>)> {
    for line in lines {
        let Some(kind) = annotation_name(line).and_then(InlineKind::from_annotation) else {
            continue;
        };

        if kind != InlineKind::Response {
            return Some((kind, None));
        }

        let status = line
            .trim()
            .trim_start_matches("@response")
            .split_whitespace()
            .next()
            .filter(|code| code.len() == 3 && matches!(code.as_bytes()[0], b'1'..=b'5'))
            .unwrap_or("200");
        return Some((kind, Some(status.to_string())));
    }
    None
}

/// A struct declared inside a function body and marked with an inline annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineStructInfo {
    /// Variable or type name of the declaration
    pub var_name: String,
    pub kind: InlineKind,
    pub comment: CommentBlock,
    pub fields: Vec<StructField>,
    /// Response status code, `None` for other kinds
    pub status_code: Option<String>,
    /// Doc comments of the struct's fields, keyed by field name
    pub field_comments: BTreeMap<String, CommentBlock>,
}

/// Inline declarations found in one function body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuncInlines {
    pub path: Option<InlineStructInfo>,
    pub query: Option<InlineStructInfo>,
    pub header: Option<InlineStructInfo>,
    pub cookie: Option<InlineStructInfo>,
    pub request: Option<InlineStructInfo>,
    /// Keyed by status code
    pub responses: BTreeMap<String, InlineStructInfo>,
}

impl FuncInlines {
    /// Stores a declaration in the slot for its kind; a later one replaces an earlier one.
    pub fn insert(&mut self, info: InlineStructInfo) {
        let slot = match info.kind {
            InlineKind::Path => &mut self.path,
            InlineKind::Query => &mut self.query,
            InlineKind::Header => &mut self.header,
            InlineKind::Cookie => &mut self.cookie,
            InlineKind::Request => &mut self.request,
            InlineKind::Response => {
                let status = info.status_code.clone().unwrap_or_else(|| "200".to_string());
                if self.responses.insert(status.clone(), info).is_some() {
                    warn!("Inline @response {} declared twice, keeping the last one", status);
                }
                return;
            }
        };
        if slot.is_some() {
            warn!("Inline {} declared twice, keeping the last one", info.kind.annotation());
        }
        *slot = Some(info);
    }

    /// The inline parameter struct declared for `kind`.
    pub fn params(&self, kind: ParameterKind) -> Option<&InlineStructInfo> {
        match kind {
            ParameterKind::Path => self.path.as_ref(),
            ParameterKind::Query => self.query.as_ref(),
            ParameterKind::Header => self.header.as_ref(),
            ParameterKind::Cookie => self.cookie.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_none()
            && self.query.is_none()
            && self.header.is_none()
            && self.cookie.is_none()
            && self.request.is_none()
            && self.responses.is_empty()
    }
}

/// A function or method doc comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionComment {
    pub name: String,
    pub comment: CommentBlock,
}

/// All comments of one package, bucketed by attachment point.
#[derive(Debug, Clone, Default)]
pub struct PackageComments {
    /// Package name from the package clause
    pub name: String,
    /// Doc comment of the package clause
    pub package_comment: Option<CommentBlock>,
    /// Doc comments of struct types and type aliases, keyed by type name
    pub struct_comments: BTreeMap<String, CommentBlock>,
    /// Struct name -> field name -> doc comment
    pub field_comments: BTreeMap<String, BTreeMap<String, CommentBlock>>,
    /// Function doc comments in source order
    pub function_comments: Vec<FunctionComment>,
    /// Every package-scope type declaration, keyed by name
    pub type_info: BTreeMap<String, TypeDeclInfo>,
    /// Inline declarations keyed by function name
    pub func_inlines: BTreeMap<String, FuncInlines>,
}

impl PackageComments {
    pub fn struct_comment(&self, name: &str) -> Option<&CommentBlock> {
        self.struct_comments.get(name)
    }

    pub fn field_comment(&self, struct_name: &str, field_name: &str) -> Option<&CommentBlock> {
        self.field_comments
            .get(struct_name)
            .and_then(|fields| fields.get(field_name))
    }

    pub fn function_comment(&self, name: &str) -> Option<&CommentBlock> {
        self.function_comments
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.comment)
    }
}

/// Loads one Go package directory: scan, parse, extract.
///
/// # Errors
///
/// Returns an error if the directory holds no Go files, if any file fails to
/// parse, or if the files belong to different packages.
pub fn load_package(path: &Path) -> Result<SourcePackage> {
    info!("Loading package: {}", path.display());

    let scan_result = FileScanner::new(path.to_path_buf()).scan()?;
    if scan_result.go_files.is_empty() {
        return Err(Error::Parse {
            file: path.to_path_buf(),
            message: "no Go source files found".to_string(),
        });
    }
    debug!("Found {} Go files", scan_result.go_files.len());

    let parsed_files = AstParser::parse_files(&scan_result.go_files)
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    go::GoExtractor.extract(&parsed_files)
}
