use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while turning annotation comment text into a [`ParsedAnnotation`] tree.
///
/// Every variant is fatal to the parse call that produced it.
///
/// [`ParsedAnnotation`]: crate::annotation::ParsedAnnotation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("unknown annotation {name} in {parent}")]
    UnknownAnnotation { name: String, parent: String },

    #[error("{name} appears multiple times but is not repeatable")]
    DuplicateAnnotation { name: String },

    #[error("unbalanced braces at line: {line}")]
    UnexpectedClosingBrace { line: String },

    #[error("unbalanced braces: depth={depth}")]
    UnbalancedBraces { depth: i32 },

    #[error("{name} cannot be empty (has required children)")]
    EmptyBlock { name: String },

    #[error("nested blocks cannot be inlined, use multi-line format (in {name})")]
    NestedInlineBlock { name: String },

    #[error("annotation lines are empty for {name}")]
    NoLines { name: String },

    #[error("invalid annotation schema at {node}: {message}")]
    InvalidSchema { node: String, message: String },

    #[error("failed to parse {name} children: {source}")]
    Nested {
        name: String,
        #[source]
        source: Box<GrammarError>,
    },
}

/// Error types for the library
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error in {}: {message}", file.display())]
    Parse { file: PathBuf, message: String },

    #[error("{context}: {source}")]
    Grammar {
        context: String,
        #[source]
        source: GrammarError,
    },

    #[error("{0}")]
    MissingApi(String),

    #[error("struct {0} not found in package")]
    StructNotFound(String),

    #[error("{0} is not a struct")]
    NotAStruct(String),

    #[error("failed to resolve {context}: {source}")]
    Resolve {
        context: String,
        #[source]
        source: Box<Error>,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Wraps a grammar error with the declaration it was found on.
    pub fn grammar(context: impl Into<String>, source: GrammarError) -> Self {
        Error::Grammar {
            context: context.into(),
            source,
        }
    }

    /// Wraps a resolution error with the schema, parameter or endpoint that referenced it.
    pub fn resolve(context: impl Into<String>, source: Error) -> Self {
        Error::Resolve {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON serialization error: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML serialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_error_messages() {
        let err = GrammarError::UnknownAnnotation {
            name: "@foo".to_string(),
            parent: "@field".to_string(),
        };
        assert_eq!(err.to_string(), "unknown annotation @foo in @field");

        let err = GrammarError::UnbalancedBraces { depth: 2 };
        assert_eq!(err.to_string(), "unbalanced braces: depth=2");
    }

    #[test]
    fn test_nested_errors_keep_their_chain() {
        let inner = GrammarError::DuplicateAnnotation {
            name: "@format".to_string(),
        };
        let err = Error::grammar(
            "failed to parse @field for User.Email",
            GrammarError::Nested {
                name: "@field".to_string(),
                source: Box::new(inner),
            },
        );

        assert_eq!(
            err.to_string(),
            "failed to parse @field for User.Email: failed to parse @field children: \
             @format appears multiple times but is not repeatable"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_resolve_error_wraps_context() {
        let err = Error::resolve("schema Order", Error::StructNotFound("Order".to_string()));
        assert_eq!(
            err.to_string(),
            "failed to resolve schema Order: struct Order not found in package"
        );
    }
}
