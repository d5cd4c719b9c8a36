use crate::error::{Error, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

/// Syntax parser for Go source files.
///
/// The `AstParser` uses `tree-sitter-go` to turn Go source text into a concrete
/// syntax tree. The tree keeps comments as ordinary nodes, which the extractor
/// later attaches to declarations by line adjacency.
///
/// # Example
///
/// ```no_run
/// use openapi_from_comments::syntax::AstParser;
/// use std::path::Path;
///
/// let parsed = AstParser::parse_file(Path::new("api/handlers.go")).unwrap();
/// println!("Root node: {}", parsed.root().kind());
/// ```
pub struct AstParser;

/// A successfully parsed Go file with its syntax tree.
///
/// The source text is kept alongside the tree because tree-sitter nodes only
/// hold byte ranges.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// The file content the tree was built from
    pub source: String,
    /// The parsed syntax tree
    pub tree: Tree,
}

impl ParsedFile {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text covered by `node`.
    pub fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }
}

impl AstParser {
    /// Parses Go source text that did not necessarily come from disk.
    ///
    /// # Arguments
    ///
    /// * `path` - Path reported in diagnostics
    /// * `source` - Go source text
    ///
    /// # Errors
    ///
    /// Returns an error if the grammar cannot be loaded or the source contains
    /// syntax errors. The message names the first offending line.
    pub fn parse_source(path: &Path, source: String) -> Result<ParsedFile> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| Error::Parse {
                file: path.to_path_buf(),
                message: format!("Failed to load Go grammar: {}", e),
            })?;

        let tree = parser.parse(&source, None).ok_or_else(|| Error::Parse {
            file: path.to_path_buf(),
            message: "Failed to parse Go syntax: parser returned no tree".to_string(),
        })?;

        if let Some(node) = first_error(tree.root_node()) {
            return Err(Error::Parse {
                file: path.to_path_buf(),
                message: format!(
                    "Failed to parse Go syntax at line {}, column {}",
                    node.start_position().row + 1,
                    node.start_position().column + 1
                ),
            });
        }

        Ok(ParsedFile {
            path: path.to_path_buf(),
            source,
            tree,
        })
    }

    /// Parses a single Go source file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the Go source file to parse
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file contains invalid Go syntax
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path).map_err(|e| Error::Parse {
            file: path.to_path_buf(),
            message: format!("Failed to read file: {}", e),
        })?;

        let parsed = Self::parse_source(path, content)?;
        debug!("Successfully parsed file: {}", path.display());
        Ok(parsed)
    }

    /// Parses multiple Go source files, continuing even if some fail.
    ///
    /// # Returns
    ///
    /// One result per input path, in input order.
    pub fn parse_files(paths: &[PathBuf]) -> Vec<Result<ParsedFile>> {
        debug!("Parsing {} files", paths.len());

        let results: Vec<Result<ParsedFile>> = paths
            .iter()
            .map(|path| {
                Self::parse_file(path).inspect_err(|e| {
                    warn!("Failed to parse {}: {}", path.display(), e);
                })
            })
            .collect();

        let success_count = results.iter().filter(|r| r.is_ok()).count();
        debug!(
            "Parsing complete: {} succeeded, {} failed",
            success_count,
            results.len() - success_count
        );

        results
    }
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error).or(Some(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Helper function to create a temporary file with content
    fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path
    }

    #[test]
    fn test_parse_valid_go_file() {
        let temp_dir = TempDir::new().unwrap();
        let valid_code = r#"
package users

import "time"

// User is a user.
type User struct {
	ID        string    `json:"id"`
	CreatedAt time.Time `json:"createdAt"`
}

func GetUser(id string) *User {
	return nil
}
"#;

        let file_path = create_temp_file(&temp_dir, "valid.go", valid_code);
        let parsed = AstParser::parse_file(&file_path).unwrap();

        assert_eq!(parsed.path, file_path);
        assert_eq!(parsed.root().kind(), "source_file");
        assert!(parsed.root().named_child_count() >= 4);
    }

    #[test]
    fn test_parse_invalid_go_file() {
        let temp_dir = TempDir::new().unwrap();
        let invalid_code = r#"
package users

type User struct {
	ID string `json:"id"`

func broken( {
"#;

        let file_path = create_temp_file(&temp_dir, "invalid.go", invalid_code);
        let result = AstParser::parse_file(&file_path);

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Failed to parse Go syntax"));
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = AstParser::parse_file(Path::new("/nonexistent/file.go"));

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Failed to read file"));
    }

    #[test]
    fn test_parse_files_batch() {
        let temp_dir = TempDir::new().unwrap();

        let file1 = create_temp_file(&temp_dir, "a.go", "package a\n\nfunc Hello() {}\n");
        let file2 = create_temp_file(&temp_dir, "b.go", "package a\n\ntype World struct{}\n");
        let file3 = create_temp_file(&temp_dir, "c.go", "package a\n\nfunc broken( {\n");

        let paths = vec![file1.clone(), file2.clone(), file3];
        let results = AstParser::parse_files(&paths);

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(results[2].is_err());
        assert_eq!(results[0].as_ref().unwrap().path, file1);
        assert_eq!(results[1].as_ref().unwrap().path, file2);
    }

    #[test]
    fn test_parse_files_empty_list() {
        let paths: Vec<PathBuf> = vec![];
        let results = AstParser::parse_files(&paths);

        assert_eq!(results.len(), 0);
    }

    #[test]
    fn test_node_text() {
        let parsed = AstParser::parse_source(
            Path::new("inline.go"),
            "package inline\n\nvar Version = \"1.0\"\n".to_string(),
        )
        .unwrap();

        let mut cursor = parsed.root().walk();
        let package = parsed
            .root()
            .named_children(&mut cursor)
            .find(|n| n.kind() == "package_clause")
            .unwrap();
        assert_eq!(parsed.text(package), "package inline");
    }
}
