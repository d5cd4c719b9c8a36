//! Serialization of resolved packages to YAML or JSON.
//!
//! This module renders a [`ResolvedPackage`] in a standard format and writes
//! it to files or returns it as a string.

use crate::resolver::ResolvedPackage;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Serializes a resolved package to YAML.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```no_run
/// use openapi_from_comments::parser::parse_package;
/// use openapi_from_comments::resolver::Resolver;
/// use openapi_from_comments::serializer::serialize_yaml;
/// use std::path::Path;
///
/// let (parsed, source) = parse_package(Path::new("./api")).unwrap();
/// let resolved = Resolver::new(&source.types).resolve(&parsed).unwrap();
/// let yaml = serialize_yaml(&resolved).unwrap();
/// println!("{}", yaml);
/// ```
pub fn serialize_yaml(package: &ResolvedPackage) -> Result<String> {
    debug!("Serializing package {} to YAML", package.package_name);
    serde_yaml::to_string(package).context("Failed to serialize resolved package to YAML")
}

/// Serializes a resolved package to pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(package: &ResolvedPackage) -> Result<String> {
    debug!("Serializing package {} to JSON", package.package_name);
    serde_json::to_string_pretty(package).context("Failed to serialize resolved package to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
///
/// An existing file is overwritten.
///
/// # Errors
///
/// Returns an error if the directories or the file cannot be written.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApiInfo, ParameterKind};
    use crate::resolver::{ResolvedField, ResolvedParameter, ResolvedSchema};
    use crate::type_resolver::{FieldKind, OpenApiType};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_package() -> ResolvedPackage {
        let field = ResolvedField {
            name: "id".to_string(),
            go_name: "ID".to_string(),
            go_type: "int64".to_string(),
            kind: FieldKind::primitive(OpenApiType::Integer, Some("int64")),
            format: Some("int64".to_string()),
            required: true,
            ..ResolvedField::default()
        };

        let mut schemas = BTreeMap::new();
        schemas.insert(
            "User".to_string(),
            Arc::new(ResolvedSchema {
                name: "User".to_string(),
                description: Some("A user".to_string()),
                fields: vec![field.clone()],
                ..ResolvedSchema::default()
            }),
        );

        let mut parameters = BTreeMap::new();
        parameters.insert(
            "UserPath".to_string(),
            Arc::new(ResolvedParameter {
                name: "UserPath".to_string(),
                kind: ParameterKind::Path,
                fields: vec![field],
            }),
        );

        ResolvedPackage {
            package_name: "api".to_string(),
            api: ApiInfo {
                title: "Test API".to_string(),
                version: "1.0.0".to_string(),
                ..ApiInfo::default()
            },
            schemas,
            parameters,
            endpoints: vec![],
        }
    }

    #[test]
    fn test_serialize_yaml() {
        let yaml = serialize_yaml(&create_test_package()).unwrap();

        assert!(yaml.contains("package_name: api"));
        assert!(yaml.contains("title: Test API"));
        assert!(yaml.contains("kind: primitive"));
        assert!(yaml.contains("type: integer"));
    }

    #[test]
    fn test_serialize_json() {
        let json = serialize_json(&create_test_package()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["api"]["title"], "Test API");
        assert_eq!(value["schemas"]["User"]["fields"][0]["kind"]["format"], "int64");
        assert_eq!(value["parameters"]["UserPath"]["kind"], "path");
        assert!(value["schemas"]["User"].get("alias_of").is_none());
    }

    #[test]
    fn test_serialize_json_pretty_format() {
        let json = serialize_json(&create_test_package()).unwrap();
        assert!(json.contains('\n'));
        assert!(json.contains("  \"package_name\""));
    }

    #[test]
    fn test_write_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("package.yaml");

        write_to_file("content", &file_path).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "content");
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested").join("dir").join("package.json");

        write_to_file("{}", &file_path).unwrap();
        assert!(file_path.exists());
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("package.yaml");

        write_to_file("first", &file_path).unwrap();
        write_to_file("second", &file_path).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "second");
    }
}
