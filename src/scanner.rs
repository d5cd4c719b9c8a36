use crate::error::{Error, Result};
use log::warn;
use std::path::PathBuf;
use walkdir::WalkDir;

/// File scanner for one Go package directory.
///
/// A Go package is the set of `.go` files directly inside one directory, so the
/// scan does not descend into subdirectories. Test files (`_test.go`) and
/// hidden files are skipped.
///
/// # Example
///
/// ```no_run
/// use openapi_from_comments::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./api"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} Go files", result.go_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of a package scan.
pub struct ScanResult {
    /// Paths of the package's `.go` files, sorted
    pub go_files: Vec<PathBuf>,
    /// Warning messages for entries that could not be read
    pub warnings: Vec<String>,
}

impl FileScanner {
    /// Creates a new `FileScanner` for the specified package directory.
    ///
    /// # Arguments
    ///
    /// * `root_path` - The directory holding the package's source files
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Collects the package's Go source files.
    ///
    /// Unreadable entries are logged and reported as warnings; scanning continues.
    ///
    /// # Errors
    ///
    /// Returns an error if the root path is not a directory.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("package directory not found: {}", self.root_path.display()),
            )));
        }

        let mut go_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    let file_name = entry.file_name().to_string_lossy();

                    let is_hidden = file_name.starts_with('.') || file_name.starts_with('_');
                    let is_test = file_name.ends_with("_test.go");
                    let is_go = path.extension().and_then(|s| s.to_str()) == Some("go");

                    if entry.file_type().is_file() && is_go && !is_hidden && !is_test {
                        go_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        Ok(ScanResult { go_files, warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_package_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("models.go"), "package api").unwrap();
        fs::write(root.join("handlers.go"), "package api").unwrap();
        fs::write(root.join("readme.md"), "# README").unwrap();

        let scanner = FileScanner::new(root.to_path_buf());
        let result = scanner.scan().unwrap();

        assert!(result.warnings.is_empty());
        let file_names: Vec<String> = result
            .go_files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(file_names, vec!["handlers.go", "models.go"]);
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();

        let scanner = FileScanner::new(temp_dir.path().to_path_buf());
        let result = scanner.scan().unwrap();

        assert_eq!(result.go_files.len(), 0);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_does_not_descend_into_subpackages() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir(root.join("internal")).unwrap();
        fs::write(root.join("internal/store.go"), "package internal").unwrap();
        fs::write(root.join("api.go"), "package api").unwrap();

        let scanner = FileScanner::new(root.to_path_buf());
        let result = scanner.scan().unwrap();

        assert_eq!(result.go_files.len(), 1);
        assert_eq!(
            result.go_files[0].file_name().unwrap().to_string_lossy(),
            "api.go"
        );
    }

    #[test]
    fn test_scan_skips_test_and_hidden_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("api.go"), "package api").unwrap();
        fs::write(root.join("api_test.go"), "package api").unwrap();
        fs::write(root.join(".scratch.go"), "package api").unwrap();
        fs::write(root.join("_generated.go"), "package api").unwrap();

        let scanner = FileScanner::new(root.to_path_buf());
        let result = scanner.scan().unwrap();

        assert_eq!(result.go_files.len(), 1);
        assert_eq!(
            result.go_files[0].file_name().unwrap().to_string_lossy(),
            "api.go"
        );
    }

    #[test]
    fn test_scan_missing_directory() {
        let scanner = FileScanner::new(PathBuf::from("/nonexistent/package"));
        assert!(scanner.scan().is_err());
    }
}
