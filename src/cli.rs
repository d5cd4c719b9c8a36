use crate::model::expand_content_type;
use crate::parser::parse_package;
use crate::resolver::{Resolver, ResolverConfig, ResolvedPackage, DEFAULT_CONTENT_TYPE};
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::type_resolver::DEFAULT_NAME_TAGS;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// OpenAPI from comments - Resolve OpenAPI annotations in Go source comments into a typed model
#[derive(Parser, Debug)]
#[command(name = "openapi-from-comments")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Go package directory
    #[arg(value_name = "PACKAGE_PATH")]
    pub package_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Struct tag naming body fields, tried in the order given (default: json, xml)
    #[arg(long = "name-tag", value_name = "TAG")]
    pub name_tags: Vec<String>,

    /// Content type used when neither the annotation nor @api sets one
    #[arg(long = "default-content-type", value_name = "TYPE", default_value = DEFAULT_CONTENT_TYPE)]
    pub default_content_type: String,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

impl CliArgs {
    /// Resolver settings derived from the arguments.
    pub fn resolver_config(&self) -> ResolverConfig {
        let name_tags = if self.name_tags.is_empty() {
            DEFAULT_NAME_TAGS.iter().map(|t| t.to_string()).collect()
        } else {
            self.name_tags.clone()
        };

        ResolverConfig {
            name_tags,
            default_content_type: expand_content_type(&self.default_content_type)
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        }
    }
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.package_path.exists() {
        anyhow::bail!("Package path does not exist: {}", args.package_path.display());
    }

    if !args.package_path.is_dir() {
        anyhow::bail!("Package path is not a directory: {}", args.package_path.display());
    }

    info!("Package path: {}", args.package_path.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting annotation resolution...");

    // Step 1: Load the package and parse its annotations
    let (parsed, source) = parse_package(&args.package_path).with_context(|| {
        format!("Failed to parse package at {}", args.package_path.display())
    })?;

    // Step 2: Resolve against the package's types
    let resolved = Resolver::new(&source.types)
        .with_inlines(&source.comments.func_inlines)
        .with_config(args.resolver_config())
        .resolve(&parsed)
        .context("Failed to resolve annotations")?;

    for name in unresolved_structs(&resolved) {
        warn!("Struct {} is referenced but not declared with @schema", name);
    }

    // Step 3: Serialize to requested format
    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&resolved)?,
        OutputFormat::Json => serialize_json(&resolved)?,
    };

    // Step 4: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
    } else {
        println!("{}", content);
    }

    info!("Summary:");
    info!("  - Package: {}", resolved.package_name);
    info!("  - Types declared: {}", source.types.len());
    info!("  - Schemas: {}", resolved.schemas.len());
    info!("  - Parameter structs: {}", resolved.parameters.len());
    info!("  - Endpoints: {}", resolved.endpoints.len());

    Ok(())
}

/// Names of undeclared structs referenced by any resolved field.
pub fn unresolved_structs(package: &ResolvedPackage) -> BTreeSet<String> {
    let schema_fields = package.schemas.values().flat_map(|s| s.fields.iter());
    let parameter_fields = package.parameters.values().flat_map(|p| p.fields.iter());
    let inline_fields = package.endpoints.iter().flat_map(|e| {
        e.inline_params
            .values()
            .flatten()
            .chain(e.inline_request.iter().flat_map(|b| b.fields.iter()))
            .chain(e.inline_responses.values().flat_map(|b| b.fields.iter()))
    });

    schema_fields
        .chain(parameter_fields)
        .chain(inline_fields)
        .filter_map(|field| field.unresolved_struct())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let args = CliArgs::try_parse_from(["openapi-from-comments", "./api"]).unwrap();

        assert_eq!(args.package_path, PathBuf::from("./api"));
        assert!(matches!(args.output_format, OutputFormat::Yaml));
        assert!(args.output_path.is_none());
        assert!(!args.verbose);

        let config = args.resolver_config();
        assert_eq!(config, ResolverConfig::default());
    }

    #[test]
    fn test_parse_all_options() {
        let args = CliArgs::try_parse_from([
            "openapi-from-comments",
            "./api",
            "-f",
            "json",
            "-o",
            "out/api.json",
            "--name-tag",
            "yaml",
            "--name-tag",
            "json",
            "--default-content-type",
            "xml",
            "-v",
        ])
        .unwrap();

        assert!(matches!(args.output_format, OutputFormat::Json));
        assert_eq!(args.output_path, Some(PathBuf::from("out/api.json")));
        assert!(args.verbose);

        let config = args.resolver_config();
        assert_eq!(config.name_tags, vec!["yaml", "json"]);
        assert_eq!(config.default_content_type, "application/xml");
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(CliArgs::try_parse_from(["openapi-from-comments", "./api", "-f", "toml"]).is_err());
    }

    #[test]
    fn test_validation_rejects_missing_directory() {
        let args = CliArgs::try_parse_from(["openapi-from-comments", "/nonexistent/package"]).unwrap();
        let err = parse_args_from_parsed(args).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
