//! OpenAPI from comments - command-line tool resolving Go annotation comments.
//!
//! Loads one Go package, parses the `@api`, `@schema`, `@field`, parameter
//! and `@endpoint` annotations in its comments, resolves them against the
//! package's types and prints the resolved model.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-comments [OPTIONS] <PACKAGE_PATH>
//! ```
//!
//! # Examples
//!
//! Dump the resolved model as YAML:
//! ```bash
//! openapi-from-comments ./api -o resolved.yaml
//! ```
//!
//! Use `yaml` tags for field names and emit JSON:
//! ```bash
//! openapi-from-comments ./api --name-tag yaml -f json
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_comments::cli;

fn main() -> Result<()> {
    // Parse first so the verbose flag can set the log level
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("openapi-from-comments starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("Annotation resolution completed successfully");

    Ok(())
}
