//! OpenAPI from comments - resolves OpenAPI annotations written in Go source comments.
//!
//! API metadata lives next to the code it describes, as annotation comments
//! on a Go package, its structs, their fields and its handler functions.
//! This library reads those comments, parses them against a fixed annotation
//! grammar and cross-references them with the package's types, producing a
//! fully typed [`ResolvedPackage`](resolver::ResolvedPackage) ready for
//! OpenAPI document generation.
//!
//! # Annotations
//!
//! - `@api { ... }` on the package clause: title, version, servers, security, tags
//! - `@schema` on a struct: the struct becomes a reusable schema
//! - `@path`, `@query`, `@header`, `@cookie` on a struct: a parameter set
//! - `@field { ... }` on a struct field: description, format and constraints
//! - `@endpoint METHOD /path { ... }` on a function: an operation
//! - `@query`, `@request`, `@response 201`, ... on a struct declared inside a
//!   handler: an inline parameter set or body
//!
//! # Architecture
//!
//! 1. [`scanner`] - Lists the `.go` files of one package directory
//! 2. [`syntax`] - Parses Go source files into tree-sitter syntax trees
//! 3. [`extractor`] - Buckets comments by attachment point and records type declarations
//! 4. [`schema`] - The annotation grammar, with [`escape`] helpers
//! 5. [`annotation`] - The block/line parser producing annotation trees
//! 6. [`parser`] - Turns a package's comments into a [`ParsedPackage`](model::ParsedPackage)
//! 7. [`type_resolver`] - Classifies Go field types as OpenAPI shapes
//! 8. [`resolver`] - Binds parsed annotations to the package's types
//! 9. [`serializer`] - Dumps the resolved package as YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_comments::{
//!     parser::parse_package,
//!     resolver::Resolver,
//!     serializer::serialize_yaml,
//! };
//! use std::path::Path;
//!
//! // Load the package and parse its annotations
//! let (parsed, source) = parse_package(Path::new("./api")).unwrap();
//!
//! // Resolve them against the package's types
//! let resolved = Resolver::new(&source.types)
//!     .with_inlines(&source.comments.func_inlines)
//!     .resolve(&parsed)
//!     .unwrap();
//!
//! for endpoint in &resolved.endpoints {
//!     println!("{} {}", endpoint.method, endpoint.path);
//! }
//! println!("{}", serialize_yaml(&resolved).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod annotation;
pub mod cli;
pub mod error;
pub mod escape;
pub mod extractor;
pub mod model;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod schema;
pub mod serializer;
pub mod syntax;
pub mod type_resolver;
pub mod types;
