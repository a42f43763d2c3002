//! CLI module for the playground
//!
//! Provides command-line interface for:
//! - serve: Load configuration and run the HTTP server
//! - check: Validate configuration and print normalized models
//! - openapi: Print the generated OpenAPI document
//! - generate-key: Create an API key

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check, generate_key, print_openapi, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
