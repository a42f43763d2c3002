//! CLI argument definitions using clap
//!
//! Commands:
//! - playground serve --config <path> [--port <port>]
//! - playground check --config <path>
//! - playground openapi --config <path>
//! - playground generate-key --name <name> [--expires-in-days <days>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Playground - JSON:API CRUD endpoints for declared models
#[derive(Parser, Debug)]
#[command(name = "playground")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./playground.json")]
        config: PathBuf,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate a configuration file and print the normalized models
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./playground.json")]
        config: PathBuf,
    },

    /// Print the OpenAPI document for the configured models
    Openapi {
        /// Path to configuration file
        #[arg(long, default_value = "./playground.json")]
        config: PathBuf,
    },

    /// Generate an API key and print its config entry
    GenerateKey {
        /// Label for the key
        #[arg(long)]
        name: String,

        /// Days until the key expires; never when omitted
        #[arg(long)]
        expires_in_days: Option<u32>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
