//! # HTTP Server Module
//!
//! Serves the playground over HTTP.
//!
//! # Endpoints
//!
//! - `{base_path}/{model}` - list and create
//! - `{base_path}/{model}/{id}` - show, update and delete
//! - `/openapi.json` - generated API description

pub mod config;
pub mod server;

pub use config::HttpServerConfig;
pub use server::HttpServer;
