//! Observability for the playground
//!
//! Structured logging through `tracing`. The dispatcher opens one span per
//! operation; the HTTP server adds request spans.

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingConfig};
