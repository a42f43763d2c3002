//! # Auth Module
//!
//! API-key gate for the playground routes: key issuing, digest storage and
//! request validation.

pub mod api_key;
pub mod crypto;
pub mod errors;

pub use api_key::{extract_token, ApiKey, ApiKeyGate, ApiKeyStore, KeyStatus, MemoryApiKeyStore};
pub use errors::{AuthError, AuthResult};
