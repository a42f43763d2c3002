//! # API Keys
//!
//! Keys guarding the playground routes. The raw token is handed out once at
//! issue time; only its digest is kept.
//!
//! Revoked keys validate as unknown so a caller cannot tell a revoked key
//! from one that never existed.

use std::sync::{Arc, RwLock};

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::crypto::{constant_time_str_eq, generate_token, hash_token};
use super::errors::{AuthError, AuthResult};

/// Header carrying a key when `Authorization` is not used
pub const API_KEY_HEADER: &str = "x-api-key";

/// API key model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,

    /// Human label
    pub name: String,

    /// SHA-256 digest of the raw token
    #[serde(skip_serializing)]
    pub token_digest: String,

    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,

    pub revoked: bool,
}

impl ApiKey {
    /// Build a key from an already digested token
    pub fn from_digest(
        name: impl Into<String>,
        token_digest: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            token_digest: token_digest.into(),
            created_at: Utc::now(),
            expires_at,
            last_used_at: None,
            revoked: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Result of checking a presented token
#[derive(Debug, Clone)]
pub enum KeyStatus {
    Valid(ApiKey),
    Expired,
    Unknown,
}

/// API key repository trait
pub trait ApiKeyStore: Send + Sync {
    /// Find a key by token digest
    fn find_by_digest(&self, digest: &str) -> AuthResult<Option<ApiKey>>;

    /// Store a new key
    fn insert(&self, key: &ApiKey) -> AuthResult<()>;

    /// Record a successful use
    fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> AuthResult<()>;

    /// All keys, revoked ones included
    fn list(&self) -> AuthResult<Vec<ApiKey>>;

    /// Revoke a key
    fn revoke(&self, id: Uuid) -> AuthResult<()>;
}

/// In-memory key repository
#[derive(Debug, Default)]
pub struct MemoryApiKeyStore {
    keys: RwLock<Vec<ApiKey>>,
}

impl MemoryApiKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(keys: Vec<ApiKey>) -> Self {
        Self {
            keys: RwLock::new(keys),
        }
    }
}

impl ApiKeyStore for MemoryApiKeyStore {
    fn find_by_digest(&self, digest: &str) -> AuthResult<Option<ApiKey>> {
        let keys = self
            .keys
            .read()
            .map_err(|_| AuthError::StorageError("Lock poisoned".to_string()))?;
        Ok(keys
            .iter()
            .find(|k| constant_time_str_eq(&k.token_digest, digest))
            .cloned())
    }

    fn insert(&self, key: &ApiKey) -> AuthResult<()> {
        let mut keys = self
            .keys
            .write()
            .map_err(|_| AuthError::StorageError("Lock poisoned".to_string()))?;
        keys.push(key.clone());
        Ok(())
    }

    fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> AuthResult<()> {
        let mut keys = self
            .keys
            .write()
            .map_err(|_| AuthError::StorageError("Lock poisoned".to_string()))?;
        let key = keys
            .iter_mut()
            .find(|k| k.id == id)
            .ok_or_else(|| AuthError::KeyNotFound(id.to_string()))?;
        key.last_used_at = Some(at);
        Ok(())
    }

    fn list(&self) -> AuthResult<Vec<ApiKey>> {
        let keys = self
            .keys
            .read()
            .map_err(|_| AuthError::StorageError("Lock poisoned".to_string()))?;
        Ok(keys.clone())
    }

    fn revoke(&self, id: Uuid) -> AuthResult<()> {
        let mut keys = self
            .keys
            .write()
            .map_err(|_| AuthError::StorageError("Lock poisoned".to_string()))?;

        if let Some(key) = keys.iter_mut().find(|k| k.id == id) {
            key.revoked = true;
            Ok(())
        } else {
            Err(AuthError::KeyNotFound(id.to_string()))
        }
    }
}

/// Validates presented keys and issues new ones
#[derive(Clone)]
pub struct ApiKeyGate {
    store: Arc<dyn ApiKeyStore>,
    required: bool,
}

impl std::fmt::Debug for ApiKeyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGate")
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

impl ApiKeyGate {
    pub fn new(store: Arc<dyn ApiKeyStore>, required: bool) -> Self {
        Self { store, required }
    }

    /// A gate that lets every request through
    pub fn open() -> Self {
        Self::new(Arc::new(MemoryApiKeyStore::new()), false)
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn store(&self) -> &Arc<dyn ApiKeyStore> {
        &self.store
    }

    /// Check a raw token. A valid key has its last use recorded.
    pub fn validate(&self, token: &str) -> AuthResult<KeyStatus> {
        let digest = hash_token(token);
        let Some(key) = self.store.find_by_digest(&digest)? else {
            return Ok(KeyStatus::Unknown);
        };

        if key.revoked {
            return Ok(KeyStatus::Unknown);
        }

        let now = Utc::now();
        if key.is_expired(now) {
            return Ok(KeyStatus::Expired);
        }

        self.store.touch_last_used(key.id, now)?;
        debug!(key = %key.name, "api key accepted");
        Ok(KeyStatus::Valid(ApiKey {
            last_used_at: Some(now),
            ..key
        }))
    }

    /// Decide a request. Returns the matched key, or `None` when the gate is
    /// open and no key was presented.
    pub fn authorize(&self, token: Option<&str>) -> AuthResult<Option<ApiKey>> {
        let Some(token) = token else {
            return if self.required {
                Err(AuthError::MissingKey)
            } else {
                Ok(None)
            };
        };

        match self.validate(token)? {
            KeyStatus::Valid(key) => Ok(Some(key)),
            _ if !self.required => Ok(None),
            KeyStatus::Expired => Err(AuthError::ExpiredKey),
            KeyStatus::Unknown => Err(AuthError::InvalidKey),
        }
    }

    /// Create a key. The raw token is returned here and nowhere else.
    pub fn issue(&self, name: &str, ttl: Option<Duration>) -> AuthResult<(ApiKey, String)> {
        let (key, token) = new_key(name, ttl)?;
        self.store.insert(&key)?;
        info!(key = %key.name, id = %key.id, "api key issued");
        Ok((key, token))
    }

    pub fn revoke(&self, id: Uuid) -> AuthResult<()> {
        self.store.revoke(id)?;
        info!(id = %id, "api key revoked");
        Ok(())
    }
}

/// Generate a key and its raw token without storing it
pub fn new_key(name: &str, ttl: Option<Duration>) -> AuthResult<(ApiKey, String)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::InvalidName("name must not be empty".to_string()));
    }

    let token = generate_token();
    let expires_at = ttl.map(|ttl| Utc::now() + ttl);
    Ok((ApiKey::from_digest(name, hash_token(&token), expires_at), token))
}

/// Token from `Authorization: Bearer <token>` or `X-API-Key: <token>`
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(auth) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return Some(token.trim()).filter(|t| !t.is_empty());
        }
    }

    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn gate(required: bool) -> ApiKeyGate {
        ApiKeyGate::new(Arc::new(MemoryApiKeyStore::new()), required)
    }

    #[test]
    fn test_issue_and_validate() {
        let gate = gate(true);
        let (key, token) = gate.issue("ci", None).unwrap();

        assert_ne!(key.token_digest, token);
        match gate.validate(&token).unwrap() {
            KeyStatus::Valid(found) => {
                assert_eq!(found.id, key.id);
                assert!(found.last_used_at.is_some());
            }
            other => panic!("expected Valid, got {:?}", other),
        }

        let stored = gate.store().list().unwrap();
        assert!(stored[0].last_used_at.is_some());
    }

    #[test]
    fn test_unknown_and_revoked_keys() {
        let gate = gate(true);
        assert!(matches!(gate.validate("nope").unwrap(), KeyStatus::Unknown));

        let (key, token) = gate.issue("ci", None).unwrap();
        gate.revoke(key.id).unwrap();
        assert!(matches!(gate.validate(&token).unwrap(), KeyStatus::Unknown));
    }

    #[test]
    fn test_expired_key() {
        let gate = gate(true);
        let (_, token) = gate.issue("old", Some(Duration::seconds(-1))).unwrap();
        assert!(matches!(gate.validate(&token).unwrap(), KeyStatus::Expired));
        assert!(matches!(
            gate.authorize(Some(&token)),
            Err(AuthError::ExpiredKey)
        ));
    }

    #[test]
    fn test_authorize_when_required() {
        let gate = gate(true);
        assert!(matches!(gate.authorize(None), Err(AuthError::MissingKey)));
        assert!(matches!(
            gate.authorize(Some("bogus")),
            Err(AuthError::InvalidKey)
        ));

        let (_, token) = gate.issue("ci", None).unwrap();
        assert!(gate.authorize(Some(&token)).unwrap().is_some());
    }

    #[test]
    fn test_authorize_when_open() {
        let gate = gate(false);
        assert!(gate.authorize(None).unwrap().is_none());
        assert!(gate.authorize(Some("bogus")).unwrap().is_none());
    }

    #[test]
    fn test_issue_rejects_blank_name() {
        assert!(matches!(
            gate(true).issue("  ", None),
            Err(AuthError::InvalidName(_))
        ));
    }

    #[test]
    fn test_extract_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        headers.insert(API_KEY_HEADER, HeaderValue::from_static("abc"));
        assert_eq!(extract_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(extract_token(&headers), Some("xyz"));
    }
}
