//! Bearer token handling.
//!
//! Tokens are kept in the OS keyring, one entry per profile. The
//! [`TokenStore`] trait lets the UI purge a token on a 401 without knowing
//! where it lives.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use super::error::{ApiError, Result};

/// The keyring service name for CANAGROSA tokens.
const KEYRING_SERVICE: &str = "canagrosa";

/// Credentials attached to every request.
#[derive(Clone)]
pub struct BearerAuth {
    header: String,
}

impl BearerAuth {
    pub fn new(token: &str) -> Self {
        Self {
            header: format!("Bearer {}", token.trim()),
        }
    }

    /// Load the token for `profile_name` from `store`.
    pub fn from_store(store: &dyn TokenStore, profile_name: &str) -> Result<Self> {
        let token = store.get(profile_name)?;
        Ok(Self::new(&token))
    }

    /// The complete `Authorization` header value.
    pub fn header_value(&self) -> &str {
        &self.header
    }
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth").field("header", &"Bearer ***").finish()
    }
}

/// Where bearer tokens are kept.
pub trait TokenStore: Send + Sync {
    fn get(&self, profile_name: &str) -> Result<String>;
    fn set(&self, profile_name: &str, token: &str) -> Result<()>;
    /// Remove the token. Removing a missing token is not an error.
    fn delete(&self, profile_name: &str) -> Result<()>;

    fn has_token(&self, profile_name: &str) -> bool {
        self.get(profile_name).is_ok()
    }
}

/// Tokens in the OS keyring.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringTokenStore;

impl KeyringTokenStore {
    fn entry(profile_name: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(KEYRING_SERVICE, profile_name)
            .map_err(|e| ApiError::Keyring(format!("failed to access keyring: {}", e)))
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self, profile_name: &str) -> Result<String> {
        match Self::entry(profile_name)?.get_password() {
            Ok(token) => Ok(token),
            Err(keyring::Error::NoEntry) => Err(ApiError::MissingToken(profile_name.to_string())),
            Err(e) => Err(ApiError::Keyring(format!("failed to retrieve token: {}", e))),
        }
    }

    fn set(&self, profile_name: &str, token: &str) -> Result<()> {
        Self::entry(profile_name)?
            .set_password(token)
            .map_err(|e| ApiError::Keyring(format!("failed to store token: {}", e)))?;
        info!(profile = profile_name, "Stored token");
        Ok(())
    }

    fn delete(&self, profile_name: &str) -> Result<()> {
        match Self::entry(profile_name)?.delete_password() {
            Ok(()) => {
                info!(profile = profile_name, "Removed token");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!(profile = profile_name, "No token to remove");
                Ok(())
            }
            Err(e) => Err(ApiError::Keyring(format!("failed to delete token: {}", e))),
        }
    }
}

/// Tokens in memory; clones share state.
#[derive(Debug, Default, Clone)]
pub struct MemoryTokenStore {
    tokens: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.tokens
            .lock()
            .map_err(|_| ApiError::Keyring("token store lock poisoned".to_string()))
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, profile_name: &str) -> Result<String> {
        self.lock()?
            .get(profile_name)
            .cloned()
            .ok_or_else(|| ApiError::MissingToken(profile_name.to_string()))
    }

    fn set(&self, profile_name: &str, token: &str) -> Result<()> {
        self.lock()?
            .insert(profile_name.to_string(), token.to_string());
        Ok(())
    }

    fn delete(&self, profile_name: &str) -> Result<()> {
        self.lock()?.remove(profile_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header() {
        let auth = BearerAuth::new("  abc123\n");
        assert_eq!(auth.header_value(), "Bearer abc123");
    }

    #[test]
    fn test_auth_does_not_expose_token() {
        let auth = BearerAuth::new("secret_token");
        let debug_output = format!("{:?}", auth);
        assert!(!debug_output.contains("secret_token"));
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryTokenStore::new();
        assert!(!store.has_token("lab"));
        assert!(matches!(store.get("lab"), Err(ApiError::MissingToken(_))));

        store.set("lab", "t0k3n").unwrap();
        assert!(store.has_token("lab"));
        let auth = BearerAuth::from_store(&store, "lab").unwrap();
        assert_eq!(auth.header_value(), "Bearer t0k3n");

        store.delete("lab").unwrap();
        assert!(!store.has_token("lab"));
        // Deleting again is fine
        store.delete("lab").unwrap();
    }

    #[test]
    fn test_memory_store_clones_share_tokens() {
        let store = MemoryTokenStore::new();
        let other = store.clone();
        store.set("lab", "x").unwrap();
        assert_eq!(other.get("lab").unwrap(), "x");
    }
}
