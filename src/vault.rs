//! Credential vault collaborator.
//!
//! Raw secrets are exchanged for opaque references at registration time and
//! only the reference is ever persisted. The conversation layer is the sole
//! caller of [`CredentialVault::reveal`], right before a remote call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Credential reference not found: {0}")]
    UnknownReference(CredentialRef),

    #[error("Refusing to seal an empty credential")]
    EmptySecret,

    #[error("Vault unavailable: {0}")]
    Unavailable(String),
}

/// Opaque handle to a sealed secret. Never contains the secret itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialRef(String);

impl CredentialRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait CredentialVault: Send + Sync {
    /// Exchange a raw secret for a fresh reference.
    fn seal(&self, raw: &str) -> Result<CredentialRef, VaultError>;

    /// Recover the secret behind a reference.
    fn reveal(&self, reference: &CredentialRef) -> Result<Zeroizing<String>, VaultError>;

    /// Forget a reference; unknown references are ignored.
    fn discard(&self, reference: &CredentialRef);
}

/// Process-local vault. Secrets are wiped from memory when dropped.
#[derive(Default)]
pub struct InMemoryVault {
    secrets: RwLock<HashMap<CredentialRef, Zeroizing<String>>>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialVault for InMemoryVault {
    fn seal(&self, raw: &str) -> Result<CredentialRef, VaultError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(VaultError::EmptySecret);
        }
        let reference = CredentialRef(format!("cred-{}", Uuid::new_v4()));
        self.secrets
            .write()
            .map_err(|e| VaultError::Unavailable(e.to_string()))?
            .insert(reference.clone(), Zeroizing::new(raw.to_string()));
        Ok(reference)
    }

    fn reveal(&self, reference: &CredentialRef) -> Result<Zeroizing<String>, VaultError> {
        self.secrets
            .read()
            .map_err(|e| VaultError::Unavailable(e.to_string()))?
            .get(reference)
            .cloned()
            .ok_or_else(|| VaultError::UnknownReference(reference.clone()))
    }

    fn discard(&self, reference: &CredentialRef) {
        if let Ok(mut secrets) = self.secrets.write() {
            secrets.remove(reference);
        }
    }
}

impl fmt::Debug for InMemoryVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.secrets.read().map(|s| s.len()).unwrap_or_default();
        f.debug_struct("InMemoryVault")
            .field("secrets", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_and_reveal() {
        let vault = InMemoryVault::new();
        let reference = vault.seal("test-token").expect("seal");

        assert!(!reference.as_str().contains("test-token"));
        assert_eq!(vault.reveal(&reference).expect("reveal").as_str(), "test-token");
    }

    #[test]
    fn test_each_seal_gets_its_own_reference() {
        let vault = InMemoryVault::new();
        let a = vault.seal("same").expect("seal");
        let b = vault.seal("same").expect("seal");
        assert_ne!(a, b);
    }

    #[test]
    fn test_discard() {
        let vault = InMemoryVault::new();
        let reference = vault.seal("secret").expect("seal");
        vault.discard(&reference);
        assert!(matches!(
            vault.reveal(&reference),
            Err(VaultError::UnknownReference(_))
        ));
    }

    #[test]
    fn test_empty_secret_rejected() {
        let vault = InMemoryVault::new();
        assert!(matches!(vault.seal("   "), Err(VaultError::EmptySecret)));
    }

    #[test]
    fn test_debug_does_not_leak() {
        let vault = InMemoryVault::new();
        vault.seal("hunter2").expect("seal");
        let debug = format!("{vault:?}");
        assert!(!debug.contains("hunter2"));
    }
}
