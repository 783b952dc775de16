//! Hash map backed stores, handy for tests and for embedding a fixed set of users.

use super::{Error, PolicyDocument, PolicyStore, SecretStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A [`SecretStore`] that keeps its secrets in memory.
///
/// # Example
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use idp_core::store::{InMemorySecretStore, SecretStore};
///
/// let store = InMemorySecretStore::new().with_secret("/SFTP/alice", r#"{"Password":"secret"}"#);
/// assert!(store.get_secret("/SFTP/alice").await.unwrap().is_some());
/// assert!(store.get_secret("/SFTP/bob").await.unwrap().is_none());
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl InMemorySecretStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a secret in a builder-like fashion.
    pub fn with_secret<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.secrets.get_mut().insert(key.into(), value.into());
        self
    }

    /// Adds or replaces a secret.
    pub async fn insert<K: Into<String>, V: Into<String>>(&self, key: K, value: V) {
        self.secrets.write().await.insert(key.into(), value.into());
    }

    /// Removes a secret, returning it if it was present.
    pub async fn remove(&self, key: &str) -> Option<String> {
        self.secrets.write().await.remove(key)
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_secret(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.secrets.read().await.get(key).cloned())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// A [`PolicyStore`] that keeps its policy documents in memory.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    policies: RwLock<HashMap<String, PolicyDocument>>,
}

impl InMemoryPolicyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a policy document in a builder-like fashion.
    pub fn with_policy<K: Into<String>, D: Into<PolicyDocument>>(mut self, policy_id: K, document: D) -> Self {
        self.policies.get_mut().insert(policy_id.into(), document.into());
        self
    }

    /// Adds or replaces a policy document.
    pub async fn insert<K: Into<String>, D: Into<PolicyDocument>>(&self, policy_id: K, document: D) {
        self.policies.write().await.insert(policy_id.into(), document.into());
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn get_policy_document(&self, policy_id: &str) -> Result<Option<PolicyDocument>, Error> {
        Ok(self.policies.read().await.get(policy_id).cloned())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
