//! Contains the [`SecretStore`] and [`PolicyStore`] traits used by the credential resolver to look up
//! per-user secret records and scope-down policy documents.
//!
//! Pre-made implementations exist in this workspace (`idp-store-jsonfile`, `idp-store-rest`) and you
//! can define your own to integrate with whatever key-value store holds your users. For example, a
//! store that knows a single user:
//!
//! 1. Declare dependencies on async-trait and idp-core
//!
//! ```toml
//! async-trait = "0.1.89"
//! idp-core = { path = "../path/to/idp-core" }
//! ```
//!
//! 2. Implement the [`SecretStore`] trait:
//!
//! ```no_run
//! use idp_core::store::{Error, SecretStore};
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! struct SingleUserStore;
//!
//! #[async_trait]
//! impl SecretStore for SingleUserStore {
//!     async fn get_secret(&self, key: &str) -> Result<Option<String>, Error> {
//!         if key == "/SFTP/alice" {
//!             return Ok(Some(r#"{"Password": "secret", "Role": "arn:aws:iam::123456789012:role/alice"}"#.to_string()));
//!         }
//!         Ok(None)
//!     }
//! }
//! ```
//!
//! Stores own their retry behaviour. The resolver calls each store at most once per request and
//! never retries on its own.

mod error;
pub use error::{Error, ErrorKind};

pub mod memory;
pub use memory::{InMemoryPolicyStore, InMemorySecretStore};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Looks up the JSON encoded secret record stored under a key.
#[async_trait]
pub trait SecretStore: Sync + Send + Debug {
    /// Fetches the secret stored under `key`. Returns `Ok(None)` if no such key exists.
    async fn get_secret(&self, key: &str) -> Result<Option<String>, Error>;

    /// Implement to set the name of the store. By default it returns the type signature.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Looks up the currently active version of a policy document.
#[async_trait]
pub trait PolicyStore: Sync + Send + Debug {
    /// Fetches the active version of the policy identified by `policy_id`. Returns `Ok(None)` if no
    /// such policy exists.
    async fn get_policy_document(&self, policy_id: &str) -> Result<Option<PolicyDocument>, Error>;

    /// Implement to set the name of the store. By default it returns the type signature.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A structured access control document. Its content is opaque to the resolver and handed to the
/// file-transfer service as is.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyDocument(serde_json::Value);

impl PolicyDocument {
    /// Wraps a JSON value as a policy document.
    pub fn new(document: serde_json::Value) -> Self {
        PolicyDocument(document)
    }

    /// Parses a policy document from its JSON text.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json).map(PolicyDocument)
    }

    /// The document as a JSON value.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Consumes the document returning its JSON value.
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }

    /// Renders the document as compact JSON text.
    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }
}

impl From<serde_json::Value> for PolicyDocument {
    fn from(document: serde_json::Value) -> Self {
        PolicyDocument(document)
    }
}

impl Debug for PolicyDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PolicyDocument({})", self.0)
    }
}

impl fmt::Display for PolicyDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
