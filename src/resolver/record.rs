use serde::Deserialize;
use std::fmt;

/// The per-user record kept in the secret store. Only the fields below are recognized, anything
/// else in the record is ignored.
#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecretRecord {
    /// Shared secret, compared as is against the presented password.
    pub password: Option<String>,
    /// The SSH public key(s) of the user.
    pub public_key: Option<PublicKeys>,
    /// The IAM role the session assumes.
    pub role: Option<String>,
    /// Identifier of a scope-down policy to attach to the session.
    pub policy: Option<String>,
    /// Flat home directory path.
    pub home_directory: Option<String>,
    /// Virtual folder mapping. Opaque, passed to the file-transfer service untouched.
    pub home_directory_details: Option<serde_json::Value>,
}

/// One or more stored SSH public keys.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PublicKeys {
    /// A single key
    One(String),
    /// A list of keys
    Many(Vec<String>),
}

impl SecretRecord {
    /// Parses a record from the JSON text held by the secret store.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// The stored public keys. An empty list counts as no keys.
    pub fn public_keys(&self) -> Option<Vec<String>> {
        match &self.public_key {
            Some(PublicKeys::One(key)) => Some(vec![key.clone()]),
            Some(PublicKeys::Many(keys)) if !keys.is_empty() => Some(keys.clone()),
            _ => None,
        }
    }
}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("password", &self.password.as_ref().map(|_| "*******"))
            .field("public_key", &self.public_key)
            .field("role", &self.role)
            .field("policy", &self.policy)
            .field("home_directory", &self.home_directory)
            .field("home_directory_details", &self.home_directory_details)
            .finish()
    }
}
