//! [`SecretStore`] and [`PolicyStore`] implementation that reads user records and policy
//! documents from a JSON file.
//!
//! The file holds two maps, `secrets` keyed by secret path and `policies` keyed by policy
//! identifier:
//!
//! ```json
//! {
//!   "secrets": {
//!     "/SFTP/alice": {
//!       "Password": "not secret",
//!       "Role": "arn:aws:iam::123456789012:role/sftp-user",
//!       "Policy": "arn:aws:iam::123456789012:policy/scope-down",
//!       "HomeDirectory": "/sftp.example.com/alice"
//!     },
//!     "/SFTP/bella": "{\"PublicKey\": \"ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIG bella@example.com\"}"
//!   },
//!   "policies": {
//!     "arn:aws:iam::123456789012:policy/scope-down": {
//!       "Version": "2012-10-17",
//!       "Statement": []
//!     }
//!   }
//! }
//! ```
//!
//! A secret may be given as an object or as a string holding the JSON text of the record, the way
//! parameter stores keep them. The file itself may be plain JSON, gzipped JSON or base64 encoded
//! gzipped JSON.
//!
//! [`SecretStore`]: idp_core::store::SecretStore
//! [`PolicyStore`]: idp_core::store::PolicyStore

use async_trait::async_trait;
use base64::Engine;
use flate2::read::GzDecoder;
use idp_core::store::{Error, PolicyDocument, PolicyStore, SecretStore};
use serde::Deserialize;
use serde_json::Value;
use std::{collections::HashMap, fmt, fs, io::Read, path::Path};
use thiserror::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct StoreFile {
    #[serde(default)]
    secrets: HashMap<String, Value>,
    #[serde(default)]
    policies: HashMap<String, Value>,
}

/// The error returned when a [`JsonFileStore`] can't be loaded.
#[derive(Debug, Error)]
pub enum JsonFileError {
    /// The file could not be read or decompressed.
    #[error("could not read store file: {0}")]
    Io(#[from] std::io::Error),
    /// The content looked base64 encoded but wasn't.
    #[error("could not base64 decode store file: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The content is not valid JSON of the expected shape.
    #[error("invalid store file: {0}")]
    Json(#[from] serde_json::Error),
    /// A secret is neither an object nor a string.
    #[error("secret {0:?} must be an object or a string")]
    InvalidSecret(String),
    /// A policy is neither an object nor a string holding a JSON document.
    #[error("policy {0:?} must be a JSON document")]
    InvalidPolicy(String),
}

/// Serves secrets and policy documents loaded once from a JSON file.
///
/// # Example
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use idp_core::store::SecretStore;
/// use idp_store_jsonfile::JsonFileStore;
///
/// let store = JsonFileStore::from_json(r#"{"secrets": {"/SFTP/alice": {"Password": "not secret"}}}"#).unwrap();
/// assert_eq!(store.get_secret("/SFTP/alice").await.unwrap().as_deref(), Some(r#"{"Password":"not secret"}"#));
/// assert_eq!(store.get_secret("/SFTP/bella").await.unwrap(), None);
/// # }
/// ```
#[derive(Clone)]
pub struct JsonFileStore {
    secrets: HashMap<String, String>,
    policies: HashMap<String, PolicyDocument>,
}

impl JsonFileStore {
    /// Initialize a new [`JsonFileStore`] from file.
    pub fn from_file<P: AsRef<Path>>(filename: P) -> Result<Self, JsonFileError> {
        let bytes = fs::read(filename)?;
        let json = decode(bytes)?;
        JsonFileStore::from_json(json)
    }

    /// Initialize a new [`JsonFileStore`] from json string.
    pub fn from_json<T: Into<String>>(json: T) -> Result<Self, JsonFileError> {
        let file: StoreFile = serde_json::from_str(&json.into())?;

        let secrets = file
            .secrets
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => Ok((key, s)),
                Value::Object(_) => Ok((key, value.to_string())),
                _ => Err(JsonFileError::InvalidSecret(key)),
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        let policies = file
            .policies
            .into_iter()
            .map(|(id, value)| match value {
                Value::String(s) => match PolicyDocument::from_json(&s) {
                    Ok(doc) if doc.as_value().is_object() => Ok((id, doc)),
                    _ => Err(JsonFileError::InvalidPolicy(id)),
                },
                Value::Object(_) => Ok((id, PolicyDocument::new(value))),
                _ => Err(JsonFileError::InvalidPolicy(id)),
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        tracing::debug!(secrets = secrets.len(), policies = policies.len(), "loaded json store");
        Ok(JsonFileStore { secrets, policies })
    }
}

// Unwraps the optional base64 and gzip layers around the JSON text.
fn decode(bytes: Vec<u8>) -> Result<String, JsonFileError> {
    let bytes = if looks_like_json(&bytes) || bytes.starts_with(&GZIP_MAGIC) {
        bytes
    } else {
        let text: Vec<u8> = bytes.into_iter().filter(|b| !b.is_ascii_whitespace()).collect();
        base64::engine::general_purpose::STANDARD.decode(text)?
    };

    if bytes.starts_with(&GZIP_MAGIC) {
        let mut json = String::new();
        GzDecoder::new(bytes.as_slice()).read_to_string(&mut json)?;
        Ok(json)
    } else {
        String::from_utf8(bytes).map_err(|e| JsonFileError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }
}

fn looks_like_json(bytes: &[u8]) -> bool {
    matches!(bytes.iter().find(|b| !b.is_ascii_whitespace()), Some(b'{') | Some(b'['))
}

#[async_trait]
impl SecretStore for JsonFileStore {
    #[tracing_attributes::instrument(skip(self))]
    async fn get_secret(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.secrets.get(key).cloned())
    }

    fn name(&self) -> &str {
        "jsonfile"
    }
}

#[async_trait]
impl PolicyStore for JsonFileStore {
    #[tracing_attributes::instrument(skip(self))]
    async fn get_policy_document(&self, policy_id: &str) -> Result<Option<PolicyDocument>, Error> {
        Ok(self.policies.get(policy_id).cloned())
    }

    fn name(&self) -> &str {
        "jsonfile"
    }
}

impl fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonFileStore")
            .field("secrets", &self.secrets.len())
            .field("policies", &self.policies.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const JSON: &str = r#"{
  "secrets": {
    "/SFTP/alice": {"Password": "not secret", "Policy": "scope-down"},
    "/SFTP/bella": "{\"PublicKey\": \"ssh-ed25519 AAAA bella\"}"
  },
  "policies": {
    "scope-down": {"Version": "2012-10-17", "Statement": []},
    "as-text": "{\"Version\": \"2012-10-17\"}"
  }
}"#;

    #[tokio::test]
    async fn serves_secrets_given_as_object_or_string() {
        let store = JsonFileStore::from_json(JSON).unwrap();

        let alice: Value = serde_json::from_str(&store.get_secret("/SFTP/alice").await.unwrap().unwrap()).unwrap();
        assert_eq!(alice, json!({"Password": "not secret", "Policy": "scope-down"}));

        let bella = store.get_secret("/SFTP/bella").await.unwrap();
        assert_eq!(bella.as_deref(), Some(r#"{"PublicKey": "ssh-ed25519 AAAA bella"}"#));

        assert_eq!(store.get_secret("/SFTP/carol").await.unwrap(), None);
    }

    #[tokio::test]
    async fn serves_policies() {
        let store = JsonFileStore::from_json(JSON).unwrap();

        let doc = store.get_policy_document("scope-down").await.unwrap().unwrap();
        assert_eq!(doc.as_value(), &json!({"Version": "2012-10-17", "Statement": []}));
        let doc = store.get_policy_document("as-text").await.unwrap().unwrap();
        assert_eq!(doc.as_value(), &json!({"Version": "2012-10-17"}));
        assert!(store.get_policy_document("missing").await.unwrap().is_none());
    }

    #[test]
    fn rejects_bad_entries() {
        assert!(matches!(
            JsonFileStore::from_json(r#"{"secrets": {"/SFTP/alice": 42}}"#),
            Err(JsonFileError::InvalidSecret(key)) if key == "/SFTP/alice"
        ));
        assert!(matches!(
            JsonFileStore::from_json(r#"{"policies": {"p": "not json"}}"#),
            Err(JsonFileError::InvalidPolicy(id)) if id == "p"
        ));
        assert!(matches!(JsonFileStore::from_json(r#"{"users": {}}"#), Err(JsonFileError::Json(_))));
        assert!(JsonFileStore::from_json("{}").is_ok());
    }

    #[test]
    fn debug_does_not_show_secrets() {
        let store = JsonFileStore::from_json(JSON).unwrap();
        let debug = format!("{:?}", store);
        assert!(!debug.contains("not secret"));
        assert_eq!(debug, "JsonFileStore { secrets: 2, policies: 2 }");
    }

    #[test]
    fn decode_passes_plain_json_through() {
        assert_eq!(decode(b"  {\"secrets\": {}}".to_vec()).unwrap(), "  {\"secrets\": {}}");
        assert!(decode(b"%%% not base64 %%%".to_vec()).is_err());
    }
}
