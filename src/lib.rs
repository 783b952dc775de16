#![forbid(unsafe_code)]

//! The decision engine of a custom identity provider for managed SFTP/FTPS file-transfer services.
//!
//! When a user connects, the file-transfer service asks its identity provider whether the user may
//! log in and, if so, with which IAM role, scope-down policy and home directory. This crate answers
//! that question from a per-user secret record kept in a key-value store.
//!
//! # Usage
//!
//! Add the needed dependencies to Cargo.toml:
//!
//! ```toml
//! [dependencies]
//! transfer-idp = "0.1.0"
//! idp-store-jsonfile = "0.1.0"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! Then build a [`CredentialResolver`] from a secret store and a policy store and feed it the
//! events of the file-transfer service:
//!
//! ```no_run
//! use transfer_idp::ResolverBuilder;
//! use idp_store_jsonfile::JsonFileStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! pub async fn main() {
//!     let store = Arc::new(JsonFileStore::from_file("/etc/idp/users.json").unwrap());
//!     let resolver = ResolverBuilder::new(store.clone(), store).metrics().build().unwrap();
//!
//!     let event = serde_json::json!({"username": "alice", "password": "secret", "serverId": "s-1234"});
//!     println!("{}", resolver.handle_event(event).await);
//! }
//! ```
//!
//! The secret record of user `alice` is looked up under `/SFTP/alice` and may hold the fields
//! `Password`, `PublicKey`, `Role`, `Policy`, `HomeDirectory` and `HomeDirectoryDetails`. See
//! [`SecretRecord`] for their meaning.

pub(crate) mod metrics;
pub mod options;
pub mod resolver;

pub use idp_core::store;
pub use resolver::{
    AuthDecision, AuthMode, AuthRequest, AuthResponse, BuilderError, CredentialResolver, Grant, HomeDirectory, HomeDirectoryType, ResolverBuilder,
    SecretRecord,
};
