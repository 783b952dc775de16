//! Contains the [`CredentialResolver`], the decision engine behind the identity provider.
//!
//! Given an [`AuthRequest`] the resolver
//!
//! 1. fetches the secret record of the user from the [`SecretStore`],
//! 2. checks the presented password, or, when none was presented, picks the stored public keys,
//! 3. fetches the scope-down policy named by the record from the [`PolicyStore`], and
//! 4. assembles the session settings into an [`AuthDecision`].
//!
//! Every failure ends in [`AuthDecision::Denied`] and nothing about the cause is handed back to
//! the caller. The cause is logged instead. A policy that cannot be fetched is the one exception:
//! the user is still let in, just without the scope-down policy.
//!
//! [`SecretStore`]: idp_core::store::SecretStore
//! [`PolicyStore`]: idp_core::store::PolicyStore

mod builder;
pub use builder::{BuilderError, ResolverBuilder};

mod decision;
pub use decision::{AuthDecision, AuthResponse, Grant, HomeDirectory, HomeDirectoryType};

mod denial;
use denial::Denial;

mod handler;

mod record;
pub use record::{PublicKeys, SecretRecord};

mod request;
pub use request::{AuthMode, AuthRequest};


use crate::metrics::{self, Backend};
use crate::options::{self, PolicyEncoding};
use idp_core::store::{PolicyDocument, PolicyStore, SecretStore};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Decides whether an authentication attempt succeeds and what session the user gets.
///
/// The resolver holds no per-request state. Share it behind an [`Arc`] and call [`resolve`] from
/// as many tasks as needed.
///
/// # Example
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use transfer_idp::{AuthRequest, ResolverBuilder};
/// use transfer_idp::store::{InMemoryPolicyStore, InMemorySecretStore};
/// use std::sync::Arc;
///
/// let secrets = InMemorySecretStore::new()
///     .with_secret("/SFTP/alice", r#"{"Password": "secret", "Role": "arn:aws:iam::123456789012:role/alice"}"#);
/// let resolver = ResolverBuilder::new(Arc::new(secrets), Arc::new(InMemoryPolicyStore::new())).build().unwrap();
///
/// let decision = resolver.resolve(&AuthRequest::new("alice", "s-1234").with_password("secret")).await;
/// assert_eq!(decision.grant().unwrap().role(), "arn:aws:iam::123456789012:role/alice");
///
/// let decision = resolver.resolve(&AuthRequest::new("alice", "s-1234").with_password("guess")).await;
/// assert!(!decision.is_granted());
/// # }
/// ```
///
/// [`resolve`]: CredentialResolver::resolve
pub struct CredentialResolver {
    secrets: Arc<dyn SecretStore>,
    policies: Arc<dyn PolicyStore>,
    namespace: String,
    allowed_server_ids: Option<HashSet<String>>,
    policy_encoding: PolicyEncoding,
    logger: slog::Logger,
    collect_metrics: bool,
}

impl CredentialResolver {
    /// Starts a [`ResolverBuilder`] with the given stores.
    pub fn builder(secrets: Arc<dyn SecretStore>, policies: Arc<dyn PolicyStore>) -> ResolverBuilder {
        ResolverBuilder::new(secrets, policies)
    }

    /// Resolves an authentication attempt.
    pub async fn resolve(&self, request: &AuthRequest) -> AuthDecision {
        let logger = self.logger.new(slog::o!(
            "trace-id" => Uuid::new_v4().to_string(),
            "username" => request.username().to_string(),
            "server-id" => request.server_id().to_string(),
        ));
        slog::debug!(logger, "Resolving {} authentication", request.mode(); "protocol" => request.protocol(), "source-ip" => request.source_ip());

        match self.authenticate(&logger, request).await {
            Ok(grant) => {
                slog::info!(logger, "Authentication granted"; "role" => grant.role(), "policy" => grant.policy().is_some(), "home" => format!("{:?}", grant.home()));
                if self.collect_metrics {
                    metrics::add_grant_metric();
                }
                AuthDecision::Granted(grant)
            }
            Err(denial) => {
                match &denial {
                    Denial::SecretStore(e) => slog::error!(logger, "Authentication denied: {}: {}", denial, e; "reason" => denial.reason()),
                    Denial::UnparseableRecord(e) => slog::warn!(logger, "Authentication denied: {}: {}", denial, e; "reason" => denial.reason()),
                    _ => slog::info!(logger, "Authentication denied: {}", denial; "reason" => denial.reason()),
                }
                if self.collect_metrics {
                    metrics::add_denial_metric(denial.reason());
                }
                AuthDecision::Denied
            }
        }
    }

    /// Resolves an authentication attempt straight into the response mapping for the
    /// file-transfer service.
    pub async fn respond(&self, request: &AuthRequest) -> AuthResponse {
        self.resolve(request).await.into_response(self.policy_encoding)
    }

    async fn authenticate(&self, logger: &slog::Logger, request: &AuthRequest) -> Result<Grant, Denial> {
        if !request.is_well_formed() {
            return Err(Denial::MalformedRequest);
        }
        if matches!(&self.allowed_server_ids, Some(allowed) if !allowed.contains(request.server_id())) {
            return Err(Denial::UnknownServer);
        }

        let record = self.fetch_record(request.username()).await?;

        let public_keys = match request.mode() {
            AuthMode::Password => {
                let stored = record.password.as_deref().ok_or(Denial::NoPassword)?;
                // Exact comparison, the stored secret is plaintext.
                if request.password().map(str::as_bytes) != Some(stored.as_bytes()) {
                    return Err(Denial::PasswordMismatch);
                }
                None
            }
            AuthMode::PublicKey => Some(record.public_keys().ok_or(Denial::NoPublicKey)?),
        };

        let policy = match &record.policy {
            Some(policy_id) => self.fetch_policy(logger, policy_id).await,
            None => None,
        };

        let home = match (record.home_directory_details, record.home_directory) {
            (Some(details), _) => Some(HomeDirectory::Logical(details)),
            (None, Some(path)) => Some(HomeDirectory::Path(path)),
            (None, None) => None,
        };

        Ok(Grant {
            role: record.role.unwrap_or_default(),
            policy,
            public_keys,
            home,
        })
    }

    async fn fetch_record(&self, username: &str) -> Result<SecretRecord, Denial> {
        let key = options::secret_key(&self.namespace, username);
        let secret = match self.secrets.get_secret(&key).await {
            Ok(Some(secret)) => secret,
            Ok(None) => return Err(Denial::SecretNotFound),
            Err(e) => {
                if self.collect_metrics {
                    metrics::add_backend_error_metric(Backend::Secret);
                }
                return Err(Denial::SecretStore(e));
            }
        };
        SecretRecord::from_json(&secret).map_err(Denial::UnparseableRecord)
    }

    // A policy that cannot be fetched is left out rather than failing the login.
    async fn fetch_policy(&self, logger: &slog::Logger, policy_id: &str) -> Option<PolicyDocument> {
        match self.policies.get_policy_document(policy_id).await {
            Ok(Some(document)) => Some(document),
            Ok(None) => {
                slog::warn!(logger, "Policy not found, continuing without scope-down policy"; "policy-id" => policy_id);
                None
            }
            Err(e) => {
                slog::error!(logger, "Could not fetch policy, continuing without scope-down policy: {}", e; "policy-id" => policy_id);
                if self.collect_metrics {
                    metrics::add_backend_error_metric(Backend::Policy);
                }
                None
            }
        }
    }
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("secrets", &self.secrets.name())
            .field("policies", &self.policies.name())
            .field("namespace", &self.namespace)
            .field("allowed_server_ids", &self.allowed_server_ids)
            .field("policy_encoding", &self.policy_encoding)
            .field("collect_metrics", &self.collect_metrics)
            .finish()
    }
}
