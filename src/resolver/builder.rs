use super::CredentialResolver;
use crate::options::{self, PolicyEncoding};
use idp_core::store::{PolicyStore, SecretStore};
use slog::Drain;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Used to create a [`CredentialResolver`].
///
/// # Example
///
/// ```rust
/// use transfer_idp::ResolverBuilder;
/// use transfer_idp::store::{InMemoryPolicyStore, InMemorySecretStore};
/// use std::sync::Arc;
///
/// let resolver = ResolverBuilder::new(Arc::new(InMemorySecretStore::new()), Arc::new(InMemoryPolicyStore::new()))
///     .namespace("SFTP")
///     .allowed_server_ids(vec!["s-daa2e56d108d45cfa"])
///     .build()
///     .unwrap();
/// ```
pub struct ResolverBuilder {
    secrets: Arc<dyn SecretStore>,
    policies: Arc<dyn PolicyStore>,
    namespace: String,
    allowed_server_ids: Option<HashSet<String>>,
    policy_encoding: PolicyEncoding,
    logger: slog::Logger,
    collect_metrics: bool,
}

/// The error returned by [`ResolverBuilder::build`].
#[derive(Debug, Error)]
pub enum BuilderError {
    /// The namespace is empty or consists of slashes only.
    #[error("invalid secret namespace {0:?}")]
    InvalidNamespace(String),
    /// An empty allow list would deny every request.
    #[error("the list of allowed server ids is empty")]
    NoServerIds,
}

impl ResolverBuilder {
    /// Starts a builder for a resolver that reads secret records from `secrets` and scope-down
    /// policies from `policies`. The other settings take their defaults.
    pub fn new(secrets: Arc<dyn SecretStore>, policies: Arc<dyn PolicyStore>) -> Self {
        ResolverBuilder {
            secrets,
            policies,
            namespace: options::DEFAULT_NAMESPACE.to_string(),
            allowed_server_ids: None,
            policy_encoding: options::DEFAULT_POLICY_ENCODING,
            logger: slog::Logger::root(slog_stdlog::StdLog.fuse(), slog::o!()),
            collect_metrics: false,
        }
    }

    /// Sets the namespace under which secret records are stored. The record of user `alice` is
    /// looked up at `/<namespace>/alice`. Leading and trailing slashes are ignored. Defaults to
    /// `SFTP`.
    pub fn namespace<N: Into<String>>(mut self, namespace: N) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Restricts the resolver to the given file-transfer servers. Requests for any other server
    /// id are denied. By default all server ids are accepted.
    pub fn allowed_server_ids<I, S>(mut self, server_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_server_ids = Some(server_ids.into_iter().map(Into::into).collect());
        self
    }

    /// Sets how scope-down policies are embedded in responses. See [`PolicyEncoding`].
    pub fn policy_encoding<E: Into<PolicyEncoding>>(mut self, encoding: E) -> Self {
        self.policy_encoding = encoding.into();
        self
    }

    /// Sets the structured logger. Denial reasons end up here and nowhere else. Defaults to a
    /// logger that forwards to the `log` crate.
    pub fn logger<L: Into<Option<slog::Logger>>>(mut self, logger: L) -> Self {
        self.logger = logger.into().unwrap_or_else(|| slog::Logger::root(slog_stdlog::StdLog.fuse(), slog::o!()));
        self
    }

    /// Enables the collection of prometheus metrics.
    pub fn metrics(mut self) -> Self {
        self.collect_metrics = true;
        self
    }

    /// Creates the resolver.
    pub fn build(self) -> Result<CredentialResolver, BuilderError> {
        let namespace = self.namespace.trim_matches('/').to_string();
        if namespace.is_empty() {
            return Err(BuilderError::InvalidNamespace(self.namespace));
        }
        if matches!(&self.allowed_server_ids, Some(ids) if ids.is_empty()) {
            return Err(BuilderError::NoServerIds);
        }
        slog::debug!(self.logger, "Secret namespace is /{}/", namespace; "secret-store" => self.secrets.name(), "policy-store" => self.policies.name());
        Ok(CredentialResolver {
            secrets: self.secrets,
            policies: self.policies,
            namespace,
            allowed_server_ids: self.allowed_server_ids,
            policy_encoding: self.policy_encoding,
            logger: self.logger,
            collect_metrics: self.collect_metrics,
        })
    }
}
