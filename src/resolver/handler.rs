use super::{AuthRequest, CredentialResolver, Denial};
use crate::metrics;
use serde_json::Value;

impl CredentialResolver {
    /// Handles the JSON event the file-transfer service sends to its identity provider and returns
    /// the JSON response for it.
    ///
    /// The event carries `username` and `serverId`, optionally `password`, `protocol` and
    /// `sourceIp`. Anything that can't be read as such an event is answered with `{}`, just like
    /// a failed authentication.
    ///
    /// # Example
    ///
    /// ```rust
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// use transfer_idp::ResolverBuilder;
    /// use transfer_idp::store::{InMemoryPolicyStore, InMemorySecretStore};
    /// use serde_json::json;
    /// use std::sync::Arc;
    ///
    /// let secrets = InMemorySecretStore::new().with_secret("/SFTP/alice", r#"{"PublicKey": "ssh-ed25519 AAAA"}"#);
    /// let resolver = ResolverBuilder::new(Arc::new(secrets), Arc::new(InMemoryPolicyStore::new())).build().unwrap();
    ///
    /// let response = resolver.handle_event(json!({"username": "alice", "serverId": "s-1234", "protocol": "SFTP"})).await;
    /// assert_eq!(response, json!({"Role": "", "PublicKeys": ["ssh-ed25519 AAAA"]}));
    /// # }
    /// ```
    pub async fn handle_event(&self, event: Value) -> Value {
        let request: AuthRequest = match serde_json::from_value(event) {
            Ok(request) => request,
            Err(e) => {
                let denial = Denial::MalformedRequest;
                slog::warn!(self.logger, "Authentication denied: {}: {}", denial, e; "reason" => denial.reason());
                if self.collect_metrics {
                    metrics::add_denial_metric(denial.reason());
                }
                return Value::Object(serde_json::Map::new());
            }
        };
        self.respond(&request).await.to_value()
    }
}
