use derive_more::Display;
use serde::Deserialize;
use std::fmt;

/// An inbound authentication attempt as relayed by the file-transfer service.
///
/// Missing `username` or `serverId` fields deserialize to empty strings, the resolver treats such a
/// request as malformed and denies it.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    server_id: String,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    source_ip: Option<String>,
}

/// How the user tries to authenticate.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy)]
pub enum AuthMode {
    /// A shared secret was presented and has to match the stored one.
    #[display("password")]
    Password,
    /// No password was presented. The stored public keys are handed back so the caller can run
    /// the key challenge itself.
    #[display("public key")]
    PublicKey,
}

impl AuthRequest {
    /// Creates a request without password, i.e. a public key authentication attempt.
    pub fn new<U: Into<String>, S: Into<String>>(username: U, server_id: S) -> Self {
        AuthRequest {
            username: username.into(),
            server_id: server_id.into(),
            ..Default::default()
        }
    }

    /// Sets the password presented by the user.
    pub fn with_password<P: Into<String>>(mut self, password: P) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the protocol (SFTP, FTP, FTPS) the user connects with.
    pub fn with_protocol<P: Into<String>>(mut self, protocol: P) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// Sets the IP address the user connects from.
    pub fn with_source_ip<S: Into<String>>(mut self, source_ip: S) -> Self {
        self.source_ip = Some(source_ip.into());
        self
    }

    /// The name the user logs in with.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password the user presented, if any.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// The identifier of the file-transfer server the user connects to.
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// The protocol the user connects with.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// The IP address the user connects from.
    pub fn source_ip(&self) -> Option<&str> {
        self.source_ip.as_deref()
    }

    /// True if both the username and the server id are present.
    pub fn is_well_formed(&self) -> bool {
        !self.username.is_empty() && !self.server_id.is_empty()
    }

    /// A non-empty password selects password authentication, anything else public key
    /// authentication.
    pub fn mode(&self) -> AuthMode {
        match self.password.as_deref() {
            Some(p) if !p.is_empty() => AuthMode::Password,
            _ => AuthMode::PublicKey,
        }
    }
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "*******"))
            .field("server_id", &self.server_id)
            .field("protocol", &self.protocol)
            .field("source_ip", &self.source_ip)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn deserializes_event() {
        let event = json!({
            "username": "gdunkle",
            "password": "password",
            "protocol": "SFTP",
            "serverId": "s-daa2e56d108d45cfa",
            "sourceIp": "127.0.0.1"
        });
        let request: AuthRequest = serde_json::from_value(event).unwrap();
        assert_eq!(
            request,
            AuthRequest::new("gdunkle", "s-daa2e56d108d45cfa")
                .with_password("password")
                .with_protocol("SFTP")
                .with_source_ip("127.0.0.1")
        );
        assert!(request.is_well_formed());
        assert_eq!(request.mode(), AuthMode::Password);
    }

    #[test]
    fn missing_fields_make_it_malformed() {
        let request: AuthRequest = serde_json::from_value(json!({"username": "gdunkle"})).unwrap();
        assert!(!request.is_well_formed());
        let request: AuthRequest = serde_json::from_value(json!({"serverId": "s-1"})).unwrap();
        assert!(!request.is_well_formed());
        assert!(!AuthRequest::new("", "s-1").is_well_formed());
    }

    #[test]
    fn empty_password_means_public_key() {
        assert_eq!(AuthRequest::new("a", "s").mode(), AuthMode::PublicKey);
        assert_eq!(AuthRequest::new("a", "s").with_password("").mode(), AuthMode::PublicKey);
        assert_eq!(AuthRequest::new("a", "s").with_password(" ").mode(), AuthMode::Password);
    }

    #[test]
    fn debug_hides_password() {
        let debug = format!("{:?}", AuthRequest::new("alice", "s-1").with_password("hunter2"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("*******"));
    }
}
