//! Contains code pertaining to the setup options that can be given to the [`ResolverBuilder`](crate::ResolverBuilder)

use derive_more::Display;

// Secret records live under `/<namespace>/<username>` in the secret store.
pub(crate) const DEFAULT_NAMESPACE: &str = "SFTP";
pub(crate) const DEFAULT_POLICY_ENCODING: PolicyEncoding = PolicyEncoding::Document;

/// The option to `ResolverBuilder.policy_encoding`. It decides how a resolved scope-down policy is
/// placed in the response handed back to the file-transfer service.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy, Default)]
pub enum PolicyEncoding {
    /// Embed the policy as a JSON object
    #[default]
    #[display("JSON document")]
    Document,
    /// Embed the policy as a string holding its JSON text. This is the form the managed service
    /// accepts when it invokes the identity provider directly.
    #[display("JSON string")]
    String,
}

impl From<bool> for PolicyEncoding {
    fn from(as_string: bool) -> Self {
        match as_string {
            true => PolicyEncoding::String,
            false => PolicyEncoding::Document,
        }
    }
}

/// Formats the secret store key under which the record of `username` lives.
pub(crate) fn secret_key(namespace: &str, username: &str) -> String {
    format!("/{}/{}", namespace, username)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn secret_key_format() {
        assert_eq!(secret_key(DEFAULT_NAMESPACE, "gdunkle"), "/SFTP/gdunkle");
        assert_eq!(secret_key("ftp/users", "alice"), "/ftp/users/alice");
    }

    #[test]
    fn policy_encoding_from_bool() {
        assert_eq!(PolicyEncoding::from(true), PolicyEncoding::String);
        assert_eq!(PolicyEncoding::from(false), DEFAULT_POLICY_ENCODING);
    }
}
