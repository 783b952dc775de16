use idp_core::store;
use thiserror::Error;

// Why a request was denied. Only ever logged and counted, never returned to the caller.
#[derive(Debug, Error)]
pub(crate) enum Denial {
    #[error("username or server id missing from request")]
    MalformedRequest,
    #[error("server id not served by this identity provider")]
    UnknownServer,
    #[error("no secret record found")]
    SecretNotFound,
    #[error("secret store failure")]
    SecretStore(#[source] store::Error),
    #[error("secret record could not be parsed")]
    UnparseableRecord(#[source] serde_json::Error),
    #[error("no password field in secret record")]
    NoPassword,
    #[error("password does not match stored password")]
    PasswordMismatch,
    #[error("no public keys in secret record")]
    NoPublicKey,
}

impl Denial {
    // Label used for metrics
    pub(crate) fn reason(&self) -> &'static str {
        match self {
            Denial::MalformedRequest => "malformed_request",
            Denial::UnknownServer => "unknown_server",
            Denial::SecretNotFound => "secret_not_found",
            Denial::SecretStore(_) => "secret_store_error",
            Denial::UnparseableRecord(_) => "unparseable_record",
            Denial::NoPassword => "no_password",
            Denial::PasswordMismatch => "password_mismatch",
            Denial::NoPublicKey => "no_public_key",
        }
    }
}
