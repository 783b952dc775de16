use crate::BoxError;
use derive_more::Display;
use thiserror::Error;

/// The Error returned by secret and policy stores. Implementations should pick the [`ErrorKind`]
/// carefully since it decides whether a caller may retry the lookup.
///
/// A key or policy that does not exist is not an error, stores report it as `Ok(None)`.
#[derive(Debug, Error)]
#[error("store error: {kind}")]
pub struct Error {
    kind: ErrorKind,
    #[source]
    source: Option<BoxError>,
}

impl Error {
    /// Creates a new store error
    pub fn new<E>(kind: ErrorKind, error: E) -> Error
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error {
            kind,
            source: Some(error.into()),
        }
    }

    /// Tells what kind of failure occurred
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Whether repeating the same lookup could succeed.
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error { kind, source: None }
    }
}

/// The `ErrorKind` variants that can be produced by [`SecretStore`] and [`PolicyStore`]
/// implementations.
///
/// [`SecretStore`]: super::SecretStore
/// [`PolicyStore`]: super::PolicyStore
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum ErrorKind {
    /// The backing service could not be reached or answered with a temporary failure (throttling,
    /// 5xx and the like). Lookups failing with this kind may be retried.
    #[display("backend unavailable")]
    Unavailable,
    /// The backing service refused access to the key or policy.
    #[display("permission denied")]
    PermissionDenied,
    /// The backing service answered but its answer could not be understood.
    #[display("malformed response")]
    MalformedResponse,
    /// Something went wrong locally, for instance while preparing the request.
    #[display("local error")]
    LocalError,
}

impl ErrorKind {
    /// Whether a lookup failing with this kind may succeed when repeated.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::Unavailable)
    }
}
