use crate::options::PolicyEncoding;
use derive_more::Display;
use idp_core::store::PolicyDocument;
use serde::Serialize;

/// The outcome of resolving an [`AuthRequest`](super::AuthRequest).
///
/// A denial carries no detail on purpose. Whether the user is unknown, the password is wrong or a
/// backend is down is only ever written to the log.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthDecision {
    /// The user may not log in.
    Denied,
    /// The user may log in with the given session settings.
    Granted(Grant),
}

/// Where a granted session starts.
#[derive(Debug, Clone, PartialEq)]
pub enum HomeDirectory {
    /// A flat path.
    Path(String),
    /// A virtual folder mapping, handed over untouched.
    Logical(serde_json::Value),
}

/// The type of home directory reported to the file-transfer service.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HomeDirectoryType {
    /// Virtual folders given by `HomeDirectoryDetails`.
    #[display("LOGICAL")]
    Logical,
}

/// The session settings of an authenticated user.
#[derive(Debug, Clone, PartialEq)]
pub struct Grant {
    pub(crate) role: String,
    pub(crate) policy: Option<PolicyDocument>,
    pub(crate) public_keys: Option<Vec<String>>,
    pub(crate) home: Option<HomeDirectory>,
}

impl Grant {
    /// The IAM role to assume. Empty if the secret record did not name one.
    pub fn role(&self) -> &str {
        &self.role
    }

    /// The scope-down policy to apply, if one was configured and could be fetched.
    pub fn policy(&self) -> Option<&PolicyDocument> {
        self.policy.as_ref()
    }

    /// The public keys to challenge the client with. Only set for public key authentication.
    pub fn public_keys(&self) -> Option<&[String]> {
        self.public_keys.as_deref()
    }

    /// The home directory of the session. `None` leaves the choice to the file-transfer service,
    /// which defaults to the root.
    pub fn home(&self) -> Option<&HomeDirectory> {
        self.home.as_ref()
    }
}

impl AuthDecision {
    /// True if the user may log in.
    pub fn is_granted(&self) -> bool {
        matches!(self, AuthDecision::Granted(_))
    }

    /// The session settings in case of a grant.
    pub fn grant(&self) -> Option<&Grant> {
        match self {
            AuthDecision::Granted(grant) => Some(grant),
            AuthDecision::Denied => None,
        }
    }

    /// Converts the decision into the response mapping expected by the file-transfer service. A
    /// denial becomes the empty mapping.
    pub fn into_response(self, policy_encoding: PolicyEncoding) -> AuthResponse {
        let grant = match self {
            AuthDecision::Denied => return AuthResponse::default(),
            AuthDecision::Granted(grant) => grant,
        };

        let policy = grant.policy.map(|doc| match policy_encoding {
            PolicyEncoding::Document => doc.into_value(),
            PolicyEncoding::String => serde_json::Value::String(doc.to_json_string()),
        });

        let (home_directory_type, home_directory, home_directory_details) = match grant.home {
            Some(HomeDirectory::Logical(details)) => (Some(HomeDirectoryType::Logical), None, Some(details)),
            Some(HomeDirectory::Path(path)) => (None, Some(path), None),
            None => (None, None, None),
        };

        AuthResponse {
            role: Some(grant.role),
            policy,
            public_keys: grant.public_keys,
            home_directory_type,
            home_directory,
            home_directory_details,
        }
    }
}

/// The response mapping returned to the file-transfer service. Absent fields are left out of the
/// serialized form entirely, a denial serializes to `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthResponse {
    /// IAM role ARN, always present on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Scope-down policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<serde_json::Value>,
    /// Keys for public key authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_keys: Option<Vec<String>>,
    /// Set when virtual folders are used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_directory_type: Option<HomeDirectoryType>,
    /// Flat home directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_directory: Option<String>,
    /// Virtual folder mapping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_directory_details: Option<serde_json::Value>,
}

impl AuthResponse {
    /// True for the response to a denial.
    pub fn is_empty(&self) -> bool {
        *self == AuthResponse::default()
    }

    /// The response as a JSON value.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()))
    }
}
