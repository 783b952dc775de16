//! [`SecretStore`] and [`PolicyStore`] implementations that look up secrets and policy documents
//! by consuming a JSON REST API.
//!
//! Both stores are built with the same [`Builder`]. The URL, and optionally a request body, are
//! templates with a placeholder that is replaced by the key being looked up. The value is taken
//! out of the JSON response with a JSON pointer.
//!
//! | Response                       | Outcome                                    |
//! |--------------------------------|--------------------------------------------|
//! | 2xx, selector matches a value  | found                                      |
//! | 2xx, selector matches nothing  | not found                                  |
//! | 404                            | not found                                  |
//! | 401, 403                       | [`ErrorKind::PermissionDenied`]            |
//! | 429, 5xx, connection errors    | [`ErrorKind::Unavailable`], retried        |
//! | any other status, bad JSON     | [`ErrorKind::MalformedResponse`]           |
//!
//! [`SecretStore`]: idp_core::store::SecretStore
//! [`PolicyStore`]: idp_core::store::PolicyStore

mod retry;
pub use retry::RetryPolicy;

use async_trait::async_trait;
use http_body_util::BodyExt;
use hyper::http::uri::Scheme;
use hyper::{Method, Request, StatusCode, Uri};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, ResponseFuture, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use idp_core::store::{Error, ErrorKind, PolicyDocument, PolicyStore, SecretStore};
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_KEY_PLACEHOLDER: &str = "{KEY}";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// TLS roots are only loaded for https URLs.
#[derive(Clone)]
enum HttpClient {
    Http(Client<HttpConnector, String>),
    Https(Client<HttpsConnector<HttpConnector>, String>),
}

impl HttpClient {
    fn new(uri: &Uri) -> Result<HttpClient, RestError> {
        if !is_https(uri) {
            return Ok(HttpClient::Http(Client::builder(TokioExecutor::new()).build_http()));
        }
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(RestError::NativeRoots)?
            .https_only()
            .enable_http1()
            .build();
        Ok(HttpClient::Https(Client::builder(TokioExecutor::new()).build(https)))
    }

    fn request(&self, req: Request<String>) -> ResponseFuture {
        match self {
            HttpClient::Http(client) => client.request(req),
            HttpClient::Https(client) => client.request(req),
        }
    }
}

/// The error returned when a [`Builder`] holds a configuration that can't work.
#[derive(Debug, Error)]
pub enum RestError {
    /// The URL template does not produce a valid URL.
    #[error("invalid url template {0:?}: {1}")]
    InvalidUrl(String, #[source] hyper::http::uri::InvalidUri),
    /// The URL template does not contain the key placeholder.
    #[error("url template {0:?} does not contain the key placeholder {1:?}")]
    MissingPlaceholder(String, String),
    /// The selector is not a JSON pointer.
    #[error("selector {0:?} must be empty or start with '/'")]
    InvalidSelector(String),
    /// A header name or value can't be sent.
    #[error("invalid header {0:?}")]
    InvalidHeader(String),
    /// No root certificates could be loaded for TLS.
    #[error("could not load native root certificates: {0}")]
    NativeRoots(#[source] std::io::Error),
}

/// Used to build a [`RestSecretStore`] or a [`RestPolicyStore`].
///
/// # Example
///
/// ```no_run
/// use idp_store_rest::{Builder, RetryPolicy};
///
/// let store = Builder::new()
///     .with_url("https://ssm.internal.example.com/parameters?name={KEY}".to_string())
///     .with_selector("/Parameter/Value".to_string())
///     .with_header("X-Api-Token", "not secret")
///     .with_retry_policy(RetryPolicy::default().with_max_attempts(5))
///     .build_secret_store()
///     .unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct Builder {
    key_placeholder: String,
    method: Method,
    url: String,
    body: String,
    selector: String,
    headers: Vec<(String, String)>,
    timeout: Duration,
    retry_policy: RetryPolicy,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            key_placeholder: DEFAULT_KEY_PLACEHOLDER.to_string(),
            method: Method::GET,
            url: String::new(),
            body: String::new(),
            selector: String::new(),
            headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl Builder {
    /// Creates a new `Builder` with default settings: `GET` requests, `{KEY}` as the key
    /// placeholder, the whole response body as the value, a 5 second timeout per request and the
    /// default [`RetryPolicy`].
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Sets the placeholder for the key being looked up.
    ///
    /// The placeholder is replaced by the percent-encoded key in the URL and by the JSON escaped
    /// key in the body.
    ///
    /// # Examples
    ///
    /// ```
    /// # use idp_store_rest::Builder;
    /// #
    /// let builder = Builder::new()
    ///   .with_key_placeholder("{NAME}".to_string())
    ///   .with_url("http://localhost:8080/secrets/{NAME}".to_string());
    /// ```
    pub fn with_key_placeholder(mut self, s: String) -> Self {
        self.key_placeholder = s;
        self
    }

    /// specify HTTP method
    pub fn with_method(mut self, s: Method) -> Self {
        self.method = s;
        self
    }

    /// specify HTTP url template
    pub fn with_url(mut self, s: String) -> Self {
        self.url = s;
        self
    }

    /// specify HTTP body template (ignored if does not apply for method)
    pub fn with_body(mut self, s: String) -> Self {
        self.body = s;
        self
    }

    /// specify JSON selector to be used to extract the value from the response
    /// format is serde_json's Value.pointer()
    pub fn with_selector(mut self, s: String) -> Self {
        self.selector = s;
        self
    }

    /// Adds a header sent with every request, e.g. an API token.
    pub fn with_header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Limits the time a single request may take. A request that times out counts as a transient
    /// failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry policy for transient failures.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Creates a store that serves secret records.
    pub fn build_secret_store(self) -> Result<RestSecretStore, RestError> {
        Ok(RestSecretStore { lookup: self.build()? })
    }

    /// Creates a store that serves policy documents.
    pub fn build_policy_store(self) -> Result<RestPolicyStore, RestError> {
        Ok(RestPolicyStore { lookup: self.build()? })
    }

    fn build(self) -> Result<RestLookup, RestError> {
        if self.key_placeholder.is_empty() || !self.url.contains(&self.key_placeholder) {
            return Err(RestError::MissingPlaceholder(self.url, self.key_placeholder));
        }
        let uri = match self.url.replace(&self.key_placeholder, "key").parse::<Uri>() {
            Ok(uri) => uri,
            Err(e) => return Err(RestError::InvalidUrl(self.url, e)),
        };
        if !self.selector.is_empty() && !self.selector.starts_with('/') {
            return Err(RestError::InvalidSelector(self.selector));
        }
        for (name, value) in &self.headers {
            if hyper::header::HeaderName::from_bytes(name.as_bytes()).is_err() || hyper::header::HeaderValue::from_str(value).is_err() {
                return Err(RestError::InvalidHeader(name.clone()));
            }
        }

        let client = HttpClient::new(&uri)?;

        Ok(RestLookup {
            key_placeholder: self.key_placeholder,
            method: self.method,
            url: self.url,
            body: self.body,
            selector: self.selector,
            headers: self.headers,
            timeout: self.timeout,
            retry_policy: self.retry_policy,
            client,
        })
    }
}

// The request template and client shared by both stores.
#[derive(Clone)]
struct RestLookup {
    key_placeholder: String,
    method: Method,
    url: String,
    body: String,
    selector: String,
    headers: Vec<(String, String)>,
    timeout: Duration,
    retry_policy: RetryPolicy,
    client: HttpClient,
}

impl RestLookup {
    async fn fetch(&self, key: &str) -> Result<Option<Value>, Error> {
        self.retry_policy.run(move || self.fetch_once(key)).await
    }

    async fn fetch_once(&self, key: &str) -> Result<Option<Value>, Error> {
        let key_url = utf8_percent_encode(key, NON_ALPHANUMERIC).collect::<String>();
        let url = self.url.replace(&self.key_placeholder, &key_url);

        let key_json = serde_json::to_string(key).map_err(|e| Error::new(ErrorKind::LocalError, e))?;
        let body = self.body.replace(&self.key_placeholder, trim_quotes(&key_json));

        let mut req = Request::builder().method(&self.method).header("Content-type", "application/json").uri(url);
        for (name, value) in &self.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        let req = req.body(body).map_err(|e| Error::new(ErrorKind::LocalError, e))?;

        let resp = match tokio::time::timeout(self.timeout, self.client.request(req)).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => return Err(Error::new(ErrorKind::Unavailable, e)),
            Err(elapsed) => return Err(Error::new(ErrorKind::Unavailable, elapsed)),
        };

        let (parts, body) = resp.into_parts();
        match classify(parts.status) {
            Status::Success => {}
            Status::NotFound => return Ok(None),
            Status::Failed(kind) => return Err(Error::new(kind, HttpStatusError(parts.status))),
        }

        let body = BodyExt::collect(body)
            .await
            .map_err(|e| Error::new(ErrorKind::Unavailable, e))?
            .to_bytes();
        let body: Value = serde_json::from_slice(&body).map_err(|e| Error::new(ErrorKind::MalformedResponse, e))?;

        Ok(select(body, &self.selector))
    }
}

// Scheme comparison ignores case, `HTTPS://` counts too.
fn is_https(uri: &Uri) -> bool {
    uri.scheme() == Some(&Scheme::HTTPS)
}

#[derive(Debug, Error)]
#[error("http status={0}")]
struct HttpStatusError(StatusCode);

#[derive(Debug, PartialEq, Eq)]
enum Status {
    Success,
    NotFound,
    Failed(ErrorKind),
}

fn classify(status: StatusCode) -> Status {
    match status {
        s if s.is_success() => Status::Success,
        StatusCode::NOT_FOUND => Status::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Status::Failed(ErrorKind::PermissionDenied),
        StatusCode::TOO_MANY_REQUESTS => Status::Failed(ErrorKind::Unavailable),
        s if s.is_server_error() => Status::Failed(ErrorKind::Unavailable),
        _ => Status::Failed(ErrorKind::MalformedResponse),
    }
}

// Picks the value out of the response. Null counts as absent.
fn select(body: Value, selector: &str) -> Option<Value> {
    let value = if selector.is_empty() {
        body
    } else {
        let mut body = body;
        body.pointer_mut(selector)?.take()
    };
    (!value.is_null()).then_some(value)
}

// Used to trim quotes from a json-string formatted string
fn trim_quotes(s: &str) -> &str {
    if s.starts_with('"') && s.ends_with('"') && s.len() > 1 {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// A [`SecretStore`] that looks up secret records over HTTP.
///
/// The selected value may be a string holding the record's JSON text, as parameter stores return
/// it, or the record object itself.
#[derive(Clone)]
pub struct RestSecretStore {
    lookup: RestLookup,
}

#[async_trait]
impl SecretStore for RestSecretStore {
    #[tracing_attributes::instrument(skip(self))]
    async fn get_secret(&self, key: &str) -> Result<Option<String>, Error> {
        match self.lookup.fetch(key).await? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(value @ Value::Object(_)) => Ok(Some(value.to_string())),
            Some(_) => Err(ErrorKind::MalformedResponse.into()),
        }
    }

    fn name(&self) -> &str {
        "rest"
    }
}

/// A [`PolicyStore`] that looks up policy documents over HTTP.
///
/// The selected value may be the document itself or a string holding it. Strings are
/// percent-decoded before parsing, as IAM hands out policy documents URL-encoded.
#[derive(Clone)]
pub struct RestPolicyStore {
    lookup: RestLookup,
}

#[async_trait]
impl PolicyStore for RestPolicyStore {
    #[tracing_attributes::instrument(skip(self))]
    async fn get_policy_document(&self, policy_id: &str) -> Result<Option<PolicyDocument>, Error> {
        match self.lookup.fetch(policy_id).await? {
            None => Ok(None),
            Some(value @ Value::Object(_)) => Ok(Some(PolicyDocument::new(value))),
            Some(Value::String(s)) => parse_policy(&s).map(Some),
            Some(_) => Err(ErrorKind::MalformedResponse.into()),
        }
    }

    fn name(&self) -> &str {
        "rest"
    }
}

fn parse_policy(s: &str) -> Result<PolicyDocument, Error> {
    let decoded = percent_decode_str(s)
        .decode_utf8()
        .map_err(|e| Error::new(ErrorKind::MalformedResponse, e))?;
    let doc = PolicyDocument::from_json(&decoded).map_err(|e| Error::new(ErrorKind::MalformedResponse, e))?;
    if doc.as_value().is_object() {
        Ok(doc)
    } else {
        Err(ErrorKind::MalformedResponse.into())
    }
}

impl std::fmt::Debug for RestLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestLookup")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("selector", &self.selector)
            .field("headers", &self.headers.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

impl std::fmt::Debug for RestSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RestSecretStore").field(&self.lookup).finish()
    }
}

impl std::fmt::Debug for RestPolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RestPolicyStore").field(&self.lookup).finish()
    }
}
