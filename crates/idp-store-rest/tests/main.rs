#![allow(missing_docs)]

use idp_core::store::{ErrorKind, PolicyStore, SecretStore};
use idp_store_rest::{Builder, RestPolicyStore, RestSecretStore, RetryPolicy};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use transfer_idp::{AuthRequest, ResolverBuilder};

// A one-request-per-connection HTTP server that answers with the scripted responses in order,
// repeating the last one, and records the request lines it received.
struct Backend {
    port: u16,
    requests: Arc<Mutex<Vec<String>>>,
}

impl Backend {
    async fn start(responses: Vec<(u16, String)>) -> Backend {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let mut responses: VecDeque<(u16, String)> = responses.into();

        let seen = requests.clone();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                let request = String::from_utf8_lossy(&buf);
                seen.lock().unwrap().push(request.lines().next().unwrap_or_default().to_string());

                let (status, body) = if responses.len() > 1 {
                    responses.pop_front().unwrap()
                } else {
                    responses.front().cloned().unwrap()
                };
                let response = format!(
                    "HTTP/1.1 {} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });

        Backend { port, requests }
    }

    fn builder(&self) -> Builder {
        Builder::new()
            .with_url(format!("http://127.0.0.1:{}/parameters/{{KEY}}", self.port))
            .with_retry_policy(RetryPolicy::default().with_initial_backoff(Duration::from_millis(1)))
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn parameter(value: &str) -> String {
    json!({"Parameter": {"Name": "ignored", "Value": value}}).to_string()
}

fn secret_store(backend: &Backend) -> RestSecretStore {
    backend
        .builder()
        .with_selector("/Parameter/Value".to_string())
        .build_secret_store()
        .unwrap()
}

#[tokio::test]
async fn fetches_secret_with_encoded_key() {
    let backend = Backend::start(vec![(200, parameter(r#"{"Password": "not secret"}"#))]).await;
    let store = secret_store(&backend);

    let secret = store.get_secret("/SFTP/alice smith").await.unwrap();

    assert_eq!(secret.as_deref(), Some(r#"{"Password": "not secret"}"#));
    assert_eq!(backend.requests(), vec!["GET /parameters/%2FSFTP%2Falice%20smith HTTP/1.1".to_string()]);
}

#[tokio::test]
async fn not_found_is_not_an_error() {
    let backend = Backend::start(vec![(404, r#"{"message": "no such parameter"}"#.to_string())]).await;
    let store = secret_store(&backend);

    assert_eq!(store.get_secret("/SFTP/nobody").await.unwrap(), None);
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn missing_selection_is_not_found() {
    let backend = Backend::start(vec![(200, json!({"Parameters": []}).to_string())]).await;
    let store = secret_store(&backend);

    assert_eq!(store.get_secret("/SFTP/nobody").await.unwrap(), None);
}

#[tokio::test]
async fn retries_unavailable_backend() {
    let backend = Backend::start(vec![
        (503, "{}".to_string()),
        (429, "{}".to_string()),
        (200, parameter(r#"{"Password": "not secret"}"#)),
    ])
    .await;
    let store = secret_store(&backend);

    let secret = store.get_secret("/SFTP/alice").await.unwrap();

    assert!(secret.is_some());
    assert_eq!(backend.requests().len(), 3);
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let backend = Backend::start(vec![(500, "{}".to_string())]).await;
    let store = secret_store(&backend);

    let err = store.get_secret("/SFTP/alice").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert_eq!(backend.requests().len(), 3);
}

#[tokio::test]
async fn does_not_retry_permanent_failures() {
    let backend = Backend::start(vec![(403, "{}".to_string())]).await;
    let store = secret_store(&backend);
    assert_eq!(store.get_secret("/SFTP/alice").await.unwrap_err().kind(), ErrorKind::PermissionDenied);
    assert_eq!(backend.requests().len(), 1);

    let backend = Backend::start(vec![(200, "not json".to_string())]).await;
    let store = secret_store(&backend);
    assert_eq!(store.get_secret("/SFTP/alice").await.unwrap_err().kind(), ErrorKind::MalformedResponse);
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn connection_refused_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let store = Builder::new()
        .with_url(format!("http://127.0.0.1:{}/{{KEY}}", port))
        .with_retry_policy(RetryPolicy::none())
        .build_secret_store()
        .unwrap();

    assert_eq!(store.get_secret("/SFTP/alice").await.unwrap_err().kind(), ErrorKind::Unavailable);
}

#[tokio::test]
async fn fetches_url_encoded_policy() {
    let encoded = "%7B%22Version%22%3A%222012-10-17%22%2C%22Statement%22%3A%5B%5D%7D";
    let backend = Backend::start(vec![(200, json!({"PolicyVersion": {"Document": encoded}}).to_string())]).await;
    let store: RestPolicyStore = backend
        .builder()
        .with_selector("/PolicyVersion/Document".to_string())
        .build_policy_store()
        .unwrap();

    let doc = store.get_policy_document("arn:aws:iam::123456789012:policy/scope-down").await.unwrap().unwrap();

    assert_eq!(doc.as_value(), &json!({"Version": "2012-10-17", "Statement": []}));
}

#[tokio::test]
async fn resolves_against_rest_backends() {
    let secrets = Backend::start(vec![(
        200,
        parameter(r#"{"Password": "not secret", "Role": "arn:aws:iam::123456789012:role/alice", "Policy": "scope-down", "HomeDirectory": "/bucket/alice"}"#),
    )])
    .await;
    let policies = Backend::start(vec![(503, "{}".to_string())]).await;

    let resolver = ResolverBuilder::new(
        Arc::new(secret_store(&secrets)),
        Arc::new(policies.builder().build_policy_store().unwrap()),
    )
    .build()
    .unwrap();

    let response = resolver
        .respond(&AuthRequest::new("alice", "s-1234567890abcdef0").with_password("not secret"))
        .await;

    assert_eq!(
        response.to_value(),
        json!({"Role": "arn:aws:iam::123456789012:role/alice", "HomeDirectory": "/bucket/alice"})
    );
    assert_eq!(policies.requests().len(), 3);

    let response = resolver
        .respond(&AuthRequest::new("alice", "s-1234567890abcdef0").with_password("guess"))
        .await;
    assert!(response.is_empty());
}
