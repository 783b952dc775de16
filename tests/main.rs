#![allow(missing_docs)]

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use transfer_idp::store::{InMemoryPolicyStore, InMemorySecretStore};
use transfer_idp::{CredentialResolver, ResolverBuilder};

const ROLE: &str = "arn:aws:iam::123456789012:role/sftp-example-com-TransferFamilyScopeDownRole";
const POLICY_ARN: &str = "arn:aws:iam::123456789012:policy/DefaultTransferFamilyScopeDownManagedPolicy";
const PUBLIC_KEY: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQD4HUHiPychqgtg67Vtr7aMSqYXI4jIGYxvpCKm gdunkle@example.com";
const SERVER_ID: &str = "s-daa2e56d108d45cfa";

fn policy() -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Action": ["s3:PutObject", "s3:GetObject"],
            "Resource": "arn:aws:s3:::${transfer:HomeDirectory}/*",
            "Effect": "Allow"
        }]
    })
}

fn resolver(secrets: Arc<InMemorySecretStore>) -> CredentialResolver {
    let policies = InMemoryPolicyStore::new().with_policy(POLICY_ARN, policy());
    ResolverBuilder::new(secrets, Arc::new(policies)).metrics().build().unwrap()
}

fn password_record() -> String {
    json!({
        "Password": "password",
        "Role": ROLE,
        "Policy": POLICY_ARN,
        "HomeDirectory": "/sftp.example.com/gdunkle"
    })
    .to_string()
}

#[tokio::test]
async fn password_login() {
    let secrets = Arc::new(InMemorySecretStore::new().with_secret("/SFTP/gdunkle", password_record()));
    let resolver = resolver(secrets);

    let response = resolver
        .handle_event(json!({
            "username": "gdunkle",
            "password": "password",
            "protocol": "SFTP",
            "serverId": SERVER_ID,
            "sourceIp": "192.0.2.12"
        }))
        .await;

    assert_eq!(
        response,
        json!({
            "Role": ROLE,
            "Policy": policy(),
            "HomeDirectory": "/sftp.example.com/gdunkle"
        })
    );
}

#[tokio::test]
async fn wrong_password() {
    let secrets = Arc::new(InMemorySecretStore::new().with_secret("/SFTP/gdunkle", password_record()));
    let resolver = resolver(secrets);

    let response = resolver
        .handle_event(json!({"username": "gdunkle", "password": "wrong", "serverId": SERVER_ID}))
        .await;

    assert_eq!(response, json!({}));
}

#[tokio::test]
async fn public_key_login() {
    let record = json!({"PublicKey": PUBLIC_KEY, "Role": ROLE}).to_string();
    let secrets = Arc::new(InMemorySecretStore::new().with_secret("/SFTP/gdunkle", record));
    let resolver = resolver(secrets);

    let response = resolver
        .handle_event(json!({"username": "gdunkle", "password": "", "serverId": SERVER_ID}))
        .await;

    assert_eq!(response, json!({"Role": ROLE, "PublicKeys": [PUBLIC_KEY]}));
}

#[tokio::test]
async fn follows_secret_changes() {
    let secrets = Arc::new(InMemorySecretStore::new());
    let resolver = resolver(secrets.clone());
    let event = json!({"username": "gdunkle", "password": "password", "serverId": SERVER_ID});

    assert_eq!(resolver.handle_event(event.clone()).await, json!({}));

    secrets.insert("/SFTP/gdunkle", password_record()).await;
    assert_eq!(resolver.handle_event(event.clone()).await["Role"], json!(ROLE));

    assert!(secrets.remove("/SFTP/gdunkle").await.is_some());
    assert_eq!(resolver.handle_event(event).await, json!({}));
}

#[tokio::test]
async fn unreadable_events() {
    let secrets = Arc::new(InMemorySecretStore::new().with_secret("/SFTP/gdunkle", password_record()));
    let resolver = resolver(secrets);

    for event in [
        json!(null),
        json!("gdunkle"),
        json!([]),
        json!({"username": 42, "serverId": SERVER_ID}),
        json!({"username": "gdunkle", "password": "password", "serverId": ""}),
    ] {
        assert_eq!(resolver.handle_event(event).await, json!({}));
    }
}
