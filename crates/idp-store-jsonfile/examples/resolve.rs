//! Resolves one authentication event read from stdin against a JSON file store and prints the
//! response, e.g.
//!
//! ```sh
//! echo '{"username":"gdunkle","password":"password","serverId":"s-1"}' \
//!   | cargo run --example resolve -- --credentials-file tests/fixtures/store.json
//! ```

use clap::Parser;
use idp_store_jsonfile::JsonFileStore;
use slog::Drain;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use transfer_idp::ResolverBuilder;

#[derive(Parser, Debug)]
#[command(about = "Resolves a file-transfer authentication event read from stdin")]
struct Args {
    /// JSON file holding secrets and policies
    #[arg(long, env = "IDP_CREDENTIALS_FILE")]
    credentials_file: PathBuf,

    /// Namespace of the secret keys
    #[arg(long, env = "IDP_NAMESPACE", default_value = "SFTP")]
    namespace: String,

    /// One of DEBUG, INFO, WARNING, ERROR, CRITICAL
    #[arg(long, env = "LOG_LEVEL", default_value = "INFO")]
    log_level: String,

    /// Embed the policy as a JSON string instead of an object
    #[arg(long)]
    policy_as_string: bool,
}

fn log_level(level: &str) -> slog::Level {
    match level.to_uppercase().as_str() {
        "DEBUG" => slog::Level::Debug,
        "WARNING" => slog::Level::Warning,
        "ERROR" => slog::Level::Error,
        "CRITICAL" => slog::Level::Critical,
        _ => slog::Level::Info,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = slog::LevelFilter::new(drain, log_level(&args.log_level)).fuse();
    let logger = slog::Logger::root(drain, slog::o!());

    let store = Arc::new(JsonFileStore::from_file(&args.credentials_file)?);
    let resolver = ResolverBuilder::new(store.clone(), store)
        .namespace(args.namespace)
        .policy_encoding(args.policy_as_string)
        .logger(logger)
        .build()?;

    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;
    let event: serde_json::Value = serde_json::from_str(&input)?;

    println!("{}", resolver.handle_event(event).await);
    Ok(())
}
