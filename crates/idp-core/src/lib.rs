//! Core traits and types for transfer-idp stores.

pub mod store;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
