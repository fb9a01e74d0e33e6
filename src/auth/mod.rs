//! Authentication module
//!
//! Supports: HTTP Basic (catalog key/secret pair), Bearer (feed API token)
//!
//! The `Authenticator` pre-computes the `Authorization` header once and
//! stamps it onto every outgoing request.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::AuthConfig;
