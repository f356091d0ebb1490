//! Gatehouse is a token-based authentication and authorization service
//! backed by a document-style principal registry.
//!
//! Users and roles live in one namespace: a principal can carry direct
//! permissions, reference other principals as roles, or both. Effective
//! permissions are the union over the whole role graph. Sessions are
//! HMAC-signed tokens with a sliding expiry stored on the principal
//! document, and all document mutations go through etag compare-and-swap.

pub mod config;
pub mod docs;
pub mod logging;
pub mod middleware;
pub mod modules;
pub mod registry;
pub mod router;
pub mod state;
pub mod utils;
pub mod validator;
