//! Session-scoped models for the storefront.

pub mod session;

pub use session::{CurrentIdentity, keys as session_keys};
