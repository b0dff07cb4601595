//! CLI commands.

pub mod items;
pub mod role;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use atelier_core::{CategoryError, Principal, PrincipalError};
use atelier_storefront::backend::{Actor, BackendError, Caller, HttpTransport};
use atelier_storefront::config::BackendConfig;
use atelier_storefront::identity::Identity;

/// Errors shared by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Environment variable has an unusable value.
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),

    /// Principal could not be parsed.
    #[error("Invalid principal: {0}")]
    InvalidPrincipal(#[from] PrincipalError),

    /// Category name not recognized.
    #[error(transparent)]
    InvalidCategory(#[from] CategoryError),

    /// Role name not recognized.
    #[error("Invalid role: {0}. Valid roles: admin, user, guest")]
    InvalidRole(String),

    /// Seed file could not be used.
    #[error("Seed file {path}: {message}")]
    Seed { path: String, message: String },

    /// Command needs a logged-in caller.
    #[error("This command needs ATELIER_PRINCIPAL and ATELIER_DELEGATION")]
    NotAuthenticated,

    /// Backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Build an actor from the environment.
///
/// # Errors
///
/// Returns an error if `BACKEND_URL` is missing, or if only one of
/// `ATELIER_PRINCIPAL` and `ATELIER_DELEGATION` is set.
pub fn connect() -> Result<Actor, CliError> {
    dotenvy::dotenv().ok();

    let url = std::env::var("BACKEND_URL").map_err(|_| CliError::MissingEnvVar("BACKEND_URL"))?;
    let timeout = match std::env::var("BACKEND_TIMEOUT_SECS") {
        Ok(value) => value
            .parse()
            .map_err(|_| CliError::InvalidEnvVar("BACKEND_TIMEOUT_SECS", value))?,
        Err(_) => 30,
    };

    let config = BackendConfig {
        url: url.trim_end_matches('/').to_string(),
        timeout: Duration::from_secs(timeout),
    };
    let transport = Arc::new(HttpTransport::new(&config)?);

    Ok(Actor::new(transport, caller_from_env()?))
}

fn caller_from_env() -> Result<Caller, CliError> {
    let principal = std::env::var("ATELIER_PRINCIPAL").ok().filter(|v| !v.is_empty());
    let delegation = std::env::var("ATELIER_DELEGATION").ok().filter(|v| !v.is_empty());

    match (principal, delegation) {
        (None, None) => Ok(Caller::Anonymous),
        (Some(principal), Some(delegation)) => Ok(Caller::Authenticated(Identity::new(
            Principal::parse(&principal)?,
            SecretString::from(delegation),
            None,
        ))),
        (Some(_), None) => Err(CliError::MissingEnvVar("ATELIER_DELEGATION")),
        (None, Some(_)) => Err(CliError::MissingEnvVar("ATELIER_PRINCIPAL")),
    }
}

/// The caller, if it is not anonymous.
///
/// # Errors
///
/// Returns [`CliError::NotAuthenticated`] for the anonymous caller.
pub fn require_identity(actor: &Actor) -> Result<&Identity, CliError> {
    actor.caller().identity().ok_or(CliError::NotAuthenticated)
}
