//! Role commands.
//!
//! # Usage
//!
//! ```bash
//! atelier-cli role assign -p rdmx6-jaaaa-aaaaa-aaadq-cai -r admin
//! atelier-cli role show
//! ```

use atelier_core::{Principal, UserRole};
use atelier_storefront::backend::Actor;
use tracing::info;

use super::{CliError, require_identity};

/// Assign `role` to `principal`. The backend only accepts this from admins.
///
/// # Errors
///
/// Returns an error if the principal or role is invalid, the caller is
/// anonymous, or the backend rejects the assignment.
#[allow(clippy::print_stdout)]
pub async fn assign(actor: &Actor, principal: &str, role: &str) -> Result<(), CliError> {
    let user = Principal::parse(principal.trim())?;
    let role: UserRole = role
        .trim()
        .parse()
        .map_err(|_| CliError::InvalidRole(role.to_string()))?;
    require_identity(actor)?;

    actor.assign_caller_user_role(&user, role).await?;

    info!(principal = %user, %role, "Role assigned");
    println!("Assigned {role} to {user}");
    Ok(())
}

/// Print the caller's principal, role, artist and Stripe status.
///
/// # Errors
///
/// Returns an error if a backend call fails.
#[allow(clippy::print_stdout)]
pub async fn show(actor: &Actor) -> Result<(), CliError> {
    let principal = actor.caller().principal();
    let (role, is_artist, stripe) = tokio::join!(
        actor.get_caller_user_role(),
        actor.is_artist(),
        actor.is_stripe_configured(),
    );

    println!("Principal: {principal}");
    println!("Role:      {}", role?);
    println!("Artist:    {}", if is_artist? { "yes" } else { "no" });
    println!("Stripe:    {}", if stripe? { "configured" } else { "not configured" });
    Ok(())
}
