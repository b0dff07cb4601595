//! Checkout session commands.

use atelier_core::StripeSessionStatus;
use atelier_storefront::backend::Actor;

use super::CliError;

/// Print the status of a Stripe checkout session.
///
/// # Errors
///
/// Returns an error if the backend call fails.
#[allow(clippy::print_stdout)]
pub async fn status(actor: &Actor, session_id: &str) -> Result<(), CliError> {
    match actor.get_stripe_session_status(session_id.trim()).await? {
        StripeSessionStatus::Completed {
            user_principal,
            response,
        } => {
            println!("Session {session_id}: completed");
            if let Some(principal) = user_principal {
                println!("Buyer: {principal}");
            }
            println!("{response}");
        }
        StripeSessionStatus::Failed { error } => {
            println!("Session {session_id}: failed");
            println!("{error}");
        }
    }
    Ok(())
}
