//! Stripe configuration and checkout payloads.

use core::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use super::Item;

/// Errors produced while interpreting a checkout session payload.
#[derive(thiserror::Error, Debug)]
pub enum CheckoutError {
    /// The payload is not the expected JSON object.
    #[error("invalid checkout session payload: {0}")]
    Payload(#[from] serde_json::Error),
    /// The payload has no redirect URL.
    #[error("Stripe session missing url")]
    MissingUrl,
}

/// Stripe credentials and allowed shipping countries.
///
/// The secret key is write-only from the storefront's perspective: it is
/// serialized when sent to the backend and never rendered or logged.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StripeConfiguration {
    #[serde(serialize_with = "serialize_secret")]
    pub secret_key: SecretString,
    pub allowed_countries: Vec<String>,
}

impl StripeConfiguration {
    /// Countries offered by the setup form by default.
    pub const DEFAULT_COUNTRIES: &'static str = "US,CA,GB";

    /// Build a configuration from form input.
    ///
    /// `countries` is comma separated; entries are trimmed, uppercased and
    /// blanks are dropped.
    #[must_use]
    pub fn from_form(secret_key: &str, countries: &str) -> Self {
        Self {
            secret_key: SecretString::from(secret_key.trim().to_owned()),
            allowed_countries: parse_countries(countries),
        }
    }
}

impl fmt::Debug for StripeConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeConfiguration")
            .field("secret_key", &"[REDACTED]")
            .field("allowed_countries", &self.allowed_countries)
            .finish()
    }
}

fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn parse_countries(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_uppercase)
        .collect()
}

/// A line item sent to checkout session creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    pub product_name: String,
    pub product_description: String,
    pub price_in_cents: u64,
    pub currency: String,
    pub quantity: u64,
}

impl ShoppingItem {
    /// Build a single-quantity USD line item from a listed item.
    #[must_use]
    pub fn from_item(item: &Item) -> Self {
        Self {
            product_name: item.title.clone(),
            product_description: item.description.clone(),
            price_in_cents: item.price.cents(),
            currency: "usd".to_owned(),
            quantity: 1,
        }
    }
}

/// Session returned by checkout creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Deserialize)]
struct RawCheckoutSession {
    #[serde(default)]
    id: String,
    #[serde(default)]
    url: Option<String>,
}

impl CheckoutSession {
    /// Parse the JSON payload returned by the backend.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Payload`] for malformed JSON and
    /// [`CheckoutError::MissingUrl`] when the redirect URL is absent or blank.
    pub fn parse(payload: &str) -> Result<Self, CheckoutError> {
        let raw: RawCheckoutSession = serde_json::from_str(payload)?;
        let url = raw
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or(CheckoutError::MissingUrl)?;
        Ok(Self { id: raw.id, url })
    }
}

/// Outcome of a Stripe checkout session as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StripeSessionStatus {
    Completed {
        #[serde(rename = "userPrincipal", default, skip_serializing_if = "Option::is_none")]
        user_principal: Option<String>,
        response: String,
    },
    Failed {
        error: String,
    },
}
