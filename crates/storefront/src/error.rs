//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Access denial and not-found
//! pages are rendered by the gates; `AppError` covers everything that ends a
//! request early.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::queries::QueryError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Query or mutation failed.
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Multipart body could not be read.
    #[error("Upload error: {0}")]
    Upload(#[from] MultipartError),
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Query(err) => matches!(err, QueryError::Backend(_) | QueryError::Checkout(_)),
            Self::Upload(_) => false,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Query(err) => match err {
                QueryError::ActorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                QueryError::InFlight(_) => StatusCode::CONFLICT,
                QueryError::Backend(_) | QueryError::Checkout(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Upload(err) => err.status(),
        }
    }

    /// Message safe to show to the visitor.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Query(err) => match err {
                QueryError::ActorUnavailable => {
                    "The marketplace is still connecting. Please try again shortly.".to_string()
                }
                QueryError::InFlight(_) => "That request is already being processed".to_string(),
                QueryError::Backend(_) => "External service error".to_string(),
                QueryError::Checkout(_) => "Checkout could not be started".to_string(),
            },
            Self::Upload(err) => err.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with a principal.
///
/// Call this after login.
pub fn set_sentry_user(principal: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(principal.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Started checkout", Some(&[("item_id", "1718-abc")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use atelier_core::CheckoutError;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(QueryError::ActorUnavailable.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(QueryError::InFlight("removeItem").into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(QueryError::Checkout(CheckoutError::MissingUrl).into()),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_backend_details_are_not_exposed() {
        let err = AppError::from(QueryError::Backend(BackendError::Rejected {
            method: "getItems",
            message: "canister trapped: secret detail".to_string(),
        }));
        assert_eq!(err.public_message(), "External service error");
        assert!(err.is_server_error());
    }
}
