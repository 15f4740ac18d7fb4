//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before responding; every error reaches the client as
//! JSON `{error, code}` (plus `fields` for validation failures).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::checkout::CheckoutError;
use crate::checkout::wire::ErrorBody;
use crate::db::RepositoryError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Checkout failed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Catalog read failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Checkout(err) => match err {
                CheckoutError::Validation(_)
                | CheckoutError::EmptyCart
                | CheckoutError::UnknownProduct(_)
                | CheckoutError::SignatureInvalid
                | CheckoutError::GatewayDismissed => StatusCode::BAD_REQUEST,
                CheckoutError::AmountMismatch(_) => StatusCode::CONFLICT,
                CheckoutError::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
                CheckoutError::DuplicateOrderNumber
                | CheckoutError::StoreUnavailable(_)
                | CheckoutError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Catalog(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Checkout(err) => err.code(),
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::RateLimited => "rate_limited",
            Self::Catalog(_) | Self::Database(_) | Self::Internal(_) => "internal",
        }
    }

    /// What the client is told. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Checkout(CheckoutError::StoreUnavailable(_)) => {
                CheckoutError::StoreUnavailable("order could not be recorded".to_string())
                    .to_string()
            }
            Self::Checkout(CheckoutError::GatewayUnavailable(_)) => {
                CheckoutError::GatewayUnavailable("could not create payment".to_string())
                    .to_string()
            }
            Self::Checkout(CheckoutError::Internal(_))
            | Self::Catalog(_)
            | Self::Database(_)
            | Self::Internal(_) => "Internal server error".to_string(),
            Self::Checkout(err) => err.to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                code = self.code(),
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let fields = match &self {
            Self::Checkout(CheckoutError::Validation(fields)) => Some(fields.clone()),
            _ => None,
        };
        let body = ErrorBody {
            error: self.public_message(),
            code: self.code().to_string(),
            fields,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for customer actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Payment intent created", Some(&[("intent_id", "order_N1")]));
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
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use saumara_core::{ProductId, ValidationErrors};

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("SAU-XXXXX".to_string());
        assert_eq!(err.to_string(), "Not found: SAU-XXXXX");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        let cases = [
            (AppError::NotFound("x".to_string()), StatusCode::NOT_FOUND),
            (AppError::BadRequest("x".to_string()), StatusCode::BAD_REQUEST),
            (AppError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (AppError::Internal("x".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
            (CheckoutError::EmptyCart.into(), StatusCode::BAD_REQUEST),
            (CheckoutError::SignatureInvalid.into(), StatusCode::BAD_REQUEST),
            (
                CheckoutError::UnknownProduct(ProductId::new("p9")).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                CheckoutError::GatewayUnavailable("timeout".to_string()).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                CheckoutError::StoreUnavailable("down".to_string()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CheckoutError::AmountMismatch("x".to_string()).into(),
                StatusCode::CONFLICT,
            ),
            (
                CheckoutError::DuplicateOrderNumber.into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let mut fields = ValidationErrors::default();
        fields.push("pincode", "pincode must be six digits");
        let (status, body) = body_of(CheckoutError::Validation(fields).into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "validation");
        assert!(body.fields.unwrap().has("pincode"));
    }

    #[tokio::test]
    async fn test_internal_details_are_not_exposed() {
        let (_, body) = body_of(
            CheckoutError::StoreUnavailable("password authentication failed for user".to_string())
                .into(),
        )
        .await;
        assert_eq!(body.code, "store_unavailable");
        assert!(!body.error.contains("password"));

        let (_, body) = body_of(AppError::Internal("stack trace".to_string())).await;
        assert_eq!(body.error, "Internal server error");
        assert_eq!(body.code, "internal");
    }
}
