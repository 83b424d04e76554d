use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Failure taxonomy for the checkout saga.
///
/// Business errors surface to the caller exactly as raised by the step that
/// produced them. `Unexpected` is the catch-all whose user-facing message is
/// rewritten according to how far the saga progressed before failing.
#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Shipping address is required")]
    AddressRequired,

    #[error("Address not found: {0}")]
    AddressNotFound(Uuid),

    #[error("Access denied to address: {0}. Please ensure the address belongs to you.")]
    AddressForbidden(Uuid),

    #[error("No location found with sufficient stock for SKU: {sku}")]
    InsufficientStock { sku: String },

    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    #[error("Payment verification timed out. The payment may still be processing. Please check your payment status.")]
    PaymentTimeout,

    #[error("Order creation failed: {0}")]
    OrderCreationFailed(String),

    #[error("No order found for the supplied payment transaction")]
    OrderNotFound,

    #[error("Upstream contract violation: {0}")]
    UpstreamContract(String),

    #[error("Authentication token not available")]
    AuthTokenMissing,

    #[error("{0}")]
    Unexpected(String),
}

impl CheckoutError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CheckoutError::EmptyCart | CheckoutError::AddressRequired => StatusCode::BAD_REQUEST,
            CheckoutError::AddressNotFound(_) | CheckoutError::OrderNotFound => {
                StatusCode::NOT_FOUND
            }
            CheckoutError::AddressForbidden(_) => StatusCode::FORBIDDEN,
            CheckoutError::InsufficientStock { .. } => StatusCode::CONFLICT,
            CheckoutError::PaymentDeclined(_) => StatusCode::PAYMENT_REQUIRED,
            CheckoutError::PaymentTimeout => StatusCode::GATEWAY_TIMEOUT,
            CheckoutError::UpstreamContract(_) => StatusCode::BAD_GATEWAY,
            CheckoutError::OrderCreationFailed(_)
            | CheckoutError::AuthTokenMissing
            | CheckoutError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Business errors carry a meaning of their own and must reach the caller
    /// verbatim; everything else gets the saga-progress treatment.
    pub fn is_business(&self) -> bool {
        !matches!(self, CheckoutError::Unexpected(_))
    }
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "data": null,
            "message": self.to_string(),
            "status": status.as_u16(),
            "timestamp": Utc::now().to_rfc3339(),
        }));
        (status, body).into_response()
    }
}
