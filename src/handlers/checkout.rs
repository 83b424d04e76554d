use crate::handlers::common::{created_response, no_content_response, success_response};
use crate::{
    auth::Customer,
    dto::{AddressValidationRequest, CheckoutRequest, ShippingCalculationRequest},
    errors::CheckoutError,
    AppState,
};
use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for checkout endpoints
pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/initiate", post(initiate_checkout))
        .route("/complete", post(complete_checkout))
        .route("/cancel", post(cancel_checkout))
        .route("/address/validate", post(validate_address))
        .route("/shipping/calculate", post(calculate_shipping))
}

/// Dry-run: validate the cart, price the order, probe stock. Read-only.
async fn initiate_checkout(
    State(state): State<Arc<AppState>>,
    Customer(user): Customer,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, CheckoutError> {
    let ctx = user.request_context();
    let summary = state.checkout.initiate_checkout(&ctx, &payload).await?;
    Ok(success_response(summary, "Checkout initiated successfully"))
}

/// Run the checkout saga.
///
/// The saga is spawned on its own task and joined: a client disconnect drops
/// this handler future but leaves the saga (and its compensations) running to
/// completion, so no reservation or payment is orphaned mid-step.
async fn complete_checkout(
    State(state): State<Arc<AppState>>,
    Customer(user): Customer,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, CheckoutError> {
    let ctx = user.request_context();
    let service = state.checkout.clone();

    let response = tokio::spawn(async move { service.complete_checkout(&ctx, payload).await })
        .await
        .map_err(|err| CheckoutError::Unexpected(format!("checkout task aborted: {err}")))??;

    Ok(created_response(response, "Checkout completed successfully"))
}

#[derive(Debug, Deserialize)]
struct CancelParams {
    #[serde(default, alias = "reservationId")]
    reservation_id: Option<Uuid>,
}

/// Abandon an in-progress checkout, releasing the reservation if one exists.
async fn cancel_checkout(
    State(state): State<Arc<AppState>>,
    Customer(user): Customer,
    Query(params): Query<CancelParams>,
) -> Result<impl IntoResponse, CheckoutError> {
    let ctx = user.request_context();
    state
        .checkout
        .cancel_checkout(&ctx, params.reservation_id)
        .await?;
    Ok(no_content_response())
}

async fn validate_address(
    State(state): State<Arc<AppState>>,
    Customer(_user): Customer,
    Json(payload): Json<AddressValidationRequest>,
) -> Result<impl IntoResponse, CheckoutError> {
    let response = state.checkout.validate_address(&payload);
    Ok(success_response(response, "Address validated successfully"))
}

async fn calculate_shipping(
    State(state): State<Arc<AppState>>,
    Customer(user): Customer,
    Json(payload): Json<ShippingCalculationRequest>,
) -> Result<impl IntoResponse, CheckoutError> {
    let ctx = user.request_context();
    let response = state.checkout.calculate_shipping(&ctx, &payload).await?;
    Ok(success_response(response, "Shipping calculated successfully"))
}
