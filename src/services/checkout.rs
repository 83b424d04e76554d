//! The checkout saga engine.
//!
//! Converts the caller's cart into a placed order by driving the forward
//! pipeline (reserve → pay → create order → clear cart → publish event) and,
//! on failure, a reverse-order compensation cascade limited to the artifacts
//! actually produced. The orchestrator itself keeps no durable state;
//! recovery of interrupted checkouts relies on downstream idempotency (see
//! the retry resolver in `idempotency.rs`).

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::clients::{AddressClient, CartClient, InventoryClient, OrderClient, PaymentClient};
use crate::dto::{
    AddressSummary, AddressValidationRequest, AddressValidationResponse, CheckoutComplete,
    CheckoutItem, CheckoutRequest, CheckoutSummary, ShippingCalculationRequest,
    ShippingCalculationResponse, ShippingOption,
};
use crate::errors::CheckoutError;
use crate::events::EventPublisher;
use crate::models::{Address, CartSnapshot, NewOrder, PaymentInstruction, ReservationItem};
use crate::services::pricing;
use crate::services::saga::SagaState;
use crate::services::stock::StockLocator;

/// Orchestrates the checkout saga across the downstream services.
pub struct CheckoutService {
    carts: Arc<dyn CartClient>,
    addresses: Arc<dyn AddressClient>,
    inventory: Arc<dyn InventoryClient>,
    payments: Arc<dyn PaymentClient>,
    orders: Arc<dyn OrderClient>,
    stock: StockLocator,
    events: EventPublisher,
    pub(crate) default_currency: String,
}

impl CheckoutService {
    pub fn new(
        carts: Arc<dyn CartClient>,
        addresses: Arc<dyn AddressClient>,
        inventory: Arc<dyn InventoryClient>,
        payments: Arc<dyn PaymentClient>,
        orders: Arc<dyn OrderClient>,
        events: EventPublisher,
        default_currency: String,
    ) -> Self {
        let stock = StockLocator::new(inventory.clone());
        Self {
            carts,
            addresses,
            inventory,
            payments,
            orders,
            stock,
            events,
            default_currency,
        }
    }

    pub(crate) fn payments(&self) -> &dyn PaymentClient {
        self.payments.as_ref()
    }

    pub(crate) fn orders(&self) -> &dyn OrderClient {
        self.orders.as_ref()
    }

    /// Dry-run the checkout: validate the cart and address, price the order,
    /// and probe stock availability. Makes no state changes anywhere.
    #[instrument(skip(self, ctx, request), fields(user_id = %ctx.user_id))]
    pub async fn initiate_checkout(
        &self,
        ctx: &RequestContext,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSummary, CheckoutError> {
        let cart = self.carts.fetch_cart(ctx).await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let address = self.fetch_shipping_address(ctx, request).await?;
        let totals = pricing::price_cart(&cart)?;

        // Availability probe only; nothing is held
        for item in &cart.items {
            self.stock.locate(ctx, &item.sku, item.quantity).await?;
        }

        Ok(CheckoutSummary {
            items: cart.items.iter().map(CheckoutItem::from).collect(),
            shipping_address: AddressSummary::from(&address),
            subtotal: totals.subtotal,
            discount_amount: totals.discount,
            tax_amount: totals.tax,
            shipping_cost: totals.shipping,
            total: totals.total,
            currency: totals.currency,
        })
    }

    /// Run the checkout saga to completion, or compensate and report why not.
    #[instrument(skip(self, ctx, request), fields(user_id = %ctx.user_id, tenant_id = %ctx.tenant_id))]
    pub async fn complete_checkout(
        &self,
        ctx: &RequestContext,
        request: CheckoutRequest,
    ) -> Result<CheckoutComplete, CheckoutError> {
        let cart = self.carts.fetch_cart(ctx).await?;

        // A retry after a client-side payment arrives with an empty cart:
        // the first attempt already consumed it. A non-empty cart means the
        // user is actively checking out, so the saga runs normally.
        if cart.is_empty() {
            if let Some(transaction_id) = request.gateway_transaction_id() {
                return self.resolve_retried_checkout(ctx, transaction_id).await;
            }
            return Err(CheckoutError::EmptyCart);
        }

        let mut saga = SagaState::default();
        match self.run_pipeline(ctx, &request, &cart, &mut saga).await {
            Ok(response) => {
                // Best-effort epilogue: neither failure may undo the order
                if let Err(err) = self.carts.clear_cart(ctx).await {
                    warn!(order_id = %response.order_id, error = %err, "cart clearing failed (non-critical)");
                }
                self.events
                    .publish_order_created(response.order_id, ctx)
                    .await;
                info!(order_id = %response.order_id, order_number = %response.order_number, "checkout completed");
                Ok(response)
            }
            Err(err) => {
                error!(error = %err, "checkout failed, compensating");
                self.compensate(ctx, &saga).await;
                Err(translate_failure(err, &saga))
            }
        }
    }

    /// The forward pipeline. Every `mark_*` must directly follow the call
    /// that produced the artifact so the compensation plan never lags
    /// reality.
    async fn run_pipeline(
        &self,
        ctx: &RequestContext,
        request: &CheckoutRequest,
        cart: &CartSnapshot,
        saga: &mut SagaState,
    ) -> Result<CheckoutComplete, CheckoutError> {
        let address = self.fetch_shipping_address(ctx, request).await?;
        let totals = pricing::price_cart(cart)?;

        let reservation_id = self.reserve_inventory(ctx, cart, saga).await?;

        let payment_id = self
            .payments
            .process(
                ctx,
                &PaymentInstruction {
                    amount: totals.total,
                    currency: totals.currency.clone(),
                    order_id: reservation_id,
                    payment_method_id: request.payment_method_id,
                    gateway_transaction_id: request.payment_gateway_transaction_id.clone(),
                },
            )
            .await?;
        saga.mark_paid(payment_id);

        let created = self
            .orders
            .create_order(
                ctx,
                &NewOrder {
                    shipping_address_id: address.id,
                    payment_id,
                    items: cart.items.clone(),
                    totals: totals.clone(),
                },
            )
            .await?;
        saga.mark_order_created(created.id, created.order_number.clone());

        Ok(CheckoutComplete {
            order_id: created.id,
            order_number: created.order_number,
            payment_id,
            total: totals.total,
            currency: totals.currency,
            status: "PLACED".to_string(),
            created_at: Utc::now(),
        })
    }

    /// Reserve stock for every cart line under one fresh order id. That id is
    /// the reservation handle from then on, independent of whatever order id
    /// the Order service later assigns.
    async fn reserve_inventory(
        &self,
        ctx: &RequestContext,
        cart: &CartSnapshot,
        saga: &mut SagaState,
    ) -> Result<Uuid, CheckoutError> {
        let reservation_order_id = Uuid::new_v4();

        let mut items = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let location_id = self.stock.locate(ctx, &item.sku, item.quantity).await?;
            items.push(ReservationItem {
                sku: item.sku.clone(),
                location_id,
                quantity: item.quantity,
            });
        }

        self.inventory
            .reserve(ctx, reservation_order_id, &items)
            .await?;
        saga.mark_reserved(reservation_order_id);
        info!(reservation_id = %reservation_order_id, lines = items.len(), "inventory reserved");

        Ok(reservation_order_id)
    }

    /// Undo, in reverse order, whatever the failed saga left behind.
    /// Compensation failures are logged and swallowed so they can never mask
    /// the error that triggered them.
    async fn compensate(&self, ctx: &RequestContext, saga: &SagaState) {
        if let Some(order_id) = saga.order_id() {
            // The order owns the payment and the reservation now
            warn!(%order_id, "order already created; skipping compensation");
            return;
        }

        let plan = saga.owed_compensations();

        if let Some(payment_id) = plan.refund_payment {
            match self.payments.refund(ctx, payment_id, "Checkout failed").await {
                Ok(()) => info!(%payment_id, "payment refunded"),
                Err(err) => error!(%payment_id, error = %err, "failed to refund payment"),
            }
        }

        if let Some(reservation_id) = plan.release_reservation {
            match self.inventory.release(ctx, reservation_id).await {
                Ok(()) => info!(%reservation_id, "inventory reservation released"),
                Err(err) => {
                    error!(%reservation_id, error = %err, "failed to release inventory reservation")
                }
            }
        }
    }

    /// Release an abandoned checkout's reservation, if any.
    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id))]
    pub async fn cancel_checkout(
        &self,
        ctx: &RequestContext,
        reservation_id: Option<Uuid>,
    ) -> Result<(), CheckoutError> {
        let Some(reservation_id) = reservation_id else {
            return Ok(());
        };

        if let Err(err) = self.inventory.release(ctx, reservation_id).await {
            // Reservations also expire downstream, so a failed release is
            // logged rather than surfaced
            error!(%reservation_id, error = %err, "failed to release reservation on cancel");
        } else {
            info!(%reservation_id, "reservation released on cancel");
        }
        Ok(())
    }

    /// Syntactic completeness check; a real deliverability service would sit
    /// behind this.
    pub fn validate_address(&self, request: &AddressValidationRequest) -> AddressValidationResponse {
        let present = |field: &Option<String>| {
            field
                .as_deref()
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false)
        };
        let valid = present(&request.street) && present(&request.city) && present(&request.country);

        AddressValidationResponse {
            valid,
            suggested_corrections: if valid {
                None
            } else {
                Some("Please provide complete address details".to_string())
            },
            message: if valid {
                "Address is valid".to_string()
            } else {
                "Address validation failed".to_string()
            },
        }
    }

    /// Quote the fixed shipping options for the caller's cart and address.
    #[instrument(skip(self, ctx, request), fields(user_id = %ctx.user_id))]
    pub async fn calculate_shipping(
        &self,
        ctx: &RequestContext,
        request: &ShippingCalculationRequest,
    ) -> Result<ShippingCalculationResponse, CheckoutError> {
        let address_id = request.address_id.ok_or(CheckoutError::AddressRequired)?;
        let _address = self.addresses.fetch_address(ctx, address_id).await?;
        let cart = self.carts.fetch_cart(ctx).await?;
        let currency = if cart.currency.is_empty() {
            self.default_currency.clone()
        } else {
            cart.currency
        };

        Ok(ShippingCalculationResponse {
            shipping_options: vec![
                ShippingOption {
                    method: "STANDARD".to_string(),
                    name: "Standard Shipping".to_string(),
                    estimated_days: 5,
                    cost: pricing::standard_shipping_cost(),
                    currency: currency.clone(),
                },
                ShippingOption {
                    method: "EXPRESS".to_string(),
                    name: "Express Shipping".to_string(),
                    estimated_days: 2,
                    cost: pricing::express_shipping_cost(),
                    currency,
                },
            ],
        })
    }

    async fn fetch_shipping_address(
        &self,
        ctx: &RequestContext,
        request: &CheckoutRequest,
    ) -> Result<Address, CheckoutError> {
        let address_id = request
            .shipping_address_id
            .ok_or(CheckoutError::AddressRequired)?;
        self.addresses.fetch_address(ctx, address_id).await
    }
}

/// Rewrites a pipeline failure for the caller based on saga progress.
///
/// Business errors pass through untouched, with one exception: a failed order
/// creation after a successful payment names the payment id so support can
/// reconcile. `Unexpected` errors get the full progress-dependent wording.
fn translate_failure(err: CheckoutError, saga: &SagaState) -> CheckoutError {
    match err {
        CheckoutError::OrderCreationFailed(message) => {
            if let (Some(payment_id), None) = (saga.payment_id(), saga.order_id()) {
                CheckoutError::OrderCreationFailed(format!(
                    "Payment processed but order creation failed. Please contact support with payment id {payment_id}. ({message})"
                ))
            } else {
                CheckoutError::OrderCreationFailed(message)
            }
        }
        CheckoutError::Unexpected(message) => {
            let message = match (saga.payment_id(), saga.order_id(), saga.reservation_id()) {
                (Some(payment_id), None, _) => format!(
                    "Payment processed but order creation failed. Please contact support with payment id {payment_id}. ({message})"
                ),
                (Some(_), Some(order_id), _) => format!(
                    "Order created but checkout completion had warnings. Order id {order_id}. ({message})"
                ),
                (None, _, Some(_)) => {
                    format!("Inventory reserved but payment failed. Please try again. ({message})")
                }
                _ => format!("Checkout failed: {message}"),
            };
            CheckoutError::Unexpected(message)
        }
        business => business,
    }
}
