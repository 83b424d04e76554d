//! Retry resolution for already-completed checkouts.
//!
//! A mobile client that loses connectivity right after a client-side gateway
//! payment will re-submit `complete` with the same transaction id — by then
//! the first attempt has usually placed the order and emptied the cart. This
//! resolver reconstructs the original success response without re-running
//! anything side-effecting.

use chrono::Utc;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::auth::RequestContext;
use crate::dto::CheckoutComplete;
use crate::errors::CheckoutError;
use crate::services::checkout::CheckoutService;

/// Attempt delays: the first lookup is immediate, the later ones wait out the
/// window in which the order row is not yet visible from a read replica.
const LOOKUP_DELAYS_MS: [u64; 3] = [0, 200, 400];

impl CheckoutService {
    /// Locate the order created by the earlier attempt and rebuild its
    /// success response.
    ///
    /// Two invocations carrying the same transaction id and principal always
    /// resolve to the same order id and number, no matter what happened to
    /// the cart in between.
    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id, transaction_id = %transaction_id))]
    pub(crate) async fn resolve_retried_checkout(
        &self,
        ctx: &RequestContext,
        transaction_id: &str,
    ) -> Result<CheckoutComplete, CheckoutError> {
        info!("cart empty with a gateway transaction id; resolving as a retried checkout");

        let Some(payment_id) = self
            .payments()
            .lookup_by_transaction(ctx, transaction_id)
            .await?
        else {
            // No payment means there is nothing to recover: the request is
            // genuinely an empty-cart checkout
            warn!("no payment recorded for the supplied transaction id");
            return Err(CheckoutError::EmptyCart);
        };

        for (attempt, delay_ms) in LOOKUP_DELAYS_MS.iter().enumerate() {
            if *delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
            }

            match self.orders().find_by_payment(ctx, payment_id).await {
                Ok(Some(order)) => {
                    let order_id = order.id.ok_or_else(|| {
                        CheckoutError::UpstreamContract(
                            "order projection is missing an order id".into(),
                        )
                    })?;
                    // Never fabricate a number the Order service did not issue
                    let order_number = order.order_number.ok_or_else(|| {
                        CheckoutError::UpstreamContract(
                            "order projection is missing order_number".into(),
                        )
                    })?;

                    info!(%order_id, %order_number, %payment_id, "resolved retried checkout to existing order");
                    return Ok(CheckoutComplete {
                        order_id,
                        order_number,
                        payment_id,
                        total: order.total.unwrap_or(Decimal::ZERO),
                        currency: order
                            .currency
                            .unwrap_or_else(|| self.default_currency.clone()),
                        status: "PLACED".to_string(),
                        created_at: Utc::now(),
                    });
                }
                Ok(None) => {
                    warn!(attempt = attempt + 1, %payment_id, "order not yet visible by payment id");
                }
                Err(err) => {
                    warn!(attempt = attempt + 1, %payment_id, error = %err, "order lookup by payment id failed");
                }
            }
        }

        Err(CheckoutError::OrderNotFound)
    }
}
