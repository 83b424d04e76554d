//! Warehouse selection for reservation lines.

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::clients::InventoryClient;
use crate::errors::CheckoutError;

/// Picks, per SKU, a location whose reported availability covers the
/// requirement. The choice is advisory: the reservation call remains the
/// authoritative stock check.
pub struct StockLocator {
    inventory: Arc<dyn InventoryClient>,
}

impl StockLocator {
    pub fn new(inventory: Arc<dyn InventoryClient>) -> Self {
        Self { inventory }
    }

    /// First location, in the order the inventory service ranked them, with
    /// `available_qty >= required_qty`. The list is not re-sorted.
    pub async fn locate(
        &self,
        ctx: &RequestContext,
        sku: &str,
        required_qty: u32,
    ) -> Result<Uuid, CheckoutError> {
        let locations = self.inventory.stock_locations(ctx, sku).await?;

        for location in &locations {
            if location.available_qty >= i64::from(required_qty) {
                debug!(
                    %sku,
                    location_id = %location.location_id,
                    available = location.available_qty,
                    required = required_qty,
                    "selected stock location"
                );
                return Ok(location.location_id);
            }
        }

        Err(CheckoutError::InsufficientStock {
            sku: sku.to_string(),
        })
    }
}
