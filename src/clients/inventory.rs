use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::errors::CheckoutError;
use crate::models::{ReservationItem, StockLocation};

use super::{first_field, int_value, uuid_value, DownstreamError, ResilientClient};

const SERVICE: &str = "inventory-service";

/// Inventory service adapter.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Locations carrying stock for a SKU, in the order the service ranks
    /// them. An unknown SKU yields an empty list, not an error.
    async fn stock_locations(
        &self,
        ctx: &RequestContext,
        sku: &str,
    ) -> Result<Vec<StockLocation>, CheckoutError>;

    /// Place a soft hold on stock under the given order id. The order id
    /// doubles as the reservation handle for a later release.
    async fn reserve(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
        items: &[ReservationItem],
    ) -> Result<(), CheckoutError>;

    /// Release a previously placed reservation.
    async fn release(
        &self,
        ctx: &RequestContext,
        reservation_id: Uuid,
    ) -> Result<(), CheckoutError>;
}

pub struct HttpInventoryClient {
    http: Arc<ResilientClient>,
    base_url: String,
}

impl HttpInventoryClient {
    pub fn new(http: Arc<ResilientClient>, base_url: String) -> Self {
        Self { http, base_url }
    }
}

/// Entries that cannot be parsed are skipped rather than failing the lookup;
/// the reservation call is the authoritative check anyway.
fn parse_locations(data: &Value, sku: &str) -> Vec<StockLocation> {
    let Some(entries) = data.as_array() else {
        warn!(%sku, "stock lookup returned a non-array payload");
        return Vec::new();
    };

    let mut locations = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(map) = entry.as_object() else {
            continue;
        };
        let location_id = first_field(map, &["location_id", "locationId"]).and_then(uuid_value);
        let available_qty = first_field(map, &["available_qty", "availableQty"]).and_then(int_value);
        match (location_id, available_qty) {
            (Some(location_id), Some(available_qty)) => locations.push(StockLocation {
                location_id,
                available_qty,
            }),
            _ => warn!(%sku, "skipping malformed stock entry: {entry}"),
        }
    }
    locations
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    async fn stock_locations(
        &self,
        ctx: &RequestContext,
        sku: &str,
    ) -> Result<Vec<StockLocation>, CheckoutError> {
        let url = format!("{}/api/v1/inventory/stock/{}/locations", self.base_url, sku);
        match self.http.get(SERVICE, url, ctx).await {
            Ok(Some(data)) => Ok(parse_locations(&data, sku)),
            Ok(None) => Ok(Vec::new()),
            Err(err) if err.status() == Some(StatusCode::NOT_FOUND) => {
                debug!(%sku, "SKU not known to inventory");
                Ok(Vec::new())
            }
            Err(err) => Err(super::map_missing_token(err, |e| {
                CheckoutError::Unexpected(format!("Failed to look up stock for SKU {sku}: {e}"))
            })),
        }
    }

    async fn reserve(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
        items: &[ReservationItem],
    ) -> Result<(), CheckoutError> {
        let url = format!("{}/api/v1/inventory/reserve", self.base_url);
        let body = json!({
            "order_id": order_id.to_string(),
            "items": items,
        });

        self.http
            .post(SERVICE, url, ctx, &body)
            .await
            .map_err(|err| match err {
                // A declined reservation is a stock decision, not a fault
                DownstreamError::Status { status, .. } if status.is_client_error() => {
                    CheckoutError::InsufficientStock {
                        sku: items
                            .iter()
                            .map(|item| item.sku.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    }
                }
                other => super::map_missing_token(other, |e| {
                    CheckoutError::Unexpected(format!("Failed to reserve inventory: {e}"))
                }),
            })?;
        Ok(())
    }

    async fn release(
        &self,
        ctx: &RequestContext,
        reservation_id: Uuid,
    ) -> Result<(), CheckoutError> {
        let url = format!("{}/api/v1/inventory/release", self.base_url);
        let body = json!({ "reservation_id": reservation_id.to_string() });

        self.http
            .post(SERVICE, url, ctx, &body)
            .await
            .map_err(|err| {
                CheckoutError::Unexpected(format!("Failed to release reservation: {err}"))
            })?;
        Ok(())
    }
}
