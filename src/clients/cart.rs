use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::RequestContext;
use crate::errors::CheckoutError;
use crate::models::{CartItem, CartSnapshot};

use super::{
    as_object, decimal_value, first_field, int_value, string_value, uuid_value, DownstreamError,
    ResilientClient,
};

const SERVICE: &str = "cart-service";

/// Cart service adapter.
#[async_trait]
pub trait CartClient: Send + Sync {
    /// Fetch the caller's current cart.
    async fn fetch_cart(&self, ctx: &RequestContext) -> Result<CartSnapshot, CheckoutError>;

    /// Empty the caller's cart after a successful checkout.
    async fn clear_cart(&self, ctx: &RequestContext) -> Result<(), CheckoutError>;
}

pub struct HttpCartClient {
    http: Arc<ResilientClient>,
    base_url: String,
    default_currency: String,
}

impl HttpCartClient {
    pub fn new(http: Arc<ResilientClient>, base_url: String, default_currency: String) -> Self {
        Self {
            http,
            base_url,
            default_currency,
        }
    }

    fn parse_cart(&self, data: &Value) -> Result<CartSnapshot, CheckoutError> {
        let map = as_object(data, SERVICE).map_err(contract)?;

        let mut items = Vec::new();
        if let Some(raw_items) = map.get("items").and_then(Value::as_array) {
            for raw in raw_items {
                items.push(parse_cart_item(raw)?);
            }
        } else {
            warn!("cart response has no items array");
        }

        let subtotal = first_field(map, &["subtotal"])
            .and_then(decimal_value)
            .unwrap_or(Decimal::ZERO);
        let discount_amount = first_field(map, &["discount_amount", "discountAmount"])
            .and_then(decimal_value)
            .unwrap_or(Decimal::ZERO);
        let currency = first_field(map, &["currency"])
            .and_then(string_value)
            .unwrap_or_else(|| self.default_currency.clone());

        debug!(
            item_count = items.len(),
            %subtotal,
            %discount_amount,
            %currency,
            "parsed cart snapshot"
        );

        Ok(CartSnapshot {
            items,
            subtotal,
            discount_amount,
            currency,
        })
    }
}

fn parse_cart_item(raw: &Value) -> Result<CartItem, CheckoutError> {
    let map = as_object(raw, SERVICE).map_err(contract)?;

    let product_id = first_field(map, &["product_id", "productId"])
        .and_then(uuid_value)
        .ok_or_else(|| CheckoutError::UpstreamContract("cart item is missing product_id".into()))?;
    let sku = first_field(map, &["sku"])
        .and_then(string_value)
        .ok_or_else(|| CheckoutError::UpstreamContract("cart item is missing sku".into()))?;
    let quantity = first_field(map, &["quantity"])
        .and_then(int_value)
        .filter(|q| *q > 0)
        .ok_or_else(|| CheckoutError::UpstreamContract("cart item is missing quantity".into()))?;
    let unit_price = first_field(map, &["unit_price", "unitPrice"])
        .and_then(decimal_value)
        .ok_or_else(|| CheckoutError::UpstreamContract("cart item is missing unit_price".into()))?;
    let total_price = first_field(map, &["total_price", "totalPrice"])
        .and_then(decimal_value)
        .ok_or_else(|| {
            CheckoutError::UpstreamContract("cart item is missing total_price".into())
        })?;
    let name = first_field(map, &["name"])
        .and_then(string_value)
        .unwrap_or_else(|| "Unknown Product".to_string());

    Ok(CartItem {
        product_id,
        name,
        sku,
        quantity: quantity as u32,
        unit_price,
        total_price,
    })
}

fn contract(err: DownstreamError) -> CheckoutError {
    CheckoutError::UpstreamContract(err.to_string())
}

#[async_trait]
impl CartClient for HttpCartClient {
    async fn fetch_cart(&self, ctx: &RequestContext) -> Result<CartSnapshot, CheckoutError> {
        let url = format!("{}/api/v1/cart", self.base_url);
        let data = match self.http.get(SERVICE, url, ctx).await {
            Ok(data) => data,
            // A missing cart resource reads as an empty cart, so that a
            // retry carrying a gateway transaction id can still resolve
            Err(err) if err.status() == Some(StatusCode::NOT_FOUND) => None,
            Err(err) => {
                return Err(super::map_missing_token(err, |e| {
                    CheckoutError::Unexpected(format!("Failed to fetch cart: {e}"))
                }))
            }
        };

        match data {
            Some(data) => self.parse_cart(&data),
            None => Ok(CartSnapshot {
                items: Vec::new(),
                subtotal: Decimal::ZERO,
                discount_amount: Decimal::ZERO,
                currency: self.default_currency.clone(),
            }),
        }
    }

    async fn clear_cart(&self, ctx: &RequestContext) -> Result<(), CheckoutError> {
        let url = format!("{}/api/v1/cart", self.base_url);
        self.http
            .delete(SERVICE, url, ctx)
            .await
            .map_err(|err| CheckoutError::Unexpected(format!("Failed to clear cart: {err}")))?;
        Ok(())
    }
}
