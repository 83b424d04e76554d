use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::errors::CheckoutError;
use crate::models::{CreatedOrder, NewOrder, OrderProjection};

use super::{as_object, decimal_value, first_field, string_value, uuid_value, ResilientClient};

const SERVICE: &str = "order-service";

/// Order service adapter.
#[async_trait]
pub trait OrderClient: Send + Sync {
    /// Submit the complete order and return the identifiers the Order
    /// service assigned to it.
    async fn create_order(
        &self,
        ctx: &RequestContext,
        order: &NewOrder,
    ) -> Result<CreatedOrder, CheckoutError>;

    /// Look up the order owning a payment. Returns `None` while the order is
    /// not (yet) visible, which retrying callers must tolerate.
    async fn find_by_payment(
        &self,
        ctx: &RequestContext,
        payment_id: Uuid,
    ) -> Result<Option<OrderProjection>, CheckoutError>;
}

pub struct HttpOrderClient {
    http: Arc<ResilientClient>,
    base_url: String,
}

impl HttpOrderClient {
    pub fn new(http: Arc<ResilientClient>, base_url: String) -> Self {
        Self { http, base_url }
    }
}

fn order_request_body(order: &NewOrder) -> Value {
    let items: Vec<Value> = order
        .items
        .iter()
        .map(|item| {
            json!({
                "product_id": item.product_id.to_string(),
                "sku": item.sku,
                "product_name": item.name,
                "quantity": item.quantity,
                "unit_price": item.unit_price.to_string(),
                "total_price": item.total_price.to_string(),
            })
        })
        .collect();

    json!({
        "shipping_address_id": order.shipping_address_id.to_string(),
        "payment_id": order.payment_id.to_string(),
        "items": items,
        "subtotal": order.totals.subtotal.to_string(),
        "discount_amount": order.totals.discount.to_string(),
        "tax_amount": order.totals.tax.to_string(),
        "shipping_cost": order.totals.shipping.to_string(),
        "total": order.totals.total.to_string(),
        "currency": order.totals.currency,
    })
}

fn parse_created_order(data: &Value) -> Result<CreatedOrder, CheckoutError> {
    let map = as_object(data, SERVICE)
        .map_err(|err| CheckoutError::OrderCreationFailed(err.to_string()))?;

    let id = first_field(map, &["order_id", "id", "orderId"])
        .and_then(uuid_value)
        .ok_or_else(|| {
            CheckoutError::OrderCreationFailed("order id not found in response".into())
        })?;
    let order_number = first_field(map, &["order_number", "orderNumber"])
        .and_then(string_value)
        .ok_or_else(|| {
            CheckoutError::OrderCreationFailed("order number not found in response".into())
        })?;

    Ok(CreatedOrder { id, order_number })
}

pub(crate) fn parse_order_projection(data: &Value) -> OrderProjection {
    let Some(map) = data.as_object() else {
        return OrderProjection::default();
    };

    OrderProjection {
        id: first_field(map, &["id", "order_id", "orderId"]).and_then(uuid_value),
        order_number: first_field(map, &["order_number", "orderNumber"]).and_then(string_value),
        payment_id: first_field(map, &["payment_id", "paymentId"]).and_then(uuid_value),
        total: first_field(map, &["total"]).and_then(decimal_value),
        currency: first_field(map, &["currency"]).and_then(string_value),
    }
}

#[async_trait]
impl OrderClient for HttpOrderClient {
    async fn create_order(
        &self,
        ctx: &RequestContext,
        order: &NewOrder,
    ) -> Result<CreatedOrder, CheckoutError> {
        let url = format!("{}/api/v1/order", self.base_url);
        let body = order_request_body(order);

        let data = self
            .http
            .post(SERVICE, url, ctx, &body)
            .await
            .map_err(|err| {
                super::map_missing_token(err, |e| {
                    CheckoutError::OrderCreationFailed(e.to_string())
                })
            })?
            .ok_or_else(|| {
                CheckoutError::OrderCreationFailed("order response carried no data".into())
            })?;

        let created = parse_created_order(&data)?;
        info!(order_id = %created.id, order_number = %created.order_number, "order created");
        Ok(created)
    }

    async fn find_by_payment(
        &self,
        ctx: &RequestContext,
        payment_id: Uuid,
    ) -> Result<Option<OrderProjection>, CheckoutError> {
        let url = format!("{}/api/v1/order/by-payment/{}", self.base_url, payment_id);
        match self.http.get(SERVICE, url, ctx).await {
            Ok(Some(data)) => Ok(Some(parse_order_projection(&data))),
            Ok(None) => Ok(None),
            Err(err) if err.status() == Some(StatusCode::NOT_FOUND) => Ok(None),
            Err(err) => Err(super::map_missing_token(err, |e| {
                CheckoutError::Unexpected(format!("Order lookup by payment failed: {e}"))
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use crate::models::{CartItem, Totals};

    #[test]
    fn created_order_requires_id_and_number() {
        let id = Uuid::new_v4();
        let data = json!({"id": id.to_string(), "order_number": "ORD-1"});
        let created = parse_created_order(&data).unwrap();
        assert_eq!(created.id, id);
        assert_eq!(created.order_number, "ORD-1");

        let missing_number = json!({"id": id.to_string()});
        assert!(matches!(
            parse_created_order(&missing_number),
            Err(CheckoutError::OrderCreationFailed(_))
        ));
    }

    #[test]
    fn created_order_accepts_camel_case_aliases() {
        let id = Uuid::new_v4();
        let data = json!({"orderId": id.to_string(), "orderNumber": "ORD-77"});
        let created = parse_created_order(&data).unwrap();
        assert_eq!(created.id, id);
        assert_eq!(created.order_number, "ORD-77");
    }

    #[test]
    fn projection_parses_with_aliases_and_string_numbers() {
        let order_id = Uuid::new_v4();
        let payment_id = Uuid::new_v4();
        let data = json!({
            "order_id": order_id.to_string(),
            "orderNumber": "ORD-9",
            "paymentId": payment_id.to_string(),
            "total": "110.00",
            "currency": "INR",
            "something_else": {"nested": true}
        });

        let projection = parse_order_projection(&data);
        assert_eq!(projection.id, Some(order_id));
        assert_eq!(projection.order_number.as_deref(), Some("ORD-9"));
        assert_eq!(projection.payment_id, Some(payment_id));
        assert_eq!(projection.total, Some(dec!(110.00)));
        assert_eq!(projection.currency.as_deref(), Some("INR"));
    }

    #[test]
    fn projection_of_non_object_is_empty() {
        assert_eq!(parse_order_projection(&json!("oops")), OrderProjection::default());
    }

    #[test]
    fn order_body_serializes_money_as_strings() {
        let order = NewOrder {
            shipping_address_id: Uuid::new_v4(),
            payment_id: Uuid::new_v4(),
            items: vec![CartItem {
                product_id: Uuid::new_v4(),
                name: "Widget".into(),
                sku: "SKU1".into(),
                quantity: 2,
                unit_price: dec!(50.00),
                total_price: dec!(100.00),
            }],
            totals: Totals {
                subtotal: dec!(100.00),
                discount: dec!(0),
                tax: dec!(0),
                shipping: dec!(10.00),
                total: dec!(110.00),
                currency: "INR".into(),
            },
        };

        let body = order_request_body(&order);
        assert_eq!(body["total"], "110.00");
        assert_eq!(body["shipping_cost"], "10.00");
        assert_eq!(body["items"][0]["unit_price"], "50.00");
        assert_eq!(body["items"][0]["product_name"], "Widget");
        assert_eq!(body["currency"], "INR");
    }
}
