//! Domain types shared between the downstream adapters and the saga engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of the caller's cart, as reported by the Cart service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// Snapshot of the caller's cart, fetched fresh at saga start and never
/// cached across the saga boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub currency: String,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Shipping address owned by the Address service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub line1: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
}

/// One warehouse location's availability for a SKU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLocation {
    pub location_id: Uuid,
    pub available_qty: i64,
}

/// One line of an inventory reservation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationItem {
    pub sku: String,
    pub location_id: Uuid,
    pub quantity: u32,
}

/// Priced summary of a cart against an address.
#[derive(Debug, Clone, PartialEq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub currency: String,
}

/// Payment instruction for the Payment service.
#[derive(Debug, Clone)]
pub struct PaymentInstruction {
    pub amount: Decimal,
    pub currency: String,
    /// Order identifier the orchestrator supplied to inventory; reused so the
    /// payment and the reservation reference the same checkout attempt.
    pub order_id: Uuid,
    pub payment_method_id: Option<Uuid>,
    /// Present when the gateway already took the money client-side; the
    /// Payment service verifies instead of charging and is idempotent on it.
    pub gateway_transaction_id: Option<String>,
}

/// New order submitted to the Order service.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub shipping_address_id: Uuid,
    pub payment_id: Uuid,
    pub items: Vec<CartItem>,
    pub totals: Totals,
}

/// Identifiers the Order service assigns on creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedOrder {
    pub id: Uuid,
    pub order_number: String,
}

/// Read-model view of an order, looked up by payment id during retries.
/// Everything beyond the id is optional because replicas may lag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderProjection {
    pub id: Option<Uuid>,
    pub order_number: Option<String>,
    pub payment_id: Option<Uuid>,
    pub total: Option<Decimal>,
    pub currency: Option<String>,
}
