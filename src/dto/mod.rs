//! Request and response DTOs for the checkout HTTP surface.
//! Wire field names are snake_case throughout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Address, CartItem};

/// Input for both `initiate` and `complete`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutRequest {
    /// Required for checkout; absence is a business error, not a schema one.
    #[serde(default)]
    pub shipping_address_id: Option<Uuid>,

    /// Saved-instrument reference on the Payment service.
    #[serde(default)]
    pub payment_method_id: Option<Uuid>,

    /// Opaque id from the client-side gateway SDK (e.g. a Razorpay payment
    /// id). Doubles as the idempotency key on retries.
    #[serde(default)]
    pub payment_gateway_transaction_id: Option<String>,

    /// Optional; the Cart service resolves the caller's current cart.
    #[serde(default)]
    pub cart_id: Option<Uuid>,
}

impl CheckoutRequest {
    /// The retry signal: a non-empty gateway transaction id.
    pub fn gateway_transaction_id(&self) -> Option<&str> {
        self.payment_gateway_transaction_id
            .as_deref()
            .filter(|t| !t.is_empty())
    }
}

/// One priced line in the checkout summary.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutItem {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

impl From<&CartItem> for CheckoutItem {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name.clone(),
            sku: item.sku.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
        }
    }
}

/// Shipping address echoed back in the summary.
#[derive(Debug, Clone, Serialize)]
pub struct AddressSummary {
    pub id: Uuid,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl From<&Address> for AddressSummary {
    fn from(address: &Address) -> Self {
        Self {
            id: address.id,
            street: address.line1.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            zip_code: address.postcode.clone(),
            country: address.country.clone(),
        }
    }
}

/// Dry-run summary returned by `initiate`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSummary {
    pub items: Vec<CheckoutItem>,
    pub shipping_address: AddressSummary,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub currency: String,
}

/// Terminal success payload of `complete`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutComplete {
    pub order_id: Uuid,
    pub order_number: String,
    pub payment_id: Uuid,
    pub total: Decimal,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressValidationRequest {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddressValidationResponse {
    pub valid: bool,
    pub suggested_corrections: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShippingCalculationRequest {
    #[serde(default)]
    pub address_id: Option<Uuid>,
    #[serde(default)]
    pub shipping_method: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShippingOption {
    pub method: String,
    pub name: String,
    pub estimated_days: u32,
    pub cost: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShippingCalculationResponse {
    pub shipping_options: Vec<ShippingOption>,
}
