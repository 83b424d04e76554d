//! Deterministic cart pricing.
//!
//! Policies are deliberately simple placeholders (zero tax, flat shipping)
//! kept behind this module boundary so a rate provider can replace them
//! without touching the saga engine.

use rust_decimal::Decimal;

use crate::errors::CheckoutError;
use crate::models::{CartSnapshot, Totals};

/// Flat standard shipping: 10.00 in the cart's currency.
pub fn standard_shipping_cost() -> Decimal {
    Decimal::new(1000, 2)
}

/// Express shipping is priced at 1.5x standard.
pub fn express_shipping_cost() -> Decimal {
    standard_shipping_cost() * Decimal::new(15, 1)
}

/// Price a cart: `total = subtotal - discount + tax + shipping`.
///
/// Subtotal and discount echo the cart; tax is a reserved placeholder.
/// A cart whose money fields cannot satisfy the equation is rejected rather
/// than silently repriced.
pub fn price_cart(cart: &CartSnapshot) -> Result<Totals, CheckoutError> {
    let subtotal = cart.subtotal;
    let discount = cart.discount_amount;
    let tax = Decimal::ZERO;
    let shipping = standard_shipping_cost();

    if subtotal < Decimal::ZERO || discount < Decimal::ZERO {
        return Err(CheckoutError::UpstreamContract(
            "cart reported a negative subtotal or discount".into(),
        ));
    }
    if discount > subtotal {
        return Err(CheckoutError::UpstreamContract(format!(
            "cart discount {discount} exceeds subtotal {subtotal}"
        )));
    }

    let total = subtotal - discount + tax + shipping;

    Ok(Totals {
        subtotal,
        discount,
        tax,
        shipping,
        total,
        currency: cart.currency.clone(),
    })
}
