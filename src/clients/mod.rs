/*!
 * # Downstream Client Adapters
 *
 * Typed adapters over the Cart, Address, Inventory, Payment and Order
 * services. All HTTP traffic goes through one [`ResilientClient`] that owns
 * connection pooling, per-call timeouts and a circuit breaker per downstream
 * service. Every call attaches the caller's bearer token and tenant header
 * from the request-scoped [`RequestContext`].
 *
 * Downstream responses arrive in a uniform envelope `{ data, message, ... }`.
 * Decoding is deliberately lenient: identifier fields are looked up under
 * several aliases, numeric fields are accepted as JSON numbers or strings,
 * and unknown fields are ignored. Only a missing *required* field is an
 * error.
 */

use reqwest::{header, Client, Method, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerRegistry};

mod address;
mod cart;
mod inventory;
mod order;
mod payment;

pub use address::{AddressClient, HttpAddressClient};
pub use cart::{CartClient, HttpCartClient};
pub use inventory::{HttpInventoryClient, InventoryClient};
pub use order::{HttpOrderClient, OrderClient};
pub use payment::{HttpPaymentClient, PaymentClient};

/// Transport-level failure of a downstream call, before any business mapping.
#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("no bearer token available for the {service} call")]
    MissingToken { service: &'static str },

    #[error("{service} call timed out")]
    Timeout { service: &'static str },

    #[error("{service} is unavailable (circuit open)")]
    CircuitOpen { service: &'static str },

    #[error("{service} transport error: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("{service} response violated the contract: {message}")]
    Contract {
        service: &'static str,
        message: String,
    },
}

impl DownstreamError {
    /// HTTP status of the downstream response, when there was one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DownstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Uniform response envelope used by every downstream service.
/// Unknown fields are ignored by construction.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
}

/// Shared HTTP client for all downstream adapters: pooled connections,
/// one timeout per call, one circuit breaker per service name.
#[derive(Debug)]
pub struct ResilientClient {
    http: Client,
    breakers: CircuitBreakerRegistry,
}

impl ResilientClient {
    pub fn new(
        timeout: Duration,
        breaker_config: CircuitBreakerConfig,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            breakers: CircuitBreakerRegistry::new(breaker_config),
        })
    }

    pub(crate) async fn get(
        &self,
        service: &'static str,
        url: String,
        ctx: &RequestContext,
    ) -> Result<Option<Value>, DownstreamError> {
        self.execute(service, Method::GET, url, ctx, None).await
    }

    pub(crate) async fn post(
        &self,
        service: &'static str,
        url: String,
        ctx: &RequestContext,
        body: &Value,
    ) -> Result<Option<Value>, DownstreamError> {
        self.execute(service, Method::POST, url, ctx, Some(body))
            .await
    }

    pub(crate) async fn delete(
        &self,
        service: &'static str,
        url: String,
        ctx: &RequestContext,
    ) -> Result<Option<Value>, DownstreamError> {
        self.execute(service, Method::DELETE, url, ctx, None).await
    }

    async fn execute(
        &self,
        service: &'static str,
        method: Method,
        url: String,
        ctx: &RequestContext,
        body: Option<&Value>,
    ) -> Result<Option<Value>, DownstreamError> {
        if ctx.token.is_empty() {
            return Err(DownstreamError::MissingToken { service });
        }

        let breaker = self.breakers.get(service);
        if !breaker.try_acquire() {
            return Err(DownstreamError::CircuitOpen { service });
        }

        let mut request = self
            .http
            .request(method, &url)
            .header(header::AUTHORIZATION, format!("Bearer {}", ctx.token))
            .header("X-Tenant-Id", ctx.tenant_id.to_string());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                breaker.record_failure();
                return if err.is_timeout() {
                    Err(DownstreamError::Timeout { service })
                } else {
                    Err(DownstreamError::Transport {
                        service,
                        message: err.to_string(),
                    })
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            // 4xx is a downstream decision, not a downstream fault
            if status.is_server_error() {
                breaker.record_failure();
            } else {
                breaker.record_success();
            }
            let body = response.text().await.unwrap_or_default();
            return Err(DownstreamError::Status {
                service,
                status,
                body,
            });
        }

        breaker.record_success();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| DownstreamError::Transport {
                service,
                message: err.to_string(),
            })?;
        if bytes.is_empty() {
            return Ok(None);
        }

        let envelope: Envelope =
            serde_json::from_slice(&bytes).map_err(|err| DownstreamError::Contract {
                service,
                message: format!("invalid response envelope: {err}"),
            })?;
        Ok(envelope.data)
    }
}

/// A missing token is always the same structural fault regardless of which
/// adapter hits it; everything else is mapped by the caller.
pub(crate) fn map_missing_token(
    err: DownstreamError,
    fallback: impl FnOnce(DownstreamError) -> crate::errors::CheckoutError,
) -> crate::errors::CheckoutError {
    match err {
        DownstreamError::MissingToken { .. } => crate::errors::CheckoutError::AuthTokenMissing,
        other => fallback(other),
    }
}

// ---------------------------------------------------------------------------
// Defensive field extraction
// ---------------------------------------------------------------------------

pub(crate) fn as_object<'a>(
    value: &'a Value,
    service: &'static str,
) -> Result<&'a serde_json::Map<String, Value>, DownstreamError> {
    value.as_object().ok_or_else(|| DownstreamError::Contract {
        service,
        message: format!("expected a JSON object, got {value}"),
    })
}

/// Return the first present field among the given aliases.
pub(crate) fn first_field<'a>(
    map: &'a serde_json::Map<String, Value>,
    names: &[&str],
) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| map.get(*name).filter(|v| !v.is_null()))
}

pub(crate) fn uuid_value(value: &Value) -> Option<Uuid> {
    value.as_str().and_then(|s| Uuid::parse_str(s.trim()).ok())
}

/// Decimal from a JSON number or string, tolerating scientific notation.
pub(crate) fn decimal_value(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

pub(crate) fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Non-empty string field.
pub(crate) fn string_value(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn first_field_walks_aliases_in_order() {
        let value = json!({"order_id": "b", "orderId": "c"});
        let map = value.as_object().unwrap();
        let found = first_field(map, &["id", "order_id", "orderId"]).unwrap();
        assert_eq!(found, "b");
    }

    #[test]
    fn first_field_skips_null_aliases() {
        let value = json!({"id": null, "payment_id": "abc"});
        let map = value.as_object().unwrap();
        let found = first_field(map, &["id", "payment_id"]).unwrap();
        assert_eq!(found, "abc");
    }

    #[test]
    fn decimal_accepts_number_or_string() {
        assert_eq!(decimal_value(&json!(110.5)), Some(dec!(110.5)));
        assert_eq!(decimal_value(&json!("110.50")), Some(dec!(110.50)));
        assert_eq!(decimal_value(&json!(" 10 ")), Some(dec!(10)));
        assert_eq!(decimal_value(&json!(true)), None);
    }

    #[test]
    fn int_accepts_number_or_string() {
        assert_eq!(int_value(&json!(5)), Some(5));
        assert_eq!(int_value(&json!("7")), Some(7));
        assert_eq!(int_value(&json!([])), None);
    }

    #[test]
    fn envelope_ignores_unknown_fields() {
        let envelope: Envelope = serde_json::from_value(json!({
            "data": {"id": "x"},
            "message": "ok",
            "status": 200,
            "extra": [1, 2, 3]
        }))
        .unwrap();
        assert!(envelope.data.is_some());
    }

    #[test]
    fn envelope_tolerates_missing_data() {
        let envelope: Envelope = serde_json::from_value(json!({"message": "ok"})).unwrap();
        assert!(envelope.data.is_none());
    }
}
