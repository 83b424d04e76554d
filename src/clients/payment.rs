use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::errors::CheckoutError;
use crate::models::PaymentInstruction;

use super::{as_object, first_field, uuid_value, DownstreamError, ResilientClient};

const SERVICE: &str = "payment-service";

/// Payment service adapter.
///
/// `POST /payment/process` is idempotent on `payment_gateway_transaction_id`:
/// re-submitting a transaction id returns the existing payment instead of
/// charging again. The retry lookup leans on exactly that contract.
#[async_trait]
pub trait PaymentClient: Send + Sync {
    /// Charge (or verify a client-side gateway payment) and return the
    /// payment id.
    async fn process(
        &self,
        ctx: &RequestContext,
        instruction: &PaymentInstruction,
    ) -> Result<Uuid, CheckoutError>;

    /// Refund a payment that no order ended up owning.
    async fn refund(
        &self,
        ctx: &RequestContext,
        payment_id: Uuid,
        reason: &str,
    ) -> Result<(), CheckoutError>;

    /// Find the payment previously recorded for a gateway transaction id.
    /// Returns `None` when no such payment exists.
    async fn lookup_by_transaction(
        &self,
        ctx: &RequestContext,
        transaction_id: &str,
    ) -> Result<Option<Uuid>, CheckoutError>;
}

pub struct HttpPaymentClient {
    http: Arc<ResilientClient>,
    base_url: String,
    default_currency: String,
}

impl HttpPaymentClient {
    pub fn new(http: Arc<ResilientClient>, base_url: String, default_currency: String) -> Self {
        Self {
            http,
            base_url,
            default_currency,
        }
    }

    fn process_url(&self) -> String {
        format!("{}/api/v1/payment/process", self.base_url)
    }
}

fn extract_payment_id(map: &Map<String, Value>) -> Option<Uuid> {
    first_field(map, &["id", "payment_id", "paymentId"]).and_then(uuid_value)
}

#[async_trait]
impl PaymentClient for HttpPaymentClient {
    async fn process(
        &self,
        ctx: &RequestContext,
        instruction: &PaymentInstruction,
    ) -> Result<Uuid, CheckoutError> {
        let mut body = json!({
            "amount": instruction.amount.to_string(),
            "currency": instruction.currency,
            "order_id": instruction.order_id.to_string(),
        });
        if let Some(method_id) = instruction.payment_method_id {
            body["payment_method_id"] = json!(method_id.to_string());
        }
        if let Some(txn) = instruction
            .gateway_transaction_id
            .as_deref()
            .filter(|t| !t.is_empty())
        {
            body["payment_gateway_transaction_id"] = json!(txn);
            info!(transaction_id = %txn, amount = %instruction.amount, "verifying client-side payment");
        }

        let data = self
            .http
            .post(SERVICE, self.process_url(), ctx, &body)
            .await
            .map_err(|err| match err {
                DownstreamError::Timeout { .. } => CheckoutError::PaymentTimeout,
                DownstreamError::Status { status, body, .. } if status.is_client_error() => {
                    CheckoutError::PaymentDeclined(format!("{status}: {body}"))
                }
                other => super::map_missing_token(other, |e| {
                    CheckoutError::Unexpected(format!("Payment processing failed: {e}"))
                }),
            })?
            .ok_or_else(|| {
                CheckoutError::UpstreamContract("payment response carried no data".into())
            })?;

        let map = as_object(&data, SERVICE)
            .map_err(|err| CheckoutError::UpstreamContract(err.to_string()))?;
        let payment_id = extract_payment_id(map).ok_or_else(|| {
            CheckoutError::UpstreamContract("payment response is missing a payment id".into())
        })?;

        info!(%payment_id, "payment processed");
        Ok(payment_id)
    }

    async fn refund(
        &self,
        ctx: &RequestContext,
        payment_id: Uuid,
        reason: &str,
    ) -> Result<(), CheckoutError> {
        let url = format!("{}/api/v1/payment/refund", self.base_url);
        let body = json!({
            "payment_id": payment_id.to_string(),
            "reason": reason,
        });

        self.http
            .post(SERVICE, url, ctx, &body)
            .await
            .map_err(|err| {
                CheckoutError::Unexpected(format!("Failed to refund payment: {err}"))
            })?;
        Ok(())
    }

    async fn lookup_by_transaction(
        &self,
        ctx: &RequestContext,
        transaction_id: &str,
    ) -> Result<Option<Uuid>, CheckoutError> {
        // Re-invoking process with only the transaction id and a zero amount
        // relies on the idempotency contract above: the service answers with
        // the existing payment rather than creating a new one.
        let body = json!({
            "payment_gateway_transaction_id": transaction_id,
            "amount": "0",
            "currency": self.default_currency,
        });

        match self.http.post(SERVICE, self.process_url(), ctx, &body).await {
            Ok(Some(data)) => {
                let id = data.as_object().and_then(extract_payment_id);
                if id.is_none() {
                    debug!(%transaction_id, "payment lookup response carried no id");
                }
                Ok(id)
            }
            Ok(None) => Ok(None),
            Err(err) => {
                warn!(%transaction_id, error = %err, "payment lookup failed");
                Ok(None)
            }
        }
    }
}
