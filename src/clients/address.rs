use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::errors::CheckoutError;
use crate::models::Address;

use super::{as_object, first_field, string_value, uuid_value, ResilientClient};

const SERVICE: &str = "address-service";

/// Address service adapter. The Address service is the authority on
/// addresses; this orchestrator only consumes them.
#[async_trait]
pub trait AddressClient: Send + Sync {
    async fn fetch_address(
        &self,
        ctx: &RequestContext,
        address_id: Uuid,
    ) -> Result<Address, CheckoutError>;
}

pub struct HttpAddressClient {
    http: Arc<ResilientClient>,
    base_url: String,
}

impl HttpAddressClient {
    pub fn new(http: Arc<ResilientClient>, base_url: String) -> Self {
        Self { http, base_url }
    }
}

fn parse_address(data: &Value, address_id: Uuid) -> Result<Address, CheckoutError> {
    let map = as_object(data, SERVICE)
        .map_err(|err| CheckoutError::UpstreamContract(err.to_string()))?;

    let id = first_field(map, &["id", "address_id", "addressId"])
        .and_then(uuid_value)
        .unwrap_or(address_id);
    let line1 = first_field(map, &["line1", "street"])
        .and_then(string_value)
        .ok_or_else(|| CheckoutError::UpstreamContract("address is missing line1".into()))?;
    let city = first_field(map, &["city"])
        .and_then(string_value)
        .ok_or_else(|| CheckoutError::UpstreamContract("address is missing city".into()))?;
    let state = first_field(map, &["state"])
        .and_then(string_value)
        .unwrap_or_default();
    let postcode = first_field(map, &["postcode", "zip_code", "zipCode"])
        .and_then(string_value)
        .unwrap_or_default();
    let country = first_field(map, &["country"])
        .and_then(string_value)
        .ok_or_else(|| CheckoutError::UpstreamContract("address is missing country".into()))?;

    Ok(Address {
        id,
        line1,
        city,
        state,
        postcode,
        country,
    })
}

#[async_trait]
impl AddressClient for HttpAddressClient {
    async fn fetch_address(
        &self,
        ctx: &RequestContext,
        address_id: Uuid,
    ) -> Result<Address, CheckoutError> {
        let url = format!("{}/api/v1/address/{}", self.base_url, address_id);
        let data = self
            .http
            .get(SERVICE, url, ctx)
            .await
            .map_err(|err| match err.status() {
                Some(StatusCode::NOT_FOUND) => CheckoutError::AddressNotFound(address_id),
                Some(StatusCode::FORBIDDEN) => CheckoutError::AddressForbidden(address_id),
                _ => super::map_missing_token(err, |e| {
                    CheckoutError::Unexpected(format!("Failed to fetch address: {e}"))
                }),
            })?
            .ok_or(CheckoutError::AddressNotFound(address_id))?;

        parse_address(&data, address_id)
    }
}
