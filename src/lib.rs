//! Checkout Orchestrator API Library
//!
//! A stateless HTTP service that drives the checkout saga across the Cart,
//! Address, Inventory, Payment and Order services, compensating partial
//! failures so the system converges to a consistent state.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod circuit_breaker;
pub mod clients;
pub mod config;
pub mod dto;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod message_queue;
pub mod middleware_helpers;
pub mod models;
pub mod services;

use axum::http::StatusCode;
use axum::Router;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::clients::{
    HttpAddressClient, HttpCartClient, HttpInventoryClient, HttpOrderClient, HttpPaymentClient,
    ResilientClient,
};
use crate::events::EventPublisher;
use crate::message_queue::{InMemoryMessageQueue, MessageQueue, RedisMessageQueue};
use crate::services::CheckoutService;

// App state definition
pub struct AppState {
    pub config: config::AppConfig,
    pub checkout: Arc<CheckoutService>,
}

impl AppState {
    /// Wire the downstream adapters, the event publisher and the saga engine
    /// from configuration.
    pub fn from_config(config: config::AppConfig) -> anyhow::Result<Self> {
        let http = Arc::new(ResilientClient::new(
            config.http_timeout(),
            CircuitBreakerConfig {
                failure_threshold: config.breaker_failure_threshold,
                reset_timeout: config.breaker_reset_timeout(),
                success_threshold: config.breaker_success_threshold,
            },
        )?);

        let queue: Arc<dyn MessageQueue> = match config.queue_backend.as_str() {
            "redis" => {
                let client = Arc::new(redis::Client::open(config.redis_url.as_str())?);
                Arc::new(RedisMessageQueue::new(client, "checkout:mq"))
            }
            _ => Arc::new(InMemoryMessageQueue::new()),
        };
        let events = EventPublisher::new(queue, config.order_created_topic.clone());

        let checkout = Arc::new(CheckoutService::new(
            Arc::new(HttpCartClient::new(
                http.clone(),
                config.services.cart.clone(),
                config.default_currency.clone(),
            )),
            Arc::new(HttpAddressClient::new(
                http.clone(),
                config.services.address.clone(),
            )),
            Arc::new(HttpInventoryClient::new(
                http.clone(),
                config.services.inventory.clone(),
            )),
            Arc::new(HttpPaymentClient::new(
                http.clone(),
                config.services.payment.clone(),
                config.default_currency.clone(),
            )),
            Arc::new(HttpOrderClient::new(
                http.clone(),
                config.services.order.clone(),
            )),
            events,
            config.default_currency.clone(),
        ));

        Ok(Self { config, checkout })
    }
}

/// All `/api/v1` routes.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/checkout", handlers::checkout::checkout_routes())
}

/// Uniform response wrapper: `{ data, message, status, timestamp }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub message: String,
    pub status: u16,
    pub timestamp: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, message: &str, status: StatusCode) -> Self {
        Self {
            data: Some(data),
            message: message.to_string(),
            status: status.as_u16(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
