//! Outbound payment provider client.

use crate::config::PaymentConfig;
use crate::error::{AppError, AppResult};
use crate::models::{OrderRequest, PaymentOrder};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{error, info};

/// Creates and reads back provider-side orders.
///
/// Orders are never persisted locally; only a confirmed payment produces a
/// booking.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: &OrderRequest) -> AppResult<PaymentOrder>;

    /// Order as the provider holds it, notes included.
    ///
    /// Fails with `Validation` when the provider does not know the order.
    async fn fetch_order(&self, order_id: &str) -> AppResult<PaymentOrder>;
}

/// Razorpay Orders API client
pub struct RazorpayClient {
    http: Client,
    api_base: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(config: &PaymentConfig) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(&self, request: &OrderRequest) -> AppResult<PaymentOrder> {
        let body = serde_json::json!({
            "amount": request.amount,
            "currency": request.currency,
            "receipt": request.receipt,
            "notes": request.notes.to_map(),
        });

        let response = self
            .http
            .post(format!("{}/orders", self.api_base))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Payment provider unreachable: {}", e);
                AppError::ExternalService(format!("Payment provider unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("Payment provider rejected order: {} {}", status, detail);
            return Err(AppError::ExternalService(format!(
                "Order creation failed with status {}",
                status
            )));
        }

        let order = read_order(response).await?;

        info!(
            "Payment order created: id={}, amount={}, currency={}",
            order.id, order.amount, order.currency
        );

        Ok(order)
    }

    async fn fetch_order(&self, order_id: &str) -> AppResult<PaymentOrder> {
        let response = self
            .http
            .get(format!("{}/orders/{}", self.api_base, order_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(|e| {
                error!("Payment provider unreachable: {}", e);
                AppError::ExternalService(format!("Payment provider unreachable: {}", e))
            })?;

        let status = response.status();
        // The provider answers 400 for ids it never issued
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            return Err(AppError::Validation(format!(
                "Unknown payment order {}",
                order_id
            )));
        }
        if !status.is_success() {
            error!("Payment provider failed to return order {}: {}", order_id, status);
            return Err(AppError::ExternalService(format!(
                "Order lookup failed with status {}",
                status
            )));
        }

        read_order(response).await
    }
}

async fn read_order(response: Response) -> AppResult<PaymentOrder> {
    response
        .json::<PaymentOrder>()
        .await
        .map_err(|e| AppError::ExternalService(format!("Unexpected order response: {}", e)))
}

/// Gateway that answers locally and remembers every request and order
#[derive(Default)]
pub struct MockPaymentGateway {
    requests: Mutex<Vec<OrderRequest>>,
    orders: Mutex<HashMap<String, PaymentOrder>>,
    counter: AtomicU64,
    fail: bool,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway whose every call fails as if the provider were down
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<OrderRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_order(&self, request: &OrderRequest) -> AppResult<PaymentOrder> {
        self.requests
            .lock()
            .map_err(|_| AppError::Message("mock gateway lock poisoned".to_string()))?
            .push(request.clone());

        if self.fail {
            return Err(AppError::ExternalService(
                "Payment provider unavailable".to_string(),
            ));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let order = PaymentOrder {
            id: format!("order_mock_{}", n),
            amount: request.amount,
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
            notes: serde_json::Value::Object(request.notes.to_map()),
        };
        self.orders
            .lock()
            .map_err(|_| AppError::Message("mock gateway lock poisoned".to_string()))?
            .insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &str) -> AppResult<PaymentOrder> {
        if self.fail {
            return Err(AppError::ExternalService(
                "Payment provider unavailable".to_string(),
            ));
        }

        self.orders
            .lock()
            .map_err(|_| AppError::Message("mock gateway lock poisoned".to_string()))?
            .get(order_id)
            .cloned()
            .ok_or_else(|| AppError::Validation(format!("Unknown payment order {}", order_id)))
    }
}
