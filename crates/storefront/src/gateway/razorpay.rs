//! Razorpay Orders API client.
//!
//! A Razorpay "order" is what the checkout pipeline calls a payment intent.
//! Outside production the client hands out `order_mock_<unixMs>` ids when
//! the API is unreachable or unconfigured, so the storefront can be run
//! without live keys. Mock intents are never looked up or turned into
//! orders.

use std::sync::Arc;
use std::time::Duration;

use saumara_core::{IntentId, IntentRequest, Paise, PaymentConfirmation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::signature::{self, SignatureError};
use super::{GatewayError, PaymentGateway};
use crate::config::RazorpayConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Razorpay API client.
#[derive(Clone)]
pub struct RazorpayClient {
    inner: Arc<RazorpayClientInner>,
}

struct RazorpayClientInner {
    client: reqwest::Client,
    api_base: String,
    key_id: Option<String>,
    key_secret: Option<SecretString>,
    dev_fallback: bool,
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: u64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Deserialize)]
struct RazorpayOrder {
    id: String,
    amount: u64,
}

impl RazorpayClient {
    /// Create a new Razorpay client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &RazorpayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            inner: Arc::new(RazorpayClientInner {
                client,
                api_base: config.api_base.clone(),
                key_id: config.key_id.clone(),
                key_secret: config.key_secret.clone(),
                dev_fallback: config.dev_fallback,
            }),
        })
    }

    fn credentials(&self) -> Result<(&str, &SecretString), GatewayError> {
        match (&self.inner.key_id, &self.inner.key_secret) {
            (Some(key_id), Some(key_secret)) => Ok((key_id.as_str(), key_secret)),
            _ => Err(GatewayError::MissingCredentials),
        }
    }

    async fn post_order(&self, request: &IntentRequest) -> Result<IntentId, GatewayError> {
        let (key_id, key_secret) = self.credentials()?;

        let body = CreateOrderBody {
            amount: request.amount.get(),
            currency: request.currency.code(),
            receipt: &request.receipt,
        };

        let response = self
            .inner
            .client
            .post(format!("{}/orders", self.inner.api_base))
            .basic_auth(key_id, Some(key_secret.expose_secret()))
            .json(&body)
            .send()
            .await?;

        let order = Self::read_order(response).await?;
        Ok(IntentId::new(order.id))
    }

    async fn get_order(&self, intent_id: &IntentId) -> Result<RazorpayOrder, GatewayError> {
        let (key_id, key_secret) = self.credentials()?;

        let response = self
            .inner
            .client
            .get(format!("{}/orders/{intent_id}", self.inner.api_base))
            .basic_auth(key_id, Some(key_secret.expose_secret()))
            .send()
            .await?;

        Self::read_order(response).await
    }

    async fn read_order(response: reqwest::Response) -> Result<RazorpayOrder, GatewayError> {
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))
    }
}

impl PaymentGateway for RazorpayClient {
    fn key_id(&self) -> Option<&str> {
        self.inner.key_id.as_deref()
    }

    #[instrument(skip(self), fields(amount = %request.amount, receipt = %request.receipt))]
    async fn create_intent(&self, request: &IntentRequest) -> Result<IntentId, GatewayError> {
        match self.post_order(request).await {
            Ok(intent_id) => {
                tracing::info!(correlation_id = %intent_id, "Payment intent created");
                Ok(intent_id)
            }
            Err(e) if self.inner.dev_fallback => {
                let intent_id = IntentId::mock(chrono::Utc::now().timestamp_millis());
                tracing::warn!(
                    error = %e,
                    correlation_id = %intent_id,
                    "Gateway unavailable, handing out mock intent (development only)"
                );
                Ok(intent_id)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(correlation_id = %intent_id))]
    async fn intent_amount(&self, intent_id: &IntentId) -> Result<Paise, GatewayError> {
        let order = self.get_order(intent_id).await?;
        if order.id != intent_id.as_str() {
            return Err(GatewayError::Parse(format!(
                "asked for {intent_id}, gateway returned {}",
                order.id
            )));
        }
        Ok(Paise::new(order.amount))
    }

    fn verify(&self, confirmation: &PaymentConfirmation) -> Result<(), SignatureError> {
        let secret = self
            .inner
            .key_secret
            .as_ref()
            .ok_or(SignatureError::NoSecret)?;

        signature::verify(
            secret.expose_secret().as_bytes(),
            confirmation.intent_id.as_str(),
            confirmation.payment_id.as_str(),
            &confirmation.signature,
        )
    }
}
