//! [`CheckoutBackend`] over HTTP, for clients running outside the server
//! process.

use std::sync::Arc;
use std::time::Duration;

use saumara_core::{CartItem, Order, Rupees};
use serde::de::DeserializeOwned;

use super::flow::CheckoutBackend;
use super::service::{CreatedIntent, OrderSubmission};
use super::wire::{ErrorBody, IntentBody, IntentResponse, OrderBody, PlacedResponse};
use super::CheckoutError;

const TIMEOUT: Duration = Duration::from_secs(30);

/// Talks to a running storefront's `/api/razorpay` and `/api/orders`.
#[derive(Clone)]
pub struct HttpCheckoutBackend {
    inner: Arc<Inner>,
}

struct Inner {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCheckoutBackend {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    async fn post<B: serde::Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Transport> {
        let url = format!("{}{path}", self.inner.base_url);
        let response = self
            .inner
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Transport::Failed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| Transport::Failed(e.to_string()));
        }

        match response.json::<ErrorBody>().await {
            Ok(body) => Err(Transport::Rejected(body.into_checkout_error())),
            Err(_) => Err(Transport::Failed(format!("HTTP {status} from {path}"))),
        }
    }
}

/// Whether the server answered with a checkout error or never answered.
enum Transport {
    Rejected(CheckoutError),
    Failed(String),
}

impl CheckoutBackend for HttpCheckoutBackend {
    async fn request_intent(
        &self,
        items: &[CartItem],
        client_amount: Rupees,
    ) -> Result<CreatedIntent, CheckoutError> {
        let body = IntentBody {
            items: items.to_vec(),
            amount: Some(client_amount),
        };
        match self.post::<_, IntentResponse>("/api/razorpay", &body).await {
            Ok(response) => Ok(response.into()),
            Err(Transport::Rejected(err)) => Err(err),
            Err(Transport::Failed(message)) => Err(CheckoutError::GatewayUnavailable(message)),
        }
    }

    async fn submit_order(&self, submission: OrderSubmission) -> Result<Order, CheckoutError> {
        let body = OrderBody::from(&submission);
        match self.post::<_, PlacedResponse>("/api/orders", &body).await {
            Ok(placed) => Ok(placed.order),
            Err(Transport::Rejected(err)) => Err(err),
            // The charge went through; an unanswered persist is an orphaned payment.
            Err(Transport::Failed(message)) => Err(CheckoutError::StoreUnavailable(message)),
        }
    }
}
