//! Server half of checkout: intent creation and order placement.

use std::collections::HashMap;
use std::sync::Arc;

use saumara_core::{
    CartItem, CheckoutForm, NewOrder, Order, OrderNumber, PaymentConfirmation, PaymentFailure,
    PaymentIntent, PriceBreakdown, ProductId, Rupees, ShippingAddress,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::failures::FailureSink;
use super::{CheckoutError, OrderStore, PriceCatalog, StoreError};
use crate::gateway::PaymentGateway;

/// Order-number regenerations after the first attempt collides.
pub const MAX_ORDER_NUMBER_REGENERATIONS: usize = 3;

/// A freshly created payment intent plus the server-side pricing behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedIntent {
    pub intent: PaymentIntent,
    pub breakdown: PriceBreakdown,
    pub items: Vec<CartItem>,
    pub key_id: Option<String>,
}

/// Everything needed to turn a confirmed payment into an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSubmission {
    pub form: CheckoutForm,
    pub items: Vec<CartItem>,
    pub confirmation: PaymentConfirmation,
    /// Totals the client displayed. Advisory only.
    pub client_totals: Option<PriceBreakdown>,
}

/// Result of a successful placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: Order,
    /// The intent already had an order; nothing was inserted.
    pub replayed: bool,
}

enum RepriceError {
    Empty,
    Unknown(ProductId),
    Catalog(String),
}

/// Checkout over a gateway, an order store and a price catalog.
pub struct CheckoutService<G, S, C> {
    gateway: G,
    store: S,
    catalog: C,
    failures: Arc<dyn FailureSink>,
}

impl<G, S, C> CheckoutService<G, S, C>
where
    G: PaymentGateway,
    S: OrderStore,
    C: PriceCatalog,
{
    pub fn new(gateway: G, store: S, catalog: C, failures: Arc<dyn FailureSink>) -> Self {
        Self {
            gateway,
            store,
            catalog,
            failures,
        }
    }

    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Price `items` from the catalog and open a gateway intent for the total.
    ///
    /// `client_amount` is what the browser believes the total is; a mismatch
    /// is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// `EmptyCart`, `UnknownProduct`, or `GatewayUnavailable`.
    #[instrument(skip(self, items), fields(lines = items.len()))]
    pub async fn create_intent(
        &self,
        items: &[CartItem],
        client_amount: Option<Rupees>,
    ) -> Result<CreatedIntent, CheckoutError> {
        let items = self.reprice(items).await.map_err(|e| match e {
            RepriceError::Empty => CheckoutError::EmptyCart,
            RepriceError::Unknown(id) => CheckoutError::UnknownProduct(id),
            RepriceError::Catalog(m) => CheckoutError::Internal(m),
        })?;
        let breakdown = PriceBreakdown::for_items(&items);

        if let Some(client) = client_amount
            && client != breakdown.total
        {
            tracing::warn!(
                client_total = %client,
                server_total = %breakdown.total,
                "Client total differs from catalog pricing, charging server total"
            );
        }

        let request =
            saumara_core::IntentRequest::for_total(breakdown.total, chrono::Utc::now().timestamp_millis());
        let intent_id = self.gateway.create_intent(&request).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to create payment intent");
            CheckoutError::GatewayUnavailable(e.to_string())
        })?;

        Ok(CreatedIntent {
            intent: PaymentIntent {
                intent_id,
                amount_paise: request.amount,
                currency: request.currency,
                receipt: request.receipt,
            },
            breakdown,
            items,
            key_id: self.gateway.key_id().map(str::to_string),
        })
    }

    /// Verify a gateway confirmation and persist the order.
    ///
    /// Repeated confirmations for the same intent return the existing order.
    /// Once the signature has verified the customer has paid, so every
    /// rejection from then on is written to the failure sink before it is
    /// returned.
    ///
    /// # Errors
    ///
    /// `SignatureInvalid` before anything is recorded. After that,
    /// `Validation`, `EmptyCart`, `UnknownProduct`, `AmountMismatch`,
    /// `GatewayUnavailable`, `DuplicateOrderNumber` or `StoreUnavailable`.
    #[instrument(
        skip(self, submission),
        fields(correlation_id = %submission.confirmation.intent_id)
    )]
    pub async fn place_order(&self, submission: OrderSubmission) -> Result<PlacedOrder, CheckoutError> {
        let confirmation = &submission.confirmation;
        if confirmation.intent_id.is_mock() {
            tracing::error!(
                correlation_id = %confirmation.intent_id,
                payment_id = %confirmation.payment_id,
                "Confirmation references a development mock intent, no payment exists for it"
            );
            return Err(CheckoutError::SignatureInvalid);
        }
        if let Err(reason) = self.gateway.verify(confirmation) {
            tracing::error!(
                correlation_id = %confirmation.intent_id,
                payment_id = %confirmation.payment_id,
                %reason,
                "Payment signature rejected, order not persisted"
            );
            return Err(CheckoutError::SignatureInvalid);
        }

        match self.settle(&submission).await {
            Ok(placed) => Ok(placed),
            Err(err) => {
                self.record_failure(&submission, &err).await;
                Err(err)
            }
        }
    }

    /// Look up an order by its public number.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the store cannot be reached.
    pub async fn find_order(&self, order_number: &OrderNumber) -> Result<Option<Order>, CheckoutError> {
        self.store
            .find_by_order_number(order_number)
            .await
            .map_err(store_unavailable)
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the store cannot be reached.
    pub async fn list_orders(&self) -> Result<Vec<Order>, CheckoutError> {
        self.store.list_orders().await.map_err(store_unavailable)
    }

    async fn settle(&self, submission: &OrderSubmission) -> Result<PlacedOrder, CheckoutError> {
        let customer = submission.form.validate().map_err(CheckoutError::Validation)?;
        if submission.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        self.persist(&customer, submission).await
    }

    async fn persist(
        &self,
        customer: &ShippingAddress,
        submission: &OrderSubmission,
    ) -> Result<PlacedOrder, CheckoutError> {
        let intent_id = &submission.confirmation.intent_id;

        if let Some(order) = self
            .store
            .find_by_intent(intent_id)
            .await
            .map_err(store_unavailable)?
        {
            tracing::info!(
                correlation_id = %order.order_number,
                intent_id = %intent_id,
                "Order already placed for this payment intent"
            );
            return Ok(PlacedOrder {
                order,
                replayed: true,
            });
        }

        let items = self.reprice(&submission.items).await.map_err(|e| match e {
            RepriceError::Empty => CheckoutError::EmptyCart,
            RepriceError::Unknown(id) => CheckoutError::UnknownProduct(id),
            RepriceError::Catalog(m) => CheckoutError::StoreUnavailable(m),
        })?;

        let mut new_order = NewOrder::new(
            OrderNumber::generate(),
            customer.clone(),
            items,
            intent_id.clone(),
            submission.confirmation.payment_id.clone(),
        );

        if let Some(client) = submission.client_totals
            && client != new_order.breakdown()
        {
            tracing::warn!(
                correlation_id = %intent_id,
                client_total = %client.total,
                server_total = %new_order.breakdown().total,
                "Client totals differ from catalog pricing, storing server totals"
            );
        }

        let expected = new_order.breakdown().total.to_paise();
        let charged = self.gateway.intent_amount(intent_id).await.map_err(|e| {
            tracing::error!(
                correlation_id = %intent_id,
                error = %e,
                "Could not read the charged amount for this payment intent"
            );
            CheckoutError::GatewayUnavailable(e.to_string())
        })?;
        if charged != expected {
            tracing::error!(
                correlation_id = %intent_id,
                %charged,
                %expected,
                "Order total does not match the amount the intent charged"
            );
            return Err(CheckoutError::AmountMismatch(format!(
                "charged {charged}, order is {expected}"
            )));
        }

        for attempt in 0..=MAX_ORDER_NUMBER_REGENERATIONS {
            match self.store.insert_order(&new_order).await {
                Ok(order) => {
                    tracing::info!(
                        correlation_id = %order.order_number,
                        intent_id = %order.razorpay_order_id,
                        total = %order.total,
                        "Order placed"
                    );
                    return Ok(PlacedOrder {
                        order,
                        replayed: false,
                    });
                }
                Err(StoreError::DuplicateOrderNumber) => {
                    tracing::warn!(
                        correlation_id = %new_order.order_number(),
                        attempt,
                        "Order number collision, regenerating"
                    );
                    new_order = new_order.with_order_number(OrderNumber::generate());
                }
                Err(StoreError::DuplicateIntent) => {
                    // A concurrent confirmation for the same intent won the insert.
                    return match self.store.find_by_intent(intent_id).await {
                        Ok(Some(order)) => Ok(PlacedOrder {
                            order,
                            replayed: true,
                        }),
                        Ok(None) => Err(CheckoutError::StoreUnavailable(
                            "intent conflict but no order found".to_string(),
                        )),
                        Err(e) => Err(store_unavailable(e)),
                    };
                }
                Err(e @ (StoreError::Unavailable(_) | StoreError::Corrupt(_))) => {
                    return Err(store_unavailable(e));
                }
            }
        }

        Err(CheckoutError::DuplicateOrderNumber)
    }

    /// Replace client snapshots with catalog snapshots, merging duplicate
    /// lines and dropping empty ones. Quantities come from the client.
    async fn reprice(&self, items: &[CartItem]) -> Result<Vec<CartItem>, RepriceError> {
        let mut quantities: Vec<(ProductId, u32)> = Vec::with_capacity(items.len());
        for item in items.iter().filter(|item| item.quantity > 0) {
            match quantities.iter_mut().find(|(id, _)| id == &item.product.id) {
                Some((_, quantity)) => *quantity = quantity.saturating_add(item.quantity),
                None => quantities.push((item.product.id.clone(), item.quantity)),
            }
        }
        if quantities.is_empty() {
            return Err(RepriceError::Empty);
        }

        let ids: Vec<ProductId> = quantities.iter().map(|(id, _)| id.clone()).collect();
        let mut snapshots: HashMap<ProductId, _> = self
            .catalog
            .snapshots(&ids)
            .await
            .map_err(|e| RepriceError::Catalog(e.to_string()))?
            .into_iter()
            .map(|snapshot| (snapshot.id.clone(), snapshot))
            .collect();

        quantities
            .into_iter()
            .map(|(id, quantity)| {
                snapshots
                    .remove(&id)
                    .map(|product| CartItem { product, quantity })
                    .ok_or(RepriceError::Unknown(id))
            })
            .collect()
    }

    async fn record_failure(&self, submission: &OrderSubmission, err: &CheckoutError) {
        let confirmation = &submission.confirmation;
        let failure = PaymentFailure::new(
            confirmation.intent_id.clone(),
            confirmation.payment_id.clone(),
            submission.form.clone(),
            submission.items.clone(),
            err.to_string(),
        );

        tracing::error!(
            correlation_id = %confirmation.intent_id,
            payment_id = %confirmation.payment_id,
            error = %err,
            "Payment orphaned: charge verified but order not stored"
        );

        // Sinks may do blocking file I/O.
        let sink = Arc::clone(&self.failures);
        let written = tokio::task::spawn_blocking(move || sink.record(&failure)).await;
        let error = match written {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };
        tracing::error!(
            correlation_id = %confirmation.intent_id,
            payment_id = %confirmation.payment_id,
            %error,
            "Failed to write payment failure record"
        );
    }
}

fn store_unavailable(err: StoreError) -> CheckoutError {
    CheckoutError::StoreUnavailable(err.to_string())
}
