//! `POST /api/razorpay`: reprice the cart and open a payment intent.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use tracing::instrument;

use crate::checkout::wire::{IntentBody, IntentResponse};
use crate::error::{Result, add_breadcrumb};
use crate::state::AppState;

use super::json_body;

/// Create a gateway intent for the server-priced cart total.
#[instrument(skip(state, body))]
pub async fn create_intent(
    State(state): State<AppState>,
    body: std::result::Result<Json<IntentBody>, JsonRejection>,
) -> Result<Json<IntentResponse>> {
    let body = json_body(body)?;
    let created = state
        .checkout()
        .create_intent(&body.items, body.amount)
        .await?;

    let intent_id = created.intent.intent_id.to_string();
    tracing::info!(
        correlation_id = %intent_id,
        total = %created.breakdown.total,
        mock = created.intent.intent_id.is_mock(),
        "Payment intent created"
    );
    add_breadcrumb(
        "checkout",
        "Payment intent created",
        Some(&[("intent_id", intent_id.as_str())]),
    );

    Ok(Json(IntentResponse::from(created)))
}
