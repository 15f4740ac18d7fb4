//! `/api/orders`: place an order after payment, and read orders back.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use saumara_core::OrderNumber;

use crate::checkout::OrderSubmission;
use crate::checkout::wire::{OrderBody, OrderResponse, OrdersResponse, PlacedResponse};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::state::AppState;

use super::json_body;

/// Verify the payment signature and persist the order.
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    body: std::result::Result<Json<OrderBody>, JsonRejection>,
) -> Result<Json<PlacedResponse>> {
    let submission = OrderSubmission::from(json_body(body)?);
    let placed = state.checkout().place_order(submission).await?;
    let order = placed.order;

    tracing::info!(
        correlation_id = %order.order_number,
        total = %order.total,
        replayed = placed.replayed,
        "Order placed"
    );
    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_number", order.order_number.as_str())]),
    );

    Ok(Json(PlacedResponse {
        order_number: order.order_number.clone(),
        order,
    }))
}

/// `GET /api/orders` query.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersQuery {
    pub order_number: Option<String>,
}

/// One order by `?orderNumber=`, or every order newest first.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<OrdersQuery>,
) -> Result<Response> {
    let Some(raw) = query.order_number else {
        let orders = state.checkout().list_orders().await?;
        return Ok(Json(OrdersResponse { orders }).into_response());
    };

    let number = OrderNumber::parse(raw.trim()).map_err(|_| AppError::NotFound(raw.clone()))?;
    let order = state
        .checkout()
        .find_order(&number)
        .await?
        .ok_or_else(|| AppError::NotFound(number.to_string()))?;

    Ok(Json(OrderResponse { order }).into_response())
}
