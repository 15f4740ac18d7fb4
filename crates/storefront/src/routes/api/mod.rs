//! JSON API consumed by `checkout.js` and the native checkout client.

pub mod orders;
pub mod products;
pub mod razorpay;

use axum::{Json, extract::rejection::JsonRejection};

use crate::error::AppError;

/// Unwrap a JSON body, turning a malformed body into a 400 with the
/// standard error shape.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}
