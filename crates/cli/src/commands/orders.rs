//! Order inspection commands.

use tracing::info;

use saumara_core::{Order, OrderNumber};
use saumara_storefront::db::OrderRepository;

use super::{CommandError, connect};

/// One-line summary used by `orders list`.
pub fn summary_line(order: &Order) -> String {
    format!(
        "{}  {}  {}  {} items  {}  {}",
        order.order_number,
        order.created_at.format("%Y-%m-%d %H:%M"),
        order.customer_email,
        order.item_count(),
        order.total,
        order.status,
    )
}

/// List every order, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn list() -> Result<(), CommandError> {
    let repo = OrderRepository::new(connect().await?);
    let orders = repo.list().await?;

    info!("{} orders", orders.len());
    for order in &orders {
        info!("{}", summary_line(order));
    }
    Ok(())
}

/// Show one order in full.
///
/// # Errors
///
/// Returns `NotFound` for a malformed or unknown number, or an error if the
/// database query fails.
pub async fn show(order_number: &str) -> Result<(), CommandError> {
    let number = OrderNumber::parse(order_number.trim())
        .map_err(|_| CommandError::NotFound(order_number.to_owned()))?;

    let repo = OrderRepository::new(connect().await?);
    let order = repo
        .get_by_order_number(&number)
        .await?
        .ok_or_else(|| CommandError::NotFound(number.to_string()))?;

    info!("Order {}", order.order_number);
    info!("  Placed:   {}", order.created_at.to_rfc3339());
    info!("  Status:   {}", order.status);
    info!("  Customer: {} <{}> {}", order.customer_name, order.customer_email, order.customer_phone);
    info!(
        "  Ship to:  {}, {}, {} {}",
        order.shipping_address.address,
        order.shipping_address.city,
        order.shipping_address.state,
        order.shipping_address.pincode,
    );
    for item in &order.items {
        info!(
            "  - {} x{} @ {} = {}",
            item.product.name,
            item.quantity,
            item.product.price,
            item.line_total()
        );
    }
    info!("  Subtotal: {}", order.subtotal);
    info!("  Shipping: {}", order.shipping);
    info!("  Total:    {}", order.total);
    info!("  Razorpay: order {} payment {}", order.razorpay_order_id, order.razorpay_payment_id);
    Ok(())
}
