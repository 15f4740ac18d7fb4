//! Order repository.
//!
//! Orders are inserted once and never updated. Queries are checked at
//! runtime (`query_as` + `FromRow`) so the crate builds without a live
//! database or an offline query cache.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use saumara_core::{
    CartItem, DeliveryAddress, Email, IntentId, NewOrder, Order, OrderId, OrderNumber,
    OrderStatus, PaymentId, Rupees,
};

use super::RepositoryError;
use crate::checkout::{OrderStore, StoreError};

/// Unique constraint on `orders.order_number`.
pub const ORDER_NUMBER_CONSTRAINT: &str = "orders_order_number_key";

/// Unique constraint on `orders.razorpay_order_id`.
pub const INTENT_CONSTRAINT: &str = "orders_razorpay_order_id_key";

const ORDER_COLUMNS: &str = r"
    id, order_number, customer_name, customer_email, customer_phone,
    shipping_address, items, subtotal, shipping, total, status,
    razorpay_order_id, razorpay_payment_id, created_at
";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    order_number: String,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    shipping_address: Json<Value>,
    items: Json<Value>,
    subtotal: i64,
    shipping: i64,
    total: i64,
    status: String,
    razorpay_order_id: IntentId,
    razorpay_payment_id: PaymentId,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("order {id}: invalid {what}: {e}"))
        };

        let order_number =
            OrderNumber::parse(&row.order_number).map_err(|e| corrupt("order number", &e))?;
        let customer_email =
            Email::parse(&row.customer_email).map_err(|e| corrupt("email", &e))?;
        let shipping_address: DeliveryAddress = serde_json::from_value(row.shipping_address.0)
            .map_err(|e| corrupt("shipping address", &e))?;
        let items: Vec<CartItem> =
            serde_json::from_value(row.items.0).map_err(|e| corrupt("items", &e))?;
        let status: OrderStatus = row.status.parse().map_err(|e: String| corrupt("status", &e))?;
        let subtotal = Rupees::try_from(row.subtotal).map_err(|e| corrupt("subtotal", &e))?;
        let shipping = Rupees::try_from(row.shipping).map_err(|e| corrupt("shipping", &e))?;
        let total = Rupees::try_from(row.total).map_err(|e| corrupt("total", &e))?;

        Ok(Self {
            id: OrderId::new(id),
            order_number,
            customer_name: row.customer_name,
            customer_email,
            customer_phone: row.customer_phone,
            shipping_address,
            items,
            subtotal,
            shipping,
            total,
            status,
            razorpay_order_id: row.razorpay_order_id,
            razorpay_payment_id: row.razorpay_payment_id,
            created_at: row.created_at,
        })
    }
}

/// Repository for the `orders` table.
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` carrying the violated constraint
    /// name if the order number or payment intent already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, order), fields(order_number = %order.order_number()))]
    pub async fn insert(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let customer = order.customer();
        let breakdown = order.breakdown();
        let amount = |r: Rupees| {
            r.to_i64()
                .map_err(|e| RepositoryError::DataCorruption(format!("amount out of range: {e}")))
        };
        let shipping_address = serde_json::to_value(&customer.delivery)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let items = serde_json::to_value(order.items())
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        let query = format!(
            r"
            INSERT INTO orders (
                order_number, customer_name, customer_email, customer_phone,
                shipping_address, items, subtotal, shipping, total, status,
                razorpay_order_id, razorpay_payment_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {ORDER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, OrderRow>(&query)
            .bind(order.order_number())
            .bind(&customer.name)
            .bind(&customer.email)
            .bind(&customer.phone)
            .bind(Json(shipping_address))
            .bind(Json(items))
            .bind(amount(breakdown.subtotal)?)
            .bind(amount(breakdown.shipping)?)
            .bind(amount(breakdown.total)?)
            .bind(OrderStatus::Confirmed.as_str())
            .bind(order.intent_id())
            .bind(order.payment_id())
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from_write)?;

        row.try_into()
    }

    /// Get an order by its public number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_order_number(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Option<Order>, RepositoryError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1");
        sqlx::query_as::<_, OrderRow>(&query)
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    /// Get the order placed for a gateway intent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_intent(&self, intent_id: &IntentId) -> Result<Option<Order>, RepositoryError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE razorpay_order_id = $1");
        sqlx::query_as::<_, OrderRow>(&query)
            .bind(intent_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if any stored row is invalid.
    pub async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, OrderRow>(&query)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }
}

impl From<RepositoryError> for StoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(constraint) if constraint == ORDER_NUMBER_CONSTRAINT => {
                Self::DuplicateOrderNumber
            }
            RepositoryError::Conflict(constraint) if constraint == INTENT_CONSTRAINT => {
                Self::DuplicateIntent
            }
            RepositoryError::DataCorruption(message) => Self::Corrupt(message),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

impl OrderStore for OrderRepository {
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, StoreError> {
        Ok(self.insert(order).await?)
    }

    async fn find_by_order_number(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self.get_by_order_number(order_number).await?)
    }

    async fn find_by_intent(&self, intent_id: &IntentId) -> Result<Option<Order>, StoreError> {
        Ok(self.get_by_intent(intent_id).await?)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.list().await?)
    }
}
