//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::catalog::Catalog;
use crate::checkout::{CheckoutService, FailureSink, JsonlFailureLog};
use crate::config::StorefrontConfig;
use crate::db::{OrderRepository, ProductRepository};
use crate::gateway::GatewayError;
use crate::gateway::razorpay::RazorpayClient;

/// Checkout as wired in the server.
pub type StorefrontCheckout = CheckoutService<RazorpayClient, OrderRepository, Catalog>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: Catalog,
    checkout: StorefrontCheckout,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the Razorpay client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, GatewayError> {
        let failures: Arc<dyn FailureSink> = Arc::new(JsonlFailureLog::new(config.failure_log.clone()));
        Self::with_failure_sink(config, pool, failures)
    }

    /// Like [`AppState::new`] with a caller-supplied failure sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the Razorpay client cannot be built.
    pub fn with_failure_sink(
        config: StorefrontConfig,
        pool: PgPool,
        failures: Arc<dyn FailureSink>,
    ) -> Result<Self, GatewayError> {
        let gateway = RazorpayClient::new(&config.razorpay)?;
        let catalog = Catalog::new(ProductRepository::new(pool.clone()), config.catalog_cache_ttl);
        let checkout = CheckoutService::new(
            gateway,
            OrderRepository::new(pool.clone()),
            catalog.clone(),
            failures,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                checkout,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn checkout(&self) -> &StorefrontCheckout {
        &self.inner.checkout
    }
}
