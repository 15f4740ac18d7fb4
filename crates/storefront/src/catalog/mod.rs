//! Catalog reads for the pages and `/api/products`.
//!
//! Listing and lookup queries go through a `moka` cache (TTL from
//! `CATALOG_CACHE_TTL_SECS`). Checkout repricing goes through
//! [`PriceCatalog`], which always reads fresh prices.

mod cache;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument};

use saumara_core::{Category, Product, ProductId, ProductSnapshot, ProductSort};

use crate::checkout::{CatalogUnavailable, PriceCatalog};
use crate::db::{ProductFilter, ProductRepository, RepositoryError};

pub use cache::{CacheKey, CacheValue};

/// Errors from catalog reads.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Cached catalog over the `products` table.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    products: ProductRepository,
    cache: Cache<CacheKey, CacheValue>,
}

impl Catalog {
    #[must_use]
    pub fn new(products: ProductRepository, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();

        Self {
            inner: Arc::new(CatalogInner { products, cache }),
        }
    }

    /// One product by slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[instrument(skip(self))]
    pub async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, CatalogError> {
        let key = CacheKey::Slug(slug.to_owned());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(product.map(|p| *p));
        }

        let product = self.inner.products.get_by_slug(slug).await?;
        self.inner
            .cache
            .insert(key, CacheValue::Product(product.clone().map(Box::new)))
            .await;
        Ok(product)
    }

    /// Products in a category, optionally narrowed to a subcategory.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[instrument(skip(self))]
    pub async fn by_category(
        &self,
        category: Category,
        subcategory: Option<&str>,
        sort: ProductSort,
    ) -> Result<Vec<Product>, CatalogError> {
        let key = CacheKey::Category {
            category,
            subcategory: subcategory.map(str::to_owned),
            sort,
        };
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for category");
            return Ok(products);
        }

        let products = self
            .inner
            .products
            .by_category(category, subcategory, sort)
            .await?;
        self.inner
            .cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Distinct subcategories of a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn subcategories_of(&self, category: Category) -> Result<Vec<String>, CatalogError> {
        let key = CacheKey::Subcategories(category);
        if let Some(CacheValue::Subcategories(names)) = self.inner.cache.get(&key).await {
            return Ok(names);
        }

        let names = self.inner.products.subcategories_of(category).await?;
        self.inner
            .cache
            .insert(key, CacheValue::Subcategories(names.clone()))
            .await;
        Ok(names)
    }

    /// Bestsellers for the home page.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn bestsellers(&self, limit: i64) -> Result<Vec<Product>, CatalogError> {
        self.list(&ProductFilter {
            category: None,
            bestseller_only: true,
            limit: Some(limit),
        })
        .await
    }

    /// The `/api/products` listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, CatalogError> {
        let key = CacheKey::from(filter);
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for listing");
            return Ok(products);
        }

        let products = self.inner.products.list(filter).await?;
        self.inner
            .cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }
}

impl PriceCatalog for Catalog {
    async fn snapshots(&self, ids: &[ProductId]) -> Result<Vec<ProductSnapshot>, CatalogUnavailable> {
        let products = self
            .inner
            .products
            .get_by_ids(ids)
            .await
            .map_err(|e| CatalogUnavailable(e.to_string()))?;
        Ok(products.iter().map(Product::snapshot).collect())
    }
}
