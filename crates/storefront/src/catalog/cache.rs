//! Cache types for catalog reads.

use saumara_core::{Category, Product, ProductSort};

use crate::db::ProductFilter;

/// One cached catalog query.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Slug(String),
    Category {
        category: Category,
        subcategory: Option<String>,
        sort: ProductSort,
    },
    Subcategories(Category),
    Listing {
        category: Option<Category>,
        bestseller_only: bool,
        limit: i64,
    },
}

impl From<&ProductFilter> for CacheKey {
    fn from(filter: &ProductFilter) -> Self {
        Self::Listing {
            category: filter.category,
            bestseller_only: filter.bestseller_only,
            limit: filter.effective_limit(),
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    /// `None` caches a miss so unknown slugs do not hit the database.
    Product(Option<Box<Product>>),
    Products(Vec<Product>),
    Subcategories(Vec<String>),
}
