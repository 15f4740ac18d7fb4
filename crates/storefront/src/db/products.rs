//! Product repository: catalog reads and seeding.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{debug, instrument};

use saumara_core::{Category, Product, ProductId, ProductSort, Rupees};

use super::RepositoryError;

/// Default and maximum page size for unfiltered listings.
pub const DEFAULT_LIMIT: i64 = 100;

const PRODUCT_COLUMNS: &str = r"
    id, name, slug, description, short_description, price, category,
    subcategory, image_url, images, ingredients, sustainability_info,
    is_bestseller, is_new, stock, created_at
";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    slug: String,
    description: String,
    short_description: String,
    price: i64,
    category: String,
    subcategory: Option<String>,
    image_url: String,
    images: Json<Value>,
    ingredients: String,
    sustainability_info: String,
    is_bestseller: bool,
    is_new: bool,
    stock: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let category: Category = row.category.parse().map_err(|e: String| {
            RepositoryError::DataCorruption(format!("product {}: {e}", row.id))
        })?;
        let price = Rupees::try_from(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("product {}: invalid price: {e}", row.id))
        })?;

        Ok(Self {
            images: normalize_images(row.images.0),
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            short_description: row.short_description,
            price,
            category,
            subcategory: row.subcategory.filter(|s| !s.is_empty()),
            image_url: row.image_url,
            ingredients: row.ingredients,
            sustainability_info: row.sustainability_info,
            is_bestseller: row.is_bestseller,
            is_new: row.is_new,
            stock: row.stock,
            created_at: row.created_at,
        })
    }
}

/// `images` may be stored as an array or as a JSON-encoded string of one.
fn normalize_images(value: Value) -> Vec<String> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or_else(|_| vec![raw]),
        _ => Vec::new(),
    }
}

/// Filters for `/api/products` listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<Category>,
    pub bestseller_only: bool,
    pub limit: Option<i64>,
}

impl ProductFilter {
    /// Effective row limit, clamped to `1..=DEFAULT_LIMIT`.
    #[must_use]
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, DEFAULT_LIMIT)
    }
}

/// Repository for the `products` table.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1");
        sqlx::query_as::<_, ProductRow>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    /// Every product whose id is in `ids`. Unknown ids are absent from the
    /// result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<&str> = ids.iter().map(ProductId::as_str).collect();
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)");
        sqlx::query_as::<_, ProductRow>(&query)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    /// Products in a category, optionally narrowed to one subcategory.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn by_category(
        &self,
        category: Category,
        subcategory: Option<&str>,
        sort: ProductSort,
    ) -> Result<Vec<Product>, RepositoryError> {
        let order_by = match sort {
            ProductSort::PriceAsc => "price ASC, created_at ASC",
            ProductSort::PriceDesc => "price DESC, created_at ASC",
            ProductSort::Featured => "created_at ASC",
        };
        let query = format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE category = $1
              AND ($2::text IS NULL OR subcategory = $2)
            ORDER BY {order_by}
            "
        );
        let products = sqlx::query_as::<_, ProductRow>(&query)
            .bind(category.slug())
            .bind(subcategory)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = products.len(), "Loaded category products");
        Ok(products)
    }

    /// Distinct, non-null subcategories of a category, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn subcategories_of(&self, category: Category) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query_scalar::<_, String>(
            r"
            SELECT DISTINCT subcategory
            FROM products
            WHERE category = $1 AND subcategory IS NOT NULL AND subcategory <> ''
            ORDER BY subcategory
            ",
        )
        .bind(category.slug())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Bestsellers, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn bestsellers(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        self.list(&ProductFilter {
            category: None,
            bestseller_only: true,
            limit: Some(limit),
        })
        .await
    }

    /// The `/api/products` listing: optional category, optional bestseller
    /// flag, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let query = format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE ($1::text IS NULL OR category = $1)
              AND (NOT $2 OR is_bestseller)
            ORDER BY created_at ASC
            LIMIT $3
            "
        );
        sqlx::query_as::<_, ProductRow>(&query)
            .bind(filter.category.map(Category::slug))
            .bind(filter.bestseller_only)
            .bind(filter.effective_limit())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    /// Insert or replace a product by id. Used by catalog seeding.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug belongs to another
    /// product. Returns `RepositoryError::Database` for other database errors.
    pub async fn upsert(&self, product: &Product) -> Result<(), RepositoryError> {
        let price = product
            .price
            .to_i64()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO products (
                id, name, slug, description, short_description, price, category,
                subcategory, image_url, images, ingredients, sustainability_info,
                is_bestseller, is_new, stock, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                slug = EXCLUDED.slug,
                description = EXCLUDED.description,
                short_description = EXCLUDED.short_description,
                price = EXCLUDED.price,
                category = EXCLUDED.category,
                subcategory = EXCLUDED.subcategory,
                image_url = EXCLUDED.image_url,
                images = EXCLUDED.images,
                ingredients = EXCLUDED.ingredients,
                sustainability_info = EXCLUDED.sustainability_info,
                is_bestseller = EXCLUDED.is_bestseller,
                is_new = EXCLUDED.is_new,
                stock = EXCLUDED.stock
            ",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(&product.short_description)
        .bind(price)
        .bind(product.category.slug())
        .bind(&product.subcategory)
        .bind(&product.image_url)
        .bind(Json(&product.images))
        .bind(&product.ingredients)
        .bind(&product.sustainability_info)
        .bind(product.is_bestseller)
        .bind(product.is_new)
        .bind(product.stock)
        .bind(product.created_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_images_normalize_to_string_array() {
        assert_eq!(
            normalize_images(json!(["/a.jpg", "/b.jpg"])),
            vec!["/a.jpg".to_string(), "/b.jpg".to_string()]
        );
        assert_eq!(
            normalize_images(json!("[\"/a.jpg\"]")),
            vec!["/a.jpg".to_string()]
        );
        assert_eq!(normalize_images(json!("/solo.jpg")), vec!["/solo.jpg".to_string()]);
        assert!(normalize_images(json!(null)).is_empty());
        assert_eq!(normalize_images(json!(["/a.jpg", 3])), vec!["/a.jpg".to_string()]);
    }

    #[test]
    fn test_limit_defaults_and_clamps() {
        assert_eq!(ProductFilter::default().effective_limit(), 100);
        let filter = ProductFilter {
            limit: Some(8),
            ..ProductFilter::default()
        };
        assert_eq!(filter.effective_limit(), 8);
        let filter = ProductFilter {
            limit: Some(0),
            ..ProductFilter::default()
        };
        assert_eq!(filter.effective_limit(), 1);
    }
}
