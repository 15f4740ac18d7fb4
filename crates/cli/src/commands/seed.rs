//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - id: "1"
//!     name: Rose & Oud Body Oil
//!     slug: rose-oud-body-oil
//!     price: 1850
//!     category: bath-body
//!     subcategory: Body Oils
//!     image_url: https://images.unsplash.com/photo-...
//!     is_bestseller: true
//!     stock: 40
//! ```
//!
//! Products are upserted by id. Listing order follows file order.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{error, info};

use saumara_core::{Category, Product, ProductId, Rupees, is_valid_slug};
use saumara_storefront::db::ProductRepository;

use super::{CommandError, connect};

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<SeedProduct>,
}

/// One product as written in the seed file.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    pub price: Rupees,
    pub category: Category,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub ingredients: String,
    #[serde(default)]
    pub sustainability_info: String,
    #[serde(default)]
    pub is_bestseller: bool,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub stock: i32,
}

impl SeedProduct {
    fn into_product(self, created_at: DateTime<Utc>) -> Product {
        Product {
            id: ProductId::new(self.id),
            name: self.name,
            slug: self.slug,
            description: self.description,
            short_description: self.short_description,
            price: self.price,
            category: self.category,
            subcategory: self.subcategory.filter(|s| !s.trim().is_empty()),
            image_url: self.image_url,
            images: self.images,
            ingredients: self.ingredients,
            sustainability_info: self.sustainability_info,
            is_bestseller: self.is_bestseller,
            is_new: self.is_new,
            stock: self.stock,
            created_at,
        }
    }
}

/// Problems in a seed file, one message per problem.
pub fn validate(file: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut ids = std::collections::HashSet::new();
    let mut slugs = std::collections::HashSet::new();

    for product in &file.products {
        if product.id.trim().is_empty() {
            errors.push(format!("{}: empty id", product.slug));
        }
        if !ids.insert(product.id.as_str()) {
            errors.push(format!("{}: duplicate id", product.id));
        }
        if !is_valid_slug(&product.slug) {
            errors.push(format!("{}: invalid slug {:?}", product.id, product.slug));
        }
        if !slugs.insert(product.slug.as_str()) {
            errors.push(format!("{}: duplicate slug {}", product.id, product.slug));
        }
        if product.name.trim().is_empty() {
            errors.push(format!("{}: empty name", product.id));
        }
        if product.stock < 0 {
            errors.push(format!("{}: negative stock", product.id));
        }
    }
    errors
}

/// Turn a validated file into products, one second apart in file order.
pub fn into_products(file: CatalogFile, base: DateTime<Utc>) -> Vec<Product> {
    file.products
        .into_iter()
        .enumerate()
        .map(|(index, product)| {
            let offset = Duration::seconds(i64::try_from(index).unwrap_or(i64::MAX));
            product.into_product(base + offset)
        })
        .collect()
}

/// Parse and validate a seed file without touching the database.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid YAML, or fails
/// validation.
pub async fn load(path: &Path) -> Result<Vec<Product>, CommandError> {
    info!(path = %path.display(), "Loading catalog from file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;

    let errors = validate(&file);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CommandError::Validation(errors.len()));
    }

    Ok(into_products(file, Utc::now()))
}

/// Seed products from a YAML file.
///
/// # Errors
///
/// Returns an error if the file is invalid or a database write fails.
pub async fn products(path: &Path) -> Result<(), CommandError> {
    let products = load(path).await?;
    info!(products = products.len(), "Catalog validated");

    let pool = connect().await?;
    let repo = ProductRepository::new(pool);

    for product in &products {
        repo.upsert(product).await?;
        info!(id = %product.id, slug = %product.slug, "Upserted product");
    }

    info!("Seeding complete! {} products written", products.len());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
products:
  - id: "1"
    name: Rose & Oud Body Oil
    slug: rose-oud-body-oil
    price: 1850
    category: bath-body
    subcategory: Body Oils
    is_bestseller: true
    stock: 40
  - id: "2"
    name: Vetiver Candle
    slug: vetiver-candle
    price: 1450
    category: home-fragrance
    subcategory: ""
"#;

    #[test]
    fn test_parses_and_keeps_file_order() {
        let file: CatalogFile = serde_yaml::from_str(CATALOG).unwrap();
        assert!(validate(&file).is_empty());

        let base = Utc::now();
        let products = into_products(file, base);
        let first = products.first().unwrap();
        let second = products.get(1).unwrap();

        assert_eq!(first.price, Rupees::new(1850));
        assert_eq!(first.category, Category::BathBody);
        assert!(first.created_at < second.created_at);
        assert_eq!(second.subcategory, None);
    }

    #[test]
    fn test_rejects_duplicates_and_bad_slugs() {
        let file: CatalogFile = serde_yaml::from_str(
            r#"
products:
  - { id: "1", name: A, slug: same, price: 10, category: skincare }
  - { id: "1", name: B, slug: same, price: 10, category: skincare }
  - { id: "3", name: C, slug: "Bad Slug", price: 10, category: skincare }
"#,
        )
        .unwrap();

        let errors = validate(&file);
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("duplicate id")));
        assert!(errors.iter().any(|e| e.contains("duplicate slug")));
        assert!(errors.iter().any(|e| e.contains("invalid slug")));
    }

    #[test]
    fn test_unknown_category_is_a_yaml_error() {
        let result: Result<CatalogFile, _> = serde_yaml::from_str(
            "products:\n  - { id: \"1\", name: A, slug: a, price: 10, category: candles }\n",
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(&path, CATALOG).unwrap();

        let products = load(&path).await.unwrap();
        assert_eq!(products.len(), 2);

        let missing = load(&dir.path().join("missing.yaml")).await;
        assert!(matches!(missing, Err(CommandError::Io { .. })));
    }
}
