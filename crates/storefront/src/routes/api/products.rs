//! `GET /api/products`: one product by slug, or a filtered listing.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use saumara_core::{Category, Product};

use crate::db::ProductFilter;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// `GET /api/products` query.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub slug: Option<String>,
    pub category: Option<String>,
    pub bestseller: Option<String>,
    pub limit: Option<i64>,
}

impl ProductsQuery {
    /// Listing filter. Only the literal `bestseller=true` narrows the list.
    fn filter(&self) -> Result<ProductFilter> {
        let category = self
            .category
            .as_deref()
            .map(str::parse::<Category>)
            .transpose()
            .map_err(AppError::BadRequest)?;

        Ok(ProductFilter {
            category,
            bestseller_only: self.bestseller.as_deref() == Some("true"),
            limit: self.limit,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductResponse {
    pub product: Option<Product>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
}

/// Serve a single product (`?slug=`) or a listing.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Result<Response> {
    if let Some(slug) = query.slug.as_deref() {
        let product = state.catalog().product_by_slug(slug).await?;
        let status = if product.is_some() {
            StatusCode::OK
        } else {
            StatusCode::NOT_FOUND
        };
        return Ok((status, Json(ProductResponse { product })).into_response());
    }

    let products = state.catalog().list(&query.filter()?).await?;
    Ok(Json(ProductsResponse { products }).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_only_literal_true_selects_bestsellers() {
        let query = ProductsQuery {
            bestseller: Some("true".to_string()),
            ..ProductsQuery::default()
        };
        assert!(query.filter().unwrap().bestseller_only);

        let query = ProductsQuery {
            bestseller: Some("1".to_string()),
            ..ProductsQuery::default()
        };
        assert!(!query.filter().unwrap().bestseller_only);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let query = ProductsQuery {
            category: Some("candles".to_string()),
            ..ProductsQuery::default()
        };
        assert!(matches!(query.filter(), Err(AppError::BadRequest(_))));

        let query = ProductsQuery {
            category: Some("skincare".to_string()),
            limit: Some(4),
            ..ProductsQuery::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.category, Some(Category::Skincare));
        assert_eq!(filter.effective_limit(), 4);
    }
}
