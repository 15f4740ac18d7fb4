//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use saumara_core::{Product, is_valid_slug};

use crate::error::Result;
use crate::filters;
use crate::state::AppState;

use super::not_found;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub slug: String,
    pub name: String,
    pub short_description: String,
    pub description: String,
    /// Formatted for display, e.g. `₹1,250`.
    pub price: String,
    pub category_slug: &'static str,
    pub category_title: &'static str,
    pub subcategory: Option<String>,
    pub image_url: String,
    pub images: Vec<String>,
    pub ingredients: String,
    pub sustainability_info: String,
    pub is_bestseller: bool,
    pub is_new: bool,
    pub in_stock: bool,
    /// Cart snapshot as JSON, read by `checkout.js` when adding to the cart.
    pub snapshot_json: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        let images = if product.images.is_empty() {
            vec![product.image_url.clone()]
        } else {
            product.images.clone()
        };

        Self {
            slug: product.slug.clone(),
            name: product.name.clone(),
            short_description: product.short_description.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            category_slug: product.category.slug(),
            category_title: product.category.title(),
            subcategory: product.subcategory.clone(),
            image_url: product.image_url.clone(),
            images,
            ingredients: product.ingredients.clone(),
            sustainability_info: product.sustainability_info.clone(),
            is_bestseller: product.is_bestseller,
            is_new: product.is_new,
            in_stock: product.stock > 0,
            snapshot_json: serde_json::to_string(&product.snapshot()).unwrap_or_default(),
        }
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub product: ProductView,
}

/// Display product detail page.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Response> {
    if !is_valid_slug(&slug) {
        return Ok(not_found("This product could not be found."));
    }

    let Some(product) = state.catalog().product_by_slug(&slug).await? else {
        return Ok(not_found("This product could not be found."));
    };

    Ok(ProductShowTemplate {
        product: ProductView::from(&product),
    }
    .into_response())
}
