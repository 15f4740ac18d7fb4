//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use saumara_core::Category;

use crate::error::Result;
use crate::filters;
use crate::state::AppState;

pub use super::products::ProductView;

/// Number of bestsellers featured on the home page.
pub const FEATURED_BESTSELLERS: i64 = 8;

/// A category tile on the home page.
#[derive(Clone)]
pub struct CategoryTile {
    pub slug: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub image: &'static str,
}

impl From<Category> for CategoryTile {
    fn from(category: Category) -> Self {
        Self {
            slug: category.slug(),
            title: category.title(),
            description: category.description(),
            image: category.hero_image(),
        }
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub categories: Vec<CategoryTile>,
    pub bestsellers: Vec<ProductView>,
}

/// Display the home page.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let bestsellers = state
        .catalog()
        .bestsellers(FEATURED_BESTSELLERS)
        .await?
        .iter()
        .map(ProductView::from)
        .collect();

    Ok(HomeTemplate {
        categories: Category::ALL.into_iter().map(CategoryTile::from).collect(),
        bestsellers,
    })
}
