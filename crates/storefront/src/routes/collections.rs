//! Collection route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use saumara_core::{Category, ProductSort};

use crate::error::Result;
use crate::filters;
use crate::state::AppState;

use super::not_found;
pub use super::products::ProductView;

/// Collection query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CollectionQuery {
    pub sort: Option<String>,
    /// Subcategory name, e.g. `Body Oils`.
    pub sub: Option<String>,
}

impl CollectionQuery {
    fn subcategory(&self) -> Option<&str> {
        self.sub.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// A sort option in the collection toolbar.
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn sort_options(current: ProductSort) -> Vec<SortOption> {
    [
        ("featured", "Featured", ProductSort::Featured),
        ("price-asc", "Price: Low to High", ProductSort::PriceAsc),
        ("price-desc", "Price: High to Low", ProductSort::PriceDesc),
    ]
    .into_iter()
    .map(|(value, label, sort)| SortOption {
        value,
        label,
        selected: sort == current,
    })
    .collect()
}

/// A subcategory filter link.
pub struct SubcategoryLink {
    pub name: String,
    pub href: String,
    pub selected: bool,
}

fn subcategory_links(
    category: Category,
    names: Vec<String>,
    active: Option<&str>,
    sort: ProductSort,
) -> Vec<SubcategoryLink> {
    let sort_param = match sort {
        ProductSort::Featured => String::new(),
        ProductSort::PriceAsc => "&sort=price-asc".to_string(),
        ProductSort::PriceDesc => "&sort=price-desc".to_string(),
    };
    names
        .into_iter()
        .map(|name| {
            let encoded: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
            SubcategoryLink {
                href: format!("/collections/{}?sub={encoded}{sort_param}", category.slug()),
                selected: active == Some(name.as_str()),
                name,
            }
        })
        .collect()
}

/// Collection page template.
#[derive(Template, WebTemplate)]
#[template(path = "collections/show.html")]
pub struct CollectionShowTemplate {
    pub slug: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub hero_image: &'static str,
    pub products: Vec<ProductView>,
    pub subcategories: Vec<SubcategoryLink>,
    pub active_subcategory: Option<String>,
    pub sort_options: Vec<SortOption>,
}

/// Display a category page, optionally filtered to one subcategory.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<CollectionQuery>,
) -> Result<Response> {
    let Ok(category) = slug.parse::<Category>() else {
        return Ok(not_found("This collection could not be found."));
    };

    let sort = ProductSort::from_query(query.sort.as_deref());
    let subcategory = query.subcategory();

    let products = state
        .catalog()
        .by_category(category, subcategory, sort)
        .await?
        .iter()
        .map(ProductView::from)
        .collect();
    let subcategories = subcategory_links(
        category,
        state.catalog().subcategories_of(category).await?,
        subcategory,
        sort,
    );

    Ok(CollectionShowTemplate {
        slug: category.slug(),
        title: category.title(),
        description: category.description(),
        hero_image: category.hero_image(),
        products,
        subcategories,
        active_subcategory: subcategory.map(str::to_owned),
        sort_options: sort_options(sort),
    }
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_sort_selected() {
        let options = sort_options(ProductSort::PriceDesc);
        let selected: Vec<_> = options.iter().filter(|o| o.selected).map(|o| o.value).collect();
        assert_eq!(selected, vec!["price-desc"]);
    }

    #[test]
    fn test_subcategory_links_are_encoded() {
        let links = subcategory_links(
            Category::BathBody,
            vec!["Body Oils".to_string(), "Scrubs & Salts".to_string()],
            Some("Body Oils"),
            ProductSort::PriceAsc,
        );
        let hrefs: Vec<_> = links.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(
            hrefs,
            vec![
                "/collections/bath-body?sub=Body+Oils&sort=price-asc",
                "/collections/bath-body?sub=Scrubs+%26+Salts&sort=price-asc",
            ]
        );
        assert!(links.iter().map(|l| l.selected).eq([true, false]));
    }

    #[test]
    fn test_blank_subcategory_means_all() {
        let query = CollectionQuery {
            sort: None,
            sub: Some("  ".to_string()),
        };
        assert_eq!(query.subcategory(), None);

        let query = CollectionQuery {
            sort: None,
            sub: Some("Body Oils".to_string()),
        };
        assert_eq!(query.subcategory(), Some("Body Oils"));
    }
}
