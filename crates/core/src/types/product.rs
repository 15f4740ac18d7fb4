//! Catalog products and the cart-line snapshot taken from them.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Rupees;

/// Top-level catalog category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    BathBody,
    Skincare,
    HomeFragrance,
}

impl Category {
    /// All categories in navigation order.
    pub const ALL: [Self; 3] = [Self::BathBody, Self::Skincare, Self::HomeFragrance];

    /// URL-safe slug, as stored in the `category` column.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::BathBody => "bath-body",
            Self::Skincare => "skincare",
            Self::HomeFragrance => "home-fragrance",
        }
    }

    /// Display title for collection pages.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::BathBody => "Bath & Body",
            Self::Skincare => "Skincare",
            Self::HomeFragrance => "Home Fragrance",
        }
    }

    /// Collection page introduction.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::BathBody => {
                "Transform every shower and bath into a ceremony of self-care. From exfoliating scrubs to nourishing body oils, each product is crafted from the world's most prized botanicals."
            }
            Self::Skincare => {
                "Full ingredient transparency. Clinically proven actives. Natural-origin formulas that deliver visible results while honouring the earth."
            }
            Self::HomeFragrance => {
                "Your home is your most personal sanctuary. Our candles, diffusers and incense transform every room into a place of intention."
            }
        }
    }

    /// Collection hero image.
    #[must_use]
    pub const fn hero_image(self) -> &'static str {
        match self {
            Self::BathBody => {
                "https://images.unsplash.com/photo-1556228578-0d85751bab9b?w=1400&q=80"
            }
            Self::Skincare => {
                "https://images.unsplash.com/photo-1620916566398-39f1143ab7be?w=1400&q=80"
            }
            Self::HomeFragrance => {
                "https://images.unsplash.com/photo-1603006905003-be319992b18b?w=1400&q=80"
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bath-body" => Ok(Self::BathBody),
            "skincare" => Ok(Self::Skincare),
            "home-fragrance" => Ok(Self::HomeFragrance),
            _ => Err(format!("invalid category: {s}")),
        }
    }
}

/// Listing order for category pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    /// Oldest first, the catalog's natural order.
    #[default]
    Featured,
}

impl ProductSort {
    /// Parse the `sort` query value; anything unrecognised falls back to the
    /// default order.
    #[must_use]
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("price-asc") => Self::PriceAsc,
            Some("price-desc") => Self::PriceDesc,
            _ => Self::Featured,
        }
    }
}

/// Whether `slug` is a valid product slug (`[a-z0-9-]+`).
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub short_description: String,
    pub price: Rupees,
    pub category: Category,
    pub subcategory: Option<String>,
    pub image_url: String,
    pub images: Vec<String>,
    pub ingredients: String,
    pub sustainability_info: String,
    pub is_bestseller: bool,
    pub is_new: bool,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Take the snapshot stored in a cart line.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            slug: Some(self.slug.clone()),
            price: self.price,
            category: self.category,
            image_url: self.image_url.clone(),
        }
    }
}

/// The product fields frozen into a cart line at the moment of add.
///
/// Orders embed these snapshots, so later catalog edits never change what a
/// customer paid for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub price: Rupees,
    pub category: Category,
    #[serde(default)]
    pub image_url: String,
}

/// One cart line: a product snapshot and a quantity of at least one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: ProductSnapshot,
    pub quantity: u32,
}

impl CartItem {
    /// `unit price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Rupees {
        self.product.price.times(self.quantity)
    }
}
