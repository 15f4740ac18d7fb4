//! Brand story page.
//!
//! Static copy; no catalog or database access, so it renders even when the
//! store is down.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::filters;

/// Hero image behind the opening section.
pub const HERO_IMAGE: &str = "https://images.unsplash.com/photo-1556228578-0d85751bab9b?w=1600&q=80";

/// Image beside the origin story.
pub const ORIGIN_IMAGE: &str = "https://images.unsplash.com/photo-1571781926291-c477ebfd024b?w=800&q=80";

/// One of the brand values.
pub struct BrandValue {
    pub title: &'static str,
    pub description: &'static str,
}

/// A dated sustainability commitment.
pub struct Milestone {
    pub year: u16,
    pub title: &'static str,
    pub description: &'static str,
}

/// A key ingredient and where it is sourced.
pub struct Ingredient {
    pub name: &'static str,
    pub source: &'static str,
    pub benefit: &'static str,
}

pub static VALUES: [BrandValue; 5] = [
    BrandValue {
        title: "Natural First",
        description: "Every formula begins with nature. We start with the most effective natural \
                      ingredients and add science only where nature needs help.",
    },
    BrandValue {
        title: "Planet Conscious",
        description: "100% recyclable packaging and carbon-neutral shipping, on the way to fully \
                      carbon-neutral operations by 2026.",
    },
    BrandValue {
        title: "Radically Transparent",
        description: "Every ingredient is named in plain English, with where it comes from and \
                      why it is there.",
    },
    BrandValue {
        title: "Cruelty Free",
        description: "Never tested on animals. Every product is vegan or ethically animal-derived \
                      (like beeswax) with certified humane sourcing.",
    },
    BrandValue {
        title: "Fair Trade Sourced",
        description: "From Kashmir saffron to Moroccan argan oil, we pay above fair-trade \
                      premiums and know every farmer by name.",
    },
];

pub static MILESTONES: [Milestone; 3] = [
    Milestone {
        year: 2024,
        title: "100% Recyclable Packaging",
        description: "Every piece of packaging we use is recyclable, refillable or compostable.",
    },
    Milestone {
        year: 2025,
        title: "Carbon Neutral Shipping",
        description: "All deliveries offset through verified Indian reforestation and renewable \
                      energy projects.",
    },
    Milestone {
        year: 2026,
        title: "Carbon Neutral Operations",
        description: "Full operational carbon neutrality across manufacturing, offices and the \
                      supply chain.",
    },
];

pub static INGREDIENTS: [Ingredient; 8] = [
    Ingredient {
        name: "Kashmiri Saffron",
        source: "Kashmir, India",
        benefit: "Brightening, anti-inflammatory, ultra-luxurious",
    },
    Ingredient {
        name: "Argan Oil",
        source: "Essaouira, Morocco",
        benefit: "Deep nourishment, anti-aging, exceptional softening",
    },
    Ingredient {
        name: "Oud Wood",
        source: "Assam, India & Arabian Peninsula",
        benefit: "Fragrance, antimicrobial, deeply warming",
    },
    Ingredient {
        name: "Mysore Sandalwood",
        source: "Karnataka, India",
        benefit: "Calming, brightening, rich fixative scent",
    },
    Ingredient {
        name: "Bakuchiol",
        source: "Rajasthan, India",
        benefit: "Natural retinol alternative, firming, anti-aging",
    },
    Ingredient {
        name: "Vetiver Root",
        source: "Rajasthan, India",
        benefit: "Grounding, healing, deeply moisturising",
    },
    Ingredient {
        name: "Coconut Oil",
        source: "Kerala, India",
        benefit: "Moisturising, antibacterial, skin barrier support",
    },
    Ingredient {
        name: "Bulgarian Rose",
        source: "Kazanlak Valley, Bulgaria",
        benefit: "Brightening, hydrating, anti-aging",
    },
];

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub hero_image: &'static str,
    pub origin_image: &'static str,
    pub values: &'static [BrandValue],
    pub milestones: &'static [Milestone],
    pub ingredients: &'static [Ingredient],
}

/// Display the brand story.
#[instrument]
pub async fn about() -> impl IntoResponse {
    AboutTemplate {
        hero_image: HERO_IMAGE,
        origin_image: ORIGIN_IMAGE,
        values: &VALUES,
        milestones: &MILESTONES,
        ingredients: &INGREDIENTS,
    }
}
