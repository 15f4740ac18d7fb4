//! Custom Askama template filters.

use std::fmt::Display;

/// Returns the current year, for the footer copyright line.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Width of product card images.
pub const THUMBNAIL_WIDTH: u32 = 600;

/// Request a card-sized rendition of an Unsplash image by rewriting its `w`
/// parameter. Other URLs pass through untouched.
///
/// Usage in templates: `{{ product.image_url|thumbnail }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn thumbnail(url: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(resize(&url.to_string(), THUMBNAIL_WIDTH))
}

fn resize(url: &str, width: u32) -> String {
    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.to_string();
    };
    if parsed.host_str() != Some("images.unsplash.com") {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| key != "w")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    parsed
        .query_pairs_mut()
        .clear()
        .append_pair("w", &width.to_string())
        .extend_pairs(pairs);
    parsed.to_string()
}
