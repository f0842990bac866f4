//! URL handling module for Shelf-Crawler
//!
//! Resolves the hrefs found in category and product markup against the page
//! they were found on, and builds the visit keys used for deduplication.

mod normalize;

use url::Url;

pub use normalize::visit_key;

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None if the href cannot lead to a fetchable page:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: and data: schemes
/// - hrefs that do not resolve against `base_url`
///
/// # Examples
///
/// ```
/// use shelf_crawler::url::resolve_href;
/// use url::Url;
///
/// let base = Url::parse("https://shop.example.com/shop/browse").unwrap();
/// assert_eq!(
///     resolve_href("/shop/browse/fruit-veg", &base),
///     Some("https://shop.example.com/shop/browse/fruit-veg".to_string())
/// );
/// ```
pub fn resolve_href(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}
