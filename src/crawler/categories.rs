//! Category and sub-category parsers

use crate::crawler::schema::CategoryLocators;
use crate::crawler::task::CategoryRef;
use crate::url::resolve_href;
use scraper::Html;
use url::Url;

/// A category node that cannot become a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompleteCategory {
    /// Title, when the node had one
    pub title: Option<String>,

    /// Which part of the node was missing
    pub missing: &'static str,
}

/// Reads every category node matched by `locators`, in document order
///
/// Relative links are resolved against `page_url`. A node without a title or
/// without a resolvable link comes back as `Err` so the caller can log it and
/// carry on with the rest.
pub fn parse_categories(
    document: &Html,
    locators: &CategoryLocators,
    page_url: &Url,
) -> Vec<Result<CategoryRef, IncompleteCategory>> {
    document
        .select(&locators.node)
        .map(|node| {
            let title = locators.title.first(node);
            let url = locators
                .link
                .first(node)
                .and_then(|href| resolve_href(&href, page_url));

            match (title, url) {
                (Some(title), Some(url)) => Ok(CategoryRef { title, url }),
                (None, _) => Err(IncompleteCategory {
                    title: None,
                    missing: "title",
                }),
                (title, None) => Err(IncompleteCategory {
                    title,
                    missing: "url",
                }),
            }
        })
        .collect()
}
