//! Pager widget interpretation
//!
//! The pager on a sub-category page renders one control per page. The
//! control for the page currently shown carries no link; every other
//! control links to its page through a query string ending in `=<n>`.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use thiserror::Error;

/// What one page control says about the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDescriptor {
    /// True for the control of the page already rendered
    pub is_active_page: bool,
    pub page_number: u32,
    /// Absolute URL of a selectable page; None for the active page
    pub next_page_url: Option<String>,
}

impl PageDescriptor {
    fn active() -> Self {
        Self {
            is_active_page: true,
            page_number: 1,
            next_page_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("No page number in {url}")]
    MissingPageNumber { url: String },

    #[error("Page number out of range in {url}")]
    PageNumberOverflow { url: String },
}

fn page_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r".*=([0-9]+)").expect("page number pattern is valid"))
}

/// Reads the number of the page a pager URL points at
///
/// The digits after the last `=` that is followed by digits win, so
/// `/list?page=3` gives 3.
pub fn parse_page_number(url: &str) -> Result<u32, PaginationError> {
    let digits = page_number_pattern()
        .captures(url)
        .and_then(|captures| captures.get(1))
        .ok_or_else(|| PaginationError::MissingPageNumber {
            url: url.to_string(),
        })?;

    digits
        .as_str()
        .parse()
        .map_err(|_| PaginationError::PageNumberOverflow {
            url: url.to_string(),
        })
}

/// Scans every page control of a rendered listing, in document order
///
/// Selectable pages resolve to `page_base_url` followed by the control's
/// href. Each control yields exactly one entry; controls whose page number
/// cannot be read come back as `Err` for the caller to skip.
pub fn scan_pagination(
    document: &Html,
    page_control: &Selector,
    page_base_url: &str,
) -> Vec<Result<PageDescriptor, PaginationError>> {
    document
        .select(page_control)
        .map(|control| {
            let href = control
                .value()
                .attr("href")
                .map(str::trim)
                .filter(|href| !href.is_empty());

            match href {
                None => Ok(PageDescriptor::active()),
                Some(href) => {
                    let next_page_url = format!("{}{}", page_base_url, href);
                    let page_number = parse_page_number(&next_page_url)?;
                    Ok(PageDescriptor {
                        is_active_page: false,
                        page_number,
                        next_page_url: Some(next_page_url),
                    })
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteSchema;
    use crate::crawler::schema::CompiledSchema;

    const BASE: &str = "https://example/list";

    fn selector() -> Selector {
        CompiledSchema::compile(&SiteSchema::default())
            .unwrap()
            .page_control
    }

    /// Pager with `n` controls: the first is active, control i links to `?page=i`
    fn pager(n: usize) -> Html {
        let controls: Vec<String> = (0..n)
            .map(|i| {
                if i == 0 {
                    r#"<a class="paging-pageNumber page">1</a>"#.to_string()
                } else {
                    format!(
                        r#"<a class="paging-pageNumber page" href="?page={}">{}</a>"#,
                        i,
                        i + 1
                    )
                }
            })
            .collect();
        Html::parse_document(&format!(
            r#"<html><body><div class="paging _pagingControl">{}</div></body></html>"#,
            controls.join("")
        ))
    }

    #[test]
    fn test_parse_page_number() {
        assert_eq!(parse_page_number("https://example/list?page=2"), Ok(2));
        assert_eq!(parse_page_number("https://example/list?page=17"), Ok(17));
        assert_eq!(
            parse_page_number("https://example/list?sort=price&page=4"),
            Ok(4)
        );
    }

    #[test]
    fn test_parse_page_number_missing() {
        assert_eq!(
            parse_page_number("https://example/list?page=next"),
            Err(PaginationError::MissingPageNumber {
                url: "https://example/list?page=next".to_string()
            })
        );
        assert!(parse_page_number("https://example/list").is_err());
    }

    #[test]
    fn test_parse_page_number_overflow() {
        assert!(matches!(
            parse_page_number("https://example/list?page=99999999999"),
            Err(PaginationError::PageNumberOverflow { .. })
        ));
    }

    #[test]
    fn test_pager_of_any_size() {
        for n in 1..=8 {
            let descriptors: Vec<PageDescriptor> = scan_pagination(&pager(n), &selector(), BASE)
                .into_iter()
                .collect::<Result<_, _>>()
                .unwrap();

            assert_eq!(descriptors.len(), n);

            let active: Vec<_> = descriptors.iter().filter(|d| d.is_active_page).collect();
            assert_eq!(active.len(), 1);
            assert_eq!(active[0].page_number, 1);
            assert_eq!(active[0].next_page_url, None);

            let selectable: Vec<_> = descriptors.iter().filter(|d| !d.is_active_page).collect();
            assert_eq!(selectable.len(), n - 1);
            for (i, descriptor) in selectable.iter().enumerate() {
                let expected = (i + 1) as u32;
                assert_eq!(descriptor.page_number, expected);
                assert_eq!(
                    descriptor.next_page_url.as_deref(),
                    Some(format!("{}?page={}", BASE, expected).as_str())
                );
            }
        }
    }

    #[test]
    fn test_unparseable_control_is_reported_and_others_kept() {
        let html = Html::parse_document(
            r#"<html><body><div class="paging _pagingControl">
                <a class="page">1</a>
                <a class="page" href="?page=2">2</a>
                <a class="page next" href="?page=next">Next</a>
                <a class="page" href="?page=3">3</a>
            </div></body></html>"#,
        );

        let scanned = scan_pagination(&html, &selector(), BASE);
        assert_eq!(scanned.len(), 4);
        assert!(scanned[2].is_err());

        let numbers: Vec<u32> = scanned
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|d| d.page_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_blank_href_is_the_active_page() {
        let html = Html::parse_document(
            r#"<html><body><div class="paging _pagingControl"><a class="page" href="  ">1</a></div></body></html>"#,
        );
        assert_eq!(
            scan_pagination(&html, &selector(), BASE),
            vec![Ok(PageDescriptor::active())]
        );
    }

    #[test]
    fn test_no_pager() {
        let html = Html::parse_document("<html><body><wow-card card=\"card\"></wow-card></body></html>");
        assert!(scan_pagination(&html, &selector(), BASE).is_empty());
    }

    #[test]
    fn test_scan_is_repeatable() {
        let html = pager(4);
        assert_eq!(
            scan_pagination(&html, &selector(), BASE),
            scan_pagination(&html, &selector(), BASE)
        );
    }
}
