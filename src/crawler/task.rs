//! Crawl tasks and the ancestry they carry
//!
//! A `CrawlContext` only ever grows: each stage derives a new context from
//! the one it received, so sibling branches never observe each other's state.

use std::fmt;

/// A navigable node in the category hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryRef {
    pub title: String,
    pub url: String,
}

impl CategoryRef {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Depth at which a task operates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// A top-level category page listing sub-categories
    TopCategory,

    /// A sub-category page: first listing page plus the pager widget
    SubCategory,

    /// A further page of a sub-category's listing
    ListingPage,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TopCategory => "top-category",
            Self::SubCategory => "sub-category",
            Self::ListingPage => "listing-page",
        };
        f.write_str(name)
    }
}

/// Ancestry accumulated while descending the hierarchy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlContext {
    category: Option<CategoryRef>,
    sub_category: Option<CategoryRef>,
    page_index: Option<u32>,
    page_base_url: Option<String>,
}

impl CrawlContext {
    /// Context of the start page: nothing known yet
    pub fn root() -> Self {
        Self::default()
    }

    pub fn with_category(&self, category: CategoryRef) -> Self {
        Self {
            category: Some(category),
            ..self.clone()
        }
    }

    pub fn with_sub_category(&self, sub_category: CategoryRef) -> Self {
        Self {
            sub_category: Some(sub_category),
            ..self.clone()
        }
    }

    pub fn with_page(&self, page_index: u32, page_base_url: impl Into<String>) -> Self {
        Self {
            page_index: Some(page_index),
            page_base_url: Some(page_base_url.into()),
            ..self.clone()
        }
    }

    pub fn category(&self) -> Option<&CategoryRef> {
        self.category.as_ref()
    }

    pub fn sub_category(&self) -> Option<&CategoryRef> {
        self.sub_category.as_ref()
    }

    pub fn page_index(&self) -> Option<u32> {
        self.page_index
    }

    pub fn page_base_url(&self) -> Option<&str> {
        self.page_base_url.as_deref()
    }

    /// The category pair records are attributed to, once both are known
    pub fn lineage(&self) -> Option<Lineage> {
        match (&self.category, &self.sub_category) {
            (Some(category), Some(sub_category)) => Some(Lineage {
                category: category.title.trim().to_string(),
                sub_category: sub_category.title.trim().to_string(),
            }),
            _ => None,
        }
    }
}

/// `Category > Sub-category` as used in log lines
impl fmt::Display for CrawlContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let titles: Vec<&str> = [&self.category, &self.sub_category]
            .into_iter()
            .flatten()
            .map(|c| c.title.trim())
            .collect();

        if titles.is_empty() {
            f.write_str("<root>")?;
        } else {
            f.write_str(&titles.join(" > "))?;
        }

        if let Some(page) = self.page_index {
            write!(f, " (page {})", page)?;
        }
        Ok(())
    }
}

/// Category titles attached verbatim (trimmed) to every record of a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineage {
    pub category: String,
    pub sub_category: String,
}

/// One pending fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: String,
    pub stage: Stage,
    pub context: CrawlContext,
}

impl CrawlTask {
    /// Task for a category found on the start page
    pub fn top_category(category: CategoryRef) -> Self {
        Self {
            url: category.url.clone(),
            stage: Stage::TopCategory,
            context: CrawlContext::root().with_category(category),
        }
    }

    /// Task for a sub-category found on a top category page
    pub fn sub_category(parent: &CrawlContext, sub_category: CategoryRef) -> Self {
        Self {
            url: sub_category.url.clone(),
            stage: Stage::SubCategory,
            context: parent.with_sub_category(sub_category),
        }
    }

    /// Task for a selectable page discovered in a sub-category's pager
    pub fn listing_page(
        parent: &CrawlContext,
        url: impl Into<String>,
        page_index: u32,
        page_base_url: &str,
    ) -> Self {
        Self {
            url: url.into(),
            stage: Stage::ListingPage,
            context: parent.with_page(page_index, page_base_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fruit() -> CategoryRef {
        CategoryRef::new("Fruit & Veg", "https://shop.example.com/browse/fruit-veg")
    }

    fn apples() -> CategoryRef {
        CategoryRef::new(" Apples \n", "https://shop.example.com/browse/fruit-veg/apples")
    }

    #[test]
    fn test_context_grows_through_stages() {
        let top = CrawlTask::top_category(fruit());
        assert_eq!(top.stage, Stage::TopCategory);
        assert_eq!(top.url, fruit().url);
        assert_eq!(top.context.category(), Some(&fruit()));
        assert!(top.context.sub_category().is_none());

        let sub = CrawlTask::sub_category(&top.context, apples());
        assert_eq!(sub.stage, Stage::SubCategory);
        assert_eq!(sub.context.category(), Some(&fruit()));
        assert_eq!(sub.context.sub_category(), Some(&apples()));

        let page = CrawlTask::listing_page(&sub.context, format!("{}?page=2", sub.url), 2, &sub.url);
        assert_eq!(page.stage, Stage::ListingPage);
        assert_eq!(page.context.category(), Some(&fruit()));
        assert_eq!(page.context.sub_category(), Some(&apples()));
        assert_eq!(page.context.page_index(), Some(2));
        assert_eq!(page.context.page_base_url(), Some(sub.url.as_str()));
    }

    #[test]
    fn test_deriving_leaves_parent_untouched() {
        let parent = CrawlContext::root().with_category(fruit());
        let _child = parent.with_sub_category(apples());
        assert!(parent.sub_category().is_none());
    }

    #[test]
    fn test_lineage_requires_both_levels() {
        let top_only = CrawlContext::root().with_category(fruit());
        assert!(top_only.lineage().is_none());

        let lineage = top_only.with_sub_category(apples()).lineage().unwrap();
        assert_eq!(lineage.category, "Fruit & Veg");
        assert_eq!(lineage.sub_category, "Apples");
    }

    #[test]
    fn test_display_shows_ancestry() {
        assert_eq!(CrawlContext::root().to_string(), "<root>");

        let context = CrawlContext::root()
            .with_category(fruit())
            .with_sub_category(apples())
            .with_page(3, "https://shop.example.com/browse/fruit-veg/apples");
        assert_eq!(context.to_string(), "Fruit & Veg > Apples (page 3)");
    }
}
