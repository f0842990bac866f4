//! Compiled form of the site schema
//!
//! Selectors are parsed once at startup and shared by every worker.

use crate::config::SiteSchema;
use crate::ConfigError;
use scraper::{ElementRef, Selector};

/// A locator that reads either an element's text or one of its attributes
#[derive(Debug, Clone)]
pub struct FieldLocator {
    selector: Selector,
    attribute: Option<&'static str>,
}

impl FieldLocator {
    fn text(field: &str, css: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            selector: compile(field, css)?,
            attribute: None,
        })
    }

    fn attr(field: &str, css: &str, attribute: &'static str) -> Result<Self, ConfigError> {
        Ok(Self {
            selector: compile(field, css)?,
            attribute: Some(attribute),
        })
    }

    /// First match below `scope`, trimmed; None when nothing matches or the match is blank
    pub fn first(&self, scope: ElementRef<'_>) -> Option<String> {
        let element = scope.select(&self.selector).next()?;

        let raw = match self.attribute {
            Some(name) => element.value().attr(name)?.to_string(),
            None => element.text().collect::<String>(),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Locators for one kind of category node
#[derive(Debug, Clone)]
pub struct CategoryLocators {
    pub node: Selector,
    pub title: FieldLocator,
    pub link: FieldLocator,
}

/// Per-card locators, evaluated in this order
#[derive(Debug, Clone)]
pub struct ProductLocators {
    pub card: Selector,
    pub url: FieldLocator,
    pub name: FieldLocator,
    pub price_amount: FieldLocator,
    pub price_cup: FieldLocator,
    pub size: FieldLocator,
}

#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub version: u32,
    pub categories: CategoryLocators,
    pub sub_categories: CategoryLocators,
    pub page_control: Selector,
    pub products: ProductLocators,
}

impl CompiledSchema {
    pub fn compile(schema: &SiteSchema) -> Result<Self, ConfigError> {
        Ok(Self {
            version: schema.version,
            categories: CategoryLocators {
                node: compile("category", &schema.category)?,
                title: FieldLocator::text("category-title", &schema.category_title)?,
                link: FieldLocator::attr("category-link", &schema.category_link, "href")?,
            },
            sub_categories: CategoryLocators {
                node: compile("sub-category", &schema.sub_category)?,
                title: FieldLocator::text("sub-category-title", &schema.sub_category_title)?,
                link: FieldLocator::attr("sub-category-link", &schema.sub_category_link, "href")?,
            },
            page_control: compile("page-control", &schema.page_control)?,
            products: ProductLocators {
                card: compile("product-card", &schema.product_card)?,
                url: FieldLocator::attr("product-url", &schema.product_url, "href")?,
                name: FieldLocator::text("product-name", &schema.product_name)?,
                price_amount: FieldLocator::text(
                    "product-price-amount",
                    &schema.product_price_amount,
                )?,
                price_cup: FieldLocator::text("product-price-cup", &schema.product_price_cup)?,
                size: FieldLocator::text("product-size", &schema.product_size)?,
            },
        })
    }
}

fn compile(field: &str, css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css).map_err(|e| ConfigError::InvalidSelector {
        field: field.to_string(),
        message: format!("{:?}", e),
    })
}
