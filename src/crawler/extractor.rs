//! Product record extraction from listing pages
//!
//! Extraction is a pure function of the document: a missing field is simply
//! left unset, and running it twice over the same page gives the same records.

use crate::crawler::schema::ProductLocators;
use crate::crawler::task::Lineage;
use scraper::Html;

/// One product as read from a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub name: Option<String>,
    pub price_amount: Option<String>,
    pub price_cup: Option<String>,
    pub size: Option<String>,
    pub url: Option<String>,
    pub category: String,
    pub sub_category: String,
    /// 1 for the page rendered at the sub-category stage
    pub page_number: u32,
    /// Listing page the record was read from
    pub page_url: String,
}

/// Where on the site a listing rendering came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSource<'a> {
    pub lineage: &'a Lineage,
    pub page_number: u32,
    pub page_url: &'a str,
}

/// Produces one record per product card, in document order
pub fn extract_products(
    document: &Html,
    locators: &ProductLocators,
    source: &ListingSource<'_>,
) -> Vec<ProductRecord> {
    document
        .select(&locators.card)
        .map(|card| {
            let url = locators.url.first(card);
            let name = locators.name.first(card);
            let price_amount = locators.price_amount.first(card);
            let price_cup = locators.price_cup.first(card);
            let size = locators.size.first(card);

            ProductRecord {
                name,
                price_amount,
                price_cup,
                size,
                url,
                category: source.lineage.category.clone(),
                sub_category: source.lineage.sub_category.clone(),
                page_number: source.page_number,
                page_url: source.page_url.to_string(),
            }
        })
        .collect()
}
