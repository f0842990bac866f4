use serde::Deserialize;

/// Main configuration structure for Shelf-Crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub gateway: GatewayConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub schema: SiteSchema,
}

/// Traversal behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Entry page listing the top-level categories
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Number of rendering sessions, which is also the number of branches in flight
    #[serde(rename = "max-concurrent-sessions", default = "default_sessions")]
    pub max_concurrent_sessions: u32,

    /// Drop tasks whose URL was already scheduled
    #[serde(default = "default_true")]
    pub deduplicate: bool,
}

/// Rendering gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout")]
    pub timeout_secs: u64,

    /// Extra attempts for retryable gateway failures
    #[serde(rename = "max-retries", default = "default_retries")]
    pub max_retries: u32,

    /// Base backoff delay (milliseconds), doubled on every attempt
    #[serde(rename = "retry-backoff-ms", default = "default_backoff")]
    pub retry_backoff_ms: u64,

    /// Optional external rendering service; pages are requested as `{endpoint}?url=<page>`
    #[serde(rename = "render-endpoint", default)]
    pub render_endpoint: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Versioned set of structural selectors the parsers depend on.
///
/// A change in the site's markup is handled here and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SiteSchema {
    pub version: u32,

    /// Top-level category container nodes on the start page
    pub category: String,
    #[serde(rename = "category-title")]
    pub category_title: String,
    #[serde(rename = "category-link")]
    pub category_link: String,

    /// Sub-category nodes on a top category page
    #[serde(rename = "sub-category")]
    pub sub_category: String,
    #[serde(rename = "sub-category-title")]
    pub sub_category_title: String,
    #[serde(rename = "sub-category-link")]
    pub sub_category_link: String,

    /// Page-control nodes inside the pager widget
    #[serde(rename = "page-control")]
    pub page_control: String,

    /// Product card nodes on a listing page
    #[serde(rename = "product-card")]
    pub product_card: String,
    #[serde(rename = "product-url")]
    pub product_url: String,
    #[serde(rename = "product-name")]
    pub product_name: String,
    #[serde(rename = "product-price-amount")]
    pub product_price_amount: String,
    #[serde(rename = "product-price-cup")]
    pub product_price_cup: String,
    #[serde(rename = "product-size")]
    pub product_size: String,
}

impl Default for SiteSchema {
    fn default() -> Self {
        Self {
            version: 1,
            category: r#"div[ng-class="::aisleClass"]"#.to_string(),
            category_title: "span.categoryList-aisleLabelNameLine".to_string(),
            category_link: "a[href]".to_string(),
            sub_category: "wow-categories-spinner-category-mf".to_string(),
            sub_category_title: "span".to_string(),
            sub_category_link: "a[href]".to_string(),
            page_control: r#"div.paging._pagingControl a[class*="page"]"#.to_string(),
            product_card: r#"wow-card[card="card"]"#.to_string(),
            product_url: r#"a[class*="InnerDes"]"#.to_string(),
            product_name: "div.shelfProductStamp-productName span:nth-of-type(1)".to_string(),
            product_price_amount: "span.pricingContainer-priceAmount".to_string(),
            product_price_cup: "span.pricingContainer-priceCup".to_string(),
            product_size: "div.shelfProductStamp-productName span:nth-of-type(2)".to_string(),
        }
    }
}

impl SiteSchema {
    /// Every selector with its config key, in declaration order
    pub fn selectors(&self) -> [(&'static str, &str); 13] {
        [
            ("category", &self.category),
            ("category-title", &self.category_title),
            ("category-link", &self.category_link),
            ("sub-category", &self.sub_category),
            ("sub-category-title", &self.sub_category_title),
            ("sub-category-link", &self.sub_category_link),
            ("page-control", &self.page_control),
            ("product-card", &self.product_card),
            ("product-url", &self.product_url),
            ("product-name", &self.product_name),
            ("product-price-amount", &self.product_price_amount),
            ("product-price-cup", &self.product_price_cup),
            ("product-size", &self.product_size),
        ]
    }
}

fn default_sessions() -> u32 {
    4
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    2
}

fn default_backoff() -> u64 {
    500
}
