//! Crawler module for the category-tree traversal
//!
//! This module contains the core crawling logic, including:
//! - Crawl tasks and the ancestry they carry
//! - Rendering sessions, the session pool and retry logic
//! - Category, pager and product card parsing
//! - Overall crawl coordination

mod categories;
mod coordinator;
mod extractor;
mod fetcher;
mod gateway;
mod paginator;
mod pool;
mod scheduler;
mod schema;
mod task;

pub use categories::{parse_categories, IncompleteCategory};
pub use coordinator::{Coordinator, StageError};
pub use extractor::{extract_products, ListingSource, ProductRecord};
pub use fetcher::{build_http_client, fetch_with_retry, HttpRenderSession, RetryPolicy};
pub use gateway::{GatewayError, RenderGateway, RenderedDocument};
pub use paginator::{parse_page_number, scan_pagination, PageDescriptor, PaginationError};
pub use pool::{PooledSession, SessionPool};
pub use scheduler::{Frontier, VisitedSet};
pub use schema::{CategoryLocators, CompiledSchema, FieldLocator, ProductLocators};
pub use task::{CategoryRef, CrawlContext, CrawlTask, Lineage, Stage};

use crate::config::Config;
use crate::output::{log_report, CrawlReport};
use crate::sink::{RunStatus, SqliteSink};
use crate::CrawlError;
use std::path::Path;
use std::sync::Arc;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the SQLite sink and record a new run
/// 2. Build one HTTP rendering session per allowed concurrent branch
/// 3. Walk the category tree and store every product found
/// 4. Mark the run completed or failed and log the counters
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the config file, stored with the run
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished; branch-level failures are in the counters
/// * `Err(CrawlError)` - The crawl could not start
pub async fn run_crawl(config: Config, config_hash: &str) -> Result<CrawlReport, CrawlError> {
    let sink = Arc::new(SqliteSink::new(Path::new(&config.output.database_path))?);
    let run_id = sink.start_run(config_hash)?;
    tracing::info!("Started run {}", run_id);

    let sessions = (0..config.crawler.max_concurrent_sessions)
        .map(|_| HttpRenderSession::new(&config.gateway))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!("Opened {} rendering sessions", sessions.len());

    let mut coordinator = Coordinator::new(&config, SessionPool::new(sessions), sink.clone())?;
    let result = coordinator.run().await;

    let status = if result.is_ok() {
        RunStatus::Completed
    } else {
        RunStatus::Failed
    };
    if let Err(e) = sink.finish_run(status) {
        tracing::error!("Failed to close run {}: {}", run_id, e);
    }

    let report = result?;
    log_report(&report);
    Ok(report)
}
