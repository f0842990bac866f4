//! Crawler coordinator - traversal of the category hierarchy
//!
//! The coordinator owns the frontier. It runs the start stage itself, then
//! keeps one task in flight per rendering session. Each task fetches its
//! page, runs the handler for its stage and hands back follow-up tasks:
//!
//! - start page → one `TopCategory` task per category
//! - `TopCategory` → one `SubCategory` task per sub-category
//! - `SubCategory` → records for the page already rendered, plus one
//!   `ListingPage` task per selectable page in the pager
//! - `ListingPage` → records only
//!
//! A failing task is logged and dropped; its siblings keep running.

use crate::config::Config;
use crate::crawler::categories::parse_categories;
use crate::crawler::extractor::{extract_products, ListingSource};
use crate::crawler::fetcher::{fetch_with_retry, RetryPolicy};
use crate::crawler::gateway::{GatewayError, RenderGateway, RenderedDocument};
use crate::crawler::paginator::scan_pagination;
use crate::crawler::pool::SessionPool;
use crate::crawler::schema::{CategoryLocators, CompiledSchema};
use crate::crawler::scheduler::{Frontier, VisitedSet};
use crate::crawler::task::{CategoryRef, CrawlContext, CrawlTask, Lineage, Stage};
use crate::output::{CrawlReport, CrawlStats};
use crate::sink::RecordSink;
use crate::{ConfigError, CrawlError};
use scraper::Html;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinSet;
use url::Url;

/// Why a single task produced nothing
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{0}")]
    Gateway(#[from] GatewayError),

    #[error("{stage} task has no category/sub-category ancestry")]
    MissingAncestry { stage: Stage },

    #[error("Invalid page URL {url}: {message}")]
    InvalidPageUrl { url: String, message: String },

    #[error("Listing page {url} has no page number")]
    MissingPageIndex { url: String },
}

/// Main crawler coordinator structure
pub struct Coordinator<G> {
    start_url: String,
    worker: StageWorker<G>,
    frontier: Frontier,
    stats: Arc<CrawlStats>,
}

impl<G: RenderGateway> Coordinator<G> {
    /// Creates a coordinator that renders through `pool` and stores into `sink`
    pub fn new(
        config: &Config,
        pool: SessionPool<G>,
        sink: Arc<dyn RecordSink>,
    ) -> Result<Self, CrawlError> {
        if pool.capacity() == 0 {
            return Err(ConfigError::Validation(
                "rendering session pool must hold at least one session".to_string(),
            )
            .into());
        }

        let schema = CompiledSchema::compile(&config.schema)?;
        let stats = Arc::new(CrawlStats::new());

        let frontier = if config.crawler.deduplicate {
            Frontier::deduplicating(VisitedSet::new())
        } else {
            Frontier::new()
        };

        Ok(Self {
            start_url: config.crawler.start_url.clone(),
            worker: StageWorker {
                pool,
                schema: Arc::new(schema),
                sink,
                stats: Arc::clone(&stats),
                retry: RetryPolicy::from_config(&config.gateway),
            },
            frontier,
            stats,
        })
    }

    /// Replaces the retry policy taken from the gateway config
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.worker.retry = retry;
        self
    }

    /// Counters shared with the workers
    pub fn stats(&self) -> Arc<CrawlStats> {
        Arc::clone(&self.stats)
    }

    /// Runs the crawl to completion
    ///
    /// Fails only when the start page cannot be fetched or lists no
    /// categories; every later failure is confined to its own branch.
    pub async fn run(&mut self) -> Result<CrawlReport, CrawlError> {
        let start_time = Instant::now();
        tracing::info!("Starting crawl at {}", self.start_url);

        let categories = self.bootstrap().await?;
        tracing::info!("Found {} top-level categories", categories.len());
        for category in categories {
            self.enqueue(CrawlTask::top_category(category));
        }

        let concurrency = self.worker.pool.capacity();
        let mut in_flight = JoinSet::new();
        let mut tasks_completed: u64 = 0;

        loop {
            while in_flight.len() < concurrency {
                let Some(task) = self.frontier.pop() else {
                    break;
                };
                let worker = self.worker.clone();
                in_flight.spawn(async move { worker.run_task(task).await });
            }

            match in_flight.join_next().await {
                Some(Ok(follow_ups)) => {
                    for task in follow_ups {
                        self.enqueue(task);
                    }
                }
                Some(Err(e)) => {
                    self.stats.task_panicked();
                    tracing::error!("Crawl task aborted: {}", e);
                }
                None => break,
            }

            tasks_completed += 1;
            if tasks_completed % 10 == 0 {
                let elapsed = start_time.elapsed();
                tracing::info!(
                    "Progress: {} tasks done, {} in flight, {} queued, {:.2} tasks/sec",
                    tasks_completed,
                    in_flight.len(),
                    self.frontier.len(),
                    tasks_completed as f64 / elapsed.as_secs_f64()
                );
            }
        }

        let report = self.stats.snapshot();
        tracing::info!(
            "Crawl completed: {} tasks in {:?}",
            tasks_completed,
            start_time.elapsed()
        );
        Ok(report)
    }

    /// Start stage: reads the top-level categories from the entry page
    async fn bootstrap(&mut self) -> Result<Vec<CategoryRef>, CrawlError> {
        let start_url = self.start_url.clone();
        if let Some(visited) = self.frontier_visited() {
            visited.insert(&start_url);
        }

        let document = self
            .worker
            .fetch(&start_url)
            .await
            .map_err(|e| CrawlError::Bootstrap {
                url: start_url.clone(),
                reason: e.to_string(),
            })?;

        let categories = self
            .worker
            .categories(
                &document,
                &self.worker.schema.categories,
                &CrawlContext::root(),
                "category",
            )
            .map_err(|e| CrawlError::Bootstrap {
                url: start_url.clone(),
                reason: e.to_string(),
            })?;

        if categories.is_empty() {
            tracing::error!(
                "No categories found on {}; the site layout may have changed",
                start_url
            );
            return Err(CrawlError::Bootstrap {
                url: start_url,
                reason: "no top-level categories found".to_string(),
            });
        }

        Ok(categories)
    }

    fn frontier_visited(&self) -> Option<VisitedSet> {
        self.frontier.visited().cloned()
    }

    fn enqueue(&mut self, task: CrawlTask) {
        if !self.frontier.push(task) {
            self.stats.duplicate_dropped();
        }
    }
}

/// Everything a task needs, cloned into each spawned task
struct StageWorker<G> {
    pool: SessionPool<G>,
    schema: Arc<CompiledSchema>,
    sink: Arc<dyn RecordSink>,
    stats: Arc<CrawlStats>,
    retry: RetryPolicy,
}

impl<G> Clone for StageWorker<G> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            schema: Arc::clone(&self.schema),
            sink: Arc::clone(&self.sink),
            stats: Arc::clone(&self.stats),
            retry: self.retry,
        }
    }
}

impl<G: RenderGateway> StageWorker<G> {
    /// Runs one task; failures end up in the log, never in the caller
    async fn run_task(self, task: CrawlTask) -> Vec<CrawlTask> {
        match self.process(&task).await {
            Ok(follow_ups) => follow_ups,
            Err(e) => {
                tracing::error!(
                    "{} task failed for {} [{}]: {}",
                    task.stage,
                    task.url,
                    task.context,
                    e
                );
                Vec::new()
            }
        }
    }

    async fn process(&self, task: &CrawlTask) -> Result<Vec<CrawlTask>, StageError> {
        let document = self.fetch(&task.url).await?;

        match task.stage {
            Stage::TopCategory => self.handle_top_category(task, &document),
            Stage::SubCategory => self.handle_sub_category(task, &document),
            Stage::ListingPage => self.handle_listing_page(task, &document),
        }
    }

    /// Renders `url` on a pooled session; the session is returned before this resolves
    async fn fetch(&self, url: &str) -> Result<RenderedDocument, GatewayError> {
        let mut session = self.pool.checkout().await?;
        match fetch_with_retry(&mut *session, url, self.retry).await {
            Ok(document) => {
                self.stats.page_fetched();
                Ok(document)
            }
            Err(e) => {
                self.stats.gateway_failed();
                Err(e)
            }
        }
    }

    fn handle_top_category(
        &self,
        task: &CrawlTask,
        document: &RenderedDocument,
    ) -> Result<Vec<CrawlTask>, StageError> {
        let sub_categories = self.categories(
            document,
            &self.schema.sub_categories,
            &task.context,
            "sub-category",
        )?;

        if sub_categories.is_empty() {
            tracing::warn!(
                "No sub-categories on {} [{}]; branch ends here",
                task.url,
                task.context
            );
        }

        Ok(sub_categories
            .into_iter()
            .map(|sub_category| CrawlTask::sub_category(&task.context, sub_category))
            .collect())
    }

    /// Extracts the rendered first page and queues the pages offered by the pager
    fn handle_sub_category(
        &self,
        task: &CrawlTask,
        document: &RenderedDocument,
    ) -> Result<Vec<CrawlTask>, StageError> {
        let lineage = task
            .context
            .lineage()
            .ok_or(StageError::MissingAncestry { stage: task.stage })?;

        let html = document.parse();
        let page_base_url = task.url.as_str();
        let controls = scan_pagination(&html, &self.schema.page_control, page_base_url);

        let mut follow_ups = Vec::new();
        let mut active_page_shown = controls.is_empty();

        for control in &controls {
            match control {
                Ok(page) if page.is_active_page => active_page_shown = true,
                Ok(page) => {
                    if let Some(next_page_url) = &page.next_page_url {
                        tracing::info!(
                            "Page {} of [{}]: {}",
                            page.page_number,
                            task.context,
                            next_page_url
                        );
                        follow_ups.push(CrawlTask::listing_page(
                            &task.context,
                            next_page_url.clone(),
                            page.page_number,
                            page_base_url,
                        ));
                    }
                }
                Err(e) => {
                    self.stats.pagination_skipped();
                    tracing::warn!(
                        "Skipping page control on {} [{}]: {}",
                        task.url,
                        task.context,
                        e
                    );
                }
            }
        }

        if active_page_shown {
            self.emit_records(&html, &lineage, &task.context, 1, &task.url);
        } else {
            tracing::warn!(
                "{} task for {} [{}]: pager marks no active page, nothing extracted in place ({} pages queued)",
                task.stage,
                task.url,
                task.context,
                follow_ups.len()
            );
        }

        Ok(follow_ups)
    }

    fn handle_listing_page(
        &self,
        task: &CrawlTask,
        document: &RenderedDocument,
    ) -> Result<Vec<CrawlTask>, StageError> {
        let lineage = task
            .context
            .lineage()
            .ok_or(StageError::MissingAncestry { stage: task.stage })?;
        let page_number = task
            .context
            .page_index()
            .ok_or_else(|| StageError::MissingPageIndex {
                url: task.url.clone(),
            })?;

        let html = document.parse();
        self.emit_records(&html, &lineage, &task.context, page_number, &task.url);
        Ok(Vec::new())
    }

    /// Reads category nodes, logging and dropping the ones that cannot become tasks
    fn categories(
        &self,
        document: &RenderedDocument,
        locators: &CategoryLocators,
        context: &CrawlContext,
        level: &str,
    ) -> Result<Vec<CategoryRef>, StageError> {
        let page_url = Url::parse(&document.url).map_err(|e| StageError::InvalidPageUrl {
            url: document.url.clone(),
            message: e.to_string(),
        })?;

        let html = document.parse();
        let mut found = Vec::new();

        for node in parse_categories(&html, locators, &page_url) {
            match node {
                Ok(category) => {
                    tracing::info!(
                        "Found {} '{}' at {} [{}]",
                        level,
                        category.title,
                        category.url,
                        context
                    );
                    found.push(category);
                }
                Err(incomplete) => {
                    self.stats.branch_pruned();
                    tracing::warn!(
                        "Dropping {} {:?} on {} [{}]: missing {}",
                        level,
                        incomplete.title,
                        document.url,
                        context,
                        incomplete.missing
                    );
                }
            }
        }

        Ok(found)
    }

    /// Extracts one listing rendering and stores every record it yields
    fn emit_records(
        &self,
        html: &Html,
        lineage: &Lineage,
        context: &CrawlContext,
        page_number: u32,
        page_url: &str,
    ) {
        let source = ListingSource {
            lineage,
            page_number,
            page_url,
        };
        let records = extract_products(html, &self.schema.products, &source);

        tracing::info!(
            "Listing [{}] page {} at {}: {} products",
            context,
            page_number,
            page_url,
            records.len()
        );

        for record in &records {
            match self.sink.store(record) {
                Ok(()) => self.stats.record_stored(),
                Err(e) => {
                    self.stats.sink_failed();
                    tracing::warn!(
                        "Failed to store {:?} from {} [{}]: {}",
                        record.name,
                        page_url,
                        context,
                        e
                    );
                }
            }
        }
    }
}
