//! Crawl counters and database statistics
//!
//! `CrawlStats` is updated by the workers while a crawl runs; the
//! `CrawlStatistics` side reads a finished run back from the database.

use crate::sink::{RunRecord, SqliteSink};
use crate::CrawlError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by every worker
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages_fetched: AtomicU64,
    gateway_failures: AtomicU64,
    records_stored: AtomicU64,
    sink_failures: AtomicU64,
    pagination_skips: AtomicU64,
    branches_pruned: AtomicU64,
    duplicates_dropped: AtomicU64,
    tasks_panicked: AtomicU64,
}

/// Point-in-time copy of `CrawlStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub pages_fetched: u64,
    pub gateway_failures: u64,
    pub records_stored: u64,
    pub sink_failures: u64,
    /// Page controls whose page number could not be read
    pub pagination_skips: u64,
    /// Category nodes without a usable title or URL
    pub branches_pruned: u64,
    pub duplicates_dropped: u64,
    pub tasks_panicked: u64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn gateway_failed(&self) {
        self.gateway_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stored(&self) {
        self.records_stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sink_failed(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pagination_skipped(&self) {
        self.pagination_skips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn branch_pruned(&self) {
        self.branches_pruned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn duplicate_dropped(&self) {
        self.duplicates_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn task_panicked(&self) {
        self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CrawlReport {
        CrawlReport {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            gateway_failures: self.gateway_failures.load(Ordering::Relaxed),
            records_stored: self.records_stored.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            pagination_skips: self.pagination_skips.load(Ordering::Relaxed),
            branches_pruned: self.branches_pruned.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
        }
    }
}

/// Statistics of the latest run stored in the database
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    pub run: RunRecord,
    pub total_products: u64,
    /// Products with at least one field unset
    pub partial_products: u64,
    /// (category, sub-category, product count)
    pub by_category: Vec<(String, String, u64)>,
}

/// Loads statistics for the most recent run
///
/// Returns `Ok(None)` when the database holds no runs yet.
pub fn load_statistics(sink: &SqliteSink) -> Result<Option<CrawlStatistics>, CrawlError> {
    let run = match sink.latest_run()? {
        Some(run) => run,
        None => return Ok(None),
    };

    let total_products = sink.count_products(Some(run.id))?;
    let partial_products = sink.count_partial_products(run.id)?;
    let by_category = sink.products_by_category(run.id)?;

    Ok(Some(CrawlStatistics {
        run,
        total_products,
        partial_products,
        by_category,
    }))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Run {}:", stats.run.id);
    println!("  Status: {}", stats.run.status.to_db_string());
    println!("  Started: {}", stats.run.started_at);
    if let Some(finished) = &stats.run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!("  Config hash: {}", stats.run.config_hash);
    println!();

    println!("Products:");
    println!("  Total: {}", stats.total_products);
    let percentage = if stats.total_products > 0 {
        (stats.partial_products as f64 / stats.total_products as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "  With missing fields: {} ({:.1}%)",
        stats.partial_products, percentage
    );
    println!();

    println!("By Category:");
    let mut current_category: Option<&str> = None;
    for (category, sub_category, count) in &stats.by_category {
        if current_category != Some(category.as_str()) {
            println!("  {}", category);
            current_category = Some(category.as_str());
        }
        println!("    {}: {}", sub_category, count);
    }
}

/// Logs the end-of-crawl counters
pub fn log_report(report: &CrawlReport) {
    tracing::info!(
        "Pages fetched: {}, records stored: {}, gateway failures: {}, sink failures: {}",
        report.pages_fetched,
        report.records_stored,
        report.gateway_failures,
        report.sink_failures
    );
    tracing::info!(
        "Pager controls skipped: {}, branches pruned: {}, duplicates dropped: {}, tasks panicked: {}",
        report.pagination_skips,
        report.branches_pruned,
        report.duplicates_dropped,
        report.tasks_panicked
    );
}
