//! Output module for crawl reporting
//!
//! This module handles:
//! - Counting what happened during a crawl
//! - Summarizing stored runs for the `--stats` command

pub mod stats;

pub use stats::{
    load_statistics, log_report, print_statistics, CrawlReport, CrawlStatistics, CrawlStats,
};
