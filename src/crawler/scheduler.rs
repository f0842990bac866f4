//! Crawl frontier and visited-URL tracking
//!
//! This module handles:
//! - FIFO queue of pending crawl tasks
//! - Deduplication of task URLs through a shared visited set

use crate::crawler::task::CrawlTask;
use crate::url::visit_key;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Set of URL keys already scheduled
///
/// Cloning shares the underlying set; check-and-insert happens under one lock.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url` and returns true if it had not been seen before
    ///
    /// URLs that cannot be normalized are keyed by their trimmed text.
    pub fn insert(&self, url: &str) -> bool {
        let key = visit_key(url).unwrap_or_else(|_| url.trim().to_string());
        self.keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key)
    }

    pub fn contains(&self, url: &str) -> bool {
        let key = visit_key(url).unwrap_or_else(|_| url.trim().to_string());
        self.keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&key)
    }

    pub fn len(&self) -> usize {
        self.keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pending tasks, in discovery order
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<CrawlTask>,
    visited: Option<VisitedSet>,
}

impl Frontier {
    /// Frontier that schedules every task it is given
    pub fn new() -> Self {
        Self::default()
    }

    /// Frontier that drops tasks whose URL was already scheduled
    pub fn deduplicating(visited: VisitedSet) -> Self {
        Self {
            queue: VecDeque::new(),
            visited: Some(visited),
        }
    }

    /// Queues a task; returns false if it was dropped as a duplicate
    pub fn push(&mut self, task: CrawlTask) -> bool {
        if let Some(visited) = &self.visited {
            if !visited.insert(&task.url) {
                tracing::debug!(
                    "Skipping already scheduled {} {} [{}]",
                    task.stage,
                    task.url,
                    task.context
                );
                return false;
            }
        }
        self.queue.push_back(task);
        true
    }

    /// Visited set backing this frontier, if it deduplicates
    pub fn visited(&self) -> Option<&VisitedSet> {
        self.visited.as_ref()
    }

    pub fn pop(&mut self) -> Option<CrawlTask> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::task::{CategoryRef, CrawlContext};

    fn task(url: &str) -> CrawlTask {
        CrawlTask::top_category(CategoryRef::new("Bakery", url))
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = Frontier::new();
        frontier.push(task("https://shop.example.com/a"));
        frontier.push(task("https://shop.example.com/b"));

        assert_eq!(frontier.len(), 2);
        assert_eq!(frontier.pop().unwrap().url, "https://shop.example.com/a");
        assert_eq!(frontier.pop().unwrap().url, "https://shop.example.com/b");
        assert!(frontier.pop().is_none());
    }

    #[test]
    fn test_without_dedup_duplicates_are_kept() {
        let mut frontier = Frontier::new();
        assert!(frontier.push(task("https://shop.example.com/a")));
        assert!(frontier.push(task("https://shop.example.com/a")));
        assert_eq!(frontier.len(), 2);
    }

    #[test]
    fn test_dedup_drops_equivalent_urls() {
        let mut frontier = Frontier::deduplicating(VisitedSet::new());
        assert!(frontier.push(task("https://shop.example.com/list?page=2")));
        assert!(!frontier.push(task("https://shop.example.com/list/?page=2#top")));
        assert!(frontier.push(task("https://shop.example.com/list?page=3")));
        assert_eq!(frontier.len(), 2);
    }

    #[test]
    fn test_visited_set_is_shared_between_clones() {
        let visited = VisitedSet::new();
        let other = visited.clone();

        assert!(visited.insert("https://shop.example.com/a"));
        assert!(other.contains("https://shop.example.com/a"));
        assert!(!other.insert("https://shop.example.com/a"));
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn test_concurrent_inserts_admit_one_winner() {
        let visited = VisitedSet::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let visited = visited.clone();
                std::thread::spawn(move || visited.insert("https://shop.example.com/x"))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_listing_pages_keep_distinct_context() {
        let mut frontier = Frontier::deduplicating(VisitedSet::new());
        let parent = CrawlContext::root()
            .with_category(CategoryRef::new("Dairy", "https://shop.example.com/dairy"))
            .with_sub_category(CategoryRef::new("Milk", "https://shop.example.com/dairy/milk"));

        frontier.push(CrawlTask::listing_page(
            &parent,
            "https://shop.example.com/dairy/milk?page=2",
            2,
            "https://shop.example.com/dairy/milk",
        ));
        let queued = frontier.pop().unwrap();
        assert_eq!(queued.context.page_index(), Some(2));
    }
}
