//! Frontier store of a single crawl job
//!
//! The store is owned by exactly one wave orchestrator and shared (through an
//! `Arc`) only with that job's dispatchers. Every mutation is a set insert or a
//! first-writer-wins map insert, so a single coarse lock is enough: there are no
//! cross-entry invariants to protect.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct FrontierInner {
    discovered: HashSet<String>,
    processed: HashSet<String>,
    skipped: HashSet<String>,
    backlinks: HashMap<String, String>,
}

/// Discovered URLs, processed URLs and backlink provenance for one job
///
/// Invariants:
/// - `processed ⊆ discovered` and `skipped ⊆ discovered`
/// - `discovered` only grows
/// - a backlink, once recorded, is never overwritten
#[derive(Debug, Default)]
pub struct FrontierStore {
    inner: Mutex<FrontierInner>,
}

/// Point-in-time counts of a frontier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierSnapshot {
    pub discovered: usize,
    pub processed: usize,
    pub skipped: usize,
}

impl FrontierStore {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier whose only discovered entry is the seed URL
    pub fn with_seed(seed: &str, backlink: Option<&str>) -> Self {
        let store = Self::new();
        store.insert_seed(seed, backlink);
        store
    }

    /// Inserts a seed URL, optionally attributed to a backlink from the rule
    ///
    /// # Returns
    ///
    /// `true` if the seed was not discovered before
    pub fn insert_seed(&self, seed: &str, backlink: Option<&str>) -> bool {
        let mut inner = self.lock();
        let inserted = inner.discovered.insert(seed.to_string());
        if let Some(backlink) = backlink.filter(|b| !b.is_empty()) {
            inner
                .backlinks
                .entry(seed.to_string())
                .or_insert_with(|| backlink.to_string());
        }
        inserted
    }

    // Mutations are monotonic, so a poisoned lock still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records links discovered on `source`
    ///
    /// Each link not yet discovered is inserted and attributed to `source`.
    /// Links that are already known keep their original backlink.
    ///
    /// # Returns
    ///
    /// The number of links that were new to this frontier
    pub fn add_links<'a, I>(&self, source: &str, links: I) -> usize
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut inner = self.lock();
        let mut added = 0;
        for link in links {
            if inner.discovered.insert(link.clone()) {
                added += 1;
                inner
                    .backlinks
                    .entry(link.clone())
                    .or_insert_with(|| source.to_string());
            }
        }
        added
    }

    /// Marks a URL as having completed a fetch attempt (idempotent)
    ///
    /// # Returns
    ///
    /// `true` if the URL was not processed before
    pub fn mark_processed(&self, url: &str) -> bool {
        let mut inner = self.lock();
        debug_assert!(
            inner.discovered.contains(url),
            "processed URL must have been discovered: {}",
            url
        );
        inner.processed.insert(url.to_string())
    }

    /// Marks a URL as rejected by the link filter
    ///
    /// A skipped URL stays discovered-only: it is never processed and never
    /// offered in a later wave.
    pub fn mark_skipped(&self, url: &str) -> bool {
        self.lock().skipped.insert(url.to_string())
    }

    /// Returns the next wave: `discovered \ (processed ∪ skipped)`
    ///
    /// The result is a sorted snapshot, not a live view.
    pub fn pending_wave(&self) -> Vec<String> {
        let inner = self.lock();
        inner
            .discovered
            .iter()
            .filter(|url| !inner.processed.contains(*url) && !inner.skipped.contains(*url))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns the page on which `url` was first discovered
    pub fn backlink(&self, url: &str) -> Option<String> {
        self.lock().backlinks.get(url).cloned()
    }

    pub fn is_discovered(&self, url: &str) -> bool {
        self.lock().discovered.contains(url)
    }

    pub fn is_processed(&self, url: &str) -> bool {
        self.lock().processed.contains(url)
    }

    pub fn is_skipped(&self, url: &str) -> bool {
        self.lock().skipped.contains(url)
    }

    /// Returns the current set sizes
    pub fn snapshot(&self) -> FrontierSnapshot {
        let inner = self.lock();
        FrontierSnapshot {
            discovered: inner.discovered.len(),
            processed: inner.processed.len(),
            skipped: inner.skipped.len(),
        }
    }

    /// Returns true if every processed and skipped URL is also discovered
    pub fn is_consistent(&self) -> bool {
        let inner = self.lock();
        inner.processed.is_subset(&inner.discovered) && inner.skipped.is_subset(&inner.discovered)
    }
}
