use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected while streaming a dump through a parser stage.
/// Atomic so batch-parallel stages can share one instance.
#[derive(Default)]
pub struct ParseStats {
    pub pages_processed: AtomicU64,
    pub pages_skipped: AtomicU64,
    pub entries_emitted: AtomicU64,
    pub translations_extracted: AtomicU64,
    pub terms_rejected: AtomicU64,
}

/// Plain snapshot for persistence in the per-stage stats artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseSnapshot {
    pub pages_processed: u64,
    pub pages_skipped: u64,
    pub entries_emitted: u64,
    pub translations_extracted: u64,
    pub terms_rejected: u64,
}

impl ParseStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_pages(&self) {
        self.pages_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped(&self) {
        self.pages_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_entries(&self) {
        self.entries_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_translations(&self, count: u64) {
        self.translations_extracted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_rejected(&self, count: u64) {
        self.terms_rejected.fetch_add(count, Ordering::Relaxed);
    }

    pub fn pages(&self) -> u64 {
        self.pages_processed.load(Ordering::Relaxed)
    }

    pub fn entries(&self) -> u64 {
        self.entries_emitted.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ParseSnapshot {
        ParseSnapshot {
            pages_processed: self.pages_processed.load(Ordering::Relaxed),
            pages_skipped: self.pages_skipped.load(Ordering::Relaxed),
            entries_emitted: self.entries_emitted.load(Ordering::Relaxed),
            translations_extracted: self.translations_extracted.load(Ordering::Relaxed),
            terms_rejected: self.terms_rejected.load(Ordering::Relaxed),
        }
    }
}
