use crate::models::ProvenanceTag;
use rustc_hash::FxHashMap;

/// Title-index cache format version. Bump when the format changes.
pub const INDEX_CACHE_VERSION: u32 = 2;

/// Pipeline state file schema version (stable within a minor release).
pub const STATE_VERSION: u32 = 1;

/// Log progress every N pages while streaming a dump.
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// Frequency-gate threshold for Wikipedia-only entries.
pub const DEFAULT_WIKI_TOP_N: usize = 1000;

/// Merge buffers are pre-sized for roughly this many entries.
pub const EXPECTED_ENTRY_COUNT: usize = 150_000;

/// Minimum accepted lemma length after cleaning.
pub const MIN_LEMMA_LEN: usize = 2;

/// Lemmas longer than this with a `:` are rejected as sentence-like titles.
pub const LONG_LEMMA_COLON_LIMIT: usize = 30;

/// Per-source settings, resolved from the built-in tables plus operator
/// overrides. Passed explicitly through the pipeline; there is no global
/// mutable registry.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    enabled: FxHashMap<ProvenanceTag, bool>,
    priority: FxHashMap<ProvenanceTag, u32>,
    confidence: FxHashMap<ProvenanceTag, f64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: FxHashMap::default(),
            priority: FxHashMap::default(),
            confidence: FxHashMap::default(),
        }
    }
}

impl SourceConfig {
    pub fn enabled(&self, tag: ProvenanceTag) -> bool {
        self.enabled.get(&tag).copied().unwrap_or(true)
    }

    pub fn priority(&self, tag: ProvenanceTag) -> u32 {
        self.priority
            .get(&tag)
            .copied()
            .unwrap_or_else(|| tag.default_priority())
    }

    pub fn confidence(&self, tag: ProvenanceTag) -> f64 {
        self.confidence
            .get(&tag)
            .copied()
            .unwrap_or_else(|| tag.default_confidence())
    }

    pub fn set_enabled(&mut self, tag: ProvenanceTag, on: bool) {
        self.enabled.insert(tag, on);
    }

    pub fn set_priority(&mut self, tag: ProvenanceTag, priority: u32) {
        self.priority.insert(tag, priority);
    }

    pub fn set_confidence(&mut self, tag: ProvenanceTag, confidence: f64) {
        self.confidence.insert(tag, confidence.clamp(0.0, 1.0));
    }
}

/// Options recognized by the pipeline orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub wiki_top_n: usize,
    pub sources: SourceConfig,
    pub force: bool,
    pub from_stage: Option<String>,
    pub progress_every: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            wiki_top_n: DEFAULT_WIKI_TOP_N,
            sources: SourceConfig::default(),
            force: false,
            from_stage: None,
            progress_every: PROGRESS_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_config_falls_back_to_table_defaults() {
        let cfg = SourceConfig::default();
        assert!(cfg.enabled(ProvenanceTag::EnWiktionaryVia));
        assert_eq!(cfg.priority(ProvenanceTag::IoWiktionary), 100);
        assert_eq!(cfg.confidence(ProvenanceTag::Wikidata), 0.6);
    }

    #[test]
    fn overrides_take_precedence() {
        let mut cfg = SourceConfig::default();
        cfg.set_enabled(ProvenanceTag::EnWiktionaryVia, false);
        cfg.set_priority(ProvenanceTag::Wikidata, 95);
        cfg.set_confidence(ProvenanceTag::IoWikipedia, 0.5);

        assert!(!cfg.enabled(ProvenanceTag::EnWiktionaryVia));
        assert_eq!(cfg.priority(ProvenanceTag::Wikidata), 95);
        assert_eq!(cfg.confidence(ProvenanceTag::IoWikipedia), 0.5);
        // untouched sources keep their defaults
        assert!(cfg.enabled(ProvenanceTag::IoWiktionary));
    }

    #[test]
    fn confidence_override_is_clamped() {
        let mut cfg = SourceConfig::default();
        cfg.set_confidence(ProvenanceTag::Wikidata, 1.7);
        assert_eq!(cfg.confidence(ProvenanceTag::Wikidata), 1.0);
    }
}
