use crate::clean::{is_valid_lemma_with, is_valid_term};
use crate::config::PipelineConfig;
use crate::frequency::FrequencyList;
use crate::models::{ConflictRecord, Entry, Lang, Pos, ProvenanceTag};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterStats {
    pub dropped_invalid_schema: u64,
    pub dropped_bad_lemma: u64,
    pub dropped_wikipedia_low_freq: u64,
    pub dropped_duplicates: u64,
    pub translations_removed: u64,
    pub entries_kept_monolingual: u64,
}

pub struct FilterOutcome {
    pub entries: Vec<Entry>,
    pub stats: FilterStats,
    pub conflicts: Vec<ConflictRecord>,
    /// bounded sample of rejected items for the statistics report
    pub suspicious: Vec<String>,
}

const SUSPICIOUS_LIMIT: usize = 2000;

fn schema_ok(entry: &Entry) -> bool {
    if entry.lemma.is_empty() || entry.provenance.is_empty() {
        return false;
    }
    entry.senses.iter().all(|s| {
        s.translations
            .iter()
            .all(|t| !t.sources.is_empty() && (0.0..=1.0).contains(&t.confidence))
    })
}

fn is_wikipedia_only(entry: &Entry) -> bool {
    entry.provenance.len() == 1 && entry.provenance.contains(&ProvenanceTag::IoWikipedia)
}

/// Signature for duplicate removal: identical headword plus identical
/// translation sets reduce to the first-seen entry.
fn dup_signature(entry: &Entry) -> (Lang, String, Pos, Vec<(Lang, String)>) {
    let mut terms: BTreeSet<(Lang, String)> = BTreeSet::new();
    for sense in &entry.senses {
        for t in &sense.translations {
            terms.insert((t.lang, t.term.clone()));
        }
    }
    (
        entry.language,
        entry.lemma.clone(),
        entry.pos,
        terms.into_iter().collect(),
    )
}

/// Enforces the schema invariants, the Wikipedia-only frequency gate, and
/// duplicate removal. Ido entries that lose every translation stay in the
/// output with empty senses for the monolingual dictionary.
pub fn apply_filters(
    entries: Vec<Entry>,
    freq: &FrequencyList,
    cfg: &PipelineConfig,
) -> FilterOutcome {
    let mut stats = FilterStats::default();
    let mut conflicts = Vec::new();
    let mut suspicious = Vec::new();
    let ranks = freq.rank_map();
    let top_n = cfg.wiki_top_n;

    let push_suspicious = |suspicious: &mut Vec<String>, line: String| {
        if suspicious.len() < SUSPICIOUS_LIMIT {
            suspicious.push(line);
        }
    };

    let mut seen: FxHashSet<(Lang, String, Pos, Vec<(Lang, String)>)> = FxHashSet::default();
    let mut out = Vec::with_capacity(entries.len());

    for mut entry in entries {
        if !schema_ok(&entry) {
            stats.dropped_invalid_schema += 1;
            continue;
        }

        let allow_acronym = entry.pos == Pos::ProperNoun;
        if !is_valid_lemma_with(&entry.lemma, allow_acronym) {
            stats.dropped_bad_lemma += 1;
            push_suspicious(&mut suspicious, format!("bad_lemma: {}", entry.lemma));
            continue;
        }

        // frequency gate for entries attested only by Wikipedia links;
        // proper nouns are exempt
        if is_wikipedia_only(&entry) && !entry.is_proper_noun() {
            let within = entry
                .lemma
                .split_whitespace()
                .any(|t| ranks.get(&t.to_lowercase()).map(|r| *r <= top_n).unwrap_or(false));
            if !within {
                stats.dropped_wikipedia_low_freq += 1;
                push_suspicious(&mut suspicious, format!("wiki_low_freq: {}", entry.lemma));
                continue;
            }
        }

        // scrub translation terms that slipped through with markup
        let had_senses = !entry.senses.is_empty();
        let mut kept_senses = Vec::with_capacity(entry.senses.len());
        for mut sense in std::mem::take(&mut entry.senses) {
            let before = sense.translations.len();
            sense.translations.retain(|t| is_valid_term(&t.term));
            stats.translations_removed += (before - sense.translations.len()) as u64;
            if !sense.translations.is_empty() {
                kept_senses.push(sense);
            }
        }
        entry.senses = kept_senses;

        if had_senses && entry.senses.is_empty() {
            if entry.language == Lang::Io {
                stats.entries_kept_monolingual += 1;
            } else {
                continue;
            }
        }

        let sig = dup_signature(&entry);
        if !seen.insert(sig) {
            stats.dropped_duplicates += 1;
            conflicts.push(ConflictRecord::DuplicateTranslation {
                language: entry.language,
                lemma: entry.lemma.clone(),
                pos: entry.pos,
                term: entry
                    .senses
                    .first()
                    .and_then(|s| s.translations.first())
                    .map(|t| t.term.clone())
                    .unwrap_or_default(),
            });
            continue;
        }

        out.push(entry);
    }

    info!(
        kept = out.len(),
        bad_lemma = stats.dropped_bad_lemma,
        low_freq = stats.dropped_wikipedia_low_freq,
        duplicates = stats.dropped_duplicates,
        "filter complete"
    );

    FilterOutcome {
        entries: out,
        stats,
        conflicts,
        suspicious,
    }
}
