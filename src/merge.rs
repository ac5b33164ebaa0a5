use crate::config::SourceConfig;
use crate::models::{ConflictRecord, Entry, Lang, Morphology, ParadigmId, Pos, Sense, Translation};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeStats {
    pub input_entries: usize,
    pub output_entries: usize,
    pub senses_collapsed: u64,
    pub translations_merged: u64,
    pub conjugated_dropped: u64,
    pub pos_conflicts: u64,
}

pub struct MergeOutcome {
    pub entries: Vec<Entry>,
    pub conflicts: Vec<ConflictRecord>,
    pub stats: MergeStats,
}

/// Bucket key: proper nouns keep their case, everything else folds.
fn fold_lemma(lemma: &str, pos: Pos) -> String {
    if pos == Pos::ProperNoun {
        lemma.to_string()
    } else {
        lemma.to_lowercase()
    }
}

/// Signature that collapses equivalent senses: normalized gloss plus the
/// sorted lowercased translation terms by language.
fn sense_signature(sense: &Sense) -> (String, Vec<(Lang, String)>) {
    let gloss = sense
        .gloss
        .as_deref()
        .map(|g| g.trim().to_lowercase())
        .unwrap_or_default();
    let mut terms: Vec<(Lang, String)> = sense
        .translations
        .iter()
        .map(|t| (t.lang, t.term.to_lowercase()))
        .collect();
    terms.sort();
    terms.dedup();
    (gloss, terms)
}

struct Bucket {
    lemma: String,
    language: Lang,
    pos: Pos,
    senses: Vec<Sense>,
    sense_index: FxHashMap<(String, Vec<(Lang, String)>), usize>,
    provenance: BTreeSet<crate::models::ProvenanceTag>,
    // candidate paradigms with the priority of their best contributor
    paradigms: Vec<(ParadigmId, u32)>,
    original_lemma: Option<String>,
}

impl Bucket {
    fn new(entry: &Entry) -> Self {
        Self {
            lemma: entry.lemma.clone(),
            language: entry.language,
            pos: entry.pos,
            senses: Vec::new(),
            sense_index: FxHashMap::default(),
            provenance: BTreeSet::new(),
            paradigms: Vec::new(),
            original_lemma: entry.original_lemma.clone(),
        }
    }

    fn absorb(&mut self, entry: Entry, cfg: &SourceConfig, stats: &mut MergeStats) {
        self.provenance.extend(entry.provenance.iter().copied());
        if self.original_lemma.is_none() {
            self.original_lemma = entry.original_lemma.clone();
        }
        if let Some(p) = entry.morphology.paradigm {
            let priority = entry
                .provenance
                .iter()
                .map(|t| cfg.priority(*t))
                .max()
                .unwrap_or(0);
            self.paradigms.push((p, priority));
        }

        let proper = entry.is_proper_noun();
        for sense in entry.senses {
            let sig = sense_signature(&sense);
            match self.sense_index.get(&sig) {
                Some(&idx) => {
                    stats.senses_collapsed += 1;
                    let target = &mut self.senses[idx];
                    for t in sense.translations {
                        merge_translation(target, t, proper, cfg, stats);
                    }
                }
                None => {
                    let mut fresh = Sense {
                        sense_id: sense.sense_id.clone(),
                        gloss: sense.gloss.clone(),
                        translations: Vec::new(),
                    };
                    for t in sense.translations {
                        merge_translation(&mut fresh, t, proper, cfg, stats);
                    }
                    self.sense_index.insert(sig, self.senses.len());
                    self.senses.push(fresh);
                }
            }
        }
    }

    /// Highest-priority paradigm; ties break on the lexicographic id.
    /// Rejected alternatives become conflict records.
    fn resolve_paradigm(&self, conflicts: &mut Vec<ConflictRecord>) -> Option<ParadigmId> {
        let mut candidates = self.paradigms.clone();
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        let kept = candidates[0].0;
        for (p, _) in &candidates[1..] {
            if *p != kept {
                conflicts.push(ConflictRecord::ParadigmConflict {
                    language: self.language,
                    lemma: self.lemma.clone(),
                    pos: self.pos,
                    kept,
                    rejected: *p,
                });
            }
        }
        Some(kept)
    }

    fn into_entry(mut self, conflicts: &mut Vec<ConflictRecord>) -> Entry {
        let paradigm = self.resolve_paradigm(conflicts);
        for sense in &mut self.senses {
            sense
                .translations
                .sort_by(|a, b| a.lang.cmp(&b.lang).then_with(|| a.term.cmp(&b.term)));
        }
        Entry {
            lemma: self.lemma,
            language: self.language,
            pos: self.pos,
            senses: self.senses,
            morphology: Morphology { paradigm },
            provenance: self.provenance,
            original_lemma: self.original_lemma,
        }
    }
}

/// Merge one translation into a sense: union of sources, confidence is the
/// max over contributing sources' configured values (no averaging). Case-only
/// variants canonicalize to lowercase; proper-noun entries keep the
/// title-cased form they were attested with.
fn merge_translation(
    sense: &mut Sense,
    incoming: Translation,
    proper_contributor: bool,
    cfg: &SourceConfig,
    stats: &mut MergeStats,
) {
    let key_term = incoming.term.to_lowercase();
    let existing = sense
        .translations
        .iter_mut()
        .find(|t| t.lang == incoming.lang && t.term.to_lowercase() == key_term);

    match existing {
        Some(t) => {
            stats.translations_merged += 1;
            if t.term != incoming.term && !proper_contributor {
                // case-only variants of common words canonicalize down
                t.term = key_term;
            }
            t.sources.extend(incoming.sources.iter().copied());
            let best = t
                .sources
                .iter()
                .map(|s| cfg.confidence(*s))
                .fold(f64::MIN, f64::max);
            t.confidence = t.confidence.max(incoming.confidence).max(best).min(1.0);
        }
        None => sense.translations.push(incoming),
    }
}

/// Deterministic multi-source merge keyed by `(language, lemma, pos)`.
pub fn merge_entries(entries: Vec<Entry>, cfg: &SourceConfig) -> MergeOutcome {
    let mut stats = MergeStats {
        input_entries: entries.len(),
        ..Default::default()
    };
    let mut conflicts: Vec<ConflictRecord> = Vec::new();

    // POS-less evidence (pivot pairs, langlinks) adopts the lemma's POS
    // when every POS-bearing contributor agrees on one; with zero or
    // several known POS it stays its own `unknown` entry
    let mut known_pos: FxHashMap<(Lang, String), BTreeSet<Pos>> = FxHashMap::default();
    for entry in &entries {
        if entry.pos != Pos::Unknown {
            known_pos
                .entry((entry.language, entry.lemma.to_lowercase()))
                .or_default()
                .insert(entry.pos);
        }
    }
    let entries: Vec<Entry> = entries
        .into_iter()
        .map(|mut entry| {
            if entry.pos == Pos::Unknown {
                let key = (entry.language, entry.lemma.to_lowercase());
                if let Some(set) = known_pos.get(&key) {
                    if set.len() == 1 {
                        entry.pos = *set.iter().next().unwrap();
                    }
                }
            }
            entry
        })
        .collect();

    let mut buckets: FxHashMap<(Lang, String, Pos), Bucket> = FxHashMap::default();
    buckets.reserve(entries.len());

    for entry in entries {
        let key = (
            entry.language,
            fold_lemma(&entry.lemma, entry.pos),
            entry.pos,
        );
        buckets
            .entry(key)
            .or_insert_with(|| Bucket::new(&entry))
            .absorb(entry, cfg, &mut stats);
    }

    // infinitive set for conjugated-form suppression
    let infinitives: FxHashSet<(Lang, String)> = buckets
        .keys()
        .filter(|(_, lemma, _)| lemma.ends_with("ar"))
        .map(|(lang, lemma, _)| (*lang, lemma.clone()))
        .collect();

    // group POS sets per lemma to detect conflicts and conjugated noise
    let mut pos_by_lemma: FxHashMap<(Lang, String), Vec<Pos>> = FxHashMap::default();
    for (lang, lemma, pos) in buckets.keys() {
        pos_by_lemma
            .entry((*lang, lemma.clone()))
            .or_default()
            .push(*pos);
    }

    let mut dropped: FxHashSet<(Lang, String)> = FxHashSet::default();
    for ((lang, lemma), pos_set) in &pos_by_lemma {
        if *lang != Lang::Io {
            continue;
        }
        if let Some(root) = conjugated_root(lemma) {
            let infinitive = format!("{root}ar");
            let all_verbal = pos_set
                .iter()
                .all(|p| matches!(p, Pos::Verb | Pos::Unknown));
            if all_verbal && infinitives.contains(&(*lang, infinitive)) {
                dropped.insert((*lang, lemma.clone()));
                stats.conjugated_dropped += 1;
            }
        }
    }

    for ((lang, lemma), pos_set) in &pos_by_lemma {
        if dropped.contains(&(*lang, lemma.clone())) {
            continue;
        }
        // unknown-POS leftovers are not conflicts, just unresolved evidence
        let distinct: BTreeSet<Pos> = pos_set
            .iter()
            .copied()
            .filter(|p| *p != Pos::Unknown)
            .collect();
        if distinct.len() > 1 {
            stats.pos_conflicts += 1;
            conflicts.push(ConflictRecord::PosConflict {
                language: *lang,
                lemma: lemma.clone(),
                pos: distinct.into_iter().collect(),
            });
        }
    }

    let mut out: Vec<Entry> = buckets
        .into_iter()
        .filter(|((lang, lemma, _), _)| !dropped.contains(&(*lang, lemma.clone())))
        .map(|(_, bucket)| bucket.into_entry(&mut conflicts))
        .collect();

    out.sort_by(|a, b| {
        a.language
            .cmp(&b.language)
            .then_with(|| a.lemma.cmp(&b.lemma))
            .then_with(|| a.pos.cmp(&b.pos))
    });
    conflicts.sort_by(|a, b| format!("{a:?}").cmp(&format!("{b:?}")));

    stats.output_entries = out.len();
    info!(
        input = stats.input_entries,
        output = stats.output_entries,
        pos_conflicts = stats.pos_conflicts,
        conjugated_dropped = stats.conjugated_dropped,
        "merge complete"
    );

    MergeOutcome {
        entries: out,
        conflicts,
        stats,
    }
}

/// Root of an apparently conjugated Ido verb form, if the lemma ends in a
/// tense suffix and is long enough to have one.
fn conjugated_root(lemma: &str) -> Option<&str> {
    if lemma.chars().count() <= 3 {
        return None;
    }
    for suffix in ["as", "is", "os", "us", "ez"] {
        if let Some(root) = lemma.strip_suffix(suffix) {
            return Some(root);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProvenanceTag;

    fn entry_with(
        lemma: &str,
        pos: Pos,
        source: ProvenanceTag,
        term: &str,
    ) -> Entry {
        let mut e = Entry::new(lemma, Lang::Io, pos, source);
        e.senses.push(Sense {
            sense_id: None,
            gloss: None,
            translations: vec![Translation::new(term, Lang::Eo, source)],
        });
        e
    }

    #[test]
    fn same_translation_from_two_sources_unions_and_takes_max_confidence() {
        let a = entry_with("banko", Pos::Noun, ProvenanceTag::IoWiktionary, "banko");
        let b = entry_with("banko", Pos::Noun, ProvenanceTag::EnWiktionaryVia, "banko");

        let out = merge_entries(vec![a, b], &SourceConfig::default());
        assert_eq!(out.entries.len(), 1);
        let t = &out.entries[0].senses[0].translations[0];
        assert_eq!(t.term, "banko");
        assert_eq!(t.confidence, 1.0);
        assert!(t.sources.contains(&ProvenanceTag::IoWiktionary));
        assert!(t.sources.contains(&ProvenanceTag::EnWiktionaryVia));
    }

    #[test]
    fn different_pos_stays_separate_and_is_reported() {
        let a = entry_with("stulo", Pos::Noun, ProvenanceTag::IoWiktionary, "seĝo");
        let b = entry_with("stulo", Pos::ProperNoun, ProvenanceTag::IoWikipedia, "Stulo");

        let out = merge_entries(vec![a, b], &SourceConfig::default());
        assert_eq!(out.entries.len(), 2);
        assert_eq!(out.stats.pos_conflicts, 1);
        assert!(matches!(
            &out.conflicts[..],
            [ConflictRecord::PosConflict { lemma, .. }] if lemma == "stulo"
        ));
    }

    #[test]
    fn lemma_case_folds_for_common_words() {
        let a = entry_with("Hundo", Pos::Noun, ProvenanceTag::IoWikipedia, "hundo");
        let b = entry_with("hundo", Pos::Noun, ProvenanceTag::IoWiktionary, "hundo");

        let out = merge_entries(vec![a, b], &SourceConfig::default());
        assert_eq!(out.entries.len(), 1);
        // first-seen casing survives in the output
        assert_eq!(out.entries[0].lemma, "Hundo");
        assert_eq!(out.entries[0].provenance.len(), 2);
    }

    #[test]
    fn proper_nouns_do_not_fold_case() {
        let a = entry_with("Parizo", Pos::ProperNoun, ProvenanceTag::IoWikipedia, "Parizo");
        let b = entry_with("parizo", Pos::ProperNoun, ProvenanceTag::IoWiktionary, "Parizo");

        let out = merge_entries(vec![a, b], &SourceConfig::default());
        assert_eq!(out.entries.len(), 2);
    }

    #[test]
    fn sense_signature_collapses_duplicate_senses() {
        let a = entry_with("domo", Pos::Noun, ProvenanceTag::IoWiktionary, "domo");
        let b = entry_with("domo", Pos::Noun, ProvenanceTag::EoWiktionary, "domo");

        let out = merge_entries(vec![a, b], &SourceConfig::default());
        assert_eq!(out.entries[0].senses.len(), 1);
        assert_eq!(out.stats.senses_collapsed, 1);
    }

    #[test]
    fn distinct_senses_are_appended_in_order() {
        let mut a = Entry::new("abasar", Lang::Io, Pos::Verb, ProvenanceTag::IoWiktionary);
        a.senses.push(Sense {
            sense_id: Some("1".to_string()),
            gloss: None,
            translations: vec![Translation::new("madaldama", Lang::Eo, ProvenanceTag::IoWiktionary)],
        });
        a.senses.push(Sense {
            sense_id: Some("2".to_string()),
            gloss: None,
            translations: vec![Translation::new("malaltigi", Lang::Eo, ProvenanceTag::IoWiktionary)],
        });

        let out = merge_entries(vec![a], &SourceConfig::default());
        assert_eq!(out.entries[0].senses.len(), 2);
        assert_eq!(out.entries[0].senses[0].sense_id.as_deref(), Some("1"));
        assert_eq!(out.entries[0].senses[1].sense_id.as_deref(), Some("2"));
    }

    #[test]
    fn paradigm_conflict_resolved_by_priority() {
        let mut a = entry_with("vorto", Pos::Noun, ProvenanceTag::IoWikipedia, "vorto");
        a.morphology.paradigm = Some(ParadigmId::NpNp);
        let mut b = entry_with("vorto", Pos::Noun, ProvenanceTag::IoWiktionary, "vorto");
        b.morphology.paradigm = Some(ParadigmId::ON);

        let out = merge_entries(vec![a, b], &SourceConfig::default());
        // io_wiktionary (100) outranks io_wikipedia (50)
        assert_eq!(out.entries[0].morphology.paradigm, Some(ParadigmId::ON));
        assert!(out
            .conflicts
            .iter()
            .any(|c| matches!(c, ConflictRecord::ParadigmConflict { kept: ParadigmId::ON, .. })));
    }

    #[test]
    fn conjugated_form_dropped_when_infinitive_exists() {
        let inf = entry_with("abasar", Pos::Verb, ProvenanceTag::IoWiktionary, "malaltigi");
        let conj = entry_with("abasis", Pos::Verb, ProvenanceTag::EoWiktionary, "malaltigis");

        let out = merge_entries(vec![inf, conj], &SourceConfig::default());
        assert_eq!(out.entries.len(), 1);
        assert_eq!(out.entries[0].lemma, "abasar");
        assert_eq!(out.stats.conjugated_dropped, 1);
    }

    #[test]
    fn conjugated_form_kept_when_non_verb_pos_attested() {
        let inf = entry_with("abasar", Pos::Verb, ProvenanceTag::IoWiktionary, "malaltigi");
        let noun = entry_with("abasis", Pos::Noun, ProvenanceTag::IoWiktionary, "io");

        let out = merge_entries(vec![inf, noun], &SourceConfig::default());
        assert_eq!(out.entries.len(), 2);
        assert_eq!(out.stats.conjugated_dropped, 0);
    }

    #[test]
    fn output_is_sorted_and_translations_ordered() {
        let a = entry_with("zebro", Pos::Noun, ProvenanceTag::IoWiktionary, "zebro");
        let mut b = Entry::new("arboro", Lang::Io, Pos::Noun, ProvenanceTag::IoWiktionary);
        b.senses.push(Sense {
            sense_id: None,
            gloss: None,
            translations: vec![
                Translation::new("trunko", Lang::Eo, ProvenanceTag::IoWiktionary),
                Translation::new("arbo", Lang::Eo, ProvenanceTag::IoWiktionary),
            ],
        });

        let out = merge_entries(vec![a, b], &SourceConfig::default());
        assert_eq!(out.entries[0].lemma, "arboro");
        assert_eq!(out.entries[1].lemma, "zebro");
        let terms: Vec<_> = out.entries[0].senses[0]
            .translations
            .iter()
            .map(|t| t.term.as_str())
            .collect();
        assert_eq!(terms, vec!["arbo", "trunko"]);
    }

    #[test]
    fn unknown_pos_adopts_the_unique_known_pos() {
        let known = entry_with("banko", Pos::Noun, ProvenanceTag::IoWiktionary, "banko");
        let unknown = entry_with("banko", Pos::Unknown, ProvenanceTag::EnWiktionaryVia, "banko");

        let out = merge_entries(vec![known, unknown], &SourceConfig::default());
        assert_eq!(out.entries.len(), 1);
        assert_eq!(out.entries[0].pos, Pos::Noun);
        assert!(out.entries[0].provenance.contains(&ProvenanceTag::EnWiktionaryVia));
        assert!(out.conflicts.is_empty());
    }

    #[test]
    fn unknown_pos_stays_separate_with_ambiguous_known_pos() {
        let noun = entry_with("valo", Pos::Noun, ProvenanceTag::IoWiktionary, "valo");
        let verb = entry_with("valo", Pos::Verb, ProvenanceTag::EoWiktionary, "vali");
        let unknown = entry_with("valo", Pos::Unknown, ProvenanceTag::EnWiktionaryVia, "valo");

        let out = merge_entries(vec![noun, verb, unknown], &SourceConfig::default());
        assert_eq!(out.entries.len(), 3);
        // noun vs verb is a conflict; the unresolved entry is not
        assert_eq!(out.stats.pos_conflicts, 1);
    }

    #[test]
    fn merge_is_idempotent() {
        let a = entry_with("banko", Pos::Noun, ProvenanceTag::IoWiktionary, "banko");
        let b = entry_with("banko", Pos::Noun, ProvenanceTag::EnWiktionaryVia, "banko");
        let c = entry_with("stulo", Pos::Noun, ProvenanceTag::IoWiktionary, "seĝo");

        let cfg = SourceConfig::default();
        let once = merge_entries(vec![a, b, c], &cfg);
        let twice = merge_entries(once.entries.clone(), &cfg);
        assert_eq!(once.entries, twice.entries);
    }

    #[test]
    fn confidence_override_flows_through() {
        let mut cfg = SourceConfig::default();
        cfg.set_confidence(ProvenanceTag::IoWiktionary, 0.4);
        // incoming translation already carries 0.4 when parsed under the
        // override; simulate that here
        let mut e = Entry::new("kato", Lang::Io, Pos::Noun, ProvenanceTag::IoWiktionary);
        let mut t = Translation::new("kato", Lang::Eo, ProvenanceTag::IoWiktionary);
        t.confidence = 0.4;
        e.senses.push(Sense { sense_id: None, gloss: None, translations: vec![t] });

        let out = merge_entries(vec![e], &cfg);
        assert_eq!(out.entries[0].senses[0].translations[0].confidence, 0.4);
    }
}
