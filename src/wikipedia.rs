use crate::cache;
use crate::clean::{clean_term, is_valid_lemma_with, is_valid_term};
use crate::config::PipelineConfig;
use crate::dump::DumpReader;
use crate::langlinks::{resolve_links, LanglinkReader};
use crate::models::{Entry, Lang, ParadigmId, Pos, ProvenanceTag, Sense, Translation};
use crate::wikitext::extract_categories;
use anyhow::Result;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::Path;
use tracing::info;

/// Category-derived classification of a Wikipedia title. Proper-noun
/// classes get POS `proper-noun`; the rest fall back to morphotactics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Vocabulary,
    Geography,
    People,
    Organization,
    Temporal,
    Unknown,
}

impl Classification {
    pub fn is_proper_noun(&self) -> bool {
        matches!(
            self,
            Classification::Geography
                | Classification::People
                | Classification::Organization
                | Classification::Temporal
        )
    }
}

const GEOGRAPHY_KEYWORDS: [&str; 10] = [
    "urbi", "urbo", "landi", "lando", "insuli", "insulo", "riveri", "monti", "geografio",
    "komuni",
];
const PEOPLE_KEYWORDS: [&str; 6] = [
    "personi", "biografio", "naskinti", "mortinti", "skripteri", "politikisti",
];
const ORGANIZATION_KEYWORDS: [&str; 4] = ["organizuri", "kompanii", "instituci", "universitati"];
const TEMPORAL_KEYWORDS: [&str; 4] = ["yari", "monati", "dii", "kalendario"];
const VOCABULARY_KEYWORDS: [&str; 4] = ["linguo", "gramatiko", "vorti", "cienco"];

/// Classify a title from its category links. The first matching class in
/// priority order wins; titles without informative categories are Unknown.
pub fn classify_categories(categories: &[String]) -> Classification {
    let lower: Vec<String> = categories.iter().map(|c| c.to_lowercase()).collect();
    let matches = |keys: &[&str]| lower.iter().any(|c| keys.iter().any(|k| c.contains(k)));

    if matches(&PEOPLE_KEYWORDS) {
        Classification::People
    } else if matches(&GEOGRAPHY_KEYWORDS) {
        Classification::Geography
    } else if matches(&ORGANIZATION_KEYWORDS) {
        Classification::Organization
    } else if matches(&TEMPORAL_KEYWORDS) {
        Classification::Temporal
    } else if matches(&VOCABULARY_KEYWORDS) {
        Classification::Vocabulary
    } else {
        Classification::Unknown
    }
}

/// POS from Ido word endings, for titles the categories call ordinary
/// vocabulary. Nouns are the default; Wikipedia titles are mostly nominal.
pub fn pos_from_morphotactics(lemma: &str) -> Pos {
    let lower = lemma.to_lowercase();
    if lower.ends_with("ar") || lower.ends_with("ir") || lower.ends_with("or") {
        Pos::Verb
    } else if lower.ends_with('a') {
        Pos::Adjective
    } else if lower.ends_with('e') {
        Pos::Adverb
    } else {
        Pos::Noun
    }
}

/// Streams the pages dump once, collecting category classifications for the
/// wanted titles only.
pub fn collect_classifications(
    dump_path: &Path,
    wanted: &FxHashSet<String>,
    progress_every: u64,
) -> Result<FxHashMap<String, Classification>> {
    let mut out = FxHashMap::default();
    let mut pages: u64 = 0;
    for page in DumpReader::open(dump_path, false)? {
        pages += 1;
        if pages % progress_every == 0 {
            info!(pages, classified = out.len(), "classification progress");
        }
        if !wanted.contains(&page.title) {
            continue;
        }
        let cats = extract_categories(&page.text);
        out.insert(page.title, classify_categories(&cats));
    }
    Ok(out)
}

/// Builds Ido entries from the Wikipedia langlinks: each linked article
/// becomes one IO entry whose single sense carries the Esperanto title.
pub fn build_vocab(
    pages_dump: &Path,
    langlinks_dump: &Path,
    work_dir: &Path,
    cfg: &PipelineConfig,
) -> Result<Vec<Entry>> {
    let index = cache::build_or_load(pages_dump, work_dir)?;
    info!(pages = index.len(), "title index ready");

    let rows = LanglinkReader::open(langlinks_dump)?;
    let pairs = resolve_links(rows, &index);
    info!(pairs = pairs.len(), "io→eo langlinks resolved");

    let wanted: FxHashSet<String> = pairs.iter().map(|(io, _)| io.clone()).collect();
    let classifications = collect_classifications(pages_dump, &wanted, cfg.progress_every)?;

    let confidence = cfg.sources.confidence(ProvenanceTag::IoWikipedia);
    let mut entries = Vec::with_capacity(pairs.len());
    for (io_title, eo_title) in pairs {
        let classification = classifications
            .get(&io_title)
            .copied()
            .unwrap_or(Classification::Unknown);
        if let Some(entry) = vocab_entry(&io_title, &eo_title, classification, confidence) {
            entries.push(entry);
        }
    }

    info!(entries = entries.len(), "wikipedia vocabulary built");
    Ok(entries)
}

/// One Wikipedia-derived entry, or None when the title fails validation.
pub fn vocab_entry(
    io_title: &str,
    eo_title: &str,
    classification: Classification,
    confidence: f64,
) -> Option<Entry> {
    let lemma = clean_term(io_title);
    let allow_acronym = classification == Classification::Organization;
    if !is_valid_lemma_with(&lemma, allow_acronym) {
        return None;
    }

    let (pos, paradigm) = if classification.is_proper_noun() {
        (Pos::ProperNoun, Some(ParadigmId::NpNp))
    } else {
        (pos_from_morphotactics(&lemma), None)
    };

    let mut entry = Entry::new(lemma.clone(), Lang::Io, pos, ProvenanceTag::IoWikipedia);
    entry.morphology.paradigm = paradigm;
    if lemma != io_title {
        entry.original_lemma = Some(io_title.to_string());
    }

    let eo = clean_term(eo_title);
    if is_valid_term(&eo) {
        let mut t = Translation::new(eo, Lang::Eo, ProvenanceTag::IoWikipedia);
        t.confidence = confidence;
        entry.senses.push(Sense {
            sense_id: None,
            gloss: None,
            translations: vec![t],
        });
    }
    Some(entry)
}
