use crate::config::PipelineConfig;
use crate::dump::DumpReader;
use crate::models::{Entry, Lang, Pos, ProvenanceTag, Sense, Translation};
use crate::wikitext::SourceLang;
use crate::wiktionary::{PivotBlock, WiktionaryParser};
use anyhow::Result;
use std::path::Path;
use tracing::info;

/// How IO/EO terms on a pivot page are paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViaMode {
    /// Both languages anywhere on the same pivot headword (English dumps).
    Cooccurrence,
    /// Both languages inside the same translation table (French dumps);
    /// semantically validated by the shared meaning label.
    SameMeaning,
}

impl ViaMode {
    pub fn tag(&self) -> ProvenanceTag {
        match self {
            ViaMode::Cooccurrence => ProvenanceTag::EnWiktionaryVia,
            ViaMode::SameMeaning => ProvenanceTag::FrWiktionaryMeaning,
        }
    }

    pub fn for_source(source: SourceLang) -> Option<ViaMode> {
        match source {
            SourceLang::En => Some(ViaMode::Cooccurrence),
            SourceLang::Fr => Some(ViaMode::SameMeaning),
            _ => None,
        }
    }
}

fn via_entry(
    io_term: &str,
    eo_terms: &[String],
    sense_id: String,
    gloss: Option<String>,
    tag: ProvenanceTag,
    confidence: f64,
) -> Entry {
    let translations = eo_terms
        .iter()
        .map(|eo| {
            let mut t = Translation::new(eo.clone(), Lang::Eo, tag);
            t.confidence = confidence;
            t
        })
        .collect();
    let mut entry = Entry::new(io_term, Lang::Io, Pos::Unknown, tag);
    entry.senses.push(Sense {
        sense_id: Some(sense_id),
        gloss,
        translations,
    });
    entry
}

/// IO-centred entries for one pivot page. Co-occurrence mode pools every
/// block on the page; same-meaning mode pairs only within a block.
pub fn entries_for_page(
    pivot: SourceLang,
    title: &str,
    blocks: &[PivotBlock],
    mode: ViaMode,
    confidence: f64,
) -> Vec<Entry> {
    let tag = mode.tag();
    let mut out = Vec::new();

    match mode {
        ViaMode::Cooccurrence => {
            let mut io_all: Vec<String> = Vec::new();
            let mut eo_all: Vec<String> = Vec::new();
            for b in blocks {
                for t in &b.io_terms {
                    if !io_all.contains(t) {
                        io_all.push(t.clone());
                    }
                }
                for t in &b.eo_terms {
                    if !eo_all.contains(t) {
                        eo_all.push(t.clone());
                    }
                }
            }
            if io_all.is_empty() || eo_all.is_empty() {
                return out;
            }
            let sense_id = format!("{}:{}", pivot.code(), title);
            for io_term in &io_all {
                out.push(via_entry(
                    io_term,
                    &eo_all,
                    sense_id.clone(),
                    Some(title.to_string()),
                    tag,
                    confidence,
                ));
            }
        }
        ViaMode::SameMeaning => {
            for (i, b) in blocks.iter().enumerate() {
                if b.io_terms.is_empty() || b.eo_terms.is_empty() {
                    continue;
                }
                let sense_id = format!("{}:{}#{}", pivot.code(), title, i + 1);
                for io_term in &b.io_terms {
                    out.push(via_entry(
                        io_term,
                        &b.eo_terms,
                        sense_id.clone(),
                        b.gloss.clone(),
                        tag,
                        confidence,
                    ));
                }
            }
        }
    }
    out
}

/// Streams a pivot-language dump and emits IO-centred via entries. Only the
/// current page's blocks live in memory; entries accumulate incrementally.
pub fn parse_via_dump(
    dump_path: &Path,
    source: SourceLang,
    cfg: &PipelineConfig,
) -> Result<Vec<Entry>> {
    let Some(mode) = ViaMode::for_source(source) else {
        return Ok(Vec::new());
    };
    let tag = mode.tag();
    let confidence = cfg.sources.confidence(tag);
    let parser = WiktionaryParser::new(source, Lang::Eo);

    let mut entries = Vec::new();
    let mut pages: u64 = 0;
    for page in DumpReader::open(dump_path, false)? {
        pages += 1;
        if pages % cfg.progress_every == 0 {
            info!(pages, entries = entries.len(), "via extraction progress");
        }
        // cheap rejection before the regex machinery runs
        if !page.text.contains("io|") && !page.text.contains("|io}}") {
            continue;
        }
        let blocks = parser.parse_pivot_page(&page.title, &page.text);
        if blocks.is_empty() {
            continue;
        }
        entries.extend(entries_for_page(source, &page.title, &blocks, mode, confidence));
    }

    info!(pages, entries = entries.len(), source = source.code(), "via extraction complete");
    Ok(entries)
}
