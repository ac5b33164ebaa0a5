use crate::config::PipelineConfig;
use crate::dump::DumpReader;
use crate::wikitext::strip_templates;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

static REF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<ref[^>]*>.*?</ref>").unwrap());
static FILE_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\[\[(?:File|Image|Fajlo|Dosiero|Arkivo):[^\]]*\]\]").unwrap()
});
static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[(?:[^\]|]*\|)?([^\]]+)\]\]").unwrap());
static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Pages are tokenized in parallel batches of this size; counting is
/// commutative so the ranked output stays deterministic.
const BATCH_SIZE: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencyItem {
    pub token: String,
    pub count: u64,
    pub rank: usize,
}

/// Ranked token-frequency list over the Ido Wikipedia article text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrequencyList {
    pub items: Vec<FrequencyItem>,
}

impl FrequencyList {
    /// 1-based rank, or None when the token never occurs.
    pub fn rank_of(&self, token: &str) -> Option<usize> {
        let lower = token.to_lowercase();
        self.items.iter().find(|i| i.token == lower).map(|i| i.rank)
    }

    /// True when any whitespace-separated token of `lemma` ranks in the
    /// top `n`.
    pub fn lemma_within_top(&self, lemma: &str, n: usize) -> bool {
        lemma
            .split_whitespace()
            .any(|t| self.rank_of(t).map(|r| r <= n).unwrap_or(false))
    }

    /// token → rank lookup for hot paths (the frequency gate checks every
    /// Wikipedia-only lemma).
    pub fn rank_map(&self) -> FxHashMap<String, usize> {
        self.items
            .iter()
            .map(|i| (i.token.clone(), i.rank))
            .collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let file = File::create(&tmp)
            .with_context(|| format!("failed to create {}", tmp.display()))?;
        serde_json::to_writer(BufWriter::new(file), self)
            .context("failed to serialize frequency list")?;
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to rename frequency list to {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open frequency list: {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file)).context("failed to parse frequency list")
    }
}

/// Plain text of a page: refs, templates, file links, markup and tags
/// removed, link display text kept.
pub fn strip_wikitext(text: &str) -> String {
    let mut t = REF_RE.replace_all(text, " ").into_owned();
    t = strip_templates(&t);
    t = FILE_LINK_RE.replace_all(&t, " ").into_owned();
    t = LINK_RE.replace_all(&t, "$1").into_owned();
    HTML_TAG_RE.replace_all(&t, " ").into_owned()
}

/// Lowercased word tokens of length ≥ 2.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() {
            current.extend(c.to_lowercase());
        } else if !current.is_empty() {
            if current.chars().count() >= 2 {
                tokens.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
    }
    if current.chars().count() >= 2 {
        tokens.push(current);
    }
    tokens
}

fn count_batch(batch: &[String]) -> FxHashMap<String, u64> {
    let mut counts = FxHashMap::default();
    for text in batch {
        for token in tokenize(&strip_wikitext(text)) {
            *counts.entry(token).or_insert(0) += 1;
        }
    }
    counts
}

/// Builds the ranked frequency list from an Ido Wikipedia pages dump.
pub fn build_frequency(dump_path: &Path, cfg: &PipelineConfig) -> Result<FrequencyList> {
    let mut counts: FxHashMap<String, u64> = FxHashMap::default();
    let mut batch: Vec<String> = Vec::with_capacity(BATCH_SIZE);
    let mut pages: u64 = 0;

    let flush = |batch: &mut Vec<String>, counts: &mut FxHashMap<String, u64>| {
        if batch.is_empty() {
            return;
        }
        let chunks: Vec<&[String]> = batch.chunks(BATCH_SIZE / 8 + 1).collect();
        let partials: Vec<FxHashMap<String, u64>> =
            chunks.par_iter().map(|c| count_batch(c)).collect();
        for partial in partials {
            for (token, n) in partial {
                *counts.entry(token).or_insert(0) += n;
            }
        }
        batch.clear();
    };

    for page in DumpReader::open(dump_path, false)? {
        pages += 1;
        batch.push(page.text);
        if batch.len() >= BATCH_SIZE {
            flush(&mut batch, &mut counts);
        }
        if pages % cfg.progress_every == 0 {
            info!(pages, tokens = counts.len(), "frequency progress");
        }
    }
    flush(&mut batch, &mut counts);

    // rank by (-count, token) for a total, stable order
    let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
    ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let items = ranked
        .into_iter()
        .enumerate()
        .map(|(i, (token, count))| FrequencyItem {
            token,
            count,
            rank: i + 1,
        })
        .collect();

    info!(pages, "frequency list built");
    Ok(FrequencyList { items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn strip_wikitext_removes_markup() {
        let text = "{{Infobox|x=1}} La [[hundo|hundi]] esas <b>bona</b>. <ref>src</ref>";
        let plain = strip_wikitext(text);
        assert!(plain.contains("hundi"));
        assert!(!plain.contains("Infobox"));
        assert!(!plain.contains("<b>"));
        assert!(!plain.contains("src"));
    }

    #[test]
    fn tokenize_lowercases_and_drops_short() {
        let tokens = tokenize("La Hundo e la kato!");
        assert_eq!(tokens, vec!["la", "hundo", "la", "kato"]);
    }

    #[test]
    fn tokenize_keeps_unicode_letters() {
        let tokens = tokenize("ĉevalo ŝtono");
        assert_eq!(tokens, vec!["ĉevalo", "ŝtono"]);
    }

    #[test]
    fn build_ranks_by_count_then_token() {
        let xml = r#"<mediawiki>
            <page><title>pagino</title><ns>0</ns><id>1</id>
                <revision><text>hundo hundo kato arboro arboro</text></revision></page>
        </mediawiki>"#;
        let tmp = crate::dump::write_bz2_xml(xml);
        let freq = build_frequency(tmp.path(), &PipelineConfig::default()).unwrap();

        // counts: arboro=2, hundo=2, kato=1; ties break lexicographically
        assert_eq!(freq.items[0].token, "arboro");
        assert_eq!(freq.items[0].rank, 1);
        assert_eq!(freq.items[1].token, "hundo");
        assert_eq!(freq.items[2].token, "kato");
    }

    #[test]
    fn rank_lookup_and_top_n() {
        let freq = FrequencyList {
            items: vec![
                FrequencyItem { token: "la".to_string(), count: 100, rank: 1 },
                FrequencyItem { token: "acensilo".to_string(), count: 5, rank: 2 },
            ],
        };
        assert_eq!(freq.rank_of("LA"), Some(1));
        assert_eq!(freq.rank_of("nekonata"), None);
        assert!(freq.lemma_within_top("acensilo", 2));
        assert!(!freq.lemma_within_top("acensilo", 1));
        assert!(freq.lemma_within_top("la acensilo", 1));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frequency.json");
        let freq = FrequencyList {
            items: vec![FrequencyItem { token: "la".to_string(), count: 9, rank: 1 }],
        };
        freq.save(&path).unwrap();
        let back = FrequencyList::load(&path).unwrap();
        assert_eq!(back.items.len(), 1);
        assert_eq!(back.items[0].token, "la");
    }
}
