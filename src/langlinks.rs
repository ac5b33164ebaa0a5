use crate::dump::is_lexical_title;
use crate::index::TitleIndex;
use anyhow::{Context, Result};
use flate2::bufread::GzDecoder;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::warn;

// `INSERT INTO `langlinks` VALUES (123,'eo','Ĉevalo'),(124,'de','Pferd');`
// Values are single-quoted with backslash escapes for quotes/backslashes.
static TUPLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d+),'((?:[^'\\]|\\.)*)','((?:[^'\\]|\\.)*)'\)").unwrap());

/// One `eo` interlanguage link: the linking Ido page id and the Esperanto
/// article title it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanglinkRow {
    pub page_id: u32,
    pub eo_title: String,
}

fn unescape_sql(value: &str) -> String {
    if !value.contains('\\') {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Streaming reader over a gzipped `langlinks` SQL dump. Lines are consumed
/// one at a time and only `eo` rows are surfaced, so memory stays bounded by
/// the longest INSERT statement.
pub struct LanglinkReader {
    lines: std::io::Lines<BufReader<GzDecoder<BufReader<File>>>>,
    pending: VecDeque<LanglinkRow>,
}

impl LanglinkReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("could not open langlinks dump: {}", path.display()))?;
        let decoder = GzDecoder::new(BufReader::new(file));
        Ok(Self {
            lines: BufReader::new(decoder).lines(),
            pending: VecDeque::new(),
        })
    }

    fn scan_line(&mut self, line: &str) {
        if !line.contains("INSERT INTO") || !line.contains("langlinks") {
            return;
        }
        for caps in TUPLE_RE.captures_iter(line) {
            if &caps[2] != "eo" {
                continue;
            }
            let Ok(page_id) = caps[1].parse::<u32>() else {
                continue;
            };
            let eo_title = unescape_sql(&caps[3]);
            if eo_title.is_empty() {
                continue;
            }
            self.pending.push_back(LanglinkRow { page_id, eo_title });
        }
    }
}

impl Iterator for LanglinkReader {
    type Item = LanglinkRow;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Some(row);
            }
            match self.lines.next() {
                Some(Ok(line)) => self.scan_line(&line),
                Some(Err(e)) => {
                    warn!(error = %e, "unreadable line in langlinks dump, skipping");
                }
                None => return None,
            }
        }
    }
}

/// Join langlink rows against the title index, keep valid Ido titles only,
/// and deduplicate on the Ido title (first observation wins, so the result
/// is deterministic in input order).
pub fn resolve_links(
    rows: impl Iterator<Item = LanglinkRow>,
    index: &TitleIndex,
) -> Vec<(String, String)> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut pairs = Vec::new();

    for row in rows {
        let Some(io_title) = index.title_of(row.page_id) else {
            continue;
        };
        if !is_lexical_title(io_title) {
            continue;
        }
        if seen.insert(io_title.to_string()) {
            pairs.push((io_title.to_string(), row.eo_title));
        }
    }
    pairs
}
