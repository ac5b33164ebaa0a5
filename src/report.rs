use crate::filter::FilterStats;
use crate::frequency::FrequencyList;
use crate::merge::MergeStats;
use crate::models::{ConflictRecord, Entry, Lang};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::info;

fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    let tmp = path.with_extension("txt.tmp");
    fs::write(&tmp, content).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to rename report to {}", path.display()))?;
    info!(path = %path.display(), "report written");
    Ok(())
}

fn counted_table(counts: &BTreeMap<String, usize>) -> String {
    let mut out = String::new();
    for (key, n) in counts {
        let _ = writeln!(out, "  {key:<28} {n}");
    }
    out
}

/// Entry counts by source, POS, and paradigm, plus the rejection tallies.
/// Every final entry appears exactly once in each table; every dropped
/// entry shows up in one of the rejection rows.
pub fn write_statistics(
    path: &Path,
    entries: &[Entry],
    merge_stats: &MergeStats,
    filter_stats: &FilterStats,
    suspicious: &[String],
) -> Result<()> {
    let mut by_source: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_pos: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_paradigm: BTreeMap<String, usize> = BTreeMap::new();

    for e in entries {
        // entry-level counting uses the highest-priority contributor so
        // the per-source totals sum to the entry count
        let top = e
            .provenance
            .iter()
            .max_by_key(|t| t.default_priority())
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| "none".to_string());
        *by_source.entry(top).or_insert(0) += 1;
        *by_pos.entry(e.pos.as_str().to_string()).or_insert(0) += 1;
        let paradigm = e
            .morphology
            .paradigm
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "none".to_string());
        *by_paradigm.entry(paradigm).or_insert(0) += 1;
    }

    let with_translations = entries
        .iter()
        .filter(|e| e.translations_into(Lang::Eo).next().is_some())
        .count();

    let mut out = String::new();
    let _ = writeln!(out, "# Statistics Report\n");
    let _ = writeln!(out, "Total entries: {}", entries.len());
    let _ = writeln!(out, "Entries with EO translations: {with_translations}\n");

    let _ = writeln!(out, "## Entries by primary source");
    out.push_str(&counted_table(&by_source));
    let _ = writeln!(out, "\n## Entries by part of speech");
    out.push_str(&counted_table(&by_pos));
    let _ = writeln!(out, "\n## Entries by paradigm");
    out.push_str(&counted_table(&by_paradigm));

    let _ = writeln!(out, "\n## Merge");
    let _ = writeln!(out, "  input entries                {}", merge_stats.input_entries);
    let _ = writeln!(out, "  merged entries               {}", merge_stats.output_entries);
    let _ = writeln!(out, "  senses collapsed             {}", merge_stats.senses_collapsed);
    let _ = writeln!(out, "  translations merged          {}", merge_stats.translations_merged);
    let _ = writeln!(out, "  conjugated forms dropped     {}", merge_stats.conjugated_dropped);
    let _ = writeln!(out, "  pos conflicts                {}", merge_stats.pos_conflicts);

    let _ = writeln!(out, "\n## Rejections");
    let _ = writeln!(out, "  invalid schema               {}", filter_stats.dropped_invalid_schema);
    let _ = writeln!(out, "  bad lemma                    {}", filter_stats.dropped_bad_lemma);
    let _ = writeln!(out, "  wikipedia below top-n        {}", filter_stats.dropped_wikipedia_low_freq);
    let _ = writeln!(out, "  duplicates removed           {}", filter_stats.dropped_duplicates);
    let _ = writeln!(out, "  translations removed         {}", filter_stats.translations_removed);
    let _ = writeln!(out, "  kept monolingual only        {}", filter_stats.entries_kept_monolingual);

    if !suspicious.is_empty() {
        let _ = writeln!(out, "\n## Suspicious items (first {})", suspicious.len());
        for line in suspicious {
            let _ = writeln!(out, "  {line}");
        }
    }

    write_text(path, &out)
}

/// How much of the top-N frequency list the final lexicon covers, and the
/// highest-ranked tokens still missing.
pub fn write_coverage(
    path: &Path,
    entries: &[Entry],
    freq: &FrequencyList,
    top_n: usize,
) -> Result<()> {
    let lemmas: std::collections::BTreeSet<String> = entries
        .iter()
        .filter(|e| e.language == Lang::Io)
        .map(|e| e.lemma.to_lowercase())
        .collect();

    let top: Vec<_> = freq.items.iter().take(top_n).collect();
    let covered = top.iter().filter(|i| lemmas.contains(&i.token)).count();
    let missing: Vec<_> = top
        .iter()
        .filter(|i| !lemmas.contains(&i.token))
        .take(50)
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "# Coverage Report\n");
    let _ = writeln!(out, "Top-{top_n} tokens covered: {covered}/{}", top.len());
    if !top.is_empty() {
        let pct = 100.0 * covered as f64 / top.len() as f64;
        let _ = writeln!(out, "Coverage: {pct:.1}%");
    }
    let _ = writeln!(out, "\n## Highest-ranked missing tokens");
    for item in missing {
        let _ = writeln!(out, "  #{:<6} {:<24} ({} occurrences)", item.rank, item.token, item.count);
    }

    write_text(path, &out)
}

/// POS conflicts, paradigm conflicts, and rejected duplicate translations.
pub fn write_conflicts(path: &Path, conflicts: &[ConflictRecord]) -> Result<()> {
    let mut pos = Vec::new();
    let mut paradigm = Vec::new();
    let mut duplicate = Vec::new();

    for c in conflicts {
        match c {
            ConflictRecord::PosConflict { language, lemma, pos: p } => {
                let list = p.iter().map(|x| x.as_str()).collect::<Vec<_>>().join(", ");
                pos.push(format!("  {language}:{lemma} -> {list}"));
            }
            ConflictRecord::ParadigmConflict { language, lemma, kept, rejected, .. } => {
                paradigm.push(format!("  {language}:{lemma} kept {kept}, rejected {rejected}"));
            }
            ConflictRecord::DuplicateTranslation { language, lemma, term, .. } => {
                duplicate.push(format!("  {language}:{lemma} -> {term}"));
            }
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "# Conflicts Report\n");
    let _ = writeln!(out, "## POS conflicts ({})", pos.len());
    for line in &pos {
        let _ = writeln!(out, "{line}");
    }
    let _ = writeln!(out, "\n## Paradigm conflicts ({})", paradigm.len());
    for line in &paradigm {
        let _ = writeln!(out, "{line}");
    }
    let _ = writeln!(out, "\n## Duplicate translations rejected ({})", duplicate.len());
    for line in &duplicate {
        let _ = writeln!(out, "{line}");
    }

    write_text(path, &out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::FrequencyItem;
    use crate::models::{ParadigmId, Pos, ProvenanceTag, Sense, Translation};
    use tempfile::TempDir;

    fn sample_entries() -> Vec<Entry> {
        let mut a = Entry::new("hundo", Lang::Io, Pos::Noun, ProvenanceTag::IoWiktionary);
        a.morphology.paradigm = Some(ParadigmId::ON);
        a.senses.push(Sense {
            sense_id: None,
            gloss: None,
            translations: vec![Translation::new("hundo", Lang::Eo, ProvenanceTag::IoWiktionary)],
        });
        let mut b = Entry::new("bela", Lang::Io, Pos::Adjective, ProvenanceTag::IoWikipedia);
        b.morphology.paradigm = Some(ParadigmId::AAdj);
        vec![a, b]
    }

    #[test]
    fn statistics_counts_every_entry_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("statistics.txt");
        write_statistics(
            &path,
            &sample_entries(),
            &MergeStats::default(),
            &FilterStats::default(),
            &["bad_lemma: x".to_string()],
        )
        .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("Total entries: 2"));
        assert!(text.contains("io_wiktionary"));
        assert!(text.contains("io_wikipedia"));
        assert!(text.contains("noun"));
        assert!(text.contains("adjective"));
        assert!(text.contains("o__n"));
        assert!(text.contains("a__adj"));
        assert!(text.contains("bad_lemma: x"));
    }

    #[test]
    fn coverage_lists_missing_tokens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coverage.txt");
        let freq = FrequencyList {
            items: vec![
                FrequencyItem { token: "hundo".to_string(), count: 10, rank: 1 },
                FrequencyItem { token: "stranga".to_string(), count: 8, rank: 2 },
            ],
        };
        write_coverage(&path, &sample_entries(), &freq, 2).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("covered: 1/2"));
        assert!(text.contains("stranga"));
    }

    #[test]
    fn conflicts_grouped_by_kind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conflicts.txt");
        let conflicts = vec![
            ConflictRecord::PosConflict {
                language: Lang::Io,
                lemma: "stulo".to_string(),
                pos: vec![Pos::Noun, Pos::ProperNoun],
            },
            ConflictRecord::DuplicateTranslation {
                language: Lang::Io,
                lemma: "hundo".to_string(),
                pos: Pos::Noun,
                term: "hundo".to_string(),
            },
        ];
        write_conflicts(&path, &conflicts).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("POS conflicts (1)"));
        assert!(text.contains("stulo"));
        assert!(text.contains("noun, proper-noun"));
        assert!(text.contains("Duplicate translations rejected (1)"));
    }
}
