use crate::models::{Entry, Lang, ParadigmId, Pos, SurfaceEntry};
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Default Esperanto paradigm for a part of speech. Esperanto verbs
/// infinitive in `-i`, otherwise the endings match Ido.
pub fn eo_default_paradigm(pos: Pos) -> ParadigmId {
    match pos {
        Pos::Noun => ParadigmId::ON,
        Pos::Verb => ParadigmId::IVblex,
        Pos::Adjective => ParadigmId::AAdj,
        Pos::Adverb => ParadigmId::EAdv,
        Pos::ProperNoun => ParadigmId::NpNp,
        Pos::Numeral => ParadigmId::NumRegex,
        Pos::Pronoun => ParadigmId::Prn,
        Pos::Preposition => ParadigmId::Pr,
        Pos::Conjunction => ParadigmId::Cnjcoo,
        Pos::Determiner => ParadigmId::Det,
        Pos::Interjection => ParadigmId::Ij,
        Pos::Other | Pos::Unknown => ParadigmId::ON,
    }
}

/// Expands merged IO-headed entries into bilingual surface entries: one per
/// distinct `(lemma, EO term)` pair, sources unioned across the senses that
/// attest it. Ordering is lexicographic by `(lemma, translation)` and
/// stable for the same input.
pub fn build_surface_entries(entries: &[Entry]) -> Vec<SurfaceEntry> {
    let mut index: FxHashMap<(String, String), usize> = FxHashMap::default();
    let mut out: Vec<SurfaceEntry> = Vec::new();

    for entry in entries {
        if entry.language != Lang::Io {
            continue;
        }
        let Some(paradigm) = entry.morphology.paradigm else {
            continue;
        };
        for t in entry.translations_into(Lang::Eo) {
            let key = (entry.lemma.clone(), t.term.clone());
            match index.get(&key) {
                Some(&i) => {
                    out[i].sources.extend(t.sources.iter().copied());
                }
                None => {
                    index.insert(key, out.len());
                    out.push(SurfaceEntry {
                        lemma: entry.lemma.clone(),
                        paradigm,
                        translation: t.term.clone(),
                        translation_paradigm: eo_default_paradigm(entry.pos),
                        sources: t.sources.clone(),
                    });
                }
            }
        }
    }

    out.sort_by(|a, b| {
        a.lemma
            .cmp(&b.lemma)
            .then_with(|| a.translation.cmp(&b.translation))
    });
    info!(surface_entries = out.len(), "bidix expansion complete");
    out
}

/// The monolingual view: every IO entry with a paradigm, translations not
/// required.
pub fn monolingual_entries(entries: &[Entry]) -> Vec<Entry> {
    entries
        .iter()
        .filter(|e| e.language == Lang::Io && e.morphology.paradigm.is_some())
        .cloned()
        .collect()
}

/// Writes the surface entries as a CSV table for downstream serializers.
/// Write-then-rename keeps a half-written file from being observed as
/// fresh output.
pub fn write_surface_csv(path: &Path, surface: &[SurfaceEntry]) -> Result<()> {
    let tmp = path.with_extension("csv.tmp");
    let file = File::create(&tmp)
        .with_context(|| format!("failed to create {}", tmp.display()))?;
    let mut writer = csv::Writer::from_writer(BufWriter::with_capacity(128 * 1024, file));

    writer.write_record(["lemma", "paradigm", "translation", "translation_paradigm", "sources"])?;
    for s in surface {
        let sources = s
            .sources
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join("+");
        writer.write_record([
            s.lemma.as_str(),
            s.paradigm.as_str(),
            s.translation.as_str(),
            s.translation_paradigm.as_str(),
            sources.as_str(),
        ])?;
    }
    writer.flush()?;
    drop(writer);

    fs::rename(&tmp, path)
        .with_context(|| format!("failed to rename surface csv to {}", path.display()))?;
    info!(rows = surface.len(), path = %path.display(), "surface csv written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProvenanceTag, Sense, Translation};
    use tempfile::TempDir;

    fn merged_entry(lemma: &str, pos: Pos, paradigm: ParadigmId, terms: &[&str]) -> Entry {
        let mut e = Entry::new(lemma, Lang::Io, pos, ProvenanceTag::IoWiktionary);
        e.morphology.paradigm = Some(paradigm);
        for t in terms {
            e.senses.push(Sense {
                sense_id: None,
                gloss: None,
                translations: vec![Translation::new(*t, Lang::Eo, ProvenanceTag::IoWiktionary)],
            });
        }
        e
    }

    #[test]
    fn each_translation_becomes_one_surface_entry() {
        let e = merged_entry(
            "abasar",
            Pos::Verb,
            ParadigmId::ArVblex,
            &["malaltigi", "madaldama"],
        );
        let surface = build_surface_entries(&[e]);

        assert_eq!(surface.len(), 2);
        // sorted by (lemma, translation)
        assert_eq!(surface[0].translation, "madaldama");
        assert_eq!(surface[1].translation, "malaltigi");
        assert_eq!(surface[0].paradigm, ParadigmId::ArVblex);
        assert_eq!(surface[0].translation_paradigm, ParadigmId::IVblex);
    }

    #[test]
    fn duplicate_pairs_union_sources() {
        let mut e = merged_entry("banko", Pos::Noun, ParadigmId::ON, &["banko"]);
        e.senses.push(Sense {
            sense_id: Some("2".to_string()),
            gloss: None,
            translations: vec![Translation::new("banko", Lang::Eo, ProvenanceTag::EnWiktionaryVia)],
        });

        let surface = build_surface_entries(&[e]);
        assert_eq!(surface.len(), 1);
        assert!(surface[0].sources.contains(&ProvenanceTag::IoWiktionary));
        assert!(surface[0].sources.contains(&ProvenanceTag::EnWiktionaryVia));
    }

    #[test]
    fn entries_without_paradigm_are_skipped() {
        let mut e = merged_entry("hundo", Pos::Noun, ParadigmId::ON, &["hundo"]);
        e.morphology.paradigm = None;
        assert!(build_surface_entries(&[e]).is_empty());
    }

    #[test]
    fn proper_noun_translation_paradigm() {
        let e = merged_entry("Parizo", Pos::ProperNoun, ParadigmId::NpNp, &["Parizo"]);
        let surface = build_surface_entries(&[e]);
        assert_eq!(surface[0].translation_paradigm, ParadigmId::NpNp);
    }

    #[test]
    fn monolingual_keeps_untranslated_entries() {
        let with = merged_entry("hundo", Pos::Noun, ParadigmId::ON, &["hundo"]);
        let without = merged_entry("arboro", Pos::Noun, ParadigmId::ON, &[]);
        let mono = monolingual_entries(&[with, without]);
        assert_eq!(mono.len(), 2);
    }

    #[test]
    fn surface_csv_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bidix.csv");
        let e = merged_entry("abasar", Pos::Verb, ParadigmId::ArVblex, &["malaltigi"]);
        let surface = build_surface_entries(&[e]);

        write_surface_csv(&path, &surface).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("lemma,"));
        assert!(lines[1].contains("abasar"));
        assert!(lines[1].contains("ar__vblex"));
        assert!(lines[1].contains("malaltigi"));
        assert!(lines[1].contains("i__vblex"));
        assert!(lines[1].contains("io_wiktionary"));
    }

    #[test]
    fn ordering_is_stable_across_runs() {
        let a = merged_entry("zebro", Pos::Noun, ParadigmId::ON, &["zebro"]);
        let b = merged_entry("arboro", Pos::Noun, ParadigmId::ON, &["arbo"]);
        let first = build_surface_entries(&[a.clone(), b.clone()]);
        let second = build_surface_entries(&[a, b]);
        assert_eq!(first, second);
        assert_eq!(first[0].lemma, "arboro");
    }
}
