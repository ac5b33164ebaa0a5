use crate::models::{Entry, Lang, Pos, Sense, Translation};
use tracing::info;

/// Turns one EO-headed entry into IO-headed entries: every Ido translation
/// becomes a headword whose sense points back at the Esperanto lemma.
pub fn flip_eo_entry(entry: &Entry) -> Vec<Entry> {
    if entry.language != Lang::Eo {
        return Vec::new();
    }

    let mut out = Vec::new();
    for sense in &entry.senses {
        for t in &sense.translations {
            if t.lang != Lang::Io || t.term.is_empty() {
                continue;
            }
            let mut back = Translation {
                term: entry.lemma.clone(),
                lang: Lang::Eo,
                confidence: t.confidence,
                sources: t.sources.clone(),
            };
            back.sources.extend(entry.provenance.iter().copied());

            let mut flipped = Entry {
                lemma: t.term.clone(),
                language: Lang::Io,
                // POS transfers: the Ido term plays the same role as the
                // Esperanto headword it translates
                pos: entry.pos,
                senses: vec![Sense {
                    sense_id: sense.sense_id.clone(),
                    gloss: sense.gloss.clone(),
                    translations: vec![back],
                }],
                morphology: Default::default(),
                provenance: entry.provenance.clone(),
                original_lemma: None,
            };
            if flipped.pos == Pos::ProperNoun {
                flipped.morphology = entry.morphology.clone();
            }
            out.push(flipped);
        }
    }
    out
}

/// Joins IO-centred evidence with flipped EO-centred evidence into one
/// IO-headed stream. Input order is preserved (IO entries first), which
/// keeps first-seen tie-breaks deterministic downstream.
pub fn align(io_entries: Vec<Entry>, eo_entries: Vec<Entry>) -> Vec<Entry> {
    let mut out = io_entries;
    let flipped: usize = {
        let before = out.len();
        for entry in &eo_entries {
            out.extend(flip_eo_entry(entry));
        }
        out.len() - before
    };
    info!(
        io = out.len() - flipped,
        flipped, "aligned bilingual evidence"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProvenanceTag;

    fn eo_entry(lemma: &str, io_terms: &[&str]) -> Entry {
        let mut e = Entry::new(lemma, Lang::Eo, Pos::Noun, ProvenanceTag::EoWiktionary);
        e.senses.push(Sense {
            sense_id: Some("1".to_string()),
            gloss: Some("meblo".to_string()),
            translations: io_terms
                .iter()
                .map(|t| Translation::new(*t, Lang::Io, ProvenanceTag::EoWiktionary))
                .collect(),
        });
        e
    }

    #[test]
    fn flip_produces_io_headed_entries() {
        let flipped = flip_eo_entry(&eo_entry("seĝo", &["stulo", "sidilo"]));

        assert_eq!(flipped.len(), 2);
        assert_eq!(flipped[0].lemma, "stulo");
        assert_eq!(flipped[0].language, Lang::Io);
        assert_eq!(flipped[0].senses[0].translations[0].term, "seĝo");
        assert_eq!(flipped[0].senses[0].translations[0].lang, Lang::Eo);
        assert_eq!(flipped[1].lemma, "sidilo");
    }

    #[test]
    fn flip_keeps_provenance_and_metadata() {
        let flipped = flip_eo_entry(&eo_entry("seĝo", &["stulo"]));
        let e = &flipped[0];
        assert!(e.provenance.contains(&ProvenanceTag::EoWiktionary));
        assert_eq!(e.senses[0].gloss.as_deref(), Some("meblo"));
        assert_eq!(e.senses[0].sense_id.as_deref(), Some("1"));
        assert!(e.senses[0].translations[0]
            .sources
            .contains(&ProvenanceTag::EoWiktionary));
    }

    #[test]
    fn flip_ignores_non_eo_entries() {
        let io = Entry::new("hundo", Lang::Io, Pos::Noun, ProvenanceTag::IoWiktionary);
        assert!(flip_eo_entry(&io).is_empty());
    }

    #[test]
    fn flip_skips_non_io_translations() {
        let mut e = Entry::new("seĝo", Lang::Eo, Pos::Noun, ProvenanceTag::EoWiktionary);
        e.senses.push(Sense {
            sense_id: None,
            gloss: None,
            translations: vec![Translation::new("chaise", Lang::Eo, ProvenanceTag::EoWiktionary)],
        });
        assert!(flip_eo_entry(&e).is_empty());
    }

    #[test]
    fn align_concatenates_io_first() {
        let io = vec![Entry::new("hundo", Lang::Io, Pos::Noun, ProvenanceTag::IoWiktionary)];
        let eo = vec![eo_entry("seĝo", &["stulo"])];
        let joined = align(io, eo);

        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].lemma, "hundo");
        assert_eq!(joined[1].lemma, "stulo");
    }
}
