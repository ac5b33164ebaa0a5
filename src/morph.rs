use crate::models::{Entry, Lang, ParadigmId, Pos, ProvenanceTag};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::info;

static NUMERAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+([.,][0-9]+)*%?$").unwrap());

/// Curated closed-class function words. These are irregular by definition
/// and would otherwise be misread by the suffix rules (`e` is a
/// conjunction, not an adverb).
static FUNCTION_WORDS: Lazy<FxHashMap<&'static str, (Pos, ParadigmId)>> = Lazy::new(|| {
    let mut m = FxHashMap::default();
    for w in ["e", "ed", "o", "od", "ma", "nek", "do", "or"] {
        m.insert(w, (Pos::Conjunction, ParadigmId::Cnjcoo));
    }
    for w in ["se", "ke", "kande", "pro ke", "por ke", "quankam", "dum ke"] {
        m.insert(w, (Pos::Conjunction, ParadigmId::Cnjsub));
    }
    for w in [
        "a", "ad", "an", "che", "cis", "da", "de", "di", "dum", "en", "ek", "for", "inter",
        "kontre", "kun", "lor", "per", "po", "por", "pos", "pri", "pro", "proxim", "sen", "sub",
        "super", "sur", "til", "tra", "trans", "ultre", "vers", "ye",
    ] {
        m.insert(w, (Pos::Preposition, ParadigmId::Pr));
    }
    m.insert("la", (Pos::Determiner, ParadigmId::Det));
    for w in [
        "me", "tu", "vu", "il", "el", "ol", "lu", "ni", "vi", "li", "su", "on", "onu", "ilu",
        "elu", "olu",
    ] {
        m.insert(w, (Pos::Pronoun, ParadigmId::Prn));
    }
    for w in ["ho", "ve", "nu", "yen"] {
        m.insert(w, (Pos::Interjection, ParadigmId::Ij));
    }
    m
});

/// Paradigm for an entry, by the closed decision table over lemma suffixes
/// conditioned on POS. Returns the inferred POS as well so `unknown`
/// entries get both fields set in one pass.
pub fn infer(lemma: &str, pos: Pos) -> (Pos, ParadigmId) {
    let lower = lemma.to_lowercase();

    if pos == Pos::ProperNoun {
        return (pos, ParadigmId::NpNp);
    }
    if NUMERAL_RE.is_match(lemma) {
        return (Pos::Numeral, ParadigmId::NumRegex);
    }
    if let Some(&(fw_pos, fw_par)) = FUNCTION_WORDS.get(lower.as_str()) {
        // a POS from the source wins over the curated table only when they
        // agree in class; otherwise the table is authoritative
        return (if pos == Pos::Unknown { fw_pos } else { pos }, fw_par);
    }

    // multi-token and hyphenated lemmas behave like nouns (compounds,
    // proper names missed by classification)
    if matches!(pos, Pos::Unknown | Pos::Noun) && (lower.contains(' ') || lower.contains('-')) {
        return (Pos::Noun, ParadigmId::ON);
    }

    match pos {
        Pos::Noun => {
            if lower.ends_with("ajo") {
                (pos, ParadigmId::AjoN)
            } else if lower.ends_with('o') || lower.ends_with('i') {
                (pos, ParadigmId::ON)
            } else {
                (pos, ParadigmId::Unknown)
            }
        }
        Pos::Adjective => (pos, adjective_paradigm(&lower)),
        Pos::Adverb => {
            if lower.ends_with('e') {
                (pos, ParadigmId::EAdv)
            } else {
                (pos, ParadigmId::Unknown)
            }
        }
        Pos::Verb => {
            if lower.ends_with("ar") || lower.ends_with("ir") || lower.ends_with("or") {
                (pos, ParadigmId::ArVblex)
            } else {
                (pos, ParadigmId::Unknown)
            }
        }
        Pos::Pronoun => (pos, ParadigmId::Prn),
        Pos::Preposition => (pos, ParadigmId::Pr),
        Pos::Conjunction => (pos, ParadigmId::Cnjcoo),
        Pos::Determiner => (pos, ParadigmId::Det),
        Pos::Interjection => (pos, ParadigmId::Ij),
        Pos::Numeral => (pos, ParadigmId::NumRegex),
        Pos::Unknown => infer_unknown(&lower),
        _ => (pos, ParadigmId::Unknown),
    }
}

fn adjective_paradigm(lower: &str) -> ParadigmId {
    if lower.ends_with("ala") {
        ParadigmId::AlaAdj
    } else if lower.ends_with("oza") {
        ParadigmId::OzaAdj
    } else if lower.ends_with("iva") {
        ParadigmId::IvaAdj
    } else if lower.ends_with('a') {
        ParadigmId::AAdj
    } else {
        ParadigmId::Unknown
    }
}

/// Ending-driven fallback for entries without a POS: demonyms first, then
/// the regular Ido endings.
fn infer_unknown(lower: &str) -> (Pos, ParadigmId) {
    if lower.ends_with("ano") || lower.ends_with("iano") {
        return (Pos::Noun, ParadigmId::ON);
    }
    if lower.ends_with("ana") || lower.ends_with("iana") {
        return (Pos::Adjective, ParadigmId::AAdj);
    }
    if lower.ends_with("ia") && lower.chars().count() > 3 {
        // toponyms: Brazilia, Chinia
        return (Pos::Noun, ParadigmId::ON);
    }
    if lower.ends_with("ajo") {
        return (Pos::Noun, ParadigmId::AjoN);
    }
    if lower.ends_with('o') {
        return (Pos::Noun, ParadigmId::ON);
    }
    if lower.ends_with("ar") || lower.ends_with("ir") || lower.ends_with("or") {
        return (Pos::Verb, ParadigmId::ArVblex);
    }
    if lower.ends_with('a') {
        return (Pos::Adjective, adjective_paradigm(lower));
    }
    if lower.ends_with('e') {
        return (Pos::Adverb, ParadigmId::EAdv);
    }
    (Pos::Unknown, ParadigmId::Unknown)
}

fn has_wikipedia_provenance(entry: &Entry) -> bool {
    entry.provenance.contains(&ProvenanceTag::IoWikipedia)
}

/// Fills `morphology.paradigm` for every entry that lacks one, resolving
/// unknown POS along the way, and synthesizes demonym/toponym twins for
/// Wikipedia-derived proper names.
pub fn infer_all(entries: Vec<Entry>) -> Vec<Entry> {
    let mut existing: FxHashSet<(Lang, String)> = entries
        .iter()
        .map(|e| (e.language, e.lemma.to_lowercase()))
        .collect();

    let mut out: Vec<Entry> = Vec::with_capacity(entries.len());
    let mut inferred = 0u64;
    let mut flagged = 0u64;

    for mut entry in entries {
        if entry.morphology.paradigm.is_none() {
            let (pos, paradigm) = infer(&entry.lemma, entry.pos);
            entry.pos = pos;
            entry.morphology.paradigm = Some(paradigm);
            inferred += 1;
            if paradigm == ParadigmId::Unknown {
                flagged += 1;
            }
        }

        let twin = toponym_twin(&entry, &existing);
        out.push(entry);
        if let Some(t) = twin {
            existing.insert((t.language, t.lemma.to_lowercase()));
            out.push(t);
        }
    }

    info!(inferred, flagged, "morphology inference complete");
    out
}

/// `Germania` (noun, Wikipedia) → `Germaniana` (adjective), when the twin
/// lemma is not already attested.
fn toponym_twin(entry: &Entry, existing: &FxHashSet<(Lang, String)>) -> Option<Entry> {
    if entry.language != Lang::Io || !has_wikipedia_provenance(entry) {
        return None;
    }
    if entry.morphology.paradigm != Some(ParadigmId::ON)
        && entry.morphology.paradigm != Some(ParadigmId::NpNp)
    {
        return None;
    }
    let lower = entry.lemma.to_lowercase();
    if !lower.ends_with("ia") || lower.chars().count() <= 3 {
        return None;
    }
    let twin_lemma = format!("{}na", entry.lemma);
    if existing.contains(&(entry.language, twin_lemma.to_lowercase())) {
        return None;
    }
    let mut twin = entry.clone();
    twin.lemma = twin_lemma;
    twin.pos = Pos::Adjective;
    twin.morphology.paradigm = Some(ParadigmId::AAdj);
    twin.senses = Vec::new();
    twin.original_lemma = None;
    Some(twin)
}
