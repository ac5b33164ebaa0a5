use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Headword / translation language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Io,
    Eo,
}

impl Lang {
    pub fn code(&self) -> &'static str {
        match self {
            Lang::Io => "io",
            Lang::Eo => "eo",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Part of speech. `Unknown` is legal before morphology inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pos {
    Noun,
    Verb,
    Adjective,
    Adverb,
    ProperNoun,
    Pronoun,
    Preposition,
    Conjunction,
    Determiner,
    Interjection,
    Numeral,
    Other,
    Unknown,
}

impl Pos {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pos::Noun => "noun",
            Pos::Verb => "verb",
            Pos::Adjective => "adjective",
            Pos::Adverb => "adverb",
            Pos::ProperNoun => "proper-noun",
            Pos::Pronoun => "pronoun",
            Pos::Preposition => "preposition",
            Pos::Conjunction => "conjunction",
            Pos::Determiner => "determiner",
            Pos::Interjection => "interjection",
            Pos::Numeral => "numeral",
            Pos::Other => "other",
            Pos::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of evidence sources. Adding a source is an enum variant plus
/// rows in the confidence/priority tables below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceTag {
    IoWiktionary,
    EoWiktionary,
    IoWikipedia,
    FrWiktionaryVia,
    FrWiktionaryMeaning,
    EnWiktionaryVia,
    Wikidata,
}

impl ProvenanceTag {
    pub const ALL: [ProvenanceTag; 7] = [
        ProvenanceTag::IoWiktionary,
        ProvenanceTag::EoWiktionary,
        ProvenanceTag::IoWikipedia,
        ProvenanceTag::FrWiktionaryVia,
        ProvenanceTag::FrWiktionaryMeaning,
        ProvenanceTag::EnWiktionaryVia,
        ProvenanceTag::Wikidata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProvenanceTag::IoWiktionary => "io_wiktionary",
            ProvenanceTag::EoWiktionary => "eo_wiktionary",
            ProvenanceTag::IoWikipedia => "io_wikipedia",
            ProvenanceTag::FrWiktionaryVia => "fr_wiktionary_via",
            ProvenanceTag::FrWiktionaryMeaning => "fr_wiktionary_meaning",
            ProvenanceTag::EnWiktionaryVia => "en_wiktionary_via",
            ProvenanceTag::Wikidata => "wikidata",
        }
    }

    /// Confidence assigned when the source itself does not provide one.
    pub fn default_confidence(&self) -> f64 {
        match self {
            ProvenanceTag::IoWiktionary => 1.0,
            ProvenanceTag::EoWiktionary => 1.0,
            ProvenanceTag::IoWikipedia => 0.9,
            ProvenanceTag::FrWiktionaryVia => 0.7,
            ProvenanceTag::FrWiktionaryMeaning => 0.7,
            ProvenanceTag::EnWiktionaryVia => 0.8,
            ProvenanceTag::Wikidata => 0.6,
        }
    }

    /// Higher wins when resolving single-valued field conflicts.
    pub fn default_priority(&self) -> u32 {
        match self {
            ProvenanceTag::IoWiktionary => 100,
            ProvenanceTag::EoWiktionary => 90,
            ProvenanceTag::IoWikipedia => 50,
            ProvenanceTag::EnWiktionaryVia => 40,
            ProvenanceTag::FrWiktionaryMeaning => 35,
            ProvenanceTag::FrWiktionaryVia => 30,
            ProvenanceTag::Wikidata => 20,
        }
    }
}

impl fmt::Display for ProvenanceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Morphotactic paradigm identifiers. The set is closed; new paradigms are
/// additive, removal is a breaking change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParadigmId {
    #[serde(rename = "o__n")]
    ON,
    #[serde(rename = "ajo__n")]
    AjoN,
    #[serde(rename = "a__adj")]
    AAdj,
    #[serde(rename = "ala__adj")]
    AlaAdj,
    #[serde(rename = "oza__adj")]
    OzaAdj,
    #[serde(rename = "iva__adj")]
    IvaAdj,
    #[serde(rename = "e__adv")]
    EAdv,
    #[serde(rename = "ar__vblex")]
    ArVblex,
    #[serde(rename = "i__vblex")]
    IVblex,
    #[serde(rename = "np__np")]
    NpNp,
    #[serde(rename = "num_regex")]
    NumRegex,
    #[serde(rename = "__pr")]
    Pr,
    #[serde(rename = "__cnjcoo")]
    Cnjcoo,
    #[serde(rename = "__cnjsub")]
    Cnjsub,
    #[serde(rename = "__det")]
    Det,
    #[serde(rename = "__prn")]
    Prn,
    #[serde(rename = "__ij")]
    Ij,
    #[serde(rename = "unknown")]
    Unknown,
}

impl ParadigmId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParadigmId::ON => "o__n",
            ParadigmId::AjoN => "ajo__n",
            ParadigmId::AAdj => "a__adj",
            ParadigmId::AlaAdj => "ala__adj",
            ParadigmId::OzaAdj => "oza__adj",
            ParadigmId::IvaAdj => "iva__adj",
            ParadigmId::EAdv => "e__adv",
            ParadigmId::ArVblex => "ar__vblex",
            ParadigmId::IVblex => "i__vblex",
            ParadigmId::NpNp => "np__np",
            ParadigmId::NumRegex => "num_regex",
            ParadigmId::Pr => "__pr",
            ParadigmId::Cnjcoo => "__cnjcoo",
            ParadigmId::Cnjsub => "__cnjsub",
            ParadigmId::Det => "__det",
            ParadigmId::Prn => "__prn",
            ParadigmId::Ij => "__ij",
            ParadigmId::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ParadigmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Morphology {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paradigm: Option<ParadigmId>,
}

/// One translation candidate inside a sense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub term: String,
    pub lang: Lang,
    pub confidence: f64,
    pub sources: BTreeSet<ProvenanceTag>,
}

impl Translation {
    pub fn new(term: impl Into<String>, lang: Lang, source: ProvenanceTag) -> Self {
        Self {
            term: term.into(),
            lang,
            confidence: source.default_confidence(),
            sources: BTreeSet::from([source]),
        }
    }
}

/// A numbered meaning. Order of `translations` is source order until the
/// merger sorts them by `(lang, term)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sense {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sense_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gloss: Option<String>,
    pub translations: Vec<Translation>,
}

/// Canonical unit flowing through every pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub lemma: String,
    pub language: Lang,
    pub pos: Pos,
    pub senses: Vec<Sense>,
    #[serde(default)]
    pub morphology: Morphology,
    pub provenance: BTreeSet<ProvenanceTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_lemma: Option<String>,
}

impl Entry {
    pub fn new(lemma: impl Into<String>, language: Lang, pos: Pos, source: ProvenanceTag) -> Self {
        Self {
            lemma: lemma.into(),
            language,
            pos,
            senses: Vec::new(),
            morphology: Morphology::default(),
            provenance: BTreeSet::from([source]),
            original_lemma: None,
        }
    }

    /// All translations into `lang` across senses, in sense order.
    pub fn translations_into(&self, lang: Lang) -> impl Iterator<Item = &Translation> {
        self.senses
            .iter()
            .flat_map(|s| s.translations.iter())
            .filter(move |t| t.lang == lang)
    }

    pub fn is_proper_noun(&self) -> bool {
        self.pos == Pos::ProperNoun
    }
}

/// One row of the bilingual dictionary: a single (lemma, translation) pair
/// with both paradigms and the evidence that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceEntry {
    pub lemma: String,
    pub paradigm: ParadigmId,
    pub translation: String,
    pub translation_paradigm: ParadigmId,
    pub sources: BTreeSet<ProvenanceTag>,
}

/// Conflicts surfaced by the merger; recorded, never silently resolved away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictRecord {
    PosConflict {
        language: Lang,
        lemma: String,
        pos: Vec<Pos>,
    },
    ParadigmConflict {
        language: Lang,
        lemma: String,
        pos: Pos,
        kept: ParadigmId,
        rejected: ParadigmId,
    },
    DuplicateTranslation {
        language: Lang,
        lemma: String,
        pos: Pos,
        term: String,
    },
}
