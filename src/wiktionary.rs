use crate::clean::{clean_term, is_valid_lemma, is_valid_term, split_term_groups};
use crate::models::{Entry, Lang, ParadigmId, Pos, ProvenanceTag, Sense, Translation};
use crate::wikitext::{
    self, definition_lines, inline_translation_lines, language_section, numbered_blocks,
    pos_from_section, template_translations, SourceLang, TransBlock,
};
use tracing::debug;

/// How translations are written in a given Wiktionary. Ido and Esperanto
/// editions use inline `* {{eo}}: …` lists; English and French editions use
/// translation-table templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WiktionaryDialect {
    Inline,
    Template,
}

/// Ido/Esperanto terms found on one pivot-language page, grouped by
/// translation table. The ViaBuilder pairs them up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotBlock {
    pub gloss: Option<String>,
    pub io_terms: Vec<String>,
    pub eo_terms: Vec<String>,
}

/// Parses one `(title, wikitext)` page of a Wiktionary dump into entries
/// translating into `target`. The dialect is fixed by the source language.
pub struct WiktionaryParser {
    pub source: SourceLang,
    pub target: Lang,
    dialect: WiktionaryDialect,
    tag: ProvenanceTag,
    confidence: f64,
}

impl WiktionaryParser {
    pub fn new(source: SourceLang, target: Lang) -> Self {
        let dialect = match source {
            SourceLang::Io | SourceLang::Eo => WiktionaryDialect::Inline,
            SourceLang::En | SourceLang::Fr => WiktionaryDialect::Template,
        };
        let tag = match source {
            SourceLang::Io => ProvenanceTag::IoWiktionary,
            SourceLang::Eo => ProvenanceTag::EoWiktionary,
            SourceLang::En => ProvenanceTag::EnWiktionaryVia,
            SourceLang::Fr => ProvenanceTag::FrWiktionaryMeaning,
        };
        Self {
            source,
            target,
            dialect,
            tag,
            confidence: tag.default_confidence(),
        }
    }

    /// Override the confidence written on extracted translations
    /// (`source_confidence[tag]` from the configuration surface).
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn dialect(&self) -> WiktionaryDialect {
        self.dialect
    }

    fn head_lang(&self) -> Option<Lang> {
        match self.source {
            SourceLang::Io => Some(Lang::Io),
            SourceLang::Eo => Some(Lang::Eo),
            _ => None,
        }
    }

    fn target_source_lang(&self) -> SourceLang {
        match self.target {
            Lang::Io => SourceLang::Io,
            Lang::Eo => SourceLang::Eo,
        }
    }

    /// Entries for an Ido- or Esperanto-headed page. Pivot dumps go through
    /// [`WiktionaryParser::parse_pivot_page`] instead.
    pub fn parse_page(&self, title: &str, text: &str) -> Vec<Entry> {
        let Some(language) = self.head_lang() else {
            return Vec::new();
        };

        let lemma = clean_term(title);
        if !is_valid_lemma(&lemma) {
            return Vec::new();
        }

        let Some(section) = language_section(text, self.source) else {
            return Vec::new();
        };
        let pos = pos_from_section(section);

        let mut senses = self.inline_senses(section);

        // Esperanto pages often keep their translation lists outside the
        // immediate section block; fall back to a whole-page scan.
        if senses.is_empty() && self.source == SourceLang::Eo {
            senses = self.inline_senses(text);
        }

        if senses.is_empty() && self.source != SourceLang::Io {
            // only Ido entries are kept for monolingual coverage
            return Vec::new();
        }

        let mut entry = Entry::new(lemma.clone(), language, pos, self.tag);
        entry.senses = senses;
        attach_glosses(&mut entry.senses, section);
        if lemma != title {
            entry.original_lemma = Some(title.to_string());
        }
        if pos == Pos::ProperNoun {
            entry.morphology.paradigm = Some(ParadigmId::NpNp);
        }
        debug!(lemma = %entry.lemma, senses = entry.senses.len(), "parsed page");
        vec![entry]
    }

    fn inline_senses(&self, section: &str) -> Vec<Sense> {
        let mut senses = Vec::new();
        for line in inline_translation_lines(section, self.target_source_lang()) {
            for (number, block) in numbered_blocks(&line) {
                let cleaned = clean_term(&block);
                if cleaned.is_empty() {
                    continue;
                }
                let groups = split_term_groups(&cleaned);
                let multi = groups.len() > 1;
                for (gi, terms) in groups.into_iter().enumerate() {
                    let translations: Vec<Translation> = terms
                        .into_iter()
                        .filter(|t| is_valid_term(t))
                        .map(|t| {
                            let mut tr = Translation::new(t, self.target, self.tag);
                            tr.confidence = self.confidence;
                            tr
                        })
                        .collect();
                    if translations.is_empty() {
                        continue;
                    }
                    let sense_id = number.map(|n| {
                        if multi {
                            format!("{}.{}", n, gi + 1)
                        } else {
                            n.to_string()
                        }
                    });
                    senses.push(Sense {
                        sense_id,
                        gloss: None,
                        translations,
                    });
                }
            }
        }
        senses
    }

    /// Translation-table blocks of a pivot-language page, with both Ido and
    /// Esperanto terms already cleaned and validated. Pages lacking the
    /// source-language section yield nothing.
    pub fn parse_pivot_page(&self, _title: &str, text: &str) -> Vec<PivotBlock> {
        let Some(section) = language_section(text, self.source) else {
            return Vec::new();
        };

        let blocks: Vec<TransBlock> = match self.source {
            SourceLang::En => wikitext::trans_top_blocks(section),
            SourceLang::Fr => wikitext::trad_blocks(section),
            _ => return Vec::new(),
        };

        blocks
            .into_iter()
            .map(|b| PivotBlock {
                gloss: b.gloss,
                io_terms: clean_terms(template_translations(&b.body, SourceLang::Io)),
                eo_terms: clean_terms(template_translations(&b.body, SourceLang::Eo)),
            })
            .filter(|b| !b.io_terms.is_empty() || !b.eo_terms.is_empty())
            .collect()
    }
}

/// Pairs numbered senses with the section's definition-list lines:
/// sense `N` takes the `N`th `# …` line as its gloss.
fn attach_glosses(senses: &mut [Sense], section: &str) {
    let defs: Vec<String> = definition_lines(section)
        .iter()
        .map(|d| clean_term(d))
        .filter(|d| !d.is_empty())
        .collect();
    if defs.is_empty() {
        return;
    }
    let single = senses.len() == 1;
    for sense in senses.iter_mut() {
        if sense.gloss.is_some() {
            continue;
        }
        let number = sense
            .sense_id
            .as_deref()
            .and_then(|id| id.split('.').next()?.parse::<usize>().ok());
        sense.gloss = match number {
            Some(n) if n >= 1 => defs.get(n - 1).cloned(),
            _ if single && defs.len() == 1 => Some(defs[0].clone()),
            _ => None,
        };
    }
}

fn clean_terms(raw: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(raw.len());
    for term in raw {
        let cleaned = clean_term(&term);
        if is_valid_term(&cleaned) && !out.contains(&cleaned) {
            out.push(cleaned);
        }
    }
    out
}
