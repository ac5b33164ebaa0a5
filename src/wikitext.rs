use crate::models::Pos;
use once_cell::sync::Lazy;
use regex::Regex;

/// Language of the dump a page came from. Pivot languages (`en`, `fr`)
/// appear only as sources, never as translation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLang {
    Io,
    Eo,
    En,
    Fr,
}

impl SourceLang {
    pub fn code(&self) -> &'static str {
        match self {
            SourceLang::Io => "io",
            SourceLang::Eo => "eo",
            SourceLang::En => "en",
            SourceLang::Fr => "fr",
        }
    }
}

static IO_SECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)==\s*\{\{io\}\}\s*==|==\s*Ido\s*==|\{\{-ido-\}\}").unwrap());

static EO_SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)==\s*\{\{eo\}\}\s*==|===?\s*Esperanto\s*===?|\{\{-eo-\}\}").unwrap()
});

static EN_SECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)==\s*English\s*==|==\s*\{\{en\}\}\s*==").unwrap());

static FR_SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)==\s*\{\{langue\|fr\}\}\s*==|==\s*Français\s*==").unwrap()
});

static NEXT_LEVEL2_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n==[^=]").unwrap());

// POS subsection headers: plain words (English/Ido dumps) or the French
// `{{S|nom|io}}` form. Level 3 and deeper.
static POS_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^==+\s*(?:\{\{S\|([a-zéè ]+)\|[^}]*\}\}|(Noun|Proper noun|Verb|Adjective|Adverb|Pronoun|Preposition|Conjunction|Determiner|Interjection|Numeral|Substantivo|Verbo|Adjektivo|Adverbo|Pronomo))\s*==+\s*$",
    )
    .unwrap()
});

// Numbered sense markers inside translation content: '''1.''' or '''2)'''
static SENSE_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'''(\d+)[.)]?\s*'''").unwrap());

// Definition lines: `# gloss text`
static DEFINITION_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#\s*([^#*:].*)$").unwrap());

// English translation tables.
static TRANS_TOP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{\{trans-top(?:\|([^}]*))?\}\}(.*?)\{\{trans-bottom\}\}").unwrap()
});

// French translation tables.
static TRAD_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{\{trad-début(?:\|([^}]*))?\}\}(.*?)\{\{trad-fin\}\}").unwrap()
});

// {{t|io|vorto}}, {{t+|io|vorto|...}}, {{tt|..}}, {{l|..}}, {{m|..}},
// {{trad|..}}, {{trad+|..}} — third pipe-separated argument is the word.
static TRANSLATION_TEMPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{(?:t|tt|trad|l|m|link)\+?\|([a-z]{2,3})\|([^}|]+)").unwrap()
});

// Templates that mark a translation as unchecked or absent.
static SKIP_TEMPLATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{t-(?:check|needed)\|[^}]*\}\}").unwrap());

// Annotation templates removed before template-style extraction.
static ANNOTATION_TEMPLATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(?:qualifier|q|sense|lb)\|[^}]*\}\}").unwrap());

// Bare gender/number markers that ride along with translations.
static GENDER_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(?:m|f|n|c|p|mf|m-p|f-p)\}\}").unwrap());

static CATEGORY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[(?:Category|Kategorio):([^|\]]+?)(?:\|[^\]]+)?\]\]").unwrap()
});

/// Returns the slice of `text` belonging to the `lang` language section:
/// from its header up to the next level-2 header (or end of page).
pub fn language_section(text: &str, lang: SourceLang) -> Option<&str> {
    let re: &Regex = match lang {
        SourceLang::Io => &IO_SECTION_RE,
        SourceLang::Eo => &EO_SECTION_RE,
        SourceLang::En => &EN_SECTION_RE,
        SourceLang::Fr => &FR_SECTION_RE,
    };
    let m = re.find(text)?;
    let section = &text[m.start()..];
    match NEXT_LEVEL2_RE.find(&section[m.len()..]) {
        Some(nxt) => Some(&section[..m.len() + nxt.start()]),
        None => Some(section),
    }
}

/// POS from the first subsection header found in a language section.
pub fn pos_from_section(section: &str) -> Pos {
    let Some(caps) = POS_HEADER_RE.captures(section) else {
        return Pos::Unknown;
    };
    let label = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().trim().to_lowercase())
        .unwrap_or_default();
    match label.as_str() {
        "noun" | "substantivo" | "nom" | "nom commun" => Pos::Noun,
        "proper noun" | "nom propre" => Pos::ProperNoun,
        "verb" | "verbo" | "verbe" => Pos::Verb,
        "adjective" | "adjektivo" | "adjectif" => Pos::Adjective,
        "adverb" | "adverbo" | "adverbe" => Pos::Adverb,
        "pronoun" | "pronomo" | "pronom" => Pos::Pronoun,
        "preposition" | "préposition" => Pos::Preposition,
        "conjunction" | "conjonction" => Pos::Conjunction,
        "determiner" | "déterminant" => Pos::Determiner,
        "interjection" => Pos::Interjection,
        "numeral" | "numéral" => Pos::Numeral,
        _ => Pos::Unknown,
    }
}

/// Splits translation content on `'''N.'''` markers. Returns one block per
/// numbered meaning, or a single unnumbered block when no markers exist.
pub fn numbered_blocks(content: &str) -> Vec<(Option<u32>, String)> {
    let markers: Vec<_> = SENSE_MARKER_RE.captures_iter(content).collect();
    if markers.is_empty() {
        return vec![(None, content.to_string())];
    }

    let mut blocks = Vec::with_capacity(markers.len());
    for (i, caps) in markers.iter().enumerate() {
        let whole = caps.get(0).unwrap();
        let number = caps[1].parse::<u32>().ok();
        let start = whole.end();
        let end = markers
            .get(i + 1)
            .map(|c| c.get(0).unwrap().start())
            .unwrap_or(content.len());
        blocks.push((number, content[start..end].to_string()));
    }
    blocks
}

/// Definition-list lines (`# …`) of a section, raw.
pub fn definition_lines(section: &str) -> Vec<String> {
    DEFINITION_LINE_RE
        .captures_iter(section)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Inline-style translation lines: `* {{eo}}: content` / `* Esperanto: content`.
///
/// The capture runs to end-of-line; template stripping happens later in the
/// cleaner. Truncating at the first `|` would destroy template-style content
/// embedded in the line.
pub fn inline_translation_lines(section: &str, target: SourceLang) -> Vec<String> {
    let re = inline_line_re(target);
    re.captures_iter(section)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn inline_line_re(target: SourceLang) -> &'static Regex {
    static IO_LINE_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?im)^\*[ \t]*(?:\{\{io\}\}|Ido)[ \t]*[:.\-][ \t]*([^\n]+)$").unwrap()
    });
    static EO_LINE_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?im)^\*[ \t]*(?:\{\{eo\}\}|Esperanto)[ \t]*[:.\-][ \t]*([^\n]+)$").unwrap()
    });
    static EN_LINE_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?im)^\*[ \t]*(?:\{\{en\}\}|English|Angliana)[ \t]*[:.\-][ \t]*([^\n]+)$")
            .unwrap()
    });
    static FR_LINE_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?im)^\*[ \t]*(?:\{\{fr\}\}|French|Franciana)[ \t]*[:.\-][ \t]*([^\n]+)$")
            .unwrap()
    });
    match target {
        SourceLang::Io => &IO_LINE_RE,
        SourceLang::Eo => &EO_LINE_RE,
        SourceLang::En => &EN_LINE_RE,
        SourceLang::Fr => &FR_LINE_RE,
    }
}

/// One `{{trans-top}}`/`{{trad-début}}` table: the meaning label and the body.
#[derive(Debug, Clone, PartialEq)]
pub struct TransBlock {
    pub gloss: Option<String>,
    pub body: String,
}

/// English `{{trans-top|…}} … {{trans-bottom}}` tables.
pub fn trans_top_blocks(section: &str) -> Vec<TransBlock> {
    TRANS_TOP_RE
        .captures_iter(section)
        .map(|c| TransBlock {
            gloss: c.get(1).map(|m| m.as_str().trim().to_string()).filter(|s| !s.is_empty()),
            body: c[2].to_string(),
        })
        .collect()
}

/// French `{{trad-début|…}} … {{trad-fin}}` tables.
pub fn trad_blocks(section: &str) -> Vec<TransBlock> {
    TRAD_BLOCK_RE
        .captures_iter(section)
        .map(|c| TransBlock {
            gloss: c.get(1).map(|m| m.as_str().trim().to_string()).filter(|s| !s.is_empty()),
            body: c[2].to_string(),
        })
        .collect()
}

/// Translation-template words for `target` inside a block, with check/needed
/// templates skipped and annotations removed first.
pub fn template_translations(block: &str, target: SourceLang) -> Vec<String> {
    let mut scrubbed = SKIP_TEMPLATE_RE.replace_all(block, "").into_owned();
    scrubbed = ANNOTATION_TEMPLATE_RE.replace_all(&scrubbed, "").into_owned();
    scrubbed = GENDER_MARKER_RE.replace_all(&scrubbed, "").into_owned();

    TRANSLATION_TEMPLATE_RE
        .captures_iter(&scrubbed)
        .filter(|c| &c[1] == target.code())
        .map(|c| c[2].trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn extract_categories(text: &str) -> Vec<String> {
    CATEGORY_RE
        .captures_iter(text)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Removes `{{…}}` spans including nested templates. Unclosed templates are
/// dropped to end of text.
pub fn strip_templates(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut run_start = 0;

    while i < bytes.len() {
        if i + 1 < bytes.len() && bytes[i] == b'{' && bytes[i + 1] == b'{' {
            if run_start < i {
                result.push_str(&text[run_start..i]);
            }
            let mut depth: i32 = 0;
            let mut closed = false;
            while i + 1 < bytes.len() {
                if bytes[i] == b'{' && bytes[i + 1] == b'{' {
                    depth += 1;
                    i += 2;
                } else if bytes[i] == b'}' && bytes[i + 1] == b'}' {
                    depth -= 1;
                    if depth == 0 {
                        i += 2;
                        closed = true;
                        break;
                    }
                    i += 2;
                } else {
                    i += 1;
                }
            }
            if !closed {
                // unclosed template runs to the end
                i = bytes.len();
            }
            run_start = i;
        } else {
            i += 1;
        }
    }

    if run_start < bytes.len() {
        result.push_str(&text[run_start..]);
    }

    result
}

/// Byte offset of the matching `}}` for the `{{` at `start`.
pub fn find_matching_close(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut i = start;
    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'}' && bytes[i + 1] == b'}' {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    None
}

/// Splits on `|` at brace depth 0, respecting nested `{{ }}`.
pub fn split_at_depth_zero(content: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let bytes = content.as_bytes();
    let mut depth: i32 = 0;
    let mut last_split = 0;
    let mut i = 0;

    while i < bytes.len() {
        if i + 1 < bytes.len() && bytes[i] == b'{' && bytes[i + 1] == b'{' {
            depth += 1;
            i += 2;
        } else if i + 1 < bytes.len() && bytes[i] == b'}' && bytes[i + 1] == b'}' {
            depth -= 1;
            i += 2;
        } else if bytes[i] == b'|' && depth == 0 {
            segments.push(&content[last_split..i]);
            last_split = i + 1;
            i += 1;
        } else {
            i += 1;
        }
    }
    segments.push(&content[last_split..]);
    segments
}
