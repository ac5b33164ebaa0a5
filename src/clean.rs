use crate::wikitext::{find_matching_close, split_at_depth_zero};
use once_cell::sync::Lazy;
use regex::Regex;

static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'''([^']*(?:'[^']+)*?)'''").unwrap());
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"''([^']*)''").unwrap());
static NUMBER_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+[.)]\s*").unwrap());
static PIPED_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[[^\]|]*\|([^\]]+)\]\]").unwrap());
static PLAIN_LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[([^\]]+)\]\]").unwrap());
static LANG_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([a-z]{2,3}\)\s*$").unwrap());
static GENDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\s*[♀♂]\s*\)|[♀♂]").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static LANG_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]{2,3}$").unwrap());

/// Names whose whole template is dropped (unchecked / requested
/// translations carry no usable word).
const DROPPED_TEMPLATES: [&str; 2] = ["t-check", "t-needed"];

/// Names whose second argument (after the language code) is the word.
const TRANSLATION_TEMPLATES: [&str; 10] =
    ["t", "t+", "tt", "tt+", "l", "m", "tr", "trad", "trad+", "link"];

/// What a single template resolves to during cleaning. Unknown templates
/// fall through to the argument rules; there is no user-extensible registry.
fn resolve_template(inner: &str) -> Option<String> {
    let segments = split_at_depth_zero(inner);
    let name = segments[0].trim();
    let args: Vec<&str> = segments[1..]
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if DROPPED_TEMPLATES.contains(&name) {
        return None;
    }
    // pure language-code template: {{io}}, {{eo}}, {{en}}
    if args.is_empty() && LANG_CODE_RE.is_match(name) {
        return None;
    }
    if args.len() >= 2
        && (TRANSLATION_TEMPLATES.contains(&name) || LANG_CODE_RE.is_match(args[0]))
    {
        return Some(args[1].to_string());
    }
    if args.len() == 1 {
        return Some(args[0].to_string());
    }
    None
}

/// Replaces every `{{…}}` span by its resolved text (recursively for nested
/// arguments), or removes it.
fn process_templates(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut run_start = 0;

    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            out.push_str(&text[run_start..i]);
            match find_matching_close(bytes, i) {
                Some(close) => {
                    let inner = &text[i + 2..close];
                    // nested templates inside arguments resolve first
                    let resolved_inner = if inner.contains("{{") {
                        process_templates(inner)
                    } else {
                        inner.to_string()
                    };
                    if let Some(word) = resolve_template(&resolved_inner) {
                        out.push_str(&word);
                    }
                    i = close + 2;
                }
                None => {
                    // unclosed template: drop the rest
                    i = bytes.len();
                }
            }
            run_start = i;
        } else {
            i += 1;
        }
    }
    if run_start < text.len() {
        out.push_str(&text[run_start..]);
    }
    out
}

/// Cleans a candidate lemma or translation term: strips wiki markup in a
/// fixed order and normalizes whitespace/punctuation. Returns an empty
/// string when nothing survives.
pub fn clean_term(raw: &str) -> String {
    // 1. bold / italic
    let mut text = BOLD_RE.replace_all(raw, "$1").into_owned();
    text = ITALIC_RE.replace_all(&text, "$1").into_owned();

    // 2. numbered-definition prefix
    text = NUMBER_PREFIX_RE.replace(&text, "").into_owned();

    // 3. wiki links keep the display text
    text = PIPED_LINK_RE.replace_all(&text, "$1").into_owned();
    text = PLAIN_LINK_RE.replace_all(&text, "$1").into_owned();

    // 4. templates
    text = process_templates(&text);

    // 5. trailing language indicator
    text = LANG_SUFFIX_RE.replace(&text, "").into_owned();

    // 6. gender symbols (italics already stripped around them)
    text = GENDER_RE.replace_all(&text, "").into_owned();

    // 7. whitespace and edge punctuation (hyphen is part of many lemmas)
    text = WS_RE.replace_all(&text, " ").into_owned();
    text
        .trim_matches(|c: char| {
            c.is_whitespace() || (c != '-' && (c.is_ascii_punctuation() || c == '–' || c == '…'))
        })
        .to_string()
}

/// Splits cleaned translation content into meaning groups: semicolons
/// separate meanings, commas separate synonymous terms inside one meaning.
pub fn split_term_groups(cleaned: &str) -> Vec<Vec<String>> {
    cleaned
        .split(';')
        .map(|group| {
            group
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|g| !g.is_empty())
        .collect()
}

fn has_markup(lemma: &str) -> bool {
    lemma.contains("'''")
        || lemma.contains("''")
        || lemma.contains("[[")
        || lemma.contains("]]")
        || lemma.contains("{{")
        || lemma.contains("}}")
}

/// Validator for cleaned lemmas. Rejection is final: the entry is dropped
/// and tallied, never repaired.
pub fn is_valid_lemma(lemma: &str) -> bool {
    is_valid_lemma_with(lemma, false)
}

/// `allow_acronym` lifts the all-uppercase rejection for Wikipedia entries
/// classified as organizations.
pub fn is_valid_lemma_with(lemma: &str, allow_acronym: bool) -> bool {
    let char_count = lemma.chars().count();
    if char_count < crate::config::MIN_LEMMA_LEN {
        return false;
    }
    let Some(first) = lemma.chars().next() else {
        return false;
    };
    if !first.is_alphabetic() {
        return false;
    }
    if !lemma.chars().any(|c| c.is_alphabetic()) {
        return false;
    }
    if has_markup(lemma) {
        return false;
    }
    if lemma.contains(':') && char_count > crate::config::LONG_LEMMA_COLON_LIMIT {
        return false;
    }
    if !allow_acronym && char_count > 4 {
        let letters: Vec<char> = lemma.chars().filter(|c| c.is_alphabetic()).collect();
        if !letters.is_empty() && letters.iter().all(|c| c.is_uppercase()) {
            return false;
        }
    }
    true
}

/// Validator for cleaned translation terms; lighter than the lemma rules
/// but still refuses markup leftovers and empty strings.
pub fn is_valid_term(term: &str) -> bool {
    !term.is_empty() && !has_markup(term) && term.chars().any(|c| c.is_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_numbered_prefix_and_lang_suffix() {
        assert_eq!(clean_term("'''1.''' tu (io)"), "tu");
    }

    #[test]
    fn clean_bold_piped_link() {
        assert_eq!(clean_term("'''[[altra|ALTRA]]'''"), "ALTRA");
    }

    #[test]
    fn clean_translation_and_qualifier_templates() {
        assert_eq!(clean_term("{{tr|io|hundo}} {{qualifier|common}}"), "hundo common");
    }

    #[test]
    fn clean_plain_link() {
        assert_eq!(clean_term("[[hundo]]"), "hundo");
    }

    #[test]
    fn clean_language_code_template_removed() {
        assert_eq!(clean_term("{{io}} vorto"), "vorto");
    }

    #[test]
    fn clean_zero_argument_template_removed() {
        assert_eq!(clean_term("{{reflist}} kato"), "kato");
    }

    #[test]
    fn clean_gender_symbols() {
        assert_eq!(clean_term("hundo (''♀'')"), "hundo");
        assert_eq!(clean_term("kato (♂)"), "kato");
    }

    #[test]
    fn clean_collapses_whitespace_and_trims_punctuation() {
        assert_eq!(clean_term("  hundo ,  "), "hundo");
        assert_eq!(clean_term("hundo."), "hundo");
    }

    #[test]
    fn clean_keeps_hyphen() {
        assert_eq!(clean_term("abel-manjero"), "abel-manjero");
    }

    #[test]
    fn clean_nested_template_resolves_inner_first() {
        assert_eq!(clean_term("{{t|eo|{{l|eo|seĝo}}}}"), "seĝo");
    }

    #[test]
    fn clean_unclosed_template_dropped() {
        assert_eq!(clean_term("{{t|eo|seĝo"), "");
    }

    #[test]
    fn clean_empty_in_empty_out() {
        assert_eq!(clean_term(""), "");
        assert_eq!(clean_term("{{en}}"), "");
    }

    #[test]
    fn split_term_groups_semicolons_and_commas() {
        let groups = split_term_groups("madaldama, malaltigi; bassi");
        assert_eq!(
            groups,
            vec![
                vec!["madaldama".to_string(), "malaltigi".to_string()],
                vec!["bassi".to_string()],
            ]
        );
    }

    #[test]
    fn split_term_groups_drops_empties() {
        assert!(split_term_groups(" ; ; ").is_empty());
    }

    #[test]
    fn invalid_unclosed_bold() {
        assert!(!is_valid_lemma("'''abelo"));
    }

    #[test]
    fn invalid_too_short() {
        assert!(!is_valid_lemma("a"));
        assert!(!is_valid_lemma(""));
    }

    #[test]
    fn invalid_leading_nonalpha() {
        assert!(!is_valid_lemma("(hundo)"));
        assert!(!is_valid_lemma("*hundo"));
        assert!(!is_valid_lemma("#hundo"));
        assert!(!is_valid_lemma("%hundo"));
        assert!(!is_valid_lemma("1hundo"));
    }

    #[test]
    fn invalid_markup_leftovers() {
        assert!(!is_valid_lemma("hun[[do]]"));
        assert!(!is_valid_lemma("hun{{do}}"));
    }

    #[test]
    fn invalid_long_sentence_like_title() {
        let long = "Listo di la maxim granda urbi: Francia";
        assert!(!is_valid_lemma(long));
        // short lemma with a colon is fine
        assert!(is_valid_lemma("a:b-vorto"));
    }

    #[test]
    fn invalid_all_uppercase_acronym() {
        assert!(!is_valid_lemma("UNESCO"));
        // short uppercase words pass
        assert!(is_valid_lemma("NATO"));
        // organization classification lifts the rule
        assert!(is_valid_lemma_with("UNESCO", true));
    }

    #[test]
    fn valid_esperanto_diacritics() {
        assert!(is_valid_lemma("ĉevalo"));
        assert!(is_valid_lemma("ŝtono"));
    }

    #[test]
    fn valid_proper_noun_keeps_capital() {
        assert!(is_valid_lemma("Parizo"));
    }

    #[test]
    fn term_validity() {
        assert!(is_valid_term("seĝo"));
        assert!(!is_valid_term(""));
        assert!(!is_valid_term("se[[ĝo"));
        assert!(!is_valid_term("123"));
    }
}
