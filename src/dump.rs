use crate::error::ExtractorError;
use anyhow::Result;
use bzip2::read::BzDecoder;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::warn;

#[cfg(test)]
use bzip2::write::BzEncoder;
#[cfg(test)]
use bzip2::Compression;
#[cfg(test)]
use std::io::Write;

/// Namespace prefixes whose pages carry no lexical evidence.
const SKIPPED_TITLE_PREFIXES: [&str; 12] = [
    "Kategorio:",
    "Category:",
    "File:",
    "Dosiero:",
    "Arkivo:",
    "Shablono:",
    "Template:",
    "Wikipedia:",
    "Wikivortaro:",
    "MediaWiki:",
    "Uzanto:",
    "User:",
];

/// One main-namespace page pulled from a dump.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub id: u32,
    pub title: String,
    pub ns: i32,
    pub text: String,
}

/// True when a title names an ordinary article rather than a project page.
pub fn is_lexical_title(title: &str) -> bool {
    let t = title.trim();
    if t.len() < 2 {
        return false;
    }
    !SKIPPED_TITLE_PREFIXES.iter().any(|p| t.starts_with(p))
}

/// Streaming reader over a bz2-compressed MediaWiki XML dump.
///
/// Lazy, finite, non-restartable: decompression and XML parsing both run
/// incrementally, so memory stays proportional to a single page. Pages
/// outside the main namespace and non-lexical titles are skipped inside the
/// iterator. Per-page XML faults are reported and the page dropped; only an
/// unreadable stream ends iteration early.
pub struct DumpReader {
    reader: Reader<BufReader<BzDecoder<File>>>,
    buf: Vec<u8>,
    skip_text: bool,
    last_error_pos: usize,
}

impl DumpReader {
    pub fn open(path: &Path, skip_text: bool) -> Result<Self> {
        let file = File::open(path).map_err(|e| ExtractorError::MalformedDump {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let decoder = BzDecoder::new(file);
        let reader = Reader::from_reader(BufReader::new(decoder));

        Ok(Self {
            reader,
            buf: Vec::with_capacity(1024),
            skip_text,
            last_error_pos: usize::MAX,
        })
    }
}

impl Iterator for DumpReader {
    type Item = RawPage;

    fn next(&mut self) -> Option<Self::Item> {
        // page state
        let mut current_id: Option<u32> = None;
        let mut current_title: Option<String> = None;
        let mut current_text: Option<String> = None;
        let mut current_ns: Option<i32> = None;

        // element flags
        let mut in_title = false;
        let mut in_id = false;
        let mut in_text = false;
        let mut in_ns = false;

        loop {
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"title" => in_title = true,
                    // first <id> is the page id; revision ids come later
                    b"id" if current_id.is_none() => in_id = true,
                    b"ns" => in_ns = true,
                    b"text" => {
                        if !self.skip_text {
                            in_text = true;
                        }
                    }
                    _ => (),
                },

                Ok(Event::Text(e)) => {
                    if in_title {
                        if let Ok(s) = e.unescape() {
                            current_title = Some(s.into_owned());
                        }
                    } else if in_id {
                        let s = String::from_utf8_lossy(&e).trim().to_string();
                        current_id = s.parse::<u32>().ok();
                    } else if in_ns {
                        let s = String::from_utf8_lossy(&e).trim().to_string();
                        current_ns = s.parse::<i32>().ok();
                    } else if in_text {
                        if let Ok(s) = e.unescape() {
                            current_text = Some(s.into_owned());
                        }
                    }
                }

                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"title" => in_title = false,
                    b"id" => in_id = false,
                    b"ns" => in_ns = false,
                    b"text" => in_text = false,
                    b"page" => {
                        let ns = current_ns.unwrap_or(0);
                        if let Some(title) = current_title.take() {
                            if ns == 0 && is_lexical_title(&title) {
                                return Some(RawPage {
                                    id: current_id.take().unwrap_or(0),
                                    title,
                                    ns,
                                    text: current_text.take().unwrap_or_default(),
                                });
                            }
                        }
                        current_id = None;
                        current_text = None;
                        current_ns = None;
                    }
                    _ => (),
                },

                Ok(Event::Eof) => return None,

                Err(e) => {
                    let pos = self.reader.buffer_position();
                    warn!(position = pos, error = %e, "XML fault, skipping page");
                    if pos == self.last_error_pos {
                        // no forward progress; the stream is unrecoverable
                        return None;
                    }
                    self.last_error_pos = pos;
                    current_id = None;
                    current_title = None;
                    current_text = None;
                    current_ns = None;
                    in_title = false;
                    in_id = false;
                    in_text = false;
                    in_ns = false;
                }

                _ => (),
            }
            // reuse memory
            self.buf.clear();
        }
    }
}

#[cfg(test)]
pub(crate) fn write_bz2_xml(xml: &str) -> tempfile::NamedTempFile {
    let mut encoder = BzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(xml.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(&compressed).unwrap();
    tmp.flush().unwrap();
    tmp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_page() {
        let xml = r#"<mediawiki>
            <page>
                <title>hundo</title>
                <ns>0</ns>
                <id>7</id>
                <revision>
                    <id>9001</id>
                    <text>== Ido ==
* {{eo}}: hundo</text>
                </revision>
            </page>
        </mediawiki>"#;

        let tmp = write_bz2_xml(xml);
        let pages: Vec<_> = DumpReader::open(tmp.path(), false).unwrap().collect();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].id, 7);
        assert_eq!(pages[0].title, "hundo");
        assert_eq!(pages[0].ns, 0);
        assert!(pages[0].text.contains("{{eo}}"));
    }

    #[test]
    fn skips_non_main_namespace() {
        let xml = r#"<mediawiki>
            <page>
                <title>Diskuto:hundo</title>
                <ns>1</ns>
                <revision><text>talk</text></revision>
            </page>
            <page>
                <title>kato</title>
                <ns>0</ns>
                <revision><text>content</text></revision>
            </page>
        </mediawiki>"#;

        let tmp = write_bz2_xml(xml);
        let pages: Vec<_> = DumpReader::open(tmp.path(), false).unwrap().collect();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "kato");
    }

    #[test]
    fn skips_project_titles() {
        let xml = r#"<mediawiki>
            <page><title>Kategorio:Animali</title><ns>0</ns><revision><text>x</text></revision></page>
            <page><title>Shablono:io</title><ns>0</ns><revision><text>x</text></revision></page>
            <page><title>File:Foto.jpg</title><ns>0</ns><revision><text>x</text></revision></page>
            <page><title>arboro</title><ns>0</ns><revision><text>x</text></revision></page>
        </mediawiki>"#;

        let tmp = write_bz2_xml(xml);
        let pages: Vec<_> = DumpReader::open(tmp.path(), false).unwrap().collect();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "arboro");
    }

    #[test]
    fn skip_text_mode_drops_body() {
        let xml = r#"<mediawiki>
            <page>
                <title>aquo</title>
                <ns>0</ns>
                <revision><text>should not be read</text></revision>
            </page>
        </mediawiki>"#;

        let tmp = write_bz2_xml(xml);
        let pages: Vec<_> = DumpReader::open(tmp.path(), true).unwrap().collect();

        assert_eq!(pages.len(), 1);
        assert!(pages[0].text.is_empty());
    }

    #[test]
    fn parse_empty_dump() {
        let tmp = write_bz2_xml("<mediawiki></mediawiki>");
        let pages: Vec<_> = DumpReader::open(tmp.path(), false).unwrap().collect();
        assert!(pages.is_empty());
    }

    #[test]
    fn unescapes_xml_entities() {
        let xml = r#"<mediawiki>
            <page>
                <title>abc</title>
                <ns>0</ns>
                <revision><text>a &amp; b</text></revision>
            </page>
        </mediawiki>"#;

        let tmp = write_bz2_xml(xml);
        let pages: Vec<_> = DumpReader::open(tmp.path(), false).unwrap().collect();
        assert_eq!(pages[0].text, "a & b");
    }

    #[test]
    fn unicode_titles_survive() {
        let xml = r#"<mediawiki>
            <page>
                <title>ĉevalo</title>
                <ns>0</ns>
                <revision><text>Esperanto page</text></revision>
            </page>
        </mediawiki>"#;

        let tmp = write_bz2_xml(xml);
        let pages: Vec<_> = DumpReader::open(tmp.path(), false).unwrap().collect();
        assert_eq!(pages[0].title, "ĉevalo");
    }

    #[test]
    fn missing_ns_defaults_to_main() {
        let xml = r#"<mediawiki>
            <page>
                <title>vorto</title>
                <revision><text>body</text></revision>
            </page>
        </mediawiki>"#;

        let tmp = write_bz2_xml(xml);
        let pages: Vec<_> = DumpReader::open(tmp.path(), false).unwrap().collect();
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn nonexistent_file_is_an_error() {
        assert!(DumpReader::open(Path::new("/nonexistent/dump.xml.bz2"), false).is_err());
    }

    #[test]
    fn is_lexical_title_rules() {
        assert!(is_lexical_title("hundo"));
        assert!(is_lexical_title("Parizo"));
        assert!(!is_lexical_title("Kategorio:Urbi"));
        assert!(!is_lexical_title("Template:head"));
        assert!(!is_lexical_title("a"));
    }
}
