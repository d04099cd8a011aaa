//! Shared-string table loader.
//!
//! Workbooks deduplicate text into one `sst` part; cells reference entries
//! by zero-based index. An entry's text is the concatenation of its `<t>`
//! runs, excluding phonetic `<rPh>` annotations.

use crate::error::SheetStreamError;
use crate::helpers::xml::name_matches;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use quick_xml::events::Event;
use std::io::BufRead;

/// Ordered, immutable shared-string table addressable by zero-based index.
pub(crate) struct SharedStrings {
    strings: Vec<String>,
}

impl SharedStrings {
    /// Creates an empty table, used when the workbook has no shared strings
    pub(crate) fn new() -> SharedStrings {
        SharedStrings { strings: Vec::new() }
    }

    /// Loads the table from a shared-strings part.
    ///
    /// A malformed part never fails the sheet open: parsing stops at the
    /// first XML error and whatever was read so far is kept.
    pub(crate) fn load<R: BufRead>(reader: &mut XmlReader<R>) -> SharedStrings {
        let mut table = SharedStrings::new();
        let mut state = LoadState::default();
        loop {
            match reader.next() {
                Ok(Some(event)) => {
                    if table.accept(&mut state, event).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(_) => break,
            }
        }
        table
    }

    /// Gets the entry at `index`, or None when the index is out of range
    pub(crate) fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn from_strings(strings: Vec<String>) -> SharedStrings {
        SharedStrings { strings }
    }

    fn accept(&mut self, state: &mut LoadState, event: Event) -> Result<(), SheetStreamError> {
        match event {
            Event::Start(event) => {
                let name = event.name();
                let name = name.as_ref();
                if state.skip_depth > 0 {
                    if name_matches(name, b"rPh") {
                        state.skip_depth += 1;
                    }
                } else if state.in_item && name_matches(name, b"rPh") {
                    state.skip_depth = 1;
                } else if !state.in_table {
                    if name_matches(name, b"sst") {
                        state.in_table = true;
                    }
                } else if !state.in_item {
                    if name_matches(name, b"si") {
                        state.in_item = true;
                        state.buffer.clear();
                    }
                } else if name_matches(name, b"t") {
                    state.in_text = true;
                }
            }
            Event::End(event) => {
                let name = event.name();
                let name = name.as_ref();
                if state.skip_depth > 0 {
                    if name_matches(name, b"rPh") {
                        state.skip_depth -= 1;
                    }
                } else if state.in_text && name_matches(name, b"t") {
                    state.in_text = false;
                } else if state.in_item && name_matches(name, b"si") {
                    self.strings.push(std::mem::take(&mut state.buffer));
                    state.in_item = false;
                } else if state.in_table && name_matches(name, b"sst") {
                    state.in_table = false;
                }
            }
            Event::Text(text) if state.accumulating() => {
                state.buffer.push_bytes_text(&text)?;
            }
            Event::CData(text) if state.accumulating() => {
                state.buffer.push_str(&text.xml_content()?);
            }
            Event::GeneralRef(entity) if state.accumulating() => {
                state.buffer.push_bytes_ref(&entity)?;
            }
            _ => (),
        }
        Ok(())
    }
}

/// Parser position within the `sst` document
#[derive(Default)]
struct LoadState {
    in_table: bool,
    in_item: bool,
    in_text: bool,
    skip_depth: usize,
    buffer: String,
}

impl LoadState {
    fn accumulating(&self) -> bool {
        self.in_text && self.skip_depth == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(xml: &str) -> SharedStrings {
        let mut reader = XmlReader::new(xml.as_bytes());
        SharedStrings::load(&mut reader)
    }

    #[test]
    fn indexes_follow_document_order() {
        let table = load(r#"<sst><si><t>zero</t></si><si><t>one</t></si></sst>"#);
        assert_eq!(table.get(0), Some("zero"));
        assert_eq!(table.get(1), Some("one"));
        assert_eq!(table.get(2), None);
    }

    #[test]
    fn text_runs_concatenate_within_an_item() {
        let table = load(r#"<sst><si><r><t>Hello </t></r><r><t>world</t></r></si></sst>"#);
        assert_eq!(table.get(0), Some("Hello world"));
    }

    #[test]
    fn phonetic_runs_are_excluded() {
        let table = load(r#"<sst><si><t>山</t><rPh sb="0" eb="1"><t>やま</t></rPh></si></sst>"#);
        assert_eq!(table.get(0), Some("山"));
    }

    #[test]
    fn item_without_text_yields_empty_entry() {
        let table = load(r#"<sst><si/><si><t>x</t></si></sst>"#);
        assert_eq!(table.get(0), Some(""));
        assert_eq!(table.get(1), Some("x"));
    }

    #[test]
    fn entities_are_resolved() {
        let table = load(r#"<sst><si><t>a &amp; b &#x41;</t></si></sst>"#);
        assert_eq!(table.get(0), Some("a & b A"));
    }

    #[test]
    fn namespaced_tags_are_understood() {
        let table = load(r#"<x:sst xmlns:x="s"><x:si><x:t>v</x:t></x:si></x:sst>"#);
        assert_eq!(table.get(0), Some("v"));
    }

    #[test]
    fn truncated_part_keeps_prefix() {
        let table = load(r#"<sst><si><t>kept</t></si><si><t>lost"#);
        assert_eq!(table.get(0), Some("kept"));
        assert_eq!(table.get(1), None);
    }
}
