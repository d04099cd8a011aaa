//! XML parsing utilities for the OOXML spreadsheet parts.
//! Provides an XML reader wrapper plus helper traits for attribute lookup and
//! text accumulation with the name-matching rules used throughout the format.

use crate::error::SheetStreamError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),
}

/// XML reader wrapper with optimized configuration for spreadsheet parsing
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    /// Creates a new XML reader with optimized configuration for spreadsheet parsing
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event, or None at the end of the document
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, SheetStreamError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(SheetStreamError::XmlError(error)),
        }
    }
}

/// Compares an element or attribute name against a reference name, ignoring
/// ASCII case and any namespace prefix on the candidate.
///
/// Two names match when they are equal ignoring case, or when the candidate
/// ends in `:` followed by a local part that matches the reference ignoring
/// case (`x:Row` matches `row`).
pub(crate) fn name_matches(candidate: &[u8], reference: &[u8]) -> bool {
    if candidate.len() == reference.len() {
        return candidate.eq_ignore_ascii_case(reference);
    }
    if candidate.len() > reference.len() {
        let split = candidate.len() - reference.len();
        return candidate[split - 1] == b':' && candidate[split..].eq_ignore_ascii_case(reference);
    }
    false
}

/// Helper trait for XML attributes providing convenient value extraction
pub(crate) trait XmlAttributeHelper<'a> {
    /// Gets the unescaped attribute value as a string
    fn get_value(&self) -> Result<Cow<'a, str>, SheetStreamError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, SheetStreamError> {
        Ok(self.unescape_value()?)
    }
}

/// Helper trait for XML nodes providing attribute access methods
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an attribute value by name, ignoring case and namespace prefixes
    fn find_attribute(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, SheetStreamError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn find_attribute(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, SheetStreamError> {
        for result in self.attributes() {
            let attribute = result?;
            if name_matches(attribute.key.as_ref(), name.as_bytes()) {
                return attribute.get_value().map(Some);
            }
        }
        Ok(None)
    }
}

/// Helper trait for building text content from XML events
pub(crate) trait XmlTextContextHelper {
    /// Appends text content from a BytesText event
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), SheetStreamError>;

    /// Appends text content from a BytesRef event (entities and character references)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), SheetStreamError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), SheetStreamError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), SheetStreamError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                u32::from_str_radix(number, 10)?
            };
            if let Some(character) = std::char::from_u32(code) {
                self.push_str(character.encode_utf8(&mut [0u8; 4]));
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_matches_plain() {
        assert!(name_matches(b"row", b"row"));
        assert!(name_matches(b"Row", b"row"));
        assert!(name_matches(b"SHEETDATA", b"sheetData"));
        assert!(!name_matches(b"rows", b"row"));
        assert!(!name_matches(b"ro", b"row"));
    }

    #[test]
    fn name_matches_namespaced() {
        assert!(name_matches(b"x:Row", b"row"));
        assert!(name_matches(b"ss:c", b"c"));
        assert!(!name_matches(b"xRow", b"row"));
        assert!(!name_matches(b"row", b"x:row"));
    }

    #[test]
    fn find_attribute_ignores_case_and_namespace() {
        let mut reader = XmlReader::new(&br#"<sheet Name="Data" r:id="rId7"/>"#[..]);
        let Ok(Some(Event::Start(event))) = reader.next() else {
            panic!("expected start event");
        };
        assert_eq!(event.find_attribute("name").unwrap().as_deref(), Some("Data"));
        assert_eq!(event.find_attribute("r:id").unwrap().as_deref(), Some("rId7"));
        assert_eq!(event.find_attribute("id").unwrap().as_deref(), Some("rId7"));
        assert_eq!(event.find_attribute("missing").unwrap(), None);
    }
}
