//! Worksheet name enumerator.
//!
//! Streams the `<sheet>` elements of the workbook part one at a time, so
//! listing names never materializes the whole document.

use crate::error::SheetStreamError;
use crate::helpers::xml::name_matches;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use quick_xml::events::Event;
use std::io::BufRead;

/// Iterator over the worksheet names of a workbook, in document order.
///
/// Created by [`Workbook::sheet_names`](crate::Workbook::sheet_names).
pub struct SheetNames<R: BufRead> {
    reader: XmlReader<R>,
}

impl<R: BufRead> SheetNames<R> {
    pub(crate) fn new(reader: XmlReader<R>) -> SheetNames<R> {
        SheetNames { reader }
    }
}

impl<R: BufRead> Iterator for SheetNames<R> {
    type Item = Result<String, SheetStreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.next() {
                Ok(Some(Event::Start(event)))
                    if name_matches(event.name().as_ref(), b"sheet") =>
                {
                    match event.find_attribute("name") {
                        Ok(Some(name)) => return Some(Ok(name.into_owned())),
                        Ok(None) => continue,
                        Err(error) => return Some(Err(error)),
                    }
                }
                Ok(Some(_)) => continue,
                Ok(None) => return None,
                Err(error) => return Some(Err(error)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(xml: &str) -> Vec<String> {
        let enumerator = SheetNames::new(XmlReader::new(xml.as_bytes()));
        enumerator.map(|name| name.unwrap()).collect()
    }

    #[test]
    fn yields_names_in_document_order() {
        let xml = r#"<workbook><sheets>
            <sheet name="Data" sheetId="1" r:id="rId1"/>
            <sheet name="Summary" sheetId="2" r:id="rId2"/>
        </sheets></workbook>"#;
        assert_eq!(names(xml), vec!["Data", "Summary"]);
    }

    #[test]
    fn empty_workbook_yields_nothing() {
        assert!(names("<workbook><sheets/></workbook>").is_empty());
    }

    #[test]
    fn nameless_sheets_are_skipped() {
        let xml = r#"<workbook><sheets><sheet sheetId="1"/><sheet name="Kept"/></sheets></workbook>"#;
        assert_eq!(names(xml), vec!["Kept"]);
    }
}
