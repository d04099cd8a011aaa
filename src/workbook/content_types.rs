//! `[Content_Types].xml` walker.
//!
//! The content-type index classifies every part in the container, either
//! explicitly (`Override`) or by file extension (`Default`). The workbook
//! part is located by content type, never by a hardcoded path.

use crate::error::SheetStreamError;
use crate::helpers::xml::name_matches;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::workbook::WorkbookError;
use quick_xml::events::Event;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

/// Path of the content-type index within the container
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Workbook content types recognized by the reader, in lookup order
pub(crate) const WORKBOOK_CONTENT_TYPES: [&str; 4] = [
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
    "application/vnd.ms-excel.sheet.macroEnabled.main+xml",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.template.main+xml",
    "application/vnd.ms-excel.template.macroEnabled.main+xml",
];

/// One entry of the content-type index, in document order
enum ContentTypeEntry {
    /// Explicit part path with its content type
    Override { part: String, content_type: String },
    /// By-extension mapping for parts without an override
    Default { extension: String, content_type: String },
}

/// Parses the content-type index from the archive
fn load_index<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
) -> Result<Vec<ContentTypeEntry>, SheetStreamError> {
    let mut reader = zip.xml_reader(CONTENT_TYPES_PART)?
        .ok_or_else(|| WorkbookError::MissingPartError(CONTENT_TYPES_PART.to_string()))?;
    let mut entries = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if name_matches(event.name().as_ref(), b"Override") => {
            let part = event.find_attribute("PartName")?;
            let content_type = event.find_attribute("ContentType")?;
            if let Some((part, content_type)) = part.zip(content_type) {
                entries.push(ContentTypeEntry::Override {
                    part: part.strip_prefix('/').unwrap_or(part.as_ref()).to_string(),
                    content_type: content_type.to_string(),
                });
            }
        }
        Event::Start(event) if name_matches(event.name().as_ref(), b"Default") => {
            let extension = event.find_attribute("Extension")?;
            let content_type = event.find_attribute("ContentType")?;
            if let Some((extension, content_type)) = extension.zip(content_type) {
                entries.push(ContentTypeEntry::Default {
                    extension: extension.to_string(),
                    content_type: content_type.to_string(),
                });
            }
        }
    });
    Ok(entries)
}

/// Checks whether an entry name ends in `"." + extension`, ignoring case
fn has_extension(name: &str, extension: &str) -> bool {
    let name = name.as_bytes();
    let extension = extension.as_bytes();
    name.len() > extension.len() + 1
        && name[name.len() - extension.len() - 1] == b'.'
        && name[name.len() - extension.len()..].eq_ignore_ascii_case(extension)
}

/// Lists the parts whose content type equals `content_type`, in index order.
///
/// Content-type comparison is case-sensitive per the OOXML convention; the
/// extension suffix match of `Default` entries is case-insensitive.
pub(crate) fn parts_with_content_type<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    content_type: &str,
) -> Result<Vec<String>, SheetStreamError> {
    let index = load_index(zip)?;
    let entry_names: Vec<String> = zip.file_names().map(|name| name.to_owned()).collect();
    let mut parts = Vec::new();
    for entry in index {
        match entry {
            ContentTypeEntry::Override { part, content_type: kind } => {
                if kind == content_type {
                    parts.push(part);
                }
            }
            ContentTypeEntry::Default { extension, content_type: kind } => {
                if kind == content_type {
                    parts.extend(
                        entry_names
                            .iter()
                            .filter(|name| has_extension(name, &extension))
                            .cloned(),
                    );
                }
            }
        }
    }
    Ok(parts)
}
