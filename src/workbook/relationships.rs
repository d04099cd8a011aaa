//! Relationship resolution for the workbook part.
//!
//! Sheet names map to relationship ids inside the workbook part; the
//! companion `.rels` file maps those ids to part paths. Worksheet,
//! shared-strings, and styles targets are resolved relative to the
//! workbook's base directory.

use crate::error::SheetStreamError;
use crate::helpers::xml::name_matches;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use quick_xml::events::Event;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

/// Relationship type URI suffixes selecting the targets of interest
const WORKSHEET_RELATIONSHIP: &str = "/worksheet";
const SHARED_STRINGS_RELATIONSHIP: &str = "/sharedStrings";
const STYLES_RELATIONSHIP: &str = "/styles";

/// Resolved part paths for one worksheet of a workbook.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SheetParts {
    /// Worksheet part path within the archive
    pub worksheet: String,
    /// Shared-strings part path, when the workbook carries one
    pub shared_strings: Option<String>,
    /// Styles part path, recorded for downstream use but not interpreted
    pub styles: Option<String>,
}

/// Finds the relationship id of the first `<sheet>` matching `sheet_name`
/// (any sheet when `None`). Sheet names compare ASCII case-insensitively.
pub(crate) fn find_sheet_rel_id<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    workbook_part: &str,
    sheet_name: Option<&str>,
) -> Result<Option<String>, SheetStreamError> {
    let Some(mut reader) = zip.xml_reader(workbook_part)? else {
        return Ok(None);
    };
    let mut rel_id = None;
    match_xml_events!(reader => {
        Event::Start(event) if name_matches(event.name().as_ref(), b"sheet") => {
            let name = event.find_attribute("name")?;
            let accepted = match (sheet_name, name.as_deref()) {
                (None, _) => true,
                (Some(wanted), Some(found)) => wanted.eq_ignore_ascii_case(found),
                (Some(_), None) => false,
            };
            if accepted {
                if let Some(id) = event.find_attribute("r:id")? {
                    if !id.is_empty() {
                        rel_id = Some(id.to_string());
                        break;
                    }
                }
            }
        }
    });
    Ok(rel_id)
}

/// Resolves the worksheet, shared-strings, and styles targets from the
/// workbook's companion `.rels` file. The worksheet target is the
/// `<Relationship>` whose `Id` equals `rel_id`; the shared-strings and
/// styles targets are selected by type alone.
pub(crate) fn resolve_sheet_parts<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    workbook_part: &str,
    rel_id: &str,
) -> Result<Option<SheetParts>, SheetStreamError> {
    let base = base_path(workbook_part);
    let rels_part = relationship_path(workbook_part);
    let Some(mut reader) = zip.xml_reader(&rels_part)? else {
        return Ok(None);
    };

    let mut worksheet = None;
    let mut shared_strings = None;
    let mut styles = None;
    match_xml_events!(reader => {
        Event::Start(event) if name_matches(event.name().as_ref(), b"Relationship") => {
            let Some(kind) = event.find_attribute("Type")? else { continue };
            let target = event.find_attribute("Target")?;
            let Some(target) = target.filter(|target| !target.is_empty()) else { continue };
            if kind.ends_with(WORKSHEET_RELATIONSHIP) {
                let id = event.find_attribute("Id")?;
                if id.as_deref().is_some_and(|id| id.eq_ignore_ascii_case(rel_id)) {
                    worksheet = Some(join_target(base, &target));
                }
            } else if kind.ends_with(SHARED_STRINGS_RELATIONSHIP) {
                shared_strings = Some(join_target(base, &target));
            } else if kind.ends_with(STYLES_RELATIONSHIP) {
                styles = Some(join_target(base, &target));
            }
        }
    });

    Ok(worksheet.map(|worksheet| SheetParts {
        worksheet,
        shared_strings,
        styles,
    }))
}

/// Derives the companion `.rels` path by inserting `_rels/` before the last
/// path segment and appending `.rels` (`xl/workbook.xml` gives
/// `xl/_rels/workbook.xml.rels`).
pub(crate) fn relationship_path(part: &str) -> String {
    let split = part.rfind('/').map_or(0, |index| index + 1);
    format!("{}_rels/{}.rels", &part[..split], &part[split..])
}

/// The portion of a part path up to and including the final `/`, or the
/// empty string when the part lives at the archive root.
pub(crate) fn base_path(part: &str) -> &str {
    let split = part.rfind('/').map_or(0, |index| index + 1);
    &part[..split]
}

/// Joins a relationship target to a base directory. A target starting with
/// `/` is absolute within the archive (the slash is dropped); anything else
/// is relative to the base.
fn join_target(base: &str, target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) if !absolute.is_empty() => absolute.to_string(),
        _ => format!("{base}{target}"),
    }
}
