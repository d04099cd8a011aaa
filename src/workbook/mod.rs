//! # Workbook access
//!
//! The [`Workbook`] handle owns the ZIP container and hands out traversal
//! handles over its parts: [`SheetNames`] for enumeration, [`SheetReader`]
//! for pull-based cell streaming, and [`Workbook::process`] for push-based
//! traversal with callbacks. All part locations are resolved through the
//! content-type index and the relationship files, never hardcoded.

pub mod cell;
mod content_types;
mod reference;
mod relationships;
mod scanner;
mod shared_strings;
mod sheet;
mod sheets;

pub use self::relationships::SheetParts;
pub use self::scanner::SkipPolicy;
pub use self::sheet::SheetReader;
pub use self::sheets::SheetNames;

use crate::error::SheetStreamError;
use crate::helpers::reader::InputSource;
use crate::helpers::zip::ZipHelper;
use crate::workbook::content_types::parts_with_content_type;
use crate::workbook::content_types::WORKBOOK_CONTENT_TYPES;
use crate::workbook::scanner::pump;
use crate::workbook::scanner::Mode;
use crate::workbook::scanner::Pumped;
use crate::workbook::scanner::SheetScanner;
use crate::workbook::shared_strings::SharedStrings;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::ops::ControlFlow;
use std::path::Path;
use thiserror::Error;
use zip::read::ZipFile;
use zip::ZipArchive;

/// Errors raised while locating workbook parts
#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("Missing part '{0}' in archive")]
    MissingPartError(String),

    #[error("No workbook part found in archive")]
    MissingWorkbookError,

    #[error("Workbook contains no sheets")]
    WorkbookEmptyError,

    #[error("Sheet '{0}' not found in workbook")]
    SheetNotFoundError(String),

    #[error("No worksheet target for relationship '{0}'")]
    MissingRelationshipError(String),
}

/// Read handle for one spreadsheet container.
///
/// The handle owns the archive reader; every sheet or enumerator handle
/// borrows it, so they cannot outlive the workbook and at most one archive
/// entry is open at a time.
pub struct Workbook<RS: Read + Seek = InputSource> {
    zip: ZipArchive<RS>,
}

impl Workbook<InputSource> {
    /// Opens a spreadsheet file by path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Workbook<InputSource>, SheetStreamError> {
        Workbook::from_reader(InputSource::from_path(path.as_ref())?)
    }

    /// Opens a spreadsheet from an already-open file handle
    pub fn from_file(file: File) -> Result<Workbook<InputSource>, SheetStreamError> {
        Workbook::from_reader(InputSource::from_file(file))
    }

    /// Opens a spreadsheet from an owned memory buffer. The buffer is
    /// released when the workbook is dropped; to keep ownership, pass a
    /// `Cursor<&[u8]>` to [`Workbook::from_reader`] instead.
    pub fn from_memory(data: Vec<u8>) -> Result<Workbook<InputSource>, SheetStreamError> {
        Workbook::from_reader(InputSource::from_memory(data))
    }
}

impl<RS: Read + Seek> Workbook<RS> {
    /// Opens a spreadsheet from any seekable reader
    pub fn from_reader(reader: RS) -> Result<Workbook<RS>, SheetStreamError> {
        Ok(Workbook {
            zip: ZipArchive::new(reader)?,
        })
    }

    /// Lists the worksheet names, streamed from the workbook part
    pub fn sheet_names(
        &mut self,
    ) -> Result<SheetNames<BufReader<ZipFile<'_, RS>>>, SheetStreamError> {
        let part = self
            .workbook_part()?
            .ok_or(WorkbookError::MissingWorkbookError)?;
        let reader = self
            .zip
            .xml_reader(&part)?
            .ok_or(WorkbookError::MissingPartError(part))?;
        Ok(SheetNames::new(reader))
    }

    /// Resolves the part paths behind a sheet: the worksheet itself plus
    /// the workbook's shared-strings and styles parts when present.
    /// `None` selects the first sheet.
    pub fn sheet_parts(
        &mut self,
        sheet_name: Option<&str>,
    ) -> Result<SheetParts, SheetStreamError> {
        for content_type in WORKBOOK_CONTENT_TYPES {
            for part in parts_with_content_type(&mut self.zip, content_type)? {
                let Some(rel_id) =
                    relationships::find_sheet_rel_id(&mut self.zip, &part, sheet_name)?
                else {
                    continue;
                };
                return relationships::resolve_sheet_parts(&mut self.zip, &part, &rel_id)?
                    .ok_or_else(|| WorkbookError::MissingRelationshipError(rel_id).into());
            }
        }
        Err(match sheet_name {
            Some(name) => WorkbookError::SheetNotFoundError(name.to_owned()),
            None => WorkbookError::WorkbookEmptyError,
        }
        .into())
    }

    /// Opens a sheet for pull-based reading. The parser is parked at the
    /// first row; drive it with [`SheetReader::next_row`] and
    /// [`SheetReader::next_cell`].
    pub fn read_sheet(
        &mut self,
        sheet_name: Option<&str>,
        policy: SkipPolicy,
    ) -> Result<SheetReader<BufReader<ZipFile<'_, RS>>>, SheetStreamError> {
        let parts = self.sheet_parts(sheet_name)?;
        let shared = self.load_shared_strings(parts.shared_strings.as_deref())?;
        let reader = self
            .zip
            .xml_reader(&parts.worksheet)?
            .ok_or(WorkbookError::MissingPartError(parts.worksheet))?;
        Ok(SheetReader::new(reader, shared, policy))
    }

    /// Traverses a sheet in push mode, invoking `on_cell` for every cell
    /// and `on_row` after each row. Returning `ControlFlow::Break` from
    /// either callback stops the traversal cleanly.
    pub fn process<F, G>(
        &mut self,
        sheet_name: Option<&str>,
        policy: SkipPolicy,
        mut on_cell: F,
        mut on_row: G,
    ) -> Result<(), SheetStreamError>
    where
        F: FnMut(usize, usize, Option<&str>) -> ControlFlow<()>,
        G: FnMut(usize, usize) -> ControlFlow<()>,
    {
        let parts = self.sheet_parts(sheet_name)?;
        let shared = self.load_shared_strings(parts.shared_strings.as_deref())?;
        let mut reader = self
            .zip
            .xml_reader(&parts.worksheet)?
            .ok_or(WorkbookError::MissingPartError(parts.worksheet))?;
        let mut scanner = SheetScanner::new(
            shared,
            policy,
            Mode::Push {
                on_cell: &mut on_cell,
                on_row: &mut on_row,
            },
        );
        loop {
            match pump(&mut reader, &mut scanner)? {
                Pumped::Suspended => continue,
                Pumped::Finished | Pumped::Stopped => return Ok(()),
            }
        }
    }

    /// The first workbook part among the recognized content types
    fn workbook_part(&mut self) -> Result<Option<String>, SheetStreamError> {
        for content_type in WORKBOOK_CONTENT_TYPES {
            let mut parts = parts_with_content_type(&mut self.zip, content_type)?;
            if !parts.is_empty() {
                return Ok(Some(parts.remove(0)));
            }
        }
        Ok(None)
    }

    /// Loads the shared-string table, or an empty one when the workbook
    /// has no shared-strings part
    fn load_shared_strings(
        &mut self,
        part: Option<&str>,
    ) -> Result<SharedStrings, SheetStreamError> {
        let Some(part) = part else {
            return Ok(SharedStrings::new());
        };
        match self.zip.xml_reader(part)? {
            Some(mut reader) => Ok(SharedStrings::load(&mut reader)),
            None => Ok(SharedStrings::new()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use std::ops::ControlFlow;

    const ROWS: &str = r#"<row r="1"><c r="A1"><v>hello</v></c><c r="B1"><v>42</v></c><c r="C1" t="s"><v>0</v></c></row>"#;

    #[test]
    fn reads_a_sheet_from_memory() {
        let bytes = fixture::workbook_bytes(ROWS, &["world"]);
        let mut workbook = Workbook::from_memory(bytes).unwrap();
        let mut sheet = workbook.read_sheet(None, SkipPolicy::NONE).unwrap();
        assert!(sheet.next_row().unwrap());
        assert_eq!(sheet.next_cell().unwrap().as_deref(), Some("hello"));
        assert_eq!(sheet.next_cell().unwrap().as_deref(), Some("42"));
        assert_eq!(sheet.next_cell().unwrap().as_deref(), Some("world"));
        assert_eq!(sheet.next_cell().unwrap(), None);
        assert!(!sheet.next_row().unwrap());
    }

    #[test]
    fn reads_a_sheet_by_name() {
        let bytes = fixture::workbook_bytes(ROWS, &["world"]);
        let mut workbook = Workbook::from_memory(bytes).unwrap();
        let mut sheet = workbook.read_sheet(Some("Sheet1"), SkipPolicy::NONE).unwrap();
        assert!(sheet.next_row().unwrap());

        drop(sheet);
        let error = workbook.read_sheet(Some("Nope"), SkipPolicy::NONE).unwrap_err();
        assert!(matches!(
            error,
            SheetStreamError::WorkbookError(WorkbookError::SheetNotFoundError(_))
        ));
    }

    #[test]
    fn reads_from_a_borrowed_buffer() {
        let bytes = fixture::workbook_bytes(ROWS, &[]);
        let mut workbook = Workbook::from_reader(Cursor::new(bytes.as_slice())).unwrap();
        let mut sheet = workbook.read_sheet(None, SkipPolicy::NONE).unwrap();
        assert!(sheet.next_row().unwrap());
        assert_eq!(sheet.next_cell().unwrap().as_deref(), Some("hello"));
    }

    #[test]
    fn opens_by_path_and_file_handle() {
        let bytes = fixture::workbook_bytes(ROWS, &[]);
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(&bytes).unwrap();

        let mut workbook = Workbook::open(temp.path()).unwrap();
        assert!(workbook.read_sheet(None, SkipPolicy::NONE).is_ok());

        let file = File::open(temp.path()).unwrap();
        let mut workbook = Workbook::from_file(file).unwrap();
        assert!(workbook.read_sheet(None, SkipPolicy::NONE).is_ok());

        assert!(Workbook::open("no_such_workbook.xlsx").is_err());
    }

    #[test]
    fn lists_sheet_names() {
        let bytes = fixture::workbook_bytes(ROWS, &[]);
        let mut workbook = Workbook::from_memory(bytes).unwrap();
        let names: Vec<String> = workbook
            .sheet_names()
            .unwrap()
            .map(|name| name.unwrap())
            .collect();
        assert_eq!(names, vec!["Sheet1"]);
    }

    #[test]
    fn resolves_sheet_parts() {
        let bytes = fixture::workbook_bytes(ROWS, &["world"]);
        let mut workbook = Workbook::from_memory(bytes).unwrap();
        let parts = workbook.sheet_parts(None).unwrap();
        assert_eq!(parts.worksheet, "xl/worksheets/sheet1.xml");
        assert_eq!(parts.shared_strings.as_deref(), Some("xl/sharedStrings.xml"));
        assert_eq!(parts.styles, None);
    }

    #[test]
    fn push_traversal_emits_cells_and_rows() {
        let bytes = fixture::workbook_bytes(ROWS, &["world"]);
        let mut workbook = Workbook::from_memory(bytes).unwrap();
        let mut cells = Vec::new();
        let mut rows = Vec::new();
        workbook
            .process(
                None,
                SkipPolicy::NONE,
                |row, col, value| {
                    cells.push((row, col, value.map(str::to_owned)));
                    ControlFlow::Continue(())
                },
                |row, col| {
                    rows.push((row, col));
                    ControlFlow::Continue(())
                },
            )
            .unwrap();
        assert_eq!(
            cells,
            vec![
                (1, 1, Some("hello".to_string())),
                (1, 2, Some("42".to_string())),
                (1, 3, Some("world".to_string())),
            ]
        );
        assert_eq!(rows, vec![(1, 3)]);
    }

    #[test]
    fn push_traversal_stops_on_break() {
        let bytes = fixture::workbook_bytes(ROWS, &["world"]);
        let mut workbook = Workbook::from_memory(bytes).unwrap();
        let mut count = 0;
        workbook
            .process(
                None,
                SkipPolicy::NONE,
                |_, _, _| {
                    count += 1;
                    ControlFlow::Break(())
                },
                |_, _| ControlFlow::Continue(()),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn missing_content_types_is_a_container_error() {
        let bytes = fixture::archive(&[("xl/workbook.xml", "<workbook/>")]);
        let mut workbook = Workbook::from_memory(bytes).unwrap();
        assert!(workbook.sheet_names().is_err());
        assert!(workbook.read_sheet(None, SkipPolicy::NONE).is_err());
    }

    #[test]
    fn unreferenced_shared_strings_part_is_not_required() {
        // the rels advertise a shared-strings part that is absent from the
        // archive; cells that never reference it still read fine
        let bytes = fixture::archive(&[
            (
                "[Content_Types].xml",
                r#"<Types><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#,
            ),
            (
                "xl/workbook.xml",
                r#"<workbook><sheets><sheet name="S" r:id="rId1"/></sheets></workbook>"#,
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<Relationships>
                    <Relationship Id="rId1" Type="http://x/worksheet" Target="worksheets/sheet1.xml"/>
                    <Relationship Id="rId2" Type="http://x/sharedStrings" Target="sharedStrings.xml"/>
                </Relationships>"#,
            ),
            (
                "xl/worksheets/sheet1.xml",
                r#"<worksheet><sheetData><row r="1"><c r="A1"><v>ok</v></c></row></sheetData></worksheet>"#,
            ),
        ]);
        let mut workbook = Workbook::from_memory(bytes).unwrap();
        let mut sheet = workbook.read_sheet(None, SkipPolicy::NONE).unwrap();
        assert!(sheet.next_row().unwrap());
        assert_eq!(sheet.next_cell().unwrap().as_deref(), Some("ok"));
    }

    #[test]
    fn shared_reference_without_table_resolves_to_null() {
        let bytes = fixture::workbook_bytes(
            r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row>"#,
            &[],
        );
        let mut workbook = Workbook::from_memory(bytes).unwrap();
        let mut cells = Vec::new();
        workbook
            .process(
                None,
                SkipPolicy::NONE,
                |row, col, value| {
                    cells.push((row, col, value.map(str::to_owned)));
                    ControlFlow::Continue(())
                },
                |_, _| ControlFlow::Continue(()),
            )
            .unwrap();
        assert_eq!(cells, vec![(1, 1, None)]);
    }

    #[test]
    fn traversal_error_leaves_workbook_usable() {
        let bytes = fixture::workbook_bytes(
            r#"<row r="1"><c r="A1"><v>&undefined;</v></c></row>"#,
            &[],
        );
        let mut workbook = Workbook::from_memory(bytes).unwrap();
        let mut sheet = workbook.read_sheet(None, SkipPolicy::NONE).unwrap();
        assert!(sheet.next_row().unwrap());
        assert!(sheet.next_cell().is_err());
        drop(sheet);

        let names: Vec<String> = workbook
            .sheet_names()
            .unwrap()
            .map(|name| name.unwrap())
            .collect();
        assert_eq!(names, vec!["Sheet1"]);
    }

    #[test]
    fn workbook_found_through_default_extension_mapping() {
        // the workbook part lives at the archive root here, so relationship
        // targets resolve against an empty base path
        let bytes = fixture::archive(&[
            (
                "[Content_Types].xml",
                r#"<Types><Default Extension="wbk" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#,
            ),
            (
                "book.wbk",
                r#"<workbook><sheets><sheet name="ByExt" r:id="rId1"/></sheets></workbook>"#,
            ),
            (
                "_rels/book.wbk.rels",
                r#"<Relationships><Relationship Id="rId1" Type="http://x/worksheet" Target="sheet1.xml"/></Relationships>"#,
            ),
            (
                "sheet1.xml",
                r#"<worksheet><sheetData><row r="1"><c r="A1"><v>v</v></c></row></sheetData></worksheet>"#,
            ),
        ]);
        let mut workbook = Workbook::from_memory(bytes).unwrap();
        let names: Vec<String> = workbook
            .sheet_names()
            .unwrap()
            .map(|name| name.unwrap())
            .collect();
        assert_eq!(names, vec!["ByExt"]);

        let mut sheet = workbook.read_sheet(Some("ByExt"), SkipPolicy::NONE).unwrap();
        assert!(sheet.next_row().unwrap());
        assert_eq!(sheet.next_cell().unwrap().as_deref(), Some("v"));
    }
}
