//! # sheetstream
//!
//! A streaming reader for OOXML spreadsheet containers (`.xlsx` and its
//! macro/template variants `.xlsm`, `.xltx`, `.xltm`). The container is a
//! ZIP archive of XML parts; this crate locates the worksheets through the
//! content-type index and relationship files, resolves the shared-string
//! table, and yields the cell values of a chosen sheet as an ordered
//! stream of (row, column, value) records without holding the sheet in
//! memory.
//!
//! ## Features
//!
//! - **Pull interface**: walk a sheet row-by-row and cell-by-cell with
//!   [`SheetReader`]; the XML parser advances only as far as the cells you
//!   take
//! - **Push interface**: traverse a whole sheet with per-cell and per-row
//!   callbacks via [`Workbook::process`], with cooperative early stop
//! - **Rectangular output**: missing rows, missing cells, and short rows
//!   are padded to the first row's width, under the control of a
//!   [`SkipPolicy`]
//! - **Shared and inline strings**: cell text is resolved whether it is
//!   stored inline or indirected through the shared-string table, with
//!   phonetic annotations excluded
//! - **Flexible input**: open by path, from an open file handle, from an
//!   owned buffer, or from any `Read + Seek` source
//!
//! ## Example
//!
//! ```no_run
//! use sheetstream::{SkipPolicy, Workbook};
//!
//! # fn main() -> Result<(), sheetstream::SheetStreamError> {
//! let mut workbook = Workbook::open("report.xlsx")?;
//! let mut sheet = workbook.read_sheet(None, SkipPolicy::NONE)?;
//! while sheet.next_row()? {
//!     while let Some(value) = sheet.next_cell()? {
//!         print!("{value}\t");
//!     }
//!     println!();
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod helpers;
mod workbook;

pub use crate::error::SheetStreamError;
pub use crate::helpers::reader::InputSource;
pub use crate::workbook::cell;
pub use crate::workbook::SheetNames;
pub use crate::workbook::SheetParts;
pub use crate::workbook::SheetReader;
pub use crate::workbook::SkipPolicy;
pub use crate::workbook::Workbook;
pub use crate::workbook::WorkbookError;
