//! Pull adapter over the worksheet state machine.
//!
//! `SheetReader` lets callers walk a sheet row-by-row and cell-by-cell while
//! the underlying parser stays event-driven: the scanner suspends at row and
//! cell boundaries, and the adapter resumes it on demand. Missing rows and
//! trailing cells are synthesized here, downstream of the parser, so the
//! stream stays rectangular unless the skip policy says otherwise.

use crate::error::SheetStreamError;
use crate::helpers::xml::XmlReader;
use crate::workbook::cell;
use crate::workbook::scanner::pump;
use crate::workbook::scanner::Mode;
use crate::workbook::scanner::Pumped;
use crate::workbook::scanner::SheetScanner;
use crate::workbook::scanner::SkipPolicy;
use crate::workbook::shared_strings::SharedStrings;
use chrono::NaiveDateTime;
use std::io::BufRead;

/// Forward-only reader over one worksheet.
///
/// Created by [`Workbook::read_sheet`](crate::Workbook::read_sheet). Call
/// [`next_row`](SheetReader::next_row) to advance to each row, then
/// [`next_cell`](SheetReader::next_cell) until it returns `None` for the
/// row boundary.
pub struct SheetReader<R: BufRead> {
    reader: XmlReader<R>,
    scanner: SheetScanner<'static>,
    /// Row of the last delivered cell
    last_row: usize,
    /// Row currently being synthesized, 0 when not padding
    padding_row: usize,
    /// Column of the last delivered cell
    last_col: usize,
    /// Next empty column to synthesize, 0 when no pad is pending
    padding_col: usize,
}

impl<R: BufRead> std::fmt::Debug for SheetReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetReader").finish()
    }
}

impl<R: BufRead> SheetReader<R> {
    pub(crate) fn new(
        reader: XmlReader<R>,
        shared: SharedStrings,
        policy: SkipPolicy,
    ) -> SheetReader<R> {
        SheetReader {
            reader,
            scanner: SheetScanner::new(shared, policy, Mode::Pull),
            last_row: 0,
            padding_row: 0,
            last_col: 0,
            padding_col: 0,
        }
    }

    /// Advances to the next row. Returns false once the sheet is exhausted.
    pub fn next_row(&mut self) -> Result<bool, SheetStreamError> {
        self.last_col = 0;
        // while synthesizing rows no new XML is consumed
        if self.padding_row != 0 {
            if self.padding_row < self.scanner.row {
                return Ok(true);
            }
            self.padding_row = 0;
            return Ok(true);
        }
        self.padding_col = 0;
        loop {
            match pump(&mut self.reader, &mut self.scanner)? {
                Pumped::Suspended if self.scanner.col != 0 => continue,
                Pumped::Suspended => return Ok(true),
                _ => return Ok(false),
            }
        }
    }

    /// Takes the next cell's value, or `None` at the end of the row.
    ///
    /// Cells absent from the source encoding come back as empty strings
    /// unless `skip_empty_cells` is set.
    pub fn next_cell(&mut self) -> Result<Option<String>, SheetStreamError> {
        // pending pad: emit empty columns up to the expected width
        if self.padding_col != 0 {
            if self.padding_col > self.scanner.cols {
                self.padding_col = 0;
                if self.padding_row != 0 {
                    // one synthesized row finished, line up the next one
                    self.last_row += 1;
                    self.padding_row += 1;
                    if self.padding_row + 1 < self.scanner.row {
                        self.padding_col = 1;
                    }
                }
                return Ok(None);
            }
            self.padding_col += 1;
            return Ok(Some(String::new()));
        }
        if self.scanner.value.is_none() {
            pump(&mut self.reader, &mut self.scanner)?;
        }
        // a gap in the source rows: arm row padding and restart
        if !self.scanner.policy.skip_empty_rows && self.last_row + 1 < self.scanner.row {
            self.padding_row = self.last_row + 1;
            self.padding_col = 1;
            return self.next_cell();
        }
        // a gap before the parsed cell: deliver one empty column
        if !self.scanner.policy.skip_empty_cells && self.last_col + 1 < self.scanner.col {
            self.last_col += 1;
            return Ok(Some(String::new()));
        }
        let value = self.scanner.value.take();
        if value.is_none() {
            self.last_row = self.scanner.row;
            // short row: arm trailing-column padding and restart
            if !self.scanner.policy.skip_empty_cells && self.scanner.col < self.scanner.cols {
                self.padding_col = self.last_col + 1;
                return self.next_cell();
            }
        }
        self.last_col = self.scanner.col;
        Ok(value)
    }

    /// Takes the next cell as an integer. Text that is not entirely a
    /// decimal number converts to 0.
    pub fn next_cell_i64(&mut self) -> Result<Option<i64>, SheetStreamError> {
        Ok(self.next_cell()?.map(|value| cell::to_i64(&value)))
    }

    /// Takes the next cell as a float. Unparsable text converts to 0.
    pub fn next_cell_f64(&mut self) -> Result<Option<f64>, SheetStreamError> {
        Ok(self.next_cell()?.map(|value| cell::to_f64(&value)))
    }

    /// Takes the next cell as a date/time following the Excel serial-day
    /// convention. An empty or zero value means "unset" and maps to the
    /// Unix epoch.
    pub fn next_cell_datetime(&mut self) -> Result<Option<NaiveDateTime>, SheetStreamError> {
        Ok(self.next_cell()?.map(|value| cell::to_datetime(&value)))
    }

    /// Row of the last delivered cell (the parser may already be ahead)
    pub fn row_index(&self) -> usize {
        self.last_row
    }

    /// Column of the last delivered cell
    pub fn column_index(&self) -> usize {
        self.last_col
    }

    /// The skip policy this sheet was opened with
    pub fn policy(&self) -> SkipPolicy {
        self.scanner.policy
    }
}
