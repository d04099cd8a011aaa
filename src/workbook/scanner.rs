//! Worksheet traversal state machine.
//!
//! The significant subtree of a worksheet part is
//! `<worksheet><sheetData><row><c><v/></c></row></sheetData></worksheet>`.
//! The scanner walks that nesting one XML event at a time, tracking the
//! current row and column, resolving shared-string references, and applying
//! the caller's skip policy. It serves two drivers: push mode invokes cell
//! and row callbacks and runs to completion, pull mode suspends the event
//! loop at row and cell boundaries so `SheetReader` can hand values out
//! one at a time.

use crate::error::SheetStreamError;
use crate::helpers::xml::name_matches;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::workbook::reference::column_number;
use crate::workbook::reference::row_number;
use crate::workbook::shared_strings::SharedStrings;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use std::io::BufRead;
use std::ops::ControlFlow;

/// Row and cell skip policy for one sheet traversal.
///
/// Sparse source encodings omit empty rows, empty cells, and everything to
/// the right of the last value. By default the reader rectangularizes the
/// stream by synthesizing the omissions; each flag suppresses one class of
/// synthesized or unwanted output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SkipPolicy {
    /// Suppress rows absent from the source encoding
    pub skip_empty_rows: bool,
    /// Suppress cells absent from the source encoding
    pub skip_empty_cells: bool,
    /// Discard cells to the right of the first row's column count
    pub skip_extra_cells: bool,
    /// Discard rows carrying a truthy `hidden` attribute
    pub skip_hidden_rows: bool,
}

impl SkipPolicy {
    /// Keep every row and cell
    pub const NONE: SkipPolicy = SkipPolicy {
        skip_empty_rows: false,
        skip_empty_cells: false,
        skip_extra_cells: false,
        skip_hidden_rows: false,
    };
}

/// String materialization of the cell currently being parsed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum CellStringType {
    #[default]
    None,
    /// Raw textual value from `<v>`
    Value,
    /// Value nested in `<is><t>` runs
    Inline,
    /// `<v>` holds an index into the shared-string table
    Shared,
}

/// Element nesting level the scanner is positioned at.
///
/// Each state owns the handling of the events that may occur inside it;
/// unexpected end tags collapse through the enclosing states so unknown
/// nesting recovers to the right level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanState {
    /// Outside `<worksheet>`
    FindWorksheet,
    /// Inside `<worksheet>`, before `<sheetData>`
    FindSheetData,
    /// Inside `<sheetData>`, between rows
    Rows,
    /// Inside `<row>`, between cells
    Cells,
    /// Inside `<c>`, before a value element
    Values,
    /// Inside `<v>` or `<t>`, accumulating character data
    Text,
    /// Inside a hidden `<row>` being discarded
    SkipRow,
    /// Inside a skipped subtree such as `<rPh>`
    SkipTag,
}

/// Skipped-subtree bookkeeping layered above the normal states
struct SkipScope {
    /// Tag name as encountered, matched with the usual name rules
    tag: String,
    /// Nesting depth of that tag inside the skipped subtree
    depth: usize,
    /// State to restore once the subtree closes
    resume: ScanState,
}

/// Callback invoked per resolved cell with (row, column, value)
pub(crate) type CellCallback<'cb> = &'cb mut dyn FnMut(usize, usize, Option<&str>) -> ControlFlow<()>;
/// Callback invoked per completed row with (row, last column)
pub(crate) type RowCallback<'cb> = &'cb mut dyn FnMut(usize, usize) -> ControlFlow<()>;

/// Traversal mode: callbacks driven to completion, or cooperative pull
pub(crate) enum Mode<'cb> {
    Push {
        on_cell: CellCallback<'cb>,
        on_row: RowCallback<'cb>,
    },
    Pull,
}

/// Outcome of feeding one event to the scanner
pub(crate) enum Flow {
    Continue,
    /// Pull mode reached a row or cell boundary
    Suspend,
    /// A push callback requested a cooperative stop
    Stop,
}

/// Outcome of pumping the event loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Pumped {
    Suspended,
    Finished,
    Stopped,
}

pub(crate) struct SheetScanner<'cb> {
    state: ScanState,
    skip: Option<SkipScope>,
    /// Current row number, 1-based; 0 before the first row
    pub(crate) row: usize,
    /// Current column number, 1-based; 0 at the start of a row
    pub(crate) col: usize,
    /// Expected column count, locked in at the first row's end
    pub(crate) cols: usize,
    /// Resolved value of the last completed cell, or the accumulation buffer
    /// of the cell in progress
    pub(crate) value: Option<String>,
    string_type: CellStringType,
    pub(crate) policy: SkipPolicy,
    shared: SharedStrings,
    mode: Mode<'cb>,
}

impl<'cb> SheetScanner<'cb> {
    pub(crate) fn new(shared: SharedStrings, policy: SkipPolicy, mode: Mode<'cb>) -> SheetScanner<'cb> {
        SheetScanner {
            state: ScanState::FindWorksheet,
            skip: None,
            row: 0,
            col: 0,
            cols: 0,
            value: None,
            string_type: CellStringType::None,
            policy,
            shared,
            mode,
        }
    }

    /// Feeds one XML event through the state machine
    pub(crate) fn accept(&mut self, event: Event) -> Result<Flow, SheetStreamError> {
        match event {
            Event::Start(event) => self.on_start(&event),
            Event::End(event) => self.on_end(event.name().as_ref()),
            Event::Text(text) => {
                if self.accumulating() {
                    self.buffer().push_bytes_text(&text)?;
                }
                Ok(Flow::Continue)
            }
            Event::CData(text) => {
                if self.accumulating() {
                    let content = text.xml_content()?;
                    self.buffer().push_str(&content);
                }
                Ok(Flow::Continue)
            }
            Event::GeneralRef(entity) => {
                if self.accumulating() {
                    let mut buffer = self.value.take().unwrap_or_default();
                    buffer.push_bytes_ref(&entity)?;
                    self.value = Some(buffer);
                }
                Ok(Flow::Continue)
            }
            _ => Ok(Flow::Continue),
        }
    }

    fn accumulating(&self) -> bool {
        self.state == ScanState::Text && self.string_type != CellStringType::None
    }

    fn buffer(&mut self) -> &mut String {
        self.value.get_or_insert_with(String::new)
    }

    fn on_start(&mut self, event: &BytesStart) -> Result<Flow, SheetStreamError> {
        let name = event.name();
        let name = name.as_ref();
        match self.state {
            ScanState::SkipTag => {
                if let Some(scope) = &mut self.skip {
                    if name_matches(name, scope.tag.as_bytes()) {
                        scope.depth += 1;
                    }
                }
                Ok(Flow::Continue)
            }
            ScanState::SkipRow | ScanState::Text => Ok(Flow::Continue),
            ScanState::FindWorksheet => {
                if name_matches(name, b"worksheet") {
                    self.state = ScanState::FindSheetData;
                }
                Ok(Flow::Continue)
            }
            ScanState::FindSheetData => {
                if name_matches(name, b"sheetData") {
                    self.state = ScanState::Rows;
                }
                Ok(Flow::Continue)
            }
            ScanState::Rows => self.enter_row(event),
            ScanState::Cells => self.enter_cell(event),
            ScanState::Values => self.enter_value(name),
        }
    }

    fn on_end(&mut self, name: &[u8]) -> Result<Flow, SheetStreamError> {
        match self.state {
            ScanState::SkipTag => {
                if let Some(scope) = &mut self.skip {
                    if name_matches(name, scope.tag.as_bytes()) {
                        scope.depth -= 1;
                        if scope.depth == 0 {
                            self.state = scope.resume;
                            self.skip = None;
                        }
                    }
                }
                Ok(Flow::Continue)
            }
            ScanState::SkipRow => {
                if name_matches(name, b"row") {
                    self.state = ScanState::Rows;
                }
                Ok(Flow::Continue)
            }
            ScanState::FindWorksheet => Ok(Flow::Continue),
            ScanState::FindSheetData => {
                if name_matches(name, b"worksheet") {
                    self.state = ScanState::FindWorksheet;
                }
                Ok(Flow::Continue)
            }
            ScanState::Rows => {
                self.end_within_sheet_data(name);
                Ok(Flow::Continue)
            }
            ScanState::Cells => self.end_within_row(name),
            ScanState::Values => self.end_within_cell(name),
            ScanState::Text => self.end_within_value(name),
        }
    }

    /// Row entry: honor the hidden flag, then advance the row counter. Pull
    /// mode suspends here so the caller sees the row boundary.
    fn enter_row(&mut self, event: &BytesStart) -> Result<Flow, SheetStreamError> {
        if !name_matches(event.name().as_ref(), b"row") {
            return Ok(Flow::Continue);
        }
        if self.policy.skip_hidden_rows {
            let hidden = event.find_attribute("hidden")?;
            if hidden.is_some_and(|value| leading_integer(&value) != 0) {
                self.state = ScanState::SkipRow;
                return Ok(Flow::Continue);
            }
        }
        self.row += 1;
        self.col = 0;
        self.state = ScanState::Cells;
        match self.mode {
            Mode::Pull => Ok(Flow::Suspend),
            Mode::Push { .. } => Ok(Flow::Continue),
        }
    }

    /// Cell entry: derive the position from the `r` reference, synthesize
    /// whatever the sparse encoding omitted before this cell, and classify
    /// the value as shared or literal from the `t` attribute.
    fn enter_cell(&mut self, event: &BytesStart) -> Result<Flow, SheetStreamError> {
        if !name_matches(event.name().as_ref(), b"c") {
            return Ok(Flow::Continue);
        }
        let reference = event.find_attribute("r")?;
        let cell_col = reference.as_deref().map_or(0, column_number);

        // everything right of the expected width is discarded wholesale
        if cell_col != 0 && self.cols != 0 && self.policy.skip_extra_cells && cell_col > self.cols {
            self.col = cell_col - 1;
            return Ok(Flow::Continue);
        }

        if self.col == 0 {
            let cell_row = reference.as_deref().map_or(0, row_number);
            if cell_row != 0 {
                match &mut self.mode {
                    // a gap before the row's first cell means whole rows were
                    // omitted; emit them as empty rows unless skipped
                    Mode::Push { on_cell, on_row } if !self.policy.skip_empty_rows => {
                        while self.row < cell_row {
                            if !self.policy.skip_empty_cells {
                                while self.col < self.cols {
                                    if on_cell(self.row, self.col + 1, None).is_break() {
                                        return Ok(Flow::Stop);
                                    }
                                    self.col += 1;
                                }
                            }
                            if on_row(self.row, self.cols).is_break() {
                                return Ok(Flow::Stop);
                            }
                            self.row += 1;
                            self.col = 0;
                        }
                    }
                    // pull mode pads gaps itself, downstream of the parser
                    _ => self.row = cell_row,
                }
            }
        }

        if cell_col != 0 {
            let before = cell_col - 1;
            match &mut self.mode {
                Mode::Push { on_cell, .. } if !self.policy.skip_empty_cells => {
                    while self.col < before {
                        if on_cell(self.row, self.col + 1, None).is_break() {
                            return Ok(Flow::Stop);
                        }
                        self.col += 1;
                    }
                }
                _ => self.col = before,
            }
        }

        let kind = event.find_attribute("t")?;
        self.string_type = match kind.as_deref() {
            Some(kind) if kind.eq_ignore_ascii_case("s") => CellStringType::Shared,
            _ => CellStringType::Value,
        };
        self.value = None;
        self.state = ScanState::Values;
        Ok(Flow::Continue)
    }

    fn enter_value(&mut self, name: &[u8]) -> Result<Flow, SheetStreamError> {
        if name_matches(name, b"v") || name_matches(name, b"t") {
            self.state = ScanState::Text;
        } else if name_matches(name, b"is") {
            self.string_type = CellStringType::Inline;
        } else if name_matches(name, b"rPh") {
            self.skip = Some(SkipScope {
                tag: String::from_utf8_lossy(name).into_owned(),
                depth: 1,
                resume: ScanState::Values,
            });
            self.state = ScanState::SkipTag;
        }
        Ok(Flow::Continue)
    }

    fn end_within_sheet_data(&mut self, name: &[u8]) {
        if name_matches(name, b"sheetData") {
            self.state = ScanState::FindSheetData;
        } else if name_matches(name, b"worksheet") {
            self.state = ScanState::FindWorksheet;
        }
    }

    fn end_within_row(&mut self, name: &[u8]) -> Result<Flow, SheetStreamError> {
        if name_matches(name, b"row") {
            self.exit_row()
        } else {
            self.end_within_sheet_data(name);
            Ok(Flow::Continue)
        }
    }

    fn end_within_cell(&mut self, name: &[u8]) -> Result<Flow, SheetStreamError> {
        if name_matches(name, b"c") {
            self.exit_cell()
        } else {
            self.end_within_row(name)
        }
    }

    fn end_within_value(&mut self, name: &[u8]) -> Result<Flow, SheetStreamError> {
        if name_matches(name, b"v") || name_matches(name, b"t") {
            self.state = ScanState::Values;
            Ok(Flow::Continue)
        } else if name_matches(name, b"is") {
            self.string_type = CellStringType::None;
            Ok(Flow::Continue)
        } else {
            self.end_within_row(name)
        }
    }

    /// Row exit: lock the expected column count on the first row, pad the
    /// trailing cells in push mode, and report the row boundary.
    fn exit_row(&mut self) -> Result<Flow, SheetStreamError> {
        if self.row == 1 && self.cols == 0 {
            self.cols = self.col;
        }
        self.state = ScanState::Rows;
        match &mut self.mode {
            Mode::Push { on_cell, on_row } => {
                if !self.policy.skip_empty_cells {
                    while self.col < self.cols {
                        if on_cell(self.row, self.col + 1, None).is_break() {
                            return Ok(Flow::Stop);
                        }
                        self.col += 1;
                    }
                }
                self.value = None;
                if on_row(self.row, self.col).is_break() {
                    return Ok(Flow::Stop);
                }
                Ok(Flow::Continue)
            }
            Mode::Pull => {
                self.value = None;
                Ok(Flow::Suspend)
            }
        }
    }

    /// Cell exit: resolve the accumulated buffer to the final value, advance
    /// the column, and report the cell unless it lies out of bounds.
    fn exit_cell(&mut self) -> Result<Flow, SheetStreamError> {
        if let Some(buffer) = self.value.take() {
            self.value = match self.string_type {
                CellStringType::Shared => match buffer.trim_start().parse::<i64>() {
                    Ok(index) if index >= 0 => {
                        self.shared.get(index as usize).map(str::to_owned)
                    }
                    Ok(_) => None,
                    // an unparsable index keeps the raw text
                    Err(_) => Some(buffer),
                },
                CellStringType::None => None,
                CellStringType::Value | CellStringType::Inline => Some(buffer),
            };
        }
        self.col += 1;
        self.string_type = CellStringType::None;
        self.state = ScanState::Cells;

        let within = !(self.cols != 0 && self.policy.skip_extra_cells && self.col > self.cols);
        if within {
            match &mut self.mode {
                Mode::Push { on_cell, .. } => {
                    if on_cell(self.row, self.col, self.value.as_deref()).is_break() {
                        return Ok(Flow::Stop);
                    }
                }
                Mode::Pull => {
                    if self.value.is_none() {
                        self.value = Some(String::new());
                    }
                    return Ok(Flow::Suspend);
                }
            }
        }
        Ok(Flow::Continue)
    }
}

/// Leading decimal integer of an attribute value, 0 when there is none.
/// This is how the format's boolean-ish attributes read: `hidden="1"` is
/// set, `hidden="true"` is not.
fn leading_integer(value: &str) -> i64 {
    let value = value.trim_start();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let end = digits
        .bytes()
        .position(|byte| !byte.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude = digits[..end].parse::<i64>().unwrap_or(0);
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Drives the scanner over the event stream until it suspends, the document
/// ends, or a callback stops the traversal.
pub(crate) fn pump<R: BufRead>(
    reader: &mut XmlReader<R>,
    scanner: &mut SheetScanner<'_>,
) -> Result<Pumped, SheetStreamError> {
    while let Some(event) = reader.next()? {
        match scanner.accept(event)? {
            Flow::Continue => (),
            Flow::Suspend => return Ok(Pumped::Suspended),
            Flow::Stop => return Ok(Pumped::Stopped),
        }
    }
    Ok(Pumped::Finished)
}
