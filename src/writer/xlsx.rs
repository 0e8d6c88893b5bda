// src/writer/xlsx.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `.xlsx` backend for [`SpreadsheetSink`], built on `rust_xlsxwriter`
//!
//! Worksheets run in constant memory mode: a row is written out to a temp
//! file as soon as the next row starts, so only the current row is held.
//! Rows are validated here before they reach the library, which keeps a bad
//! row from leaving a half-written row behind.

use std::collections::HashMap;
use std::path::Path;

use rust_xlsxwriter::{Color, ColNum, Format, FormatAlign, RowNum, Workbook, Worksheet};

use super::{Align, Cell, CellStyle, CellValue, Column, SheetHandle, SpreadsheetSink, StreamHandle, StyleId};
use crate::constants::{MAX_CELL_STYLES, MAX_SHEET_COLUMNS, MAX_SHEET_ROWS};
use crate::error::WriterError;

/// Characters a sheet name may not contain
const FORBIDDEN_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];
const MAX_SHEET_NAME_LEN: usize = 31;

struct SheetEntry {
    name: String,
    stream: Option<StreamHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    /// Nothing written yet
    Fresh,
    Open,
    Flushed,
}

/// Bookkeeping for one sheet's row stream
struct RowStream {
    sheet: usize,
    name: String,
    state: StreamState,
    /// 0 until the first row goes out
    last_row: u32,
}

impl RowStream {
    fn ensure_writable(&self) -> Result<(), WriterError> {
        if self.state == StreamState::Flushed {
            return Err(WriterError::StreamFlushed(self.name.clone()));
        }
        Ok(())
    }

    /// Every check a data row must pass before any cell of it is written
    fn check_row(&self, row: u32, cells: &[Cell], styles: usize) -> Result<(), WriterError> {
        self.ensure_writable()?;
        if row == 0 || row > MAX_SHEET_ROWS {
            return Err(WriterError::RowOutOfRange(row));
        }
        if self.last_row != 0 && row <= self.last_row {
            return Err(WriterError::RowOutOfOrder {
                row,
                last_row: self.last_row,
            });
        }
        if cells.len() > MAX_SHEET_COLUMNS {
            return Err(WriterError::TooManyColumns {
                row,
                count: cells.len(),
            });
        }
        for (column, cell) in cells.iter().enumerate() {
            if let CellValue::Number(n) = cell.value {
                if !n.is_finite() {
                    return Err(WriterError::NonFiniteNumber { row, column });
                }
            }
            check_style(cell.style, styles)?;
        }
        Ok(())
    }
}

fn check_style(style: StyleId, styles: usize) -> Result<(), WriterError> {
    if style.index() as usize >= styles {
        return Err(WriterError::UnknownStyle(style.index()));
    }
    Ok(())
}

/// Workbook whose sheets stream rows through `rust_xlsxwriter`
pub struct XlsxWorkbook {
    workbook: Workbook,
    sheets: Vec<SheetEntry>,
    streams: Vec<RowStream>,
    /// Index 0 is the unstyled default, so `StyleId::DEFAULT` always resolves
    formats: Vec<Format>,
    style_ids: HashMap<CellStyle, StyleId>,
    style_limit: usize,
}

impl XlsxWorkbook {
    pub fn new() -> Self {
        Self::with_style_limit(MAX_CELL_STYLES)
    }

    /// Workbook that refuses to hold more than `limit` cell styles
    pub fn with_style_limit(limit: usize) -> Self {
        let mut style_ids = HashMap::new();
        style_ids.insert(CellStyle::default(), StyleId::DEFAULT);
        Self {
            workbook: Workbook::new(),
            sheets: Vec::new(),
            streams: Vec::new(),
            formats: vec![Format::new()],
            style_ids,
            style_limit: limit,
        }
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }

    /// Number of distinct cell styles, the default style included
    pub fn style_count(&self) -> usize {
        self.formats.len()
    }
}

impl Default for XlsxWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_sheet_name(name: &str) -> Result<(), WriterError> {
    if name.trim().is_empty()
        || name.chars().count() > MAX_SHEET_NAME_LEN
        || name.contains(FORBIDDEN_SHEET_CHARS)
        || name.starts_with('\'')
        || name.ends_with('\'')
    {
        return Err(WriterError::InvalidSheetName(name.to_string()));
    }
    Ok(())
}

/// `777777` or `#777777` as an RGB color
fn parse_color(hex: &str) -> Result<Color, WriterError> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(WriterError::InvalidColor(hex.to_string()));
    }
    u32::from_str_radix(digits, 16)
        .map(Color::RGB)
        .map_err(|_| WriterError::InvalidColor(hex.to_string()))
}

impl From<Align> for FormatAlign {
    fn from(align: Align) -> Self {
        match align {
            Align::Left => FormatAlign::Left,
            Align::Center => FormatAlign::Center,
            Align::Right => FormatAlign::Right,
            Align::Fill => FormatAlign::Fill,
        }
    }
}

fn to_format(style: &CellStyle) -> Result<Format, WriterError> {
    let mut format = Format::new();
    if let Some(hex) = &style.font_color {
        format = format.set_font_color(parse_color(hex)?);
    }
    if let Some(code) = &style.number_format {
        format = format.set_num_format(code.as_str());
    }
    if let Some(align) = style.align {
        format = format.set_align(align.into());
    }
    Ok(format)
}

fn write_cells(
    worksheet: &mut Worksheet,
    formats: &[Format],
    row: RowNum,
    cells: &[Cell],
) -> Result<(), WriterError> {
    for (col, cell) in (0..).zip(cells) {
        let format = formats
            .get(cell.style.index() as usize)
            .ok_or(WriterError::UnknownStyle(cell.style.index()))?;
        match &cell.value {
            CellValue::Text(text) => {
                worksheet.write_string_with_format(row, col, text.as_str(), format)?
            }
            CellValue::Number(n) => worksheet.write_number_with_format(row, col, *n, format)?,
        };
    }
    Ok(())
}

impl SpreadsheetSink for XlsxWorkbook {
    fn open_sheet(&mut self, name: &str) -> Result<SheetHandle, WriterError> {
        if let Some(i) = self
            .sheets
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
        {
            return Ok(SheetHandle::new(i));
        }
        validate_sheet_name(name)?;
        self.workbook
            .add_worksheet_with_constant_memory()
            .set_name(name)?;
        self.sheets.push(SheetEntry {
            name: name.to_string(),
            stream: None,
        });
        tracing::debug!("Created sheet {:?}", name);
        Ok(SheetHandle::new(self.sheets.len() - 1))
    }

    fn add_style(&mut self, style: &CellStyle) -> Result<StyleId, WriterError> {
        if let Some(id) = self.style_ids.get(style) {
            return Ok(*id);
        }
        if self.formats.len() >= self.style_limit {
            return Err(WriterError::StyleTableFull(self.style_limit));
        }
        let format = to_format(style)?;
        let id = StyleId::new(self.formats.len() as u32);
        self.formats.push(format);
        self.style_ids.insert(style.clone(), id);
        Ok(id)
    }

    fn begin_row_stream(&mut self, sheet: SheetHandle) -> Result<StreamHandle, WriterError> {
        let entry = self
            .sheets
            .get_mut(sheet.index())
            .ok_or(WriterError::UnknownSheet(sheet.index()))?;
        if entry.stream.is_some() {
            return Err(WriterError::StreamAlreadyOpen(entry.name.clone()));
        }
        let handle = StreamHandle::new(self.streams.len());
        entry.stream = Some(handle);
        self.streams.push(RowStream {
            sheet: sheet.index(),
            name: entry.name.clone(),
            state: StreamState::Fresh,
            last_row: 0,
        });
        Ok(handle)
    }

    fn write_header_row(
        &mut self,
        stream: StreamHandle,
        columns: &[Column],
    ) -> Result<(), WriterError> {
        let state = self
            .streams
            .get_mut(stream.index())
            .ok_or(WriterError::UnknownStream(stream.index()))?;
        state.ensure_writable()?;
        if state.state != StreamState::Fresh {
            return Err(WriterError::HeaderAfterRows {
                last_row: state.last_row,
            });
        }
        if columns.len() > MAX_SHEET_COLUMNS {
            return Err(WriterError::TooManyColumns {
                row: 1,
                count: columns.len(),
            });
        }
        for column in columns {
            check_style(column.style, self.formats.len())?;
        }

        let worksheet = self.workbook.worksheet_from_index(state.sheet)?;
        for (col, column) in (0..).zip(columns) {
            if let Some(width) = column.width {
                worksheet.set_column_width(col, width)?;
            }
        }
        worksheet.set_freeze_panes(1, 0)?;
        if let Some(last) = columns.len().checked_sub(1) {
            worksheet.autofilter(0, 0, 0, last as ColNum)?;
        }
        let titles: Vec<Cell> = columns
            .iter()
            .map(|c| Cell::new(c.label.as_str(), c.style))
            .collect();
        write_cells(worksheet, &self.formats, 0, &titles)?;

        state.state = StreamState::Open;
        state.last_row = 1;
        Ok(())
    }

    fn write_row(
        &mut self,
        stream: StreamHandle,
        row: u32,
        cells: &[Cell],
    ) -> Result<(), WriterError> {
        let state = self
            .streams
            .get_mut(stream.index())
            .ok_or(WriterError::UnknownStream(stream.index()))?;
        state.check_row(row, cells, self.formats.len())?;

        let worksheet = self.workbook.worksheet_from_index(state.sheet)?;
        write_cells(worksheet, &self.formats, row - 1, cells)?;

        state.state = StreamState::Open;
        state.last_row = row;
        Ok(())
    }

    fn flush(&mut self, stream: StreamHandle) -> Result<(), WriterError> {
        let state = self
            .streams
            .get_mut(stream.index())
            .ok_or(WriterError::UnknownStream(stream.index()))?;
        state.ensure_writable()?;
        state.state = StreamState::Flushed;
        tracing::debug!("Closed row stream for {:?} at row {}", state.name, state.last_row);
        Ok(())
    }

    fn save_as(&mut self, path: &Path) -> Result<(), WriterError> {
        if self.sheets.is_empty() {
            return Err(WriterError::NoSheets);
        }
        if let Some(open) = self
            .streams
            .iter()
            .find(|s| s.state != StreamState::Flushed)
        {
            return Err(WriterError::UnflushedStream(open.name.clone()));
        }

        tracing::info!("Saving workbook to {}", path.display());
        self.workbook.save(path)?;
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        tracing::info!("Saved {} ({} bytes)", path.display(), size);
        Ok(())
    }
}
