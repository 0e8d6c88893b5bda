// src/writer/mod.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stream writer adapter
//!
//! [`SpreadsheetSink`] is the narrow contract the generator drives: open a
//! sheet, allocate styles, open a row stream, write a header and then rows in
//! ascending order, flush once, save. [`XlsxWorkbook`] implements it on top of
//! `rust_xlsxwriter`.

use std::path::Path;

use crate::error::WriterError;

pub mod xlsx;

pub use xlsx::XlsxWorkbook;

/// Typed cell payload. Numbers stay numbers in the output file.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// Sheet opened by [`SpreadsheetSink::open_sheet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetHandle(usize);

impl SheetHandle {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Row stream opened by [`SpreadsheetSink::begin_row_stream`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(usize);

impl StreamHandle {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Index into the workbook's cell style table. `StyleId::DEFAULT` is unstyled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StyleId(u32);

impl StyleId {
    pub const DEFAULT: StyleId = StyleId(0);

    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// Horizontal alignment of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Align {
    Left,
    Center,
    Right,
    /// Repeat the content across the cell width
    Fill,
}

/// Style applied to a cell: font color, number format, alignment
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CellStyle {
    /// RGB hex, with or without a leading `#`
    pub font_color: Option<String>,
    /// Number format code, e.g. `0.00` or `@`
    pub number_format: Option<String>,
    pub align: Option<Align>,
}

impl CellStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn font_color(mut self, hex: &str) -> Self {
        self.font_color = Some(hex.to_string());
        self
    }

    pub fn number_format(mut self, code: &str) -> Self {
        self.number_format = Some(code.to_string());
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = Some(align);
        self
    }
}

/// One cell of a data row
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: StyleId,
}

impl Cell {
    pub fn new(value: impl Into<CellValue>, style: StyleId) -> Self {
        Self {
            value: value.into(),
            style,
        }
    }
}

/// One header column: title, title style and optional display width
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub label: String,
    pub style: StyleId,
    pub width: Option<f64>,
}

impl Column {
    pub fn new(label: impl Into<String>, style: StyleId) -> Self {
        Self {
            label: label.into(),
            style,
            width: None,
        }
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }
}

/// Incremental spreadsheet writer consumed by the generation loop
///
/// Exactly one caller drives a sink, so every operation takes `&mut self`.
/// Every operation may fail; callers abort on the first error.
pub trait SpreadsheetSink {
    /// Create the named sheet, or select it if it already exists
    fn open_sheet(&mut self, name: &str) -> Result<SheetHandle, WriterError>;

    /// Register a cell style and return its id. Identical styles share an id.
    fn add_style(&mut self, style: &CellStyle) -> Result<StyleId, WriterError>;

    /// Open an incremental writer for `sheet`, positioned at row 1
    fn begin_row_stream(&mut self, sheet: SheetHandle) -> Result<StreamHandle, WriterError>;

    /// Write the column titles as row 1. Must precede every data row.
    ///
    /// The header row is frozen and carries an autofilter over its columns.
    fn write_header_row(
        &mut self,
        stream: StreamHandle,
        columns: &[Column],
    ) -> Result<(), WriterError>;

    /// Append `cells` at the 1-based `row`; rows must be strictly ascending
    fn write_row(&mut self, stream: StreamHandle, row: u32, cells: &[Cell])
        -> Result<(), WriterError>;

    /// Close the stream. Called once, after the last `write_row`.
    fn flush(&mut self, stream: StreamHandle) -> Result<(), WriterError>;

    /// Serialize the workbook to `path`, replacing any existing file
    fn save_as(&mut self, path: &Path) -> Result<(), WriterError>;
}
