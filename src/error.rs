// src/error.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the writer adapter and the generation run

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by a [`SpreadsheetSink`](crate::writer::SpreadsheetSink)
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("spreadsheet writer error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("invalid sheet name {0:?}")]
    InvalidSheetName(String),

    #[error("unknown sheet handle {0}")]
    UnknownSheet(usize),

    #[error("unknown row stream handle {0}")]
    UnknownStream(usize),

    #[error("sheet {0:?} already has a row stream")]
    StreamAlreadyOpen(String),

    #[error("row stream for sheet {0:?} was already flushed")]
    StreamFlushed(String),

    #[error("row stream for sheet {0:?} was never flushed")]
    UnflushedStream(String),

    #[error("header row must be written once, before any data row (last row {last_row})")]
    HeaderAfterRows { last_row: u32 },

    #[error("row {row} is out of order (last written row {last_row})")]
    RowOutOfOrder { row: u32, last_row: u32 },

    #[error("row {0} is outside the sheet (expected 1..={})", crate::constants::MAX_SHEET_ROWS)]
    RowOutOfRange(u32),

    #[error("row {row} has {count} cells, more than the sheet allows")]
    TooManyColumns { row: u32, count: usize },

    #[error("row {row} column {column} holds a non-finite number")]
    NonFiniteNumber { row: u32, column: usize },

    #[error("invalid font color {0:?}, expected six hex digits")]
    InvalidColor(String),

    #[error("unknown cell style {0}")]
    UnknownStyle(u32),

    #[error("style table is full ({0} styles)")]
    StyleTableFull(usize),

    #[error("workbook has no sheets to save")]
    NoSheets,
}

/// Terminal failures of a generation run, each naming the step that failed
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to open sheet {name:?}")]
    OpenSheet {
        name: String,
        #[source]
        source: WriterError,
    },

    #[error("failed to allocate cell style")]
    Style(#[source] WriterError),

    #[error("failed to create stream writer")]
    BeginStream(#[source] WriterError),

    #[error("failed to write header row")]
    Header(#[source] WriterError),

    #[error("failed to set row {row}")]
    WriteRow {
        row: u32,
        #[source]
        source: WriterError,
    },

    #[error("failed to flush final stream")]
    Flush(#[source] WriterError),

    #[error("failed to save workbook to {path}")]
    Save {
        path: PathBuf,
        #[source]
        source: WriterError,
    },
}

impl RunError {
    /// Row index the run stopped at, when the failure was a row write
    pub fn failed_row(&self) -> Option<u32> {
        match self {
            RunError::WriteRow { row, .. } => Some(*row),
            _ => None,
        }
    }
}
