// src/lib.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming generator for large product spreadsheets
//!
//! This library provides:
//! - Seeded Xoshiro256++ record generation (code, name, description, price)
//! - A row-stream writer contract and an `.xlsx` backend on `rust_xlsxwriter`
//! - Throttled row loop with injectable pauses
//! - A background memory reporter with an explicit stop handle

// Core modules
pub mod constants;
pub mod error;
pub mod generator;
pub mod memory;
pub mod orchestrator;
pub mod record;
pub mod reporter;
pub mod writer;

// Re-export main API
pub use error::{RunError, WriterError};
pub use generator::{
    stream_records, GeneratorConfig, Pause, RecordGenerator, ThreadSleep, Throttle,
};
pub use memory::{CountingAllocator, MemorySnapshot};
pub use orchestrator::{execute, write_workbook, RunOutcome, RunSummary};
pub use record::{ProductRecord, RowStyles};
pub use reporter::{MemoryReporter, ReporterHandle};
pub use writer::{Align, Cell, CellStyle, CellValue, Column, SpreadsheetSink, XlsxWorkbook};
