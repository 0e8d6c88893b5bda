// src/constants.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

/// Default output file, overwritten on every run
pub const OUTPUT_FILENAME: &str = "great-size-file.xlsx";

/// Name of the single sheet the generator fills
pub const SHEET_NAME: &str = "products";

/// Maximum rows in a worksheet (1-based row indices 1..=MAX_SHEET_ROWS)
pub const MAX_SHEET_ROWS: u32 = 1_048_576;

/// Maximum columns in a worksheet (A..=XFD)
pub const MAX_SHEET_COLUMNS: usize = 16_384;

/// Default number of data rows: every row the sheet has left after the header
pub const TOTAL_ROWS: u32 = MAX_SHEET_ROWS - 1;

/// Fixed seed so repeated runs produce the same file
pub const DEFAULT_SEED: u64 = 99;

/// Pause after this many rows have been emitted
pub const THROTTLE_EVERY: u32 = 1000;

/// How long each throttle pause lasts
pub const THROTTLE_PAUSE: Duration = Duration::from_secs(1);

/// Memory reporter tick. Independent of the throttle even though both are 1s.
pub const REPORT_PERIOD: Duration = Duration::from_secs(1);

/// Product codes are drawn from [0, CODE_UPPER_BOUND)
pub const CODE_UPPER_BOUND: u32 = 400;

/// Product codes are zero-padded to this many digits
pub const CODE_WIDTH: usize = 8;

/// Name and description suffixes are drawn from [0, LABEL_UPPER_BOUND)
pub const LABEL_UPPER_BOUND: u32 = 10_000;

/// Whole part of the price is drawn from [0, PRICE_WHOLE_UPPER_BOUND)
pub const PRICE_WHOLE_UPPER_BOUND: u32 = 1000;

/// Font color applied to every header and data cell
pub const CELL_FONT_COLOR: &str = "777777";

/// Number format for the price column
pub const PRICE_NUMBER_FORMAT: &str = "0.00";

/// Number format for the code column (text, keeps leading zeros)
pub const CODE_NUMBER_FORMAT: &str = "@";

/// Number of cell styles a workbook may hold
pub const MAX_CELL_STYLES: usize = 64_000;
