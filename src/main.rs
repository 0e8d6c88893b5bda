// src/main.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generate a large product spreadsheet while reporting memory usage.
//!
//! Usage:
//!   # Full run: 1,048,575 rows into great-size-file.xlsx, seed 99
//!   xlsx-stream-gen
//!
//!   # Small, unthrottled run
//!   xlsx-stream-gen --rows 3 --throttle-every 0 --throttle-ms 0 --output small.xlsx

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use xlsx_stream_gen::constants::*;
use xlsx_stream_gen::{execute, CountingAllocator, GeneratorConfig, ThreadSleep, XlsxWorkbook};

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

#[derive(Parser, Debug)]
#[command(name = "xlsx-stream-gen")]
#[command(about = "Stream synthetic product rows into an .xlsx file", long_about = None)]
struct Args {
    /// Output file (replaced if it exists)
    #[arg(short, long, default_value = OUTPUT_FILENAME)]
    output: PathBuf,

    /// Number of data rows after the header
    #[arg(long, default_value_t = TOTAL_ROWS)]
    rows: u32,

    /// Random seed for reproducible rows
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Pause after this many rows (0 disables throttling)
    #[arg(long, default_value_t = THROTTLE_EVERY)]
    throttle_every: u32,

    /// Length of each throttle pause in milliseconds
    #[arg(long, default_value_t = THROTTLE_PAUSE.as_millis() as u64)]
    throttle_ms: u64,

    /// Memory report period in milliseconds
    #[arg(long, default_value_t = REPORT_PERIOD.as_millis() as u64)]
    report_ms: u64,
}

impl Args {
    fn into_config(self) -> Result<GeneratorConfig> {
        let config = GeneratorConfig {
            output: self.output,
            total_rows: self.rows,
            seed: self.seed,
            throttle_every: self.throttle_every,
            throttle_pause: Duration::from_millis(self.throttle_ms),
            report_period: Duration::from_millis(self.report_ms),
        };
        config.validate().context("invalid command line")?;
        Ok(config)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> ExitCode {
    init_tracing();

    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{:#}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut workbook = XlsxWorkbook::new();
    let outcome = execute(&config, &mut workbook, &mut ThreadSleep);
    ExitCode::from(outcome.exit_code())
}
