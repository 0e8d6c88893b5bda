// src/generator.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row generation and throttled streaming into a [`SpreadsheetSink`]

use std::path::PathBuf;
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::constants::*;
use crate::error::RunError;
use crate::record::{ProductRecord, RowStyles};
use crate::writer::{SpreadsheetSink, StreamHandle};

/// Configuration for a generation run
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Output file, replaced if it exists
    pub output: PathBuf,
    /// Number of data rows after the header
    pub total_rows: u32,
    /// Seed for the record generator
    pub seed: u64,
    /// Pause after every `throttle_every` rows (0 = never pause)
    pub throttle_every: u32,
    /// Length of each pause
    pub throttle_pause: Duration,
    /// Memory reporter tick
    pub report_period: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from(OUTPUT_FILENAME),
            total_rows: TOTAL_ROWS,
            seed: DEFAULT_SEED,
            throttle_every: THROTTLE_EVERY,
            throttle_pause: THROTTLE_PAUSE,
            report_period: REPORT_PERIOD,
        }
    }
}

impl GeneratorConfig {
    /// Check the row count fits the sheet and the throttle is coherent
    pub fn validate(&self) -> Result<(), RunError> {
        if self.total_rows > TOTAL_ROWS {
            return Err(RunError::InvalidConfig(format!(
                "total_rows {} exceeds the sheet limit of {} data rows",
                self.total_rows, TOTAL_ROWS
            )));
        }
        if self.throttle_every == 0 && !self.throttle_pause.is_zero() {
            return Err(RunError::InvalidConfig(
                "throttle pause set but throttle interval is 0".to_string(),
            ));
        }
        if self.report_period.is_zero() {
            return Err(RunError::InvalidConfig(
                "report period must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn throttle(&self) -> Throttle {
        Throttle::new(self.throttle_every, self.throttle_pause)
    }

    /// Fresh generator seeded from `seed`
    pub fn rng(&self) -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(self.seed)
    }
}

/// Something that can block the generation loop
///
/// Injected so tests can observe pauses without sleeping.
pub trait Pause {
    fn pause(&mut self, duration: Duration);
}

/// Blocks the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Pause for ThreadSleep {
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Pause schedule: `pause` after every `every` rows emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    every: u32,
    pause: Duration,
}

impl Throttle {
    pub fn new(every: u32, pause: Duration) -> Self {
        Self { every, pause }
    }

    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// True once `emitted` rows have gone out and a pause is due
    pub fn is_due(&self, emitted: u32) -> bool {
        self.every != 0 && emitted != 0 && emitted % self.every == 0
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(THROTTLE_EVERY, THROTTLE_PAUSE)
    }
}

/// Finite stream of records drawn from one generator
pub struct RecordGenerator<R = Xoshiro256PlusPlus> {
    rng: R,
    remaining: u32,
}

impl RecordGenerator<Xoshiro256PlusPlus> {
    pub fn seeded(seed: u64, count: u32) -> Self {
        Self::with_rng(Xoshiro256PlusPlus::seed_from_u64(seed), count)
    }
}

impl<R: Rng> RecordGenerator<R> {
    pub fn with_rng(rng: R, count: u32) -> Self {
        Self {
            rng,
            remaining: count,
        }
    }
}

impl<R: Rng> Iterator for RecordGenerator<R> {
    type Item = ProductRecord;

    fn next(&mut self) -> Option<ProductRecord> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(ProductRecord::random(&mut self.rng))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

/// Outcome of the row loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationStats {
    pub rows_written: u32,
    pub pauses: u32,
    pub elapsed: Duration,
}

/// Generate `total_rows` records and write them as rows 2..=total_rows+1
///
/// The header occupies row 1, so data starts right after it. Every record is
/// dropped once written; nothing accumulates. The first failed write stops
/// the loop and is returned with its row index.
pub fn stream_records<R, S, P>(
    rng: &mut R,
    sink: &mut S,
    stream: StreamHandle,
    styles: &RowStyles,
    total_rows: u32,
    throttle: Throttle,
    pauser: &mut P,
) -> Result<GenerationStats, RunError>
where
    R: Rng,
    S: SpreadsheetSink + ?Sized,
    P: Pause + ?Sized,
{
    tracing::info!(
        "Starting row generation: rows={}, throttle_every={:?}, pause={:?}",
        total_rows,
        throttle.every,
        throttle.pause
    );

    let start = Instant::now();
    let mut pauses = 0;

    for (i, record) in (0u32..).zip(RecordGenerator::with_rng(rng, total_rows)) {
        let row = i + 2;
        let cells = record.into_cells(styles);
        sink.write_row(stream, row, &cells)
            .map_err(|source| RunError::WriteRow { row, source })?;

        let emitted = i + 1;
        if throttle.is_due(emitted) {
            tracing::info!("Delay");
            tracing::debug!("Throttling after {} rows for {:?}", emitted, throttle.pause);
            pauser.pause(throttle.pause);
            pauses += 1;
        }
    }

    let stats = GenerationStats {
        rows_written: total_rows,
        pauses,
        elapsed: start.elapsed(),
    };
    tracing::info!(
        "Row generation complete: {} rows, {} pauses, {:.2}s",
        stats.rows_written,
        stats.pauses,
        stats.elapsed.as_secs_f64()
    );
    Ok(stats)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::WriterError;
    use crate::writer::{Cell, CellStyle, Column, SheetHandle, StyleId};
    use std::path::Path;

    pub(crate) fn init_tracing() {
        use tracing_subscriber::{fmt, EnvFilter};
        let _ = fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Sink that records every call and can be told to fail
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub calls: Vec<String>,
        pub rows: Vec<(u32, Vec<Cell>)>,
        pub header: Option<Vec<Column>>,
        pub fail_at_row: Option<u32>,
        pub fail_flush: bool,
        pub fail_save: bool,
        pub fail_style: bool,
    }

    impl SpreadsheetSink for RecordingSink {
        fn open_sheet(&mut self, name: &str) -> Result<SheetHandle, WriterError> {
            self.calls.push(format!("open_sheet {name}"));
            Ok(SheetHandle::new(0))
        }

        fn add_style(&mut self, _style: &CellStyle) -> Result<StyleId, WriterError> {
            self.calls.push("add_style".to_string());
            if self.fail_style {
                return Err(WriterError::StyleTableFull(0));
            }
            Ok(StyleId::new(1))
        }

        fn begin_row_stream(&mut self, _sheet: SheetHandle) -> Result<StreamHandle, WriterError> {
            self.calls.push("begin_row_stream".to_string());
            Ok(StreamHandle::new(0))
        }

        fn write_header_row(
            &mut self,
            _stream: StreamHandle,
            columns: &[Column],
        ) -> Result<(), WriterError> {
            self.calls.push("write_header_row".to_string());
            self.header = Some(columns.to_vec());
            Ok(())
        }

        fn write_row(
            &mut self,
            _stream: StreamHandle,
            row: u32,
            cells: &[Cell],
        ) -> Result<(), WriterError> {
            if self.fail_at_row == Some(row) {
                return Err(WriterError::Io(std::io::Error::other("disk full")));
            }
            self.rows.push((row, cells.to_vec()));
            Ok(())
        }

        fn flush(&mut self, _stream: StreamHandle) -> Result<(), WriterError> {
            self.calls.push("flush".to_string());
            if self.fail_flush {
                return Err(WriterError::Io(std::io::Error::other("flush refused")));
            }
            Ok(())
        }

        fn save_as(&mut self, path: &Path) -> Result<(), WriterError> {
            self.calls.push(format!("save_as {}", path.display()));
            if self.fail_save {
                return Err(WriterError::Io(std::io::Error::other("read-only")));
            }
            Ok(())
        }
    }

    /// Pauser that records each requested pause instead of sleeping
    #[derive(Default)]
    pub(crate) struct RecordingPause {
        pub pauses: Vec<Duration>,
    }

    impl Pause for RecordingPause {
        fn pause(&mut self, duration: Duration) {
            self.pauses.push(duration);
        }
    }

    fn run(
        total: u32,
        throttle: Throttle,
        sink: &mut RecordingSink,
    ) -> Result<GenerationStats, RunError> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(DEFAULT_SEED);
        let mut pauser = RecordingPause::default();
        stream_records(
            &mut rng,
            sink,
            StreamHandle::new(0),
            &RowStyles::plain(),
            total,
            throttle,
            &mut pauser,
        )
    }

    #[test]
    fn test_writes_exactly_n_contiguous_rows() {
        init_tracing();
        for total in [0, 1, 3, 17, 1000] {
            let mut sink = RecordingSink::default();
            let stats = run(total, Throttle::disabled(), &mut sink).unwrap();
            assert_eq!(stats.rows_written, total);
            assert_eq!(sink.rows.len(), total as usize);
            let indices: Vec<u32> = sink.rows.iter().map(|(r, _)| *r).collect();
            let expected: Vec<u32> = (2..total + 2).collect();
            assert_eq!(indices, expected);
        }
    }

    #[test]
    fn test_rows_carry_typed_cells() {
        init_tracing();
        let mut sink = RecordingSink::default();
        run(5, Throttle::disabled(), &mut sink).unwrap();
        for (_, cells) in &sink.rows {
            assert_eq!(cells.len(), 4);
            assert!(matches!(cells[0].value, crate::writer::CellValue::Text(_)));
            assert!(matches!(cells[1].value, crate::writer::CellValue::Text(_)));
            assert!(matches!(cells[2].value, crate::writer::CellValue::Text(_)));
            assert!(matches!(cells[3].value, crate::writer::CellValue::Number(_)));
        }
    }

    #[test]
    fn test_pauses_after_every_thousand_rows() {
        init_tracing();
        let throttle = Throttle::new(1000, Duration::from_secs(1));
        let due: Vec<u32> = (1..=3500).filter(|&n| throttle.is_due(n)).collect();
        assert_eq!(due, vec![1000, 2000, 3000]);
        assert!(!throttle.is_due(0));
        assert!(!throttle.is_due(999));
        assert!(!throttle.is_due(1001));

        let mut sink = RecordingSink::default();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let mut pauser = RecordingPause::default();
        let stats = stream_records(
            &mut rng,
            &mut sink,
            StreamHandle::new(0),
            &RowStyles::plain(),
            3500,
            throttle,
            &mut pauser,
        )
        .unwrap();
        assert_eq!(stats.pauses, 3);
        assert_eq!(pauser.pauses, vec![Duration::from_secs(1); 3]);
    }

    #[test]
    fn test_pause_is_taken_after_the_thousandth_row() {
        init_tracing();

        // the pauser reads the sink between writes, so both share it through a RefCell
        let sink = std::cell::RefCell::new(RecordingSink::default());
        struct Shared<'a>(&'a std::cell::RefCell<RecordingSink>);
        impl SpreadsheetSink for Shared<'_> {
            fn open_sheet(&mut self, name: &str) -> Result<SheetHandle, WriterError> {
                self.0.borrow_mut().open_sheet(name)
            }
            fn add_style(&mut self, style: &CellStyle) -> Result<StyleId, WriterError> {
                self.0.borrow_mut().add_style(style)
            }
            fn begin_row_stream(&mut self, s: SheetHandle) -> Result<StreamHandle, WriterError> {
                self.0.borrow_mut().begin_row_stream(s)
            }
            fn write_header_row(&mut self, s: StreamHandle, c: &[Column]) -> Result<(), WriterError> {
                self.0.borrow_mut().write_header_row(s, c)
            }
            fn write_row(&mut self, s: StreamHandle, r: u32, c: &[Cell]) -> Result<(), WriterError> {
                self.0.borrow_mut().write_row(s, r, c)
            }
            fn flush(&mut self, s: StreamHandle) -> Result<(), WriterError> {
                self.0.borrow_mut().flush(s)
            }
            fn save_as(&mut self, p: &Path) -> Result<(), WriterError> {
                self.0.borrow_mut().save_as(p)
            }
        }
        struct RowCounter<'a> {
            sink: &'a std::cell::RefCell<RecordingSink>,
            seen: Vec<usize>,
        }
        impl Pause for RowCounter<'_> {
            fn pause(&mut self, _duration: Duration) {
                self.seen.push(self.sink.borrow().rows.len());
            }
        }

        let mut shared = Shared(&sink);
        let mut counter = RowCounter {
            sink: &sink,
            seen: Vec::new(),
        };
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        stream_records(
            &mut rng,
            &mut shared,
            StreamHandle::new(0),
            &RowStyles::plain(),
            2001,
            Throttle::new(1000, Duration::ZERO),
            &mut counter,
        )
        .unwrap();
        assert_eq!(counter.seen, vec![1000, 2000]);
    }

    #[test]
    fn test_write_failure_stops_at_that_row() {
        init_tracing();
        let mut sink = RecordingSink {
            fail_at_row: Some(7),
            ..Default::default()
        };
        let err = run(20, Throttle::disabled(), &mut sink).unwrap_err();
        assert_eq!(err.failed_row(), Some(7));
        assert!(err.to_string().contains("row 7"));
        // rows 2..=6 went out, nothing after the failure
        assert_eq!(sink.rows.len(), 5);
        assert_eq!(sink.rows.last().map(|(r, _)| *r), Some(6));
    }

    #[test]
    fn test_same_seed_same_rows() {
        init_tracing();
        let mut a = RecordingSink::default();
        let mut b = RecordingSink::default();
        run(50, Throttle::disabled(), &mut a).unwrap();
        run(50, Throttle::disabled(), &mut b).unwrap();
        assert_eq!(a.rows, b.rows);

        // rows are the record stream of the same seed, in order
        let expected: Vec<_> = RecordGenerator::seeded(DEFAULT_SEED, 50)
            .map(|r| r.into_cells(&RowStyles::plain()).to_vec())
            .collect();
        let written: Vec<_> = a.rows.into_iter().map(|(_, cells)| cells).collect();
        assert_eq!(written, expected);
    }

    #[test]
    fn test_record_generator_is_finite() {
        let gen = RecordGenerator::seeded(5, 3);
        assert_eq!(gen.size_hint(), (3, Some(3)));
        assert_eq!(gen.count(), 3);
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = GeneratorConfig::default();
        assert_eq!(config.total_rows, 1_048_575);
        assert_eq!(config.seed, 99);
        assert_eq!(config.throttle(), Throttle::new(1000, Duration::from_secs(1)));
        assert_eq!(config.output, PathBuf::from("great-size-file.xlsx"));
        config.validate().unwrap();

        let too_many = GeneratorConfig {
            total_rows: TOTAL_ROWS + 1,
            ..Default::default()
        };
        assert!(matches!(too_many.validate(), Err(RunError::InvalidConfig(_))));

        let incoherent = GeneratorConfig {
            throttle_every: 0,
            ..Default::default()
        };
        assert!(incoherent.validate().is_err());

        let unthrottled = GeneratorConfig {
            throttle_every: 0,
            throttle_pause: Duration::ZERO,
            ..Default::default()
        };
        unthrottled.validate().unwrap();
    }
}
