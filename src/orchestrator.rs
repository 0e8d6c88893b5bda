// src/orchestrator.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end run: reporter, sheet setup, row loop, flush, save

use std::path::PathBuf;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::constants::SHEET_NAME;
use crate::error::RunError;
use crate::generator::{stream_records, GeneratorConfig, Pause};
use crate::record::RowStyles;
use crate::reporter::MemoryReporter;
use crate::writer::SpreadsheetSink;

/// What a successful run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub output: PathBuf,
    pub rows_written: u32,
    pub pauses: u32,
    pub elapsed: Duration,
}

/// Drive `sink` through a complete workbook for `config`
///
/// Steps run in a fixed order and the first failure ends the run, wrapped
/// with the step that failed. A failed flush means `save_as` is never called.
pub fn write_workbook<R, S, P>(
    config: &GeneratorConfig,
    rng: &mut R,
    sink: &mut S,
    pauser: &mut P,
) -> Result<RunSummary, RunError>
where
    R: Rng,
    S: SpreadsheetSink + ?Sized,
    P: Pause + ?Sized,
{
    config.validate()?;
    let start = Instant::now();

    let sheet = sink
        .open_sheet(SHEET_NAME)
        .map_err(|source| RunError::OpenSheet {
            name: SHEET_NAME.to_string(),
            source,
        })?;
    let styles = RowStyles::register(sink).map_err(RunError::Style)?;
    let stream = sink.begin_row_stream(sheet).map_err(RunError::BeginStream)?;
    sink.write_header_row(stream, &styles.header_columns())
        .map_err(RunError::Header)?;

    let stats = stream_records(
        rng,
        sink,
        stream,
        &styles,
        config.total_rows,
        config.throttle(),
        pauser,
    )?;

    sink.flush(stream).map_err(RunError::Flush)?;
    sink.save_as(&config.output)
        .map_err(|source| RunError::Save {
            path: config.output.clone(),
            source,
        })?;

    Ok(RunSummary {
        output: config.output.clone(),
        rows_written: stats.rows_written,
        pauses: stats.pauses,
        elapsed: start.elapsed(),
    })
}

/// Result of [`execute`], mapped to a process exit status
#[derive(Debug)]
pub struct RunOutcome {
    result: anyhow::Result<RunSummary>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// 0 on success, 1 on any failure
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&anyhow::Error> {
        self.result.as_ref().err()
    }

    pub fn into_result(self) -> anyhow::Result<RunSummary> {
        self.result
    }
}

/// Run the whole program against `sink`
///
/// Seeds the generator from `config.seed`, keeps a memory reporter running
/// for the duration, and logs the terminal success or failure. The reporter
/// is stopped and joined before returning.
pub fn execute<S, P>(config: &GeneratorConfig, sink: &mut S, pauser: &mut P) -> RunOutcome
where
    S: SpreadsheetSink + ?Sized,
    P: Pause + ?Sized,
{
    tracing::info!(
        "Generating {} rows into {} (seed {})",
        config.total_rows,
        config.output.display(),
        config.seed
    );

    let result = match config.validate() {
        Ok(()) => {
            let mut rng = config.rng();
            let reporter = MemoryReporter::new(config.report_period).spawn();
            let result = write_workbook(config, &mut rng, sink, pauser);
            let ticks = reporter.stop();
            tracing::debug!("Memory reporter produced {} snapshots", ticks);
            result
        }
        Err(err) => Err(err),
    }
    .map_err(anyhow::Error::new);

    match &result {
        Ok(summary) => {
            tracing::info!(
                "Wrote {} rows to {} in {:.2}s",
                summary.rows_written,
                summary.output.display(),
                summary.elapsed.as_secs_f64()
            );
            tracing::info!("Excel file generated successfully");
        }
        Err(err) => tracing::error!("Failed to generate Excel file: {:#}", err),
    }

    RunOutcome { result }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WriterError;
    use crate::generator::tests::{init_tracing, RecordingPause, RecordingSink};
    use crate::generator::ThreadSleep;
    use crate::record::HEADER;
    use crate::writer::XlsxWorkbook;
    use std::io::Read;

    fn small_config(total_rows: u32) -> GeneratorConfig {
        GeneratorConfig {
            output: PathBuf::from("products-test.xlsx"),
            total_rows,
            seed: 99,
            throttle_every: 0,
            throttle_pause: Duration::ZERO,
            report_period: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_call_order() {
        init_tracing();
        let mut sink = RecordingSink::default();
        let outcome = execute(&small_config(3), &mut sink, &mut RecordingPause::default());
        assert!(outcome.is_success());
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(
            sink.calls,
            vec![
                "open_sheet products",
                "add_style",
                "add_style",
                "add_style",
                "add_style",
                "begin_row_stream",
                "write_header_row",
                "flush",
                "save_as products-test.xlsx",
            ]
        );
        let header: Vec<_> = sink
            .header
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.label.clone())
            .collect();
        assert_eq!(header, HEADER);
        assert_eq!(sink.rows.iter().map(|(r, _)| *r).collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(outcome.summary().unwrap().rows_written, 3);
    }

    #[test]
    fn test_flush_failure_skips_save() {
        init_tracing();
        let mut sink = RecordingSink {
            fail_flush: true,
            ..Default::default()
        };
        let outcome = execute(&small_config(3), &mut sink, &mut RecordingPause::default());
        assert!(!outcome.is_success());
        assert_ne!(outcome.exit_code(), 0);
        assert!(!sink.calls.iter().any(|c| c.starts_with("save_as")));

        let err = outcome.error().unwrap();
        assert!(matches!(err.downcast_ref::<RunError>(), Some(RunError::Flush(_))));
        assert!(format!("{err:#}").contains("flush refused"));
    }

    #[test]
    fn test_row_failure_aborts_before_flush() {
        init_tracing();
        let mut sink = RecordingSink {
            fail_at_row: Some(3),
            ..Default::default()
        };
        let outcome = execute(&small_config(10), &mut sink, &mut RecordingPause::default());
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(sink.rows.len(), 1);
        assert!(!sink.calls.iter().any(|c| c == "flush"));
        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.downcast_ref::<RunError>().and_then(RunError::failed_row), Some(3));
    }

    #[test]
    fn test_style_failure_is_reported_as_setup_error() {
        init_tracing();
        let mut sink = RecordingSink {
            fail_style: true,
            ..Default::default()
        };
        let err = write_workbook(
            &small_config(3),
            &mut small_config(3).rng(),
            &mut sink,
            &mut RecordingPause::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Style(WriterError::StyleTableFull(_))));
        assert!(sink.rows.is_empty());
    }

    #[test]
    fn test_save_failure_is_fatal() {
        init_tracing();
        let mut sink = RecordingSink {
            fail_save: true,
            ..Default::default()
        };
        let outcome = execute(&small_config(2), &mut sink, &mut RecordingPause::default());
        assert_eq!(outcome.exit_code(), 1);
        let err = outcome.error().unwrap();
        assert!(err.to_string().contains("products-test.xlsx"));
    }

    #[test]
    fn test_invalid_config_touches_nothing() {
        init_tracing();
        let mut sink = RecordingSink::default();
        let config = GeneratorConfig {
            total_rows: u32::MAX,
            ..small_config(0)
        };
        let outcome = execute(&config, &mut sink, &mut RecordingPause::default());
        assert_eq!(outcome.exit_code(), 1);
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn test_end_to_end_three_rows() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig {
            output: dir.path().join("products.xlsx"),
            ..small_config(3)
        };
        let mut workbook = XlsxWorkbook::new();
        let outcome = execute(&config, &mut workbook, &mut ThreadSleep);
        assert_eq!(outcome.exit_code(), 0);

        let file = std::fs::File::open(&config.output).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut read = |name: &str| {
            let mut text = String::new();
            if let Ok(mut part) = archive.by_name(name) {
                part.read_to_string(&mut text).unwrap();
            }
            text
        };
        let sheet = read("xl/worksheets/sheet1.xml");
        // strings may live inline or in the shared table
        let strings = format!("{sheet}{}", read("xl/sharedStrings.xml"));

        assert_eq!(sheet.matches("<row ").count(), 4);
        assert!(sheet.contains(r#"<row r="1""#));
        assert!(sheet.contains(r#"<row r="4""#));
        assert!(!sheet.contains(r#"<row r="5""#));
        assert!(sheet.contains(r#"<autoFilter ref="A1:D1""#));
        for label in HEADER {
            assert!(strings.contains(&format!(">{label}</t>")), "{label}");
        }
        // first seed-99 record
        assert!(strings.contains(">00000069</t>"));
        assert!(strings.contains(">Product 7998</t>"));

        // price column is numeric
        let start = sheet.find(r#"<c r="D2""#).unwrap();
        let price = &sheet[start..start + sheet[start..].find("</c>").unwrap()];
        assert!(price.contains("<v>"), "{price}");
        assert!(!price.contains(" t="), "{price}");
    }
}
