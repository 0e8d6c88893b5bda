// src/reporter.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic memory reporter running on its own thread

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::memory::MemorySnapshot;

/// Captures a [`MemorySnapshot`] every `period` until stopped
#[derive(Debug, Clone, Copy)]
pub struct MemoryReporter {
    period: Duration,
}

impl MemoryReporter {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// Start logging one snapshot per tick
    pub fn spawn(self) -> ReporterHandle {
        self.spawn_with(|snapshot| tracing::info!("Memory usage: {}", snapshot))
    }

    /// Start calling `on_tick` with one snapshot per tick
    ///
    /// If the thread cannot be started the run goes on without a reporter.
    pub fn spawn_with<F>(self, mut on_tick: F) -> ReporterHandle
    where
        F: FnMut(&MemorySnapshot) + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let period = self.period;

        let spawned = thread::Builder::new()
            .name("memory-reporter".to_string())
            .spawn(move || {
                let mut ticks = 0u64;
                loop {
                    match stop_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => {
                            ticks += 1;
                            on_tick(&MemorySnapshot::capture());
                        }
                        // stop requested, or the handle is gone
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                ticks
            });

        let thread = match spawned {
            Ok(thread) => {
                tracing::debug!("Memory reporter started (period {:?})", period);
                Some(thread)
            }
            Err(e) => {
                tracing::warn!("Failed to start memory reporter: {}", e);
                None
            }
        };

        ReporterHandle {
            stop: Some(stop_tx),
            thread,
        }
    }
}

impl Default for MemoryReporter {
    fn default() -> Self {
        Self::new(crate::constants::REPORT_PERIOD)
    }
}

/// Owner of a running reporter. Stops and joins the thread on `stop` or drop.
pub struct ReporterHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<u64>>,
}

impl ReporterHandle {
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signal the reporter, wait for it, and return how many ticks it ran
    pub fn stop(mut self) -> u64 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u64 {
        if let Some(stop) = self.stop.take() {
            // a send error means the thread already exited
            let _ = stop.send(());
        }
        match self.thread.take().map(JoinHandle::join) {
            Some(Ok(ticks)) => {
                tracing::debug!("Memory reporter stopped after {} ticks", ticks);
                ticks
            }
            Some(Err(_)) => {
                tracing::warn!("Memory reporter thread panicked");
                0
            }
            None => 0,
        }
    }
}

impl Drop for ReporterHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
