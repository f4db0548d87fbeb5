//! Run progress, for humans (logs) and machines (stats file)

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct ProgressReport {
    done: usize,
    total: usize,
}

/// Done/total counters shared by the sequential phase and the asset workers.
///
/// `total` starts at 1 and only reaches `done` once [`Progress::finish`] is
/// called, so a consumer never sees a complete run before it is complete.
#[derive(Debug)]
pub struct Progress {
    done: AtomicUsize,
    total: AtomicUsize,
    stats_file: Option<PathBuf>,
    interval: Duration,
    last_report: Mutex<Option<Instant>>,
}

impl Progress {
    pub fn new(stats_file: Option<PathBuf>, interval: Duration) -> Progress {
        Progress {
            done: AtomicUsize::new(0),
            total: AtomicUsize::new(1),
            stats_file,
            interval,
            last_report: Mutex::new(None),
        }
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn add_total(&self, count: usize) {
        self.total.fetch_add(count, Ordering::SeqCst);
    }

    /// One more unit of work done; reports when the interval has elapsed.
    pub fn increment(&self) {
        self.done.fetch_add(1, Ordering::SeqCst);
        self.checkpoint();
    }

    pub fn checkpoint(&self) {
        let due = {
            let mut last_report = self.last_report.lock().unwrap_or_else(PoisonError::into_inner);
            match *last_report {
                Some(at) if at.elapsed() < self.interval => false,
                _ => {
                    *last_report = Some(Instant::now());
                    true
                }
            }
        };

        if due {
            self.report();
        }
    }

    /// Logs the counters and rewrites the stats file, if any.
    pub fn report(&self) {
        let report = ProgressReport {
            done: self.done(),
            total: self.total(),
        };
        info!("Progress {} / {}", report.done, report.total);

        let Some(stats_file) = &self.stats_file else {
            return;
        };
        let written = serde_json::to_string_pretty(&report)
            .map_err(|err| err.to_string())
            .and_then(|json| fs::write(stats_file, json).map_err(|err| err.to_string()));
        if let Err(err) = written {
            warn!("failed to write progress to {}: {}", stats_file.display(), err);
        }
    }

    /// Accounts for the final step and reports unconditionally.
    pub fn finish(&self) {
        self.done.fetch_add(1, Ordering::SeqCst);
        self.report();
    }
}
