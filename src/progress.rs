//! Time-based progress telemetry: an `indicatif` spinner for terminals and an
//! `info!` line at the same cadence for logs.

use crate::coordinator::IngestStats;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tracing::info;

/// Spinner refresh cadence, in pages.
const SPINNER_EVERY: usize = 1000;

pub struct ProgressReporter {
    bar: ProgressBar,
    interval: Duration,
    last_report: Instant,
    reports: usize,
}

impl ProgressReporter {
    pub fn new(interval: Duration, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb
        };

        Self {
            bar,
            interval,
            last_report: Instant::now(),
            reports: 0,
        }
    }

    /// Silent reporter for library callers and tests; log lines still go out.
    pub fn hidden(interval: Duration) -> Self {
        Self::new(interval, true)
    }

    pub fn reports_emitted(&self) -> usize {
        self.reports
    }

    fn due(&self, now: Instant) -> bool {
        now.duration_since(self.last_report) >= self.interval
    }

    /// Call once per page read. Returns true when a report was emitted.
    pub fn tick(&mut self, stats: &IngestStats, elapsed: Duration) -> bool {
        if stats.pages_seen % SPINNER_EVERY == 0 {
            self.bar.set_message(status_line(stats, elapsed));
        }

        let now = Instant::now();
        if !self.due(now) {
            return false;
        }
        self.last_report = now;
        self.reports += 1;
        self.bar.set_message(status_line(stats, elapsed));
        info!(
            pages_seen = stats.pages_seen,
            pages_resumed = stats.pages_resumed,
            pages_qualifying = stats.pages_qualifying,
            entries = stats.entries,
            elapsed_secs = elapsed.as_secs(),
            pages_per_sec = rate(stats.pages_seen, elapsed) as u64,
            "progress"
        );
        true
    }

    pub fn finish(&self, stats: &IngestStats, elapsed: Duration) {
        self.bar.finish_and_clear();
        info!(
            pages_seen = stats.pages_seen,
            pages_qualifying = stats.pages_qualifying,
            entries = stats.entries,
            pages_failed = stats.pages_failed,
            elapsed_secs = elapsed.as_secs(),
            progress_reports = self.reports,
            "ingest finished"
        );
    }
}

pub fn rate(pages: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        pages as f64 / secs
    } else {
        0.0
    }
}

fn status_line(stats: &IngestStats, elapsed: Duration) -> String {
    format!(
        "Pages: {} | Qualifying: {} | Entries: {} | Rate: {:.0} pg/s",
        stats.pages_seen,
        stats.pages_qualifying,
        stats.entries,
        rate(stats.pages_seen, elapsed)
    )
}
