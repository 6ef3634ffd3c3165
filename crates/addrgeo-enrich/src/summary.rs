//! Per-run outcome counters and the final summary.

use std::fmt;

use crate::outcome::RecordOutcome;

/// Mutable counters owned by the pipeline for the duration of one pass.
#[derive(Debug, Default, Clone)]
pub struct RunCounters {
    read: u64,
    inserted: u64,
    skipped: u64,
    api_failures: u64,
    storage_failures: u64,
}

impl RunCounters {
    pub fn record_read(&mut self) {
        self.read += 1;
    }

    /// Bumps the single bucket that `outcome` belongs to.
    pub fn tally(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Inserted => self.inserted += 1,
            RecordOutcome::Skipped => self.skipped += 1,
            RecordOutcome::Unresolved(_) | RecordOutcome::TransportFailure(_) => {
                self.api_failures += 1;
            }
            RecordOutcome::StorageFailure(_) => self.storage_failures += 1,
        }
    }

    #[must_use]
    pub fn inserted(&self) -> u64 {
        self.inserted
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            read: self.read,
            inserted: self.inserted,
            skipped: self.skipped,
            api_failures: self.api_failures,
            storage_failures: self.storage_failures,
        }
    }
}

/// Immutable snapshot of a finished pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    read: u64,
    inserted: u64,
    skipped: u64,
    api_failures: u64,
    storage_failures: u64,
}

impl RunSummary {
    #[must_use]
    pub fn read(&self) -> u64 {
        self.read
    }

    #[must_use]
    pub fn inserted(&self) -> u64 {
        self.inserted
    }

    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    #[must_use]
    pub fn api_failures(&self) -> u64 {
        self.api_failures
    }

    #[must_use]
    pub fn storage_failures(&self) -> u64 {
        self.storage_failures
    }

    /// Every record read falls into exactly one bucket.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.inserted + self.skipped + self.api_failures + self.storage_failures == self.read
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "summary: total_read={}, inserted={}, skipped={}, api_failures={}, storage_failures={}",
            self.read, self.inserted, self.skipped, self.api_failures, self.storage_failures
        )
    }
}
