//! Persistence boundary.
//!
//! The coordinator hands each batch of parsed pages to an [`EntrySink`]. A sink
//! writes the batch as one atomic unit where the store allows it, and reports
//! pages it could not write instead of failing the batch.

pub mod jsonl;
pub mod sqlite;

pub use jsonl::JsonlSink;
pub use sqlite::SqliteSink;

use crate::error::IngestError;
use crate::model::ParsedPage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub pages_written: usize,
    pub failures: Vec<PageFailure>,
}

impl BatchReport {
    pub fn record_failure(&mut self, title: &str, reason: impl ToString) {
        self.failures.push(PageFailure {
            title: title.to_string(),
            reason: reason.to_string(),
        });
    }
}

pub trait EntrySink {
    /// Write every page of `batch`. `Err` means nothing from the batch is durable.
    fn write_batch(&mut self, batch: &[ParsedPage]) -> Result<BatchReport, IngestError>;

    /// Flush anything still buffered at the end of a run.
    fn finish(&mut self) -> Result<(), IngestError> {
        Ok(())
    }
}

impl<S: EntrySink + ?Sized> EntrySink for Box<S> {
    fn write_batch(&mut self, batch: &[ParsedPage]) -> Result<BatchReport, IngestError> {
        (**self).write_batch(batch)
    }

    fn finish(&mut self) -> Result<(), IngestError> {
        (**self).finish()
    }
}
