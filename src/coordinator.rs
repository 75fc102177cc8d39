//! Drives extraction, filtering, parsing and batched persistence for one run.

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::languages::LanguageTable;
use crate::model::{LanguageEntry, PageRecord, ParsedPage};
use crate::parser::parse;
use crate::pos::PosTable;
use crate::progress::{rate, ProgressReporter};
use crate::sink::EntrySink;
use lazy_static::lazy_static;
use regex::Regex;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const MAIN_NAMESPACE: i32 = 0;

lazy_static! {
    static ref REDIRECT: Regex = Regex::new(r"(?i)^\s*#redirect").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NonMainNamespace,
    /// Title contains `:` even though the page claims namespace 0
    NamespacedTitle,
    Redirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDisposition {
    Eligible,
    Skipped(SkipReason),
}

/// Decide whether a page reaches the parser.
pub fn classify_page(page: &PageRecord) -> PageDisposition {
    if page.namespace_id != MAIN_NAMESPACE {
        PageDisposition::Skipped(SkipReason::NonMainNamespace)
    } else if page.title.contains(':') {
        PageDisposition::Skipped(SkipReason::NamespacedTitle)
    } else if REDIRECT.is_match(&page.body) {
        PageDisposition::Skipped(SkipReason::Redirect)
    } else {
        PageDisposition::Eligible
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestStats {
    /// Page records read from the stream, including resumed-past ones
    pub pages_seen: usize,
    /// Page records passed over because of `skip_pages`
    pub pages_resumed: usize,
    pub pages_qualifying: usize,
    pub skipped_namespace: usize,
    pub skipped_namespaced_title: usize,
    pub skipped_redirect: usize,
    /// Qualifying pages whose entries did not reach the store
    pub pages_failed: usize,
    pub entries: usize,
    pub sections: usize,
    pub definitions: usize,
    pub examples: usize,
    pub batches_committed: usize,
    pub elapsed: Duration,
}

impl IngestStats {
    pub fn pages_skipped(&self) -> usize {
        self.skipped_namespace + self.skipped_namespaced_title + self.skipped_redirect
    }

    pub fn pages_per_second(&self) -> f64 {
        rate(self.pages_seen, self.elapsed)
    }

    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::NonMainNamespace => self.skipped_namespace += 1,
            SkipReason::NamespacedTitle => self.skipped_namespaced_title += 1,
            SkipReason::Redirect => self.skipped_redirect += 1,
        }
    }

    fn record_entries(&mut self, entries: &[LanguageEntry]) {
        self.entries += entries.len();
        for entry in entries {
            self.sections += entry.sections.len();
            self.definitions += entry.definition_count();
            self.examples += entry.example_count();
        }
    }
}

pub struct IngestCoordinator<S: EntrySink> {
    sink: S,
    config: IngestConfig,
    languages: LanguageTable,
    pos_table: PosTable,
    progress: ProgressReporter,
}

impl<S: EntrySink> IngestCoordinator<S> {
    pub fn new(sink: S, config: IngestConfig, languages: LanguageTable, pos_table: PosTable) -> Self {
        let progress = ProgressReporter::hidden(Duration::from_secs(config.progress_interval_secs));
        Self {
            sink,
            config,
            languages,
            pos_table,
            progress,
        }
    }

    /// Validate `config` and load the reference tables it names.
    pub fn from_config(sink: S, config: IngestConfig) -> Result<Self, IngestError> {
        config.validate()?;
        let languages = config.language_table()?;
        let pos_table = config.pos_table()?;
        Ok(Self::new(sink, config, languages, pos_table))
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Consume `pages` to the end, or until `page_limit` or a fatal stream error.
    ///
    /// On a fatal error the pending batch is written first, so every page
    /// before the corruption point is persisted and `skip_pages` can resume.
    pub fn run<I>(&mut self, pages: I) -> Result<IngestStats, IngestError>
    where
        I: IntoIterator<Item = Result<PageRecord, IngestError>>,
    {
        let start = Instant::now();
        let mut stats = IngestStats::default();
        let mut batch: Vec<ParsedPage> = Vec::with_capacity(self.config.batch_size);

        info!(
            batch_size = self.config.batch_size,
            skip_pages = self.config.skip_pages,
            page_limit = ?self.config.page_limit,
            "ingest started"
        );

        for item in pages {
            let page = match item {
                Ok(page) => page,
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "input stream is corrupt, stopping");
                    self.flush(&mut batch, &mut stats);
                    stats.elapsed = start.elapsed();
                    self.progress.finish(&stats, stats.elapsed);
                    return Err(e);
                }
                Err(e) => {
                    warn!(error = %e, "unreadable page skipped");
                    stats.pages_failed += 1;
                    continue;
                }
            };

            stats.pages_seen += 1;
            if stats.pages_resumed < self.config.skip_pages {
                stats.pages_resumed += 1;
                self.progress.tick(&stats, start.elapsed());
                continue;
            }

            self.process(page, &mut batch, &mut stats);
            if batch.len() >= self.config.batch_size {
                self.flush(&mut batch, &mut stats);
            }

            self.progress.tick(&stats, start.elapsed());

            let read = stats.pages_seen - stats.pages_resumed;
            if self.config.page_limit.map_or(false, |limit| read >= limit) {
                info!(pages = read, "page limit reached");
                break;
            }
        }

        self.flush(&mut batch, &mut stats);
        self.sink.finish()?;
        stats.elapsed = start.elapsed();
        self.progress.finish(&stats, stats.elapsed);
        Ok(stats)
    }

    fn process(&self, page: PageRecord, batch: &mut Vec<ParsedPage>, stats: &mut IngestStats) {
        match classify_page(&page) {
            PageDisposition::Skipped(reason) => {
                debug!(title = %page.title, ns = page.namespace_id, ?reason, "page skipped");
                stats.record_skip(reason);
            }
            PageDisposition::Eligible => {
                stats.pages_qualifying += 1;
                let entries = parse(&page.title, &page.body, &self.languages, &self.pos_table);
                if entries.is_empty() {
                    debug!(title = %page.title, "no language sections");
                    return;
                }
                stats.record_entries(&entries);
                batch.push(ParsedPage {
                    title: page.title,
                    entries,
                });
            }
        }
    }

    fn flush(&mut self, batch: &mut Vec<ParsedPage>, stats: &mut IngestStats) {
        if batch.is_empty() {
            return;
        }

        match self.sink.write_batch(batch) {
            Ok(report) => {
                stats.batches_committed += 1;
                stats.pages_failed += report.failures.len();
                for failure in &report.failures {
                    warn!(title = %failure.title, reason = %failure.reason, "page not persisted");
                }
            }
            Err(e) => {
                stats.pages_failed += batch.len();
                error!(error = %e, pages = batch.len(), "batch write failed");
                for page in batch.iter() {
                    warn!(title = %page.title, "page dropped with failed batch");
                }
            }
        }

        batch.clear();
    }
}
