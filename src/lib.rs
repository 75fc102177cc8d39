//! Streaming Wiktionary ingestion.
//!
//! Pages are pulled from a MediaWiki XML export by [`PageExtractor`], filtered
//! and parsed into [`LanguageEntry`] trees by [`IngestCoordinator`], and written
//! in batches to an [`EntrySink`] (JSON Lines or SQLite).

pub mod config;
pub mod coordinator;
pub mod error;
pub mod extractor;
pub mod languages;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod pos;
pub mod progress;
pub mod sink;
pub mod template;

pub use config::IngestConfig;
pub use coordinator::{classify_page, IngestCoordinator, IngestStats, PageDisposition, SkipReason};
pub use error::IngestError;
pub use extractor::PageExtractor;
pub use languages::LanguageTable;
pub use model::{DefinitionDraft, LanguageEntry, PageRecord, ParsedPage, PosSection};
pub use normalize::normalize;
pub use parser::{parse, parse_page};
pub use pos::PosTable;
pub use progress::ProgressReporter;
pub use sink::{EntrySink, JsonlSink, SqliteSink};
