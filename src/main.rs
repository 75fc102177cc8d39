use anyhow::{Context, Result};
use bzip2::read::BzDecoder;
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wiktionary_ingest::{
    EntrySink, IngestConfig, IngestCoordinator, IngestError, IngestStats, JsonlSink, PageExtractor,
    ProgressReporter, SqliteSink,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One JSON object per language entry per line
    Jsonl,
    /// Lexicon tables in a SQLite database
    Sqlite,
}

#[derive(Parser)]
#[command(name = "wiktionary-ingest")]
#[command(about = "Streaming Wiktionary XML ingester - extracts words, languages, senses and examples")]
struct Args {
    /// Input XML file (.xml or .xml.bz2)
    input: PathBuf,

    /// Output file (JSONL or SQLite database)
    output: PathBuf,

    /// Output format (default: sqlite for .db/.sqlite outputs, jsonl otherwise)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// YAML config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pages per committed batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Page records to pass over before parsing (resume after a corrupt stream)
    #[arg(long)]
    skip_pages: Option<usize>,

    /// Limit number of pages to read (for testing with raw dumps)
    #[arg(long)]
    page_limit: Option<usize>,

    /// Language table YAML (default: built-in table)
    #[arg(long)]
    languages: Option<PathBuf>,

    /// POS schema YAML (default: built-in table)
    #[arg(long)]
    pos: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (e.g. info, debug, wiktionary_ingest=trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn resolve_config(&self) -> Result<IngestConfig> {
        let mut config = match &self.config {
            Some(path) => IngestConfig::from_yaml_path(path)?,
            None => IngestConfig::default(),
        };

        if let Some(n) = self.batch_size {
            config.batch_size = n;
        }
        if let Some(n) = self.skip_pages {
            config.skip_pages = n;
        }
        if self.page_limit.is_some() {
            config.page_limit = self.page_limit;
        }
        if self.languages.is_some() {
            config.languages_path = self.languages.clone();
        }
        if self.pos.is_some() {
            config.pos_path = self.pos.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }

        config.validate()?;
        Ok(config)
    }

    fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_else(|| {
            match self.output.extension().and_then(|e| e.to_str()) {
                Some("db") | Some("sqlite") | Some("sqlite3") => OutputFormat::Sqlite,
                _ => OutputFormat::Jsonl,
            }
        })
    }
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader: Box<dyn BufRead> = if path.to_string_lossy().ends_with(".bz2") {
        Box::new(BufReader::with_capacity(256 * 1024, BzDecoder::new(file)))
    } else {
        Box::new(BufReader::with_capacity(256 * 1024, file))
    };
    Ok(reader)
}

fn open_sink(path: &Path, format: OutputFormat) -> Result<Box<dyn EntrySink>> {
    let sink: Box<dyn EntrySink> = match format {
        OutputFormat::Jsonl => Box::new(JsonlSink::create(path)?),
        OutputFormat::Sqlite => Box::new(SqliteSink::open(path)?),
    };
    Ok(sink)
}

fn print_stats(stats: &IngestStats) {
    println!();
    println!("============================================================");
    println!("Pages seen: {}", stats.pages_seen);
    if stats.pages_resumed > 0 {
        println!("  resumed past: {}", stats.pages_resumed);
    }
    println!("Pages qualifying: {}", stats.pages_qualifying);
    println!("Entries produced: {}", stats.entries);
    println!("  sections: {}", stats.sections);
    println!("  definitions: {}", stats.definitions);
    println!("  examples: {}", stats.examples);
    println!("------------------------------------------------------------");
    println!("Non-main namespace: {}", stats.skipped_namespace);
    println!("Namespaced titles: {}", stats.skipped_namespaced_title);
    println!("Redirects: {}", stats.skipped_redirect);
    println!("Failed pages: {}", stats.pages_failed);
    println!("Batches committed: {}", stats.batches_committed);
    println!("Time: {}m {}s", stats.elapsed.as_secs() / 60, stats.elapsed.as_secs() % 60);
    println!("Rate: {:.0} pages/sec", stats.pages_per_second());
    println!("============================================================");
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.resolve_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let format = args.output_format();
    if !args.quiet {
        println!("Parsing: {}", args.input.display());
        println!("Output: {} ({:?})", args.output.display(), format);
        println!("Batch size: {}", config.batch_size);
        if config.skip_pages > 0 {
            println!("Skipping first {} pages", config.skip_pages);
        }
        if let Some(limit) = config.page_limit {
            println!("Page limit: {}", limit);
        }
        println!();
    }

    let reader = open_input(&args.input)?;
    let sink = open_sink(&args.output, format)?;
    let progress = ProgressReporter::new(Duration::from_secs(config.progress_interval_secs), args.quiet);
    let mut coordinator = IngestCoordinator::from_config(sink, config)?.with_progress(progress);

    match coordinator.run(PageExtractor::new(reader)) {
        Ok(stats) => {
            if !args.quiet {
                print_stats(&stats);
            }
            Ok(())
        }
        Err(e) => {
            if let IngestError::MalformedStream { offset, pages, .. } = &e {
                eprintln!("Input is corrupt at byte {} after {} pages.", offset, pages);
                eprintln!(
                    "Pages before that point were written. To continue past it, rerun with --skip-pages {}",
                    pages
                );
            }
            Err(e.into())
        }
    }
}
