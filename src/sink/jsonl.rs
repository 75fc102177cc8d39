use super::{BatchReport, EntrySink};
use crate::error::IngestError;
use crate::model::ParsedPage;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// One JSON object per language entry per line.
pub struct JsonlSink<W: Write> {
    writer: W,
    lines_written: usize,
}

impl JsonlSink<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self, IngestError> {
        let output = File::create(path)?;
        Ok(Self::new(BufWriter::with_capacity(256 * 1024, output)))
    }
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            lines_written: 0,
        }
    }

    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EntrySink for JsonlSink<W> {
    fn write_batch(&mut self, batch: &[ParsedPage]) -> Result<BatchReport, IngestError> {
        let mut report = BatchReport::default();
        let mut out: Vec<u8> = Vec::new();
        let mut lines = 0;

        // Serialize the whole batch first so a bad page never leaves a partial line
        for page in batch {
            let start = out.len();
            let serialized = page.entries.iter().try_for_each(|entry| {
                serde_json::to_writer(&mut out, entry)?;
                out.push(b'\n');
                Ok::<(), serde_json::Error>(())
            });
            match serialized {
                Ok(()) => {
                    report.pages_written += 1;
                    lines += page.entries.len();
                }
                Err(e) => {
                    out.truncate(start);
                    warn!(title = %page.title, error = %e, "failed to serialize page");
                    report.record_failure(&page.title, e);
                }
            }
        }

        self.writer.write_all(&out)?;
        self.writer.flush()?;
        self.lines_written += lines;
        Ok(report)
    }

    fn finish(&mut self) -> Result<(), IngestError> {
        self.writer.flush()?;
        info!(lines = self.lines_written, "jsonl output complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DefinitionDraft, LanguageEntry, PosSection};

    fn page(word: &str, languages: &[(&str, &str)]) -> ParsedPage {
        ParsedPage {
            title: word.to_string(),
            entries: languages
                .iter()
                .map(|(name, code)| {
                    let mut section = PosSection::new("Noun", None);
                    section.definitions.push(DefinitionDraft::new("A thing.", None));
                    LanguageEntry {
                        word: word.to_string(),
                        language_name: name.to_string(),
                        language_code: code.to_string(),
                        sections: vec![section],
                    }
                })
                .collect(),
        }
    }

    #[test]
    fn writes_one_line_per_language_entry() {
        let mut sink = JsonlSink::new(Vec::new());
        let batch = vec![page("free", &[("English", "en"), ("French", "fr")]), page("cat", &[("English", "en")])];
        let report = sink.write_batch(&batch).unwrap();
        assert_eq!(report.pages_written, 2);
        assert!(report.failures.is_empty());
        assert_eq!(sink.lines_written(), 3);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        let first: LanguageEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.word, "free");
        assert_eq!(first.language_code, "en");
        assert!(lines[1].contains("\"languageName\":\"French\""));
    }

    #[test]
    fn batches_append() {
        let mut sink = JsonlSink::new(Vec::new());
        sink.write_batch(&[page("a", &[("English", "en")])]).unwrap();
        sink.write_batch(&[page("b", &[("English", "en")])]).unwrap();
        sink.finish().unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn page_without_entries_writes_nothing() {
        let mut sink = JsonlSink::new(Vec::new());
        let report = sink.write_batch(&[page("empty", &[])]).unwrap();
        assert_eq!(report.pages_written, 1);
        assert!(sink.into_inner().is_empty());
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_error_fails_the_batch() {
        let mut sink = JsonlSink::new(BrokenWriter);
        let err = sink.write_batch(&[page("a", &[("English", "en")])]).unwrap_err();
        assert!(matches!(err, IngestError::Io(_)));
        assert!(!err.is_fatal());
    }
}
