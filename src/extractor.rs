//! Streaming page extractor for MediaWiki XML exports.
//!
//! Pulls events from `quick_xml` and yields one [`PageRecord`] per `<page>`.
//! Only the current page's title, namespace and text are buffered. Any XML
//! error, stray text outside the root element, input with no root element at
//! all, or end of input with elements still open ends the stream with
//! [`IngestError::MalformedStream`]; after that the iterator is fused.
//! Invalid UTF-8 inside element text is replaced, not rejected.

use crate::error::IngestError;
use crate::model::PageRecord;
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::BufRead;

/// Namespace recorded when `<ns>` is missing or not a number.
pub const UNKNOWN_NAMESPACE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Page,
    Title,
    Ns,
    Text,
    Other,
}

impl Tag {
    fn of(local_name: &[u8]) -> Tag {
        match local_name {
            b"page" => Tag::Page,
            b"title" => Tag::Title,
            b"ns" => Tag::Ns,
            b"text" => Tag::Text,
            _ => Tag::Other,
        }
    }
}

/// Page being assembled from XML events
#[derive(Debug, Default)]
struct PartialPage {
    title: String,
    namespace: String,
    body: String,
}

impl PartialPage {
    fn field_mut(&mut self, tag: Tag) -> Option<&mut String> {
        match tag {
            Tag::Title => Some(&mut self.title),
            Tag::Ns => Some(&mut self.namespace),
            Tag::Text => Some(&mut self.body),
            Tag::Page | Tag::Other => None,
        }
    }

    fn finish(self) -> PageRecord {
        PageRecord {
            title: self.title,
            namespace_id: self.namespace.trim().parse().unwrap_or(UNKNOWN_NAMESPACE),
            body: self.body,
        }
    }
}

pub struct PageExtractor<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    /// Open element count; non-zero at end of input means truncation.
    depth: usize,
    seen_root: bool,
    page: Option<PartialPage>,
    field: Option<Tag>,
    pages_emitted: usize,
    finished: bool,
}

impl<R: BufRead> PageExtractor<R> {
    pub fn new(input: R) -> Self {
        Self {
            reader: Reader::from_reader(input),
            buf: Vec::with_capacity(8192),
            depth: 0,
            seen_root: false,
            page: None,
            field: None,
            pages_emitted: 0,
            finished: false,
        }
    }

    /// Bytes of input consumed so far.
    pub fn byte_offset(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    pub fn pages_emitted(&self) -> usize {
        self.pages_emitted
    }

    fn open(page: &mut Option<PartialPage>, field: &mut Option<Tag>, tag: Tag) {
        match tag {
            Tag::Page => {
                *page = Some(PartialPage::default());
                *field = None;
            }
            Tag::Title | Tag::Ns | Tag::Text => {
                // A later occurrence replaces an earlier one, so the last revision's text wins
                if let Some(buffer) = page.as_mut().and_then(|p| p.field_mut(tag)) {
                    buffer.clear();
                    *field = Some(tag);
                }
            }
            Tag::Other => {}
        }
    }

    fn read_page(&mut self) -> Result<Option<PageRecord>, String> {
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf) {
                Err(e) => return Err(e.to_string()),
                Ok(Event::Start(e)) => {
                    self.seen_root = true;
                    self.depth += 1;
                    let tag = Tag::of(e.local_name().as_ref());
                    Self::open(&mut self.page, &mut self.field, tag);
                }
                Ok(Event::Empty(e)) => {
                    self.seen_root = true;
                    let tag = Tag::of(e.local_name().as_ref());
                    Self::open(&mut self.page, &mut self.field, tag);
                    self.field = None;
                }
                Ok(Event::End(e)) => {
                    self.depth = self.depth.saturating_sub(1);
                    match Tag::of(e.local_name().as_ref()) {
                        Tag::Page => {
                            self.field = None;
                            if let Some(page) = self.page.take() {
                                return Ok(Some(page.finish()));
                            }
                        }
                        tag if self.field == Some(tag) => self.field = None,
                        _ => {}
                    }
                }
                Ok(Event::Text(e)) => {
                    if self.depth == 0 && !e.iter().all(u8::is_ascii_whitespace) {
                        return Err(
                            "text outside the root element; input is not an XML dump".to_string()
                        );
                    }
                    if let (Some(page), Some(tag)) = (self.page.as_mut(), self.field) {
                        let raw = String::from_utf8_lossy(&e);
                        let text = unescape(&raw).map_err(|err| err.to_string())?;
                        if let Some(buffer) = page.field_mut(tag) {
                            buffer.push_str(&text);
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    if self.depth == 0 {
                        return Err("CDATA outside the root element".to_string());
                    }
                    if let (Some(page), Some(tag)) = (self.page.as_mut(), self.field) {
                        if let Some(buffer) = page.field_mut(tag) {
                            buffer.push_str(&String::from_utf8_lossy(&e));
                        }
                    }
                }
                Ok(Event::Eof) => {
                    if !self.seen_root {
                        return Err("no root element; input is not an XML dump".to_string());
                    }
                    if self.depth > 0 {
                        return Err(format!(
                            "unexpected end of stream with {} element(s) still open",
                            self.depth
                        ));
                    }
                    return Ok(None);
                }
                Ok(_) => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for PageExtractor<R> {
    type Item = Result<PageRecord, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_page() {
            Ok(Some(page)) => {
                self.pages_emitted += 1;
                Some(Ok(page))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(message) => {
                self.finished = true;
                Some(Err(IngestError::MalformedStream {
                    offset: self.byte_offset(),
                    pages: self.pages_emitted,
                    message,
                }))
            }
        }
    }
}
