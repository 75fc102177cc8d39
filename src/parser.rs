//! Structural parser: one page body → language entries.
//!
//! A single forward pass over the lines, carried in a [`ScanState`] value.
//! The parser never fails; markup it cannot place is skipped and the scan
//! carries on from the next header.

use crate::languages::LanguageTable;
use crate::model::{DefinitionDraft, LanguageEntry, PosSection};
use crate::normalize::{normalize, EXAMPLE_TEMPLATE, SENSE_ID_TEMPLATE};
use crate::pos::PosTable;
use crate::template::find_template;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref LANGUAGE_HEADER: Regex = Regex::new(r"^==\s*([^=]+?)\s*==$").unwrap();
    static ref SECTION_HEADER: Regex = Regex::new(r"^===\s*([^=]+?)\s*===$").unwrap();
    static ref DEEP_HEADER: Regex = Regex::new(r"^={4,}\s*([^=]+?)\s*={4,}$").unwrap();
    static ref ETYMOLOGY_HEADER: Regex = Regex::new(r"^Etymology(?:\s+(\d+))?").unwrap();
    static ref LIST_MARKER: Regex = Regex::new(r"^[#*:]+").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Nothing is recorded until the first `==Language==` header.
    NoLanguage,
    InLanguage,
    /// `last_definition` indexes the current section's definitions.
    InPos { last_definition: Option<usize> },
}

struct ScanState<'t> {
    word: String,
    languages: &'t LanguageTable,
    pos_table: &'t PosTable,
    entries: Vec<LanguageEntry>,
    mode: Mode,
    etymology: Option<u32>,
}

impl<'t> ScanState<'t> {
    fn new(word: String, languages: &'t LanguageTable, pos_table: &'t PosTable) -> Self {
        Self {
            word,
            languages,
            pos_table,
            entries: Vec::new(),
            mode: Mode::NoLanguage,
            etymology: None,
        }
    }

    fn step(mut self, raw_line: &str) -> Self {
        let line = raw_line.trim();

        if let Some(caps) = LANGUAGE_HEADER.captures(line) {
            self.open_language(&caps[1]);
            return self;
        }

        if self.mode == Mode::NoLanguage {
            return self;
        }

        if let Some(caps) = SECTION_HEADER.captures(line) {
            let name = caps[1].trim();
            match ETYMOLOGY_HEADER.captures(name) {
                Some(etym) => {
                    self.etymology = match etym.get(1) {
                        None => Some(1),
                        Some(digits) => match digits.as_str().parse() {
                            Ok(number) => Some(number),
                            Err(_) => {
                                trace!(word = %self.word, header = %name, "etymology number out of range");
                                None
                            }
                        },
                    };
                    self.mode = Mode::InLanguage;
                }
                None => self.open_section(name),
            }
            return self;
        }

        if let Some(caps) = DEEP_HEADER.captures(line) {
            let name = caps[1].trim();
            if self.pos_table.recognizes(name) {
                self.open_section(name);
            }
            return self;
        }

        if line.starts_with('#') {
            if let Mode::InPos { last_definition } = self.mode {
                let last_definition = self.add_list_line(line, last_definition);
                self.mode = Mode::InPos { last_definition };
            }
        }

        self
    }

    fn open_language(&mut self, header: &str) {
        let header = header.trim();
        if header.is_empty() {
            // Closes the current entry; lines up to the next language are dropped
            trace!(word = %self.word, "blank language header");
            self.mode = Mode::NoLanguage;
            self.etymology = None;
            return;
        }
        let language = self.languages.resolve(header);
        if !language.is_known() {
            trace!(word = %self.word, language = %header, "unrecognized language header");
        }
        self.entries.push(LanguageEntry {
            word: self.word.clone(),
            language_name: language.name.to_string(),
            language_code: language.code.to_string(),
            sections: Vec::new(),
        });
        self.mode = Mode::InLanguage;
        self.etymology = None;
    }

    fn open_section(&mut self, name: &str) {
        if let Some(entry) = self.entries.last_mut() {
            entry.sections.push(PosSection::new(name, self.etymology));
            self.mode = Mode::InPos {
                last_definition: None,
            };
        }
    }

    /// Attach a `#` line to the open section; returns the new definition cursor.
    fn add_list_line(&mut self, line: &str, last_definition: Option<usize>) -> Option<usize> {
        let section = match self
            .entries
            .last_mut()
            .and_then(|entry| entry.sections.last_mut())
        {
            Some(section) => section,
            None => return last_definition,
        };

        let marker = LIST_MARKER.find(line).map(|m| m.as_str()).unwrap_or("");
        let content = &line[marker.len()..];
        let is_example = line.starts_with("#:")
            || marker.ends_with(':')
            || find_template(content, EXAMPLE_TEMPLATE).is_some();

        if is_example {
            if let Some(index) = last_definition {
                let text = normalize(content);
                if !text.is_empty() {
                    section.definitions[index].examples.push(text);
                }
            }
            return last_definition;
        }

        let text = normalize(content);
        if text.is_empty() {
            return last_definition;
        }
        section
            .definitions
            .push(DefinitionDraft::new(text, extract_sense_id(content)));
        Some(section.definitions.len() - 1)
    }

    fn finish(self) -> Vec<LanguageEntry> {
        self.entries
    }
}

/// Last argument after the language code of the first `{{senseid|..}}` on the line.
fn extract_sense_id(raw: &str) -> Option<String> {
    let template = find_template(raw, SENSE_ID_TEMPLATE)?;
    template
        .payload()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Parse one page body into its language entries, in header order.
///
/// The title is NFC-normalized to become each entry's `word`.
pub fn parse(
    title: &str,
    body: &str,
    languages: &LanguageTable,
    pos_table: &PosTable,
) -> Vec<LanguageEntry> {
    let word: String = title.trim().nfc().collect();
    body.lines()
        .fold(ScanState::new(word, languages, pos_table), ScanState::step)
        .finish()
}

/// [`parse`] with the built-in language and POS tables.
pub fn parse_page(title: &str, body: &str) -> Vec<LanguageEntry> {
    parse(title, body, LanguageTable::builtin(), PosTable::builtin())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests for the structural parser
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod structural_parser_tests {
    use super::*;

    fn body(lines: &[&str]) -> String {
        lines.join("\n")
    }

    // ─────────────────────────────────────────────────────────────
    // Languages and sections
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn free_english_and_french() {
        let text = body(&[
            "==English==",
            "===Adjective===",
            "# Unconstrained.",
            "#: He was given free rein.",
            "===Verb===",
            "# To release.",
            "==French==",
            "===Adjective===",
            "# Cool.",
        ]);
        let entries = parse_page("free", &text);
        assert_eq!(entries.len(), 2);

        let english = &entries[0];
        assert_eq!(english.word, "free");
        assert_eq!(english.language_code, "en");
        assert_eq!(english.sections.len(), 2);
        assert_eq!(english.sections[0].part_of_speech, "Adjective");
        assert_eq!(english.sections[0].definitions.len(), 1);
        assert_eq!(english.sections[0].definitions[0].text, "Unconstrained.");
        assert_eq!(english.sections[0].definitions[0].examples, vec!["He was given free rein."]);
        assert_eq!(english.sections[1].part_of_speech, "Verb");
        assert_eq!(english.sections[1].definitions.len(), 1);
        assert!(english.sections[1].definitions[0].examples.is_empty());

        let french = &entries[1];
        assert_eq!(french.language_name, "French");
        assert_eq!(french.language_code, "fr");
        assert_eq!(french.sections.len(), 1);
        assert_eq!(french.sections[0].definitions[0].text, "Cool.");
    }

    #[test]
    fn one_entry_per_language_header_in_order() {
        let names = ["German", "Klingon", "Dutch", "German"];
        let text: String = names.iter().map(|n| format!("=={}==\n", n)).collect();
        let entries = parse_page("Rat", &text);
        let got: Vec<&str> = entries.iter().map(|e| e.language_name.as_str()).collect();
        assert_eq!(got, names);
        assert_eq!(entries[1].language_code, "unknown");
    }

    #[test]
    fn blank_language_header_closes_current_entry() {
        let text = body(&[
            "==English==",
            "===Noun===",
            "# Kept.",
            "== ==",
            "===Verb===",
            "# Belongs to no language.",
            "==French==",
            "===Noun===",
            "# Also kept.",
        ]);
        let entries = parse_page("w", &text);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].language_code, "en");
        assert_eq!(entries[0].sections.len(), 1);
        assert_eq!(entries[0].sections[0].part_of_speech, "Noun");
        assert_eq!(entries[1].language_code, "fr");
        assert_eq!(entries[1].definition_count(), 1);
    }

    #[test]
    fn header_spacing_and_case_are_tolerated() {
        let entries = parse_page("x", "==  english  ==\n=== Noun ===\n# A letter.");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].language_name, "English");
        assert_eq!(entries[0].language_code, "en");
        assert_eq!(entries[0].sections[0].part_of_speech, "Noun");
    }

    #[test]
    fn content_before_first_language_is_ignored() {
        let text = body(&["{{also|Free}}", "# stray", "===Noun===", "==English==", "===Noun===", "# Kept."]);
        let entries = parse_page("free", &text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sections.len(), 1);
        assert_eq!(entries[0].definition_count(), 1);
    }

    #[test]
    fn empty_sections_are_kept() {
        let text = body(&["==English==", "===Pronunciation===", "* {{IPA|en|/fɹiː/}}", "===Noun===", "# A thing."]);
        let entries = parse_page("free", &text);
        let sections = &entries[0].sections;
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].part_of_speech, "Pronunciation");
        assert!(sections[0].definitions.is_empty());
        assert_eq!(sections[1].definitions.len(), 1);
    }

    #[test]
    fn language_without_sections_yields_empty_entry() {
        let entries = parse_page("free", "==English==\nSome prose.");
        assert_eq!(entries.len(), 1);
        assert!(entries[0].sections.is_empty());
    }

    #[test]
    fn deep_headers_open_sections_only_for_parts_of_speech() {
        let text = body(&[
            "==English==",
            "===Etymology 1===",
            "====Noun====",
            "# A cat.",
            "=====Synonyms=====",
            "# Still a noun sense.",
        ]);
        let entries = parse_page("cat", &text);
        let sections = &entries[0].sections;
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].part_of_speech, "Noun");
        assert_eq!(sections[0].definitions.len(), 2);
    }

    #[test]
    fn title_is_nfc_normalized() {
        let decomposed = "cafe\u{0301}";
        let entries = parse_page(decomposed, "==French==\n===Noun===\n# Coffee.");
        assert_eq!(entries[0].word, "caf\u{00E9}");
    }

    // ─────────────────────────────────────────────────────────────
    // Etymology numbering
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn etymology_number_applies_until_next_language() {
        let text = body(&[
            "==English==",
            "===Noun===",
            "# Before any etymology.",
            "===Etymology 1===",
            "===Noun===",
            "# First.",
            "===Etymology 2===",
            "===Verb===",
            "# Second.",
            "===Adjective===",
            "# Still second.",
            "==French==",
            "===Noun===",
            "# Reset.",
        ]);
        let entries = parse_page("bank", &text);
        let numbers: Vec<Option<u32>> = entries[0].sections.iter().map(|s| s.etymology_number).collect();
        assert_eq!(numbers, vec![None, Some(1), Some(2), Some(2)]);
        assert_eq!(entries[1].sections[0].etymology_number, None);
    }

    #[test]
    fn bare_etymology_header_counts_as_one() {
        let entries = parse_page("x", "==English==\n===Etymology===\n===Noun===\n# Y.");
        assert_eq!(entries[0].sections[0].etymology_number, Some(1));
    }

    #[test]
    fn oversized_etymology_number_is_unset() {
        let text = body(&["==English==", "===Etymology 99999999999===", "===Noun===", "# Y."]);
        let entries = parse_page("x", &text);
        assert_eq!(entries[0].sections[0].etymology_number, None);
    }

    #[test]
    fn etymology_header_closes_open_section() {
        let text = body(&["==English==", "===Noun===", "# Kept.", "===Etymology 2===", "# Orphan line.", "===Verb===", "# Verb sense."]);
        let entries = parse_page("x", &text);
        let sections = &entries[0].sections;
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].definitions.len(), 1);
        assert_eq!(sections[1].definitions[0].text, "Verb sense.");
    }

    // ─────────────────────────────────────────────────────────────
    // Definitions and examples
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn example_attaches_to_latest_definition() {
        let text = body(&["==English==", "===Noun===", "# First.", "# Second.", "#: Example of second.", "#: Another."]);
        let entries = parse_page("x", &text);
        let defs = &entries[0].sections[0].definitions;
        assert_eq!(defs.len(), 2);
        assert!(defs[0].examples.is_empty());
        assert_eq!(defs[1].examples, vec!["Example of second.", "Another."]);
    }

    #[test]
    fn inline_ux_line_is_an_example() {
        let text = body(&["==English==", "===Adjective===", "# Free of charge.", "## {{ux|en|The drinks are [[free]].}}"]);
        let entries = parse_page("free", &text);
        let defs = &entries[0].sections[0].definitions;
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].examples, vec!["The drinks are free."]);
    }

    #[test]
    fn unterminated_ux_is_not_an_example() {
        let text = body(&["==English==", "===Adjective===", "# Free of charge.", "## {{ux|en|never closed", "## Another sense."]);
        let entries = parse_page("free", &text);
        let defs = &entries[0].sections[0].definitions;
        assert!(defs[0].examples.is_empty());
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[1].text, "Another sense.");
    }

    #[test]
    fn example_before_any_definition_is_dropped() {
        let text = body(&["==English==", "===Noun===", "#: Orphan example.", "# Real definition."]);
        let entries = parse_page("x", &text);
        let defs = &entries[0].sections[0].definitions;
        assert_eq!(defs.len(), 1);
        assert!(defs[0].examples.is_empty());
    }

    #[test]
    fn new_section_resets_definition_cursor() {
        let text = body(&["==English==", "===Noun===", "# Noun sense.", "===Verb===", "#: Orphan in verb."]);
        let entries = parse_page("x", &text);
        assert!(entries[0].sections[0].definitions[0].examples.is_empty());
        assert!(entries[0].sections[1].definitions.is_empty());
    }

    #[test]
    fn definition_text_is_normalized() {
        let text = "==English==\n===Adjective===\n# {{lb|en|of a person}} Not [[imprison|imprisoned]] or '''enslaved'''.";
        let entries = parse_page("free", text);
        assert_eq!(entries[0].sections[0].definitions[0].text, "Not imprisoned or enslaved.");
    }

    #[test]
    fn quotation_only_line_is_dropped() {
        let text = body(&["==English==", "===Noun===", "# Sense.", "#* {{quote-book|en|year=1900|passage=text}}", "#: Example."]);
        let entries = parse_page("x", &text);
        let defs = &entries[0].sections[0].definitions;
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].examples, vec!["Example."]);
    }

    #[test]
    fn sense_id_is_extracted_and_removed_from_text() {
        let text = "==English==\n===Adjective===\n# {{senseid|en|gratis}} Without [[cost]].";
        let entries = parse_page("free", text);
        let def = &entries[0].sections[0].definitions[0];
        assert_eq!(def.sense_id.as_deref(), Some("gratis"));
        assert_eq!(def.text, "Without cost.");
        assert!(!def.text.contains("senseid"));
    }

    #[test]
    fn missing_or_empty_sense_id_is_none() {
        assert_eq!(extract_sense_id("# plain"), None);
        assert_eq!(extract_sense_id("# {{senseid|en| }} x"), None);
        assert_eq!(extract_sense_id("# {{senseid|en}} x"), None);
        assert_eq!(extract_sense_id("# {{senseid|en| Q42 }} x").as_deref(), Some("Q42"));
    }

    #[test]
    fn crlf_bodies_parse_like_lf() {
        let text = "==English==\r\n===Noun===\r\n# A sense.\r\n#: An example.\r\n";
        let entries = parse_page("x", text);
        assert_eq!(entries[0].sections[0].definitions[0].examples, vec!["An example."]);
    }

    #[test]
    fn custom_tables_are_used() {
        let languages = LanguageTable::from_yaml_str("languages:\n  - code: tok\n    name: Toki Pona\n").unwrap();
        let pos = PosTable::from_yaml_str("pos_classes:\n  - code: N\n    name: Noun\n").unwrap();
        let entries = parse("toki", "==Toki Pona==\n===Etymology 1===\n====Noun====\n# Speech.", &languages, &pos);
        assert_eq!(entries[0].language_code, "tok");
        assert_eq!(entries[0].sections[0].etymology_number, Some(1));
        assert_eq!(entries[0].sections[0].definitions[0].text, "Speech.");
    }
}
