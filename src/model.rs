use serde::{Deserialize, Serialize};

/// One `<page>` element pulled out of the dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub title: String,
    pub namespace_id: i32,
    pub body: String,
}

/// Everything one page says about a word in one language (one `==Language==` block).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageEntry {
    pub word: String,
    pub language_name: String,
    pub language_code: String,
    pub sections: Vec<PosSection>,
}

/// A part-of-speech block and its definitions, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosSection {
    pub part_of_speech: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etymology_number: Option<u32>,
    pub definitions: Vec<DefinitionDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionDraft {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sense_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

/// The unit handed to a sink: one qualifying page and what it parsed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    pub title: String,
    pub entries: Vec<LanguageEntry>,
}

impl LanguageEntry {
    pub fn definition_count(&self) -> usize {
        self.sections.iter().map(|s| s.definitions.len()).sum()
    }

    pub fn example_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| s.definitions.iter())
            .map(|d| d.examples.len())
            .sum()
    }
}

impl PosSection {
    pub fn new(part_of_speech: impl Into<String>, etymology_number: Option<u32>) -> Self {
        Self {
            part_of_speech: part_of_speech.into(),
            etymology_number,
            definitions: Vec::new(),
        }
    }
}

impl DefinitionDraft {
    pub fn new(text: impl Into<String>, sense_id: Option<String>) -> Self {
        Self {
            text: text.into(),
            sense_id,
            examples: Vec::new(),
        }
    }
}
