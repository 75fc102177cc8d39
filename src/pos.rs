use crate::error::IngestError;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

// === POS Schema YAML structures ===

#[derive(Debug, Deserialize)]
struct PosSchema {
    pos_classes: Vec<PosClass>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PosClass {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub variants: Vec<String>,
}

/// Part-of-speech heading names, keyed by normalized header text.
///
/// Level-3 headers open a section whatever they say; deeper headers only
/// open one when this table recognizes them.
#[derive(Debug, Clone)]
pub struct PosTable {
    classes: Vec<PosClass>,
    by_variant: HashMap<String, usize>,
}

const DEFAULT_POS: &[(&str, &str, &[&str])] = &[
    ("noun", "Noun", &["nouns"]),
    ("prop", "Proper noun", &["proper nouns"]),
    ("verb", "Verb", &["verbs"]),
    ("adj", "Adjective", &["adjectives"]),
    ("adv", "Adverb", &["adverbs"]),
    ("pron", "Pronoun", &["pronouns"]),
    ("prep", "Preposition", &[]),
    ("post", "Postposition", &[]),
    ("conj", "Conjunction", &[]),
    ("intj", "Interjection", &[]),
    ("det", "Determiner", &[]),
    ("art", "Article", &[]),
    ("num", "Numeral", &["number", "cardinal number", "ordinal number"]),
    ("part", "Particle", &[]),
    ("ptcp", "Participle", &[]),
    ("class", "Classifier", &["counter"]),
    ("phr", "Phrase", &["prepositional phrase", "idiom"]),
    ("prov", "Proverb", &[]),
    ("affix", "Affix", &["prefix", "suffix", "infix", "interfix", "circumfix"]),
    ("abbr", "Abbreviation", &["initialism", "acronym", "contraction"]),
    ("sym", "Symbol", &["letter", "punctuation mark"]),
    ("root", "Root", &[]),
];

static BUILTIN: Lazy<PosTable> = Lazy::new(|| {
    PosTable::from_classes(
        DEFAULT_POS
            .iter()
            .map(|(code, name, variants)| PosClass {
                code: code.to_string(),
                name: name.to_string(),
                variants: variants.iter().map(|v| v.to_string()).collect(),
            })
            .collect(),
    )
});

/// Lowercase, trim and collapse internal whitespace.
fn header_key(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl PosTable {
    pub fn builtin() -> &'static PosTable {
        &BUILTIN
    }

    pub fn from_classes(classes: Vec<PosClass>) -> Self {
        let mut by_variant = HashMap::new();
        for (index, class) in classes.iter().enumerate() {
            for variant in std::iter::once(&class.name).chain(class.variants.iter()) {
                by_variant.entry(header_key(variant)).or_insert(index);
            }
        }
        Self { classes, by_variant }
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, IngestError> {
        let schema: PosSchema = serde_yaml::from_str(contents)?;
        Ok(Self::from_classes(schema.pos_classes))
    }

    pub fn from_yaml_path(path: &Path) -> Result<Self, IngestError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!("failed to read POS schema file {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn lookup(&self, header: &str) -> Option<&PosClass> {
        self.by_variant
            .get(&header_key(header))
            .map(|&index| &self.classes[index])
    }

    pub fn recognizes(&self, header: &str) -> bool {
        self.lookup(header).is_some()
    }
}

impl Default for PosTable {
    fn default() -> Self {
        PosTable::builtin().clone()
    }
}
