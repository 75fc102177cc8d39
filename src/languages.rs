//! Language-name table used to resolve `==Name==` headers to a code.
//!
//! Lookup is case-insensitive and ignores surrounding whitespace. Names the
//! table does not know keep their literal spelling and get the code
//! [`UNKNOWN_LANGUAGE_CODE`].

use crate::error::IngestError;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const UNKNOWN_LANGUAGE_CODE: &str = "unknown";

// === Languages schema YAML structures ===

#[derive(Debug, Deserialize)]
struct LanguageSchema {
    languages: Vec<LanguageDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageDef {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// A resolved language header: canonical name and code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language<'a> {
    pub name: &'a str,
    pub code: &'a str,
}

impl Language<'_> {
    pub fn is_known(&self) -> bool {
        self.code != UNKNOWN_LANGUAGE_CODE
    }
}

#[derive(Debug, Clone)]
pub struct LanguageTable {
    defs: Vec<LanguageDef>,
    by_name: HashMap<String, usize>,
}

const DEFAULT_LANGUAGES: &[(&str, &str, &[&str])] = &[
    ("en", "English", &[]),
    ("fr", "French", &[]),
    ("de", "German", &[]),
    ("es", "Spanish", &["Castilian"]),
    ("it", "Italian", &[]),
    ("pt", "Portuguese", &[]),
    ("nl", "Dutch", &[]),
    ("sv", "Swedish", &[]),
    ("da", "Danish", &[]),
    ("no", "Norwegian", &[]),
    ("nb", "Norwegian Bokmål", &[]),
    ("nn", "Norwegian Nynorsk", &[]),
    ("is", "Icelandic", &[]),
    ("fi", "Finnish", &[]),
    ("et", "Estonian", &[]),
    ("lv", "Latvian", &[]),
    ("lt", "Lithuanian", &[]),
    ("pl", "Polish", &[]),
    ("cs", "Czech", &[]),
    ("sk", "Slovak", &[]),
    ("sl", "Slovene", &["Slovenian"]),
    ("sh", "Serbo-Croatian", &[]),
    ("bg", "Bulgarian", &[]),
    ("ru", "Russian", &[]),
    ("uk", "Ukrainian", &[]),
    ("ro", "Romanian", &[]),
    ("hu", "Hungarian", &[]),
    ("el", "Greek", &["Modern Greek"]),
    ("grc", "Ancient Greek", &[]),
    ("la", "Latin", &[]),
    ("ca", "Catalan", &[]),
    ("gl", "Galician", &[]),
    ("eu", "Basque", &[]),
    ("ga", "Irish", &[]),
    ("cy", "Welsh", &[]),
    ("tr", "Turkish", &[]),
    ("fa", "Persian", &["Farsi"]),
    ("ar", "Arabic", &[]),
    ("he", "Hebrew", &[]),
    ("hi", "Hindi", &[]),
    ("zh", "Chinese", &[]),
    ("cmn", "Mandarin", &[]),
    ("yue", "Cantonese", &[]),
    ("ja", "Japanese", &[]),
    ("ko", "Korean", &[]),
    ("th", "Thai", &[]),
    ("vi", "Vietnamese", &[]),
    ("id", "Indonesian", &[]),
    ("ms", "Malay", &[]),
    ("tl", "Tagalog", &[]),
    ("sw", "Swahili", &[]),
    ("eo", "Esperanto", &[]),
    ("ang", "Old English", &[]),
    ("enm", "Middle English", &[]),
    ("mul", "Translingual", &[]),
];

static BUILTIN: Lazy<LanguageTable> = Lazy::new(|| {
    LanguageTable::from_defs(
        DEFAULT_LANGUAGES
            .iter()
            .map(|(code, name, aliases)| LanguageDef {
                code: code.to_string(),
                name: name.to_string(),
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
            })
            .collect(),
    )
});

fn lookup_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl LanguageTable {
    /// The table compiled into the binary.
    pub fn builtin() -> &'static LanguageTable {
        &BUILTIN
    }

    pub fn from_defs(defs: Vec<LanguageDef>) -> Self {
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for (index, def) in defs.iter().enumerate() {
            for name in std::iter::once(&def.name).chain(def.aliases.iter()) {
                let key = lookup_key(name);
                if let Some(&existing) = by_name.get(&key) {
                    warn!(name = %name, kept = %defs[existing].code, dropped = %def.code, "duplicate language name");
                    continue;
                }
                by_name.insert(key, index);
            }
        }
        Self { defs, by_name }
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, IngestError> {
        let schema: LanguageSchema = serde_yaml::from_str(contents)?;
        if let Some(bad) = schema
            .languages
            .iter()
            .find(|d| d.code.trim().is_empty() || d.name.trim().is_empty())
        {
            return Err(IngestError::Config(format!(
                "language entry needs both code and name (got code={:?}, name={:?})",
                bad.code, bad.name
            )));
        }
        Ok(Self::from_defs(schema.languages))
    }

    pub fn from_yaml_path(path: &Path) -> Result<Self, IngestError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!("failed to read languages file {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Resolve a level-2 header name.
    pub fn resolve<'a>(&'a self, header: &'a str) -> Language<'a> {
        let name = header.trim();
        match self.by_name.get(&lookup_key(name)) {
            Some(&index) => {
                let def = &self.defs[index];
                Language {
                    name: &def.name,
                    code: &def.code,
                }
            }
            None => Language {
                name,
                code: UNKNOWN_LANGUAGE_CODE,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl Default for LanguageTable {
    fn default() -> Self {
        LanguageTable::builtin().clone()
    }
}
