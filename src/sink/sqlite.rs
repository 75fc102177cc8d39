use super::{BatchReport, EntrySink};
use crate::error::IngestError;
use crate::model::{LanguageEntry, ParsedPage};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, warn};

const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS languages (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    UNIQUE (code, name)
);
CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY,
    word TEXT NOT NULL,
    language_id INTEGER NOT NULL REFERENCES languages(id),
    UNIQUE (word, language_id)
);
CREATE TABLE IF NOT EXISTS parts_of_speech (
    id INTEGER PRIMARY KEY,
    name TEXT UNIQUE NOT NULL
);
CREATE TABLE IF NOT EXISTS definitions (
    id INTEGER PRIMARY KEY,
    entry_id INTEGER NOT NULL REFERENCES entries(id),
    pos_id INTEGER NOT NULL REFERENCES parts_of_speech(id),
    definition TEXT NOT NULL,
    sense_id TEXT,
    etymology_number INTEGER
);
CREATE TABLE IF NOT EXISTS examples (
    id INTEGER PRIMARY KEY,
    definition_id INTEGER NOT NULL REFERENCES definitions(id),
    example TEXT NOT NULL
);
";

/// Writes entries into the lexicon tables, one transaction per batch.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        let conn = Connection::open(path).map_err(|e| {
            IngestError::Persistence(format!("failed to open {}: {}", path.display(), e))
        })?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, IngestError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, IngestError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let _mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// "proper noun" → "Proper noun"
pub fn pos_display_name(name: &str) -> String {
    let mut chars = name.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn get_or_create_language(conn: &Connection, code: &str, name: &str) -> rusqlite::Result<i64> {
    conn.prepare_cached("INSERT OR IGNORE INTO languages (code, name) VALUES (?1, ?2)")?
        .execute(params![code, name])?;
    conn.prepare_cached("SELECT id FROM languages WHERE code = ?1 AND name = ?2")?
        .query_row(params![code, name], |row| row.get(0))
}

fn get_or_create_entry(conn: &Connection, word: &str, language_id: i64) -> rusqlite::Result<i64> {
    conn.prepare_cached("INSERT OR IGNORE INTO entries (word, language_id) VALUES (?1, ?2)")?
        .execute(params![word, language_id])?;
    conn.prepare_cached("SELECT id FROM entries WHERE word = ?1 AND language_id = ?2")?
        .query_row(params![word, language_id], |row| row.get(0))
}

fn get_or_create_pos(conn: &Connection, part_of_speech: &str) -> rusqlite::Result<i64> {
    let name = pos_display_name(part_of_speech);
    let existing: Option<i64> = conn
        .prepare_cached("SELECT id FROM parts_of_speech WHERE name = ?1")?
        .query_row(params![name], |row| row.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.prepare_cached("INSERT INTO parts_of_speech (name) VALUES (?1)")?
        .execute(params![name])?;
    Ok(conn.last_insert_rowid())
}

fn write_entry(conn: &Connection, entry: &LanguageEntry) -> rusqlite::Result<()> {
    let language_id = get_or_create_language(conn, &entry.language_code, &entry.language_name)?;
    let entry_id = get_or_create_entry(conn, &entry.word, language_id)?;

    for section in &entry.sections {
        if section.definitions.is_empty() {
            continue;
        }
        let pos_id = get_or_create_pos(conn, &section.part_of_speech)?;
        for definition in &section.definitions {
            conn.prepare_cached(
                "INSERT INTO definitions (entry_id, pos_id, definition, sense_id, etymology_number)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .execute(params![
                entry_id,
                pos_id,
                definition.text,
                definition.sense_id,
                section.etymology_number
            ])?;
            let definition_id = conn.last_insert_rowid();

            for example in &definition.examples {
                conn.prepare_cached("INSERT INTO examples (definition_id, example) VALUES (?1, ?2)")?
                    .execute(params![definition_id, example])?;
            }
        }
    }
    Ok(())
}

impl EntrySink for SqliteSink {
    fn write_batch(&mut self, batch: &[ParsedPage]) -> Result<BatchReport, IngestError> {
        let mut report = BatchReport::default();
        let mut tx = self.conn.transaction()?;

        for page in batch {
            let savepoint = tx.savepoint()?;
            let written = page
                .entries
                .iter()
                .try_for_each(|entry| write_entry(&savepoint, entry));
            match written {
                Ok(()) => {
                    savepoint.commit()?;
                    report.pages_written += 1;
                }
                Err(e) => {
                    // Dropping the savepoint rolls this page back; the rest of the batch stays
                    drop(savepoint);
                    warn!(title = %page.title, error = %e, "page rolled back");
                    report.record_failure(&page.title, e);
                }
            }
        }

        tx.commit()?;
        debug!(pages = report.pages_written, failed = report.failures.len(), "batch committed");
        Ok(report)
    }
}
