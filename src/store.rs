use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::book::WordBook;
use crate::custom::{CustomDictionary, CustomWord};
use crate::error::{Error, StoreError};
use crate::record::WordRecord;

pub const FORMAT_VERSION: &str = "1.0";

/// Everything kept for one learner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Library {
    pub book: WordBook,
    pub custom: CustomDictionary,
}

impl Library {
    pub fn new() -> Library {
        Library::default()
    }

    /// Drops every record and custom word.
    pub fn clear(&mut self) {
        *self = Library::default();
    }
}

/// Raw contents of a store, before uniqueness is checked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stored {
    pub learning_words: Vec<WordRecord>,
    pub custom_words: Vec<CustomWord>,
    pub last_saved: Option<DateTime<Utc>>,
}

/// Storage collaborator. The scheduling core never calls it; callers load
/// before and save after core operations.
pub trait Persistence {
    fn load_all(&self) -> Result<Stored, StoreError>;

    /// Replaces the stored contents. `now` is recorded as the save time.
    fn save_all(
        &self,
        records: &[WordRecord],
        custom: &[CustomWord],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Deletes everything held. Clearing an empty store succeeds.
    fn clear(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_saved: Option<DateTime<Utc>>,
    learning_words: Vec<WordRecord>,
    #[serde(default)]
    custom_words: Vec<CustomWord>,
}

/// Keeps every record in one JSON file.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> JsonStore {
        JsonStore { path: path.into() }
    }

    /// `words.json` inside `dir`.
    pub fn in_dir(dir: &Path) -> JsonStore {
        JsonStore::new(dir.join("words.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for JsonStore {
    fn load_all(&self) -> Result<Stored, StoreError> {
        if !self.path.exists() {
            return Ok(Stored::default());
        }
        let text = fs::read_to_string(&self.path)?;
        let doc: Document = serde_json::from_str(&text)?;
        for record in &doc.learning_words {
            record.validate().map_err(StoreError::Corrupt)?;
        }
        for word in &doc.custom_words {
            word.validate().map_err(StoreError::Corrupt)?;
        }
        info!(
            path = %self.path.display(),
            words = doc.learning_words.len(),
            custom = doc.custom_words.len(),
            "loaded word book"
        );
        Ok(Stored {
            learning_words: doc.learning_words,
            custom_words: doc.custom_words,
            last_saved: doc.last_saved,
        })
    }

    fn save_all(
        &self,
        records: &[WordRecord],
        custom: &[CustomWord],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let doc = Document {
            version: FORMAT_VERSION.to_string(),
            last_saved: Some(now),
            learning_words: records.to_vec(),
            custom_words: custom.to_vec(),
        };
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&doc)?)?;
        fs::rename(&tmp, &self.path)?;
        info!(path = %self.path.display(), words = records.len(), "saved word book");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!(path = %self.path.display(), "cleared all data");
        Ok(())
    }
}

pub fn load_library(store: &dyn Persistence) -> Result<Library, StoreError> {
    let stored = store.load_all()?;
    let corrupt = |e: Error| StoreError::Corrupt(e.to_string());
    Ok(Library {
        book: WordBook::from_records(stored.learning_words).map_err(corrupt)?,
        custom: CustomDictionary::from_words(stored.custom_words).map_err(corrupt)?,
    })
}

pub fn save_library(
    store: &dyn Persistence,
    library: &Library,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    store.save_all(library.book.records(), library.custom.words(), now)
}

/// Empties both the store and the in-memory library.
pub fn clear_all(store: &dyn Persistence, library: &mut Library) -> Result<(), StoreError> {
    store.clear()?;
    library.clear();
    Ok(())
}

/// Portable snapshot of a library. Both word lists are required when reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub learning_words: Vec<WordRecord>,
    pub custom_words: Vec<CustomWord>,
    pub export_date: DateTime<Utc>,
    #[serde(default)]
    pub app_version: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub added: usize,
    pub skipped: usize,
    pub custom_added: usize,
    pub custom_skipped: usize,
}

pub fn export_backup(library: &Library, now: DateTime<Utc>) -> Backup {
    Backup {
        learning_words: library.book.records().to_vec(),
        custom_words: library.custom.words().to_vec(),
        export_date: now,
        app_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

pub fn write_backup(path: &Path, backup: &Backup) -> Result<(), StoreError> {
    fs::write(path, serde_json::to_string_pretty(backup)?)?;
    Ok(())
}

pub fn read_backup(path: &Path) -> Result<Backup, StoreError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Merges backup records and custom words whose word is not yet in
/// `library`. Nothing is merged if any entry is invalid.
pub fn import_backup(library: &mut Library, backup: Backup) -> Result<ImportReport, StoreError> {
    for record in &backup.learning_words {
        record.validate().map_err(StoreError::Corrupt)?;
    }
    for word in &backup.custom_words {
        word.validate().map_err(StoreError::Corrupt)?;
    }

    let mut report = ImportReport::default();
    let book = &mut library.book;
    for mut record in backup.learning_words {
        if book.contains(&record.word) {
            report.skipped += 1;
            continue;
        }
        if book.get_by_id(&record.id).is_some() {
            record.id = uuid::Uuid::new_v4().to_string();
        }
        match book.insert(record) {
            Ok(_) => report.added += 1,
            Err(e) => {
                warn!("skipping backup record: {e}");
                report.skipped += 1;
            }
        }
    }

    let custom = &mut library.custom;
    for mut word in backup.custom_words {
        if custom.contains(&word.word) {
            report.custom_skipped += 1;
            continue;
        }
        if custom.get_by_id(&word.id).is_some() {
            word.id = uuid::Uuid::new_v4().to_string();
        }
        match custom.insert(word) {
            Ok(_) => report.custom_added += 1,
            Err(e) => {
                warn!("skipping backup custom word: {e}");
                report.custom_skipped += 1;
            }
        }
    }
    info!(
        added = report.added,
        skipped = report.skipped,
        custom_added = report.custom_added,
        custom_skipped = report.custom_skipped,
        "imported backup"
    );
    Ok(report)
}

/// Writes `word,translation,level` rows.
pub fn export_word_list(path: &Path, records: &[WordRecord]) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["word", "translation", "level"])?;
    for record in records {
        writer.write_record([&record.word, &record.translation, &record.level])?;
    }
    writer.flush()?;
    Ok(())
}

/// Adds every row of a `word,translation,level` file as a fresh record.
/// Blank rows and words already in the book are skipped.
pub fn import_word_list(
    book: &mut WordBook,
    path: &Path,
    now: DateTime<Utc>,
) -> Result<ImportReport, StoreError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let mut report = ImportReport::default();
    for result in reader.records() {
        let row = result?;
        let field = |i: usize| row.get(i).unwrap_or("").to_string();
        match book.add(&field(0), &field(1), &field(2), now) {
            Ok(_) => report.added += 1,
            Err(Error::DuplicateWord(word)) => {
                warn!(word = %word, "word already in book, skipping");
                report.skipped += 1;
            }
            Err(e) => {
                warn!("skipping row: {e}");
                report.skipped += 1;
            }
        }
    }
    info!(path = %path.display(), added = report.added, skipped = report.skipped, "imported word list");
    Ok(report)
}
