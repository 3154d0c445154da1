use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CatalogError;

const BUILTIN_WORDS: &str = include_str!("data/oxford_words.json");

/// A candidate word offered for study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub word: String,
    pub translation: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub pos: String,
}

/// Read-only source of candidate words grouped by proficiency level.
pub trait CatalogProvider {
    /// Known levels, in display order.
    fn levels(&self) -> Vec<String>;

    /// Words for `level`. A known level with no words yields an empty list;
    /// an unknown one is an error.
    fn words_for_level(&self, level: &str) -> Result<Vec<CatalogEntry>, CatalogError>;

    fn lookup(&self, level: &str, word: &str) -> Result<Option<CatalogEntry>, CatalogError> {
        Ok(self
            .words_for_level(level)?
            .into_iter()
            .find(|e| e.word == word))
    }
}

/// Catalog held in memory, keyed by level.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    levels: BTreeMap<String, Vec<CatalogEntry>>,
}

impl StaticCatalog {
    /// The bundled Oxford word list, levels A1 to C2.
    pub fn builtin() -> Result<StaticCatalog, CatalogError> {
        StaticCatalog::from_json(BUILTIN_WORDS)
    }

    /// Parses `{"A1": [{"word": .., "translation": ..}, ..], ..}`.
    pub fn from_json(json: &str) -> Result<StaticCatalog, CatalogError> {
        let levels: BTreeMap<String, Vec<CatalogEntry>> = serde_json::from_str(json)?;
        Ok(StaticCatalog { levels })
    }

    /// Reads `level,word,translation,category,pos` rows. Rows without a level
    /// or word are skipped.
    pub fn load_csv(path: &Path) -> Result<StaticCatalog, CatalogError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

        let mut levels: BTreeMap<String, Vec<CatalogEntry>> = BTreeMap::new();
        for result in reader.records() {
            let record = result?;
            let level = get_field(&record, 0);
            let word = get_field(&record, 1);
            if level.is_empty() || word.is_empty() {
                continue;
            }
            levels.entry(level).or_default().push(CatalogEntry {
                word,
                translation: get_field(&record, 2),
                category: get_field(&record, 3),
                pos: get_field(&record, 4),
            });
        }
        debug!(path = %path.display(), levels = levels.len(), "loaded CSV catalog");
        Ok(StaticCatalog { levels })
    }
}

/// Looks `word` up in each provider in turn. A level no provider knows is
/// `UnknownLevel`.
pub fn lookup_any(
    providers: &[&dyn CatalogProvider],
    level: &str,
    word: &str,
) -> Result<Option<CatalogEntry>, CatalogError> {
    let mut known = false;
    for provider in providers {
        match provider.lookup(level, word) {
            Ok(Some(entry)) => return Ok(Some(entry)),
            Ok(None) => known = true,
            Err(CatalogError::UnknownLevel(_)) => {}
            Err(e) => return Err(e),
        }
    }
    if known {
        Ok(None)
    } else {
        Err(CatalogError::UnknownLevel(level.to_string()))
    }
}

fn get_field(record: &csv::StringRecord, index: usize) -> String {
    record.get(index).unwrap_or("").trim().to_string()
}

impl CatalogProvider for StaticCatalog {
    fn levels(&self) -> Vec<String> {
        self.levels.keys().cloned().collect()
    }

    fn words_for_level(&self, level: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.levels
            .get(level)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownLevel(level.to_string()))
    }
}
