use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{CatalogEntry, CatalogProvider};
use crate::error::{CatalogError, Error, Result};

/// A word the learner defined themselves. It carries no schedule; studying it
/// copies it into the word book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomWord {
    pub(crate) id: String,
    pub(crate) word: String,
    pub(crate) translation: String,
    #[serde(default)]
    pub(crate) level: String,
    pub(crate) date_added: DateTime<Utc>,
}

impl CustomWord {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn translation(&self) -> &str {
        &self.translation
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn date_added(&self) -> DateTime<Utc> {
        self.date_added
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.word.trim().is_empty() || self.translation.trim().is_empty() {
            return Err(format!("custom word {} has an empty field", self.id));
        }
        Ok(())
    }
}

/// The learner's own dictionary, unique by word.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomDictionary {
    words: Vec<CustomWord>,
}

impl CustomDictionary {
    pub fn new() -> CustomDictionary {
        CustomDictionary::default()
    }

    pub fn from_words(words: Vec<CustomWord>) -> Result<CustomDictionary> {
        let mut dict = CustomDictionary::new();
        for word in words {
            dict.insert(word)?;
        }
        Ok(dict)
    }

    /// Defines a new word. Word and translation are trimmed and must be
    /// non-empty.
    pub fn add(
        &mut self,
        word: &str,
        translation: &str,
        level: &str,
        now: DateTime<Utc>,
    ) -> Result<&CustomWord> {
        let word = word.trim();
        let translation = translation.trim();
        if word.is_empty() {
            return Err(Error::EmptyField("word"));
        }
        if translation.is_empty() {
            return Err(Error::EmptyField("translation"));
        }
        self.insert(CustomWord {
            id: uuid::Uuid::new_v4().to_string(),
            word: word.to_string(),
            translation: translation.to_string(),
            level: level.trim().to_string(),
            date_added: now,
        })
    }

    pub fn insert(&mut self, word: CustomWord) -> Result<&CustomWord> {
        if self.contains(&word.word) {
            return Err(Error::DuplicateWord(word.word));
        }
        self.words.push(word);
        Ok(&self.words[self.words.len() - 1])
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w.word == word)
    }

    pub fn get(&self, word: &str) -> Option<&CustomWord> {
        self.words.iter().find(|w| w.word == word)
    }

    pub fn get_by_id(&self, id: &str) -> Option<&CustomWord> {
        self.words.iter().find(|w| w.id == id)
    }

    /// Removes the word with the given id.
    pub fn remove(&mut self, id: &str) -> Result<CustomWord> {
        let pos = self
            .words
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| Error::WordNotFound(id.to_string()))?;
        let removed = self.words.remove(pos);
        info!(word = %removed.word, "removed custom word");
        Ok(removed)
    }

    pub fn words(&self) -> &[CustomWord] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Levels are whatever the learner tagged their words with.
impl CatalogProvider for CustomDictionary {
    fn levels(&self) -> Vec<String> {
        let levels: BTreeSet<&str> = self.words.iter().map(|w| w.level.as_str()).collect();
        levels.into_iter().map(str::to_string).collect()
    }

    fn words_for_level(&self, level: &str) -> std::result::Result<Vec<CatalogEntry>, CatalogError> {
        let entries: Vec<CatalogEntry> = self
            .words
            .iter()
            .filter(|w| w.level == level)
            .map(|w| CatalogEntry {
                word: w.word.clone(),
                translation: w.translation.clone(),
                category: "custom".to_string(),
                pos: String::new(),
            })
            .collect();
        if entries.is_empty() {
            return Err(CatalogError::UnknownLevel(level.to_string()));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn add_trims_and_rejects_repeats() {
        let mut dict = CustomDictionary::new();
        let word = dict.add(" serendipity ", "счастливая случайность", "C1", now()).unwrap();
        assert_eq!(word.word(), "serendipity");
        assert_eq!(word.date_added(), now());

        assert_eq!(
            dict.add("serendipity", "другое", "C2", now()).unwrap_err(),
            Error::DuplicateWord("serendipity".into())
        );
        assert_eq!(dict.add("", "x", "A1", now()).unwrap_err(), Error::EmptyField("word"));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn remove_by_id() {
        let mut dict = CustomDictionary::new();
        let id = dict.add("quay", "пристань", "B2", now()).unwrap().id().to_string();
        dict.add("moor", "пришвартовать", "B2", now()).unwrap();

        assert_eq!(dict.remove(&id).unwrap().word(), "quay");
        assert!(!dict.contains("quay"));
        assert_eq!(dict.remove(&id), Err(Error::WordNotFound(id)));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn serves_as_a_catalog() {
        let mut dict = CustomDictionary::new();
        dict.add("quay", "пристань", "B2", now()).unwrap();
        dict.add("moor", "пришвартовать", "B2", now()).unwrap();
        dict.add("gig", "концерт", "A2", now()).unwrap();

        assert_eq!(dict.levels(), vec!["A2", "B2"]);
        assert_eq!(dict.words_for_level("B2").unwrap().len(), 2);
        let gig = dict.lookup("A2", "gig").unwrap().unwrap();
        assert_eq!(gig.translation, "концерт");
        assert!(matches!(
            dict.words_for_level("C2"),
            Err(CatalogError::UnknownLevel(_))
        ));
    }

    #[test]
    fn reads_browser_custom_word() {
        let json = r#"{
            "id": "1717232400000",
            "word": "quay",
            "translation": "пристань",
            "level": "B2",
            "dateAdded": "2025-06-01T09:00:00.000Z"
        }"#;
        let word: CustomWord = serde_json::from_str(json).unwrap();
        assert_eq!(word.level(), "B2");
        assert!(word.validate().is_ok());
    }
}
