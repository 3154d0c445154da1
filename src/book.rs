use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{Error, Result};
use crate::record::WordRecord;
use crate::scheduler::{self, Grade};

/// The learner's active word collection. Words are unique within a book.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordBook {
    records: Vec<WordRecord>,
}

impl WordBook {
    pub fn new() -> WordBook {
        WordBook::default()
    }

    /// Builds a book from loaded records, rejecting repeated words.
    pub fn from_records(records: Vec<WordRecord>) -> Result<WordBook> {
        let mut book = WordBook::new();
        for record in records {
            book.insert(record)?;
        }
        Ok(book)
    }

    /// Creates a record for `word` and adds it to the book.
    pub fn add(
        &mut self,
        word: &str,
        translation: &str,
        level: &str,
        now: DateTime<Utc>,
    ) -> Result<&WordRecord> {
        let record = WordRecord::new(word, translation, level, now)?;
        self.insert(record)
    }

    /// Adds an existing record as is.
    pub fn insert(&mut self, record: WordRecord) -> Result<&WordRecord> {
        if self.contains(&record.word) {
            return Err(Error::DuplicateWord(record.word));
        }
        self.records.push(record);
        Ok(&self.records[self.records.len() - 1])
    }

    pub fn contains(&self, word: &str) -> bool {
        self.records.iter().any(|r| r.word == word)
    }

    pub fn get(&self, word: &str) -> Option<&WordRecord> {
        self.records.iter().find(|r| r.word == word)
    }

    pub fn get_by_id(&self, id: &str) -> Option<&WordRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn remove(&mut self, word: &str) -> Result<WordRecord> {
        let pos = self
            .records
            .iter()
            .position(|r| r.word == word)
            .ok_or_else(|| Error::WordNotFound(word.to_string()))?;
        info!(word, "removed word");
        Ok(self.records.remove(pos))
    }

    pub fn mark_learned(&mut self, word: &str, now: DateTime<Utc>) -> Result<&WordRecord> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.word == word)
            .ok_or_else(|| Error::WordNotFound(word.to_string()))?;
        record.mark_learned(now);
        Ok(&*record)
    }

    /// Grades the record with the given id. Unknown ids are a protocol error.
    pub fn advance(&mut self, id: &str, grade: Grade, now: DateTime<Utc>) -> Result<&WordRecord> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::InvalidState(format!("no record with id {id}")))?;
        scheduler::advance(record, grade, now)?;
        Ok(&*record)
    }

    pub fn due(&self, now: DateTime<Utc>) -> Vec<&WordRecord> {
        scheduler::due_words(&self.records, now)
    }

    pub fn records(&self) -> &[WordRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
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
    fn duplicate_word_is_rejected() {
        let mut book = WordBook::new();
        book.add("apple", "яблоко", "A1", now()).unwrap();
        let before = book.get("apple").cloned();

        let later = now() + chrono::Duration::days(1);
        let err = book.add("apple", "другое", "B2", later).unwrap_err();
        assert_eq!(err, Error::DuplicateWord("apple".into()));
        assert_eq!(book.len(), 1);
        assert_eq!(book.get("apple").cloned(), before);
    }

    #[test]
    fn duplicate_check_uses_trimmed_word() {
        let mut book = WordBook::new();
        book.add("apple", "яблоко", "A1", now()).unwrap();
        assert!(book.add(" apple ", "x", "A1", now()).is_err());
    }

    #[test]
    fn from_records_rejects_repeats() {
        let a = WordRecord::new("apple", "x", "A1", now()).unwrap();
        let b = WordRecord::new("apple", "y", "A1", now()).unwrap();
        assert!(WordBook::from_records(vec![a, b]).is_err());
    }

    #[test]
    fn remove_and_mark_learned() {
        let mut book = WordBook::new();
        book.add("apple", "яблоко", "A1", now()).unwrap();
        book.add("pear", "груша", "A1", now()).unwrap();

        book.mark_learned("pear", now()).unwrap();
        assert_eq!(book.due(now()).len(), 1);

        let removed = book.remove("apple").unwrap();
        assert_eq!(removed.word(), "apple");
        assert!(book.due(now()).is_empty());
        assert_eq!(book.remove("apple"), Err(Error::WordNotFound("apple".into())));
        assert!(book.mark_learned("plum", now()).is_err());
    }

    #[test]
    fn advance_unknown_id_is_invalid_state() {
        let mut book = WordBook::new();
        let grade = Grade::new(4).unwrap();
        assert!(matches!(
            book.advance("nope", grade, now()),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn advance_moves_word_out_of_due_set() {
        let mut book = WordBook::new();
        let id = book.add("apple", "яблоко", "A1", now()).unwrap().id().to_string();
        book.advance(&id, Grade::new(5).unwrap(), now()).unwrap();
        assert!(book.due(now()).is_empty());
        assert_eq!(book.due(now() + chrono::Duration::days(1)).len(), 1);
    }
}
