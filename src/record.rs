use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const INITIAL_EASE: f64 = 2.5;
pub const MINIMUM_EASE: f64 = 1.3;
/// Longest gap between reviews, in days. Passing reviews stop growing the
/// interval here.
pub const MAXIMUM_INTERVAL: u32 = 36_500;

/// Queue priority layered on top of SM-2. Raised by failed reviews, cleared
/// by a successful one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// One step harder, saturating at `Hard`.
    pub fn escalate(self) -> Difficulty {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium | Difficulty::Hard => Difficulty::Hard,
        }
    }
}

impl From<Difficulty> for u8 {
    fn from(d: Difficulty) -> u8 {
        match d {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = String;

    fn try_from(n: u8) -> std::result::Result<Self, Self::Error> {
        match n {
            0 => Ok(Difficulty::Easy),
            1 => Ok(Difficulty::Medium),
            2 => Ok(Difficulty::Hard),
            _ => Err(format!("difficulty must be 0, 1 or 2, got {n}")),
        }
    }
}

/// Spaced-repetition state embedded in every record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub(crate) ease_factor: f64,
    pub(crate) interval: u32,
    pub(crate) repetitions: u32,
    pub(crate) next_review: DateTime<Utc>,
    pub(crate) last_review: Option<DateTime<Utc>>,
    pub(crate) correct_answers: u32,
    pub(crate) total_answers: u32,
    pub(crate) difficulty: Difficulty,
}

impl Schedule {
    /// Fresh schedule, due immediately.
    pub fn new(now: DateTime<Utc>) -> Schedule {
        Schedule {
            ease_factor: INITIAL_EASE,
            interval: 1,
            repetitions: 0,
            next_review: now,
            last_review: None,
            correct_answers: 0,
            total_answers: 0,
            difficulty: Difficulty::Easy,
        }
    }

    pub fn ease_factor(&self) -> f64 {
        self.ease_factor
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    pub fn next_review(&self) -> DateTime<Utc> {
        self.next_review
    }

    pub fn last_review(&self) -> Option<DateTime<Utc>> {
        self.last_review
    }

    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    pub fn total_answers(&self) -> u32 {
        self.total_answers
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_review
    }
}

/// One word the learner is studying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordRecord {
    pub(crate) id: String,
    pub(crate) word: String,
    pub(crate) translation: String,
    pub(crate) level: String,
    pub(crate) date_added: DateTime<Utc>,
    pub(crate) is_learned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) date_learned: Option<DateTime<Utc>>,
    #[serde(rename = "repetitionData")]
    pub(crate) schedule: Schedule,
}

impl WordRecord {
    /// Builds a record that is not yet part of any book. Word and translation
    /// are trimmed and must be non-empty.
    pub fn new(word: &str, translation: &str, level: &str, now: DateTime<Utc>) -> Result<WordRecord> {
        let word = word.trim();
        let translation = translation.trim();
        if word.is_empty() {
            return Err(Error::EmptyField("word"));
        }
        if translation.is_empty() {
            return Err(Error::EmptyField("translation"));
        }
        Ok(WordRecord {
            id: uuid::Uuid::new_v4().to_string(),
            word: word.to_string(),
            translation: translation.to_string(),
            level: level.trim().to_string(),
            date_added: now,
            is_learned: false,
            date_learned: None,
            schedule: Schedule::new(now),
        })
    }

    /// Retires the word from scheduling. Calling it again keeps the first
    /// `date_learned`.
    pub fn mark_learned(&mut self, now: DateTime<Utc>) {
        if self.is_learned {
            return;
        }
        self.is_learned = true;
        self.date_learned = Some(now);
    }

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

    pub fn is_learned(&self) -> bool {
        self.is_learned
    }

    pub fn date_learned(&self) -> Option<DateTime<Utc>> {
        self.date_learned
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Checks the invariants a deserialized record must satisfy.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.word.trim().is_empty() {
            return Err(format!("record {} has an empty word", self.id));
        }
        if !self.schedule.ease_factor.is_finite() || self.schedule.ease_factor < MINIMUM_EASE {
            return Err(format!(
                "{}: ease factor {} below {MINIMUM_EASE}",
                self.word, self.schedule.ease_factor
            ));
        }
        if !(1..=MAXIMUM_INTERVAL).contains(&self.schedule.interval) {
            return Err(format!(
                "{}: interval {} outside 1..={MAXIMUM_INTERVAL} days",
                self.word, self.schedule.interval
            ));
        }
        if let Some(last) = self.schedule.last_review
            && last >= self.schedule.next_review
        {
            return Err(format!("{}: next review not after the last review", self.word));
        }
        if self.schedule.correct_answers > self.schedule.total_answers {
            return Err(format!("{}: more correct answers than answers", self.word));
        }
        if self.is_learned && self.date_learned.is_none() {
            return Err(format!("{}: learned without a learned date", self.word));
        }
        Ok(())
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
    fn new_record_defaults() {
        let r = WordRecord::new("  apple ", "яблоко", "A1", now()).unwrap();
        assert_eq!(r.word(), "apple");
        assert!(!r.id().is_empty());
        assert!(!r.is_learned());
        assert_eq!(r.date_learned(), None);
        let s = r.schedule();
        assert_eq!(s.ease_factor(), 2.5);
        assert_eq!(s.interval(), 1);
        assert_eq!(s.repetitions(), 0);
        assert_eq!(s.next_review(), now());
        assert_eq!(s.last_review(), None);
        assert_eq!(s.difficulty(), Difficulty::Easy);
        assert!(s.is_due(now()));
    }

    #[test]
    fn new_record_rejects_blank_fields() {
        assert_eq!(
            WordRecord::new("  ", "x", "A1", now()),
            Err(Error::EmptyField("word"))
        );
        assert_eq!(
            WordRecord::new("apple", "", "A1", now()),
            Err(Error::EmptyField("translation"))
        );
    }

    #[test]
    fn mark_learned_is_idempotent() {
        let mut r = WordRecord::new("apple", "яблоко", "A1", now()).unwrap();
        r.mark_learned(now());
        let later = now() + chrono::Duration::days(3);
        r.mark_learned(later);
        assert!(r.is_learned());
        assert_eq!(r.date_learned(), Some(now()));
    }

    #[test]
    fn difficulty_escalates_and_saturates() {
        assert_eq!(Difficulty::Easy.escalate(), Difficulty::Medium);
        assert_eq!(Difficulty::Medium.escalate(), Difficulty::Hard);
        assert_eq!(Difficulty::Hard.escalate(), Difficulty::Hard);
        assert!(Difficulty::Hard > Difficulty::Easy);
    }

    #[test]
    fn json_round_trip() {
        let mut r = WordRecord::new("apple", "яблоко", "A1", now()).unwrap();
        r.schedule.difficulty = Difficulty::Medium;
        r.schedule.last_review = Some(now());
        r.mark_learned(now());
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"repetitionData\""));
        assert!(json.contains("\"difficulty\":1"));
        let back: WordRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn reads_browser_export_shape() {
        let json = r#"{
            "id": "1717232400000",
            "word": "above",
            "translation": "над, выше",
            "level": "A1",
            "dateAdded": "2025-06-01T09:00:00.000Z",
            "isLearned": false,
            "repetitionData": {
                "easeFactor": 2.36,
                "interval": 6,
                "repetitions": 2,
                "nextReview": "2025-06-07T09:00:00.000Z",
                "lastReview": null,
                "correctAnswers": 2,
                "totalAnswers": 3,
                "difficulty": 0
            }
        }"#;
        let r: WordRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.word(), "above");
        assert_eq!(r.schedule().interval(), 6);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_difficulty() {
        let bad: std::result::Result<Difficulty, _> = serde_json::from_str("3");
        assert!(bad.is_err());
    }

    #[test]
    fn validate_catches_low_ease() {
        let mut r = WordRecord::new("apple", "яблоко", "A1", now()).unwrap();
        r.schedule.ease_factor = 1.0;
        assert!(r.validate().is_err());
    }

    #[test]
    fn validate_catches_out_of_range_schedule() {
        let fresh = WordRecord::new("apple", "яблоко", "A1", now()).unwrap();

        let mut r = fresh.clone();
        r.schedule.interval = MAXIMUM_INTERVAL + 1;
        assert!(r.validate().is_err());
        r.schedule.interval = MAXIMUM_INTERVAL;
        assert!(r.validate().is_ok());

        let mut r = fresh.clone();
        r.schedule.last_review = Some(now() + chrono::Duration::days(1));
        assert!(r.validate().is_err());

        let mut r = fresh;
        r.schedule.correct_answers = 2;
        r.schedule.total_answers = 1;
        assert!(r.validate().is_err());
    }
}
