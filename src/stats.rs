use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::record::WordRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub learning: usize,
    pub learned: usize,
    pub due: usize,
    /// Words marked learned on the calendar day (UTC) of `now`.
    pub learned_today: usize,
    pub correct_answers: u32,
    pub total_answers: u32,
    /// Share of correct answers, absent before the first review.
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelSummary {
    pub name: String,
    pub total: usize,
    pub due: usize,
    pub learned: usize,
}

fn is_due(record: &WordRecord, now: DateTime<Utc>) -> bool {
    !record.is_learned() && record.schedule().is_due(now)
}

pub fn statistics(records: &[WordRecord], now: DateTime<Utc>) -> Statistics {
    let today = now.date_naive();
    let learned = records.iter().filter(|r| r.is_learned()).count();
    let learned_today = records
        .iter()
        .filter(|r| r.date_learned().is_some_and(|d| d.date_naive() == today))
        .count();
    let correct_answers: u32 = records.iter().map(|r| r.schedule().correct_answers()).sum();
    let total_answers: u32 = records.iter().map(|r| r.schedule().total_answers()).sum();

    Statistics {
        total: records.len(),
        learning: records.len() - learned,
        learned,
        due: records.iter().filter(|r| is_due(r, now)).count(),
        learned_today,
        correct_answers,
        total_answers,
        accuracy: (total_answers > 0).then(|| f64::from(correct_answers) / f64::from(total_answers)),
    }
}

/// Per-level counts, ordered by level name.
pub fn level_summaries(records: &[WordRecord], now: DateTime<Utc>) -> Vec<LevelSummary> {
    let mut levels: BTreeMap<String, LevelSummary> = BTreeMap::new();
    for record in records {
        let entry = levels
            .entry(record.level().to_string())
            .or_insert_with(|| LevelSummary {
                name: record.level().to_string(),
                total: 0,
                due: 0,
                learned: 0,
            });
        entry.total += 1;
        if record.is_learned() {
            entry.learned += 1;
        } else if is_due(record, now) {
            entry.due += 1;
        }
    }
    levels.into_values().collect()
}
