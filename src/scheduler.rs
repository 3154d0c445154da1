// SM-2 scheduling with a difficulty overlay that only reorders the due queue.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::{Error, Result};
use crate::record::{Difficulty, MAXIMUM_INTERVAL, MINIMUM_EASE, WordRecord};

/// Self-reported recall quality, 0 (blackout) to 5 (perfect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Grade(u8);

impl Grade {
    pub const PASS: u8 = 3;

    pub fn new(n: u8) -> Result<Grade> {
        if n <= 5 {
            Ok(Grade(n))
        } else {
            Err(Error::InvalidGrade(n))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_pass(self) -> bool {
        self.0 >= Self::PASS
    }
}

impl TryFrom<u8> for Grade {
    type Error = Error;

    fn try_from(n: u8) -> Result<Grade> {
        Grade::new(n)
    }
}

/// Records due at `now`, hardest first, then most overdue first.
pub fn due_words(records: &[WordRecord], now: DateTime<Utc>) -> Vec<&WordRecord> {
    let mut due: Vec<&WordRecord> = records
        .iter()
        .filter(|r| !r.is_learned && r.schedule.is_due(now))
        .collect();
    due.sort_by(|a, b| {
        b.schedule
            .difficulty
            .cmp(&a.schedule.difficulty)
            .then(a.schedule.next_review.cmp(&b.schedule.next_review))
    });
    due
}

/// `interval * ease`, rounded and held within `1..=MAXIMUM_INTERVAL`.
fn grown_interval(interval: u32, ease: f64) -> u32 {
    let days = (f64::from(interval) * ease).round();
    if days >= f64::from(MAXIMUM_INTERVAL) {
        MAXIMUM_INTERVAL
    } else {
        u32::max(days as u32, 1)
    }
}

fn next_ease(ease: f64, grade: Grade) -> f64 {
    let q = 5.0 - f64::from(grade.value());
    f64::max(ease + (0.1 - q * (0.08 + q * 0.02)), MINIMUM_EASE)
}

/// Applies one graded review to `record`.
pub fn advance(record: &mut WordRecord, grade: Grade, now: DateTime<Utc>) -> Result<()> {
    if record.is_learned {
        return Err(Error::InvalidState(format!(
            "{} is already learned",
            record.word
        )));
    }

    let mut next = record.schedule.clone();
    if grade.is_pass() {
        next.interval = match next.repetitions {
            0 => 1,
            1 => 6,
            _ => grown_interval(next.interval, next.ease_factor),
        };
        next.repetitions += 1;
        next.correct_answers += 1;
        next.difficulty = Difficulty::Easy;
    } else {
        next.repetitions = 0;
        next.interval = 1;
        next.difficulty = next.difficulty.escalate();
    }
    next.ease_factor = next_ease(next.ease_factor, grade);
    next.next_review = now
        .checked_add_signed(Duration::days(i64::from(next.interval)))
        .ok_or_else(|| {
            Error::InvalidState(format!("{}: next review date out of range", record.word))
        })?;
    next.last_review = Some(now);
    next.total_answers += 1;

    debug!(
        word = %record.word,
        grade = grade.value(),
        interval = next.interval,
        ease = next.ease_factor,
        "advanced schedule"
    );
    record.schedule = next;
    Ok(())
}
