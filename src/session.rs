use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::book::WordBook;
use crate::error::{Error, Result};
use crate::scheduler::Grade;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub reviewed: usize,
    pub correct: usize,
    pub failed: usize,
    pub remaining: usize,
}

/// Outcome of one graded step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Id of the next record to present.
    Next(String),
    Complete(SessionSummary),
}

/// One pass over a snapshot of the due set. The snapshot is fixed at start;
/// grading a word never adds or drops entries from it.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    order: Vec<String>,
    position: usize,
    correct: usize,
    failed: usize,
    finished: bool,
}

impl ReviewSession {
    pub fn start(book: &WordBook, now: DateTime<Utc>) -> ReviewSession {
        let order: Vec<String> = book.due(now).iter().map(|r| r.id().to_string()).collect();
        info!(due = order.len(), "review session started");
        ReviewSession {
            finished: order.is_empty(),
            order,
            position: 0,
            correct: 0,
            failed: 0,
        }
    }

    /// Id of the record awaiting a grade, if any.
    pub fn current(&self) -> Option<&str> {
        if self.finished {
            return None;
        }
        self.order.get(self.position).map(String::as_str)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.finished
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            reviewed: self.position,
            correct: self.correct,
            failed: self.failed,
            remaining: self.order.len() - self.position,
        }
    }

    /// Grades the current record and moves on. On error the session stays on
    /// the same record.
    pub fn submit(&mut self, book: &mut WordBook, grade: Grade, now: DateTime<Utc>) -> Result<Step> {
        let id = self
            .current()
            .ok_or_else(|| Error::InvalidState("review session already complete".to_string()))?
            .to_string();
        book.advance(&id, grade, now)?;

        if grade.is_pass() {
            self.correct += 1;
        } else {
            self.failed += 1;
        }
        self.position += 1;

        match self.order.get(self.position) {
            Some(next) => Ok(Step::Next(next.clone())),
            None => {
                self.finished = true;
                let summary = self.summary();
                info!(
                    reviewed = summary.reviewed,
                    correct = summary.correct,
                    "review session complete"
                );
                Ok(Step::Complete(summary))
            }
        }
    }

    /// Abandons the session. Graded records keep their new state.
    pub fn cancel(self) -> SessionSummary {
        let summary = self.summary();
        if !self.finished {
            info!(
                reviewed = summary.reviewed,
                remaining = summary.remaining,
                "review session cancelled"
            );
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn book(words: &[&str]) -> WordBook {
        let mut book = WordBook::new();
        for w in words {
            book.add(w, "t", "A1", now()).unwrap();
        }
        book
    }

    fn g(n: u8) -> Grade {
        Grade::new(n).unwrap()
    }

    #[test]
    fn completes_exactly_once_without_revisits() {
        let mut book = book(&["a", "b", "c"]);
        let mut session = ReviewSession::start(&book, now());
        assert_eq!(session.len(), 3);

        let mut seen = HashSet::new();
        let mut completions = 0;
        while let Some(id) = session.current().map(str::to_string) {
            assert!(seen.insert(id));
            if let Step::Complete(summary) = session.submit(&mut book, g(4), now()).unwrap() {
                completions += 1;
                assert_eq!(summary.reviewed, 3);
                assert_eq!(summary.correct, 3);
                assert_eq!(summary.remaining, 0);
            }
        }
        assert_eq!(completions, 1);
        assert_eq!(seen.len(), 3);
        assert!(session.is_complete());
        assert!(matches!(
            session.submit(&mut book, g(4), now()),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn failed_word_stays_out_of_snapshot() {
        let mut book = book(&["a", "b"]);
        let mut session = ReviewSession::start(&book, now());
        let first = session.current().unwrap().to_string();

        // A failure leaves the word due again tomorrow; it is not re-queued.
        let step = session.submit(&mut book, g(0), now()).unwrap();
        let Step::Next(second) = step else {
            panic!("expected another word");
        };
        assert_ne!(first, second);
        let step = session.submit(&mut book, g(5), now()).unwrap();
        assert!(matches!(step, Step::Complete(s) if s.failed == 1 && s.correct == 1));
    }

    #[test]
    fn empty_due_set_starts_complete() {
        let mut book = book(&["a"]);
        let session = ReviewSession::start(&book, now() - Duration::days(1));
        assert!(session.is_empty());
        assert!(session.is_complete());
        assert_eq!(session.current(), None);

        let mut session = session;
        assert!(session.submit(&mut book, g(3), now()).is_err());
    }

    #[test]
    fn cancel_keeps_graded_records() {
        let mut book = book(&["a", "b", "c"]);
        let mut session = ReviewSession::start(&book, now());
        let graded = session.current().unwrap().to_string();
        session.submit(&mut book, g(5), now()).unwrap();
        let summary = session.cancel();
        assert_eq!(summary.reviewed, 1);
        assert_eq!(summary.remaining, 2);

        let graded = book.get_by_id(&graded).unwrap();
        assert_eq!(graded.schedule().total_answers(), 1);
        let untouched = book
            .records()
            .iter()
            .filter(|r| r.schedule().total_answers() == 0)
            .count();
        assert_eq!(untouched, 2);
    }

    #[test]
    fn learned_mid_session_is_rejected_without_moving() {
        let mut book = book(&["a", "b"]);
        let mut session = ReviewSession::start(&book, now());
        let id = session.current().unwrap().to_string();
        let word = book.get_by_id(&id).unwrap().word().to_string();
        book.mark_learned(&word, now()).unwrap();

        assert!(matches!(
            session.submit(&mut book, g(5), now()),
            Err(Error::InvalidState(_))
        ));
        assert_eq!(session.position(), 0);
        assert_eq!(session.current(), Some(id.as_str()));
    }
}
