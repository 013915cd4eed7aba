//! Term status transitions for the review flow. Statuses 1-5 are learning
//! levels moved by +1/-1 answers and clamped to the scale; 98 (ignored) and
//! 99 (well-known) are sentinel assignments that bypass the clamp.

use chrono::{Duration, NaiveDateTime, Utc};
use diesel::prelude::*;

use crate::schema::words;

pub const STATUS_MIN: i32 = 1;
pub const STATUS_MAX: i32 = 5;
pub const STATUS_IGNORED: i32 = 98;
pub const STATUS_WELL_KNOWN: i32 = 99;

pub fn clamp_status(value: i32) -> i32 {
    value.clamp(STATUS_MIN, STATUS_MAX)
}

pub fn is_valid_status(status: i32) -> bool {
    (STATUS_MIN..=STATUS_MAX).contains(&status)
        || status == STATUS_IGNORED
        || status == STATUS_WELL_KNOWN
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Correct,
    Incorrect,
    Ignore,
    WellKnown,
}

impl Answer {
    pub fn from_grade(grade: i32) -> Option<Answer> {
        match grade {
            1 => Some(Answer::Correct),
            -1 => Some(Answer::Incorrect),
            STATUS_IGNORED => Some(Answer::Ignore),
            STATUS_WELL_KNOWN => Some(Answer::WellKnown),
            _ => None,
        }
    }
}

/// The transition rule. Sentinel statuses are never moved by +1/-1 answers;
/// the review selection does not serve them in the first place.
pub fn apply_answer(status: i32, answer: Answer) -> i32 {
    match answer {
        Answer::Ignore => STATUS_IGNORED,
        Answer::WellKnown => STATUS_WELL_KNOWN,
        Answer::Correct if (STATUS_MIN..=STATUS_MAX).contains(&status) => clamp_status(status + 1),
        Answer::Incorrect if (STATUS_MIN..=STATUS_MAX).contains(&status) => {
            clamp_status(status - 1)
        }
        _ => status,
    }
}

/// A term at status s waits 2^(s-1) days after its last status change before
/// it is due again.
pub fn due_interval_days(status: i32) -> i64 {
    1_i64 << (clamp_status(status) - 1) as u32
}

pub fn is_due(status: i32, status_changed: NaiveDateTime, now: NaiveDateTime) -> bool {
    if !(STATUS_MIN..=STATUS_MAX).contains(&status) {
        return false;
    }
    now - status_changed >= Duration::days(due_interval_days(status))
}

/// Applies answers to the words table.
pub struct ReviewEngine<'a> {
    conn: &'a mut SqliteConnection,
}

impl<'a> ReviewEngine<'a> {
    pub fn new(conn: &'a mut SqliteConnection) -> Self {
        ReviewEngine { conn }
    }

    /// Records an answer for a term and returns the new status. Every change
    /// stamps status_changed, which drives the due rule.
    pub fn record_answer(
        &mut self,
        word_id: i32,
        answer: Answer,
    ) -> Result<i32, diesel::result::Error> {
        let status = words::table
            .filter(words::word_id.eq(word_id))
            .select(words::status)
            .first::<i32>(self.conn)?;

        let new_status = apply_answer(status, answer);
        diesel::update(words::table.filter(words::word_id.eq(word_id)))
            .set((
                words::status.eq(new_status),
                words::status_changed.eq(Utc::now().naive_utc()),
            ))
            .execute(self.conn)?;

        Ok(new_status)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn clamp_never_leaves_the_scale() {
        for value in [i32::MIN, -7, 0, 1, 3, 5, 6, 42, STATUS_IGNORED, i32::MAX] {
            let clamped = clamp_status(value);
            assert!((STATUS_MIN..=STATUS_MAX).contains(&clamped), "input {value}");
        }
    }

    #[test]
    fn correct_moves_up_and_saturates() {
        assert_eq!(apply_answer(1, Answer::Correct), 2);
        assert_eq!(apply_answer(4, Answer::Correct), 5);
        assert_eq!(apply_answer(5, Answer::Correct), 5);
    }

    #[test]
    fn incorrect_moves_down_and_saturates() {
        assert_eq!(apply_answer(5, Answer::Incorrect), 4);
        assert_eq!(apply_answer(2, Answer::Incorrect), 1);
        assert_eq!(apply_answer(1, Answer::Incorrect), 1);
    }

    #[test]
    fn sentinels_bypass_the_clamp() {
        assert_eq!(apply_answer(3, Answer::Ignore), STATUS_IGNORED);
        assert_eq!(apply_answer(1, Answer::WellKnown), STATUS_WELL_KNOWN);
    }

    #[test]
    fn delta_answers_leave_sentinels_alone() {
        assert_eq!(apply_answer(STATUS_IGNORED, Answer::Correct), STATUS_IGNORED);
        assert_eq!(
            apply_answer(STATUS_WELL_KNOWN, Answer::Incorrect),
            STATUS_WELL_KNOWN
        );
    }

    #[test]
    fn grade_mapping() {
        assert_eq!(Answer::from_grade(1), Some(Answer::Correct));
        assert_eq!(Answer::from_grade(-1), Some(Answer::Incorrect));
        assert_eq!(Answer::from_grade(98), Some(Answer::Ignore));
        assert_eq!(Answer::from_grade(99), Some(Answer::WellKnown));
        assert_eq!(Answer::from_grade(0), None);
        assert_eq!(Answer::from_grade(7), None);
    }

    #[test]
    fn due_intervals_double_per_level() {
        assert_eq!(due_interval_days(1), 1);
        assert_eq!(due_interval_days(2), 2);
        assert_eq!(due_interval_days(3), 4);
        assert_eq!(due_interval_days(4), 8);
        assert_eq!(due_interval_days(5), 16);
    }

    #[test]
    fn due_rule_uses_status_age() {
        let now = Utc::now().naive_utc();
        assert!(is_due(1, now - Duration::days(1), now));
        assert!(!is_due(1, now - Duration::hours(12), now));
        assert!(!is_due(3, now - Duration::days(3), now));
        assert!(is_due(3, now - Duration::days(4), now));
        assert!(!is_due(STATUS_WELL_KNOWN, now - Duration::days(400), now));
        assert!(!is_due(STATUS_IGNORED, now - Duration::days(400), now));
    }

    #[test]
    fn valid_statuses() {
        for s in 1..=5 {
            assert!(is_valid_status(s));
        }
        assert!(is_valid_status(98));
        assert!(is_valid_status(99));
        assert!(!is_valid_status(0));
        assert!(!is_valid_status(6));
        assert!(!is_valid_status(97));
    }
}
