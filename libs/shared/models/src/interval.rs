use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeSlotError {
    #[error("start time must be strictly before end time")]
    EmptyRange,

    #[error("invalid time '{0}': expected HH:MM")]
    BadTime(String),

    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    BadDate(String),
}

/// An open time interval on a single calendar day, minute resolution.
/// Construction goes through `new`/`parse` so `start_time < end_time`
/// always holds; equality is plain field equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl TimeSlot {
    pub fn new(
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Self, TimeSlotError> {
        if start_time >= end_time {
            return Err(TimeSlotError::EmptyRange);
        }
        Ok(Self {
            date,
            start_time,
            end_time,
        })
    }

    /// Parse boundary input. Times must match `HH:MM` exactly (hour 0-23,
    /// minute 0-59), dates `YYYY-MM-DD`.
    pub fn parse(date: &str, start_time: &str, end_time: &str) -> Result<Self, TimeSlotError> {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| TimeSlotError::BadDate(date.to_string()))?;
        let start_time = parse_hhmm(start_time)?;
        let end_time = parse_hhmm(end_time)?;
        Self::new(date, start_time, end_time)
    }

    pub fn duration_minutes(&self) -> i64 {
        minutes(self.end_time) - minutes(self.start_time)
    }

    /// Same date and the half-open ranges `[start, end)` intersect.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.date == other.date
            && minutes(self.start_time) < minutes(other.end_time)
            && minutes(other.start_time) < minutes(self.end_time)
    }

    /// Same date and `other` lies entirely within `self`.
    pub fn contains(&self, other: &TimeSlot) -> bool {
        self.date == other.date
            && minutes(self.start_time) <= minutes(other.start_time)
            && minutes(other.end_time) <= minutes(self.end_time)
    }

    /// Remainders of `self` after removing a contained `inner`: the left
    /// remainder `[self.start, inner.start)` if non-empty, then the right
    /// remainder `[inner.end, self.end)` if non-empty. Pure; the caller
    /// checks `contains` first.
    pub fn subtract(&self, inner: &TimeSlot) -> Vec<TimeSlot> {
        debug_assert!(self.contains(inner));

        let mut remainders = Vec::with_capacity(2);
        if minutes(self.start_time) < minutes(inner.start_time) {
            remainders.push(TimeSlot {
                date: self.date,
                start_time: self.start_time,
                end_time: inner.start_time,
            });
        }
        if minutes(inner.end_time) < minutes(self.end_time) {
            remainders.push(TimeSlot {
                date: self.date,
                start_time: inner.end_time,
                end_time: self.end_time,
            });
        }
        remainders
    }
}

fn minutes(t: NaiveTime) -> i64 {
    t.hour() as i64 * 60 + t.minute() as i64
}

fn parse_hhmm(s: &str) -> Result<NaiveTime, TimeSlotError> {
    // Strict HH:MM only; chrono alone would also accept "9:00".
    let bytes = s.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(TimeSlotError::BadTime(s.to_string()));
    }
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| TimeSlotError::BadTime(s.to_string()))
}
