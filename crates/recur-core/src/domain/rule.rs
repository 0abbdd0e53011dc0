//! Recurrence rule: how often and until when a series repeats.

use std::fmt;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Calendar unit the interval is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Day,
    Week,
    Month,
    Year,
}

impl Unit {
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Day => "day",
            Unit::Week => "week",
            Unit::Month => "month",
            Unit::Year => "year",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of weekdays stored as a 7-bit mask (bit 0 = Monday).
///
/// Serialized as a list of weekday names, e.g. `["Mon", "Wed"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Weekday>", into = "Vec<Weekday>")]
pub struct WeekdayMask(u8);

impl WeekdayMask {
    pub const EMPTY: WeekdayMask = WeekdayMask(0);
    pub const ALL: WeekdayMask = WeekdayMask(0b111_1111);

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_monday()
    }

    pub fn with(mut self, day: Weekday) -> Self {
        self.insert(day);
        self
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= Self::bit(day);
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !Self::bit(day);
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Days in the mask, Monday first.
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        let mut day = Weekday::Mon;
        (0..7).filter_map(move |_| {
            let current = day;
            day = day.succ();
            self.contains(current).then_some(current)
        })
    }
}

impl FromIterator<Weekday> for WeekdayMask {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        iter.into_iter()
            .fold(WeekdayMask::EMPTY, |mask, day| mask.with(day))
    }
}

impl From<Vec<Weekday>> for WeekdayMask {
    fn from(days: Vec<Weekday>) -> Self {
        days.into_iter().collect()
    }
}

impl From<WeekdayMask> for Vec<Weekday> {
    fn from(mask: WeekdayMask) -> Self {
        mask.iter().collect()
    }
}

/// When the series stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum StopPolicy {
    Forever,
    /// Last date an occurrence may fall on (inclusive).
    Until(NaiveDate),
    /// Total number of occurrences to create.
    After(u32),
}

/// Immutable description of a repeating schedule.
///
/// Shape checks (interval, mask, until bound) live in
/// [`crate::recurrence::validate`]; constructing an invalid rule is allowed so
/// editing surfaces can hold incomplete input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub interval: u32,
    pub unit: Unit,
    #[serde(default)]
    pub weekdays: WeekdayMask,
    pub start_date: NaiveDate,
    #[serde(default = "default_stop")]
    pub stop: StopPolicy,
}

fn default_stop() -> StopPolicy {
    StopPolicy::Forever
}

impl RecurrenceRule {
    pub fn new(interval: u32, unit: Unit, start_date: NaiveDate) -> Self {
        Self {
            interval,
            unit,
            weekdays: WeekdayMask::EMPTY,
            start_date,
            stop: StopPolicy::Forever,
        }
    }

    pub fn daily(interval: u32, start_date: NaiveDate) -> Self {
        Self::new(interval, Unit::Day, start_date)
    }

    pub fn weekly(interval: u32, weekdays: WeekdayMask, start_date: NaiveDate) -> Self {
        Self {
            weekdays,
            ..Self::new(interval, Unit::Week, start_date)
        }
    }

    pub fn monthly(interval: u32, start_date: NaiveDate) -> Self {
        Self::new(interval, Unit::Month, start_date)
    }

    pub fn yearly(interval: u32, start_date: NaiveDate) -> Self {
        Self::new(interval, Unit::Year, start_date)
    }

    pub fn until(mut self, date: NaiveDate) -> Self {
        self.stop = StopPolicy::Until(date);
        self
    }

    pub fn after(mut self, repetitions: u32) -> Self {
        self.stop = StopPolicy::After(repetitions);
        self
    }

    /// Inclusive stop date under `Until`.
    pub fn until_date(&self) -> Option<NaiveDate> {
        match self.stop {
            StopPolicy::Until(date) => Some(date),
            _ => None,
        }
    }

    /// Configured repetition count under `After`.
    pub fn repetitions(&self) -> Option<u32> {
        match self.stop {
            StopPolicy::After(count) => Some(count),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_iterates_monday_first() {
        let mask = WeekdayMask::EMPTY
            .with(Weekday::Sun)
            .with(Weekday::Mon)
            .with(Weekday::Wed);
        let days: Vec<_> = mask.iter().collect();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Wed, Weekday::Sun]);
        assert_eq!(mask.len(), 3);
    }

    #[test]
    fn mask_insert_remove() {
        let mut mask = WeekdayMask::EMPTY;
        assert!(mask.is_empty());
        mask.insert(Weekday::Fri);
        assert!(mask.contains(Weekday::Fri));
        assert!(!mask.contains(Weekday::Thu));
        mask.remove(Weekday::Fri);
        assert!(mask.is_empty());
        assert_eq!(WeekdayMask::ALL.len(), 7);
    }

    #[test]
    fn rule_deserializes_from_json() {
        let rule: RecurrenceRule = serde_json::from_value(serde_json::json!({
            "interval": 2,
            "unit": "week",
            "weekdays": ["Mon", "wed"],
            "start_date": "2024-01-01",
            "stop": { "type": "until", "value": "2024-03-01" }
        }))
        .unwrap();

        assert_eq!(rule.unit, Unit::Week);
        assert_eq!(rule.weekdays, WeekdayMask::EMPTY.with(Weekday::Mon).with(Weekday::Wed));
        assert_eq!(rule.until_date(), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(rule.repetitions(), None);
    }

    #[test]
    fn stop_defaults_to_forever() {
        let rule: RecurrenceRule = serde_json::from_value(serde_json::json!({
            "interval": 1,
            "unit": "day",
            "start_date": "2024-01-01"
        }))
        .unwrap();
        assert_eq!(rule.stop, StopPolicy::Forever);
        assert!(rule.weekdays.is_empty());
    }
}
