//! Recurrence rule given on the command line.

use chrono::{NaiveDate, Weekday};
use clap::{Args, ValueEnum};

use recur_core::domain::{RecurrenceRule, StopPolicy, Unit, WeekdayMask};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum UnitArg {
    Day,
    Week,
    Month,
    Year,
}

impl From<UnitArg> for Unit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Day => Unit::Day,
            UnitArg::Week => Unit::Week,
            UnitArg::Month => Unit::Month,
            UnitArg::Year => Unit::Year,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct RuleArgs {
    /// First date of the series (YYYY-MM-DD).
    #[arg(long)]
    pub start: NaiveDate,

    /// Repeat every N units.
    #[arg(long, default_value_t = 1)]
    pub every: u32,

    #[arg(long, value_enum, default_value_t = UnitArg::Day)]
    pub unit: UnitArg,

    /// Weekdays for weekly rules, e.g. `--on mon,thu`.
    #[arg(long, value_delimiter = ',')]
    pub on: Vec<Weekday>,

    /// Last allowed date (inclusive).
    #[arg(long, conflicts_with = "count")]
    pub until: Option<NaiveDate>,

    /// Stop after N occurrences.
    #[arg(long)]
    pub count: Option<u32>,
}

impl RuleArgs {
    pub fn to_rule(&self) -> RecurrenceRule {
        let mut rule = RecurrenceRule::new(self.every, self.unit.into(), self.start);
        rule.weekdays = self.on.iter().copied().collect::<WeekdayMask>();
        rule.stop = match (self.until, self.count) {
            (Some(until), _) => StopPolicy::Until(until),
            (None, Some(count)) => StopPolicy::After(count),
            (None, None) => StopPolicy::Forever,
        };
        rule
    }
}
