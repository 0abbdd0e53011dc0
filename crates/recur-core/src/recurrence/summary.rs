//! Plain-text description of a rule, posted when a schedule starts.

use chrono::Weekday;

use crate::domain::{RecurrenceRule, StopPolicy, Unit};

const DATE_FORMAT: &str = "%d-%m-%Y";

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

pub fn describe(rule: &RecurrenceRule) -> String {
    let mut lines = vec![format!(
        "This task is set to recur, starting from {}.",
        rule.start_date.format(DATE_FORMAT)
    )];

    let plural = if rule.interval == 1 { "" } else { "s" };
    let mut repetition = format!("It repeats every {} {}{plural}", rule.interval, rule.unit);
    if rule.unit == Unit::Week && !rule.weekdays.is_empty() {
        let days: Vec<_> = rule.weekdays.iter().map(weekday_name).collect();
        repetition.push_str(&format!(" on {}", days.join(", ")));
    }
    lines.push(format!("{repetition}."));

    lines.push(match rule.stop {
        StopPolicy::Forever => "The recurrence will continue indefinitely.".to_string(),
        StopPolicy::Until(date) => {
            format!("The recurrence will stop on {}.", date.format(DATE_FORMAT))
        }
        StopPolicy::After(count) => {
            format!("The recurrence will stop after {count} repetitions.")
        }
    });

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WeekdayMask;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekly_rule_lists_days_and_end_date() {
        let rule = RecurrenceRule::weekly(
            2,
            WeekdayMask::EMPTY.with(Weekday::Wed).with(Weekday::Mon),
            date(2024, 1, 1),
        )
        .until(date(2024, 6, 30));

        assert_eq!(
            describe(&rule),
            "This task is set to recur, starting from 01-01-2024.\n\
             It repeats every 2 weeks on Mon, Wed.\n\
             The recurrence will stop on 30-06-2024."
        );
    }

    #[test]
    fn single_interval_is_singular() {
        let text = describe(&RecurrenceRule::monthly(1, date(2024, 1, 31)).after(3));
        assert!(text.contains("every 1 month."));
        assert!(text.ends_with("stop after 3 repetitions."));
    }

    #[test]
    fn forever_rule() {
        let text = describe(&RecurrenceRule::daily(3, date(2024, 1, 1)));
        assert!(text.contains("every 3 days."));
        assert!(text.ends_with("continue indefinitely."));
    }
}
