//! Recurrence validator: is a rule well-formed enough to schedule?

use crate::domain::{InvalidRule, RecurrenceRule, StopPolicy, Unit};

/// Check the shape of `rule`.
pub fn validate(rule: &RecurrenceRule) -> Result<(), InvalidRule> {
    if rule.interval == 0 {
        return Err(InvalidRule::NonPositiveInterval);
    }
    if rule.unit == Unit::Week && rule.weekdays.is_empty() {
        return Err(InvalidRule::EmptyWeekdayMask);
    }
    if let StopPolicy::Until(until) = rule.stop
        && until < rule.start_date
    {
        return Err(InvalidRule::UntilBeforeStart {
            start: rule.start_date,
            until,
        });
    }
    Ok(())
}

/// Validate a rule together with the template's recurrence switch.
pub fn validate_enabled(enabled: bool, rule: &RecurrenceRule) -> Result<(), InvalidRule> {
    if !enabled {
        return Err(InvalidRule::RecurrenceDisabled);
    }
    validate(rule)
}

pub fn is_valid(rule: &RecurrenceRule) -> bool {
    validate(rule).is_ok()
}
