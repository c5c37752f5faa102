use thiserror::Error;

use crate::register::periods::{PeakSettingPeriod, TimeOfUsePeriod};

/// Upper bound for time-of-use minute offsets.
pub const TIME_OF_USE_DAY_END: i32 = 24 * 60;
/// Where the last peak-shaving period of a day has to end.
pub const PEAK_SHAVING_DAY_END: i32 = 24 * 60;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("TOU periods cannot be of different types")]
    MixedTypes,
    #[error("TOU period is invalid (Below zero)")]
    BelowZero,
    #[error("TOU period is invalid (Spans over more than one day)")]
    SpansMultipleDays,
    #[error("TOU period is invalid (start-time is greater than end-time)")]
    StartNotBeforeEnd,
    #[error("TOU periods are overlapping")]
    Overlapping,
    #[error("All days of the week need to be covered")]
    DayNotCovered,
    #[error("Every day must be covered from 00:00")]
    NotCoveredFromMidnight,
    #[error("All moments of each day need to be covered")]
    GapBetweenPeriods,
    #[error("Every day must be covered until 23:59")]
    NotCoveredUntilMidnight,
}

fn overlapping(prev: &TimeOfUsePeriod, cur: &TimeOfUsePeriod) -> bool {
    (prev.start() <= cur.start() && cur.start() < prev.end()) || (prev.start() < cur.end() && cur.end() <= prev.end())
}

fn check_sorted_overlap(mut periods: Vec<&TimeOfUsePeriod>) -> Result<(), ValidationError> {
    periods.sort_by_key(|period| period.start());
    if periods.windows(2).any(|pair| overlapping(pair[0], pair[1])) {
        return Err(ValidationError::Overlapping);
    }
    Ok(())
}

pub fn validate_time_of_use(periods: &[TimeOfUsePeriod]) -> Result<(), ValidationError> {
    let Some(first) = periods.first() else {
        return Ok(());
    };

    if periods.iter().any(|period| period.is_luna2000() != first.is_luna2000()) {
        return Err(ValidationError::MixedTypes);
    }

    for period in periods {
        if period.start() < 0 || period.end() < 0 {
            return Err(ValidationError::BelowZero);
        }
        if period.start() > TIME_OF_USE_DAY_END || period.end() > TIME_OF_USE_DAY_END {
            return Err(ValidationError::SpansMultipleDays);
        }
        if period.start() >= period.end() {
            return Err(ValidationError::StartNotBeforeEnd);
        }
    }

    if first.is_luna2000() {
        for day in 0..7 {
            let active = periods
                .iter()
                .filter(|period| matches!(period, TimeOfUsePeriod::Luna2000 { days, .. } if days[day]))
                .collect();
            check_sorted_overlap(active)?;
        }
        Ok(())
    } else {
        check_sorted_overlap(periods.iter().collect())
    }
}

/// Each weekday must be covered from 00:00 until the end of the day without
/// gaps. An empty list means no schedule is configured.
pub fn validate_peak_settings(periods: &[PeakSettingPeriod]) -> Result<(), ValidationError> {
    if periods.is_empty() {
        return Ok(());
    }

    for day in 0..7 {
        let mut active: Vec<&PeakSettingPeriod> = periods.iter().filter(|period| period.days[day]).collect();
        active.sort_by_key(|period| period.start);

        let (Some(first), Some(last)) = (active.first(), active.last()) else {
            return Err(ValidationError::DayNotCovered);
        };

        if first.start != 0 {
            return Err(ValidationError::NotCoveredFromMidnight);
        }

        for pair in active.windows(2) {
            let (prev, cur) = (pair[0], pair[1]);
            if cur.start != prev.end && cur.start != prev.end + 1 {
                return Err(ValidationError::GapBetweenPeriods);
            }
        }

        if last.end != PEAK_SHAVING_DAY_END {
            return Err(ValidationError::NotCoveredUntilMidnight);
        }
    }

    Ok(())
}
