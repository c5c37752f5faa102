mod common;
use common::*;

use huawei_solar_bridge::register::periods::{ChargeFlag, PeakSettingPeriod, TimeOfUsePeriod};
use huawei_solar_bridge::schedule::{validate_peak_settings, validate_time_of_use, ValidationError};

const ALL_DAYS: [bool; 7] = [true; 7];

fn peak(start: i32, end: i32, days: [bool; 7]) -> PeakSettingPeriod {
    PeakSettingPeriod {
        start,
        end,
        power: 2500,
        days,
    }
}

#[test]
fn whole_week_single_period() {
    common_setup();

    assert_eq!(validate_peak_settings(&[peak(0, 1440, ALL_DAYS)]), Ok(()));
    assert_eq!(validate_peak_settings(&[]), Ok(()));
}

#[test]
fn peak_settings_end_of_day() {
    common_setup();

    assert_eq!(
        validate_peak_settings(&[peak(0, 1439, ALL_DAYS)]),
        Err(ValidationError::NotCoveredUntilMidnight)
    );
    assert_eq!(
        ValidationError::NotCoveredUntilMidnight.to_string(),
        "Every day must be covered until 23:59"
    );
}

#[test]
fn peak_settings_missing_day() {
    common_setup();

    let mut days = ALL_DAYS;
    days[3] = false;
    assert_eq!(
        validate_peak_settings(&[peak(0, 1440, days)]),
        Err(ValidationError::DayNotCovered)
    );
}

#[test]
fn peak_settings_gap_on_shared_day() {
    common_setup();

    // Monday and Sunday share the first period; Monday's second period
    // starts two minutes late
    let morning = [true, true, false, false, false, false, false];
    let sunday = [true, false, false, false, false, false, false];
    let rest = [false, false, true, true, true, true, true];

    let periods = [
        peak(0, 600, morning),
        peak(601, 1440, sunday),
        peak(602, 1440, [false, true, false, false, false, false, false]),
        peak(0, 1440, rest),
    ];
    assert_eq!(validate_peak_settings(&periods), Err(ValidationError::GapBetweenPeriods));
}

#[test]
fn peak_settings_from_midnight() {
    common_setup();

    assert_eq!(
        validate_peak_settings(&[peak(1, 1440, ALL_DAYS)]),
        Err(ValidationError::NotCoveredFromMidnight)
    );
}

#[test]
fn time_of_use_variants_cannot_mix() {
    common_setup();

    let periods = [
        TimeOfUsePeriod::Luna2000 {
            start: 0,
            end: 600,
            charge_flag: ChargeFlag::Charge,
            days: ALL_DAYS,
        },
        TimeOfUsePeriod::LgResu {
            start: 600,
            end: 1200,
            electricity_price: 0.25,
        },
    ];
    let err = validate_time_of_use(&periods).unwrap_err();
    assert_eq!(err, ValidationError::MixedTypes);
    assert_eq!(err.to_string(), "TOU periods cannot be of different types");
}

#[test]
fn time_of_use_period_bounds() {
    common_setup();

    let resu = |start, end| TimeOfUsePeriod::LgResu {
        start,
        end,
        electricity_price: 0.1,
    };

    assert_eq!(validate_time_of_use(&[]), Ok(()));
    assert_eq!(validate_time_of_use(&[resu(-1, 60)]), Err(ValidationError::BelowZero));
    assert_eq!(
        validate_time_of_use(&[resu(0, 1441)]),
        Err(ValidationError::SpansMultipleDays)
    );
    assert_eq!(
        validate_time_of_use(&[resu(600, 600)]),
        Err(ValidationError::StartNotBeforeEnd)
    );
    assert_eq!(
        validate_time_of_use(&[resu(0, 600), resu(500, 700)]),
        Err(ValidationError::Overlapping)
    );
    assert_eq!(validate_time_of_use(&[resu(600, 1440), resu(0, 600)]), Ok(()));
}
