mod common;
use common::*;

use huawei_solar_bridge::error::Error;
use huawei_solar_bridge::prelude::*;
use huawei_solar_bridge::register::periods::{ChargeDischargePeriod, ChargeFlag, PeakSettingPeriod, TimeOfUsePeriod};
use huawei_solar_bridge::schedule::ValidationError;

const WEEKDAYS: [bool; 7] = [false, true, true, true, true, true, false];
const WEEKEND: [bool; 7] = [true, false, false, false, false, false, true];

fn luna(start: i32, end: i32, charge_flag: ChargeFlag, days: [bool; 7]) -> TimeOfUsePeriod {
    TimeOfUsePeriod::Luna2000 {
        start,
        end,
        charge_flag,
        days,
    }
}

#[tokio::test]
async fn state_2_zero_reports_off_labels() {
    common_setup();

    let transport = MockTransport::new(Factory::device());
    let client = Factory::client(&transport).await;

    let reading = client.get(rn::STATE_2, None).await.unwrap();
    assert_eq!(
        reading.value,
        Value::Labels(vec![
            "Locked".to_string(),
            "PV disconnected".to_string(),
            "No DSP data collection".to_string()
        ])
    );
}

#[tokio::test]
async fn sentinels() {
    common_setup();

    let mut device = Factory::device();
    device.set_words(rn::ALARM_1, &[0xFFFF]);
    device.set_words(rn::EFFICIENCY, &[0xFFFF]);
    device.set_words(rn::ACTIVE_POWER, &[0x7FFF, 0xFFFF]);
    let transport = MockTransport::new(device);
    let client = Factory::client(&transport).await;

    let Value::Labels(alarms) = client.get(rn::ALARM_1, None).await.unwrap().value else {
        panic!("alarms decode to labels");
    };
    assert!(alarms.contains(&"High String Input Voltage".to_string()));

    assert_eq!(client.get(rn::EFFICIENCY, None).await.unwrap().value, Value::Empty);
    assert_eq!(client.get(rn::ACTIVE_POWER, None).await.unwrap().value, Value::Empty);
}

#[tokio::test]
async fn luna2000_time_of_use_round_trip() {
    common_setup();

    let transport = MockTransport::new(Factory::luna2000_device());
    let client = Factory::client(&transport).await;

    let periods = vec![
        luna(0, 360, ChargeFlag::Charge, WEEKDAYS),
        luna(360, 1440, ChargeFlag::Discharge, WEEKDAYS),
        luna(0, 1440, ChargeFlag::Discharge, WEEKEND),
    ];
    let name = rn::STORAGE_HUAWEI_LUNA2000_TIME_OF_USE_CHARGING_AND_DISCHARGING_PERIODS;

    assert!(client
        .set(name, &Value::TimeOfUse(periods.clone()), None)
        .await
        .unwrap());
    assert_eq!(transport.device().words(name)[0], 3);
    assert_eq!(client.get(name, None).await.unwrap().value, Value::TimeOfUse(periods));
}

#[tokio::test]
async fn overlapping_time_of_use_is_rejected_before_writing() {
    common_setup();

    let transport = MockTransport::new(Factory::luna2000_device());
    let client = Factory::client(&transport).await;
    let writes = transport.device().requests_with(0x10).len();

    let result = client
        .set(
            rn::STORAGE_HUAWEI_LUNA2000_TIME_OF_USE_CHARGING_AND_DISCHARGING_PERIODS,
            &Value::TimeOfUse(vec![
                luna(0, 600, ChargeFlag::Charge, WEEKDAYS),
                luna(300, 900, ChargeFlag::Discharge, WEEKDAYS),
            ]),
            None,
        )
        .await;
    assert!(matches!(
        result,
        Err(Error::ScheduleValidation(ValidationError::Overlapping))
    ));
    assert_eq!(transport.device().requests_with(0x10).len(), writes);
}

#[tokio::test]
async fn time_of_use_needs_a_battery() {
    common_setup();

    let mut device = Factory::device();
    device.set_words(
        rn::STORAGE_HUAWEI_LUNA2000_TIME_OF_USE_CHARGING_AND_DISCHARGING_PERIODS,
        &[0; 43],
    );
    let transport = MockTransport::new(device);
    let client = Factory::client(&transport).await;

    assert!(matches!(
        client
            .get(rn::STORAGE_HUAWEI_LUNA2000_TIME_OF_USE_CHARGING_AND_DISCHARGING_PERIODS, None)
            .await,
        Err(Error::Decode(_))
    ));
}

#[tokio::test]
async fn peak_settings_round_trip() {
    common_setup();

    let transport = MockTransport::new(Factory::luna2000_device());
    let client = Factory::client(&transport).await;

    let periods = vec![
        PeakSettingPeriod {
            start: 0,
            end: 479,
            power: 2500,
            days: [true; 7],
        },
        PeakSettingPeriod {
            start: 480,
            end: 1440,
            power: 5000,
            days: [true; 7],
        },
    ];

    assert!(client
        .set(
            rn::STORAGE_CAPACITY_CONTROL_PERIODS,
            &Value::PeakSettings(periods.clone()),
            None
        )
        .await
        .unwrap());
    assert_eq!(
        client.get(rn::STORAGE_CAPACITY_CONTROL_PERIODS, None).await.unwrap().value,
        Value::PeakSettings(periods)
    );
}

#[tokio::test]
async fn peak_settings_must_cover_the_day() {
    common_setup();

    let transport = MockTransport::new(Factory::luna2000_device());
    let client = Factory::client(&transport).await;

    let result = client
        .set(
            rn::STORAGE_CAPACITY_CONTROL_PERIODS,
            &Value::PeakSettings(vec![PeakSettingPeriod {
                start: 0,
                end: 1000,
                power: 2500,
                days: [true; 7],
            }]),
            None,
        )
        .await;
    assert!(matches!(
        result,
        Err(Error::ScheduleValidation(ValidationError::NotCoveredUntilMidnight))
    ));
}

#[tokio::test]
async fn fixed_charge_periods_round_trip() {
    common_setup();

    let transport = MockTransport::new(Factory::luna2000_device());
    let client = Factory::client(&transport).await;

    let periods = vec![
        ChargeDischargePeriod {
            start: 60,
            end: 300,
            power: 2000,
        },
        ChargeDischargePeriod {
            start: 1080,
            end: 1320,
            power: -3000,
        },
    ];

    client
        .set(
            rn::STORAGE_FIXED_CHARGING_AND_DISCHARGING_PERIODS,
            &Value::ChargeDischarge(periods.clone()),
            None,
        )
        .await
        .unwrap();
    assert_eq!(
        client
            .get(rn::STORAGE_FIXED_CHARGING_AND_DISCHARGING_PERIODS, None)
            .await
            .unwrap()
            .value,
        Value::ChargeDischarge(periods)
    );
}

#[tokio::test]
async fn timestamps_follow_the_device_time_zone() {
    common_setup();

    let mut device = Factory::device();
    // local 2023-11-14 23:13:20 at UTC+1
    device.set_int(rn::SYSTEM_TIME_RAW, 1_700_003_600);
    let transport = MockTransport::new(device);
    let client = Factory::client(&transport).await;

    let Value::Timestamp(time) = client.get(rn::SYSTEM_TIME, None).await.unwrap().value else {
        panic!("system time decodes to a timestamp");
    };
    assert_eq!(time.timestamp(), 1_700_000_000);
}
