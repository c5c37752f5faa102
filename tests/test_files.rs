mod common;
use common::*;

use huawei_solar_bridge::error::Error;
use huawei_solar_bridge::files::{
    OptimizerOnlineStatus, OptimizerRealTimeDataFile, OptimizerRunningStatus, OptimizerSystemInformationDataFile,
};

#[test]
fn real_time_data_units() {
    common_setup();

    let data = Factory::real_time_file(&[
        (1_700_000_000, vec![Factory::real_time_record(1, 1234, 0x11, 4)]),
        (
            1_700_000_300,
            vec![
                Factory::real_time_record(1, 1250, 0, 4),
                Factory::real_time_record(2, 0, 0, 12),
            ],
        ),
    ]);

    let file = OptimizerRealTimeDataFile::parse(&data).unwrap();
    assert_eq!(file.file_version.as_deref(), Some("V101"));
    assert_eq!(file.data_units.len(), 2);

    let unit = &file.data_units[0];
    assert_eq!(unit.time.timestamp(), 1_700_000_000);
    let optimizer = &unit.optimizers[0];
    assert_eq!(optimizer.optimizer_address, 1);
    assert_eq!(optimizer.output_power, 123.4);
    assert_eq!(optimizer.voltage_to_ground, 230.1);
    assert_eq!(optimizer.alarm, vec!["Input Overvoltage", "Overtemperature"]);
    assert_eq!(optimizer.output_voltage, 38.5);
    assert_eq!(optimizer.output_current, 8.12);
    assert_eq!(optimizer.input_voltage, 40.2);
    assert_eq!(optimizer.input_current, 7.9);
    assert_eq!(optimizer.temperature, 35.5);
    assert_eq!(optimizer.running_status, OptimizerRunningStatus::Running);
    assert_eq!(optimizer.accumulated_energy_yield, 123.456);

    let second = &file.data_units[1].optimizers;
    assert_eq!(second.len(), 2);
    assert_eq!(second[1].running_status, OptimizerRunningStatus::PowerOff);
}

#[test]
fn real_time_data_truncated_unit() {
    common_setup();

    let mut data = Factory::real_time_file(&[
        (1_700_000_000, vec![Factory::real_time_record(1, 1234, 0, 4)]),
        (1_700_000_300, vec![Factory::real_time_record(1, 1250, 0, 4)]),
    ]);
    data.truncate(data.len() - 10);

    let file = OptimizerRealTimeDataFile::parse(&data).unwrap();
    assert_eq!(file.data_units.len(), 1);
}

#[test]
fn real_time_data_unknown_status() {
    common_setup();

    let data = Factory::real_time_file(&[(1_700_000_000, vec![Factory::real_time_record(1, 0, 0, 7)])]);
    assert!(matches!(OptimizerRealTimeDataFile::parse(&data), Err(Error::Decode(_))));
}

#[test]
fn system_information_v102() {
    common_setup();

    let data = Factory::system_information_file(
        "V102",
        &[
            Factory::system_information_record(1, 1, 3, "SN0001"),
            Factory::system_information_record(2, -1, 0xFFFF, "SN0002"),
        ],
    );

    let file = OptimizerSystemInformationDataFile::parse(&data).unwrap();
    assert_eq!(file.file_version.as_deref(), Some("V102"));
    assert_eq!(file.optimizers.len(), 2);

    let first = &file.optimizers[0];
    assert_eq!(first.optimizer_address, 1);
    assert_eq!(first.online_status, OptimizerOnlineStatus::Online);
    assert_eq!(first.string_number, 1);
    assert_eq!(first.position_in_current_string, Some(3));
    assert_eq!(first.sn, "SN0001");
    assert_eq!(first.software_version, "V100R001C00SPC115");
    assert_eq!(first.alias, "1.1");
    assert_eq!(first.model, "SUN2000-450W-P");
    assert_eq!(first.rated_power, None);

    let second = &file.optimizers[1];
    assert_eq!(second.string_number, -1);
    assert_eq!(second.position_in_current_string, None);
}

#[test]
fn system_information_v103() {
    common_setup();

    let data = Factory::system_information_file("V103", &[Factory::system_information_record(7, 2, 1, "SN0007")]);

    let file = OptimizerSystemInformationDataFile::parse(&data).unwrap();
    let optimizer = &file.optimizers[0];
    assert_eq!(optimizer.optimizer_address, 7);
    assert_eq!(optimizer.one_to_more, Some(true));
    assert_eq!(optimizer.rated_power, Some(450));
    assert_eq!(optimizer.cpu_type, Some(3));
}

#[test]
fn system_information_unknown_version() {
    common_setup();

    let data = Factory::system_information_file("V200", &[]);
    match OptimizerSystemInformationDataFile::parse(&data) {
        Err(Error::Decode(message)) => {
            assert_eq!(message, "Unsupported OptimizerSystemInformation file version: V200")
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn upload_spans_frames() {
    common_setup();

    let file: Vec<u8> = (0..250u32).map(|i| i as u8).collect();
    let mut device = Factory::device();
    device.files.insert(0x45, file.clone());
    let transport = MockTransport::new(device);
    let client = Factory::client(&transport).await;

    let data = client.get_file(0x45, None, None).await.unwrap();
    assert_eq!(data, file);

    let private = transport.device().requests_with(0x41);
    assert_eq!(private.len(), 1 + 3 + 1);
    assert_eq!(private[0].1, vec![0x41, 0x05, 1, 0x45]);
    assert_eq!(private[3].1, vec![0x41, 0x06, 3, 0x45, 0, 2]);
    assert_eq!(private[4].1, vec![0x41, 0x0C, 1, 0x45]);
}

#[tokio::test]
async fn upload_with_customized_data() {
    common_setup();

    let mut device = Factory::device();
    device.files.insert(0x44, vec![1, 2, 3]);
    let transport = MockTransport::new(device);
    let client = Factory::client(&transport).await;

    let query = OptimizerRealTimeDataFile::query_within_timespan(100, 700);
    client.get_file(0x44, Some(&query), None).await.unwrap();

    let private = transport.device().requests_with(0x41);
    let mut expected = vec![0x41, 0x05, 15, 0x44];
    expected.extend(&query);
    assert_eq!(private[0].1, expected);
}

#[tokio::test]
async fn empty_file() {
    common_setup();

    let mut device = Factory::device();
    device.files.insert(0x45, Vec::new());
    let transport = MockTransport::new(device);
    let client = Factory::client(&transport).await;

    assert!(client.get_file(0x45, None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn crc_mismatch_is_a_read_error() {
    common_setup();

    let mut device = Factory::device();
    device.files.insert(0x45, vec![0xde, 0xad, 0xbe, 0xef]);
    device.crc_override = Some(0x1234);
    let transport = MockTransport::new(device);
    let client = Factory::client(&transport).await;

    assert!(matches!(
        client.get_file(0x45, None, None).await,
        Err(Error::Read { .. })
    ));
}

#[tokio::test]
async fn missing_file_and_denied_upload() {
    common_setup();

    let transport = MockTransport::new(Factory::device());
    let client = Factory::client(&transport).await;

    assert!(matches!(
        client.get_file(0x45, None, None).await,
        Err(Error::Read {
            exception_code: Some(0x02),
            ..
        })
    ));

    transport.device().require_login = true;
    assert!(matches!(
        client.get_file(0x45, None, None).await,
        Err(Error::PermissionDenied)
    ));
}

#[tokio::test]
async fn file_too_large_for_frame_numbers() {
    common_setup();

    let mut device = Factory::device();
    device.files.insert(0x45, vec![0; 10]);
    // one byte more than 65536 frames of 100 bytes
    device.file_length_override = Some(65_536 * 100 + 1);
    let transport = MockTransport::new(device);
    let client = Factory::client(&transport).await;

    assert!(matches!(
        client.get_file(0x45, None, None).await,
        Err(Error::Read { .. })
    ));
    // rejected before any frame was requested
    assert_eq!(transport.device().requests_with(0x41).len(), 1);
}
