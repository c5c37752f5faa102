use std::collections::HashMap;
use std::sync::OnceLock;

use super::names as rn;
use super::values::{self as rv, *};
use super::{
    ChargeDischarge, I32Absolute, PeakSettings, RegisterDefinition, Str, TimeOfUse, Timestamp, Unit, I16, I32, U16,
    U32,
};

fn string(address: u16, length: u16) -> RegisterDefinition {
    RegisterDefinition::new(address, length, Str.into())
}

fn uint16(address: u16, unit: Unit, gain: u32) -> RegisterDefinition {
    RegisterDefinition::new(address, 1, U16::default().into())
        .with_unit(unit)
        .with_gain(gain)
}

fn uint32(address: u16, unit: Unit, gain: u32) -> RegisterDefinition {
    RegisterDefinition::new(address, 2, U32.into()).with_unit(unit).with_gain(gain)
}

fn int16(address: u16, unit: Unit, gain: u32) -> RegisterDefinition {
    RegisterDefinition::new(address, 1, I16.into()).with_unit(unit).with_gain(gain)
}

fn int32(address: u16, unit: Unit, gain: u32) -> RegisterDefinition {
    RegisterDefinition::new(address, 2, I32.into()).with_unit(unit).with_gain(gain)
}

fn timestamp(address: u16) -> RegisterDefinition {
    RegisterDefinition::new(address, 2, Timestamp.into())
}

fn bits(address: u16, table: &'static [(u32, BitLabel)]) -> RegisterDefinition {
    uint16(address, Unit::Bits(table), 1)
}

fn alarms(address: u16, table: &'static [(u32, BitLabel)]) -> RegisterDefinition {
    RegisterDefinition::new(address, 1, U16 { ignore_invalid: true }.into()).with_unit(Unit::Bits(table))
}

use Unit::{Label as L, None as N};

fn inverter_registers() -> Vec<(String, RegisterDefinition)> {
    let mut registers = vec![
        (rn::MODEL_NAME, string(30000, 15)),
        (rn::SERIAL_NUMBER, string(30015, 10)),
        (rn::PN, string(30025, 10)),
        (rn::MODEL_ID, uint16(30070, N, 1)),
        (rn::NB_PV_STRINGS, uint16(30071, N, 1)),
        (rn::NB_MPP_TRACKS, uint16(30072, N, 1)),
        (rn::RATED_POWER, uint32(30073, L("W"), 1)),
        (rn::P_MAX, uint32(30075, L("W"), 1)),
        (rn::S_MAX, uint32(30077, L("VA"), 1)),
        (rn::Q_MAX_OUT, int32(30079, L("VAr"), 1)),
        (rn::Q_MAX_IN, int32(30081, L("VAr"), 1)),
        (rn::STATE_1, bits(32000, rv::STATE_CODES_1)),
        (rn::STATE_2, bits(32002, rv::STATE_CODES_2)),
        (
            rn::STATE_3,
            uint32(32003, Unit::Bits(rv::STATE_CODES_3), 1),
        ),
        (rn::ALARM_1, alarms(32008, rv::ALARM_CODES_1)),
        (rn::ALARM_2, alarms(32009, rv::ALARM_CODES_2)),
        (rn::ALARM_3, bits(32010, rv::ALARM_CODES_3)),
        (rn::INPUT_POWER, int32(32064, L("W"), 1)),
        (rn::GRID_VOLTAGE, uint16(32066, L("V"), 10)),
        (rn::LINE_VOLTAGE_A_B, uint16(32066, L("V"), 10)),
        (rn::LINE_VOLTAGE_B_C, uint16(32067, L("V"), 10)),
        (rn::LINE_VOLTAGE_C_A, uint16(32068, L("V"), 10)),
        (rn::PHASE_A_VOLTAGE, uint16(32069, L("V"), 10)),
        (rn::PHASE_B_VOLTAGE, uint16(32070, L("V"), 10)),
        (rn::PHASE_C_VOLTAGE, uint16(32071, L("V"), 10)),
        (rn::GRID_CURRENT, int32(32072, L("A"), 1000)),
        (rn::PHASE_A_CURRENT, int32(32072, L("A"), 1000)),
        (rn::PHASE_B_CURRENT, int32(32074, L("A"), 1000)),
        (rn::PHASE_C_CURRENT, int32(32076, L("A"), 1000)),
        (rn::DAY_ACTIVE_POWER_PEAK, int32(32078, L("W"), 1)),
        (rn::ACTIVE_POWER, int32(32080, L("W"), 1)),
        (rn::REACTIVE_POWER, int32(32082, L("VA"), 1)),
        (rn::POWER_FACTOR, int16(32084, N, 1000)),
        (rn::GRID_FREQUENCY, uint16(32085, L("Hz"), 100)),
        (rn::EFFICIENCY, uint16(32086, L("%"), 100)),
        (rn::INTERNAL_TEMPERATURE, int16(32087, L("°C"), 10)),
        (rn::INSULATION_RESISTANCE, uint16(32088, L("MOhm"), 100)),
        (
            rn::DEVICE_STATUS,
            uint16(32089, Unit::Lookup(rv::DEVICE_STATUS_DEFINITIONS), 1),
        ),
        (rn::FAULT_CODE, uint16(32090, N, 1)),
        (rn::STARTUP_TIME, timestamp(32091)),
        (rn::SHUTDOWN_TIME, timestamp(32093)),
        (rn::ACCUMULATED_YIELD_ENERGY, uint32(32106, L("kWh"), 100)),
        (rn::UNKNOWN_TIME_1, timestamp(32110)),
        (rn::DAILY_YIELD_ENERGY, uint32(32114, L("kWh"), 100)),
        (rn::UNKNOWN_TIME_2, timestamp(32156)),
        (rn::UNKNOWN_TIME_3, timestamp(32160)),
        (rn::UNKNOWN_TIME_4, timestamp(35113)),
        (rn::NB_OPTIMIZERS, uint16(37200, N, 1)),
        (rn::NB_ONLINE_OPTIMIZERS, uint16(37201, N, 1)),
        (rn::SYSTEM_TIME, timestamp(40000)),
        (rn::SYSTEM_TIME_RAW, uint32(40000, L("seconds"), 1)),
        (rn::UNKNOWN_TIME_5, timestamp(40500)),
        (rn::STARTUP, uint16(40200, N, 1).write_only()),
        (rn::SHUTDOWN, uint16(40201, N, 1).write_only()),
        (rn::GRID_CODE, uint16(42000, Unit::GridCode, 1)),
        (rn::TIME_ZONE, int16(43006, L("min"), 1).writeable()),
    ]
    .into_iter()
    .map(|(name, def)| (name.to_string(), def))
    .collect::<Vec<_>>();

    for idx in 1..=rn::MAX_NUMBER_OF_PV_STRINGS {
        let offset = 2 * (idx - 1);
        registers.push((rn::pv_voltage(idx), int16(32016 + offset, L("V"), 10)));
        registers.push((rn::pv_current(idx), int16(32017 + offset, L("A"), 100)));
    }

    registers
}

fn battery_registers() -> Vec<(&'static str, RegisterDefinition)> {
    let status = Unit::Enum(StorageStatus::lookup);
    let model = Unit::Enum(StorageProductModel::lookup);

    vec![
        (rn::STORAGE_UNIT_1_RUNNING_STATUS, uint16(37000, status, 1)),
        (rn::STORAGE_UNIT_1_CHARGE_DISCHARGE_POWER, int32(37001, L("W"), 1)),
        (rn::STORAGE_UNIT_1_BUS_VOLTAGE, uint16(37003, L("V"), 10)),
        (rn::STORAGE_UNIT_1_STATE_OF_CAPACITY, uint16(37004, L("%"), 10)),
        (
            rn::STORAGE_UNIT_1_WORKING_MODE_B,
            uint16(37006, Unit::Enum(StorageWorkingModesB::lookup), 1),
        ),
        (rn::STORAGE_UNIT_1_RATED_CHARGE_POWER, uint32(37007, L("W"), 1)),
        (rn::STORAGE_UNIT_1_RATED_DISCHARGE_POWER, uint32(37009, L("W"), 1)),
        (rn::STORAGE_UNIT_1_FAULT_ID, uint16(37014, N, 1)),
        (rn::STORAGE_UNIT_1_CURRENT_DAY_CHARGE_CAPACITY, uint32(37015, L("kWh"), 100)),
        (rn::STORAGE_UNIT_1_CURRENT_DAY_DISCHARGE_CAPACITY, uint32(37017, L("kWh"), 100)),
        (rn::STORAGE_UNIT_1_BUS_CURRENT, int16(37021, L("A"), 10)),
        (rn::STORAGE_UNIT_1_BATTERY_TEMPERATURE, int16(37022, L("°C"), 10)),
        (rn::STORAGE_UNIT_1_REMAINING_CHARGE_DIS_CHARGE_TIME, uint16(37025, L("min"), 1)),
        (rn::STORAGE_UNIT_1_DCDC_VERSION, string(37026, 10)),
        (rn::STORAGE_UNIT_1_BMS_VERSION, string(37036, 10)),
        (rn::STORAGE_MAXIMUM_CHARGE_POWER, uint32(37046, L("W"), 1)),
        (rn::STORAGE_MAXIMUM_DISCHARGE_POWER, uint32(37048, L("W"), 1)),
        (rn::STORAGE_UNIT_1_SERIAL_NUMBER, string(37052, 10)),
        (rn::STORAGE_UNIT_1_TOTAL_CHARGE, uint32(37066, L("kWh"), 100)),
        (rn::STORAGE_UNIT_1_TOTAL_DISCHARGE, uint32(37068, L("kWh"), 100)),
        (rn::STORAGE_UNIT_2_SERIAL_NUMBER, string(37700, 10)),
        (rn::STORAGE_UNIT_2_STATE_OF_CAPACITY, uint16(37738, L("%"), 10)),
        (rn::STORAGE_UNIT_2_RUNNING_STATUS, uint16(37741, status, 1)),
        (rn::STORAGE_UNIT_2_CHARGE_DISCHARGE_POWER, int32(37743, L("W"), 1)),
        (rn::STORAGE_UNIT_2_CURRENT_DAY_CHARGE_CAPACITY, uint32(37746, L("kWh"), 100)),
        (rn::STORAGE_UNIT_2_CURRENT_DAY_DISCHARGE_CAPACITY, uint32(37748, L("kWh"), 100)),
        (rn::STORAGE_UNIT_2_BUS_VOLTAGE, uint16(37750, L("V"), 10)),
        (rn::STORAGE_UNIT_2_BUS_CURRENT, int16(37751, L("A"), 10)),
        (rn::STORAGE_UNIT_2_BATTERY_TEMPERATURE, int16(37752, L("°C"), 10)),
        (rn::STORAGE_UNIT_2_TOTAL_CHARGE, uint32(37753, L("kWh"), 100)),
        (rn::STORAGE_UNIT_2_TOTAL_DISCHARGE, uint32(37755, L("kWh"), 100)),
        (rn::STORAGE_RATED_CAPACITY, uint32(37758, L("Wh"), 1)),
        (rn::STORAGE_STATE_OF_CAPACITY, uint16(37760, L("%"), 10)),
        (rn::STORAGE_RUNNING_STATUS, uint16(37762, status, 1)),
        (rn::STORAGE_BUS_VOLTAGE, uint16(37763, L("V"), 10)),
        (rn::STORAGE_BUS_CURRENT, int16(37764, L("A"), 10)),
        (rn::STORAGE_CHARGE_DISCHARGE_POWER, int32(37765, L("W"), 1)),
        (rn::STORAGE_TOTAL_CHARGE, uint32(37780, L("kWh"), 100)),
        (rn::STORAGE_TOTAL_DISCHARGE, uint32(37782, L("kWh"), 100)),
        (rn::STORAGE_CURRENT_DAY_CHARGE_CAPACITY, uint32(37784, L("kWh"), 100)),
        (rn::STORAGE_CURRENT_DAY_DISCHARGE_CAPACITY, uint32(37786, L("kWh"), 100)),
        (rn::STORAGE_UNIT_2_SOFTWARE_VERSION, string(37799, 15)),
        (rn::STORAGE_UNIT_1_SOFTWARE_VERSION, string(37814, 15)),
        (rn::STORAGE_UNIT_1_PRODUCT_MODEL, uint16(47000, model, 1)),
        (
            rn::STORAGE_WORKING_MODE_A,
            int16(47004, Unit::Enum(StorageWorkingModesA::lookup), 1),
        ),
        (rn::STORAGE_TIME_OF_USE_PRICE, int16(47027, Unit::Bool, 1)),
        (
            rn::STORAGE_LG_RESU_TIME_OF_USE_CHARGING_AND_DISCHARGING_PERIODS,
            RegisterDefinition::new(47028, 41, TimeOfUse.into()).writeable(),
        ),
        (rn::STORAGE_LCOE, uint32(47069, N, 1000)),
        (rn::STORAGE_MAXIMUM_CHARGING_POWER, uint32(47075, L("W"), 1).writeable()),
        (rn::STORAGE_MAXIMUM_DISCHARGING_POWER, uint32(47077, L("W"), 1).writeable()),
        (rn::STORAGE_POWER_LIMIT_GRID_TIED_POINT, int32(47079, L("W"), 1)),
        (rn::STORAGE_CHARGING_CUTOFF_CAPACITY, uint16(47081, L("%"), 10).writeable()),
        (rn::STORAGE_DISCHARGING_CUTOFF_CAPACITY, uint16(47082, L("%"), 10).writeable()),
        (
            rn::STORAGE_FORCED_CHARGING_AND_DISCHARGING_PERIOD,
            uint16(47083, L("min"), 1).writeable(),
        ),
        (rn::STORAGE_FORCED_CHARGING_AND_DISCHARGING_POWER, int32(47084, L("W"), 1)),
        (
            rn::STORAGE_WORKING_MODE_SETTINGS,
            uint16(47086, Unit::Enum(StorageWorkingModesC::lookup), 1).writeable(),
        ),
        (rn::STORAGE_CHARGE_FROM_GRID_FUNCTION, uint16(47087, Unit::Bool, 1).writeable()),
        (rn::STORAGE_GRID_CHARGE_CUTOFF_STATE_OF_CHARGE, uint16(47088, L("%"), 10).writeable()),
        (rn::STORAGE_UNIT_2_PRODUCT_MODEL, uint16(47089, model, 1)),
        (
            rn::STORAGE_FORCIBLE_CHARGE_DISCHARGE_WRITE,
            uint16(47100, Unit::Enum(StorageForcibleChargeDischarge::lookup), 1).writeable(),
        ),
        (rn::STORAGE_FORCIBLE_CHARGE_DISCHARGE_SOC, uint16(47101, L("%"), 10).writeable()),
        (rn::STORAGE_BACKUP_POWER_STATE_OF_CHARGE, uint16(47102, L("%"), 10).writeable()),
        (rn::STORAGE_UNIT_1_NO, uint16(47107, N, 1)),
        (rn::STORAGE_UNIT_2_NO, uint16(47108, N, 1)),
        (
            rn::STORAGE_FIXED_CHARGING_AND_DISCHARGING_PERIODS,
            RegisterDefinition::new(47200, 41, ChargeDischarge.into()).writeable(),
        ),
        (rn::STORAGE_POWER_OF_CHARGE_FROM_GRID, uint32(47242, L("W"), 1).writeable()),
        (rn::STORAGE_MAXIMUM_POWER_OF_CHARGE_FROM_GRID, uint32(47244, L("W"), 1).writeable()),
        (rn::STORAGE_FORCIBLE_CHARGE_DISCHARGE_SETTING_MODE, uint16(47246, N, 1).writeable()),
        (rn::STORAGE_FORCIBLE_CHARGE_POWER, uint32(47247, N, 1).writeable()),
        (rn::STORAGE_FORCIBLE_DISCHARGE_POWER, uint32(47249, N, 1).writeable()),
        (
            rn::STORAGE_HUAWEI_LUNA2000_TIME_OF_USE_CHARGING_AND_DISCHARGING_PERIODS,
            RegisterDefinition::new(47255, 43, TimeOfUse.into()).writeable(),
        ),
        (
            rn::STORAGE_EXCESS_PV_ENERGY_USE_IN_TOU,
            uint16(47299, Unit::Enum(StorageExcessPvEnergyUseInTou::lookup), 1).writeable(),
        ),
        (
            rn::ACTIVE_POWER_CONTROL_MODE,
            uint16(47415, Unit::Enum(ActivePowerControlMode::lookup), 1).writeable(),
        ),
        (rn::MAXIMUM_FEED_GRID_POWER_WATT, int32(47416, L("W"), 1).writeable()),
        (rn::MAXIMUM_FEED_GRID_POWER_PERCENT, int16(47418, L("%"), 10).writeable()),
        (rn::BACKUP_SWITCH_TO_OFF_GRID, uint16(47604, N, 1).writeable()),
        (
            rn::BACKUP_VOLTAGE_INDEPENDENT_OPERATION,
            uint16(47604, Unit::Enum(BackupVoltageIndependentOperation::lookup), 1).writeable(),
        ),
    ]
}

fn capacity_control_registers() -> Vec<(&'static str, RegisterDefinition)> {
    vec![
        (
            rn::STORAGE_CAPACITY_CONTROL_MODE,
            uint16(47954, Unit::Enum(StorageCapacityControlMode::lookup), 1).writeable(),
        ),
        (rn::STORAGE_CAPACITY_CONTROL_SOC_PEAK_SHAVING, uint16(47955, L("%"), 10).writeable()),
        (
            rn::STORAGE_CAPACITY_CONTROL_PERIODS,
            RegisterDefinition::new(47956, 64, PeakSettings.into()).writeable(),
        ),
    ]
}

/// Registers served by the external power meter.
pub static METER_REGISTERS: &[&str] = &[
    rn::METER_STATUS,
    rn::GRID_A_VOLTAGE,
    rn::GRID_B_VOLTAGE,
    rn::GRID_C_VOLTAGE,
    rn::ACTIVE_GRID_A_CURRENT,
    rn::ACTIVE_GRID_B_CURRENT,
    rn::ACTIVE_GRID_C_CURRENT,
    rn::POWER_METER_ACTIVE_POWER,
    rn::POWER_METER_REACTIVE_POWER,
    rn::ACTIVE_GRID_POWER_FACTOR,
    rn::ACTIVE_GRID_FREQUENCY,
    rn::GRID_EXPORTED_ENERGY,
    rn::GRID_ACCUMULATED_ENERGY,
    rn::GRID_ACCUMULATED_REACTIVE_POWER,
    rn::METER_TYPE,
    rn::ACTIVE_GRID_A_B_VOLTAGE,
    rn::ACTIVE_GRID_B_C_VOLTAGE,
    rn::ACTIVE_GRID_C_A_VOLTAGE,
    rn::ACTIVE_GRID_A_POWER,
    rn::ACTIVE_GRID_B_POWER,
    rn::ACTIVE_GRID_C_POWER,
];

fn meter_registers() -> Vec<(&'static str, RegisterDefinition)> {
    vec![
        (rn::METER_STATUS, uint16(37100, Unit::Enum(MeterStatus::lookup), 1)),
        (rn::GRID_A_VOLTAGE, int32(37101, L("V"), 10)),
        (rn::GRID_B_VOLTAGE, int32(37103, L("V"), 10)),
        (rn::GRID_C_VOLTAGE, int32(37105, L("V"), 10)),
        (rn::ACTIVE_GRID_A_CURRENT, int32(37107, L("I"), 100)),
        (rn::ACTIVE_GRID_B_CURRENT, int32(37109, L("I"), 100)),
        (rn::ACTIVE_GRID_C_CURRENT, int32(37111, L("I"), 100)),
        (rn::POWER_METER_ACTIVE_POWER, int32(37113, L("W"), 1)),
        (rn::POWER_METER_REACTIVE_POWER, int32(37115, L("Var"), 1)),
        (rn::ACTIVE_GRID_POWER_FACTOR, int16(37117, N, 1000)),
        (rn::ACTIVE_GRID_FREQUENCY, int16(37118, L("Hz"), 100)),
        (
            rn::GRID_EXPORTED_ENERGY,
            RegisterDefinition::new(37119, 2, I32Absolute.into())
                .with_unit(L("kWh"))
                .with_gain(100),
        ),
        (rn::GRID_ACCUMULATED_ENERGY, int32(37121, L("kWh"), 100)),
        (rn::GRID_ACCUMULATED_REACTIVE_POWER, int32(37123, L("kVarh"), 100)),
        (rn::METER_TYPE, uint16(37125, Unit::Enum(MeterType::lookup), 1)),
        (rn::ACTIVE_GRID_A_B_VOLTAGE, int32(37126, L("V"), 10)),
        (rn::ACTIVE_GRID_B_C_VOLTAGE, int32(37128, L("V"), 10)),
        (rn::ACTIVE_GRID_C_A_VOLTAGE, int32(37130, L("V"), 10)),
        (rn::ACTIVE_GRID_A_POWER, int32(37132, L("W"), 1)),
        (rn::ACTIVE_GRID_B_POWER, int32(37134, L("W"), 1)),
        (rn::ACTIVE_GRID_C_POWER, int32(37136, L("W"), 1)),
    ]
}

fn registers() -> &'static HashMap<String, RegisterDefinition> {
    static REGISTERS: OnceLock<HashMap<String, RegisterDefinition>> = OnceLock::new();
    REGISTERS.get_or_init(|| {
        let mut registers: HashMap<String, RegisterDefinition> = inverter_registers().into_iter().collect();
        registers.extend(
            battery_registers()
                .into_iter()
                .chain(capacity_control_registers())
                .chain(meter_registers())
                .map(|(name, def)| (name.to_string(), def)),
        );
        registers
    })
}

pub fn get(name: &str) -> Option<&'static RegisterDefinition> {
    registers().get(name)
}

pub fn is_meter_register(name: &str) -> bool {
    METER_REGISTERS.iter().any(|meter| *meter == name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    registers().keys().map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pv_string_addresses() {
        assert_eq!(get("pv_01_voltage").unwrap().address, 32016);
        assert_eq!(get("pv_01_current").unwrap().address, 32017);
        assert_eq!(get("pv_24_current").unwrap().address, 32063);
        assert!(get("pv_25_voltage").is_none());
    }

    #[test]
    fn write_only_registers() {
        let startup = get(rn::STARTUP).unwrap();
        assert!(startup.writeable);
        assert!(!startup.readable);
        assert!(get(rn::TIME_ZONE).unwrap().writeable);
        assert!(!get(rn::MODEL_NAME).unwrap().writeable);
    }

    #[test]
    fn meter_registers_are_in_the_table() {
        for name in METER_REGISTERS {
            assert!(get(name).is_some(), "{} missing", name);
        }
    }

    #[test]
    fn schedule_register_lengths() {
        assert_eq!(get(rn::STORAGE_CAPACITY_CONTROL_PERIODS).unwrap().length, 64);
        assert_eq!(
            get(rn::STORAGE_HUAWEI_LUNA2000_TIME_OF_USE_CHARGING_AND_DISCHARGING_PERIODS)
                .unwrap()
                .length,
            43
        );
    }
}
