// Register names as used in the register table and in update results.

pub const MODEL_NAME: &str = "model_name";
pub const SERIAL_NUMBER: &str = "serial_number";
pub const PN: &str = "pn";
pub const MODEL_ID: &str = "model_id";
pub const NB_PV_STRINGS: &str = "nb_pv_strings";
pub const NB_MPP_TRACKS: &str = "nb_mpp_tracks";
pub const RATED_POWER: &str = "rated_power";
pub const P_MAX: &str = "P_max";
pub const S_MAX: &str = "S_max";
pub const Q_MAX_OUT: &str = "Q_max_out";
pub const Q_MAX_IN: &str = "Q_max_in";

pub const STATE_1: &str = "state_1";
pub const STATE_2: &str = "state_2";
pub const STATE_3: &str = "state_3";
pub const ALARM_1: &str = "alarm_1";
pub const ALARM_2: &str = "alarm_2";
pub const ALARM_3: &str = "alarm_3";

pub const INPUT_POWER: &str = "input_power";
pub const GRID_VOLTAGE: &str = "grid_voltage";
pub const LINE_VOLTAGE_A_B: &str = "line_voltage_A_B";
pub const LINE_VOLTAGE_B_C: &str = "line_voltage_B_C";
pub const LINE_VOLTAGE_C_A: &str = "line_voltage_C_A";
pub const PHASE_A_VOLTAGE: &str = "phase_A_voltage";
pub const PHASE_B_VOLTAGE: &str = "phase_B_voltage";
pub const PHASE_C_VOLTAGE: &str = "phase_C_voltage";
pub const GRID_CURRENT: &str = "grid_current";
pub const PHASE_A_CURRENT: &str = "phase_A_current";
pub const PHASE_B_CURRENT: &str = "phase_B_current";
pub const PHASE_C_CURRENT: &str = "phase_C_current";
pub const DAY_ACTIVE_POWER_PEAK: &str = "day_active_power_peak";
pub const ACTIVE_POWER: &str = "active_power";
pub const REACTIVE_POWER: &str = "reactive_power";
pub const POWER_FACTOR: &str = "power_factor";
pub const GRID_FREQUENCY: &str = "grid_frequency";
pub const EFFICIENCY: &str = "efficiency";
pub const INTERNAL_TEMPERATURE: &str = "internal_temperature";
pub const INSULATION_RESISTANCE: &str = "insulation_resistance";
pub const DEVICE_STATUS: &str = "device_status";
pub const FAULT_CODE: &str = "fault_code";
pub const STARTUP_TIME: &str = "startup_time";
pub const SHUTDOWN_TIME: &str = "shutdown_time";
pub const ACCUMULATED_YIELD_ENERGY: &str = "accumulated_yield_energy";
pub const UNKNOWN_TIME_1: &str = "unknown_time_1";
pub const DAILY_YIELD_ENERGY: &str = "daily_yield_energy";
pub const UNKNOWN_TIME_2: &str = "unknown_time_2";
pub const UNKNOWN_TIME_3: &str = "unknown_time_3";
pub const UNKNOWN_TIME_4: &str = "unknown_time_4";
pub const NB_OPTIMIZERS: &str = "nb_optimizers";
pub const NB_ONLINE_OPTIMIZERS: &str = "nb_online_optimizers";
pub const SYSTEM_TIME: &str = "system_time";
pub const SYSTEM_TIME_RAW: &str = "system_time_raw";
pub const UNKNOWN_TIME_5: &str = "unknown_time_5";
pub const STARTUP: &str = "startup";
pub const SHUTDOWN: &str = "shutdown";
pub const GRID_CODE: &str = "grid_code";
pub const TIME_ZONE: &str = "time_zone";

pub const MAX_NUMBER_OF_PV_STRINGS: u16 = 24;

pub fn pv_voltage(idx: u16) -> String {
    format!("pv_{:02}_voltage", idx)
}

pub fn pv_current(idx: u16) -> String {
    format!("pv_{:02}_current", idx)
}

// Storage
pub const STORAGE_UNIT_1_RUNNING_STATUS: &str = "storage_unit_1_running_status";
pub const STORAGE_UNIT_1_CHARGE_DISCHARGE_POWER: &str = "storage_unit_1_charge_discharge_power";
pub const STORAGE_UNIT_1_BUS_VOLTAGE: &str = "storage_unit_1_bus_voltage";
pub const STORAGE_UNIT_1_STATE_OF_CAPACITY: &str = "storage_unit_1_state_of_capacity";
pub const STORAGE_UNIT_1_WORKING_MODE_B: &str = "storage_unit_1_working_mode_b";
pub const STORAGE_UNIT_1_RATED_CHARGE_POWER: &str = "storage_unit_1_rated_charge_power";
pub const STORAGE_UNIT_1_RATED_DISCHARGE_POWER: &str = "storage_unit_1_rated_discharge_power";
pub const STORAGE_UNIT_1_FAULT_ID: &str = "storage_unit_1_fault_id";
pub const STORAGE_UNIT_1_CURRENT_DAY_CHARGE_CAPACITY: &str = "storage_unit_1_current_day_charge_capacity";
pub const STORAGE_UNIT_1_CURRENT_DAY_DISCHARGE_CAPACITY: &str =
    "storage_unit_1_current_day_discharge_capacity";
pub const STORAGE_UNIT_1_BUS_CURRENT: &str = "storage_unit_1_bus_current";
pub const STORAGE_UNIT_1_BATTERY_TEMPERATURE: &str = "storage_unit_1_battery_temperature";
pub const STORAGE_UNIT_1_REMAINING_CHARGE_DIS_CHARGE_TIME: &str =
    "storage_unit_1_remaining_charge_dis_charge_time";
pub const STORAGE_UNIT_1_DCDC_VERSION: &str = "storage_unit_1_dcdc_version";
pub const STORAGE_UNIT_1_BMS_VERSION: &str = "storage_unit_1_bms_version";
pub const STORAGE_MAXIMUM_CHARGE_POWER: &str = "storage_maximum_charge_power";
pub const STORAGE_MAXIMUM_DISCHARGE_POWER: &str = "storage_maximum_discharge_power";
pub const STORAGE_UNIT_1_SERIAL_NUMBER: &str = "storage_unit_1_serial_number";
pub const STORAGE_UNIT_1_TOTAL_CHARGE: &str = "storage_unit_1_total_charge";
pub const STORAGE_UNIT_1_TOTAL_DISCHARGE: &str = "storage_unit_1_total_discharge";
pub const STORAGE_UNIT_2_SERIAL_NUMBER: &str = "storage_unit_2_serial_number";
pub const STORAGE_UNIT_2_STATE_OF_CAPACITY: &str = "storage_unit_2_state_of_capacity";
pub const STORAGE_UNIT_2_RUNNING_STATUS: &str = "storage_unit_2_running_status";
pub const STORAGE_UNIT_2_CHARGE_DISCHARGE_POWER: &str = "storage_unit_2_charge_discharge_power";
pub const STORAGE_UNIT_2_CURRENT_DAY_CHARGE_CAPACITY: &str = "storage_unit_2_current_day_charge_capacity";
pub const STORAGE_UNIT_2_CURRENT_DAY_DISCHARGE_CAPACITY: &str =
    "storage_unit_2_current_day_discharge_capacity";
pub const STORAGE_UNIT_2_BUS_VOLTAGE: &str = "storage_unit_2_bus_voltage";
pub const STORAGE_UNIT_2_BUS_CURRENT: &str = "storage_unit_2_bus_current";
pub const STORAGE_UNIT_2_BATTERY_TEMPERATURE: &str = "storage_unit_2_battery_temperature";
pub const STORAGE_UNIT_2_TOTAL_CHARGE: &str = "storage_unit_2_total_charge";
pub const STORAGE_UNIT_2_TOTAL_DISCHARGE: &str = "storage_unit_2_total_discharge";
pub const STORAGE_RATED_CAPACITY: &str = "storage_rated_capacity";
pub const STORAGE_STATE_OF_CAPACITY: &str = "storage_state_of_capacity";
pub const STORAGE_RUNNING_STATUS: &str = "storage_running_status";
pub const STORAGE_BUS_VOLTAGE: &str = "storage_bus_voltage";
pub const STORAGE_BUS_CURRENT: &str = "storage_bus_current";
pub const STORAGE_CHARGE_DISCHARGE_POWER: &str = "storage_charge_discharge_power";
pub const STORAGE_TOTAL_CHARGE: &str = "storage_total_charge";
pub const STORAGE_TOTAL_DISCHARGE: &str = "storage_total_discharge";
pub const STORAGE_CURRENT_DAY_CHARGE_CAPACITY: &str = "storage_current_day_charge_capacity";
pub const STORAGE_CURRENT_DAY_DISCHARGE_CAPACITY: &str = "storage_current_day_discharge_capacity";
pub const STORAGE_UNIT_2_SOFTWARE_VERSION: &str = "storage_unit_2_software_version";
pub const STORAGE_UNIT_1_SOFTWARE_VERSION: &str = "storage_unit_1_software_version";

pub const STORAGE_UNIT_1_PRODUCT_MODEL: &str = "storage_unit_1_product_model";
pub const STORAGE_WORKING_MODE_A: &str = "storage_working_mode_a";
pub const STORAGE_TIME_OF_USE_PRICE: &str = "storage_time_of_use_price";
pub const STORAGE_LG_RESU_TIME_OF_USE_CHARGING_AND_DISCHARGING_PERIODS: &str =
    "storage_lg_resu_time_of_use_charging_and_discharging_periods";
pub const STORAGE_LCOE: &str = "storage_lcoe";
pub const STORAGE_MAXIMUM_CHARGING_POWER: &str = "storage_maximum_charging_power";
pub const STORAGE_MAXIMUM_DISCHARGING_POWER: &str = "storage_maximum_discharging_power";
pub const STORAGE_POWER_LIMIT_GRID_TIED_POINT: &str = "storage_power_limit_grid_tied_point";
pub const STORAGE_CHARGING_CUTOFF_CAPACITY: &str = "storage_charging_cutoff_capacity";
pub const STORAGE_DISCHARGING_CUTOFF_CAPACITY: &str = "storage_discharging_cutoff_capacity";
pub const STORAGE_FORCED_CHARGING_AND_DISCHARGING_PERIOD: &str =
    "storage_forced_charging_and_discharging_period";
pub const STORAGE_FORCED_CHARGING_AND_DISCHARGING_POWER: &str =
    "storage_forced_charging_and_discharging_power";
pub const STORAGE_WORKING_MODE_SETTINGS: &str = "storage_working_mode_settings";
pub const STORAGE_CHARGE_FROM_GRID_FUNCTION: &str = "storage_charge_from_grid_function";
pub const STORAGE_GRID_CHARGE_CUTOFF_STATE_OF_CHARGE: &str = "storage_grid_charge_cutoff_state_of_charge";
pub const STORAGE_UNIT_2_PRODUCT_MODEL: &str = "storage_unit_2_product_model";
pub const STORAGE_FORCIBLE_CHARGE_DISCHARGE_WRITE: &str = "storage_forcible_charge_discharge_write";
pub const STORAGE_FORCIBLE_CHARGE_DISCHARGE_SOC: &str = "storage_forcible_charge_discharge_soc";
pub const STORAGE_BACKUP_POWER_STATE_OF_CHARGE: &str = "storage_backup_power_state_of_charge";
pub const STORAGE_UNIT_1_NO: &str = "storage_unit_1_no";
pub const STORAGE_UNIT_2_NO: &str = "storage_unit_2_no";
pub const STORAGE_FIXED_CHARGING_AND_DISCHARGING_PERIODS: &str =
    "storage_fixed_charging_and_discharging_periods";
pub const STORAGE_POWER_OF_CHARGE_FROM_GRID: &str = "storage_power_of_charge_from_grid";
pub const STORAGE_MAXIMUM_POWER_OF_CHARGE_FROM_GRID: &str = "storage_maximum_power_of_charge_from_grid";
pub const STORAGE_FORCIBLE_CHARGE_DISCHARGE_SETTING_MODE: &str =
    "storage_forcible_charge_discharge_setting_mode";
pub const STORAGE_FORCIBLE_CHARGE_POWER: &str = "storage_forcible_charge_power";
pub const STORAGE_FORCIBLE_DISCHARGE_POWER: &str = "storage_forcible_discharge_power";
pub const STORAGE_HUAWEI_LUNA2000_TIME_OF_USE_CHARGING_AND_DISCHARGING_PERIODS: &str =
    "storage_huawei_luna2000_time_of_use_charging_and_discharging_periods";
pub const STORAGE_EXCESS_PV_ENERGY_USE_IN_TOU: &str = "storage_excess_pv_energy_use_in_tou";
pub const ACTIVE_POWER_CONTROL_MODE: &str = "active_power_control_mode";
pub const MAXIMUM_FEED_GRID_POWER_WATT: &str = "maximum_feed_grid_power_watt";
pub const MAXIMUM_FEED_GRID_POWER_PERCENT: &str = "maximum_feed_grid_power_percent";
pub const BACKUP_SWITCH_TO_OFF_GRID: &str = "backup_switch_to_off_grid";
pub const BACKUP_VOLTAGE_INDEPENDENT_OPERATION: &str = "backup_voltage_independent_operation";

// Capacity control
pub const STORAGE_CAPACITY_CONTROL_MODE: &str = "storage_capacity_control_mode";
pub const STORAGE_CAPACITY_CONTROL_SOC_PEAK_SHAVING: &str = "storage_capacity_control_soc_peak_shaving";
pub const STORAGE_CAPACITY_CONTROL_PERIODS: &str = "storage_capacity_control_periods";

// Power meter
pub const METER_STATUS: &str = "meter_status";
pub const GRID_A_VOLTAGE: &str = "grid_A_voltage";
pub const GRID_B_VOLTAGE: &str = "grid_B_voltage";
pub const GRID_C_VOLTAGE: &str = "grid_C_voltage";
pub const ACTIVE_GRID_A_CURRENT: &str = "active_grid_A_current";
pub const ACTIVE_GRID_B_CURRENT: &str = "active_grid_B_current";
pub const ACTIVE_GRID_C_CURRENT: &str = "active_grid_C_current";
pub const POWER_METER_ACTIVE_POWER: &str = "power_meter_active_power";
pub const POWER_METER_REACTIVE_POWER: &str = "power_meter_reactive_power";
pub const ACTIVE_GRID_POWER_FACTOR: &str = "active_grid_power_factor";
pub const ACTIVE_GRID_FREQUENCY: &str = "active_grid_frequency";
pub const GRID_EXPORTED_ENERGY: &str = "grid_exported_energy";
pub const GRID_ACCUMULATED_ENERGY: &str = "grid_accumulated_energy";
pub const GRID_ACCUMULATED_REACTIVE_POWER: &str = "grid_accumulated_reactive_power";
pub const METER_TYPE: &str = "meter_type";
pub const ACTIVE_GRID_A_B_VOLTAGE: &str = "active_grid_A_B_voltage";
pub const ACTIVE_GRID_B_C_VOLTAGE: &str = "active_grid_B_C_voltage";
pub const ACTIVE_GRID_C_A_VOLTAGE: &str = "active_grid_C_A_voltage";
pub const ACTIVE_GRID_A_POWER: &str = "active_grid_A_power";
pub const ACTIVE_GRID_B_POWER: &str = "active_grid_B_power";
pub const ACTIVE_GRID_C_POWER: &str = "active_grid_C_power";
