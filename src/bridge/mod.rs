pub mod groups;
pub mod heartbeat;

use crate::prelude::*;

use {
    serde::Serialize,
    std::collections::HashMap,
    std::sync::{Arc, PoisonError},
    std::time::Duration,
    tokio::sync::Mutex,
};

use crate::error::Result;
use crate::files::{
    OptimizerRealTimeData, OptimizerRealTimeDataFile, OptimizerSystemInformation, OptimizerSystemInformationDataFile,
};
use crate::register::table;
use crate::register::values::{MeterStatus, MeterType, StorageProductModel};
use heartbeat::{Heartbeat, HeartbeatState, HEARTBEAT_INTERVAL_SECS};

const SUPPORTED_MODEL_PREFIX: &str = "SUN2000";
const OPTIMIZER_DATA_WINDOW_SECS: u32 = 600;

// {{{ register sets
const INVERTER_REGISTERS: &[&str] = &[
    rn::STATE_1,
    rn::STATE_2,
    rn::STATE_3,
    rn::ALARM_1,
    rn::ALARM_2,
    rn::ALARM_3,
    rn::INPUT_POWER,
    rn::LINE_VOLTAGE_A_B,
    rn::LINE_VOLTAGE_B_C,
    rn::LINE_VOLTAGE_C_A,
    rn::PHASE_A_VOLTAGE,
    rn::PHASE_B_VOLTAGE,
    rn::PHASE_C_VOLTAGE,
    rn::PHASE_A_CURRENT,
    rn::PHASE_B_CURRENT,
    rn::PHASE_C_CURRENT,
    rn::DAY_ACTIVE_POWER_PEAK,
    rn::ACTIVE_POWER,
    rn::REACTIVE_POWER,
    rn::POWER_FACTOR,
    rn::GRID_FREQUENCY,
    rn::EFFICIENCY,
    rn::INTERNAL_TEMPERATURE,
    rn::INSULATION_RESISTANCE,
    rn::DEVICE_STATUS,
    rn::FAULT_CODE,
    rn::STARTUP_TIME,
    rn::SHUTDOWN_TIME,
    rn::ACCUMULATED_YIELD_ENERGY,
    rn::DAILY_YIELD_ENERGY,
];

const OPTIMIZER_REGISTERS: &[&str] = &[rn::NB_OPTIMIZERS, rn::NB_ONLINE_OPTIMIZERS];

const STORAGE_REGISTERS: &[&str] = &[
    rn::STORAGE_STATE_OF_CAPACITY,
    rn::STORAGE_RUNNING_STATUS,
    rn::STORAGE_BUS_VOLTAGE,
    rn::STORAGE_BUS_CURRENT,
    rn::STORAGE_CHARGE_DISCHARGE_POWER,
    rn::STORAGE_TOTAL_CHARGE,
    rn::STORAGE_TOTAL_DISCHARGE,
    rn::STORAGE_CURRENT_DAY_CHARGE_CAPACITY,
    rn::STORAGE_CURRENT_DAY_DISCHARGE_CAPACITY,
    rn::STORAGE_MAXIMUM_CHARGING_POWER,
    rn::STORAGE_MAXIMUM_DISCHARGING_POWER,
    rn::STORAGE_CHARGING_CUTOFF_CAPACITY,
    rn::STORAGE_DISCHARGING_CUTOFF_CAPACITY,
    rn::STORAGE_WORKING_MODE_SETTINGS,
    rn::STORAGE_CHARGE_FROM_GRID_FUNCTION,
    rn::STORAGE_GRID_CHARGE_CUTOFF_STATE_OF_CHARGE,
    rn::STORAGE_BACKUP_POWER_STATE_OF_CHARGE,
];

const STORAGE_UNIT_1_REGISTERS: &[&str] = &[
    rn::STORAGE_UNIT_1_RUNNING_STATUS,
    rn::STORAGE_UNIT_1_CHARGE_DISCHARGE_POWER,
    rn::STORAGE_UNIT_1_STATE_OF_CAPACITY,
    rn::STORAGE_UNIT_1_BATTERY_TEMPERATURE,
];

const STORAGE_UNIT_2_REGISTERS: &[&str] = &[
    rn::STORAGE_UNIT_2_STATE_OF_CAPACITY,
    rn::STORAGE_UNIT_2_RUNNING_STATUS,
    rn::STORAGE_UNIT_2_CHARGE_DISCHARGE_POWER,
    rn::STORAGE_UNIT_2_BATTERY_TEMPERATURE,
];

const CAPACITY_CONTROL_REGISTERS: &[&str] = &[
    rn::STORAGE_CAPACITY_CONTROL_MODE,
    rn::STORAGE_CAPACITY_CONTROL_SOC_PEAK_SHAVING,
    rn::STORAGE_CAPACITY_CONTROL_PERIODS,
];
// }}}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProductInfo {
    pub model_name: String,
    pub serial_number: String,
    pub product_number: String,
}

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

/// Login state shared by a primary bridge and its sub-bridges. The mutex
/// around it is the login guard.
#[derive(Default)]
struct Session {
    credentials: Option<Credentials>,
    heartbeat: Heartbeat,
}

#[derive(Default)]
struct MeterState {
    online: bool,
    previous_device_status: Option<Value>,
}

/// High-level access to one SUN2000 inverter (one unit id) on a shared link.
pub struct HuaweiSolarBridge {
    client: Arc<HuaweiSolar>,
    slave_id: u8,
    update_lock: Arc<Mutex<()>>,
    session: Arc<Mutex<Session>>,
    heartbeat_interval: Duration,

    product_info: ProductInfo,
    pv_string_count: u16,
    has_optimizers: bool,
    battery_1_type: StorageProductModel,
    battery_2_type: StorageProductModel,
    supports_capacity_control: bool,
    power_meter_type: Option<MeterType>,
    meter: std::sync::Mutex<MeterState>,
}

impl HuaweiSolarBridge {
    pub async fn create(client: Arc<HuaweiSolar>, slave_id: u8) -> Result<Self> {
        Self::create_with(client, slave_id, Arc::default(), Arc::default()).await
    }

    /// A bridge for another unit reachable through `primary`'s link.
    pub async fn create_sub_bridge(primary: &HuaweiSolarBridge, slave_id: u8) -> Result<Self> {
        if primary.slave_id == slave_id {
            return Err(Error::InvalidRequest(format!(
                "sub-bridge needs a slave id different from {}",
                slave_id
            )));
        }

        Self::create_with(
            primary.client.clone(),
            slave_id,
            primary.update_lock.clone(),
            primary.session.clone(),
        )
        .await
    }

    async fn create_with(
        client: Arc<HuaweiSolar>,
        slave_id: u8,
        update_lock: Arc<Mutex<()>>,
        session: Arc<Mutex<Session>>,
    ) -> Result<Self> {
        let product_info = Self::retrieve_product_info(&client, slave_id).await?;
        if !product_info.model_name.starts_with(SUPPORTED_MODEL_PREFIX) {
            return Err(Error::Unsupported(format!(
                "Unsupported product model '{}'",
                product_info.model_name
            )));
        }

        let mut bridge = Self {
            client,
            slave_id,
            update_lock,
            session,
            heartbeat_interval: Duration::from_secs(HEARTBEAT_INTERVAL_SECS),
            product_info,
            pv_string_count: 0,
            has_optimizers: false,
            battery_1_type: StorageProductModel::None,
            battery_2_type: StorageProductModel::None,
            supports_capacity_control: false,
            power_meter_type: None,
            meter: std::sync::Mutex::default(),
        };
        bridge.populate_additional_fields().await?;

        info!(
            "slave {}: {} ({}), {} PV strings, optimizers: {}, battery: {}, meter: {:?}",
            slave_id,
            bridge.product_info.model_name,
            bridge.product_info.serial_number,
            bridge.pv_string_count,
            bridge.has_optimizers,
            bridge.battery_type(),
            bridge.power_meter_type
        );

        Ok(bridge)
    }

    async fn retrieve_product_info(client: &HuaweiSolar, slave_id: u8) -> Result<ProductInfo> {
        let readings = client
            .get_multiple(&[rn::MODEL_NAME, rn::SERIAL_NUMBER, rn::PN], Some(slave_id))
            .await?;
        let text = |idx: usize| {
            readings
                .get(idx)
                .and_then(|reading| reading.value.as_str())
                .unwrap_or_default()
                .to_string()
        };

        Ok(ProductInfo {
            model_name: text(0),
            serial_number: text(1),
            product_number: text(2),
        })
    }

    // a read error means the device does not have the register
    async fn probe(&self, name: &str) -> Result<Option<Value>> {
        match self.client.get(name, Some(self.slave_id)).await {
            Ok(reading) => Ok(Some(reading.value)),
            Err(err @ Error::Read { .. }) => {
                debug!("slave {}: {} not available: {}", self.slave_id, name, err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn populate_additional_fields(&mut self) -> Result<()> {
        let pv_string_count = self.client.get(rn::NB_PV_STRINGS, Some(self.slave_id)).await?;
        self.pv_string_count = pv_string_count
            .value
            .as_code()
            .and_then(|count| u16::try_from(count).ok())
            .filter(|count| (1..=rn::MAX_NUMBER_OF_PV_STRINGS).contains(count))
            .ok_or_else(|| Error::Unsupported(format!("invalid number of PV strings: {:?}", pv_string_count.value)))?;

        if let Some(count) = self.probe(rn::NB_OPTIMIZERS).await? {
            self.has_optimizers = count.as_code().unwrap_or(0) > 0;
        }

        if let Some(model) = self.probe(rn::STORAGE_UNIT_1_PRODUCT_MODEL).await? {
            self.battery_1_type = StorageProductModel::from_value(&model).unwrap_or(StorageProductModel::None);
        }
        if let Some(model) = self.probe(rn::STORAGE_UNIT_2_PRODUCT_MODEL).await? {
            self.battery_2_type = StorageProductModel::from_value(&model).unwrap_or(StorageProductModel::None);
        }
        if ![StorageProductModel::None, self.battery_1_type].contains(&self.battery_2_type) {
            warn!("Detected two batteries of a different type. This can lead to unexpected behavior.");
        }

        if self.battery_type() != StorageProductModel::None {
            self.client.determine_battery_type(Some(self.slave_id)).await?;
            self.supports_capacity_control = self.probe(rn::STORAGE_CAPACITY_CONTROL_MODE).await?.is_some();
        }

        if let Some(status) = self.probe(rn::METER_STATUS).await? {
            self.set_meter_online(MeterStatus::from_value(&status) == Some(MeterStatus::Normal));
        }

        // an offline meter reads as absent here
        if self.meter_online() {
            let meter_type = self.client.get(rn::METER_TYPE, Some(self.slave_id)).await?;
            self.power_meter_type = MeterType::from_value(&meter_type.value);
        }

        Ok(())
    }

    // {{{ accessors
    pub fn client(&self) -> &Arc<HuaweiSolar> {
        &self.client
    }

    pub fn slave_id(&self) -> u8 {
        self.slave_id
    }

    pub fn is_primary(&self) -> bool {
        self.slave_id == self.client.slave_id()
    }

    pub fn product_info(&self) -> &ProductInfo {
        &self.product_info
    }

    pub fn pv_string_count(&self) -> u16 {
        self.pv_string_count
    }

    pub fn has_optimizers(&self) -> bool {
        self.has_optimizers
    }

    pub fn battery_1_type(&self) -> StorageProductModel {
        self.battery_1_type
    }

    pub fn battery_2_type(&self) -> StorageProductModel {
        self.battery_2_type
    }

    /// The first battery unit's model, or the second's when unit 1 is empty.
    pub fn battery_type(&self) -> StorageProductModel {
        if self.battery_1_type != StorageProductModel::None {
            self.battery_1_type
        } else {
            self.battery_2_type
        }
    }

    pub fn supports_capacity_control(&self) -> bool {
        self.supports_capacity_control
    }

    pub fn power_meter_type(&self) -> Option<MeterType> {
        self.power_meter_type
    }

    pub fn meter_online(&self) -> bool {
        self.meter.lock().unwrap_or_else(PoisonError::into_inner).online
    }

    fn set_meter_online(&self, online: bool) {
        self.meter.lock().unwrap_or_else(PoisonError::into_inner).online = online;
    }

    pub async fn heartbeat_state(&self) -> HeartbeatState {
        self.session.lock().await.heartbeat.state()
    }
    // }}}

    // {{{ batch reads
    fn pv_registers(&self) -> Vec<String> {
        (1..=self.pv_string_count)
            .flat_map(|idx| [rn::pv_voltage(idx), rn::pv_current(idx)])
            .collect()
    }

    /// Registers relevant for the detected configuration.
    pub fn update_registers(&self) -> Vec<String> {
        let mut names: Vec<String> = INVERTER_REGISTERS.iter().map(|name| name.to_string()).collect();
        names.extend(self.pv_registers());

        let mut extend = |list: &[&str]| names.extend(list.iter().map(|name| name.to_string()));

        if self.has_optimizers {
            extend(OPTIMIZER_REGISTERS);
        }
        if self.power_meter_type.is_some() {
            extend(table::METER_REGISTERS);
        }
        if self.battery_type() != StorageProductModel::None {
            extend(STORAGE_REGISTERS);
            match self.battery_type() {
                StorageProductModel::HuaweiLuna2000 => {
                    extend(&[rn::STORAGE_HUAWEI_LUNA2000_TIME_OF_USE_CHARGING_AND_DISCHARGING_PERIODS])
                }
                StorageProductModel::LgResu => {
                    extend(&[rn::STORAGE_LG_RESU_TIME_OF_USE_CHARGING_AND_DISCHARGING_PERIODS])
                }
                StorageProductModel::None => {}
            }
            if self.battery_1_type != StorageProductModel::None {
                extend(STORAGE_UNIT_1_REGISTERS);
            }
            if self.battery_2_type != StorageProductModel::None {
                extend(STORAGE_UNIT_2_REGISTERS);
            }
            if self.supports_capacity_control {
                extend(CAPACITY_CONTROL_REGISTERS);
            }
        }

        names
    }

    pub async fn update(&self) -> Result<HashMap<String, Reading>> {
        let names = self.update_registers();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        self.batch_update(&names).await
    }

    /// Reads all `names`, grouped into as few requests as possible.
    pub async fn batch_update(&self, names: &[&str]) -> Result<HashMap<String, Reading>> {
        let groups = groups::group_registers(names)?;

        let _guard = self.update_lock.lock().await;
        let mut result = HashMap::new();

        for group in groups {
            let group = self.filter_registers(group).await?;
            if group.is_empty() {
                continue;
            }
            debug!("Batch update of the following registers: {}", group.join(", "));

            let readings = match self.client.get_multiple(&group, Some(self.slave_id)).await {
                Ok(readings) => readings,
                Err(err) => {
                    if group.iter().any(|name| table::is_meter_register(name)) {
                        info!(
                            "Fetching power meter registers failed, assuming the power meter went offline: {}",
                            err
                        );
                        self.set_meter_online(false);
                    }
                    return Err(err);
                }
            };

            let values: Vec<(String, Reading)> = group.iter().map(|name| name.to_string()).zip(readings).collect();
            self.detect_state_changes(&values);
            result.extend(values);
        }

        Ok(result)
    }

    // A backup box keeps the inverter running through a grid outage, but
    // the meter goes offline and querying it makes the inverter drop the
    // connection. Every device status change triggers a new meter check.
    fn detect_state_changes(&self, values: &[(String, Reading)]) {
        let Some((_, status)) = values.iter().find(|(name, _)| name == rn::DEVICE_STATUS) else {
            return;
        };

        let mut meter = self.meter.lock().unwrap_or_else(PoisonError::into_inner);
        if meter.previous_device_status.as_ref() != Some(&status.value) {
            debug!(
                "Detected a device state change from {:?} to {:?}: resetting power meter online status",
                meter.previous_device_status, status.value
            );
            meter.online = false;
        }
        meter.previous_device_status = Some(status.value.clone());
    }

    async fn filter_registers<'a>(&self, names: Vec<&'a str>) -> Result<Vec<&'a str>> {
        if !names.iter().any(|name| table::is_meter_register(name)) {
            return Ok(names);
        }

        if !self.meter_online() {
            let status = self.client.get(rn::METER_STATUS, Some(self.slave_id)).await?;
            let online = MeterStatus::from_value(&status.value) == Some(MeterStatus::Normal);
            debug!("Power meter online: {}", online);
            self.set_meter_online(online);
        }

        if self.meter_online() {
            return Ok(names);
        }

        debug!("Removing power meter registers as the power meter is offline.");
        Ok(names
            .into_iter()
            .filter(|name| *name == rn::METER_STATUS || !table::is_meter_register(name))
            .collect())
    }
    // }}}

    // {{{ session
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let mut session = self.session.lock().await;

        if !self.client.login(username, password, Some(self.slave_id)).await? {
            return Err(Error::InvalidCredentials);
        }

        session.credentials = Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });
        session
            .heartbeat
            .start(self.client.clone(), self.slave_id, self.heartbeat_interval);

        Ok(())
    }

    /// Logs in again with the stored credentials when no heartbeat keeps the
    /// session alive. `force` drops the current session first.
    pub async fn ensure_logged_in(&self, force: bool) -> Result<()> {
        let mut session = self.session.lock().await;

        if force {
            debug!("Forcefully stopping any heartbeat task");
            session.heartbeat.stop();
        }

        let Some(credentials) = session.credentials.clone() else {
            return Ok(());
        };
        if session.heartbeat.is_running() {
            return Ok(());
        }

        debug!("Currently not logged in: logging in now and starting heartbeat");
        if !self
            .client
            .login(&credentials.username, &credentials.password, Some(self.slave_id))
            .await?
        {
            return Err(Error::InvalidCredentials);
        }
        session
            .heartbeat
            .start(self.client.clone(), self.slave_id, self.heartbeat_interval);

        Ok(())
    }

    async fn has_credentials(&self) -> bool {
        self.session.lock().await.credentials.is_some()
    }

    // log in again after a permission error; failing that, the permission
    // error stands
    async fn relogin_after_denied(&self, what: &str) -> Result<()> {
        if let Err(err) = self.ensure_logged_in(true).await {
            error!("Could not login to {}: {}", what, err);
            return Err(Error::PermissionDenied);
        }
        Ok(())
    }

    /// Writes a register, logging in again and retrying once when the
    /// device denies the write.
    pub async fn set(&self, name: &str, value: &Value) -> Result<bool> {
        if let Err(err) = self.ensure_logged_in(false).await {
            warn!("Could not login ({}), setting {} will probably fail", err, name);
        }

        if self.heartbeat_state().await == HeartbeatState::Running && !self.client.heartbeat(Some(self.slave_id)).await
        {
            warn!("Failed to perform heartbeat before write");
        }

        let result = self.client.set(name, value, Some(self.slave_id)).await;
        if !matches!(result, Err(Error::PermissionDenied)) || !self.has_credentials().await {
            return result;
        }

        self.relogin_after_denied(&format!("set {}", name)).await?;
        self.client.heartbeat(Some(self.slave_id)).await;
        self.client.set(name, value, Some(self.slave_id)).await
    }

    async fn read_file(&self, file_type: u8, customized_data: Option<&[u8]>) -> Result<Vec<u8>> {
        if let Err(err) = self.ensure_logged_in(false).await {
            warn!("Could not login ({}), reading file {:#x} will probably fail", err, file_type);
        }

        let result = self.client.get_file(file_type, customized_data, Some(self.slave_id)).await;
        if !matches!(result, Err(Error::PermissionDenied)) || !self.has_credentials().await {
            return result;
        }

        self.relogin_after_denied(&format!("read file {:#x}", file_type)).await?;
        self.client.get_file(file_type, customized_data, Some(self.slave_id)).await
    }

    /// Reads the time zone and writes it back. `None` when the link does not
    /// support writes at all (e.g. some SmartLoggers).
    pub async fn has_write_permission(&self) -> Result<Option<bool>> {
        let result = async {
            let time_zone = self.client.get(rn::TIME_ZONE, Some(self.slave_id)).await?;
            self.client.set(rn::TIME_ZONE, &time_zone.value, Some(self.slave_id)).await
        }
        .await;

        match result {
            Ok(_) => Ok(Some(true)),
            Err(Error::Read { .. }) => Ok(None),
            Err(Error::PermissionDenied) => Ok(Some(false)),
            Err(err) => Err(err),
        }
    }

    /// Ends the logged-in session's keep-alive. The next privileged
    /// operation logs in again.
    pub async fn stop_heartbeat(&self) {
        self.session.lock().await.heartbeat.stop();
    }

    pub async fn stop(&self) {
        self.stop_heartbeat().await;

        if self.is_primary() {
            self.client.stop().await;
        }
    }
    // }}}

    // {{{ optimizers
    /// Optimizer telemetry from the newest data unit of the last ten minutes.
    pub async fn get_latest_optimizer_real_time_data(&self) -> Result<HashMap<u16, OptimizerRealTimeData>> {
        let system_time = self.client.get(rn::SYSTEM_TIME_RAW, Some(self.slave_id)).await?;
        let end_time = system_time
            .value
            .as_code()
            .and_then(|time| u32::try_from(time).ok())
            .ok_or_else(|| Error::Decode(format!("invalid system time {:?}", system_time.value)))?;
        let start_time = end_time.saturating_sub(OPTIMIZER_DATA_WINDOW_SECS);

        let data = self
            .read_file(
                OptimizerRealTimeDataFile::FILE_TYPE,
                Some(&OptimizerRealTimeDataFile::query_within_timespan(start_time, end_time)),
            )
            .await?;
        let file = OptimizerRealTimeDataFile::parse(&data)?;

        let Some(latest) = file.data_units.into_iter().max_by_key(|unit| unit.time) else {
            return Ok(HashMap::new());
        };

        Ok(latest
            .optimizers
            .into_iter()
            .map(|optimizer| (optimizer.optimizer_address, optimizer))
            .collect())
    }

    pub async fn get_optimizer_system_information(&self) -> Result<HashMap<u16, OptimizerSystemInformation>> {
        let data = self
            .read_file(OptimizerSystemInformationDataFile::FILE_TYPE, None)
            .await?;
        let file = OptimizerSystemInformationDataFile::parse(&data)?;

        Ok(file
            .optimizers
            .into_iter()
            .map(|optimizer| (optimizer.optimizer_address, optimizer))
            .collect())
    }
    // }}}
}
