use crate::prelude::*;

use anyhow::Result;
use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::file_error;
use crate::huawei::client::{
    DEFAULT_COOLDOWN_MS, DEFAULT_SLAVE_ID, DEFAULT_TCP_PORT, DEFAULT_TIMEOUT_SECS, DEFAULT_WAIT_AFTER_CONNECT_MS,
};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub connection: Connection,

    pub credentials: Option<Credentials>,

    #[serde(default = "Config::default_scheduler")]
    pub scheduler: Scheduler,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

// Connection {{{
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Connection {
    pub host: String,
    #[serde(default = "Config::default_port")]
    pub port: u16,

    /// The first id is the primary unit, the rest get sub-bridges.
    #[serde(default = "Config::default_slave_ids")]
    pub slave_ids: Vec<u8>,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "Config::default_timeout")]
    pub timeout: Duration,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "Config::default_cooldown")]
    pub cooldown: Duration,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "Config::default_wait_after_connect")]
    pub wait_after_connect: Duration,
}
impl Connection {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn primary_slave_id(&self) -> u8 {
        self.slave_ids.first().copied().unwrap_or(DEFAULT_SLAVE_ID)
    }

    pub fn secondary_slave_ids(&self) -> &[u8] {
        self.slave_ids.get(1..).unwrap_or_default()
    }
} // }}}

// Credentials {{{
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
} // }}}

// Scheduler {{{
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Scheduler {
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "Config::default_interval")]
    pub interval: Duration,

    /// Also fetch optimizer telemetry on every run. Needs credentials.
    #[serde(default)]
    pub optimizers: bool,
}
impl Scheduler {
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn optimizers(&self) -> bool {
        self.optimizers
    }
} // }}}

#[derive(Clone)]
pub struct ConfigWrapper {
    config: Arc<Mutex<Config>>,
}

impl ConfigWrapper {
    pub fn new(file: String) -> Result<Self> {
        Ok(Self::from_config(Config::new(file)?))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
        }
    }

    fn config(&self) -> std::sync::MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connection(&self) -> Connection {
        self.config().connection.clone()
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.config().credentials.clone()
    }

    pub fn scheduler(&self) -> Scheduler {
        self.config().scheduler.clone()
    }

    pub fn loglevel(&self) -> String {
        self.config().loglevel.clone()
    }
}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        info!("Reading configuration from {}", file);
        let content = std::fs::read_to_string(&file).map_err(|err| file_error!("error reading {}: {}", file, err))?;

        let config: Self = serde_yaml::from_str(&content).with_context(|| format!("error parsing {}", file))?;

        info!("Configuration loaded successfully:");
        info!("  Host: {}:{}", config.connection.host, config.connection.port);
        info!("  Slave IDs: {:?}", config.connection.slave_ids);
        info!("  Timeout: {:?}", config.connection.timeout);
        info!("  Cooldown: {:?}", config.connection.cooldown);
        info!("  Wait after connect: {:?}", config.connection.wait_after_connect);
        info!(
            "  Credentials: {}",
            config
                .credentials
                .as_ref()
                .map(|credentials| credentials.username.as_str())
                .unwrap_or("none")
        );
        info!("  Scheduler interval: {:?}", config.scheduler.interval);
        info!("  Optimizers: {}", config.scheduler.optimizers);
        info!("  Log Level: {}", config.loglevel);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.connection.host.is_empty() {
            bail!("connection.host cannot be empty");
        }
        if self.connection.port == 0 {
            bail!("connection.port must be between 1 and 65535");
        }
        if self.connection.slave_ids.is_empty() {
            bail!("connection.slave_ids needs at least one id");
        }
        for (i, id) in self.connection.slave_ids.iter().enumerate() {
            if self.connection.slave_ids[..i].contains(id) {
                bail!("connection.slave_ids contains {} twice", id);
            }
        }
        if self.connection.timeout.is_zero() {
            bail!("connection.timeout cannot be 0");
        }

        if let Some(credentials) = &self.credentials {
            if credentials.username.is_empty() {
                bail!("credentials.username cannot be empty");
            }
        }

        if self.scheduler.interval.is_zero() {
            bail!("scheduler.interval cannot be 0");
        }
        if self.scheduler.optimizers && self.credentials.is_none() {
            bail!("scheduler.optimizers needs credentials");
        }

        Ok(())
    }

    fn default_port() -> u16 {
        DEFAULT_TCP_PORT
    }

    fn default_slave_ids() -> Vec<u8> {
        vec![DEFAULT_SLAVE_ID]
    }

    fn default_timeout() -> Duration {
        Duration::from_secs(DEFAULT_TIMEOUT_SECS)
    }

    fn default_cooldown() -> Duration {
        Duration::from_millis(DEFAULT_COOLDOWN_MS)
    }

    fn default_wait_after_connect() -> Duration {
        Duration::from_millis(DEFAULT_WAIT_AFTER_CONNECT_MS)
    }

    fn default_interval() -> Duration {
        Duration::from_secs(30)
    }

    fn default_scheduler() -> Scheduler {
        Scheduler {
            interval: Self::default_interval(),
            optimizers: false,
        }
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}
