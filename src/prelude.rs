pub use anyhow::{anyhow, bail, Context as _};
pub use log::{debug, error, info, trace, warn};

pub use crate::config::{self, Config, ConfigWrapper};
pub use crate::error::Error;
pub use crate::options::Options;
pub use crate::utils::Utils;

pub use crate::bridge::HuaweiSolarBridge;
pub use crate::huawei::client::HuaweiSolar;
pub use crate::register::{names as rn, Reading, Value};
