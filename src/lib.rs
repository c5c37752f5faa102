pub mod bridge; // discovery, batched polling, login session and optimizer files
pub mod config; // YAML configuration
pub mod error; // error taxonomy
pub mod files; // optimizer binary file parsers
pub mod huawei; // Modbus transport, private functions and the client
pub mod options; // command line options
pub mod prelude;
pub mod register; // register table and value codecs
pub mod schedule; // time-of-use and peak-shaving validation
pub mod scheduler; // periodic polling loop
pub mod utils;

const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;

use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crate::scheduler::Scheduler;

// The logger lets everything through; the level from the config is applied
// through log::set_max_level once the config is loaded.
fn init_logger() {
    let result = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init();

    if let Err(err) = result {
        eprintln!("failed to initialise logging: {}", err);
    }
    log::set_max_level(log::LevelFilter::Info);
}

/// Connects the primary unit, then one sub-bridge per further slave id.
pub async fn create_bridges(config: &ConfigWrapper) -> Result<Vec<Arc<HuaweiSolarBridge>>> {
    let connection = config.connection();

    let client = HuaweiSolar::connect(
        connection.host(),
        connection.port(),
        connection.primary_slave_id(),
        connection.timeout,
        connection.cooldown,
        connection.wait_after_connect,
    )
    .await
    .with_context(|| format!("connecting to {}:{}", connection.host(), connection.port()))?;

    let primary = HuaweiSolarBridge::create(Arc::new(client), connection.primary_slave_id())
        .await
        .context("creating primary bridge")?;

    if let Some(credentials) = config.credentials() {
        primary
            .login(&credentials.username, &credentials.password)
            .await
            .context("logging in")?;
        info!("logged in as {}", credentials.username);
    }

    let mut bridges = Vec::new();
    for slave_id in connection.secondary_slave_ids() {
        let bridge = HuaweiSolarBridge::create_sub_bridge(&primary, *slave_id)
            .await
            .with_context(|| format!("creating bridge for slave {}", slave_id))?;
        bridges.push(Arc::new(bridge));
    }
    bridges.insert(0, Arc::new(primary));

    Ok(bridges)
}

pub async fn app() -> Result<()> {
    let options = Options::new();

    init_logger();
    info!("huawei-solar-bridge {} starting", CARGO_PKG_VERSION);

    let config = ConfigWrapper::new(options.config_file)?;
    match config.loglevel().parse() {
        Ok(level) => log::set_max_level(level),
        Err(_) => warn!("unknown loglevel {}, keeping info", config.loglevel()),
    }

    let bridges = create_bridges(&config).await?;
    let scheduler = Scheduler::new(config.scheduler(), bridges.clone());

    let runtime = async {
        match options.runtime {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };

    let result = tokio::select! {
        result = scheduler.start() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received, shutting down");
            Ok(())
        }
        _ = runtime => {
            info!("runtime limit reached, shutting down");
            Ok(())
        }
    };

    // sub-bridges first; the primary owns the connection
    for bridge in bridges.iter().rev() {
        bridge.stop().await;
    }

    info!("shutdown complete");
    result
}
