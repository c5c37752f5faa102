use crate::prelude::*;

use std::sync::Arc;

use crate::config::Scheduler as SchedulerConfig;

/// Polls every bridge at a fixed interval and logs the readings as JSON.
pub struct Scheduler {
    config: SchedulerConfig,
    bridges: Vec<Arc<HuaweiSolarBridge>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, bridges: Vec<Arc<HuaweiSolarBridge>>) -> Self {
        Self { config, bridges }
    }

    pub async fn start(&self) -> anyhow::Result<()> {
        let mut interval = tokio::time::interval(self.config.interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            for bridge in &self.bridges {
                if let Err(err) = self.poll(bridge).await {
                    warn!("slave {}: update failed: {}", bridge.slave_id(), err);
                }
            }
        }
    }

    async fn poll(&self, bridge: &HuaweiSolarBridge) -> anyhow::Result<()> {
        let readings = bridge.update().await?;
        info!(
            "slave {}: {}",
            bridge.slave_id(),
            serde_json::to_string(&readings).context("serializing readings")?
        );

        if self.config.optimizers() && bridge.has_optimizers() {
            let optimizers = bridge.get_latest_optimizer_real_time_data().await?;
            info!(
                "slave {}: optimizers {}",
                bridge.slave_id(),
                serde_json::to_string(&optimizers).context("serializing optimizer data")?
            );
        }

        Ok(())
    }
}
