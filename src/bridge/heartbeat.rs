use crate::prelude::*;

use {
    std::sync::Arc,
    std::time::Duration,
    tokio::sync::watch,
    tokio::task::JoinHandle,
};

pub const HEARTBEAT_INTERVAL_SECS: u64 = 15;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HeartbeatState {
    Idle,
    Running,
    Stopped,
}

/// Background task keeping a logged-in session alive.
///
/// Once stopped, either on request or because a heartbeat failed, the task
/// is gone; a new one has to be started.
pub struct Heartbeat {
    // doubles as the stop signal for the task
    state: Arc<watch::Sender<HeartbeatState>>,
    handle: Option<JoinHandle<()>>,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

impl Heartbeat {
    pub fn new() -> Self {
        let (state, _) = watch::channel(HeartbeatState::Idle);
        Self {
            state: Arc::new(state),
            handle: None,
        }
    }

    pub fn state(&self) -> HeartbeatState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == HeartbeatState::Running
    }

    /// Replaces any previous task with a fresh one.
    pub fn start(&mut self, client: Arc<HuaweiSolar>, slave_id: u8, interval: Duration) {
        self.stop();

        let (state, _) = watch::channel(HeartbeatState::Running);
        self.state = Arc::new(state);

        let state = self.state.clone();
        self.handle = Some(tokio::spawn(async move {
            Self::run(client, slave_id, interval, state).await;
        }));
        debug!("heartbeat started for slave {}", slave_id);
    }

    pub fn stop(&mut self) {
        self.state.send_if_modified(|state| {
            let running = *state == HeartbeatState::Running;
            if running {
                debug!("stopping heartbeat");
                *state = HeartbeatState::Stopped;
            }
            running
        });
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    async fn run(client: Arc<HuaweiSolar>, slave_id: u8, interval: Duration, state: Arc<watch::Sender<HeartbeatState>>) {
        let mut signal = state.subscribe();

        loop {
            if *signal.borrow_and_update() != HeartbeatState::Running {
                break;
            }

            if !client.heartbeat(Some(slave_id)).await {
                warn!("Heartbeat stopped for slave {}", slave_id);
                state.send_replace(HeartbeatState::Stopped);
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = signal.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
