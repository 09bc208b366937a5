//! Periodic governance jobs.

use log::{debug, info};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};

use crate::manager::GovernanceManager;

/// Runs maintenance and relay flushing until a shutdown signal arrives.
pub async fn run(manager: Arc<GovernanceManager>, mut shutdown: broadcast::Receiver<()>) {
    let mut maintenance = interval(manager.config().maintenance_interval());
    let mut relay = interval(manager.config().relay_interval());
    maintenance.set_missed_tick_behavior(MissedTickBehavior::Delay);
    relay.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick of an interval completes immediately.
    maintenance.tick().await;
    relay.tick().await;

    info!("Governance scheduler started.");
    loop {
        tokio::select! {
            _ = maintenance.tick() => {
                manager.do_maintenance();
            }
            _ = relay.tick() => {
                let sent = manager.flush_relay_queue();
                if sent > 0 {
                    debug!("relayed {} governance items", sent);
                }
            }
            _ = shutdown.recv() => {
                info!("Governance scheduler received shutdown signal.");
                break;
            }
        }
    }
}

/// Spawns [`run`] on the current runtime.
pub fn spawn(manager: Arc<GovernanceManager>, shutdown: broadcast::Receiver<()>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(manager, shutdown))
}
