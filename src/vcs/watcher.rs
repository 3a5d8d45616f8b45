//! Polling watcher that turns external working-tree edits into notifications.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::GitGateway;

/// Poll the gateway's status fingerprint and notify its observers whenever it
/// changes.
///
/// The task holds only a weak reference and exits once the gateway is dropped.
pub fn spawn_watcher(gateway: &Arc<GitGateway>, interval: Duration) -> JoinHandle<()> {
    let weak: Weak<GitGateway> = Arc::downgrade(gateway);
    let mut last = gateway.fingerprint();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let Some(gateway) = weak.upgrade() else {
                debug!("Gateway dropped, stopping watcher");
                return;
            };

            let current = gateway.fingerprint();
            if current != last {
                debug!("Working tree changed, notifying observers");
                last = current;
                gateway.observers().notify();
            }
        }
    })
}
