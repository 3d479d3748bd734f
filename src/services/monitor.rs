//! Per-room deadline monitor.
//!
//! Each room gets one task that watches the room's published deadline and
//! sleeps until it fires. Deadline rewrites (skip activation, a minigame
//! resolving early, phase transitions) wake the task through the watch
//! channel; untimed phases park it until the next publish.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::services::flow;
use crate::services::orchestrator::GameOrchestrator;

/// Run the monitor loop for one room until the room is deleted.
///
/// The loop exits when the deadline channel closes, which happens once the
/// room's handle is dropped from the orchestrator's table.
pub(crate) async fn run(
    orch: Arc<GameOrchestrator>,
    code: String,
    mut deadline_rx: watch::Receiver<Option<Instant>>,
) {
    debug!(room = %code, "monitor started");
    loop {
        let deadline = *deadline_rx.borrow_and_update();
        match deadline {
            None => {
                // Untimed phase; park until the next publish.
                if deadline_rx.changed().await.is_err() {
                    break;
                }
            }
            Some(at) => {
                tokio::select! {
                    _ = sleep_until(at) => {
                        let Some(handle) = orch.room(&code) else {
                            break;
                        };
                        flow::advance_on_expiry(&orch, &handle).await;
                    }
                    changed = deadline_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
    debug!(room = %code, "monitor stopped");
}
