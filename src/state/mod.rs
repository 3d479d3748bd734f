//! Per-room game state: phase machine, votes, minigame, roster and the
//! concurrency wrapper that serializes access to them.

/// Phase deadline tracking.
pub mod clock;
/// The per-room phase state machine.
pub mod machine;
/// Staring-contest state and resolution.
pub mod minigame;
/// Room roster, settings and content inventories.
pub mod room;
/// Point values and score awards.
pub mod scoring;
/// Generic one-vote-per-voter tallying.
pub mod votes;

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, watch};
use tokio::time::Instant;

use crate::state::room::Room;

/// Concurrency wrapper around one room.
///
/// The room is a single-writer resource: every command and every
/// expiry-driven transition runs under the one mutex, so two expirations or a
/// vote racing a transition can never interleave. Rooms share nothing with
/// each other.
///
/// The deadline channel mirrors the machine's current deadline for the
/// room's monitor task. Publishing `None` parks the monitor; dropping the
/// handle closes the channel and stops it.
pub struct RoomHandle {
    code: String,
    room: Mutex<Room>,
    deadline_tx: watch::Sender<Option<Instant>>,
}

impl RoomHandle {
    /// Wrap a room for shared use.
    pub fn new(room: Room) -> Arc<Self> {
        let (deadline_tx, _) = watch::channel(room.machine.deadline());
        Arc::new(Self {
            code: room.code().to_string(),
            room: Mutex::new(room),
            deadline_tx,
        })
    }

    /// The room code this handle serves.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Acquire the exclusive room lock.
    pub async fn lock(&self) -> MutexGuard<'_, Room> {
        self.room.lock().await
    }

    /// Subscribe to deadline updates for the monitor task.
    pub fn watch_deadline(&self) -> watch::Receiver<Option<Instant>> {
        self.deadline_tx.subscribe()
    }

    /// Publish the machine's current deadline to the monitor. Call after any
    /// mutation that starts, clears or rewrites the phase clock.
    pub fn publish_deadline(&self, room: &Room) {
        self.deadline_tx.send_replace(room.machine.deadline());
    }
}
