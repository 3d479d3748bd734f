use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::dto::snapshot::GameSnapshot;

/// A snapshot paired with the room it describes.
#[derive(Debug, Clone)]
pub struct SnapshotEvent {
    /// Code of the room the snapshot belongs to.
    pub room_code: String,
    /// The captured state.
    pub snapshot: GameSnapshot,
}

/// Fire-and-forget sink for outbound state snapshots.
///
/// The engine broadcasts through this seam; the transport layer (or a test
/// recorder) decides what to do with the events.
pub trait SnapshotSink: Send + Sync {
    /// Deliver one snapshot event. Must not block.
    fn broadcast(&self, event: SnapshotEvent);
}

/// Broadcast-channel implementation of [`SnapshotSink`].
pub struct SnapshotHub {
    sender: broadcast::Sender<SnapshotEvent>,
}

impl SnapshotHub {
    /// Create a hub with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to the snapshot stream.
    pub fn subscribe(&self) -> BroadcastStream<SnapshotEvent> {
        BroadcastStream::new(self.sender.subscribe())
    }
}

impl SnapshotSink for SnapshotHub {
    fn broadcast(&self, event: SnapshotEvent) {
        // A send error only means nobody is subscribed right now.
        let _ = self.sender.send(event);
    }
}
