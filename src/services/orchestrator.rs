//! Room table and command surface.
//!
//! The [`GameOrchestrator`] owns every live room, validates and applies
//! player commands, and broadcasts a fresh snapshot after each accepted
//! mutation. Timer-driven transitions live in [`crate::services::flow`] and
//! are driven by one monitor task per room.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::Rng;
use tracing::{info, warn};
use validator::Validate;

use crate::config::AppConfig;
use crate::dto::settings::SettingsUpdate;
use crate::dto::snapshot::GameSnapshot;
use crate::error::FlowError;
use crate::services::flow;
use crate::services::generator::ContentGenerator;
use crate::services::hub::{SnapshotEvent, SnapshotSink};
use crate::services::monitor;
use crate::state::RoomHandle;
use crate::state::machine::Phase;
use crate::state::room::{ItemKind, Room, TruthDareItem};
use crate::state::scoring::{self, PointKind};

/// Length of generated room codes.
const ROOM_CODE_LENGTH: usize = 6;
/// Alphabet room codes are drawn from.
const ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Top-level game engine: the room table plus the collaborators every room
/// shares.
pub struct GameOrchestrator {
    rooms: DashMap<String, Arc<RoomHandle>>,
    sink: Arc<dyn SnapshotSink>,
    generator: Arc<dyn ContentGenerator>,
    config: AppConfig,
}

impl GameOrchestrator {
    /// Create an orchestrator with no rooms.
    pub fn new(
        config: AppConfig,
        sink: Arc<dyn SnapshotSink>,
        generator: Arc<dyn ContentGenerator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            rooms: DashMap::new(),
            sink,
            generator,
            config,
        })
    }

    /// Look up a live room by code.
    pub fn room(&self, code: &str) -> Option<Arc<RoomHandle>> {
        self.rooms.get(code).map(|entry| entry.value().clone())
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// The shared content generator.
    pub(crate) fn generator(&self) -> &dyn ContentGenerator {
        self.generator.as_ref()
    }

    /// Create a new room under a freshly generated code and return the code.
    pub fn create_room(self: &Arc<Self>) -> String {
        loop {
            let code = generate_room_code();
            match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let handle = self.new_room_handle(&code);
                    slot.insert(handle.clone());
                    self.spawn_monitor(&handle);
                    info!(room = %code, "room created");
                    return code;
                }
            }
        }
    }

    /// Add a player to `code`, creating the room on first join. The first
    /// player to join becomes host. Returns false when the name is blank or
    /// already taken in the room.
    pub async fn join_room(self: &Arc<Self>, code: &str, conn_id: &str, name: &str) -> bool {
        if name.trim().is_empty() {
            return false;
        }
        let handle = self.ensure_room(code);
        let mut room = handle.lock().await;
        let added = room.add_player(conn_id, name);
        if added {
            if flow::resume_if_parked(&mut room) {
                handle.publish_deadline(&room);
            }
            info!(room = %code, player = %name, players = room.player_count(), "player joined");
            self.broadcast_room(&room);
        } else {
            warn!(room = %code, player = %name, "join rejected");
        }
        added
    }

    /// Remove a player from a room. Deletes the room when it empties;
    /// otherwise broadcasts the updated roster (host reassignment included).
    pub async fn leave_room(&self, code: &str, conn_id: &str) -> bool {
        let Some(handle) = self.room(code) else {
            return false;
        };
        let mut room = handle.lock().await;
        if !room.remove_player(conn_id) {
            return false;
        }
        info!(room = %code, players = room.player_count(), "player left");
        if room.is_empty() {
            drop(room);
            self.delete_room(code);
        } else {
            self.broadcast_room(&room);
        }
        true
    }

    /// Handle a dropped connection: remove the player from every room that
    /// holds it.
    pub async fn disconnect(&self, conn_id: &str) {
        let handles: Vec<Arc<RoomHandle>> = self
            .rooms
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for handle in handles {
            if handle.lock().await.has_player(conn_id) {
                self.leave_room(handle.code(), conn_id).await;
            }
        }
    }

    /// Drop a room and stop its monitor.
    pub fn delete_room(&self, code: &str) {
        if self.rooms.remove(code).is_some() {
            info!(room = %code, "room deleted");
        }
    }

    /// Host command: tear down the room for everyone.
    pub async fn destroy_room(&self, code: &str, conn_id: &str) -> bool {
        let Some(handle) = self.room(code) else {
            return false;
        };
        let is_host = handle.lock().await.is_host(conn_id);
        if !is_host {
            return false;
        }
        self.delete_room(code);
        true
    }

    /// Host command: apply a partial settings update. Rejected for
    /// non-hosts and for out-of-range values.
    pub async fn update_settings(&self, code: &str, conn_id: &str, update: SettingsUpdate) -> bool {
        if let Err(err) = update.validate() {
            warn!(room = %code, %err, "settings update rejected");
            return false;
        }
        let Some(handle) = self.room(code) else {
            return false;
        };
        let mut room = handle.lock().await;
        if !room.is_host(conn_id) {
            return false;
        }
        update.apply_to(&mut room.settings);
        info!(room = %code, settings = ?room.settings, "settings updated");
        self.broadcast_room(&room);
        true
    }

    /// Host command: start the game from the lobby.
    pub async fn start_game(&self, code: &str, conn_id: &str) -> Result<bool, FlowError> {
        let Some(handle) = self.room(code) else {
            return Ok(false);
        };
        let mut room = handle.lock().await;
        if !room.is_host(conn_id) || room.machine.phase() != Phase::Lobby {
            return Ok(false);
        }
        if room.player_count() < 2 {
            warn!(room = %code, players = room.player_count(), "start rejected; need two players");
            return Ok(false);
        }
        let countdown = room.settings.countdown();
        room.machine.start_countdown(countdown)?;
        info!(room = %code, "game started");
        handle.publish_deadline(&room);
        self.broadcast_room(&room);
        Ok(true)
    }

    /// Host command: restart from the end-game screen. Scores and round
    /// history are wiped and every inventory is re-seeded from the room
    /// defaults; the roster stays.
    pub async fn restart_game(&self, code: &str, conn_id: &str) -> Result<bool, FlowError> {
        let Some(handle) = self.room(code) else {
            return Ok(false);
        };
        let mut room = handle.lock().await;
        if !room.is_host(conn_id) || room.machine.phase() != Phase::EndGame {
            return Ok(false);
        }
        if room.player_count() < 2 {
            return Ok(false);
        }
        room.reset_for_new_game();
        let countdown = room.settings.countdown();
        room.machine.start_countdown(countdown)?;
        info!(room = %code, "game restarted");
        handle.publish_deadline(&room);
        self.broadcast_room(&room);
        Ok(true)
    }

    /// Performer command: pick truth or dare during selection.
    pub async fn select_truth_dare(&self, code: &str, conn_id: &str, choice: ItemKind) -> bool {
        let Some(handle) = self.room(code) else {
            return false;
        };
        let mut room = handle.lock().await;
        let Some(name) = room.player_by_conn(conn_id).map(|p| p.name.clone()) else {
            return false;
        };
        let accepted = room.machine.set_choice(&name, choice);
        if accepted {
            info!(room = %code, performer = %name, %choice, "choice made");
            self.broadcast_room(&room);
        }
        accepted
    }

    /// Audience command: vote to skip the current truth/dare. Activating the
    /// skip rewrites the deadline, so the monitor is notified.
    pub async fn cast_skip_vote(&self, code: &str, conn_id: &str) -> bool {
        let Some(handle) = self.room(code) else {
            return false;
        };
        let mut room = handle.lock().await;
        let Some(voter_name) = room.player_by_conn(conn_id).map(|p| p.name.clone()) else {
            return false;
        };
        let eligible = room.player_count().saturating_sub(1);
        let skip = room.settings.skip();
        if !room.machine.cast_skip_vote(conn_id, &voter_name, eligible, skip) {
            return false;
        }
        if room.machine.skip_activated() {
            info!(room = %code, votes = room.machine.skip_vote_count(), "skip activated");
        }
        handle.publish_deadline(&room);
        self.broadcast_room(&room);
        true
    }

    /// Audience command: vote for who blinked in the staring contest. A
    /// vote that decides the contest moves the loser straight into
    /// selection.
    pub async fn cast_minigame_vote(
        &self,
        code: &str,
        conn_id: &str,
        voted_name: &str,
    ) -> Result<bool, FlowError> {
        let Some(handle) = self.room(code) else {
            return Ok(false);
        };
        let mut room = handle.lock().await;
        if !room.has_player(conn_id) {
            return Ok(false);
        }
        if !room.machine.cast_minigame_vote(conn_id, voted_name) {
            return Ok(false);
        }
        if flow::resolve_minigame_if_decided(&mut room)? {
            handle.publish_deadline(&room);
        }
        self.broadcast_room(&room);
        Ok(true)
    }

    /// Player command: submit a custom truth or dare to one or more targets
    /// during preparation. Capped per round; awards submission points once
    /// the item lands with at least one target.
    pub async fn submit_item(
        &self,
        code: &str,
        conn_id: &str,
        kind: ItemKind,
        text: &str,
        targets: &[String],
    ) -> bool {
        let Some(handle) = self.room(code) else {
            return false;
        };
        let mut room = handle.lock().await;
        if room.machine.phase() != Phase::Preparation {
            return false;
        }
        let text = text.trim();
        if text.is_empty() || targets.is_empty() {
            return false;
        }
        let Some(submitter) = room.player_by_conn(conn_id) else {
            return false;
        };
        if !submitter.can_submit_more() {
            warn!(room = %code, player = %submitter.name, "submission cap reached");
            return false;
        }
        let submitter_name = submitter.name.clone();

        let mut delivered = false;
        for target in targets {
            // Self-targeting is allowed; unknown names are skipped.
            if let Some(player) = room.player_by_name_mut(target) {
                player.add_item(TruthDareItem {
                    text: text.to_string(),
                    kind,
                    is_default: false,
                    submitted_by: Some(submitter_name.clone()),
                });
                delivered = true;
            }
        }
        if !delivered {
            return false;
        }

        if let Some(player) = room.player_by_conn_mut(conn_id) {
            player.note_submission();
            scoring::award(player, PointKind::Submission);
        }
        info!(room = %code, player = %submitter_name, %kind, targets = targets.len(), "item submitted");
        self.broadcast_room(&room);
        true
    }

    /// Capture a snapshot of a room for a newly connected observer.
    pub async fn snapshot(&self, code: &str) -> Option<GameSnapshot> {
        let handle = self.room(code)?;
        let room = handle.lock().await;
        Some(GameSnapshot::capture(&room))
    }

    /// Push the room's current snapshot through the sink.
    pub(crate) fn broadcast_room(&self, room: &Room) {
        self.sink.broadcast(SnapshotEvent {
            room_code: room.code().to_string(),
            snapshot: GameSnapshot::capture(room),
        });
    }

    fn ensure_room(self: &Arc<Self>, code: &str) -> Arc<RoomHandle> {
        if let Some(handle) = self.room(code) {
            return handle;
        }
        let handle = self.new_room_handle(code);
        match self.rooms.entry(code.to_string()) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => {
                slot.insert(handle.clone());
                self.spawn_monitor(&handle);
                info!(room = %code, "room created");
                handle
            }
        }
    }

    fn new_room_handle(&self, code: &str) -> Arc<RoomHandle> {
        RoomHandle::new(Room::new(
            code,
            self.config.default_settings.clone(),
            self.config.default_truths.clone(),
            self.config.default_dares.clone(),
        ))
    }

    fn spawn_monitor(self: &Arc<Self>, handle: &Arc<RoomHandle>) {
        tokio::spawn(monitor::run(
            self.clone(),
            handle.code().to_string(),
            handle.watch_deadline(),
        ));
    }
}

fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| {
            let index = rng.random_range(0..ROOM_CODE_CHARSET.len());
            ROOM_CODE_CHARSET[index] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::generator::DisabledGenerator;

    struct NullSink;

    impl SnapshotSink for NullSink {
        fn broadcast(&self, _event: SnapshotEvent) {}
    }

    fn orchestrator() -> Arc<GameOrchestrator> {
        GameOrchestrator::new(
            AppConfig::load(),
            Arc::new(NullSink),
            Arc::new(DisabledGenerator),
        )
    }

    #[test]
    fn room_codes_are_six_uppercase_alphanumerics() {
        for _ in 0..100 {
            let code = generate_room_code();
            assert_eq!(code.len(), ROOM_CODE_LENGTH);
            assert!(code.bytes().all(|b| ROOM_CODE_CHARSET.contains(&b)));
        }
    }

    #[tokio::test]
    async fn join_creates_room_and_first_player_hosts() {
        let orch = orchestrator();
        assert!(orch.join_room("ABC123", "c1", "alice").await);
        assert!(orch.join_room("ABC123", "c2", "bob").await);
        assert_eq!(orch.room_count(), 1);

        let handle = orch.room("ABC123").unwrap();
        let room = handle.lock().await;
        assert!(room.is_host("c1"));
        assert_eq!(room.player_count(), 2);
    }

    #[tokio::test]
    async fn duplicate_name_and_blank_name_are_rejected() {
        let orch = orchestrator();
        assert!(orch.join_room("ABC123", "c1", "alice").await);
        assert!(!orch.join_room("ABC123", "c2", "alice").await);
        assert!(!orch.join_room("ABC123", "c3", "   ").await);
    }

    #[tokio::test]
    async fn last_leave_deletes_the_room() {
        let orch = orchestrator();
        orch.join_room("ABC123", "c1", "alice").await;
        orch.join_room("ABC123", "c2", "bob").await;
        assert!(orch.leave_room("ABC123", "c1").await);
        assert!(orch.leave_room("ABC123", "c2").await);
        assert!(orch.room("ABC123").is_none());
    }

    #[tokio::test]
    async fn disconnect_removes_player_from_their_room() {
        let orch = orchestrator();
        orch.join_room("ABC123", "c1", "alice").await;
        orch.join_room("ABC123", "c2", "bob").await;
        orch.disconnect("c2").await;
        let handle = orch.room("ABC123").unwrap();
        assert_eq!(handle.lock().await.player_count(), 1);
    }

    #[tokio::test]
    async fn start_requires_host_and_two_players() {
        let orch = orchestrator();
        orch.join_room("ABC123", "c1", "alice").await;
        assert!(!orch.start_game("ABC123", "c1").await.unwrap());

        orch.join_room("ABC123", "c2", "bob").await;
        assert!(!orch.start_game("ABC123", "c2").await.unwrap());
        assert!(orch.start_game("ABC123", "c1").await.unwrap());

        // Already started.
        assert!(!orch.start_game("ABC123", "c1").await.unwrap());
    }

    #[tokio::test]
    async fn non_host_cannot_change_settings_or_destroy() {
        let orch = orchestrator();
        orch.join_room("ABC123", "c1", "alice").await;
        orch.join_room("ABC123", "c2", "bob").await;

        let update = SettingsUpdate {
            max_rounds: Some(5),
            ..Default::default()
        };
        assert!(!orch.update_settings("ABC123", "c2", update.clone()).await);
        assert!(orch.update_settings("ABC123", "c1", update).await);

        assert!(!orch.destroy_room("ABC123", "c2").await);
        assert!(orch.destroy_room("ABC123", "c1").await);
        assert!(orch.room("ABC123").is_none());
    }

    #[tokio::test]
    async fn submissions_only_accepted_during_preparation() {
        let orch = orchestrator();
        orch.join_room("ABC123", "c1", "alice").await;
        orch.join_room("ABC123", "c2", "bob").await;
        let accepted = orch
            .submit_item(
                "ABC123",
                "c1",
                ItemKind::Truth,
                "something embarrassing",
                &["bob".to_string()],
            )
            .await;
        assert!(!accepted);
    }
}
