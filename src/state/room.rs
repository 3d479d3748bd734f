use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::state::machine::RoomPhaseMachine;

/// Whether a content item is a truth question or a dare challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A question the performer must answer honestly.
    Truth,
    /// A challenge the performer must carry out.
    Dare,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Truth => write!(f, "truth"),
            ItemKind::Dare => write!(f, "dare"),
        }
    }
}

/// One entry in a player's private truth/dare inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruthDareItem {
    /// The prompt text shown to the room.
    pub text: String,
    /// Truth or dare.
    pub kind: ItemKind,
    /// Whether the item came from the room's default list.
    pub is_default: bool,
    /// Name of the player who submitted it, if any.
    pub submitted_by: Option<String>,
}

/// Immutable record of one completed round, appended to the room history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundRecord {
    /// Which round this was, starting at 1.
    pub round_number: u32,
    /// Name of the player who performed.
    pub performer: String,
    /// The prompt that was performed.
    pub text: String,
    /// Truth or dare.
    pub kind: ItemKind,
    /// Submitting player, or `None` when the item came from the defaults.
    pub submitted_by: Option<String>,
}

/// Tunable per-room configuration. Durations are in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    /// Countdown shown before the first round.
    pub countdown_duration: u64,
    /// Time for submitting custom items between rounds.
    pub preparation_duration: u64,
    /// Time the performer has to pick truth or dare.
    pub selection_duration: u64,
    /// Time allotted for performing the truth or dare.
    pub truth_dare_duration: u64,
    /// Remaining time once a skip is activated.
    pub skip_duration: u64,
    /// Game ends after this many completed rounds.
    pub max_rounds: u32,
    /// Chance (0-100) of a round starting with a minigame.
    pub minigame_chance_percent: u8,
    /// Whether to ask the generator for new items when a list runs dry.
    pub ai_generation_enabled: bool,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            countdown_duration: 10,
            preparation_duration: 30,
            selection_duration: 15,
            truth_dare_duration: 60,
            skip_duration: 10,
            max_rounds: 10,
            minigame_chance_percent: 20,
            ai_generation_enabled: false,
        }
    }
}

impl RoomSettings {
    /// Countdown phase duration.
    pub fn countdown(&self) -> Duration {
        Duration::from_secs(self.countdown_duration)
    }

    /// Preparation phase duration.
    pub fn preparation(&self) -> Duration {
        Duration::from_secs(self.preparation_duration)
    }

    /// Selection phase duration.
    pub fn selection(&self) -> Duration {
        Duration::from_secs(self.selection_duration)
    }

    /// Truth/dare phase duration.
    pub fn truth_dare(&self) -> Duration {
        Duration::from_secs(self.truth_dare_duration)
    }

    /// Shortened remainder applied on skip activation.
    pub fn skip(&self) -> Duration {
        Duration::from_secs(self.skip_duration)
    }
}

/// A connected player and their per-game state.
#[derive(Debug, Clone)]
pub struct Player {
    /// Opaque connection identifier supplied by the transport layer.
    pub conn_id: String,
    /// Display name, unique within a room by convention.
    pub name: String,
    /// Accumulated score.
    pub score: i64,
    /// Custom submissions made during the current round.
    pub submissions_this_round: u32,
    truths: Vec<TruthDareItem>,
    dares: Vec<TruthDareItem>,
}

impl Player {
    /// Create a player with an empty inventory and zero score.
    pub fn new(conn_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            conn_id: conn_id.into(),
            name: name.into(),
            score: 0,
            submissions_this_round: 0,
            truths: Vec::new(),
            dares: Vec::new(),
        }
    }

    /// Adjust the score by `points`.
    pub fn add_score(&mut self, points: i64) {
        self.score += points;
    }

    /// Wipe per-game state: score, submission counter and both inventories.
    /// The room re-seeds the inventories from its defaults afterwards.
    pub fn reset_for_new_game(&mut self) {
        self.score = 0;
        self.submissions_this_round = 0;
        self.truths.clear();
        self.dares.clear();
    }

    /// Whether the player is still under the per-round submission cap.
    pub fn can_submit_more(&self) -> bool {
        self.submissions_this_round < crate::state::scoring::MAX_SUBMISSIONS_PER_ROUND
    }

    /// Count one custom submission against the round cap.
    pub fn note_submission(&mut self) {
        self.submissions_this_round += 1;
    }

    /// Reset the round submission counter.
    pub fn reset_round_submissions(&mut self) {
        self.submissions_this_round = 0;
    }

    /// Add an item to the matching inventory.
    pub fn add_item(&mut self, item: TruthDareItem) {
        match item.kind {
            ItemKind::Truth => self.truths.push(item),
            ItemKind::Dare => self.dares.push(item),
        }
    }

    /// Borrow the inventory for `kind`.
    pub fn items(&self, kind: ItemKind) -> &[TruthDareItem] {
        match kind {
            ItemKind::Truth => &self.truths,
            ItemKind::Dare => &self.dares,
        }
    }

    /// Remove and return a uniformly chosen unused item of `kind`, or `None`
    /// when that inventory is empty.
    pub fn take_random_item(&mut self, kind: ItemKind) -> Option<TruthDareItem> {
        let list = match kind {
            ItemKind::Truth => &mut self.truths,
            ItemKind::Dare => &mut self.dares,
        };
        if list.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..list.len());
        Some(list.swap_remove(index))
    }
}

/// A game room: roster, settings, round history and the phase machine.
///
/// The roster is insertion-ordered so "oldest remaining player" is well
/// defined for host reassignment.
#[derive(Debug)]
pub struct Room {
    code: String,
    host_id: Option<String>,
    players: IndexMap<String, Player>,
    /// Per-room configuration, host-editable while in the lobby or between games.
    pub settings: RoomSettings,
    /// Default truth texts that seed each joining player's inventory.
    pub default_truths: Vec<String>,
    /// Default dare texts that seed each joining player's inventory.
    pub default_dares: Vec<String>,
    round_history: Vec<RoundRecord>,
    /// Phase state machine for this room.
    pub machine: RoomPhaseMachine,
}

impl Room {
    /// Create an empty room.
    pub fn new(
        code: impl Into<String>,
        settings: RoomSettings,
        default_truths: Vec<String>,
        default_dares: Vec<String>,
    ) -> Self {
        Self {
            code: code.into(),
            host_id: None,
            players: IndexMap::new(),
            settings,
            default_truths,
            default_dares,
            round_history: Vec::new(),
            machine: RoomPhaseMachine::new(),
        }
    }

    /// The immutable room code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Connection id of the current host, if the room is not empty.
    pub fn host_id(&self) -> Option<&str> {
        self.host_id.as_deref()
    }

    /// Whether `conn_id` is the current host.
    pub fn is_host(&self, conn_id: &str) -> bool {
        self.host_id.as_deref() == Some(conn_id)
    }

    /// Add a player, seeding their inventory from the room defaults. The
    /// first player to join becomes host. Returns false when the connection
    /// id is already present or the name is already taken.
    pub fn add_player(&mut self, conn_id: impl Into<String>, name: impl Into<String>) -> bool {
        let conn_id = conn_id.into();
        let name = name.into();
        if self.players.contains_key(&conn_id) || self.player_by_name(&name).is_some() {
            return false;
        }

        let mut player = Player::new(conn_id.clone(), name);
        seed_inventory(&mut player, &self.default_truths, &self.default_dares);

        if self.host_id.is_none() {
            self.host_id = Some(conn_id.clone());
        }
        self.players.insert(conn_id, player);
        true
    }

    /// Remove a player. When the host leaves, the oldest remaining player is
    /// promoted. Returns false when the connection id was unknown.
    pub fn remove_player(&mut self, conn_id: &str) -> bool {
        if self.players.shift_remove(conn_id).is_none() {
            return false;
        }
        if self.host_id.as_deref() == Some(conn_id) {
            self.host_id = self.players.keys().next().cloned();
        }
        true
    }

    /// Number of players in the room.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Whether the room has no players left.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Iterate over players in join order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Whether any player uses `conn_id`.
    pub fn has_player(&self, conn_id: &str) -> bool {
        self.players.contains_key(conn_id)
    }

    /// Look up a player by connection id.
    pub fn player_by_conn(&self, conn_id: &str) -> Option<&Player> {
        self.players.get(conn_id)
    }

    /// Mutable lookup by connection id.
    pub fn player_by_conn_mut(&mut self, conn_id: &str) -> Option<&mut Player> {
        self.players.get_mut(conn_id)
    }

    /// Look up a player by display name.
    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.values().find(|p| p.name == name)
    }

    /// Mutable lookup by display name.
    pub fn player_by_name_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.values_mut().find(|p| p.name == name)
    }

    /// Player names in join order.
    pub fn player_names(&self) -> Vec<String> {
        self.players.values().map(|p| p.name.clone()).collect()
    }

    /// Reset every player's round submission counter.
    pub fn reset_round_submissions(&mut self) {
        for player in self.players.values_mut() {
            player.reset_round_submissions();
        }
    }

    /// Append a completed round to the history.
    pub fn add_round_record(&mut self, record: RoundRecord) {
        self.round_history.push(record);
    }

    /// The round history, oldest first.
    pub fn round_history(&self) -> &[RoundRecord] {
        &self.round_history
    }

    /// Reset the whole room for a fresh game: machine back to the lobby,
    /// history and scores wiped, every player's inventory re-seeded from the
    /// current defaults (custom submissions are discarded).
    pub fn reset_for_new_game(&mut self) {
        self.machine.reset_for_new_game();
        self.round_history.clear();
        for player in self.players.values_mut() {
            player.reset_for_new_game();
            seed_inventory(player, &self.default_truths, &self.default_dares);
        }
    }

    /// `(name, score)` pairs sorted by score descending.
    pub fn standings(&self) -> Vec<(String, i64)> {
        let mut standings: Vec<(String, i64)> = self
            .players
            .values()
            .map(|p| (p.name.clone(), p.score))
            .collect();
        standings.sort_by(|a, b| b.1.cmp(&a.1));
        standings
    }

    /// Unused texts of `kind` across the room, excluding `excluded_name`'s
    /// own inventory. Room defaults come first. Used as generation context.
    pub fn texts_for_generation(&self, kind: ItemKind, excluded_name: &str) -> Vec<String> {
        let defaults = match kind {
            ItemKind::Truth => &self.default_truths,
            ItemKind::Dare => &self.default_dares,
        };
        let mut texts = defaults.clone();
        for player in self.players.values() {
            if player.name == excluded_name {
                continue;
            }
            texts.extend(player.items(kind).iter().map(|item| item.text.clone()));
        }
        texts
    }
}

/// Fill a player's inventory from the room's default lists.
fn seed_inventory(player: &mut Player, truths: &[String], dares: &[String]) {
    for text in truths {
        player.add_item(TruthDareItem {
            text: text.clone(),
            kind: ItemKind::Truth,
            is_default: true,
            submitted_by: None,
        });
    }
    for text in dares {
        player.add_item(TruthDareItem {
            text: text.clone(),
            kind: ItemKind::Dare,
            is_default: true,
            submitted_by: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_with_defaults() -> Room {
        Room::new(
            "ABC123",
            RoomSettings::default(),
            vec!["t1".into(), "t2".into()],
            vec!["d1".into()],
        )
    }

    #[test]
    fn first_player_becomes_host_and_gets_seeded_inventory() {
        let mut room = room_with_defaults();
        assert!(room.add_player("conn-1", "Alice"));

        assert!(room.is_host("conn-1"));
        let alice = room.player_by_name("Alice").unwrap();
        assert_eq!(alice.items(ItemKind::Truth).len(), 2);
        assert_eq!(alice.items(ItemKind::Dare).len(), 1);
        assert!(alice.items(ItemKind::Truth).iter().all(|i| i.is_default));
    }

    #[test]
    fn duplicate_connection_is_rejected() {
        let mut room = room_with_defaults();
        assert!(room.add_player("conn-1", "Alice"));
        assert!(!room.add_player("conn-1", "Alice again"));
        assert_eq!(room.player_count(), 1);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut room = room_with_defaults();
        assert!(room.add_player("conn-1", "Alice"));
        assert!(!room.add_player("conn-2", "Alice"));
        assert_eq!(room.player_count(), 1);
    }

    #[test]
    fn host_passes_to_oldest_remaining_player() {
        let mut room = room_with_defaults();
        room.add_player("conn-1", "Alice");
        room.add_player("conn-2", "Bob");
        room.add_player("conn-3", "Carol");

        assert!(room.remove_player("conn-1"));
        assert!(room.is_host("conn-2"));

        assert!(room.remove_player("conn-2"));
        assert!(room.is_host("conn-3"));

        assert!(room.remove_player("conn-3"));
        assert!(room.is_empty());
        assert_eq!(room.host_id(), None);
    }

    #[test]
    fn take_random_item_drains_the_inventory() {
        let mut room = room_with_defaults();
        room.add_player("conn-1", "Alice");

        let alice = room.player_by_name_mut("Alice").unwrap();
        assert!(alice.take_random_item(ItemKind::Truth).is_some());
        assert!(alice.take_random_item(ItemKind::Truth).is_some());
        assert!(alice.take_random_item(ItemKind::Truth).is_none());
    }

    #[test]
    fn reset_reseeds_inventories_and_wipes_scores() {
        let mut room = room_with_defaults();
        room.add_player("conn-1", "Alice");
        room.add_player("conn-2", "Bob");

        let alice = room.player_by_name_mut("Alice").unwrap();
        alice.add_score(150);
        alice.note_submission();
        alice.take_random_item(ItemKind::Truth);
        alice.add_item(TruthDareItem {
            text: "custom".into(),
            kind: ItemKind::Truth,
            is_default: false,
            submitted_by: Some("Bob".into()),
        });
        room.add_round_record(RoundRecord {
            round_number: 1,
            performer: "Alice".into(),
            text: "t1".into(),
            kind: ItemKind::Truth,
            submitted_by: None,
        });

        room.reset_for_new_game();

        assert!(room.round_history().is_empty());
        let alice = room.player_by_name("Alice").unwrap();
        assert_eq!(alice.score, 0);
        assert_eq!(alice.submissions_this_round, 0);
        // Back to the defaults only; the custom item is gone.
        assert_eq!(alice.items(ItemKind::Truth).len(), 2);
        assert!(alice.items(ItemKind::Truth).iter().all(|i| i.is_default));
    }

    #[test]
    fn standings_sort_by_score_descending() {
        let mut room = room_with_defaults();
        room.add_player("conn-1", "Alice");
        room.add_player("conn-2", "Bob");
        room.player_by_name_mut("Bob").unwrap().add_score(50);

        let standings = room.standings();
        assert_eq!(standings[0], ("Bob".to_string(), 50));
        assert_eq!(standings[1], ("Alice".to_string(), 0));
    }

    #[test]
    fn generation_context_excludes_the_performer() {
        let mut room = room_with_defaults();
        room.add_player("conn-1", "Alice");
        room.add_player("conn-2", "Bob");

        let texts = room.texts_for_generation(ItemKind::Truth, "Alice");
        // Room defaults plus Bob's two seeded truths, none of Alice's.
        assert_eq!(texts.len(), 4);
    }

    #[test]
    fn round_record_serializes_null_submitter_for_defaults() {
        let record = RoundRecord {
            round_number: 1,
            performer: "Alice".into(),
            text: "t1".into(),
            kind: ItemKind::Truth,
            submitted_by: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["submitted_by"], serde_json::Value::Null);
        assert_eq!(value["kind"], "truth");
    }
}
