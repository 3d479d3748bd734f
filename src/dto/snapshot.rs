use std::collections::HashMap;

use serde::Serialize;

use crate::state::machine::Phase;
use crate::state::minigame::Minigame;
use crate::state::room::{ItemKind, Room, RoundRecord, TruthDareItem};

/// How many players the end-game leaderboard highlights.
const TOP_PLAYER_COUNT: usize = 5;

/// The item currently being performed, as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemSnapshot {
    /// Prompt text.
    pub text: String,
    /// Truth or dare.
    pub kind: ItemKind,
    /// Whether it came from the room defaults.
    pub is_default: bool,
    /// Submitting player, `None` for defaults and placeholders.
    pub submitted_by: Option<String>,
}

impl From<&TruthDareItem> for ItemSnapshot {
    fn from(item: &TruthDareItem) -> Self {
        Self {
            text: item.text.clone(),
            kind: item.kind,
            is_default: item.is_default,
            submitted_by: item.submitted_by.clone(),
        }
    }
}

/// Serialized view of the active minigame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinigameSnapshot {
    /// Contest flavor; currently always `staring_contest`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The two participant names, in draw order.
    pub participants: Vec<String>,
    /// Vote counts keyed by participant name.
    pub vote_counts: HashMap<String, usize>,
    /// Audience size.
    pub total_voters: usize,
    /// Winner name, once resolved.
    pub winner: Option<String>,
    /// Loser name, once resolved.
    pub loser: Option<String>,
    /// Whether the contest has been resolved.
    pub complete: bool,
}

impl From<&Minigame> for MinigameSnapshot {
    fn from(minigame: &Minigame) -> Self {
        Self {
            kind: "staring_contest".to_string(),
            participants: minigame.participant_names(),
            vote_counts: minigame.vote_counts(),
            total_voters: minigame.total_voters(),
            winner: minigame.winner().map(|c| c.name.clone()),
            loser: minigame.loser().map(|c| c.name.clone()),
            complete: minigame.is_complete(),
        }
    }
}

/// One row of the final scoreboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerStanding {
    /// Player display name.
    pub name: String,
    /// Final score.
    pub score: i64,
}

/// End-of-game statistics attached to the final snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndGameSummary {
    /// Every completed round, oldest first.
    pub round_history: Vec<RoundRecord>,
    /// The leaderboard, best first, capped at five entries.
    pub top_players: Vec<PlayerStanding>,
    /// All players with their final scores, in join order.
    pub all_players: Vec<PlayerStanding>,
}

/// Full room state broadcast to clients after every accepted mutation.
///
/// `remaining_seconds` is `null` for untimed phases (lobby, minigame,
/// end game) rather than `0`, so clients can tell "no deadline" from
/// "expired".
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    /// Current phase.
    pub phase: Phase,
    /// Seconds left in the phase, `null` when untimed.
    pub remaining_seconds: Option<u64>,
    /// Whether a game is in progress.
    pub started: bool,
    /// Round currently being played, 0 before the first round.
    pub current_round: u32,
    /// Configured number of rounds.
    pub max_rounds: u32,
    /// Selected performer, if drawn.
    pub selected_player: Option<String>,
    /// The performer's choice, once made.
    pub selected_choice: Option<ItemKind>,
    /// The item being performed, once drawn.
    pub current_item: Option<ItemSnapshot>,
    /// Skip votes cast this performance.
    pub skip_vote_count: usize,
    /// Whether the skip has been activated.
    pub skip_activated: bool,
    /// Whether the performer had no content available.
    pub list_empty: bool,
    /// The active minigame, present only during and after a contest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minigame: Option<MinigameSnapshot>,
    /// Final statistics, present only in the end-game phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_game: Option<EndGameSummary>,
}

impl GameSnapshot {
    /// Capture the current state of `room`.
    pub fn capture(room: &Room) -> Self {
        let machine = &room.machine;
        let end_game = (machine.phase() == Phase::EndGame).then(|| {
            let standings = room.standings();
            EndGameSummary {
                round_history: room.round_history().to_vec(),
                top_players: standings
                    .iter()
                    .take(TOP_PLAYER_COUNT)
                    .map(|(name, score)| PlayerStanding {
                        name: name.clone(),
                        score: *score,
                    })
                    .collect(),
                all_players: room
                    .players()
                    .map(|p| PlayerStanding {
                        name: p.name.clone(),
                        score: p.score,
                    })
                    .collect(),
            }
        });

        Self {
            phase: machine.phase(),
            remaining_seconds: machine.remaining_seconds(),
            started: machine.started(),
            current_round: machine.current_round(),
            max_rounds: room.settings.max_rounds,
            selected_player: machine.selected_player().map(str::to_string),
            selected_choice: machine.selected_choice(),
            current_item: machine.current_item().map(ItemSnapshot::from),
            skip_vote_count: machine.skip_vote_count(),
            skip_activated: machine.skip_activated(),
            list_empty: machine.list_empty(),
            minigame: machine.minigame().map(MinigameSnapshot::from),
            end_game,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::room::RoomSettings;

    #[test]
    fn lobby_snapshot_has_null_remaining_time() {
        let mut room = Room::new("ABC123", RoomSettings::default(), vec![], vec![]);
        room.add_player("conn-1", "Alice");

        let snapshot = GameSnapshot::capture(&room);
        assert_eq!(snapshot.phase, Phase::Lobby);
        assert!(!snapshot.started);

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["phase"], "lobby");
        assert_eq!(value["remaining_seconds"], serde_json::Value::Null);
        assert!(value.get("minigame").is_none());
        assert!(value.get("end_game").is_none());
    }

    #[test]
    fn end_game_snapshot_carries_history_and_standings() {
        let mut room = Room::new("ABC123", RoomSettings::default(), vec![], vec![]);
        room.add_player("conn-1", "Alice");
        room.add_player("conn-2", "Bob");
        room.player_by_name_mut("Bob").unwrap().add_score(100);
        room.add_round_record(RoundRecord {
            round_number: 1,
            performer: "Bob".into(),
            text: "sing a song".into(),
            kind: ItemKind::Dare,
            submitted_by: Some("Alice".into()),
        });

        room.machine.start_countdown(std::time::Duration::from_secs(1)).unwrap();
        room.machine.start_preparation(std::time::Duration::from_secs(1)).unwrap();
        room.machine.start_selection(std::time::Duration::from_secs(1), "Bob").unwrap();
        room.machine.randomize_choice_if_unset();
        room.machine.start_truth_dare(std::time::Duration::from_secs(1)).unwrap();
        room.machine.start_end_game().unwrap();

        let snapshot = GameSnapshot::capture(&room);
        let summary = snapshot.end_game.expect("end game summary");
        assert_eq!(summary.round_history.len(), 1);
        assert_eq!(summary.top_players[0].name, "Bob");
        assert_eq!(summary.all_players.len(), 2);
    }
}
