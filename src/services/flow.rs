//! Phase-advance logic: what happens when a phase deadline expires or a
//! minigame vote resolves. This is the single home for the round loop;
//! commands and the per-room monitor both funnel through it.

use std::sync::Arc;

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{debug, error, info, warn};

use crate::error::FlowError;
use crate::services::generator;
use crate::services::orchestrator::GameOrchestrator;
use crate::state::RoomHandle;
use crate::state::machine::Phase;
use crate::state::minigame::{Contestant, Minigame};
use crate::state::room::{ItemKind, Room, RoundRecord, TruthDareItem};
use crate::state::scoring::{self, PointKind};

/// Work left over after a truth/dare entry that needs the generator: the
/// room lock is released while generation runs, then the result is committed.
pub(crate) struct PendingGeneration {
    kind: ItemKind,
    performer: String,
    context: Vec<String>,
}

/// Drive the transition for an expired phase deadline.
///
/// Holds the room lock across mutate-and-broadcast so observers never see
/// two transitions interleaved. Re-checks expiry under the lock first: a
/// skip activation or a resolved minigame may have rewritten the deadline
/// between the monitor's wakeup and this call.
pub(crate) async fn advance_on_expiry(orch: &Arc<GameOrchestrator>, handle: &Arc<RoomHandle>) {
    let pending = {
        let mut room = handle.lock().await;
        if !room.machine.is_expired() {
            return;
        }
        let phase = room.machine.phase();
        let outcome = match phase {
            Phase::Countdown => enter_preparation(&mut room).map(|_| None),
            Phase::Preparation => enter_round(&mut room).map(|_| None),
            Phase::Selection => enter_truth_dare(&mut room),
            Phase::TruthDare => complete_round(&mut room).map(|_| None),
            // Untimed phases never carry a deadline to expire.
            Phase::Lobby | Phase::Minigame | Phase::EndGame => Ok(None),
        };
        let pending = match outcome {
            Ok(pending) => pending,
            Err(err) => {
                error!(room = %room.code(), from = ?phase, %err, "phase advance failed; parking room");
                room.machine.suspend_deadline();
                None
            }
        };
        handle.publish_deadline(&room);
        // While generation is pending this snapshot shows the truth/dare
        // phase with no item yet; the commit broadcasts a second one.
        orch.broadcast_room(&room);
        pending
    };

    if let Some(pending) = pending {
        commit_generated_item(orch, handle.code(), pending).await;
    }
}

/// Re-arm a parked timed phase once the roster can support play again.
/// Returns whether a deadline was restored.
pub(crate) fn resume_if_parked(room: &mut Room) -> bool {
    if !room.machine.started() || room.player_count() < 2 {
        return false;
    }
    let phase = room.machine.phase();
    if room.machine.remaining_seconds().is_some() {
        return false;
    }
    let duration = match phase {
        Phase::Countdown => room.settings.countdown(),
        Phase::Preparation => room.settings.preparation(),
        Phase::Selection => room.settings.selection(),
        Phase::TruthDare => room.settings.truth_dare(),
        Phase::Lobby | Phase::Minigame | Phase::EndGame => return false,
    };
    info!(room = %room.code(), from = ?phase, "roster recovered; phase timer re-armed");
    room.machine.resume_deadline(duration);
    true
}

/// Enter preparation for the next round and reset the submission counters.
fn enter_preparation(room: &mut Room) -> Result<(), FlowError> {
    room.machine.start_preparation(room.settings.preparation())?;
    room.reset_round_submissions();
    debug!(room = %room.code(), round = room.machine.current_round(), "preparation started");
    Ok(())
}

/// Preparation expired: roll the minigame chance and enter either a staring
/// contest or a normal selection.
///
/// A contest needs an audience, so the minigame path requires at least three
/// players; with exactly two the round always goes to selection.
fn enter_round(room: &mut Room) -> Result<(), FlowError> {
    let count = room.player_count();
    if count < 2 {
        warn!(room = %room.code(), players = count, "too few players to continue; parking room");
        room.machine.suspend_deadline();
        return Ok(());
    }

    let chance = f64::from(room.settings.minigame_chance_percent) / 100.0;
    let mut rng = rand::rng();
    if count >= 3 && rng.random_bool(chance.min(1.0)) {
        let roster: Vec<(String, String)> = room
            .players()
            .map(|p| (p.conn_id.clone(), p.name.clone()))
            .collect();
        let picks = rand::seq::index::sample(&mut rng, roster.len(), 2);

        let mut minigame = Minigame::new();
        let mut participant_ids = Vec::with_capacity(2);
        for index in picks.iter() {
            let (conn_id, name) = &roster[index];
            minigame.add_participant(Contestant {
                conn_id: conn_id.clone(),
                name: name.clone(),
            });
            participant_ids.push(conn_id.clone());
        }
        minigame.set_total_voters(count - 2);

        for conn_id in &participant_ids {
            if let Some(player) = room.player_by_conn_mut(conn_id) {
                scoring::award(player, PointKind::MinigameParticipation);
            }
        }

        info!(
            room = %room.code(),
            participants = ?minigame.participant_names(),
            voters = count - 2,
            "staring contest drawn"
        );
        room.machine.begin_minigame(minigame)?;
    } else {
        let names = room.player_names();
        if let Some(performer) = names.choose(&mut rng).cloned() {
            info!(room = %room.code(), %performer, "performer selected");
            room.machine
                .start_selection(room.settings.selection(), performer)?;
        }
    }
    Ok(())
}

/// Selection expired: randomize a missing choice, enter truth/dare and draw
/// an item from the performer's inventory.
///
/// When the inventory is dry and generation is enabled, the draw is deferred:
/// the returned [`PendingGeneration`] is resolved by
/// [`commit_generated_item`] without holding the room lock. With generation
/// disabled the placeholder is applied immediately and the skip activates.
fn enter_truth_dare(room: &mut Room) -> Result<Option<PendingGeneration>, FlowError> {
    room.machine.randomize_choice_if_unset();
    let kind = room.machine.selected_choice().unwrap_or(ItemKind::Truth);
    let performer = room.machine.selected_player().map(str::to_string);

    room.machine.start_truth_dare(room.settings.truth_dare())?;

    let Some(name) = performer else {
        warn!(room = %room.code(), "entered truth_dare with no performer");
        return Ok(None);
    };

    let drawn = room
        .player_by_name_mut(&name)
        .and_then(|p| p.take_random_item(kind));

    match drawn {
        Some(item) => {
            debug!(room = %room.code(), performer = %name, %kind, "item drawn from inventory");
            room.machine.set_current_item(item);
            Ok(None)
        }
        None if room.settings.ai_generation_enabled => {
            let context = room.texts_for_generation(kind, &name);
            info!(
                room = %room.code(),
                performer = %name,
                %kind,
                context = context.len(),
                "inventory empty; attempting generation"
            );
            Ok(Some(PendingGeneration {
                kind,
                performer: name,
                context,
            }))
        }
        None => {
            apply_empty_fallback(room, &name, kind);
            Ok(None)
        }
    }
}

/// Commit a generation result produced outside the room lock.
///
/// The room is re-fetched by code: it may have been deleted, or the phase
/// may have moved on, in which case the result is discarded.
async fn commit_generated_item(
    orch: &Arc<GameOrchestrator>,
    code: &str,
    pending: PendingGeneration,
) {
    let generated =
        generator::generate_with_retries(orch.generator(), pending.kind, &pending.context).await;

    let Some(handle) = orch.room(code) else {
        debug!(room = %code, "room gone before generation finished");
        return;
    };
    let mut room = handle.lock().await;
    if room.machine.phase() != Phase::TruthDare || room.machine.current_item().is_some() {
        debug!(room = %code, "stale generation result discarded");
        return;
    }

    match generated {
        Some(text) => {
            info!(room = %code, performer = %pending.performer, "generated item committed");
            room.machine.set_current_item(TruthDareItem {
                text,
                kind: pending.kind,
                is_default: false,
                submitted_by: Some("AI".to_string()),
            });
        }
        None => apply_empty_fallback(&mut room, &pending.performer, pending.kind),
    }

    handle.publish_deadline(&room);
    orch.broadcast_room(&room);
}

/// No item could be drawn or generated: show the placeholder, raise the
/// empty-list banner and cut the phase down to the skip duration.
fn apply_empty_fallback(room: &mut Room, performer: &str, kind: ItemKind) {
    warn!(room = %room.code(), %performer, %kind, "no content available; activating skip");
    let skip = room.settings.skip();
    room.machine.set_current_item(TruthDareItem {
        text: format!("{performer} has no more {kind}s available!"),
        kind,
        is_default: false,
        submitted_by: None,
    });
    room.machine.mark_list_empty();
    room.machine.activate_skip(skip);
}

/// Truth/dare expired: award points, record the round, and either continue
/// to the next preparation or finish the game.
fn complete_round(room: &mut Room) -> Result<(), FlowError> {
    let performer = room.machine.selected_player().map(str::to_string);
    if let Some(name) = &performer {
        if let Some(player) = room.player_by_name_mut(name) {
            scoring::award(player, PointKind::Perform);
        }
    }

    if let Some(item) = room.machine.current_item().cloned() {
        if let Some(submitter) = &item.submitted_by {
            if let Some(player) = room.player_by_name_mut(submitter) {
                scoring::award(player, PointKind::SubmissionPerformed);
            }
        }
        if let Some(name) = &performer {
            room.add_round_record(RoundRecord {
                round_number: room.machine.current_round(),
                performer: name.clone(),
                text: item.text,
                kind: item.kind,
                submitted_by: item.submitted_by,
            });
        }
    }

    if room.machine.should_end_game(room.settings.max_rounds) {
        room.machine.start_end_game()?;
        info!(room = %room.code(), rounds = room.machine.current_round(), "game over");
    } else {
        enter_preparation(room)?;
    }
    Ok(())
}

/// Resolve the active minigame if a vote just decided it, moving the loser
/// into selection. Returns whether a resolution happened.
pub(crate) fn resolve_minigame_if_decided(room: &mut Room) -> Result<bool, FlowError> {
    let loser = {
        let Some(minigame) = room.machine.minigame_mut() else {
            return Ok(false);
        };
        if let Some(loser) = minigame.check_immediate_winner()? {
            Some(loser)
        } else if minigame.total_voters() > 0 && minigame.all_voted() {
            Some(minigame.resolve_after_all_voted()?)
        } else {
            None
        }
    };

    match loser {
        Some(loser) => {
            info!(room = %room.code(), loser = %loser.name, "staring contest resolved");
            room.machine
                .start_selection(room.settings.selection(), loser.name)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
