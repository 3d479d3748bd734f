use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::state::clock::PhaseClock;
use crate::state::minigame::Minigame;
use crate::state::room::{ItemKind, TruthDareItem};
use crate::state::votes::{VoteTally, majority_threshold};

/// One stage of the per-round game loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for the host to start; players join and leave freely.
    #[default]
    Lobby,
    /// Countdown shown before the first round.
    Countdown,
    /// Between rounds: players submit custom items.
    Preparation,
    /// A staring contest is running; resolved by audience vote, untimed.
    Minigame,
    /// The performer picks truth or dare.
    Selection,
    /// The performer carries out the selected item.
    TruthDare,
    /// Final standings are shown; untimed, host may restart.
    EndGame,
}

impl Phase {
    /// Whether this phase runs against a deadline.
    pub fn is_timed(self) -> bool {
        matches!(
            self,
            Phase::Countdown | Phase::Preparation | Phase::Selection | Phase::TruthDare
        )
    }
}

/// A transition was requested from a phase it is not valid in.
///
/// Public commands never produce this: they check the phase first and reject
/// silently. Seeing it means a caller drove the machine out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot enter {to:?} from {from:?}")]
pub struct TransitionError {
    /// Phase the machine was in.
    pub from: Phase,
    /// Phase that was requested.
    pub to: Phase,
}

/// The per-room phase state machine.
///
/// Owns the current phase, its deadline, the round counter, the selected
/// performer and item, the skip-vote tally and the active minigame. All
/// transitions are explicit operations; nothing advances implicitly.
///
/// Phase-scoped clearing rules:
/// - `start_preparation` clears every round-scoped field (selection, item,
///   minigame, skip state) and bumps the round counter by exactly one.
/// - `start_truth_dare` clears the skip state again on entry, so a skip vote
///   can never leak across performances.
#[derive(Debug, Default)]
pub struct RoomPhaseMachine {
    phase: Phase,
    clock: PhaseClock,
    started: bool,
    current_round: u32,
    selected_player: Option<String>,
    selected_choice: Option<ItemKind>,
    current_item: Option<TruthDareItem>,
    minigame: Option<Minigame>,
    skip_votes: VoteTally<()>,
    skip_activated: bool,
    list_empty: bool,
}

impl RoomPhaseMachine {
    /// Create a machine in the lobby phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether a game has been started since the last reset.
    pub fn started(&self) -> bool {
        self.started
    }

    /// Rounds entered so far; the value reported during round N is N.
    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    /// Name of the selected performer, if one has been drawn.
    pub fn selected_player(&self) -> Option<&str> {
        self.selected_player.as_deref()
    }

    /// The performer's truth-or-dare choice, once made or randomized.
    pub fn selected_choice(&self) -> Option<ItemKind> {
        self.selected_choice
    }

    /// The item being performed, once drawn or generated.
    pub fn current_item(&self) -> Option<&TruthDareItem> {
        self.current_item.as_ref()
    }

    /// The active minigame, if any.
    pub fn minigame(&self) -> Option<&Minigame> {
        self.minigame.as_ref()
    }

    /// Mutable access to the active minigame, for vote resolution.
    pub fn minigame_mut(&mut self) -> Option<&mut Minigame> {
        self.minigame.as_mut()
    }

    /// Number of skip votes cast this performance.
    pub fn skip_vote_count(&self) -> usize {
        self.skip_votes.len()
    }

    /// Whether a skip has been activated for the current performance.
    pub fn skip_activated(&self) -> bool {
        self.skip_activated
    }

    /// Whether the performer's list was empty and no item could be generated.
    pub fn list_empty(&self) -> bool {
        self.list_empty
    }

    /// Seconds left in the current phase; `None` for untimed phases.
    pub fn remaining_seconds(&self) -> Option<u64> {
        self.clock.remaining_seconds()
    }

    /// Whether the current phase's deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.clock.is_expired()
    }

    /// Absolute deadline of the current phase, if timed.
    pub fn deadline(&self) -> Option<Instant> {
        self.clock.deadline()
    }

    /// Park the machine with no deadline without leaving the current phase.
    /// Used when a room drops below the minimum roster mid-game so the
    /// monitor idles instead of re-firing an expired timer.
    pub fn suspend_deadline(&mut self) {
        self.clock.start_untimed();
    }

    /// Give a parked machine a fresh deadline without leaving the phase.
    /// No-op on untimed phases.
    pub fn resume_deadline(&mut self, duration: Duration) {
        if self.phase.is_timed() {
            self.clock.start_timed(duration);
        }
    }

    /// Enter the countdown phase from the lobby.
    pub fn start_countdown(&mut self, duration: Duration) -> Result<(), TransitionError> {
        self.expect_phase(&[Phase::Lobby], Phase::Countdown)?;
        self.phase = Phase::Countdown;
        self.clock.start_timed(duration);
        self.started = true;
        Ok(())
    }

    /// Enter preparation, bumping the round counter and clearing all
    /// round-scoped state.
    pub fn start_preparation(&mut self, duration: Duration) -> Result<(), TransitionError> {
        self.expect_phase(&[Phase::Countdown, Phase::TruthDare], Phase::Preparation)?;
        self.phase = Phase::Preparation;
        self.clock.start_timed(duration);
        self.current_round += 1;
        self.clear_round_state();
        Ok(())
    }

    /// Enter the untimed minigame phase with `minigame` active.
    pub fn begin_minigame(&mut self, minigame: Minigame) -> Result<(), TransitionError> {
        self.expect_phase(&[Phase::Preparation], Phase::Minigame)?;
        self.phase = Phase::Minigame;
        self.clock.start_untimed();
        self.minigame = Some(minigame);
        Ok(())
    }

    /// Enter selection with `performer` on the spot. Any prior choice is
    /// cleared; the performer picks (or the expiry randomizes) a fresh one.
    pub fn start_selection(
        &mut self,
        duration: Duration,
        performer: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.expect_phase(&[Phase::Preparation, Phase::Minigame], Phase::Selection)?;
        self.phase = Phase::Selection;
        self.clock.start_timed(duration);
        self.selected_player = Some(performer.into());
        self.selected_choice = None;
        Ok(())
    }

    /// Enter the truth/dare phase. The skip state is cleared exactly here;
    /// the item is committed separately via [`Self::set_current_item`]
    /// because drawing or generating it involves the roster and the
    /// generator collaborator.
    pub fn start_truth_dare(&mut self, duration: Duration) -> Result<(), TransitionError> {
        self.expect_phase(&[Phase::Selection], Phase::TruthDare)?;
        self.phase = Phase::TruthDare;
        self.clock.start_timed(duration);
        self.skip_votes.clear();
        self.skip_activated = false;
        self.list_empty = false;
        self.current_item = None;
        Ok(())
    }

    /// Enter the untimed end-game phase.
    pub fn start_end_game(&mut self) -> Result<(), TransitionError> {
        self.expect_phase(&[Phase::TruthDare], Phase::EndGame)?;
        self.phase = Phase::EndGame;
        self.clock.start_untimed();
        Ok(())
    }

    /// Return to the lobby for a fresh game: round counter back to zero,
    /// all round state cleared. Scores are a roster concern and untouched.
    pub fn reset_for_new_game(&mut self) {
        self.phase = Phase::Lobby;
        self.clock.start_untimed();
        self.started = false;
        self.current_round = 0;
        self.clear_round_state();
    }

    /// Record the performer's truth-or-dare choice. Valid only during
    /// selection and only for the selected player; anything else is a
    /// silent reject.
    pub fn set_choice(&mut self, actor_name: &str, choice: ItemKind) -> bool {
        if self.phase != Phase::Selection {
            return false;
        }
        if self.selected_player.as_deref() != Some(actor_name) {
            return false;
        }
        self.selected_choice = Some(choice);
        true
    }

    /// Coin-flip a choice when the selection phase expires without one.
    pub fn randomize_choice_if_unset(&mut self) {
        if self.selected_choice.is_none() {
            self.selected_choice = Some(if rand::rng().random_bool(0.5) {
                ItemKind::Truth
            } else {
                ItemKind::Dare
            });
        }
    }

    /// Commit the item the performer will act out.
    pub fn set_current_item(&mut self, item: TruthDareItem) {
        self.current_item = Some(item);
    }

    /// Flag that no content was available for the performer.
    pub fn mark_list_empty(&mut self) {
        self.list_empty = true;
    }

    /// Cast a skip vote during the truth/dare phase.
    ///
    /// Rejected (returns false) outside truth/dare, once a skip is already
    /// active, when the voter is the performer, or on a duplicate vote.
    /// When the tally reaches the majority of `eligible_voters` (room size
    /// minus the performer) the skip activates and the deadline is forced to
    /// `skip_duration` from now.
    pub fn cast_skip_vote(
        &mut self,
        voter_id: &str,
        voter_name: &str,
        eligible_voters: usize,
        skip_duration: Duration,
    ) -> bool {
        if self.phase != Phase::TruthDare || self.skip_activated {
            return false;
        }
        if self.selected_player.as_deref() == Some(voter_name) {
            return false;
        }
        if !self.skip_votes.add_vote(voter_id, ()) {
            return false;
        }
        if self.skip_votes.len() >= majority_threshold(eligible_voters) {
            self.activate_skip(skip_duration);
        }
        true
    }

    /// Activate the skip: latch the flag and cut the deadline down to
    /// `skip_duration`. No-op when already active or outside truth/dare.
    pub fn activate_skip(&mut self, skip_duration: Duration) {
        if self.phase != Phase::TruthDare || self.skip_activated {
            return;
        }
        self.skip_activated = true;
        self.clock.force_expire_in(skip_duration);
    }

    /// Cast a minigame vote on behalf of `voter_id` against `voted_name`.
    ///
    /// Rejected outside the minigame phase, with no or a completed contest,
    /// when the voter is a participant, when the target is not a
    /// participant, or on a duplicate vote. Stale votes arriving after the
    /// contest resolved fall out of these same checks.
    pub fn cast_minigame_vote(&mut self, voter_id: &str, voted_name: &str) -> bool {
        if self.phase != Phase::Minigame {
            return false;
        }
        let Some(minigame) = self.minigame.as_mut() else {
            return false;
        };
        if minigame.is_complete() || minigame.is_participant(voter_id) {
            return false;
        }
        if !minigame.is_participant_name(voted_name) {
            return false;
        }
        minigame.cast_vote(voter_id, voted_name)
    }

    /// Whether the game should end instead of entering another round.
    pub fn should_end_game(&self, max_rounds: u32) -> bool {
        self.current_round >= max_rounds
    }

    fn clear_round_state(&mut self) {
        self.selected_player = None;
        self.selected_choice = None;
        self.current_item = None;
        self.minigame = None;
        self.skip_votes.clear();
        self.skip_activated = false;
        self.list_empty = false;
    }

    fn expect_phase(&self, allowed: &[Phase], to: Phase) -> Result<(), TransitionError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(TransitionError {
                from: self.phase,
                to,
            })
        }
    }
}
