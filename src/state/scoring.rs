use tracing::debug;

use crate::state::room::Player;

/// Maximum custom submissions a player may make per round.
pub const MAX_SUBMISSIONS_PER_ROUND: u32 = 3;

/// The scoreable actions and their point values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    /// Performing a truth or dare.
    Perform,
    /// Being drafted into a minigame.
    MinigameParticipation,
    /// Having a submitted item performed by someone else.
    SubmissionPerformed,
    /// Submitting a custom item.
    Submission,
}

impl PointKind {
    /// Point value awarded for this action.
    pub fn points(self) -> i64 {
        match self {
            PointKind::Perform => 100,
            PointKind::MinigameParticipation => 75,
            PointKind::SubmissionPerformed => 50,
            PointKind::Submission => 10,
        }
    }
}

/// Apply the score side effect for `kind` to `player`.
pub fn award(player: &mut Player, kind: PointKind) {
    player.add_score(kind.points());
    debug!(player = %player.name, ?kind, points = kind.points(), "points awarded");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_values_rank_perform_highest() {
        assert_eq!(PointKind::Perform.points(), 100);
        assert_eq!(PointKind::MinigameParticipation.points(), 75);
        assert_eq!(PointKind::SubmissionPerformed.points(), 50);
        assert_eq!(PointKind::Submission.points(), 10);
    }

    #[test]
    fn award_adds_to_the_score() {
        let mut player = Player::new("conn-1", "Alice");
        award(&mut player, PointKind::Perform);
        award(&mut player, PointKind::Submission);
        assert_eq!(player.score, 110);
    }
}
