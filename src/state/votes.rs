use std::collections::HashMap;
use std::hash::Hash;

/// Number of votes needed for a strict majority of `eligible` voters.
///
/// This is the integer ceiling of `eligible / 2`, i.e. `(eligible + 1) / 2`,
/// and it is the single threshold used by both skip voting and minigame
/// immediate-winner detection. Note it is not `eligible / 2` rounded down:
/// with 4 eligible voters the threshold is 2, with 5 it is 3.
pub fn majority_threshold(eligible: usize) -> usize {
    (eligible + 1) / 2
}

/// Idempotent vote register shared by skip votes and minigame votes.
///
/// Each voter gets at most one entry; casting again is a no-op. The tally
/// counts votes and detects a decisive leader, but deliberately does not
/// resolve ties: the caller decides when a tie exists and how to break it.
#[derive(Debug, Clone)]
pub struct VoteTally<C> {
    votes: HashMap<String, C>,
}

impl<C> Default for VoteTally<C> {
    fn default() -> Self {
        Self {
            votes: HashMap::new(),
        }
    }
}

impl<C> VoteTally<C>
where
    C: Clone + Eq + Hash,
{
    /// Create an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `choice` for `voter_id`. Returns false (and changes nothing)
    /// when the voter has already voted.
    pub fn add_vote(&mut self, voter_id: &str, choice: C) -> bool {
        if self.votes.contains_key(voter_id) {
            return false;
        }
        self.votes.insert(voter_id.to_string(), choice);
        true
    }

    /// Whether `voter_id` has an entry in the tally.
    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.votes.contains_key(voter_id)
    }

    /// Number of votes cast so far.
    pub fn len(&self) -> usize {
        self.votes.len()
    }

    /// True when no votes have been cast.
    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Drop every vote.
    pub fn clear(&mut self) {
        self.votes.clear();
    }

    /// Vote count per choice.
    pub fn counts(&self) -> HashMap<C, usize> {
        let mut counts = HashMap::new();
        for choice in self.votes.values() {
            *counts.entry(choice.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// The choice that has reached [`majority_threshold`], if any.
    ///
    /// Returns `None` when nothing is decisive yet or when there is no
    /// electorate at all.
    pub fn leader_if_decisive(&self, eligible: usize) -> Option<C> {
        if eligible == 0 {
            return None;
        }
        let threshold = majority_threshold(eligible);
        self.counts()
            .into_iter()
            .find(|(_, count)| *count >= threshold)
            .map(|(choice, _)| choice)
    }

    /// Whether every eligible voter has voted.
    pub fn all_voted(&self, eligible: usize) -> bool {
        self.votes.len() >= eligible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_ceiling_of_half() {
        assert_eq!(majority_threshold(0), 0);
        assert_eq!(majority_threshold(1), 1);
        assert_eq!(majority_threshold(2), 1);
        assert_eq!(majority_threshold(3), 2);
        assert_eq!(majority_threshold(4), 2);
        assert_eq!(majority_threshold(5), 3);
    }

    #[test]
    fn duplicate_votes_are_ignored() {
        let mut tally = VoteTally::new();
        assert!(tally.is_empty());
        assert!(!tally.has_voted("conn-1"));
        assert!(tally.add_vote("conn-1", "alice"));
        assert!(tally.has_voted("conn-1"));
        assert!(!tally.add_vote("conn-1", "bob"));

        assert_eq!(tally.len(), 1);
        assert_eq!(tally.counts().get("alice"), Some(&1));
        assert_eq!(tally.counts().get("bob"), None);
    }

    #[test]
    fn leader_requires_the_majority_threshold() {
        let mut tally = VoteTally::new();
        tally.add_vote("v1", "alice");
        assert_eq!(tally.leader_if_decisive(3), None);

        tally.add_vote("v2", "alice");
        assert_eq!(tally.leader_if_decisive(3), Some("alice"));
    }

    #[test]
    fn no_electorate_means_no_decision() {
        let tally: VoteTally<&str> = VoteTally::new();
        assert_eq!(tally.leader_if_decisive(0), None);
    }

    #[test]
    fn all_voted_tracks_the_electorate_size() {
        let mut tally = VoteTally::new();
        tally.add_vote("v1", ());
        tally.add_vote("v2", ());

        assert!(!tally.all_voted(3));
        tally.add_vote("v3", ());
        assert!(tally.all_voted(3));
    }
}
