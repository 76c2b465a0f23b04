//! Phase 1 structures: a team's internal elimination rounds (4→3→2→1).

use crate::models::participant::{Participant, TeamId};
use serde::{Deserialize, Serialize};

/// Identifier of an elimination round, e.g. `team2_elimination_r1`.
pub type RoundId = String;

/// One elimination round inside a team: one player leaves, the rest move on.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EliminationRound {
    pub id: RoundId,
    /// 1-based.
    pub round_index: u32,
    pub name: String,
    /// Players still in contention. Empty until the previous round completes.
    pub players: Vec<Participant>,
    /// Player selected for elimination but not yet confirmed.
    pub staged: Option<Participant>,
    pub eliminated: Option<Participant>,
    pub completed: bool,
}

impl EliminationRound {
    /// A fresh round that `entering` players will play once it is reached.
    pub fn new(team_id: TeamId, round_index: u32, entering: usize) -> Self {
        Self {
            id: Self::round_id(team_id, round_index),
            round_index,
            name: Self::name_for(round_index, entering),
            players: Vec::new(),
            staged: None,
            eliminated: None,
            completed: false,
        }
    }

    pub fn round_id(team_id: TeamId, round_index: u32) -> RoundId {
        format!("team{team_id}_elimination_r{round_index}")
    }

    /// Display name from the number of players entering the round.
    pub fn name_for(round_index: u32, entering: usize) -> String {
        match entering {
            4 => "1st Elimination (4→3)".to_string(),
            3 => "2nd Elimination (3→2)".to_string(),
            2 => "Team Final (2→1)".to_string(),
            _ => format!("Elimination Round {round_index}"),
        }
    }

    pub fn contains(&self, player: &str) -> bool {
        self.players.iter().any(|p| p == player)
    }

    /// Players left once the eliminated player (if any) is removed, in order.
    pub fn remaining(&self) -> Vec<Participant> {
        self.players
            .iter()
            .filter(|p| Some(*p) != self.eliminated.as_ref())
            .cloned()
            .collect()
    }
}

/// A team's full internal bracket. `winner` is set iff `completed`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TeamBracket {
    pub team_id: TeamId,
    pub team_name: String,
    /// Original membership; reset rebuilds from this.
    pub members: Vec<Participant>,
    pub rounds: Vec<EliminationRound>,
    pub winner: Option<Participant>,
    pub completed: bool,
}

impl TeamBracket {
    pub fn round(&self, round_id: &str) -> Option<&EliminationRound> {
        self.rounds.iter().find(|r| r.id == round_id)
    }

    pub fn round_mut(&mut self, round_id: &str) -> Option<&mut EliminationRound> {
        self.rounds.iter_mut().find(|r| r.id == round_id)
    }

    pub fn has_round(&self, round_id: &str) -> bool {
        self.round(round_id).is_some()
    }

    /// Players expected to enter round `round_index` (1-based).
    pub fn expected_players(&self, round_index: u32) -> usize {
        (self.members.len() + 1).saturating_sub(round_index as usize)
    }

    /// First round not yet completed (the one being played).
    pub fn current_round(&self) -> Option<&EliminationRound> {
        self.rounds.iter().find(|r| !r.completed)
    }
}
