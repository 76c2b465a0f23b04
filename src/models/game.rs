//! Phase 2 structures: knockout matches between team winners.

use crate::models::participant::Participant;
use serde::{Deserialize, Serialize};

/// Identifier of a winners-bracket match, e.g. `final_r1m2`.
pub type MatchId = String;

/// Which side of a match.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    A,
    B,
}

/// One side of a match: a known participant, or the winner of an earlier match.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Slot {
    Resolved(Participant),
    Pending(MatchId),
}

impl Slot {
    pub fn participant(&self) -> Option<&Participant> {
        match self {
            Slot::Resolved(name) => Some(name),
            Slot::Pending(_) => None,
        }
    }

    /// True if this slot waits on the winner of `match_id`.
    pub fn is_pending_on(&self, match_id: &str) -> bool {
        matches!(self, Slot::Pending(source) if source == match_id)
    }
}

/// A single knockout match.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BracketMatch {
    pub id: MatchId,
    pub round_number: u32,
    pub slot_a: Slot,
    pub slot_b: Slot,
    /// None until a winner is selected.
    pub winner_slot: Option<Side>,
    pub completed: bool,
}

impl BracketMatch {
    /// `index` is the 0-based position of the match within its round.
    pub fn new(round_number: u32, index: usize, slot_a: Slot, slot_b: Slot) -> Self {
        Self {
            id: Self::match_id(round_number, index),
            round_number,
            slot_a,
            slot_b,
            winner_slot: None,
            completed: false,
        }
    }

    pub fn match_id(round_number: u32, index: usize) -> MatchId {
        format!("final_r{}m{}", round_number, index + 1)
    }

    pub fn slot(&self, side: Side) -> &Slot {
        match side {
            Side::A => &self.slot_a,
            Side::B => &self.slot_b,
        }
    }

    pub fn slot_mut(&mut self, side: Side) -> &mut Slot {
        match side {
            Side::A => &mut self.slot_a,
            Side::B => &mut self.slot_b,
        }
    }

    /// Both slots hold actual participants.
    pub fn is_ready(&self) -> bool {
        self.slot_a.participant().is_some() && self.slot_b.participant().is_some()
    }

    /// The selected winner, if any, as a participant.
    pub fn winner(&self) -> Option<&Participant> {
        self.winner_slot.and_then(|side| self.slot(side).participant())
    }

    pub fn is_pending_on(&self, match_id: &str) -> bool {
        self.slot_a.is_pending_on(match_id) || self.slot_b.is_pending_on(match_id)
    }
}

/// One round of the winners bracket.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BracketRound {
    pub round_number: u32,
    pub name: String,
    pub matches: Vec<BracketMatch>,
    /// Entrants that skip this round (odd count).
    #[serde(default)]
    pub byes: Vec<Slot>,
    /// All matches completed.
    pub completed: bool,
}

impl BracketRound {
    pub fn all_matches_completed(&self) -> bool {
        self.matches.iter().all(|m| m.completed)
    }
}

/// Knockout bracket among phase-1 winners.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct WinnersBracket {
    pub rounds: Vec<BracketRound>,
    /// The final has been played.
    pub completed: bool,
}

impl WinnersBracket {
    /// (round index, match index) of a match, both 0-based.
    pub fn locate(&self, match_id: &str) -> Option<(usize, usize)> {
        self.rounds.iter().enumerate().find_map(|(r, round)| {
            round
                .matches
                .iter()
                .position(|m| m.id == match_id)
                .map(|k| (r, k))
        })
    }

    pub fn find_match(&self, match_id: &str) -> Option<&BracketMatch> {
        self.locate(match_id)
            .map(|(r, k)| &self.rounds[r].matches[k])
    }

    pub fn find_match_mut(&mut self, match_id: &str) -> Option<&mut BracketMatch> {
        self.locate(match_id)
            .map(move |(r, k)| &mut self.rounds[r].matches[k])
    }

    pub fn final_match(&self) -> Option<&BracketMatch> {
        self.rounds.last().and_then(|r| r.matches.first())
    }

    /// Display text for a slot: the name, or `Winner of Match N`.
    pub fn slot_label(&self, slot: &Slot) -> String {
        match slot {
            Slot::Resolved(name) => name.clone(),
            Slot::Pending(source) => match self.locate(source) {
                Some((_, k)) => format!("Winner of Match {}", k + 1),
                None => format!("Winner of {source}"),
            },
        }
    }
}
