//! Tournament and TournamentState.

use crate::models::bracket::{EliminationRound, RoundId, TeamBracket};
use crate::models::game::{BracketMatch, MatchId, WinnersBracket};
use crate::models::participant::{Participant, Team, TeamId};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Errors that can occur during tournament operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TournamentError {
    /// Fewer participants than one full team.
    InsufficientParticipants { found: usize, required: usize },
    RoundNotFound(RoundId),
    RoundAlreadyCompleted(RoundId),
    PlayerNotInRound { round_id: RoundId, player: Participant },
    /// Commit requested before a player was selected for elimination.
    NoEliminationStaged(RoundId),
    MatchNotFound(MatchId),
    MatchAlreadyCompleted(MatchId),
    /// A slot of the match still waits on an earlier match.
    MatchNotReady(MatchId),
    NoWinnerStaged(MatchId),
    /// A winners bracket needs at least 2 team winners.
    NotEnoughWinners(usize),
    /// Tournament is not in a state that allows this action.
    InvalidState,
    /// Tournament data is inconsistent; the caller decides whether to reset.
    InvariantViolation(String),
    /// Malformed or incompatible snapshot document.
    DeserializationError(String),
    /// Snapshot store could not be read or written.
    Storage(String),
}

impl std::fmt::Display for TournamentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentError::InsufficientParticipants { found, required } => write!(
                f,
                "Need at least {} participants to create a tournament (found {})",
                required, found
            ),
            TournamentError::RoundNotFound(id) => write!(f, "Elimination round {} not found", id),
            TournamentError::RoundAlreadyCompleted(id) => {
                write!(f, "Elimination round {} is already completed", id)
            }
            TournamentError::PlayerNotInRound { round_id, player } => {
                write!(f, "{} is not playing in round {}", player, round_id)
            }
            TournamentError::NoEliminationStaged(_) => {
                write!(f, "Select the player to eliminate first")
            }
            TournamentError::MatchNotFound(id) => write!(f, "Match {} not found", id),
            TournamentError::MatchAlreadyCompleted(id) => {
                write!(f, "Match {} is already completed", id)
            }
            TournamentError::MatchNotReady(id) => {
                write!(f, "Match {} is still waiting for its players", id)
            }
            TournamentError::NoWinnerStaged(_) => write!(f, "Select the match winner first"),
            TournamentError::NotEnoughWinners(n) => {
                write!(f, "Need at least 2 team winners for a knockout bracket (got {})", n)
            }
            TournamentError::InvalidState => write!(f, "Invalid state for this action"),
            TournamentError::InvariantViolation(detail) => {
                write!(f, "Tournament data is inconsistent: {}", detail)
            }
            TournamentError::DeserializationError(detail) => {
                write!(f, "Invalid tournament file: {}", detail)
            }
            TournamentError::Storage(detail) => write!(f, "Snapshot storage error: {}", detail),
        }
    }
}

impl std::error::Error for TournamentError {}

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// Lifecycle of a tournament.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentState {
    /// No participants yet.
    #[default]
    Empty,
    /// Teams play their internal eliminations.
    Phase1Active,
    /// Team winners play the knockout bracket.
    Phase2Active,
    /// Champion crowned.
    Complete,
}

/// Full tournament state. Mutated only through the operations in `logic`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Tournament {
    pub(crate) id: TournamentId,
    /// Deduplicated input, in order of first appearance.
    pub(crate) participants: Vec<Participant>,
    /// Leftover participants that did not fill a team.
    pub(crate) substitutes: Vec<Participant>,
    pub(crate) teams: Vec<Team>,
    pub(crate) team_brackets: BTreeMap<TeamId, TeamBracket>,
    pub(crate) winners_bracket: Option<WinnersBracket>,
    pub(crate) state: TournamentState,
    pub(crate) champion: Option<Participant>,
    /// Team the champion was drawn into.
    pub(crate) champion_team: Option<TeamId>,
}

impl Default for Tournament {
    fn default() -> Self {
        Self::new()
    }
}

impl Tournament {
    /// Create a new, empty tournament.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: TournamentId) -> Self {
        Self {
            id,
            participants: Vec::new(),
            substitutes: Vec::new(),
            teams: Vec::new(),
            team_brackets: BTreeMap::new(),
            winners_bracket: None,
            state: TournamentState::Empty,
            champion: None,
            champion_team: None,
        }
    }

    pub fn id(&self) -> TournamentId {
        self.id
    }

    pub fn state(&self) -> TournamentState {
        self.state
    }

    /// 1 while teams play internally, 2 once the winners bracket exists.
    pub fn current_phase(&self) -> u8 {
        if self.winners_bracket.is_some() {
            2
        } else {
            1
        }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn substitutes(&self) -> &[Participant] {
        &self.substitutes
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team_brackets(&self) -> impl Iterator<Item = &TeamBracket> {
        self.team_brackets.values()
    }

    pub fn team_bracket(&self, team_id: TeamId) -> Option<&TeamBracket> {
        self.team_brackets.get(&team_id)
    }

    pub fn winners_bracket(&self) -> Option<&WinnersBracket> {
        self.winners_bracket.as_ref()
    }

    pub fn champion(&self) -> Option<&Participant> {
        self.champion.as_ref()
    }

    pub fn champion_team(&self) -> Option<&Team> {
        self.champion_team
            .and_then(|id| self.teams.iter().find(|t| t.id == id))
    }

    /// Round with the given id across all teams.
    pub fn find_round(&self, round_id: &str) -> Option<&EliminationRound> {
        self.team_brackets.values().find_map(|b| b.round(round_id))
    }

    pub fn find_match(&self, match_id: &str) -> Option<&BracketMatch> {
        self.winners_bracket
            .as_ref()
            .and_then(|b| b.find_match(match_id))
    }

    /// Team a participant was originally drawn into. Pure lookup.
    pub fn find_original_team(&self, name: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.has_member(name))
    }

    pub(crate) fn team_bracket_for_round_mut(&mut self, round_id: &str) -> Option<&mut TeamBracket> {
        self.team_brackets.values_mut().find(|b| b.has_round(round_id))
    }

    /// Winners of every team bracket in team-id order.
    pub(crate) fn team_winners(&self) -> Result<Vec<Participant>, TournamentError> {
        self.team_brackets
            .values()
            .map(|b| {
                b.winner.clone().ok_or_else(|| {
                    TournamentError::InvariantViolation(format!(
                        "team {} has no winner",
                        b.team_id
                    ))
                })
            })
            .collect()
    }
}
