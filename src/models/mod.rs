//! Data structures for the UNO tournament: teams, brackets, matches, tournament state.

mod bracket;
mod game;
mod participant;
mod snapshot;
mod tournament;

pub use bracket::{EliminationRound, RoundId, TeamBracket};
pub use game::{BracketMatch, BracketRound, MatchId, Side, Slot, WinnersBracket};
pub use participant::{Participant, ParticipantSummary, Team, TeamId, TEAM_SIZE};
pub use snapshot::{PhaseSnapshot, Snapshot, SCHEMA_VERSION};
pub use tournament::{Tournament, TournamentError, TournamentId, TournamentState};
