//! Commands accepted by the tournament core and their dispatch.

use crate::logic::finals::{commit_match, stage_match_winner};
use crate::logic::group_stage::{confirm_team_elimination, stage_team_elimination};
use crate::logic::setup::{clear_tournament, generate_tournament, reset_tournament};
use crate::models::{MatchId, Participant, RoundId, Side, Tournament, TournamentError};
use serde::{Deserialize, Serialize};

/// A single state transition requested from outside.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Raw newline/comma separated participant names.
    Generate { participants: String },
    StageElimination { round_id: RoundId, player: Participant },
    CommitElimination { round_id: RoundId },
    StageMatchWinner { match_id: MatchId, slot: Side },
    CommitMatch { match_id: MatchId },
    Reset,
    Clear,
}

impl Command {
    /// Short label for the change, shown to collaborators. Call after a successful apply.
    pub fn describe(&self, tournament: &Tournament) -> String {
        match self {
            Command::Generate { .. } => "New tournament generated".to_string(),
            Command::StageElimination { player, .. } => format!("{} selected for elimination", player),
            Command::CommitElimination { round_id } => match tournament
                .find_round(round_id)
                .and_then(|r| r.eliminated.as_ref())
            {
                Some(player) => format!("Elimination confirmed: {}", player),
                None => "Elimination confirmed".to_string(),
            },
            Command::StageMatchWinner { match_id, .. } => format!("Winner selected in {}", match_id),
            Command::CommitMatch { match_id } => match tournament
                .find_match(match_id)
                .and_then(|m| m.winner())
            {
                Some(winner) => format!("Match confirmed: {} wins", winner),
                None => "Match confirmed".to_string(),
            },
            Command::Reset => "Tournament reset".to_string(),
            Command::Clear => "Tournament cleared".to_string(),
        }
    }
}

/// Apply one command. Either the whole transition happens or nothing changes.
pub fn apply_command(tournament: &mut Tournament, command: &Command) -> Result<(), TournamentError> {
    match command {
        Command::Generate { participants } => generate_tournament(tournament, participants),
        Command::StageElimination { round_id, player } => {
            stage_team_elimination(tournament, round_id, player)
        }
        Command::CommitElimination { round_id } => confirm_team_elimination(tournament, round_id),
        Command::StageMatchWinner { match_id, slot } => {
            stage_match_winner(tournament, match_id, *slot)
        }
        Command::CommitMatch { match_id } => commit_match(tournament, match_id),
        Command::Reset => reset_tournament(tournament),
        Command::Clear => {
            clear_tournament(tournament);
            Ok(())
        }
    }
}
