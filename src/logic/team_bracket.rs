//! Team bracket builder: one team's internal single-elimination rounds.

use crate::models::{EliminationRound, Participant, Team, TeamBracket, TournamentError};

/// Build `members - 1` rounds; only round 1 has players until eliminations happen.
pub fn build_team_bracket(team: &Team) -> TeamBracket {
    let size = team.members.len();
    let mut rounds: Vec<EliminationRound> = (1..size)
        .map(|i| EliminationRound::new(team.id, i as u32, size + 1 - i))
        .collect();
    if let Some(first) = rounds.first_mut() {
        first.players = team.members.clone();
    }
    TeamBracket {
        team_id: team.id,
        team_name: team.name.clone(),
        members: team.members.clone(),
        rounds,
        winner: None,
        completed: false,
    }
}

/// Select (without committing) the player to eliminate. Can be changed freely
/// until the round is committed.
pub fn stage_elimination(
    bracket: &mut TeamBracket,
    round_id: &str,
    player: &str,
) -> Result<(), TournamentError> {
    let round = bracket
        .round_mut(round_id)
        .ok_or_else(|| TournamentError::RoundNotFound(round_id.to_string()))?;
    if round.completed {
        return Err(TournamentError::RoundAlreadyCompleted(round_id.to_string()));
    }
    if !round.contains(player) {
        return Err(TournamentError::PlayerNotInRound {
            round_id: round_id.to_string(),
            player: player.to_string(),
        });
    }
    round.staged = Some(player.to_string());
    Ok(())
}

/// Eliminate `player` from the round and move the survivors on.
///
/// Returns the team winner when this was the last round. State is validated in
/// full before anything is changed.
pub fn commit_elimination(
    bracket: &mut TeamBracket,
    round_id: &str,
    player: &str,
) -> Result<Option<Participant>, TournamentError> {
    let pos = bracket
        .rounds
        .iter()
        .position(|r| r.id == round_id)
        .ok_or_else(|| TournamentError::RoundNotFound(round_id.to_string()))?;

    let round = &bracket.rounds[pos];
    if round.completed {
        return Err(TournamentError::RoundAlreadyCompleted(round_id.to_string()));
    }
    if !round.contains(player) {
        return Err(TournamentError::PlayerNotInRound {
            round_id: round_id.to_string(),
            player: player.to_string(),
        });
    }

    let is_last = pos + 1 == bracket.rounds.len();
    let expected = if is_last {
        1
    } else {
        bracket.expected_players(round.round_index + 1)
    };
    let remaining: Vec<Participant> = round.players.iter().filter(|p| *p != player).cloned().collect();
    if remaining.len() != expected {
        return Err(TournamentError::InvariantViolation(format!(
            "round {} leaves {} players, expected {}",
            round_id,
            remaining.len(),
            expected
        )));
    }

    let round = &mut bracket.rounds[pos];
    round.eliminated = Some(player.to_string());
    round.staged = None;
    round.completed = true;

    if is_last {
        let winner = remaining.into_iter().next().ok_or_else(|| {
            TournamentError::InvariantViolation(format!("round {} has no survivor", round_id))
        })?;
        bracket.winner = Some(winner.clone());
        bracket.completed = true;
        Ok(Some(winner))
    } else {
        bracket.rounds[pos + 1].players = remaining;
        Ok(None)
    }
}
