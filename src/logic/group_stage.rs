//! Phase 1: every team eliminates internally until one representative is left.

use crate::logic::finals::crown_champion;
use crate::logic::team_bracket::{commit_elimination, stage_elimination};
use crate::logic::winners_bracket::build_winners_bracket;
use crate::models::{Tournament, TournamentError, TournamentState};

/// Select the player to eliminate in a round (Phase1Active only).
pub fn stage_team_elimination(
    tournament: &mut Tournament,
    round_id: &str,
    player: &str,
) -> Result<(), TournamentError> {
    if tournament.state != TournamentState::Phase1Active {
        return Err(TournamentError::InvalidState);
    }
    let bracket = tournament
        .team_bracket_for_round_mut(round_id)
        .ok_or_else(|| TournamentError::RoundNotFound(round_id.to_string()))?;
    stage_elimination(bracket, round_id, player)
}

/// Commit the staged elimination of a round, then start phase 2 if every team
/// now has its winner.
pub fn confirm_team_elimination(
    tournament: &mut Tournament,
    round_id: &str,
) -> Result<(), TournamentError> {
    if tournament.state != TournamentState::Phase1Active {
        return Err(TournamentError::InvalidState);
    }
    let bracket = tournament
        .team_bracket_for_round_mut(round_id)
        .ok_or_else(|| TournamentError::RoundNotFound(round_id.to_string()))?;
    let round = bracket
        .round(round_id)
        .ok_or_else(|| TournamentError::RoundNotFound(round_id.to_string()))?;
    if round.completed {
        return Err(TournamentError::RoundAlreadyCompleted(round_id.to_string()));
    }
    let player = round
        .staged
        .clone()
        .ok_or_else(|| TournamentError::NoEliminationStaged(round_id.to_string()))?;

    let team_winner = commit_elimination(bracket, round_id, &player)?;
    log::debug!("Round {}: {} eliminated", round_id, player);
    if let Some(winner) = team_winner {
        log::info!("{} wins {}", winner, bracket.team_name);
    }

    check_phase_one_completion(tournament)?;
    Ok(())
}

/// True iff there is at least one team and every team bracket is completed.
pub fn all_teams_complete(tournament: &Tournament) -> bool {
    !tournament.team_brackets.is_empty() && tournament.team_brackets.values().all(|b| b.completed)
}

/// Move to phase 2 once all teams are done. Idempotent: returns `Ok(true)`
/// only for the call that performs the transition.
///
/// A single team winner is crowned directly, without a winners bracket.
pub fn check_phase_one_completion(tournament: &mut Tournament) -> Result<bool, TournamentError> {
    if tournament.state != TournamentState::Phase1Active || !all_teams_complete(tournament) {
        return Ok(false);
    }
    let winners = tournament.team_winners()?;
    if let [only] = winners.as_slice() {
        let champion = only.clone();
        crown_champion(tournament, champion);
        return Ok(true);
    }

    let bracket = build_winners_bracket(&winners)?;
    log::info!(
        "Phase 1 complete for tournament {}: {} team winners, {} knockout rounds",
        tournament.id,
        winners.len(),
        bracket.rounds.len()
    );
    tournament.winners_bracket = Some(bracket);
    tournament.state = TournamentState::Phase2Active;
    Ok(true)
}
