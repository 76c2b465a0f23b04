//! Phase 2: knockout matches between team winners, promotion and the champion.

use crate::models::{
    BracketRound, MatchId, Participant, Side, Slot, Tournament, TournamentError, TournamentState,
};

/// Select the winner of a match (Phase2Active only). Can be changed until committed.
pub fn stage_match_winner(
    tournament: &mut Tournament,
    match_id: &str,
    side: Side,
) -> Result<(), TournamentError> {
    if tournament.state != TournamentState::Phase2Active {
        return Err(TournamentError::InvalidState);
    }
    let m = tournament
        .winners_bracket
        .as_mut()
        .and_then(|b| b.find_match_mut(match_id))
        .ok_or_else(|| TournamentError::MatchNotFound(match_id.to_string()))?;
    if m.completed {
        return Err(TournamentError::MatchAlreadyCompleted(match_id.to_string()));
    }
    if !m.is_ready() {
        return Err(TournamentError::MatchNotReady(match_id.to_string()));
    }
    m.winner_slot = Some(side);
    Ok(())
}

/// Commit a match and promote its winner into the slot waiting on it.
///
/// Match `k` of a round feeds slot A of match `k / 2` in the next round when `k`
/// is even, slot B when odd; a winner carried by a bye lands in whichever later
/// match names it. Committing the final crowns the champion.
pub fn commit_match(tournament: &mut Tournament, match_id: &str) -> Result<(), TournamentError> {
    if tournament.state != TournamentState::Phase2Active {
        return Err(TournamentError::InvalidState);
    }
    let bracket = tournament
        .winners_bracket
        .as_mut()
        .ok_or(TournamentError::InvalidState)?;
    let (r, k) = bracket
        .locate(match_id)
        .ok_or_else(|| TournamentError::MatchNotFound(match_id.to_string()))?;

    let m = &bracket.rounds[r].matches[k];
    let side = m
        .winner_slot
        .ok_or_else(|| TournamentError::NoWinnerStaged(match_id.to_string()))?;
    if m.completed {
        return Err(TournamentError::MatchAlreadyCompleted(match_id.to_string()));
    }
    let winner = m.slot(side).participant().cloned().ok_or_else(|| {
        TournamentError::InvariantViolation(format!("match {} winner slot is pending", match_id))
    })?;

    let target = find_waiting_slot(&bracket.rounds, r + 1, match_id);
    let is_final = r + 1 == bracket.rounds.len();
    if target.is_none() && !is_final {
        return Err(TournamentError::InvariantViolation(format!(
            "no later match waits on {}",
            match_id
        )));
    }

    let round = &mut bracket.rounds[r];
    round.matches[k].completed = true;
    round.completed = round.all_matches_completed();
    log::debug!("Match {} won by {}", match_id, winner);

    match target {
        Some((tr, tk, tside)) => {
            let carried = bracket.rounds[r + 1..]
                .iter_mut()
                .flat_map(|round| round.byes.iter_mut())
                .filter(|bye| bye.is_pending_on(match_id));
            for bye in carried {
                *bye = Slot::Resolved(winner.clone());
            }
            *bracket.rounds[tr].matches[tk].slot_mut(tside) = Slot::Resolved(winner);
        }
        None => {
            bracket.completed = true;
            crown_champion(tournament, winner);
        }
    }
    Ok(())
}

/// (round, match, side) of the first slot from round `from` on that waits on `match_id`.
fn find_waiting_slot(
    rounds: &[BracketRound],
    from: usize,
    match_id: &str,
) -> Option<(usize, usize, Side)> {
    rounds.iter().enumerate().skip(from).find_map(|(tr, round)| {
        round.matches.iter().enumerate().find_map(|(tk, m)| {
            if m.slot_a.is_pending_on(match_id) {
                Some((tr, tk, Side::A))
            } else if m.slot_b.is_pending_on(match_id) {
                Some((tr, tk, Side::B))
            } else {
                None
            }
        })
    })
}

/// Record the champion and the team they came from; the tournament is complete.
pub(crate) fn crown_champion(tournament: &mut Tournament, champion: Participant) {
    let team = tournament.find_original_team(&champion).map(|t| (t.id, t.name.clone()));
    match &team {
        Some((_, name)) => log::info!("Champion: {} ({})", champion, name),
        None => log::warn!("Champion {} does not belong to any team", champion),
    }
    tournament.champion_team = team.map(|(id, _)| id);
    tournament.champion = Some(champion);
    tournament.state = TournamentState::Complete;
}

/// Ids of matches that can be played right now (both players known, not completed).
pub fn playable_matches(tournament: &Tournament) -> Vec<MatchId> {
    tournament
        .winners_bracket
        .iter()
        .flat_map(|b| b.rounds.iter())
        .flat_map(|r| r.matches.iter())
        .filter(|m| !m.completed && m.is_ready())
        .map(|m| m.id.clone())
        .collect()
}
