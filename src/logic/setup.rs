//! Setup: participant input, random team assignment, generation, reset and clear.

use crate::logic::team_bracket::build_team_bracket;
use crate::models::{
    Participant, ParticipantSummary, Team, TeamId, Tournament, TournamentError, TournamentState,
    TEAM_SIZE,
};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Parse raw newline/comma separated input into trimmed, non-empty, unique names.
/// Duplicates are exact (case-sensitive) matches; first appearance wins.
pub fn parse_participants(raw: &str) -> Vec<Participant> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let mut seen = HashSet::new();
    let mut participants = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Skipping unreadable participant line: {}", e);
                continue;
            }
        };
        for name in record.iter().map(str::trim).filter(|n| !n.is_empty()) {
            if seen.insert(name.to_string()) {
                participants.push(name.to_string());
            }
        }
    }
    participants
}

/// Counter for raw input: how many participants, teams and substitutes it yields.
pub fn summarize_participants(raw: &str) -> ParticipantSummary {
    ParticipantSummary::from_count(parse_participants(raw).len())
}

/// Shuffle participants and slice them into teams of `team_size`; the remainder
/// become substitutes, in shuffled order.
///
/// The assignment is random on purpose: the same input gives different teams
/// from one call to the next. Pass a seeded rng for a reproducible draw.
pub fn partition<R: Rng + ?Sized>(
    participants: &[Participant],
    team_size: usize,
    rng: &mut R,
) -> Result<(Vec<Team>, Vec<Participant>), TournamentError> {
    if team_size < 2 {
        return Err(TournamentError::InvariantViolation(format!(
            "team size {} is too small",
            team_size
        )));
    }
    if participants.len() < team_size {
        return Err(TournamentError::InsufficientParticipants {
            found: participants.len(),
            required: team_size,
        });
    }

    let mut shuffled = participants.to_vec();
    shuffled.shuffle(rng);

    let chunks = shuffled.chunks_exact(team_size);
    let substitutes = chunks.remainder().to_vec();
    let teams = chunks
        .enumerate()
        .map(|(i, members)| Team::new(i as TeamId + 1, members.to_vec()))
        .collect();
    Ok((teams, substitutes))
}

/// Create teams and their phase-1 brackets from raw participant input.
pub fn generate_tournament(tournament: &mut Tournament, raw: &str) -> Result<(), TournamentError> {
    generate_tournament_with_rng(tournament, raw, &mut rand::thread_rng())
}

/// [`generate_tournament`] with an explicit random source.
pub fn generate_tournament_with_rng<R: Rng + ?Sized>(
    tournament: &mut Tournament,
    raw: &str,
    rng: &mut R,
) -> Result<(), TournamentError> {
    if tournament.state != TournamentState::Empty {
        return Err(TournamentError::InvalidState);
    }
    let participants = parse_participants(raw);
    let (teams, substitutes) = partition(&participants, TEAM_SIZE, rng)?;

    tournament.team_brackets = teams.iter().map(|t| (t.id, build_team_bracket(t))).collect();
    log::info!(
        "Tournament {} generated: {} participants, {} teams, {} substitutes",
        tournament.id,
        participants.len(),
        teams.len(),
        substitutes.len()
    );
    tournament.participants = participants;
    tournament.teams = teams;
    tournament.substitutes = substitutes;
    tournament.winners_bracket = None;
    tournament.champion = None;
    tournament.champion_team = None;
    tournament.state = TournamentState::Phase1Active;
    Ok(())
}

/// Discard all bracket progress: rebuild every team bracket from its original
/// members, drop the winners bracket and the champion. Teams stay as drawn.
pub fn reset_tournament(tournament: &mut Tournament) -> Result<(), TournamentError> {
    if tournament.state == TournamentState::Empty {
        return Err(TournamentError::InvalidState);
    }
    tournament.team_brackets = tournament
        .teams
        .iter()
        .map(|t| (t.id, build_team_bracket(t)))
        .collect();
    tournament.winners_bracket = None;
    tournament.champion = None;
    tournament.champion_team = None;
    tournament.state = TournamentState::Phase1Active;
    log::info!("Tournament {} reset to phase 1", tournament.id);
    Ok(())
}

/// Back to an empty tournament (same id).
pub fn clear_tournament(tournament: &mut Tournament) {
    *tournament = Tournament::with_id(tournament.id);
    log::info!("Tournament {} cleared", tournament.id);
}
