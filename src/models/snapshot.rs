//! Serializable tournament snapshot for persistence, export/import and sync.
//!
//! Loading re-derives the lifecycle state from content and checks every bracket
//! invariant. Inconsistent data is reported, never repaired.

use crate::logic::{build_team_bracket, build_winners_bracket};
use crate::models::bracket::TeamBracket;
use crate::models::game::{Slot, WinnersBracket};
use crate::models::participant::{Participant, Team, TeamId, TEAM_SIZE};
use crate::models::tournament::{Tournament, TournamentError, TournamentId, TournamentState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Version of the snapshot document layout.
pub const SCHEMA_VERSION: u32 = 1;

/// Bracket progress of both phases.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PhaseSnapshot {
    pub phase1: Vec<TeamBracket>,
    pub phase2: Option<WinnersBracket>,
    pub current_phase: u8,
}

/// Complete tournament document.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub id: TournamentId,
    pub participants: Vec<Participant>,
    pub teams: Vec<Team>,
    #[serde(default)]
    pub substitutes: Vec<Participant>,
    pub tournament: PhaseSnapshot,
    #[serde(default)]
    pub champion: Option<Participant>,
    #[serde(default)]
    pub champion_team: Option<TeamId>,
    /// Modification marker for last-writer-wins.
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub modified_by: Option<String>,
    /// Human label of the change that produced this snapshot.
    #[serde(default)]
    pub action: Option<String>,
}

impl Snapshot {
    pub fn from_json(text: &str) -> Result<Self, TournamentError> {
        serde_json::from_str(text).map_err(|e| TournamentError::DeserializationError(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, TournamentError> {
        serde_json::to_string_pretty(self).map_err(|e| TournamentError::Storage(e.to_string()))
    }

    /// Strictly newer than `marker` (anything is newer than no marker).
    pub fn is_newer_than(&self, marker: Option<DateTime<Utc>>) -> bool {
        marker.map_or(true, |m| self.timestamp > m)
    }

    /// Not written by `writer`.
    pub fn is_external_to(&self, writer: &str) -> bool {
        self.modified_by.as_deref() != Some(writer)
    }

    pub fn export_file_name(&self) -> String {
        format!("uno-tournament-{}.json", self.timestamp.format("%Y-%m-%d"))
    }
}

impl Tournament {
    /// Snapshot of the current state, stamped now.
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            schema_version: SCHEMA_VERSION,
            id: self.id,
            participants: self.participants.clone(),
            teams: self.teams.clone(),
            substitutes: self.substitutes.clone(),
            tournament: PhaseSnapshot {
                phase1: self.team_brackets.values().cloned().collect(),
                phase2: self.winners_bracket.clone(),
                current_phase: self.current_phase(),
            },
            champion: self.champion.clone(),
            champion_team: self.champion_team,
            timestamp: Utc::now(),
            modified_by: None,
            action: None,
        }
    }

    /// Rebuild a tournament from a snapshot, validating it first.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, TournamentError> {
        if snapshot.schema_version != SCHEMA_VERSION {
            return Err(TournamentError::DeserializationError(format!(
                "unsupported schema version {} (expected {})",
                snapshot.schema_version, SCHEMA_VERSION
            )));
        }
        validate_teams(&snapshot)?;

        let mut team_brackets = BTreeMap::new();
        for (team, bracket) in snapshot.teams.iter().zip(&snapshot.tournament.phase1) {
            validate_team_bracket(team, bracket)?;
            team_brackets.insert(team.id, bracket.clone());
        }

        let mut tournament = Tournament {
            id: snapshot.id,
            participants: snapshot.participants,
            substitutes: snapshot.substitutes,
            teams: snapshot.teams,
            team_brackets,
            winners_bracket: snapshot.tournament.phase2,
            state: TournamentState::Empty,
            champion: snapshot.champion,
            champion_team: snapshot.champion_team,
        };
        tournament.state = derive_state(&tournament)?;

        if tournament.current_phase() != snapshot.tournament.current_phase {
            return Err(TournamentError::InvariantViolation(format!(
                "current phase {} does not match bracket progress",
                snapshot.tournament.current_phase
            )));
        }
        Ok(tournament)
    }

    /// Replace all state with `snapshot`, keeping this tournament's id.
    /// Nothing changes if the snapshot is rejected.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<(), TournamentError> {
        let id = self.id;
        let mut restored = Tournament::from_snapshot(snapshot)?;
        restored.id = id;
        *self = restored;
        Ok(())
    }
}

fn violation(detail: String) -> TournamentError {
    TournamentError::InvariantViolation(detail)
}

fn validate_teams(snapshot: &Snapshot) -> Result<(), TournamentError> {
    let mut seen = HashSet::new();
    for p in &snapshot.participants {
        if !seen.insert(p.as_str()) {
            return Err(violation(format!("participant {p} listed twice")));
        }
    }

    let mut placed = HashSet::new();
    for (i, team) in snapshot.teams.iter().enumerate() {
        if team.id as usize != i + 1 {
            return Err(violation(format!("team {} out of order", team.id)));
        }
        if team.members.len() != TEAM_SIZE {
            return Err(violation(format!(
                "team {} has {} members",
                team.id,
                team.members.len()
            )));
        }
        for m in &team.members {
            if !seen.contains(m.as_str()) || !placed.insert(m.as_str()) {
                return Err(violation(format!("team member {m} is not a unique participant")));
            }
        }
    }
    for s in &snapshot.substitutes {
        if !seen.contains(s.as_str()) || !placed.insert(s.as_str()) {
            return Err(violation(format!("substitute {s} is not a unique participant")));
        }
    }
    if placed.len() != seen.len() {
        return Err(violation("participants missing from teams and substitutes".to_string()));
    }

    if snapshot.tournament.phase1.len() != snapshot.teams.len() {
        return Err(violation(format!(
            "{} team brackets for {} teams",
            snapshot.tournament.phase1.len(),
            snapshot.teams.len()
        )));
    }
    Ok(())
}

fn validate_team_bracket(team: &Team, bracket: &TeamBracket) -> Result<(), TournamentError> {
    if bracket.team_id != team.id || bracket.members != team.members {
        return Err(violation(format!("bracket does not belong to team {}", team.id)));
    }
    let fresh = build_team_bracket(team);
    if bracket.rounds.len() != fresh.rounds.len() {
        return Err(violation(format!(
            "team {} has {} rounds",
            team.id,
            bracket.rounds.len()
        )));
    }

    let mut entering: Option<Vec<Participant>> = Some(team.members.clone());
    for (round, expected) in bracket.rounds.iter().zip(&fresh.rounds) {
        if round.id != expected.id || round.round_index != expected.round_index {
            return Err(violation(format!("unexpected round {}", round.id)));
        }
        match entering.take() {
            Some(players) => {
                if round.players != players {
                    return Err(violation(format!("round {} has wrong players", round.id)));
                }
                if let Some(staged) = &round.staged {
                    if !round.contains(staged) {
                        return Err(violation(format!("round {} stages {}", round.id, staged)));
                    }
                }
                if round.completed {
                    match &round.eliminated {
                        Some(e) if round.contains(e) => entering = Some(round.remaining()),
                        _ => {
                            return Err(violation(format!(
                                "round {} completed without a valid elimination",
                                round.id
                            )))
                        }
                    }
                } else if round.eliminated.is_some() {
                    return Err(violation(format!("round {} open but eliminated set", round.id)));
                }
            }
            None => {
                if !round.players.is_empty()
                    || round.completed
                    || round.staged.is_some()
                    || round.eliminated.is_some()
                {
                    return Err(violation(format!("round {} played before it was reached", round.id)));
                }
            }
        }
    }

    // `entering` now holds the survivors of the last round, if it completed.
    let winner = match entering {
        Some(mut last) if last.len() == 1 => last.pop(),
        Some(_) => return Err(violation(format!("team {} ended with several players", team.id))),
        None => None,
    };
    if bracket.completed != winner.is_some() || bracket.winner != winner {
        return Err(violation(format!("team {} winner does not match its rounds", team.id)));
    }
    Ok(())
}

/// Compare a stored winners bracket against a fresh build from the same winners,
/// replaying completed matches.
fn validate_winners_bracket(
    bracket: &WinnersBracket,
    winners: &[Participant],
) -> Result<(), TournamentError> {
    let fresh = build_winners_bracket(winners)?;
    if bracket.rounds.len() != fresh.rounds.len() {
        return Err(violation("winners bracket has wrong round count".to_string()));
    }

    let resolve = |slot: &Slot| -> Option<Slot> {
        match slot {
            Slot::Pending(source) => match bracket.find_match(source) {
                Some(m) if m.completed => m.winner().cloned().map(Slot::Resolved),
                Some(_) => Some(slot.clone()),
                None => None,
            },
            resolved => Some(resolved.clone()),
        }
    };

    for (round, expected) in bracket.rounds.iter().zip(&fresh.rounds) {
        if round.matches.len() != expected.matches.len() {
            return Err(violation(format!("round {} has wrong matches", round.round_number)));
        }
        for (m, e) in round.matches.iter().zip(&expected.matches) {
            if m.id != e.id || m.round_number != e.round_number {
                return Err(violation(format!("unexpected match {}", m.id)));
            }
            if resolve(&e.slot_a).as_ref() != Some(&m.slot_a)
                || resolve(&e.slot_b).as_ref() != Some(&m.slot_b)
            {
                return Err(violation(format!("match {} has wrong slots", m.id)));
            }
            if m.winner_slot.is_some() && !m.is_ready() {
                return Err(violation(format!("match {} has a winner before its players", m.id)));
            }
            if m.completed && m.winner().is_none() {
                return Err(violation(format!("match {} completed without winner", m.id)));
            }
        }
        let byes: Option<Vec<Slot>> = expected.byes.iter().map(&resolve).collect();
        if byes.as_ref() != Some(&round.byes) {
            return Err(violation(format!("round {} has wrong byes", round.round_number)));
        }
        if round.completed != round.all_matches_completed() {
            return Err(violation(format!("round {} completion flag", round.round_number)));
        }
    }

    let final_done = bracket.final_match().is_some_and(|m| m.completed);
    if bracket.completed != final_done {
        return Err(violation("winners bracket completion flag".to_string()));
    }
    Ok(())
}

fn derive_state(t: &Tournament) -> Result<TournamentState, TournamentError> {
    if t.teams.is_empty() {
        if t.winners_bracket.is_some() || t.champion.is_some() || !t.participants.is_empty() {
            return Err(violation("bracket progress without teams".to_string()));
        }
        return Ok(TournamentState::Empty);
    }

    let all_complete = t.team_brackets.values().all(|b| b.completed);
    let expected_team = t
        .champion
        .as_deref()
        .and_then(|c| t.find_original_team(c))
        .map(|team| team.id);
    if t.champion_team != expected_team {
        return Err(violation("champion team does not match champion".to_string()));
    }

    match &t.winners_bracket {
        None if !all_complete => match t.champion {
            Some(_) => Err(violation("champion before phase 1 finished".to_string())),
            None => Ok(TournamentState::Phase1Active),
        },
        None => {
            let winners = t.team_winners()?;
            match (&t.champion, winners.as_slice()) {
                (Some(c), [only]) if c == only => Ok(TournamentState::Complete),
                _ => Err(violation("phase 1 finished but no winners bracket".to_string())),
            }
        }
        Some(bracket) => {
            if !all_complete {
                return Err(violation("winners bracket before phase 1 finished".to_string()));
            }
            validate_winners_bracket(bracket, &t.team_winners()?)?;
            let final_winner = bracket.final_match().filter(|m| m.completed).and_then(|m| m.winner());
            match (final_winner, &t.champion) {
                (None, None) => Ok(TournamentState::Phase2Active),
                (Some(w), Some(c)) if w == c => Ok(TournamentState::Complete),
                _ => Err(violation("champion does not match the final".to_string())),
            }
        }
    }
}
