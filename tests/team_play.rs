//! Integration tests for phase 1: team brackets, eliminations, transition to phase 2.

use rand::rngs::StdRng;
use rand::SeedableRng;
use uno_tournament_web::{
    all_teams_complete, build_team_bracket, check_phase_one_completion, commit_elimination,
    confirm_team_elimination, generate_tournament_with_rng, stage_elimination,
    stage_team_elimination, Team, TeamId, Tournament, TournamentError, TournamentState,
};

fn team() -> Team {
    Team::new(
        2,
        vec!["Ana".into(), "Bo".into(), "Cy".into(), "Di".into()],
    )
}

fn tournament_with_players(n: usize, seed: u64) -> Tournament {
    let raw: Vec<String> = (0..n).map(|i| format!("P{i}")).collect();
    let mut t = Tournament::new();
    generate_tournament_with_rng(&mut t, &raw.join(","), &mut StdRng::seed_from_u64(seed)).unwrap();
    t
}

/// Play out a team by always eliminating the first player still in the round.
fn finish_team(t: &mut Tournament, team_id: TeamId) {
    let round_ids: Vec<String> = t
        .team_bracket(team_id)
        .unwrap()
        .rounds
        .iter()
        .map(|r| r.id.clone())
        .collect();
    for id in round_ids {
        let victim = t.find_round(&id).unwrap().players[0].clone();
        stage_team_elimination(t, &id, &victim).unwrap();
        confirm_team_elimination(t, &id).unwrap();
    }
}

#[test]
fn team_bracket_has_three_rounds() {
    let bracket = build_team_bracket(&team());
    assert_eq!(bracket.rounds.len(), 3);
    assert_eq!(bracket.rounds[0].id, "team2_elimination_r1");
    assert_eq!(bracket.rounds[2].id, "team2_elimination_r3");
    assert_eq!(bracket.rounds[0].name, "1st Elimination (4→3)");
    assert_eq!(bracket.rounds[1].name, "2nd Elimination (3→2)");
    assert_eq!(bracket.rounds[2].name, "Team Final (2→1)");
    assert_eq!(bracket.rounds[0].players, team().members);
    assert!(bracket.rounds[1].players.is_empty());
    assert!(!bracket.completed);
    assert!(bracket.winner.is_none());
}

#[test]
fn eliminations_shrink_rounds_until_a_winner() {
    let mut bracket = build_team_bracket(&team());

    assert_eq!(commit_elimination(&mut bracket, "team2_elimination_r1", "Bo"), Ok(None));
    assert_eq!(bracket.rounds[1].players, vec!["Ana", "Cy", "Di"]);

    assert_eq!(commit_elimination(&mut bracket, "team2_elimination_r2", "Di"), Ok(None));
    assert_eq!(bracket.rounds[2].players, vec!["Ana", "Cy"]);
    assert!(!bracket.completed);

    assert_eq!(
        commit_elimination(&mut bracket, "team2_elimination_r3", "Ana"),
        Ok(Some("Cy".to_string()))
    );
    assert!(bracket.completed);
    assert_eq!(bracket.winner.as_deref(), Some("Cy"));
    assert_eq!(bracket.rounds[2].eliminated.as_deref(), Some("Ana"));
    assert!(bracket.rounds.iter().all(|r| r.completed));
}

#[test]
fn completed_round_cannot_be_committed_again() {
    let mut bracket = build_team_bracket(&team());
    commit_elimination(&mut bracket, "team2_elimination_r1", "Ana").unwrap();
    assert_eq!(
        commit_elimination(&mut bracket, "team2_elimination_r1", "Bo"),
        Err(TournamentError::RoundAlreadyCompleted("team2_elimination_r1".into()))
    );
    assert_eq!(
        stage_elimination(&mut bracket, "team2_elimination_r1", "Bo"),
        Err(TournamentError::RoundAlreadyCompleted("team2_elimination_r1".into()))
    );
}

#[test]
fn staging_validates_round_and_player() {
    let mut bracket = build_team_bracket(&team());
    assert_eq!(
        stage_elimination(&mut bracket, "team2_elimination_r1", "Zed"),
        Err(TournamentError::PlayerNotInRound {
            round_id: "team2_elimination_r1".into(),
            player: "Zed".into()
        })
    );
    assert_eq!(
        stage_elimination(&mut bracket, "team9_elimination_r1", "Ana"),
        Err(TournamentError::RoundNotFound("team9_elimination_r1".into()))
    );
    // Round 2 is not reached yet, so nobody plays in it.
    assert!(matches!(
        stage_elimination(&mut bracket, "team2_elimination_r2", "Ana"),
        Err(TournamentError::PlayerNotInRound { .. })
    ));
}

#[test]
fn corrupted_round_is_reported() {
    let mut bracket = build_team_bracket(&team());
    bracket.rounds[0].players.push("Eve".into());
    assert!(matches!(
        commit_elimination(&mut bracket, "team2_elimination_r1", "Ana"),
        Err(TournamentError::InvariantViolation(_))
    ));
    assert!(!bracket.rounds[0].completed);
}

#[test]
fn staged_player_can_change_before_confirm() {
    let mut t = tournament_with_players(4, 1);
    let round = t.team_bracket(1).unwrap().rounds[0].clone();
    stage_team_elimination(&mut t, &round.id, &round.players[0]).unwrap();
    stage_team_elimination(&mut t, &round.id, &round.players[2]).unwrap();
    confirm_team_elimination(&mut t, &round.id).unwrap();

    let done = t.find_round(&round.id).unwrap();
    assert_eq!(done.eliminated.as_ref(), Some(&round.players[2]));
    assert!(done.staged.is_none());
}

#[test]
fn confirm_requires_a_staged_player() {
    let mut t = tournament_with_players(8, 2);
    assert_eq!(
        confirm_team_elimination(&mut t, "team1_elimination_r1"),
        Err(TournamentError::NoEliminationStaged("team1_elimination_r1".into()))
    );
    assert_eq!(
        confirm_team_elimination(&mut t, "team7_elimination_r1"),
        Err(TournamentError::RoundNotFound("team7_elimination_r1".into()))
    );
}

#[test]
fn phase_two_starts_when_every_team_has_a_winner() {
    let mut t = tournament_with_players(8, 3);
    assert!(!all_teams_complete(&t));

    finish_team(&mut t, 1);
    assert!(!all_teams_complete(&t));
    assert_eq!(t.state(), TournamentState::Phase1Active);
    assert!(t.winners_bracket().is_none());

    finish_team(&mut t, 2);
    assert!(all_teams_complete(&t));
    assert_eq!(t.state(), TournamentState::Phase2Active);
    assert_eq!(t.current_phase(), 2);

    let bracket = t.winners_bracket().unwrap().clone();
    assert_eq!(bracket.rounds.len(), 1);
    // Transition happens once only.
    assert_eq!(check_phase_one_completion(&mut t), Ok(false));
    assert_eq!(t.winners_bracket(), Some(&bracket));
}

#[test]
fn eliminations_rejected_after_phase_one() {
    let mut t = tournament_with_players(8, 4);
    finish_team(&mut t, 1);
    finish_team(&mut t, 2);
    assert_eq!(
        stage_team_elimination(&mut t, "team1_elimination_r1", "P0"),
        Err(TournamentError::InvalidState)
    );
}

#[test]
fn completed_team_round_rejected_while_other_teams_play() {
    let mut t = tournament_with_players(8, 5);
    finish_team(&mut t, 1);
    let round = t.team_bracket(1).unwrap().rounds[0].clone();
    assert_eq!(
        stage_team_elimination(&mut t, &round.id, &round.players[1]),
        Err(TournamentError::RoundAlreadyCompleted(round.id.clone()))
    );
    assert_eq!(
        confirm_team_elimination(&mut t, &round.id),
        Err(TournamentError::RoundAlreadyCompleted(round.id.clone()))
    );
}

#[test]
fn empty_tournament_is_not_complete() {
    let t = Tournament::new();
    assert!(!all_teams_complete(&t));
}
