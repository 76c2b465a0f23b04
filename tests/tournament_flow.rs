//! End-to-end tournament runs through the command interface.

use rand::rngs::StdRng;
use rand::SeedableRng;
use uno_tournament_web::{
    apply_command, generate_tournament_with_rng, Command, Side, Tournament, TournamentError,
    TournamentState,
};

const EIGHT: &str = "Alice\nBob\nCarol\nDave\nErin\nFrank\nGrace\nHeidi";

fn generated(raw: &str, seed: u64) -> Tournament {
    let mut t = Tournament::new();
    generate_tournament_with_rng(&mut t, raw, &mut StdRng::seed_from_u64(seed)).unwrap();
    t
}

/// Play every team bracket by eliminating the first remaining player each round.
fn play_phase_one(t: &mut Tournament) {
    let round_ids: Vec<String> = t
        .team_brackets()
        .flat_map(|b| b.rounds.iter().map(|r| r.id.clone()))
        .collect();
    for round_id in round_ids {
        let player = t.find_round(&round_id).unwrap().players[0].clone();
        apply_command(
            t,
            &Command::StageElimination {
                round_id: round_id.clone(),
                player,
            },
        )
        .unwrap();
        apply_command(t, &Command::CommitElimination { round_id }).unwrap();
    }
}

#[test]
fn two_teams_play_to_a_champion() {
    let mut t = generated(EIGHT, 3);
    assert_eq!(t.teams().len(), 2);
    assert!(t.substitutes().is_empty());

    play_phase_one(&mut t);
    assert_eq!(t.state(), TournamentState::Phase2Active);
    assert_eq!(t.current_phase(), 2);

    let bracket = t.winners_bracket().unwrap();
    assert_eq!(bracket.rounds.len(), 1);
    assert_eq!(bracket.rounds[0].name, "Final");
    let final_id = bracket.rounds[0].matches[0].id.clone();
    assert_eq!(final_id, "final_r1m1");
    let expected = bracket.rounds[0].matches[0].slot_b.participant().unwrap().clone();

    apply_command(
        &mut t,
        &Command::StageMatchWinner {
            match_id: final_id.clone(),
            slot: Side::B,
        },
    )
    .unwrap();
    apply_command(&mut t, &Command::CommitMatch { match_id: final_id }).unwrap();

    assert_eq!(t.state(), TournamentState::Complete);
    assert_eq!(t.champion(), Some(&expected));
    assert!(t.champion_team().unwrap().has_member(&expected));
}

#[test]
fn complete_tournament_rejects_play() {
    let mut t = generated(EIGHT, 4);
    play_phase_one(&mut t);
    apply_command(
        &mut t,
        &Command::StageMatchWinner {
            match_id: "final_r1m1".into(),
            slot: Side::A,
        },
    )
    .unwrap();
    apply_command(&mut t, &Command::CommitMatch { match_id: "final_r1m1".into() }).unwrap();
    assert_eq!(t.state(), TournamentState::Complete);

    let again = apply_command(
        &mut t,
        &Command::StageMatchWinner {
            match_id: "final_r1m1".into(),
            slot: Side::B,
        },
    );
    assert_eq!(again, Err(TournamentError::InvalidState));
    let generate = apply_command(&mut t, &Command::Generate { participants: EIGHT.into() });
    assert_eq!(generate, Err(TournamentError::InvalidState));
}

#[test]
fn reset_returns_to_fresh_phase_one() {
    let mut t = generated(EIGHT, 5);
    let teams = t.teams().to_vec();
    play_phase_one(&mut t);

    apply_command(&mut t, &Command::Reset).unwrap();
    assert_eq!(t.state(), TournamentState::Phase1Active);
    assert_eq!(t.current_phase(), 1);
    assert!(t.winners_bracket().is_none());
    assert!(t.champion().is_none());
    assert_eq!(t.teams(), teams.as_slice());
    for bracket in t.team_brackets() {
        assert_eq!(bracket.rounds.len(), 3);
        assert!(bracket.winner.is_none());
        assert!(bracket.rounds.iter().all(|r| !r.completed && r.eliminated.is_none()));
        assert_eq!(bracket.rounds[0].players, bracket.members);
    }
}

/// Every team bracket is back to three fresh rounds over its original members.
fn assert_fresh_phase_one(t: &Tournament) {
    assert_eq!(t.state(), TournamentState::Phase1Active);
    assert_eq!(t.current_phase(), 1);
    assert!(t.winners_bracket().is_none());
    assert!(t.champion().is_none());
    assert!(t.champion_team().is_none());
    for (bracket, team) in t.team_brackets().zip(t.teams()) {
        assert_eq!(bracket.members, team.members);
        assert_eq!(bracket.rounds.len(), 3);
        assert!(!bracket.completed);
        assert!(bracket.winner.is_none());
        assert_eq!(bracket.rounds[0].players, team.members);
        for round in &bracket.rounds {
            assert!(!round.completed);
            assert!(round.staged.is_none());
            assert!(round.eliminated.is_none());
        }
        assert!(bracket.rounds[1..].iter().all(|r| r.players.is_empty()));
    }
}

#[test]
fn reset_from_complete_restores_phase_one() {
    let mut t = generated(EIGHT, 10);
    let teams = t.teams().to_vec();
    play_phase_one(&mut t);
    apply_command(
        &mut t,
        &Command::StageMatchWinner {
            match_id: "final_r1m1".into(),
            slot: Side::A,
        },
    )
    .unwrap();
    apply_command(&mut t, &Command::CommitMatch { match_id: "final_r1m1".into() }).unwrap();
    assert_eq!(t.state(), TournamentState::Complete);
    assert!(t.champion_team().is_some());

    apply_command(&mut t, &Command::Reset).unwrap();
    assert_eq!(t.teams(), teams.as_slice());
    assert_fresh_phase_one(&t);
}

#[test]
fn reset_in_the_middle_of_phase_one() {
    let mut t = generated(EIGHT, 11);
    let round_id = "team2_elimination_r1".to_string();
    let player = t.find_round(&round_id).unwrap().players[3].clone();
    apply_command(
        &mut t,
        &Command::StageElimination {
            round_id: round_id.clone(),
            player,
        },
    )
    .unwrap();
    apply_command(&mut t, &Command::CommitElimination { round_id }).unwrap();

    // Staged but never confirmed.
    let next = "team2_elimination_r2".to_string();
    let staged = t.find_round(&next).unwrap().players[0].clone();
    apply_command(
        &mut t,
        &Command::StageElimination {
            round_id: next.clone(),
            player: staged,
        },
    )
    .unwrap();
    assert!(t.find_round(&next).unwrap().staged.is_some());

    apply_command(&mut t, &Command::Reset).unwrap();
    assert_fresh_phase_one(&t);
}

#[test]
fn reset_with_only_a_staged_elimination() {
    let mut t = generated(EIGHT, 12);
    let round_id = "team1_elimination_r1".to_string();
    let player = t.find_round(&round_id).unwrap().players[1].clone();
    apply_command(&mut t, &Command::StageElimination { round_id, player }).unwrap();

    apply_command(&mut t, &Command::Reset).unwrap();
    assert_fresh_phase_one(&t);
}

#[test]
fn reset_needs_a_generated_tournament() {
    let mut t = Tournament::new();
    assert_eq!(apply_command(&mut t, &Command::Reset), Err(TournamentError::InvalidState));
}

#[test]
fn clear_keeps_only_the_id() {
    let mut t = generated(EIGHT, 6);
    let id = t.id();
    apply_command(&mut t, &Command::Clear).unwrap();
    assert_eq!(t, Tournament::with_id(id));
    assert_eq!(t.state(), TournamentState::Empty);

    apply_command(&mut t, &Command::Generate { participants: EIGHT.into() }).unwrap();
    assert_eq!(t.state(), TournamentState::Phase1Active);
}

#[test]
fn single_team_winner_is_champion() {
    let mut t = generated("A,B,C,D,E", 7);
    assert_eq!(t.teams().len(), 1);
    assert_eq!(t.substitutes().len(), 1);

    play_phase_one(&mut t);
    assert_eq!(t.state(), TournamentState::Complete);
    assert!(t.winners_bracket().is_none());
    let champion = t.champion().unwrap().clone();
    assert_eq!(t.team_brackets().next().unwrap().winner.as_ref(), Some(&champion));
    assert_eq!(t.champion_team().map(|team| team.id), Some(1));
}

#[test]
fn commands_read_from_json() {
    let stage: Command =
        serde_json::from_str(r#"{"command":"stage_match_winner","match_id":"final_r1m1","slot":"b"}"#)
            .unwrap();
    assert_eq!(
        stage,
        Command::StageMatchWinner {
            match_id: "final_r1m1".into(),
            slot: Side::B,
        }
    );
    let reset: Command = serde_json::from_str(r#"{"command":"reset"}"#).unwrap();
    assert_eq!(reset, Command::Reset);
    assert!(serde_json::from_str::<Command>(r#"{"command":"shuffle"}"#).is_err());
}

#[test]
fn describe_names_the_outcome() {
    let mut t = generated(EIGHT, 8);
    let round_id = "team1_elimination_r1".to_string();
    let player = t.find_round(&round_id).unwrap().players[2].clone();

    let stage = Command::StageElimination {
        round_id: round_id.clone(),
        player: player.clone(),
    };
    apply_command(&mut t, &stage).unwrap();
    assert_eq!(stage.describe(&t), format!("{} selected for elimination", player));

    let commit = Command::CommitElimination { round_id };
    apply_command(&mut t, &commit).unwrap();
    assert_eq!(commit.describe(&t), format!("Elimination confirmed: {}", player));
}

#[test]
fn failed_command_changes_nothing() {
    let mut t = generated(EIGHT, 9);
    let before = t.clone();
    let result = apply_command(
        &mut t,
        &Command::StageElimination {
            round_id: "team1_elimination_r1".into(),
            player: "Mallory".into(),
        },
    );
    assert!(matches!(result, Err(TournamentError::PlayerNotInRound { .. })));
    assert_eq!(t, before);
}
