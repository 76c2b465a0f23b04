//! Tournament business logic: setup, team eliminations, winners bracket, finals.

mod command;
mod finals;
mod group_stage;
mod setup;
mod team_bracket;
mod winners_bracket;

pub use command::{apply_command, Command};
pub use finals::{commit_match, playable_matches, stage_match_winner};
pub use group_stage::{
    all_teams_complete, check_phase_one_completion, confirm_team_elimination,
    stage_team_elimination,
};
pub use setup::{
    clear_tournament, generate_tournament, generate_tournament_with_rng, parse_participants,
    partition, reset_tournament, summarize_participants,
};
pub use team_bracket::{build_team_bracket, commit_elimination, stage_elimination};
pub use winners_bracket::{build_winners_bracket, round_name, total_rounds};
