//! UNO tournament web app: library with models, business logic, snapshot sync
//! and collaborator presence.

pub mod logic;
pub mod models;
pub mod presence;
pub mod sync;

pub use logic::{
    all_teams_complete, apply_command, build_team_bracket, build_winners_bracket,
    check_phase_one_completion, clear_tournament, commit_elimination, commit_match,
    confirm_team_elimination, generate_tournament, generate_tournament_with_rng,
    parse_participants, partition, playable_matches, reset_tournament, round_name,
    stage_elimination, stage_match_winner, stage_team_elimination, summarize_participants,
    total_rounds, Command,
};
pub use models::{
    BracketMatch, BracketRound, EliminationRound, MatchId, Participant, ParticipantSummary,
    PhaseSnapshot, RoundId, Side, Slot, Snapshot, Team, TeamBracket, TeamId, Tournament,
    TournamentError, TournamentId, TournamentState, WinnersBracket, SCHEMA_VERSION, TEAM_SIZE,
};
pub use presence::{ActiveUser, Presence, PRESENCE_TIMEOUT_MINUTES};
pub use sync::{FileSnapshotStore, MemorySnapshotStore, Replica, SnapshotStore};
