//! Participants and the teams of four they are drawn into.

use serde::{Deserialize, Serialize};

/// A participant is identified by their display name (unique, case-sensitive).
pub type Participant = String;

/// 1-based team number, in assignment order.
pub type TeamId = u32;

/// Players per team.
pub const TEAM_SIZE: usize = 4;

const TEAM_NAMES: [&str; 8] = [
    "Red Team",
    "Blue Team",
    "Green Team",
    "Yellow Team",
    "Purple Team",
    "Orange Team",
    "Pink Team",
    "Turquoise Team",
];

/// A team of exactly [`TEAM_SIZE`] participants. Immutable once assigned.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub members: Vec<Participant>,
}

impl Team {
    pub fn new(id: TeamId, members: Vec<Participant>) -> Self {
        Self {
            id,
            name: Self::default_name(id),
            members,
        }
    }

    /// Palette name for the n-th team, `Team N` once the palette runs out.
    pub fn default_name(id: TeamId) -> String {
        id.checked_sub(1)
            .and_then(|i| TEAM_NAMES.get(i as usize))
            .map(|name| (*name).to_string())
            .unwrap_or_else(|| format!("Team {id}"))
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }
}

/// Live counter for raw participant input (shown while the organizer types).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub count: usize,
    pub teams: usize,
    pub substitutes: usize,
    /// At least one full team can be formed.
    pub enough: bool,
}

impl ParticipantSummary {
    pub fn from_count(count: usize) -> Self {
        Self {
            count,
            teams: count / TEAM_SIZE,
            substitutes: count % TEAM_SIZE,
            enough: count >= TEAM_SIZE,
        }
    }
}
