//! Winners bracket builder: knockout rounds among phase-1 winners, byes for odd counts.

use crate::models::{BracketMatch, BracketRound, Participant, Slot, TournamentError, WinnersBracket};

/// ceil(log2(entrants)); 0 for a single entrant.
pub fn total_rounds(entrants: usize) -> u32 {
    entrants.max(1).next_power_of_two().trailing_zeros()
}

/// Name a round by how many rounds remain until (and including) the final.
pub fn round_name(round_number: u32, total_rounds: u32) -> String {
    match (total_rounds + 1).saturating_sub(round_number) {
        1 => "Final".to_string(),
        2 => "Semifinals".to_string(),
        3 => "Quarterfinals".to_string(),
        4 => "Round of 16".to_string(),
        _ => format!("Round {}", round_number),
    }
}

/// Pair entrants `(0,1), (2,3), ...` round after round. A trailing unpaired
/// entrant gets a bye into the next round; every match sends a pending slot
/// for its winner forward.
pub fn build_winners_bracket(winners: &[Participant]) -> Result<WinnersBracket, TournamentError> {
    if winners.len() < 2 {
        return Err(TournamentError::NotEnoughWinners(winners.len()));
    }
    let total = total_rounds(winners.len());

    let mut current: Vec<Slot> = winners.iter().cloned().map(Slot::Resolved).collect();
    let mut rounds = Vec::with_capacity(total as usize);
    let mut round_number = 1;
    while current.len() > 1 {
        let mut next = Vec::with_capacity(current.len() / 2 + 1);
        let mut matches = Vec::new();
        let mut byes = Vec::new();

        let mut slots = current.into_iter();
        while let Some(slot_a) = slots.next() {
            match slots.next() {
                Some(slot_b) => {
                    let m = BracketMatch::new(round_number, matches.len(), slot_a, slot_b);
                    next.push(Slot::Pending(m.id.clone()));
                    matches.push(m);
                }
                None => {
                    byes.push(slot_a.clone());
                    next.push(slot_a);
                }
            }
        }

        rounds.push(BracketRound {
            round_number,
            name: round_name(round_number, total),
            matches,
            byes,
            completed: false,
        });
        current = next;
        round_number += 1;
    }

    Ok(WinnersBracket {
        rounds,
        completed: false,
    })
}
