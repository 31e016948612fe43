//! Blind random assignment of subjects to participants.

pub mod storage;
pub mod types;

pub use storage::{load_json_list, save_assignment};
pub use types::{Assignment, Pairing, Participant, Subject};

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::errors::AssignError;
use crate::scoring::Category;

/// Shuffle `subjects` and pair the first N with the N participants.
///
/// Each participant gets a distinct subject. Subjects beyond the number of
/// participants stay unassigned.
pub fn assign_subjects<R: Rng + ?Sized>(
    category: Category,
    subjects: &[Subject],
    participants: &[Participant],
    rng: &mut R,
) -> Result<Assignment, AssignError> {
    if participants.is_empty() {
        return Err(AssignError::NoParticipants);
    }

    let mut seen = HashSet::new();
    for participant in participants {
        if !seen.insert(participant.name.as_str()) {
            return Err(AssignError::DuplicateParticipant(participant.name.clone()));
        }
    }

    if subjects.len() < participants.len() {
        return Err(AssignError::NotEnoughSubjects {
            subjects: subjects.len(),
            participants: participants.len(),
        });
    }

    let mut pool: Vec<&Subject> = subjects.iter().collect();
    pool.shuffle(rng);

    let pairings = participants
        .iter()
        .zip(pool)
        .map(|(participant, subject)| Pairing {
            participant: participant.name.clone(),
            subject: subject.name.clone(),
            emoji: subject.emoji.clone(),
        })
        .collect();

    Ok(Assignment::new(category, pairings))
}
