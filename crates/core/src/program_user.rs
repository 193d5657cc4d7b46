//! Program membership model.

use serde::{Deserialize, Serialize};

use crate::id::{ProgramId, ProgramUserId};
use crate::Time;

/// A learner's membership in a program.
///
/// All of the learner's content interactions within the program hang off
/// this entity. `completion_percentage` is a derived aggregate; only the
/// orchestrator writes it, always from a fresh recalculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramUser {
    /// Unique identifier
    pub id: ProgramUserId,

    /// The program this membership belongs to
    pub program_id: ProgramId,

    /// Aggregate completion over required content (0-100)
    pub completion_percentage: f32,

    /// Set once, when completion first reaches 100
    pub completed_at: Option<Time>,

    /// Whether the membership is currently active
    pub is_active: bool,

    /// When the learner joined the program
    pub joined_at: Time,
}

impl ProgramUser {
    /// Create an active membership with no progress.
    pub fn new(program_id: ProgramId, now: Time) -> Self {
        Self {
            id: ProgramUserId::new(),
            program_id,
            completion_percentage: 0.0,
            completed_at: None,
            is_active: true,
            joined_at: now,
        }
    }
}
