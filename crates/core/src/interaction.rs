//! Content interaction model - one learner's attempt at one content item.

use serde::{Deserialize, Serialize};

use crate::id::{ContentId, InteractionId, ProgramUserId};
use crate::Time;

/// Status of an interaction.
///
/// Orthogonally to this status, `submitted_at` acts as a one-way latch:
/// once set, the row is frozen and continuing work requires a new row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionStatus {
    /// Row exists but the learner has not begun
    NotStarted,

    /// Learner is working on the content
    InProgress,

    /// Content finished (completed or submitted)
    Completed,
}

/// One learner's attempt at one content item.
///
/// Rows are append-only. A submitted row is never mutated or deleted;
/// a follow-up attempt is a new row whose `previous_attempt` points at
/// the frozen one and whose `submission_data` is seeded from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentInteraction {
    /// Unique identifier
    pub id: InteractionId,

    /// Owning learner-in-program
    pub program_user_id: ProgramUserId,

    /// The content item this attempt is against
    pub content_id: ContentId,

    /// Current status
    pub status: InteractionStatus,

    /// Completion percentage (0-100)
    pub completion_percentage: f32,

    /// Accumulated time spent, in minutes
    pub time_spent_minutes: u32,

    /// When the learner first opened the content
    pub first_accessed_at: Option<Time>,

    /// When the learner last touched the content
    pub last_accessed_at: Option<Time>,

    /// When the content was completed
    pub completed_at: Option<Time>,

    /// The immutability latch: set exactly once, on submission
    pub submitted_at: Option<Time>,

    /// Opaque submission payload
    pub submission_data: Option<serde_json::Value>,

    /// The submitted row this attempt continues from, if any
    pub previous_attempt: Option<InteractionId>,
}

impl ContentInteraction {
    /// Create a fresh attempt, started now.
    pub fn new(program_user_id: ProgramUserId, content_id: ContentId, now: Time) -> Self {
        Self {
            id: InteractionId::new(),
            program_user_id,
            content_id,
            status: InteractionStatus::InProgress,
            completion_percentage: 0.0,
            time_spent_minutes: 0,
            first_accessed_at: Some(now),
            last_accessed_at: Some(now),
            completed_at: None,
            submitted_at: None,
            submission_data: None,
            previous_attempt: None,
        }
    }

    /// Create a follow-up attempt chained to a submitted row.
    ///
    /// The new row starts in progress at 0% with the prior row's
    /// submission payload as its working seed.
    pub fn continue_from(previous: &ContentInteraction, now: Time) -> Self {
        Self {
            id: InteractionId::new(),
            program_user_id: previous.program_user_id,
            content_id: previous.content_id,
            status: InteractionStatus::InProgress,
            completion_percentage: 0.0,
            time_spent_minutes: 0,
            first_accessed_at: Some(now),
            last_accessed_at: Some(now),
            completed_at: None,
            submitted_at: None,
            submission_data: previous.submission_data.clone(),
            previous_attempt: Some(previous.id),
        }
    }

    /// Whether the immutability latch is set.
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    /// Whether this attempt counts as finished.
    pub fn is_completed(&self) -> bool {
        self.status == InteractionStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continue_from_seeds_payload_and_links_back() {
        let now = chrono::Utc::now();
        let mut first = ContentInteraction::new(ProgramUserId::new(), ContentId::new(), now);
        first.submission_data = Some(serde_json::json!({"answers": [1, 2, 3]}));
        first.submitted_at = Some(now);

        let second = ContentInteraction::continue_from(&first, now);

        assert_ne!(second.id, first.id);
        assert_eq!(second.previous_attempt, Some(first.id));
        assert_eq!(second.submission_data, first.submission_data);
        assert_eq!(second.status, InteractionStatus::InProgress);
        assert_eq!(second.completion_percentage, 0.0);
        assert!(!second.is_submitted());
    }
}
