//! Content item model - the units of a program a learner works through.

use serde::{Deserialize, Serialize};

use crate::id::{ContentId, ProgramId};

/// A piece of program content (lesson, quiz, assignment, ...).
///
/// Content is authored outside the progression engine; the engine only
/// reads it to know what exists, what is required, and how to terminate
/// an interaction with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// Unique identifier
    pub id: ContentId,

    /// Owning program
    pub program_id: ProgramId,

    /// Display title
    pub title: String,

    /// What kind of content this is
    pub kind: ContentKind,

    /// Whether this item counts toward program completion
    pub is_required: bool,

    /// Position within the program
    pub sort_order: i32,

    /// Maximum achievable points, for gradable content
    pub max_points: Option<f64>,
}

impl ContentItem {
    /// Create a new content item with defaults suitable for a lesson.
    pub fn new(program_id: ProgramId, title: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            id: ContentId::new(),
            program_id,
            title: title.into(),
            kind,
            is_required: true,
            sort_order: 0,
            max_points: None,
        }
    }
}

/// The kind of a content item.
///
/// The orchestrator consults this to decide whether finishing the item
/// goes through `submit` (gradable work) or `complete` (consumption only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    /// Reading/viewing material; completed, never submitted
    Lesson,

    /// Auto- or instructor-scored quiz
    Quiz,

    /// Submitted work graded by an instructor
    Assignment,

    /// Ungraded response collection
    Survey,
}

impl ContentKind {
    /// Whether interactions with this content terminate via submission.
    pub fn is_gradable(&self) -> bool {
        matches!(self, ContentKind::Quiz | ContentKind::Assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lessons_and_surveys_are_not_gradable() {
        assert!(!ContentKind::Lesson.is_gradable());
        assert!(!ContentKind::Survey.is_gradable());
        assert!(ContentKind::Quiz.is_gradable());
        assert!(ContentKind::Assignment.is_gradable());
    }
}
