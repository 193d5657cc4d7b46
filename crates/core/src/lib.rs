//! Pathway core data models.
//!
//! This crate defines the entities of the program progression and
//! grading engine: content, interactions, grades, program membership
//! and enrollment, plus the typed domain errors every service raises.

#![warn(missing_docs)]

// Core identities
mod id;

// Program content
mod content;

// Learner activity
mod interaction;
mod grade;

// Membership and enrollment
mod program_user;
mod enrollment;

// Domain errors
mod error;

// Re-exports
pub use id::*;

pub use content::{ContentItem, ContentKind};
pub use interaction::{ContentInteraction, InteractionStatus};
pub use grade::{ActivityGrade, GradeStatistics, PASSING_GRADE};
pub use program_user::ProgramUser;
pub use enrollment::{CompletionStatus, EnrollmentStatus, ProgramEnrollment};
pub use error::{Error, Result};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
