//! Domain errors raised by the progression engine.

use crate::id::{EnrollmentId, InteractionId, ProgramId, ProgramUserId};

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the progression and grading services.
///
/// Every violated invariant becomes one of these; nothing is retried or
/// swallowed internally. Mapping to transport-level responses is the
/// host's concern.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Mutation attempted on an interaction frozen by submission
    #[error("interaction {0} has been submitted and is immutable")]
    SubmittedImmutable(InteractionId),

    /// Duplicate submit on an already-submitted interaction
    #[error("interaction {0} was already submitted")]
    AlreadySubmitted(InteractionId),

    /// The grader is not a member of the content's program
    #[error("grader {grader} is not a member of program {program}")]
    InvalidGrader {
        /// The offending grader
        grader: ProgramUserId,
        /// The program the content belongs to
        program: ProgramId,
    },

    /// Certificate requested before the enrollment completed
    #[error("enrollment {0} is not eligible for a certificate")]
    NotEligible(EnrollmentId),

    /// The persistence layer failed
    #[error("storage error: {0}")]
    Storage(String),
}
