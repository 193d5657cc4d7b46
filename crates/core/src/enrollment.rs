//! Program enrollment model.

use serde::{Deserialize, Serialize};

use crate::id::{EnrollmentId, ProgramId, ProgramUserId};
use crate::Time;

/// Administrative status of an enrollment - whether it confers access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnrollmentStatus {
    /// Enrollment confers current access
    Active,

    /// Cancelled by the learner or an administrator
    Cancelled,

    /// Lapsed without cancellation
    Expired,
}

/// Academic completion status of an enrollment.
///
/// Progresses one way: NotStarted, InProgress, Completed,
/// CompletedWithCertificate. Administrative status changes (cancel,
/// expire, reactivate) never move it backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompletionStatus {
    /// No progress recorded yet
    NotStarted,

    /// Some required content completed
    InProgress,

    /// All required content completed
    Completed,

    /// Completed and a certificate has been issued
    CompletedWithCertificate,
}

impl CompletionStatus {
    /// Whether the enrollment has reached full completion.
    pub fn is_complete(&self) -> bool {
        matches!(
            self,
            CompletionStatus::Completed | CompletionStatus::CompletedWithCertificate
        )
    }
}

/// The administrative record of a learner's participation in a program,
/// distinct from the [`crate::ProgramUser`] membership it mirrors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramEnrollment {
    /// Unique identifier
    pub id: EnrollmentId,

    /// The enrolled program
    pub program_id: ProgramId,

    /// The learner's membership in that program
    pub program_user_id: ProgramUserId,

    /// Whether the enrollment confers access
    pub enrollment_status: EnrollmentStatus,

    /// Academic completion status
    pub completion_status: CompletionStatus,

    /// Aggregate progress over required content (0-100)
    pub progress_percentage: f32,

    /// Final grade, once grading has produced one
    pub final_grade: Option<f64>,

    /// Certificate latch: transitions false to true exactly once
    pub certificate_issued: bool,

    /// When the certificate was issued
    pub certificate_issued_at: Option<Time>,

    /// When the enrollment was (last) activated
    pub enrolled_at: Time,

    /// Set once, when progress first reaches 100
    pub completed_at: Option<Time>,
}

impl ProgramEnrollment {
    /// Create an active enrollment with no progress.
    pub fn new(program_id: ProgramId, program_user_id: ProgramUserId, now: Time) -> Self {
        Self {
            id: EnrollmentId::new(),
            program_id,
            program_user_id,
            enrollment_status: EnrollmentStatus::Active,
            completion_status: CompletionStatus::NotStarted,
            progress_percentage: 0.0,
            final_grade: None,
            certificate_issued: false,
            certificate_issued_at: None,
            enrolled_at: now,
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_states() {
        assert!(!CompletionStatus::NotStarted.is_complete());
        assert!(!CompletionStatus::InProgress.is_complete());
        assert!(CompletionStatus::Completed.is_complete());
        assert!(CompletionStatus::CompletedWithCertificate.is_complete());
    }
}
