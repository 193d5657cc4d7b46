//! Enrollment lifecycle service.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pathway_core::{
    CompletionStatus, EnrollmentId, EnrollmentStatus, Error, ProgramEnrollment, Result,
};
use pathway_storage::Storage;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Enrollment lifecycle service.
///
/// Academic completion moves one way (NotStarted, InProgress, Completed,
/// CompletedWithCertificate); the administrative status (Active,
/// Cancelled, Expired) toggles independently and never erases academic
/// history.
#[async_trait]
pub trait EnrollmentLifecycle: Send + Sync {
    /// Apply an aggregated progress percentage (clamped to 0-100).
    ///
    /// Promotes NotStarted to InProgress above zero; the first time
    /// progress reaches 100 the enrollment becomes Completed with
    /// `completed_at` stamped once.
    async fn apply_progress(
        &self,
        enrollment_id: EnrollmentId,
        percentage: f32,
    ) -> Result<ProgramEnrollment>;

    /// Issue a certificate for a completed enrollment.
    ///
    /// Fails with [`Error::NotEligible`] before completion. Once the
    /// certificate is issued, re-invocation returns `true` without
    /// modifying anything.
    async fn issue_certificate(&self, enrollment_id: EnrollmentId) -> Result<bool>;

    /// Cancel the enrollment's access.
    async fn cancel(&self, enrollment_id: EnrollmentId) -> Result<ProgramEnrollment>;

    /// Mark the enrollment as lapsed.
    async fn expire(&self, enrollment_id: EnrollmentId) -> Result<ProgramEnrollment>;

    /// Re-activate a cancelled or expired enrollment.
    ///
    /// Resets `enrolled_at` to now but preserves completion status,
    /// progress, and certificate state.
    async fn reactivate(&self, enrollment_id: EnrollmentId) -> Result<ProgramEnrollment>;
}

/// Basic enrollment lifecycle implementation.
pub struct BasicEnrollmentLifecycle<S: Storage> {
    storage: Arc<Mutex<S>>,
}

impl<S: Storage> BasicEnrollmentLifecycle<S> {
    /// Create a lifecycle service over shared storage.
    pub fn new(storage: Arc<Mutex<S>>) -> Self {
        Self { storage }
    }
}

fn enrollment_not_found(id: EnrollmentId) -> Error {
    Error::NotFound(format!("enrollment {}", id))
}

#[async_trait]
impl<S: Storage + 'static> EnrollmentLifecycle for BasicEnrollmentLifecycle<S> {
    async fn apply_progress(
        &self,
        enrollment_id: EnrollmentId,
        percentage: f32,
    ) -> Result<ProgramEnrollment> {
        let now = Utc::now();
        let mut storage = self.storage.lock().await;

        let mut enrollment = storage
            .load_enrollment(enrollment_id)
            .await?
            .ok_or_else(|| enrollment_not_found(enrollment_id))?;

        let clamped = percentage.clamp(0.0, 100.0);
        enrollment.progress_percentage = clamped;

        if clamped >= 100.0 && !enrollment.completion_status.is_complete() {
            debug!(id = %enrollment_id, "enrollment completed");
            enrollment.completion_status = CompletionStatus::Completed;
            enrollment.completed_at = Some(now);
        } else if clamped > 0.0 && enrollment.completion_status == CompletionStatus::NotStarted {
            enrollment.completion_status = CompletionStatus::InProgress;
        }

        storage.save_enrollment(&enrollment).await?;
        Ok(enrollment)
    }

    async fn issue_certificate(&self, enrollment_id: EnrollmentId) -> Result<bool> {
        let now = Utc::now();
        let mut storage = self.storage.lock().await;

        let mut enrollment = storage
            .load_enrollment(enrollment_id)
            .await?
            .ok_or_else(|| enrollment_not_found(enrollment_id))?;

        if !enrollment.completion_status.is_complete() {
            return Err(Error::NotEligible(enrollment_id));
        }
        if enrollment.certificate_issued {
            // Idempotent: already issued, report success untouched.
            return Ok(true);
        }

        info!(id = %enrollment_id, "issuing certificate");
        enrollment.certificate_issued = true;
        enrollment.certificate_issued_at = Some(now);
        enrollment.completion_status = CompletionStatus::CompletedWithCertificate;

        storage.save_enrollment(&enrollment).await?;
        Ok(true)
    }

    async fn cancel(&self, enrollment_id: EnrollmentId) -> Result<ProgramEnrollment> {
        let mut storage = self.storage.lock().await;

        let mut enrollment = storage
            .load_enrollment(enrollment_id)
            .await?
            .ok_or_else(|| enrollment_not_found(enrollment_id))?;

        debug!(id = %enrollment_id, "cancelling enrollment");
        enrollment.enrollment_status = EnrollmentStatus::Cancelled;

        storage.save_enrollment(&enrollment).await?;
        Ok(enrollment)
    }

    async fn expire(&self, enrollment_id: EnrollmentId) -> Result<ProgramEnrollment> {
        let mut storage = self.storage.lock().await;

        let mut enrollment = storage
            .load_enrollment(enrollment_id)
            .await?
            .ok_or_else(|| enrollment_not_found(enrollment_id))?;

        debug!(id = %enrollment_id, "expiring enrollment");
        enrollment.enrollment_status = EnrollmentStatus::Expired;

        storage.save_enrollment(&enrollment).await?;
        Ok(enrollment)
    }

    async fn reactivate(&self, enrollment_id: EnrollmentId) -> Result<ProgramEnrollment> {
        let now = Utc::now();
        let mut storage = self.storage.lock().await;

        let mut enrollment = storage
            .load_enrollment(enrollment_id)
            .await?
            .ok_or_else(|| enrollment_not_found(enrollment_id))?;

        debug!(id = %enrollment_id, "reactivating enrollment");
        enrollment.enrollment_status = EnrollmentStatus::Active;
        enrollment.enrolled_at = now;

        storage.save_enrollment(&enrollment).await?;
        Ok(enrollment)
    }
}
