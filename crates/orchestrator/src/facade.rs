//! Program orchestration façade.

use std::sync::Arc;

use chrono::Utc;
use pathway_core::{
    ActivityGrade, ContentId, ContentInteraction, EnrollmentId, Error, GradeStatistics,
    InteractionId, ProgramEnrollment, ProgramId, ProgramUserId, Result,
};
use pathway_enrollment::{BasicEnrollmentLifecycle, EnrollmentLifecycle};
use pathway_grading::{ActivityGrader, BasicActivityGrader};
use pathway_interaction::{BasicInteractionTracker, InteractionTracker};
use pathway_progress::{BasicProgressAggregator, ProgressAggregator};
use pathway_storage::Storage;
use tokio::sync::Mutex;
use tracing::warn;

/// The façade external callers drive the progression engine through.
///
/// Every multi-entity operation runs inside one storage transaction:
/// the interaction mutation, the progress recalculation, and the
/// membership/enrollment updates commit together or not at all.
pub struct ProgramOrchestrator<S: Storage + 'static> {
    storage: Arc<Mutex<S>>,
    /// The storage checkpoint is global, so begin→commit spans must not
    /// overlap; concurrent operations queue here instead of colliding.
    txn_lock: Mutex<()>,
    tracker: BasicInteractionTracker<S>,
    grader: BasicActivityGrader<S>,
    aggregator: BasicProgressAggregator<S>,
    lifecycle: BasicEnrollmentLifecycle<S>,
}

impl<S: Storage + 'static> ProgramOrchestrator<S> {
    /// Create an orchestrator owning the given storage.
    pub fn new(storage: S) -> Self {
        Self::from_shared(Arc::new(Mutex::new(storage)))
    }

    /// Create an orchestrator over storage shared with the host.
    pub fn from_shared(storage: Arc<Mutex<S>>) -> Self {
        Self {
            txn_lock: Mutex::new(()),
            tracker: BasicInteractionTracker::new(storage.clone()),
            grader: BasicActivityGrader::new(storage.clone()),
            aggregator: BasicProgressAggregator::new(storage.clone()),
            lifecycle: BasicEnrollmentLifecycle::new(storage.clone()),
            storage,
        }
    }

    /// The shared storage handle, for hosts that seed or inspect data.
    pub fn storage(&self) -> Arc<Mutex<S>> {
        self.storage.clone()
    }

    async fn begin(&self) -> Result<()> {
        self.storage.lock().await.begin().await?;
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.storage.lock().await.commit().await?;
        Ok(())
    }

    /// Roll back after a failed step; the original error wins.
    async fn abort(&self, err: Error) -> Error {
        if let Err(rollback_err) = self.storage.lock().await.rollback().await {
            warn!(error = %rollback_err, "rollback after failed operation also failed");
        }
        err
    }

    /// Start or resume a learner's attempt at a content item.
    pub async fn start_content(
        &self,
        program_user_id: ProgramUserId,
        content_id: ContentId,
    ) -> Result<ContentInteraction> {
        let _txn = self.txn_lock.lock().await;
        self.begin().await?;
        match self.tracker.start(program_user_id, content_id).await {
            Ok(interaction) => {
                self.commit().await?;
                Ok(interaction)
            }
            Err(e) => Err(self.abort(e).await),
        }
    }

    /// Finish a content item for a learner and bring every aggregate in
    /// line: gradable content is submitted (with the attempt's working
    /// payload), anything else is completed. Returns the recalculated
    /// program progress.
    pub async fn mark_content_complete(
        &self,
        program_user_id: ProgramUserId,
        program_id: ProgramId,
        content_id: ContentId,
    ) -> Result<f32> {
        let _txn = self.txn_lock.lock().await;
        self.begin().await?;
        match self
            .finish_content(program_user_id, program_id, content_id, None)
            .await
        {
            Ok(pct) => {
                self.commit().await?;
                Ok(pct)
            }
            Err(e) => Err(self.abort(e).await),
        }
    }

    /// Submit a learner's work on a content item with an explicit payload
    /// and bring every aggregate in line. Returns the recalculated
    /// program progress.
    pub async fn submit_content(
        &self,
        program_user_id: ProgramUserId,
        program_id: ProgramId,
        content_id: ContentId,
        payload: serde_json::Value,
    ) -> Result<f32> {
        let _txn = self.txn_lock.lock().await;
        self.begin().await?;
        match self
            .finish_content(program_user_id, program_id, content_id, Some(payload))
            .await
        {
            Ok(pct) => {
                self.commit().await?;
                Ok(pct)
            }
            Err(e) => Err(self.abort(e).await),
        }
    }

    /// Record a progress percentage on an open attempt and resync the
    /// aggregates (an update that reaches 100 completes the item).
    pub async fn update_content_progress(
        &self,
        program_user_id: ProgramUserId,
        program_id: ProgramId,
        interaction_id: InteractionId,
        percentage: f32,
    ) -> Result<f32> {
        let _txn = self.txn_lock.lock().await;
        self.begin().await?;
        let result = async {
            self.tracker.update_progress(interaction_id, percentage).await?;
            let pct = self.aggregator.recalculate(program_user_id, program_id).await?;
            self.sync_aggregates(program_user_id, program_id, pct).await?;
            Ok(pct)
        }
        .await;
        match result {
            Ok(pct) => {
                self.commit().await?;
                Ok(pct)
            }
            Err(e) => Err(self.abort(e).await),
        }
    }

    /// Record a grade and refresh the enrollment's final grade to the
    /// learner's grade average.
    pub async fn record_grade(
        &self,
        interaction_id: InteractionId,
        grader_id: ProgramUserId,
        grade_value: f64,
        feedback: Option<String>,
        details: Option<serde_json::Value>,
    ) -> Result<ActivityGrade> {
        let _txn = self.txn_lock.lock().await;
        self.begin().await?;
        let result = async {
            let grade = self
                .grader
                .grade(interaction_id, grader_id, grade_value, feedback, details)
                .await?;
            self.refresh_final_grade(interaction_id).await?;
            Ok(grade)
        }
        .await;
        match result {
            Ok(grade) => {
                self.commit().await?;
                Ok(grade)
            }
            Err(e) => Err(self.abort(e).await),
        }
    }

    /// Issue a certificate for a completed enrollment (idempotent).
    pub async fn issue_certificate(&self, enrollment_id: EnrollmentId) -> Result<bool> {
        let _txn = self.txn_lock.lock().await;
        self.begin().await?;
        match self.lifecycle.issue_certificate(enrollment_id).await {
            Ok(issued) => {
                self.commit().await?;
                Ok(issued)
            }
            Err(e) => Err(self.abort(e).await),
        }
    }

    /// Cancel an enrollment's access.
    pub async fn cancel_enrollment(&self, enrollment_id: EnrollmentId) -> Result<ProgramEnrollment> {
        let _txn = self.txn_lock.lock().await;
        self.begin().await?;
        match self.lifecycle.cancel(enrollment_id).await {
            Ok(enrollment) => {
                self.commit().await?;
                Ok(enrollment)
            }
            Err(e) => Err(self.abort(e).await),
        }
    }

    /// Re-activate a cancelled or expired enrollment, preserving its
    /// academic history.
    pub async fn reactivate_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<ProgramEnrollment> {
        let _txn = self.txn_lock.lock().await;
        self.begin().await?;
        match self.lifecycle.reactivate(enrollment_id).await {
            Ok(enrollment) => {
                self.commit().await?;
                Ok(enrollment)
            }
            Err(e) => Err(self.abort(e).await),
        }
    }

    /// Grade statistics for a program (read-only).
    pub async fn program_statistics(&self, program_id: ProgramId) -> Result<GradeStatistics> {
        self.grader.statistics(program_id).await
    }

    async fn finish_content(
        &self,
        program_user_id: ProgramUserId,
        program_id: ProgramId,
        content_id: ContentId,
        payload: Option<serde_json::Value>,
    ) -> Result<f32> {
        let content = self
            .storage
            .lock()
            .await
            .load_content_item(content_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("content {}", content_id)))?;

        let attempt = self.tracker.start(program_user_id, content_id).await?;

        match payload {
            Some(payload) => {
                self.tracker.submit(attempt.id, payload).await?;
            }
            None if content.kind.is_gradable() => {
                // Terminal call per content kind: gradable work is
                // submitted with the attempt's working payload.
                let draft = attempt
                    .submission_data
                    .clone()
                    .unwrap_or(serde_json::Value::Null);
                self.tracker.submit(attempt.id, draft).await?;
            }
            None => {
                self.tracker.complete(attempt.id).await?;
            }
        }

        let pct = self.aggregator.recalculate(program_user_id, program_id).await?;
        self.sync_aggregates(program_user_id, program_id, pct).await?;
        Ok(pct)
    }

    /// Write the derived percentage to both aggregates (membership and
    /// enrollment) so they never drift.
    async fn sync_aggregates(
        &self,
        program_user_id: ProgramUserId,
        program_id: ProgramId,
        percentage: f32,
    ) -> Result<()> {
        let now = Utc::now();

        let enrollment = {
            let mut storage = self.storage.lock().await;

            let mut user = storage
                .load_program_user(program_user_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("program user {}", program_user_id)))?;
            user.completion_percentage = percentage;
            if percentage >= 100.0 && user.completed_at.is_none() {
                user.completed_at = Some(now);
            }
            storage.save_program_user(&user).await?;

            storage
                .find_enrollment_for_user(program_user_id, program_id)
                .await?
        };

        // A learner may participate without a formal enrollment.
        if let Some(enrollment) = enrollment {
            self.lifecycle.apply_progress(enrollment.id, percentage).await?;
        }
        Ok(())
    }

    /// Recompute the enrollment's final grade as the average of the
    /// learner's grades within the program.
    async fn refresh_final_grade(&self, interaction_id: InteractionId) -> Result<()> {
        let mut storage = self.storage.lock().await;

        let interaction = storage
            .load_interaction(interaction_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("interaction {}", interaction_id)))?;
        let content = storage
            .load_content_item(interaction.content_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("content {}", interaction.content_id)))?;

        let Some(mut enrollment) = storage
            .find_enrollment_for_user(interaction.program_user_id, content.program_id)
            .await?
        else {
            return Ok(());
        };

        let own_interactions: Vec<InteractionId> = storage
            .list_interactions_for_learner(interaction.program_user_id, content.program_id)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();
        let values: Vec<f64> = storage
            .list_grades_for_program(content.program_id)
            .await?
            .into_iter()
            .filter(|g| own_interactions.contains(&g.interaction_id))
            .map(|g| g.grade)
            .collect();

        if !values.is_empty() {
            enrollment.final_grade = Some(values.iter().sum::<f64>() / values.len() as f64);
            storage.save_enrollment(&enrollment).await?;
        }
        Ok(())
    }
}
