//! Interaction tracking service.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pathway_core::{
    ContentId, ContentInteraction, Error, InteractionId, InteractionStatus, ProgramUserId, Result,
};
use pathway_storage::Storage;
use tokio::sync::Mutex;
use tracing::debug;

/// Interaction tracking service.
///
/// Everything here operates on a single attempt row. A submitted row is
/// immutable; mutation attempts fail with [`Error::SubmittedImmutable`]
/// (or [`Error::AlreadySubmitted`] for a duplicate submit) and continuing
/// work goes through a fresh `start`.
#[async_trait]
pub trait InteractionTracker: Send + Sync {
    /// Start or resume a learner's attempt at a content item.
    ///
    /// No prior attempt: creates a row in progress. An open prior attempt:
    /// resumes it, refreshing access timestamps. A submitted prior attempt:
    /// creates a new chained row seeded with the prior submission payload.
    async fn start(
        &self,
        program_user_id: ProgramUserId,
        content_id: ContentId,
    ) -> Result<ContentInteraction>;

    /// Record a completion percentage, clamped to 0-100. Reaching 100
    /// completes the attempt.
    async fn update_progress(
        &self,
        interaction_id: InteractionId,
        percentage: f32,
    ) -> Result<ContentInteraction>;

    /// Submit the attempt with a payload. Terminal and irreversible for
    /// this row.
    async fn submit(
        &self,
        interaction_id: InteractionId,
        payload: serde_json::Value,
    ) -> Result<ContentInteraction>;

    /// Force completion without a submission payload (non-gradable
    /// content such as a lesson).
    async fn complete(&self, interaction_id: InteractionId) -> Result<ContentInteraction>;

    /// Accumulate time spent on the attempt.
    async fn add_time_spent(
        &self,
        interaction_id: InteractionId,
        minutes: u32,
    ) -> Result<ContentInteraction>;
}

/// Basic interaction tracker implementation.
pub struct BasicInteractionTracker<S: Storage> {
    storage: Arc<Mutex<S>>,
}

impl<S: Storage> BasicInteractionTracker<S> {
    /// Create a tracker over shared storage.
    pub fn new(storage: Arc<Mutex<S>>) -> Self {
        Self { storage }
    }
}

fn interaction_not_found(id: InteractionId) -> Error {
    Error::NotFound(format!("interaction {}", id))
}

#[async_trait]
impl<S: Storage + 'static> InteractionTracker for BasicInteractionTracker<S> {
    async fn start(
        &self,
        program_user_id: ProgramUserId,
        content_id: ContentId,
    ) -> Result<ContentInteraction> {
        let now = Utc::now();
        let mut storage = self.storage.lock().await;

        let interaction = match storage
            .find_latest_interaction(program_user_id, content_id)
            .await?
        {
            None => {
                debug!(%program_user_id, %content_id, "starting first attempt");
                ContentInteraction::new(program_user_id, content_id, now)
            }
            Some(previous) if previous.is_submitted() => {
                debug!(
                    %program_user_id,
                    %content_id,
                    previous = %previous.id,
                    "chaining new attempt after submission"
                );
                ContentInteraction::continue_from(&previous, now)
            }
            Some(mut current) => {
                debug!(%program_user_id, %content_id, id = %current.id, "resuming open attempt");
                if current.first_accessed_at.is_none() {
                    current.first_accessed_at = Some(now);
                }
                current.last_accessed_at = Some(now);
                if current.status == InteractionStatus::NotStarted {
                    current.status = InteractionStatus::InProgress;
                }
                current
            }
        };

        storage.save_interaction(&interaction).await?;
        Ok(interaction)
    }

    async fn update_progress(
        &self,
        interaction_id: InteractionId,
        percentage: f32,
    ) -> Result<ContentInteraction> {
        let now = Utc::now();
        let mut storage = self.storage.lock().await;

        let mut interaction = storage
            .load_interaction(interaction_id)
            .await?
            .ok_or_else(|| interaction_not_found(interaction_id))?;
        if interaction.is_submitted() {
            return Err(Error::SubmittedImmutable(interaction_id));
        }

        let clamped = percentage.clamp(0.0, 100.0);
        interaction.completion_percentage = clamped;
        interaction.last_accessed_at = Some(now);
        if clamped >= 100.0 {
            interaction.status = InteractionStatus::Completed;
            interaction.completed_at.get_or_insert(now);
        } else if interaction.status == InteractionStatus::NotStarted {
            interaction.status = InteractionStatus::InProgress;
        }

        storage.save_interaction(&interaction).await?;
        Ok(interaction)
    }

    async fn submit(
        &self,
        interaction_id: InteractionId,
        payload: serde_json::Value,
    ) -> Result<ContentInteraction> {
        let now = Utc::now();
        let mut storage = self.storage.lock().await;

        let mut interaction = storage
            .load_interaction(interaction_id)
            .await?
            .ok_or_else(|| interaction_not_found(interaction_id))?;
        if interaction.is_submitted() {
            return Err(Error::AlreadySubmitted(interaction_id));
        }

        debug!(id = %interaction_id, "submitting attempt");
        interaction.submission_data = Some(payload);
        interaction.submitted_at = Some(now);
        interaction.status = InteractionStatus::Completed;
        interaction.completed_at = Some(now);
        interaction.completion_percentage = 100.0;
        interaction.last_accessed_at = Some(now);

        storage.save_interaction(&interaction).await?;
        Ok(interaction)
    }

    async fn complete(&self, interaction_id: InteractionId) -> Result<ContentInteraction> {
        let now = Utc::now();
        let mut storage = self.storage.lock().await;

        let mut interaction = storage
            .load_interaction(interaction_id)
            .await?
            .ok_or_else(|| interaction_not_found(interaction_id))?;
        if interaction.is_submitted() {
            return Err(Error::SubmittedImmutable(interaction_id));
        }

        debug!(id = %interaction_id, "completing attempt");
        interaction.status = InteractionStatus::Completed;
        interaction.completed_at.get_or_insert(now);
        interaction.completion_percentage = 100.0;
        interaction.last_accessed_at = Some(now);

        storage.save_interaction(&interaction).await?;
        Ok(interaction)
    }

    async fn add_time_spent(
        &self,
        interaction_id: InteractionId,
        minutes: u32,
    ) -> Result<ContentInteraction> {
        let now = Utc::now();
        let mut storage = self.storage.lock().await;

        let mut interaction = storage
            .load_interaction(interaction_id)
            .await?
            .ok_or_else(|| interaction_not_found(interaction_id))?;
        if interaction.is_submitted() {
            return Err(Error::SubmittedImmutable(interaction_id));
        }

        interaction.time_spent_minutes = interaction.time_spent_minutes.saturating_add(minutes);
        interaction.last_accessed_at = Some(now);

        storage.save_interaction(&interaction).await?;
        Ok(interaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathway_storage::MemoryStorage;
    use serde_json::json;

    fn tracker() -> BasicInteractionTracker<MemoryStorage> {
        BasicInteractionTracker::new(Arc::new(Mutex::new(MemoryStorage::new())))
    }

    #[tokio::test]
    async fn start_creates_then_resumes() {
        let tracker = tracker();
        let learner = ProgramUserId::new();
        let content = ContentId::new();

        let first = tracker.start(learner, content).await.unwrap();
        assert_eq!(first.status, InteractionStatus::InProgress);
        assert_eq!(first.completion_percentage, 0.0);
        assert!(first.first_accessed_at.is_some());

        let resumed = tracker.start(learner, content).await.unwrap();
        assert_eq!(resumed.id, first.id);
        assert_eq!(resumed.first_accessed_at, first.first_accessed_at);
    }

    #[tokio::test]
    async fn start_after_submit_creates_chained_row() {
        let tracker = tracker();
        let learner = ProgramUserId::new();
        let content = ContentId::new();

        let first = tracker.start(learner, content).await.unwrap();
        let payload = json!({"answers": [2, 4]});
        let submitted = tracker.submit(first.id, payload.clone()).await.unwrap();
        assert!(submitted.is_submitted());

        let second = tracker.start(learner, content).await.unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.previous_attempt, Some(first.id));
        assert_eq!(second.submission_data, Some(payload));
        assert_eq!(second.status, InteractionStatus::InProgress);
        assert_eq!(second.completion_percentage, 0.0);
    }

    #[tokio::test]
    async fn update_progress_clamps_and_completes_at_hundred() {
        let tracker = tracker();
        let started = tracker
            .start(ProgramUserId::new(), ContentId::new())
            .await
            .unwrap();

        let low = tracker.update_progress(started.id, -5.0).await.unwrap();
        assert_eq!(low.completion_percentage, 0.0);
        assert_eq!(low.status, InteractionStatus::InProgress);
        assert!(low.completed_at.is_none());

        let high = tracker.update_progress(started.id, 250.0).await.unwrap();
        assert_eq!(high.completion_percentage, 100.0);
        assert_eq!(high.status, InteractionStatus::Completed);
        assert!(high.completed_at.is_some());
    }

    #[tokio::test]
    async fn submitted_row_is_frozen() {
        let tracker = tracker();
        let started = tracker
            .start(ProgramUserId::new(), ContentId::new())
            .await
            .unwrap();
        let submitted = tracker.submit(started.id, json!({})).await.unwrap();

        assert!(matches!(
            tracker.update_progress(started.id, 10.0).await,
            Err(Error::SubmittedImmutable(_))
        ));
        assert!(matches!(
            tracker.submit(started.id, json!({})).await,
            Err(Error::AlreadySubmitted(_))
        ));
        assert!(matches!(
            tracker.complete(started.id).await,
            Err(Error::SubmittedImmutable(_))
        ));
        assert!(matches!(
            tracker.add_time_spent(started.id, 5).await,
            Err(Error::SubmittedImmutable(_))
        ));

        // Nothing changed on the frozen row.
        let stored = tracker
            .storage
            .lock()
            .await
            .load_interaction(started.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.submitted_at, submitted.submitted_at);
        assert_eq!(stored.completion_percentage, 100.0);
        assert_eq!(stored.time_spent_minutes, 0);
    }

    #[tokio::test]
    async fn complete_requires_no_payload() {
        let tracker = tracker();
        let started = tracker
            .start(ProgramUserId::new(), ContentId::new())
            .await
            .unwrap();

        let completed = tracker.complete(started.id).await.unwrap();
        assert_eq!(completed.status, InteractionStatus::Completed);
        assert_eq!(completed.completion_percentage, 100.0);
        assert!(completed.submission_data.is_none());
        assert!(!completed.is_submitted());

        // Completion without submission does not freeze the row.
        let timed = tracker.add_time_spent(started.id, 3).await.unwrap();
        assert_eq!(timed.time_spent_minutes, 3);
    }

    #[tokio::test]
    async fn time_spent_accumulates() {
        let tracker = tracker();
        let started = tracker
            .start(ProgramUserId::new(), ContentId::new())
            .await
            .unwrap();

        tracker.add_time_spent(started.id, 10).await.unwrap();
        let after = tracker.add_time_spent(started.id, 7).await.unwrap();
        assert_eq!(after.time_spent_minutes, 17);
    }

    #[tokio::test]
    async fn missing_interaction_is_not_found() {
        let tracker = tracker();
        assert!(matches!(
            tracker.update_progress(InteractionId::new(), 50.0).await,
            Err(Error::NotFound(_))
        ));
    }
}
