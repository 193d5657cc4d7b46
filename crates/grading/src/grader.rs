//! Grading service.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pathway_core::{
    ActivityGrade, Error, GradeId, GradeStatistics, InteractionId, ProgramId, ProgramUserId,
    Result,
};
use pathway_storage::Storage;
use tokio::sync::Mutex;
use tracing::debug;

/// Grading service.
///
/// Grading does not require the interaction to be submitted (instructor-
/// assessed content is graded directly), and it never touches the
/// interaction's own immutability latch.
#[async_trait]
pub trait ActivityGrader: Send + Sync {
    /// Record a grade for an interaction.
    ///
    /// The grader must be a member of the program the graded content
    /// belongs to. At most one grade exists per interaction: regrading
    /// overwrites the existing row and refreshes `graded_at`.
    async fn grade(
        &self,
        interaction_id: InteractionId,
        grader_id: ProgramUserId,
        grade_value: f64,
        feedback: Option<String>,
        details: Option<serde_json::Value>,
    ) -> Result<ActivityGrade>;

    /// Compute grade statistics over all grades in a program.
    async fn statistics(&self, program_id: ProgramId) -> Result<GradeStatistics>;
}

/// Basic grader implementation.
pub struct BasicActivityGrader<S: Storage> {
    storage: Arc<Mutex<S>>,
}

impl<S: Storage> BasicActivityGrader<S> {
    /// Create a grader over shared storage.
    pub fn new(storage: Arc<Mutex<S>>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl<S: Storage + 'static> ActivityGrader for BasicActivityGrader<S> {
    async fn grade(
        &self,
        interaction_id: InteractionId,
        grader_id: ProgramUserId,
        grade_value: f64,
        feedback: Option<String>,
        details: Option<serde_json::Value>,
    ) -> Result<ActivityGrade> {
        let now = Utc::now();
        let mut storage = self.storage.lock().await;

        let interaction = storage
            .load_interaction(interaction_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("interaction {}", interaction_id)))?;
        let content = storage
            .load_content_item(interaction.content_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("content {}", interaction.content_id)))?;

        // The grader must belong to the same program as the content.
        let grader_in_program = storage
            .load_program_user(grader_id)
            .await?
            .map(|u| u.program_id == content.program_id)
            .unwrap_or(false);
        if !grader_in_program {
            return Err(Error::InvalidGrader {
                grader: grader_id,
                program: content.program_id,
            });
        }

        let grade = match storage.find_grade(interaction_id).await? {
            Some(mut existing) => {
                debug!(interaction = %interaction_id, "regrading");
                existing.grade = grade_value;
                existing.feedback = feedback;
                existing.grading_details = details;
                existing.grader_program_user_id = grader_id;
                existing.graded_at = now;
                existing
            }
            None => {
                debug!(interaction = %interaction_id, "recording grade");
                ActivityGrade {
                    id: GradeId::new(),
                    interaction_id,
                    grade: grade_value,
                    feedback,
                    grading_details: details,
                    grader_program_user_id: grader_id,
                    graded_at: now,
                }
            }
        };

        storage.save_grade(&grade).await?;
        Ok(grade)
    }

    async fn statistics(&self, program_id: ProgramId) -> Result<GradeStatistics> {
        let storage = self.storage.lock().await;
        let grades = storage.list_grades_for_program(program_id).await?;
        let values: Vec<f64> = grades.iter().map(|g| g.grade).collect();
        Ok(GradeStatistics::from_values(&values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathway_core::{ContentInteraction, ContentItem, ContentKind, ProgramUser};
    use pathway_storage::MemoryStorage;

    struct Fixture {
        grader: BasicActivityGrader<MemoryStorage>,
        storage: Arc<Mutex<MemoryStorage>>,
        program: ProgramId,
        instructor: ProgramUserId,
    }

    async fn fixture() -> Fixture {
        let storage = Arc::new(Mutex::new(MemoryStorage::new()));
        let program = ProgramId::new();
        let instructor = {
            let mut s = storage.lock().await;
            let user = ProgramUser::new(program, Utc::now());
            s.save_program_user(&user).await.unwrap();
            user.id
        };
        Fixture {
            grader: BasicActivityGrader::new(storage.clone()),
            storage,
            program,
            instructor,
        }
    }

    async fn seed_interaction(fx: &Fixture) -> InteractionId {
        let mut s = fx.storage.lock().await;
        let item = ContentItem::new(fx.program, "Quiz", ContentKind::Quiz);
        s.save_content_item(&item).await.unwrap();
        let learner = ProgramUser::new(fx.program, Utc::now());
        s.save_program_user(&learner).await.unwrap();
        let interaction = ContentInteraction::new(learner.id, item.id, Utc::now());
        s.save_interaction(&interaction).await.unwrap();
        interaction.id
    }

    #[tokio::test]
    async fn grading_upserts_a_single_row() {
        let fx = fixture().await;
        let interaction = seed_interaction(&fx).await;

        let first = fx
            .grader
            .grade(interaction, fx.instructor, 72.0, Some("ok".into()), None)
            .await
            .unwrap();

        let second = fx
            .grader
            .grade(interaction, fx.instructor, 88.0, None, None)
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.grade, 88.0);
        assert!(second.feedback.is_none());
        assert!(second.graded_at >= first.graded_at);

        let stored = fx
            .storage
            .lock()
            .await
            .find_grade(interaction)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.grade, 88.0);
    }

    #[tokio::test]
    async fn grader_outside_program_is_rejected() {
        let fx = fixture().await;
        let interaction = seed_interaction(&fx).await;

        // A member of a different program.
        let outsider = {
            let mut s = fx.storage.lock().await;
            let user = ProgramUser::new(ProgramId::new(), Utc::now());
            s.save_program_user(&user).await.unwrap();
            user.id
        };

        assert!(matches!(
            fx.grader.grade(interaction, outsider, 90.0, None, None).await,
            Err(Error::InvalidGrader { .. })
        ));

        // An id with no membership at all.
        assert!(matches!(
            fx.grader
                .grade(interaction, ProgramUserId::new(), 90.0, None, None)
                .await,
            Err(Error::InvalidGrader { .. })
        ));
    }

    #[tokio::test]
    async fn statistics_report_passing_rate() {
        let fx = fixture().await;
        let a = seed_interaction(&fx).await;
        let b = seed_interaction(&fx).await;

        fx.grader.grade(a, fx.instructor, 55.0, None, None).await.unwrap();
        fx.grader.grade(b, fx.instructor, 80.0, None, None).await.unwrap();

        let stats = fx.grader.statistics(fx.program).await.unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.passing_rate, 50.0);
        assert_eq!(stats.min, 55.0);
        assert_eq!(stats.max, 80.0);
    }

    #[tokio::test]
    async fn statistics_on_empty_program_are_zero() {
        let fx = fixture().await;
        let stats = fx.grader.statistics(fx.program).await.unwrap();
        assert_eq!(stats, GradeStatistics::default());
    }

    #[tokio::test]
    async fn grading_ignores_the_submission_latch() {
        let fx = fixture().await;
        let interaction = seed_interaction(&fx).await;

        // Freeze the row first.
        {
            let mut s = fx.storage.lock().await;
            let mut row = s.load_interaction(interaction).await.unwrap().unwrap();
            row.submitted_at = Some(Utc::now());
            s.save_interaction(&row).await.unwrap();
        }

        // Grading still works, and leaves the latch alone.
        fx.grader
            .grade(interaction, fx.instructor, 95.0, None, None)
            .await
            .unwrap();
        let row = fx
            .storage
            .lock()
            .await
            .load_interaction(interaction)
            .await
            .unwrap()
            .unwrap();
        assert!(row.is_submitted());
    }
}
