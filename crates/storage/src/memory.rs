//! In-memory storage implementation.
//!
//! The default backend for tests and embedders that manage persistence
//! themselves. Transactions clone the whole state as a checkpoint, so
//! `rollback` restores it exactly.

use std::collections::HashMap;

use pathway_core::{
    ActivityGrade, ContentId, ContentInteraction, ContentItem, EnrollmentId, InteractionId,
    ProgramEnrollment, ProgramId, ProgramUser, ProgramUserId,
};
use tracing::debug;

use super::{Result, Storage, StorageError};

#[derive(Debug, Default, Clone)]
struct State {
    content: HashMap<ContentId, ContentItem>,
    interactions: HashMap<InteractionId, ContentInteraction>,
    /// Insertion order of interactions; the latest row for a
    /// (learner, content) pair is the last one created.
    interaction_order: Vec<InteractionId>,
    grades: HashMap<InteractionId, ActivityGrade>,
    program_users: HashMap<ProgramUserId, ProgramUser>,
    enrollments: HashMap<EnrollmentId, ProgramEnrollment>,
}

/// In-memory storage backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: State,
    checkpoint: Option<State>,
}

impl MemoryStorage {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn save_content_item(&mut self, item: &ContentItem) -> Result<()> {
        self.state.content.insert(item.id, item.clone());
        Ok(())
    }

    async fn load_content_item(&self, id: ContentId) -> Result<Option<ContentItem>> {
        Ok(self.state.content.get(&id).cloned())
    }

    async fn list_content(&self, program_id: ProgramId) -> Result<Vec<ContentItem>> {
        let mut items: Vec<ContentItem> = self
            .state
            .content
            .values()
            .filter(|c| c.program_id == program_id)
            .cloned()
            .collect();
        items.sort_by_key(|c| c.sort_order);
        Ok(items)
    }

    async fn list_required_content(&self, program_id: ProgramId) -> Result<Vec<ContentItem>> {
        let items = self.list_content(program_id).await?;
        Ok(items.into_iter().filter(|c| c.is_required).collect())
    }

    async fn save_interaction(&mut self, interaction: &ContentInteraction) -> Result<()> {
        if !self.state.interactions.contains_key(&interaction.id) {
            self.state.interaction_order.push(interaction.id);
        }
        self.state
            .interactions
            .insert(interaction.id, interaction.clone());
        Ok(())
    }

    async fn load_interaction(&self, id: InteractionId) -> Result<Option<ContentInteraction>> {
        Ok(self.state.interactions.get(&id).cloned())
    }

    async fn find_latest_interaction(
        &self,
        program_user_id: ProgramUserId,
        content_id: ContentId,
    ) -> Result<Option<ContentInteraction>> {
        for id in self.state.interaction_order.iter().rev() {
            if let Some(interaction) = self.state.interactions.get(id) {
                if interaction.program_user_id == program_user_id
                    && interaction.content_id == content_id
                {
                    return Ok(Some(interaction.clone()));
                }
            }
        }
        Ok(None)
    }

    async fn list_interactions_for_learner(
        &self,
        program_user_id: ProgramUserId,
        program_id: ProgramId,
    ) -> Result<Vec<ContentInteraction>> {
        let mut result = Vec::new();
        for id in &self.state.interaction_order {
            let Some(interaction) = self.state.interactions.get(id) else {
                continue;
            };
            if interaction.program_user_id != program_user_id {
                continue;
            }
            let in_program = self
                .state
                .content
                .get(&interaction.content_id)
                .map(|c| c.program_id == program_id)
                .unwrap_or(false);
            if in_program {
                result.push(interaction.clone());
            }
        }
        Ok(result)
    }

    async fn save_grade(&mut self, grade: &ActivityGrade) -> Result<()> {
        self.state.grades.insert(grade.interaction_id, grade.clone());
        Ok(())
    }

    async fn find_grade(&self, interaction_id: InteractionId) -> Result<Option<ActivityGrade>> {
        Ok(self.state.grades.get(&interaction_id).cloned())
    }

    async fn list_grades_for_program(&self, program_id: ProgramId) -> Result<Vec<ActivityGrade>> {
        let mut result = Vec::new();
        for grade in self.state.grades.values() {
            let Some(interaction) = self.state.interactions.get(&grade.interaction_id) else {
                continue;
            };
            let in_program = self
                .state
                .content
                .get(&interaction.content_id)
                .map(|c| c.program_id == program_id)
                .unwrap_or(false);
            if in_program {
                result.push(grade.clone());
            }
        }
        Ok(result)
    }

    async fn save_program_user(&mut self, user: &ProgramUser) -> Result<()> {
        self.state.program_users.insert(user.id, user.clone());
        Ok(())
    }

    async fn load_program_user(&self, id: ProgramUserId) -> Result<Option<ProgramUser>> {
        Ok(self.state.program_users.get(&id).cloned())
    }

    async fn save_enrollment(&mut self, enrollment: &ProgramEnrollment) -> Result<()> {
        self.state
            .enrollments
            .insert(enrollment.id, enrollment.clone());
        Ok(())
    }

    async fn load_enrollment(&self, id: EnrollmentId) -> Result<Option<ProgramEnrollment>> {
        Ok(self.state.enrollments.get(&id).cloned())
    }

    async fn find_enrollment_for_user(
        &self,
        program_user_id: ProgramUserId,
        program_id: ProgramId,
    ) -> Result<Option<ProgramEnrollment>> {
        Ok(self
            .state
            .enrollments
            .values()
            .find(|e| e.program_user_id == program_user_id && e.program_id == program_id)
            .cloned())
    }

    async fn begin(&mut self) -> Result<()> {
        if self.checkpoint.is_some() {
            return Err(StorageError::Transaction(
                "transaction already open".into(),
            ));
        }
        debug!("beginning transaction");
        self.checkpoint = Some(self.state.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        if self.checkpoint.take().is_none() {
            return Err(StorageError::Transaction("no open transaction".into()));
        }
        debug!("committed transaction");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        match self.checkpoint.take() {
            Some(state) => {
                debug!("rolled back transaction");
                self.state = state;
                Ok(())
            }
            None => Err(StorageError::Transaction("no open transaction".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pathway_core::ContentKind;

    #[tokio::test]
    async fn latest_interaction_follows_insertion_order() {
        let mut storage = MemoryStorage::new();
        let learner = ProgramUserId::new();
        let content = ContentId::new();
        let now = Utc::now();

        let mut first = ContentInteraction::new(learner, content, now);
        first.submitted_at = Some(now);
        storage.save_interaction(&first).await.unwrap();

        let second = ContentInteraction::continue_from(&first, now);
        storage.save_interaction(&second).await.unwrap();

        let latest = storage
            .find_latest_interaction(learner, content)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.previous_attempt, Some(first.id));
    }

    #[tokio::test]
    async fn rollback_restores_checkpoint() {
        let mut storage = MemoryStorage::new();
        let program = ProgramId::new();
        let item = ContentItem::new(program, "Intro", ContentKind::Lesson);
        storage.save_content_item(&item).await.unwrap();

        storage.begin().await.unwrap();
        let learner = ProgramUserId::new();
        let interaction = ContentInteraction::new(learner, item.id, Utc::now());
        storage.save_interaction(&interaction).await.unwrap();
        storage.rollback().await.unwrap();

        // The pre-transaction write survives, the transactional one does not.
        assert!(storage
            .load_content_item(item.id)
            .await
            .unwrap()
            .is_some());
        assert!(storage
            .load_interaction(interaction.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn nested_begin_is_rejected() {
        let mut storage = MemoryStorage::new();
        storage.begin().await.unwrap();
        assert!(storage.begin().await.is_err());
        storage.commit().await.unwrap();
        assert!(storage.commit().await.is_err());
    }
}
