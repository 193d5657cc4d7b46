//! Storage trait abstraction.

use async_trait::async_trait;
use pathway_core::{
    ActivityGrade, ContentId, ContentInteraction, ContentItem, EnrollmentId, InteractionId,
    ProgramEnrollment, ProgramId, ProgramUser, ProgramUserId,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transaction misuse (commit/rollback without begin, nested begin)
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<StorageError> for pathway_core::Error {
    fn from(err: StorageError) -> Self {
        pathway_core::Error::Storage(err.to_string())
    }
}

/// Storage abstraction for the progression engine.
///
/// This trait allows different persistence backends to be plugged in.
/// Interactions are append-only: a submitted row is never deleted, and
/// "latest" lookups skip rows another row has superseded.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Content operations ===

    /// Save a content item (create or update).
    async fn save_content_item(&mut self, item: &ContentItem) -> Result<()>;

    /// Load a content item by ID.
    async fn load_content_item(&self, id: ContentId) -> Result<Option<ContentItem>>;

    /// List all content items in a program, in sort order.
    async fn list_content(&self, program_id: ProgramId) -> Result<Vec<ContentItem>>;

    /// List the required content items in a program, in sort order.
    async fn list_required_content(&self, program_id: ProgramId) -> Result<Vec<ContentItem>>;

    // === Interaction operations ===

    /// Save an interaction (create or update).
    async fn save_interaction(&mut self, interaction: &ContentInteraction) -> Result<()>;

    /// Load an interaction by ID.
    async fn load_interaction(&self, id: InteractionId) -> Result<Option<ContentInteraction>>;

    /// Find the most recent, non-superseded interaction for a learner and
    /// content item. Returns `None` if the learner never started the item.
    async fn find_latest_interaction(
        &self,
        program_user_id: ProgramUserId,
        content_id: ContentId,
    ) -> Result<Option<ContentInteraction>>;

    /// List every interaction (attempt history included) a learner has
    /// within a program.
    async fn list_interactions_for_learner(
        &self,
        program_user_id: ProgramUserId,
        program_id: ProgramId,
    ) -> Result<Vec<ContentInteraction>>;

    // === Grade operations ===

    /// Save a grade (create or update; at most one per interaction).
    async fn save_grade(&mut self, grade: &ActivityGrade) -> Result<()>;

    /// Find the grade for an interaction, if one exists.
    async fn find_grade(&self, interaction_id: InteractionId) -> Result<Option<ActivityGrade>>;

    /// List all grades whose interaction belongs to content in a program.
    async fn list_grades_for_program(&self, program_id: ProgramId) -> Result<Vec<ActivityGrade>>;

    // === Program user operations ===

    /// Save a program membership (create or update).
    async fn save_program_user(&mut self, user: &ProgramUser) -> Result<()>;

    /// Load a program membership by ID.
    async fn load_program_user(&self, id: ProgramUserId) -> Result<Option<ProgramUser>>;

    // === Enrollment operations ===

    /// Save an enrollment (create or update).
    async fn save_enrollment(&mut self, enrollment: &ProgramEnrollment) -> Result<()>;

    /// Load an enrollment by ID.
    async fn load_enrollment(&self, id: EnrollmentId) -> Result<Option<ProgramEnrollment>>;

    /// Find the enrollment backing a program membership, if the learner
    /// enrolled formally rather than participating directly.
    async fn find_enrollment_for_user(
        &self,
        program_user_id: ProgramUserId,
        program_id: ProgramId,
    ) -> Result<Option<ProgramEnrollment>>;

    // === Transaction support ===

    /// Checkpoint current state; every write until `commit` or `rollback`
    /// belongs to the transaction.
    async fn begin(&mut self) -> Result<()>;

    /// Discard the checkpoint, keeping all writes since `begin`.
    async fn commit(&mut self) -> Result<()>;

    /// Restore the checkpoint, discarding all writes since `begin`.
    async fn rollback(&mut self) -> Result<()>;
}
