//! JSON file storage implementation.
//!
//! Stores one JSON file per entity under a data root. Transactions
//! snapshot the data directories into `.txn/` on `begin`; `rollback`
//! restores the snapshot file-for-file, `commit` discards it.

use std::path::{Path, PathBuf};

use pathway_core::{
    ActivityGrade, ContentId, ContentInteraction, ContentItem, EnrollmentId, InteractionId,
    ProgramEnrollment, ProgramId, ProgramUser, ProgramUserId,
};
use tokio::fs;
use tracing::debug;

use super::{Result, Storage, StorageError};

const KINDS: [&str; 5] = [
    "content",
    "interactions",
    "grades",
    "program_users",
    "enrollments",
];

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage rooted at `root`, creating the entity directories
    /// as needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        for kind in KINDS {
            fs::create_dir_all(root.join(kind)).await?;
        }

        Ok(Self { root })
    }

    fn content_path(&self, id: ContentId) -> PathBuf {
        self.root.join("content").join(format!("{}.json", id))
    }
    fn interaction_path(&self, id: InteractionId) -> PathBuf {
        self.root.join("interactions").join(format!("{}.json", id))
    }
    fn grade_path(&self, interaction_id: InteractionId) -> PathBuf {
        // Grades are 1:1 with interactions, so the interaction id is the key.
        self.root.join("grades").join(format!("{}.json", interaction_id))
    }
    fn program_user_path(&self, id: ProgramUserId) -> PathBuf {
        self.root.join("program_users").join(format!("{}.json", id))
    }
    fn enrollment_path(&self, id: EnrollmentId) -> PathBuf {
        self.root.join("enrollments").join(format!("{}.json", id))
    }

    fn txn_root(&self) -> PathBuf {
        self.root.join(".txn")
    }

    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json.as_bytes()).await?;
        Ok(())
    }

    async fn interactions_for(
        &self,
        program_user_id: ProgramUserId,
        content_id: ContentId,
    ) -> Result<Vec<ContentInteraction>> {
        let all: Vec<ContentInteraction> = list_dir(&self.root.join("interactions")).await?;
        Ok(all
            .into_iter()
            .filter(|i| i.program_user_id == program_user_id && i.content_id == content_id)
            .collect())
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn save_content_item(&mut self, item: &ContentItem) -> Result<()> {
        self.write_json(&self.content_path(item.id), item).await
    }

    async fn load_content_item(&self, id: ContentId) -> Result<Option<ContentItem>> {
        read_json(&self.content_path(id)).await
    }

    async fn list_content(&self, program_id: ProgramId) -> Result<Vec<ContentItem>> {
        let all: Vec<ContentItem> = list_dir(&self.root.join("content")).await?;
        let mut items: Vec<ContentItem> = all
            .into_iter()
            .filter(|c| c.program_id == program_id)
            .collect();
        items.sort_by_key(|c| c.sort_order);
        Ok(items)
    }

    async fn list_required_content(&self, program_id: ProgramId) -> Result<Vec<ContentItem>> {
        let items = self.list_content(program_id).await?;
        Ok(items.into_iter().filter(|c| c.is_required).collect())
    }

    async fn save_interaction(&mut self, interaction: &ContentInteraction) -> Result<()> {
        self.write_json(&self.interaction_path(interaction.id), interaction)
            .await
    }

    async fn load_interaction(&self, id: InteractionId) -> Result<Option<ContentInteraction>> {
        read_json(&self.interaction_path(id)).await
    }

    async fn find_latest_interaction(
        &self,
        program_user_id: ProgramUserId,
        content_id: ContentId,
    ) -> Result<Option<ContentInteraction>> {
        let rows = self.interactions_for(program_user_id, content_id).await?;

        // Rows named as someone's previous attempt are superseded; among
        // the rest the ULID orders by creation time.
        let superseded: Vec<InteractionId> =
            rows.iter().filter_map(|i| i.previous_attempt).collect();
        Ok(rows
            .into_iter()
            .filter(|i| !superseded.contains(&i.id))
            .max_by_key(|i| i.id))
    }

    async fn list_interactions_for_learner(
        &self,
        program_user_id: ProgramUserId,
        program_id: ProgramId,
    ) -> Result<Vec<ContentInteraction>> {
        let all: Vec<ContentInteraction> = list_dir(&self.root.join("interactions")).await?;
        let mut result = Vec::new();
        for interaction in all {
            if interaction.program_user_id != program_user_id {
                continue;
            }
            if let Some(content) = self.load_content_item(interaction.content_id).await? {
                if content.program_id == program_id {
                    result.push(interaction);
                }
            }
        }
        result.sort_by_key(|i| i.id);
        Ok(result)
    }

    async fn save_grade(&mut self, grade: &ActivityGrade) -> Result<()> {
        self.write_json(&self.grade_path(grade.interaction_id), grade)
            .await
    }

    async fn find_grade(&self, interaction_id: InteractionId) -> Result<Option<ActivityGrade>> {
        read_json(&self.grade_path(interaction_id)).await
    }

    async fn list_grades_for_program(&self, program_id: ProgramId) -> Result<Vec<ActivityGrade>> {
        let all: Vec<ActivityGrade> = list_dir(&self.root.join("grades")).await?;
        let mut result = Vec::new();
        for grade in all {
            let Some(interaction) = self.load_interaction(grade.interaction_id).await? else {
                continue;
            };
            if let Some(content) = self.load_content_item(interaction.content_id).await? {
                if content.program_id == program_id {
                    result.push(grade);
                }
            }
        }
        Ok(result)
    }

    async fn save_program_user(&mut self, user: &ProgramUser) -> Result<()> {
        self.write_json(&self.program_user_path(user.id), user).await
    }

    async fn load_program_user(&self, id: ProgramUserId) -> Result<Option<ProgramUser>> {
        read_json(&self.program_user_path(id)).await
    }

    async fn save_enrollment(&mut self, enrollment: &ProgramEnrollment) -> Result<()> {
        self.write_json(&self.enrollment_path(enrollment.id), enrollment)
            .await
    }

    async fn load_enrollment(&self, id: EnrollmentId) -> Result<Option<ProgramEnrollment>> {
        read_json(&self.enrollment_path(id)).await
    }

    async fn find_enrollment_for_user(
        &self,
        program_user_id: ProgramUserId,
        program_id: ProgramId,
    ) -> Result<Option<ProgramEnrollment>> {
        let all: Vec<ProgramEnrollment> = list_dir(&self.root.join("enrollments")).await?;
        Ok(all
            .into_iter()
            .find(|e| e.program_user_id == program_user_id && e.program_id == program_id))
    }

    async fn begin(&mut self) -> Result<()> {
        let txn = self.txn_root();
        if fs::try_exists(&txn).await? {
            return Err(StorageError::Transaction(
                "transaction already open".into(),
            ));
        }
        debug!("beginning transaction at {}", txn.display());
        for kind in KINDS {
            copy_dir_flat(&self.root.join(kind), &txn.join(kind)).await?;
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let txn = self.txn_root();
        if !fs::try_exists(&txn).await? {
            return Err(StorageError::Transaction("no open transaction".into()));
        }
        fs::remove_dir_all(&txn).await?;
        debug!("committed transaction");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let txn = self.txn_root();
        if !fs::try_exists(&txn).await? {
            return Err(StorageError::Transaction("no open transaction".into()));
        }
        for kind in KINDS {
            let live = self.root.join(kind);
            clear_dir(&live).await?;
            copy_dir_flat(&txn.join(kind), &live).await?;
        }
        fs::remove_dir_all(&txn).await?;
        debug!("rolled back transaction");
        Ok(())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Ok(Some(item)) = read_json(&entry.path()).await {
            items.push(item);
        }
    }
    Ok(items)
}

async fn copy_dir_flat(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).await?;
    let mut rd = fs::read_dir(src).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.file_type().await?.is_file() {
            fs::copy(entry.path(), dst.join(entry.file_name())).await?;
        }
    }
    Ok(())
}

async fn clear_dir(dir: &Path) -> Result<()> {
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.file_type().await?.is_file() {
            fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pathway_core::ContentKind;

    #[tokio::test]
    async fn round_trips_entities_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let now = Utc::now();

        let program = ProgramId::new();
        let item = ContentItem::new(program, "Module 1", ContentKind::Quiz);
        storage.save_content_item(&item).await.unwrap();

        let user = ProgramUser::new(program, now);
        storage.save_program_user(&user).await.unwrap();

        let interaction = ContentInteraction::new(user.id, item.id, now);
        storage.save_interaction(&interaction).await.unwrap();

        let enrollment = ProgramEnrollment::new(program, user.id, now);
        storage.save_enrollment(&enrollment).await.unwrap();

        let loaded = storage.load_interaction(interaction.id).await.unwrap().unwrap();
        assert_eq!(loaded.content_id, item.id);

        let latest = storage
            .find_latest_interaction(user.id, item.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, interaction.id);

        let found = storage
            .find_enrollment_for_user(user.id, program)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, enrollment.id);
    }

    #[tokio::test]
    async fn rollback_restores_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let program = ProgramId::new();
        let item = ContentItem::new(program, "Before", ContentKind::Lesson);
        storage.save_content_item(&item).await.unwrap();

        storage.begin().await.unwrap();
        let mut changed = item.clone();
        changed.title = "After".to_string();
        storage.save_content_item(&changed).await.unwrap();
        let extra = ContentItem::new(program, "Extra", ContentKind::Lesson);
        storage.save_content_item(&extra).await.unwrap();
        storage.rollback().await.unwrap();

        let restored = storage.load_content_item(item.id).await.unwrap().unwrap();
        assert_eq!(restored.title, "Before");
        assert!(storage.load_content_item(extra.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn latest_interaction_skips_superseded_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let now = Utc::now();

        let learner = ProgramUserId::new();
        let content = ContentId::new();
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
    }
}
