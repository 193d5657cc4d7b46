//! Progress aggregation service.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use pathway_core::{ContentId, ContentInteraction, InteractionId, ProgramId, ProgramUserId, Result};
use pathway_storage::Storage;
use tokio::sync::Mutex;
use tracing::debug;

/// Progress aggregation service.
#[async_trait]
pub trait ProgressAggregator: Send + Sync {
    /// Recompute a learner's completion percentage for a program.
    ///
    /// Counts required content items whose latest (non-superseded)
    /// interaction is completed. Always derives from source facts, so
    /// repeated calls converge on the same value; zero required items
    /// yields 0, never a division by zero.
    async fn recalculate(
        &self,
        program_user_id: ProgramUserId,
        program_id: ProgramId,
    ) -> Result<f32>;
}

/// Basic progress aggregator implementation.
pub struct BasicProgressAggregator<S: Storage> {
    storage: Arc<Mutex<S>>,
}

impl<S: Storage> BasicProgressAggregator<S> {
    /// Create an aggregator over shared storage.
    pub fn new(storage: Arc<Mutex<S>>) -> Self {
        Self { storage }
    }
}

/// Reduce an attempt history to the latest row per content item.
///
/// A row is superseded when another row names it as `previous_attempt`;
/// among the survivors the identifier orders by creation time.
fn latest_per_content(
    interactions: Vec<ContentInteraction>,
) -> HashMap<ContentId, ContentInteraction> {
    let superseded: HashSet<InteractionId> = interactions
        .iter()
        .filter_map(|i| i.previous_attempt)
        .collect();

    let mut latest: HashMap<ContentId, ContentInteraction> = HashMap::new();
    for interaction in interactions {
        if superseded.contains(&interaction.id) {
            continue;
        }
        match latest.get(&interaction.content_id) {
            Some(existing) if existing.id >= interaction.id => {}
            _ => {
                latest.insert(interaction.content_id, interaction);
            }
        }
    }
    latest
}

#[async_trait]
impl<S: Storage + 'static> ProgressAggregator for BasicProgressAggregator<S> {
    async fn recalculate(
        &self,
        program_user_id: ProgramUserId,
        program_id: ProgramId,
    ) -> Result<f32> {
        let storage = self.storage.lock().await;

        let required = storage.list_required_content(program_id).await?;
        if required.is_empty() {
            return Ok(0.0);
        }

        let interactions = storage
            .list_interactions_for_learner(program_user_id, program_id)
            .await?;
        let latest = latest_per_content(interactions);

        let completed = required
            .iter()
            .filter(|item| {
                latest
                    .get(&item.id)
                    .map(|i| i.is_completed())
                    .unwrap_or(false)
            })
            .count();

        let percentage = completed as f32 / required.len() as f32 * 100.0;
        debug!(
            %program_user_id,
            %program_id,
            completed,
            required = required.len(),
            percentage,
            "recalculated progress"
        );
        Ok(percentage)
    }
}
