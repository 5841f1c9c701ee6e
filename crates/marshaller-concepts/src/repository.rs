//! Concept Repository: the shared, periodically rebuilt concept snapshot.
//!
//! Readers clone an `Arc` of the current snapshot under a short read lock and
//! never wait on network I/O. [`ConceptRepository::load`] fetches everything
//! first and only takes the write lock to swap the finished snapshot in, so a
//! failed fetch leaves the previous snapshot authoritative.

use futures::future::try_join_all;
use marshaller_core::config::RefreshConfig;
use marshaller_core::{AspectNode, Characteristic, Concept, Function, MarshallerError, Result};
use parking_lot::RwLock;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::client::RegistryClient;
use crate::snapshot::{ConceptSnapshot, SnapshotStats};

pub struct ConceptRepository {
    snapshot: RwLock<Arc<ConceptSnapshot>>,
}

impl Default for ConceptRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ConceptRepository {
    /// Create an empty repository. Every lookup fails until the first load.
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(ConceptSnapshot::default())),
        }
    }

    pub fn from_snapshot(snapshot: ConceptSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Create a repository and perform the initial load.
    pub async fn connect(client: &dyn RegistryClient) -> Result<Self> {
        let repository = Self::new();
        repository.load(client).await?;
        Ok(repository)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<ConceptSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Rebuild the whole index from the registry and swap it in.
    pub async fn load(&self, client: &dyn RegistryClient) -> Result<SnapshotStats> {
        let concept_ids = client.list_concept_ids().await?;
        let concepts = try_join_all(concept_ids.iter().map(|id| client.fetch_concept(id))).await?;

        let mut characteristic_ids: Vec<&str> = Vec::new();
        for concept in &concepts {
            for id in &concept.characteristic_ids {
                if !characteristic_ids.contains(&id.as_str()) {
                    characteristic_ids.push(id);
                }
            }
        }
        let characteristics = try_join_all(
            characteristic_ids
                .iter()
                .map(|id| client.fetch_characteristic(id)),
        )
        .await?;
        let functions = client.list_functions().await?;
        let aspects = client.list_aspect_nodes().await?;

        let snapshot = ConceptSnapshot::build(concepts, characteristics, functions, aspects);
        let stats = snapshot.stats();
        *self.snapshot.write() = Arc::new(snapshot);

        info!(
            category = "concepts",
            concepts = stats.concepts,
            characteristics = stats.characteristics,
            functions = stats.functions,
            aspects = stats.aspects,
            "Concept repository loaded"
        );
        Ok(stats)
    }

    /// Start the background refresh task.
    ///
    /// The first refresh happens one interval after the call; the caller is
    /// expected to have loaded once already. Ticks never overlap: a slow
    /// refresh delays the next one.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        client: Arc<dyn RegistryClient>,
        config: RefreshConfig,
    ) -> JoinHandle<()> {
        let repository = Arc::clone(self);
        let period = Duration::from_secs(config.interval_secs.max(1));
        let jitter_ms = config.jitter_secs.saturating_mul(1000);
        info!(
            category = "concepts",
            interval_secs = period.as_secs(),
            jitter_secs = config.jitter_secs,
            "Starting concept refresh task"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval() completes its first tick immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if jitter_ms > 0 {
                    let delay = rand::thread_rng().gen_range(0..=jitter_ms);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                match repository.load(client.as_ref()).await {
                    Ok(stats) => debug!(
                        category = "concepts",
                        concepts = stats.concepts,
                        "Concept repository refreshed"
                    ),
                    Err(e) => warn!(
                        category = "concepts",
                        error = %e,
                        "Concept refresh failed, keeping previous snapshot"
                    ),
                }
            }
        })
    }

    pub fn get_characteristic(&self, id: &str) -> Result<Arc<Characteristic>> {
        self.snapshot()
            .characteristics
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("characteristic", id, "get_characteristic"))
    }

    pub fn get_concept(&self, id: &str) -> Result<Arc<Concept>> {
        self.snapshot()
            .concepts
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("concept", id, "get_concept"))
    }

    /// Id of the top-level characteristic `id` belongs to (itself if top-level).
    pub fn get_root_characteristic_id(&self, id: &str) -> Result<String> {
        self.snapshot()
            .root_of
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("characteristic", id, "get_root_characteristic_id"))
    }

    /// The concept owning `id` through its root characteristic.
    pub fn get_concept_of_characteristic(&self, id: &str) -> Result<Arc<Concept>> {
        let snapshot = self.snapshot();
        let concept = snapshot
            .root_of
            .get(id)
            .and_then(|root| snapshot.concept_of.get(root))
            .and_then(|concept_id| snapshot.concepts.get(concept_id));
        concept
            .cloned()
            .ok_or_else(|| not_found("characteristic", id, "get_concept_of_characteristic"))
    }

    /// Distinct top-level characteristics of `ids`, in first-seen order.
    pub fn get_root_characteristics(&self, ids: &[String]) -> Result<Vec<Arc<Characteristic>>> {
        let snapshot = self.snapshot();
        let mut roots: Vec<Arc<Characteristic>> = Vec::new();
        for id in ids {
            let root = snapshot
                .root_of
                .get(id)
                .and_then(|root| snapshot.characteristics.get(root))
                .ok_or_else(|| not_found("characteristic", id, "get_root_characteristics"))?;
            if !roots.iter().any(|r| r.id == root.id) {
                roots.push(Arc::clone(root));
            }
        }
        Ok(roots)
    }

    pub fn get_function(&self, id: &str) -> Result<Arc<Function>> {
        self.snapshot()
            .functions
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("function", id, "get_function"))
    }

    /// Member characteristics of the function's concept.
    pub fn get_characteristics_of_function(
        &self,
        function_id: &str,
    ) -> Result<Vec<Arc<Characteristic>>> {
        let function = self.get_function(function_id)?;
        let concept_id = function.concept_id.as_deref().ok_or_else(|| {
            MarshallerError::Validation(format!("function '{}' has no concept", function_id))
        })?;
        let concept = self.get_concept(concept_id)?;
        concept
            .characteristic_ids
            .iter()
            .map(|id| self.get_characteristic(id))
            .collect()
    }

    pub fn get_aspect_node(&self, id: &str) -> Result<Arc<AspectNode>> {
        self.snapshot()
            .aspects
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("aspect", id, "get_aspect_node"))
    }

    pub fn stats(&self) -> SnapshotStats {
        self.snapshot().stats()
    }
}

fn not_found(kind: &'static str, id: &str, intent: &'static str) -> MarshallerError {
    debug!(category = "concepts", kind, id = %id, intent, "Repository lookup failed");
    MarshallerError::not_found(kind, id)
}
