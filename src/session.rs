//! Analysis session: the collaborator-facing facade.
//!
//! Owns the artifact registry behind a mutex (its serialized operations
//! are the only shared mutable state of a session) and wires the three
//! modality adapters into the orchestrator. The UI collaborator consumes
//! exactly this surface: submit, remove, clear, run.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;

use crate::adapters::{DocumentAdapter, ImageAdapter, ModalityAdapter, SignalAdapter};
use crate::composite;
use crate::config::AnalysisConfig;
use crate::orchestrator::Orchestrator;
use crate::registry::{Artifact, ArtifactId, ArtifactRegistry, Modality, RegistryError};
use crate::triage::{classify, ClassificationResult};

/// Outcome of one classification run. The classification itself is always
/// complete (the engine degrades rather than fails); `failures` carries the
/// per-modality short reason strings for whatever did not contribute.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationRun {
    pub result: ClassificationResult,
    pub failures: BTreeMap<Modality, String>,
    /// Registry generation the run was computed against. When a newer
    /// submission superseded the run, the result is returned but not stored.
    pub generation: u64,
}

pub struct AnalysisSession {
    registry: Arc<Mutex<ArtifactRegistry>>,
    orchestrator: Orchestrator,
}

impl AnalysisSession {
    /// Wire the three real HTTP adapters from injected configuration.
    pub fn new(config: AnalysisConfig) -> Self {
        let endpoints = &config.endpoints;
        let adapters: Vec<Arc<dyn ModalityAdapter>> = vec![
            Arc::new(ImageAdapter::new(
                &endpoints.image_base_url,
                config.timeout_secs,
            )),
            Arc::new(DocumentAdapter::new(
                &endpoints.document_base_url,
                config.timeout_secs,
            )),
            Arc::new(SignalAdapter::new(
                &endpoints.signal_base_url,
                config.timeout_secs,
                config.sampling_rate_hz,
            )),
        ];
        Self::with_adapters(adapters, config.timeout())
    }

    /// Wire explicit adapters (tests and fakes).
    pub fn with_adapters(adapters: Vec<Arc<dyn ModalityAdapter>>, timeout: Duration) -> Self {
        Self {
            registry: Arc::new(Mutex::new(ArtifactRegistry::new())),
            orchestrator: Orchestrator::new(adapters, timeout),
        }
    }

    /// Register a submitted file. Replaces any artifact already registered
    /// for the same modality and invalidates any stored classification.
    pub fn submit_artifact(
        &self,
        modality_tag: &str,
        file_name: &str,
        payload: Vec<u8>,
    ) -> Result<ArtifactId, RegistryError> {
        let modality = Modality::parse(modality_tag)?;
        let id = self.lock_registry()?.register(modality, file_name, payload)?;
        tracing::info!(artifact_id = %id, modality = %modality, file_name, "Artifact registered");
        Ok(id)
    }

    pub fn remove_artifact(&self, id: ArtifactId) -> Result<(), RegistryError> {
        let removed = self.lock_registry()?.remove(id)?;
        tracing::info!(artifact_id = %id, modality = %removed.modality, "Artifact removed");
        Ok(())
    }

    pub fn clear_all(&self) -> Result<(), RegistryError> {
        self.lock_registry()?.clear();
        tracing::info!("Session cleared");
        Ok(())
    }

    /// Snapshot of all registered artifacts, for status display.
    pub fn artifacts(&self) -> Result<Vec<Artifact>, RegistryError> {
        Ok(self.lock_registry()?.artifacts())
    }

    /// The stored classification, if a run completed since the last
    /// membership change.
    pub fn classification(&self) -> Result<Option<ClassificationResult>, RegistryError> {
        Ok(self.lock_registry()?.classification().cloned())
    }

    /// Dispatch every pending artifact, merge the outcomes and classify.
    /// Always yields a complete classification; per-modality failures are
    /// reported alongside, never as an abort.
    pub async fn run_classification(&self) -> Result<ClassificationRun, RegistryError> {
        let (pending, generation) = {
            let registry = self.lock_registry()?;
            (registry.list_pending(), registry.generation())
        };
        tracing::info!(pending = pending.len(), generation, "Starting classification run");

        let outcomes = self
            .orchestrator
            .process(Arc::clone(&self.registry), pending)
            .await;

        let failures: BTreeMap<Modality, String> = outcomes
            .iter()
            .filter_map(|(modality, outcome)| {
                outcome.as_ref().err().map(|e| (*modality, e.to_string()))
            })
            .collect();

        let record = composite::merge(&outcomes);
        let result = classify(&record);

        let stored = self
            .lock_registry()?
            .store_classification(generation, result.clone());
        if !stored {
            tracing::info!(generation, "Run superseded by a newer submission, result not stored");
        }

        Ok(ClassificationRun {
            result,
            failures,
            generation,
        })
    }

    fn lock_registry(&self) -> Result<MutexGuard<'_, ArtifactRegistry>, RegistryError> {
        self.registry.lock().map_err(|_| RegistryError::LockPoisoned)
    }
}
