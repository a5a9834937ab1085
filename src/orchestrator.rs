//! Concurrent dispatch of pending artifacts to their modality adapters.
//!
//! Fan-out/fan-in: one task per pending artifact, each under its own
//! timeout, all awaited to settlement before returning. Partial success is
//! the expected common case; one modality's failure or timeout never
//! aborts a sibling call. Artifact lifecycle updates go through the shared
//! registry and are id-keyed, so a call whose artifact was replaced
//! mid-flight settles into a no-op.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::adapters::{AdapterError, ModalityAdapter, ModalityOutcome};
use crate::registry::{Artifact, ArtifactRegistry, Modality};

pub struct Orchestrator {
    adapters: BTreeMap<Modality, Arc<dyn ModalityAdapter>>,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(adapters: Vec<Arc<dyn ModalityAdapter>>, timeout: Duration) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.modality(), adapter))
            .collect();
        Self { adapters, timeout }
    }

    /// Dispatch every pending artifact concurrently and collect one outcome
    /// per modality. Returns only after every call has settled (succeeded,
    /// failed or timed out).
    pub async fn process(
        &self,
        registry: Arc<Mutex<ArtifactRegistry>>,
        pending: Vec<Artifact>,
    ) -> BTreeMap<Modality, ModalityOutcome> {
        let mut handles = Vec::new();

        for artifact in pending {
            let adapter = match self.adapters.get(&artifact.modality) {
                Some(adapter) => Arc::clone(adapter),
                None => {
                    tracing::error!(
                        modality = %artifact.modality,
                        "No adapter wired for modality, skipping dispatch"
                    );
                    continue;
                }
            };

            let registry = Arc::clone(&registry);
            let timeout = self.timeout;
            let modality = artifact.modality;

            let handle = tokio::spawn(async move {
                let Artifact {
                    id,
                    modality,
                    file_name,
                    payload,
                    ..
                } = artifact;

                with_registry(&registry, |reg| {
                    reg.mark_uploading(id);
                });
                tracing::debug!(artifact_id = %id, modality = %modality, "Dispatching analysis call");

                let outcome = match tokio::time::timeout(
                    timeout,
                    adapter.submit(&file_name, payload),
                )
                .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(AdapterError::Timeout(timeout.as_secs())),
                };

                match &outcome {
                    Ok(_) => {
                        with_registry(&registry, |reg| {
                            reg.mark_complete(id);
                        });
                        tracing::info!(artifact_id = %id, modality = %modality, "Analysis call succeeded");
                    }
                    Err(error) => {
                        let reason = error.to_string();
                        with_registry(&registry, |reg| {
                            reg.mark_error(id, &reason);
                        });
                        tracing::warn!(
                            artifact_id = %id,
                            modality = %modality,
                            error = %reason,
                            "Analysis call failed"
                        );
                    }
                }

                outcome
            });

            handles.push((modality, handle));
        }

        let mut outcomes = BTreeMap::new();
        for (modality, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    tracing::error!(modality = %modality, error = %join_error, "Dispatch task failed");
                    Err(AdapterError::Unreachable(format!(
                        "dispatch task failed: {join_error}"
                    )))
                }
            };
            outcomes.insert(modality, outcome);
        }
        outcomes
    }
}

/// Run a short registry mutation, tolerating a poisoned lock (a panicked
/// sibling thread must not take lifecycle bookkeeping down with it).
fn with_registry<F>(registry: &Mutex<ArtifactRegistry>, f: F)
where
    F: FnOnce(&mut ArtifactRegistry),
{
    match registry.lock() {
        Ok(mut reg) => f(&mut reg),
        Err(_) => tracing::warn!("Artifact registry lock poisoned, skipping status update"),
    }
}
