//! Artifact registry: owns every submitted artifact and its lifecycle.
//!
//! Holds at most one pending artifact per modality: submitting a new file
//! for an occupied modality atomically replaces the prior one. The registry
//! is the only shared resource of an analysis session; all mutation goes
//! through its serialized methods. Status writes are keyed by artifact id,
//! so a write for an artifact that has since been replaced or removed is a
//! no-op; this is what keeps superseded in-flight calls from touching a
//! newer submission.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::triage::ClassificationResult;

pub type ArtifactId = Uuid;

/// One of the three artifact kinds the platform accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Image,
    Document,
    Signal,
}

impl Modality {
    /// Fixed dispatch order: image first, then document, then signal.
    pub const ALL: [Modality; 3] = [Modality::Image, Modality::Document, Modality::Signal];

    /// Parse a collaborator-facing modality tag.
    pub fn parse(tag: &str) -> Result<Self, RegistryError> {
        match tag.trim().to_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "document" => Ok(Self::Document),
            "signal" => Ok(Self::Signal),
            _ => Err(RegistryError::UnsupportedModality(tag.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
            Self::Signal => "signal",
        }
    }

    /// File extensions accepted for this modality (lowercase, no dot).
    pub fn accepted_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Image => &["png", "jpg", "jpeg"],
            Self::Document => &["pdf"],
            Self::Signal => &["csv", "json", "dat"],
        }
    }

    fn accepts(&self, file_name: &str) -> bool {
        let ext = std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        match ext {
            Some(ext) => self.accepted_extensions().contains(&ext.as_str()),
            None => false,
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifact lifecycle: `Idle → Uploading → Complete` or `Uploading → Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    Idle,
    Uploading,
    Complete,
    Error,
}

/// One user-submitted file awaiting or holding an analysis outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub modality: Modality,
    pub file_name: String,
    #[serde(skip)]
    pub payload: Vec<u8>,
    pub status: ArtifactStatus,
    /// 0 until the analysis call settles, 100 on completion.
    pub progress: u8,
    /// Short failure reason, set when `status` is `Error`.
    pub error: Option<String>,
    pub registered_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Unsupported modality: {0}")]
    UnsupportedModality(String),

    #[error("File type not accepted for {modality} submissions: {file_name}")]
    UnsupportedFileType { modality: Modality, file_name: String },

    #[error("No artifact registered with id {0}")]
    UnknownArtifact(ArtifactId),

    #[error("Internal lock error")]
    LockPoisoned,
}

/// In-memory artifact store, one slot per modality, plus the most recent
/// classification and a generation counter bumped on every membership
/// change. A classification computed against an older generation is stale
/// and will not be stored.
pub struct ArtifactRegistry {
    artifacts: Vec<Artifact>,
    stored_classification: Option<ClassificationResult>,
    generation: u64,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self {
            artifacts: Vec::new(),
            stored_classification: None,
            generation: 0,
        }
    }

    /// Register a new artifact, replacing any existing one for the same
    /// modality. Any stored classification is cleared, since it may describe
    /// the replaced artifact.
    pub fn register(
        &mut self,
        modality: Modality,
        file_name: &str,
        payload: Vec<u8>,
    ) -> Result<ArtifactId, RegistryError> {
        if !modality.accepts(file_name) {
            return Err(RegistryError::UnsupportedFileType {
                modality,
                file_name: file_name.to_string(),
            });
        }

        let replaced = self.artifacts.iter().position(|a| a.modality == modality);
        if let Some(index) = replaced {
            let old = self.artifacts.remove(index);
            tracing::debug!(
                modality = %modality,
                replaced_id = %old.id,
                "Replacing registered artifact"
            );
        }

        let artifact = Artifact {
            id: Uuid::new_v4(),
            modality,
            file_name: file_name.to_string(),
            payload,
            status: ArtifactStatus::Idle,
            progress: 0,
            error: None,
            registered_at: Utc::now(),
        };
        let id = artifact.id;
        self.artifacts.push(artifact);

        self.stored_classification = None;
        self.generation += 1;
        Ok(id)
    }

    /// Remove an artifact by id. Removing the image artifact also clears
    /// any stored classification, since the image findings anchor it.
    pub fn remove(&mut self, id: ArtifactId) -> Result<Artifact, RegistryError> {
        let index = self
            .artifacts
            .iter()
            .position(|a| a.id == id)
            .ok_or(RegistryError::UnknownArtifact(id))?;
        let removed = self.artifacts.remove(index);
        if removed.modality == Modality::Image {
            self.stored_classification = None;
        }
        self.generation += 1;
        Ok(removed)
    }

    /// Drop all artifacts and any stored classification.
    pub fn clear(&mut self) {
        self.artifacts.clear();
        self.stored_classification = None;
        self.generation += 1;
    }

    /// Artifacts in `Idle` status, in fixed modality order.
    pub fn list_pending(&self) -> Vec<Artifact> {
        Modality::ALL
            .iter()
            .filter_map(|m| {
                self.artifacts
                    .iter()
                    .find(|a| a.modality == *m && a.status == ArtifactStatus::Idle)
            })
            .cloned()
            .collect()
    }

    pub fn get(&self, id: ArtifactId) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.id == id)
    }

    /// Snapshot of all artifacts, in fixed modality order (for status
    /// display by the UI collaborator).
    pub fn artifacts(&self) -> Vec<Artifact> {
        Modality::ALL
            .iter()
            .filter_map(|m| self.artifacts.iter().find(|a| a.modality == *m))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Mark an artifact as dispatched. Returns false if the id is gone
    /// (replaced or removed since dispatch was decided).
    pub fn mark_uploading(&mut self, id: ArtifactId) -> bool {
        self.set_status(id, ArtifactStatus::Uploading, 0, None)
    }

    /// Mark an artifact's call as succeeded.
    pub fn mark_complete(&mut self, id: ArtifactId) -> bool {
        self.set_status(id, ArtifactStatus::Complete, 100, None)
    }

    /// Mark an artifact's call as failed, recording the reason.
    pub fn mark_error(&mut self, id: ArtifactId, reason: &str) -> bool {
        self.set_status(id, ArtifactStatus::Error, 0, Some(reason.to_string()))
    }

    fn set_status(
        &mut self,
        id: ArtifactId,
        status: ArtifactStatus,
        progress: u8,
        error: Option<String>,
    ) -> bool {
        match self.artifacts.iter_mut().find(|a| a.id == id) {
            Some(artifact) => {
                artifact.status = status;
                artifact.progress = progress;
                artifact.error = error;
                true
            }
            None => false,
        }
    }

    /// Membership generation. Bumped by register/remove/clear; a
    /// classification run captures it at dispatch time.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Store a freshly computed classification, unless the registry has
    /// moved on since the run started. Returns whether it was stored.
    pub fn store_classification(&mut self, generation: u64, result: ClassificationResult) -> bool {
        if generation != self.generation {
            tracing::debug!(
                run_generation = generation,
                current_generation = self.generation,
                "Discarding classification from superseded run"
            );
            return false;
        }
        self.stored_classification = Some(result);
        true
    }

    pub fn classification(&self) -> Option<&ClassificationResult> {
        self.stored_classification.as_ref()
    }
}

impl Default for ArtifactRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::classify;
    use crate::composite::CompositeDiagnosticRecord;

    fn empty_classification() -> ClassificationResult {
        classify(&CompositeDiagnosticRecord::default())
    }

    #[test]
    fn parse_known_modalities() {
        assert_eq!(Modality::parse("image").unwrap(), Modality::Image);
        assert_eq!(Modality::parse(" Document ").unwrap(), Modality::Document);
        assert_eq!(Modality::parse("SIGNAL").unwrap(), Modality::Signal);
    }

    #[test]
    fn parse_unknown_modality_fails() {
        let err = Modality::parse("genome").unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedModality(tag) if tag == "genome"));
    }

    #[test]
    fn register_creates_idle_artifact() {
        let mut registry = ArtifactRegistry::new();
        let id = registry
            .register(Modality::Image, "chest.png", vec![1, 2, 3])
            .unwrap();
        let artifact = registry.get(id).unwrap();
        assert_eq!(artifact.status, ArtifactStatus::Idle);
        assert_eq!(artifact.progress, 0);
        assert_eq!(artifact.payload, vec![1, 2, 3]);
    }

    #[test]
    fn register_rejects_unaccepted_extension() {
        let mut registry = ArtifactRegistry::new();
        for modality in Modality::ALL {
            let err = registry.register(modality, "notes.txt", vec![]).unwrap_err();
            assert!(matches!(err, RegistryError::UnsupportedFileType { .. }));
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn register_rejects_missing_extension() {
        let mut registry = ArtifactRegistry::new();
        let err = registry.register(Modality::Image, "chest", vec![]).unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedFileType { .. }));
    }

    #[test]
    fn reregister_replaces_and_clears_classification() {
        let mut registry = ArtifactRegistry::new();
        let first = registry
            .register(Modality::Image, "a.png", vec![1])
            .unwrap();
        let generation = registry.generation();
        assert!(registry.store_classification(generation, empty_classification()));
        assert!(registry.classification().is_some());

        let second = registry
            .register(Modality::Image, "b.jpg", vec![2])
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get(first).is_none());
        assert!(registry.get(second).is_some());
        assert!(registry.classification().is_none());
    }

    #[test]
    fn remove_image_clears_classification() {
        let mut registry = ArtifactRegistry::new();
        let image = registry.register(Modality::Image, "a.png", vec![]).unwrap();
        let generation = registry.generation();
        registry.store_classification(generation, empty_classification());

        registry.remove(image).unwrap();
        assert!(registry.classification().is_none());
    }

    #[test]
    fn remove_signal_keeps_classification() {
        let mut registry = ArtifactRegistry::new();
        let signal = registry.register(Modality::Signal, "ecg.csv", vec![]).unwrap();
        let generation = registry.generation();
        registry.store_classification(generation, empty_classification());

        registry.remove(signal).unwrap();
        assert!(registry.classification().is_some());
    }

    #[test]
    fn remove_unknown_id_fails() {
        let mut registry = ArtifactRegistry::new();
        let err = registry.remove(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownArtifact(_)));
    }

    #[test]
    fn pending_in_fixed_modality_order() {
        let mut registry = ArtifactRegistry::new();
        registry.register(Modality::Signal, "ecg.csv", vec![]).unwrap();
        registry.register(Modality::Image, "a.png", vec![]).unwrap();
        registry.register(Modality::Document, "h.pdf", vec![]).unwrap();

        let pending: Vec<Modality> = registry.list_pending().iter().map(|a| a.modality).collect();
        assert_eq!(
            pending,
            vec![Modality::Image, Modality::Document, Modality::Signal]
        );
    }

    #[test]
    fn pending_excludes_settled_artifacts() {
        let mut registry = ArtifactRegistry::new();
        let image = registry.register(Modality::Image, "a.png", vec![]).unwrap();
        registry.register(Modality::Document, "h.pdf", vec![]).unwrap();
        registry.mark_uploading(image);

        let pending = registry.list_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].modality, Modality::Document);
    }

    #[test]
    fn status_transitions() {
        let mut registry = ArtifactRegistry::new();
        let id = registry.register(Modality::Image, "a.png", vec![]).unwrap();

        assert!(registry.mark_uploading(id));
        assert_eq!(registry.get(id).unwrap().status, ArtifactStatus::Uploading);

        assert!(registry.mark_complete(id));
        let artifact = registry.get(id).unwrap();
        assert_eq!(artifact.status, ArtifactStatus::Complete);
        assert_eq!(artifact.progress, 100);
    }

    #[test]
    fn mark_error_records_reason() {
        let mut registry = ArtifactRegistry::new();
        let id = registry.register(Modality::Signal, "ecg.dat", vec![]).unwrap();
        registry.mark_uploading(id);
        assert!(registry.mark_error(id, "connection refused"));

        let artifact = registry.get(id).unwrap();
        assert_eq!(artifact.status, ArtifactStatus::Error);
        assert_eq!(artifact.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn status_write_after_replacement_is_noop() {
        let mut registry = ArtifactRegistry::new();
        let stale = registry.register(Modality::Image, "a.png", vec![]).unwrap();
        registry.mark_uploading(stale);

        let fresh = registry.register(Modality::Image, "b.png", vec![]).unwrap();
        assert!(!registry.mark_complete(stale));
        assert_eq!(registry.get(fresh).unwrap().status, ArtifactStatus::Idle);
    }

    #[test]
    fn stale_generation_classification_is_rejected() {
        let mut registry = ArtifactRegistry::new();
        registry.register(Modality::Image, "a.png", vec![]).unwrap();
        let generation = registry.generation();

        registry.register(Modality::Document, "h.pdf", vec![]).unwrap();
        assert!(!registry.store_classification(generation, empty_classification()));
        assert!(registry.classification().is_none());

        let current = registry.generation();
        assert!(registry.store_classification(current, empty_classification()));
    }

    #[test]
    fn clear_drops_everything() {
        let mut registry = ArtifactRegistry::new();
        registry.register(Modality::Image, "a.png", vec![]).unwrap();
        let generation = registry.generation();
        registry.store_classification(generation, empty_classification());

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.classification().is_none());
    }
}
