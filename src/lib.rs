//! Consilium: diagnostic aggregation core for multi-modality medical
//! triage.
//!
//! A clinician submits up to three artifacts (X-ray image, medical-history
//! document, ECG/biosignal recording); the core dispatches each to its
//! analysis service concurrently and in isolation, merges whatever came
//! back into one composite record tolerant of partial availability, and
//! classifies it into a green/yellow/red risk distribution that is always
//! fully defined. The upload widget, page chrome and the services
//! themselves live elsewhere; [`session::AnalysisSession`] is the surface
//! they consume.

pub mod adapters;
pub mod composite;
pub mod config;
pub mod orchestrator;
pub mod registry;
pub mod session;
pub mod triage;

use tracing_subscriber::EnvFilter;

pub use composite::CompositeDiagnosticRecord;
pub use config::{AnalysisConfig, ServiceEndpoints};
pub use registry::{Artifact, ArtifactId, ArtifactStatus, Modality, RegistryError};
pub use session::{AnalysisSession, ClassificationRun};
pub use triage::{classify, ClassificationResult, RiskTier, TierAssessment};

/// Initialize tracing for hosts embedding the core.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Consilium core v{}", config::APP_VERSION);
}
