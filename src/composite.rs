//! Composite diagnostic record: the merged result of whatever modality
//! calls succeeded. Every block is independently optional; absence means
//! "that modality did not produce interpretable data" and is never
//! back-filled with defaults here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::adapters::ModalityOutcome;
use crate::registry::Modality;

/// Canonical radiograph labels as emitted by the image service.
pub mod labels {
    pub const HEALTHY: &str = "SANO";
    pub const OTHER: &str = "OTROS";
    pub const PNEUMONIA: &str = "NEUMONIA";
}

/// Canonical rhythm statuses from the biosignal service.
pub mod rhythm {
    pub const NORMAL: &str = "Normal";
    pub const BRADYCARDIA: &str = "Bradicardia";
    pub const TACHYCARDIA: &str = "Taquicardia";
    /// Fail-open category when the service reported nothing recognizable.
    pub const INDETERMINATE: &str = "Indeterminado";
}

/// Per-quadrant infection ratios for one lung.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuadrantRatios {
    pub lt: f64,
    pub rt: f64,
    pub rb: f64,
    pub lb: f64,
}

/// Findings extracted from the radiograph analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFindings {
    /// Overall infection ratio, 0–100.
    pub total_ratio: f64,
    pub right_ratio: QuadrantRatios,
    pub left_ratio: QuadrantRatios,
    /// Canonical label: `SANO`, `OTROS` or `NEUMONIA`.
    pub label: String,
    /// Model confidence, normalized to 0–100.
    pub confidence: f64,
}

/// Findings extracted from the medical-history (NLP) service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentFindings {
    pub patient_age: f64,
    /// IDSA/ATS severity score.
    pub severity_score: f64,
    /// Pattern name → observed value, as reported by the service.
    pub patterns: BTreeMap<String, String>,
}

/// Findings extracted from the biosignal service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalFindings {
    /// `Normal`, `Bradicardia`, `Taquicardia` or `Indeterminado`.
    pub rhythm_status: String,
}

/// One adapter's successful contribution to the composite record. The three
/// variants own disjoint field sets, so merging can never overwrite one
/// modality's data with another's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordFragment {
    Image(ImageFindings),
    Document(DocumentFindings),
    Signal(SignalFindings),
}

/// The merged, partially-populated diagnostic record handed to the
/// classification engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeDiagnosticRecord {
    pub image: Option<ImageFindings>,
    pub document: Option<DocumentFindings>,
    pub signal: Option<SignalFindings>,
}

impl CompositeDiagnosticRecord {
    pub fn label(&self) -> Option<&str> {
        self.image.as_ref().map(|f| f.label.as_str())
    }

    pub fn image_confidence(&self) -> Option<f64> {
        self.image.as_ref().map(|f| f.confidence)
    }

    pub fn severity_score(&self) -> Option<f64> {
        self.document.as_ref().map(|f| f.severity_score)
    }

    pub fn rhythm_status(&self) -> Option<&str> {
        self.signal.as_ref().map(|f| f.rhythm_status.as_str())
    }
}

/// Merge modality outcomes into one composite record. Successful fragments
/// are copied in verbatim; failed or undispatched modalities leave their
/// block absent. Pure and idempotent.
pub fn merge(outcomes: &BTreeMap<Modality, ModalityOutcome>) -> CompositeDiagnosticRecord {
    let mut record = CompositeDiagnosticRecord::default();
    for outcome in outcomes.values() {
        let fragment = match outcome {
            Ok(fragment) => fragment,
            Err(_) => continue,
        };
        match fragment {
            RecordFragment::Image(findings) => record.image = Some(findings.clone()),
            RecordFragment::Document(findings) => record.document = Some(findings.clone()),
            RecordFragment::Signal(findings) => record.signal = Some(findings.clone()),
        }
    }
    record
}
