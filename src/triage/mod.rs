//! Classification engine: turns a composite diagnostic record into a
//! tri-state risk distribution.
//!
//! Two tiers: an exact rule match when rhythm status, radiograph label and
//! severity score are all present (rules.rs), and a deterministic weighted
//! proximity fallback that is always fully defined, even with zero inputs
//! (proximity.rs). Classification never errors; a clinician always gets
//! an interpretable (if low-confidence) triage signal.

pub mod proximity;
pub mod rules;

use serde::{Deserialize, Serialize};

use crate::composite::CompositeDiagnosticRecord;

/// The three risk tiers of the triage signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Green,
    Yellow,
    Red,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tier's slice of the classification result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierAssessment {
    /// Share of the distribution, 0–100. The three shares sum to exactly 100.
    pub percentage: u8,
    /// Confidence in this tier's share, 0–100.
    pub confidence: u8,
    /// Human-readable justification.
    pub rationale: String,
}

/// A complete tri-state risk assessment. Created fresh on every run and
/// never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub green: TierAssessment,
    pub yellow: TierAssessment,
    pub red: TierAssessment,
    /// The tier with the largest share; ties broken red > yellow > green.
    pub primary: RiskTier,
    /// True when one or more of the rule inputs (radiograph label, severity
    /// score, rhythm status) was absent from the composite record.
    pub partial: bool,
}

impl ClassificationResult {
    pub fn tier(&self, tier: RiskTier) -> &TierAssessment {
        match tier {
            RiskTier::Green => &self.green,
            RiskTier::Yellow => &self.yellow,
            RiskTier::Red => &self.red,
        }
    }

    /// The three shares, in green/yellow/red order.
    pub fn percentages(&self) -> [u8; 3] {
        [
            self.green.percentage,
            self.yellow.percentage,
            self.red.percentage,
        ]
    }
}

/// Largest share wins; ties broken red > yellow > green.
pub(crate) fn primary_tier(green: u8, yellow: u8, red: u8) -> RiskTier {
    if red >= yellow && red >= green {
        RiskTier::Red
    } else if yellow >= green {
        RiskTier::Yellow
    } else {
        RiskTier::Green
    }
}

/// Classify a composite record. Pure: no side effects beyond the returned
/// result.
pub fn classify(record: &CompositeDiagnosticRecord) -> ClassificationResult {
    if let Some(result) = rules::classify_exact(record) {
        tracing::debug!(primary = %result.primary, "Exact rule matched");
        return result;
    }

    let result = proximity::classify_proximity(record);
    tracing::debug!(
        primary = %result.primary,
        partial = result.partial,
        "Proximity fallback applied"
    );
    result
}
