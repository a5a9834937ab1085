//! Proximity fallback: deterministic weighted scoring for incomplete or
//! rule-defying records.
//!
//! Every tier starts from an equal base weight; each signal present in the
//! record adds a fixed boost to the tier it points at. Weights normalize to
//! percentages summing to exactly 100, with red absorbing the rounding
//! remainder. Always produces a complete distribution, even with zero
//! inputs.

use super::{primary_tier, ClassificationResult, RiskTier, TierAssessment};
use crate::composite::{labels, rhythm, CompositeDiagnosticRecord};

const BASE_WEIGHT: u32 = 20;
const LABEL_BOOST: u32 = 15;
const SEVERITY_BOOST: u32 = 10;
const RHYTHM_BOOST: u32 = 10;

/// Minimum displayed confidence for a proximity share.
const CONFIDENCE_FLOOR: u8 = 20;

struct TierScore {
    weight: u32,
    notes: Vec<String>,
}

impl TierScore {
    fn new() -> Self {
        Self {
            weight: BASE_WEIGHT,
            notes: vec![format!("base weight {BASE_WEIGHT}")],
        }
    }

    fn boost(&mut self, amount: u32, note: String) {
        self.weight += amount;
        self.notes.push(note);
    }

    fn rationale(&self) -> String {
        format!("Proximity score: {}", self.notes.join("; "))
    }
}

pub(crate) fn classify_proximity(record: &CompositeDiagnosticRecord) -> ClassificationResult {
    let mut green = TierScore::new();
    let mut yellow = TierScore::new();
    let mut red = TierScore::new();

    if let Some(label) = record.label() {
        let target = match label {
            labels::HEALTHY => Some(&mut green),
            labels::OTHER => Some(&mut yellow),
            labels::PNEUMONIA => Some(&mut red),
            _ => None,
        };
        if let Some(tier) = target {
            tier.boost(LABEL_BOOST, format!("radiograph {label} +{LABEL_BOOST}"));
        }
    }

    if let Some(severity) = record.severity_score() {
        let tier = if severity <= 2.0 {
            &mut green
        } else if severity >= 8.0 {
            &mut red
        } else {
            &mut yellow
        };
        tier.boost(
            SEVERITY_BOOST,
            format!("severity score {severity} +{SEVERITY_BOOST}"),
        );
    }

    if let Some(status) = record.rhythm_status() {
        let target = match status {
            rhythm::NORMAL => Some(&mut green),
            rhythm::BRADYCARDIA => Some(&mut yellow),
            rhythm::TACHYCARDIA => Some(&mut red),
            _ => None,
        };
        if let Some(tier) = target {
            tier.boost(RHYTHM_BOOST, format!("rhythm {status} +{RHYTHM_BOOST}"));
        }
    }

    let total = green.weight + yellow.weight + red.weight;
    let green_pct = ((green.weight as f64) * 100.0 / total as f64).round() as u8;
    let yellow_pct = ((yellow.weight as f64) * 100.0 / total as f64).round() as u8;
    // Red absorbs the rounding remainder so the three always sum to 100.
    let red_pct = 100 - green_pct - yellow_pct;

    let partial = record.label().is_none()
        || record.severity_score().is_none()
        || record.rhythm_status().is_none();

    let assess = |score: &TierScore, percentage: u8| TierAssessment {
        percentage,
        confidence: percentage.max(CONFIDENCE_FLOOR),
        rationale: score.rationale(),
    };

    ClassificationResult {
        green: assess(&green, green_pct),
        yellow: assess(&yellow, yellow_pct),
        red: assess(&red, red_pct),
        primary: primary_tier(green_pct, yellow_pct, red_pct),
        partial,
    }
}
