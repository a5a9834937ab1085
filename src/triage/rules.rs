//! Exact three-tier rule set.
//!
//! Applies only when rhythm status, radiograph label and severity score are
//! all present. The three predicates are evaluated independently on every
//! run, not as an if/else-if chain, because their mutual exclusivity
//! rests on the label term alone, and a simultaneous multi-match is an
//! explicit non-invariant resolved in red > yellow > green order rather
//! than silently short-circuited.

use super::{ClassificationResult, RiskTier, TierAssessment};
use crate::composite::{labels, rhythm, CompositeDiagnosticRecord};

/// Share of the matched tier and the residual shares for the other two.
const MATCHED_SHARE: u8 = 80;
const NEAR_SHARE: u8 = 12;
const FAR_SHARE: u8 = 8;

/// Confidence offsets applied to the input confidence.
const CONFIDENCE_BOOST: f64 = 10.0;
const CONFIDENCE_CUT: f64 = 30.0;
const CONFIDENCE_CAP: f64 = 95.0;

/// Unmatched-tier confidence floors. A riskier tier keeps a higher floor,
/// so red is never displayed as fully dismissed.
const FLOOR_GREEN: f64 = 5.0;
const FLOOR_YELLOW: f64 = 10.0;
const FLOOR_RED: f64 = 15.0;

fn green_rule(status: &str, label: &str, severity: f64) -> bool {
    status == rhythm::NORMAL && label == labels::HEALTHY && severity <= 2.0
}

fn yellow_rule(status: &str, label: &str, severity: f64) -> bool {
    (status == rhythm::NORMAL || status == rhythm::BRADYCARDIA)
        && label == labels::OTHER
        && severity >= 3.0
}

fn red_rule(status: &str, label: &str, severity: f64) -> bool {
    (status == rhythm::TACHYCARDIA || status == rhythm::BRADYCARDIA)
        && label == labels::PNEUMONIA
        && severity >= 8.0
}

/// Resolve independently evaluated predicate results to at most one tier.
fn matched_tier(green: bool, yellow: bool, red: bool) -> Option<RiskTier> {
    if red {
        Some(RiskTier::Red)
    } else if yellow {
        Some(RiskTier::Yellow)
    } else if green {
        Some(RiskTier::Green)
    } else {
        None
    }
}

/// Try the exact tier. `None` when any required input is absent or no rule
/// matches; the caller then falls through to the proximity tier.
pub(crate) fn classify_exact(record: &CompositeDiagnosticRecord) -> Option<ClassificationResult> {
    let label = record.label()?;
    let severity = record.severity_score()?;
    let status = record.rhythm_status()?;
    let confidence = record.image_confidence().unwrap_or(0.0);

    let green = green_rule(status, label, severity);
    let yellow = yellow_rule(status, label, severity);
    let red = red_rule(status, label, severity);
    let matched = matched_tier(green, yellow, red)?;

    Some(build_result(matched, status, label, severity, confidence))
}

fn build_result(
    matched: RiskTier,
    status: &str,
    label: &str,
    severity: f64,
    confidence: f64,
) -> ClassificationResult {
    // The tier adjacent to the match takes the larger residual share.
    let (green_pct, yellow_pct, red_pct) = match matched {
        RiskTier::Green => (MATCHED_SHARE, NEAR_SHARE, FAR_SHARE),
        RiskTier::Yellow => (NEAR_SHARE, MATCHED_SHARE, FAR_SHARE),
        RiskTier::Red => (FAR_SHARE, NEAR_SHARE, MATCHED_SHARE),
    };

    let matched_rationale = format!(
        "Matched the {matched} profile: rhythm {status}, radiograph {label}, severity score {severity}"
    );
    let residual_rationale = format!("Residual share; inputs matched the {matched} profile");

    let assess = |tier: RiskTier, percentage: u8| {
        let (conf, rationale) = if tier == matched {
            (
                (confidence + CONFIDENCE_BOOST).min(CONFIDENCE_CAP),
                matched_rationale.clone(),
            )
        } else {
            let floor = match tier {
                RiskTier::Green => FLOOR_GREEN,
                RiskTier::Yellow => FLOOR_YELLOW,
                RiskTier::Red => FLOOR_RED,
            };
            (
                (confidence - CONFIDENCE_CUT).max(floor),
                residual_rationale.clone(),
            )
        };
        TierAssessment {
            percentage,
            confidence: conf.clamp(0.0, 100.0).round() as u8,
            rationale,
        }
    };

    ClassificationResult {
        green: assess(RiskTier::Green, green_pct),
        yellow: assess(RiskTier::Yellow, yellow_pct),
        red: assess(RiskTier::Red, red_pct),
        primary: matched,
        partial: false,
    }
}
