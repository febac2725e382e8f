//! Confidence aggregation and review bucketing.

use serde::Serialize;

use leadscout_shared::{ReviewStatus, ThresholdsConfig};

/// Weight of validation confidence in the blended score.
pub const VALIDATION_WEIGHT: f64 = 0.6;
/// Weight of classification confidence in the blended score.
pub const CLASSIFICATION_WEIGHT: f64 = 0.4;

/// Final score and review bucket for one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreDecision {
    pub confidence_score: f64,
    pub review: ReviewStatus,
    /// Whether classification contributed to the score.
    pub blended: bool,
}

pub fn blend(validation: f64, classification: f64) -> f64 {
    VALIDATION_WEIGHT * validation + CLASSIFICATION_WEIGHT * classification
}

/// Map a confidence score to its review bucket. Lower bounds are inclusive.
pub fn review_status_for(score: f64, thresholds: &ThresholdsConfig) -> ReviewStatus {
    if score >= thresholds.auto_approve {
        ReviewStatus::ApprovedDownload
    } else if score >= thresholds.manual_review {
        ReviewStatus::PendingReview
    } else {
        ReviewStatus::Rejected
    }
}

/// Combine validation and classification into the record's final score.
///
/// `validation` is `None` when no website was found. Weak validation is
/// never rescued by a strong classification: below
/// [`ThresholdsConfig::min_validation`] the score is the validation
/// confidence itself and the record is rejected.
pub fn decide(
    validation: Option<f64>,
    classification: f64,
    thresholds: &ThresholdsConfig,
) -> ScoreDecision {
    match validation {
        None => ScoreDecision {
            confidence_score: 0.0,
            review: ReviewStatus::Rejected,
            blended: false,
        },
        Some(v) if v < thresholds.min_validation => ScoreDecision {
            confidence_score: v,
            review: ReviewStatus::Rejected,
            blended: false,
        },
        Some(v) => {
            let score = blend(v, classification);
            ScoreDecision {
                confidence_score: score,
                review: review_status_for(score, thresholds),
                blended: true,
            }
        }
    }
}
