//! Compliance score and status tiers

use serde::{Deserialize, Serialize};
use shared_types::{ComplianceStatus, Issue, Severity};

use crate::error::{ComplianceError, Result};

/// Weights and tier thresholds of the compliance score.
///
/// `score = 1 - (w_missing * missing_ratio + w_high * high + w_medium * medium * 0.5
/// + w_low * low * 0.2) / normalizer`, clamped to [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    #[serde(default = "default_w_missing")]
    pub w_missing: f64,
    #[serde(default = "default_severity_weight")]
    pub w_high: f64,
    #[serde(default = "default_severity_weight")]
    pub w_medium: f64,
    #[serde(default = "default_severity_weight")]
    pub w_low: f64,
    #[serde(default = "default_normalizer")]
    pub normalizer: f64,
    /// Lowest score that is still "Compliant"
    #[serde(default = "default_compliant")]
    pub compliant_threshold: f64,
    #[serde(default = "default_mostly")]
    pub mostly_threshold: f64,
    #[serde(default = "default_partially")]
    pub partially_threshold: f64,
}

fn default_w_missing() -> f64 {
    4.0
}

fn default_severity_weight() -> f64 {
    1.0
}

fn default_normalizer() -> f64 {
    10.0
}

fn default_compliant() -> f64 {
    0.9
}

fn default_mostly() -> f64 {
    0.7
}

fn default_partially() -> f64 {
    0.5
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            w_missing: default_w_missing(),
            w_high: default_severity_weight(),
            w_medium: default_severity_weight(),
            w_low: default_severity_weight(),
            normalizer: default_normalizer(),
            compliant_threshold: default_compliant(),
            mostly_threshold: default_mostly(),
            partially_threshold: default_partially(),
        }
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<()> {
        let weights = [self.w_missing, self.w_high, self.w_medium, self.w_low];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ComplianceError::config("scoring weights must be finite and non-negative"));
        }
        if !self.normalizer.is_finite() || self.normalizer <= 0.0 {
            return Err(ComplianceError::config("scoring.normalizer must be positive"));
        }
        let ordered = 0.0 <= self.partially_threshold
            && self.partially_threshold <= self.mostly_threshold
            && self.mostly_threshold <= self.compliant_threshold
            && self.compliant_threshold <= 1.0;
        if !ordered {
            return Err(ComplianceError::config(
                "scoring thresholds must satisfy 0 <= partially <= mostly <= compliant <= 1",
            ));
        }
        Ok(())
    }

    /// Score in [0, 1] from checklist gaps and issue severities
    pub fn score(&self, missing: usize, required: usize, issues: &[Issue]) -> f64 {
        let missing_ratio = if required == 0 {
            0.0
        } else {
            missing as f64 / required as f64
        };
        let count = |severity: Severity| issues.iter().filter(|i| i.severity == severity).count() as f64;

        let penalty = self.w_missing * missing_ratio
            + self.w_high * count(Severity::High)
            + self.w_medium * count(Severity::Medium) * 0.5
            + self.w_low * count(Severity::Low) * 0.2;

        (1.0 - penalty / self.normalizer).clamp(0.0, 1.0)
    }

    /// Status tier; every score maps to exactly one tier
    pub fn status(&self, score: f64) -> ComplianceStatus {
        if score >= self.compliant_threshold {
            ComplianceStatus::Compliant
        } else if score >= self.mostly_threshold {
            ComplianceStatus::MostlyCompliant
        } else if score >= self.partially_threshold {
            ComplianceStatus::PartiallyCompliant
        } else {
            ComplianceStatus::NonCompliant
        }
    }
}
