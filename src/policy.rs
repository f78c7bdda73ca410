//! # Comparison Policy Module
//!
//! Decides whether an optimization run is worth publishing. A compressed
//! file must shrink by at least the configured percentage to count as an
//! improvement; a lossy rendition is judged by the same rule and can rescue
//! an upload whose lossless pass fell short.
//!
//! Percentages are computed in floating point; the ratio must not be
//! truncated to an integer before subtraction or most reductions collapse
//! to zero.

use crate::optimizers::OptimizationSummary;

/// Size deltas of one artifact against the uploaded original
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavingsDelta {
    /// Size in bytes of the artifact
    pub size: u64,
    /// Bytes saved (negative when the artifact grew)
    pub size_diff: i64,
    /// Percentage saved
    pub percent_diff: f64,
    /// Whether this artifact clears the improvement threshold
    pub improved: bool,
}

/// Outcome of judging one optimization summary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublishDecision {
    pub compressed: SavingsDelta,
    pub lossy: Option<SavingsDelta>,
}

impl PublishDecision {
    /// Publish when either the lossless or the lossy branch improved
    pub fn should_publish(&self) -> bool {
        self.compressed.improved || self.lossy.map_or(false, |delta| delta.improved)
    }
}

/// Threshold-based judgment of before/after sizes
#[derive(Debug, Clone, Copy)]
pub struct ComparisonPolicy {
    min_improvement_percent: f64,
}

impl ComparisonPolicy {
    pub fn new(min_improvement_percent: f64) -> Self {
        Self {
            min_improvement_percent,
        }
    }

    /// Judge a summary; a lossy delta is present whenever a lossy rendition
    /// was produced, regardless of whether it improved
    pub fn assess(&self, summary: &OptimizationSummary) -> PublishDecision {
        let compressed = self.delta(summary.size_before, summary.size_after);
        let lossy = if summary.size_lossy > 0 {
            Some(self.delta(summary.size_before, summary.size_lossy))
        } else {
            None
        };

        PublishDecision { compressed, lossy }
    }

    fn delta(&self, size_before: u64, size_after: u64) -> SavingsDelta {
        let size_diff = size_before as i64 - size_after as i64;
        let percent_diff = if size_before == 0 {
            0.0
        } else {
            100.0 - (size_after as f64 / size_before as f64 * 100.0)
        };
        let improved = size_diff > 0 && percent_diff >= self.min_improvement_percent;

        SavingsDelta {
            size: size_after,
            size_diff,
            percent_diff,
            improved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(size_before: u64, size_after: u64, size_lossy: u64) -> OptimizationSummary {
        OptimizationSummary {
            size_before,
            size_after,
            size_lossy,
        }
    }

    fn policy() -> ComparisonPolicy {
        ComparisonPolicy::new(1.0)
    }

    #[test]
    fn test_clear_improvement_is_published() {
        let decision = policy().assess(&summary(1000, 980, 0));
        assert!(decision.compressed.improved);
        assert!(decision.should_publish());
        assert_eq!(decision.compressed.size_diff, 20);
        assert!((decision.compressed.percent_diff - 2.0).abs() < 1e-9);
        assert!(decision.lossy.is_none());
    }

    #[test]
    fn test_below_threshold_is_rejected() {
        // 0.9% saved, threshold is 1.0%
        let decision = policy().assess(&summary(1000, 991, 0));
        assert!(!decision.compressed.improved);
        assert!(!decision.should_publish());
    }

    #[test]
    fn test_threshold_boundary_passes() {
        // Exactly 1.0% saved: >= threshold, so it counts
        let decision = policy().assess(&summary(1000, 990, 0));
        assert!(decision.compressed.improved);
        assert!(decision.should_publish());
    }

    #[test]
    fn test_equal_size_is_rejected() {
        let decision = policy().assess(&summary(1000, 1000, 0));
        assert!(!decision.compressed.improved);
        assert!(!decision.should_publish());
        assert_eq!(decision.compressed.size_diff, 0);
    }

    #[test]
    fn test_grown_file_is_rejected() {
        let decision = policy().assess(&summary(1000, 1100, 0));
        assert!(!decision.compressed.improved);
        assert_eq!(decision.compressed.size_diff, -100);
        assert!(decision.compressed.percent_diff < 0.0);
    }

    #[test]
    fn test_lossy_rescues_rejected_lossless() {
        // Lossless achieved nothing, lossy saved 30%
        let decision = policy().assess(&summary(1000, 1000, 700));
        assert!(!decision.compressed.improved);

        let lossy = decision.lossy.unwrap();
        assert!(lossy.improved);
        assert_eq!(lossy.size_diff, 300);
        assert!((lossy.percent_diff - 30.0).abs() < 1e-9);

        assert!(decision.should_publish());
    }

    #[test]
    fn test_lossy_below_threshold_does_not_rescue() {
        let decision = policy().assess(&summary(1000, 1000, 995));
        assert!(!decision.should_publish());
    }

    #[test]
    fn test_unimproved_lossy_still_reported() {
        // Lossless improved, lossy did not; both appear in the decision
        let decision = policy().assess(&summary(1000, 900, 1000));
        assert!(decision.compressed.improved);
        let lossy = decision.lossy.unwrap();
        assert!(!lossy.improved);
        assert!(decision.should_publish());
    }

    #[test]
    fn test_zero_size_input() {
        let decision = policy().assess(&summary(0, 0, 0));
        assert!(!decision.should_publish());
        assert_eq!(decision.compressed.percent_diff, 0.0);
    }
}
