//! Classification results and capture candidate selection.
//!
//! The classifier port returns a ranked list of [`ClassProbability`]
//! entries, one per trained class in fixed model order. Candidate
//! selection reduces that list to at most one winning class per capture
//! cycle, subject to a strict confidence threshold.
//!
//! # Tie-break policy
//!
//! The model is not guaranteed mutually exclusive, so more than one class
//! can clear the threshold in the same cycle. Two policies are supported:
//!
//! - [`TiePolicy::LastWins`] (default): the last class in evaluation
//!   order wins. This preserves the legacy sequential-overwrite behavior
//!   and is kept for compatibility.
//! - [`TiePolicy::HighestConfidence`]: the class with the highest
//!   confidence wins; on exact confidence ties the earlier class is kept.

use serde::{Deserialize, Serialize};

/// Default strict confidence threshold a class must exceed to be
/// considered a capture candidate.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Probability assigned to a single trained class for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProbability {
    /// Class label, as configured in the model.
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

impl ClassProbability {
    /// Creates a class probability entry.
    #[must_use]
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Policy for resolving cycles where several classes clear the threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TiePolicy {
    /// The last above-threshold class in evaluation order wins (legacy
    /// compatibility behavior).
    #[default]
    LastWins,
    /// The above-threshold class with the highest confidence wins.
    HighestConfidence,
}

/// Selects the winning class for one capture cycle, if any.
///
/// Only classes with confidence strictly above `threshold` are
/// considered; `None` means the cycle contributes nothing to the sample
/// buffer. A `NaN` confidence never clears the threshold.
#[must_use]
pub fn select_candidate(
    ranking: &[ClassProbability],
    threshold: f32,
    policy: TiePolicy,
) -> Option<&ClassProbability> {
    let mut winner: Option<&ClassProbability> = None;
    for entry in ranking {
        // NaN must fail the comparison, so `<=` is not equivalent here.
        #[allow(clippy::neg_cmp_op_on_partial_ord)]
        if !(entry.confidence > threshold) {
            continue;
        }
        winner = match (winner, policy) {
            (None, _) => Some(entry),
            (Some(_), TiePolicy::LastWins) => Some(entry),
            (Some(current), TiePolicy::HighestConfidence) => {
                if entry.confidence > current.confidence {
                    Some(entry)
                } else {
                    Some(current)
                }
            },
        };
    }
    winner
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn ranking(entries: &[(&str, f32)]) -> Vec<ClassProbability> {
        entries
            .iter()
            .map(|(label, confidence)| ClassProbability::new(*label, *confidence))
            .collect()
    }

    #[test]
    fn nothing_above_threshold_yields_none() {
        let r = ranking(&[("I", 0.4), ("K", 0.5), ("T", 0.1), ("O", 0.3)]);
        assert!(select_candidate(&r, 0.5, TiePolicy::LastWins).is_none());
        assert!(select_candidate(&r, 0.5, TiePolicy::HighestConfidence).is_none());
    }

    #[test]
    fn threshold_is_strict() {
        // Exactly at the threshold does not qualify.
        let r = ranking(&[("I", 0.5)]);
        assert!(select_candidate(&r, 0.5, TiePolicy::LastWins).is_none());
    }

    #[test]
    fn single_winner_is_selected_under_both_policies() {
        let r = ranking(&[("I", 0.9), ("K", 0.1), ("T", 0.1), ("O", 0.1)]);
        let last = select_candidate(&r, 0.5, TiePolicy::LastWins).unwrap();
        let high = select_candidate(&r, 0.5, TiePolicy::HighestConfidence).unwrap();
        assert_eq!(last.label, "I");
        assert_eq!(high.label, "I");
    }

    #[test]
    fn last_wins_takes_later_class_even_at_lower_confidence() {
        let r = ranking(&[("I", 0.9), ("K", 0.6), ("T", 0.2), ("O", 0.1)]);
        let winner = select_candidate(&r, 0.5, TiePolicy::LastWins).unwrap();
        assert_eq!(winner.label, "K");
    }

    #[test]
    fn highest_confidence_takes_the_maximum() {
        let r = ranking(&[("I", 0.6), ("K", 0.9), ("T", 0.7), ("O", 0.1)]);
        let winner = select_candidate(&r, 0.5, TiePolicy::HighestConfidence).unwrap();
        assert_eq!(winner.label, "K");
    }

    #[test]
    fn highest_confidence_keeps_earlier_class_on_exact_tie() {
        let r = ranking(&[("I", 0.8), ("K", 0.8)]);
        let winner = select_candidate(&r, 0.5, TiePolicy::HighestConfidence).unwrap();
        assert_eq!(winner.label, "I");
    }

    #[test]
    fn nan_confidence_never_qualifies() {
        let r = ranking(&[("I", f32::NAN), ("K", 0.9)]);
        let winner = select_candidate(&r, 0.5, TiePolicy::LastWins).unwrap();
        assert_eq!(winner.label, "K");
    }

    #[test]
    fn empty_ranking_yields_none() {
        assert!(select_candidate(&[], 0.5, TiePolicy::LastWins).is_none());
    }

    proptest! {
        /// Whenever a candidate is returned it is strictly above the
        /// threshold, under either policy.
        #[test]
        fn winner_always_clears_threshold(
            confidences in proptest::collection::vec(0.0f32..=1.0, 0..8),
            threshold in 0.0f32..1.0,
            last_wins in any::<bool>(),
        ) {
            let r: Vec<ClassProbability> = confidences
                .iter()
                .enumerate()
                .map(|(i, c)| ClassProbability::new(format!("c{i}"), *c))
                .collect();
            let policy = if last_wins { TiePolicy::LastWins } else { TiePolicy::HighestConfidence };
            if let Some(winner) = select_candidate(&r, threshold, policy) {
                prop_assert!(winner.confidence > threshold);
            } else {
                prop_assert!(r.iter().all(|c| c.confidence <= threshold));
            }
        }

        /// `HighestConfidence` never returns a class with lower
        /// confidence than another qualifying class.
        #[test]
        fn highest_confidence_is_maximal(
            confidences in proptest::collection::vec(0.0f32..=1.0, 1..8),
        ) {
            let r: Vec<ClassProbability> = confidences
                .iter()
                .enumerate()
                .map(|(i, c)| ClassProbability::new(format!("c{i}"), *c))
                .collect();
            if let Some(winner) = select_candidate(&r, 0.5, TiePolicy::HighestConfidence) {
                prop_assert!(r.iter().all(|c| c.confidence <= winner.confidence));
            }
        }
    }
}
