//! Fixed-length numeric encoding of learner state.
//!
//! Layout for a state with concepts `c_0 < c_1 < ... < c_{n-1}` (sorted by
//! concept id):
//!
//! ```text
//! [ mastery(c_0) .. mastery(c_{n-1}) | onehot(c_0 == current) .. onehot(c_{n-1} == current) | 0 .. ]
//! ```
//!
//! The result is zero-padded up to the dimension, or truncated to its first
//! `dimension` entries. Sorting by id keeps identical states encoding to
//! identical vectors across calls and processes.

use ndarray::Array1;

use crate::core::LearnerState;
use crate::error::{Result, TutorError};

/// Default encoded state dimension.
pub const DEFAULT_STATE_DIMENSION: usize = 100;

/// Encodes learner state into a vector of fixed dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateEncoder {
    dimension: usize,
}

impl StateEncoder {
    /// Create an encoder producing vectors of length `dimension`.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(TutorError::config("state dimension must be at least 1"));
        }
        Ok(Self { dimension })
    }

    /// Output vector length.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Encode a state.
    pub fn encode(&self, state: &LearnerState) -> Array1<f32> {
        let mut encoded = Array1::<f32>::zeros(self.dimension);
        let concepts = state.concept_mastery.len();

        let masteries = state.concept_mastery.values().map(|m| *m as f32);
        let one_hot = state.concept_mastery.keys().map(|c| {
            if *c == state.current_concept {
                1.0
            } else {
                0.0
            }
        });

        for (slot, value) in encoded
            .iter_mut()
            .zip(masteries.chain(one_hot).take(concepts * 2))
        {
            *slot = value;
        }

        encoded
    }
}

impl Default for StateEncoder {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_STATE_DIMENSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(n: usize, current: usize) -> LearnerState {
        let mut state = LearnerState::new(format!("c{:03}", current));
        for i in 0..n {
            state = state.with_mastery(format!("c{:03}", i), (i % 10) as f64 / 10.0);
        }
        state
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            StateEncoder::new(0),
            Err(TutorError::Config { .. })
        ));
    }

    #[test]
    fn test_empty_state_is_all_zero() {
        let encoder = StateEncoder::default();
        let v = encoder.encode(&LearnerState::default());
        assert_eq!(v.len(), DEFAULT_STATE_DIMENSION);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_length_at_boundaries() {
        let encoder = StateEncoder::new(10).unwrap();
        for n in [0, 5, 10, 11, 50] {
            assert_eq!(encoder.encode(&state_with(n, 0)).len(), 10, "n = {}", n);
        }
    }

    #[test]
    fn test_layout_is_sorted_by_concept() {
        let encoder = StateEncoder::new(8).unwrap();
        let state = LearnerState::new("b")
            .with_mastery("c", 0.25)
            .with_mastery("a", 0.5)
            .with_mastery("b", 0.75);

        let v = encoder.encode(&state);
        assert_eq!(v.to_vec(), vec![0.5, 0.75, 0.25, 0.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_absent_current_concept_has_no_one_hot() {
        let encoder = StateEncoder::new(6).unwrap();
        let state = LearnerState::new("missing")
            .with_mastery("a", 0.5)
            .with_mastery("b", 0.5);
        let v = encoder.encode(&state);
        assert_eq!(v.to_vec(), vec![0.5, 0.5, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_truncation_keeps_prefix() {
        let encoder = StateEncoder::new(3).unwrap();
        let state = LearnerState::new("a")
            .with_mastery("a", 0.1)
            .with_mastery("b", 0.2)
            .with_mastery("c", 0.3);
        let v = encoder.encode(&state);
        assert_eq!(v.to_vec(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_exactly_dimension_worth_of_concepts() {
        // D concepts produce 2D values, so the one-hot block is cut off.
        let encoder = StateEncoder::new(4).unwrap();
        let v = encoder.encode(&state_with(4, 3));
        assert_eq!(v.len(), 4);
        assert_eq!(v.to_vec(), vec![0.0, 0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_deterministic() {
        let encoder = StateEncoder::default();
        let state = state_with(30, 7);
        assert_eq!(encoder.encode(&state), encoder.encode(&state));
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let encoder = StateEncoder::default();
        let forward = LearnerState::new("x")
            .with_mastery("x", 0.3)
            .with_mastery("y", 0.6);
        let backward = LearnerState::new("x")
            .with_mastery("y", 0.6)
            .with_mastery("x", 0.3);
        assert_eq!(encoder.encode(&forward), encoder.encode(&backward));
    }

    mod proptests {
        use super::*;
        use proptest::collection::btree_map;
        use proptest::prelude::*;

        fn arb_state() -> impl Strategy<Value = LearnerState> {
            (btree_map("[a-z]{1,8}", 0.0f64..=1.0, 0..150), "[a-z]{0,8}").prop_map(
                |(concept_mastery, current_concept)| LearnerState {
                    concept_mastery,
                    current_concept,
                    ..Default::default()
                },
            )
        }

        proptest! {
            // Property: output length is always the configured dimension
            #[test]
            fn prop_length_is_dimension(state in arb_state(), dimension in 1usize..300) {
                let encoder = StateEncoder::new(dimension).unwrap();
                prop_assert_eq!(encoder.encode(&state).len(), dimension);
            }

            // Property: encoding the same state twice gives the same vector
            #[test]
            fn prop_encode_is_deterministic(state in arb_state()) {
                let encoder = StateEncoder::default();
                prop_assert_eq!(encoder.encode(&state), encoder.encode(&state.clone()));
            }

            // Property: at most one one-hot entry is set
            #[test]
            fn prop_single_one_hot(state in arb_state()) {
                let n = state.concept_mastery.len();
                let encoder = StateEncoder::new(2 * n.max(1)).unwrap();
                let v = encoder.encode(&state);
                let hot = v.iter().skip(n).filter(|x| **x == 1.0).count();
                prop_assert!(hot <= 1);
            }
        }
    }
}
