//! Epsilon-greedy action selection.
//!
//! With probability `epsilon` the selector explores: a uniformly random
//! action type at a uniformly random difficulty. Otherwise it exploits the
//! online network: the action type with the highest estimated value, at a
//! difficulty slightly above the learner's current mastery. Both branches
//! attach the prerequisites of the current concept from the graph store.

use rand::Rng;
use tracing::debug;

use crate::core::{Action, ActionType, LearnerState};
use crate::encoder::StateEncoder;
use crate::error::{Result, TutorError};
use crate::graph::KnowledgeGraphStore;
use crate::network::QNetworks;

/// Difficulty step above current mastery when exploiting.
pub const DIFFICULTY_STEP: f64 = 0.2;

/// Which branch of the epsilon-greedy rule produced an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Random action type and difficulty.
    Explore,
    /// Highest-valued action type.
    Exploit,
}

impl Decision {
    /// Draw a branch. Explores when `u < epsilon` for `u ~ U[0, 1)`.
    pub fn draw<R: Rng + ?Sized>(epsilon: f64, rng: &mut R) -> Decision {
        if rng.gen::<f64>() < epsilon {
            Decision::Explore
        } else {
            Decision::Exploit
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Explore => "explore",
            Decision::Exploit => "exploit",
        }
    }
}

/// Check that an exploration rate is a probability.
pub fn validate_epsilon(epsilon: f64) -> Result<()> {
    if epsilon.is_nan() || !(0.0..=1.0).contains(&epsilon) {
        return Err(TutorError::invalid_input(format!(
            "epsilon must be in [0, 1], got {}",
            epsilon
        )));
    }
    Ok(())
}

/// Index of the largest value; ties go to the lowest index.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Difficulty used when exploiting: `min(mastery + 0.2, 1.0)`.
pub fn exploit_difficulty(current_mastery: f64) -> f64 {
    (current_mastery + DIFFICULTY_STEP).min(1.0)
}

/// Stateless epsilon-greedy selector.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicySelector;

impl PolicySelector {
    /// Choose the next action for `state`.
    ///
    /// Fails with `InvalidInput` on a bad `epsilon` or mastery value,
    /// `DimensionMismatch` if the encoder and network disagree, and with the
    /// store's error if the prerequisite lookup fails.
    pub fn select<S, R>(
        networks: &QNetworks,
        encoder: &StateEncoder,
        store: &S,
        state: &LearnerState,
        epsilon: f64,
        rng: &mut R,
    ) -> Result<Action>
    where
        S: KnowledgeGraphStore + ?Sized,
        R: Rng + ?Sized,
    {
        validate_epsilon(epsilon)?;
        state.validate()?;

        let decision = Decision::draw(epsilon, rng);
        let (action_type, difficulty) = match decision {
            Decision::Explore => {
                let all = ActionType::all();
                let action_type = all[rng.gen_range(0..all.len())];
                (action_type, rng.gen::<f64>())
            }
            Decision::Exploit => {
                let values = networks.online.evaluate(&encoder.encode(state))?.to_vec();
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(TutorError::numeric(format!(
                        "non-finite action values {:?}",
                        values
                    )));
                }
                let action_type = argmax(&values)
                    .and_then(ActionType::from_index)
                    .ok_or_else(|| {
                        TutorError::numeric(format!("no action for values {:?}", values))
                    })?;
                (action_type, exploit_difficulty(state.current_mastery()))
            }
        };

        let prerequisites = store.prerequisites_of(&state.current_concept)?;

        debug!(
            decision = decision.as_str(),
            action = %action_type,
            concept = %state.current_concept,
            difficulty,
            prerequisites = prerequisites.len(),
            "selected action"
        );

        Ok(Action::new(action_type, state.current_concept.clone(), difficulty)
            .with_prerequisites(prerequisites))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ACTION_COUNT;
    use crate::graph::MemoryGraphStore;
    use crate::network::mlp::tests::constant_network;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DIM: usize = 12;

    fn networks(bias: [f32; ACTION_COUNT]) -> QNetworks {
        QNetworks::from_online(constant_network(DIM, bias), 0.001)
    }

    fn encoder() -> StateEncoder {
        StateEncoder::new(DIM).unwrap()
    }

    fn state(mastery: Option<f64>) -> LearnerState {
        let state = LearnerState::new("pythagorean_theorem").with_mastery("squares", 0.9);
        match mastery {
            Some(m) => state.with_mastery("pythagorean_theorem", m),
            None => state,
        }
    }

    #[test]
    fn test_greedy_picks_argmax() {
        let nets = networks([0.1, 0.3, 0.9, 0.2]);
        let store = MemoryGraphStore::new();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let action =
                PolicySelector::select(&nets, &encoder(), &store, &state(Some(0.3)), 0.0, &mut rng)
                    .unwrap();
            assert_eq!(action.action_type, ActionType::Example);
            assert_eq!(action.concept, "pythagorean_theorem");
        }
    }

    #[test]
    fn test_ties_go_to_first_declared() {
        let nets = networks([0.5, 0.5, 0.1, 0.5]);
        let store = MemoryGraphStore::new();
        let mut rng = StdRng::seed_from_u64(7);
        let action =
            PolicySelector::select(&nets, &encoder(), &store, &state(None), 0.0, &mut rng).unwrap();
        assert_eq!(action.action_type, ActionType::Question);
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[1.0]), Some(0));
        assert_eq!(argmax(&[-1.0, -0.5, -2.0]), Some(1));
        assert_eq!(argmax(&[2.0, 3.0, 3.0]), Some(1));
    }

    #[test]
    fn test_full_exploration_is_uniform() {
        let nets = networks([0.0, 0.0, 10.0, 0.0]);
        let store = MemoryGraphStore::new();
        let mut rng = StdRng::seed_from_u64(12345);
        let trials = 10_000;
        let mut counts = [0usize; ACTION_COUNT];

        for _ in 0..trials {
            let action =
                PolicySelector::select(&nets, &encoder(), &store, &state(Some(0.5)), 1.0, &mut rng)
                    .unwrap();
            counts[action.action_type.index()] += 1;
            assert!((0.0..1.0).contains(&action.difficulty));
        }

        let expected = trials as f64 / ACTION_COUNT as f64;
        let chi_square: f64 = counts
            .iter()
            .map(|&c| {
                let d = c as f64 - expected;
                d * d / expected
            })
            .sum();
        // 3 degrees of freedom, p = 0.001
        assert!(chi_square < 16.27, "chi-square {} for {:?}", chi_square, counts);
    }

    #[test]
    fn test_exploit_difficulty() {
        let nets = networks([1.0, 0.0, 0.0, 0.0]);
        let store = MemoryGraphStore::new();
        let mut rng = StdRng::seed_from_u64(3);

        for (mastery, expected) in [(Some(0.9), 1.0), (Some(0.3), 0.5), (None, 0.2)] {
            let action =
                PolicySelector::select(&nets, &encoder(), &store, &state(mastery), 0.0, &mut rng)
                    .unwrap();
            assert!(
                (action.difficulty - expected).abs() < 1e-12,
                "mastery {:?} gave difficulty {}",
                mastery,
                action.difficulty
            );
        }
    }

    #[test]
    fn test_invalid_epsilon_rejected() {
        let nets = networks([0.0; ACTION_COUNT]);
        let store = MemoryGraphStore::new();
        let mut rng = StdRng::seed_from_u64(3);

        for epsilon in [-0.1, 1.5, f64::NAN] {
            let result =
                PolicySelector::select(&nets, &encoder(), &store, &state(None), epsilon, &mut rng);
            assert!(matches!(result, Err(TutorError::InvalidInput { .. })));
        }
    }

    #[test]
    fn test_invalid_mastery_rejected() {
        let nets = networks([0.0; ACTION_COUNT]);
        let store = MemoryGraphStore::new();
        let mut rng = StdRng::seed_from_u64(3);
        let bad = state(Some(1.5));
        let result = PolicySelector::select(&nets, &encoder(), &store, &bad, 0.0, &mut rng);
        assert!(matches!(result, Err(TutorError::InvalidInput { .. })));
    }

    #[test]
    fn test_prerequisites_attached_in_both_branches() {
        let nets = networks([0.0, 1.0, 0.0, 0.0]);
        let store = MemoryGraphStore::with_edges([
            ("squares", "pythagorean_theorem"),
            ("right_triangles", "pythagorean_theorem"),
        ])
        .unwrap();
        let mut rng = StdRng::seed_from_u64(9);

        for epsilon in [0.0, 1.0] {
            let action =
                PolicySelector::select(&nets, &encoder(), &store, &state(None), epsilon, &mut rng)
                    .unwrap();
            assert_eq!(action.prerequisites, vec!["right_triangles", "squares"]);
        }
    }

    #[test]
    fn test_dimension_mismatch_surfaces() {
        let nets = networks([0.0; ACTION_COUNT]);
        let store = MemoryGraphStore::new();
        let mut rng = StdRng::seed_from_u64(3);
        let wrong = StateEncoder::new(DIM + 1).unwrap();
        let result = PolicySelector::select(&nets, &wrong, &store, &state(None), 0.0, &mut rng);
        assert!(matches!(result, Err(TutorError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_non_finite_values_refuse_greedy_choice() {
        let store = MemoryGraphStore::new();
        let mut rng = StdRng::seed_from_u64(3);

        for bias in [
            [f32::NAN, 0.1, -0.07, 0.04],
            [0.0, f32::INFINITY, 0.0, 0.0],
        ] {
            let nets = networks(bias);
            let result =
                PolicySelector::select(&nets, &encoder(), &store, &state(Some(0.5)), 0.0, &mut rng);
            assert!(matches!(result, Err(TutorError::Numeric { .. })));
        }
    }

    #[test]
    fn test_decision_draw_bounds() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            assert_eq!(Decision::draw(0.0, &mut rng), Decision::Exploit);
            assert_eq!(Decision::draw(1.0, &mut rng), Decision::Explore);
        }
    }
}
