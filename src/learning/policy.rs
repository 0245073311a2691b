use enum_dispatch::enum_dispatch;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::learning::ValueFunction;

/// An exploration-rate schedule.
#[enum_dispatch]
pub trait Decay {
    /// The exploration rate to use after `step` learning steps or periods,
    /// given the current rate.
    fn next_epsilon(&self, current: f64, step: u32) -> f64;
}

/// `epsilon * factor` after every learning step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometricDecay {
    pub factor: f64,
}

impl Decay for GeometricDecay {
    fn next_epsilon(&self, current: f64, _step: u32) -> f64 {
        current * self.factor
    }
}

/// `(1 - theta)^t` with `theta = 1 - final^(1 / (0.5 * horizon))`, so the
/// rate reaches `final` halfway through the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeBasedDecay {
    pub theta: f64,
}

impl TimeBasedDecay {
    pub fn new(epsilon_final: f64, horizon: usize) -> Self {
        TimeBasedDecay {
            theta: 1.0 - epsilon_final.powf(1.0 / (0.5 * horizon as f64)),
        }
    }
}

impl Decay for TimeBasedDecay {
    fn next_epsilon(&self, _current: f64, step: u32) -> f64 {
        (1.0 - self.theta).powf(step as f64)
    }
}

#[enum_dispatch(Decay)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DecaySchedule {
    Geometric(GeometricDecay),
    TimeBased(TimeBasedDecay),
}

/// Epsilon-greedy action selection over any [`ValueFunction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpsilonGreedy {
    epsilon: f64,
    epsilon_min: f64,
    epsilon_max: f64,
    schedule: DecaySchedule,
}

impl EpsilonGreedy {
    /// Starts at `epsilon_max`.
    pub fn new(
        epsilon_min: f64,
        epsilon_max: f64,
        schedule: DecaySchedule,
    ) -> Result<Self, ConfigError> {
        ConfigError::check_range("epsilon_min", epsilon_min, 0.0, 1.0)?;
        ConfigError::check_range("epsilon_max", epsilon_max, 0.0, 1.0)?;
        if epsilon_min > epsilon_max {
            return Err(ConfigError::InvertedBounds {
                min: epsilon_min,
                max: epsilon_max,
            });
        }
        Ok(EpsilonGreedy {
            epsilon: epsilon_max,
            epsilon_min,
            epsilon_max,
            schedule,
        })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Overrides the current rate, clamped to the bounds.
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(self.epsilon_min, self.epsilon_max);
    }

    pub fn schedule(&self) -> &DecaySchedule {
        &self.schedule
    }

    /// Advances the schedule by one step and returns the new rate.
    pub fn decay(&mut self, step: u32) -> f64 {
        let next = self.schedule.next_epsilon(self.epsilon, step);
        self.set_epsilon(next);
        self.epsilon
    }

    /// Random action with probability epsilon, greedy action otherwise.
    pub fn choose_action<V, R>(&self, value_fn: &V, state: &V::State, rng: &mut R) -> V::Action
    where
        V: ValueFunction,
        R: Rng + ?Sized,
    {
        if rng.random::<f64>() < self.epsilon {
            if let Some(action) = value_fn.actions().choose(rng) {
                return *action;
            }
        }
        value_fn.greedy_action(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Three actions with fixed values, state ignored.
    struct Fixed(Vec<f64>);

    impl ValueFunction for Fixed {
        type State = ();
        type Action = usize;

        fn actions(&self) -> Vec<usize> {
            (0..self.0.len()).collect()
        }

        fn action_values(&self, _state: &()) -> Vec<f64> {
            self.0.clone()
        }
    }

    #[test]
    fn test_geometric_bounds() {
        let schedule = DecaySchedule::from(GeometricDecay { factor: 0.5 });
        let mut policy = EpsilonGreedy::new(0.01, 1.0, schedule).unwrap();
        assert_eq!(policy.epsilon(), 1.0);
        assert_eq!(policy.decay(1), 0.5);
        for step in 0..100 {
            let eps = policy.decay(step);
            assert!((0.01..=1.0).contains(&eps));
        }
        assert_eq!(policy.epsilon(), 0.01);
    }

    #[test]
    fn test_time_based_schedule() {
        let horizon = 1000;
        let decay = TimeBasedDecay::new(0.001, horizon);
        assert_float_eq!(decay.next_epsilon(1.0, 0), 1.0, abs <= 1e-12);
        // Half way through the horizon the rate reaches its final value.
        assert_float_eq!(decay.next_epsilon(1.0, 500), 0.001, rmax <= 1e-9);

        let mut policy = EpsilonGreedy::new(0.0, 1.0, decay.into()).unwrap();
        let mut last = policy.epsilon();
        for t in 0..horizon as u32 {
            let eps = policy.decay(t);
            assert!((0.0..=1.0).contains(&eps));
            assert!(eps <= last);
            last = eps;
        }
    }

    #[test]
    fn test_time_based_respects_floor() {
        let decay = TimeBasedDecay::new(0.001, 100);
        let mut policy = EpsilonGreedy::new(0.05, 0.9, decay.into()).unwrap();
        for t in 0..1000 {
            let eps = policy.decay(t);
            assert!((0.05..=0.9).contains(&eps));
        }
    }

    #[test]
    fn test_invalid_bounds() {
        let schedule = DecaySchedule::from(GeometricDecay { factor: 0.9 });
        assert!(matches!(
            EpsilonGreedy::new(0.5, 0.1, schedule),
            Err(ConfigError::InvertedBounds { .. })
        ));
        assert!(EpsilonGreedy::new(-0.1, 1.0, schedule).is_err());
    }

    #[test]
    fn test_greedy_when_epsilon_zero() {
        let schedule = DecaySchedule::from(GeometricDecay { factor: 0.9 });
        let mut policy = EpsilonGreedy::new(0.0, 1.0, schedule).unwrap();
        policy.set_epsilon(0.0);
        let value_fn = Fixed(vec![0.1, 0.7, 0.7]);
        let mut rng = StdRng::seed_from_u64(66);
        for _ in 0..50 {
            assert_eq!(policy.choose_action(&value_fn, &(), &mut rng), 1);
        }
    }

    #[test]
    fn test_random_when_epsilon_one() {
        let schedule = DecaySchedule::from(GeometricDecay { factor: 0.9 });
        let policy = EpsilonGreedy::new(0.0, 1.0, schedule).unwrap();
        let value_fn = Fixed(vec![0.1, 0.7, 0.2]);
        let mut rng = StdRng::seed_from_u64(66);
        let mut seen = [false; 3];
        for _ in 0..200 {
            seen[policy.choose_action(&value_fn, &(), &mut rng)] = true;
        }
        assert_eq!(seen, [true, true, true]);
    }
}
