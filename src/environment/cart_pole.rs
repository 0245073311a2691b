use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use crate::environment::{Environment, Step};

const GRAVITY: f32 = 9.8;
const MASS_CART: f32 = 1.0;
const MASS_POLE: f32 = 0.1;
const TOTAL_MASS: f32 = MASS_CART + MASS_POLE;
// Half the pole's length.
const LENGTH: f32 = 0.5;
const POLE_MASS_LENGTH: f32 = MASS_POLE * LENGTH;
const FORCE_MAG: f32 = 10.0;
const TAU: f32 = 0.02;
const THETA_THRESHOLD: f32 = 12.0 * 2.0 * std::f32::consts::PI / 360.0;
const X_THRESHOLD: f32 = 2.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Push {
    Left,
    Right,
}

impl Push {
    pub fn from_index(action: usize) -> Option<Self> {
        Push::iter().nth(action)
    }
}

/// Classic cart-pole balancing task: +1 reward per step while the pole stays
/// within 12 degrees of vertical and the cart within 2.4 units of centre.
#[derive(Debug, Clone)]
pub struct CartPole {
    /// `[x, x_dot, theta, theta_dot]`
    state: [f32; 4],
    steps: u32,
    max_steps: u32,
    rng: StdRng,
}

impl CartPole {
    pub fn new(max_steps: u32, seed: u64) -> Self {
        CartPole {
            state: [0.0; 4],
            steps: 0,
            max_steps,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> [f32; 4] {
        self.state
    }
}

impl Environment for CartPole {
    fn reset(&mut self) -> Vec<f32> {
        for s in self.state.iter_mut() {
            *s = self.rng.random_range(-0.05..0.05);
        }
        self.steps = 0;
        self.state.to_vec()
    }

    fn step(&mut self, action: usize) -> Step {
        let force = match Push::from_index(action) {
            Some(Push::Right) => FORCE_MAG,
            _ => -FORCE_MAG,
        };
        let [x, x_dot, theta, theta_dot] = self.state;
        let (sin, cos) = theta.sin_cos();

        let temp = (force + POLE_MASS_LENGTH * theta_dot * theta_dot * sin) / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin - cos * temp)
            / (LENGTH * (4.0 / 3.0 - MASS_POLE * cos * cos / TOTAL_MASS));
        let x_acc = temp - POLE_MASS_LENGTH * theta_acc * cos / TOTAL_MASS;

        // Explicit Euler.
        self.state = [
            x + TAU * x_dot,
            x_dot + TAU * x_acc,
            theta + TAU * theta_dot,
            theta_dot + TAU * theta_acc,
        ];
        self.steps += 1;

        let terminated = self.state[0].abs() > X_THRESHOLD || self.state[2].abs() > THETA_THRESHOLD;
        let truncated = self.steps >= self.max_steps;
        let info = if terminated {
            Some("terminated".to_string())
        } else if truncated {
            Some("truncated".to_string())
        } else {
            None
        };
        Step {
            observation: self.state.to_vec(),
            reward: 1.0,
            done: terminated || truncated,
            info,
        }
    }

    fn observation_size(&self) -> usize {
        4
    }

    fn n_actions(&self) -> usize {
        Push::iter().count()
    }
}
