use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::learning::agent_state::{ActionGrid, StateGrid, linspace};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    pub market: SimulationConfig,
    #[serde(default)]
    pub control: ControlConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.market.validate()?;
        self.control.validate()
    }
}

/// Parameters of the repeated pricing game.
///
/// The learning rates and both grids have no file default and must be
/// given in the `[market]` table. The `Default` impl is the reference
/// duopoly used in tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of periods per run, including the two seed periods.
    #[serde(default = "defaults::horizon")]
    pub horizon: usize,
    #[serde(default = "defaults::n_firms")]
    pub n_firms: usize,
    #[serde(default = "defaults::runs")]
    pub runs: usize,
    /// Tabular learning rate.
    pub alpha: f64,
    pub gamma: f64,
    /// Exploration rate reached half way through the horizon.
    #[serde(default = "defaults::epsilon_final")]
    pub epsilon_final: f64,
    #[serde(default)]
    pub epsilon_min: f64,
    #[serde(default = "defaults::epsilon_max")]
    pub epsilon_max: f64,
    pub state_grid: Vec<f64>,
    pub action_grid: Vec<f64>,
    #[serde(default)]
    pub init_q_value: f64,
    /// Fixed price for both seed periods of every firm; random if unset.
    #[serde(default)]
    pub initial_price: Option<f64>,
    /// Capacity of each firm's experience store.
    #[serde(default = "defaults::memory_capacity")]
    pub memory_capacity: usize,
    #[serde(default = "defaults::seed")]
    pub seed: u64,
}

mod defaults {
    pub fn horizon() -> usize {
        500_000
    }

    pub fn n_firms() -> usize {
        2
    }

    pub fn runs() -> usize {
        2
    }

    pub fn epsilon_final() -> f64 {
        0.001
    }

    pub fn epsilon_max() -> f64 {
        1.0
    }

    pub fn memory_capacity() -> usize {
        10_000
    }

    pub fn seed() -> u64 {
        66
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            horizon: defaults::horizon(),
            n_firms: defaults::n_firms(),
            runs: defaults::runs(),
            alpha: 0.1,
            gamma: 0.95,
            epsilon_final: defaults::epsilon_final(),
            epsilon_min: 0.0,
            epsilon_max: defaults::epsilon_max(),
            state_grid: linspace(0.0, 1.0, 11),
            action_grid: linspace(0.0, 1.0, 11),
            init_q_value: 0.0,
            initial_price: None,
            memory_capacity: defaults::memory_capacity(),
            seed: defaults::seed(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.n_firms < 2 {
            return Err(ConfigError::TooFewFirms(self.n_firms));
        }
        if self.horizon < 3 {
            return Err(ConfigError::HorizonTooShort(self.horizon));
        }
        if self.memory_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        ConfigError::check_range("alpha", self.alpha, 0.0, 1.0)?;
        ConfigError::check_range("gamma", self.gamma, 0.0, 1.0)?;
        ConfigError::check_range("epsilon_final", self.epsilon_final, f64::MIN_POSITIVE, 1.0)?;
        ConfigError::check_range("epsilon_min", self.epsilon_min, 0.0, 1.0)?;
        ConfigError::check_range("epsilon_max", self.epsilon_max, 0.0, 1.0)?;
        if self.epsilon_min > self.epsilon_max {
            return Err(ConfigError::InvertedBounds {
                min: self.epsilon_min,
                max: self.epsilon_max,
            });
        }
        if let Some(price) = self.initial_price {
            ConfigError::check_range("initial_price", price, f64::MIN, f64::MAX)?;
        }
        self.grids().map(|_| ())
    }

    pub fn grids(&self) -> std::result::Result<(StateGrid, ActionGrid), ConfigError> {
        Ok((
            StateGrid::new(self.state_grid.clone())?,
            ActionGrid::new(self.action_grid.clone())?,
        ))
    }
}

/// Parameters of the replay-based learner on the generic control task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub episodes: u32,
    pub max_episode_steps: u32,
    pub learning_rate: f64,
    pub memory_capacity: usize,
    pub batch_size: usize,
    pub gamma: f64,
    pub exploration_max: f64,
    pub exploration_min: f64,
    pub exploration_decay: f64,
    pub fc1_dims: usize,
    pub fc2_dims: usize,
    pub seed: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig {
            episodes: 500,
            max_episode_steps: 500,
            learning_rate: 0.0001,
            memory_capacity: 10_000,
            batch_size: 64,
            gamma: 0.95,
            exploration_max: 1.0,
            exploration_min: 0.001,
            exploration_decay: 0.999,
            fc1_dims: 1024,
            fc2_dims: 512,
            seed: 66,
        }
    }
}

impl ControlConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.memory_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.fc1_dims == 0 || self.fc2_dims == 0 {
            return Err(ConfigError::ZeroWidth);
        }
        ConfigError::check_range("learning_rate", self.learning_rate, f64::MIN_POSITIVE, 1.0)?;
        ConfigError::check_range("gamma", self.gamma, 0.0, 1.0)?;
        ConfigError::check_range("exploration_decay", self.exploration_decay, 0.0, 1.0)?;
        ConfigError::check_range("exploration_min", self.exploration_min, 0.0, 1.0)?;
        ConfigError::check_range("exploration_max", self.exploration_max, 0.0, 1.0)?;
        if self.exploration_min > self.exploration_max {
            return Err(ConfigError::InvertedBounds {
                min: self.exploration_min,
                max: self.exploration_max,
            });
        }
        Ok(())
    }
}
